//! Admin reconfiguration, emergency controls, fee recipient and bonus weight
//!
//! Admin calls are not gated by the emergency allow-list; they never change
//! the draw phase.

use crate::events::PoolEvent;
use crate::state::{DrawPhase, EmergencyConfig, EmergencyState, Pool};
use crate::strategy::{DistributionStrategy, PrizeDistribution};
use prizevault_common::{PrizeVaultError, ReceiverId, Timestamp, UFix64};

impl Pool {
    fn config_updated(&mut self, field: &'static str, now: Timestamp) {
        let phase = self.state(now);
        self.emit(PoolEvent::ConfigUpdated {
            pool_id: self.id,
            field,
            phase,
        });
        log::info!("pool {}: {} updated", self.id, field);
    }

    /// Takes effect for rounds started after this call
    pub fn update_draw_interval(&mut self, secs: u64, now: Timestamp) -> Result<(), PrizeVaultError> {
        if secs == 0 {
            return Err(PrizeVaultError::InvalidConfig(
                "draw interval must be positive".into(),
            ));
        }
        self.config.draw_interval_secs = secs;
        self.config_updated("draw_interval_secs", now);
        Ok(())
    }

    /// Move the current round's end; only while the round is still running
    pub fn update_round_target_end(&mut self, new_end: Timestamp, now: Timestamp) -> Result<(), PrizeVaultError> {
        let phase = self.state(now);
        if phase != DrawPhase::RoundActive {
            return Err(PrizeVaultError::WrongPhase {
                expected: DrawPhase::RoundActive.as_str(),
                actual: phase.as_str(),
            });
        }
        if new_end <= now {
            return Err(PrizeVaultError::InvalidConfig(format!(
                "new round end {} must be after {}",
                new_end, now
            )));
        }
        if let Some(round) = self.round.as_mut() {
            round.twab.set_round_end(new_end);
        }
        self.config_updated("round_target_end", now);
        Ok(())
    }

    /// Swap the yield split; pending yield is settled under the old split first
    pub fn set_distribution_strategy(
        &mut self,
        strategy: DistributionStrategy,
        now: Timestamp,
    ) -> Result<(), PrizeVaultError> {
        self.sync_with_yield_source(now)?;
        self.config.distribution = strategy;
        self.config_updated("distribution", now);
        Ok(())
    }

    pub fn set_prize_distribution(
        &mut self,
        distribution: PrizeDistribution,
        now: Timestamp,
    ) -> Result<(), PrizeVaultError> {
        distribution.validate()?;
        if self.state(now) == DrawPhase::DrawProcessing {
            return Err(PrizeVaultError::DrawInProgress);
        }
        self.config.prize_distribution = distribution;
        self.config_updated("prize_distribution", now);
        Ok(())
    }

    pub fn set_minimum_deposit(&mut self, minimum: UFix64, now: Timestamp) -> Result<(), PrizeVaultError> {
        self.config.minimum_deposit = minimum;
        self.config_updated("minimum_deposit", now);
        Ok(())
    }

    pub fn set_emergency_config(&mut self, config: EmergencyConfig, now: Timestamp) -> Result<(), PrizeVaultError> {
        config.validate()?;
        self.emergency.set_config(config.clone());
        self.config.emergency = config;
        self.config_updated("emergency", now);
        Ok(())
    }

    pub fn set_protocol_fee_recipient(
        &mut self,
        recipient: impl Into<String>,
        now: Timestamp,
    ) -> Result<(), PrizeVaultError> {
        let recipient = recipient.into();
        if recipient.trim().is_empty() {
            return Err(PrizeVaultError::InvalidConfig(
                "fee recipient must not be empty".into(),
            ));
        }
        self.protocol_fee_recipient = Some(recipient);
        self.config_updated("protocol_fee_recipient", now);
        Ok(())
    }

    /// Pending fees stay allocated until a recipient is set again
    pub fn clear_protocol_fee_recipient(&mut self, now: Timestamp) {
        self.protocol_fee_recipient = None;
        self.config_updated("protocol_fee_recipient", now);
    }

    // Emergency controls

    fn set_emergency(&mut self, state: EmergencyState, reason: Option<String>, now: Timestamp) {
        let transition = self.emergency.set_state(state, reason, now);
        if let Some(t) = &transition {
            log::warn!(
                "pool {}: emergency state {} -> {}",
                self.id,
                t.from.as_str(),
                t.to.as_str()
            );
        }
        self.apply_emergency(transition);
    }

    pub fn enable_emergency_mode(&mut self, reason: impl Into<String>, now: Timestamp) {
        self.set_emergency(EmergencyState::EmergencyMode, Some(reason.into()), now);
    }

    pub fn pause(&mut self, reason: impl Into<String>, now: Timestamp) {
        self.set_emergency(EmergencyState::Paused, Some(reason.into()), now);
    }

    pub fn enter_partial_mode(&mut self, reason: impl Into<String>, now: Timestamp) {
        self.set_emergency(EmergencyState::PartialMode, Some(reason.into()), now);
    }

    pub fn resume_normal(&mut self, now: Timestamp) {
        self.set_emergency(EmergencyState::Normal, None, now);
    }

    // Bonus lottery weight

    /// Replace the receiver's bonus weight
    pub fn set_bonus_weight(
        &mut self,
        receiver: ReceiverId,
        weight: UFix64,
        reason: Option<String>,
        now: Timestamp,
    ) -> Result<(), PrizeVaultError> {
        let record = self
            .receivers
            .get(&receiver)
            .ok_or(PrizeVaultError::ReceiverNotFound(receiver))?;
        if record.is_sponsor {
            return Err(PrizeVaultError::ReceiverRoleMismatch(receiver));
        }
        if self.state(now) == DrawPhase::DrawProcessing {
            return Err(PrizeVaultError::DrawInProgress);
        }

        let old = self.effective_balance(receiver);
        if let Some(r) = self.receivers.get_mut(&receiver) {
            r.bonus_weight = weight;
            r.bonus_reason = reason.clone();
        }
        self.record_balance_change(receiver, old, now);

        self.emit(PoolEvent::BonusWeightChanged {
            pool_id: self.id,
            receiver,
            bonus_weight: weight,
            reason,
        });
        Ok(())
    }

    pub fn remove_bonus_weight(&mut self, receiver: ReceiverId, now: Timestamp) -> Result<(), PrizeVaultError> {
        self.set_bonus_weight(receiver, UFix64::ZERO, None, now)
    }
}

#[cfg(test)]
mod tests {
    use crate::mocks::{BlockRandomnessOracle, MockYieldVenue};
    use crate::state::{DrawPhase, EmergencyState, Pool, PoolConfig};
    use crate::strategy::{DistributionStrategy, PrizeDistribution};
    use prizevault_common::{PrizeVaultError, UFix64};

    fn ufix(s: &str) -> UFix64 {
        s.parse().unwrap()
    }

    fn setup() -> (Pool, MockYieldVenue) {
        let venue = MockYieldVenue::new();
        let config = PoolConfig::new(
            "USDC",
            ufix("1"),
            100,
            DistributionStrategy::new(ufix("0.5"), ufix("0.4"), ufix("0.1")).unwrap(),
            PrizeDistribution::single_winner(),
        );
        let pool = Pool::new(
            1,
            config,
            Box::new(venue.clone()),
            Box::new(BlockRandomnessOracle::new(1)),
            0,
        )
        .unwrap();
        (pool, venue)
    }

    #[test]
    fn test_update_round_target_end() {
        let (mut pool, _) = setup();
        assert!(pool.update_round_target_end(50, 60).is_err());
        pool.update_round_target_end(150, 60).unwrap();
        assert_eq!(pool.state(120), DrawPhase::RoundActive);
        assert_eq!(pool.state(150), DrawPhase::AwaitingDraw);

        // once the round has ended the end is frozen
        let err = pool.update_round_target_end(300, 200).unwrap_err();
        assert!(matches!(err, PrizeVaultError::WrongPhase { .. }));
    }

    #[test]
    fn test_draw_interval_applies_to_next_round() {
        let (mut pool, _) = setup();
        pool.update_draw_interval(500, 10).unwrap();
        assert_eq!(pool.status(10).round_target_end, Some(100));
        assert!(pool.update_draw_interval(0, 10).is_err());
    }

    #[test]
    fn test_distribution_swap_settles_pending_yield_first() {
        let (mut pool, venue) = setup();
        pool.deposit(1, ufix("100"), 0).unwrap();
        venue.inject_yield(ufix("10"));
        let all_prize = DistributionStrategy::new(UFix64::ZERO, UFix64::ONE, UFix64::ZERO).unwrap();
        pool.set_distribution_strategy(all_prize, 5).unwrap();
        assert_eq!(pool.prize_pool_balance(), ufix("4"));

        venue.inject_yield(ufix("10"));
        pool.sync_with_yield_source(6).unwrap();
        assert_eq!(pool.prize_pool_balance(), ufix("14"));
    }

    #[test]
    fn test_bonus_weight_adds_to_twab() {
        let (mut pool, _) = setup();
        pool.deposit(1, ufix("10"), 0).unwrap();
        pool.set_bonus_weight(1, ufix("10"), Some("promo".into()), 50).unwrap();
        // 10 * 50 + 20 * 50
        let info = pool.receiver_info(1, 100).unwrap();
        assert_eq!(info.current_weight, ufix("10").to_weight(50) + ufix("20").to_weight(50));
        assert_eq!(info.bonus_weight, ufix("10"));

        pool.remove_bonus_weight(1, 100).unwrap();
        assert_eq!(pool.receiver_info(1, 100).unwrap().bonus_weight, UFix64::ZERO);
        assert_eq!(
            pool.set_bonus_weight(9, ufix("1"), None, 100),
            Err(PrizeVaultError::ReceiverNotFound(9))
        );
    }

    #[test]
    fn test_emergency_controls_emit_events() {
        let (mut pool, _) = setup();
        pool.drain_events();
        pool.enable_emergency_mode("incident", 1);
        assert_eq!(pool.emergency_state(), EmergencyState::EmergencyMode);
        assert_eq!(pool.emergency_info().reason.as_deref(), Some("incident"));
        pool.resume_normal(2);
        assert_eq!(pool.emergency_state(), EmergencyState::Normal);
        assert_eq!(pool.drain_events().len(), 2);
    }

    #[test]
    fn test_fee_recipient_validation() {
        let (mut pool, _) = setup();
        assert!(pool.set_protocol_fee_recipient("  ", 0).is_err());
        pool.set_protocol_fee_recipient("treasury", 0).unwrap();
        assert!(pool.protocol_fee_stats().has_recipient);
        pool.clear_protocol_fee_recipient(1);
        assert!(!pool.protocol_fee_stats().has_recipient);
    }
}
