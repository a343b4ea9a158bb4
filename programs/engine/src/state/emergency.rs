//! Emergency state controller
//!
//! Every mutating pool entry point names its [`Operation`] and asks the
//! controller first. Admin reconfiguration is not gated. Automatic triggers
//! come from yield syncs (venue health) and venue shortfalls on withdrawal.

use prizevault_common::{PrizeVaultError, Timestamp, UFix64};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmergencyState {
    #[default]
    Normal,
    /// Deposits and draws blocked, withdrawals allowed
    Paused,
    /// Only withdrawals and syncs; recovered by an admin (or auto recovery)
    EmergencyMode,
    /// Degraded: capped deposits, fee forwarding held back
    PartialMode,
}

impl EmergencyState {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmergencyState::Normal => "Normal",
            EmergencyState::Paused => "Paused",
            EmergencyState::EmergencyMode => "EmergencyMode",
            EmergencyState::PartialMode => "PartialMode",
        }
    }
}

/// Mutating entry points subject to the allow-list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Deposit,
    Withdraw,
    FundPrize,
    Sync,
    StartDraw,
    ProcessBatch,
    RequestRandomness,
    CompleteDraw,
    StartNextRound,
    ForwardFee,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Deposit => "deposit",
            Operation::Withdraw => "withdraw",
            Operation::FundPrize => "fund_prize_pool",
            Operation::Sync => "sync_with_yield_source",
            Operation::StartDraw => "start_draw",
            Operation::ProcessBatch => "process_draw_batch",
            Operation::RequestRandomness => "request_draw_randomness",
            Operation::CompleteDraw => "complete_draw",
            Operation::StartNextRound => "start_next_round",
            Operation::ForwardFee => "forward_protocol_fee",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmergencyConfig {
    /// Auto-triggered emergencies clear after this long when auto recovery is on
    pub max_emergency_duration_secs: u64,
    pub auto_recovery_enabled: bool,
    /// Venue balance / allocated funds below this enters `EmergencyMode`
    pub min_yield_source_health: UFix64,
    /// Consecutive venue shortfalls that enter `EmergencyMode`
    pub max_withdraw_failures: u32,
    /// Per-deposit cap in `PartialMode`; `None` leaves deposits uncapped
    pub partial_mode_deposit_limit: Option<UFix64>,
}

impl Default for EmergencyConfig {
    fn default() -> Self {
        Self {
            max_emergency_duration_secs: 86_400,
            auto_recovery_enabled: true,
            min_yield_source_health: UFix64::from_raw(50_000_000), // 0.5
            max_withdraw_failures: 3,
            partial_mode_deposit_limit: None,
        }
    }
}

impl EmergencyConfig {
    pub fn validate(&self) -> Result<(), PrizeVaultError> {
        if self.min_yield_source_health > UFix64::ONE {
            return Err(PrizeVaultError::InvalidConfig(
                "min_yield_source_health must be at most 1.0".into(),
            ));
        }
        if self.max_withdraw_failures == 0 {
            return Err(PrizeVaultError::InvalidConfig(
                "max_withdraw_failures must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Detail payload for the emergency read surface
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmergencyInfo {
    pub state: EmergencyState,
    pub reason: Option<String>,
    pub activated_at: Option<Timestamp>,
    pub auto_triggered: bool,
    pub consecutive_withdraw_failures: u32,
    /// Venue health at the last sync, 1.0 when nothing is allocated
    pub last_health: UFix64,
}

/// State change produced by the controller, for the pool's event log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmergencyTransition {
    pub from: EmergencyState,
    pub to: EmergencyState,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmergencyController {
    config: EmergencyConfig,
    state: EmergencyState,
    reason: Option<String>,
    activated_at: Option<Timestamp>,
    auto_triggered: bool,
    consecutive_withdraw_failures: u32,
    last_health: UFix64,
}

impl EmergencyController {
    pub fn new(config: EmergencyConfig) -> Self {
        Self {
            config,
            state: EmergencyState::Normal,
            reason: None,
            activated_at: None,
            auto_triggered: false,
            consecutive_withdraw_failures: 0,
            last_health: UFix64::ONE,
        }
    }

    pub fn state(&self) -> EmergencyState {
        self.state
    }

    pub fn config(&self) -> &EmergencyConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: EmergencyConfig) {
        self.config = config;
    }

    pub fn is_allowed(&self, op: Operation) -> bool {
        use Operation::*;
        match self.state {
            EmergencyState::Normal => true,
            EmergencyState::Paused => matches!(op, Withdraw | Sync | FundPrize | ForwardFee),
            EmergencyState::EmergencyMode => matches!(op, Withdraw | Sync),
            EmergencyState::PartialMode => !matches!(op, ForwardFee),
        }
    }

    pub fn check(&self, op: Operation) -> Result<(), PrizeVaultError> {
        if self.is_allowed(op) {
            Ok(())
        } else {
            Err(PrizeVaultError::EmergencyStateViolation {
                state: self.state.as_str(),
                operation: op.as_str(),
            })
        }
    }

    /// Enforce the partial-mode deposit cap
    pub fn check_deposit(&self, amount: UFix64) -> Result<(), PrizeVaultError> {
        self.check(Operation::Deposit)?;
        if self.state == EmergencyState::PartialMode {
            if let Some(limit) = self.config.partial_mode_deposit_limit {
                if amount > limit {
                    return Err(PrizeVaultError::DepositLimitExceeded { amount, limit });
                }
            }
        }
        Ok(())
    }

    fn transition(
        &mut self,
        to: EmergencyState,
        reason: Option<String>,
        now: Timestamp,
        auto: bool,
    ) -> Option<EmergencyTransition> {
        let from = self.state;
        if from == to && self.reason == reason {
            return None;
        }
        self.state = to;
        self.reason = reason.clone();
        self.auto_triggered = auto;
        self.activated_at = if to == EmergencyState::Normal {
            None
        } else {
            Some(now)
        };
        if to == EmergencyState::Normal {
            self.consecutive_withdraw_failures = 0;
        }
        Some(EmergencyTransition { from, to, reason })
    }

    /// Admin transition to any state
    pub fn set_state(
        &mut self,
        to: EmergencyState,
        reason: Option<String>,
        now: Timestamp,
    ) -> Option<EmergencyTransition> {
        self.transition(to, reason, now, false)
    }

    /// Feed the health measured by a sync; may enter or leave `EmergencyMode`
    pub fn observe_health(&mut self, health: UFix64, now: Timestamp) -> Option<EmergencyTransition> {
        self.last_health = health;
        if health < self.config.min_yield_source_health {
            if self.state != EmergencyState::EmergencyMode {
                log::warn!(
                    "yield source health {} below minimum {}, entering emergency mode",
                    health,
                    self.config.min_yield_source_health
                );
                return self.transition(
                    EmergencyState::EmergencyMode,
                    Some(format!("yield source health {} below minimum", health)),
                    now,
                    true,
                );
            }
            return self.try_auto_recover(now);
        }
        self.try_auto_recover(now)
    }

    pub fn record_withdraw_failure(&mut self, now: Timestamp) -> Option<EmergencyTransition> {
        self.consecutive_withdraw_failures = self.consecutive_withdraw_failures.saturating_add(1);
        if self.consecutive_withdraw_failures >= self.config.max_withdraw_failures
            && self.state != EmergencyState::EmergencyMode
        {
            log::warn!(
                "{} consecutive withdraw failures, entering emergency mode",
                self.consecutive_withdraw_failures
            );
            return self.transition(
                EmergencyState::EmergencyMode,
                Some(format!(
                    "{} consecutive withdraw failures",
                    self.consecutive_withdraw_failures
                )),
                now,
                true,
            );
        }
        None
    }

    pub fn record_withdraw_success(&mut self) {
        self.consecutive_withdraw_failures = 0;
    }

    /// Clear an auto-triggered emergency once healthy again or past the
    /// maximum duration. Admin-set emergencies are never cleared here.
    pub fn try_auto_recover(&mut self, now: Timestamp) -> Option<EmergencyTransition> {
        if self.state != EmergencyState::EmergencyMode
            || !self.auto_triggered
            || !self.config.auto_recovery_enabled
        {
            return None;
        }
        let healthy = self.last_health >= self.config.min_yield_source_health
            && self.consecutive_withdraw_failures < self.config.max_withdraw_failures;
        let expired = self
            .activated_at
            .map(|at| now.saturating_sub(at) >= self.config.max_emergency_duration_secs)
            .unwrap_or(false);
        if healthy || expired {
            log::info!("auto recovery: emergency cleared (healthy={}, expired={})", healthy, expired);
            return self.transition(EmergencyState::Normal, None, now, false);
        }
        None
    }

    pub fn info(&self) -> EmergencyInfo {
        EmergencyInfo {
            state: self.state,
            reason: self.reason.clone(),
            activated_at: self.activated_at,
            auto_triggered: self.auto_triggered,
            consecutive_withdraw_failures: self.consecutive_withdraw_failures,
            last_health: self.last_health,
        }
    }
}
