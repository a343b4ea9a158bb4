//! JSON status snapshot of every pool the keeper drives

use anyhow::{Context, Result};
use prizevault_common::Timestamp;
use prizevault_engine::{
    DrawResult, DrawStatus, EmergencyInfo, PoolRegistry, PoolStatus, ProtocolFeeStats,
};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct PoolSnapshot {
    pub status: PoolStatus,
    pub draw: DrawStatus,
    pub emergency: EmergencyInfo,
    pub protocol_fee: ProtocolFeeStats,
    pub last_draw: Option<DrawResult>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub generated_at: Timestamp,
    pub pools: Vec<PoolSnapshot>,
}

pub fn snapshot(registry: &PoolRegistry, now: Timestamp) -> StatusSnapshot {
    let pools = registry
        .pool_ids()
        .into_iter()
        .filter_map(|id| registry.pool(id).ok())
        .map(|pool| PoolSnapshot {
            status: pool.status(now),
            draw: pool.draw_status(now),
            emergency: pool.emergency_info(),
            protocol_fee: pool.protocol_fee_stats(),
            last_draw: pool.last_draw().cloned(),
        })
        .collect();
    StatusSnapshot {
        generated_at: now,
        pools,
    }
}

pub fn write_snapshot(path: &str, snapshot: &StatusSnapshot) -> Result<()> {
    let json = serde_json::to_string_pretty(snapshot).context("Failed to serialize status")?;
    let expanded = shellexpand::tilde(path);
    std::fs::write(expanded.as_ref(), json)
        .with_context(|| format!("Failed to write status to {}", path))?;
    Ok(())
}
