//! Logging enforcer

use tracing::info;

use warden_host_api::{Enforcer, HostResult};

/// Records decisions in the log and nothing else.
///
/// OS-level effects are left to clients subscribed to the daemon's
/// `BlockDecisionChanged` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEnforcer;

impl TracingEnforcer {
    pub fn new() -> Self {
        Self
    }
}

impl Enforcer for TracingEnforcer {
    fn on_block_decision_changed(&self, name: &str, blocked: bool) -> HostResult<()> {
        if blocked {
            info!(name = %name, "Distraction blocked");
        } else {
            info!(name = %name, "Distraction released");
        }
        Ok(())
    }
}
