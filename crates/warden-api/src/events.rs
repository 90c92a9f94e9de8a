//! Event types for wardend -> client streaming

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::{PolicyView, API_VERSION};

/// Event envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub api_version: u32,
    pub timestamp: DateTime<Local>,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(payload: EventPayload) -> Self {
        Self {
            api_version: API_VERSION,
            timestamp: warden_util::now(),
            payload,
        }
    }
}

/// All possible events from the daemon to clients
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventPayload {
    /// A watched name flipped between blocked and allowed.
    ///
    /// External enforcers (hosts file writers, process reapers) act on this.
    BlockDecisionChanged { name: String, blocked: bool },

    /// The policy document was rewritten
    PolicyChanged(PolicyView),

    /// Daemon is shutting down
    Shutdown,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_serialization() {
        let event = Event::new(EventPayload::BlockDecisionChanged {
            name: "chromium".into(),
            blocked: true,
        });

        let json = serde_json::to_string(&event).unwrap();
        let parsed: Event = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.api_version, API_VERSION);
        assert!(matches!(
            parsed.payload,
            EventPayload::BlockDecisionChanged { ref name, blocked: true } if name == "chromium"
        ));
    }
}
