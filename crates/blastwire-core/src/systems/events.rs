//! Network events - what the UI layer shows the player
//!
//! Events are appended as they happen and drained by whoever renders
//! messages. Nothing in the network reads them back.

use hecs::Entity;
use serde::{Deserialize, Serialize};

use crate::components::Cell;

/// Something the player should hear about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetworkEvent {
    /// A wireless trigger found nothing to fire on its channel
    NoTargets {
        #[serde(with = "crate::entity_serde")]
        source: Entity,
        channel: u32,
    },
    WickLit {
        #[serde(with = "crate::entity_serde")]
        charge: Entity,
        ends_at: u64,
    },
    Detonated {
        #[serde(with = "crate::entity_serde")]
        charge: Entity,
        cell: Cell,
    },
    SwitchToggled {
        #[serde(with = "crate::entity_serde")]
        switch: Entity,
        on: bool,
    },
    /// A wet conductor shorted out and was destroyed
    ConductorFailed { cell: Cell },
    FireStarted { cell: Cell },
}

impl NetworkEvent {
    /// Player-facing message
    pub fn message(&self) -> String {
        match self {
            NetworkEvent::NoTargets { channel, .. } => {
                format!("No receivers on channel {} responded", channel)
            }
            NetworkEvent::WickLit { ends_at, .. } => format!("Wick lit, burns out at tick {}", ends_at),
            NetworkEvent::Detonated { cell, .. } => format!("Charge detonated at {}", cell),
            NetworkEvent::SwitchToggled { on, .. } => {
                format!("Switch turned {}", if *on { "on" } else { "off" })
            }
            NetworkEvent::ConductorFailed { cell } => format!("Wet wire shorted out at {}", cell),
            NetworkEvent::FireStarted { cell } => format!("Sparks started a fire at {}", cell),
        }
    }
}

/// Append-only event buffer
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<NetworkEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: NetworkEvent) {
        log::debug!("{}", event.message());
        self.events.push(event);
    }

    pub fn events(&self) -> &[NetworkEvent] {
        &self.events
    }

    pub fn drain(&mut self) -> Vec<NetworkEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_empties() {
        let mut log = EventLog::new();
        log.push(NetworkEvent::FireStarted { cell: Cell::new(1, 2) });
        log.push(NetworkEvent::ConductorFailed { cell: Cell::new(1, 2) });
        assert_eq!(log.len(), 2);
        let drained = log.drain();
        assert_eq!(drained.len(), 2);
        assert!(log.is_empty());
    }

    #[test]
    fn test_messages() {
        let e = NetworkEvent::FireStarted { cell: Cell::new(4, 5) };
        assert_eq!(e.message(), "Sparks started a fire at (4, 5)");
    }
}
