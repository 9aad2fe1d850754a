//! Blastwire Core - detonation signal network for remote explosives
//!
//! Carries a "fire" signal from trigger sources (detonators, tables,
//! proximity sensors) to remote charges and switches placed on a map.
//!
//! # Architecture
//!
//! Devices are entities in a `hecs` world:
//! - **Wired network**: conductors on grid cells. A signal floods outward
//!   from the sender one cell per step, and each receiver it reaches is
//!   armed after a delay proportional to the path length.
//! - **Wireless network**: nodes that link when within each other's radius.
//!   Relays forward, endpoints only talk to relays. Receivers near any
//!   reachable relay are triggered one by one by channel.
//! - **Scheduler**: delayed deliveries, owned by the device that caused them.
//!
//! # Example
//!
//! ```rust,no_run
//! use blastwire_core::prelude::*;
//!
//! let mut engine = NetworkEngine::new(100, 100);
//! let table = engine
//!     .place_table(Cell::new(10, 10), WirelessNodeDef::relay(12.0), 1)
//!     .unwrap();
//! engine.place_charge(Cell::new(14, 10), 1).unwrap();
//!
//! engine.fire(table).unwrap();
//! engine.run_ticks(200);
//! ```

pub mod components;
pub mod config;
pub mod engine;
mod entity_serde;
pub mod error;
pub mod grid;
pub mod persistence;
pub mod scheduler;
pub mod systems;

/// Commonly used types for convenient importing
pub mod prelude {
    pub use crate::components::*;
    pub use crate::config::NetworkSettings;
    pub use crate::engine::{FireOutcome, NetworkEngine};
    pub use crate::error::{NetworkError, NetworkResult};
    pub use crate::systems::{NetworkEvent, TriggerOutcome};
}
