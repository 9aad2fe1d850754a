//! Component definitions for the device world.
//!
//! Components are plain data attached to placed devices.
//! Behaviour lives in systems.

mod common;
mod devices;
mod wireless;
mod wiring;

pub use common::*;
pub use devices::*;
pub use wireless::*;
pub use wiring::*;
