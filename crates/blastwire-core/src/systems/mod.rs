//! Systems - logic that operates on device components

pub mod channels;
pub mod environment;
pub mod events;
pub mod triggers;
pub mod wicks;
pub mod wired;
pub mod wireless;

pub use channels::*;
pub use environment::*;
pub use events::*;
pub use triggers::*;
pub use wicks::*;
pub use wired::*;
pub use wireless::*;
