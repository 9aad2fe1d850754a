//! Wired network components: conductors laid on the ground and their wetness.

use super::common::Axis;
use serde::{Deserialize, Serialize};

/// Signal id that no real signal ever uses
pub const NO_SIGNAL: u64 = 0;

/// What a conductor does with a signal it receives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConductorKind {
    /// Plain wire: passes to all four cardinal neighbours
    Transmitter,
    /// Wire crossing: passes only along the axis the signal arrived on
    Crossing,
    /// Originates signals, never receives
    Sender,
    /// Terminal: arms the explosive it is attached to
    Receiver,
}

/// Wired conductor component attached to a placed device
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conductor {
    pub kind: ConductorKind,
    /// Ticks of delay added per step travelled
    pub delay_per_step: f32,
    /// Last signal processed (horizontal axis for crossings).
    /// Ephemeral, never persisted.
    #[serde(skip)]
    pub last_signal: u64,
    /// Last signal processed on the vertical axis (crossings only)
    #[serde(skip)]
    pub last_signal_vertical: u64,
}

impl Conductor {
    pub fn new(kind: ConductorKind, delay_per_step: f32) -> Self {
        Self {
            kind,
            delay_per_step: delay_per_step.max(0.0),
            last_signal: NO_SIGNAL,
            last_signal_vertical: NO_SIGNAL,
        }
    }

    pub fn transmitter(delay_per_step: f32) -> Self {
        Self::new(ConductorKind::Transmitter, delay_per_step)
    }

    pub fn crossing(delay_per_step: f32) -> Self {
        Self::new(ConductorKind::Crossing, delay_per_step)
    }

    pub fn sender() -> Self {
        Self::new(ConductorKind::Sender, 0.0)
    }

    pub fn receiver(delay_per_step: f32) -> Self {
        Self::new(ConductorKind::Receiver, delay_per_step)
    }

    /// Has this conductor already handled `signal` on the given axis?
    /// Non-crossings ignore the axis: one signal, one pass.
    pub fn has_seen(&self, signal: u64, axis: Option<Axis>) -> bool {
        match (self.kind, axis) {
            (ConductorKind::Crossing, Some(Axis::Horizontal)) => self.last_signal == signal,
            (ConductorKind::Crossing, Some(Axis::Vertical)) => self.last_signal_vertical == signal,
            (ConductorKind::Crossing, None) => {
                self.last_signal == signal && self.last_signal_vertical == signal
            }
            _ => self.last_signal == signal,
        }
    }

    pub fn mark_seen(&mut self, signal: u64, axis: Option<Axis>) {
        match (self.kind, axis) {
            (ConductorKind::Crossing, Some(Axis::Horizontal)) => self.last_signal = signal,
            (ConductorKind::Crossing, Some(Axis::Vertical)) => self.last_signal_vertical = signal,
            (ConductorKind::Crossing, None) => {
                self.last_signal = signal;
                self.last_signal_vertical = signal;
            }
            _ => self.last_signal = signal,
        }
    }

    /// Arming delay for a signal that has travelled `steps`
    pub fn delay_for(&self, steps: u32) -> u64 {
        (steps as f32 * self.delay_per_step).round().max(0.0) as u64
    }

    /// Forget in-flight signal ids (after load)
    pub fn reset_signal(&mut self) {
        self.last_signal = NO_SIGNAL;
        self.last_signal_vertical = NO_SIGNAL;
    }
}

/// How wet a conductor is (0 = dry, 1 = soaked)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Wetness {
    pub value: f32,
}

impl Wetness {
    pub fn new(value: f32) -> Self {
        Self {
            value: value.clamp(0.0, 1.0),
        }
    }

    pub fn is_dry(&self) -> bool {
        self.value <= 0.0
    }

    /// Dry out by `amount`, never below zero
    pub fn dry(&mut self, amount: f32) {
        self.value = (self.value - amount).max(0.0);
    }

    /// Probability that a signal fails to pass at this wetness
    pub fn failure_chance(&self, chance_when_soaked: f32) -> f32 {
        (self.value * chance_when_soaked).clamp(0.0, 1.0)
    }
}
