//! Devices on the network: receivers (charges, switches) and trigger sources.

use super::common::Cell;
use serde::{Deserialize, Serialize};

/// What happened when a receiver took a signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiveEffect {
    /// Wick lit, burns out at the given tick
    WickLit { ends_at: u64 },
    /// Switch flipped to the given state
    Toggled { on: bool },
    /// Receiver was not in a state to accept the signal
    Ignored,
}

/// Capability shared by everything a delivered signal can act on.
///
/// Implemented by a small closed set of components; the channel router
/// collects each implementer with a typed query.
pub trait DetonationReceiver {
    fn channel(&self) -> u32;
    fn set_channel(&mut self, channel: u32);
    fn can_receive(&self) -> bool;
    fn kind_label(&self) -> &'static str;
    fn receive(&mut self, now: u64, wick_ticks: u64) -> ReceiveEffect;
}

/// Remote explosive charge
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteCharge {
    pub channel: u32,
    pub armed: bool,
    /// Tick at which the lit wick burns out
    pub wick_ends_at: Option<u64>,
}

impl RemoteCharge {
    pub fn new(channel: u32) -> Self {
        Self {
            channel,
            armed: true,
            wick_ends_at: None,
        }
    }

    pub fn is_lit(&self) -> bool {
        self.wick_ends_at.is_some()
    }

    /// Has the wick burned down by `now`?
    pub fn should_detonate(&self, now: u64) -> bool {
        matches!(self.wick_ends_at, Some(at) if now >= at)
    }

    /// Put out a lit wick (e.g. when disarmed mid-burn)
    pub fn extinguish(&mut self) {
        self.wick_ends_at = None;
    }
}

impl DetonationReceiver for RemoteCharge {
    fn channel(&self) -> u32 {
        self.channel
    }

    fn set_channel(&mut self, channel: u32) {
        self.channel = channel;
    }

    fn can_receive(&self) -> bool {
        self.armed && !self.is_lit()
    }

    fn kind_label(&self) -> &'static str {
        "charge"
    }

    fn receive(&mut self, now: u64, wick_ticks: u64) -> ReceiveEffect {
        if !self.can_receive() {
            return ReceiveEffect::Ignored;
        }
        let ends_at = now.saturating_add(wick_ticks);
        self.wick_ends_at = Some(ends_at);
        ReceiveEffect::WickLit { ends_at }
    }
}

/// Remotely switchable device (lights, doors, power switches)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteSwitch {
    pub channel: u32,
    pub on: bool,
}

impl RemoteSwitch {
    pub fn new(channel: u32, on: bool) -> Self {
        Self { channel, on }
    }
}

impl DetonationReceiver for RemoteSwitch {
    fn channel(&self) -> u32 {
        self.channel
    }

    fn set_channel(&mut self, channel: u32) {
        self.channel = channel;
    }

    fn can_receive(&self) -> bool {
        true
    }

    fn kind_label(&self) -> &'static str {
        "switch"
    }

    fn receive(&mut self, _now: u64, _wick_ticks: u64) -> ReceiveEffect {
        self.on = !self.on;
        ReceiveEffect::Toggled { on: self.on }
    }
}

/// Kinds of devices that originate signals
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TriggerKind {
    /// Lever wired into the conductor network
    ManualDetonator,
    /// Table with a wireless node
    DetonatorTable,
    /// Fires itself when something comes close
    ProximitySensor,
    /// Carried by a colonist, acts as a mobile wireless endpoint
    PortableDetonator,
}

impl TriggerKind {
    pub fn is_wired(&self) -> bool {
        matches!(self, TriggerKind::ManualDetonator)
    }
}

/// Trigger source component
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerSource {
    pub kind: TriggerKind,
    /// Channel addressed when firing wirelessly
    pub channel: u32,
    /// Flag read by the colonist job layer
    pub wants_to_fire: bool,
}

impl TriggerSource {
    pub fn new(kind: TriggerKind, channel: u32) -> Self {
        Self {
            kind,
            channel,
            wants_to_fire: false,
        }
    }
}

/// Detection state of a proximity sensor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProximitySensor {
    /// Detection radius in cells
    pub radius: f32,
    pub armed: bool,
    /// Tick of the last automatic trigger
    pub last_triggered: Option<u64>,
}

impl ProximitySensor {
    pub fn new(radius: f32) -> Self {
        Self {
            radius,
            armed: true,
            last_triggered: None,
        }
    }

    pub fn detects(&self, own: &Cell, intruder: &Cell) -> bool {
        self.armed && own.within_radius(intruder, self.radius)
    }

    pub fn is_cooling_down(&self, now: u64, cooldown: u64) -> bool {
        matches!(self.last_triggered, Some(at) if now.saturating_sub(at) < cooldown)
    }
}
