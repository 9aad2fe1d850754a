//! Wireless relay components.

use hecs::Entity;
use serde::{Deserialize, Serialize};

/// Static properties of a wireless-capable device type
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WirelessNodeDef {
    /// Signal radius in cells
    pub radius: f32,
    /// Endpoints connect as leaves and never relay further
    pub is_endpoint: bool,
}

impl WirelessNodeDef {
    pub fn relay(radius: f32) -> Self {
        Self {
            radius,
            is_endpoint: false,
        }
    }

    pub fn endpoint(radius: f32) -> Self {
        Self {
            radius,
            is_endpoint: true,
        }
    }

    /// A node that can never connect to anything
    pub fn is_inert(&self) -> bool {
        !(self.radius.is_finite() && self.radius > 0.0)
    }
}

/// Wireless node component
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WirelessNode {
    pub radius: f32,
    pub is_endpoint: bool,
    /// Player toggle
    pub enabled: bool,
    /// Set by the power layer
    pub powered: bool,
}

impl WirelessNode {
    pub fn new(def: WirelessNodeDef) -> Self {
        Self {
            radius: if def.is_inert() { 0.0 } else { def.radius },
            is_endpoint: def.is_endpoint,
            enabled: true,
            powered: true,
        }
    }

    /// Can this node relay traffic right now?
    pub fn can_transmit(&self) -> bool {
        self.enabled && self.powered
    }

    /// Range shared with another node: the smaller of the two radii
    pub fn mutual_radius(&self, other: &WirelessNode) -> f32 {
        self.radius.min(other.radius)
    }

    /// Two endpoints never link to each other directly
    pub fn may_link(&self, other: &WirelessNode) -> bool {
        !(self.is_endpoint && other.is_endpoint)
    }
}

/// Per-node adjacency cache. Owned by its node, never persisted.
#[derive(Debug, Clone, Default)]
pub struct AdjacencyCache {
    pub adjacent: Vec<Entity>,
    /// Tick of the last recompute; `None` until first computed
    pub computed_at: Option<u64>,
    /// Epoch the list was computed against
    pub epoch: u64,
}

impl AdjacencyCache {
    pub fn is_stale(&self, now: u64, epoch: u64, interval: u64) -> bool {
        match self.computed_at {
            None => true,
            Some(at) => epoch != self.epoch || now.saturating_sub(at) >= interval,
        }
    }

    pub fn store(&mut self, adjacent: Vec<Entity>, now: u64, epoch: u64) {
        self.adjacent = adjacent;
        self.computed_at = Some(now);
        self.epoch = epoch;
    }
}
