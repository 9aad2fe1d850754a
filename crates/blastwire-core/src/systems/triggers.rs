//! Trigger sources - where signals come from
//!
//! Sources hold no graph logic. They decide which network a firing goes
//! to and keep the "wants to fire" flag the colonist job layer watches.

use hecs::{Entity, World};

use crate::components::{
    Cell, Conductor, ConductorKind, Position, ProximitySensor, TriggerSource, WirelessNode,
};
use crate::error::{NetworkError, NetworkResult};

/// Network a source fires into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireRoute {
    /// Flood the conductors at this cell
    Wired { origin: Cell },
    /// Trigger this channel through the source's own node
    Wireless { channel: u32 },
}

fn source_of(world: &World, source: Entity) -> NetworkResult<TriggerSource> {
    if !world.contains(source) {
        return Err(NetworkError::NoSuchEntity(source));
    }
    world
        .get::<&TriggerSource>(source)
        .map(|s| (*s).clone())
        .map_err(|_| NetworkError::MissingComponent {
            entity: source,
            component: "TriggerSource",
        })
}

/// Work out how `source` fires
pub fn fire_route(world: &World, source: Entity) -> NetworkResult<FireRoute> {
    let trigger = source_of(world, source)?;
    if trigger.kind.is_wired() {
        let is_sender = world
            .get::<&Conductor>(source)
            .map(|c| c.kind == ConductorKind::Sender)
            .unwrap_or(false);
        if !is_sender {
            return Err(NetworkError::MissingComponent {
                entity: source,
                component: "Conductor",
            });
        }
        let origin = world
            .get::<&Position>(source)
            .map(|p| p.cell)
            .map_err(|_| NetworkError::MissingComponent {
                entity: source,
                component: "Position",
            })?;
        return Ok(FireRoute::Wired { origin });
    }

    if world.get::<&WirelessNode>(source).is_err() {
        return Err(NetworkError::MissingComponent {
            entity: source,
            component: "WirelessNode",
        });
    }
    Ok(FireRoute::Wireless {
        channel: trigger.channel,
    })
}

/// Raise or lower the "wants to fire" flag
pub fn set_fire_request(world: &World, source: Entity, wanted: bool) -> NetworkResult<()> {
    source_of(world, source)?;
    if let Ok(mut trigger) = world.get::<&mut TriggerSource>(source) {
        trigger.wants_to_fire = wanted;
    }
    Ok(())
}

/// Sources waiting for a colonist to fire them
pub fn pending_fire_requests(world: &World) -> Vec<Entity> {
    let mut pending: Vec<Entity> = world
        .query::<&TriggerSource>()
        .iter()
        .filter(|(_, t)| t.wants_to_fire)
        .map(|(e, _)| e)
        .collect();
    pending.sort_by_key(|e| e.to_bits());
    pending
}

/// Arm or disarm a proximity sensor. Returns false if `sensor` is not one.
pub fn set_sensor_armed(world: &World, sensor: Entity, armed: bool) -> bool {
    match world.get::<&mut ProximitySensor>(sensor) {
        Ok(mut state) => {
            state.armed = armed;
            true
        }
        Err(_) => false,
    }
}

/// Check a sensor against an intruder and, if it should go off, stamp
/// its cooldown. Returns true when the sensor fires.
pub fn sensor_trips(
    world: &World,
    sensor: Entity,
    intruder: Cell,
    now: u64,
    cooldown: u64,
) -> NetworkResult<bool> {
    let cell = world
        .get::<&Position>(sensor)
        .map(|p| p.cell)
        .map_err(|_| NetworkError::NoSuchEntity(sensor))?;
    let mut state = world
        .get::<&mut ProximitySensor>(sensor)
        .map_err(|_| NetworkError::MissingComponent {
            entity: sensor,
            component: "ProximitySensor",
        })?;
    if !state.detects(&cell, &intruder) || state.is_cooling_down(now, cooldown) {
        return Ok(false);
    }
    state.last_triggered = Some(now);
    Ok(true)
}
