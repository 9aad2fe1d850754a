//! Save/Load for a map's detonation network
//!
//! Uses bincode. Each device stores only its own small state; entity ids
//! are kept so queued deliveries still point at the right devices after a
//! load. Adjacency caches and in-flight signal ids are not saved.

use hecs::{Entity, World};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use thiserror::Error;

use crate::components::*;
use crate::config::NetworkSettings;
use crate::engine::NetworkEngine;
use crate::grid::{MapGrid, MapSize};
use crate::scheduler::DelayScheduler;

/// Version number for save format (increment when format changes)
const SAVE_VERSION: u32 = 1;

/// Serializable snapshot of a network
#[derive(Serialize, Deserialize)]
pub struct SaveData {
    pub version: u32,
    pub tick: u64,
    pub epoch: u64,
    pub settings: NetworkSettings,
    pub map_size: MapSize,
    pub scheduler: DelayScheduler,
    pub devices: Vec<SerializableDevice>,
}

/// All persisted components of a device, as optionals
#[derive(Serialize, Deserialize)]
pub struct SerializableDevice {
    #[serde(with = "crate::entity_serde")]
    pub entity: Entity,
    pub position: Option<Position>,
    pub label: Option<Label>,

    // Wired
    pub conductor: Option<Conductor>,
    pub wetness: Option<Wetness>,

    // Wireless
    pub wireless: Option<WirelessNode>,

    // Receivers
    pub charge: Option<RemoteCharge>,
    pub switch: Option<RemoteSwitch>,

    // Sources
    pub trigger: Option<TriggerSource>,
    pub sensor: Option<ProximitySensor>,
}

fn cloned<T: hecs::Component + Clone>(entity: hecs::EntityRef<'_>) -> Option<T> {
    entity.get::<&T>().map(|c| (*c).clone())
}

fn serialize_devices(world: &World) -> Vec<SerializableDevice> {
    let mut devices: Vec<SerializableDevice> = world
        .iter()
        .map(|e| SerializableDevice {
            entity: e.entity(),
            position: cloned(e),
            label: cloned(e),
            conductor: cloned(e),
            wetness: cloned(e),
            wireless: cloned(e),
            charge: cloned(e),
            switch: cloned(e),
            trigger: cloned(e),
            sensor: cloned(e),
        })
        .collect();
    devices.sort_by_key(|d| d.entity.to_bits());
    devices
}

fn spawn_device(world: &mut World, grid: &mut MapGrid, device: SerializableDevice) {
    let entity = device.entity;
    world.spawn_at(entity, ());

    if let Some(c) = device.position {
        grid.insert(c.cell, entity);
        let _ = world.insert_one(entity, c);
    }
    if let Some(c) = device.label {
        let _ = world.insert_one(entity, c);
    }
    if let Some(mut c) = device.conductor {
        c.reset_signal();
        let _ = world.insert_one(entity, c);
    }
    if let Some(c) = device.wetness {
        let _ = world.insert_one(entity, c);
    }
    if let Some(c) = device.wireless {
        let _ = world.insert(entity, (c, AdjacencyCache::default()));
    }
    if let Some(c) = device.charge {
        let _ = world.insert_one(entity, c);
    }
    if let Some(c) = device.switch {
        let _ = world.insert_one(entity, c);
    }
    if let Some(c) = device.trigger {
        let _ = world.insert_one(entity, c);
    }
    if let Some(c) = device.sensor {
        let _ = world.insert_one(entity, c);
    }
}

/// Save the network to a writer
pub fn save_network<W: Write>(writer: W, engine: &NetworkEngine) -> Result<(), SaveError> {
    let save_data = SaveData {
        version: SAVE_VERSION,
        tick: engine.tick,
        epoch: engine.epoch,
        settings: engine.settings.clone(),
        map_size: engine.grid.size(),
        scheduler: engine.scheduler.clone(),
        devices: serialize_devices(&engine.world),
    };

    bincode::serialize_into(writer, &save_data)?;
    Ok(())
}

/// Load a network from a reader
pub fn load_network<R: Read>(reader: R) -> Result<LoadedNetwork, SaveError> {
    let save_data: SaveData = bincode::deserialize_from(reader)?;

    if save_data.version != SAVE_VERSION {
        return Err(SaveError::VersionMismatch {
            expected: SAVE_VERSION,
            found: save_data.version,
        });
    }

    let mut world = World::new();
    let mut grid = MapGrid::new(save_data.map_size.width, save_data.map_size.height);
    for device in save_data.devices {
        spawn_device(&mut world, &mut grid, device);
    }

    Ok(LoadedNetwork {
        world,
        grid,
        tick: save_data.tick,
        epoch: save_data.epoch,
        settings: save_data.settings,
        scheduler: save_data.scheduler,
    })
}

/// Result of loading a network
pub struct LoadedNetwork {
    pub world: World,
    pub grid: MapGrid,
    pub tick: u64,
    pub epoch: u64,
    pub settings: NetworkSettings,
    pub scheduler: DelayScheduler,
}

/// Errors that can occur during save/load
#[derive(Debug, Error)]
pub enum SaveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Bincode(#[from] Box<bincode::ErrorKind>),
    #[error("Save version mismatch: expected {expected}, found {found}")]
    VersionMismatch { expected: u32, found: u32 },
}
