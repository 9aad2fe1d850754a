//! Burning wicks on lit charges

use hecs::{Entity, World};

use crate::components::{Cell, Position, RemoteCharge};

/// Charges whose wick has burned out by `now`, with their cells.
/// The caller removes them and records the detonation.
pub fn burned_out_charges(world: &World, now: u64) -> Vec<(Entity, Cell)> {
    let mut out: Vec<(Entity, Cell)> = world
        .query::<(&RemoteCharge, &Position)>()
        .iter()
        .filter(|(_, (charge, _))| charge.should_detonate(now))
        .map(|(entity, (_, pos))| (entity, pos.cell))
        .collect();
    out.sort_by_key(|(e, _)| e.to_bits());
    out
}

/// Arm or disarm a charge. Disarming puts out a lit wick.
/// Returns false if `entity` is not a charge.
pub fn set_armed(world: &World, entity: Entity, armed: bool) -> bool {
    let Ok(mut charge) = world.get::<&mut RemoteCharge>(entity) else {
        return false;
    };
    charge.armed = armed;
    if !armed && charge.is_lit() {
        log::info!("wick on {:?} put out", entity);
        charge.extinguish();
    }
    true
}
