//! Environment layer: wet conductors drying out, and what happens to the
//! ones that fail to pass a signal.

use hecs::{Entity, World};
use rand::Rng;

use crate::components::{Cell, Position, Wetness};

/// Fate of a conductor that failed its passage test
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConductorFailure {
    pub conductor: Entity,
    pub cell: Cell,
    pub ignited: bool,
}

/// Decide which failed conductors start fires. The caller removes them.
pub fn resolve_failures<R: Rng>(
    world: &World,
    failed: &[Entity],
    rng: &mut R,
    fire_chance: f32,
) -> Vec<ConductorFailure> {
    failed
        .iter()
        .filter_map(|&conductor| {
            let cell = world.get::<&Position>(conductor).ok()?.cell;
            let ignited = fire_chance > 0.0 && rng.gen_bool(fire_chance.min(1.0) as f64);
            Some(ConductorFailure {
                conductor,
                cell,
                ignited,
            })
        })
        .collect()
}

/// Dry every wet conductor by `rate`
pub fn dry_conductors(world: &mut World, rate: f32) {
    if rate <= 0.0 {
        return;
    }
    for (_, wetness) in world.query_mut::<&mut Wetness>() {
        if !wetness.is_dry() {
            wetness.dry(rate);
        }
    }
}
