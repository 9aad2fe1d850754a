//! Wired propagation - flood fill over conductors laid on the grid
//!
//! A signal spreads cell by cell through cardinal neighbours. Each
//! conductor remembers the last signal id it handled, which keeps cyclic
//! wiring from looping. The walk is an explicit breadth-first queue, so
//! each receiver is reached by its shortest wire path and the step cap is
//! a plain comparison.

use std::collections::{HashSet, VecDeque};

use hecs::{Entity, World};
use rand::Rng;

use crate::components::{Axis, Cell, Conductor, ConductorKind, Position, Wetness, NO_SIGNAL};
use crate::grid::GridQuery;

/// Environmental gate checked before a conductor passes a signal on
pub trait PassageTest {
    fn passes(&mut self, world: &World, conductor: Entity) -> bool;
}

impl<F: FnMut(&World, Entity) -> bool> PassageTest for F {
    fn passes(&mut self, world: &World, conductor: Entity) -> bool {
        self(world, conductor)
    }
}

/// Every conductor passes
pub struct AlwaysPass;

impl PassageTest for AlwaysPass {
    fn passes(&mut self, _world: &World, _conductor: Entity) -> bool {
        true
    }
}

/// Wet conductors fail with probability proportional to their wetness
pub struct WetnessTest<'a, R: Rng> {
    pub rng: &'a mut R,
    pub chance_when_soaked: f32,
}

impl<R: Rng> PassageTest for WetnessTest<'_, R> {
    fn passes(&mut self, world: &World, conductor: Entity) -> bool {
        let chance = match world.get::<&Wetness>(conductor) {
            Ok(wetness) => wetness.failure_chance(self.chance_when_soaked),
            Err(_) => return true,
        };
        chance <= 0.0 || !self.rng.gen_bool(chance as f64)
    }
}

/// Request to arm a wired receiver after `delay` ticks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArmRequest {
    pub receiver: Entity,
    pub delay: u64,
    pub steps: u32,
}

/// Result of one flood
#[derive(Debug, Clone, Default)]
pub struct SignalReport {
    pub signal: u64,
    /// Receivers to arm, in the order the flood reached them
    pub arm_requests: Vec<ArmRequest>,
    /// Conductors that failed their passage test; the flood stopped there
    pub failed: Vec<Entity>,
    /// Conductors that handled the signal
    pub conductors_reached: usize,
    /// The step cap cut the flood short
    pub truncated: bool,
}

/// Pick a fresh signal id. Zero is reserved for "nothing seen yet".
pub fn new_signal_id<R: Rng>(rng: &mut R) -> u64 {
    loop {
        let id: u64 = rng.gen();
        if id != NO_SIGNAL {
            return id;
        }
    }
}

struct Visit {
    node: Entity,
    steps: u32,
    source: Option<Cell>,
}

/// Axis a signal arrives on, judged by the cell it came from
fn arrival_axis(source: Option<Cell>, cell: Cell) -> Option<Axis> {
    match source {
        Some(src) if src != cell && src.z == cell.z => Some(Axis::Horizontal),
        Some(src) if src != cell && src.x == cell.x => Some(Axis::Vertical),
        _ => None,
    }
}

fn is_conductor(world: &World, entity: Entity) -> bool {
    world.get::<&Conductor>(entity).is_ok()
}

fn conductor_kind(world: &World, entity: Entity) -> Option<ConductorKind> {
    world.get::<&Conductor>(entity).ok().map(|c| c.kind)
}

/// Deliver `signal` to every conductor in `origin` and flood outward.
///
/// Conductors are updated in place; everything else is reported back to
/// the caller, which owns arming and the fate of failed conductors.
pub fn propagate_signal(
    world: &World,
    grid: &impl GridQuery,
    origin: Cell,
    signal: u64,
    max_steps: u32,
    passage: &mut impl PassageTest,
) -> SignalReport {
    let mut report = SignalReport {
        signal,
        ..Default::default()
    };
    let mut failed: HashSet<Entity> = HashSet::new();
    // (conductor, cell it would be entered from, its cell) past the cap
    let mut beyond_cap: Vec<(Entity, Cell, Cell)> = Vec::new();
    let mut queue: VecDeque<Visit> = grid
        .things_at(origin)
        .iter()
        .filter(|e| is_conductor(world, **e))
        .map(|&node| Visit {
            node,
            steps: 0,
            source: None,
        })
        .collect();

    while let Some(visit) = queue.pop_front() {
        if failed.contains(&visit.node) {
            continue;
        }
        let Ok(cell) = world.get::<&Position>(visit.node).map(|p| p.cell) else {
            continue;
        };
        let axis = arrival_axis(visit.source, cell);

        let kind = {
            let Ok(conductor) = world.get::<&Conductor>(visit.node) else {
                continue;
            };
            if conductor.kind == ConductorKind::Sender || conductor.has_seen(signal, axis) {
                continue;
            }
            conductor.kind
        };

        if !passage.passes(world, visit.node) {
            log::debug!("signal {:x} failed at {:?} in {}", signal, visit.node, cell);
            failed.insert(visit.node);
            report.failed.push(visit.node);
            continue;
        }

        let delay = match world.get::<&mut Conductor>(visit.node) {
            Ok(mut conductor) => {
                conductor.mark_seen(signal, axis);
                conductor.delay_for(visit.steps)
            }
            Err(_) => continue,
        };
        report.conductors_reached += 1;

        if kind == ConductorKind::Receiver {
            report.arm_requests.push(ArmRequest {
                receiver: visit.node,
                delay,
                steps: visit.steps,
            });
            continue;
        }

        // Receivers sharing this cell hear the signal without an extra step
        for &other in grid.things_at(cell) {
            if other != visit.node && conductor_kind(world, other) == Some(ConductorKind::Receiver) {
                queue.push_back(Visit {
                    node: other,
                    steps: visit.steps,
                    source: Some(cell),
                });
            }
        }

        let at_cap = visit.steps >= max_steps;
        let directions = match (kind, axis) {
            (ConductorKind::Crossing, Some(axis)) => axis.directions().to_vec(),
            _ => crate::components::Direction::CARDINAL.to_vec(),
        };
        for dir in directions {
            let next = cell.step(dir);
            if !grid.in_bounds(next) {
                continue;
            }
            for &other in grid.things_at(next) {
                if !is_conductor(world, other) {
                    continue;
                }
                if at_cap {
                    beyond_cap.push((other, cell, next));
                } else {
                    queue.push_back(Visit {
                        node: other,
                        steps: visit.steps + 1,
                        source: Some(cell),
                    });
                }
            }
        }
    }

    // Only conductors the flood never got to count as cut off
    report.truncated = beyond_cap.iter().any(|&(node, from, at)| {
        !failed.contains(&node)
            && world
                .get::<&Conductor>(node)
                .map(|c| {
                    c.kind != ConductorKind::Sender
                        && !c.has_seen(signal, arrival_axis(Some(from), at))
                })
                .unwrap_or(false)
    });
    if report.truncated {
        log::debug!(
            "signal {:x} from {} stopped at the {} step cap",
            signal,
            origin,
            max_steps
        );
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::MapGrid;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    struct Fixture {
        world: World,
        grid: MapGrid,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                world: World::new(),
                grid: MapGrid::new(32, 32),
            }
        }

        fn lay(&mut self, x: i32, z: i32, conductor: Conductor) -> Entity {
            let cell = Cell::new(x, z);
            let e = self.world.spawn((Position { cell }, conductor));
            self.grid.insert(cell, e);
            e
        }

        fn wire(&mut self, x: i32, z: i32) -> Entity {
            self.lay(x, z, Conductor::transmitter(1.0))
        }

        fn send(&self, x: i32, z: i32, signal: u64) -> SignalReport {
            propagate_signal(
                &self.world,
                &self.grid,
                Cell::new(x, z),
                signal,
                4096,
                &mut AlwaysPass,
            )
        }
    }

    fn armed(report: &SignalReport) -> Vec<Entity> {
        report.arm_requests.iter().map(|r| r.receiver).collect()
    }

    #[test]
    fn test_straight_run_delay() {
        let mut f = Fixture::new();
        f.lay(0, 0, Conductor::sender());
        f.wire(0, 0);
        f.wire(1, 0);
        f.wire(2, 0);
        let rx = f.lay(3, 0, Conductor::receiver(1.0));

        let report = f.send(0, 0, 11);
        assert_eq!(report.arm_requests.len(), 1);
        assert_eq!(report.arm_requests[0].receiver, rx);
        assert_eq!(report.arm_requests[0].delay, 3);
    }

    #[test]
    fn test_receiver_on_wire_tile() {
        let mut f = Fixture::new();
        f.wire(0, 0);
        f.wire(1, 0);
        f.wire(2, 0);
        let rx = f.lay(2, 0, Conductor::receiver(1.0));

        let report = f.send(0, 0, 5);
        assert_eq!(armed(&report), vec![rx]);
        assert_eq!(report.arm_requests[0].delay, 2);
    }

    #[test]
    fn test_loop_terminates_and_arms_once() {
        let mut f = Fixture::new();
        // 4x4 ring
        for i in 0..4 {
            f.wire(i, 0);
            f.wire(i, 3);
        }
        for j in 1..3 {
            f.wire(0, j);
            f.wire(3, j);
        }
        let rx = f.lay(3, 3, Conductor::receiver(1.0));

        let report = f.send(0, 0, 77);
        assert_eq!(armed(&report), vec![rx]);
        assert_eq!(report.conductors_reached, 13);

        // Same id again is a no-op
        let again = f.send(0, 0, 77);
        assert!(again.arm_requests.is_empty());
        assert_eq!(again.conductors_reached, 0);
    }

    #[test]
    fn test_diagonal_does_not_connect() {
        let mut f = Fixture::new();
        f.wire(0, 0);
        f.wire(1, 0);
        // second run starts diagonally off the first
        f.wire(2, 1);
        let rx = f.lay(3, 1, Conductor::receiver(1.0));

        let report = f.send(0, 0, 3);
        assert!(!armed(&report).contains(&rx));
        assert_eq!(report.conductors_reached, 2);
    }

    #[test]
    fn test_crossing_keeps_runs_apart() {
        let mut f = Fixture::new();
        // east-west run along z=2, north-south run along x=2, crossing at (2,2)
        for x in 0..5 {
            if x != 2 {
                f.wire(x, 2);
            }
        }
        for z in 0..5 {
            if z != 2 {
                f.wire(2, z);
            }
        }
        f.lay(2, 2, Conductor::crossing(1.0));
        let east = f.lay(5, 2, Conductor::receiver(1.0));
        let north = f.lay(2, 5, Conductor::receiver(1.0));

        let report = f.send(0, 2, 21);
        assert_eq!(armed(&report), vec![east]);
        assert!(!armed(&report).contains(&north));

        let report = f.send(2, 0, 22);
        assert_eq!(armed(&report), vec![north]);
    }

    #[test]
    fn test_crossing_handles_each_axis_once() {
        let mut f = Fixture::new();
        let crossing = f.lay(2, 2, Conductor::crossing(1.0));
        f.wire(1, 2);
        f.wire(2, 1);
        // feed both arms from a common wire
        f.wire(1, 1);

        let report = f.send(1, 1, 99);
        // crossing handled once per axis
        let c = f.world.get::<&Conductor>(crossing).unwrap();
        assert_eq!(c.last_signal, 99);
        assert_eq!(c.last_signal_vertical, 99);
        assert_eq!(report.conductors_reached, 5);
    }

    #[test]
    fn test_plain_wire_at_junction_connects() {
        let mut f = Fixture::new();
        for x in 0..5 {
            f.wire(x, 2);
        }
        for z in 0..5 {
            if z != 2 {
                f.wire(2, z);
            }
        }
        let north = f.lay(2, 5, Conductor::receiver(1.0));
        let report = f.send(0, 2, 8);
        assert_eq!(armed(&report), vec![north]);
    }

    #[test]
    fn test_sender_never_receives() {
        let mut f = Fixture::new();
        f.wire(0, 0);
        let sender = f.lay(1, 0, Conductor::sender());
        f.send(0, 0, 12);
        let c = f.world.get::<&Conductor>(sender).unwrap();
        assert_eq!(c.last_signal, NO_SIGNAL);
    }

    #[test]
    fn test_failed_branch_stops_other_continues() {
        let mut f = Fixture::new();
        // T junction at (1,0): east branch has a bad tile
        f.wire(0, 0);
        f.wire(1, 0);
        let bad = f.wire(2, 0);
        let east = f.lay(3, 0, Conductor::receiver(1.0));
        f.wire(1, 1);
        let north = f.lay(1, 2, Conductor::receiver(1.0));

        let mut gate = |_: &World, e: Entity| e != bad;
        let report = propagate_signal(&f.world, &f.grid, Cell::new(0, 0), 4, 4096, &mut gate);
        assert_eq!(report.failed, vec![bad]);
        assert_eq!(armed(&report), vec![north]);
        assert!(!armed(&report).contains(&east));
    }

    #[test]
    fn test_soaked_wire_fails_with_certain_chance() {
        let mut f = Fixture::new();
        f.wire(0, 0);
        let wet = f.wire(1, 0);
        f.world.insert_one(wet, Wetness::new(1.0)).unwrap();
        f.lay(2, 0, Conductor::receiver(1.0));

        let mut rng = StdRng::seed_from_u64(1);
        let mut test = WetnessTest {
            rng: &mut rng,
            chance_when_soaked: 1.0,
        };
        let report = propagate_signal(&f.world, &f.grid, Cell::new(0, 0), 6, 4096, &mut test);
        assert_eq!(report.failed, vec![wet]);
        assert!(report.arm_requests.is_empty());
    }

    #[test]
    fn test_step_cap() {
        let mut f = Fixture::new();
        for x in 0..20 {
            f.wire(x, 0);
        }
        let rx = f.lay(20, 0, Conductor::receiver(1.0));
        let report = propagate_signal(&f.world, &f.grid, Cell::new(0, 0), 2, 10, &mut AlwaysPass);
        assert!(report.truncated);
        assert!(!armed(&report).contains(&rx));
        assert_eq!(report.conductors_reached, 11);
    }

    #[test]
    fn test_run_ending_at_cap_is_not_truncated() {
        let mut f = Fixture::new();
        for x in 0..=10 {
            f.wire(x, 0);
        }
        let report = propagate_signal(&f.world, &f.grid, Cell::new(0, 0), 3, 10, &mut AlwaysPass);
        assert!(!report.truncated);
        assert_eq!(report.conductors_reached, 11);

        f.wire(11, 0);
        let report = propagate_signal(&f.world, &f.grid, Cell::new(0, 0), 4, 10, &mut AlwaysPass);
        assert!(report.truncated);
        assert_eq!(report.conductors_reached, 11);
    }

    #[test]
    fn test_signal_ids_nonzero() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..100 {
            assert_ne!(new_signal_id(&mut rng), NO_SIGNAL);
        }
    }
}
