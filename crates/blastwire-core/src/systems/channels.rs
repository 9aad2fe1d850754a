//! Channel routing - picks receivers on a channel and sequences delivery
//!
//! Receivers are any component implementing [`DetonationReceiver`]. Each
//! implementer is collected with its own typed query, then merged into one
//! list ordered by entity.

use std::collections::BTreeMap;

use hecs::{Component, Entity, World};

use crate::components::{
    Cell, DetonationReceiver, Label, Position, ReceiveEffect, RemoteCharge, RemoteSwitch,
};
use crate::scheduler::{DelayScheduler, ScheduledCommand};
use crate::systems::wireless::{find_receivers_in_network_range, GraphClock};

/// Snapshot of a receiver for routing and tooltips
#[derive(Debug, Clone, PartialEq)]
pub struct ReceiverInfo {
    pub entity: Entity,
    pub cell: Cell,
    pub channel: u32,
    pub can_receive: bool,
    pub label: String,
    pub kind: &'static str,
}

fn collect_receivers<T: DetonationReceiver + Component>(
    world: &World,
    center: Cell,
    radius: f32,
    out: &mut Vec<ReceiverInfo>,
) {
    for (entity, (pos, receiver, label)) in world
        .query::<(&Position, &T, Option<&Label>)>()
        .iter()
    {
        if !center.within_radius(&pos.cell, radius) {
            continue;
        }
        out.push(ReceiverInfo {
            entity,
            cell: pos.cell,
            channel: receiver.channel(),
            can_receive: receiver.can_receive(),
            label: label
                .map(|l| l.text.clone())
                .unwrap_or_else(|| receiver.kind_label().to_string()),
            kind: receiver.kind_label(),
        });
    }
}

/// All receivers within `radius` of `center`
pub fn receivers_in_radius(world: &World, center: Cell, radius: f32) -> Vec<ReceiverInfo> {
    let mut out = Vec::new();
    collect_receivers::<RemoteCharge>(world, center, radius, &mut out);
    collect_receivers::<RemoteSwitch>(world, center, radius, &mut out);
    out.sort_by_key(|r| r.entity.to_bits());
    out
}

fn try_receive<T: DetonationReceiver + Component>(
    world: &World,
    target: Entity,
    now: u64,
    wick_ticks: u64,
) -> Option<ReceiveEffect> {
    let mut receiver = world.get::<&mut T>(target).ok()?;
    Some(receiver.receive(now, wick_ticks))
}

/// Hand a signal to whatever receiver `target` carries
pub fn deliver_signal(
    world: &World,
    target: Entity,
    now: u64,
    wick_ticks: u64,
) -> Option<ReceiveEffect> {
    try_receive::<RemoteCharge>(world, target, now, wick_ticks)
        .or_else(|| try_receive::<RemoteSwitch>(world, target, now, wick_ticks))
}

fn try_set_channel<T: DetonationReceiver + Component>(
    world: &World,
    target: Entity,
    channel: u32,
) -> bool {
    match world.get::<&mut T>(target) {
        Ok(mut receiver) => {
            receiver.set_channel(channel);
            true
        }
        Err(_) => false,
    }
}

/// Retune a receiver. Returns false if `target` is not a receiver.
pub fn set_receiver_channel(world: &World, target: Entity, channel: u32) -> bool {
    try_set_channel::<RemoteCharge>(world, target, channel)
        || try_set_channel::<RemoteSwitch>(world, target, channel)
}

/// One delivery queued by [`trigger_receivers`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledDelivery {
    pub receiver: Entity,
    pub relay: Entity,
    pub delay: u64,
}

/// Outcome of a wireless trigger
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TriggerOutcome {
    Scheduled(Vec<ScheduledDelivery>),
    /// Nothing on that channel could take the signal
    NoTargets,
}

impl TriggerOutcome {
    pub fn delivery_count(&self) -> usize {
        match self {
            TriggerOutcome::Scheduled(d) => d.len(),
            TriggerOutcome::NoTargets => 0,
        }
    }
}

/// Schedule delivery to every ready receiver on `channel` reachable from
/// `origin`, nearest-to-relay first, `step_delay` ticks apart. Deliveries
/// are owned by `owner` and die with it.
pub fn trigger_receivers(
    world: &World,
    scheduler: &mut DelayScheduler,
    origin: Entity,
    channel: u32,
    owner: Entity,
    clock: &GraphClock,
    step_delay: u64,
) -> TriggerOutcome {
    let mut hits: Vec<_> = find_receivers_in_network_range(world, origin, clock)
        .into_iter()
        .filter(|h| h.receiver.channel == channel && h.receiver.can_receive)
        .collect();
    if hits.is_empty() {
        return TriggerOutcome::NoTargets;
    }

    // stable: equal distances keep discovery order
    hits.sort_by(|a, b| {
        a.distance_sq
            .partial_cmp(&b.distance_sq)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let deliveries = hits
        .iter()
        .enumerate()
        .map(|(i, hit)| {
            let delay = step_delay.saturating_mul(i as u64);
            scheduler.schedule(
                ScheduledCommand::DeliverSignal {
                    target: hit.receiver.entity,
                },
                clock.now,
                delay,
                owner,
            );
            ScheduledDelivery {
                receiver: hit.receiver.entity,
                relay: hit.relay,
                delay,
            }
        })
        .collect();
    TriggerOutcome::Scheduled(deliveries)
}

/// Receivers reachable from `origin`, grouped by channel
pub fn population_by_channel(
    world: &World,
    origin: Entity,
    clock: &GraphClock,
) -> BTreeMap<u32, Vec<ReceiverInfo>> {
    let mut by_channel: BTreeMap<u32, Vec<ReceiverInfo>> = BTreeMap::new();
    for hit in find_receivers_in_network_range(world, origin, clock) {
        by_channel
            .entry(hit.receiver.channel)
            .or_default()
            .push(hit.receiver);
    }
    by_channel
}

/// Tooltip lines: one per channel, with counts per label
pub fn channel_summary(population: &BTreeMap<u32, Vec<ReceiverInfo>>) -> Vec<String> {
    population
        .iter()
        .map(|(channel, receivers)| {
            let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
            for r in receivers {
                *counts.entry(r.label.as_str()).or_default() += 1;
            }
            let parts: Vec<String> = counts
                .iter()
                .map(|(label, n)| format!("{} x{}", label, n))
                .collect();
            format!("Channel {}: {}", channel, parts.join(", "))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{AdjacencyCache, WirelessNode, WirelessNodeDef};

    const CLOCK: GraphClock = GraphClock {
        now: 10,
        epoch: 0,
        recache_interval: 100,
    };

    fn relay(world: &mut World, x: i32, z: i32) -> Entity {
        world.spawn((
            Position::new(x, z),
            WirelessNode::new(WirelessNodeDef::relay(6.0)),
            AdjacencyCache::default(),
        ))
    }

    fn charge(world: &mut World, x: i32, z: i32, channel: u32) -> Entity {
        world.spawn((Position::new(x, z), RemoteCharge::new(channel)))
    }

    #[test]
    fn test_channel_filtering() {
        let mut world = World::new();
        let origin = relay(&mut world, 0, 0);
        let a = charge(&mut world, 1, 0, 1);
        let b = charge(&mut world, 3, 0, 1);
        charge(&mut world, 2, 0, 2);
        charge(&mut world, 0, 2, 3);
        let mut scheduler = DelayScheduler::new();

        let outcome = trigger_receivers(&world, &mut scheduler, origin, 1, origin, &CLOCK, 6);
        let TriggerOutcome::Scheduled(deliveries) = outcome else {
            panic!("expected deliveries");
        };
        assert_eq!(deliveries.len(), 2);
        assert_eq!(deliveries[0].receiver, a);
        assert_eq!(deliveries[0].delay, 0);
        assert_eq!(deliveries[1].receiver, b);
        assert_eq!(deliveries[1].delay, 6);
        assert_eq!(scheduler.len(), 2);
        assert!(scheduler
            .pending()
            .all(|(_, t)| [a, b].contains(&t.command.target())));
    }

    #[test]
    fn test_no_targets() {
        let mut world = World::new();
        let origin = relay(&mut world, 0, 0);
        charge(&mut world, 1, 0, 2);
        let lit = charge(&mut world, 2, 0, 1);
        world.get::<&mut RemoteCharge>(lit).unwrap().wick_ends_at = Some(50);
        let mut scheduler = DelayScheduler::new();

        let outcome = trigger_receivers(&world, &mut scheduler, origin, 1, origin, &CLOCK, 6);
        assert_eq!(outcome, TriggerOutcome::NoTargets);
        assert!(scheduler.is_empty());
    }

    #[test]
    fn test_huge_step_delay_saturates() {
        let mut world = World::new();
        let origin = relay(&mut world, 0, 0);
        charge(&mut world, 1, 0, 1);
        charge(&mut world, 2, 0, 1);
        charge(&mut world, 3, 0, 1);
        let mut scheduler = DelayScheduler::new();

        let outcome =
            trigger_receivers(&world, &mut scheduler, origin, 1, origin, &CLOCK, u64::MAX);
        let TriggerOutcome::Scheduled(deliveries) = outcome else {
            panic!("expected deliveries");
        };
        let delays: Vec<u64> = deliveries.iter().map(|d| d.delay).collect();
        assert_eq!(delays, vec![0, u64::MAX, u64::MAX]);
        assert_eq!(scheduler.len(), 3);
        assert!(scheduler.pending().all(|(id, _)| id.due >= CLOCK.now));
    }

    #[test]
    fn test_population_groups_and_summary() {
        let mut world = World::new();
        let origin = relay(&mut world, 0, 0);
        charge(&mut world, 1, 0, 1);
        charge(&mut world, 2, 0, 1);
        world.spawn((
            Position::new(0, 1),
            RemoteSwitch::new(2, false),
            Label::new("Hangar lights"),
        ));

        let population = population_by_channel(&world, origin, &CLOCK);
        assert_eq!(population.len(), 2);
        assert_eq!(population[&1].len(), 2);
        assert_eq!(population[&2][0].kind, "switch");

        let lines = channel_summary(&population);
        assert_eq!(lines[0], "Channel 1: charge x2");
        assert_eq!(lines[1], "Channel 2: Hangar lights x1");
    }

    #[test]
    fn test_population_empty_network() {
        let mut world = World::new();
        let origin = relay(&mut world, 0, 0);
        assert!(population_by_channel(&world, origin, &CLOCK).is_empty());
        let stray = world.spawn(());
        assert!(population_by_channel(&world, stray, &CLOCK).is_empty());
    }

    #[test]
    fn test_deliver_and_retune() {
        let mut world = World::new();
        let c = charge(&mut world, 0, 0, 1);
        let s = world.spawn((Position::new(1, 1), RemoteSwitch::new(1, true)));
        let nothing = world.spawn((Position::new(2, 2),));

        assert_eq!(
            deliver_signal(&world, c, 5, 20),
            Some(ReceiveEffect::WickLit { ends_at: 25 })
        );
        assert_eq!(
            deliver_signal(&world, s, 5, 20),
            Some(ReceiveEffect::Toggled { on: false })
        );
        assert_eq!(deliver_signal(&world, nothing, 5, 20), None);

        assert!(set_receiver_channel(&world, s, 3));
        assert_eq!(world.get::<&RemoteSwitch>(s).unwrap().channel, 3);
        assert!(!set_receiver_channel(&world, nothing, 3));
    }
}
