//! Wireless node graph - range-based relay network
//!
//! Nodes link when each is inside the other's range (the smaller radius
//! wins) and at least one of the pair is not an endpoint. Adjacency is
//! cached per node and refreshed after `recache_interval` ticks, or as
//! soon as the removal epoch moves.
//!
//! Traversals are breadth-first with a visited set. Endpoints are leaves:
//! a walk may start at one but never passes through one.

use std::collections::{HashMap, HashSet, VecDeque};

use hecs::{Entity, World};

use crate::components::{AdjacencyCache, Cell, Position, WirelessNode};
use crate::systems::channels::{receivers_in_radius, ReceiverInfo};

/// Time context for adjacency caches
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphClock {
    pub now: u64,
    /// Bumped whenever a node leaves the map
    pub epoch: u64,
    pub recache_interval: u64,
}

/// Undirected link between two nodes, for overlays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NetworkLink {
    pub a: Entity,
    pub b: Entity,
    /// Both ends can transmit right now
    pub can_traverse: bool,
}

impl NetworkLink {
    /// Order-independent identity of the pair
    pub fn key(&self) -> (u64, u64) {
        pair_key(self.a, self.b)
    }

    pub fn connects(&self, x: Entity, y: Entity) -> bool {
        self.key() == pair_key(x, y)
    }
}

fn pair_key(a: Entity, b: Entity) -> (u64, u64) {
    let (a, b) = (a.to_bits().get(), b.to_bits().get());
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// A receiver paired with the relay closest to it
#[derive(Debug, Clone, PartialEq)]
pub struct RelayedReceiver {
    pub relay: Entity,
    pub receiver: ReceiverInfo,
    /// Squared distance from relay to receiver
    pub distance_sq: f32,
}

fn node_state(world: &World, node: Entity) -> Option<(Cell, WirelessNode)> {
    let pos = world.get::<&Position>(node).ok()?;
    let wireless = world.get::<&WirelessNode>(node).ok()?;
    Some((pos.cell, (*wireless).clone()))
}

fn can_transmit(world: &World, node: Entity) -> bool {
    world
        .get::<&WirelessNode>(node)
        .map(|n| n.can_transmit())
        .unwrap_or(false)
}

fn is_endpoint(world: &World, node: Entity) -> bool {
    world
        .get::<&WirelessNode>(node)
        .map(|n| n.is_endpoint)
        .unwrap_or(false)
}

/// Scan the map for nodes linked to `node`, ignoring any cache
pub fn scan_adjacent_nodes(world: &World, node: Entity) -> Vec<Entity> {
    let Some((cell, own)) = node_state(world, node) else {
        return Vec::new();
    };
    let mut adjacent: Vec<Entity> = world
        .query::<(&Position, &WirelessNode)>()
        .iter()
        .filter(|(other, (pos, theirs))| {
            *other != node
                && own.may_link(theirs)
                && cell.within_radius(&pos.cell, own.mutual_radius(theirs))
        })
        .map(|(other, _)| other)
        .collect();
    adjacent.sort_by_key(|e| e.to_bits());
    adjacent
}

/// Nodes linked to `node`, from its cache when still fresh
pub fn get_adjacent_nodes(world: &World, node: Entity, clock: &GraphClock) -> Vec<Entity> {
    if let Ok(cache) = world.get::<&AdjacencyCache>(node) {
        if !cache.is_stale(clock.now, clock.epoch, clock.recache_interval) {
            return cache.adjacent.clone();
        }
    }

    let adjacent = scan_adjacent_nodes(world, node);
    if let Ok(mut cache) = world.get::<&mut AdjacencyCache>(node) {
        cache.store(adjacent.clone(), clock.now, clock.epoch);
    }
    adjacent
}

/// Every node a signal from `start` can reach, `start` first, in
/// breadth-first order. Links are only used when both ends can transmit.
pub fn get_reachable_nodes(world: &World, start: Entity, clock: &GraphClock) -> Vec<Entity> {
    if world.get::<&WirelessNode>(start).is_err() {
        return Vec::new();
    }
    let mut reached = vec![start];
    if !can_transmit(world, start) {
        return reached;
    }

    let mut visited: HashSet<Entity> = HashSet::from([start]);
    let mut queue: VecDeque<Entity> = VecDeque::from([start]);
    while let Some(current) = queue.pop_front() {
        if current != start && is_endpoint(world, current) {
            continue;
        }
        for next in get_adjacent_nodes(world, current, clock) {
            if visited.contains(&next) || !can_transmit(world, next) {
                continue;
            }
            visited.insert(next);
            reached.push(next);
            queue.push_back(next);
        }
    }
    reached
}

/// Every link in the component around `start`, usable or not
pub fn get_all_links(world: &World, start: Entity, clock: &GraphClock) -> Vec<NetworkLink> {
    let mut links = Vec::new();
    if world.get::<&WirelessNode>(start).is_err() {
        return links;
    }

    let mut seen_pairs: HashSet<(u64, u64)> = HashSet::new();
    let mut visited: HashSet<Entity> = HashSet::from([start]);
    let mut queue: VecDeque<Entity> = VecDeque::from([start]);
    while let Some(current) = queue.pop_front() {
        if current != start && is_endpoint(world, current) {
            continue;
        }
        let current_ok = can_transmit(world, current);
        for next in get_adjacent_nodes(world, current, clock) {
            if seen_pairs.insert(pair_key(current, next)) {
                links.push(NetworkLink {
                    a: current,
                    b: next,
                    can_traverse: current_ok && can_transmit(world, next),
                });
            }
            if visited.insert(next) {
                queue.push_back(next);
            }
        }
    }
    links
}

/// Receivers within range of any node reachable from `start`, each paired
/// with its nearest relay. Ties keep the relay found first. A start node
/// that cannot transmit reaches nothing.
pub fn find_receivers_in_network_range(
    world: &World,
    start: Entity,
    clock: &GraphClock,
) -> Vec<RelayedReceiver> {
    let mut found: Vec<RelayedReceiver> = Vec::new();
    if !can_transmit(world, start) {
        return found;
    }
    let mut index: HashMap<Entity, usize> = HashMap::new();

    for relay in get_reachable_nodes(world, start, clock) {
        let Some((cell, node)) = node_state(world, relay) else {
            continue;
        };
        for receiver in receivers_in_radius(world, cell, node.radius) {
            let distance_sq = cell.distance_squared(&receiver.cell);
            match index.get(&receiver.entity) {
                Some(&i) => {
                    if distance_sq < found[i].distance_sq {
                        found[i].relay = relay;
                        found[i].distance_sq = distance_sq;
                    }
                }
                None => {
                    index.insert(receiver.entity, found.len());
                    found.push(RelayedReceiver {
                        relay,
                        receiver,
                        distance_sq,
                    });
                }
            }
        }
    }
    found
}
