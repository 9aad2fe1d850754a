//! Delay scheduler - deferred commands keyed by due tick.
//!
//! Work is stored as plain values rather than closures so the queue can be
//! saved with the map and purged by owner. Commands due on the same tick
//! run in the order they were scheduled.

use std::collections::BTreeMap;

use hecs::Entity;
use serde::{Deserialize, Serialize};

/// Deferred action on a receiver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ScheduledCommand {
    /// Wired arming: light the target's wick
    StartWick {
        #[serde(with = "crate::entity_serde")]
        target: Entity,
    },
    /// Wireless delivery to a receiver
    DeliverSignal {
        #[serde(with = "crate::entity_serde")]
        target: Entity,
    },
}

impl ScheduledCommand {
    pub fn target(&self) -> Entity {
        match self {
            ScheduledCommand::StartWick { target } | ScheduledCommand::DeliverSignal { target } => {
                *target
            }
        }
    }
}

/// A queued command with its owner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduledTask {
    #[serde(with = "crate::entity_serde")]
    pub owner: Entity,
    pub command: ScheduledCommand,
}

/// Handle returned by [`DelayScheduler::schedule`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId {
    pub due: u64,
    pub seq: u64,
}

/// Owner-tagged queue of deferred commands
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DelayScheduler {
    tasks: BTreeMap<TaskId, ScheduledTask>,
    next_seq: u64,
}

impl DelayScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `command` to run `delay` ticks after `now`
    pub fn schedule(
        &mut self,
        command: ScheduledCommand,
        now: u64,
        delay: u64,
        owner: Entity,
    ) -> TaskId {
        let id = TaskId {
            due: now.saturating_add(delay),
            seq: self.next_seq,
        };
        self.next_seq += 1;
        self.tasks.insert(id, ScheduledTask { owner, command });
        id
    }

    /// Drop every task owned by `owner`. Returns how many were dropped.
    pub fn cancel_owner(&mut self, owner: Entity) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|_, task| task.owner != owner);
        before - self.tasks.len()
    }

    /// Pop all commands due at or before `now`, in due order.
    /// Tasks whose owner is no longer alive are discarded.
    pub fn pop_due(&mut self, now: u64, is_alive: impl Fn(Entity) -> bool) -> Vec<ScheduledCommand> {
        let mut due = Vec::new();
        while let Some(entry) = self.tasks.first_entry() {
            if entry.key().due > now {
                break;
            }
            let task = entry.remove();
            if is_alive(task.owner) {
                due.push(task.command);
            } else {
                log::debug!("dropping {:?}: owner {:?} is gone", task.command, task.owner);
            }
        }
        due
    }

    pub fn pending(&self) -> impl Iterator<Item = (&TaskId, &ScheduledTask)> {
        self.tasks.iter()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hecs::World;

    fn entities(n: usize) -> (World, Vec<Entity>) {
        let mut world = World::new();
        let list = (0..n).map(|_| world.spawn(())).collect();
        (world, list)
    }

    #[test]
    fn test_fires_at_due_tick_in_order() {
        let (_world, e) = entities(3);
        let mut s = DelayScheduler::new();
        s.schedule(ScheduledCommand::DeliverSignal { target: e[1] }, 0, 5, e[0]);
        s.schedule(ScheduledCommand::DeliverSignal { target: e[2] }, 0, 5, e[0]);
        s.schedule(ScheduledCommand::StartWick { target: e[2] }, 0, 2, e[0]);

        assert!(s.pop_due(1, |_| true).is_empty());
        assert_eq!(
            s.pop_due(2, |_| true),
            vec![ScheduledCommand::StartWick { target: e[2] }]
        );
        assert_eq!(s.pending().next().map(|(id, _)| id.due), Some(5));
        assert_eq!(
            s.pop_due(9, |_| true),
            vec![
                ScheduledCommand::DeliverSignal { target: e[1] },
                ScheduledCommand::DeliverSignal { target: e[2] },
            ]
        );
        assert!(s.is_empty());
    }

    #[test]
    fn test_cancel_owner() {
        let (_world, e) = entities(3);
        let mut s = DelayScheduler::new();
        s.schedule(ScheduledCommand::DeliverSignal { target: e[2] }, 0, 1, e[0]);
        s.schedule(ScheduledCommand::DeliverSignal { target: e[2] }, 0, 1, e[1]);
        assert_eq!(s.cancel_owner(e[0]), 1);
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn test_dead_owner_skipped() {
        let (mut world, e) = entities(2);
        let mut s = DelayScheduler::new();
        s.schedule(ScheduledCommand::StartWick { target: e[1] }, 0, 0, e[0]);
        world.despawn(e[0]).unwrap();
        assert!(s.pop_due(0, |owner| world.contains(owner)).is_empty());
        assert!(s.is_empty());
    }

    #[test]
    fn test_due_saturates() {
        let (_world, e) = entities(1);
        let mut s = DelayScheduler::new();
        let id = s.schedule(ScheduledCommand::StartWick { target: e[0] }, 3, 4, e[0]);
        assert_eq!(id.due, 7);
        let late = s.schedule(ScheduledCommand::StartWick { target: e[0] }, 3, u64::MAX, e[0]);
        assert_eq!(late.due, u64::MAX);
        assert_eq!(s.pop_due(7, |_| true).len(), 1);
        assert_eq!(s.len(), 1);
    }
}
