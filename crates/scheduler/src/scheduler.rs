// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The Scheduler (§4.2, C2): single-threaded cooperative task and heartbeat
//! dispatch.
//!
//! All content callbacks are serialized through one queue; `Scheduler`
//! itself does no I/O and spawns nothing — `mud-daemon` drives `tick` from
//! its own loop (`tokio::time::interval`) the way `oj-daemon`'s runtime
//! drives cron/timer effects from its single dispatch loop.

use crate::error::SchedulerError;
use indexmap::{IndexMap, IndexSet};
use mud_core::{Clock, ObjectId, ScheduledTask, TaskId, TaskKind};
use std::cmp::Reverse;
use std::collections::BinaryHeap;

/// Ordered by `(due_at_ms, sequence)` ascending via `Reverse` so
/// `BinaryHeap`, a max-heap, pops the earliest-due, lowest-sequence entry
/// first (§4.2 "ties break by scheduling order").
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
struct DueEntry(Reverse<(u64, u64)>, TaskId);

pub struct Scheduler<C: Clock> {
    clock: C,
    tasks: IndexMap<TaskId, ScheduledTask>,
    due: BinaryHeap<DueEntry>,
    heartbeat: IndexSet<ObjectId>,
    sequence: u64,
    tick_period_ms: u64,
}

/// Default tick period (§4.2: "configuration-driven (default 2 s)").
pub const DEFAULT_TICK_PERIOD_MS: u64 = 2_000;

impl<C: Clock> Scheduler<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            tasks: IndexMap::new(),
            due: BinaryHeap::new(),
            heartbeat: IndexSet::new(),
            sequence: 0,
            tick_period_ms: DEFAULT_TICK_PERIOD_MS,
        }
    }

    pub fn with_tick_period_ms(mut self, tick_period_ms: u64) -> Self {
        self.tick_period_ms = tick_period_ms;
        self
    }

    pub fn tick_period_ms(&self) -> u64 {
        self.tick_period_ms
    }

    fn next_id(&mut self) -> TaskId {
        TaskId::new(nanoid::nanoid!(12))
    }

    fn schedule(
        &mut self,
        kind: TaskKind,
        target_entity: Option<ObjectId>,
        callback: String,
        delay_ms: u64,
        interval_ms: Option<u64>,
    ) -> TaskId {
        let id = self.next_id();
        let sequence = self.sequence;
        self.sequence += 1;
        let due_at_ms = self.clock.epoch_ms() + delay_ms;
        let task = ScheduledTask { id: id.clone(), kind, due_at_ms, interval_ms, target_entity, callback, sequence };
        self.due.push(DueEntry(Reverse((due_at_ms, sequence)), id.clone()));
        self.tasks.insert(id.clone(), task);
        id
    }

    /// One-shot call-out (§4.2).
    pub fn call_out(&mut self, target: Option<ObjectId>, callback: impl Into<String>, delay_ms: u64) -> TaskId {
        self.schedule(TaskKind::Once, target, callback.into(), delay_ms, None)
    }

    /// Periodic call-out (§4.2). The first firing is at `interval_ms`, not
    /// immediately.
    pub fn call_out_every(
        &mut self,
        target: Option<ObjectId>,
        callback: impl Into<String>,
        interval_ms: u64,
    ) -> TaskId {
        self.schedule(TaskKind::Periodic, target, callback.into(), interval_ms, Some(interval_ms))
    }

    /// Idempotent (§4.2): cancelling an unknown or already-fired task id
    /// simply returns `false`.
    pub fn cancel(&mut self, id: &TaskId) -> bool {
        self.tasks.shift_remove(id).is_some()
    }

    pub fn heartbeat_register(&mut self, entity: ObjectId) {
        self.heartbeat.insert(entity);
    }

    pub fn heartbeat_unregister(&mut self, entity: &ObjectId) {
        self.heartbeat.shift_remove(entity);
    }

    /// Cancel every task and heartbeat registration naming `entity`, e.g.
    /// when the Object Registry destroys it (§4.1).
    pub fn cancel_all_for(&mut self, entity: &ObjectId) {
        self.heartbeat_unregister(entity);
        let stale: Vec<TaskId> = self
            .tasks
            .values()
            .filter(|t| t.target_entity.as_ref() == Some(entity))
            .map(|t| t.id.clone())
            .collect();
        for id in stale {
            self.tasks.shift_remove(&id);
        }
    }

    /// Drain every task due at or before `now`, in `due_at` order with
    /// scheduling-order tiebreak (§4.2), rescheduling periodic tasks via
    /// `next = prev_due + interval` (drift semantics, §4.2).
    ///
    /// Stale heap entries (cancelled, or a periodic task's previous firing)
    /// are skipped rather than fired.
    pub fn drain_due(&mut self, now_ms: u64) -> Vec<ScheduledTask> {
        let mut fired = Vec::new();
        while let Some(DueEntry(Reverse((due_at_ms, sequence)), id)) = self.due.peek() {
            if *due_at_ms > now_ms {
                break;
            }
            let due_at_ms = *due_at_ms;
            let sequence = *sequence;
            let id = id.clone();
            self.due.pop();

            let Some(task) = self.tasks.get(&id) else { continue };
            if task.due_at_ms != due_at_ms || task.sequence != sequence {
                // Stale entry: task was rescheduled or is a dead periodic slot.
                continue;
            }
            let task = task.clone();
            match task.kind {
                TaskKind::Once => {
                    self.tasks.shift_remove(&id);
                }
                TaskKind::Periodic | TaskKind::Heartbeat => {
                    if let Some(next_due) = task.next_due() {
                        if let Some(scheduled) = self.tasks.get_mut(&id) {
                            scheduled.due_at_ms = next_due;
                            scheduled.sequence = {
                                let s = self.sequence;
                                self.sequence += 1;
                                s
                            };
                            self.due.push(DueEntry(
                                Reverse((scheduled.due_at_ms, scheduled.sequence)),
                                id.clone(),
                            ));
                        }
                    } else {
                        self.tasks.shift_remove(&id);
                    }
                }
            }
            fired.push(task);
        }
        fired
    }

    /// A tick's heartbeat set, snapshotted in insertion order (§4.2
    /// "snapshot heartbeat set, then invoke on_heartbeat ... in insertion
    /// order"). Snapshotting means entities registered mid-tick are not
    /// visited until the next tick.
    pub fn heartbeat_snapshot(&self) -> Vec<ObjectId> {
        self.heartbeat.iter().cloned().collect()
    }

    pub fn task(&self, id: &TaskId) -> Result<&ScheduledTask, SchedulerError> {
        self.tasks.get(id).ok_or_else(|| SchedulerError::UnknownTask(id.clone()))
    }

    pub fn pending_task_count(&self) -> usize {
        self.tasks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mud_core::FakeClock;

    fn scheduler() -> (Scheduler<FakeClock>, FakeClock) {
        let clock = FakeClock::new();
        (Scheduler::new(clock.clone()), clock)
    }

    #[test]
    fn call_out_fires_once_after_delay() {
        let (mut sched, clock) = scheduler();
        sched.call_out(None, "ping", 1_000);
        assert!(sched.drain_due(clock.epoch_ms()).is_empty());
        assert!(sched.drain_due(clock.epoch_ms() + 1_000).len() == 1);
        // Fired once-tasks are gone.
        assert_eq!(sched.pending_task_count(), 0);
    }

    #[test]
    fn periodic_tasks_reschedule_from_prev_due_not_now() {
        let (mut sched, clock) = scheduler();
        let base = clock.epoch_ms();
        sched.call_out_every(None, "tick", 250);
        let fired = sched.drain_due(base + 250);
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].due_at_ms, base + 250);
        // Even if we only look far later, the next fire is prev_due + interval,
        // not now + interval.
        let fired2 = sched.drain_due(base + 5_000);
        assert_eq!(fired2.len(), 1);
        assert_eq!(fired2[0].due_at_ms, base + 500);
    }

    #[test]
    fn ties_at_the_same_due_at_break_by_scheduling_order() {
        let (mut sched, clock) = scheduler();
        let now = clock.epoch_ms();
        sched.call_out(None, "first", 100);
        sched.call_out(None, "second", 100);
        let fired = sched.drain_due(now + 100);
        assert_eq!(fired.len(), 2);
        assert_eq!(fired[0].callback, "first");
        assert_eq!(fired[1].callback, "second");
    }

    #[test]
    fn cancel_is_idempotent() {
        let (mut sched, _clock) = scheduler();
        let id = sched.call_out(None, "ping", 1_000);
        assert!(sched.cancel(&id));
        assert!(!sched.cancel(&id));
    }

    #[test]
    fn cancelling_before_due_prevents_firing() {
        let (mut sched, clock) = scheduler();
        let id = sched.call_out(None, "ping", 1_000);
        sched.cancel(&id);
        assert!(sched.drain_due(clock.epoch_ms() + 1_000).is_empty());
    }

    #[test]
    fn heartbeat_snapshot_preserves_insertion_order() {
        let (mut sched, _clock) = scheduler();
        let a = ObjectId::new("/std/npc#0");
        let b = ObjectId::new("/std/npc#1");
        sched.heartbeat_register(a.clone());
        sched.heartbeat_register(b.clone());
        assert_eq!(sched.heartbeat_snapshot(), vec![a, b]);
    }

    #[test]
    fn cancel_all_for_removes_tasks_and_heartbeat_for_that_entity() {
        let (mut sched, _clock) = scheduler();
        let entity = ObjectId::new("/std/npc#0");
        sched.heartbeat_register(entity.clone());
        sched.call_out(Some(entity.clone()), "decay", 1_000);
        sched.call_out(None, "unrelated", 1_000);
        sched.cancel_all_for(&entity);
        assert!(sched.heartbeat_snapshot().is_empty());
        assert_eq!(sched.pending_task_count(), 1);
    }
}
