//! Tick-driven deferred tasks.
//!
//! One-shot and repeating tasks live in a binary heap keyed by
//! `(due tick, sequence)`. Cancellation removes the task body; stale heap
//! entries are skipped when they surface.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BinaryHeap};
use std::fmt;

use skyfall_core::SimTick;

/// Handle returned when scheduling a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(u64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct QueueEntry {
    due: SimTick,
    seq: u64,
    id: TaskId,
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; invert so the earliest (due, seq) pops first.
        other
            .due
            .cmp(&self.due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

struct Slot<T> {
    task: T,
    period: Option<u64>,
}

/// Priority queue of deferred tasks.
pub struct TaskScheduler<T> {
    queue: BinaryHeap<QueueEntry>,
    slots: BTreeMap<TaskId, Slot<T>>,
    next_id: u64,
    next_seq: u64,
}

impl<T> Default for TaskScheduler<T> {
    fn default() -> Self {
        Self {
            queue: BinaryHeap::new(),
            slots: BTreeMap::new(),
            next_id: 1,
            next_seq: 0,
        }
    }
}

impl<T: Clone> TaskScheduler<T> {
    /// Empty scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, id: TaskId, due: SimTick) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.queue.push(QueueEntry { due, seq, id });
    }

    fn allocate(&mut self, task: T, period: Option<u64>) -> TaskId {
        let id = TaskId(self.next_id);
        self.next_id += 1;
        self.slots.insert(id, Slot { task, period });
        id
    }

    /// Run `task` once, `delay` ticks after `now` (at least one tick).
    pub fn schedule_once(&mut self, now: SimTick, delay: u64, task: T) -> TaskId {
        let id = self.allocate(task, None);
        self.push(id, now.advance(delay.max(1)));
        id
    }

    /// Run `task` after `delay` ticks and then every `period` ticks until cancelled.
    pub fn schedule_repeating(&mut self, now: SimTick, delay: u64, period: u64, task: T) -> TaskId {
        let id = self.allocate(task, Some(period.max(1)));
        self.push(id, now.advance(delay.max(1)));
        id
    }

    /// Cancel a task. Returns false if it already ran or was cancelled.
    pub fn cancel(&mut self, id: TaskId) -> bool {
        self.slots.remove(&id).is_some()
    }

    /// Drop every pending task.
    pub fn cancel_all(&mut self) -> usize {
        let cancelled = self.slots.len();
        self.slots.clear();
        self.queue.clear();
        cancelled
    }

    /// Pop the next task due at or before `now`.
    ///
    /// Repeating tasks are re-queued `period` ticks after `now` before being returned.
    pub fn pop_due(&mut self, now: SimTick) -> Option<(TaskId, T)> {
        loop {
            let entry = *self.queue.peek()?;
            if entry.due > now {
                return None;
            }
            self.queue.pop();
            let Some(slot) = self.slots.get(&entry.id) else {
                continue;
            };
            match slot.period {
                Some(period) => {
                    let task = slot.task.clone();
                    self.push(entry.id, now.advance(period));
                    return Some((entry.id, task));
                }
                None => {
                    let slot = self.slots.remove(&entry.id)?;
                    return Some((entry.id, slot.task));
                }
            }
        }
    }

    /// Whether the task is still pending.
    pub fn is_scheduled(&self, id: TaskId) -> bool {
        self.slots.contains_key(&id)
    }

    /// Number of live (not cancelled, not finished) tasks.
    pub fn pending(&self) -> usize {
        self.slots.len()
    }

    /// Live tasks in id order.
    pub fn tasks(&self) -> impl Iterator<Item = (TaskId, &T)> {
        self.slots.iter().map(|(id, slot)| (*id, &slot.task))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drain(scheduler: &mut TaskScheduler<&'static str>, now: u64) -> Vec<&'static str> {
        let mut out = Vec::new();
        while let Some((_, task)) = scheduler.pop_due(SimTick(now)) {
            out.push(task);
        }
        out
    }

    #[test]
    fn fires_in_due_order_then_schedule_order() {
        let mut scheduler = TaskScheduler::new();
        scheduler.schedule_once(SimTick(0), 5, "late");
        scheduler.schedule_once(SimTick(0), 2, "first");
        scheduler.schedule_once(SimTick(0), 2, "second");
        assert!(drain(&mut scheduler, 1).is_empty());
        assert_eq!(drain(&mut scheduler, 2), vec!["first", "second"]);
        assert_eq!(drain(&mut scheduler, 10), vec!["late"]);
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn zero_delay_is_clamped_to_one_tick() {
        let mut scheduler = TaskScheduler::new();
        scheduler.schedule_once(SimTick(7), 0, "task");
        assert!(drain(&mut scheduler, 7).is_empty());
        assert_eq!(drain(&mut scheduler, 8), vec!["task"]);
    }

    #[test]
    fn repeating_tasks_requeue_until_cancelled() {
        let mut scheduler = TaskScheduler::new();
        let id = scheduler.schedule_repeating(SimTick(0), 1, 3, "tick");
        assert_eq!(drain(&mut scheduler, 1), vec!["tick"]);
        assert!(drain(&mut scheduler, 3).is_empty());
        assert_eq!(drain(&mut scheduler, 4), vec!["tick"]);
        assert!(scheduler.cancel(id));
        assert!(drain(&mut scheduler, 100).is_empty());
        assert!(!scheduler.cancel(id));
    }

    #[test]
    fn cancelled_one_shot_never_fires() {
        let mut scheduler = TaskScheduler::new();
        let id = scheduler.schedule_once(SimTick(0), 1, "gone");
        scheduler.schedule_once(SimTick(0), 1, "kept");
        scheduler.cancel(id);
        assert_eq!(drain(&mut scheduler, 5), vec!["kept"]);
    }

    #[test]
    fn cancel_all_clears_everything() {
        let mut scheduler = TaskScheduler::new();
        scheduler.schedule_once(SimTick(0), 1, "a");
        scheduler.schedule_repeating(SimTick(0), 1, 1, "b");
        assert_eq!(scheduler.cancel_all(), 2);
        assert!(drain(&mut scheduler, 50).is_empty());
    }
}
