//! Cooperative, priority-ordered task scheduler.
//!
//! Each [`Scheduler::tick`] resumes at most one task for a single step: the
//! eligible task with the best (numerically lowest) [`Priority`], ties broken by
//! insertion order. A task is eligible once its period has elapsed since it
//! last ran, or immediately if it has never run. Eligible tasks that lose the
//! selection stay eligible for the next tick; nothing is dropped or deferred.

use core::fmt;

use heapless::Vec;

use crate::Millis;

/// Default capacity for the turret's fixed task set.
pub const MAX_TASKS: usize = 8;

/// A periodic unit of work. `step` must return promptly; it is the only
/// suspension point the scheduler knows about.
pub trait Task {
    fn step(&mut self, now: Millis);
}

/// Task precedence; lower values run first.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Priority(pub u8);

impl Priority {
    pub const HIGHEST: Self = Self(0);
    pub const LOWEST: Self = Self(u8::MAX);
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "p{}", self.0)
    }
}

/// Static metadata registered alongside each task.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct TaskSpec {
    pub name: &'static str,
    pub priority: Priority,
    pub period_ms: u32,
}

impl TaskSpec {
    #[must_use]
    pub const fn new(name: &'static str, priority: Priority, period_ms: u32) -> Self {
        Self {
            name,
            priority,
            period_ms,
        }
    }
}

/// Handle returned by [`Scheduler::add`]; indexes in insertion order.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct TaskId(usize);

impl TaskId {
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Per-task run accounting. Observational only; the scheduler never acts on it.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct TaskStats {
    pub runs: u32,
    /// Runs that started more than one period after the previous run.
    pub late_runs: u32,
    pub max_lateness_ms: u32,
    pub last_run: Option<Millis>,
}

impl TaskStats {
    fn record(&mut self, now: Millis, period_ms: u32) {
        if let Some(previous) = self.last_run {
            let lateness = now
                .saturating_sub(previous)
                .saturating_sub(Millis::from(period_ms));
            if lateness > 0 {
                self.late_runs = self.late_runs.saturating_add(1);
                let lateness = u32::try_from(lateness).unwrap_or(u32::MAX);
                self.max_lateness_ms = self.max_lateness_ms.max(lateness);
            }
        }
        self.runs = self.runs.saturating_add(1);
        self.last_run = Some(now);
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SchedulerError {
    /// The task table is at capacity.
    Full { capacity: usize },
}

impl fmt::Display for SchedulerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulerError::Full { capacity } => {
                write!(f, "task table full ({capacity} slots)")
            }
        }
    }
}

struct TaskSlot<'a> {
    spec: TaskSpec,
    task: &'a mut dyn Task,
    stats: TaskStats,
}

impl TaskSlot<'_> {
    fn is_eligible(&self, now: Millis) -> bool {
        match self.stats.last_run {
            None => true,
            Some(last) => now.saturating_sub(last) >= Millis::from(self.spec.period_ms),
        }
    }
}

/// Fixed-capacity task table. Tasks are borrowed, so they outlive the scheduler
/// and can be inspected once it is dropped.
pub struct Scheduler<'a, const CAPACITY: usize = MAX_TASKS> {
    slots: Vec<TaskSlot<'a>, CAPACITY>,
}

impl<'a, const CAPACITY: usize> Scheduler<'a, CAPACITY> {
    #[must_use]
    pub const fn new() -> Self {
        Self { slots: Vec::new() }
    }

    /// Registers a task. Registration order breaks priority ties.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::Full`] once `CAPACITY` tasks are registered.
    pub fn add(&mut self, spec: TaskSpec, task: &'a mut dyn Task) -> Result<TaskId, SchedulerError> {
        let id = TaskId(self.slots.len());
        self.slots
            .push(TaskSlot {
                spec,
                task,
                stats: TaskStats::default(),
            })
            .map_err(|_| SchedulerError::Full { capacity: CAPACITY })?;
        Ok(id)
    }

    /// Runs one step of the best eligible task, if any, and returns its id.
    pub fn tick(&mut self, now: Millis) -> Option<TaskId> {
        let id = self.next_eligible(now)?;
        let slot = &mut self.slots[id.0];
        slot.task.step(now);
        slot.stats.record(now, slot.spec.period_ms);
        Some(id)
    }

    /// The task `tick(now)` would run, without running it.
    #[must_use]
    pub fn next_eligible(&self, now: Millis) -> Option<TaskId> {
        let mut best: Option<(usize, Priority)> = None;
        for (index, slot) in self.slots.iter().enumerate() {
            if !slot.is_eligible(now) {
                continue;
            }
            match best {
                Some((_, priority)) if priority <= slot.spec.priority => {}
                _ => best = Some((index, slot.spec.priority)),
            }
        }
        best.map(|(index, _)| TaskId(index))
    }

    #[must_use]
    pub fn is_eligible(&self, id: TaskId, now: Millis) -> bool {
        self.slots.get(id.0).is_some_and(|slot| slot.is_eligible(now))
    }

    #[must_use]
    pub fn spec(&self, id: TaskId) -> Option<&TaskSpec> {
        self.slots.get(id.0).map(|slot| &slot.spec)
    }

    #[must_use]
    pub fn stats(&self, id: TaskId) -> Option<&TaskStats> {
        self.slots.get(id.0).map(|slot| &slot.stats)
    }

    /// Iterates registered tasks in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (TaskId, &TaskSpec, &TaskStats)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .map(|(index, slot)| (TaskId(index), &slot.spec, &slot.stats))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl<const CAPACITY: usize> Default for Scheduler<'_, CAPACITY> {
    fn default() -> Self {
        Self::new()
    }
}
