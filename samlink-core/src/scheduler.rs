//! Cooperative priority task scheduler
//!
//! Two execution contexts: `Comm` runs the communication pipeline and
//! always completes before any `Worker` task in the same pass; `Worker`
//! runs peripheral work (LED animation, display paint) best-effort.
//! Scheduling is cooperative and non-preemptive: a task runs until it
//! returns, and one that blows through its declared budget is recorded
//! as overrun, never killed. Within `Worker`, eligible tasks run in
//! (priority, registration order) until none remain or the pass budget
//! is spent; leftovers defer to the next pass.
//!
//! The registry is append-only: tasks are registered once at startup
//! and never removed.

use heapless::Vec;

/// Monotonic millisecond time source supplied by the platform
pub trait Clock {
    fn now_ms(&self) -> u32;
}

/// Task priority, highest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Priority {
    /// Communication pipeline
    Critical,
    /// Buttons, power management
    High,
    /// LED animation
    Normal,
    /// Display refresh
    Low,
}

/// Execution context a task is pinned to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ExecContext {
    /// Communication pipeline; always runs to completion first
    Comm,
    /// Best-effort peripheral work
    Worker,
}

/// Recurrence of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TaskKind {
    /// Eligible once `period_ms` has elapsed since the last run
    Periodic(u32),
    /// Runs once, then never again
    OneShot,
}

/// Handle to a registered task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct TaskId(usize);

/// The registry is at capacity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RegistryFull;

/// What happened during one scheduling pass
#[derive(Debug, Default)]
pub struct PassReport {
    /// Tasks that ran
    pub ran: u32,
    /// Eligible tasks deferred because the pass budget ran out
    pub deferred: u32,
    /// Tasks that exceeded their per-invocation budget, with the
    /// elapsed time observed
    pub overruns: Vec<(TaskId, u32), 8>,
}

struct TaskSlot<'a> {
    name: &'static str,
    priority: Priority,
    context: ExecContext,
    kind: TaskKind,
    budget_ms: u32,
    last_run: Option<u32>,
    runs: u32,
    overruns: u32,
    finished: bool,
    handler: &'a mut dyn FnMut(u32),
}

impl TaskSlot<'_> {
    fn eligible(&self, now: u32) -> bool {
        if self.finished {
            return false;
        }
        match self.kind {
            TaskKind::OneShot => true,
            TaskKind::Periodic(period) => match self.last_run {
                None => true,
                Some(last) => now.wrapping_sub(last) >= period,
            },
        }
    }
}

/// Priority-ordered cooperative scheduler over an append-only registry
pub struct Scheduler<'a, const N: usize> {
    tasks: Vec<TaskSlot<'a>, N>,
    passes: u32,
}

impl<'a, const N: usize> Default for Scheduler<'a, N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, const N: usize> Scheduler<'a, N> {
    pub fn new() -> Self {
        Self {
            tasks: Vec::new(),
            passes: 0,
        }
    }

    /// Register a task; fails once the registry is full
    pub fn register(
        &mut self,
        name: &'static str,
        priority: Priority,
        context: ExecContext,
        kind: TaskKind,
        budget_ms: u32,
        handler: &'a mut dyn FnMut(u32),
    ) -> Result<TaskId, RegistryFull> {
        let id = TaskId(self.tasks.len());
        self.tasks
            .push(TaskSlot {
                name,
                priority,
                context,
                kind,
                budget_ms,
                last_run: None,
                runs: 0,
                overruns: 0,
                finished: false,
                handler,
            })
            .map_err(|_| RegistryFull)?;
        Ok(id)
    }

    /// Run one full pass: every eligible Comm task to completion, then
    /// Worker tasks within `worker_budget_ms`
    pub fn run_pass(&mut self, clock: &impl Clock, worker_budget_ms: u32) -> PassReport {
        self.passes = self.passes.wrapping_add(1);
        let mut report = self.run_context(ExecContext::Comm, clock, None);
        let worker = self.run_context(ExecContext::Worker, clock, Some(worker_budget_ms));

        report.ran += worker.ran;
        report.deferred += worker.deferred;
        for entry in worker.overruns {
            let _ = report.overruns.push(entry);
        }
        report
    }

    /// Run a single context, for the two-thread mapping where each
    /// context owns its own loop
    pub fn run_context(
        &mut self,
        context: ExecContext,
        clock: &impl Clock,
        budget_ms: Option<u32>,
    ) -> PassReport {
        let mut report = PassReport::default();
        let mut ran_this_pass = [false; N];
        let pass_start = clock.now_ms();

        loop {
            let now = clock.now_ms();

            if let Some(budget) = budget_ms {
                if now.wrapping_sub(pass_start) >= budget {
                    report.deferred += self.count_eligible(context, now, &ran_this_pass);
                    break;
                }
            }

            let Some(index) = self.pick(context, now, &ran_this_pass) else {
                break;
            };

            let slot = &mut self.tasks[index];
            let start = clock.now_ms();
            (slot.handler)(start);
            let elapsed = clock.now_ms().wrapping_sub(start);

            slot.last_run = Some(start);
            slot.runs = slot.runs.wrapping_add(1);
            if slot.kind == TaskKind::OneShot {
                slot.finished = true;
            }
            if elapsed > slot.budget_ms {
                slot.overruns = slot.overruns.wrapping_add(1);
                let _ = report.overruns.push((TaskId(index), elapsed));
            }
            ran_this_pass[index] = true;
            report.ran += 1;
        }

        report
    }

    /// Best eligible task: highest priority, then registration order.
    /// Each task runs at most once per pass so a zero-period task
    /// cannot wedge the loop.
    fn pick(&self, context: ExecContext, now: u32, ran: &[bool; N]) -> Option<usize> {
        let mut best: Option<usize> = None;
        for (i, slot) in self.tasks.iter().enumerate() {
            if slot.context != context || ran[i] || !slot.eligible(now) {
                continue;
            }
            match best {
                Some(b) if self.tasks[b].priority <= slot.priority => {}
                _ => best = Some(i),
            }
        }
        best
    }

    fn count_eligible(&self, context: ExecContext, now: u32, ran: &[bool; N]) -> u32 {
        self.tasks
            .iter()
            .enumerate()
            .filter(|(i, slot)| slot.context == context && !ran[*i] && slot.eligible(now))
            .count() as u32
    }

    /// Scheduling passes completed
    pub fn passes(&self) -> u32 {
        self.passes
    }

    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    pub fn task_name(&self, id: TaskId) -> Option<&'static str> {
        self.tasks.get(id.0).map(|t| t.name)
    }

    /// Times a task has run
    pub fn task_runs(&self, id: TaskId) -> u32 {
        self.tasks.get(id.0).map_or(0, |t| t.runs)
    }

    /// Times a task exceeded its budget
    pub fn task_overruns(&self, id: TaskId) -> u32 {
        self.tasks.get(id.0).map_or(0, |t| t.overruns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::{Cell, RefCell};

    extern crate std;
    use std::vec::Vec as StdVec;

    struct FakeClock {
        now: Cell<u32>,
    }

    impl FakeClock {
        fn new() -> Self {
            Self { now: Cell::new(0) }
        }

        fn advance(&self, ms: u32) {
            self.now.set(self.now.get() + ms);
        }
    }

    impl Clock for FakeClock {
        fn now_ms(&self) -> u32 {
            self.now.get()
        }
    }

    #[test]
    fn test_comm_always_runs_before_worker() {
        let clock = FakeClock::new();
        let log = RefCell::new(StdVec::new());

        let mut comm = |_: u32| log.borrow_mut().push("comm");
        let mut worker = |_: u32| log.borrow_mut().push("worker");

        let mut sched: Scheduler<4> = Scheduler::new();
        // Register the worker first: registration order must not matter
        // across contexts.
        sched
            .register(
                "paint",
                Priority::Low,
                ExecContext::Worker,
                TaskKind::Periodic(0),
                10,
                &mut worker,
            )
            .unwrap();
        sched
            .register(
                "uart",
                Priority::Critical,
                ExecContext::Comm,
                TaskKind::Periodic(0),
                10,
                &mut comm,
            )
            .unwrap();

        for _ in 0..5 {
            sched.run_pass(&clock, 100);
        }

        let log = log.borrow();
        assert_eq!(log.len(), 10);
        for pair in log.chunks(2) {
            assert_eq!(pair, ["comm", "worker"]);
        }
    }

    #[test]
    fn test_worker_priority_then_registration_order() {
        let clock = FakeClock::new();
        let log = RefCell::new(StdVec::new());

        let mut low = |_: u32| log.borrow_mut().push("low");
        let mut normal_a = |_: u32| log.borrow_mut().push("normal_a");
        let mut normal_b = |_: u32| log.borrow_mut().push("normal_b");
        let mut high = |_: u32| log.borrow_mut().push("high");

        let mut sched: Scheduler<4> = Scheduler::new();
        for (name, priority, handler) in [
            ("low", Priority::Low, &mut low as &mut dyn FnMut(u32)),
            ("normal_a", Priority::Normal, &mut normal_a),
            ("normal_b", Priority::Normal, &mut normal_b),
            ("high", Priority::High, &mut high),
        ] {
            sched
                .register(
                    name,
                    priority,
                    ExecContext::Worker,
                    TaskKind::Periodic(0),
                    10,
                    handler,
                )
                .unwrap();
        }

        sched.run_pass(&clock, 1000);
        assert_eq!(*log.borrow(), ["high", "normal_a", "normal_b", "low"]);
    }

    #[test]
    fn test_periodic_eligibility() {
        let clock = FakeClock::new();
        let runs = Cell::new(0u32);
        let mut task = |_: u32| runs.set(runs.get() + 1);

        let mut sched: Scheduler<2> = Scheduler::new();
        sched
            .register(
                "telemetry",
                Priority::Normal,
                ExecContext::Worker,
                TaskKind::Periodic(100),
                10,
                &mut task,
            )
            .unwrap();

        sched.run_pass(&clock, 1000); // first run is immediate
        assert_eq!(runs.get(), 1);

        clock.advance(50);
        sched.run_pass(&clock, 1000); // period not yet elapsed
        assert_eq!(runs.get(), 1);

        clock.advance(50);
        sched.run_pass(&clock, 1000);
        assert_eq!(runs.get(), 2);
    }

    #[test]
    fn test_one_shot_runs_once() {
        let clock = FakeClock::new();
        let runs = Cell::new(0u32);
        let mut task = |_: u32| runs.set(runs.get() + 1);

        let mut sched: Scheduler<2> = Scheduler::new();
        sched
            .register(
                "boot-banner",
                Priority::Normal,
                ExecContext::Worker,
                TaskKind::OneShot,
                10,
                &mut task,
            )
            .unwrap();

        for _ in 0..3 {
            sched.run_pass(&clock, 1000);
        }
        assert_eq!(runs.get(), 1);
    }

    #[test]
    fn test_pass_budget_defers_low_priority() {
        let clock = FakeClock::new();
        let log = RefCell::new(StdVec::new());

        let mut slow_high = |_: u32| {
            log.borrow_mut().push("high");
            clock.advance(60); // eats the whole pass budget
        };
        let mut low = |_: u32| log.borrow_mut().push("low");

        let mut sched: Scheduler<2> = Scheduler::new();
        sched
            .register(
                "slow-high",
                Priority::High,
                ExecContext::Worker,
                TaskKind::Periodic(0),
                100,
                &mut slow_high,
            )
            .unwrap();
        let low_id = sched
            .register(
                "low",
                Priority::Low,
                ExecContext::Worker,
                TaskKind::Periodic(0),
                10,
                &mut low,
            )
            .unwrap();

        let report = sched.run_pass(&clock, 50);
        assert_eq!(report.ran, 1);
        assert_eq!(report.deferred, 1);
        assert_eq!(*log.borrow(), ["high"]);
        assert_eq!(sched.task_runs(low_id), 0);
    }

    #[test]
    fn test_budget_overrun_reported_not_killed() {
        let clock = FakeClock::new();
        let mut slow = |_: u32| clock.advance(25);

        let mut sched: Scheduler<2> = Scheduler::new();
        let id = sched
            .register(
                "eink-refresh",
                Priority::Low,
                ExecContext::Worker,
                TaskKind::Periodic(0),
                10, // budget well below the 25ms the task takes
                &mut slow,
            )
            .unwrap();

        let report = sched.run_pass(&clock, 1000);
        assert_eq!(report.ran, 1);
        assert_eq!(report.overruns.as_slice(), [(id, 25)]);
        assert_eq!(sched.task_overruns(id), 1);

        // Still runs next pass.
        sched.run_pass(&clock, 1000);
        assert_eq!(sched.task_runs(id), 2);
        assert_eq!(sched.task_overruns(id), 2);
    }

    #[test]
    fn test_registry_is_append_only_and_bounded() {
        let clock = FakeClock::new();
        let mut a = |_: u32| {};
        let mut b = |_: u32| {};
        let mut c = |_: u32| {};

        let mut sched: Scheduler<2> = Scheduler::new();
        assert!(sched
            .register(
                "a",
                Priority::Normal,
                ExecContext::Worker,
                TaskKind::Periodic(10),
                5,
                &mut a
            )
            .is_ok());
        assert!(sched
            .register(
                "b",
                Priority::Normal,
                ExecContext::Worker,
                TaskKind::Periodic(10),
                5,
                &mut b
            )
            .is_ok());
        assert_eq!(
            sched.register(
                "c",
                Priority::Normal,
                ExecContext::Worker,
                TaskKind::Periodic(10),
                5,
                &mut c
            ),
            Err(RegistryFull)
        );
        assert_eq!(sched.task_count(), 2);

        sched.run_pass(&clock, 100);
        assert_eq!(sched.task_name(TaskId(0)), Some("a"));
    }

    #[test]
    fn test_run_context_isolates_contexts() {
        let clock = FakeClock::new();
        let comm_runs = Cell::new(0u32);
        let worker_runs = Cell::new(0u32);

        let mut comm = |_: u32| comm_runs.set(comm_runs.get() + 1);
        let mut worker = |_: u32| worker_runs.set(worker_runs.get() + 1);

        let mut sched: Scheduler<2> = Scheduler::new();
        sched
            .register(
                "uart",
                Priority::Critical,
                ExecContext::Comm,
                TaskKind::Periodic(0),
                10,
                &mut comm,
            )
            .unwrap();
        sched
            .register(
                "led",
                Priority::Normal,
                ExecContext::Worker,
                TaskKind::Periodic(0),
                10,
                &mut worker,
            )
            .unwrap();

        sched.run_context(ExecContext::Comm, &clock, None);
        assert_eq!((comm_runs.get(), worker_runs.get()), (1, 0));

        sched.run_context(ExecContext::Worker, &clock, Some(100));
        assert_eq!((comm_runs.get(), worker_runs.get()), (1, 1));
    }
}
