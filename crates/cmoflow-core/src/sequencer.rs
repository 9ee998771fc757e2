//! # Staged Progress Sequencer
//!
//! Walks an ordered list of labeled, timed stages on the `Scheduler`.
//!
//! ## Run Lifecycle
//!
//! ```text
//! run() ──► stage 0 ──► stage 1 ──► ... ──► stage N-1 ──► settle ──► Completed
//!             │  (one timer armed at a time)                  │
//!             └──────────────── cancel() ─────────────────────┴──► nothing fires
//! ```
//!
//! - Exactly one timer is armed per run at any moment
//! - The next stage's timer is armed only while handling the current fire
//! - A late fire advances exactly one stage
//! - `Completed` is reported once per run, never after `cancel`

use crate::primitives::DEFAULT_STAGES;
use crate::scheduler::{Scheduler, TimerId};
use crate::{FlowError, Millis};
use serde::{Deserialize, Serialize};

// =============================================================================
// STAGES
// =============================================================================

/// One labeled, timed step of the simulated processing sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingStage {
    /// Text shown while the stage is active.
    pub label: String,
    /// How long the stage lasts.
    #[serde(rename = "duration_ms")]
    pub duration: Millis,
}

impl ProcessingStage {
    /// Create a new stage.
    #[must_use]
    pub fn new(label: impl Into<String>, duration: Millis) -> Self {
        Self {
            label: label.into(),
            duration,
        }
    }

    /// The built-in stage list.
    #[must_use]
    pub fn defaults() -> Vec<ProcessingStage> {
        DEFAULT_STAGES
            .iter()
            .map(|(label, ms)| ProcessingStage::new(*label, Millis(*ms)))
            .collect()
    }
}

/// Total time from `run` to completion: all stage durations plus settle.
#[must_use]
pub fn total_duration(stages: &[ProcessingStage], settle_delay: Millis) -> Millis {
    stages
        .iter()
        .fold(settle_delay, |acc, stage| acc.saturating_add(stage.duration))
}

// =============================================================================
// HANDLES & TIMERS
// =============================================================================

/// Identity of one sequencer run. Used to reject stale timers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RunHandle(pub u64);

/// Event the sequencer arms on the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequencerTimer {
    /// The stage at `index` has run for its full duration.
    StageElapsed { run: RunHandle, index: usize },
    /// The settle delay after the last stage has elapsed.
    Settled { run: RunHandle },
}

impl SequencerTimer {
    /// The run this timer belongs to.
    #[must_use]
    pub fn run(&self) -> RunHandle {
        match self {
            SequencerTimer::StageElapsed { run, .. } | SequencerTimer::Settled { run } => *run,
        }
    }
}

/// Outcome of handling one sequencer timer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SequencerStep {
    /// Moved on to the next stage.
    Advanced(StageProgress),
    /// The last stage elapsed; the settle delay is now armed.
    Finished,
    /// The settle delay elapsed. Reported exactly once per run.
    Completed(RunHandle),
    /// The timer was stale (cancelled or superseded run) and was dropped.
    Ignored,
}

/// Read-only view of the active run for a progress renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageProgress {
    /// Index of the current stage. Equals `total` once all stages elapsed.
    pub index: usize,
    /// Number of stages in the run.
    pub total: usize,
    /// Label of the current stage; `None` once all stages elapsed.
    pub label: Option<String>,
    /// True while waiting out the settle delay.
    pub complete: bool,
}

// =============================================================================
// SEQUENCER
// =============================================================================

#[derive(Debug)]
struct ActiveRun {
    handle: RunHandle,
    stages: Vec<ProcessingStage>,
    settle_delay: Millis,
    index: usize,
    complete: bool,
    timer: Option<TimerId>,
}

impl ActiveRun {
    fn progress(&self) -> StageProgress {
        StageProgress {
            index: self.index,
            total: self.stages.len(),
            label: self.stages.get(self.index).map(|s| s.label.clone()),
            complete: self.complete,
        }
    }

    /// Arm the timer for the current position: the current stage, or the
    /// settle delay once every stage has elapsed.
    fn arm(&mut self, scheduler: &mut Scheduler<SequencerTimer>) {
        let (delay, timer) = match self.stages.get(self.index) {
            Some(stage) => (
                stage.duration,
                SequencerTimer::StageElapsed {
                    run: self.handle,
                    index: self.index,
                },
            ),
            None => {
                self.complete = true;
                (self.settle_delay, SequencerTimer::Settled { run: self.handle })
            }
        };
        self.timer = Some(scheduler.schedule(delay, timer));
    }
}

/// Drives at most one run of timed stages at a time.
#[derive(Debug, Default)]
pub struct StagedProgressSequencer {
    next_handle: u64,
    active: Option<ActiveRun>,
}

impl StagedProgressSequencer {
    /// Create an idle sequencer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a run at stage 0.
    ///
    /// Returns `FlowError::RunActive` if a previous run has not completed
    /// or been cancelled: callers must cancel first.
    ///
    /// An empty stage list goes straight to the settle delay.
    pub fn run(
        &mut self,
        scheduler: &mut Scheduler<SequencerTimer>,
        stages: Vec<ProcessingStage>,
        settle_delay: Millis,
    ) -> Result<RunHandle, FlowError> {
        if self.active.is_some() {
            return Err(FlowError::RunActive);
        }

        let handle = RunHandle(self.next_handle);
        self.next_handle = self.next_handle.saturating_add(1);

        let mut run = ActiveRun {
            handle,
            stages,
            settle_delay,
            index: 0,
            complete: false,
            timer: None,
        };
        run.arm(scheduler);

        tracing::debug!(run = handle.0, stages = run.stages.len(), "sequencer run started");
        self.active = Some(run);
        Ok(handle)
    }

    /// Handle one fired sequencer timer.
    pub fn fire(
        &mut self,
        scheduler: &mut Scheduler<SequencerTimer>,
        timer: SequencerTimer,
    ) -> SequencerStep {
        let Some(run) = self.active.as_mut() else {
            tracing::debug!(?timer, "timer fired with no active run");
            return SequencerStep::Ignored;
        };
        if timer.run() != run.handle {
            tracing::debug!(?timer, active = run.handle.0, "stale timer ignored");
            return SequencerStep::Ignored;
        }

        match timer {
            SequencerTimer::StageElapsed { index, .. } => {
                if run.complete || index != run.index {
                    tracing::debug!(index, current = run.index, "out-of-order stage timer ignored");
                    return SequencerStep::Ignored;
                }

                run.timer = None;
                run.index = run.index.saturating_add(1);
                run.arm(scheduler);

                if run.complete {
                    tracing::debug!(run = run.handle.0, "all stages elapsed, settling");
                    SequencerStep::Finished
                } else {
                    SequencerStep::Advanced(run.progress())
                }
            }
            SequencerTimer::Settled { .. } => {
                if !run.complete {
                    return SequencerStep::Ignored;
                }
                let handle = run.handle;
                self.active = None;
                tracing::debug!(run = handle.0, "sequencer run completed");
                SequencerStep::Completed(handle)
            }
        }
    }

    /// Cancel a run before it completes.
    ///
    /// Guarantees `Completed` will never be reported for `handle`. Cancelling
    /// a finished, unknown or already-cancelled run is a no-op and returns
    /// `false`.
    pub fn cancel(&mut self, scheduler: &mut Scheduler<SequencerTimer>, handle: RunHandle) -> bool {
        match self.active.take() {
            Some(run) if run.handle == handle => {
                if let Some(timer) = run.timer {
                    scheduler.cancel(timer);
                }
                tracing::debug!(run = handle.0, "sequencer run cancelled");
                true
            }
            other => {
                self.active = other;
                false
            }
        }
    }

    /// Check if a run is in progress.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Handle of the run in progress, if any.
    #[must_use]
    pub fn active_handle(&self) -> Option<RunHandle> {
        self.active.as_ref().map(|run| run.handle)
    }

    /// Progress of the run in progress, if any.
    #[must_use]
    pub fn progress(&self) -> Option<StageProgress> {
        self.active.as_ref().map(ActiveRun::progress)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::DEFAULT_SETTLE_DELAY;

    fn stages(durations: &[u64]) -> Vec<ProcessingStage> {
        durations
            .iter()
            .enumerate()
            .map(|(i, ms)| ProcessingStage::new(format!("stage {i}"), Millis(*ms)))
            .collect()
    }

    /// Drain every due timer up to `until`, collecting the steps.
    fn drive(
        sequencer: &mut StagedProgressSequencer,
        scheduler: &mut Scheduler<SequencerTimer>,
        until: u64,
    ) -> Vec<SequencerStep> {
        let mut steps = Vec::new();
        while let Some((_, timer)) = scheduler.pop_due(Millis(until)) {
            steps.push(sequencer.fire(scheduler, timer));
        }
        scheduler.advance_to(Millis(until));
        steps
    }

    fn completions(steps: &[SequencerStep]) -> usize {
        steps
            .iter()
            .filter(|s| matches!(s, SequencerStep::Completed(_)))
            .count()
    }

    #[test]
    fn starts_at_stage_zero() {
        let mut scheduler = Scheduler::new();
        let mut sequencer = StagedProgressSequencer::new();
        sequencer
            .run(&mut scheduler, stages(&[100, 200]), Millis(50))
            .expect("run");

        let progress = sequencer.progress().expect("progress");
        assert_eq!(progress.index, 0);
        assert_eq!(progress.total, 2);
        assert_eq!(progress.label.as_deref(), Some("stage 0"));
        assert!(!progress.complete);
        assert_eq!(scheduler.pending(), 1);
    }

    #[test]
    fn stages_advance_in_order_then_complete_once() {
        let mut scheduler = Scheduler::new();
        let mut sequencer = StagedProgressSequencer::new();
        let handle = sequencer
            .run(&mut scheduler, stages(&[100, 200, 300]), Millis(50))
            .expect("run");

        assert!(drive(&mut sequencer, &mut scheduler, 99).is_empty());

        let steps = drive(&mut sequencer, &mut scheduler, 100);
        assert!(matches!(&steps[..], [SequencerStep::Advanced(p)] if p.index == 1));

        let steps = drive(&mut sequencer, &mut scheduler, 300);
        assert!(matches!(&steps[..], [SequencerStep::Advanced(p)] if p.index == 2));

        let steps = drive(&mut sequencer, &mut scheduler, 600);
        assert_eq!(steps, vec![SequencerStep::Finished]);
        assert!(sequencer.progress().is_some_and(|p| p.complete && p.label.is_none()));

        let steps = drive(&mut sequencer, &mut scheduler, 649);
        assert!(steps.is_empty());

        let steps = drive(&mut sequencer, &mut scheduler, 650);
        assert_eq!(steps, vec![SequencerStep::Completed(handle)]);
        assert!(!sequencer.is_active());
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn late_drive_still_steps_one_stage_per_fire() {
        let mut scheduler = Scheduler::new();
        let mut sequencer = StagedProgressSequencer::new();
        sequencer
            .run(&mut scheduler, stages(&[100, 100, 100]), Millis(10))
            .expect("run");

        // One big jump: every stage still reported, in order.
        let steps = drive(&mut sequencer, &mut scheduler, 10_000);
        let indices: Vec<_> = steps
            .iter()
            .filter_map(|s| match s {
                SequencerStep::Advanced(p) => Some(p.index),
                _ => None,
            })
            .collect();
        assert_eq!(indices, vec![1, 2]);
        assert_eq!(completions(&steps), 1);
        assert_eq!(steps.len(), 4);
    }

    #[test]
    fn empty_stage_list_completes_after_settle() {
        let mut scheduler = Scheduler::new();
        let mut sequencer = StagedProgressSequencer::new();
        sequencer
            .run(&mut scheduler, Vec::new(), Millis(1000))
            .expect("run");

        assert!(sequencer.progress().is_some_and(|p| p.complete));
        assert!(drive(&mut sequencer, &mut scheduler, 999).is_empty());
        assert_eq!(completions(&drive(&mut sequencer, &mut scheduler, 1000)), 1);
    }

    #[test]
    fn run_while_active_is_rejected() {
        let mut scheduler = Scheduler::new();
        let mut sequencer = StagedProgressSequencer::new();
        sequencer
            .run(&mut scheduler, stages(&[100]), Millis(10))
            .expect("run");

        assert!(matches!(
            sequencer.run(&mut scheduler, stages(&[100]), Millis(10)),
            Err(FlowError::RunActive)
        ));
    }

    #[test]
    fn cancel_suppresses_completion() {
        let mut scheduler = Scheduler::new();
        let mut sequencer = StagedProgressSequencer::new();
        let handle = sequencer
            .run(&mut scheduler, stages(&[100, 100]), Millis(10))
            .expect("run");
        assert_eq!(sequencer.active_handle(), Some(handle));

        drive(&mut sequencer, &mut scheduler, 150);
        assert!(sequencer.cancel(&mut scheduler, handle));
        assert_eq!(sequencer.active_handle(), None);
        assert_eq!(scheduler.pending(), 0);

        let steps = drive(&mut sequencer, &mut scheduler, 10_000);
        assert_eq!(completions(&steps), 0);
    }

    #[test]
    fn cancel_twice_or_after_completion_is_noop() {
        let mut scheduler = Scheduler::new();
        let mut sequencer = StagedProgressSequencer::new();
        let handle = sequencer
            .run(&mut scheduler, stages(&[100]), Millis(10))
            .expect("run");

        assert!(sequencer.cancel(&mut scheduler, handle));
        assert!(!sequencer.cancel(&mut scheduler, handle));

        let second = sequencer
            .run(&mut scheduler, stages(&[100]), Millis(10))
            .expect("run");
        assert_ne!(handle, second);
        // Cancelling the old handle must not touch the new run.
        assert!(!sequencer.cancel(&mut scheduler, handle));
        assert!(sequencer.is_active());

        drive(&mut sequencer, &mut scheduler, 10_000);
        assert!(!sequencer.cancel(&mut scheduler, second));
    }

    #[test]
    fn stale_timer_from_cancelled_run_is_ignored() {
        let mut scheduler = Scheduler::new();
        let mut sequencer = StagedProgressSequencer::new();
        let old = sequencer
            .run(&mut scheduler, stages(&[100]), Millis(10))
            .expect("run");
        sequencer.cancel(&mut scheduler, old);
        sequencer
            .run(&mut scheduler, stages(&[500]), Millis(10))
            .expect("run");

        let stale = SequencerTimer::Settled { run: old };
        assert_eq!(sequencer.fire(&mut scheduler, stale), SequencerStep::Ignored);
        assert!(sequencer.is_active());
    }

    #[test]
    fn default_stage_total() {
        let total = total_duration(&ProcessingStage::defaults(), DEFAULT_SETTLE_DELAY);
        assert_eq!(total, Millis(9700));
    }
}
