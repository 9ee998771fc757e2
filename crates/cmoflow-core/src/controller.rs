//! # Phase Controller
//!
//! Owns one session: the asset registry, the phase, the sequencer and the
//! virtual clock that drives it.
//!
//! ## Control Flow
//!
//! ```text
//!  ingest/remove ──► AssetRegistry ──has_primary()──┐
//!                                                   ▼
//!  request_advance() ─────────────────────► Intake ──► Processing
//!                                                          │ sequencer.run()
//!  advance_clock() ──► Scheduler ──► sequencer.fire() ─────┤
//!                                                          ▼ Completed
//!  reset() ◄───────────────────────────────────────────── Revealed
//! ```
//!
//! All state lives here behind a narrow API. Presentational collaborators
//! read snapshots and subscribe to `FlowEvent`s; they never mutate state
//! directly.

use crate::config::FlowConfig;
use crate::phase::{SessionPhase, Transition};
use crate::registry::AssetRegistry;
use crate::scheduler::Scheduler;
use crate::sequencer::{
    RunHandle, SequencerStep, SequencerTimer, StageProgress, StagedProgressSequencer,
};
use crate::{Asset, AssetId, Millis, Payload};
use serde::Serialize;
use std::collections::BTreeMap;

// =============================================================================
// EVENTS & SUBSCRIPTIONS
// =============================================================================

/// Notification delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum FlowEvent {
    /// The session moved to a new phase.
    PhaseChanged {
        from: SessionPhase,
        to: SessionPhase,
    },
    /// A processing stage became current.
    StageStarted { progress: StageProgress },
    /// Every stage elapsed; the reveal follows after the settle delay.
    StagesFinished,
    /// The asset list changed.
    AssetsChanged { count: usize, has_primary: bool },
}

/// Identifier returned by `subscribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SubscriptionId(pub u64);

type Listener = Box<dyn FnMut(&FlowEvent)>;

/// State of the control that starts processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TriggerState {
    /// The control accepts a press.
    pub enabled: bool,
    /// Processing is underway.
    pub busy: bool,
    /// Number of assets in the registry.
    pub asset_count: usize,
}

// =============================================================================
// CONTROLLER
// =============================================================================

/// Finite-state machine for one single-user session.
pub struct PhaseController {
    phase: SessionPhase,
    registry: AssetRegistry,
    sequencer: StagedProgressSequencer,
    scheduler: Scheduler<SequencerTimer>,
    config: FlowConfig,
    /// Run started by the last entry into `Processing`.
    active_run: Option<RunHandle>,
    listeners: BTreeMap<SubscriptionId, Listener>,
    next_subscription: u64,
    completed_runs: u64,
}

impl std::fmt::Debug for PhaseController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhaseController")
            .field("phase", &self.phase)
            .field("registry", &self.registry)
            .field("sequencer", &self.sequencer)
            .field("now", &self.scheduler.now())
            .field("active_run", &self.active_run)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Default for PhaseController {
    fn default() -> Self {
        Self::new(FlowConfig::default())
    }
}

impl PhaseController {
    /// Create a controller in `Intake` with an empty registry.
    #[must_use]
    pub fn new(config: FlowConfig) -> Self {
        Self::with_registry(config, AssetRegistry::new())
    }

    /// Create a controller around an existing (usually empty) registry.
    ///
    /// Used to plug in a custom preview store.
    #[must_use]
    pub fn with_registry(config: FlowConfig, registry: AssetRegistry) -> Self {
        Self {
            phase: SessionPhase::Intake,
            registry,
            sequencer: StagedProgressSequencer::new(),
            scheduler: Scheduler::new(),
            config,
            active_run: None,
            listeners: BTreeMap::new(),
            next_subscription: 0,
            completed_runs: 0,
        }
    }

    // -------------------------------------------------------------------------
    // Read access
    // -------------------------------------------------------------------------

    /// The active phase.
    #[must_use]
    pub fn current_phase(&self) -> SessionPhase {
        self.phase
    }

    /// Busy indicator: asserted for the whole of `Processing`.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.phase.is_busy()
    }

    /// Check the advance guard: in `Intake` with a primary asset.
    #[must_use]
    pub fn can_advance(&self) -> bool {
        self.phase.apply(Transition::Advance).is_some() && self.registry.has_primary()
    }

    /// Snapshot for the control that starts processing.
    #[must_use]
    pub fn trigger_state(&self) -> TriggerState {
        TriggerState {
            enabled: self.can_advance(),
            busy: self.is_busy(),
            asset_count: self.registry.len(),
        }
    }

    /// Read access to the registry.
    #[must_use]
    pub fn registry(&self) -> &AssetRegistry {
        &self.registry
    }

    /// The configuration sessions run with.
    #[must_use]
    pub fn config(&self) -> &FlowConfig {
        &self.config
    }

    /// Progress of the running sequence, if processing.
    #[must_use]
    pub fn progress(&self) -> Option<StageProgress> {
        self.sequencer.progress()
    }

    /// Number of times processing ran to completion.
    #[must_use]
    pub fn completed_runs(&self) -> u64 {
        self.completed_runs
    }

    /// Current virtual time.
    #[must_use]
    pub fn now(&self) -> Millis {
        self.scheduler.now()
    }

    /// When the next timer is due, if any is pending.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Millis> {
        self.scheduler.next_deadline()
    }

    // -------------------------------------------------------------------------
    // Subscriptions
    // -------------------------------------------------------------------------

    /// Register a listener for `FlowEvent`s.
    pub fn subscribe(&mut self, listener: impl FnMut(&FlowEvent) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription = self.next_subscription.saturating_add(1);
        self.listeners.insert(id, Box::new(listener));
        id
    }

    /// Remove a listener. Returns `false` if it was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.listeners.remove(&id).is_some()
    }

    // -------------------------------------------------------------------------
    // Intake
    // -------------------------------------------------------------------------

    /// Ingest payloads into the registry and notify subscribers.
    pub fn ingest<I>(&mut self, payloads: I) -> &[Asset]
    where
        I: IntoIterator<Item = Payload>,
    {
        self.registry.ingest(payloads);
        self.emit_assets_changed();
        self.registry.assets()
    }

    /// Remove an asset and notify subscribers if anything changed.
    pub fn remove(&mut self, id: AssetId) -> bool {
        let removed = self.registry.remove(id);
        if removed {
            self.emit_assets_changed();
        }
        removed
    }

    // -------------------------------------------------------------------------
    // Transitions
    // -------------------------------------------------------------------------

    /// Move from `Intake` to `Processing` and start the sequencer.
    ///
    /// A no-op returning `false` when not in `Intake` or when the registry
    /// has no primary asset.
    pub fn request_advance(&mut self) -> bool {
        let Some(next) = self.phase.apply(Transition::Advance) else {
            tracing::debug!(phase = %self.phase, "advance refused: invalid transition");
            return false;
        };
        if !self.registry.has_primary() {
            tracing::debug!("advance refused: no primary asset");
            return false;
        }

        // At most one run: anything left over is cancelled first.
        if let Some(previous) = self.active_run.take() {
            self.sequencer.cancel(&mut self.scheduler, previous);
        }

        let run = match self.sequencer.run(
            &mut self.scheduler,
            self.config.stages.clone(),
            self.config.settle_delay,
        ) {
            Ok(run) => run,
            Err(e) => {
                tracing::warn!(error = %e, "advance refused: sequencer unavailable");
                return false;
            }
        };
        self.active_run = Some(run);

        self.set_phase(next);
        match self.sequencer.progress() {
            Some(progress) if progress.label.is_some() => {
                self.emit(&FlowEvent::StageStarted { progress });
            }
            Some(_) => self.emit(&FlowEvent::StagesFinished),
            None => {}
        }
        true
    }

    /// Return to `Intake` from `Processing` or `Revealed`.
    ///
    /// Cancels any in-flight run before touching phase or registry, then
    /// releases every asset. A no-op returning `false` from `Intake`.
    pub fn reset(&mut self) -> bool {
        let Some(next) = self.phase.apply(Transition::Reset) else {
            tracing::debug!(phase = %self.phase, "reset refused: invalid transition");
            return false;
        };

        if let Some(run) = self.active_run.take() {
            self.sequencer.cancel(&mut self.scheduler, run);
        }

        self.registry.clear();
        self.set_phase(next);
        self.emit_assets_changed();
        true
    }

    // -------------------------------------------------------------------------
    // Clock
    // -------------------------------------------------------------------------

    /// Advance the virtual clock by `delta`, firing every timer that falls
    /// due, in deadline order.
    pub fn advance_clock(&mut self, delta: Millis) {
        let until = self.scheduler.now().saturating_add(delta);
        self.advance_clock_to(until);
    }

    /// Advance the virtual clock to an absolute time.
    pub fn advance_clock_to(&mut self, until: Millis) {
        while let Some((_, timer)) = self.scheduler.pop_due(until) {
            self.dispatch(timer);
        }
        self.scheduler.advance_to(until);
    }

    /// Fire timers until none are pending. Returns the final virtual time.
    pub fn run_until_idle(&mut self) -> Millis {
        while let Some(deadline) = self.scheduler.next_deadline() {
            self.advance_clock_to(deadline);
        }
        self.scheduler.now()
    }

    fn dispatch(&mut self, timer: SequencerTimer) {
        match self.sequencer.fire(&mut self.scheduler, timer) {
            SequencerStep::Advanced(progress) => self.emit(&FlowEvent::StageStarted { progress }),
            SequencerStep::Finished => self.emit(&FlowEvent::StagesFinished),
            SequencerStep::Completed(run) => self.on_complete(run),
            SequencerStep::Ignored => {}
        }
    }

    /// Completion signal from the sequencer.
    fn on_complete(&mut self, run: RunHandle) {
        if self.active_run != Some(run) {
            tracing::debug!(run = run.0, "stale completion ignored");
            return;
        }
        self.active_run = None;

        let Some(next) = self.phase.apply(Transition::Complete) else {
            tracing::debug!(phase = %self.phase, "completion outside processing ignored");
            return;
        };
        self.completed_runs = self.completed_runs.saturating_add(1);
        self.set_phase(next);
    }

    // -------------------------------------------------------------------------
    // Notification
    // -------------------------------------------------------------------------

    fn set_phase(&mut self, next: SessionPhase) {
        let from = self.phase;
        if from == next {
            return;
        }
        self.phase = next;
        tracing::info!(%from, to = %next, at = %self.scheduler.now(), "phase changed");
        self.emit(&FlowEvent::PhaseChanged { from, to: next });
    }

    fn emit_assets_changed(&mut self) {
        let event = FlowEvent::AssetsChanged {
            count: self.registry.len(),
            has_primary: self.registry.has_primary(),
        };
        self.emit(&event);
    }

    fn emit(&mut self, event: &FlowEvent) {
        for listener in self.listeners.values_mut() {
            listener(event);
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sequencer::ProcessingStage;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn image(name: &str) -> Payload {
        Payload::new(name, "image/jpeg", vec![0xFF, 0xD8, 0xFF, 0xE0])
    }

    fn pdf(name: &str) -> Payload {
        Payload::new(name, "application/pdf", b"%PDF-1.4".to_vec())
    }

    fn short_config() -> FlowConfig {
        FlowConfig {
            stages: vec![
                ProcessingStage::new("one", Millis(100)),
                ProcessingStage::new("two", Millis(200)),
            ],
            settle_delay: Millis(50),
        }
    }

    fn recorded(controller: &mut PhaseController) -> Rc<RefCell<Vec<FlowEvent>>> {
        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        controller.subscribe(move |e| sink.borrow_mut().push(e.clone()));
        events
    }

    #[test]
    fn advance_without_primary_is_noop() {
        let mut controller = PhaseController::new(short_config());
        controller.ingest([pdf("deck.pdf")]);

        assert!(!controller.can_advance());
        assert!(!controller.request_advance());
        assert_eq!(controller.current_phase(), SessionPhase::Intake);
        assert!(!controller.is_busy());
    }

    #[test]
    fn advance_with_primary_enters_processing() {
        let mut controller = PhaseController::new(short_config());
        controller.ingest([image("me.jpg")]);

        assert_eq!(controller.config(), &short_config());
        assert!(controller.trigger_state().enabled);
        assert!(controller.request_advance());
        assert_eq!(controller.current_phase(), SessionPhase::Processing);
        assert!(controller.is_busy());
        assert!(!controller.trigger_state().enabled);
        assert_eq!(controller.progress().map(|p| p.index), Some(0));
    }

    #[test]
    fn completion_reveals_exactly_once() {
        let mut controller = PhaseController::new(short_config());
        controller.ingest([image("me.jpg")]);
        controller.request_advance();

        controller.advance_clock(Millis(349));
        assert_eq!(controller.current_phase(), SessionPhase::Processing);

        controller.advance_clock(Millis(1));
        assert_eq!(controller.current_phase(), SessionPhase::Revealed);
        assert!(!controller.is_busy());
        assert_eq!(controller.completed_runs(), 1);

        controller.advance_clock(Millis(10_000));
        assert_eq!(controller.completed_runs(), 1);
        assert_eq!(controller.next_deadline(), None);
    }

    #[test]
    fn second_advance_while_processing_is_refused() {
        let mut controller = PhaseController::new(short_config());
        controller.ingest([image("me.jpg")]);
        assert!(controller.request_advance());
        assert!(!controller.request_advance());
        assert_eq!(controller.run_until_idle(), Millis(350));
        assert_eq!(controller.completed_runs(), 1);
    }

    #[test]
    fn reset_during_processing_cancels_run() {
        let mut controller = PhaseController::new(short_config());
        controller.ingest([image("me.jpg"), pdf("deck.pdf")]);
        controller.request_advance();
        controller.advance_clock(Millis(150));

        assert!(controller.reset());
        assert_eq!(controller.current_phase(), SessionPhase::Intake);
        assert!(controller.registry().is_empty());
        assert_eq!(controller.registry().live_previews(), 0);
        assert_eq!(controller.next_deadline(), None);

        controller.advance_clock(Millis(10_000));
        assert_eq!(controller.current_phase(), SessionPhase::Intake);
        assert_eq!(controller.completed_runs(), 0);
    }

    #[test]
    fn reset_from_revealed_clears_registry() {
        let mut controller = PhaseController::new(short_config());
        controller.ingest([image("me.jpg")]);
        controller.request_advance();
        controller.run_until_idle();

        assert!(controller.reset());
        assert_eq!(controller.current_phase(), SessionPhase::Intake);
        assert!(!controller.registry().has_primary());
        assert!(!controller.request_advance());
    }

    #[test]
    fn reset_from_intake_is_noop() {
        let mut controller = PhaseController::new(short_config());
        controller.ingest([image("me.jpg")]);

        assert!(!controller.reset());
        assert_eq!(controller.registry().len(), 1);
    }

    #[test]
    fn session_can_run_again_after_reset() {
        let mut controller = PhaseController::new(short_config());
        controller.ingest([image("a.jpg")]);
        controller.request_advance();
        controller.advance_clock(Millis(120));
        controller.reset();

        controller.ingest([image("b.jpg")]);
        assert!(controller.request_advance());
        controller.run_until_idle();
        assert_eq!(controller.current_phase(), SessionPhase::Revealed);
        assert_eq!(controller.completed_runs(), 1);
    }

    #[test]
    fn events_follow_the_session() {
        let mut controller = PhaseController::new(short_config());
        let events = recorded(&mut controller);

        controller.ingest([image("me.jpg")]);
        controller.request_advance();
        controller.run_until_idle();

        let events = events.borrow();
        let labels: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                FlowEvent::StageStarted { progress } => progress.label.clone(),
                _ => None,
            })
            .collect();
        assert_eq!(labels, vec!["one".to_string(), "two".to_string()]);

        let phases: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                FlowEvent::PhaseChanged { to, .. } => Some(*to),
                _ => None,
            })
            .collect();
        assert_eq!(phases, vec![SessionPhase::Processing, SessionPhase::Revealed]);

        assert_eq!(
            events.first(),
            Some(&FlowEvent::AssetsChanged {
                count: 1,
                has_primary: true
            })
        );
        assert!(events.contains(&FlowEvent::StagesFinished));
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let mut controller = PhaseController::new(short_config());
        let events = Rc::new(RefCell::new(0usize));
        let sink = Rc::clone(&events);
        let id = controller.subscribe(move |_| *sink.borrow_mut() += 1);

        controller.ingest([pdf("a.pdf")]);
        assert!(controller.unsubscribe(id));
        assert!(!controller.unsubscribe(id));
        controller.ingest([pdf("b.pdf")]);

        assert_eq!(*events.borrow(), 1);
    }

    #[test]
    fn empty_stage_list_reveals_after_settle() {
        let config = FlowConfig {
            stages: Vec::new(),
            settle_delay: Millis(1000),
        };
        let mut controller = PhaseController::new(config);
        let events = recorded(&mut controller);
        controller.ingest([image("me.jpg")]);
        controller.request_advance();

        controller.advance_clock(Millis(1000));
        assert_eq!(controller.current_phase(), SessionPhase::Revealed);
        assert!(events.borrow().contains(&FlowEvent::StagesFinished));
    }
}
