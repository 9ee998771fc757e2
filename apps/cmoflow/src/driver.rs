//! # Clock Driver
//!
//! Moves a `PhaseController`'s virtual clock until the session settles.
//!
//! - `Virtual`: jumps straight from one deadline to the next
//! - `Realtime`: sleeps on tokio time for each gap, then advances the
//!   virtual clock by the same amount
//!
//! Either way the core sees the same sequence of deadlines, so a realtime
//! run behaves exactly like the virtual one, only slower.

use cmoflow_core::{Millis, PhaseController};
use std::time::Duration;

/// How the driver waits between deadlines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockMode {
    /// Do not wait at all.
    Virtual,
    /// Wait on the tokio timer.
    Realtime,
}

/// Drive the session until no timer is pending.
///
/// If `reset_at` is set, the session is reset once the virtual clock reaches
/// that time (if it is still pending by then), cancelling any run in
/// flight.
pub async fn drive(controller: &mut PhaseController, mode: ClockMode, reset_at: Option<Millis>) {
    let mut reset_at = reset_at;

    loop {
        let next = controller.next_deadline();

        let target = match (next, reset_at) {
            (Some(deadline), Some(reset)) if reset <= deadline => reset,
            (Some(deadline), _) => deadline,
            (None, _) => break,
        };

        let gap = target.saturating_sub(controller.now());
        if mode == ClockMode::Realtime && gap > Millis::ZERO {
            tokio::time::sleep(Duration::from_millis(gap.value())).await;
        }
        controller.advance_clock_to(target);

        if reset_at.is_some_and(|reset| controller.now() >= reset) {
            reset_at = None;
            tracing::info!(at = %controller.now(), "resetting session");
            controller.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cmoflow_core::{FlowConfig, Payload, ProcessingStage, SessionPhase};

    fn ready_controller() -> PhaseController {
        let config = FlowConfig {
            stages: vec![
                ProcessingStage::new("a", Millis(100)),
                ProcessingStage::new("b", Millis(100)),
            ],
            settle_delay: Millis(100),
        };
        let mut controller = PhaseController::new(config);
        controller.ingest([Payload::new("me.png", "image/png", vec![0x89, b'P'])]);
        controller.request_advance();
        controller
    }

    #[tokio::test]
    async fn virtual_drive_reaches_reveal() {
        let mut controller = ready_controller();
        drive(&mut controller, ClockMode::Virtual, None).await;

        assert_eq!(controller.current_phase(), SessionPhase::Revealed);
        assert_eq!(controller.now(), Millis(300));
    }

    #[tokio::test]
    async fn reset_point_cancels_run() {
        let mut controller = ready_controller();
        drive(&mut controller, ClockMode::Virtual, Some(Millis(150))).await;

        assert_eq!(controller.current_phase(), SessionPhase::Intake);
        assert_eq!(controller.completed_runs(), 0);
        assert_eq!(controller.now(), Millis(150));
    }

    #[tokio::test(start_paused = true)]
    async fn realtime_drive_waits_on_tokio_time() {
        let mut controller = ready_controller();
        let started = tokio::time::Instant::now();
        drive(&mut controller, ClockMode::Realtime, None).await;

        assert_eq!(controller.current_phase(), SessionPhase::Revealed);
        assert!(started.elapsed() >= Duration::from_millis(300));
    }
}
