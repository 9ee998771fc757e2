//! # Session Phases
//!
//! The three mutually exclusive phases of a session and the table of
//! allowed transitions between them.
//!
//! | From       | Transition | To         |
//! |------------|------------|------------|
//! | Intake     | Advance    | Processing |
//! | Processing | Complete   | Revealed   |
//! | Processing | Reset      | Intake     |
//! | Revealed   | Reset      | Intake     |
//!
//! Every other pair is invalid. Invalid transitions are refused silently:
//! the triggering control is expected to be disabled already.

use serde::{Deserialize, Serialize};

/// Phase of a session.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// Collecting assets. Initial phase.
    #[default]
    Intake,
    /// Running the staged progress sequence.
    Processing,
    /// Showing results.
    Revealed,
}

/// A requested phase change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Transition {
    /// User asks to start processing. Gated on a primary asset.
    Advance,
    /// The sequencer finished. Only the controller issues this.
    Complete,
    /// User starts over.
    Reset,
}

impl SessionPhase {
    /// Get the phase name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            SessionPhase::Intake => "intake",
            SessionPhase::Processing => "processing",
            SessionPhase::Revealed => "revealed",
        }
    }

    /// Apply a transition.
    ///
    /// Returns the resulting phase, or `None` if the transition is not in
    /// the table.
    #[must_use]
    pub fn apply(self, transition: Transition) -> Option<SessionPhase> {
        match (self, transition) {
            (SessionPhase::Intake, Transition::Advance) => Some(SessionPhase::Processing),
            (SessionPhase::Processing, Transition::Complete) => Some(SessionPhase::Revealed),
            (SessionPhase::Processing | SessionPhase::Revealed, Transition::Reset) => {
                Some(SessionPhase::Intake)
            }
            _ => None,
        }
    }

    /// Check if the busy indicator is asserted in this phase.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        matches!(self, SessionPhase::Processing)
    }
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_PHASES: [SessionPhase; 3] = [
        SessionPhase::Intake,
        SessionPhase::Processing,
        SessionPhase::Revealed,
    ];
    const ALL_TRANSITIONS: [Transition; 3] =
        [Transition::Advance, Transition::Complete, Transition::Reset];

    #[test]
    fn initial_phase_is_intake() {
        assert_eq!(SessionPhase::default(), SessionPhase::Intake);
    }

    #[test]
    fn exactly_four_valid_transitions() {
        let valid = ALL_PHASES
            .iter()
            .flat_map(|p| ALL_TRANSITIONS.iter().map(move |t| p.apply(*t)))
            .filter(Option::is_some)
            .count();
        assert_eq!(valid, 4);
    }

    #[test]
    fn invalid_transitions_are_refused() {
        assert_eq!(SessionPhase::Intake.apply(Transition::Complete), None);
        assert_eq!(SessionPhase::Intake.apply(Transition::Reset), None);
        assert_eq!(SessionPhase::Processing.apply(Transition::Advance), None);
        assert_eq!(SessionPhase::Revealed.apply(Transition::Advance), None);
        assert_eq!(SessionPhase::Revealed.apply(Transition::Complete), None);
    }

    #[test]
    fn busy_only_while_processing() {
        assert!(!SessionPhase::Intake.is_busy());
        assert!(SessionPhase::Processing.is_busy());
        assert!(!SessionPhase::Revealed.is_busy());
    }

    #[test]
    fn phase_display() {
        assert_eq!(SessionPhase::Processing.to_string(), "processing");
    }
}
