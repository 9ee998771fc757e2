//! # Flow Configuration
//!
//! The tunable part of a session: which stages run and how long the settle
//! delay is. Parsing from a file is the binary's job; this module only
//! defines the shape, the defaults and validation.

use crate::primitives::{DEFAULT_SETTLE_DELAY, MAX_LABEL_LENGTH, MAX_STAGES};
use crate::sequencer::{ProcessingStage, total_duration};
use crate::{FlowError, Millis};
use serde::{Deserialize, Serialize};

/// Stage list and settle delay for one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowConfig {
    /// Stages, in the order they run.
    pub stages: Vec<ProcessingStage>,
    /// Delay between the last stage and the reveal.
    #[serde(rename = "settle_delay_ms")]
    pub settle_delay: Millis,
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            stages: ProcessingStage::defaults(),
            settle_delay: DEFAULT_SETTLE_DELAY,
        }
    }
}

impl FlowConfig {
    /// Check limits.
    ///
    /// Rejects more than `MAX_STAGES` stages and blank or oversized labels.
    /// Zero-length stages are allowed.
    pub fn validate(&self) -> Result<(), FlowError> {
        if self.stages.len() > MAX_STAGES {
            return Err(FlowError::InvalidConfig(format!(
                "{} stages exceeds maximum {}",
                self.stages.len(),
                MAX_STAGES
            )));
        }

        for (i, stage) in self.stages.iter().enumerate() {
            if stage.label.trim().is_empty() {
                return Err(FlowError::InvalidConfig(format!("stage {} has an empty label", i)));
            }
            if stage.label.len() > MAX_LABEL_LENGTH {
                return Err(FlowError::InvalidConfig(format!(
                    "stage {} label exceeds {} bytes",
                    i, MAX_LABEL_LENGTH
                )));
            }
        }

        Ok(())
    }

    /// Time from entering processing to the reveal.
    #[must_use]
    pub fn total_duration(&self) -> Millis {
        total_duration(&self.stages, self.settle_delay)
    }
}
