//! # Application Configuration
//!
//! Loads the flow configuration (stage list, settle delay) plus the
//! app-only accept list from a TOML file.
//!
//! ```toml
//! settle_delay_ms = 1000
//! accept = ["image/*", ".pdf", ".doc", ".docx", ".txt"]
//!
//! [[stages]]
//! label = "Understanding company details..."
//! duration_ms = 2000
//! ```
//!
//! Every key is optional; missing keys take the built-in defaults.

use cmoflow_core::{FlowConfig, FlowError};
use serde::Deserialize;
use std::path::Path;

/// Maximum size of a configuration file (1 MB).
pub const MAX_CONFIG_FILE_SIZE: u64 = 1024 * 1024;

/// File kinds the intake accepts by default, as a file picker `accept`
/// attribute would list them.
pub const DEFAULT_ACCEPT: &[&str] = &["image/*", ".pdf", ".doc", ".docx", ".txt"];

/// Full configuration of the binary.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AppConfig {
    /// Stage list and settle delay handed to the core.
    #[serde(flatten)]
    pub flow: FlowConfig,
    /// Accepted MIME patterns (`image/*`) and extensions (`.pdf`).
    #[serde(default = "default_accept")]
    pub accept: Vec<String>,
}

fn default_accept() -> Vec<String> {
    DEFAULT_ACCEPT.iter().map(|s| (*s).to_string()).collect()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            flow: FlowConfig::default(),
            accept: default_accept(),
        }
    }
}

impl AppConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self, FlowError> {
        let config: AppConfig =
            toml::from_str(text).map_err(|e| FlowError::InvalidConfig(e.to_string()))?;
        config.flow.validate()?;
        Ok(config)
    }

    /// Load from a file, or return the defaults when `path` is `None`.
    pub fn load(path: Option<&Path>) -> Result<Self, FlowError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let metadata = std::fs::metadata(path).map_err(|e| {
            FlowError::IoError(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(FlowError::InvalidConfig(format!(
                "Config file {} bytes exceeds maximum {} bytes",
                metadata.len(),
                MAX_CONFIG_FILE_SIZE
            )));
        }

        let text = std::fs::read_to_string(path).map_err(|e| {
            FlowError::IoError(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        tracing::debug!(path = %path.display(), "loaded configuration");
        Self::from_toml_str(&text)
    }

    /// Check if a file with this name and content type passes the accept
    /// list.
    ///
    /// Patterns starting with `.` match the file extension; `type/*` matches
    /// a MIME family; anything else must equal the content type.
    #[must_use]
    pub fn accepts(&self, file_name: &str, content_type: &str) -> bool {
        let name = file_name.to_ascii_lowercase();
        let content_type = content_type.to_ascii_lowercase();

        self.accept.iter().any(|pattern| {
            let pattern = pattern.trim().to_ascii_lowercase();
            if pattern.starts_with('.') {
                name.ends_with(&pattern)
            } else if let Some(family) = pattern.strip_suffix("/*") {
                content_type
                    .split_once('/')
                    .is_some_and(|(top, _)| top == family)
            } else {
                content_type == pattern
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_gives_defaults() {
        let config = AppConfig::from_toml_str("").expect("parse");
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn parses_stages_and_settle() {
        let text = r#"
            settle_delay_ms = 250
            accept = ["image/*"]

            [[stages]]
            label = "Warming up"
            duration_ms = 10

            [[stages]]
            label = "Cooling down"
            duration_ms = 20
        "#;
        let config = AppConfig::from_toml_str(text).expect("parse");

        assert_eq!(config.flow.settle_delay.value(), 250);
        assert_eq!(config.flow.stages.len(), 2);
        assert_eq!(config.flow.stages[1].label, "Cooling down");
        assert_eq!(config.flow.total_duration().value(), 280);
        assert_eq!(config.accept, vec!["image/*".to_string()]);
    }

    #[test]
    fn invalid_stage_is_rejected() {
        let text = r#"
            [[stages]]
            label = ""
            duration_ms = 10
        "#;
        assert!(matches!(
            AppConfig::from_toml_str(text),
            Err(FlowError::InvalidConfig(_))
        ));
    }

    #[test]
    fn accept_rules() {
        let config = AppConfig::default();
        assert!(config.accepts("me.PNG", "image/png"));
        assert!(config.accepts("deck.pdf", "application/pdf"));
        assert!(config.accepts("notes.TXT", "text/plain"));
        assert!(!config.accepts("tool.exe", "application/octet-stream"));
        assert!(!config.accepts("song.mp3", "audio/mpeg"));
    }
}
