//! # File Intake
//!
//! Turns paths on disk into core `Payload`s, the way a browser file picker
//! would: the declared content type comes from the extension, files outside
//! the accept list are skipped, and oversized files are refused.

use crate::config::AppConfig;
use cmoflow_core::{FlowError, Payload, content_type_for_extension};
use std::path::{Path, PathBuf};

/// Maximum size of one intake file (100 MB).
///
/// This prevents memory exhaustion from accidental large files.
pub const MAX_INTAKE_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Result of reading a set of paths.
#[derive(Debug, Default)]
pub struct IntakeBatch {
    /// Payloads ready for the registry, in argument order.
    pub payloads: Vec<Payload>,
    /// Files the accept list rejected.
    pub skipped: Vec<PathBuf>,
}

/// Validate a path: it must exist and be a regular file.
///
/// Canonicalization resolves `..` and symlinks before the check.
fn validate_file_path(path: &Path) -> Result<PathBuf, FlowError> {
    let canonical = path.canonicalize().map_err(|e| {
        FlowError::IoError(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(FlowError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), FlowError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| FlowError::IoError(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(FlowError::IoError(format!(
            "File '{}' is {} bytes, maximum allowed is {} bytes",
            path.display(),
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Read one file into a payload.
///
/// The declared type is looked up from the extension. Files with an unknown
/// extension are left undeclared so the core sniffs their bytes.
pub fn read_payload(path: &Path) -> Result<Payload, FlowError> {
    let validated = validate_file_path(path)?;
    validate_file_size(&validated, MAX_INTAKE_FILE_SIZE)?;

    let bytes = std::fs::read(&validated)
        .map_err(|e| FlowError::IoError(format!("Read '{}': {}", path.display(), e)))?;

    let name = validated
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let declared = validated
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(content_type_for_extension);

    Ok(match declared {
        Some(mime) => Payload::new(name, mime, bytes),
        None => Payload::undeclared(name, bytes),
    })
}

/// Read every path, skipping files the accept list rejects.
///
/// Any I/O error aborts the whole batch: nothing is half-ingested.
pub fn read_batch(paths: &[PathBuf], config: &AppConfig) -> Result<IntakeBatch, FlowError> {
    let mut batch = IntakeBatch::default();

    for path in paths {
        let payload = read_payload(path)?;
        let content_type = payload.content_type();

        if config.accepts(&payload.name, content_type.as_str()) {
            tracing::debug!(file = %payload.name, %content_type, "accepted");
            batch.payloads.push(payload);
        } else {
            tracing::warn!(file = %path.display(), %content_type, "file type not accepted, skipping");
            batch.skipped.push(path.clone());
        }
    }

    Ok(batch)
}
