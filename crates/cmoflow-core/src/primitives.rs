//! # Innate Primitives
//!
//! Hardcoded runtime constants for the cmoflow core.
//!
//! These values are compiled into the binary. Anything a deployment may want
//! to tune (stage list, settle delay) goes through `FlowConfig` instead and
//! only falls back to the defaults below.

use crate::types::Millis;

/// Default processing stages as `(label, duration in ms)`.
///
/// Iterated in order, exactly once per entry into the processing phase.
pub const DEFAULT_STAGES: &[(&str, u64)] = &[
    ("Understanding company details...", 2000),
    ("Analyzing market positioning...", 2500),
    ("Composing UGC videos...", 2200),
    ("Drafting landing pages...", 2000),
];

/// Delay between the last stage elapsing and the completion signal.
pub const DEFAULT_SETTLE_DELAY: Millis = Millis(1000);

/// Prefix shared by every image content type.
pub const IMAGE_TYPE_PREFIX: &str = "image/";

/// Content type used when nothing was declared and sniffing found nothing.
pub const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Prefix of handles issued by the in-memory preview store.
pub const PREVIEW_SCHEME: &str = "preview:";

// =============================================================================
// CONFIGURATION LIMITS
// =============================================================================

/// Maximum number of stages in one configured sequence.
pub const MAX_STAGES: usize = 64;

/// Maximum length of a stage label, in bytes.
pub const MAX_LABEL_LENGTH: usize = 256;
