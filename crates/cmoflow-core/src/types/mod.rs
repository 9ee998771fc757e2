//! # Core Type Definitions
//!
//! This module contains the value types shared by every component:
//! - Identifiers (`AssetId`, `PreviewHandle`)
//! - Time (`Millis`)
//! - Intake input (`Payload`, `ContentType`)
//! - Registry output (`Asset`, `Classification`)
//! - Error types (`FlowError`)
//!
//! ## Determinism Guarantees
//!
//! All types in this module:
//! - Use integer arithmetic only (no floating-point)
//! - Implement `Ord` where they are used as `BTreeMap`/`BTreeSet` keys
//! - Use saturating arithmetic for time to prevent overflow

use crate::detect::sniff_content_type;
use crate::primitives::{FALLBACK_CONTENT_TYPE, IMAGE_TYPE_PREFIX};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// =============================================================================
// IDENTIFIERS
// =============================================================================

/// Opaque identifier of an asset held by the registry.
///
/// Allocated from a monotonic counter at ingestion time and never reused
/// within one registry, so a stale id can never address a newer asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AssetId(pub u64);

impl std::fmt::Display for AssetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "asset-{}", self.0)
    }
}

/// Handle to a derived in-memory preview of an image asset.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PreviewHandle(pub String);

impl PreviewHandle {
    /// Create a handle from its string form.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the handle as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PreviewHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// TIME
// =============================================================================

/// A span or point on the virtual clock, in whole milliseconds.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
pub struct Millis(pub u64);

impl Millis {
    /// Zero milliseconds.
    pub const ZERO: Self = Self(0);

    /// Create a new span.
    #[must_use]
    pub const fn new(ms: u64) -> Self {
        Self(ms)
    }

    /// Get the raw millisecond count.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }

    /// Add two spans, clamping at `u64::MAX`.
    #[must_use]
    pub const fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    /// Subtract two spans, clamping at zero.
    #[must_use]
    pub const fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }
}

impl std::fmt::Display for Millis {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

// =============================================================================
// CONTENT TYPE
// =============================================================================

/// A resolved MIME content type, stored lowercase.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ContentType(String);

impl ContentType {
    /// Create a content type. The value is trimmed and lowercased.
    #[must_use]
    pub fn new(s: impl AsRef<str>) -> Self {
        Self(s.as_ref().trim().to_ascii_lowercase())
    }

    /// Get the content type as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check if this is an `image/*` type.
    #[must_use]
    pub fn is_image(&self) -> bool {
        self.0.starts_with(IMAGE_TYPE_PREFIX)
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// PAYLOAD
// =============================================================================

/// Raw user-supplied file: a name, an optional declared content type and
/// the bytes themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    /// Display name (usually the file name).
    pub name: String,
    /// Content type declared by whoever picked the file, if any.
    pub declared_type: Option<String>,
    /// The file contents.
    pub bytes: Vec<u8>,
}

impl Payload {
    /// Create a payload with a declared content type.
    #[must_use]
    pub fn new(name: impl Into<String>, declared_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            declared_type: Some(declared_type.into()),
            bytes,
        }
    }

    /// Create a payload whose type will be sniffed from its bytes.
    #[must_use]
    pub fn undeclared(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            declared_type: None,
            bytes,
        }
    }

    /// Resolve the content type of this payload.
    ///
    /// A non-blank declared type always wins. Otherwise the leading bytes
    /// are sniffed, falling back to `application/octet-stream`.
    #[must_use]
    pub fn content_type(&self) -> ContentType {
        match self.declared_type.as_deref().map(str::trim) {
            Some(declared) if !declared.is_empty() => ContentType::new(declared),
            _ => ContentType::new(sniff_content_type(&self.bytes).unwrap_or(FALLBACK_CONTENT_TYPE)),
        }
    }
}

// =============================================================================
// ASSET
// =============================================================================

/// Role of an asset within the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    /// The profile image. At most one per registry.
    Primary,
    /// Everything else: later images and all documents.
    Supplementary,
}

impl Classification {
    /// Human-facing label for the intake list.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Classification::Primary => "Profile Photo",
            Classification::Supplementary => "Document",
        }
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A payload tracked by the registry.
///
/// Classification is fixed at ingestion; only the registry can attach or
/// take the preview handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    pub(crate) id: AssetId,
    pub(crate) payload: Payload,
    pub(crate) content_type: ContentType,
    pub(crate) classification: Classification,
    pub(crate) preview: Option<PreviewHandle>,
}

impl Asset {
    /// The asset identifier.
    #[must_use]
    pub fn id(&self) -> AssetId {
        self.id
    }

    /// The original payload.
    #[must_use]
    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Shortcut for the payload name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.payload.name
    }

    /// The content type resolved at ingestion.
    #[must_use]
    pub fn content_type(&self) -> &ContentType {
        &self.content_type
    }

    /// The classification decided at ingestion.
    #[must_use]
    pub fn classification(&self) -> Classification {
        self.classification
    }

    /// Check if this asset is the primary one.
    #[must_use]
    pub fn is_primary(&self) -> bool {
        self.classification == Classification::Primary
    }

    /// The live preview handle, if this is an image asset.
    #[must_use]
    pub fn preview(&self) -> Option<&PreviewHandle> {
        self.preview.as_ref()
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the flow engine.
///
/// Invalid phase transitions, double cancels and stale completions are not
/// errors: they are guarded no-ops and never reach this type.
#[derive(Debug, Error)]
pub enum FlowError {
    /// `run` was called while a previous run is still active.
    #[error("A sequencer run is already active")]
    RunActive,

    /// A preview handle was released that is not currently live.
    #[error("Preview not live: {0}")]
    PreviewNotLive(PreviewHandle),

    /// The preview store could not create a preview.
    #[error("Preview creation failed: {0}")]
    PreviewFailed(String),

    /// Flow configuration is invalid.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),
}

// =============================================================================
// TESTS
// =============================================================================
