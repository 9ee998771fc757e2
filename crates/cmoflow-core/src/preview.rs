//! # Preview Store
//!
//! Creation and release of in-memory previews for image assets.
//!
//! The `AssetRegistry` is the only owner of a `PreviewStore`: no other
//! component can create or release a preview. Every handle the store issues
//! must be released exactly once.

use crate::primitives::PREVIEW_SCHEME;
use crate::{FlowError, Payload, PreviewHandle};
use std::collections::BTreeSet;

/// Backend that turns image payloads into releasable preview handles.
///
/// # Extension Point
///
/// A rendering surface with real object URLs or GPU textures implements this
/// trait and hands it to `AssetRegistry::with_store`.
pub trait PreviewStore: std::fmt::Debug {
    /// Create a preview for an image payload.
    fn create(&mut self, payload: &Payload) -> Result<PreviewHandle, FlowError>;

    /// Release a previously created preview.
    ///
    /// Returns `FlowError::PreviewNotLive` if the handle is unknown or was
    /// already released.
    fn release(&mut self, handle: &PreviewHandle) -> Result<(), FlowError>;

    /// Number of previews created and not yet released.
    fn live_count(&self) -> usize;
}

/// Default store: issues `preview:<n>` handles and tracks which are live.
#[derive(Debug, Default)]
pub struct InMemoryPreviewStore {
    next: u64,
    live: BTreeSet<PreviewHandle>,
}

impl InMemoryPreviewStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if a handle is currently live.
    #[must_use]
    pub fn is_live(&self, handle: &PreviewHandle) -> bool {
        self.live.contains(handle)
    }
}

impl PreviewStore for InMemoryPreviewStore {
    fn create(&mut self, _payload: &Payload) -> Result<PreviewHandle, FlowError> {
        let handle = PreviewHandle::new(format!("{}{}", PREVIEW_SCHEME, self.next));
        self.next = self.next.saturating_add(1);
        self.live.insert(handle.clone());
        Ok(handle)
    }

    fn release(&mut self, handle: &PreviewHandle) -> Result<(), FlowError> {
        if self.live.remove(handle) {
            Ok(())
        } else {
            Err(FlowError::PreviewNotLive(handle.clone()))
        }
    }

    fn live_count(&self) -> usize {
        self.live.len()
    }
}

// =============================================================================
// TESTS
// =============================================================================
