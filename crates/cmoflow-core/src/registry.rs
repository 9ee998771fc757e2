//! # Asset Registry
//!
//! Holds the user-supplied assets of one session and classifies them.
//!
//! - Classification is decided once, at ingestion, and never revised
//! - At most one asset is ever `Primary`
//! - Removing the primary does NOT promote another asset
//! - Every preview is released exactly once: on `remove`, on `clear`, or
//!   when the registry is dropped

use crate::preview::{InMemoryPreviewStore, PreviewStore};
use crate::{Asset, AssetId, Classification, Payload, PreviewHandle};

/// The set of assets supplied during intake.
#[derive(Debug)]
pub struct AssetRegistry {
    /// Assets in ingestion order.
    assets: Vec<Asset>,
    /// Next id to hand out. Monotonic, survives `clear`.
    next_id: u64,
    /// Exclusive owner of every preview resource.
    previews: Box<dyn PreviewStore>,
}

impl Default for AssetRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl AssetRegistry {
    /// Create an empty registry backed by an `InMemoryPreviewStore`.
    #[must_use]
    pub fn new() -> Self {
        Self::with_store(InMemoryPreviewStore::new())
    }

    /// Create an empty registry with a custom preview store.
    #[must_use]
    pub fn with_store(store: impl PreviewStore + 'static) -> Self {
        Self {
            assets: Vec::new(),
            next_id: 0,
            previews: Box::new(store),
        }
    }

    /// Ingest a batch of payloads and return the full updated asset list.
    ///
    /// Payloads are classified one by one in input order. A payload becomes
    /// `Primary` only if it is image-typed and nothing already in the
    /// registry (including earlier payloads of this batch) is `Primary`.
    /// Later images in the same batch are silently `Supplementary`.
    ///
    /// A preview is created for every image payload. If the store fails, the
    /// failure is logged and the asset is kept without a preview.
    pub fn ingest<I>(&mut self, payloads: I) -> &[Asset]
    where
        I: IntoIterator<Item = Payload>,
    {
        for payload in payloads {
            let content_type = payload.content_type();
            let is_image = content_type.is_image();

            let classification = if is_image && !self.has_primary() {
                Classification::Primary
            } else {
                Classification::Supplementary
            };

            let preview = if is_image {
                match self.previews.create(&payload) {
                    Ok(handle) => Some(handle),
                    Err(e) => {
                        tracing::warn!(name = %payload.name, error = %e, "preview creation failed");
                        None
                    }
                }
            } else {
                None
            };

            let id = AssetId(self.next_id);
            self.next_id = self.next_id.saturating_add(1);

            tracing::debug!(
                %id,
                name = %payload.name,
                content_type = %content_type,
                classification = ?classification,
                "asset ingested"
            );

            self.assets.push(Asset {
                id,
                payload,
                content_type,
                classification,
                preview,
            });
        }

        &self.assets
    }

    /// Remove an asset and release its preview.
    ///
    /// Unknown ids are a no-op. Returns `true` if an asset was removed.
    pub fn remove(&mut self, id: AssetId) -> bool {
        let Some(pos) = self.assets.iter().position(|a| a.id == id) else {
            tracing::debug!(%id, "remove of unknown asset ignored");
            return false;
        };

        let mut asset = self.assets.remove(pos);
        Self::release_preview(self.previews.as_mut(), &mut asset);
        tracing::debug!(%id, "asset removed");
        true
    }

    /// Remove every asset, releasing all previews.
    pub fn clear(&mut self) {
        let previews = self.previews.as_mut();
        for mut asset in self.assets.drain(..) {
            Self::release_preview(previews, &mut asset);
        }
    }

    /// Check if any asset holds the `Primary` classification.
    #[must_use]
    pub fn has_primary(&self) -> bool {
        self.assets.iter().any(Asset::is_primary)
    }

    /// The primary asset, if present.
    #[must_use]
    pub fn primary(&self) -> Option<&Asset> {
        self.assets.iter().find(|a| a.is_primary())
    }

    /// The preview of an asset. Present only for image assets.
    #[must_use]
    pub fn preview_for(&self, id: AssetId) -> Option<&PreviewHandle> {
        self.get(id).and_then(Asset::preview)
    }

    /// Look up an asset by id.
    #[must_use]
    pub fn get(&self, id: AssetId) -> Option<&Asset> {
        self.assets.iter().find(|a| a.id == id)
    }

    /// Read-only snapshot of all assets, in ingestion order.
    #[must_use]
    pub fn assets(&self) -> &[Asset] {
        &self.assets
    }

    /// Number of assets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.assets.len()
    }

    /// Check if the registry holds no assets.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Number of previews created and not yet released.
    #[must_use]
    pub fn live_previews(&self) -> usize {
        self.previews.live_count()
    }

    /// Release the preview of an asset leaving the registry.
    ///
    /// Failures are logged and swallowed: a platform that refuses to free a
    /// preview must not break removal or reset.
    fn release_preview(previews: &mut dyn PreviewStore, asset: &mut Asset) {
        if let Some(handle) = asset.preview.take()
            && let Err(e) = previews.release(&handle)
        {
            tracing::warn!(id = %asset.id, preview = %handle, error = %e, "preview release failed");
        }
    }
}

impl Drop for AssetRegistry {
    fn drop(&mut self) {
        self.clear();
    }
}

// =============================================================================
// TESTS
// =============================================================================
