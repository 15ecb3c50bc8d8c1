//! Local preview references for the selected image.
//!
//! A [`PreviewHandle`] is an ephemeral `preview:<n>` URL that resolves to the
//! selected image's bytes through a [`PreviewRegistry`]. The handle owns its
//! registry entry: dropping the handle revokes the URL, so replacing the
//! selection or tearing down the controller never leaks image buffers.

use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::trace;

use crate::image::ImageFile;

const PREVIEW_SCHEME: &str = "preview:";

#[derive(Debug, Default)]
struct RegistryInner {
    next_id: u64,
    entries: HashMap<u64, Bytes>,
}

/// Store of live preview URLs.
#[derive(Debug, Clone, Default)]
pub struct PreviewRegistry {
    inner: Arc<Mutex<RegistryInner>>,
}

impl PreviewRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a preview URL for an image.
    #[must_use]
    pub fn create(&self, image: &ImageFile) -> PreviewHandle {
        let id = {
            let mut inner = self.inner.lock();
            inner.next_id += 1;
            let id = inner.next_id;
            inner.entries.insert(id, image.bytes().clone());
            id
        };
        trace!(id, name = image.name(), "Created preview");
        PreviewHandle {
            id,
            url: format!("{PREVIEW_SCHEME}{id}"),
            name: image.name().to_string(),
            mime_type: image.mime_type(),
            size: image.len(),
            registry: self.clone(),
        }
    }

    /// Resolve a preview URL to the image bytes, if it is still live.
    #[must_use]
    pub fn resolve(&self, url: &str) -> Option<Bytes> {
        let id: u64 = url.strip_prefix(PREVIEW_SCHEME)?.parse().ok()?;
        self.inner.lock().entries.get(&id).cloned()
    }

    /// Number of previews that have not been released.
    #[must_use]
    pub fn live_count(&self) -> usize {
        self.inner.lock().entries.len()
    }

    fn revoke(&self, id: u64) {
        self.inner.lock().entries.remove(&id);
        trace!(id, "Revoked preview");
    }
}

/// Owned reference to a selected image, valid until dropped.
#[derive(Debug)]
pub struct PreviewHandle {
    id: u64,
    url: String,
    name: String,
    mime_type: &'static str,
    size: usize,
    registry: PreviewRegistry,
}

impl PreviewHandle {
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn mime_type(&self) -> &'static str {
        self.mime_type
    }

    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }
}

impl Drop for PreviewHandle {
    fn drop(&mut self) {
        self.registry.revoke(self.id);
    }
}
