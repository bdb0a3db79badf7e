//! Trait seams between the orchestrator and its collaborators.

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{BackendDescriptor, ExtractionResult, ExtractionTask, ResolvedMedia, TaskKind};

// =============================================================================
// BACKEND ADAPTER
// =============================================================================

/// One external or local extraction capability.
///
/// `invoke` never fails across this boundary: a missing credential, missing
/// media, network error, remote error or malformed response is returned as a
/// failed [`ExtractionResult`] carrying this adapter's backend id.
#[async_trait]
pub trait BackendAdapter: Send + Sync {
    /// Static description of this backend.
    fn descriptor(&self) -> &BackendDescriptor;

    /// Whether the credential or local capability this backend needs is present.
    fn is_available(&self) -> bool;

    /// Run one extraction attempt.
    async fn invoke(&self, task: &ExtractionTask) -> ExtractionResult;

    /// Backend id, shorthand for `descriptor().id`.
    fn id(&self) -> &str {
        &self.descriptor().id
    }
}

// =============================================================================
// MEDIA SOURCE
// =============================================================================

/// Resolves an opaque media reference to bytes and a content type.
#[async_trait]
pub trait MediaSource: Send + Sync {
    /// Read the referenced media. Fails with `MediaNotFound` if it does not exist.
    async fn resolve(&self, media_ref: &str, kind: TaskKind) -> Result<ResolvedMedia>;
}

// =============================================================================
// CREDENTIALS
// =============================================================================

/// Source of backend credentials, read once when adapters are constructed.
pub trait CredentialProvider: Send + Sync {
    /// Credential for the named backend, if configured.
    fn get_credential(&self, backend: &str) -> Option<String>;
}
