//! Permission-gated image acquisition

use async_trait::async_trait;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::gallery::{GalleryError, GalleryStore};
use crate::store::KeyValueStore;

/// Kinds of access a capability may need
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PermissionKind {
    Camera,
    MediaLibrary,
}

impl PermissionKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            PermissionKind::Camera => "camera",
            PermissionKind::MediaLibrary => "media library",
        }
    }

    /// Message shown when access is refused
    pub fn denied_message(&self) -> &'static str {
        match self {
            PermissionKind::Camera => "Camera access is required.",
            PermissionKind::MediaLibrary => "Media library access is required.",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
}

/// What a capability call produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureOutcome {
    Captured(String),
    Cancelled,
}

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("failed to watch {path:?}: {source}")]
    Watch {
        path: std::path::PathBuf,
        #[source]
        source: notify::Error,
    },

    #[error("capture I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("capture task failed: {0}")]
    Task(String),
}

/// A service that hands back exactly one image reference, or a cancellation.
#[async_trait]
pub trait Capability: Send + Sync {
    /// Permission that must be granted before [`Capability::launch`]
    fn permission(&self) -> PermissionKind;

    async fn launch(&self) -> Result<CaptureOutcome, CaptureError>;
}

/// Asks for access on behalf of a capability
#[async_trait]
pub trait PermissionGate: Send + Sync {
    async fn request(&self, kind: PermissionKind) -> PermissionStatus;
}

/// Blocking, user-facing notices
pub trait Notifier: Send + Sync {
    fn alert(&self, title: &str, message: &str);
}

/// Result of one acquisition attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquireOutcome {
    Denied,
    Cancelled,
    Added(String),
}

#[derive(Debug, Error)]
pub enum AcquireError {
    #[error(transparent)]
    Capture(#[from] CaptureError),

    /// The reference is in the gallery but did not reach the store
    #[error("added {reference:?} but could not save the gallery: {source}")]
    Persist {
        reference: String,
        #[source]
        source: GalleryError,
    },
}

/// Request permission, run the capability and append whatever it returns.
///
/// Denial raises a notice and leaves the gallery alone; cancellation is
/// silent. Neither touches the store.
pub async fn acquire<S, C, P, N>(
    gallery: &GalleryStore<S>,
    capability: &C,
    permissions: &P,
    notifier: &N,
) -> Result<AcquireOutcome, AcquireError>
where
    S: KeyValueStore,
    C: Capability + ?Sized,
    P: PermissionGate + ?Sized,
    N: Notifier + ?Sized,
{
    let kind = capability.permission();

    if permissions.request(kind).await == PermissionStatus::Denied {
        warn!("Permission denied for {}", kind.display_name());
        notifier.alert("Permission denied", kind.denied_message());
        return Ok(AcquireOutcome::Denied);
    }

    let reference = match capability.launch().await? {
        CaptureOutcome::Captured(reference) => reference,
        CaptureOutcome::Cancelled => {
            debug!("{} capture cancelled", kind.display_name());
            return Ok(AcquireOutcome::Cancelled);
        }
    };

    info!("Adding {:?} from {}", reference, kind.display_name());
    match gallery.append(reference.clone()).await {
        Ok(()) => Ok(AcquireOutcome::Added(reference)),
        Err(source) => Err(AcquireError::Persist { reference, source }),
    }
}
