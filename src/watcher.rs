//! Camera capture: waits for a new photo to land in the capture directory

use async_trait::async_trait;
use crossbeam_channel::{bounded, RecvTimeoutError, Sender};
use log::{debug, error, info, warn};
use notify::event::{ModifyKind, RenameMode};
use notify::{Event, EventKind, RecursiveMode};
use notify_debouncer_full::{new_debouncer, DebounceEventResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::capture::{Capability, CaptureError, CaptureOutcome, PermissionKind};
use crate::ui::ConsoleUi;

/// Image extensions we care about
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp", "heic", "avif"];

pub struct CameraCapture {
    directory: PathBuf,
    timeout: Duration,
    console: Option<Arc<ConsoleUi>>,
}

impl CameraCapture {
    pub fn new(directory: PathBuf, timeout: Duration) -> Self {
        Self {
            directory,
            timeout,
            console: None,
        }
    }

    /// Print a "waiting" hint on this console when a capture starts
    pub fn with_console(mut self, console: Arc<ConsoleUi>) -> Self {
        self.console = Some(console);
        self
    }

    /// Block until an image file shows up in `directory` or `timeout` passes
    fn wait_for_photo(directory: &Path, timeout: Duration) -> Result<CaptureOutcome, CaptureError> {
        if !directory.exists() {
            warn!("Capture directory does not exist, creating: {:?}", directory);
            std::fs::create_dir_all(directory)?;
        }

        let (tx, rx) = bounded::<PathBuf>(16);
        let mut debouncer = new_debouncer(
            Duration::from_millis(200),
            None,
            move |result: DebounceEventResult| Self::handle_debounced_events(result, &tx),
        )
        .map_err(|source| CaptureError::Watch {
            path: directory.to_path_buf(),
            source,
        })?;

        debouncer
            .watch(directory, RecursiveMode::NonRecursive)
            .map_err(|source| CaptureError::Watch {
                path: directory.to_path_buf(),
                source,
            })?;

        info!("Waiting up to {:?} for a new photo in {:?}", timeout, directory);
        let outcome = match rx.recv_timeout(timeout) {
            Ok(path) => {
                info!("New photo captured: {:?}", path);
                CaptureOutcome::Captured(path.to_string_lossy().into_owned())
            }
            Err(RecvTimeoutError::Timeout) => {
                info!("No photo arrived within {:?}", timeout);
                CaptureOutcome::Cancelled
            }
            Err(RecvTimeoutError::Disconnected) => CaptureOutcome::Cancelled,
        };

        debouncer.stop();
        Ok(outcome)
    }

    /// Forward newly arrived images to the waiting capture
    fn handle_debounced_events(result: DebounceEventResult, tx: &Sender<PathBuf>) {
        match result {
            Ok(events) => {
                for event in events {
                    for path in arrived_paths(&event.event) {
                        if is_image_file(path) {
                            debug!("Photo arrived: {:?}", path);
                            // Only the first one matters; a full channel is fine
                            let _ = tx.try_send(path.clone());
                        }
                    }
                }
            }
            Err(errors) => {
                for e in errors {
                    error!("Capture watcher error: {:?}", e);
                }
            }
        }
    }
}

/// Paths an event brings into the directory: created files and rename
/// targets. Camera and sync tools usually write elsewhere and move the
/// finished file in.
fn arrived_paths(event: &Event) -> &[PathBuf] {
    match event.kind {
        EventKind::Create(_) => event.paths.as_slice(),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            // [from, to]
            let start = event.paths.len().saturating_sub(1);
            &event.paths[start..]
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::To | RenameMode::Any)) => {
            event.paths.as_slice()
        }
        _ => &[],
    }
}

#[async_trait]
impl Capability for CameraCapture {
    fn permission(&self) -> PermissionKind {
        PermissionKind::Camera
    }

    async fn launch(&self) -> Result<CaptureOutcome, CaptureError> {
        if let Some(console) = &self.console {
            console.print(&format!(
                "Take a photo now; waiting for it to appear in {} ({}s)...",
                self.directory.display(),
                self.timeout.as_secs()
            ));
        }

        let directory = self.directory.clone();
        let timeout = self.timeout;
        tokio::task::spawn_blocking(move || Self::wait_for_photo(&directory, timeout))
            .await
            .map_err(|e| CaptureError::Task(e.to_string()))?
    }
}

/// Check if a path is an image file we care about (file must exist)
pub fn is_image_file(path: &Path) -> bool {
    path.is_file() && has_image_extension(path)
}

/// Check if a path has an image extension (doesn't check if file exists)
pub fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|&e| e.eq_ignore_ascii_case(ext))
        })
}
