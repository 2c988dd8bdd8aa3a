//! Library picker: choose an existing photo from the pictures directory

use async_trait::async_trait;
use log::info;
use std::cmp::Reverse;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::capture::{Capability, CaptureError, CaptureOutcome, PermissionKind};
use crate::ui::ConsoleUi;
use crate::watcher::is_image_file;

pub struct LibraryPicker {
    directory: PathBuf,
    console: Arc<ConsoleUi>,
}

impl LibraryPicker {
    pub fn new(directory: PathBuf, console: Arc<ConsoleUi>) -> Self {
        Self { directory, console }
    }

    fn choose(&self, photos: &[PathBuf]) -> CaptureOutcome {
        if photos.is_empty() {
            self.console
                .print(&format!("No photos found in {}.", self.directory.display()));
            return CaptureOutcome::Cancelled;
        }

        let labels: Vec<String> = photos
            .iter()
            .map(|path| {
                path.strip_prefix(&self.directory)
                    .unwrap_or(path)
                    .display()
                    .to_string()
            })
            .collect();

        match self.console.choose("Choose a photo:", &labels) {
            Some(index) => CaptureOutcome::Captured(photos[index].to_string_lossy().into_owned()),
            None => CaptureOutcome::Cancelled,
        }
    }
}

#[async_trait]
impl Capability for LibraryPicker {
    fn permission(&self) -> PermissionKind {
        PermissionKind::MediaLibrary
    }

    async fn launch(&self) -> Result<CaptureOutcome, CaptureError> {
        let directory = self.directory.clone();
        let photos = tokio::task::spawn_blocking(move || scan_photos(&directory))
            .await
            .map_err(|e| CaptureError::Task(e.to_string()))??;

        Ok(self.choose(&photos))
    }
}

/// Collect images under `directory` (recursively), newest first
pub fn scan_photos(directory: &Path) -> Result<Vec<PathBuf>, CaptureError> {
    fn scan_dir(dir: &Path, files: &mut Vec<PathBuf>) {
        if let Ok(entries) = std::fs::read_dir(dir) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.is_dir() {
                    scan_dir(&path, files);
                } else if is_image_file(&path) {
                    files.push(path);
                }
            }
        }
    }

    if !directory.is_dir() {
        return Err(CaptureError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("library directory {:?} not found", directory),
        )));
    }

    let mut files = Vec::new();
    scan_dir(directory, &mut files);

    // Newest first; each file's mtime is read once
    files.sort_by_cached_key(|path| {
        let modified = std::fs::metadata(path).and_then(|m| m.modified()).ok();
        (Reverse(modified), path.clone())
    });

    info!("Found {} photos in {:?}", files.len(), directory);
    Ok(files)
}
