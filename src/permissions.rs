//! Permission prompts with remembered grants

use async_trait::async_trait;
use log::{info, warn};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;

use crate::capture::{PermissionGate, PermissionKind, PermissionStatus};
use crate::settings::Settings;
use crate::ui::ConsoleUi;

/// Asks on the console and remembers a "yes" in the settings file.
///
/// A refusal is not remembered, so the next attempt asks again.
pub struct ConsolePermissionGate {
    settings: Arc<Mutex<Settings>>,
    settings_path: Option<PathBuf>,
    console: Arc<ConsoleUi>,
}

impl ConsolePermissionGate {
    pub fn new(
        settings: Arc<Mutex<Settings>>,
        settings_path: Option<PathBuf>,
        console: Arc<ConsoleUi>,
    ) -> Self {
        Self {
            settings,
            settings_path,
            console,
        }
    }

    fn remember(&self, kind: PermissionKind) {
        let snapshot = {
            let mut settings = self.settings.lock();
            if !settings.grant(kind) {
                return;
            }
            settings.clone()
        };

        if let Some(path) = &self.settings_path {
            if let Err(e) = snapshot.save_to(path) {
                warn!("Failed to remember {} permission: {}", kind.display_name(), e);
            }
        }
    }
}

#[async_trait]
impl PermissionGate for ConsolePermissionGate {
    async fn request(&self, kind: PermissionKind) -> PermissionStatus {
        if self.settings.lock().is_granted(kind) {
            return PermissionStatus::Granted;
        }

        let question = format!("Allow Snapshelf to access your {}?", kind.display_name());
        if self.console.confirm(&question) {
            info!("{} permission granted", kind.display_name());
            self.remember(kind);
            PermissionStatus::Granted
        } else {
            info!("{} permission refused", kind.display_name());
            PermissionStatus::Denied
        }
    }
}
