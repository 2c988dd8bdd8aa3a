//! Main application state and command loop

use log::{debug, error, info};
use std::sync::Arc;

use crate::capture::{self, AcquireError, AcquireOutcome, Capability, PermissionGate};
use crate::gallery::GalleryStore;
use crate::store::KeyValueStore;
use crate::ui::{self, ConsoleUi};

/// App version
const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

const HELP: &str = "\
Commands:
  t, take     Take Photo (wait for a new photo from the camera folder)
  u, upload   Upload Photo (pick one from your pictures)
  l, list     Show the gallery again
  h, help     Show this help
  q, quit     Quit";

/// Commands understood by the prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    TakePhoto,
    UploadPhoto,
    List,
    Help,
    Quit,
}

impl Command {
    pub fn parse(input: &str) -> Option<Self> {
        match input.trim().to_ascii_lowercase().as_str() {
            "t" | "take" | "photo" => Some(Command::TakePhoto),
            "u" | "upload" | "pick" => Some(Command::UploadPhoto),
            "l" | "ls" | "list" => Some(Command::List),
            "h" | "help" | "?" => Some(Command::Help),
            "q" | "quit" | "exit" => Some(Command::Quit),
            _ => None,
        }
    }
}

/// Everything the command loop needs, injected by `main` (or a test)
pub struct Snapshelf<S> {
    gallery: Arc<GalleryStore<S>>,
    camera: Box<dyn Capability>,
    library: Box<dyn Capability>,
    permissions: Box<dyn PermissionGate>,
    console: Arc<ConsoleUi>,
    grid_columns: usize,
}

impl<S: KeyValueStore> Snapshelf<S> {
    pub fn new(
        gallery: Arc<GalleryStore<S>>,
        camera: Box<dyn Capability>,
        library: Box<dyn Capability>,
        permissions: Box<dyn PermissionGate>,
        console: Arc<ConsoleUi>,
        grid_columns: usize,
    ) -> Self {
        Self {
            gallery,
            camera,
            library,
            permissions,
            console,
            grid_columns,
        }
    }

    /// Restore the stored gallery. Failures are logged and otherwise
    /// ignored: the session starts with whatever is in memory.
    pub async fn start(&self) {
        match self.gallery.load().await {
            Ok(count) => info!("Gallery ready with {} images", count),
            Err(e) => debug!("Continuing with an empty gallery after load failure: {}", e),
        }
    }

    /// Run until the user quits or input ends
    pub async fn run(&self) {
        self.console
            .print(&format!("Snapshelf v{} (type 'help' for commands)", APP_VERSION));
        self.show_gallery().await;

        while let Some(line) = self.console.read_line("> ") {
            if line.is_empty() {
                continue;
            }

            match Command::parse(&line) {
                Some(Command::Quit) => break,
                Some(command) => self.handle(command).await,
                None => self
                    .console
                    .print(&format!("Unknown command '{}'. Type 'help' for commands.", line)),
            }
        }

        info!("Leaving with {} images in the gallery", self.gallery.len().await);
    }

    pub async fn handle(&self, command: Command) {
        match command {
            Command::TakePhoto => self.acquire_with(self.camera.as_ref()).await,
            Command::UploadPhoto => self.acquire_with(self.library.as_ref()).await,
            Command::List => self.show_gallery().await,
            Command::Help => self.console.print(HELP),
            Command::Quit => {}
        }
    }

    async fn acquire_with(&self, capability: &dyn Capability) {
        let result = capture::acquire(
            self.gallery.as_ref(),
            capability,
            self.permissions.as_ref(),
            self.console.as_ref(),
        )
        .await;

        match result {
            Ok(AcquireOutcome::Added(_)) => self.show_gallery().await,
            Ok(AcquireOutcome::Denied) | Ok(AcquireOutcome::Cancelled) => {}
            // Already logged by the gallery; the in-memory copy has the photo
            Err(AcquireError::Persist { reference, .. }) => {
                debug!("{:?} kept in memory only", reference);
                self.show_gallery().await;
            }
            Err(e) => error!("Failed to get a photo: {}", e),
        }
    }

    async fn show_gallery(&self) {
        let gallery = self.gallery.snapshot().await;
        self.console.print("");
        self.console.print(&ui::render_gallery(&gallery, self.grid_columns));
    }
}
