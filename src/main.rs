mod app;
mod capture;
mod gallery;
mod library;
mod permissions;
mod settings;
mod store;
mod ui;
mod watcher;

use anyhow::{Context, Result};
use log::{info, warn};
use parking_lot::Mutex;
use single_instance::SingleInstance;
use std::sync::Arc;

use crate::app::Snapshelf;
use crate::gallery::GalleryStore;
use crate::library::LibraryPicker;
use crate::permissions::ConsolePermissionGate;
use crate::settings::Settings;
use crate::store::{FileStore, KeyValueStore, MemoryStore};
use crate::ui::ConsoleUi;
use crate::watcher::CameraCapture;

const USAGE: &str = "\
Usage: snapshelf [OPTIONS]

Options:
  -c, --console   Write debug logs to snapshelf_debug.log
  -m, --memory    Keep the gallery in memory only (nothing is saved)
  -h, --help      Print this help";

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.iter().any(|arg| arg == "--help" || arg == "-h") {
        println!("{}", USAGE);
        return Ok(());
    }
    let console_mode = args.iter().any(|arg| arg == "--console" || arg == "-c");
    let memory_mode = args.iter().any(|arg| arg == "--memory" || arg == "-m");

    // Initialize logging - write to file in console mode for easier debugging
    let log_level = if console_mode { "debug" } else { "warn" };

    if console_mode {
        let log_file = std::fs::File::create("snapshelf_debug.log")
            .context("Failed to create log file")?;
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
            .target(env_logger::Target::Pipe(Box::new(log_file)))
            .init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();
    }

    info!("Starting Snapshelf...");

    // Single instance check - the gallery has exactly one owner
    let instance = SingleInstance::new("snapshelf-gallery")
        .context("Failed to check for another running instance")?;
    if !instance.is_single() {
        warn!("Another instance of Snapshelf is already running");
        eprintln!("Snapshelf is already running.");
        return Ok(());
    }

    // Load settings
    let settings_path = Settings::config_path();
    let mut settings = match &settings_path {
        Some(path) => Settings::load_from(path).unwrap_or_else(|e| {
            warn!("Failed to load settings, using defaults: {}", e);
            Settings::default()
        }),
        None => Settings::default(),
    };
    settings.ensure_valid_storage_key();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to create async runtime")?;

    if memory_mode {
        info!("Gallery kept in memory only");
        runtime.block_on(run(MemoryStore::new(), settings, settings_path));
    } else {
        let store = FileStore::new(settings.data_directory.clone());
        info!("Gallery storage at {:?}", store.directory());
        runtime.block_on(run(store, settings, settings_path));
    }

    info!("Snapshelf shutting down...");
    Ok(())
}

async fn run<S: KeyValueStore>(
    store: S,
    settings: Settings,
    settings_path: Option<std::path::PathBuf>,
) {
    let console = Arc::new(ConsoleUi::stdio());
    let gallery = Arc::new(GalleryStore::new(store, settings.storage_key.clone()));
    info!("Gallery key: {:?}", gallery.key());

    let camera = CameraCapture::new(settings.capture_directory.clone(), settings.capture_timeout())
        .with_console(Arc::clone(&console));
    let library = LibraryPicker::new(settings.library_directory.clone(), Arc::clone(&console));
    let grid_columns = settings.grid_columns as usize;

    let settings = Arc::new(Mutex::new(settings));
    let permissions = ConsolePermissionGate::new(settings, settings_path, Arc::clone(&console));

    let app = Snapshelf::new(
        gallery,
        Box::new(camera),
        Box::new(library),
        Box::new(permissions),
        console,
        grid_columns,
    );

    app.start().await;
    app.run().await;
}
