// ABOUTME: Watch module for monitoring outline changes and rebuilding the deck
// ABOUTME: Provides file watching and automatic regeneration of the PPTX output

use log::{debug, error, info};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::{Duration, Instant};

use notify::{RecursiveMode, Watcher};
use notify_debouncer_full::new_debouncer;

use crate::config::Config as AppConfig;
use crate::errors::{DeckError, Result};
use crate::generative::GenerativePipeline;
use crate::run::{self, BuildRequest};
use crate::utils;

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "tif", "tiff"];

/// Configuration for watch mode
pub struct WatchConfig {
    /// The build to repeat on every change
    pub request: BuildRequest,

    /// Debounce time in milliseconds
    pub debounce_ms: u64,
}

/// Build once, then rebuild the deck whenever the outline or one of the
/// numbered images changes. Blocks until the watcher shuts down.
pub fn watch_outline(
    config: WatchConfig,
    app_config: &AppConfig,
    pipeline: Option<&GenerativePipeline>,
) -> Result<()> {
    let request = &config.request;
    utils::validate_file_exists(&request.outline_path)?;
    utils::ensure_parent_directory_exists(&request.output_path)?;

    // Initial build; later failures are only logged
    rebuild(request, app_config, pipeline)?;

    let (tx, rx) = mpsc::channel();
    let mut debouncer = new_debouncer(Duration::from_millis(config.debounce_ms), None, tx)
        .map_err(|e| DeckError::WatchError(format!("Failed to create file watcher: {}", e)))?;

    let mut watch_paths = vec![outline_directory(&request.outline_path)?];
    if let Some(images_dir) = &request.images_dir {
        let images_abs = utils::get_absolute_path(images_dir)?;
        if !watch_paths.contains(&images_abs) {
            watch_paths.push(images_abs);
        }
    }

    for path in &watch_paths {
        debug!("Watching absolute path: {:?}", path);
        debouncer
            .watcher()
            .watch(path, RecursiveMode::NonRecursive)
            .map_err(|e| {
                DeckError::WatchError(format!("Failed to start watching {:?}: {}", path, e))
            })?;
    }

    info!("Watching for changes in {:?}", watch_paths);

    let mut last_processed = Instant::now();

    for result in rx {
        match result {
            Ok(events) => {
                let relevant_changes = events.iter().any(|event| {
                    event.paths.iter().any(|path| {
                        let is_relevant = is_relevant_path(path, request);
                        if is_relevant {
                            debug!("Detected relevant change in {:?}", path);
                        }
                        is_relevant
                    })
                });

                let now = Instant::now();
                if relevant_changes
                    && now.duration_since(last_processed)
                        > Duration::from_millis(config.debounce_ms)
                {
                    match rebuild(request, app_config, pipeline) {
                        Ok(()) => last_processed = now,
                        Err(e) => error!("Failed to rebuild deck: {}", e),
                    }
                }
            }
            Err(errors) => error!("Watch error: {:?}", errors),
        }
    }

    Ok(())
}

/// Absolute directory holding the outline file.
fn outline_directory(outline_path: &Path) -> Result<PathBuf> {
    let dir = match outline_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    utils::get_absolute_path(dir)
}

/// Checks if a changed path affects the deck (the outline or an image upload)
///
/// Only the parent directory is resolved: a removed file no longer exists
/// and cannot be canonicalized itself.
pub(crate) fn is_relevant_path(path: &Path, request: &BuildRequest) -> bool {
    // The output itself lives next to the outline more often than not
    if path == request.output_path || path.file_name() == request.output_path.file_name() {
        return false;
    }

    let (Some(parent), Some(file_name)) = (path.parent(), path.file_name()) else {
        return false;
    };
    let Ok(parent_abs) = utils::get_absolute_path(parent) else {
        return false;
    };

    let is_outline = request.outline_path.file_name() == Some(file_name)
        && outline_directory(&request.outline_path)
            .map(|dir| dir == parent_abs)
            .unwrap_or(false);
    if is_outline {
        return true;
    }

    let is_image = match path.extension() {
        Some(ext) => {
            let ext_str = ext.to_string_lossy().to_lowercase();
            IMAGE_EXTENSIONS.contains(&ext_str.as_str())
        }
        None => false,
    };

    match &request.images_dir {
        Some(images_dir) if is_image => utils::get_absolute_path(images_dir)
            .map(|dir| dir == parent_abs)
            .unwrap_or(false),
        _ => false,
    }
}

fn rebuild(
    request: &BuildRequest,
    app_config: &AppConfig,
    pipeline: Option<&GenerativePipeline>,
) -> Result<()> {
    info!("Rebuilding {:?}...", request.output_path);
    let built = run::run_build(request, app_config, pipeline, None)?;
    info!(
        "Deck rebuilt: {} slides, {} images",
        built.slide_count,
        built.images_attached()
    );
    Ok(())
}
