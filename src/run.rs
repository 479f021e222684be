// ABOUTME: Build driver for the outline-deck application
// ABOUTME: Reads the outline and image inputs from disk, builds the deck and writes it out

use crate::builder::{BuiltDeck, DeckMode, GenerativeInputs, ModeKind, build_deck};
use crate::config::{Config, GenerationConfig};
use crate::diffusion::HttpDiffusionLoader;
use crate::errors::{DeckError, Result};
use crate::generative::{GenerativePipeline, ProgressCallback};
use crate::local_index::{UploadedImage, build_index};
use crate::outline::{SlideRecord, parse_outline};
use crate::remote::RemoteFetcher;
use crate::utils;
use log::info;
use std::fs;
use std::path::{Path, PathBuf};

/// Everything needed to turn one outline file into one deck file.
#[derive(Debug, Clone)]
pub struct BuildRequest {
    pub outline_path: PathBuf,
    pub output_path: PathBuf,
    pub mode: ModeKind,
    /// Directory of numbered uploads, read in local-images mode only
    pub images_dir: Option<PathBuf>,
    pub title: Option<String>,
    pub generation: GenerationConfig,
}

/// Read and parse an outline file, rejecting outlines without any slide.
pub fn read_outline(path: &Path) -> Result<Vec<SlideRecord>> {
    utils::validate_file_exists(path)?;
    let raw_text = fs::read_to_string(path)?;
    let records = parse_outline(&raw_text);
    if records.is_empty() {
        return Err(DeckError::ValidationError(format!(
            "No slides found in {:?}; each slide starts with a TITRE: line",
            path
        )));
    }
    info!("{} slides detected in {:?}", records.len(), path);
    Ok(records)
}

/// Generative pipeline backed by the configured inference server.
pub fn http_pipeline(config: &Config) -> GenerativePipeline {
    GenerativePipeline::new(HttpDiffusionLoader::new(
        &config.diffusion_url,
        &config.diffusion_model,
        config.fetch_timeout(),
    ))
}

/// Build the deck described by `request` and write it to its output path.
///
/// `pipeline` is required in generative mode and ignored otherwise, so one
/// pipeline can serve many builds.
pub fn run_build<'a>(
    request: &BuildRequest,
    config: &Config,
    pipeline: Option<&'a GenerativePipeline>,
    progress: Option<ProgressCallback<'a>>,
) -> Result<BuiltDeck> {
    let records = read_outline(&request.outline_path)?;

    let mode = match request.mode {
        ModeKind::TextOnly => DeckMode::TextOnly,
        ModeKind::LocalImages => {
            let dir = request.images_dir.as_deref().ok_or_else(|| {
                DeckError::ValidationError("Local images mode needs an image directory".to_string())
            })?;
            utils::validate_directory_exists(dir)?;
            let uploads = UploadedImage::collect_from_dir(dir, &config.image_pattern)?;
            let index = build_index(uploads);
            info!("{} numbered images available", index.len());
            DeckMode::LocalImages(index)
        }
        ModeKind::WebImages => DeckMode::WebImages(RemoteFetcher::new(config.fetch_timeout())?),
        ModeKind::Generative => {
            let pipeline = pipeline.ok_or_else(|| {
                DeckError::ConfigError("Generative mode needs an image pipeline".to_string())
            })?;
            DeckMode::Generative(GenerativeInputs {
                pipeline,
                steps: request.generation.steps,
                per_slide_images: request.generation.per_slide_images,
                progress,
            })
        }
    };

    let title = request.title.as_deref().unwrap_or(&config.deck_title);
    let built = build_deck(&records, mode, title)?;

    utils::write_atomically(&request.output_path, &built.bytes)?;
    info!("PPTX file created at {:?}", request.output_path);
    Ok(built)
}
