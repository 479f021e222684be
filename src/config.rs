// ABOUTME: Configuration module for the outline-deck application
// ABOUTME: Provides configuration settings and environment variable handling

use crate::diffusion::{DEFAULT_MODEL, DEFAULT_SERVER_URL};
use crate::errors::{DeckError, Result};
use crate::generative::DEFAULT_STEPS;
use std::env;
use std::time::Duration;

/// Global configuration for the application
#[derive(Debug, Clone)]
pub struct Config {
    pub deck_title: String,
    pub fetch_timeout_ms: u64,
    pub generation_steps: u32,
    pub per_slide_images: bool,
    pub diffusion_url: String,
    pub diffusion_model: String,
    pub image_pattern: String,
}

/// Settings of one generative build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationConfig {
    pub steps: u32,
    pub per_slide_images: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            deck_title: "Presentation".to_string(),
            fetch_timeout_ms: 4000, // 4 seconds
            generation_steps: DEFAULT_STEPS,
            per_slide_images: false,
            diffusion_url: DEFAULT_SERVER_URL.to_string(),
            diffusion_model: DEFAULT_MODEL.to_string(),
            image_pattern: "*".to_string(),
        }
    }
}

impl Config {
    /// Create a new configuration instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let deck_title = env::var("DECK_TITLE").unwrap_or(defaults.deck_title);
        let fetch_timeout_ms = env::var("FETCH_TIMEOUT_MS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(defaults.fetch_timeout_ms);
        let generation_steps = env::var("GENERATION_STEPS")
            .ok()
            .and_then(|s| s.parse::<u32>().ok())
            .unwrap_or(defaults.generation_steps);
        let per_slide_images = env::var("PER_SLIDE_IMAGES")
            .ok()
            .map(|s| matches!(s.to_lowercase().as_str(), "true" | "1"))
            .unwrap_or(defaults.per_slide_images);
        let diffusion_url = env::var("DIFFUSION_URL").unwrap_or(defaults.diffusion_url);
        let diffusion_model = env::var("DIFFUSION_MODEL").unwrap_or(defaults.diffusion_model);
        let image_pattern = env::var("IMAGE_PATTERN").unwrap_or(defaults.image_pattern);

        Self {
            deck_title,
            fetch_timeout_ms,
            generation_steps,
            per_slide_images,
            diffusion_url,
            diffusion_model,
            image_pattern,
        }
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_millis(self.fetch_timeout_ms)
    }

    /// Get a generation configuration, command-line values taking precedence
    pub fn get_generation_config(
        &self,
        steps: Option<u32>,
        per_slide_images: Option<bool>,
    ) -> Result<GenerationConfig> {
        let steps = steps.unwrap_or(self.generation_steps);
        if steps == 0 {
            return Err(DeckError::ValidationError(
                "Inference step count must be at least 1".to_string(),
            ));
        }

        Ok(GenerationConfig {
            steps,
            per_slide_images: per_slide_images.unwrap_or(self.per_slide_images),
        })
    }
}
