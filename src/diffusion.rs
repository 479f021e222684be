// ABOUTME: HTTP text-to-image backend for the outline-deck application
// ABOUTME: Loads and runs a diffusion model hosted by a local inference server

use crate::errors::{DeckError, Result};
use crate::generative::{BackendLoader, Device, DeviceProfile, ImageBackend, PipelineOptions, Precision};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use image::DynamicImage;
use log::{debug, info};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_SERVER_URL: &str = "http://127.0.0.1:7860";
pub const DEFAULT_MODEL: &str = "runwayml/stable-diffusion-v1-5";

#[derive(Debug, Serialize)]
struct LoadRequest<'a> {
    model: &'a str,
    device: &'static str,
    dtype: &'static str,
    attention_slicing: bool,
    safety_checker: bool,
}

#[derive(Debug, Deserialize)]
struct LoadResponse {
    pipeline_id: String,
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    prompt: &'a str,
    num_inference_steps: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    images: Vec<String>, // Base64 encoded
}

/// Loads models on an inference server reachable over HTTP.
pub struct HttpDiffusionLoader {
    base_url: String,
    model: String,
    connect_timeout: Duration,
}

impl HttpDiffusionLoader {
    pub fn new(base_url: &str, model: &str, connect_timeout: Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            connect_timeout,
        }
    }
}

impl BackendLoader for HttpDiffusionLoader {
    fn load(
        &self,
        profile: DeviceProfile,
        options: &PipelineOptions,
    ) -> Result<Arc<dyn ImageBackend>> {
        // Inference can take minutes; only connecting is bounded.
        let client = Client::builder()
            .connect_timeout(self.connect_timeout)
            .timeout(None::<Duration>)
            .build()?;

        let request = LoadRequest {
            model: &self.model,
            device: match profile.device {
                Device::Accelerator => "accelerator",
                Device::Cpu => "cpu",
            },
            dtype: match profile.precision {
                Precision::Half => "float16",
                Precision::Full => "float32",
            },
            attention_slicing: options.attention_slicing,
            safety_checker: options.safety_checker,
        };

        let url = format!("{}/pipelines", self.base_url);
        info!("Requesting model {} from {}", self.model, url);
        let response = client.post(&url).json(&request).send()?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(DeckError::GenerationError(format!(
                "model load rejected with {}: {}",
                status, body
            )));
        }
        let loaded: LoadResponse = response.json()?;
        debug!("Pipeline {} loaded on {}", loaded.pipeline_id, profile);

        Ok(Arc::new(HttpDiffusionBackend {
            client,
            generate_url: format!("{}/pipelines/{}/generate", self.base_url, loaded.pipeline_id),
        }))
    }
}

/// A model loaded on the inference server.
pub struct HttpDiffusionBackend {
    client: Client,
    generate_url: String,
}

impl ImageBackend for HttpDiffusionBackend {
    fn generate(&self, prompt: &str, steps: u32) -> Result<DynamicImage> {
        let request = GenerateRequest {
            prompt,
            num_inference_steps: steps,
        };
        let response = self.client.post(&self.generate_url).json(&request).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(DeckError::GenerationError(format!(
                "generation failed with {}",
                status
            )));
        }

        let generated: GenerateResponse = response.json()?;
        let first = generated
            .images
            .first()
            .ok_or_else(|| DeckError::GenerationError("backend returned no images".to_string()))?;
        let bytes = STANDARD
            .decode(first)
            .map_err(|e| DeckError::GenerationError(format!("invalid image encoding: {}", e)))?;

        Ok(image::load_from_memory(&bytes)?)
    }
}
