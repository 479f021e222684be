// ABOUTME: Generative image resolver for the outline-deck application
// ABOUTME: Owns the once-initialized text-to-image pipeline and the per-slide generation policy

use crate::errors::{DeckError, Result};
use crate::images::{ImagePayload, ImageResolution, ImageResolver, SlideSlot};
use crate::outline::SlideRecord;
use image::DynamicImage;
use log::{info, warn};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// Default number of inference steps per generated image.
pub const DEFAULT_STEPS: u32 = 30;

/// Characters of the prompt shown in progress messages.
const PROMPT_PREVIEW_CHARS: usize = 30;

/// A loaded text-to-image model.
pub trait ImageBackend: Send + Sync {
    /// Run one inference and return the first produced image.
    fn generate(&self, prompt: &str, steps: u32) -> Result<DynamicImage>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    Accelerator,
    Cpu,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precision {
    Half,
    Full,
}

/// Where and at what precision the model runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceProfile {
    pub device: Device,
    pub precision: Precision,
}

impl DeviceProfile {
    /// Reduced precision on the accelerator, tried first.
    pub const PREFERRED: DeviceProfile = DeviceProfile {
        device: Device::Accelerator,
        precision: Precision::Half,
    };

    /// Full precision on the CPU, used when the accelerator cannot load.
    pub const FALLBACK: DeviceProfile = DeviceProfile {
        device: Device::Cpu,
        precision: Precision::Full,
    };
}

impl fmt::Display for DeviceProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let device = match self.device {
            Device::Accelerator => "accelerator",
            Device::Cpu => "cpu",
        };
        let precision = match self.precision {
            Precision::Half => "float16",
            Precision::Full => "float32",
        };
        write!(f, "{}/{}", device, precision)
    }
}

/// Settings applied to the model when it is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    /// Compute attention in slices to lower peak memory.
    pub attention_slicing: bool,
    /// Run the backend's content-safety filter on outputs.
    pub safety_checker: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            attention_slicing: true,
            safety_checker: false,
        }
    }
}

/// Knows how to bring a backend up on a given device.
pub trait BackendLoader: Send + Sync {
    /// Whether the accelerator is worth trying at all.
    fn accelerator_available(&self) -> bool {
        true
    }

    fn load(
        &self,
        profile: DeviceProfile,
        options: &PipelineOptions,
    ) -> Result<Arc<dyn ImageBackend>>;
}

enum PipelineState {
    Uninitialized,
    Ready {
        backend: Arc<dyn ImageBackend>,
        profile: DeviceProfile,
    },
    Unavailable(String),
}

/// Handle to the generative backend, initialized at most once.
///
/// Construct one per process and pass it by reference to every build.
/// The first `ensure` loads the model (accelerator first, then CPU); the
/// outcome is kept for the lifetime of the handle. After a failed load
/// every `ensure` fails immediately without trying again.
pub struct GenerativePipeline {
    loader: Box<dyn BackendLoader>,
    options: PipelineOptions,
    state: Mutex<PipelineState>,
}

impl GenerativePipeline {
    pub fn new<L: BackendLoader + 'static>(loader: L) -> Self {
        Self::with_options(loader, PipelineOptions::default())
    }

    pub fn with_options<L: BackendLoader + 'static>(loader: L, options: PipelineOptions) -> Self {
        Self {
            loader: Box::new(loader),
            options,
            state: Mutex::new(PipelineState::Uninitialized),
        }
    }

    /// Return the loaded backend, loading it on first use.
    pub fn ensure(&self) -> Result<Arc<dyn ImageBackend>> {
        let mut state = self.state.lock();

        match &*state {
            PipelineState::Ready { backend, .. } => return Ok(Arc::clone(backend)),
            PipelineState::Unavailable(reason) => {
                return Err(DeckError::BackendUnavailable(reason.clone()));
            }
            PipelineState::Uninitialized => {}
        }

        match self.initialize() {
            Ok((backend, profile)) => {
                info!("Image generation backend ready on {}", profile);
                *state = PipelineState::Ready {
                    backend: Arc::clone(&backend),
                    profile,
                };
                Ok(backend)
            }
            Err(reason) => {
                warn!("Image generation backend unavailable: {}", reason);
                *state = PipelineState::Unavailable(reason.clone());
                Err(DeckError::BackendUnavailable(reason))
            }
        }
    }

    /// Profile the backend was loaded with, if it is loaded.
    pub fn profile(&self) -> Option<DeviceProfile> {
        match &*self.state.lock() {
            PipelineState::Ready { profile, .. } => Some(*profile),
            _ => None,
        }
    }

    fn initialize(&self) -> std::result::Result<(Arc<dyn ImageBackend>, DeviceProfile), String> {
        let mut failures = Vec::new();

        if self.loader.accelerator_available() {
            info!("Loading image model ({})", DeviceProfile::PREFERRED);
            match self.loader.load(DeviceProfile::PREFERRED, &self.options) {
                Ok(backend) => return Ok((backend, DeviceProfile::PREFERRED)),
                Err(e) => {
                    warn!(
                        "Failed to load image model on {}, falling back: {}",
                        DeviceProfile::PREFERRED,
                        e
                    );
                    failures.push(format!("{}: {}", DeviceProfile::PREFERRED, e));
                }
            }
        }

        info!("Loading image model ({})", DeviceProfile::FALLBACK);
        match self.loader.load(DeviceProfile::FALLBACK, &self.options) {
            Ok(backend) => Ok((backend, DeviceProfile::FALLBACK)),
            Err(e) => {
                failures.push(format!("{}: {}", DeviceProfile::FALLBACK, e));
                Err(failures.join("; "))
            }
        }
    }
}

/// Receives `(fraction complete, status message)` before each slide.
pub type ProgressCallback<'a> = &'a mut dyn FnMut(f64, &str);

/// Whether slide `index` gets a generated image.
///
/// Needs a prompt, and either per-slide images or the first slide.
pub fn should_generate(prompt: &str, per_slide_images: bool, index: usize) -> bool {
    !prompt.is_empty() && (per_slide_images || index == 0)
}

/// Status line reported before generating slide `slot`.
pub fn progress_message(slot: SlideSlot, prompt: &str) -> String {
    let preview: String = prompt.chars().take(PROMPT_PREVIEW_CHARS).collect();
    format!(
        "Generating visual {}/{}: {}...",
        slot.position(),
        slot.total,
        preview
    )
}

/// Generate one image for `prompt` and encode it for embedding.
pub fn resolve(prompt: &str, steps: u32, backend: &dyn ImageBackend) -> Result<ImagePayload> {
    let image = backend.generate(prompt, steps)?;
    ImagePayload::from_image(&image)
}

/// Resolver generating images from each slide's visual prompt.
pub struct GenerativeResolver<'a> {
    backend: Arc<dyn ImageBackend>,
    steps: u32,
    per_slide_images: bool,
    progress: Option<ProgressCallback<'a>>,
}

impl<'a> GenerativeResolver<'a> {
    pub fn new(
        backend: Arc<dyn ImageBackend>,
        steps: u32,
        per_slide_images: bool,
        progress: Option<ProgressCallback<'a>>,
    ) -> Self {
        Self {
            backend,
            steps,
            per_slide_images,
            progress,
        }
    }
}

impl ImageResolver for GenerativeResolver<'_> {
    fn resolve(&mut self, slot: SlideSlot, record: &SlideRecord) -> ImageResolution {
        let prompt = record.visual.as_str();

        if let Some(progress) = self.progress.as_mut() {
            let fraction = slot.index as f64 / slot.total.max(1) as f64;
            progress(fraction, &progress_message(slot, prompt));
        }

        if !should_generate(prompt, self.per_slide_images, slot.index) {
            return ImageResolution::Skipped("generation not requested for this slide");
        }

        info!("Generating image for slide {}: {}", slot.position(), prompt);
        match resolve(prompt, self.steps, self.backend.as_ref()) {
            Ok(payload) => ImageResolution::Attached(payload),
            Err(e) => ImageResolution::Failed(e.to_string()),
        }
    }
}
