// ABOUTME: Image payload and resolver abstractions for the outline-deck application
// ABOUTME: Validates raster bytes and defines the tagged result every image resolver returns

use crate::errors::{DeckError, Result};
use crate::outline::SlideRecord;
use image::io::Reader as ImageReader;
use image::{DynamicImage, ImageFormat, ImageOutputFormat};
use std::io::Cursor;

/// Raster image content ready to be embedded in a slide.
///
/// Only constructible from bytes the `image` crate recognizes as a format
/// PowerPoint can display, so an embedded picture is never garbage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    bytes: Vec<u8>,
    format: ImageFormat,
    width: u32,
    height: u32,
}

impl ImagePayload {
    /// Validate encoded image bytes and read their format and dimensions.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        if bytes.is_empty() {
            return Err(DeckError::ImageError("image payload is empty".to_string()));
        }

        let reader = ImageReader::new(Cursor::new(&bytes)).with_guessed_format()?;
        let format = match reader.format() {
            Some(
                format @ (ImageFormat::Png
                | ImageFormat::Jpeg
                | ImageFormat::Gif
                | ImageFormat::Bmp
                | ImageFormat::Tiff),
            ) => format,
            Some(other) => {
                return Err(DeckError::ImageError(format!(
                    "unsupported image format: {:?}",
                    other
                )));
            }
            None => {
                return Err(DeckError::ImageError(
                    "unrecognized image format".to_string(),
                ));
            }
        };
        let (width, height) = reader.into_dimensions()?;
        if width == 0 || height == 0 {
            return Err(DeckError::ImageError(format!(
                "image has no area: {}x{}",
                width, height
            )));
        }

        Ok(Self {
            bytes,
            format,
            width,
            height,
        })
    }

    /// Encode a decoded image as PNG.
    pub fn from_image(image: &DynamicImage) -> Result<Self> {
        let mut buffer = Cursor::new(Vec::new());
        image.write_to(&mut buffer, ImageOutputFormat::Png)?;
        Self::from_bytes(buffer.into_inner())
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    /// Pixel dimensions as `(width, height)`.
    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// File extension used for the media part inside the document.
    pub fn extension(&self) -> &'static str {
        match self.format {
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Gif => "gif",
            ImageFormat::Bmp => "bmp",
            ImageFormat::Tiff => "tiff",
            _ => "png",
        }
    }
}

/// Outcome of resolving the image for one slide.
#[derive(Debug)]
pub enum ImageResolution {
    /// An image was found and validated.
    Attached(ImagePayload),
    /// No attempt was made; the slide is text-only by policy.
    Skipped(&'static str),
    /// An attempt was made and failed; the slide degrades to text-only.
    Failed(String),
}

impl ImageResolution {
    pub fn is_attached(&self) -> bool {
        matches!(self, ImageResolution::Attached(_))
    }

    pub fn into_payload(self) -> Option<ImagePayload> {
        match self {
            ImageResolution::Attached(payload) => Some(payload),
            _ => None,
        }
    }
}

/// Position of a slide within the outline being built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlideSlot {
    /// 0-based index in outline order
    pub index: usize,
    /// Number of records in the outline
    pub total: usize,
}

impl SlideSlot {
    /// 1-based ordinal, as used by numbered image uploads.
    pub fn position(&self) -> usize {
        self.index + 1
    }
}

/// A strategy that finds at most one image for a slide.
///
/// Implementations must contain their own failures: a resolver never aborts
/// the build, it reports `Failed` and the slide renders without a picture.
pub trait ImageResolver {
    fn resolve(&mut self, slot: SlideSlot, record: &SlideRecord) -> ImageResolution;
}
