// ABOUTME: Local image resolver for the outline-deck application
// ABOUTME: Maps numbered image uploads ("01 campus.jpg") onto slide positions

use crate::errors::{DeckError, Result};
use crate::images::{ImagePayload, ImageResolution, ImageResolver, SlideSlot};
use crate::outline::SlideRecord;
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Highest slide number an upload name can carry.
pub const MAX_SLIDE_NUMBER: u32 = 99;

/// A user-supplied image file: its name and raw content.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub name: String,
    pub content: Vec<u8>,
}

impl UploadedImage {
    pub fn new(name: &str, content: Vec<u8>) -> Self {
        Self {
            name: name.to_string(),
            content,
        }
    }

    /// Read an upload from disk, keeping only the file name.
    pub fn from_path(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| DeckError::ValidationError(format!("Not a file path: {:?}", path)))?;
        let content = fs::read(path)?;
        Ok(Self { name, content })
    }

    /// Collect the numbered files of `dir` matching `pattern`, sorted by name.
    ///
    /// Files without a slide number are never read. A file that cannot be
    /// read is logged and skipped.
    pub fn collect_from_dir(dir: &Path, pattern: &str) -> Result<Vec<Self>> {
        let glob_pattern = format!("{}/{}", dir.to_string_lossy(), pattern);
        let mut paths: Vec<_> = glob::glob(&glob_pattern)
            .map_err(|e| DeckError::ConfigError(format!("Invalid glob pattern: {}", e)))?
            .flatten()
            .filter(|path| path.is_file())
            .collect();
        paths.sort();

        info!("Found {} candidate images in {:?}", paths.len(), dir);
        let mut uploads = Vec::with_capacity(paths.len());
        for path in &paths {
            let numbered = path
                .file_name()
                .map(|name| slide_number_from_name(&name.to_string_lossy()).is_some())
                .unwrap_or(false);
            if !numbered {
                debug!("File {:?} has no slide number, not reading it", path);
                continue;
            }
            match Self::from_path(path) {
                Ok(upload) => uploads.push(upload),
                Err(e) => warn!("Skipping unreadable upload {:?}: {}", path, e),
            }
        }
        Ok(uploads)
    }
}

/// Slide number encoded by the 1–2 decimal digits at the very start of `name`.
///
/// Returns `None` when the name does not start with a digit or the number
/// falls outside 1–99. A third digit is not considered: "123 x.png" is 12.
pub fn slide_number_from_name(name: &str) -> Option<u32> {
    let digits: String = name
        .chars()
        .take(2)
        .take_while(|c| c.is_ascii_digit())
        .collect();
    let number = digits.parse::<u32>().ok()?;
    (1..=MAX_SLIDE_NUMBER).contains(&number).then_some(number)
}

/// Numbered uploads keyed by 1-based slide position.
#[derive(Debug, Clone, Default)]
pub struct ImageIndex {
    entries: BTreeMap<u32, ImagePayload>,
}

impl ImageIndex {
    pub fn get(&self, position: usize) -> Option<&ImagePayload> {
        let position = u32::try_from(position).ok()?;
        self.entries.get(&position)
    }

    /// Remove and return the image for `position`.
    pub fn take(&mut self, position: usize) -> Option<ImagePayload> {
        let position = u32::try_from(position).ok()?;
        self.entries.remove(&position)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Slide positions that have an image.
    pub fn positions(&self) -> impl Iterator<Item = u32> + '_ {
        self.entries.keys().copied()
    }
}

/// Build the slide-number index from uploads.
///
/// The first valid upload for a number wins; later ones are ignored. Files
/// without a leading number, or whose content is not a usable image, claim
/// no slot.
pub fn build_index<I>(files: I) -> ImageIndex
where
    I: IntoIterator<Item = UploadedImage>,
{
    let mut index = ImageIndex::default();

    for file in files {
        let Some(number) = slide_number_from_name(&file.name) else {
            debug!("Upload {:?} has no slide number, skipping", file.name);
            continue;
        };
        if index.entries.contains_key(&number) {
            debug!(
                "Slide {} already has an image, ignoring {:?}",
                number, file.name
            );
            continue;
        }
        match ImagePayload::from_bytes(file.content) {
            Ok(payload) => {
                debug!("Upload {:?} assigned to slide {}", file.name, number);
                index.entries.insert(number, payload);
            }
            Err(e) => warn!("Skipping upload {:?}: {}", file.name, e),
        }
    }

    index
}

/// Look up the image for a 1-based slide position.
pub fn resolve(index: &ImageIndex, position: usize) -> Option<ImagePayload> {
    index.get(position).cloned()
}

/// Resolver attaching numbered uploads by slide position.
pub struct LocalIndexResolver {
    index: ImageIndex,
}

impl LocalIndexResolver {
    pub fn new(index: ImageIndex) -> Self {
        Self { index }
    }
}

impl ImageResolver for LocalIndexResolver {
    fn resolve(&mut self, slot: SlideSlot, _record: &SlideRecord) -> ImageResolution {
        match self.index.take(slot.position()) {
            Some(payload) => ImageResolution::Attached(payload),
            None => ImageResolution::Skipped("no upload numbered for this slide"),
        }
    }
}
