// ABOUTME: Deck building module for the outline-deck application
// ABOUTME: Runs every outline record through the selected image resolver and the slide layout

use crate::deck::Deck;
use crate::errors::Result;
use crate::generative::{GenerativePipeline, GenerativeResolver, ProgressCallback};
use crate::images::{ImageResolution, ImageResolver, SlideSlot};
use crate::layout;
use crate::local_index::{ImageIndex, LocalIndexResolver};
use crate::outline::SlideRecord;
use crate::remote::RemoteFetcher;
use log::{debug, info, warn};
use std::fmt;

/// Image acquisition strategy, without its inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeKind {
    TextOnly,
    LocalImages,
    WebImages,
    Generative,
}

impl ModeKind {
    /// Subtitle shown on the title slide.
    pub fn subtitle(&self) -> &'static str {
        match self {
            ModeKind::TextOnly => "Text only",
            ModeKind::LocalImages => "Local images",
            ModeKind::WebImages => "Web images",
            ModeKind::Generative => "Generative images",
        }
    }
}

impl fmt::Display for ModeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.subtitle())
    }
}

/// Inputs of the generative mode.
pub struct GenerativeInputs<'a> {
    pub pipeline: &'a GenerativePipeline,
    pub steps: u32,
    pub per_slide_images: bool,
    pub progress: Option<ProgressCallback<'a>>,
}

/// Image acquisition strategy together with its inputs.
pub enum DeckMode<'a> {
    TextOnly,
    LocalImages(ImageIndex),
    WebImages(RemoteFetcher),
    Generative(GenerativeInputs<'a>),
}

impl DeckMode<'_> {
    pub fn kind(&self) -> ModeKind {
        match self {
            DeckMode::TextOnly => ModeKind::TextOnly,
            DeckMode::LocalImages(_) => ModeKind::LocalImages,
            DeckMode::WebImages(_) => ModeKind::WebImages,
            DeckMode::Generative(_) => ModeKind::Generative,
        }
    }
}

/// What happened to the image of one slide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageOutcome {
    Attached,
    Skipped,
    Failed(String),
}

/// A deck with one title slide followed by one slide per record.
#[derive(Debug)]
pub struct AssembledDeck {
    pub deck: Deck,
    /// One entry per record, in outline order
    pub outcomes: Vec<ImageOutcome>,
}

/// The serialized presentation and per-slide image outcomes.
#[derive(Debug)]
pub struct BuiltDeck {
    pub bytes: Vec<u8>,
    pub slide_count: usize,
    pub outcomes: Vec<ImageOutcome>,
}

impl BuiltDeck {
    pub fn images_attached(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| **outcome == ImageOutcome::Attached)
            .count()
    }

    pub fn image_failures(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| matches!(outcome, ImageOutcome::Failed(_)))
            .count()
    }
}

/// Lay out `records` into a new deck using `mode` for images.
///
/// Image failures only affect their own slide. The one error that aborts
/// the build is an unavailable generative backend, reported before any
/// slide is created.
pub fn assemble_deck(
    records: &[SlideRecord],
    mode: DeckMode<'_>,
    deck_title: &str,
) -> Result<AssembledDeck> {
    let kind = mode.kind();
    info!("Building deck of {} slides ({})", records.len(), kind);

    let mut resolver: Option<Box<dyn ImageResolver + '_>> = match mode {
        DeckMode::TextOnly => None,
        DeckMode::LocalImages(index) => Some(Box::new(LocalIndexResolver::new(index))),
        DeckMode::WebImages(fetcher) => Some(Box::new(fetcher)),
        DeckMode::Generative(inputs) => {
            let backend = inputs.pipeline.ensure()?;
            Some(Box::new(GenerativeResolver::new(
                backend,
                inputs.steps,
                inputs.per_slide_images,
                inputs.progress,
            )))
        }
    };

    let mut deck = Deck::new(deck_title);
    layout::add_title_slide(&mut deck, deck_title, kind.subtitle());

    let total = records.len();
    let mut outcomes = Vec::with_capacity(total);
    for (index, record) in records.iter().enumerate() {
        let slot = SlideSlot { index, total };
        let resolution = match resolver.as_mut() {
            Some(resolver) => resolver.resolve(slot, record),
            None => ImageResolution::Skipped("text-only mode"),
        };

        let (outcome, image) = match resolution {
            ImageResolution::Attached(payload) => {
                debug!("Slide {} gets an image", slot.position());
                (ImageOutcome::Attached, Some(payload))
            }
            ImageResolution::Skipped(reason) => {
                debug!("Slide {} has no image: {}", slot.position(), reason);
                (ImageOutcome::Skipped, None)
            }
            ImageResolution::Failed(reason) => {
                warn!("Slide {} image failed: {}", slot.position(), reason);
                (ImageOutcome::Failed(reason), None)
            }
        };

        layout::add_content_slide(&mut deck, &record.title, &record.bullets, image);
        outcomes.push(outcome);
    }

    Ok(AssembledDeck { deck, outcomes })
}

/// Build the deck and serialize it into PPTX bytes.
///
/// Nothing is written to disk; the caller decides where the bytes go.
pub fn build_deck(
    records: &[SlideRecord],
    mode: DeckMode<'_>,
    deck_title: &str,
) -> Result<BuiltDeck> {
    let AssembledDeck { deck, outcomes } = assemble_deck(records, mode, deck_title)?;
    let bytes = deck.to_pptx()?;

    Ok(BuiltDeck {
        bytes,
        slide_count: deck.slide_count(),
        outcomes,
    })
}
