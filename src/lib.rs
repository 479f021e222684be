// ABOUTME: Library module for the outline-deck program.
// ABOUTME: Contains the outline parser, image resolvers, slide layout and PPTX generation.

// Reexport modules
pub mod builder;
pub mod config;
pub mod deck;
pub mod diffusion;
pub mod errors;
pub mod generative;
pub mod images;
pub mod layout;
pub mod local_index;
pub mod outline;
pub mod pptx;
pub mod remote;
pub mod run;
pub mod utils;
pub mod watch;

// Reexport common types and functions
pub use builder::{
    AssembledDeck, BuiltDeck, DeckMode, GenerativeInputs, ImageOutcome, ModeKind, assemble_deck,
    build_deck,
};
pub use config::{Config, GenerationConfig};
pub use deck::Deck;
pub use errors::{DeckError, Result};
pub use generative::{BackendLoader, GenerativePipeline, ImageBackend};
pub use images::{ImagePayload, ImageResolution};
pub use local_index::{ImageIndex, UploadedImage, build_index};
pub use outline::{SlideRecord, parse_outline};
pub use remote::RemoteFetcher;
pub use run::{BuildRequest, run_build};
pub use watch::{WatchConfig, watch_outline};

#[cfg(test)]
mod tests;
