//! clipbridge - An HTTP service that turns video URLs into download links and translated transcripts
//!
//! This library wraps `yt-dlp` for metadata, captions and media streaming, cleans WebVTT caption
//! tracks into plain text, and translates that text through a primary provider with a free fallback.

pub mod cli;
pub mod config;
pub mod extractors;
pub mod output;
pub mod server;
pub mod subtitles;
pub mod transcript;
pub mod translate;
pub mod utils;

pub use cli::{Cli, Commands, OutputFormat};
pub use config::Config;
pub use extractors::{CaptionProvider, MediaKind, MediaMetadata, MetadataProvider, Platform, StreamProvider};
pub use subtitles::{normalize_vtt, PlainTranscript, SubtitleDocument};
pub use transcript::{Transcript, TranscriptService};
pub use translate::TranslationPolicy;

/// Result type used throughout the library
pub type Result<T> = anyhow::Result<T>;

/// Error types specific to clipbridge
#[derive(thiserror::Error, Debug)]
pub enum BridgeError {
    #[error("Unsupported URL: {0}")]
    UnsupportedUrl(String),

    #[error("Media extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("Translation failed: {0}")]
    TranslationFailed(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}
