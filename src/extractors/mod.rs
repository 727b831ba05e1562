use async_trait::async_trait;
use bytes::Bytes;
use futures_util::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use url::Url;

pub mod ytdlp;

pub use ytdlp::YtDlp;

use crate::Result;

/// Raw media bytes produced by a [`StreamProvider`]
pub type ByteStream = Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send>>;

/// Descriptive information about a video
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaMetadata {
    /// Title of the media
    pub title: String,

    /// Human readable duration, e.g. "4:13"
    pub duration: String,

    /// Uploader supplied description
    pub description: Option<String>,
}

impl MediaMetadata {
    /// Record shown when metadata extraction fails
    pub fn placeholder() -> Self {
        Self {
            title: "Video".to_string(),
            duration: "N/A".to_string(),
            description: None,
        }
    }
}

/// What the stream endpoint should deliver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Audio,
    Video,
}

impl MediaKind {
    /// Anything other than `audio` is treated as video
    pub fn from_query(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_lowercase()).as_deref() {
            Some("audio") => MediaKind::Audio,
            _ => MediaKind::Video,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Audio => "audio",
            MediaKind::Video => "video",
        }
    }

    /// yt-dlp format selector
    pub fn format_selector(&self) -> &'static str {
        match self {
            MediaKind::Audio => "bestaudio",
            MediaKind::Video => "best",
        }
    }

    /// File name offered to the browser
    pub fn file_name(&self) -> &'static str {
        match self {
            MediaKind::Audio => "audio.mp3",
            MediaKind::Video => "video.mp4",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            MediaKind::Audio => "audio/mpeg",
            MediaKind::Video => "video/mp4",
        }
    }

    /// Label used in the download response
    pub fn quality_label(&self) -> &'static str {
        match self {
            MediaKind::Audio => "Audio Only (MP3)",
            MediaKind::Video => "Video HD (MP4)",
        }
    }
}

/// Video platforms recognised from the URL host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    YouTube,
    TikTok,
    Instagram,
    Facebook,
    Unknown,
}

impl Platform {
    const KNOWN: [(Platform, &'static [&'static str]); 4] = [
        (Platform::YouTube, &["youtube.com", "youtu.be"]),
        (Platform::TikTok, &["tiktok.com"]),
        (Platform::Instagram, &["instagram.com"]),
        (Platform::Facebook, &["facebook.com", "fb.watch"]),
    ];

    /// Detect the platform from the URL host, subdomains included
    pub fn detect(url: &str) -> Self {
        let host = match Url::parse(url.trim()) {
            Ok(parsed) => match parsed.host_str() {
                Some(host) => host.to_lowercase(),
                None => return Platform::Unknown,
            },
            Err(_) => return Platform::Unknown,
        };

        Self::KNOWN
            .iter()
            .find(|(_, domains)| {
                domains
                    .iter()
                    .any(|domain| host == *domain || host.ends_with(&format!(".{}", domain)))
            })
            .map(|(platform, _)| *platform)
            .unwrap_or(Platform::Unknown)
    }

    /// Whether yt-dlp can pull a caption track for this platform
    pub fn has_captions(&self) -> bool {
        matches!(self, Platform::YouTube)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Platform::YouTube => "YouTube",
            Platform::TikTok => "TikTok",
            Platform::Instagram => "Instagram",
            Platform::Facebook => "Facebook",
            Platform::Unknown => "Unknown",
        }
    }

    /// Platforms with dedicated handling
    pub fn supported() -> Vec<Platform> {
        Self::KNOWN.iter().map(|(platform, _)| *platform).collect()
    }

    pub fn domains(&self) -> &'static [&'static str] {
        Self::KNOWN
            .iter()
            .find(|(platform, _)| platform == self)
            .map(|(_, domains)| *domains)
            .unwrap_or(&[])
    }
}

/// Looks up title, duration and description for a URL
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    async fn fetch_metadata(&self, url: &str) -> Result<MediaMetadata>;
}

/// Produces a WebVTT caption track for a URL, if one exists
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CaptionProvider: Send + Sync {
    /// `Ok(None)` when the video has no captions in `language`
    async fn fetch_captions(&self, url: &str, language: &str) -> Result<Option<String>>;
}

/// Streams raw media bytes for a URL
#[async_trait]
pub trait StreamProvider: Send + Sync {
    async fn open_stream(&self, url: &str, kind: MediaKind) -> Result<ByteStream>;
}

/// Validate and normalize URLs
pub fn validate_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url.trim())
        .map_err(|_| crate::BridgeError::UnsupportedUrl(url.to_string()))?;

    if !matches!(parsed.scheme(), "http" | "https") {
        anyhow::bail!(crate::BridgeError::UnsupportedUrl(format!(
            "{} (URL must use HTTP or HTTPS protocol)",
            url
        )));
    }

    Ok(parsed)
}
