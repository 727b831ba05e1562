use async_trait::async_trait;
use bytes::Bytes;
use futures_util::Stream;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::process::Stdio;
use std::task::{Context, Poll};
use tempfile::TempDir;
use tokio::process::{Child, ChildStdout, Command};
use tokio_util::io::ReaderStream;

use super::{ByteStream, CaptionProvider, MediaKind, MediaMetadata, MetadataProvider, StreamProvider};
use crate::config::ExtractorConfig;
use crate::{BridgeError, Result};

/// Metadata, caption and media extraction backed by the yt-dlp binary
#[derive(Debug, Clone)]
pub struct YtDlp {
    yt_dlp_path: String,
    check_certificates: bool,
    temp_root: Option<PathBuf>,
}

impl YtDlp {
    pub fn new(config: &ExtractorConfig) -> Self {
        Self {
            yt_dlp_path: config.yt_dlp_path.clone(),
            check_certificates: config.check_certificates,
            temp_root: config.temp_dir.clone(),
        }
    }

    /// Check if yt-dlp is available
    pub async fn check_availability(&self) -> bool {
        Command::new(&self.yt_dlp_path)
            .arg("--version")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map(|output| output.status.success())
            .unwrap_or(false)
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.yt_dlp_path);
        if !self.check_certificates {
            command.arg("--no-check-certificates");
        }
        command
    }

    /// Get video information using yt-dlp
    async fn get_video_info(&self, url: &str) -> Result<Value> {
        tracing::debug!("Extracting video info for: {}", url);

        let output = self
            .command()
            .args(["--dump-json", "--no-playlist", url])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        if !output.status.success() {
            let error = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!(BridgeError::ExtractionFailed(format!("yt-dlp failed: {}", error.trim())));
        }

        let json_str = String::from_utf8(output.stdout)?;
        let info: Value = serde_json::from_str(&json_str)?;

        Ok(info)
    }

    fn temp_dir(&self) -> Result<TempDir> {
        let dir = match &self.temp_root {
            Some(root) => {
                fs_err::create_dir_all(root)?;
                tempfile::Builder::new().prefix("clipbridge").tempdir_in(root)?
            }
            None => tempfile::Builder::new().prefix("clipbridge").tempdir()?,
        };
        Ok(dir)
    }
}

/// Build a [`MediaMetadata`] from yt-dlp's `--dump-json` output
pub fn metadata_from_info(info: &Value) -> MediaMetadata {
    let placeholder = MediaMetadata::placeholder();

    let title = info["title"]
        .as_str()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or(placeholder.title);

    let duration = info["duration_string"]
        .as_str()
        .map(|s| s.to_string())
        .or_else(|| info["duration"].as_f64().map(crate::utils::format_clock))
        .unwrap_or(placeholder.duration);

    let description = info["description"]
        .as_str()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    MediaMetadata {
        title,
        duration,
        description,
    }
}

/// Files yt-dlp may write for `template` and `language`, in preference order
pub fn caption_candidates(template: &Path, language: &str) -> Vec<PathBuf> {
    let base = template.to_string_lossy();
    vec![
        PathBuf::from(format!("{}.{}.vtt", base, language)),
        PathBuf::from(format!("{}.{}-orig.vtt", base, language)),
    ]
}

#[async_trait]
impl MetadataProvider for YtDlp {
    async fn fetch_metadata(&self, url: &str) -> Result<MediaMetadata> {
        let info = self.get_video_info(url).await?;
        Ok(metadata_from_info(&info))
    }
}

#[async_trait]
impl CaptionProvider for YtDlp {
    async fn fetch_captions(&self, url: &str, language: &str) -> Result<Option<String>> {
        let dir = self.temp_dir()?;
        let template = dir.path().join(crate::utils::unique_stem("trans"));
        let template_arg = template.to_string_lossy().into_owned();

        tracing::debug!("Downloading {} captions for: {}", language, url);

        let output = self
            .command()
            .args([
                "--skip-download",
                "--write-sub",
                "--write-auto-sub",
                "--sub-lang",
                language,
                "--convert-subs",
                "vtt",
                "--no-playlist",
                "-o",
                template_arg.as_str(),
                url,
            ])
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await?;

        // yt-dlp exits non-zero for some caption-less videos; the file check below decides
        if !output.status.success() {
            tracing::debug!(
                "yt-dlp caption run exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        let Some(found) = caption_candidates(&template, language)
            .into_iter()
            .find(|path| path.exists())
        else {
            tracing::info!("No {} captions available for: {}", language, url);
            return Ok(None);
        };

        let content = fs_err::read_to_string(&found)?;
        if let Err(e) = fs_err::remove_file(&found) {
            tracing::warn!("Failed to remove caption file: {}", e);
        }

        Ok(Some(content))
    }
}

#[async_trait]
impl StreamProvider for YtDlp {
    async fn open_stream(&self, url: &str, kind: MediaKind) -> Result<ByteStream> {
        tracing::info!("Streaming {} for: {}", kind.as_str(), url);

        let mut child = self
            .command()
            .args(["-o", "-", "--no-playlist", "-f", kind.format_selector(), url])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| BridgeError::ExtractionFailed(format!("failed to start yt-dlp: {}", e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| BridgeError::ExtractionFailed("yt-dlp stdout unavailable".to_string()))?;

        Ok(Box::pin(ChildOutput {
            _child: Box::new(child),
            inner: ReaderStream::new(stdout),
        }))
    }
}

/// Stdout of a running yt-dlp process. Dropping it kills the process.
struct ChildOutput {
    _child: Box<Child>,
    inner: ReaderStream<ChildStdout>,
}

impl Stream for ChildOutput {
    type Item = std::io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.get_mut().inner).poll_next(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_metadata_from_info() {
        let info = json!({
            "title": "A talk",
            "duration_string": "12:01",
            "duration": 721.0,
            "description": "About things\n"
        });
        let metadata = metadata_from_info(&info);
        assert_eq!(metadata.title, "A talk");
        assert_eq!(metadata.duration, "12:01");
        assert_eq!(metadata.description.as_deref(), Some("About things"));
    }

    #[test]
    fn test_metadata_duration_fallback() {
        let info = json!({ "title": "Clip", "duration": 3725.0 });
        let metadata = metadata_from_info(&info);
        assert_eq!(metadata.duration, "1:02:05");
        assert_eq!(metadata.description, None);
    }

    #[test]
    fn test_metadata_missing_fields_use_placeholder() {
        let metadata = metadata_from_info(&json!({ "description": "" }));
        assert_eq!(metadata, MediaMetadata::placeholder());
    }

    #[test]
    fn test_caption_candidates() {
        let candidates = caption_candidates(Path::new("/tmp/x/trans_1"), "en");
        assert_eq!(
            candidates,
            vec![
                PathBuf::from("/tmp/x/trans_1.en.vtt"),
                PathBuf::from("/tmp/x/trans_1.en-orig.vtt"),
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_binary_is_reported() {
        let config = ExtractorConfig {
            yt_dlp_path: "/nonexistent/yt-dlp-binary".to_string(),
            ..ExtractorConfig::default()
        };
        let ytdlp = YtDlp::new(&config);
        assert!(!ytdlp.check_availability().await);
        assert!(ytdlp.fetch_metadata("https://youtu.be/x").await.is_err());
        assert!(ytdlp.open_stream("https://youtu.be/x", MediaKind::Audio).await.is_err());
    }
}
