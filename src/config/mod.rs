use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::BridgeError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP listener settings
    pub server: ServerConfig,

    /// Translation provider settings
    pub translation: TranslationConfig,

    /// yt-dlp settings
    pub extractor: ExtractorConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to bind
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Base URL used in generated stream links (derived from the request when unset)
    pub public_base_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranslationConfig {
    /// Credential for the primary provider; without it only the fallback is used
    pub openai_api_key: Option<String>,

    /// OpenAI-compatible API root
    pub openai_base_url: String,

    /// Chat model for the primary provider
    pub model: String,

    /// Sampling temperature for the primary provider
    pub temperature: f32,

    /// System instruction sent with every primary request
    pub system_prompt: String,

    /// Target language code
    pub target_language: String,

    /// Root of the free translation endpoint
    pub google_base_url: String,

    /// Characters sent to the primary provider
    pub max_input_chars: usize,

    /// Shorter input is answered with a sentinel instead of a translation
    pub min_input_chars: usize,

    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// yt-dlp executable
    pub yt_dlp_path: String,

    /// Caption language requested from yt-dlp
    pub caption_language: String,

    /// Verify TLS certificates when yt-dlp fetches pages
    pub check_certificates: bool,

    /// Directory for temporary caption files
    pub temp_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            public_base_url: None,
        }
    }
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            openai_base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            temperature: 0.3,
            system_prompt: "Traduce în Română. Păstrează sensul dar fă-l să sune natural.".to_string(),
            target_language: "ro".to_string(),
            google_base_url: "https://translate.googleapis.com".to_string(),
            max_input_chars: 3000,
            min_input_chars: 5,
            request_timeout_secs: 60,
        }
    }
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            yt_dlp_path: default_yt_dlp_path(),
            caption_language: "en".to_string(),
            check_certificates: false,
            temp_dir: None,
        }
    }
}

/// On Windows yt-dlp ships as an executable next to the server binary
fn default_yt_dlp_path() -> String {
    if cfg!(windows) {
        std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|dir| dir.join("yt-dlp.exe")))
            .filter(|path| path.exists())
            .map(|path| path.to_string_lossy().into_owned())
            .unwrap_or_else(|| "yt-dlp.exe".to_string())
    } else {
        "yt-dlp".to_string()
    }
}

impl Config {
    /// Load configuration from file (or defaults), then apply environment overrides
    pub async fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let mut config = match Self::config_path(explicit_path)? {
            Some(path) => Self::from_file(&path)?,
            None => {
                tracing::debug!("No config file found, using defaults");
                Self::default()
            }
        };

        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Read a YAML config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs_err::read_to_string(path).context("Failed to read config file")?;

        let config: Config = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self).context("Failed to serialize config")?;

        fs_err::write(path, content).context("Failed to write config file")?;

        Ok(())
    }

    /// Apply `OPENAI_API_KEY`, `PORT`, `YTDLP_PATH` and `PUBLIC_BASE_URL`
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(key) = non_empty("OPENAI_API_KEY") {
            self.translation.openai_api_key = Some(key);
        }

        if let Some(port) = non_empty("PORT") {
            match port.parse() {
                Ok(port) => self.server.port = port,
                Err(_) => tracing::warn!("Ignoring invalid PORT value: {}", port),
            }
        }

        if let Some(path) = non_empty("YTDLP_PATH") {
            self.extractor.yt_dlp_path = path;
        }

        if let Some(base) = non_empty("PUBLIC_BASE_URL") {
            self.server.public_base_url = Some(base);
        }
    }

    /// Config file to read: explicit path, `./config.yaml`, then the user config directory
    fn config_path(explicit_path: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit_path {
            if !path.exists() {
                anyhow::bail!(BridgeError::ConfigError(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            return Ok(Some(path.to_path_buf()));
        }

        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Ok(Some(local_config));
        }

        Ok(Self::default_path().filter(|path| path.exists()))
    }

    /// Per-user config location
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("clipbridge").join("config.yaml"))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            anyhow::bail!(BridgeError::ConfigError("server port must be non-zero".to_string()));
        }

        if self.translation.max_input_chars == 0 {
            anyhow::bail!(BridgeError::ConfigError(
                "translation.max_input_chars must be positive".to_string()
            ));
        }

        if self.translation.min_input_chars == 0 {
            anyhow::bail!(BridgeError::ConfigError(
                "translation.min_input_chars must be positive".to_string()
            ));
        }

        if self.translation.target_language.trim().is_empty() {
            anyhow::bail!(BridgeError::ConfigError(
                "translation.target_language must be set".to_string()
            ));
        }

        if self.extractor.yt_dlp_path.trim().is_empty() {
            anyhow::bail!(BridgeError::ConfigError("extractor.yt_dlp_path must be set".to_string()));
        }

        if let Some(base) = &self.server.public_base_url {
            url::Url::parse(base)
                .with_context(|| format!("Invalid server.public_base_url: {}", base))?;
        }

        Ok(())
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  Listen: {}:{}", self.server.host, self.server.port);
        if let Some(base) = &self.server.public_base_url {
            println!("  Public Base URL: {}", base);
        }
        match &self.translation.openai_api_key {
            Some(key) => println!("  OpenAI API Key: {}", crate::utils::mask_secret(key)),
            None => println!("  OpenAI API Key: (not set, fallback translation only)"),
        }
        println!("  Model: {}", self.translation.model);
        println!("  Target Language: {}", self.translation.target_language);
        println!("  Caption Language: {}", self.extractor.caption_language);
        println!("  yt-dlp: {}", self.extractor.yt_dlp_path);
    }

    /// Socket address string for the listener
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
