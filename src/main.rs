use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use clipbridge::cli::{Cli, Commands};
use clipbridge::config::Config;
use clipbridge::extractors::{validate_url, MediaMetadata, MetadataProvider, Platform, YtDlp};
use clipbridge::output::{self, TranscriptReport};
use clipbridge::transcript::{self, TranscriptService};
use clipbridge::translate::TranslationPolicy;
use clipbridge::{server, utils};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose {
        "clipbridge=debug,tower_http=debug"
    } else {
        "clipbridge=info,tower_http=info"
    };

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match cli.command {
        Commands::Serve { host, port } => {
            let mut config = Config::load(cli.config.as_deref()).await?;
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            config.validate()?;

            // Check for required external dependencies (non-fatal in containers)
            for dep in utils::check_dependencies(&config.extractor.yt_dlp_path).await {
                tracing::warn!("Dependency check: {} not found", dep);
            }

            server::serve(&config).await?;
        }
        Commands::Transcript {
            url,
            output,
            format,
            no_translate,
        } => {
            let config = Config::load(cli.config.as_deref()).await?;
            let report = build_report(&config, &url, no_translate).await?;

            match output {
                Some(path) => {
                    output::save_to_file(&report, &path, &format).await?;
                    println!("Transcript saved to: {}", path.display());
                }
                None => {
                    output::print_to_console(&report, &format)?;
                }
            }
        }
        Commands::Config { show, init } => {
            if init {
                let path = cli
                    .config
                    .clone()
                    .or_else(Config::default_path)
                    .context("Could not determine config directory")?;
                Config::default().save(&path).await?;
                println!("Default configuration written to: {}", path.display());
            } else {
                let config = Config::load(cli.config.as_deref()).await?;
                config.display();
                if !show {
                    if let Some(path) = Config::default_path() {
                        println!();
                        println!("Edit the config file to change settings:");
                        println!("  {}", path.display());
                    }
                }
            }
        }
        Commands::Platforms => {
            println!("Supported platforms:");
            for platform in Platform::supported() {
                let captions = if platform.has_captions() { " (transcript + translation)" } else { "" };
                println!("  • {} ({}){}", platform.name(), platform.domains().join(", "), captions);
            }
            println!("  • Other sites supported by yt-dlp (download links only)");
        }
    }

    Ok(())
}

/// Metadata, captions and translation for a single URL
async fn build_report(config: &Config, url: &str, no_translate: bool) -> Result<TranscriptReport> {
    validate_url(url)?;
    let platform = Platform::detect(url);

    let ytdlp = Arc::new(YtDlp::new(&config.extractor));
    if !ytdlp.check_availability().await {
        anyhow::bail!(
            "{} is not available. Please install it: https://github.com/yt-dlp/yt-dlp",
            config.extractor.yt_dlp_path
        );
    }

    let metadata = ytdlp.fetch_metadata(url).await.unwrap_or_else(|e| {
        tracing::warn!("Metadata extraction failed: {:#}", e);
        MediaMetadata::placeholder()
    });

    let policy = Arc::new(TranslationPolicy::from_config(&config.translation)?);
    let service = TranscriptService::new(ytdlp, policy, config.extractor.caption_language.clone());

    let captions = if platform.has_captions() {
        service.original_text(url).await
    } else {
        tracing::info!("{} has no caption track support, using the description", platform.name());
        None
    };

    let (original, translated) = if no_translate {
        (
            captions.unwrap_or_else(|| transcript::fallback_text(metadata.description.as_deref())),
            None,
        )
    } else {
        let transcript = service.finish(captions, metadata.description.as_deref()).await;
        (transcript.original, Some(transcript.translated))
    };

    Ok(TranscriptReport {
        url: url.to_string(),
        platform: platform.name().to_string(),
        title: metadata.title,
        duration: metadata.duration,
        original,
        translated,
    })
}
