use anyhow::Result;
use serde::Serialize;
use std::path::Path;

use crate::cli::OutputFormat;

/// Result of the `transcript` command
#[derive(Debug, Clone, Serialize)]
pub struct TranscriptReport {
    pub url: String,
    pub platform: String,
    pub title: String,
    pub duration: String,
    pub original: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translated: Option<String>,
}

pub fn format_as_text(report: &TranscriptReport) -> String {
    let mut out = format!(
        "{}\n{} | {} | {}\n\n--- Original ---\n{}\n",
        report.title, report.platform, report.duration, report.url, report.original
    );
    if let Some(translated) = &report.translated {
        out.push_str("\n--- Translated ---\n");
        out.push_str(translated);
        out.push('\n');
    }
    out
}

pub fn format_as_json(report: &TranscriptReport) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

fn render(report: &TranscriptReport, format: &OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(format_as_text(report)),
        OutputFormat::Json => format_as_json(report),
    }
}

/// Save report to file
pub async fn save_to_file(report: &TranscriptReport, path: &Path, format: &OutputFormat) -> Result<()> {
    let content = render(report, format)?;
    fs_err::write(path, content)?;
    Ok(())
}

/// Print report to console
pub fn print_to_console(report: &TranscriptReport, format: &OutputFormat) -> Result<()> {
    println!("{}", render(report, format)?);
    Ok(())
}
