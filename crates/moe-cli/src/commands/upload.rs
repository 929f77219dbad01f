use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use colored::Colorize;

use moe_api::FileApiClient;
use moe_core::upload::{BatchOutcome, FileBatchUploader, FileInput};

/// Reads the given paths and uploads them as one concurrent batch.
pub async fn run(uploader: &FileBatchUploader<FileApiClient>, paths: &[PathBuf]) -> Result<()> {
    let mut files = Vec::new();
    for path in paths {
        let name = file_name(path);
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let input = FileInput::new(&name, mime_for(&name), bytes);
        if !input.has_supported_extension() {
            println!(
                "{}",
                format!(
                    "Note: '{name}' is not a typical Mozaik file (.cab, .cabx, .mzb, .xml); \
                     the server may reject it."
                )
                .yellow()
            );
        }
        files.push(input);
    }

    if !files.is_empty() && uploader.context().capabilities().uploads_allowed {
        println!(
            "{}",
            format!("Analyzing {} file(s)...", files.len()).bright_black()
        );
    }

    match uploader.upload_batch(files).await {
        BatchOutcome::UpgradeRequired { guidance } => {
            println!("{}", guidance.yellow());
        }
        BatchOutcome::Empty => {
            println!("{}", "No files to upload.".bright_black());
        }
        BatchOutcome::Completed { uploaded, failures } => {
            for file in &uploaded {
                println!(
                    "{}",
                    format!(
                        "uploaded {} ({:.1} KB, {}) - {}",
                        file.name,
                        file.size as f64 / 1024.0,
                        file.mime_type,
                        file.status
                    )
                    .green()
                );
                println!("  {}", file.analysis_summary.bright_black());
            }
            for failure in &failures {
                println!(
                    "{}",
                    format!("failed {}: {}", failure.name, failure.message).red()
                );
            }
        }
    }
    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| path.display().to_string())
}

fn mime_for(name: &str) -> &'static str {
    match name.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase()) {
        Some(ext) if ext == "xml" => "application/xml",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn xml_gets_a_specific_mime_type() {
        assert_eq!(mime_for("layout.xml"), "application/xml");
        assert_eq!(mime_for("LAYOUT.XML"), "application/xml");
        assert_eq!(mime_for("cabinet.cab"), "application/octet-stream");
        assert_eq!(mime_for("noext"), "application/octet-stream");
    }
}
