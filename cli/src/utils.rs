//! Utility functions for the embedload CLI

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};

/// Positions of the import bar; progress fractions are scaled onto this.
pub const FRACTION_STEPS: u64 = 1000;

/// Whether `source` should be fetched over HTTP rather than read from disk.
pub fn is_url(source: &str) -> bool {
    let lower = source.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// `[2, 3]` style shape string, `(scalar)` for rank 0.
pub fn format_shape(shape: &[u64]) -> String {
    if shape.is_empty() {
        "(scalar)".to_string()
    } else {
        format!(
            "[{}]",
            shape
                .iter()
                .map(|d| d.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

/// Byte progress style for downloads
pub fn create_bytes_style() -> Result<ProgressStyle> {
    ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
        .map_err(|e| anyhow::anyhow!("Failed to create progress style: {}", e))
        .map(|s| s.progress_chars("#>-"))
}

/// Style for the import bar, which tracks a fraction rather than a count
pub fn create_fraction_style() -> Result<ProgressStyle> {
    ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {percent}% {msg}")
        .map_err(|e| anyhow::anyhow!("Failed to create progress style: {}", e))
        .map(|s| s.progress_chars("#>-"))
}

/// Download bar; the length is filled in once the server declares one.
pub fn create_bytes_bar() -> Result<ProgressBar> {
    let pb = ProgressBar::new(0);
    pb.set_style(create_bytes_style()?);
    Ok(pb)
}

pub fn create_fraction_bar() -> Result<ProgressBar> {
    let pb = ProgressBar::new(FRACTION_STEPS);
    pb.set_style(create_fraction_style()?);
    Ok(pb)
}

/// Maps a `[0, 1]` fraction onto a bar position.
pub fn fraction_position(fraction: f64) -> u64 {
    (fraction.clamp(0.0, 1.0) * FRACTION_STEPS as f64).round() as u64
}
