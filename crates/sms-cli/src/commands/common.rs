//! Helpers shared by the commands.

use indicatif::{ProgressBar, ProgressStyle};
use sms_config::Profile;
use std::path::Path;

/// Load the profile at `path`, or the defaults when no path is given.
pub fn load_profile(path: Option<&Path>) -> anyhow::Result<Profile> {
    match path {
        Some(path) => {
            tracing::info!(path = %path.display(), "loading profile");
            Ok(Profile::load(path)?)
        }
        None => Ok(Profile::default()),
    }
}

/// Progress bar over `len` samples.
pub fn sample_progress(len: u64) -> anyhow::Result<ProgressBar> {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("##-"),
    );
    Ok(pb)
}

/// Human readable duration of `samples` at `sample_rate`.
pub fn format_duration(samples: usize, sample_rate: u32) -> String {
    format!("{:.3}s", samples as f64 / f64::from(sample_rate.max(1)))
}
