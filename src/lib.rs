//! The main library for the `bitsofpluto` bot.
//!
//! Every run crops a random, not-too-dark bit out of a huge photo of Pluto and
//! toots it. The primary entry point is the `run` function, which takes the parsed
//! CLI arguments and executes one posting cycle.
//!
//! The library is structured into several modules:
//! - `cli`: Defines the command-line interface.
//! - `credentials`: Loads the Mastodon secrets from YAML.
//! - `region`: Chooses and writes the crop.
//! - `ephemeris` and `geolocation`: Find the point on Earth closest to Pluto.
//! - `poster`: Uploads the crop and publishes the toot.
//! - `error`: Defines the application's custom error type.

use anyhow::{Context, Result};
use chrono::Utc;
use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;

pub mod cli;
pub mod credentials;
pub mod ephemeris;
pub mod error;
pub mod geolocation;
pub mod poster;
pub mod region;

use crate::cli::Cli;
use crate::credentials::{Credentials, MASTODON_KEYS};
use crate::ephemeris::Pluto;
use crate::poster::{MastodonPoster, PostOptions, Toot};
use crate::region::{RegionSelector, SelectorConfig};

/// What a run produced.
#[derive(Debug)]
pub struct RunOutcome {
    /// The crop written to disk.
    pub image_path: PathBuf,
    /// URL of the published toot, `None` in test mode.
    pub url: Option<String>,
}

/// The main entry point for the application logic.
///
/// This function orchestrates one posting cycle:
/// 1.  It loads the credentials, failing before any other work if keys are missing.
/// 2.  It selects a bit of Pluto and writes it to a uniquely named JPEG.
/// 3.  It optionally works out the point on Earth closest to Pluto.
/// 4.  It toots the crop, unless in test mode, and opens it in a browser.
///
/// # Arguments
///
/// * `cli` - A reference to the `Cli` struct containing parsed command-line arguments.
///
/// # Errors
///
/// Returns an error if the credentials, the source image, the crop selection or the
/// Mastodon API fail.
pub fn run(cli: &Cli) -> Result<RunOutcome> {
    // 1. Credentials first, so a misconfigured bot fails fast
    let credentials = Credentials::load(&cli.yaml, MASTODON_KEYS)
        .with_context(|| format!("Failed to load credentials from {}", cli.yaml.display()))?;

    // 2. Pick a bit of Pluto
    let source = region::load_source(&cli.pluto)
        .with_context(|| format!("Failed to load Pluto from {}", cli.pluto.display()))?;
    let mut rng = match cli.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };
    let selector = RegionSelector::new(SelectorConfig {
        max_attempts: cli.max_attempts,
        ..Default::default()
    });
    let crop = selector.select(&source, &mut rng)?;

    let output_dir = cli.output_dir.clone().unwrap_or_else(std::env::temp_dir);
    let image_path = crop
        .save_to(&output_dir)
        .with_context(|| format!("Failed to write crop to {}", output_dir.display()))?;

    // 3. Where on Earth is Pluto overhead?
    let geo = if cli.geo {
        Some(geolocation::closest_point(&Pluto, Utc::now())?)
    } else {
        None
    };

    // 4. Toot it
    let poster = MastodonPoster::new(&credentials, &cli.instance)?;
    let toot = Toot {
        status: cli.status.clone(),
        image: Some(image_path.clone()),
        geo,
    };
    let options = PostOptions {
        test: cli.test,
        open_browser: !cli.no_web,
    };
    let url = poster::post(&poster, &toot, options).context("Failed to toot")?;

    info!("Done.");
    Ok(RunOutcome { image_path, url })
}
