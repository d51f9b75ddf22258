//! Find the point on Earth closest to Pluto right now.
//!
//! Prints the coordinates and an OpenStreetMap link, and opens the link in a
//! browser.
//!
//! Usage:
//! ```text
//! cargo run --bin closest_point -- --body sun --no-web
//! ```

use anyhow::Result;
use bitsofpluto::ephemeris::{CelestialBody, Pluto, Sun};
use bitsofpluto::geolocation;
use chrono::Utc;
use clap::{Parser, ValueEnum};
use log::warn;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Body {
    Pluto,
    Sun,
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Find the point on Earth closest to Pluto right now.")]
struct Args {
    /// Which body to look for.
    #[arg(short, long, value_enum, default_value_t = Body::Pluto)]
    body: Body,

    /// Don't open a web browser to show the point on a map.
    #[arg(long, default_value_t = false)]
    no_web: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let body: &dyn CelestialBody = match args.body {
        Body::Pluto => &Pluto,
        Body::Sun => &Sun,
    };
    let point = geolocation::closest_point(body, Utc::now())?;

    let url = point.openstreetmap_url();
    println!("{} {}", point.latitude, point.longitude);
    println!("{url}");

    if !args.no_web {
        if let Err(e) = webbrowser::open(&url) {
            warn!("Could not open a browser: {e}");
        }
    }

    Ok(())
}
