use clap::Parser;
use std::path::PathBuf;

/// Default Mastodon instance the bot account lives on.
pub const DEFAULT_INSTANCE: &str = "https://botsin.space";

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Tooting a different bit of Pluto every six hours."
)]
pub struct Cli {
    /// YAML file containing the Mastodon keys and secrets.
    #[arg(short, long, default_value = "bitsofpluto.yaml")]
    pub yaml: PathBuf,

    /// Path to a big photo of Pluto.
    #[arg(short, long, default_value = "data/crop_p_color2_enhanced_release.7000x7000.png")]
    pub pluto: PathBuf,

    /// Test mode: go through the motions but don't toot anything.
    #[arg(short = 'x', long, default_value_t = false)]
    pub test: bool,

    /// Don't open a web browser to show the tooted toot.
    #[arg(long, default_value_t = false)]
    pub no_web: bool,

    /// Text of the toot.
    #[arg(short, long, default_value = "A bit of Pluto")]
    pub status: String,

    /// Base URL of the Mastodon instance.
    #[arg(long, default_value = DEFAULT_INSTANCE)]
    pub instance: String,

    /// Seed for the crop selection. Random when omitted.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Give up after this many rejected crops. At least one.
    #[arg(
        long,
        default_value_t = crate::region::DEFAULT_MAX_ATTEMPTS,
        value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..)
    )]
    pub max_attempts: usize,

    /// Attach the point on Earth closest to Pluto to the toot.
    /// Dropped by instances without geolocation support.
    #[arg(long, default_value_t = false)]
    pub geo: bool,

    /// Directory to write the cropped image to.
    /// Defaults to the system temporary directory.
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
}
