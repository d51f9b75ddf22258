use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Credentials missing from {path}: {}", missing.join(", "))]
    MissingCredentials { path: PathBuf, missing: Vec<String> },

    #[error("Credentials file {0} is not a YAML mapping")]
    InvalidCredentials(PathBuf),

    #[error("Source image is {width}x{height}, too small for any allowed crop size")]
    SourceTooSmall { width: u32, height: u32 },

    #[error("No suitable region found after {0} attempts")]
    NoSuitableRegion(usize),

    #[error("Ephemeris unavailable for {0}: outside the supported date range")]
    EphemerisOutOfRange(String),

    #[error("Grid search found no point on the globe")]
    EmptySearch,

    #[error("Mastodon API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("I/O error")]
    Io(#[from] std::io::Error),

    #[error("Image decoding/encoding error")]
    Image(#[from] image::ImageError),

    #[error("Failed to parse YAML")]
    Yaml(#[from] serde_yml::Error),

    #[error("Failed to parse JSON response")]
    Json(#[from] serde_json::Error),

    #[error("HTTP request failed")]
    Http(#[from] reqwest::Error),
}
