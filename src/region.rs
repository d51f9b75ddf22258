//! Picking a bit of Pluto worth posting.
//!
//! Most of the source photo is black space around the planet's disc, so a random
//! crop is often just darkness. Each candidate crop is scored by sampling nine
//! fixed points (corners, edge midpoints and centre) and is accepted once few
//! enough of them are dark.

use crate::error::AppError;
use image::codecs::jpeg::JpegEncoder;
use image::{imageops, Rgb, RgbImage};
use log::{debug, info};
use rand::seq::IndexedRandom;
use rand::Rng;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Crop widths the bot is allowed to post.
pub const WIDTHS: [u32; 5] = [600, 800, 1000, 1200, 2000];

/// Sampled points with brightness below this are dark.
pub const DARK_THRESHOLD: f64 = 10.0;

/// A crop is rejected when more than this many of its nine samples are dark.
pub const MAX_DARK_POINTS: usize = 6;

pub const DEFAULT_MAX_ATTEMPTS: usize = 5000;

/// JPEG quality of the written crop.
pub const JPEG_QUALITY: u8 = 95;

/// Tunables for [`RegionSelector`].
#[derive(Debug, Clone)]
pub struct SelectorConfig {
    pub widths: Vec<u32>,
    /// Height is `width * aspect.1 / aspect.0`, floored.
    pub aspect: (u32, u32),
    pub dark_threshold: f64,
    pub max_dark_points: usize,
    pub max_attempts: usize,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            widths: WIDTHS.to_vec(),
            aspect: (4, 3),
            dark_threshold: DARK_THRESHOLD,
            max_dark_points: MAX_DARK_POINTS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl SelectorConfig {
    pub fn height_for(&self, width: u32) -> u32 {
        width * self.aspect.1 / self.aspect.0
    }
}

/// A rectangle within the source image, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn covering(image: &RgbImage) -> Self {
        Self {
            x: 0,
            y: 0,
            width: image.width(),
            height: image.height(),
        }
    }

    pub fn fits_within(&self, width: u32, height: u32) -> bool {
        self.x + self.width <= width && self.y + self.height <= height
    }
}

/// The crop that passed the darkness test.
#[derive(Debug)]
pub struct AcceptedCrop {
    pub rect: Rect,
    pub dark_points: usize,
    /// How many candidates were drawn, including this one.
    pub attempts: usize,
    pub image: RgbImage,
}

impl AcceptedCrop {
    /// Writes the crop as a JPEG to a new, uniquely named file in `dir`.
    ///
    /// The file is only kept on disk once the image is fully written.
    pub fn save_to(&self, dir: &Path) -> Result<PathBuf, AppError> {
        let mut file = tempfile::Builder::new()
            .prefix("bitofpluto-")
            .suffix(".jpg")
            .tempfile_in(dir)?;

        {
            let mut writer = BufWriter::new(file.as_file_mut());
            let encoder = JpegEncoder::new_with_quality(&mut writer, JPEG_QUALITY);
            self.image.write_with_encoder(encoder)?;
            writer.flush()?;
        }

        let (_, path) = file.keep().map_err(|e| AppError::Io(e.error))?;
        info!("outfile: {}", path.display());
        Ok(path)
    }
}

/// Loads the source photo as 8-bit RGB.
pub fn load_source(path: &Path) -> Result<RgbImage, AppError> {
    let source = image::open(path)?.to_rgb8();
    info!(
        "Loaded '{}' ({}x{})",
        path.display(),
        source.width(),
        source.height()
    );
    Ok(source)
}

/// Mean of the red, green and blue channels, 0 is black and 255 is white.
pub fn brightness(pixel: &Rgb<u8>) -> f64 {
    let [r, g, b] = pixel.0;
    (r as f64 + g as f64 + b as f64) / 3.0
}

/// The nine positions sampled in a `width` x `height` crop.
///
/// Order: top-left, top-right, top-middle, middle-left, middle-right, centre,
/// bottom-left, bottom-right, bottom-middle. Midpoints are floored.
pub fn sample_points(width: u32, height: u32) -> [(u32, u32); 9] {
    let (left, top) = (0, 0);
    let right = width.saturating_sub(1);
    let bottom = height.saturating_sub(1);
    let (mid_x, mid_y) = (right / 2, bottom / 2);
    [
        (left, top),
        (right, top),
        (mid_x, top),
        (left, mid_y),
        (right, mid_y),
        (mid_x, mid_y),
        (left, bottom),
        (right, bottom),
        (mid_x, bottom),
    ]
}

/// Counts the sampled points of `rect` within `source` darker than `threshold`.
pub fn count_dark_points(source: &RgbImage, rect: &Rect, threshold: f64) -> usize {
    sample_points(rect.width, rect.height)
        .iter()
        .filter(|&&(x, y)| {
            let pixel = source.get_pixel(rect.x + x, rect.y + y);
            let value = brightness(pixel);
            debug!("r, g, b: {:?}, brightness: {:.2}", pixel.0, value);
            value < threshold
        })
        .count()
}

/// Draws random crops from a source image until one is bright enough.
pub struct RegionSelector {
    config: SelectorConfig,
}

impl RegionSelector {
    pub fn new(config: SelectorConfig) -> Self {
        Self { config }
    }

    /// Widths from the configuration whose crop fits inside `width` x `height`.
    fn fitting_widths(&self, width: u32, height: u32) -> Vec<u32> {
        self.config
            .widths
            .iter()
            .copied()
            .filter(|&w| w <= width && self.config.height_for(w) <= height)
            .collect()
    }

    /// Draws one candidate rectangle, or `None` when no allowed size fits.
    pub fn candidate<R: Rng + ?Sized>(&self, rng: &mut R, width: u32, height: u32) -> Option<Rect> {
        let widths = self.fitting_widths(width, height);
        self.candidate_from(&widths, rng, width, height)
    }

    fn candidate_from<R: Rng + ?Sized>(
        &self,
        widths: &[u32],
        rng: &mut R,
        width: u32,
        height: u32,
    ) -> Option<Rect> {
        let crop_width = *widths.choose(rng)?;
        let crop_height = self.config.height_for(crop_width);
        let x = rng.random_range(0..=width - crop_width);
        let y = rng.random_range(0..=height - crop_height);
        Some(Rect {
            x,
            y,
            width: crop_width,
            height: crop_height,
        })
    }

    /// Samples crops of `source` until one has at most `max_dark_points` dark
    /// samples.
    ///
    /// # Errors
    ///
    /// `AppError::SourceTooSmall` if no allowed crop size fits the source, and
    /// `AppError::NoSuitableRegion` once `max_attempts` candidates were rejected.
    pub fn select<R: Rng + ?Sized>(
        &self,
        source: &RgbImage,
        rng: &mut R,
    ) -> Result<AcceptedCrop, AppError> {
        let (width, height) = source.dimensions();
        let widths = self.fitting_widths(width, height);
        if widths.is_empty() {
            return Err(AppError::SourceTooSmall { width, height });
        }

        for attempt in 1..=self.config.max_attempts {
            let Some(rect) = self.candidate_from(&widths, rng, width, height) else {
                break;
            };
            debug!(
                "attempt {attempt}: {}x{} at ({}, {})",
                rect.width, rect.height, rect.x, rect.y
            );

            let dark_points = count_dark_points(source, &rect, self.config.dark_threshold);
            debug!("dark points: {dark_points}");

            if dark_points <= self.config.max_dark_points {
                info!(
                    "Selected {}x{} at ({}, {}) after {attempt} attempts, {dark_points} dark points",
                    rect.width, rect.height, rect.x, rect.y
                );
                return Ok(AcceptedCrop {
                    rect,
                    dark_points,
                    attempts: attempt,
                    image: imageops::crop_imm(source, rect.x, rect.y, rect.width, rect.height)
                        .to_image(),
                });
            }
        }

        Err(AppError::NoSuitableRegion(self.config.max_attempts))
    }
}

impl Default for RegionSelector {
    fn default() -> Self {
        Self::new(SelectorConfig::default())
    }
}
