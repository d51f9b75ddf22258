//! Finds the point on Earth closest to directly beneath a celestial body.
//!
//! Or thereabouts. Rather than inverting the ephemeris, the globe is scanned on a
//! 10° grid for the point where the body's altitude is nearest 90°, then the scan
//! is repeated around the best point at 1°, 0.1° and 0.01°.

use crate::ephemeris::{self, CelestialBody};
use crate::error::AppError;
use chrono::{DateTime, Utc};
use log::{debug, info};
use std::fmt;

pub const COARSE_STEP: f64 = 10.0;

/// Step sizes of the refinement rounds after the coarse scan.
pub const REFINEMENT_STEPS: [f64; 3] = [1.0, 0.1, 0.01];

/// A point on Earth in degrees, longitude east positive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoEstimate {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoEstimate {
    pub fn openstreetmap_url(&self) -> String {
        format!(
            "https://www.openstreetmap.org/?mlat={0}&mlon={1}#map=3/{0}/{1}",
            self.latitude, self.longitude
        )
    }
}

impl fmt::Display for GeoEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}, {:.2}", self.latitude, self.longitude)
    }
}

/// Inclusive latitude/longitude bounds of one scan.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchWindow {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl SearchWindow {
    pub fn globe() -> Self {
        Self {
            min_lat: -90.0,
            max_lat: 90.0,
            min_lon: -180.0,
            max_lon: 180.0,
        }
    }

    pub fn around(center: GeoEstimate, radius: f64) -> Self {
        Self {
            min_lat: center.latitude - radius,
            max_lat: center.latitude + radius,
            min_lon: center.longitude - radius,
            max_lon: center.longitude + radius,
        }
    }
}

/// Outcome of one scan.
#[derive(Debug, Clone, Copy)]
pub struct Round {
    pub window: SearchWindow,
    pub step: f64,
    pub best: GeoEstimate,
    pub altitude: f64,
}

/// Every scan of a coarse-to-fine search, coarsest first.
#[derive(Debug, Clone)]
pub struct SearchTrace {
    pub rounds: Vec<Round>,
}

/// Rounds `value` to the decimal places of `step`, so 0.01 steps give 2 decimals.
fn snap(value: f64, step: f64) -> f64 {
    let decimals = (-step.log10()).ceil().max(0.0) as i32;
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// `min, min + step, ...` up to and including `max`.
fn axis(min: f64, max: f64, step: f64) -> impl Iterator<Item = f64> {
    let count = ((max - min) / step + 1e-9).floor() as usize;
    (0..=count).map(move |i| snap(min + i as f64 * step, step))
}

/// Scans `window` at `step` for the point where `altitude` is closest to 90°.
///
/// Scanning is row-major, latitude outer, both ascending; ties keep the first
/// point found. Latitudes beyond the poles are skipped and longitudes are
/// reported in [-180, 180). Returns `None` if the window holds no valid point.
pub fn scan<F>(window: SearchWindow, step: f64, altitude: F) -> Option<Round>
where
    F: Fn(f64, f64) -> f64,
{
    let mut best: Option<(GeoEstimate, f64)> = None;

    for lat in axis(window.min_lat, window.max_lat, step) {
        if lat.abs() > 90.0 {
            continue;
        }
        for lon in axis(window.min_lon, window.max_lon, step) {
            let alt = altitude(lat, lon);
            let closer = match best {
                Some((_, best_alt)) => (alt - 90.0).abs() < (best_alt - 90.0).abs(),
                None => true,
            };
            if closer {
                let point = GeoEstimate {
                    latitude: lat,
                    longitude: snap(ephemeris::normalize_longitude(lon), step),
                };
                best = Some((point, alt));
            }
        }
    }

    best.map(|(best, altitude)| Round {
        window,
        step,
        best,
        altitude,
    })
}

/// Runs the coarse scan and each refinement round, narrowing the window to the
/// previous best point plus or minus the previous step.
pub fn refine<F>(altitude: F) -> SearchTrace
where
    F: Fn(f64, f64) -> f64,
{
    let mut rounds = Vec::with_capacity(REFINEMENT_STEPS.len() + 1);
    let Some(mut last) = scan(SearchWindow::globe(), COARSE_STEP, &altitude) else {
        return SearchTrace { rounds };
    };
    debug!("step {}: {} alt {:.4}", last.step, last.best, last.altitude);
    rounds.push(last);

    for step in REFINEMENT_STEPS {
        let window = SearchWindow::around(last.best, last.step);
        match scan(window, step, &altitude) {
            Some(round) => {
                debug!("step {}: {} alt {:.4}", round.step, round.best, round.altitude);
                rounds.push(round);
                last = round;
            }
            None => break,
        }
    }

    SearchTrace { rounds }
}

/// Searches for the point beneath `body` at `time`, keeping every round.
///
/// # Errors
///
/// Fails when the body's ephemeris cannot provide a position for `time`.
pub fn closest_point_trace(
    body: &dyn CelestialBody,
    time: DateTime<Utc>,
) -> Result<SearchTrace, AppError> {
    let position = body.position_at(time)?;
    let sidereal = ephemeris::gmst(time);
    debug!(
        "{} at ra {:.4} dec {:.4}, gmst {:.4}",
        body.name(),
        position.ra,
        position.dec,
        sidereal
    );
    Ok(refine(|lat, lon| {
        ephemeris::altitude(&position, lat, lon, sidereal)
    }))
}

/// The point on Earth closest to `body` at `time`.
pub fn closest_point(body: &dyn CelestialBody, time: DateTime<Utc>) -> Result<GeoEstimate, AppError> {
    let trace = closest_point_trace(body, time)?;
    let last = trace.rounds.last().ok_or(AppError::EmptySearch)?;
    let (estimate, altitude) = (last.best, last.altitude);
    info!(
        "Closest point to {}: {} (altitude {:.4})",
        body.name(),
        estimate,
        altitude
    );
    Ok(estimate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ephemeris::{Equatorial, Pluto, Sun};
    use approx::assert_abs_diff_eq;
    use chrono::TimeZone;

    /// Altitude of a body whose subpoint is `target`.
    fn overhead_at(target: GeoEstimate) -> impl Fn(f64, f64) -> f64 {
        let position = Equatorial {
            ra: target.longitude.rem_euclid(360.0),
            dec: target.latitude,
        };
        move |lat, lon| ephemeris::altitude(&position, lat, lon, 0.0)
    }

    fn lon_diff(a: f64, b: f64) -> f64 {
        ephemeris::normalize_longitude(a - b).abs()
    }

    #[test]
    fn axis_includes_both_ends() {
        let values: Vec<f64> = axis(-90.0, 90.0, 10.0).collect();
        assert_eq!(values.len(), 19);
        assert_eq!(values[0], -90.0);
        assert_eq!(values[18], 90.0);

        let fine: Vec<f64> = axis(1.0, 1.2, 0.01).collect();
        assert_eq!(fine.len(), 21);
        assert_abs_diff_eq!(fine[20], 1.2, epsilon = 1e-9);
    }

    #[test]
    fn fine_axis_lands_exactly_on_the_pole() {
        let values: Vec<f64> = axis(89.9 - 0.1, 89.9 + 0.1, 0.01).collect();
        assert_eq!(values.len(), 21);
        assert_eq!(values[20], 90.0);

        let window = SearchWindow::around(
            GeoEstimate {
                latitude: 89.9,
                longitude: 0.0,
            },
            0.1,
        );
        let round = scan(window, 0.01, |lat, _| lat).unwrap();
        assert_eq!(round.best.latitude, 90.0);
    }

    #[test]
    fn wrapped_longitudes_are_reported_without_noise() {
        let window = SearchWindow::around(
            GeoEstimate {
                latitude: 0.0,
                longitude: -180.0,
            },
            0.1,
        );
        let round = scan(window, 0.01, |_, lon| 90.0 - (lon + 180.01).abs()).unwrap();
        assert_eq!(round.best.longitude, 179.99);
        assert!(round.best.openstreetmap_url().contains("mlon=179.99#"));
    }

    #[test]
    fn ties_go_to_first_point_in_scan_order() {
        let round = scan(SearchWindow::globe(), COARSE_STEP, |_, _| 45.0).unwrap();
        assert_eq!(
            round.best,
            GeoEstimate {
                latitude: -90.0,
                longitude: -180.0
            }
        );
    }

    #[test]
    fn scan_skips_latitudes_past_the_poles() {
        let window = SearchWindow::around(
            GeoEstimate {
                latitude: 89.5,
                longitude: 0.0,
            },
            1.0,
        );
        // Prefers ever higher latitudes, but must stop at the pole.
        let round = scan(window, 0.5, |lat, _| lat).unwrap();
        assert_eq!(round.best.latitude, 90.0);
    }

    #[test]
    fn converges_on_synthetic_subpoints() {
        let targets = [
            (-22.87, 123.456),
            (0.0, 0.0),
            (41.234, -73.987),
            (-5.005, 179.996),
        ];
        for (lat, lon) in targets {
            let target = GeoEstimate {
                latitude: lat,
                longitude: lon,
            };
            let estimate = refine(overhead_at(target)).rounds.last().unwrap().best;
            assert!(
                (estimate.latitude - lat).abs() <= 0.01 + 1e-9,
                "lat {} vs {}",
                estimate.latitude,
                lat
            );
            assert!(
                lon_diff(estimate.longitude, lon) <= 0.01 + 1e-9,
                "lon {} vs {}",
                estimate.longitude,
                lon
            );
        }
    }

    #[test]
    fn each_window_is_centred_on_previous_best() {
        let target = GeoEstimate {
            latitude: 12.3456,
            longitude: -98.7654,
        };
        let trace = refine(overhead_at(target));
        assert_eq!(trace.rounds.len(), 4);
        assert_eq!(trace.rounds[0].window, SearchWindow::globe());
        assert_eq!(trace.rounds[0].step, COARSE_STEP);

        for pair in trace.rounds.windows(2) {
            let (previous, current) = (&pair[0], &pair[1]);
            let center = GeoEstimate {
                latitude: (current.window.min_lat + current.window.max_lat) / 2.0,
                longitude: (current.window.min_lon + current.window.max_lon) / 2.0,
            };
            assert_abs_diff_eq!(center.latitude, previous.best.latitude, epsilon = 1e-9);
            assert_abs_diff_eq!(center.longitude, previous.best.longitude, epsilon = 1e-9);
            assert_abs_diff_eq!(
                current.window.max_lat - center.latitude,
                previous.step,
                epsilon = 1e-9
            );
            assert_abs_diff_eq!(
                current.window.max_lon - center.longitude,
                previous.step,
                epsilon = 1e-9
            );
            assert!(current.altitude >= previous.altitude - 1e-9);
        }
        let steps: Vec<f64> = trace.rounds.iter().map(|r| r.step).collect();
        assert_eq!(steps, vec![10.0, 1.0, 0.1, 0.01]);
    }

    #[test]
    fn sun_estimate_matches_analytic_subpoint() {
        let time = Utc.with_ymd_and_hms(2024, 8, 1, 9, 30, 0).unwrap();
        let position = Sun.position_at(time).unwrap();
        let (lat, lon) = ephemeris::subpoint(&position, ephemeris::gmst(time));

        let estimate = closest_point(&Sun, time).unwrap();
        assert!((estimate.latitude - lat).abs() <= 0.01 + 1e-9);
        assert!(lon_diff(estimate.longitude, lon) <= 0.01 + 1e-9);
    }

    #[test]
    fn pluto_estimate_is_on_its_declination() {
        let time = Utc.with_ymd_and_hms(2025, 2, 3, 4, 5, 0).unwrap();
        let position = Pluto.position_at(time).unwrap();
        let estimate = closest_point(&Pluto, time).unwrap();
        assert!((estimate.latitude - position.dec).abs() <= 0.01 + 1e-9);
    }

    #[test]
    fn ephemeris_failure_is_propagated() {
        let time = Utc.with_ymd_and_hms(2200, 1, 1, 0, 0, 0).unwrap();
        assert!(closest_point(&Pluto, time).is_err());
    }

    #[test]
    fn openstreetmap_url_repeats_coordinates() {
        let point = GeoEstimate {
            latitude: -23.5,
            longitude: 120.25,
        };
        assert_eq!(
            point.openstreetmap_url(),
            "https://www.openstreetmap.org/?mlat=-23.5&mlon=120.25#map=3/-23.5/120.25"
        );
    }
}
