//! Approximate positions of the Sun and Pluto.
//!
//! Accuracy is a fraction of a degree, plenty for finding where on Earth a body
//! is overhead. Angles are in degrees unless a field says otherwise.

use crate::error::AppError;
use chrono::{DateTime, Datelike, Utc};

/// Julian date of the J2000.0 epoch.
pub const J2000: f64 = 2_451_545.0;

/// Mean obliquity of the ecliptic at J2000.0.
const OBLIQUITY_J2000: f64 = 23.439_28;

/// A point on the celestial sphere.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Equatorial {
    /// Right ascension in degrees, [0, 360)
    pub ra: f64,
    /// Declination in degrees
    pub dec: f64,
}

/// Something with a position in the sky.
pub trait CelestialBody {
    fn name(&self) -> &str;

    /// Geocentric equatorial coordinates at `time`.
    fn position_at(&self, time: DateTime<Utc>) -> Result<Equatorial, AppError>;
}

pub fn julian_date(time: DateTime<Utc>) -> f64 {
    let seconds = time.timestamp() as f64 + f64::from(time.timestamp_subsec_nanos()) * 1e-9;
    seconds / 86_400.0 + 2_440_587.5
}

/// Greenwich mean sidereal time in degrees, [0, 360).
pub fn gmst(time: DateTime<Utc>) -> f64 {
    let d = julian_date(time) - J2000;
    let t = d / 36_525.0;
    let theta = 280.460_618_37 + 360.985_647_366_29 * d + 0.000_387_933 * t * t
        - t * t * t / 38_710_000.0;
    theta.rem_euclid(360.0)
}

/// Altitude of `position` above the horizon for an observer at `latitude`,
/// `longitude` (east positive), given the sidereal time `gmst`.
pub fn altitude(position: &Equatorial, latitude: f64, longitude: f64, gmst: f64) -> f64 {
    let hour_angle = (gmst + longitude - position.ra).to_radians();
    let (lat, dec) = (latitude.to_radians(), position.dec.to_radians());
    let sin_alt = lat.sin() * dec.sin() + lat.cos() * dec.cos() * hour_angle.cos();
    sin_alt.clamp(-1.0, 1.0).asin().to_degrees()
}

/// The point on Earth where `position` is at the zenith, as (latitude, longitude).
pub fn subpoint(position: &Equatorial, gmst: f64) -> (f64, f64) {
    (position.dec, normalize_longitude(position.ra - gmst))
}

/// Wraps a longitude into [-180, 180).
pub fn normalize_longitude(longitude: f64) -> f64 {
    (longitude + 180.0).rem_euclid(360.0) - 180.0
}

fn ecliptic_to_equatorial([x, y, z]: [f64; 3], obliquity: f64) -> Equatorial {
    let (sin_e, cos_e) = obliquity.to_radians().sin_cos();
    let xe = x;
    let ye = y * cos_e - z * sin_e;
    let ze = y * sin_e + z * cos_e;
    Equatorial {
        ra: ye.atan2(xe).to_degrees().rem_euclid(360.0),
        dec: ze.atan2(xe.hypot(ye)).to_degrees(),
    }
}

/// The Sun, from the Astronomical Almanac's low-precision formulae.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sun;

impl CelestialBody for Sun {
    fn name(&self) -> &str {
        "Sun"
    }

    fn position_at(&self, time: DateTime<Utc>) -> Result<Equatorial, AppError> {
        let n = julian_date(time) - J2000;
        let mean_longitude = 280.460 + 0.985_647_4 * n;
        let mean_anomaly = (357.528 + 0.985_600_3 * n).to_radians();
        let longitude = (mean_longitude
            + 1.915 * mean_anomaly.sin()
            + 0.020 * (2.0 * mean_anomaly).sin())
        .to_radians();
        let obliquity = (23.439 - 0.000_000_4 * n).to_radians();

        let ra = (obliquity.cos() * longitude.sin()).atan2(longitude.cos());
        let dec = (obliquity.sin() * longitude.sin()).asin();
        Ok(Equatorial {
            ra: ra.to_degrees().rem_euclid(360.0),
            dec: dec.to_degrees(),
        })
    }
}

/// Keplerian elements at J2000 and their rates per Julian century.
///
/// Order: semi-major axis (au), eccentricity, inclination, mean longitude,
/// longitude of perihelion, longitude of the ascending node.
struct Orbit {
    elements: [f64; 6],
    rates: [f64; 6],
}

// JPL "Approximate Positions of the Planets", table 1 (1800 AD - 2050 AD).
const EARTH_MOON_BARYCENTRE: Orbit = Orbit {
    elements: [1.000_002_61, 0.016_711_23, -0.000_015_31, 100.464_571_66, 102.937_681_93, 0.0],
    rates: [0.000_005_62, -0.000_043_92, -0.012_946_68, 35_999.372_449_81, 0.323_273_64, 0.0],
};

const PLUTO_ORBIT: Orbit = Orbit {
    elements: [39.482_116_75, 0.248_827_30, 17.140_012_06, 238.929_038_33, 224.068_916_29, 110.303_936_84],
    rates: [-0.000_315_96, 0.000_051_70, 0.000_048_18, 145.207_805_15, -0.040_629_42, -0.011_834_82],
};

const ORBIT_VALID_YEARS: std::ops::RangeInclusive<i32> = 1800..=2050;

/// Solves Kepler's equation `E - e sin E = M` for `E`, all in radians.
fn eccentric_anomaly(mean_anomaly: f64, eccentricity: f64) -> f64 {
    let mut e_anom = mean_anomaly + eccentricity * mean_anomaly.sin();
    for _ in 0..50 {
        let delta = (e_anom - eccentricity * e_anom.sin() - mean_anomaly)
            / (1.0 - eccentricity * e_anom.cos());
        e_anom -= delta;
        if delta.abs() < 1e-12 {
            break;
        }
    }
    e_anom
}

impl Orbit {
    /// Heliocentric J2000 ecliptic position in au, `t` in Julian centuries past J2000.
    fn heliocentric(&self, t: f64) -> [f64; 3] {
        let mut el = [0.0; 6];
        for (k, value) in el.iter_mut().enumerate() {
            *value = self.elements[k] + self.rates[k] * t;
        }
        let [a, e, incl, mean_lon, peri, node] = el;

        let arg_peri = (peri - node).to_radians();
        let mean_anomaly = normalize_longitude(mean_lon - peri).to_radians();
        let e_anom = eccentric_anomaly(mean_anomaly, e);

        // Position in the orbital plane, x towards perihelion.
        let xp = a * (e_anom.cos() - e);
        let yp = a * (1.0 - e * e).sqrt() * e_anom.sin();

        let (sin_w, cos_w) = arg_peri.sin_cos();
        let (sin_o, cos_o) = node.to_radians().sin_cos();
        let (sin_i, cos_i) = incl.to_radians().sin_cos();
        [
            (cos_w * cos_o - sin_w * sin_o * cos_i) * xp
                + (-sin_w * cos_o - cos_w * sin_o * cos_i) * yp,
            (cos_w * sin_o + sin_w * cos_o * cos_i) * xp
                + (-sin_w * sin_o + cos_w * cos_o * cos_i) * yp,
            (sin_w * sin_i) * xp + (cos_w * sin_i) * yp,
        ]
    }
}

/// Pluto, from Keplerian elements relative to the Earth-Moon barycentre.
///
/// Coordinates are J2000, without light-time or precession corrections.
#[derive(Debug, Clone, Copy, Default)]
pub struct Pluto;

impl CelestialBody for Pluto {
    fn name(&self) -> &str {
        "Pluto"
    }

    fn position_at(&self, time: DateTime<Utc>) -> Result<Equatorial, AppError> {
        if !ORBIT_VALID_YEARS.contains(&time.year()) {
            return Err(AppError::EphemerisOutOfRange(format!(
                "{} at {}",
                self.name(),
                time.to_rfc3339()
            )));
        }
        let t = (julian_date(time) - J2000) / 36_525.0;
        let pluto = PLUTO_ORBIT.heliocentric(t);
        let earth = EARTH_MOON_BARYCENTRE.heliocentric(t);
        let geocentric = [pluto[0] - earth[0], pluto[1] - earth[1], pluto[2] - earth[2]];
        Ok(ecliptic_to_equatorial(geocentric, OBLIQUITY_J2000))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use chrono::TimeZone;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    #[test]
    fn julian_date_of_known_instants() {
        assert_abs_diff_eq!(julian_date(utc(2000, 1, 1, 12, 0)), J2000, epsilon = 1e-9);
        assert_abs_diff_eq!(julian_date(utc(1970, 1, 1, 0, 0)), 2_440_587.5, epsilon = 1e-9);
    }

    #[test]
    fn gmst_at_j2000() {
        assert_abs_diff_eq!(gmst(utc(2000, 1, 1, 12, 0)), 280.460_618_37, epsilon = 1e-6);
    }

    #[test]
    fn normalize_longitude_wraps() {
        assert_abs_diff_eq!(normalize_longitude(190.0), -170.0, epsilon = 1e-12);
        assert_abs_diff_eq!(normalize_longitude(-190.0), 170.0, epsilon = 1e-12);
        assert_abs_diff_eq!(normalize_longitude(180.0), -180.0, epsilon = 1e-12);
        assert_abs_diff_eq!(normalize_longitude(45.0), 45.0, epsilon = 1e-12);
    }

    #[test]
    fn kepler_solution_satisfies_equation() {
        for &(m, e) in &[(0.3, 0.0167), (2.5, 0.2488), (-1.0, 0.5)] {
            let big_e = eccentric_anomaly(m, e);
            assert_abs_diff_eq!(big_e - e * big_e.sin(), m, epsilon = 1e-10);
        }
    }

    #[test]
    fn altitude_is_ninety_at_subpoint() {
        let position = Equatorial { ra: 123.0, dec: -17.5 };
        let sidereal = 45.0;
        let (lat, lon) = subpoint(&position, sidereal);
        assert_abs_diff_eq!(altitude(&position, lat, lon, sidereal), 90.0, epsilon = 1e-6);
        // Antipode sees it at the nadir.
        let anti_lon = normalize_longitude(lon + 180.0);
        assert_abs_diff_eq!(altitude(&position, -lat, anti_lon, sidereal), -90.0, epsilon = 1e-6);
    }

    #[test]
    fn sun_at_june_solstice_2024() {
        let sun = Sun.position_at(utc(2024, 6, 20, 20, 51)).unwrap();
        assert_abs_diff_eq!(sun.dec, 23.436, epsilon = 0.02);
        assert_abs_diff_eq!(sun.ra, 90.0, epsilon = 0.05);
    }

    #[test]
    fn sun_at_march_equinox_2024() {
        let sun = Sun.position_at(utc(2024, 3, 20, 3, 6)).unwrap();
        assert_abs_diff_eq!(sun.dec, 0.0, epsilon = 0.02);
    }

    #[test]
    fn subsolar_point_near_greenwich_at_noon_in_mid_april() {
        // The equation of time is close to zero around 15 April.
        let time = utc(2024, 4, 15, 12, 0);
        let (_, lon) = subpoint(&Sun.position_at(time).unwrap(), gmst(time));
        assert!(lon.abs() < 0.5, "subsolar longitude {lon}");
    }

    #[test]
    fn pluto_in_sagittarius_capricornus_border_2024() {
        let pluto = Pluto.position_at(utc(2024, 1, 1, 0, 0)).unwrap();
        assert!((295.0..310.0).contains(&pluto.ra), "ra {}", pluto.ra);
        assert!((-26.0..-20.0).contains(&pluto.dec), "dec {}", pluto.dec);
    }

    #[test]
    fn pluto_outside_element_range_is_an_error() {
        let err = Pluto.position_at(utc(2101, 1, 1, 0, 0)).unwrap_err();
        assert!(matches!(err, AppError::EphemerisOutOfRange(_)));
    }
}
