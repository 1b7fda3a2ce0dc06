use chrono::{DateTime, Datelike, Timelike, Utc};

/// Solar position for a fixed observer, used to decide whether a capture was
/// taken in daylight.
#[derive(Debug, Clone, Copy)]
pub struct SunCalculator {
    latitude: f64,
    longitude: f64,
}

impl SunCalculator {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// True when the sun's centre is above the horizon, refraction included.
    pub fn is_daytime(&self, datetime: &DateTime<Utc>) -> bool {
        let (_, elevation) = self.get_position(datetime);
        Self::apparent_elevation(elevation) > 0.0
    }

    /// (azimuth, geometric elevation) in degrees. Azimuth is measured
    /// clockwise from north.
    pub fn get_position(&self, datetime: &DateTime<Utc>) -> (f64, f64) {
        let n = self.julian_day(datetime) - 2451545.0;

        let l = (280.460 + 0.9856474 * n).rem_euclid(360.0);
        let g = (357.528 + 0.9856003 * n).rem_euclid(360.0).to_radians();
        let lambda = (l + 1.915 * g.sin() + 0.020 * (2.0 * g).sin()).to_radians();
        let obliquity = (23.439 - 0.0000004 * n).to_radians();

        let right_ascension = (obliquity.cos() * lambda.sin()).atan2(lambda.cos());
        let declination = (obliquity.sin() * lambda.sin()).asin();

        let hour_angle = self.hour_angle(n, right_ascension.to_degrees());

        let lat_rad = self.latitude.to_radians();
        let hour_rad = hour_angle.to_radians();

        let elevation = (lat_rad.sin() * declination.sin()
            + lat_rad.cos() * declination.cos() * hour_rad.cos())
        .asin();

        let azimuth = (-hour_rad.sin() * declination.cos()).atan2(
            declination.sin() * lat_rad.cos()
                - declination.cos() * lat_rad.sin() * hour_rad.cos(),
        );

        (
            azimuth.to_degrees().rem_euclid(360.0),
            elevation.to_degrees(),
        )
    }

    /// Julian date including the time of day.
    fn julian_day(&self, datetime: &DateTime<Utc>) -> f64 {
        let a = (14 - datetime.month() as i32) / 12;
        let y = datetime.year() + 4800 - a;
        let m = datetime.month() as i32 + 12 * a - 3;

        let day_number = datetime.day() as i32 + (153 * m + 2) / 5 + 365 * y + y / 4 - y / 100
            + y / 400
            - 32045;

        let seconds = datetime.num_seconds_from_midnight() as f64
            + datetime.nanosecond() as f64 / 1e9;

        day_number as f64 + (seconds - 43200.0) / 86400.0
    }

    /// Local hour angle in degrees, from Greenwich mean sidereal time.
    fn hour_angle(&self, n: f64, right_ascension_deg: f64) -> f64 {
        let gmst = (280.46061837 + 360.98564736629 * n).rem_euclid(360.0);
        let h = (gmst + self.longitude - right_ascension_deg).rem_euclid(360.0);
        if h > 180.0 {
            h - 360.0
        } else {
            h
        }
    }

    /// Adds standard atmospheric refraction near the horizon.
    fn apparent_elevation(elevation: f64) -> f64 {
        if elevation < -2.0 {
            return elevation;
        }
        let refraction_arcmin = 1.02 / (elevation + 10.3 / (elevation + 5.11)).to_radians().tan();
        elevation + refraction_arcmin / 60.0
    }
}
