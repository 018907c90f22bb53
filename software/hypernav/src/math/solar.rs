//! Approximate solar position from a GPS fix and UTC time, using the
//! fractional-year series for declination and the equation of time.
//! Good to a fraction of a degree, which is well below the tilt error budget.

use std::f64::consts::PI;

use chrono::{DateTime, Datelike, Timelike, Utc};

/// Sun position in degrees
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SolarPosition {
    /// Clockwise from true north, in [0, 360)
    pub azimuth: f64,

    /// From local vertical
    pub zenith: f64,
}

/// Solar position at `time` for a location in decimal degrees (east and north positive).
pub fn solar_position(time: DateTime<Utc>, latitude_deg: f64, longitude_deg: f64) -> SolarPosition {
    let days_in_year = if is_leap_year(time.year()) { 366.0 } else { 365.0 };
    let hour = time.hour() as f64
        + time.minute() as f64 / 60.0
        + (time.second() as f64 + time.nanosecond() as f64 * 1e-9) / 3600.0;

    // Fractional year, radians
    let gamma = 2.0 * PI / days_in_year * (time.ordinal0() as f64 + (hour - 12.0) / 24.0);

    let eqtime_min = 229.18
        * (0.000075 + 0.001868 * gamma.cos()
            - 0.032077 * gamma.sin()
            - 0.014615 * (2.0 * gamma).cos()
            - 0.040849 * (2.0 * gamma).sin());

    let declination = 0.006918 - 0.399912 * gamma.cos() + 0.070257 * gamma.sin()
        - 0.006758 * (2.0 * gamma).cos()
        + 0.000907 * (2.0 * gamma).sin()
        - 0.002697 * (3.0 * gamma).cos()
        + 0.00148 * (3.0 * gamma).sin();

    // True solar time in minutes, then hour angle
    let true_solar_min = hour * 60.0 + eqtime_min + 4.0 * longitude_deg;
    let hour_angle = (true_solar_min / 4.0 - 180.0).to_radians();

    let lat = latitude_deg.to_radians();
    let cos_zenith =
        lat.sin() * declination.sin() + lat.cos() * declination.cos() * hour_angle.cos();
    let zenith = cos_zenith.clamp(-1.0, 1.0).acos();

    let azimuth = hour_angle
        .sin()
        .atan2(hour_angle.cos() * lat.sin() - declination.tan() * lat.cos())
        .to_degrees()
        + 180.0;

    SolarPosition {
        azimuth: azimuth.rem_euclid(360.0),
        zenith: zenith.to_degrees(),
    }
}

/// Solar azimuth in degrees clockwise from north
pub fn solar_azimuth(time: DateTime<Utc>, latitude_deg: f64, longitude_deg: f64) -> f64 {
    solar_position(time, latitude_deg, longitude_deg).azimuth
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn equinox(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 20, hour, 0, 0).unwrap()
    }

    #[test]
    fn noon_sun_is_south_in_the_north() {
        let pos = solar_position(equinox(12), 45.0, 0.0);
        assert!((pos.azimuth - 180.0).abs() < 5.0, "{pos:?}");
        assert!((pos.zenith - 45.0).abs() < 2.0, "{pos:?}");
    }

    #[test]
    fn noon_sun_is_north_in_the_south() {
        let az = solar_azimuth(equinox(12), -30.0, 0.0);
        assert!(az < 5.0 || az > 355.0, "{az}");
    }

    #[test]
    fn morning_sun_is_east() {
        let az = solar_azimuth(equinox(7), 20.0, 0.0);
        assert!(az > 70.0 && az < 110.0, "{az}");
    }

    #[test]
    fn longitude_shifts_local_noon() {
        // 10:00 UTC at 30E is local solar noon, give or take the equation of time
        let az = solar_azimuth(equinox(10), 45.0, 30.0);
        assert!((az - 180.0).abs() < 5.0, "{az}");
    }
}
