//! Field validators shared by request bodies.

use std::borrow::Cow;

use chrono::NaiveTime;
use validator::ValidationError;

/// Largest accepted geofence radius.
pub const MAX_RADIUS_M: f64 = 50_000.0;

/// Longest tolerance window a schedule may grant.
pub const MAX_TOLERANCE_MINUTES: u32 = 240;

fn invalid(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(Cow::Borrowed(message))
}

pub fn validate_latitude(lat: f64) -> Result<(), ValidationError> {
    if (-90.0..=90.0).contains(&lat) {
        Ok(())
    } else {
        Err(invalid("latitude_range", "Latitude must be between -90 and 90"))
    }
}

pub fn validate_longitude(lng: f64) -> Result<(), ValidationError> {
    if (-180.0..=180.0).contains(&lng) {
        Ok(())
    } else {
        Err(invalid("longitude_range", "Longitude must be between -180 and 180"))
    }
}

/// Radius must be positive, finite and at most [`MAX_RADIUS_M`].
pub fn validate_radius(radius_m: f64) -> Result<(), ValidationError> {
    if radius_m.is_finite() && radius_m > 0.0 && radius_m <= MAX_RADIUS_M {
        Ok(())
    } else {
        Err(invalid("radius_range", "Radius must be greater than 0 and at most 50000 m"))
    }
}

/// ISO weekday, Monday = 1 through Sunday = 7.
pub fn validate_day_of_week(day: u8) -> Result<(), ValidationError> {
    if (1..=7).contains(&day) {
        Ok(())
    } else {
        Err(invalid("day_of_week_range", "Day of week must be between 1 and 7"))
    }
}

pub fn validate_tolerance(minutes: u32) -> Result<(), ValidationError> {
    if minutes <= MAX_TOLERANCE_MINUTES {
        Ok(())
    } else {
        Err(invalid("tolerance_range", "Tolerance must be between 0 and 240 minutes"))
    }
}

/// A shift must end after it starts on the same day.
pub fn validate_shift(entry: NaiveTime, exit: NaiveTime) -> Result<(), ValidationError> {
    if entry < exit {
        Ok(())
    } else {
        Err(invalid("shift_order", "Entry time must be before exit time"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coordinate_bounds_are_inclusive() {
        assert!(validate_latitude(-90.0).is_ok());
        assert!(validate_latitude(90.0).is_ok());
        assert!(validate_latitude(90.0001).is_err());
        assert!(validate_latitude(f64::NAN).is_err());
        assert!(validate_longitude(-180.0).is_ok());
        assert!(validate_longitude(180.5).is_err());
    }

    #[test]
    fn radius_must_be_positive_and_bounded() {
        assert!(validate_radius(100.0).is_ok());
        assert!(validate_radius(MAX_RADIUS_M).is_ok());
        assert!(validate_radius(0.0).is_err());
        assert!(validate_radius(-1.0).is_err());
        assert!(validate_radius(f64::INFINITY).is_err());
    }

    #[test]
    fn schedule_fields() {
        assert!(validate_day_of_week(1).is_ok());
        assert!(validate_day_of_week(7).is_ok());
        assert!(validate_day_of_week(0).is_err());
        assert!(validate_day_of_week(8).is_err());
        assert!(validate_tolerance(240).is_ok());
        assert!(validate_tolerance(241).is_err());

        let eight = NaiveTime::from_hms_opt(8, 0, 0).unwrap();
        let four = NaiveTime::from_hms_opt(16, 0, 0).unwrap();
        assert!(validate_shift(eight, four).is_ok());
        assert!(validate_shift(four, eight).is_err());
        assert!(validate_shift(eight, eight).is_err());
    }
}
