use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::model::zone::Zone;

/// Mean Earth radius used by the haversine formula.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeofenceError {
    #[error("invalid coordinate ({lat}, {lng})")]
    InvalidCoordinate { lat: f64, lng: f64 },

    #[error("branch {branch_id} has no geofence zone configured")]
    ZoneNotConfigured { branch_id: u64 },

    #[error("geofence zone of branch {branch_id} is misconfigured")]
    InvalidZone { branch_id: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Result<Self, GeofenceError> {
        let point = Self { lat, lng };
        if point.is_valid() {
            Ok(point)
        } else {
            Err(GeofenceError::InvalidCoordinate { lat, lng })
        }
    }

    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }

    /// Great-circle distance in meters.
    pub fn distance_to(&self, other: &GeoPoint) -> f64 {
        let (lat1, lat2) = (self.lat.to_radians(), other.lat.to_radians());
        let dlat = (other.lat - self.lat).to_radians();
        let dlng = (other.lng - self.lng).to_radians();

        let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
        EARTH_RADIUS_M * c
    }
}

#[derive(Debug, Clone, Copy, Serialize, ToSchema)]
pub struct GeofenceVerdict {
    #[schema(example = true)]
    pub inside: bool,
    #[schema(example = 42.7)]
    pub distance_m: f64,
    #[schema(example = 100.0)]
    pub radius_m: f64,
}

/// Decides whether `device` lies inside the branch zone. The circle boundary
/// counts as inside. A missing or broken zone is an error, never "inside".
pub fn verify(
    branch_id: u64,
    device: GeoPoint,
    zone: Option<&Zone>,
) -> Result<GeofenceVerdict, GeofenceError> {
    if !device.is_valid() {
        return Err(GeofenceError::InvalidCoordinate {
            lat: device.lat,
            lng: device.lng,
        });
    }

    let zone = zone.ok_or(GeofenceError::ZoneNotConfigured { branch_id })?;
    let center = GeoPoint {
        lat: zone.latitude,
        lng: zone.longitude,
    };
    if !center.is_valid() || !zone.radius_m.is_finite() || zone.radius_m <= 0.0 {
        return Err(GeofenceError::InvalidZone { branch_id });
    }

    let distance_m = device.distance_to(&center);
    Ok(GeofenceVerdict {
        inside: distance_m <= zone.radius_m,
        distance_m,
        radius_m: zone.radius_m,
    })
}
