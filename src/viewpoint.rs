//! Query parameter validation for viewpoint requests.
//!
//! Required keys (`lat`, `lon`, `alt`) must each hold a finite number. The
//! orientation keys (`hdg`, `pit`, `rol`) follow the *silent default* policy:
//! a missing, empty or non-numeric value is replaced by its default instead of
//! failing the request. No range clamping happens here; out-of-range
//! coordinates are passed through to the scene unchanged.

use std::collections::HashMap;

use crate::error::ValidationError;

/// Heading used when `hdg` is absent or unparsable (radians)
pub const DEFAULT_HEADING: f64 = 0.0;
/// Pitch used when `pit` is absent or unparsable (radians, looking down)
pub const DEFAULT_PITCH: f64 = -1.0;
/// Roll used when `rol` is absent or unparsable (radians)
pub const DEFAULT_ROLL: f64 = 0.0;

const REQUIRED_KEYS: [&str; 3] = ["lat", "lon", "alt"];

/// A camera position and orientation over the globe.
///
/// Every field is finite once a value leaves [`validate`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewpointRequest {
    /// Degrees
    pub latitude: f64,
    /// Degrees
    pub longitude: f64,
    /// Meters above the ellipsoid
    pub altitude: f64,
    /// Radians
    pub heading: f64,
    /// Radians
    pub pitch: f64,
    /// Radians
    pub roll: f64,
}

impl ViewpointRequest {
    /// Build a request at the given position using the default orientation.
    pub fn at(latitude: f64, longitude: f64, altitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            altitude,
            heading: DEFAULT_HEADING,
            pitch: DEFAULT_PITCH,
            roll: DEFAULT_ROLL,
        }
    }

    /// The six parameters in invocation order: lat, lon, alt, heading, pitch, roll.
    pub fn as_array(&self) -> [f64; 6] {
        [
            self.latitude,
            self.longitude,
            self.altitude,
            self.heading,
            self.pitch,
            self.roll,
        ]
    }
}

/// Parse raw query parameters into a [`ViewpointRequest`].
///
/// Each field is checked against its own key. Failing required fields are
/// all reported together, in `lat`, `lon`, `alt` order.
pub fn validate(params: &HashMap<String, String>) -> Result<ViewpointRequest, ValidationError> {
    let [latitude, longitude, altitude] = REQUIRED_KEYS.map(|key| parse_finite(params, key));

    let missing: Vec<&'static str> = REQUIRED_KEYS
        .iter()
        .zip([latitude, longitude, altitude])
        .filter(|(_, value)| value.is_none())
        .map(|(key, _)| *key)
        .collect();

    match (latitude, longitude, altitude) {
        (Some(latitude), Some(longitude), Some(altitude)) => Ok(ViewpointRequest {
            latitude,
            longitude,
            altitude,
            heading: or_default(parse_finite(params, "hdg"), DEFAULT_HEADING),
            pitch: or_default(parse_finite(params, "pit"), DEFAULT_PITCH),
            roll: or_default(parse_finite(params, "rol"), DEFAULT_ROLL),
        }),
        _ => Err(ValidationError::MissingOrInvalidRequired(missing)),
    }
}

/// Read `key` as a finite float. Empty text, NaN and infinities count as absent.
fn parse_finite(params: &HashMap<String, String>, key: &str) -> Option<f64> {
    params
        .get(key)
        .and_then(|raw| raw.trim().parse::<f64>().ok())
        .filter(|value| value.is_finite())
}

/// Silent default policy for optional orientation fields.
fn or_default(value: Option<f64>, default: f64) -> f64 {
    value.unwrap_or(default)
}
