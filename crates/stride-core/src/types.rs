//! Core type definitions with validation.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Mean Earth radius used for great-circle distances, in meters.
const EARTH_RADIUS_M: f64 = 6_371_000.0;

const METERS_PER_KILOMETER: f64 = 1_000.0;
const METERS_PER_MILE: f64 = 1_609.344;

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    /// Body weight must be a finite, positive number of kilograms.
    #[error("body weight must be a positive number of kilograms, got {value}")]
    InvalidBodyWeight { value: f64 },

    /// Unknown activity type string.
    #[error("invalid activity type: {value}")]
    InvalidActivityType { value: String },

    /// Unknown unit system string.
    #[error("invalid unit system: {value}")]
    InvalidUnitSystem { value: String },

    /// Unknown component string.
    #[error("invalid component: {value}")]
    InvalidComponent { value: String },
}

/// The kind of workout being recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    #[default]
    Walking,
    Running,
    Hiking,
    Cycling,
    Other,
}

impl ActivityType {
    /// All activity types, in display order.
    pub const ALL: [Self; 5] = [
        Self::Walking,
        Self::Running,
        Self::Hiking,
        Self::Cycling,
        Self::Other,
    ];

    /// Energy cost per kilogram of body weight per kilometer travelled.
    #[must_use]
    pub const fn met_multiplier(self) -> f64 {
        match self {
            Self::Walking => 0.75,
            Self::Running => 1.0,
            Self::Hiking => 0.9,
            Self::Cycling => 0.3,
            Self::Other => 0.6,
        }
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Walking => "walking",
            Self::Running => "running",
            Self::Hiking => "hiking",
            Self::Cycling => "cycling",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ActivityType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| ValidationError::InvalidActivityType {
                value: s.to_string(),
            })
    }
}

/// The user's preferred measurement system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitSystem {
    #[default]
    Metric,
    Imperial,
}

impl UnitSystem {
    /// The unit used for long distances (km or mi).
    #[must_use]
    pub const fn distance_unit(self) -> Unit {
        match self {
            Self::Metric => Unit::Kilometer,
            Self::Imperial => Unit::Mile,
        }
    }

    /// Converts meters into the preferred long-distance unit.
    #[must_use]
    pub fn distance(self, meters: f64) -> f64 {
        match self {
            Self::Metric => meters / METERS_PER_KILOMETER,
            Self::Imperial => meters / METERS_PER_MILE,
        }
    }

    /// Converts meters per second into km/h or mph.
    #[must_use]
    pub fn speed(self, meters_per_second: f64) -> f64 {
        self.distance(meters_per_second * 3_600.0)
    }

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Metric => "metric",
            Self::Imperial => "imperial",
        }
    }
}

impl fmt::Display for UnitSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UnitSystem {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "metric" => Ok(Self::Metric),
            "imperial" => Ok(Self::Imperial),
            _ => Err(ValidationError::InvalidUnitSystem {
                value: s.to_string(),
            }),
        }
    }
}

/// A producer component feeding the recording session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Component {
    Location,
    Altitude,
    Steps,
    HeartRate,
}

impl Component {
    pub const ALL: [Self; 4] = [Self::Location, Self::Altitude, Self::Steps, Self::HeartRate];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Location => "location",
            Self::Altitude => "altitude",
            Self::Steps => "steps",
            Self::HeartRate => "heart_rate",
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Component {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| ValidationError::InvalidComponent {
                value: s.to_string(),
            })
    }
}

/// A body weight in kilograms.
///
/// Always finite and strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct BodyWeight(f64);

impl BodyWeight {
    /// Creates a body weight after validation.
    pub fn new(kilograms: f64) -> Result<Self, ValidationError> {
        if !kilograms.is_finite() || kilograms <= 0.0 {
            return Err(ValidationError::InvalidBodyWeight { value: kilograms });
        }
        Ok(Self(kilograms))
    }

    #[must_use]
    pub const fn kilograms(self) -> f64 {
        self.0
    }
}

impl Default for BodyWeight {
    fn default() -> Self {
        Self(70.0)
    }
}

impl TryFrom<f64> for BodyWeight {
    type Error = ValidationError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<BodyWeight> for f64 {
    fn from(weight: BodyWeight) -> Self {
        weight.0
    }
}

/// A position fix reported by the location producer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationSample {
    pub timestamp: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub altitude: f64,
    /// Instantaneous speed in m/s. Negative when the producer has no estimate.
    #[serde(default = "unknown_speed")]
    pub speed: f64,
}

const fn unknown_speed() -> f64 {
    -1.0
}

impl LocationSample {
    /// Great-circle distance to another sample, in meters.
    #[must_use]
    pub fn distance_to(&self, other: &Self) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let d_lat = lat2 - lat1;
        let d_lon = (other.longitude - self.longitude).to_radians();

        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
    }
}

/// A barometric or GPS altitude reading, in meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AltitudeSample {
    pub timestamp: DateTime<Utc>,
    pub altitude: f64,
}

/// A heart-rate reading in beats per minute.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeartRateSample {
    pub timestamp: DateTime<Utc>,
    pub bpm: f64,
}

/// A unit taking part in a [`RelativeMeasurement`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Unit {
    Minute,
    Hour,
    Kilometer,
    Mile,
}

impl Unit {
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Minute => "min",
            Self::Hour => "h",
            Self::Kilometer => "km",
            Self::Mile => "mi",
        }
    }
}

/// A value expressed as one unit per another, such as minutes per kilometer.
///
/// Used for pace display only; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RelativeMeasurement {
    pub value: f64,
    pub numerator: Unit,
    pub denominator: Unit,
}

impl fmt::Display for RelativeMeasurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let per = format!("{}/{}", self.numerator.symbol(), self.denominator.symbol());
        if self.numerator == Unit::Minute {
            #[expect(
                clippy::cast_possible_truncation,
                clippy::cast_sign_loss,
                reason = "pace values are small positive numbers of seconds"
            )]
            let total_seconds = (self.value * 60.0).round().max(0.0) as u64;
            write!(f, "{}:{:02} {per}", total_seconds / 60, total_seconds % 60)
        } else {
            write!(f, "{:.2} {per}", self.value)
        }
    }
}
