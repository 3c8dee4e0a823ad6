//! Time coordinate systems used by the sequencer.
//!
//! Three coordinate systems are in play at any moment:
//!
//! - [`ManifestTime`]: what the renderer currently sees, a position inside the
//!   loaded manifest window.
//! - [`LinearTime`]: the ad-free logical content timeline. Ads never add to it,
//!   which is what makes it usable as scheduling currency.
//! - [`SeekbarTime`]: the policy-filtered window the UI is allowed to show.

use serde::{Deserialize, Serialize};

/// Errors raised when constructing time values.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TimeError {
    #[error("Time value is not a number")]
    NotANumber,

    #[error("Window minimum must be finite (got {min})")]
    UnboundedMinimum { min: f64 },

    #[error("Window is inverted: min {min} > max {max}")]
    InvertedWindow { min: f64, max: f64 },

    #[error("Position {current} outside window [{min}, {max}]")]
    OutOfWindow { current: f64, min: f64, max: f64 },

    #[error("Linear time cannot be negative (got {0})")]
    NegativeLinearTime(f64),
}

/// Absolute position inside the currently loaded manifest window.
///
/// `max` may be `f64::INFINITY` for an unbounded live window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawManifestTime")]
pub struct ManifestTime {
    current: f64,
    min: f64,
    max: f64,
}

#[derive(Deserialize)]
struct RawManifestTime {
    #[serde(default)]
    current: Option<f64>,
    min: f64,
    #[serde(default)]
    max: Option<f64>,
}

impl TryFrom<RawManifestTime> for ManifestTime {
    type Error = TimeError;

    fn try_from(raw: RawManifestTime) -> Result<Self, Self::Error> {
        let max = raw.max.unwrap_or(f64::INFINITY);
        ManifestTime::new(raw.current.unwrap_or(raw.min), raw.min, max)
    }
}

impl ManifestTime {
    /// Create a manifest time, enforcing `min <= current <= max`.
    pub fn new(current: f64, min: f64, max: f64) -> Result<Self, TimeError> {
        if current.is_nan() || min.is_nan() || max.is_nan() {
            return Err(TimeError::NotANumber);
        }
        if !min.is_finite() {
            return Err(TimeError::UnboundedMinimum { min });
        }
        if min > max {
            return Err(TimeError::InvertedWindow { min, max });
        }
        if current < min || current > max {
            return Err(TimeError::OutOfWindow { current, min, max });
        }
        Ok(Self { current, min, max })
    }

    /// A window positioned at its start.
    pub fn window(min: f64, max: f64) -> Result<Self, TimeError> {
        Self::new(min, min, max)
    }

    /// A live window with no known end.
    pub fn unbounded(min: f64) -> Result<Self, TimeError> {
        Self::new(min, min, f64::INFINITY)
    }

    pub fn current(&self) -> f64 {
        self.current
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    /// Length of the window (infinite for unbounded windows).
    pub fn duration(&self) -> f64 {
        self.max - self.min
    }

    pub fn is_unbounded(&self) -> bool {
        self.max.is_infinite()
    }

    /// Same window, different position.
    pub fn with_current(&self, current: f64) -> Result<Self, TimeError> {
        Self::new(current, self.min, self.max)
    }
}

/// Position on the ad-free content timeline, in seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct LinearTime(f64);

impl LinearTime {
    pub const ZERO: LinearTime = LinearTime(0.0);

    pub fn new(seconds: f64) -> Result<Self, TimeError> {
        if seconds.is_nan() {
            return Err(TimeError::NotANumber);
        }
        if seconds < 0.0 {
            return Err(TimeError::NegativeLinearTime(seconds));
        }
        Ok(Self(seconds))
    }

    /// Build from a computed value, clamping negatives and NaN to zero.
    pub(crate) fn saturating(seconds: f64) -> Self {
        if seconds.is_nan() || seconds < 0.0 {
            Self(0.0)
        } else {
            Self(seconds)
        }
    }

    pub fn as_secs(&self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for LinearTime {
    type Error = TimeError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<LinearTime> for f64 {
    fn from(value: LinearTime) -> Self {
        value.0
    }
}

impl std::fmt::Display for LinearTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.3}s", self.0)
    }
}

/// The window the UI is permitted to show and seek within.
///
/// `current` is not required to lie inside the window: a seek request carries
/// the target as `current` together with the window it was chosen from.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSeekbarTime")]
pub struct SeekbarTime {
    current: f64,
    min: f64,
    max: f64,
}

#[derive(Deserialize)]
struct RawSeekbarTime {
    current: f64,
    min: f64,
    max: f64,
}

impl TryFrom<RawSeekbarTime> for SeekbarTime {
    type Error = TimeError;

    fn try_from(raw: RawSeekbarTime) -> Result<Self, Self::Error> {
        SeekbarTime::new(raw.current, raw.min, raw.max)
    }
}

impl SeekbarTime {
    pub fn new(current: f64, min: f64, max: f64) -> Result<Self, TimeError> {
        if current.is_nan() || min.is_nan() || max.is_nan() {
            return Err(TimeError::NotANumber);
        }
        if min > max {
            return Err(TimeError::InvertedWindow { min, max });
        }
        Ok(Self { current, min, max })
    }

    pub fn current(&self) -> f64 {
        self.current
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    /// Same window with a different position, e.g. a seek target.
    pub fn with_position(&self, current: f64) -> Self {
        Self {
            current,
            min: self.min,
            max: self.max,
        }
    }

    /// Whether `current` lies within the window, allowing `tolerance` slack.
    pub fn contains(&self, tolerance: f64) -> bool {
        self.current >= self.min - tolerance && self.current <= self.max + tolerance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_time_accepts_valid_window() {
        let t = ManifestTime::new(50.0, 0.0, 100.0).unwrap();
        assert_eq!(t.current(), 50.0);
        assert_eq!(t.min(), 0.0);
        assert_eq!(t.max(), 100.0);
        assert_eq!(t.duration(), 100.0);
    }

    #[test]
    fn manifest_time_rejects_position_outside_window() {
        assert_eq!(
            ManifestTime::new(101.0, 0.0, 100.0),
            Err(TimeError::OutOfWindow {
                current: 101.0,
                min: 0.0,
                max: 100.0
            })
        );
        assert!(ManifestTime::new(-1.0, 0.0, 100.0).is_err());
    }

    #[test]
    fn manifest_time_rejects_inverted_window_and_nan() {
        assert!(matches!(
            ManifestTime::new(5.0, 10.0, 0.0),
            Err(TimeError::InvertedWindow { .. })
        ));
        assert_eq!(
            ManifestTime::new(f64::NAN, 0.0, 1.0),
            Err(TimeError::NotANumber)
        );
        assert!(matches!(
            ManifestTime::new(0.0, f64::NEG_INFINITY, 1.0),
            Err(TimeError::UnboundedMinimum { .. })
        ));
    }

    #[test]
    fn unbounded_window_accepts_any_later_position() {
        let live = ManifestTime::unbounded(10.0).unwrap();
        assert!(live.is_unbounded());
        assert!(live.with_current(1.0e6).is_ok());
        assert!(live.with_current(9.0).is_err());
    }

    #[test]
    fn manifest_time_deserialization_validates() {
        let ok: ManifestTime = serde_json::from_str(r#"{"min":0.0,"max":15.0}"#).unwrap();
        assert_eq!(ok.current(), 0.0);
        assert_eq!(ok.max(), 15.0);

        let open: ManifestTime = serde_json::from_str(r#"{"min":3.0}"#).unwrap();
        assert!(open.is_unbounded());

        let bad = serde_json::from_str::<ManifestTime>(r#"{"current":20.0,"min":0.0,"max":15.0}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn linear_time_rejects_negative() {
        assert!(LinearTime::new(-0.5).is_err());
        assert!(LinearTime::new(f64::NAN).is_err());
        assert_eq!(LinearTime::new(3.0).unwrap().as_secs(), 3.0);
        assert_eq!(LinearTime::saturating(-2.0), LinearTime::ZERO);
    }

    #[test]
    fn linear_time_orders_by_value() {
        let a = LinearTime::new(1.0).unwrap();
        let b = LinearTime::new(2.0).unwrap();
        assert!(a < b);
        assert_eq!(format!("{}", b), "2.000s");
    }

    #[test]
    fn seekbar_contains_respects_tolerance() {
        let s = SeekbarTime::new(50.0, 0.0, 100.0).unwrap();
        assert!(s.contains(0.0));
        assert!(s.with_position(100.0005).contains(0.001));
        assert!(!s.with_position(101.0).contains(0.001));
        assert!(SeekbarTime::new(0.0, 5.0, 1.0).is_err());
    }

    #[test]
    fn seekbar_deserialization_validates() {
        let ok: SeekbarTime =
            serde_json::from_str(r#"{"current":120.0,"min":0.0,"max":100.0}"#).unwrap();
        assert_eq!(ok.current(), 120.0);
        assert!(!ok.contains(0.001));

        let inverted = serde_json::from_str::<SeekbarTime>(r#"{"current":5.0,"min":10.0,"max":1.0}"#);
        assert!(inverted.is_err());
    }
}
