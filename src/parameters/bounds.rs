//! Box constraints and their mapping to the optimizer's space.
//!
//! The Levenberg-Marquardt iteration works on unbounded values. Each bounded
//! parameter is carried there through a smooth invertible map (the one MINUIT
//! and lmfit use), so any internal value maps back inside `[min, max]`:
//!
//! | bounds       | external from internal `u`          |
//! |--------------|-------------------------------------|
//! | none         | `u`                                 |
//! | `[min, ∞)`   | `min - 1 + sqrt(u² + 1)`            |
//! | `(-∞, max]`  | `max + 1 - sqrt(u² + 1)`            |
//! | `[min, max]` | `min + (sin u + 1)(max - min) / 2`  |

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BoundsError {
    #[error("Invalid bounds: min ({min}) must not exceed max ({max})")]
    InvalidBounds { min: f64, max: f64 },

    #[error("Value {value} lies outside [{min}, {max}]")]
    OutOfRange { value: f64, min: f64, max: f64 },

    #[error("Non-finite value {0} cannot be mapped")]
    NonFinite(f64),
}

/// Which ends of the interval are finite.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Open,
    Lower,
    Upper,
    Both,
}

/// Closed interval a parameter must stay in. Either end may be infinite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

impl Default for Bounds {
    fn default() -> Self {
        Self::open()
    }
}

impl Bounds {
    /// ```
    /// use astrovoigt_rs::parameters::bounds::Bounds;
    ///
    /// let doppler = Bounds::new(0.5, 5.5).unwrap();
    /// assert!(doppler.contains(2.0));
    /// assert!(Bounds::new(5.5, 0.5).is_err());
    /// ```
    pub fn new(min: f64, max: f64) -> Result<Self, BoundsError> {
        if min.is_nan() || max.is_nan() || min > max {
            return Err(BoundsError::InvalidBounds { min, max });
        }
        Ok(Self { min, max })
    }

    pub fn open() -> Self {
        Self {
            min: f64::NEG_INFINITY,
            max: f64::INFINITY,
        }
    }

    /// `[min, ∞)`, as used for column densities.
    pub fn lower(min: f64) -> Self {
        Self { min, max: f64::INFINITY }
    }

    pub fn contains(&self, value: f64) -> bool {
        (self.min..=self.max).contains(&value)
    }

    pub fn clamp(&self, value: f64) -> f64 {
        value.max(self.min).min(self.max)
    }

    fn kind(&self) -> Kind {
        match (self.min.is_finite(), self.max.is_finite()) {
            (false, false) => Kind::Open,
            (true, false) => Kind::Lower,
            (false, true) => Kind::Upper,
            (true, true) => Kind::Both,
        }
    }

    /// Map an internal value to a physical one. The result is clamped, since
    /// rounding in the map can land one ulp past an end.
    pub fn to_external(&self, u: f64) -> f64 {
        let x = match self.kind() {
            Kind::Open => return u,
            Kind::Lower => self.min - 1.0 + u.hypot(1.0),
            Kind::Upper => self.max + 1.0 - u.hypot(1.0),
            Kind::Both => self.min + (u.sin() + 1.0) * 0.5 * (self.max - self.min),
        };
        self.clamp(x)
    }

    /// Map a physical value into the optimizer's space.
    pub fn to_internal(&self, x: f64) -> Result<f64, BoundsError> {
        if !x.is_finite() {
            return Err(BoundsError::NonFinite(x));
        }
        if !self.contains(x) {
            return Err(BoundsError::OutOfRange {
                value: x,
                min: self.min,
                max: self.max,
            });
        }

        Ok(match self.kind() {
            Kind::Open => x,
            Kind::Lower => ((x - self.min + 1.0).powi(2) - 1.0).sqrt(),
            Kind::Upper => ((self.max - x + 1.0).powi(2) - 1.0).sqrt(),
            Kind::Both => (2.0 * (x - self.min) / (self.max - self.min) - 1.0).clamp(-1.0, 1.0).asin(),
        })
    }
}

/// Serialized form. JSON has no infinity, so open ends are `null`.
#[derive(Serialize, Deserialize)]
struct Ends {
    #[serde(default)]
    min: Option<f64>,
    #[serde(default)]
    max: Option<f64>,
}

impl Serialize for Bounds {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Ends {
            min: self.min.is_finite().then_some(self.min),
            max: self.max.is_finite().then_some(self.max),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Bounds {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let ends = Ends::deserialize(deserializer)?;
        Bounds::new(
            ends.min.unwrap_or(f64::NEG_INFINITY),
            ends.max.unwrap_or(f64::INFINITY),
        )
        .map_err(serde::de::Error::custom)
    }
}
