//! Conversions between the dashboard's scales and the backend's storage scales.
//!
//! Ratings are stored as numbers in [1, 5] but shown as a thumbs up/down token.
//! Confidence is stored as a fraction in [0, 1] but shown and edited as a
//! whole percentage.
//!
//! # Lossy rating projection
//!
//! Stored 3 and 4 display as `Up`, yet writing `Up` stores 5. Stored 2.9 is
//! still `Down`: the threshold applies to the raw value. There is no
//! neutral token: absence of a rating is the only neutral state.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

/// Percentage shown on the dashboard slider when no confidence is stored.
pub const DEFAULT_CONFIDENCE_PERCENT: u8 = 50;

/// A stored user rating, always within [1, 5].
///
/// The backend column is a float and accepts any value in range, so the raw
/// number is kept; only the thumbs projection collapses it.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct Rating(f64);

impl Rating {
    pub const MIN: Rating = Rating(1.0);
    pub const MAX: Rating = Rating(5.0);

    /// Returns `None` outside [1, 5] or for NaN.
    pub fn new(value: f64) -> Option<Self> {
        (1.0..=5.0).contains(&value).then_some(Self(value))
    }

    pub fn get(self) -> f64 {
        self.0
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl<'de> Deserialize<'de> for Rating {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = f64::deserialize(deserializer)?;
        Self::new(raw)
            .ok_or_else(|| serde::de::Error::custom(format!("rating {raw} outside 1..=5")))
    }
}

/// Two-valued dashboard representation of a rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RatingToken {
    Up,
    Down,
}

impl RatingToken {
    pub fn as_str(self) -> &'static str {
        match self {
            RatingToken::Up => "up",
            RatingToken::Down => "down",
        }
    }
}

impl fmt::Display for RatingToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("rating token must be \"up\" or \"down\", got {0:?}")]
pub struct ParseTokenError(String);

impl FromStr for RatingToken {
    type Err = ParseTokenError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" => Ok(RatingToken::Up),
            "down" => Ok(RatingToken::Down),
            _ => Err(ParseTokenError(s.to_string())),
        }
    }
}

/// Confidence as shown on the dashboard.
///
/// `Default` is a display placeholder only. It deliberately has no conversion
/// back to a stored fraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceDisplay {
    Stored(u8),
    Default,
}

impl ConfidenceDisplay {
    pub fn percent(self) -> u8 {
        match self {
            ConfidenceDisplay::Stored(p) => p,
            ConfidenceDisplay::Default => DEFAULT_CONFIDENCE_PERCENT,
        }
    }

    pub fn is_stored(self) -> bool {
        matches!(self, ConfidenceDisplay::Stored(_))
    }
}

impl fmt::Display for ConfidenceDisplay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}%", self.percent())
    }
}

/// Project a stored rating onto the thumbs scale: 3 and above is `Up`.
pub fn rating_to_token(stored: Rating) -> RatingToken {
    if stored.get() >= 3.0 {
        RatingToken::Up
    } else {
        RatingToken::Down
    }
}

/// Storage value written for a token: `Up` is 5, `Down` is 1.
pub fn token_to_rating(token: RatingToken) -> Rating {
    match token {
        RatingToken::Up => Rating::MAX,
        RatingToken::Down => Rating::MIN,
    }
}

/// Round a stored fraction to a whole percentage, or the display default.
///
/// Non-finite fractions are treated as absent; out-of-range ones are clamped.
pub fn confidence_to_percent(frac: Option<f64>) -> ConfidenceDisplay {
    match frac {
        Some(f) if f.is_finite() => {
            ConfidenceDisplay::Stored((f * 100.0).round().clamp(0.0, 100.0) as u8)
        }
        _ => ConfidenceDisplay::Default,
    }
}

/// Convert an edited percentage to the stored fraction, clamping to 0..=100.
pub fn percent_to_confidence(pct: i64) -> f64 {
    pct.clamp(0, 100) as f64 / 100.0
}
