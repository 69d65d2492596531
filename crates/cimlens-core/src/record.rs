//! Result records as returned by `GET /api/results`.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::scale::{self, ConfidenceDisplay, Rating, RatingToken};

/// Backend-assigned identifier. Opaque to the client.
///
/// The backend sends integers; strings are accepted too so the id never has
/// to be interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ResultId(String);

impl ResultId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResultId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ResultId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl<'de> Deserialize<'de> for ResultId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Int(i64),
            Str(String),
        }
        Ok(match Raw::deserialize(deserializer)? {
            Raw::Int(n) => Self(n.to_string()),
            Raw::Str(s) => Self(s),
        })
    }
}

/// Creation instant of a record.
///
/// `Unknown` covers missing or unparseable values and sorts after every
/// known instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Timestamp {
    At(DateTime<Utc>),
    Unknown,
}

impl Timestamp {
    /// Parse RFC 3339, or a naive ISO 8601 date-time taken as UTC.
    pub fn parse(s: &str) -> Self {
        let s = s.trim();
        if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
            return Timestamp::At(dt.with_timezone(&Utc));
        }
        for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
                return Timestamp::At(naive.and_utc());
            }
        }
        tracing::warn!(value = %s, "unparseable result timestamp");
        Timestamp::Unknown
    }

    pub fn instant(self) -> Option<DateTime<Utc>> {
        match self {
            Timestamp::At(dt) => Some(dt),
            Timestamp::Unknown => None,
        }
    }

    /// Most recent first; unknown last.
    pub fn cmp_recent_first(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Timestamp::At(a), Timestamp::At(b)) => b.cmp(a),
            (Timestamp::At(_), Timestamp::Unknown) => Ordering::Less,
            (Timestamp::Unknown, Timestamp::At(_)) => Ordering::Greater,
            (Timestamp::Unknown, Timestamp::Unknown) => Ordering::Equal,
        }
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Timestamp::At(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M UTC")),
            Timestamp::Unknown => f.write_str("unknown date"),
        }
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.map_or(Timestamp::Unknown, |s| Timestamp::parse(&s)))
    }
}

fn unknown_timestamp() -> Timestamp {
    Timestamp::Unknown
}

/// An out-of-range stored rating drops to unrated instead of failing the
/// whole list.
fn lenient_rating<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Rating>, D::Error> {
    let Some(raw) = Option::<f64>::deserialize(deserializer)? else {
        return Ok(None);
    };
    let rating = Rating::new(raw);
    if rating.is_none() {
        tracing::warn!(value = raw, "stored rating outside 1..=5, treating as unrated");
    }
    Ok(rating)
}

/// One uploaded document's stored analysis plus user-editable metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub id: ResultId,
    #[serde(default)]
    pub filename: String,
    #[serde(default = "unknown_timestamp")]
    pub timestamp: Timestamp,
    /// Analysis document: a JSON object, its serialized text, or null.
    #[serde(default, rename = "summary_json")]
    pub summary: Option<serde_json::Value>,
    #[serde(default)]
    pub preview_text: Option<String>,
    #[serde(default, rename = "confidence_score")]
    pub confidence: Option<f64>,
    #[serde(default, rename = "user_rating", deserialize_with = "lenient_rating")]
    pub rating: Option<Rating>,
}

impl AnalysisResult {
    pub fn rating_token(&self) -> Option<RatingToken> {
        self.rating.map(scale::rating_to_token)
    }

    pub fn confidence_display(&self) -> ConfidenceDisplay {
        scale::confidence_to_percent(self.confidence)
    }
}

/// Stable sort, most recent first. Ties keep arrival order.
pub fn sort_recent_first(results: &mut [AnalysisResult]) {
    results.sort_by(|a, b| a.timestamp.cmp_recent_first(&b.timestamp));
}
