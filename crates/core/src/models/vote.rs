//! Vote model

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// A participant's estimate for a story.
///
/// Wire form: `{"Value": n}` for numbers, bare strings for the sentinels.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum Vote {
    #[serde(rename = "Value")]
    Numeric(f64),
    /// Needs a break
    Coffee,
    /// Cannot estimate
    Question,
    /// A vote exists but the server conceals its content
    Hidden,
}

impl Vote {
    pub fn numeric(&self) -> Option<f64> {
        match self {
            Vote::Numeric(value) => Some(*value),
            _ => None,
        }
    }

    pub fn is_hidden(&self) -> bool {
        matches!(self, Vote::Hidden)
    }
}

impl PartialEq for Vote {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            // NaN compares equal to itself so equality stays reflexive
            (Vote::Numeric(a), Vote::Numeric(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Vote::Coffee, Vote::Coffee) => true,
            (Vote::Question, Vote::Question) => true,
            (Vote::Hidden, Vote::Hidden) => true,
            _ => false,
        }
    }
}

impl Eq for Vote {}

impl fmt::Display for Vote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Vote::Numeric(value) => write!(f, "{}", value),
            Vote::Coffee => f.write_str("\u{2615}"),
            Vote::Question => f.write_str("?"),
            Vote::Hidden => f.write_str("*"),
        }
    }
}

/// Parses a vote a participant can cast. `Hidden` is server-only and rejected.
impl FromStr for Vote {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.to_ascii_lowercase().as_str() {
            "coffee" | "\u{2615}" => Ok(Vote::Coffee),
            "?" | "question" => Ok(Vote::Question),
            _ => s
                .parse::<f64>()
                .ok()
                .filter(|value| value.is_finite())
                .map(Vote::Numeric)
                .ok_or_else(|| Error::Parse(format!("not a vote: '{}'", s))),
        }
    }
}
