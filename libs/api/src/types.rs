use std::str::FromStr;

use serde::{Deserialize, Deserializer};

use crate::error::ParseError;

// ════════════════════════════════════════════════════════════════
//  Precision
// ════════════════════════════════════════════════════════════════

/// Единица времени, в которой store интерпретирует timestamp записи.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Precision {
    #[default]
    Nanoseconds,
    Microseconds,
    Milliseconds,
    Seconds,
}

impl Precision {
    /// Wire representation used in the `precision` query parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            Precision::Nanoseconds => "ns",
            Precision::Microseconds => "us",
            Precision::Milliseconds => "ms",
            Precision::Seconds => "s",
        }
    }
}

impl std::fmt::Display for Precision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Precision {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ns" => Ok(Precision::Nanoseconds),
            "us" => Ok(Precision::Microseconds),
            "ms" => Ok(Precision::Milliseconds),
            "s" => Ok(Precision::Seconds),
            other => Err(ParseError::Precision(other.to_string())),
        }
    }
}

impl<'de> Deserialize<'de> for Precision {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// ════════════════════════════════════════════════════════════════
//  Id
// ════════════════════════════════════════════════════════════════

/// Number of hex characters in the textual form of an [`Id`].
pub const ID_LENGTH: usize = 16;

/// Идентификатор bucket'а или организации: 64-битное ненулевое значение,
/// в текстовом виде ровно 16 hex символов.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Id(u64);

impl Id {
    pub fn new(value: u64) -> Option<Self> {
        (value != 0).then_some(Self(value))
    }

    pub fn get(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for Id {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl FromStr for Id {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != ID_LENGTH {
            return Err(ParseError::IdLength { expected: ID_LENGTH, actual: s.len() });
        }
        if let Some(bad) = s.chars().find(|c| !c.is_ascii_hexdigit()) {
            return Err(ParseError::IdCharacter(bad));
        }
        let value = u64::from_str_radix(s, 16).map_err(|_| ParseError::IdLength {
            expected: ID_LENGTH,
            actual: s.len(),
        })?;
        Id::new(value).ok_or(ParseError::IdZero)
    }
}

impl<'de> Deserialize<'de> for Id {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
