//! Cardinality bounds and narrowing history

use super::Identifier;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Occurrence bounds of a value: `min..max`, `max = None` meaning unbounded
///
/// Equality compares bounds only; the history is provenance, not identity.
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
pub struct Cardinality {
    pub min: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<u32>,
    /// Every ancestor narrowing of these bounds, oldest first
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<CardinalityChange>,
}

/// One entry of a cardinality history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardinalityChange {
    pub min: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<u32>,
    pub source: Identifier,
}

impl Cardinality {
    pub fn new(min: u32, max: Option<u32>) -> Self {
        Self {
            min,
            max,
            history: Vec::new(),
        }
    }

    pub fn bounded(min: u32, max: u32) -> Self {
        Self::new(min, Some(max))
    }

    pub fn unbounded(min: u32) -> Self {
        Self::new(min, None)
    }

    pub fn is_max_unbounded(&self) -> bool {
        self.max.is_none()
    }

    /// Whether these bounds lie inside `other`'s bounds
    pub fn fits_within(&self, other: &Cardinality) -> bool {
        if self.min < other.min {
            return false;
        }
        match (self.max, other.max) {
            (_, None) => true,
            (Some(max), Some(other_max)) => max <= other_max,
            (None, Some(_)) => false,
        }
    }

    /// Bounds only, without history
    pub fn bounds(&self) -> Cardinality {
        Cardinality::new(self.min, self.max)
    }

    /// Snapshot of these bounds attributed to `source`
    pub fn change_from(&self, source: Identifier) -> CardinalityChange {
        CardinalityChange {
            min: self.min,
            max: self.max,
            source,
        }
    }
}

impl PartialEq for Cardinality {
    fn eq(&self, other: &Self) -> bool {
        self.min == other.min && self.max == other.max
    }
}

impl fmt::Display for Cardinality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) => write!(f, "{}..{}", self.min, max),
            None => write!(f, "{}..*", self.min),
        }
    }
}

impl CardinalityChange {
    pub fn bounds(&self) -> Cardinality {
        Cardinality::new(self.min, self.max)
    }
}

impl fmt::Display for CardinalityChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.bounds(), self.source)
    }
}
