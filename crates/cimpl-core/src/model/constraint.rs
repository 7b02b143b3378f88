//! Constraints layered onto values and fields
//!
//! A constraint applies to the value that owns it when `path` is empty, or to
//! the nested field reached by walking `path` from the owning value.

use super::{Cardinality, Concept, Identifier};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Binding strength of a value set constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BindingStrength {
    #[default]
    Required,
    Extensible,
    Preferred,
    Example,
}

/// The closed set of constraint kinds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ConstraintKind {
    Card {
        card: Cardinality,
    },
    /// Narrows the declared type to a subtype
    Type {
        #[serde(rename = "isA")]
        is_a: Identifier,
    },
    /// Requires `card` instances assignable to `is_a` without changing the type
    IncludesType {
        #[serde(rename = "isA")]
        is_a: Identifier,
        card: Cardinality,
    },
    ValueSet {
        #[serde(rename = "valueSet")]
        value_set_url: String,
        #[serde(default)]
        strength: BindingStrength,
    },
    /// Fixes a code-bearing value to exactly one code
    Code {
        code: Concept,
    },
    /// Requires a repeatable code-bearing value to include a code
    IncludesCode {
        code: Concept,
    },
    Boolean {
        value: bool,
    },
    /// A constraint kind this engine does not know how to consolidate
    #[serde(other)]
    Unsupported,
}

/// Discriminant of [`ConstraintKind`], used for filtering and grouping
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConstraintTag {
    Card,
    Type,
    IncludesType,
    ValueSet,
    Code,
    IncludesCode,
    Boolean,
    Unsupported,
}

impl ConstraintTag {
    pub fn display_name(&self) -> &'static str {
        match self {
            ConstraintTag::Card => "card",
            ConstraintTag::Type => "type",
            ConstraintTag::IncludesType => "includes type",
            ConstraintTag::ValueSet => "value set",
            ConstraintTag::Code => "code",
            ConstraintTag::IncludesCode => "includes code",
            ConstraintTag::Boolean => "boolean",
            ConstraintTag::Unsupported => "unsupported",
        }
    }
}

fn is_false(b: &bool) -> bool {
    !*b
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Constraint {
    #[serde(flatten)]
    pub kind: ConstraintKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<Identifier>,
    /// Targets the `.value` of whatever `path` resolves to
    #[serde(default, skip_serializing_if = "is_false")]
    pub on_value: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified_by: Option<Identifier>,
}

impl Constraint {
    pub fn new(kind: ConstraintKind) -> Self {
        Self {
            kind,
            path: Vec::new(),
            on_value: false,
            last_modified_by: None,
        }
    }

    pub fn card(card: Cardinality) -> Self {
        Self::new(ConstraintKind::Card { card })
    }

    pub fn type_of(is_a: Identifier) -> Self {
        Self::new(ConstraintKind::Type { is_a })
    }

    pub fn includes_type(is_a: Identifier, card: Cardinality) -> Self {
        Self::new(ConstraintKind::IncludesType { is_a, card })
    }

    pub fn value_set(url: impl Into<String>, strength: BindingStrength) -> Self {
        Self::new(ConstraintKind::ValueSet {
            value_set_url: url.into(),
            strength,
        })
    }

    pub fn code(code: Concept) -> Self {
        Self::new(ConstraintKind::Code { code })
    }

    pub fn includes_code(code: Concept) -> Self {
        Self::new(ConstraintKind::IncludesCode { code })
    }

    pub fn boolean(value: bool) -> Self {
        Self::new(ConstraintKind::Boolean { value })
    }

    pub fn with_path(mut self, path: Vec<Identifier>) -> Self {
        self.path = path;
        self
    }

    pub fn on_value(mut self) -> Self {
        self.on_value = true;
        self
    }

    pub fn modified_by(mut self, identifier: Identifier) -> Self {
        self.last_modified_by = Some(identifier);
        self
    }

    pub fn tag(&self) -> ConstraintTag {
        match &self.kind {
            ConstraintKind::Card { .. } => ConstraintTag::Card,
            ConstraintKind::Type { .. } => ConstraintTag::Type,
            ConstraintKind::IncludesType { .. } => ConstraintTag::IncludesType,
            ConstraintKind::ValueSet { .. } => ConstraintTag::ValueSet,
            ConstraintKind::Code { .. } => ConstraintTag::Code,
            ConstraintKind::IncludesCode { .. } => ConstraintTag::IncludesCode,
            ConstraintKind::Boolean { .. } => ConstraintTag::Boolean,
            ConstraintKind::Unsupported => ConstraintTag::Unsupported,
        }
    }

    /// Applies directly to the owning value
    pub fn is_own(&self) -> bool {
        self.path.is_empty()
    }

    /// Same constraint, ignoring provenance
    pub fn same_as(&self, other: &Constraint) -> bool {
        self.kind == other.kind && self.path == other.path && self.on_value == other.on_value
    }

    /// The type named by a `Type` or `IncludesType` constraint
    pub fn is_a(&self) -> Option<&Identifier> {
        match &self.kind {
            ConstraintKind::Type { is_a } | ConstraintKind::IncludesType { is_a, .. } => Some(is_a),
            _ => None,
        }
    }

    pub fn cardinality(&self) -> Option<&Cardinality> {
        match &self.kind {
            ConstraintKind::Card { card } | ConstraintKind::IncludesType { card, .. } => Some(card),
            _ => None,
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ConstraintKind::Card { card } => write!(f, "card {card}")?,
            ConstraintKind::Type { is_a } => write!(f, "type {is_a}")?,
            ConstraintKind::IncludesType { is_a, card } => write!(f, "includes {card} {is_a}")?,
            ConstraintKind::ValueSet {
                value_set_url,
                strength,
            } => write!(f, "from {value_set_url} ({strength:?})")?,
            ConstraintKind::Code { code } => write!(f, "is {code}")?,
            ConstraintKind::IncludesCode { code } => write!(f, "includes {code}")?,
            ConstraintKind::Boolean { value } => write!(f, "is {value}")?,
            ConstraintKind::Unsupported => write!(f, "unsupported")?,
        }
        if !self.path.is_empty() {
            let path: Vec<_> = self.path.iter().map(|p| p.name()).collect();
            write!(f, " on {}", path.join("."))?;
        }
        if self.on_value {
            write!(f, " (value)")?;
        }
        Ok(())
    }
}

/// Chainable view over a constraint list
#[derive(Debug, Clone)]
pub struct ConstraintsFilter<'a> {
    constraints: Vec<&'a Constraint>,
}

impl<'a> ConstraintsFilter<'a> {
    pub fn new(constraints: &'a [Constraint]) -> Self {
        Self {
            constraints: constraints.iter().collect(),
        }
    }

    /// Constraints whose path equals `path` exactly
    pub fn at_path(self, path: &[Identifier]) -> Self {
        Self {
            constraints: self
                .constraints
                .into_iter()
                .filter(|c| c.path == path)
                .collect(),
        }
    }

    /// Constraints on the owning value itself
    pub fn own(self) -> Self {
        self.at_path(&[])
    }

    pub fn of(self, tag: ConstraintTag) -> Self {
        Self {
            constraints: self
                .constraints
                .into_iter()
                .filter(|c| c.tag() == tag)
                .collect(),
        }
    }

    pub fn on_value(self, on_value: bool) -> Self {
        Self {
            constraints: self
                .constraints
                .into_iter()
                .filter(|c| c.on_value == on_value)
                .collect(),
        }
    }

    pub fn has_constraints(&self) -> bool {
        !self.constraints.is_empty()
    }

    pub fn first(&self) -> Option<&'a Constraint> {
        self.constraints.first().copied()
    }

    pub fn last(&self) -> Option<&'a Constraint> {
        self.constraints.last().copied()
    }

    pub fn into_vec(self) -> Vec<&'a Constraint> {
        self.constraints
    }
}
