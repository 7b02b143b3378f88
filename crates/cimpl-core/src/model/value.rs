//! Values: the typed, cardinality-bounded slots of an element
//!
//! An element's unnamed primary slot and each of its named fields are all
//! [`Value`]s. The shape of a value is one of the [`ValueKind`] variants; the
//! cardinality, constraint list and provenance are common to every variant.

use super::{Cardinality, Constraint, ConstraintHistory, ConstraintKind, Identifier};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How a value relates to the value of the same identity in a base element
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Inheritance {
    /// Declared here, no counterpart in any base
    #[default]
    Original,
    /// Identical to the base's value
    Inherited,
    /// Present in a base, but redeclared or constrained here
    Overridden,
}

impl Inheritance {
    pub fn is_original(&self) -> bool {
        matches!(self, Inheritance::Original)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "valueType", rename_all = "camelCase")]
pub enum ValueKind {
    Identifiable {
        identifier: Identifier,
        #[serde(
            default,
            rename = "effectiveIdentifier",
            skip_serializing_if = "Option::is_none"
        )]
        effective_identifier: Option<Identifier>,
    },
    /// Reference to an element rather than an embedded instance
    Ref {
        identifier: Identifier,
        #[serde(
            default,
            rename = "effectiveIdentifier",
            skip_serializing_if = "Option::is_none"
        )]
        effective_identifier: Option<Identifier>,
    },
    /// Placeholder used when a descendant only constrains an inherited slot
    Incomplete {
        identifier: Identifier,
        #[serde(
            default,
            rename = "effectiveIdentifier",
            skip_serializing_if = "Option::is_none"
        )]
        effective_identifier: Option<Identifier>,
    },
    Choice {
        options: Vec<Value>,
    },
    Tbd {
        text: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Value {
    #[serde(flatten)]
    pub kind: ValueKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card: Option<Cardinality>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<Constraint>,
    #[serde(default, skip_serializing_if = "ConstraintHistory::is_empty")]
    pub constraint_history: ConstraintHistory,
    #[serde(default, skip_serializing_if = "Inheritance::is_original")]
    pub inheritance: Inheritance,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inherited_from: Option<Identifier>,
}

impl Value {
    pub fn new(kind: ValueKind) -> Self {
        Self {
            kind,
            card: None,
            constraints: Vec::new(),
            constraint_history: ConstraintHistory::default(),
            inheritance: Inheritance::Original,
            inherited_from: None,
        }
    }

    pub fn identifiable(identifier: Identifier) -> Self {
        Self::new(ValueKind::Identifiable {
            identifier,
            effective_identifier: None,
        })
    }

    pub fn reference(identifier: Identifier) -> Self {
        Self::new(ValueKind::Ref {
            identifier,
            effective_identifier: None,
        })
    }

    pub fn incomplete(identifier: Identifier) -> Self {
        Self::new(ValueKind::Incomplete {
            identifier,
            effective_identifier: None,
        })
    }

    pub fn choice(options: Vec<Value>) -> Self {
        Self::new(ValueKind::Choice { options })
    }

    pub fn tbd(text: impl Into<String>) -> Self {
        Self::new(ValueKind::Tbd { text: text.into() })
    }

    pub fn with_card(mut self, card: Cardinality) -> Self {
        self.card = Some(card);
        self
    }

    pub fn without_card(mut self) -> Self {
        self.card = None;
        self
    }

    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// Override the reported effective identifier (used for `_Value` retyping)
    pub fn with_effective_identifier(mut self, id: Identifier) -> Self {
        match &mut self.kind {
            ValueKind::Identifiable {
                effective_identifier,
                ..
            }
            | ValueKind::Ref {
                effective_identifier,
                ..
            }
            | ValueKind::Incomplete {
                effective_identifier,
                ..
            } => *effective_identifier = Some(id),
            ValueKind::Choice { .. } | ValueKind::Tbd { .. } => {}
        }
        self
    }

    pub fn add_constraint(&mut self, constraint: Constraint) {
        self.constraints.push(constraint);
    }

    /// Declared identifier; `None` for choices and TBDs
    pub fn identifier(&self) -> Option<&Identifier> {
        match &self.kind {
            ValueKind::Identifiable { identifier, .. }
            | ValueKind::Ref { identifier, .. }
            | ValueKind::Incomplete { identifier, .. } => Some(identifier),
            ValueKind::Choice { .. } | ValueKind::Tbd { .. } => None,
        }
    }

    /// Identifier exporters report for this value
    ///
    /// Type narrowing is recorded as a constraint and does not change this;
    /// see [`Value::constrained_identifier`] for the narrowed type.
    pub fn effective_identifier(&self) -> Option<&Identifier> {
        match &self.kind {
            ValueKind::Identifiable {
                identifier,
                effective_identifier,
            }
            | ValueKind::Ref {
                identifier,
                effective_identifier,
            }
            | ValueKind::Incomplete {
                identifier,
                effective_identifier,
            } => Some(effective_identifier.as_ref().unwrap_or(identifier)),
            ValueKind::Choice { .. } | ValueKind::Tbd { .. } => None,
        }
    }

    /// The narrowest type known for this value: its own type constraint if
    /// any, else the effective identifier
    pub fn constrained_identifier(&self) -> Option<&Identifier> {
        self.own_type_constraint()
            .or_else(|| self.effective_identifier())
    }

    fn own_type_constraint(&self) -> Option<&Identifier> {
        self.constraints
            .iter()
            .filter(|c| c.is_own() && !c.on_value)
            .find_map(|c| match &c.kind {
                ConstraintKind::Type { is_a } => Some(is_a),
                _ => None,
            })
    }

    /// Every identifier this value can be matched by: declared, effective,
    /// and the targets of its own type and includes-type constraints
    pub fn possible_identifiers(&self) -> Vec<&Identifier> {
        let own_types = self
            .constraints
            .iter()
            .filter(|c| c.is_own())
            .filter_map(|c| c.is_a());
        let mut ids: Vec<&Identifier> = Vec::new();
        for id in self
            .identifier()
            .into_iter()
            .chain(self.effective_identifier())
            .chain(own_types)
        {
            if !ids.contains(&id) {
                ids.push(id);
            }
        }
        ids
    }

    /// Cardinality after this value's own card constraint is applied
    pub fn effective_card(&self) -> Option<&Cardinality> {
        self.constraints
            .iter()
            .filter(|c| c.is_own() && !c.on_value)
            .find_map(|c| match &c.kind {
                ConstraintKind::Card { card } => Some(card),
                _ => None,
            })
            .or(self.card.as_ref())
    }

    pub fn options(&self) -> Option<&[Value]> {
        match &self.kind {
            ValueKind::Choice { options } => Some(options),
            _ => None,
        }
    }

    pub fn options_mut(&mut self) -> Option<&mut Vec<Value>> {
        match &mut self.kind {
            ValueKind::Choice { options } => Some(options),
            _ => None,
        }
    }

    /// Options of a choice with nested choices flattened
    pub fn aggregate_options(&self) -> Vec<&Value> {
        let mut result = Vec::new();
        if let Some(options) = self.options() {
            for option in options {
                if option.is_choice() {
                    result.extend(option.aggregate_options());
                } else {
                    result.push(option);
                }
            }
        }
        result
    }

    pub fn tbd_text(&self) -> Option<&str> {
        match &self.kind {
            ValueKind::Tbd { text } => Some(text),
            _ => None,
        }
    }

    pub fn set_tbd_text(&mut self, new_text: &str) {
        if let ValueKind::Tbd { text } = &mut self.kind {
            *text = new_text.to_string();
        }
    }

    pub fn is_choice(&self) -> bool {
        matches!(self.kind, ValueKind::Choice { .. })
    }

    pub fn is_tbd(&self) -> bool {
        matches!(self.kind, ValueKind::Tbd { .. })
    }

    pub fn is_ref(&self) -> bool {
        matches!(self.kind, ValueKind::Ref { .. })
    }

    pub fn is_incomplete(&self) -> bool {
        matches!(self.kind, ValueKind::Incomplete { .. })
    }

    /// Identifiable, reference and incomplete values all carry an identifier
    pub fn is_identifiable(&self) -> bool {
        self.identifier().is_some()
    }

    /// Same variant, ignoring contents
    pub fn same_variant(&self, other: &Value) -> bool {
        std::mem::discriminant(&self.kind) == std::mem::discriminant(&other.kind)
    }

    pub fn variant_name(&self) -> &'static str {
        match self.kind {
            ValueKind::Identifiable { .. } => "IdentifiableValue",
            ValueKind::Ref { .. } => "RefValue",
            ValueKind::Incomplete { .. } => "IncompleteValue",
            ValueKind::Choice { .. } => "ChoiceValue",
            ValueKind::Tbd { .. } => "TBD",
        }
    }

    /// Structural equality ignoring provenance (inheritance tags, modifiers,
    /// histories)
    pub fn same_definition(&self, other: &Value) -> bool {
        let kinds_match = match (&self.kind, &other.kind) {
            (ValueKind::Choice { options: a }, ValueKind::Choice { options: b }) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.same_definition(y))
            }
            (a, b) => a == b,
        };
        kinds_match
            && self.card == other.card
            && self.constraints.len() == other.constraints.len()
            && self
                .constraints
                .iter()
                .zip(&other.constraints)
                .all(|(a, b)| a.same_as(b))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ValueKind::Identifiable { identifier, .. } | ValueKind::Incomplete { identifier, .. } => {
                write!(f, "{identifier}")
            }
            ValueKind::Ref { identifier, .. } => write!(f, "ref({identifier})"),
            ValueKind::Choice { options } => {
                let rendered: Vec<String> = options.iter().map(|o| o.to_string()).collect();
                write!(f, "({})", rendered.join(" or "))
            }
            ValueKind::Tbd { text } => write!(f, "TBD({text})"),
        }
    }
}
