//! Target-specific mapping rule sets

use super::{Cardinality, Identifier, Inheritance};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum MappingRuleKind {
    /// Maps the element path `source_path` onto a target path
    Field {
        #[serde(rename = "sourcePath")]
        source_path: Vec<Identifier>,
        target: String,
    },
    FixedValue {
        target: String,
        value: String,
    },
    Cardinality {
        target: String,
        card: Cardinality,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingRule {
    #[serde(flatten)]
    pub kind: MappingRuleKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified_by: Option<Identifier>,
}

impl MappingRule {
    pub fn field(source_path: Vec<Identifier>, target: impl Into<String>) -> Self {
        Self::new(MappingRuleKind::Field {
            source_path,
            target: target.into(),
        })
    }

    pub fn fixed_value(target: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(MappingRuleKind::FixedValue {
            target: target.into(),
            value: value.into(),
        })
    }

    pub fn cardinality(target: impl Into<String>, card: Cardinality) -> Self {
        Self::new(MappingRuleKind::Cardinality {
            target: target.into(),
            card,
        })
    }

    fn new(kind: MappingRuleKind) -> Self {
        Self {
            kind,
            last_modified_by: None,
        }
    }

    pub fn source_path(&self) -> Option<&[Identifier]> {
        match &self.kind {
            MappingRuleKind::Field { source_path, .. } => Some(source_path),
            _ => None,
        }
    }

    pub fn source_path_mut(&mut self) -> Option<&mut Vec<Identifier>> {
        match &mut self.kind {
            MappingRuleKind::Field { source_path, .. } => Some(source_path),
            _ => None,
        }
    }

    pub fn target(&self) -> &str {
        match &self.kind {
            MappingRuleKind::Field { target, .. }
            | MappingRuleKind::FixedValue { target, .. }
            | MappingRuleKind::Cardinality { target, .. } => target,
        }
    }

    /// Whether a later `self` replaces an earlier `other`: field rules by
    /// source path, fixed-value and cardinality rules by target
    pub fn overrides(&self, other: &MappingRule) -> bool {
        match (&self.kind, &other.kind) {
            (MappingRuleKind::Field { source_path: a, .. }, MappingRuleKind::Field { source_path: b, .. }) => {
                a == b
            }
            (MappingRuleKind::FixedValue { target: a, .. }, MappingRuleKind::FixedValue { target: b, .. })
            | (
                MappingRuleKind::Cardinality { target: a, .. },
                MappingRuleKind::Cardinality { target: b, .. },
            ) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for MappingRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            MappingRuleKind::Field {
                source_path,
                target,
            } => {
                let path: Vec<String> = source_path.iter().map(Identifier::fqn).collect();
                write!(f, "{} -> {target}", path.join("."))
            }
            MappingRuleKind::FixedValue { target, value } => write!(f, "{target} = {value}"),
            MappingRuleKind::Cardinality { target, card } => write!(f, "{target} {card}"),
        }
    }
}

/// Rules mapping one element onto one item of a target specification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementMapping {
    pub identifier: Identifier,
    pub target_spec: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_item: Option<String>,
    #[serde(default)]
    pub rules: Vec<MappingRule>,
    #[serde(default, skip_serializing_if = "Inheritance::is_original")]
    pub inheritance: Inheritance,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inherited_from: Option<Identifier>,
}

impl ElementMapping {
    pub fn new(
        identifier: Identifier,
        target_spec: impl Into<String>,
        target_item: Option<String>,
    ) -> Self {
        Self {
            identifier,
            target_spec: target_spec.into(),
            target_item,
            rules: Vec::new(),
            inheritance: Inheritance::Original,
            inherited_from: None,
        }
    }

    pub fn with_rule(mut self, rule: MappingRule) -> Self {
        self.rules.push(rule);
        self
    }
}
