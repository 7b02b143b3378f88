//! Codes, value sets and code systems
//!
//! The engine only needs enough terminology to infer the system of a fixed
//! code from a value set that includes that code.

use super::Identifier;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A code, optionally qualified by its system
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Concept {
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

impl Concept {
    pub fn new(system: Option<&str>, code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            system: system.map(str::to_string),
            display: None,
        }
    }

    pub fn with_display(mut self, display: impl Into<String>) -> Self {
        self.display = Some(display.into());
        self
    }

    /// Same code; systems must agree when both are known
    pub fn same_code(&self, other: &Concept) -> bool {
        self.code == other.code
            && match (&self.system, &other.system) {
                (Some(a), Some(b)) => a == b,
                _ => true,
            }
    }
}

impl fmt::Display for Concept {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.system {
            Some(system) => write!(f, "{system}#{}", self.code)?,
            None => write!(f, "#{}", self.code)?,
        }
        if let Some(display) = &self.display {
            write!(f, " \"{display}\"")?;
        }
        Ok(())
    }
}

/// A rule contributing codes to a value set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ValueSetRule {
    IncludesCode { code: Concept },
    IncludesDescendents { code: Concept },
    ExcludesDescendents { code: Concept },
    IncludesFromCodeSystem { system: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueSet {
    pub identifier: Identifier,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub rules: Vec<ValueSetRule>,
}

impl ValueSet {
    /// Codes explicitly included by `IncludesCode` rules
    pub fn included_codes(&self) -> impl Iterator<Item = &Concept> {
        self.rules.iter().filter_map(|rule| match rule {
            ValueSetRule::IncludesCode { code } => Some(code),
            _ => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeSystem {
    pub identifier: Identifier,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub codes: Vec<Concept>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Namespace {
    pub namespace: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}
