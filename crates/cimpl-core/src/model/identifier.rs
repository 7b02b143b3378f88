//! Element identifiers
//!
//! Identifiers are value types: two identifiers are the same identifier when
//! their parts are equal. They serialize as their fully-qualified name:
//!
//! - `shr.core.Quantity` - a qualified element identifier
//! - `code` - a primitive type
//! - `_Value` - a keyword (or any unqualified name used in mapping paths)
//! - `TBD(free text)` - a to-be-determined placeholder

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Primitive type names recognised when parsing an unqualified FQN
const PRIMITIVES: &[&str] = &[
    "boolean",
    "integer",
    "string",
    "decimal",
    "uri",
    "base64Binary",
    "instant",
    "date",
    "dateTime",
    "time",
    "code",
    "oid",
    "id",
    "markdown",
    "unsignedInt",
    "positiveInt",
    "xhtml",
];

pub const VALUE_KEYWORD: &str = "_Value";
pub const ENTRY_KEYWORD: &str = "_Entry";

/// Identity of an element, primitive, keyword or placeholder
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Identifier {
    /// `namespace.Name`
    Qualified { namespace: String, name: String },
    /// Primitive type such as `code` or `boolean`
    Primitive(String),
    /// Name without namespace: keywords (`_Value`) and loose path segments
    Unqualified(String),
    /// To-be-determined placeholder carrying free text instead of identity
    Tbd(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid identifier: '{0}'")]
pub struct IdentifierParseError(String);

impl Identifier {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Qualified {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    pub fn primitive(name: impl Into<String>) -> Self {
        Self::Primitive(name.into())
    }

    pub fn unqualified(name: impl Into<String>) -> Self {
        Self::Unqualified(name.into())
    }

    pub fn tbd(text: impl Into<String>) -> Self {
        Self::Tbd(text.into())
    }

    /// The `_Value` keyword
    pub fn value_keyword() -> Self {
        Self::Unqualified(VALUE_KEYWORD.to_string())
    }

    /// The `_Entry` keyword
    pub fn entry_keyword() -> Self {
        Self::Unqualified(ENTRY_KEYWORD.to_string())
    }

    pub fn namespace(&self) -> Option<&str> {
        match self {
            Self::Qualified { namespace, .. } => Some(namespace),
            _ => None,
        }
    }

    /// Short name; for a TBD this is the placeholder text
    pub fn name(&self) -> &str {
        match self {
            Self::Qualified { name, .. } => name,
            Self::Primitive(name) | Self::Unqualified(name) | Self::Tbd(name) => name,
        }
    }

    /// Fully-qualified name
    pub fn fqn(&self) -> String {
        match self {
            Self::Qualified { namespace, name } => format!("{namespace}.{name}"),
            Self::Primitive(name) | Self::Unqualified(name) => name.clone(),
            Self::Tbd(text) => format!("TBD({text})"),
        }
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, Self::Primitive(_))
    }

    pub fn is_tbd(&self) -> bool {
        matches!(self, Self::Tbd(_))
    }

    pub fn is_value_keyword(&self) -> bool {
        matches!(self, Self::Unqualified(name) if name == VALUE_KEYWORD)
    }

    pub fn is_entry_keyword(&self) -> bool {
        matches!(self, Self::Unqualified(name) if name == ENTRY_KEYWORD)
    }

    /// Any `_`-prefixed keyword, including `_Value` and `_Entry`
    pub fn is_special_keyword(&self) -> bool {
        matches!(self, Self::Unqualified(name) if name.starts_with('_'))
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.fqn())
    }
}

impl FromStr for Identifier {
    type Err = IdentifierParseError;

    fn from_str(fqn: &str) -> Result<Self, Self::Err> {
        let fqn = fqn.trim();
        if fqn.is_empty() {
            return Err(IdentifierParseError(fqn.to_string()));
        }
        if let Some(text) = fqn.strip_prefix("TBD(").and_then(|t| t.strip_suffix(')')) {
            return Ok(Self::tbd(text));
        }
        if fqn.starts_with('_') {
            return Ok(Self::unqualified(fqn));
        }
        match fqn.rsplit_once('.') {
            Some((namespace, name)) if !namespace.is_empty() && !name.is_empty() => {
                Ok(Self::new(namespace, name))
            }
            Some(_) => Err(IdentifierParseError(fqn.to_string())),
            None if PRIMITIVES.contains(&fqn) => Ok(Self::primitive(fqn)),
            None => Ok(Self::unqualified(fqn)),
        }
    }
}

impl TryFrom<String> for Identifier {
    type Error = IdentifierParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Identifier> for String {
    fn from(id: Identifier) -> Self {
        id.fqn()
    }
}
