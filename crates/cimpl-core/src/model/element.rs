use super::{Concept, Identifier, Value};
use serde::{Deserialize, Serialize};

fn is_false(b: &bool) -> bool {
    !*b
}

/// A named, inheritable element definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataElement {
    pub identifier: Identifier,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub based_on: Vec<Identifier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub concepts: Vec<Concept>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_entry: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_abstract: bool,
    /// Transitive ancestor chain, filled in during expansion
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub hierarchy: Vec<Identifier>,
}

impl DataElement {
    pub fn new(identifier: Identifier) -> Self {
        Self {
            identifier,
            based_on: Vec::new(),
            value: None,
            fields: Vec::new(),
            concepts: Vec::new(),
            description: None,
            is_entry: false,
            is_abstract: false,
            hierarchy: Vec::new(),
        }
    }

    pub fn with_based_on(mut self, base: Identifier) -> Self {
        self.based_on.push(base);
        self
    }

    pub fn with_value(mut self, value: Value) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_field(mut self, field: Value) -> Self {
        self.fields.push(field);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn entry(mut self) -> Self {
        self.is_entry = true;
        self
    }

    pub fn abstract_element(mut self) -> Self {
        self.is_abstract = true;
        self
    }

    /// Bases that name real elements (TBD placeholders excluded)
    pub fn concrete_bases(&self) -> impl Iterator<Item = &Identifier> {
        self.based_on.iter().filter(|id| !id.is_tbd())
    }

    /// The value followed by every field
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.value.iter().chain(self.fields.iter())
    }

    /// Field whose declared identifier equals `identifier`
    pub fn field(&self, identifier: &Identifier) -> Option<&Value> {
        self.fields
            .iter()
            .find(|f| f.identifier() == Some(identifier))
    }
}
