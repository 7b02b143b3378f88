//! Data model shared by the engine and its consumers
//!
//! # Overview
//!
//! - [`Identifier`] names elements, primitives, keywords and placeholders
//! - [`DataElement`] is an element definition with its [`Value`] and fields
//! - [`Constraint`] narrows or fixes a value, relative to a path
//! - [`ElementMapping`] maps an element onto a target specification
//! - [`Specifications`] holds a whole model, unexpanded or expanded
//!
//! # Example
//!
//! ```
//! use cimpl_core::model::{Cardinality, DataElement, Identifier, Value};
//!
//! let element = DataElement::new(Identifier::new("shr.test", "BodyWeight"))
//!     .with_based_on(Identifier::new("shr.test", "Observation"))
//!     .with_value(
//!         Value::identifiable(Identifier::new("shr.core", "Quantity"))
//!             .with_card(Cardinality::bounded(1, 1)),
//!     );
//! assert_eq!(element.based_on.len(), 1);
//! ```

mod cardinality;
mod constraint;
mod document;
mod element;
mod history;
mod identifier;
mod mapping;
mod registry;
mod terminology;
mod value;

pub use cardinality::{Cardinality, CardinalityChange};
pub use constraint::{BindingStrength, Constraint, ConstraintKind, ConstraintTag, ConstraintsFilter};
pub use document::ModelDocument;
pub use element::DataElement;
pub use history::{ConstraintHistory, ConstraintHistoryItem};
pub use identifier::{ENTRY_KEYWORD, Identifier, IdentifierParseError, VALUE_KEYWORD};
pub use mapping::{ElementMapping, MappingRule, MappingRuleKind};
pub use registry::{
    CodeSystemRegistry, DataElementRegistry, MappingRegistry, NamespaceRegistry, Specifications,
    ValueSetRegistry,
};
pub use terminology::{CodeSystem, Concept, Namespace, ValueSet, ValueSetRule};
pub use value::{Inheritance, Value, ValueKind};
