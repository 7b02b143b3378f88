//! Error types for model expansion
//!
//! Two families live here:
//!
//! - [`ExpansionError`]: conditions found while expanding the model. They are
//!   never returned through `Result`; the engine reports them as
//!   [`Diagnostic`](crate::diagnostics::Diagnostic)s and recovers locally.
//! - [`CimplError`]: failures of the surrounding operations (loading
//!   configuration or a model document, building a registry).

use crate::diagnostics::Severity;
use crate::model::{Cardinality, Concept, ConstraintTag, Identifier};
use std::path::PathBuf;
use thiserror::Error;

/// Error type for fallible operations around the engine
#[derive(Debug, Error)]
pub enum CimplError {
    /// Configuration loading or validation errors
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// Model document could not be read or written
    #[error("Model document error: {message}")]
    DocumentError { message: String },

    /// The same identifier was registered twice
    #[error("Duplicate {kind} definition: {identifier}")]
    DuplicateIdentifier {
        kind: &'static str,
        identifier: String,
    },

    /// File system I/O errors
    #[error("IO error for path '{path}': {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Error kind enumeration for categorizing errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    Document,
    Registry,
    Io,
}

impl CimplError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CimplError::ConfigError { .. } => ErrorKind::Config,
            CimplError::DocumentError { .. } => ErrorKind::Document,
            CimplError::DuplicateIdentifier { .. } => ErrorKind::Registry,
            CimplError::IoError { .. } => ErrorKind::Io,
        }
    }

    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    pub fn document_error(message: impl Into<String>) -> Self {
        Self::DocumentError {
            message: message.into(),
        }
    }

    pub fn duplicate(kind: &'static str, identifier: impl Into<String>) -> Self {
        Self::DuplicateIdentifier {
            kind,
            identifier: identifier.into(),
        }
    }

    pub fn io_error(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::IoError {
            path: path.into(),
            source,
        }
    }
}

impl From<serde_json::Error> for CimplError {
    fn from(err: serde_json::Error) -> Self {
        CimplError::document_error(err.to_string())
    }
}

/// Why an inherited value could not be overridden
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideConflict {
    /// The two values are different kinds of value
    VariantMismatch,
    /// The new value is not one of the inherited choice's options
    NotAnOption,
    /// Identifiers differ and are not related by inheritance
    UnrelatedIdentifier,
    /// A choice cannot override this kind of value
    ChoiceOverUnsupported,
    /// The new choice introduces options the inherited one lacks
    IncompatibleOptions,
}

/// Which check rejected a type narrowing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeCheck {
    ChoiceOption,
    Type,
    IncludesType,
}

/// Conditions reported while expanding elements and mappings
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExpansionError {
    #[error("Reference to non-existing base: {base}")]
    UnresolvedBase { base: Identifier },

    #[error("Could not find based on element {base} for child element {child}")]
    MissingExpandedBase { base: Identifier, child: Identifier },

    #[error("Circular inheritance: {cycle}")]
    CircularInheritance { cycle: String },

    #[error("No cardinality found for {}", cardinality_subject(.value, .element))]
    MissingCardinality {
        value: String,
        element: Option<String>,
    },

    #[error("Cannot override {old} with {new}")]
    IncompatibleOverride {
        old: String,
        new: String,
        conflict: OverrideConflict,
    },

    #[error("Cannot resolve target of {} constraint on {target}", tag_name(.constraint))]
    UnresolvableConstraintTarget {
        target: String,
        constraint: ConstraintTag,
        on_value: bool,
    },

    #[error("Cannot constrain cardinality of {target} from {from} to {to}")]
    CardinalityWidened {
        target: String,
        from: Cardinality,
        to: Cardinality,
        prior: bool,
    },

    #[error("Cannot further constrain type of {target} from {from} to {to}")]
    CannotFurtherNarrow {
        target: String,
        from: Identifier,
        to: Identifier,
    },

    #[error("Cannot constrain type of {target} to {is_a}")]
    IncompatibleType {
        target: String,
        is_a: Identifier,
        check: TypeCheck,
    },

    #[error("Cannot constrain {} of {target} since it has no identifier", tag_name(.constraint))]
    NoIdentifierToConstrain {
        target: String,
        constraint: ConstraintTag,
    },

    #[error("Cardinality of {target} not found. Please explicitly define the cardinality.")]
    MissingIncludesCardinality { target: String },

    #[error("Cannot include cardinality on {target}: {card} doesn't fit within {allowed}")]
    IncludesCardinalityExceeded {
        target: String,
        card: Cardinality,
        allowed: Cardinality,
    },

    #[error(
        "Cannot constrain {} of {target} since neither it nor its value is a code, Coding, or CodeableConcept",
        tag_name(.constraint)
    )]
    NotCodeBearing {
        target: String,
        constraint: ConstraintTag,
    },

    #[error("Cannot constrain boolean value of {target} since neither it nor its value is a boolean")]
    NotBooleanTyped { target: String },

    #[error("Cannot constrain valueset of {target} since it is already constrained to a single code")]
    AlreadyFixedToCode { target: String },

    #[error("Cannot fix code of {target} to {code} since a previous constraint fixes it to {previous}")]
    ConflictingFixedCode {
        target: String,
        code: Concept,
        previous: Concept,
    },

    #[error(
        "Cannot constrain boolean value of {target} to {value} since a previous constraint constrains it to {previous}"
    )]
    ConflictingFixedBoolean {
        target: String,
        value: bool,
        previous: bool,
    },

    #[error("Unsupported constraint type: {constraint}")]
    UnsupportedConstraint { constraint: String },

    #[error("Cannot resolve element definition for {identifier}")]
    UnresolvedElement { identifier: Identifier },

    #[error("Found multiple matches for field {field}")]
    AmbiguousPathMatch { field: String },

    #[error("Cannot resolve data element definition from path: {path}")]
    UnresolvablePath { path: String, segment_found: bool },

    #[error("Cannot map Value since {}", unmappable_value(.value_type))]
    NoValueToMap { value_type: Option<String> },

    #[error("Cannot determine target item of mapping for {identifier}")]
    MissingTargetItem { identifier: Identifier },

    #[error(
        "Skipping mismatched targets: {identifier} maps to {target_item}, but based on {base} maps to {base_item}"
    )]
    MismatchedTargetItem {
        identifier: Identifier,
        target_item: String,
        base: Identifier,
        base_item: String,
    },

    #[error("Cannot resolve element definition for mapping of {identifier}")]
    MappingWithoutElement { identifier: Identifier },

    #[error("Could not find expanded definition of {entry}. Inheritance calculations will be incomplete.")]
    MissingEntryElement { entry: Identifier },

    #[error("Could not find expanded envelope definition. Inheritance calculations for {identifier} will be incomplete.")]
    EntryInheritanceIncomplete { identifier: Identifier },
}

fn tag_name(tag: &ConstraintTag) -> &'static str {
    tag.display_name()
}

fn cardinality_subject(value: &str, element: &Option<String>) -> String {
    match element {
        Some(element) => format!("field {value} in {element}"),
        None => format!("value: {value}"),
    }
}

fn unmappable_value(value_type: &Option<String>) -> String {
    match value_type {
        Some(kind) => format!("it is unsupported type: {kind}"),
        None => "element does not define a value".to_string(),
    }
}

impl ExpansionError {
    /// Stable numeric code of this condition
    pub fn code(&self) -> u32 {
        match self {
            ExpansionError::UnresolvedBase { .. } => 12002,
            ExpansionError::MissingExpandedBase { .. } => 13083,
            ExpansionError::CircularInheritance { .. } => 12041,
            ExpansionError::MissingCardinality { element, .. } => {
                if element.is_some() {
                    12004
                } else {
                    12003
                }
            }
            ExpansionError::IncompatibleOverride { conflict, .. } => match conflict {
                OverrideConflict::VariantMismatch => 12005,
                OverrideConflict::NotAnOption => 12006,
                OverrideConflict::UnrelatedIdentifier => 12007,
                OverrideConflict::ChoiceOverUnsupported => 12008,
                OverrideConflict::IncompatibleOptions => 13086,
            },
            ExpansionError::UnresolvableConstraintTarget {
                constraint,
                on_value,
                ..
            } => match (constraint, on_value) {
                (ConstraintTag::Card, _) => 13087,
                (ConstraintTag::Type, true) => 12039,
                (ConstraintTag::IncludesType, true) => 12040,
                (ConstraintTag::IncludesType, false) => 12038,
                _ => 13088,
            },
            ExpansionError::CardinalityWidened { prior, .. } => {
                if *prior {
                    12011
                } else {
                    12010
                }
            }
            ExpansionError::CannotFurtherNarrow { .. } => 12015,
            ExpansionError::IncompatibleType { check, .. } => match check {
                TypeCheck::ChoiceOption => 12012,
                TypeCheck::Type => 12014,
                TypeCheck::IncludesType => 12018,
            },
            ExpansionError::NoIdentifierToConstrain { constraint, .. } => match constraint {
                ConstraintTag::IncludesType => 12017,
                ConstraintTag::ValueSet => 12022,
                _ => 12013,
            },
            ExpansionError::MissingIncludesCardinality { .. } => 12020,
            ExpansionError::IncludesCardinalityExceeded { .. } => 12021,
            ExpansionError::NotCodeBearing { constraint, .. } => match constraint {
                ConstraintTag::Code => 12025,
                ConstraintTag::IncludesCode => 12026,
                _ => 12023,
            },
            ExpansionError::NotBooleanTyped { .. } => 12027,
            ExpansionError::AlreadyFixedToCode { .. } => 12024,
            ExpansionError::ConflictingFixedCode { .. } => 12042,
            ExpansionError::ConflictingFixedBoolean { .. } => 12028,
            ExpansionError::UnsupportedConstraint { .. } => 12009,
            ExpansionError::UnresolvedElement { .. } => 12029,
            ExpansionError::AmbiguousPathMatch { .. } => 12035,
            ExpansionError::UnresolvablePath { segment_found, .. } => {
                if *segment_found {
                    12031
                } else {
                    12032
                }
            }
            ExpansionError::NoValueToMap { value_type } => {
                if value_type.is_some() {
                    12034
                } else {
                    12033
                }
            }
            ExpansionError::MissingTargetItem { .. } => 13089,
            ExpansionError::MismatchedTargetItem { .. } => 2001,
            ExpansionError::MappingWithoutElement { .. } => 13085,
            ExpansionError::MissingEntryElement { .. } => 12036,
            ExpansionError::EntryInheritanceIncomplete { .. } => 13084,
        }
    }

    pub fn severity(&self) -> Severity {
        match self {
            ExpansionError::MismatchedTargetItem { .. } | ExpansionError::MissingEntryElement { .. } => {
                Severity::Warning
            }
            _ => Severity::Error,
        }
    }
}
