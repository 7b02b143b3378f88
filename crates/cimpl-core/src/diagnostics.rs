//! Diagnostics emitted during expansion
//!
//! The engine never aborts on a bad definition. Every condition becomes a
//! [`Diagnostic`] handed to a [`DiagnosticSink`], tagged with the context of
//! the element or mapping being expanded at the time.

use crate::error::ExpansionError;
use crate::model::Identifier;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity levels for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational messages
    Info,
    /// Warnings that should be addressed
    Warning,
    /// Errors that must be fixed
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        f.write_str(label)
    }
}

/// Fixed context attached to everything reported inside one expansion step
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scope {
    pub shr_id: Option<Identifier>,
    pub target_spec: Option<String>,
    pub target_item: Option<String>,
}

impl Scope {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn element(shr_id: &Identifier) -> Self {
        Self {
            shr_id: Some(shr_id.clone()),
            ..Self::default()
        }
    }

    pub fn mapping(shr_id: &Identifier, target_spec: &str) -> Self {
        Self {
            shr_id: Some(shr_id.clone()),
            target_spec: Some(target_spec.to_string()),
            target_item: None,
        }
    }

    pub fn with_target_item(&self, target_item: Option<&str>) -> Self {
        Self {
            target_item: target_item.map(str::to_string),
            ..self.clone()
        }
    }
}

/// One reported condition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub code: u32,
    pub severity: Severity,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shr_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_spec: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_item: Option<String>,
}

impl Diagnostic {
    pub fn from_error(error: &ExpansionError, scope: &Scope) -> Self {
        Self {
            code: error.code(),
            severity: error.severity(),
            message: error.to_string(),
            shr_id: scope.shr_id.as_ref().map(Identifier::fqn),
            target_spec: scope.target_spec.clone(),
            target_item: scope.target_item.clone(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{:05}]: {}", self.severity, self.code, self.message)?;
        if let Some(shr_id) = &self.shr_id {
            write!(f, " (shrId: {shr_id}")?;
            if let Some(target_spec) = &self.target_spec {
                write!(f, ", targetSpec: {target_spec}")?;
            }
            if let Some(target_item) = &self.target_item {
                write!(f, ", target: {target_item}")?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

/// Receiver of engine diagnostics
pub trait DiagnosticSink {
    fn report(&mut self, diagnostic: Diagnostic);
}

/// Default sink: keeps every diagnostic and mirrors it to `tracing`
#[derive(Debug, Default)]
pub struct DiagnosticCollector {
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }

    pub fn error_count(&self) -> usize {
        self.count(Severity::Error)
    }

    pub fn warning_count(&self) -> usize {
        self.count(Severity::Warning)
    }

    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    /// Diagnostics with the given numeric code
    pub fn with_code(&self, code: u32) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(move |d| d.code == code)
    }
}

impl DiagnosticSink for DiagnosticCollector {
    fn report(&mut self, diagnostic: Diagnostic) {
        let shr_id = diagnostic.shr_id.as_deref().unwrap_or("-");
        match diagnostic.severity {
            Severity::Error => tracing::error!(code = diagnostic.code, shr_id, "{}", diagnostic.message),
            Severity::Warning => tracing::warn!(code = diagnostic.code, shr_id, "{}", diagnostic.message),
            Severity::Info => tracing::info!(code = diagnostic.code, shr_id, "{}", diagnostic.message),
        }
        self.diagnostics.push(diagnostic);
    }
}
