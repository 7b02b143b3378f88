//! Diagnostic output for the terminal

use crate::OutputFormat;
use anyhow::Result;
use cimpl_core::diagnostics::{Diagnostic, Severity};
use colored::*;

/// Error and warning counts of one run
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub errors: usize,
    pub warnings: usize,
}

impl Summary {
    fn of<'a>(diagnostics: impl Iterator<Item = &'a Diagnostic>) -> Self {
        let mut summary = Self::default();
        for diagnostic in diagnostics {
            match diagnostic.severity {
                Severity::Error => summary.errors += 1,
                Severity::Warning => summary.warnings += 1,
                Severity::Info => {}
            }
        }
        summary
    }

    fn render(&self) -> String {
        let errors = format!("{} errors", self.errors);
        let warnings = format!("{} warnings", self.warnings);
        let errors = if self.errors > 0 { errors.red().to_string() } else { errors };
        let warnings = if self.warnings > 0 {
            warnings.yellow().to_string()
        } else {
            warnings
        };
        format!("{errors}, {warnings}")
    }
}

fn severity_label(severity: Severity) -> ColoredString {
    let label = severity.to_string();
    match severity {
        Severity::Error => label.red().bold(),
        Severity::Warning => label.yellow().bold(),
        Severity::Info => label.blue().bold(),
    }
}

fn render_diagnostic(diagnostic: &Diagnostic) -> String {
    let mut line = format!(
        "{}[{:05}]: {}",
        severity_label(diagnostic.severity),
        diagnostic.code,
        diagnostic.message
    );
    if let Some(shr_id) = &diagnostic.shr_id {
        let mut context = format!("shrId: {shr_id}");
        if let Some(target_spec) = &diagnostic.target_spec {
            context.push_str(&format!(", targetSpec: {target_spec}"));
        }
        if let Some(target_item) = &diagnostic.target_item {
            context.push_str(&format!(", target: {target_item}"));
        }
        line.push_str(&format!(" {}", format!("({context})").dimmed()));
    }
    line
}

/// Print diagnostics to stderr and return the run's counts
///
/// Human output ends with one summary line per stage: elements, then
/// mappings (diagnostics carrying a target specification).
pub fn report(diagnostics: &[Diagnostic], format: OutputFormat) -> Result<Summary> {
    let summary = Summary::of(diagnostics.iter());
    match format {
        OutputFormat::Json => {
            eprintln!("{}", serde_json::to_string_pretty(diagnostics)?);
        }
        OutputFormat::Human => {
            for diagnostic in diagnostics {
                eprintln!("{}", render_diagnostic(diagnostic));
            }
            let elements = Summary::of(diagnostics.iter().filter(|d| d.target_spec.is_none()));
            let mappings = Summary::of(diagnostics.iter().filter(|d| d.target_spec.is_some()));
            eprintln!("{} {}", "Elements:".bold(), elements.render());
            eprintln!("{} {}", "Mappings:".bold(), mappings.render());
        }
    }
    Ok(summary)
}
