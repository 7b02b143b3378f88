//! Model expansion
//!
//! Turns an unexpanded model into one where every element carries its fully
//! merged structure, consolidated constraints and provenance.
//!
//! # Overview
//!
//! The [`Expander`] runs in stages:
//!
//! 1. namespaces, value sets and code systems are copied unchanged
//! 2. inheritance cycles are reported from the [`InheritanceGraph`]
//! 3. every element is structurally expanded, bases first and on demand
//! 4. a provenance pass, bases before descendants, stamps modifiers,
//!    cardinality histories, constraint histories and inheritance tags
//! 5. mappings are expanded for every target
//!
//! Nothing in these stages aborts: every problem is reported to the
//! [`DiagnosticSink`] and the best partial result is kept.
//!
//! # Example
//!
//! ```
//! use cimpl_core::config::ExpanderConfig;
//! use cimpl_core::expand::expand;
//! use cimpl_core::model::{Cardinality, DataElement, Identifier, Specifications, Value};
//!
//! let mut specs = Specifications::new();
//! specs.data_elements.add(
//!     DataElement::new(Identifier::new("shr.test", "Weight"))
//!         .with_value(Value::identifiable(Identifier::primitive("decimal"))
//!             .with_card(Cardinality::bounded(1, 1))),
//! ).unwrap();
//!
//! let expansion = expand(&specs, &ExpanderConfig::default());
//! assert!(!expansion.diagnostics.has_errors());
//! assert_eq!(expansion.specifications.data_elements.len(), 1);
//! ```

mod base_types;
mod consolidate;
mod hierarchy;
mod inheritance_graph;
mod mapping;
mod provenance;
mod target;

pub use inheritance_graph::{InheritanceGraph, format_cycle};
pub use target::PathMatch;

use crate::config::{ConfiguredTargets, ExpanderConfig, TargetCapabilities};
use crate::diagnostics::{Diagnostic, DiagnosticCollector, DiagnosticSink, Scope};
use crate::error::ExpansionError;
use crate::model::{DataElement, ElementMapping, Identifier, Specifications};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info};

/// Result of a whole-model expansion
#[derive(Debug)]
pub struct Expansion {
    pub specifications: Specifications,
    pub diagnostics: DiagnosticCollector,
}

/// Expand a whole model, collecting diagnostics
pub fn expand(specifications: &Specifications, config: &ExpanderConfig) -> Expansion {
    let mut diagnostics = DiagnosticCollector::new();
    let expanded = Expander::new(specifications, config.clone(), &mut diagnostics).expand();
    Expansion {
        specifications: expanded,
        diagnostics,
    }
}

/// Expansion engine over one unexpanded model
pub struct Expander<'a> {
    unexpanded: &'a Specifications,
    expanded: Specifications,
    config: ExpanderConfig,
    graph: InheritanceGraph,
    /// Elements whose structural expansion is on the call stack
    in_progress: HashSet<Identifier>,
    capabilities: HashMap<String, Box<dyn TargetCapabilities>>,
    sink: &'a mut dyn DiagnosticSink,
}

impl<'a> Expander<'a> {
    pub fn new(
        unexpanded: &'a Specifications,
        config: ExpanderConfig,
        sink: &'a mut dyn DiagnosticSink,
    ) -> Self {
        let mut expanded = Specifications::new();
        expanded.namespaces = unexpanded.namespaces.clone();
        expanded.value_sets = unexpanded.value_sets.clone();
        expanded.code_systems = unexpanded.code_systems.clone();

        let mut capabilities: HashMap<String, Box<dyn TargetCapabilities>> = HashMap::new();
        for (target, parents) in &config.targets {
            capabilities.insert(
                target.clone(),
                Box::new(ConfiguredTargets::new(parents.clone())),
            );
        }

        Self {
            unexpanded,
            expanded,
            graph: InheritanceGraph::from_registry(&unexpanded.data_elements),
            config,
            in_progress: HashSet::new(),
            capabilities,
            sink,
        }
    }

    /// Register the capabilities of a mapping target, replacing any
    /// configured ones
    pub fn with_capabilities(
        mut self,
        target_spec: impl Into<String>,
        capabilities: Box<dyn TargetCapabilities>,
    ) -> Self {
        self.capabilities.insert(target_spec.into(), capabilities);
        self
    }

    /// Run every stage and return the expanded model
    pub fn expand(mut self) -> Specifications {
        info!(
            "Expanding {} data elements",
            self.unexpanded.data_elements.len()
        );

        for cycle in self.graph.find_cycles() {
            let scope = cycle.first().map(Scope::element).unwrap_or_default();
            self.report(
                &scope,
                ExpansionError::CircularInheritance {
                    cycle: format_cycle(&cycle),
                },
            );
        }

        let identifiers: Vec<Identifier> =
            self.unexpanded.data_elements.identifiers().cloned().collect();
        for identifier in &identifiers {
            if !self.expanded.data_elements.contains(identifier) {
                self.expand_element(identifier);
            }
        }

        self.apply_provenance();

        for target in self.unexpanded.maps.targets() {
            debug!("Expanding mappings for target {}", target);
            let identifiers: Vec<Identifier> =
                self.expanded.data_elements.identifiers().cloned().collect();
            for identifier in &identifiers {
                if self.expanded.maps.find(&target, identifier).is_none() {
                    self.expand_mapping(&target, identifier);
                }
            }

            let orphans: Vec<Identifier> = self
                .unexpanded
                .maps
                .by_target(&target)
                .filter(|m| !self.expanded.data_elements.contains(&m.identifier))
                .map(|m| m.identifier.clone())
                .collect();
            for identifier in orphans {
                self.report(
                    &Scope::mapping(&identifier, &target),
                    ExpansionError::MappingWithoutElement {
                        identifier: identifier.clone(),
                    },
                );
            }
        }

        info!(
            "Expanded {} data elements and {} mappings",
            self.expanded.data_elements.len(),
            self.expanded.maps.len()
        );
        self.expanded
    }

    /// Structurally expanded element, expanding it on first request
    ///
    /// Provenance is applied to every element by [`Expander::expand`]; an
    /// element requested before that pass carries merged structure and
    /// consolidated constraints only.
    pub fn expand_element(&mut self, identifier: &Identifier) -> Option<Arc<DataElement>> {
        if let Some(expanded) = self.expanded.data_elements.find(identifier) {
            return Some(expanded.clone());
        }
        let unexpanded = self.unexpanded.data_elements.find(identifier)?.clone();
        Some(self.expand_definition(&unexpanded))
    }

    /// Expanded mapping of an element for one target, expanding on first
    /// request
    pub fn expand_mapping(
        &mut self,
        target_spec: &str,
        identifier: &Identifier,
    ) -> Option<ElementMapping> {
        if let Some(mapping) = self.expanded.maps.find(target_spec, identifier) {
            return Some(mapping.clone());
        }
        self.expand_mapping_definition(target_spec, identifier)
    }

    /// Element lookup used while resolving constraint targets and bases
    ///
    /// An element that inherits from something currently being expanded
    /// cannot be expanded yet; its unexpanded definition is returned and
    /// nothing is memoized.
    fn lookup(&mut self, identifier: &Identifier) -> Option<Arc<DataElement>> {
        if let Some(expanded) = self.expanded.data_elements.find(identifier) {
            return Some(expanded.clone());
        }
        let unexpanded = self.unexpanded.data_elements.find(identifier)?.clone();
        let blocked = self.in_progress.contains(identifier)
            || self
                .in_progress
                .iter()
                .any(|pending| self.graph.inherits_from(identifier, pending));
        if blocked {
            debug!("Using unexpanded definition of {} during re-entrant lookup", identifier);
            return Some(unexpanded);
        }
        Some(self.expand_definition(&unexpanded))
    }

    fn report(&mut self, scope: &Scope, error: ExpansionError) {
        self.sink.report(Diagnostic::from_error(&error, scope));
    }
}
