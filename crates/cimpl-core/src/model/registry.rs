//! Registries holding a complete model
//!
//! The same [`Specifications`] container holds both the unexpanded input and
//! the expanded output. Identifiers are unique within each registry; adding a
//! second definition under an existing identifier fails.

use super::{CodeSystem, DataElement, ElementMapping, Identifier, ModelDocument, Namespace, ValueSet};
use crate::error::CimplError;
use crate::result::Result;
use indexmap::IndexMap;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct NamespaceRegistry {
    namespaces: IndexMap<String, Namespace>,
}

impl NamespaceRegistry {
    pub fn add(&mut self, namespace: Namespace) -> Result<()> {
        if self.namespaces.contains_key(&namespace.namespace) {
            return Err(CimplError::duplicate("namespace", &namespace.namespace));
        }
        self.namespaces.insert(namespace.namespace.clone(), namespace);
        Ok(())
    }

    pub fn find(&self, namespace: &str) -> Option<&Namespace> {
        self.namespaces.get(namespace)
    }

    pub fn all(&self) -> impl Iterator<Item = &Namespace> {
        self.namespaces.values()
    }
}

/// Element definitions by identifier, in insertion order
#[derive(Debug, Clone, Default)]
pub struct DataElementRegistry {
    elements: IndexMap<Identifier, Arc<DataElement>>,
}

impl DataElementRegistry {
    pub fn add(&mut self, element: DataElement) -> Result<()> {
        if self.elements.contains_key(&element.identifier) {
            return Err(CimplError::duplicate("data element", element.identifier.fqn()));
        }
        self.elements
            .insert(element.identifier.clone(), Arc::new(element));
        Ok(())
    }

    /// Replace an existing definition in place, keeping its position
    pub(crate) fn replace(&mut self, element: DataElement) {
        self.elements
            .insert(element.identifier.clone(), Arc::new(element));
    }

    pub fn find(&self, identifier: &Identifier) -> Option<&Arc<DataElement>> {
        self.elements.get(identifier)
    }

    pub fn contains(&self, identifier: &Identifier) -> bool {
        self.elements.contains_key(identifier)
    }

    pub fn all(&self) -> impl Iterator<Item = &Arc<DataElement>> {
        self.elements.values()
    }

    pub fn identifiers(&self) -> impl Iterator<Item = &Identifier> {
        self.elements.keys()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct ValueSetRegistry {
    by_url: IndexMap<String, ValueSet>,
}

impl ValueSetRegistry {
    pub fn add(&mut self, value_set: ValueSet) -> Result<()> {
        if self.by_url.contains_key(&value_set.url) {
            return Err(CimplError::duplicate("value set", &value_set.url));
        }
        self.by_url.insert(value_set.url.clone(), value_set);
        Ok(())
    }

    pub fn find_by_url(&self, url: &str) -> Option<&ValueSet> {
        self.by_url.get(url)
    }

    pub fn all(&self) -> impl Iterator<Item = &ValueSet> {
        self.by_url.values()
    }
}

#[derive(Debug, Clone, Default)]
pub struct CodeSystemRegistry {
    by_url: IndexMap<String, CodeSystem>,
}

impl CodeSystemRegistry {
    pub fn add(&mut self, code_system: CodeSystem) -> Result<()> {
        if self.by_url.contains_key(&code_system.url) {
            return Err(CimplError::duplicate("code system", &code_system.url));
        }
        self.by_url.insert(code_system.url.clone(), code_system);
        Ok(())
    }

    pub fn find_by_url(&self, url: &str) -> Option<&CodeSystem> {
        self.by_url.get(url)
    }

    pub fn all(&self) -> impl Iterator<Item = &CodeSystem> {
        self.by_url.values()
    }
}

/// Mappings keyed by (target specification, element identifier)
#[derive(Debug, Clone, Default)]
pub struct MappingRegistry {
    maps: IndexMap<(String, Identifier), ElementMapping>,
}

impl MappingRegistry {
    pub fn add(&mut self, mapping: ElementMapping) -> Result<()> {
        let key = (mapping.target_spec.clone(), mapping.identifier.clone());
        if self.maps.contains_key(&key) {
            return Err(CimplError::duplicate(
                "mapping",
                format!("{} ({})", mapping.identifier, mapping.target_spec),
            ));
        }
        self.maps.insert(key, mapping);
        Ok(())
    }

    pub(crate) fn replace(&mut self, mapping: ElementMapping) {
        let key = (mapping.target_spec.clone(), mapping.identifier.clone());
        self.maps.insert(key, mapping);
    }

    pub fn find(&self, target_spec: &str, identifier: &Identifier) -> Option<&ElementMapping> {
        self.maps
            .get(&(target_spec.to_string(), identifier.clone()))
    }

    /// Every target with at least one mapping, in first-seen order
    pub fn targets(&self) -> Vec<String> {
        let mut targets: Vec<String> = Vec::new();
        for (target, _) in self.maps.keys() {
            if !targets.contains(target) {
                targets.push(target.clone());
            }
        }
        targets
    }

    pub fn by_target<'a>(&'a self, target_spec: &'a str) -> impl Iterator<Item = &'a ElementMapping> {
        self.maps
            .values()
            .filter(move |m| m.target_spec == target_spec)
    }

    pub fn all(&self) -> impl Iterator<Item = &ElementMapping> {
        self.maps.values()
    }

    pub fn len(&self) -> usize {
        self.maps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.maps.is_empty()
    }
}

/// A complete model: namespaces, elements, terminology and mappings
#[derive(Debug, Clone, Default)]
pub struct Specifications {
    pub namespaces: NamespaceRegistry,
    pub data_elements: DataElementRegistry,
    pub value_sets: ValueSetRegistry,
    pub code_systems: CodeSystemRegistry,
    pub maps: MappingRegistry,
}

impl Specifications {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build registries from a document, rejecting duplicate identifiers
    pub fn from_document(document: ModelDocument) -> Result<Self> {
        let mut specs = Self::new();
        for namespace in document.namespaces {
            specs.namespaces.add(namespace)?;
        }
        for element in document.data_elements {
            specs.data_elements.add(element)?;
        }
        for value_set in document.value_sets {
            specs.value_sets.add(value_set)?;
        }
        for code_system in document.code_systems {
            specs.code_systems.add(code_system)?;
        }
        for mapping in document.mappings {
            specs.maps.add(mapping)?;
        }
        Ok(specs)
    }

    pub fn to_document(&self) -> ModelDocument {
        ModelDocument {
            namespaces: self.namespaces.all().cloned().collect(),
            data_elements: self
                .data_elements
                .all()
                .map(|e| DataElement::clone(e))
                .collect(),
            value_sets: self.value_sets.all().cloned().collect(),
            code_systems: self.code_systems.all().cloned().collect(),
            mappings: self.maps.all().cloned().collect(),
        }
    }
}
