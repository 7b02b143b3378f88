//! Shared model builders for the integration tests

#![allow(dead_code)]

use cimpl_core::config::ExpanderConfig;
use cimpl_core::expand::{Expansion, expand};
use cimpl_core::model::{
    Cardinality, Concept, DataElement, ElementMapping, Identifier, Specifications, Value, ValueSet,
    ValueSetRule,
};
use std::sync::Arc;

pub const UNITS_VS: &str = "http://example.org/vs/units";

pub fn id(name: &str) -> Identifier {
    Identifier::new("shr.test", name)
}

pub fn core(name: &str) -> Identifier {
    Identifier::new("shr.core", name)
}

pub fn units(card: Cardinality) -> Value {
    Value::identifiable(id("Units")).with_card(card)
}

/// Builds an unexpanded model one definition at a time
#[derive(Default)]
pub struct ModelBuilder {
    specs: Specifications,
}

impl ModelBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty elements for the common types used across the tests
    pub fn with_core_types(self) -> Self {
        self.element(DataElement::new(id("Quantity")))
            .element(DataElement::new(id("WeightQuantity")).with_based_on(id("Quantity")))
            .element(DataElement::new(id("Length")).with_based_on(id("Quantity")))
            .element(DataElement::new(id("Range")))
            .element(DataElement::new(id("Ratio")))
            .element(
                DataElement::new(id("Units"))
                    .with_value(Value::identifiable(Identifier::primitive("code")).with_card(Cardinality::bounded(1, 1))),
            )
            .element(DataElement::new(core("CodeableConcept")))
            .element(DataElement::new(core("Coding")))
    }

    pub fn element(mut self, element: DataElement) -> Self {
        self.specs.data_elements.add(element).unwrap();
        self
    }

    pub fn mapping(mut self, mapping: ElementMapping) -> Self {
        self.specs.maps.add(mapping).unwrap();
        self
    }

    pub fn units_value_set(mut self) -> Self {
        self.specs
            .value_sets
            .add(ValueSet {
                identifier: id("UnitsVS"),
                url: UNITS_VS.to_string(),
                description: None,
                rules: vec![ValueSetRule::IncludesCode {
                    code: Concept::new(Some("http://unitsofmeasure.org"), "kg"),
                }],
            })
            .unwrap();
        self
    }

    pub fn build(self) -> Specifications {
        self.specs
    }

    pub fn expand(self) -> Expansion {
        self.expand_with(&ExpanderConfig::default())
    }

    pub fn expand_with(self, config: &ExpanderConfig) -> Expansion {
        expand(&self.specs, config)
    }
}

pub fn element<'a>(expansion: &'a Expansion, name: &str) -> &'a Arc<DataElement> {
    expansion
        .specifications
        .data_elements
        .find(&id(name))
        .unwrap_or_else(|| panic!("{name} was not expanded"))
}

pub fn field<'a>(element: &'a DataElement, name: &str) -> &'a Value {
    element
        .field(&id(name))
        .unwrap_or_else(|| panic!("{} has no field {name}", element.identifier))
}

pub fn codes(expansion: &Expansion) -> Vec<u32> {
    expansion
        .diagnostics
        .diagnostics()
        .iter()
        .map(|d| d.code)
        .collect()
}
