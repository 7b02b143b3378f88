//! End-to-end expansion of small element hierarchies

mod common;

use cimpl_core::diagnostics::Severity;
use cimpl_core::model::{
    BindingStrength, Cardinality, Concept, Constraint, ConstraintKind, ConstraintTag,
    ConstraintsFilter, DataElement, Identifier, Inheritance, Specifications, Value,
};
use common::{ModelBuilder, UNITS_VS, codes, core, element, field, id, units};

/// A declares Units 0..4, B narrows it to 0..2, C inherits B unchanged
fn card_chain() -> ModelBuilder {
    ModelBuilder::new()
        .with_core_types()
        .element(DataElement::new(id("A")).with_field(units(Cardinality::bounded(0, 4))))
        .element(
            DataElement::new(id("B")).with_based_on(id("A")).with_field(
                Value::incomplete(id("Units")).with_constraint(Constraint::card(Cardinality::bounded(0, 2))),
            ),
        )
        .element(DataElement::new(id("C")).with_based_on(id("B")))
}

fn render_history(value: &Value) -> String {
    value
        .card
        .iter()
        .flat_map(|card| card.history.iter())
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}

#[test]
fn test_card_narrowing_records_history() {
    let expansion = card_chain().expand();
    assert!(!expansion.diagnostics.has_errors(), "{:?}", expansion.diagnostics);

    let b = element(&expansion, "B");
    let units = field(b, "Units");
    assert_eq!(units.card, Some(Cardinality::bounded(0, 4)));
    assert_eq!(units.effective_card(), Some(&Cardinality::bounded(0, 2)));
    insta::assert_snapshot!(render_history(units), @"0..4 (shr.test.A)");
    assert_eq!(units.constraints[0].last_modified_by, Some(id("B")));
    assert_eq!(units.inheritance, Inheritance::Overridden);
    assert_eq!(units.inherited_from, Some(id("A")));
}

#[test]
fn test_card_history_extends_through_descendants() {
    let expansion = card_chain().expand();

    let c = element(&expansion, "C");
    let units = field(c, "Units");
    assert_eq!(units.effective_card(), Some(&Cardinality::bounded(0, 2)));
    insta::assert_snapshot!(render_history(units), @"0..4 (shr.test.A) -> 0..2 (shr.test.B)");
    assert_eq!(units.constraints[0].last_modified_by, Some(id("B")));
    assert_eq!(units.inheritance, Inheritance::Inherited);
    assert_eq!(c.hierarchy, vec![id("A"), id("B")]);
}

#[test]
fn test_card_widening_is_reported_once() {
    let expansion = ModelBuilder::new()
        .with_core_types()
        .element(DataElement::new(id("A")).with_field(units(Cardinality::bounded(0, 4))))
        .element(
            DataElement::new(id("B")).with_based_on(id("A")).with_field(
                Value::incomplete(id("Units")).with_constraint(Constraint::card(Cardinality::bounded(0, 6))),
            ),
        )
        .expand();

    assert_eq!(expansion.diagnostics.with_code(12010).count(), 1);
    let diagnostic = expansion.diagnostics.with_code(12010).next().unwrap();
    assert_eq!(diagnostic.severity, Severity::Error);
    assert_eq!(diagnostic.shr_id.as_deref(), Some("shr.test.B"));

    let units = field(element(&expansion, "B"), "Units");
    assert_eq!(units.effective_card(), Some(&Cardinality::bounded(0, 4)));
    assert!(units.constraints.is_empty());
}

#[test]
fn test_subtype_redeclaration_narrows_type() {
    let expansion = ModelBuilder::new()
        .with_core_types()
        .element(
            DataElement::new(id("Observation"))
                .with_value(Value::identifiable(id("Quantity")).with_card(Cardinality::bounded(1, 1))),
        )
        .element(
            DataElement::new(id("BodyWeight"))
                .with_based_on(id("Observation"))
                .with_value(Value::identifiable(id("WeightQuantity"))),
        )
        .element(DataElement::new(id("InfantWeight")).with_based_on(id("BodyWeight")))
        .expand();
    assert!(!expansion.diagnostics.has_errors(), "{:?}", expansion.diagnostics);

    let value = element(&expansion, "BodyWeight").value.as_ref().unwrap();
    assert_eq!(value.effective_identifier(), Some(&id("Quantity")));
    assert_eq!(value.constrained_identifier(), Some(&id("WeightQuantity")));
    let types = ConstraintsFilter::new(&value.constraints)
        .own()
        .of(ConstraintTag::Type)
        .into_vec();
    assert_eq!(types.len(), 1);
    assert_eq!(types[0].last_modified_by, Some(id("BodyWeight")));

    let inherited = element(&expansion, "InfantWeight").value.as_ref().unwrap();
    assert_eq!(inherited.constrained_identifier(), Some(&id("WeightQuantity")));
    assert_eq!(inherited.constraints[0].last_modified_by, Some(id("BodyWeight")));
    assert_eq!(inherited.inheritance, Inheritance::Inherited);
}

fn measurement_choice() -> Value {
    Value::choice(vec![
        Value::identifiable(id("Quantity")),
        Value::identifiable(id("Range")),
        Value::identifiable(id("Ratio")),
    ])
    .with_card(Cardinality::bounded(0, 1))
}

#[test]
fn test_choice_subset_is_accepted() {
    let expansion = ModelBuilder::new()
        .with_core_types()
        .element(DataElement::new(id("Measurement")).with_value(measurement_choice()))
        .element(
            DataElement::new(id("Narrow")).with_based_on(id("Measurement")).with_value(Value::choice(vec![
                Value::identifiable(id("Quantity")),
                Value::identifiable(id("Range")),
            ])),
        )
        .expand();
    assert!(!expansion.diagnostics.has_errors(), "{:?}", expansion.diagnostics);

    let value = element(&expansion, "Narrow").value.as_ref().unwrap();
    let options: Vec<_> = value
        .options()
        .unwrap()
        .iter()
        .filter_map(Value::identifier)
        .collect();
    assert_eq!(options, vec![&id("Quantity"), &id("Range")]);
    assert_eq!(value.card, Some(Cardinality::bounded(0, 1)));
}

/// Every value and field an element shares with a base fits within the
/// base's effective cardinality
fn assert_cardinalities_narrow(specifications: &Specifications) {
    for child in specifications.data_elements.all() {
        for base in child.concrete_bases() {
            let Some(parent) = specifications.data_elements.find(base) else {
                continue;
            };
            let mut pairs: Vec<(&Value, &Value)> = child.value.iter().zip(parent.value.iter()).collect();
            pairs.extend(child.fields.iter().filter_map(|field| {
                let identifier = field.identifier()?;
                parent.field(identifier).map(|inherited| (field, inherited))
            }));
            for (value, inherited) in pairs {
                if let (Some(card), Some(bound)) = (value.effective_card(), inherited.effective_card()) {
                    assert!(
                        card.fits_within(bound),
                        "{value} on {} widens {inherited} on {base}",
                        child.identifier
                    );
                }
            }
        }
    }
}

#[test]
fn test_cardinality_only_narrows_down_the_hierarchy() {
    let quantity_or_range = || vec![Value::identifiable(id("Quantity")), Value::identifiable(id("Range"))];
    let expansion = ModelBuilder::new()
        .with_core_types()
        .element(
            DataElement::new(id("Reading"))
                .with_value(Value::choice(quantity_or_range()).with_card(Cardinality::bounded(0, 1)))
                .with_field(units(Cardinality::bounded(0, 4))),
        )
        .element(
            DataElement::new(id("Wider"))
                .with_based_on(id("Reading"))
                .with_value(Value::choice(quantity_or_range()).with_card(Cardinality::bounded(0, 5)))
                .with_field(
                    Value::incomplete(id("Units")).with_constraint(Constraint::card(Cardinality::bounded(0, 2))),
                ),
        )
        .element(
            DataElement::new(id("Exact"))
                .with_based_on(id("Wider"))
                .with_value(
                    Value::choice(vec![Value::identifiable(id("Quantity"))]).with_card(Cardinality::bounded(1, 1)),
                )
                .with_field(units(Cardinality::bounded(1, 1))),
        )
        .expand();

    assert_eq!(codes(&expansion), vec![12010]);
    assert_cardinalities_narrow(&expansion.specifications);

    let wider = element(&expansion, "Wider").value.as_ref().unwrap();
    assert_eq!(wider.effective_card(), Some(&Cardinality::bounded(0, 1)));
    let exact = element(&expansion, "Exact");
    assert_eq!(exact.value.as_ref().unwrap().effective_card(), Some(&Cardinality::bounded(1, 1)));
    assert_eq!(field(exact, "Units").effective_card(), Some(&Cardinality::bounded(1, 1)));
}

#[test]
fn test_choice_with_foreign_option_is_rejected() {
    let expansion = ModelBuilder::new()
        .with_core_types()
        .element(DataElement::new(id("Measurement")).with_value(measurement_choice()))
        .element(
            DataElement::new(id("Wrong")).with_based_on(id("Measurement")).with_value(Value::choice(vec![
                Value::identifiable(id("Quantity")),
                Value::identifiable(core("CodeableConcept")),
            ])),
        )
        .expand();

    assert_eq!(codes(&expansion), vec![13086]);
    let value = element(&expansion, "Wrong").value.as_ref().unwrap();
    assert_eq!(value.options().map(<[Value]>::len), Some(3));
}

#[test]
fn test_code_replaces_inherited_value_set() {
    let concept = core("CodeableConcept");
    let expansion = ModelBuilder::new()
        .with_core_types()
        .units_value_set()
        .element(DataElement::new(id("Measure")).with_field(
            Value::identifiable(concept.clone())
                .with_card(Cardinality::bounded(0, 1))
                .with_constraint(Constraint::value_set(UNITS_VS, BindingStrength::Required)),
        ))
        .element(
            DataElement::new(id("Kilograms")).with_based_on(id("Measure")).with_field(
                Value::incomplete(concept.clone()).with_constraint(Constraint::code(Concept::new(None, "kg"))),
            ),
        )
        .expand();
    assert!(!expansion.diagnostics.has_errors(), "{:?}", expansion.diagnostics);

    let kilograms = element(&expansion, "Kilograms");
    let value = kilograms.field(&concept).unwrap();
    assert_eq!(value.constraints.len(), 1);
    match &value.constraints[0].kind {
        ConstraintKind::Code { code } => {
            assert_eq!(code.code, "kg");
            assert_eq!(code.system.as_deref(), Some("http://unitsofmeasure.org"));
        }
        other => panic!("expected a code constraint, got {other:?}"),
    }
    assert_eq!(value.constraints[0].last_modified_by, Some(id("Kilograms")));

    // the value set stays in the history of the field
    assert_eq!(value.constraint_history.by_tag(ConstraintTag::ValueSet).count(), 1);
    assert_eq!(
        value.constraint_history.by_tag(ConstraintTag::ValueSet).next().unwrap().source,
        id("Measure")
    );
}

#[test]
fn test_every_constraint_has_provenance() {
    let expansion = card_chain()
        .units_value_set()
        .element(
            DataElement::new(id("Observation"))
                .with_value(Value::identifiable(id("Quantity")).with_card(Cardinality::bounded(1, 1))),
        )
        .element(
            DataElement::new(id("BodyWeight"))
                .with_based_on(id("Observation"))
                .with_value(Value::identifiable(id("WeightQuantity")))
                .with_field(units(Cardinality::bounded(0, 1))),
        )
        .element(DataElement::new(id("Measurement")).with_value(measurement_choice()))
        .expand();
    assert!(!expansion.diagnostics.has_errors(), "{:?}", expansion.diagnostics);

    fn check(value: &Value, owner: &Identifier) {
        for constraint in &value.constraints {
            assert!(
                constraint.last_modified_by.is_some(),
                "{constraint} on {owner} has no modifier"
            );
            assert!(
                value.constraint_history.contains(constraint),
                "{constraint} on {owner} is missing from the history"
            );
        }
        for option in value.options().unwrap_or_default() {
            check(option, owner);
        }
    }
    for element in expansion.specifications.data_elements.all() {
        for value in element.values() {
            check(value, &element.identifier);
        }
    }
}

#[test]
fn test_expansion_is_idempotent() {
    let first = card_chain().expand();
    let reloaded = Specifications::from_document(first.specifications.to_document()).unwrap();
    let second = cimpl_core::expand(&reloaded, &Default::default());

    assert!(!second.diagnostics.has_errors(), "{:?}", second.diagnostics);
    assert_eq!(
        first.specifications.to_document(),
        second.specifications.to_document()
    );
}

#[test]
fn test_circular_inheritance_is_reported_once() {
    let expansion = ModelBuilder::new()
        .with_core_types()
        .element(
            DataElement::new(id("Left"))
                .with_based_on(id("Right"))
                .with_field(units(Cardinality::bounded(0, 1))),
        )
        .element(DataElement::new(id("Right")).with_based_on(id("Left")))
        .expand();

    assert_eq!(expansion.diagnostics.with_code(12041).count(), 1);
    assert!(expansion.specifications.data_elements.contains(&id("Left")));
    assert!(expansion.specifications.data_elements.contains(&id("Right")));
}

#[test]
fn test_missing_base_is_reported() {
    let expansion = ModelBuilder::new()
        .with_core_types()
        .element(
            DataElement::new(id("Orphan"))
                .with_based_on(id("Nowhere"))
                .with_field(units(Cardinality::bounded(0, 1))),
        )
        .expand();

    assert_eq!(expansion.diagnostics.with_code(12002).count(), 1);
    assert_eq!(field(element(&expansion, "Orphan"), "Units").card, Some(Cardinality::bounded(0, 1)));
}

#[test]
fn test_tbd_base_is_ignored() {
    let expansion = ModelBuilder::new()
        .with_core_types()
        .element(
            DataElement::new(id("Draft"))
                .with_based_on(Identifier::tbd("some future base"))
                .with_field(units(Cardinality::bounded(0, 1))),
        )
        .expand();

    assert!(codes(&expansion).is_empty());
    assert!(element(&expansion, "Draft").hierarchy.is_empty());
}

fn author() -> Identifier {
    Identifier::new("shr.base", "Author")
}

#[test]
fn test_entry_fields_are_tagged_against_envelope() {
    let expansion = ModelBuilder::new()
        .with_core_types()
        .element(
            DataElement::new(Identifier::new("shr.base", "Entry"))
                .with_field(Value::identifiable(author()).with_card(Cardinality::bounded(0, 1))),
        )
        .element(
            DataElement::new(id("Note"))
                .entry()
                .with_field(Value::identifiable(author()).with_card(Cardinality::bounded(0, 1)))
                .with_field(units(Cardinality::bounded(0, 1))),
        )
        .expand();
    assert!(codes(&expansion).is_empty(), "{:?}", expansion.diagnostics);

    let note = element(&expansion, "Note");
    let author_field = note.field(&author()).unwrap();
    assert_eq!(author_field.inheritance, Inheritance::Inherited);
    assert_eq!(author_field.inherited_from, Some(Identifier::new("shr.base", "Entry")));
    assert_eq!(field(note, "Units").inheritance, Inheritance::Original);
}

#[test]
fn test_missing_envelope_is_reported() {
    let expansion = ModelBuilder::new()
        .with_core_types()
        .element(
            DataElement::new(id("Note"))
                .entry()
                .with_field(Value::identifiable(author()).with_card(Cardinality::bounded(0, 1))),
        )
        .expand();

    assert_eq!(expansion.diagnostics.with_code(12036).count(), 1);
    assert_eq!(expansion.diagnostics.warning_count(), 1);
    assert_eq!(expansion.diagnostics.with_code(13084).count(), 1);
}
