//! Provenance pass over structurally expanded elements
//!
//! Runs once every element has been merged, bases before descendants, and
//! records where each piece of an element came from:
//!
//! - `last_modified_by` on every constraint
//! - cardinality narrowing history
//! - constraint history
//! - inheritance tags on values, fields and entry envelope fields
//! - the transitive `hierarchy` list

use super::Expander;
use crate::diagnostics::Scope;
use crate::error::ExpansionError;
use crate::model::{
    CardinalityChange, ConstraintTag, ConstraintsFilter, DataElement, Identifier, Inheritance, Value,
};
use std::sync::Arc;
use tracing::{debug, debug_span};

/// Whether two values occupy the same position in related elements:
/// same declared identifier, same TBD text, or both choices
fn same_identity(a: &Value, b: &Value) -> bool {
    match (a.identifier(), b.identifier()) {
        (Some(x), Some(y)) => x == y,
        (None, None) => (a.is_choice() && b.is_choice()) || (a.is_tbd() && a.tbd_text() == b.tbd_text()),
        _ => false,
    }
}

/// The field of a base element corresponding to `field`
fn matching_field<'a>(base: &'a DataElement, field: &Value) -> Option<&'a Value> {
    base.fields.iter().find(|candidate| same_identity(candidate, field))
}

/// Set `last_modified_by` on every constraint of `value` and its options
///
/// A constraint already present in a parent value keeps the parent's
/// modifier; the first parent that has it wins. Anything else was
/// introduced by `element`.
fn inherit_modifiers(value: &mut Value, parents: &[&Value], element: &Identifier) {
    for constraint in &mut value.constraints {
        let inherited = parents.iter().find_map(|parent| {
            parent
                .constraints
                .iter()
                .find(|candidate| candidate.same_as(&*constraint))
                .and_then(|candidate| candidate.last_modified_by.clone())
        });
        constraint.last_modified_by = Some(inherited.unwrap_or_else(|| element.clone()));
    }
    if let Some(options) = value.options_mut() {
        for option in options {
            let parent_options: Vec<&Value> = parents
                .iter()
                .filter_map(|parent| parent.options())
                .flatten()
                .filter(|candidate| same_identity(candidate, &*option))
                .collect();
            inherit_modifiers(option, &parent_options, element);
        }
    }
}

/// Record how the cardinality of `value` was narrowed along its ancestry
///
/// Only values whose bounds differ from the declared ones, or that carry
/// their own card constraint, get a history. It starts from the parent's
/// history (or the parent's declared bounds, attributed to the base) and
/// ends with the parent's effective bounds when those differ.
fn record_card_history(value: &mut Value, parent: &Value, base: &Identifier) {
    let narrowed = match (&value.card, value.effective_card()) {
        (Some(card), Some(effective)) => card != effective,
        _ => return,
    };
    let own_card = ConstraintsFilter::new(&value.constraints)
        .own()
        .on_value(false)
        .of(ConstraintTag::Card)
        .has_constraints();
    if !narrowed && !own_card {
        return;
    }
    let Some(parent_card) = &parent.card else {
        return;
    };

    let mut history: Vec<CardinalityChange> = if parent_card.history.is_empty() {
        vec![parent_card.change_from(base.clone())]
    } else {
        parent_card.history.clone()
    };
    if let Some(parent_effective) = parent.effective_card() {
        let last = history.last().map(CardinalityChange::bounds);
        if last.as_ref() != Some(parent_effective) {
            let source = ConstraintsFilter::new(&parent.constraints)
                .own()
                .on_value(false)
                .of(ConstraintTag::Card)
                .last()
                .and_then(|c| c.last_modified_by.clone())
                .unwrap_or_else(|| base.clone());
            history.push(parent_effective.change_from(source));
        }
    }
    if let Some(card) = value.card.as_mut() {
        card.history = history;
    }
}

/// Stamp one value slot against its counterparts in the bases
fn manage_inheritance(value: &mut Value, parents: &[(&Identifier, &Value)], element: &Identifier) {
    let parent_values: Vec<&Value> = parents.iter().map(|(_, parent)| *parent).collect();
    inherit_modifiers(value, &parent_values, element);

    let Some((base, parent)) = parents.first() else {
        return;
    };
    if value.inherited_from.is_none() {
        value.inherited_from = Some(
            parent
                .inherited_from
                .clone()
                .unwrap_or_else(|| (*base).clone()),
        );
    }
    record_card_history(value, parent, base);
}

/// Expand `element.hierarchy` and stamp modifiers and cardinality histories
pub(super) fn expand_hierarchy(element: &mut DataElement, bases: &[Arc<DataElement>]) {
    let identifier = element.identifier.clone();

    if let Some(value) = element.value.as_mut() {
        let parents: Vec<(&Identifier, &Value)> = bases
            .iter()
            .filter_map(|base| base.value.as_ref().map(|v| (&base.identifier, v)))
            .collect();
        manage_inheritance(value, &parents, &identifier);
    }
    for field in &mut element.fields {
        let parents: Vec<(&Identifier, &Value)> = bases
            .iter()
            .filter_map(|base| matching_field(base, &*field).map(|f| (&base.identifier, f)))
            .collect();
        manage_inheritance(field, &parents, &identifier);
    }

    let mut hierarchy: Vec<Identifier> = Vec::new();
    for base in bases {
        for ancestor in base.hierarchy.iter().chain(std::iter::once(&base.identifier)) {
            if !hierarchy.contains(ancestor) {
                hierarchy.push(ancestor.clone());
            }
        }
    }
    element.hierarchy = hierarchy;
}

/// Inherit the constraint histories of `parents`, then record the
/// constraints of `value` not seen in any ancestor as introduced by `element`
fn capture_history(value: &mut Value, parents: &[&Value], element: &Identifier) {
    for parent in parents {
        value.constraint_history.merge_from(&parent.constraint_history);
    }
    for constraint in &value.constraints {
        value.constraint_history.add(constraint, element);
    }
    if let Some(options) = value.options_mut() {
        for option in options {
            let parent_options: Vec<&Value> = parents
                .iter()
                .filter_map(|parent| parent.options())
                .flatten()
                .filter(|candidate| same_identity(candidate, &*option))
                .collect();
            capture_history(option, &parent_options, element);
        }
    }
}

pub(super) fn capture_constraint_histories(element: &mut DataElement, bases: &[Arc<DataElement>]) {
    let identifier = element.identifier.clone();
    if let Some(value) = element.value.as_mut() {
        let parents: Vec<&Value> = bases.iter().filter_map(|base| base.value.as_ref()).collect();
        capture_history(value, &parents, &identifier);
    }
    for field in &mut element.fields {
        let parents: Vec<&Value> = bases
            .iter()
            .filter_map(|base| matching_field(base, &*field))
            .collect();
        capture_history(field, &parents, &identifier);
    }
}

/// Tag the value and fields as inherited or overridden relative to the bases
pub(super) fn tag_inheritance(element: &mut DataElement, bases: &[Arc<DataElement>]) {
    if let Some(value) = element.value.as_mut() {
        if let Some(tag) = inheritance_tag(value, bases.iter().filter_map(|b| b.value.as_ref())) {
            value.inheritance = tag;
        }
    }
    for field in &mut element.fields {
        let parents = bases.iter().filter_map(|base| {
            base.fields.iter().find(|candidate| match field.identifier() {
                Some(id) => {
                    candidate.identifier() == Some(id) || candidate.effective_identifier() == Some(id)
                }
                None => field.is_tbd() && candidate.tbd_text() == field.tbd_text(),
            })
        });
        if let Some(tag) = inheritance_tag(field, parents) {
            field.inheritance = tag;
        }
    }
}

fn inheritance_tag<'a>(value: &Value, parents: impl Iterator<Item = &'a Value>) -> Option<Inheritance> {
    let mut tag = None;
    for parent in parents {
        if parent.same_definition(value) {
            return Some(Inheritance::Inherited);
        }
        tag = Some(Inheritance::Overridden);
    }
    tag
}

impl Expander<'_> {
    /// Run the provenance pass over every expanded element
    pub(super) fn apply_provenance(&mut self) {
        let entry_id = self.config.entry_element.clone();
        let has_entries = self.expanded.data_elements.all().any(|e| e.is_entry);
        if has_entries && !self.expanded.data_elements.contains(&entry_id) {
            self.report(
                &Scope::root(),
                ExpansionError::MissingEntryElement {
                    entry: entry_id.clone(),
                },
            );
        }

        for identifier in self.graph.processing_order() {
            let Some(expanded) = self.expanded.data_elements.find(&identifier).cloned() else {
                continue;
            };
            let span = debug_span!("provenance", shr_id = %identifier);
            let _enter = span.enter();
            let scope = Scope::element(&identifier);

            let mut bases = Vec::new();
            for base in expanded.concrete_bases() {
                match self.expanded.data_elements.find(base) {
                    Some(found) if found.identifier != identifier => bases.push(found.clone()),
                    Some(_) => {}
                    None => self.report(
                        &scope,
                        ExpansionError::MissingExpandedBase {
                            base: base.clone(),
                            child: identifier.clone(),
                        },
                    ),
                }
            }

            let mut element = DataElement::clone(&expanded);
            expand_hierarchy(&mut element, &bases);
            capture_constraint_histories(&mut element, &bases);
            tag_inheritance(&mut element, &bases);
            if element.is_entry && element.identifier != entry_id {
                let entry = self.expanded.data_elements.find(&entry_id).cloned();
                self.tag_entry_fields(&scope, &mut element, entry.as_deref());
            }
            debug!("Recorded provenance of {}", identifier);
            self.expanded.data_elements.replace(element);
        }
    }

    /// Tag fields shared with the entry envelope
    ///
    /// Without the envelope definition the configured fallback fields are
    /// the only hint; finding one of them is reported once.
    fn tag_entry_fields(&mut self, scope: &Scope, element: &mut DataElement, entry: Option<&DataElement>) {
        let Some(entry) = entry else {
            let uses_envelope = element
                .fields
                .iter()
                .filter_map(Value::identifier)
                .any(|id| self.config.is_entry_fallback_field(id));
            if uses_envelope {
                self.report(
                    scope,
                    ExpansionError::EntryInheritanceIncomplete {
                        identifier: element.identifier.clone(),
                    },
                );
            }
            return;
        };

        for envelope_field in &entry.fields {
            let Some(envelope_id) = envelope_field.identifier() else {
                continue;
            };
            let found = element.fields.iter_mut().find(|field| {
                field.identifier() == Some(envelope_id) || field.effective_identifier() == Some(envelope_id)
            });
            if let Some(field) = found {
                if field.inheritance.is_original() {
                    field.inheritance = if envelope_field.same_definition(field) {
                        Inheritance::Inherited
                    } else {
                        Inheritance::Overridden
                    };
                    field.inherited_from = Some(entry.identifier.clone());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Cardinality, Constraint};

    fn id(name: &str) -> Identifier {
        Identifier::new("shr.test", name)
    }

    fn units(card: Cardinality) -> Value {
        Value::identifiable(id("Units")).with_card(card)
    }

    #[test]
    fn test_root_constraints_are_stamped_with_element() {
        let mut element = DataElement::new(id("A")).with_field(
            units(Cardinality::unbounded(0)).with_constraint(Constraint::card(Cardinality::bounded(0, 4))),
        );
        expand_hierarchy(&mut element, &[]);
        capture_constraint_histories(&mut element, &[]);

        let field = &element.fields[0];
        assert_eq!(field.constraints[0].last_modified_by, Some(id("A")));
        assert_eq!(field.constraint_history.len(), 1);
        assert_eq!(field.constraint_history.items()[0].source, id("A"));
        assert!(element.hierarchy.is_empty());
    }

    #[test]
    fn test_inherited_constraint_keeps_parent_modifier() {
        let constraint = Constraint::card(Cardinality::bounded(0, 2));
        let mut base = DataElement::new(id("B"))
            .with_field(units(Cardinality::bounded(0, 4)).with_constraint(constraint.clone()));
        expand_hierarchy(&mut base, &[]);
        capture_constraint_histories(&mut base, &[]);
        let base = Arc::new(base);

        let mut child = DataElement::new(id("C"))
            .with_based_on(id("B"))
            .with_field(units(Cardinality::bounded(0, 4)).with_constraint(constraint));
        expand_hierarchy(&mut child, &[base.clone()]);
        capture_constraint_histories(&mut child, &[base]);

        let field = &child.fields[0];
        assert_eq!(field.constraints[0].last_modified_by, Some(id("B")));
        assert_eq!(field.inherited_from, Some(id("B")));
        assert_eq!(field.constraint_history.items()[0].source, id("B"));
        assert_eq!(child.hierarchy, vec![id("B")]);
    }

    #[test]
    fn test_card_history_chain() {
        let mut a = DataElement::new(id("A")).with_field(units(Cardinality::bounded(0, 4)));
        expand_hierarchy(&mut a, &[]);
        let a = Arc::new(a);

        let mut b = DataElement::new(id("B")).with_based_on(id("A")).with_field(
            units(Cardinality::bounded(0, 4)).with_constraint(Constraint::card(Cardinality::bounded(0, 2))),
        );
        expand_hierarchy(&mut b, &[a.clone()]);
        let history = &b.fields[0].card.as_ref().unwrap().history;
        assert_eq!(history, &vec![Cardinality::bounded(0, 4).change_from(id("A"))]);
        let b = Arc::new(b);

        let mut c = DataElement::new(id("C")).with_based_on(id("B")).with_field(
            units(Cardinality::bounded(0, 4)).with_constraint(Constraint::card(Cardinality::bounded(0, 2))),
        );
        expand_hierarchy(&mut c, &[b]);
        let history = &c.fields[0].card.as_ref().unwrap().history;
        assert_eq!(
            history,
            &vec![
                Cardinality::bounded(0, 4).change_from(id("A")),
                Cardinality::bounded(0, 2).change_from(id("B")),
            ]
        );
        assert_eq!(c.hierarchy, vec![id("A"), id("B")]);
    }

    #[test]
    fn test_inheritance_tags() {
        let base = Arc::new(
            DataElement::new(id("A"))
                .with_field(units(Cardinality::bounded(0, 4)))
                .with_field(Value::identifiable(id("Note")).with_card(Cardinality::bounded(0, 1))),
        );
        let mut child = DataElement::new(id("B"))
            .with_based_on(id("A"))
            .with_field(
                units(Cardinality::bounded(0, 4)).with_constraint(Constraint::card(Cardinality::bounded(0, 2))),
            )
            .with_field(Value::identifiable(id("Note")).with_card(Cardinality::bounded(0, 1)))
            .with_field(Value::identifiable(id("Extra")).with_card(Cardinality::bounded(0, 1)));

        tag_inheritance(&mut child, &[base]);
        assert_eq!(child.fields[0].inheritance, Inheritance::Overridden);
        assert_eq!(child.fields[1].inheritance, Inheritance::Inherited);
        assert_eq!(child.fields[2].inheritance, Inheritance::Original);
    }

    #[test]
    fn test_choice_options_are_stamped() {
        let mut element = DataElement::new(id("A")).with_value(
            Value::choice(vec![
                Value::identifiable(id("Quantity")).with_constraint(Constraint::type_of(id("WeightQuantity"))),
                Value::identifiable(id("Range")),
            ])
            .with_card(Cardinality::bounded(0, 1)),
        );
        expand_hierarchy(&mut element, &[]);

        let options = element.value.as_ref().unwrap().options().unwrap();
        assert_eq!(options[0].constraints[0].last_modified_by, Some(id("A")));
    }
}
