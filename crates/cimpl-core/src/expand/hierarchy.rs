//! Structural expansion: merging an element with its bases

use super::Expander;
use crate::diagnostics::Scope;
use crate::error::{ExpansionError, OverrideConflict};
use crate::model::{Constraint, DataElement, Value};
use std::sync::Arc;
use tracing::{debug, debug_span};

/// Whether an ancestor field and a redeclared field describe the same slot
pub(super) fn same_slot(merged: &Value, field: &Value) -> bool {
    match (field.identifier(), field.tbd_text()) {
        (Some(identifier), _) => {
            merged.is_identifiable() && merged.possible_identifiers().contains(&identifier)
        }
        (None, Some(text)) => merged.tbd_text() == Some(text),
        (None, None) => false,
    }
}

impl Expander<'_> {
    /// Merge an unexpanded element with its expanded bases and memoize it
    pub(super) fn expand_definition(&mut self, element: &Arc<DataElement>) -> Arc<DataElement> {
        let span = debug_span!("expand_element", shr_id = %element.identifier);
        let _enter = span.enter();
        let scope = Scope::element(&element.identifier);
        self.in_progress.insert(element.identifier.clone());

        let mut hierarchy: Vec<Arc<DataElement>> = Vec::new();
        for base in &element.based_on {
            if base.is_tbd() {
                debug!("Ignoring TBD base {}", base);
                continue;
            }
            if self.in_progress.contains(base) {
                debug!("Skipping base {} already being expanded", base);
                continue;
            }
            match self.lookup(base) {
                Some(expanded) => hierarchy.push(expanded),
                None => self.report(&scope, ExpansionError::UnresolvedBase { base: base.clone() }),
            }
        }
        hierarchy.push(element.clone());

        let mut merged_value: Option<Value> = None;
        let mut merged_fields: Vec<Value> = Vec::new();
        for node in &hierarchy {
            let is_root = node.identifier == element.identifier;

            if let Some(value) = &node.value {
                merged_value = Some(match merged_value.take() {
                    Some(old) => self.merge_value(&scope, &old, value),
                    None => {
                        if is_root && value.effective_card().is_none() {
                            self.report(
                                &scope,
                                ExpansionError::MissingCardinality {
                                    value: value.to_string(),
                                    element: None,
                                },
                            );
                        }
                        let mut value = value.clone();
                        value.constraints = self.consolidate_constraints(&scope, &value);
                        value
                    }
                });
            }

            for field in &node.fields {
                match merged_fields.iter().position(|m| same_slot(m, field)) {
                    Some(index) => {
                        let old = merged_fields[index].clone();
                        merged_fields[index] = self.merge_value(&scope, &old, field);
                    }
                    None => {
                        if is_root && field.effective_card().is_none() {
                            self.report(
                                &scope,
                                ExpansionError::MissingCardinality {
                                    value: field.to_string(),
                                    element: Some(element.identifier.name().to_string()),
                                },
                            );
                        }
                        let mut field = field.clone();
                        field.constraints = self.consolidate_constraints(&scope, &field);
                        merged_fields.push(field);
                    }
                }
            }
        }

        let mut expanded = DataElement::clone(element);
        expanded.value = merged_value;
        expanded.fields = merged_fields;

        self.in_progress.remove(&element.identifier);
        debug!("Expanded {}", element.identifier);
        self.expanded.data_elements.replace(expanded);
        match self.expanded.data_elements.find(&element.identifier) {
            Some(expanded) => expanded.clone(),
            None => element.clone(),
        }
    }

    /// Apply a descendant's redeclaration `new` on top of an inherited `old`
    ///
    /// Incompatible redeclarations are reported and leave `old` in place.
    pub(super) fn merge_value(&mut self, scope: &Scope, old: &Value, new: &Value) -> Value {
        let mut merged = old.clone();

        let compatible = new.same_variant(old)
            || new.is_incomplete()
            || old.is_choice()
            || new.is_choice()
            || (old.is_ref() && new.is_identifiable());
        if !compatible {
            self.report_override(scope, old, new, OverrideConflict::VariantMismatch);
            return merged;
        }

        if let Some(new_id) = new.identifier() {
            if !new_id.is_value_keyword() {
                if old.is_choice() {
                    match self.find_matching_option(scope, old, new, true) {
                        Some(option) => merged = option,
                        None => {
                            self.report_override(scope, old, new, OverrideConflict::NotAnOption);
                            return merged;
                        }
                    }
                } else if Some(new_id) != old.identifier() && Some(new_id) != old.effective_identifier() {
                    let base = merged.effective_identifier().cloned();
                    if self.has_base_type(scope, Some(new_id), base.as_ref()) {
                        merged.add_constraint(Constraint::type_of(new_id.clone()));
                    } else {
                        self.report_override(scope, old, new, OverrideConflict::UnrelatedIdentifier);
                        return merged;
                    }
                }
            }
        } else if let Some(new_options) = new.options() {
            let old_choice = if old.is_choice() {
                old.clone()
            } else if old.is_identifiable() {
                let mut choice = Value::choice(vec![old.clone().without_card()]);
                choice.card = old.card.clone();
                choice
            } else {
                self.report_override(scope, old, new, OverrideConflict::ChoiceOverUnsupported);
                return merged;
            };

            let mut options = Vec::with_capacity(new_options.len());
            for option in new_options {
                match self.find_matching_option(scope, &old_choice, option, false) {
                    Some(matched) => options.push(matched),
                    None => {
                        self.report_override(scope, old, new, OverrideConflict::IncompatibleOptions);
                        return merged;
                    }
                }
            }

            merged = new.clone();
            if let Some(merged_options) = merged.options_mut() {
                *merged_options = options;
            }
            merged.constraints = old_choice.constraints.clone();
            // A redeclared card only applies through the card constraint below
            merged.card = old_choice.card.clone();
            if merged.card.is_none() {
                merged.card = old_choice.effective_card().cloned();
            }
        } else if let Some(text) = new.tbd_text() {
            merged.set_tbd_text(text);
        }

        if let (Some(new_card), Some(old_card)) = (&new.card, &old.card) {
            if new_card != old_card {
                merged.add_constraint(Constraint::card(new_card.bounds()));
            }
        }
        merged.constraints.extend(new.constraints.iter().cloned());
        merged.constraints = self.consolidate_constraints(scope, &merged);
        merged
    }

    /// The option of `choice` that `value` can override, already merged
    /// with `value`
    ///
    /// Options match by identifier or by a subtype relation, in which case
    /// the merged option records the narrowing as a type constraint. With
    /// `set_card` the option takes the choice's effective cardinality.
    pub(super) fn find_matching_option(
        &mut self,
        scope: &Scope,
        choice: &Value,
        value: &Value,
        set_card: bool,
    ) -> Option<Value> {
        let options = choice.options()?;
        for option in options {
            if option.is_choice() {
                let mut nested = option.clone();
                if set_card {
                    nested.card = choice.effective_card().cloned();
                }
                if let Some(matched) = self.find_matching_option(scope, &nested, value, set_card) {
                    return Some(matched);
                }
                continue;
            }
            if !option.is_identifiable() || !option.same_variant(value) {
                continue;
            }

            let mut candidate = option.clone();
            let value_id = value.effective_identifier();
            if option.identifier() != value_id {
                let base = candidate.effective_identifier().cloned();
                if !self.has_base_type(scope, value_id, base.as_ref()) {
                    continue;
                }
                if let Some(value_id) = value_id {
                    candidate.add_constraint(Constraint::type_of(value_id.clone()));
                }
            }
            if set_card {
                candidate.card = choice.effective_card().cloned();
            }
            return Some(self.merge_value(scope, &candidate, value));
        }
        None
    }

    fn report_override(&mut self, scope: &Scope, old: &Value, new: &Value, conflict: OverrideConflict) {
        self.report(
            scope,
            ExpansionError::IncompatibleOverride {
                old: old.to_string(),
                new: new.to_string(),
                conflict,
            },
        );
    }
}
