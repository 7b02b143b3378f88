//! Constraint consolidation
//!
//! Folds a value's constraint list, oldest first, into a list in which each
//! path carries at most one effective constraint of each superseding kind.
//! A constraint that fails validation is reported and dropped; the ones
//! accepted before it stay in place.

use super::Expander;
use super::target::{constraint_target_label, value_identifier};
use crate::diagnostics::Scope;
use crate::error::{ExpansionError, TypeCheck};
use crate::model::{
    Cardinality, Concept, Constraint, ConstraintKind, ConstraintTag, ConstraintsFilter, Identifier,
    Value,
};
use tracing::trace;

/// Whether `constraint` sits on the same slot as `other` with one of `tags`
fn at_slot_of(constraint: &Constraint, other: &Constraint, tags: &[ConstraintTag]) -> bool {
    constraint.path == other.path && constraint.on_value == other.on_value && tags.contains(&constraint.tag())
}

/// A constraint ready for its per-kind checks
struct Prepared {
    constraint: Constraint,
    /// Choice an on-value constraint was already validated against
    choice: Option<Value>,
}

impl Expander<'_> {
    /// Consolidated copy of `value`'s constraints
    pub(super) fn consolidate_constraints(&mut self, scope: &Scope, value: &Value) -> Vec<Constraint> {
        let mut consolidated = Vec::new();
        for constraint in &value.constraints {
            trace!("Consolidating {} on {}", constraint, value);
            if matches!(constraint.kind, ConstraintKind::Unsupported) {
                self.report(
                    scope,
                    ExpansionError::UnsupportedConstraint {
                        constraint: constraint.to_string(),
                    },
                );
                continue;
            }
            let Some(Prepared { constraint, choice }) = self.prepare_on_value(scope, value, constraint)
            else {
                continue;
            };
            let choice = choice.as_ref();
            consolidated = match &constraint.kind {
                ConstraintKind::Card { card } => {
                    self.consolidate_card(scope, value, &constraint, choice, card, consolidated)
                }
                ConstraintKind::Type { is_a } => {
                    self.consolidate_type(scope, value, &constraint, choice, is_a, consolidated)
                }
                ConstraintKind::IncludesType { is_a, card } => self.consolidate_includes_type(
                    scope,
                    value,
                    &constraint,
                    choice,
                    is_a,
                    card,
                    consolidated,
                ),
                ConstraintKind::ValueSet { .. } => {
                    self.consolidate_value_set(scope, value, &constraint, choice, consolidated)
                }
                ConstraintKind::Code { code } => {
                    self.consolidate_code(scope, value, &constraint, choice, code, consolidated)
                }
                ConstraintKind::IncludesCode { code } => {
                    self.consolidate_includes_code(scope, value, &constraint, choice, code, consolidated)
                }
                ConstraintKind::Boolean { value: fixed } => {
                    self.consolidate_boolean(scope, value, &constraint, choice, *fixed, consolidated)
                }
                ConstraintKind::Unsupported => consolidated,
            };
        }
        consolidated
    }

    /// Resolve an on-value constraint against the value of its target
    ///
    /// A choice keeps the constraint on-value once at least one option can
    /// satisfy it. A single identifiable value turns it into a plain
    /// constraint whose path ends in that value's identifier. Returns
    /// `None` when the constraint was rejected.
    fn prepare_on_value(&mut self, scope: &Scope, value: &Value, constraint: &Constraint) -> Option<Prepared> {
        let mut constraint = constraint.clone();
        if !constraint.on_value {
            return Some(Prepared {
                constraint,
                choice: None,
            });
        }

        let label = constraint_target_label(value, &constraint.path);
        let target_value = self.constraint_target_value(scope, value, &constraint.path);
        if let Some(choice) = target_value.as_ref().filter(|v| v.is_choice()) {
            let options: Vec<Identifier> = choice
                .aggregate_options()
                .into_iter()
                .filter_map(|option| option.identifier().cloned())
                .collect();
            let target = format!("{label}[value]");
            let rejection = match &constraint.kind {
                ConstraintKind::Type { is_a } | ConstraintKind::IncludesType { is_a, .. } => {
                    let valid = options
                        .iter()
                        .any(|option| self.has_base_type(scope, Some(is_a), Some(option)));
                    (!valid).then(|| ExpansionError::IncompatibleType {
                        target,
                        is_a: is_a.clone(),
                        check: TypeCheck::ChoiceOption,
                    })
                }
                ConstraintKind::ValueSet { .. }
                | ConstraintKind::Code { .. }
                | ConstraintKind::IncludesCode { .. } => {
                    let valid = options
                        .iter()
                        .any(|option| self.supports_code(scope, Some(option)));
                    (!valid).then(|| ExpansionError::NotCodeBearing {
                        target,
                        constraint: constraint.tag(),
                    })
                }
                ConstraintKind::Boolean { .. } => {
                    let valid = options
                        .iter()
                        .any(|option| Self::supports_boolean(Some(option)));
                    (!valid).then_some(ExpansionError::NotBooleanTyped { target })
                }
                ConstraintKind::Card { .. } | ConstraintKind::Unsupported => None,
            };
            if let Some(error) = rejection {
                self.report(scope, error);
                return None;
            }
            return Some(Prepared {
                constraint,
                choice: Some(choice.clone()),
            });
        }

        match value_identifier(target_value.as_ref()) {
            Some(identifier) => {
                constraint.on_value = false;
                constraint.path.push(identifier);
                Some(Prepared {
                    constraint,
                    choice: None,
                })
            }
            None => {
                self.report(
                    scope,
                    ExpansionError::UnresolvableConstraintTarget {
                        target: label,
                        constraint: constraint.tag(),
                        on_value: true,
                    },
                );
                None
            }
        }
    }

    fn consolidate_card(
        &mut self,
        scope: &Scope,
        value: &Value,
        constraint: &Constraint,
        choice: Option<&Value>,
        card: &Cardinality,
        mut previous: Vec<Constraint>,
    ) -> Vec<Constraint> {
        let label = constraint_target_label(value, &constraint.path);
        let target = match choice {
            Some(choice) => Some(choice.clone()),
            None => self.constraint_target(scope, value, &constraint.path),
        };
        let Some(target) = target else {
            self.report(
                scope,
                ExpansionError::UnresolvableConstraintTarget {
                    target: label,
                    constraint: ConstraintTag::Card,
                    on_value: constraint.on_value,
                },
            );
            return previous;
        };

        if let Some(target_card) = &target.card {
            if !card.fits_within(target_card) {
                self.report(
                    scope,
                    ExpansionError::CardinalityWidened {
                        target: label,
                        from: target_card.bounds(),
                        to: card.bounds(),
                        prior: false,
                    },
                );
                return previous;
            }
        }

        let narrower_prior = ConstraintsFilter::new(&previous)
            .at_path(&constraint.path)
            .of(ConstraintTag::Card)
            .on_value(constraint.on_value)
            .into_vec()
            .into_iter()
            .filter_map(Constraint::cardinality)
            .find(|prior| !card.fits_within(prior))
            .map(|prior| prior.bounds());
        if let Some(prior) = narrower_prior {
            self.report(
                scope,
                ExpansionError::CardinalityWidened {
                    target: label,
                    from: prior,
                    to: card.bounds(),
                    prior: true,
                },
            );
            return previous;
        }

        previous.retain(|c| !at_slot_of(c, constraint, &[ConstraintTag::Card]));
        previous.push(constraint.clone());
        previous
    }

    fn consolidate_type(
        &mut self,
        scope: &Scope,
        value: &Value,
        constraint: &Constraint,
        choice: Option<&Value>,
        is_a: &Identifier,
        mut previous: Vec<Constraint>,
    ) -> Vec<Constraint> {
        let label = constraint_target_label(value, &constraint.path);

        if choice.is_none() {
            let target = self.constraint_target(scope, value, &constraint.path);
            let Some(target_id) = target.as_ref().and_then(Value::identifier).cloned() else {
                self.report(
                    scope,
                    ExpansionError::NoIdentifierToConstrain {
                        target: label,
                        constraint: ConstraintTag::Type,
                    },
                );
                return previous;
            };
            if !self.has_base_type(scope, Some(is_a), Some(&target_id)) {
                self.report(
                    scope,
                    ExpansionError::IncompatibleType {
                        target: label,
                        is_a: is_a.clone(),
                        check: TypeCheck::Type,
                    },
                );
                return previous;
            }
        }

        let priors: Vec<Identifier> = ConstraintsFilter::new(&previous)
            .at_path(&constraint.path)
            .of(ConstraintTag::Type)
            .on_value(constraint.on_value)
            .into_vec()
            .into_iter()
            .filter_map(|c| c.is_a().cloned())
            .collect();
        for prior in priors {
            if !self.has_base_type(scope, Some(is_a), Some(&prior)) {
                self.report(
                    scope,
                    ExpansionError::CannotFurtherNarrow {
                        target: label,
                        from: prior,
                        to: is_a.clone(),
                    },
                );
                return previous;
            }
        }

        previous.retain(|c| !at_slot_of(c, constraint, &[ConstraintTag::Type]));
        previous.push(constraint.clone());
        previous
    }

    fn consolidate_includes_type(
        &mut self,
        scope: &Scope,
        value: &Value,
        constraint: &Constraint,
        choice: Option<&Value>,
        is_a: &Identifier,
        card: &Cardinality,
        mut previous: Vec<Constraint>,
    ) -> Vec<Constraint> {
        let label = constraint_target_label(value, &constraint.path);
        let target = match choice {
            Some(choice) => Some(choice.clone()),
            None => self.constraint_target(scope, value, &constraint.path),
        };

        if choice.is_none() {
            let Some(target) = &target else {
                self.report(
                    scope,
                    ExpansionError::UnresolvableConstraintTarget {
                        target: label,
                        constraint: ConstraintTag::IncludesType,
                        on_value: false,
                    },
                );
                return previous;
            };
            let Some(target_id) = target.identifier().cloned() else {
                self.report(
                    scope,
                    ExpansionError::NoIdentifierToConstrain {
                        target: label,
                        constraint: ConstraintTag::IncludesType,
                    },
                );
                return previous;
            };
            if !self.has_base_type(scope, Some(is_a), Some(&target_id)) {
                self.report(
                    scope,
                    ExpansionError::IncompatibleType {
                        target: label,
                        is_a: is_a.clone(),
                        check: TypeCheck::IncludesType,
                    },
                );
                return previous;
            }
        }

        let allowed = ConstraintsFilter::new(&value.constraints)
            .at_path(&constraint.path)
            .of(ConstraintTag::Card)
            .on_value(constraint.on_value)
            .first()
            .and_then(Constraint::cardinality)
            .or_else(|| target.as_ref().and_then(Value::effective_card))
            .map(|c| c.bounds());
        let Some(allowed) = allowed else {
            self.report(scope, ExpansionError::MissingIncludesCardinality { target: label });
            return previous;
        };
        if let Some(max) = allowed.max {
            let exceeds = card.min > max || card.max.is_none_or(|card_max| card_max > max);
            if exceeds {
                self.report(
                    scope,
                    ExpansionError::IncludesCardinalityExceeded {
                        target: label,
                        card: card.bounds(),
                        allowed,
                    },
                );
                return previous;
            }
        }

        let existing = previous.iter().position(|c| {
            at_slot_of(c, constraint, &[ConstraintTag::IncludesType]) && c.is_a() == Some(is_a)
        });
        match existing {
            Some(index) => previous[index] = constraint.clone(),
            None => previous.push(constraint.clone()),
        }
        previous
    }

    /// Identifier of the code-bearing value reached through the target's
    /// own value, when the target itself cannot carry codes
    fn code_bearing_value(&mut self, scope: &Scope, value: &Value, path: &[Identifier]) -> Option<Identifier> {
        let target_value = self.constraint_target_value(scope, value, path);
        if let Some(identifier) = value_identifier(target_value.as_ref()) {
            return self
                .supports_code(scope, Some(&identifier))
                .then_some(identifier);
        }
        let options: Vec<Identifier> = target_value
            .iter()
            .flat_map(|v| v.aggregate_options())
            .filter_map(|option| option.identifier().cloned())
            .collect();
        options
            .into_iter()
            .find(|option| self.supports_code(scope, Some(option)))
    }

    fn consolidate_value_set(
        &mut self,
        scope: &Scope,
        value: &Value,
        constraint: &Constraint,
        choice: Option<&Value>,
        mut previous: Vec<Constraint>,
    ) -> Vec<Constraint> {
        let mut constraint = constraint.clone();
        let label = constraint_target_label(value, &constraint.path);

        if choice.is_none() {
            let target = self.constraint_target(scope, value, &constraint.path);
            let Some(target_id) = target.as_ref().and_then(Value::identifier).cloned() else {
                self.report(
                    scope,
                    ExpansionError::NoIdentifierToConstrain {
                        target: label,
                        constraint: ConstraintTag::ValueSet,
                    },
                );
                return previous;
            };

            if !self.supports_code(scope, Some(&target_id)) {
                match self.code_bearing_value(scope, value, &constraint.path) {
                    Some(identifier) => constraint.path.push(identifier),
                    None => {
                        self.report(
                            scope,
                            ExpansionError::NotCodeBearing {
                                target: label,
                                constraint: ConstraintTag::ValueSet,
                            },
                        );
                        return previous;
                    }
                }
            }
        }

        let fixed = ConstraintsFilter::new(&previous)
            .at_path(&constraint.path)
            .of(ConstraintTag::Code)
            .on_value(constraint.on_value)
            .has_constraints();
        if fixed {
            self.report(
                scope,
                ExpansionError::AlreadyFixedToCode {
                    target: constraint_target_label(value, &constraint.path),
                },
            );
            return previous;
        }

        previous.retain(|c| !at_slot_of(c, &constraint, &[ConstraintTag::ValueSet]));
        previous.push(constraint);
        previous
    }

    fn consolidate_code(
        &mut self,
        scope: &Scope,
        value: &Value,
        constraint: &Constraint,
        choice: Option<&Value>,
        code: &Concept,
        mut previous: Vec<Constraint>,
    ) -> Vec<Constraint> {
        let mut constraint = constraint.clone();
        let label = constraint_target_label(value, &constraint.path);

        let mut target_constraints = Vec::new();
        if choice.is_none() {
            let Some(target) = self.constraint_target(scope, value, &constraint.path) else {
                self.report(
                    scope,
                    ExpansionError::UnresolvableConstraintTarget {
                        target: label,
                        constraint: ConstraintTag::Code,
                        on_value: constraint.on_value,
                    },
                );
                return previous;
            };

            if !self.supports_code(scope, target.identifier()) {
                let identifier = self
                    .constraint_target_value_identifier(scope, value, &constraint.path)
                    .filter(|id| self.supports_code(scope, Some(id)));
                let Some(identifier) = identifier else {
                    self.report(
                        scope,
                        ExpansionError::NotCodeBearing {
                            target: label,
                            constraint: ConstraintTag::Code,
                        },
                    );
                    return previous;
                };
                if let Some(target_value) = self.constraint_target_value(scope, value, &constraint.path) {
                    target_constraints = target_value
                        .constraints
                        .into_iter()
                        .map(|mut c| {
                            c.path.insert(0, identifier.clone());
                            c
                        })
                        .collect();
                }
                constraint.path.push(identifier);
            }
        }

        let mut code = code.clone();
        self.fill_missing_code_system(&mut code, &constraint, &previous, &target_constraints);
        constraint.kind = ConstraintKind::Code { code: code.clone() };

        let conflicting = ConstraintsFilter::new(&previous)
            .at_path(&constraint.path)
            .of(ConstraintTag::Code)
            .on_value(constraint.on_value)
            .into_vec()
            .into_iter()
            .find_map(|c| match &c.kind {
                ConstraintKind::Code { code: prior } if !prior.same_code(&code) => Some(prior.clone()),
                _ => None,
            });
        if let Some(prior) = conflicting {
            self.report(
                scope,
                ExpansionError::ConflictingFixedCode {
                    target: constraint_target_label(value, &constraint.path),
                    code,
                    previous: prior,
                },
            );
            return previous;
        }

        previous.retain(|c| !at_slot_of(c, &constraint, &[ConstraintTag::Code, ConstraintTag::ValueSet]));
        previous.push(constraint);
        previous
    }

    fn consolidate_includes_code(
        &mut self,
        scope: &Scope,
        value: &Value,
        constraint: &Constraint,
        choice: Option<&Value>,
        code: &Concept,
        mut previous: Vec<Constraint>,
    ) -> Vec<Constraint> {
        let mut constraint = constraint.clone();
        let label = constraint_target_label(value, &constraint.path);

        if choice.is_none() {
            let Some(target) = self.constraint_target(scope, value, &constraint.path) else {
                self.report(
                    scope,
                    ExpansionError::UnresolvableConstraintTarget {
                        target: label,
                        constraint: ConstraintTag::IncludesCode,
                        on_value: constraint.on_value,
                    },
                );
                return previous;
            };

            if !self.supports_code(scope, target.identifier()) {
                let identifier = self
                    .constraint_target_value_identifier(scope, value, &constraint.path)
                    .filter(|id| self.supports_code(scope, Some(id)));
                let Some(identifier) = identifier else {
                    self.report(
                        scope,
                        ExpansionError::NotCodeBearing {
                            target: label,
                            constraint: ConstraintTag::IncludesCode,
                        },
                    );
                    return previous;
                };
                constraint.path.push(identifier);
            }
        }

        let mut code = code.clone();
        self.fill_missing_code_system(&mut code, &constraint, &previous, &[]);

        let duplicate = ConstraintsFilter::new(&previous)
            .at_path(&constraint.path)
            .of(ConstraintTag::IncludesCode)
            .on_value(constraint.on_value)
            .into_vec()
            .into_iter()
            .any(|c| matches!(&c.kind, ConstraintKind::IncludesCode { code: prior } if prior.same_code(&code)));
        if duplicate {
            return previous;
        }

        constraint.kind = ConstraintKind::IncludesCode { code };
        previous.push(constraint);
        previous
    }

    fn consolidate_boolean(
        &mut self,
        scope: &Scope,
        value: &Value,
        constraint: &Constraint,
        choice: Option<&Value>,
        fixed: bool,
        mut previous: Vec<Constraint>,
    ) -> Vec<Constraint> {
        let mut constraint = constraint.clone();
        let label = constraint_target_label(value, &constraint.path);

        if choice.is_none() {
            let Some(target) = self.constraint_target(scope, value, &constraint.path) else {
                self.report(
                    scope,
                    ExpansionError::UnresolvableConstraintTarget {
                        target: label,
                        constraint: ConstraintTag::Boolean,
                        on_value: constraint.on_value,
                    },
                );
                return previous;
            };

            if !Self::supports_boolean(target.identifier()) {
                let identifier = self
                    .constraint_target_value_identifier(scope, value, &constraint.path)
                    .filter(|id| Self::supports_boolean(Some(id)));
                let Some(identifier) = identifier else {
                    self.report(scope, ExpansionError::NotBooleanTyped { target: label });
                    return previous;
                };
                constraint.path.push(identifier);
            }
        }

        let conflicting = ConstraintsFilter::new(&previous)
            .at_path(&constraint.path)
            .of(ConstraintTag::Boolean)
            .on_value(constraint.on_value)
            .into_vec()
            .into_iter()
            .find_map(|c| match c.kind {
                ConstraintKind::Boolean { value: prior } if prior != fixed => Some(prior),
                _ => None,
            });
        if let Some(prior) = conflicting {
            self.report(
                scope,
                ExpansionError::ConflictingFixedBoolean {
                    target: constraint_target_label(value, &constraint.path),
                    value: fixed,
                    previous: prior,
                },
            );
            return previous;
        }

        previous.retain(|c| {
            !at_slot_of(c, &constraint, &[ConstraintTag::Boolean, ConstraintTag::ValueSet])
        });
        previous.push(constraint);
        previous
    }

    /// Infer the code system of a bare code from a value set bound at the
    /// same path that explicitly includes it
    fn fill_missing_code_system(
        &self,
        code: &mut Concept,
        slot: &Constraint,
        previous: &[Constraint],
        target_constraints: &[Constraint],
    ) {
        if code.system.is_some() {
            return;
        }
        let urls = previous
            .iter()
            .chain(target_constraints)
            .filter(|c| c.path == slot.path && c.on_value == slot.on_value)
            .filter_map(|c| match &c.kind {
                ConstraintKind::ValueSet { value_set_url, .. } => Some(value_set_url),
                _ => None,
            });
        for url in urls {
            let Some(value_set) = self.expanded.value_sets.find_by_url(url) else {
                continue;
            };
            if let Some(included) = value_set.included_codes().find(|c| c.code == code.code) {
                trace!("Inferred system {:?} for code {}", included.system, code.code);
                code.system = included.system.clone();
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::config::ExpanderConfig;
    use crate::diagnostics::{DiagnosticCollector, Scope};
    use crate::expand::Expander;
    use crate::model::{
        BindingStrength, Cardinality, Concept, Constraint, ConstraintKind, DataElement, Identifier,
        Specifications, Value, ValueSet, ValueSetRule,
    };

    fn id(name: &str) -> Identifier {
        Identifier::new("shr.test", name)
    }

    const MASS_UNITS_VS: &str = "http://example.org/vs/mass-units";

    fn coding() -> Identifier {
        Identifier::new("shr.core", "CodeableConcept")
    }

    fn specs() -> Specifications {
        let mut specs = Specifications::new();
        for element in [
            DataElement::new(id("Quantity"))
                .with_value(Value::identifiable(Identifier::primitive("decimal")).with_card(Cardinality::bounded(1, 1)))
                .with_field(Value::identifiable(id("Units")).with_card(Cardinality::bounded(0, 1))),
            DataElement::new(id("WeightQuantity")).with_based_on(id("Quantity")),
            DataElement::new(id("Length")).with_based_on(id("Quantity")),
            DataElement::new(id("Units"))
                .with_value(Value::identifiable(coding()).with_card(Cardinality::bounded(1, 1))),
            DataElement::new(coding()),
            DataElement::new(id("Flag"))
                .with_value(Value::identifiable(Identifier::primitive("boolean")).with_card(Cardinality::bounded(1, 1))),
            DataElement::new(id("Range")),
            DataElement::new(id("Measure")).with_value(
                Value::choice(vec![Value::identifiable(id("Quantity")), Value::identifiable(id("Range"))])
                    .with_card(Cardinality::bounded(0, 1)),
            ),
            DataElement::new(id("Amount"))
                .with_value(Value::identifiable(id("Quantity")).with_card(Cardinality::bounded(1, 1))),
            DataElement::new(id("Status"))
                .with_value(Value::identifiable(Identifier::primitive("code")).with_card(Cardinality::bounded(1, 1))),
            DataElement::new(id("Answer")).with_value(
                Value::choice(vec![
                    Value::identifiable(Identifier::primitive("code")),
                    Value::identifiable(Identifier::primitive("boolean")),
                ])
                .with_card(Cardinality::bounded(0, 1)),
            ),
        ] {
            specs.data_elements.add(element).unwrap();
        }
        specs
            .value_sets
            .add(ValueSet {
                identifier: id("UnitsVS"),
                url: "http://example.org/vs/units".to_string(),
                description: None,
                rules: vec![ValueSetRule::IncludesCode {
                    code: Concept::new(Some("http://unitsofmeasure.org"), "kg"),
                }],
            })
            .unwrap();
        specs
            .value_sets
            .add(ValueSet {
                identifier: id("MassUnitsVS"),
                url: MASS_UNITS_VS.to_string(),
                description: None,
                rules: Vec::new(),
            })
            .unwrap();
        specs
    }

    fn consolidate(specs: &Specifications, value: &Value) -> (Vec<Constraint>, DiagnosticCollector) {
        let mut diagnostics = DiagnosticCollector::new();
        let mut expander = Expander::new(specs, ExpanderConfig::default(), &mut diagnostics);
        let constraints = expander.consolidate_constraints(&Scope::root(), value);
        drop(expander);
        (constraints, diagnostics)
    }

    #[test]
    fn test_card_narrowing_supersedes_prior() {
        let specs = specs();
        let value = Value::identifiable(id("Units"))
            .with_card(Cardinality::unbounded(0))
            .with_constraint(Constraint::card(Cardinality::bounded(0, 4)))
            .with_constraint(Constraint::card(Cardinality::bounded(1, 2)));

        let (constraints, diagnostics) = consolidate(&specs, &value);
        assert!(!diagnostics.has_errors());
        assert_eq!(constraints.len(), 1);
        assert_eq!(constraints[0].cardinality(), Some(&Cardinality::bounded(1, 2)));
    }

    #[test]
    fn test_card_widening_is_rejected() {
        let specs = specs();
        let value = Value::identifiable(id("Units"))
            .with_card(Cardinality::bounded(0, 4))
            .with_constraint(Constraint::card(Cardinality::bounded(0, 6)));

        let (constraints, diagnostics) = consolidate(&specs, &value);
        assert!(constraints.is_empty());
        assert_eq!(diagnostics.with_code(12010).count(), 1);
    }

    #[test]
    fn test_card_widening_against_prior_constraint() {
        let specs = specs();
        let value = Value::identifiable(id("Units"))
            .with_card(Cardinality::bounded(0, 4))
            .with_constraint(Constraint::card(Cardinality::bounded(0, 1)))
            .with_constraint(Constraint::card(Cardinality::bounded(0, 3)));

        let (constraints, diagnostics) = consolidate(&specs, &value);
        assert_eq!(constraints.len(), 1);
        assert_eq!(constraints[0].cardinality(), Some(&Cardinality::bounded(0, 1)));
        assert_eq!(diagnostics.with_code(12011).count(), 1);
    }

    #[test]
    fn test_type_narrowing_and_sibling_rejection() {
        let specs = specs();
        let value = Value::identifiable(id("Quantity"))
            .with_card(Cardinality::bounded(1, 1))
            .with_constraint(Constraint::type_of(id("WeightQuantity")))
            .with_constraint(Constraint::type_of(id("Length")));

        let (constraints, diagnostics) = consolidate(&specs, &value);
        assert_eq!(constraints.len(), 1);
        assert_eq!(constraints[0].is_a(), Some(&id("WeightQuantity")));
        assert_eq!(diagnostics.with_code(12015).count(), 1);
    }

    #[test]
    fn test_type_to_unrelated_element_is_rejected() {
        let specs = specs();
        let value = Value::identifiable(id("Quantity"))
            .with_card(Cardinality::bounded(1, 1))
            .with_constraint(Constraint::type_of(id("Units")));

        let (constraints, diagnostics) = consolidate(&specs, &value);
        assert!(constraints.is_empty());
        assert_eq!(diagnostics.with_code(12014).count(), 1);
    }

    #[test]
    fn test_includes_type_must_fit_target_card() {
        let specs = specs();
        let value = Value::identifiable(id("Quantity"))
            .with_card(Cardinality::bounded(0, 2))
            .with_constraint(Constraint::includes_type(id("WeightQuantity"), Cardinality::bounded(0, 1)))
            .with_constraint(Constraint::includes_type(id("Length"), Cardinality::unbounded(0)))
            .with_constraint(Constraint::includes_type(id("WeightQuantity"), Cardinality::bounded(1, 1)));

        let (constraints, diagnostics) = consolidate(&specs, &value);
        assert_eq!(diagnostics.with_code(12021).count(), 1);
        assert_eq!(constraints.len(), 1);
        assert_eq!(constraints[0].cardinality(), Some(&Cardinality::bounded(1, 1)));
    }

    #[test]
    fn test_code_replaces_value_set_and_infers_system() {
        let specs = specs();
        let value = Value::identifiable(id("Units"))
            .with_card(Cardinality::bounded(0, 1))
            .with_constraint(Constraint::value_set("http://example.org/vs/units", BindingStrength::Required))
            .with_constraint(Constraint::code(Concept::new(None, "kg")));

        let (constraints, diagnostics) = consolidate(&specs, &value);
        assert!(!diagnostics.has_errors());
        assert_eq!(constraints.len(), 1);
        assert_eq!(constraints[0].path, vec![coding()]);
        match &constraints[0].kind {
            ConstraintKind::Code { code } => {
                assert_eq!(code.system.as_deref(), Some("http://unitsofmeasure.org"));
            }
            other => panic!("expected a code constraint, got {other:?}"),
        }
    }

    #[test]
    fn test_value_set_after_code_is_rejected() {
        let specs = specs();
        let value = Value::identifiable(coding())
            .with_card(Cardinality::bounded(0, 1))
            .with_constraint(Constraint::code(Concept::new(Some("http://snomed.info/sct"), "123")))
            .with_constraint(Constraint::value_set("http://example.org/vs/units", BindingStrength::Required));

        let (constraints, diagnostics) = consolidate(&specs, &value);
        assert_eq!(constraints.len(), 1);
        assert_eq!(diagnostics.with_code(12024).count(), 1);
    }

    #[test]
    fn test_conflicting_codes() {
        let specs = specs();
        let value = Value::identifiable(coding())
            .with_card(Cardinality::bounded(0, 1))
            .with_constraint(Constraint::code(Concept::new(Some("http://snomed.info/sct"), "123")))
            .with_constraint(Constraint::code(Concept::new(Some("http://snomed.info/sct"), "456")));

        let (constraints, diagnostics) = consolidate(&specs, &value);
        assert_eq!(constraints.len(), 1);
        assert_eq!(diagnostics.with_code(12042).count(), 1);
    }

    #[test]
    fn test_includes_code_deduplicates() {
        let specs = specs();
        let code = Concept::new(Some("http://snomed.info/sct"), "123");
        let value = Value::identifiable(coding())
            .with_card(Cardinality::unbounded(0))
            .with_constraint(Constraint::includes_code(code.clone()))
            .with_constraint(Constraint::includes_code(code));

        let (constraints, diagnostics) = consolidate(&specs, &value);
        assert!(!diagnostics.has_errors());
        assert_eq!(constraints.len(), 1);
    }

    #[test]
    fn test_code_on_non_code_value() {
        let specs = specs();
        let value = Value::identifiable(id("Quantity"))
            .with_card(Cardinality::bounded(1, 1))
            .with_constraint(Constraint::code(Concept::new(None, "kg")));

        let (constraints, diagnostics) = consolidate(&specs, &value);
        assert!(constraints.is_empty());
        assert_eq!(diagnostics.with_code(12025).count(), 1);
    }

    #[test]
    fn test_boolean_through_value_and_conflict() {
        let specs = specs();
        let value = Value::identifiable(id("Flag"))
            .with_card(Cardinality::bounded(0, 1))
            .with_constraint(Constraint::boolean(true))
            .with_constraint(Constraint::boolean(false));

        let (constraints, diagnostics) = consolidate(&specs, &value);
        assert_eq!(constraints.len(), 1);
        assert_eq!(constraints[0].path, vec![Identifier::primitive("boolean")]);
        assert_eq!(diagnostics.with_code(12028).count(), 1);
    }

    #[test]
    fn test_boolean_on_non_boolean() {
        let specs = specs();
        let value = Value::identifiable(id("Quantity"))
            .with_card(Cardinality::bounded(1, 1))
            .with_constraint(Constraint::boolean(true));

        let (_, diagnostics) = consolidate(&specs, &value);
        assert_eq!(diagnostics.with_code(12027).count(), 1);
    }

    #[test]
    fn test_nested_card_constraint() {
        let specs = specs();
        let value = Value::identifiable(id("Quantity"))
            .with_card(Cardinality::bounded(1, 1))
            .with_constraint(Constraint::card(Cardinality::bounded(1, 1)).with_path(vec![id("Units")]))
            .with_constraint(Constraint::card(Cardinality::bounded(0, 3)).with_path(vec![id("Units")]));

        let (constraints, diagnostics) = consolidate(&specs, &value);
        assert_eq!(constraints.len(), 1);
        assert_eq!(constraints[0].cardinality(), Some(&Cardinality::bounded(1, 1)));
        assert_eq!(diagnostics.with_code(12010).count(), 1);
    }

    #[test]
    fn test_unsupported_constraint() {
        let specs = specs();
        let value = Value::identifiable(id("Quantity"))
            .with_card(Cardinality::bounded(1, 1))
            .with_constraint(Constraint::new(ConstraintKind::Unsupported));

        let (constraints, diagnostics) = consolidate(&specs, &value);
        assert!(constraints.is_empty());
        assert_eq!(diagnostics.with_code(12009).count(), 1);
    }

    #[test]
    fn test_on_value_card_targets_the_value() {
        let specs = specs();
        let widening = Value::identifiable(id("Status"))
            .with_card(Cardinality::bounded(0, 1))
            .with_constraint(Constraint::card(Cardinality::bounded(0, 1)).on_value());

        let (constraints, diagnostics) = consolidate(&specs, &widening);
        assert!(constraints.is_empty());
        assert_eq!(diagnostics.with_code(12010).count(), 1);

        let narrowing = Value::identifiable(id("Units"))
            .with_card(Cardinality::bounded(0, 1))
            .with_constraint(Constraint::card(Cardinality::bounded(1, 1)).on_value());

        let (constraints, diagnostics) = consolidate(&specs, &narrowing);
        assert!(!diagnostics.has_errors());
        assert_eq!(constraints.len(), 1);
        assert!(!constraints[0].on_value);
        assert_eq!(constraints[0].path, vec![coding()]);
    }

    #[test]
    fn test_on_value_type_on_identifiable_value_becomes_path() {
        let specs = specs();
        let value = Value::identifiable(id("Amount"))
            .with_card(Cardinality::bounded(0, 1))
            .with_constraint(Constraint::type_of(id("WeightQuantity")).on_value())
            .with_constraint(Constraint::includes_type(id("Length"), Cardinality::bounded(0, 1)).on_value());

        let (constraints, diagnostics) = consolidate(&specs, &value);
        assert!(!diagnostics.has_errors(), "{diagnostics:?}");
        assert_eq!(constraints.len(), 2);
        for constraint in &constraints {
            assert!(!constraint.on_value);
            assert_eq!(constraint.path, vec![id("Quantity")]);
        }
    }

    #[test]
    fn test_on_value_type_on_choice_stays_on_value() {
        let specs = specs();
        let value = Value::identifiable(id("Measure"))
            .with_card(Cardinality::bounded(0, 1))
            .with_constraint(Constraint::type_of(id("WeightQuantity")).on_value())
            .with_constraint(Constraint::type_of(id("Units")).on_value());

        let (constraints, diagnostics) = consolidate(&specs, &value);
        assert_eq!(constraints.len(), 1);
        assert!(constraints[0].on_value);
        assert!(constraints[0].path.is_empty());
        assert_eq!(constraints[0].is_a(), Some(&id("WeightQuantity")));
        assert_eq!(diagnostics.with_code(12012).count(), 1);
    }

    #[test]
    fn test_on_value_includes_type_on_choice_checks_choice_card() {
        let specs = specs();
        let value = Value::identifiable(id("Measure"))
            .with_card(Cardinality::unbounded(0))
            .with_constraint(Constraint::includes_type(id("WeightQuantity"), Cardinality::bounded(0, 1)).on_value())
            .with_constraint(Constraint::includes_type(id("Length"), Cardinality::bounded(0, 3)).on_value());

        let (constraints, diagnostics) = consolidate(&specs, &value);
        assert_eq!(constraints.len(), 1);
        assert!(constraints[0].on_value);
        assert_eq!(constraints[0].is_a(), Some(&id("WeightQuantity")));
        assert_eq!(diagnostics.with_code(12021).count(), 1);
    }

    #[test]
    fn test_on_value_code_on_choice_without_code_option() {
        let specs = specs();
        let value = Value::identifiable(id("Measure"))
            .with_card(Cardinality::bounded(0, 1))
            .with_constraint(Constraint::code(Concept::new(None, "kg")).on_value());

        let (constraints, diagnostics) = consolidate(&specs, &value);
        assert!(constraints.is_empty());
        assert_eq!(diagnostics.with_code(12025).count(), 1);
    }

    #[test]
    fn test_later_value_set_supersedes_earlier() {
        let specs = specs();
        let value = Value::identifiable(coding())
            .with_card(Cardinality::bounded(0, 1))
            .with_constraint(Constraint::value_set("http://example.org/vs/units", BindingStrength::Required))
            .with_constraint(Constraint::value_set(MASS_UNITS_VS, BindingStrength::Extensible));

        let (constraints, diagnostics) = consolidate(&specs, &value);
        assert!(!diagnostics.has_errors());
        assert_eq!(constraints.len(), 1);
        match &constraints[0].kind {
            ConstraintKind::ValueSet { value_set_url, .. } => assert_eq!(value_set_url, MASS_UNITS_VS),
            other => panic!("expected a value set constraint, got {other:?}"),
        }
    }

    #[test]
    fn test_boolean_removes_value_set_on_same_slot() {
        let specs = specs();
        let value = Value::identifiable(id("Answer"))
            .with_card(Cardinality::bounded(0, 1))
            .with_constraint(Constraint::value_set(MASS_UNITS_VS, BindingStrength::Required).on_value())
            .with_constraint(Constraint::boolean(true).on_value());

        let (constraints, diagnostics) = consolidate(&specs, &value);
        assert!(!diagnostics.has_errors(), "{diagnostics:?}");
        assert_eq!(constraints.len(), 1);
        assert!(constraints[0].on_value);
        assert!(matches!(constraints[0].kind, ConstraintKind::Boolean { value: true }));
    }
}
