//! Resolution of constraint targets and mapping path segments

use super::Expander;
use crate::diagnostics::Scope;
use crate::error::ExpansionError;
use crate::model::{
    Constraint, ConstraintKind, ConstraintTag, ConstraintsFilter, DataElement, Identifier, Value,
};

/// Outcome of matching one path segment against an element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathMatch {
    None,
    One(Identifier),
    /// The segment resolved to a choice; one identifier per option
    Many(Vec<Identifier>),
}

/// Effective identifier of `value`, or of the first choice option, matched by
/// `identifier`
///
/// Qualified identifiers must equal one of the value's possible identifiers;
/// unqualified ones only need a matching name.
pub(super) fn find_match_in_value(value: &Value, identifier: &Identifier) -> Option<Identifier> {
    if let Some(options) = value.options() {
        return options
            .iter()
            .find_map(|option| find_match_in_value(option, identifier));
    }
    let possible = value.possible_identifiers();
    let matched = if identifier.namespace().is_some() {
        possible.iter().any(|candidate| *candidate == identifier)
    } else {
        possible
            .iter()
            .any(|candidate| candidate.name() == identifier.name())
    };
    if matched {
        value.effective_identifier().cloned()
    } else {
        None
    }
}

/// Dotted label naming the target of a constraint, for messages
pub(super) fn constraint_target_label(value: &Value, path: &[Identifier]) -> String {
    let mut label = value.to_string();
    for segment in path {
        label.push('.');
        label.push_str(segment.name());
    }
    label
}

/// The single identifier a value stands for
///
/// A choice qualifies only when every option shares one identifier.
pub(super) fn value_identifier(value: Option<&Value>) -> Option<Identifier> {
    let value = value?;
    if let Some(options) = value.options() {
        let first = options.first()?.identifier()?;
        return options
            .iter()
            .all(|option| option.identifier() == Some(first))
            .then(|| first.clone());
    }
    value.effective_identifier().cloned()
}

impl Expander<'_> {
    /// The value a constraint at `path` below `value` applies to
    ///
    /// An empty path targets `value` itself. A segment naming a choice
    /// option resolves to a copy of that option carrying the choice's
    /// cardinality. Segments not found in the element structure may still
    /// name a type introduced by an includes-type constraint.
    pub(super) fn constraint_target(
        &mut self,
        scope: &Scope,
        value: &Value,
        path: &[Identifier],
    ) -> Option<Value> {
        let Some((last, parents)) = path.split_last() else {
            return Some(value.clone());
        };
        let parent_id = match parents.last() {
            Some(parent) => Some(parent.clone()),
            None => value.constrained_identifier().cloned(),
        };

        if let Some(parent) = parent_id.and_then(|id| self.lookup(&id)) {
            if let Some(target) = self.find_match_value_in_data_element(scope, &parent, last) {
                if !target.is_choice() || last.is_value_keyword() {
                    return Some(target);
                }
                let card = target.effective_card().cloned();
                if let Some(option) = target
                    .aggregate_options()
                    .into_iter()
                    .find(|option| find_match_in_value(option, last).is_some())
                {
                    let mut option = option.clone();
                    option.card = card;
                    return Some(option);
                }
            }
        }

        self.find_matching_includes_type(scope, value, parents, last)
            .and_then(|constraint| match constraint.kind {
                ConstraintKind::IncludesType { is_a, card } => {
                    Some(Value::identifiable(is_a).with_card(card))
                }
                _ => None,
            })
    }

    /// The value of the element a constraint target is typed as
    ///
    /// Only non-primitive identifiable targets have one.
    pub(super) fn constraint_target_value(
        &mut self,
        scope: &Scope,
        value: &Value,
        path: &[Identifier],
    ) -> Option<Value> {
        let target = self.constraint_target(scope, value, path)?;
        let identifier = target.constrained_identifier()?;
        if identifier.is_primitive() {
            return None;
        }
        let identifier = identifier.clone();
        self.lookup(&identifier)?.value.clone()
    }

    pub(super) fn constraint_target_value_identifier(
        &mut self,
        scope: &Scope,
        value: &Value,
        path: &[Identifier],
    ) -> Option<Identifier> {
        let target_value = self.constraint_target_value(scope, value, path);
        value_identifier(target_value.as_ref())
    }

    /// The value or field of `element` matched by `identifier`
    pub(super) fn find_match_value_in_data_element(
        &mut self,
        scope: &Scope,
        element: &DataElement,
        identifier: &Identifier,
    ) -> Option<Value> {
        if identifier.is_tbd() {
            return None;
        }
        if identifier.is_value_keyword() {
            return element.value.clone();
        }
        if identifier.is_special_keyword() {
            return None;
        }

        let mut result: Option<&Value> = None;
        let mut ambiguous = false;
        for candidate in element.values() {
            if find_match_in_value(candidate, identifier).is_some() {
                if result.is_some() {
                    ambiguous = true;
                } else {
                    result = Some(candidate);
                }
            }
        }
        let result = result.cloned();
        if ambiguous {
            self.report(
                scope,
                ExpansionError::AmbiguousPathMatch {
                    field: identifier.fqn(),
                },
            );
        }
        result
    }

    /// The identifier a mapping path segment resolves to within `element`
    pub(super) fn find_match_in_data_element(
        &mut self,
        scope: &Scope,
        element: &DataElement,
        identifier: &Identifier,
    ) -> PathMatch {
        if identifier.is_tbd() {
            return PathMatch::One(identifier.clone());
        }
        if identifier.is_value_keyword() {
            return match &element.value {
                None => {
                    self.report(scope, ExpansionError::NoValueToMap { value_type: None });
                    PathMatch::None
                }
                Some(value) if value.is_choice() => PathMatch::Many(
                    value
                        .aggregate_options()
                        .into_iter()
                        .filter_map(|option| option.effective_identifier().cloned())
                        .collect(),
                ),
                Some(value) => match value.effective_identifier() {
                    Some(effective) => PathMatch::One(effective.clone()),
                    None => {
                        self.report(
                            scope,
                            ExpansionError::NoValueToMap {
                                value_type: Some(value.variant_name().to_string()),
                            },
                        );
                        PathMatch::None
                    }
                },
            };
        }
        if identifier.is_special_keyword() {
            return PathMatch::One(identifier.clone());
        }

        let mut result = None;
        let mut ambiguous = false;
        for candidate in element.values() {
            if let Some(matched) = find_match_in_value(candidate, identifier) {
                if result.is_some() {
                    ambiguous = true;
                } else {
                    result = Some(matched);
                }
            }
        }
        if ambiguous {
            self.report(
                scope,
                ExpansionError::AmbiguousPathMatch {
                    field: identifier.fqn(),
                },
            );
        }
        match result {
            Some(matched) => PathMatch::One(matched),
            None => PathMatch::None,
        }
    }

    /// Includes-type constraint at `path` whose type is `type_to_match`,
    /// searching the value first and then the elements along the path
    pub(super) fn find_matching_includes_type(
        &mut self,
        scope: &Scope,
        value: &Value,
        path: &[Identifier],
        type_to_match: &Identifier,
    ) -> Option<Constraint> {
        let found = ConstraintsFilter::new(&value.constraints)
            .at_path(path)
            .of(ConstraintTag::IncludesType)
            .into_vec()
            .into_iter()
            .find(|constraint| constraint.is_a() == Some(type_to_match))
            .cloned();
        if found.is_some() {
            return found;
        }

        let (first, rest) = path.split_first()?;
        let identifier = value.constrained_identifier()?.clone();
        let element = self.lookup(&identifier)?;
        let next = self.find_match_value_in_data_element(scope, &element, first)?;
        self.find_matching_includes_type(scope, &next, rest, type_to_match)
    }
}
