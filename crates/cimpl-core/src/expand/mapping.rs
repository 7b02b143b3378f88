//! Mapping expansion
//!
//! An element's expanded mapping for a target is its own rules layered over
//! the rules inherited from its bases, with every source path rewritten in
//! terms of effective identifiers.

use super::target::PathMatch;
use super::Expander;
use crate::diagnostics::Scope;
use crate::error::ExpansionError;
use crate::model::{DataElement, ElementMapping, Identifier, Inheritance, MappingRule};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, debug_span, trace};

/// Dotted path with segment `index` marked, for messages
fn highlight_segment(path: &[Identifier], index: usize) -> String {
    path.iter()
        .enumerate()
        .map(|(i, segment)| {
            if i == index {
                format!("<<{}>>", segment.fqn())
            } else {
                segment.fqn()
            }
        })
        .collect::<Vec<_>>()
        .join(".")
}

/// Fold later rules into the slot of the earlier rule they override
fn merge_overrides(rules: &mut Vec<MappingRule>) {
    let mut i = 0;
    while i < rules.len() {
        let earlier = rules[..i].iter().position(|rule| rules[i].overrides(rule));
        match earlier {
            Some(index) => {
                let rule = rules.remove(i);
                rules[index] = rule;
            }
            None => i += 1,
        }
    }
}

impl Expander<'_> {
    pub(super) fn expand_mapping_definition(
        &mut self,
        target_spec: &str,
        identifier: &Identifier,
    ) -> Option<ElementMapping> {
        let span = debug_span!("expand_mapping", shr_id = %identifier, target_spec);
        let _enter = span.enter();
        let scope = Scope::mapping(identifier, target_spec);

        let Some(element) = self.expanded.data_elements.find(identifier).cloned() else {
            self.report(
                &scope,
                ExpansionError::UnresolvedElement {
                    identifier: identifier.clone(),
                },
            );
            return None;
        };

        let mut mapping = self.map_with_inherited_rules(&scope, target_spec, identifier)?;
        let scope = scope.with_target_item(mapping.target_item.as_deref());

        let mut i = 0;
        while i < mapping.rules.len() {
            let Some(path) = mapping.rules[i].source_path().map(<[Identifier]>::to_vec) else {
                i += 1;
                continue;
            };
            match self.resolve_source_path(&scope, &element, path, &mut mapping.rules, i) {
                Some(resolved) => {
                    if let Some(source_path) = mapping.rules[i].source_path_mut() {
                        *source_path = resolved;
                    }
                    i += 1;
                }
                None => {
                    let removed = mapping.rules.remove(i);
                    debug!("Dropped unresolvable rule {}", removed);
                }
            }
        }
        merge_overrides(&mut mapping.rules);

        self.expanded.maps.replace(mapping.clone());
        Some(mapping)
    }

    /// Rewrite each segment of a rule's source path to the identifier it
    /// resolves to
    ///
    /// A segment resolving to a choice inserts one sibling rule per
    /// additional option right after the rule being resolved; those are
    /// resolved in turn by the caller's loop. Only the rule itself is
    /// copied; other rules whose paths continue below the choice are
    /// resolved on their own.
    fn resolve_source_path(
        &mut self,
        scope: &Scope,
        element: &Arc<DataElement>,
        mut path: Vec<Identifier>,
        rules: &mut Vec<MappingRule>,
        rule_index: usize,
    ) -> Option<Vec<Identifier>> {
        let mut current = element.clone();
        for index in 0..path.len() {
            let matched = match self.find_match_in_data_element(scope, &current, &path[index]) {
                PathMatch::One(matched) => Some(matched),
                PathMatch::Many(options) => {
                    let template = rules[rule_index].clone();
                    for (offset, option) in options.iter().enumerate().skip(1) {
                        let mut sibling = template.clone();
                        if let Some(sibling_path) = sibling.source_path_mut() {
                            sibling_path[index] = option.clone();
                        }
                        trace!("Expanded choice into {}", sibling);
                        rules.insert(rule_index + offset, sibling);
                    }
                    options.into_iter().next()
                }
                PathMatch::None => None,
            };

            let Some(matched) = matched else {
                self.report(
                    scope,
                    ExpansionError::UnresolvablePath {
                        path: highlight_segment(&path, index),
                        segment_found: false,
                    },
                );
                return None;
            };
            path[index] = matched.clone();

            if index + 1 < path.len() && !matched.is_tbd() {
                let next = if matched.is_entry_keyword() {
                    self.expanded
                        .data_elements
                        .find(&self.config.entry_element)
                        .cloned()
                } else {
                    self.expanded.data_elements.find(&matched).cloned()
                };
                match next {
                    Some(next) => current = next,
                    None => {
                        self.report(
                            scope,
                            ExpansionError::UnresolvablePath {
                                path: highlight_segment(&path, index),
                                segment_found: true,
                            },
                        );
                        return None;
                    }
                }
            }
        }
        Some(path)
    }

    /// Own and inherited rules of an element, most-derived rules last
    fn map_with_inherited_rules(
        &mut self,
        scope: &Scope,
        target_spec: &str,
        identifier: &Identifier,
    ) -> Option<ElementMapping> {
        let mut visited = HashSet::new();
        let maps = self.collect_maps(scope, target_spec, identifier, &mut visited);
        let first = maps.first()?;

        let mut mapping = ElementMapping::new(identifier.clone(), target_spec, first.target_item.clone());
        if let Some(inherited) = maps.iter().find(|m| &m.identifier != identifier) {
            mapping.inherited_from = Some(inherited.identifier.clone());
            mapping.inheritance = if maps.iter().any(|m| &m.identifier == identifier) {
                Inheritance::Overridden
            } else {
                Inheritance::Inherited
            };
        }

        let mut seen = HashSet::new();
        for map in maps.iter().rev() {
            for rule in &map.rules {
                if seen.insert(rule.to_string()) {
                    let mut rule = rule.clone();
                    if rule.last_modified_by.is_none() {
                        rule.last_modified_by = Some(map.identifier.clone());
                    }
                    mapping.rules.push(rule);
                }
            }
        }
        Some(mapping)
    }

    /// The element's own mapping followed by its bases' mappings, depth
    /// first
    ///
    /// A base mapping onto an unrelated target item is skipped. The result
    /// is empty when no target item can be determined.
    fn collect_maps(
        &mut self,
        scope: &Scope,
        target_spec: &str,
        identifier: &Identifier,
        visited: &mut HashSet<Identifier>,
    ) -> Vec<ElementMapping> {
        if !visited.insert(identifier.clone()) {
            return Vec::new();
        }

        let mut maps: Vec<ElementMapping> = Vec::new();
        let mut anchor: Option<usize> = None;
        if let Some(own) = self.unexpanded.maps.find(target_spec, identifier) {
            maps.push(own.clone());
            anchor = Some(0);
        }

        let bases: Vec<Identifier> = self
            .expanded
            .data_elements
            .find(identifier)
            .map(|element| element.concrete_bases().cloned().collect())
            .unwrap_or_default();
        for base in &bases {
            let base_maps = self.collect_maps(scope, target_spec, base, visited);
            let Some(base_map) = base_maps.first() else {
                continue;
            };
            match anchor {
                None => anchor = Some(maps.len()),
                Some(index) => {
                    match (maps[index].target_item.clone(), base_map.target_item.clone()) {
                        (None, base_item) => maps[index].target_item = base_item,
                        (Some(item), Some(base_item)) if item != base_item => {
                            if !self.is_target_based_on(target_spec, &item, &base_item) {
                                self.report(
                                    scope,
                                    ExpansionError::MismatchedTargetItem {
                                        identifier: identifier.clone(),
                                        target_item: item,
                                        base: base.clone(),
                                        base_item,
                                    },
                                );
                                continue;
                            }
                        }
                        _ => {}
                    }
                }
            }
            maps.extend(base_maps);
        }

        if let Some(index) = anchor {
            if maps[index].target_item.is_none() {
                self.report(
                    scope,
                    ExpansionError::MissingTargetItem {
                        identifier: identifier.clone(),
                    },
                );
                return Vec::new();
            }
        }
        maps
    }

    fn is_target_based_on(&self, target_spec: &str, item: &str, base_item: &str) -> bool {
        self.capabilities
            .get(target_spec)
            .is_some_and(|capabilities| capabilities.is_target_based_on(item, base_item, target_spec))
    }
}
