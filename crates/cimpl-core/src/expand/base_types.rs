//! Subtype checks over the unexpanded inheritance graph

use super::Expander;
use crate::diagnostics::Scope;
use crate::error::ExpansionError;
use crate::model::Identifier;
use tracing::trace;

const CODE_PRIMITIVE: &str = "code";
const BOOLEAN_PRIMITIVE: &str = "boolean";

impl Expander<'_> {
    /// Whether `identifier` is `base` or transitively based on it
    pub(super) fn has_base_type(
        &mut self,
        scope: &Scope,
        identifier: Option<&Identifier>,
        base: Option<&Identifier>,
    ) -> bool {
        let (Some(identifier), Some(base)) = (identifier, base) else {
            return false;
        };
        if identifier == base {
            return true;
        }
        let mut closure = Vec::new();
        self.recursive_based_ons(scope, identifier, &mut closure);
        trace!("{} is based on {:?}", identifier, closure);
        closure.contains(base)
    }

    /// Collect `identifier` and every transitive base into `visited`
    ///
    /// Primitives have no definition and end the walk. The visited list also
    /// terminates cyclic `basedOn` chains.
    pub(super) fn recursive_based_ons(
        &mut self,
        scope: &Scope,
        identifier: &Identifier,
        visited: &mut Vec<Identifier>,
    ) {
        if visited.contains(identifier) || identifier.is_tbd() || identifier.is_special_keyword() {
            return;
        }
        if identifier.is_primitive() {
            visited.push(identifier.clone());
            return;
        }
        let Some(element) = self.unexpanded.data_elements.find(identifier) else {
            self.report(
                scope,
                ExpansionError::UnresolvedElement {
                    identifier: identifier.clone(),
                },
            );
            return;
        };
        let bases: Vec<Identifier> = element.concrete_bases().cloned().collect();
        visited.push(identifier.clone());
        for base in &bases {
            self.recursive_based_ons(scope, base, visited);
        }
    }

    /// Whether codes and value sets can be bound to values of this type
    pub(super) fn supports_code(&mut self, scope: &Scope, identifier: Option<&Identifier>) -> bool {
        let Some(identifier) = identifier else {
            return false;
        };
        if identifier.is_primitive() {
            return identifier.name() == CODE_PRIMITIVE;
        }
        let code_bearing = self.config.code_bearing_types.clone();
        code_bearing
            .iter()
            .any(|base| self.has_base_type(scope, Some(identifier), Some(base)))
    }

    pub(super) fn supports_boolean(identifier: Option<&Identifier>) -> bool {
        identifier.is_some_and(|id| id.is_primitive() && id.name() == BOOLEAN_PRIMITIVE)
    }
}
