//! Lineage of constraints across an inheritance chain

use super::{Constraint, ConstraintTag, Identifier};
use serde::{Deserialize, Serialize};

/// A constraint together with the element that introduced it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConstraintHistoryItem {
    pub constraint: Constraint,
    pub source: Identifier,
}

/// Ordered constraint lineage, oldest first
///
/// Each constraint appears once; the recorded source is the first element
/// that contributed it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConstraintHistory {
    items: Vec<ConstraintHistoryItem>,
}

impl ConstraintHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `constraint` as introduced by `source`, unless already present
    pub fn add(&mut self, constraint: &Constraint, source: &Identifier) {
        if self.contains(constraint) {
            return;
        }
        let mut constraint = constraint.clone();
        constraint.last_modified_by = None;
        self.items.push(ConstraintHistoryItem {
            constraint,
            source: source.clone(),
        });
    }

    /// Inherit every entry of an ancestor's history
    pub fn merge_from(&mut self, other: &ConstraintHistory) {
        for item in &other.items {
            self.add(&item.constraint, &item.source);
        }
    }

    pub fn contains(&self, constraint: &Constraint) -> bool {
        self.items.iter().any(|item| item.constraint.same_as(constraint))
    }

    pub fn items(&self) -> &[ConstraintHistoryItem] {
        &self.items
    }

    pub fn by_tag(&self, tag: ConstraintTag) -> impl Iterator<Item = &ConstraintHistoryItem> {
        self.items
            .iter()
            .filter(move |item| item.constraint.tag() == tag)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Cardinality;

    #[test]
    fn test_add_deduplicates_by_constraint_identity() {
        let a = Identifier::new("shr.test", "A");
        let b = Identifier::new("shr.test", "B");
        let card = Constraint::card(Cardinality::bounded(0, 1));

        let mut history = ConstraintHistory::new();
        history.add(&card, &a);
        history.add(&card.clone().modified_by(b.clone()), &b);
        history.add(&Constraint::boolean(true), &b);

        assert_eq!(history.len(), 2);
        assert_eq!(history.items()[0].source, a);
        assert_eq!(history.by_tag(ConstraintTag::Boolean).count(), 1);
    }

    #[test]
    fn test_merge_from_keeps_ancestor_first() {
        let a = Identifier::new("shr.test", "A");
        let b = Identifier::new("shr.test", "B");
        let mut parent = ConstraintHistory::new();
        parent.add(&Constraint::boolean(true), &a);

        let mut child = ConstraintHistory::new();
        child.merge_from(&parent);
        child.add(&Constraint::boolean(true), &b);
        child.add(&Constraint::card(Cardinality::bounded(1, 1)), &b);

        let sources: Vec<_> = child.items().iter().map(|i| i.source.name()).collect();
        assert_eq!(sources, vec!["A", "B"]);
    }
}
