use indexmap::IndexMap;
use std::collections::HashSet;

/// What the mapping expander needs to know about a target specification
pub trait TargetCapabilities {
    /// Whether `item` is the same as, or derives from, `base_item` in `target_spec`
    fn is_target_based_on(&self, item: &str, base_item: &str, target_spec: &str) -> bool;
}

/// Capabilities backed by the `targets` table of the configuration
#[derive(Debug, Clone, Default)]
pub struct ConfiguredTargets {
    parents: IndexMap<String, Vec<String>>,
}

impl ConfiguredTargets {
    pub fn new(parents: IndexMap<String, Vec<String>>) -> Self {
        Self { parents }
    }
}

impl TargetCapabilities for ConfiguredTargets {
    fn is_target_based_on(&self, item: &str, base_item: &str, _target_spec: &str) -> bool {
        let mut visited = HashSet::new();
        let mut stack = vec![item];
        while let Some(current) = stack.pop() {
            if current == base_item {
                return true;
            }
            if !visited.insert(current) {
                continue;
            }
            if let Some(parents) = self.parents.get(current) {
                stack.extend(parents.iter().map(String::as_str));
            }
        }
        false
    }
}
