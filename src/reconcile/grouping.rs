//! Mapping of check group names to remote group ids.

use std::collections::HashMap;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupingPolicy {
    default_group_id: i64,
    groups: HashMap<String, i64>,
}

impl GroupingPolicy {
    pub fn new(default_group_id: i64, groups: HashMap<String, i64>) -> Self {
        Self {
            default_group_id,
            groups,
        }
    }

    /// The mapped id for a known group name, otherwise the default.
    /// A missing or empty group name always gets the default.
    pub fn resolve(&self, group: Option<&str>) -> i64 {
        group
            .filter(|g| !g.is_empty())
            .and_then(|g| self.groups.get(g))
            .copied()
            .unwrap_or(self.default_group_id)
    }
}
