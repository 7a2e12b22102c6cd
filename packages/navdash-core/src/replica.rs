/// Client-held copy of server state.
///
/// Loaded data is only ever swapped in wholesale; there is no in-place
/// patching from mutation results. `version` increments on every swap.
use crate::types::{ConfigMap, GroupId, GroupWithSites, Site, SiteId};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Replica {
    groups: Vec<GroupWithSites>,
    configs: ConfigMap,
    version: u64,
}

impl Replica {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn groups(&self) -> &[GroupWithSites] {
        &self.groups
    }

    pub fn configs(&self) -> &ConfigMap {
        &self.configs
    }

    pub fn setting(&self, key: &str) -> Option<&str> {
        self.configs.get(key).map(String::as_str)
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn group(&self, id: GroupId) -> Option<&GroupWithSites> {
        self.groups.iter().find(|g| g.id == id)
    }

    pub fn site(&self, id: SiteId) -> Option<&Site> {
        self.groups.iter().find_map(|g| g.site(id))
    }

    /// Every site in group order, then site order.
    pub fn all_sites(&self) -> impl Iterator<Item = &Site> {
        self.groups.iter().flat_map(|g| g.sites.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub(crate) fn replace_groups(&mut self, groups: Vec<GroupWithSites>) {
        self.groups = groups;
        self.version += 1;
    }

    pub(crate) fn replace_configs(&mut self, configs: ConfigMap) {
        self.configs = configs;
        self.version += 1;
    }

    /// Drop all loaded data (logout, rejected session).
    pub(crate) fn clear(&mut self) {
        self.groups.clear();
        self.configs.clear();
        self.version += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_bumps_version() {
        let mut replica = Replica::new();
        assert_eq!(replica.version(), 0);
        replica.replace_groups(vec![GroupWithSites {
            id: 1,
            name: "Dev".into(),
            order_num: 0,
            sites: vec![],
        }]);
        assert_eq!(replica.version(), 1);
        assert!(replica.group(1).is_some());

        replica.clear();
        assert!(replica.is_empty());
        assert_eq!(replica.version(), 2);
    }
}
