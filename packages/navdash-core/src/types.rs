use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Identity assigned by the persistence layer to a group.
pub type GroupId = i64;
/// Identity assigned by the persistence layer to a site.
pub type SiteId = i64;

/// Flat key/value dashboard settings (`site.title`, `site.iconApi`, ...).
pub type ConfigMap = BTreeMap<String, String>;

/// Anything that may or may not carry a persistence-assigned identity.
/// Entities without one are excluded from id-based operations.
pub trait Identified {
    fn ident(&self) -> Option<i64>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    #[serde(default)]
    pub id: Option<GroupId>,
    pub name: String,
    #[serde(default)]
    pub order_num: i64,
}

/// A single bookmark. `icon`, `description` and `notes` are optional and
/// represented as empty strings when absent, which is also how the export
/// document writes them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    #[serde(default)]
    pub id: Option<SiteId>,
    pub group_id: GroupId,
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub order_num: i64,
}

/// Fields a caller supplies when creating a site. Identity and order are
/// assigned by the dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewSite {
    pub group_id: GroupId,
    pub name: String,
    pub url: String,
    pub icon: String,
    pub description: String,
    pub notes: String,
}

/// A loaded group together with its sites, in display order.
/// Only groups that carry an id make it into the replica, so `id` is required here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupWithSites {
    pub id: GroupId,
    pub name: String,
    pub order_num: i64,
    pub sites: Vec<Site>,
}

impl GroupWithSites {
    pub fn from_group(id: GroupId, group: Group, sites: Vec<Site>) -> Self {
        Self {
            id,
            name: group.name,
            order_num: group.order_num,
            sites,
        }
    }

    /// The persistence view of this group, without its sites.
    pub fn as_group(&self) -> Group {
        Group {
            id: Some(self.id),
            name: self.name.clone(),
            order_num: self.order_num,
        }
    }

    pub fn site(&self, site_id: SiteId) -> Option<&Site> {
        self.sites.iter().find(|s| s.id == Some(site_id))
    }

    /// Order index for a site appended to this group: one past the highest
    /// existing `order_num`, or 0 for an empty group.
    pub fn next_site_order(&self) -> i64 {
        next_order(self.sites.iter().map(|s| s.order_num))
    }
}

/// One past the maximum of the given order indices, 0 when empty.
pub fn next_order(order_nums: impl Iterator<Item = i64>) -> i64 {
    order_nums.max().map(|max| max + 1).unwrap_or(0)
}

/// Names, urls and setting keys made only of whitespace count as missing.
/// Import validation, the dashboard and the in-memory backend must agree on this.
pub fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

/// A single `{id, order_num}` pair sent to the atomic "set ordering" call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderEntry {
    pub id: i64,
    pub order_num: i64,
}

impl Identified for Group {
    fn ident(&self) -> Option<i64> {
        self.id
    }
}

impl Identified for Site {
    fn ident(&self) -> Option<i64> {
        self.id
    }
}

impl Identified for GroupWithSites {
    fn ident(&self) -> Option<i64> {
        Some(self.id)
    }
}

impl Identified for i64 {
    fn ident(&self) -> Option<i64> {
        Some(*self)
    }
}
