/// In-process persistence backend.
///
/// Keeps groups, sites and settings in memory with:
/// - Monotonic id assignment shared by groups and sites
/// - Atomic order updates (all ids validated before any is applied)
/// - Cascade delete of a group's sites
/// - Switchable offline / unauthorized modes and a write counter, so callers
///   can observe failure handling and "no write happened" guarantees
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicUsize, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{PersistenceClient, StorageError};
use crate::types::{is_blank, ConfigMap, Group, GroupId, OrderEntry, Site, SiteId};

#[derive(Debug, Default)]
struct MemoryState {
    groups: BTreeMap<GroupId, Group>,
    sites: BTreeMap<SiteId, Site>,
    configs: ConfigMap,
}

pub struct MemoryStorage {
    state: RwLock<MemoryState>,
    next_id: AtomicI64,
    authorized: AtomicBool,
    offline: AtomicBool,
    writes: AtomicUsize,
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(MemoryState::default()),
            next_id: AtomicI64::new(1),
            authorized: AtomicBool::new(true),
            offline: AtomicBool::new(false),
            writes: AtomicUsize::new(0),
        }
    }

    /// Reject every call with `Transport` while set.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Reject every call except `is_authorized` with `Unauthorized` while unset.
    pub fn set_authorized(&self, authorized: bool) {
        self.authorized.store(authorized, Ordering::SeqCst);
    }

    /// Number of successful write calls so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn next_id(&self) -> i64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    fn check_access(&self) -> Result<(), StorageError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StorageError::Transport("storage offline".to_string()));
        }
        if !self.authorized.load(Ordering::SeqCst) {
            return Err(StorageError::Unauthorized("session rejected".to_string()));
        }
        Ok(())
    }

    fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::SeqCst);
    }
}

fn require_non_empty(field: &str, value: &str) -> Result<(), StorageError> {
    if is_blank(value) {
        return Err(StorageError::Validation(format!("{} must not be empty", field)));
    }
    Ok(())
}

fn sorted_by_order<T: Clone>(items: impl Iterator<Item = T>, key: impl Fn(&T) -> (i64, i64)) -> Vec<T> {
    let mut items: Vec<T> = items.collect();
    items.sort_by_key(|item| key(item));
    items
}

/// Validate every id before touching anything, then apply.
fn apply_order<T>(
    rows: &mut BTreeMap<i64, T>,
    orders: &[OrderEntry],
    kind: &str,
    set: impl Fn(&mut T, i64),
) -> Result<(), StorageError> {
    if let Some(missing) = orders.iter().find(|o| !rows.contains_key(&o.id)) {
        return Err(StorageError::NotFound(format!("{} {}", kind, missing.id)));
    }
    for order in orders {
        if let Some(row) = rows.get_mut(&order.id) {
            set(row, order.order_num);
        }
    }
    Ok(())
}

#[async_trait]
impl PersistenceClient for MemoryStorage {
    async fn is_authorized(&self) -> Result<bool, StorageError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StorageError::Transport("storage offline".to_string()));
        }
        Ok(self.authorized.load(Ordering::SeqCst))
    }

    async fn list_groups(&self) -> Result<Vec<Group>, StorageError> {
        self.check_access()?;
        let state = self.state.read().await;
        Ok(sorted_by_order(state.groups.values().cloned(), |g| {
            (g.order_num, g.id.unwrap_or_default())
        }))
    }

    async fn list_sites(&self, group_id: GroupId) -> Result<Vec<Site>, StorageError> {
        self.check_access()?;
        let state = self.state.read().await;
        Ok(sorted_by_order(
            state.sites.values().filter(|s| s.group_id == group_id).cloned(),
            |s| (s.order_num, s.id.unwrap_or_default()),
        ))
    }

    async fn create_group(&self, group: &Group) -> Result<Group, StorageError> {
        self.check_access()?;
        require_non_empty("group name", &group.name)?;
        let mut created = group.clone();
        created.id = Some(self.next_id());
        let mut state = self.state.write().await;
        state.groups.insert(created.id.unwrap_or_default(), created.clone());
        self.record_write();
        Ok(created)
    }

    async fn update_group(&self, id: GroupId, group: &Group) -> Result<(), StorageError> {
        self.check_access()?;
        require_non_empty("group name", &group.name)?;
        let mut state = self.state.write().await;
        let existing = state
            .groups
            .get_mut(&id)
            .ok_or_else(|| StorageError::NotFound(format!("group {}", id)))?;
        existing.name = group.name.clone();
        existing.order_num = group.order_num;
        self.record_write();
        Ok(())
    }

    async fn delete_group(&self, id: GroupId) -> Result<(), StorageError> {
        self.check_access()?;
        let mut state = self.state.write().await;
        if state.groups.remove(&id).is_none() {
            return Err(StorageError::NotFound(format!("group {}", id)));
        }
        state.sites.retain(|_, site| site.group_id != id);
        self.record_write();
        Ok(())
    }

    async fn create_site(&self, site: &Site) -> Result<Site, StorageError> {
        self.check_access()?;
        require_non_empty("site name", &site.name)?;
        require_non_empty("site url", &site.url)?;
        let mut state = self.state.write().await;
        if !state.groups.contains_key(&site.group_id) {
            return Err(StorageError::NotFound(format!("group {}", site.group_id)));
        }
        let mut created = site.clone();
        created.id = Some(self.next_id());
        state.sites.insert(created.id.unwrap_or_default(), created.clone());
        self.record_write();
        Ok(created)
    }

    async fn update_site(&self, id: SiteId, site: &Site) -> Result<(), StorageError> {
        self.check_access()?;
        require_non_empty("site name", &site.name)?;
        require_non_empty("site url", &site.url)?;
        let mut state = self.state.write().await;
        let existing = state
            .sites
            .get_mut(&id)
            .ok_or_else(|| StorageError::NotFound(format!("site {}", id)))?;
        // group_id is immutable through update
        let group_id = existing.group_id;
        *existing = Site {
            id: Some(id),
            group_id,
            ..site.clone()
        };
        self.record_write();
        Ok(())
    }

    async fn delete_site(&self, id: SiteId) -> Result<(), StorageError> {
        self.check_access()?;
        let mut state = self.state.write().await;
        if state.sites.remove(&id).is_none() {
            return Err(StorageError::NotFound(format!("site {}", id)));
        }
        self.record_write();
        Ok(())
    }

    async fn set_group_order(&self, orders: &[OrderEntry]) -> Result<(), StorageError> {
        self.check_access()?;
        let mut state = self.state.write().await;
        apply_order(&mut state.groups, orders, "group", |g, n| g.order_num = n)?;
        self.record_write();
        Ok(())
    }

    async fn set_site_order(&self, orders: &[OrderEntry]) -> Result<(), StorageError> {
        self.check_access()?;
        let mut state = self.state.write().await;
        apply_order(&mut state.sites, orders, "site", |s, n| s.order_num = n)?;
        self.record_write();
        Ok(())
    }

    async fn get_config(&self) -> Result<ConfigMap, StorageError> {
        self.check_access()?;
        Ok(self.state.read().await.configs.clone())
    }

    async fn set_config(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.check_access()?;
        require_non_empty("config key", key)?;
        let mut state = self.state.write().await;
        state.configs.insert(key.to_string(), value.to_string());
        self.record_write();
        Ok(())
    }
}
