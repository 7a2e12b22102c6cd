pub mod memory;

use async_trait::async_trait;

use crate::types::{ConfigMap, Group, GroupId, OrderEntry, Site, SiteId};

/// Persistence capability the dashboard is built on.
/// Implementations: MemoryStorage (in-process), the HTTP client in navdash-cli.
///
/// Every call may suspend on I/O. Implementations report a rejected or
/// missing session as `StorageError::Unauthorized`.
#[async_trait]
pub trait PersistenceClient: Send + Sync {
    /// Whether the current session may read and write.
    async fn is_authorized(&self) -> Result<bool, StorageError>;

    async fn list_groups(&self) -> Result<Vec<Group>, StorageError>;

    async fn list_sites(&self, group_id: GroupId) -> Result<Vec<Site>, StorageError>;

    /// Create a group; the returned copy carries the assigned id.
    async fn create_group(&self, group: &Group) -> Result<Group, StorageError>;

    async fn update_group(&self, id: GroupId, group: &Group) -> Result<(), StorageError>;

    /// Delete a group. Its sites go with it.
    async fn delete_group(&self, id: GroupId) -> Result<(), StorageError>;

    /// Create a site; the returned copy carries the assigned id.
    async fn create_site(&self, site: &Site) -> Result<Site, StorageError>;

    async fn update_site(&self, id: SiteId, site: &Site) -> Result<(), StorageError>;

    async fn delete_site(&self, id: SiteId) -> Result<(), StorageError>;

    /// Atomically assign `order_num` for every listed group.
    async fn set_group_order(&self, orders: &[OrderEntry]) -> Result<(), StorageError>;

    /// Atomically assign `order_num` for every listed site.
    async fn set_site_order(&self, orders: &[OrderEntry]) -> Result<(), StorageError>;

    async fn get_config(&self) -> Result<ConfigMap, StorageError>;

    async fn set_config(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    #[error("Invalid data: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Not authorized: {0}")]
    Unauthorized(String),

    #[error("Persistence unavailable: {0}")]
    Transport(String),

    /// Reserved for version-checked writes; neither bundled client produces it.
    #[error("Write conflict: {0}")]
    Conflict(String),
}

impl StorageError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, StorageError::Unauthorized(_))
    }
}
