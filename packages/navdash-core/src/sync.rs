/// Synchronization controller.
///
/// Every structural mutation follows the same path:
///   1. issue the persistence call; on failure leave the replica untouched
///   2. on success return to Viewing and reload groups + sites wholesale
///   3. a failed reload is reported as `SyncError::Reload`: the mutation is
///      committed, the replica stays at its last good state until the next
///      successful reload
///
/// An `Unauthorized` error from any call drops the session: the replica is
/// cleared and edit mode reset.
use std::sync::Arc;

use chrono::Utc;
use futures_util::future::join_all;

use crate::config;
use crate::document::{ExportDocument, ImportDocument};
use crate::edit_mode::{EditMode, EditModeError, EditModeMachine};
use crate::merge::import::{self, ImportResult};
use crate::replica::Replica;
use crate::storage::{PersistenceClient, StorageError};
use crate::types::{
    is_blank, next_order, ConfigMap, Group, GroupId, GroupWithSites, NewSite, Site, SiteId,
};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SyncError {
    /// The mutation itself failed; nothing was committed by this call.
    #[error("{action} failed: {source}")]
    Mutation {
        action: &'static str,
        source: StorageError,
    },

    /// The mutation committed but refreshing the replica failed.
    #[error("{action} succeeded but reloading failed: {source}")]
    Reload {
        action: &'static str,
        source: StorageError,
    },

    /// Rejected before any persistence call.
    #[error("{0}")]
    Invalid(String),

    #[error(transparent)]
    EditMode(#[from] EditModeError),
}

impl SyncError {
    pub fn storage_error(&self) -> Option<&StorageError> {
        match self {
            SyncError::Mutation { source, .. } | SyncError::Reload { source, .. } => Some(source),
            _ => None,
        }
    }

    /// True when the failure means the session is gone.
    pub fn is_unauthorized(&self) -> bool {
        self.storage_error().is_some_and(StorageError::is_unauthorized)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Session {
    #[default]
    Unknown,
    Authenticated,
    Unauthenticated,
}

pub struct Dashboard<P: PersistenceClient + ?Sized> {
    client: Arc<P>,
    replica: Replica,
    edit: EditModeMachine,
    session: Session,
}

impl<P: PersistenceClient + ?Sized> Dashboard<P> {
    pub fn new(client: Arc<P>) -> Self {
        Self {
            client,
            replica: Replica::new(),
            edit: EditModeMachine::new(),
            session: Session::Unknown,
        }
    }

    pub fn client(&self) -> &Arc<P> {
        &self.client
    }

    pub fn replica(&self) -> &Replica {
        &self.replica
    }

    pub fn groups(&self) -> &[GroupWithSites] {
        self.replica.groups()
    }

    pub fn session(&self) -> Session {
        self.session
    }

    pub fn edit_mode(&self) -> EditMode {
        self.edit.mode()
    }

    /// Groups as they should be displayed, with any unsaved drag order applied.
    pub fn arranged_groups(&self) -> Vec<GroupWithSites> {
        self.edit.arrange(self.replica.groups())
    }

    // ── Session ─────────────────────────────────────────────────────────

    /// Ask the persistence layer whether we are authorized. If so, load
    /// data and settings; otherwise drop to the unauthenticated state.
    pub async fn check_session(&mut self) -> Result<bool, SyncError> {
        let authorized = self
            .client
            .is_authorized()
            .await
            .map_err(|source| self.fail("check_session", source))?;
        if !authorized {
            self.drop_session();
            return Ok(false);
        }
        self.session = Session::Authenticated;
        self.reload()
            .await
            .map_err(|source| SyncError::Reload {
                action: "check_session",
                source,
            })?;
        self.reload_settings()
            .await
            .map_err(|source| SyncError::Reload {
                action: "check_session",
                source,
            })?;
        Ok(true)
    }

    pub fn logout(&mut self) {
        log::info!(target: "navdash.sync", "Logged out, discarding replica");
        self.drop_session();
    }

    // ── Reload ──────────────────────────────────────────────────────────

    /// Fetch all groups, keep those with an id, fetch each group's sites
    /// concurrently and swap the result in as the new replica. Nothing is
    /// applied unless every fetch succeeds.
    pub async fn reload(&mut self) -> Result<(), StorageError> {
        match fetch_all(self.client.as_ref()).await {
            Ok(groups) => {
                log::debug!(
                    target: "navdash.sync",
                    "Reloaded {} groups (replica v{})",
                    groups.len(),
                    self.replica.version() + 1
                );
                self.replica.replace_groups(groups);
                Ok(())
            }
            Err(e) => {
                log::warn!(target: "navdash.sync", "Reload failed: {}", e);
                self.note_auth_failure(&e);
                Err(e)
            }
        }
    }

    /// Fetch settings and overlay them on the built-in defaults.
    pub async fn reload_settings(&mut self) -> Result<(), StorageError> {
        match self.client.get_config().await {
            Ok(stored) => {
                self.replica.replace_configs(config::with_defaults(stored));
                Ok(())
            }
            Err(e) => {
                log::warn!(target: "navdash.sync", "Loading settings failed: {}", e);
                self.note_auth_failure(&e);
                Err(e)
            }
        }
    }

    // ── Groups ──────────────────────────────────────────────────────────

    /// Create a group at the end of the current order.
    pub async fn create_group(&mut self, name: &str) -> Result<Group, SyncError> {
        if is_blank(name) {
            return Err(SyncError::Invalid("Group name must not be empty".to_string()));
        }
        let group = Group {
            id: None,
            name: name.to_string(),
            order_num: next_order(self.replica.groups().iter().map(|g| g.order_num)),
        };
        let result = self.client.create_group(&group).await;
        self.settle("create_group", result).await
    }

    /// Update a group. Groups without an id, or not in the replica, are
    /// ignored and `Ok(false)` is returned.
    pub async fn update_group(&mut self, group: &Group) -> Result<bool, SyncError> {
        let Some(id) = group.id.filter(|id| self.replica.group(*id).is_some()) else {
            log::debug!(target: "navdash.sync", "Ignoring update of unknown group {:?}", group.id);
            return Ok(false);
        };
        if is_blank(&group.name) {
            return Err(SyncError::Invalid("Group name must not be empty".to_string()));
        }
        let result = self.client.update_group(id, group).await;
        self.settle("update_group", result).await.map(|_| true)
    }

    pub async fn delete_group(&mut self, id: GroupId) -> Result<bool, SyncError> {
        if self.replica.group(id).is_none() {
            log::debug!(target: "navdash.sync", "Ignoring delete of unknown group {}", id);
            return Ok(false);
        }
        let result = self.client.delete_group(id).await;
        self.settle("delete_group", result).await.map(|_| true)
    }

    // ── Sites ───────────────────────────────────────────────────────────

    /// Create a site at the end of its group.
    pub async fn create_site(&mut self, new_site: NewSite) -> Result<Site, SyncError> {
        if is_blank(&new_site.name) || is_blank(&new_site.url) {
            return Err(SyncError::Invalid(
                "Site name and url must not be empty".to_string(),
            ));
        }
        let group = self.replica.group(new_site.group_id).ok_or_else(|| {
            SyncError::Invalid(format!("Group {} is not loaded", new_site.group_id))
        })?;
        let site = Site {
            id: None,
            group_id: new_site.group_id,
            name: new_site.name,
            url: new_site.url,
            icon: new_site.icon,
            description: new_site.description,
            notes: new_site.notes,
            order_num: group.next_site_order(),
        };
        let result = self.client.create_site(&site).await;
        self.settle("create_site", result).await
    }

    /// Update a site. Sites without an id, or not in the replica, are ignored.
    pub async fn update_site(&mut self, site: &Site) -> Result<bool, SyncError> {
        let Some(id) = site.id.filter(|id| self.replica.site(*id).is_some()) else {
            log::debug!(target: "navdash.sync", "Ignoring update of unknown site {:?}", site.id);
            return Ok(false);
        };
        if is_blank(&site.name) || is_blank(&site.url) {
            return Err(SyncError::Invalid(
                "Site name and url must not be empty".to_string(),
            ));
        }
        let result = self.client.update_site(id, site).await;
        self.settle("update_site", result).await.map(|_| true)
    }

    pub async fn delete_site(&mut self, id: SiteId) -> Result<bool, SyncError> {
        if self.replica.site(id).is_none() {
            log::debug!(target: "navdash.sync", "Ignoring delete of unknown site {}", id);
            return Ok(false);
        }
        let result = self.client.delete_site(id).await;
        self.settle("delete_site", result).await.map(|_| true)
    }

    // ── Reordering ──────────────────────────────────────────────────────

    pub fn start_group_sort(&mut self) -> Result<(), SyncError> {
        Ok(self.edit.start_group_sort(self.replica.groups())?)
    }

    pub fn start_site_sort(&mut self, group_id: GroupId) -> Result<(), SyncError> {
        Ok(self.edit.start_site_sort(self.replica.groups(), group_id)?)
    }

    /// Drag gesture on groups; ignored unless reordering groups.
    pub fn drag_group(&mut self, active: GroupId, over: GroupId) -> bool {
        self.edit.drag_group(active, over)
    }

    /// Drag gesture on sites of `group_id`; ignored unless reordering that group.
    pub fn drag_site(&mut self, group_id: GroupId, active: SiteId, over: SiteId) -> bool {
        self.edit.drag_site(group_id, active, over)
    }

    /// Discard the draft order without persisting anything.
    pub fn cancel_sort(&mut self) -> EditMode {
        self.edit.cancel()
    }

    /// Persist the group draft as contiguous indices, then reload.
    /// On failure the draft is kept so the user can retry or cancel.
    pub async fn save_group_order(&mut self) -> Result<(), SyncError> {
        let orders = self.edit.group_order(self.replica.groups())?;
        let result = self.client.set_group_order(&orders).await;
        self.settle("save_group_order", result).await
    }

    /// Persist the site draft of `group_id` as contiguous indices, then reload.
    pub async fn save_site_order(&mut self, group_id: GroupId) -> Result<(), SyncError> {
        let orders = self.edit.site_order(self.replica.groups(), group_id)?;
        let result = self.client.set_site_order(&orders).await;
        self.settle("save_site_order", result).await
    }

    // ── Settings ────────────────────────────────────────────────────────

    /// Write the settings in `edited` that differ from the replica, then
    /// reload settings. Returns how many keys were written.
    pub async fn save_settings(&mut self, edited: &ConfigMap) -> Result<usize, SyncError> {
        let changed = config::changed_settings(self.replica.configs(), edited);
        for (key, value) in &changed {
            if let Err(source) = self.client.set_config(key, value).await {
                return Err(self.fail("save_settings", source));
            }
        }
        if !changed.is_empty() {
            log::info!(target: "navdash.sync", "Saved {} settings", changed.len());
        }
        self.reload_settings()
            .await
            .map_err(|source| SyncError::Reload {
                action: "save_settings",
                source,
            })?;
        Ok(changed.len())
    }

    // ── Import / export ─────────────────────────────────────────────────

    pub fn export_document(&self) -> ExportDocument {
        ExportDocument::from_replica(&self.replica, Utc::now())
    }

    /// Validate and reconcile an import document, then reload data and
    /// settings. A malformed document performs no writes.
    pub async fn import_json(&mut self, text: &str) -> ImportResult {
        let document = match ImportDocument::parse(text) {
            Ok(document) => document,
            Err(e) => {
                log::warn!(target: "navdash.import", "Rejected import document: {}", e);
                return ImportResult::failed(e.to_string());
            }
        };
        self.import_document(&document).await
    }

    pub async fn import_document(&mut self, document: &ImportDocument) -> ImportResult {
        let stats = match import::reconcile(self.client.as_ref(), document).await {
            Ok(stats) => stats,
            Err(source) => {
                // writes made before the failure stay committed; the replica
                // catches up on the next successful reload
                return ImportResult::failed(self.fail("import", source).to_string());
            }
        };
        self.edit.reset();
        if let Err(e) = self.reload().await {
            return ImportResult {
                success: true,
                error: Some(format!("Import succeeded but reloading failed: {}", e)),
                stats: Some(stats),
            };
        }
        if let Err(e) = self.reload_settings().await {
            return ImportResult {
                success: true,
                error: Some(format!("Import succeeded but reloading settings failed: {}", e)),
                stats: Some(stats),
            };
        }
        ImportResult::succeeded(stats)
    }

    // ── Internals ───────────────────────────────────────────────────────

    /// Second half of every structural mutation: on failure leave state
    /// alone, on success return to Viewing and reload.
    async fn settle<T>(
        &mut self,
        action: &'static str,
        result: Result<T, StorageError>,
    ) -> Result<T, SyncError> {
        let value = result.map_err(|source| self.fail(action, source))?;
        log::info!(target: "navdash.sync", "{} committed", action);
        self.edit.reset();
        self.reload()
            .await
            .map_err(|source| SyncError::Reload { action, source })?;
        Ok(value)
    }

    fn fail(&mut self, action: &'static str, source: StorageError) -> SyncError {
        log::warn!(target: "navdash.sync", "{} failed: {}", action, source);
        self.note_auth_failure(&source);
        SyncError::Mutation { action, source }
    }

    fn note_auth_failure(&mut self, e: &StorageError) {
        if e.is_unauthorized() {
            self.drop_session();
        }
    }

    fn drop_session(&mut self) {
        self.session = Session::Unauthenticated;
        self.replica.clear();
        self.edit.reset();
    }
}

/// Groups first, then every group's sites in parallel. Each result is bound
/// to its group by position in the join, not by completion order.
async fn fetch_all<P: PersistenceClient + ?Sized>(
    client: &P,
) -> Result<Vec<GroupWithSites>, StorageError> {
    let groups: Vec<(GroupId, Group)> = client
        .list_groups()
        .await?
        .into_iter()
        .filter_map(|g| g.id.map(|id| (id, g)))
        .collect();

    let site_lists = join_all(groups.iter().map(|(id, _)| client.list_sites(*id))).await;

    groups
        .into_iter()
        .zip(site_lists)
        .map(|((id, group), sites)| sites.map(|sites| GroupWithSites::from_group(id, group, sites)))
        .collect()
}
