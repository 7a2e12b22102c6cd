/// Import reconciliation: merge a validated backup document into the
/// current persisted state without creating duplicates.
///
/// Matching rules (exact, case-sensitive, no trimming):
/// - Group by `name`. Match -> merged, the incoming sites attach to the
///   existing group. No match -> created, appended after the existing groups.
/// - Site by `url` within its resolved target group. Match with differing
///   name/icon/description/notes -> updated in place. Match with identical
///   fields -> skipped. No match -> created at the end of the group.
/// - Sites whose `group_id` resolves to no group in the document are skipped.
/// - Every setting is written; keys absent from the document are untouched.
///
/// Entries are processed in document order, so a later duplicate sees the
/// entity an earlier one just created or matched as existing.
use std::collections::hash_map::Entry;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::diff;
use crate::document::ImportDocument;
use crate::storage::{PersistenceClient, StorageError};
use crate::types::{next_order, Group, GroupId, Site};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupStats {
    pub total: usize,
    pub created: usize,
    pub merged: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteStats {
    pub total: usize,
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportStats {
    pub groups: GroupStats,
    pub sites: SiteStats,
}

impl ImportStats {
    /// Every entry seen is accounted for exactly once.
    pub fn is_consistent(&self) -> bool {
        self.groups.total == self.groups.created + self.groups.merged
            && self.sites.total == self.sites.created + self.sites.updated + self.sites.skipped
    }

    pub fn summary(&self) -> String {
        format!(
            "Groups: {} found, {} created, {} merged\nSites: {} found, {} created, {} updated, {} skipped",
            self.groups.total,
            self.groups.created,
            self.groups.merged,
            self.sites.total,
            self.sites.created,
            self.sites.updated,
            self.sites.skipped,
        )
    }
}

/// Outcome of an import as reported to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<ImportStats>,
}

impl ImportResult {
    pub fn succeeded(stats: ImportStats) -> Self {
        Self {
            success: true,
            error: None,
            stats: Some(stats),
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            stats: None,
        }
    }
}

/// Apply `doc` against the state `client` currently holds.
///
/// Current groups and sites are read from the client rather than from any
/// local replica. A persistence error stops the run; writes made before it
/// stay committed.
pub async fn reconcile<P: PersistenceClient + ?Sized>(
    client: &P,
    doc: &ImportDocument,
) -> Result<ImportStats, StorageError> {
    let mut stats = ImportStats::default();

    let existing = client.list_groups().await?;
    let mut next_group_order = next_order(existing.iter().map(|g| g.order_num));
    let mut by_name: HashMap<String, GroupId> = HashMap::new();
    for group in &existing {
        if let Some(id) = group.id {
            by_name.entry(group.name.clone()).or_insert(id);
        }
    }

    // document-local group reference -> resolved group id
    let mut resolved: HashMap<i64, GroupId> = HashMap::new();
    // sites per resolved group, loaded lazily and kept current as we write
    let mut known_sites: HashMap<GroupId, Vec<Site>> = HashMap::new();

    for incoming in &doc.groups {
        stats.groups.total += 1;
        let target = match by_name.get(&incoming.name) {
            Some(&id) => {
                stats.groups.merged += 1;
                id
            }
            None => {
                let created = client
                    .create_group(&Group {
                        id: None,
                        name: incoming.name.clone(),
                        order_num: next_group_order,
                    })
                    .await?;
                let id = created.id.ok_or_else(|| {
                    StorageError::Transport(format!(
                        "created group {:?} came back without an id",
                        incoming.name
                    ))
                })?;
                next_group_order += 1;
                by_name.insert(incoming.name.clone(), id);
                known_sites.insert(id, Vec::new());
                stats.groups.created += 1;
                log::debug!(target: "navdash.import", "Created group {:?} as {}", incoming.name, id);
                id
            }
        };
        if let Some(reference) = incoming.id {
            resolved.entry(reference).or_insert(target);
        }
    }

    for incoming in &doc.sites {
        stats.sites.total += 1;
        let Some(&group_id) = resolved.get(&incoming.group_id) else {
            log::warn!(
                target: "navdash.import",
                "Skipping site {:?}: group reference {} not in document",
                incoming.url,
                incoming.group_id
            );
            stats.sites.skipped += 1;
            continue;
        };

        let sites = match known_sites.entry(group_id) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(client.list_sites(group_id).await?),
        };

        match sites.iter().position(|s| s.url == incoming.url) {
            Some(pos) => {
                if diff::changed_fields(&sites[pos], incoming).is_empty() {
                    stats.sites.skipped += 1;
                    continue;
                }
                let updated = diff::apply_incoming(&sites[pos], incoming);
                let Some(site_id) = updated.id else {
                    log::warn!(
                        target: "navdash.import",
                        "Skipping update of {:?}: stored site has no id",
                        incoming.url
                    );
                    stats.sites.skipped += 1;
                    continue;
                };
                client.update_site(site_id, &updated).await?;
                sites[pos] = updated;
                stats.sites.updated += 1;
            }
            None => {
                let site = Site {
                    id: None,
                    group_id,
                    name: incoming.name.clone(),
                    url: incoming.url.clone(),
                    icon: incoming.icon.clone(),
                    description: incoming.description.clone(),
                    notes: incoming.notes.clone(),
                    order_num: next_order(sites.iter().map(|s| s.order_num)),
                };
                let created = client.create_site(&site).await?;
                sites.push(created);
                stats.sites.created += 1;
            }
        }
    }

    for (key, value) in &doc.configs {
        client.set_config(key, value).await?;
    }

    log::info!(
        target: "navdash.import",
        "Import finished: groups {}/{}/{} (total/created/merged), sites {}/{}/{}/{} (total/created/updated/skipped), {} settings",
        stats.groups.total,
        stats.groups.created,
        stats.groups.merged,
        stats.sites.total,
        stats.sites.created,
        stats.sites.updated,
        stats.sites.skipped,
        doc.configs.len()
    );
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ordering::is_contiguous;
    use crate::storage::memory::MemoryStorage;
    use serde_json::json;

    async fn seed_group(storage: &MemoryStorage, name: &str, order_num: i64) -> GroupId {
        storage
            .create_group(&Group {
                id: None,
                name: name.to_string(),
                order_num,
            })
            .await
            .unwrap()
            .id
            .unwrap()
    }

    async fn seed_site(storage: &MemoryStorage, group_id: GroupId, name: &str, url: &str) -> Site {
        let order_num = storage.list_sites(group_id).await.unwrap().len() as i64;
        storage
            .create_site(&Site {
                id: None,
                group_id,
                name: name.to_string(),
                url: url.to_string(),
                icon: String::new(),
                description: String::new(),
                notes: String::new(),
                order_num,
            })
            .await
            .unwrap()
    }

    fn doc(value: serde_json::Value) -> ImportDocument {
        ImportDocument::from_value(&value).unwrap()
    }

    #[tokio::test]
    async fn test_merge_existing_group_updates_site() {
        let storage = MemoryStorage::new();
        let dev = seed_group(&storage, "Dev", 0).await;
        let site = seed_site(&storage, dev, "A", "https://a.com").await;

        let stats = reconcile(
            &storage,
            &doc(json!({
                "groups": [{ "id": 501, "name": "Dev", "order_num": 0 }],
                "sites": [{ "group_id": 501, "name": "A2", "url": "https://a.com" }],
                "configs": {}
            })),
        )
        .await
        .unwrap();

        assert_eq!(stats.groups, GroupStats { total: 1, created: 0, merged: 1 });
        assert_eq!(
            stats.sites,
            SiteStats { total: 1, created: 0, updated: 1, skipped: 0 }
        );
        let sites = storage.list_sites(dev).await.unwrap();
        assert_eq!(sites.len(), 1);
        assert_eq!(sites[0].id, site.id);
        assert_eq!(sites[0].name, "A2");
        assert_eq!(storage.list_groups().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_identical_site_is_skipped_without_write() {
        let storage = MemoryStorage::new();
        let dev = seed_group(&storage, "Dev", 0).await;
        seed_site(&storage, dev, "A", "https://a.com").await;
        let writes_before = storage.write_count();

        let stats = reconcile(
            &storage,
            &doc(json!({
                "groups": [{ "id": 1, "name": "Dev", "order_num": 0 }],
                "sites": [{ "group_id": 1, "name": "A", "url": "https://a.com", "icon": "", "description": "", "notes": "" }],
                "configs": {}
            })),
        )
        .await
        .unwrap();

        assert_eq!(stats.sites.skipped, 1);
        assert_eq!(storage.write_count(), writes_before);
    }

    #[tokio::test]
    async fn test_new_groups_and_sites_are_created() {
        let storage = MemoryStorage::new();
        seed_group(&storage, "Dev", 0).await;

        let stats = reconcile(
            &storage,
            &doc(json!({
                "groups": [
                    { "id": 1, "name": "News", "order_num": 0 },
                    { "id": 2, "name": "Tools", "order_num": 1 }
                ],
                "sites": [
                    { "group_id": 1, "name": "HN", "url": "https://news.ycombinator.com" },
                    { "group_id": 2, "name": "Regex", "url": "https://regex101.com" },
                    { "group_id": 2, "name": "JSON", "url": "https://jsonlint.com" }
                ],
                "configs": {}
            })),
        )
        .await
        .unwrap();

        assert_eq!(stats.groups, GroupStats { total: 2, created: 2, merged: 0 });
        assert_eq!(stats.sites.created, 3);

        let groups = storage.list_groups().await.unwrap();
        let names: Vec<&str> = groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["Dev", "News", "Tools"]);
        assert!(is_contiguous(groups.iter().map(|g| g.order_num)));

        let tools = groups[2].id.unwrap();
        let sites = storage.list_sites(tools).await.unwrap();
        assert!(is_contiguous(sites.iter().map(|s| s.order_num)));
    }

    #[tokio::test]
    async fn test_duplicates_within_document_first_occurrence_wins() {
        let storage = MemoryStorage::new();

        let stats = reconcile(
            &storage,
            &doc(json!({
                "groups": [
                    { "id": 1, "name": "Dev", "order_num": 0 },
                    { "id": 2, "name": "Dev", "order_num": 1 }
                ],
                "sites": [
                    { "group_id": 1, "name": "A", "url": "https://a.com" },
                    { "group_id": 2, "name": "A", "url": "https://a.com" },
                    { "group_id": 2, "name": "A again", "url": "https://a.com" }
                ],
                "configs": {}
            })),
        )
        .await
        .unwrap();

        assert_eq!(stats.groups, GroupStats { total: 2, created: 1, merged: 1 });
        assert_eq!(
            stats.sites,
            SiteStats { total: 3, created: 1, updated: 1, skipped: 1 }
        );
        let groups = storage.list_groups().await.unwrap();
        assert_eq!(groups.len(), 1);
        let sites = storage.list_sites(groups[0].id.unwrap()).await.unwrap();
        assert_eq!(sites.len(), 1);
        assert_eq!(sites[0].name, "A again");
    }

    #[tokio::test]
    async fn test_url_match_is_case_sensitive_and_scoped_to_group() {
        let storage = MemoryStorage::new();
        let dev = seed_group(&storage, "Dev", 0).await;
        seed_site(&storage, dev, "A", "https://a.com").await;
        let other = seed_group(&storage, "Other", 1).await;

        let stats = reconcile(
            &storage,
            &doc(json!({
                "groups": [
                    { "id": 1, "name": "Dev", "order_num": 0 },
                    { "id": 2, "name": "Other", "order_num": 1 },
                    { "id": 3, "name": "dev", "order_num": 2 }
                ],
                "sites": [
                    { "group_id": 1, "name": "A", "url": "https://A.com" },
                    { "group_id": 2, "name": "A", "url": "https://a.com" }
                ],
                "configs": {}
            })),
        )
        .await
        .unwrap();

        assert_eq!(stats.groups.created, 1);
        assert_eq!(stats.sites.created, 2);
        assert_eq!(storage.list_sites(dev).await.unwrap().len(), 2);
        assert_eq!(storage.list_sites(other).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unresolved_group_reference_is_skipped() {
        let storage = MemoryStorage::new();
        let stats = reconcile(
            &storage,
            &doc(json!({
                "groups": [{ "name": "No id", "order_num": 0 }],
                "sites": [{ "group_id": 42, "name": "A", "url": "https://a.com" }],
                "configs": {}
            })),
        )
        .await
        .unwrap();

        assert_eq!(stats.sites.skipped, 1);
        assert!(stats.is_consistent());
    }

    #[tokio::test]
    async fn test_settings_override_and_leave_others() {
        let storage = MemoryStorage::new();
        storage.set_config("site.title", "Old").await.unwrap();
        storage.set_config("site.name", "Keep").await.unwrap();

        reconcile(
            &storage,
            &doc(json!({
                "groups": [],
                "sites": [],
                "configs": { "site.title": "New", "site.iconApi": "https://icons/{domain}" }
            })),
        )
        .await
        .unwrap();

        let configs = storage.get_config().await.unwrap();
        assert_eq!(configs["site.title"], "New");
        assert_eq!(configs["site.name"], "Keep");
        assert_eq!(configs["site.iconApi"], "https://icons/{domain}");
    }

    #[tokio::test]
    async fn test_import_twice_creates_nothing_second_time() {
        let storage = MemoryStorage::new();
        seed_group(&storage, "Dev", 0).await;
        let document = doc(json!({
            "groups": [
                { "id": 1, "name": "Dev", "order_num": 0 },
                { "id": 2, "name": "Reading", "order_num": 1 }
            ],
            "sites": [
                { "group_id": 1, "name": "A", "url": "https://a.com", "notes": "n" },
                { "group_id": 2, "name": "B", "url": "https://b.com" }
            ],
            "configs": { "site.title": "T" }
        }));

        let first = reconcile(&storage, &document).await.unwrap();
        assert!(first.is_consistent());
        let second = reconcile(&storage, &document).await.unwrap();
        assert!(second.is_consistent());
        assert_eq!(second.groups.created, 0);
        assert_eq!(second.sites.created, 0);
        assert_eq!(second.sites.skipped, 2);
    }

    #[tokio::test]
    async fn test_totals_identity_over_mixed_documents() {
        let documents = [
            json!({ "groups": [], "sites": [], "configs": {} }),
            json!({
                "groups": [{ "id": 1, "name": "Dev" }, { "id": 1, "name": "Dup ref" }],
                "sites": [
                    { "group_id": 1, "name": "A", "url": "https://a.com" },
                    { "group_id": 9, "name": "B", "url": "https://b.com" },
                    { "group_id": 1, "name": "A", "url": "https://a.com" }
                ],
                "configs": {}
            }),
        ];
        for value in documents {
            let storage = MemoryStorage::new();
            seed_group(&storage, "Dev", 0).await;
            let stats = reconcile(&storage, &doc(value)).await.unwrap();
            assert!(stats.is_consistent(), "{:?}", stats);
        }
    }

    #[tokio::test]
    async fn test_persistence_failure_aborts() {
        let storage = MemoryStorage::new();
        storage.set_offline(true);
        let err = reconcile(
            &storage,
            &doc(json!({ "groups": [{ "name": "Dev" }], "sites": [], "configs": {} })),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, StorageError::Transport(_)));
    }

    #[test]
    fn test_summary_and_result() {
        let stats = ImportStats {
            groups: GroupStats { total: 2, created: 1, merged: 1 },
            sites: SiteStats { total: 3, created: 1, updated: 1, skipped: 1 },
        };
        assert!(stats.summary().starts_with("Groups: 2 found, 1 created, 1 merged"));

        let value = serde_json::to_value(ImportResult::succeeded(stats)).unwrap();
        assert_eq!(value["success"], true);
        assert_eq!(value["stats"]["sites"]["skipped"], 1);
        assert!(value.get("error").is_none());

        let failed = ImportResult::failed("bad file");
        assert!(!failed.success);
        assert_eq!(failed.error.as_deref(), Some("bad file"));
    }
}
