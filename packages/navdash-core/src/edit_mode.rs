/// Edit-mode state machine.
///
/// States: Viewing (initial), ReorderingGroups, ReorderingSites(group).
/// While reordering, the machine owns a draft of the id order that drag
/// gestures rearrange. The replica itself is never touched; saving turns
/// the draft into order entries, cancelling drops it.
use serde::Serialize;

use crate::ordering;
use crate::types::{GroupId, GroupWithSites, OrderEntry, SiteId};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", content = "groupId")]
pub enum EditMode {
    #[default]
    Viewing,
    ReorderingGroups,
    ReorderingSites(GroupId),
}

impl EditMode {
    pub fn is_reordering(&self) -> bool {
        !matches!(self, EditMode::Viewing)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EditModeError {
    #[error("Already reordering ({current:?}); save or cancel first")]
    AlreadyReordering { current: EditMode },

    #[error("Not in a reordering mode that allows this action (current: {current:?})")]
    NotReordering { current: EditMode },

    #[error("Group {0} is not loaded")]
    UnknownGroup(GroupId),
}

#[derive(Debug, Clone, Default)]
enum EditState {
    #[default]
    Viewing,
    ReorderingGroups {
        draft: Vec<GroupId>,
    },
    ReorderingSites {
        group_id: GroupId,
        draft: Vec<SiteId>,
    },
}

#[derive(Debug, Clone, Default)]
pub struct EditModeMachine {
    state: EditState,
}

impl EditModeMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> EditMode {
        match &self.state {
            EditState::Viewing => EditMode::Viewing,
            EditState::ReorderingGroups { .. } => EditMode::ReorderingGroups,
            EditState::ReorderingSites { group_id, .. } => EditMode::ReorderingSites(*group_id),
        }
    }

    /// Viewing -> ReorderingGroups. The draft starts as the current group order.
    pub fn start_group_sort(&mut self, groups: &[GroupWithSites]) -> Result<(), EditModeError> {
        self.ensure_viewing()?;
        self.state = EditState::ReorderingGroups {
            draft: groups.iter().map(|g| g.id).collect(),
        };
        Ok(())
    }

    /// Viewing -> ReorderingSites(group). Sites without an id are left out
    /// of the draft since they cannot be ordered.
    pub fn start_site_sort(
        &mut self,
        groups: &[GroupWithSites],
        group_id: GroupId,
    ) -> Result<(), EditModeError> {
        self.ensure_viewing()?;
        let group = groups
            .iter()
            .find(|g| g.id == group_id)
            .ok_or(EditModeError::UnknownGroup(group_id))?;
        self.state = EditState::ReorderingSites {
            group_id,
            draft: group.sites.iter().filter_map(|s| s.id).collect(),
        };
        Ok(())
    }

    /// Apply a group drag. Ignored (returns false) unless reordering groups
    /// and the gesture actually changed the draft.
    pub fn drag_group(&mut self, active: GroupId, over: GroupId) -> bool {
        match &mut self.state {
            EditState::ReorderingGroups { draft } => apply_drag(draft, active, over),
            _ => false,
        }
    }

    /// Apply a site drag inside `group_id`. Ignored unless that exact group
    /// is being reordered.
    pub fn drag_site(&mut self, group_id: GroupId, active: SiteId, over: SiteId) -> bool {
        match &mut self.state {
            EditState::ReorderingSites {
                group_id: current,
                draft,
            } if *current == group_id => apply_drag(draft, active, over),
            _ => false,
        }
    }

    pub fn group_draft(&self) -> Option<&[GroupId]> {
        match &self.state {
            EditState::ReorderingGroups { draft } => Some(draft),
            _ => None,
        }
    }

    pub fn site_draft(&self) -> Option<(GroupId, &[SiteId])> {
        match &self.state {
            EditState::ReorderingSites { group_id, draft } => Some((*group_id, draft)),
            _ => None,
        }
    }

    /// Order entries to persist for the group draft, resolved against the
    /// groups currently loaded: ids that left the replica are dropped, ids
    /// that arrived since the sort started are appended.
    pub fn group_order(&self, groups: &[GroupWithSites]) -> Result<Vec<OrderEntry>, EditModeError> {
        let draft = self.group_draft().ok_or(EditModeError::NotReordering {
            current: self.mode(),
        })?;
        let resolved = resolve_draft(draft, groups.iter().map(|g| g.id));
        Ok(ordering::order_entries(&resolved))
    }

    /// Order entries to persist for the site draft of `group_id`, resolved
    /// against that group's currently loaded sites.
    pub fn site_order(
        &self,
        groups: &[GroupWithSites],
        group_id: GroupId,
    ) -> Result<Vec<OrderEntry>, EditModeError> {
        match self.site_draft() {
            Some((current, draft)) if current == group_id => {
                let loaded = loaded_site_ids(groups, group_id);
                Ok(ordering::order_entries(&resolve_draft(draft, loaded)))
            }
            _ => Err(EditModeError::NotReordering {
                current: self.mode(),
            }),
        }
    }

    /// Leave any reordering state, dropping the draft. Returns the mode that was left.
    pub fn cancel(&mut self) -> EditMode {
        let previous = self.mode();
        self.state = EditState::Viewing;
        previous
    }

    /// Unconditional return to Viewing after a save, a reload or a logout.
    pub fn reset(&mut self) {
        if self.mode().is_reordering() {
            log::debug!(
                target: "navdash.edit_mode",
                "Abandoning {:?} after reload",
                self.mode()
            );
        }
        self.state = EditState::Viewing;
    }

    /// Groups in the order they should be shown right now: the draft order
    /// while reordering groups, or with one group's sites in draft order
    /// while reordering sites. Draft ids no longer loaded are skipped and
    /// newly loaded ones follow the draft.
    pub fn arrange(&self, groups: &[GroupWithSites]) -> Vec<GroupWithSites> {
        match &self.state {
            EditState::Viewing => groups.to_vec(),
            EditState::ReorderingGroups { draft } => {
                resolve_draft(draft, groups.iter().map(|g| g.id))
                    .into_iter()
                    .filter_map(|id| groups.iter().find(|g| g.id == id).cloned())
                    .collect()
            }
            EditState::ReorderingSites { group_id, draft } => groups
                .iter()
                .map(|group| {
                    if group.id != *group_id {
                        return group.clone();
                    }
                    let mut arranged = group.clone();
                    arranged.sites = resolve_draft(draft, loaded_site_ids(groups, *group_id))
                        .into_iter()
                        .filter_map(|id| group.site(id).cloned())
                        .collect();
                    arranged
                })
                .collect(),
        }
    }

    fn ensure_viewing(&self) -> Result<(), EditModeError> {
        match self.mode() {
            EditMode::Viewing => Ok(()),
            current => Err(EditModeError::AlreadyReordering { current }),
        }
    }
}

/// Draft order restricted to the ids still loaded, followed by loaded ids
/// the draft has not seen yet in their loaded order.
fn resolve_draft(draft: &[i64], loaded: impl IntoIterator<Item = i64>) -> Vec<i64> {
    let loaded: Vec<i64> = loaded.into_iter().collect();
    let mut resolved: Vec<i64> = draft.iter().copied().filter(|id| loaded.contains(id)).collect();
    for id in loaded {
        if !resolved.contains(&id) {
            resolved.push(id);
        }
    }
    resolved
}

fn loaded_site_ids(groups: &[GroupWithSites], group_id: GroupId) -> Vec<SiteId> {
    groups
        .iter()
        .find(|g| g.id == group_id)
        .map(|g| g.sites.iter().filter_map(|s| s.id).collect())
        .unwrap_or_default()
}

fn apply_drag(draft: &mut Vec<i64>, active: i64, over: i64) -> bool {
    if active == over || !draft.contains(&active) || !draft.contains(&over) {
        return false;
    }
    *draft = ordering::move_by_id(std::mem::take(draft), active, over);
    true
}
