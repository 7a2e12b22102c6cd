use crate::document::ImportSite;
use crate::types::Site;
/// Field-level comparison between a stored site and an incoming one.
///
/// The url is the match key and never differs between the two; only the
/// descriptive fields are compared.
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SiteField {
    Name,
    Icon,
    Description,
    Notes,
}

/// Fields whose values differ (exact, case-sensitive comparison).
pub fn changed_fields(existing: &Site, incoming: &ImportSite) -> Vec<SiteField> {
    let mut changed = Vec::new();
    if existing.name != incoming.name {
        changed.push(SiteField::Name);
    }
    if existing.icon != incoming.icon {
        changed.push(SiteField::Icon);
    }
    if existing.description != incoming.description {
        changed.push(SiteField::Description);
    }
    if existing.notes != incoming.notes {
        changed.push(SiteField::Notes);
    }
    changed
}

/// The stored site with the incoming descriptive fields applied.
/// Identity, group and order stay as stored.
pub fn apply_incoming(existing: &Site, incoming: &ImportSite) -> Site {
    Site {
        name: incoming.name.clone(),
        icon: incoming.icon.clone(),
        description: incoming.description.clone(),
        notes: incoming.notes.clone(),
        ..existing.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored() -> Site {
        Site {
            id: Some(10),
            group_id: 1,
            name: "A".into(),
            url: "https://a.com".into(),
            icon: "https://a.com/icon.png".into(),
            description: String::new(),
            notes: "keep".into(),
            order_num: 3,
        }
    }

    fn incoming(name: &str, notes: &str) -> ImportSite {
        ImportSite {
            id: Some(99),
            group_id: 7,
            name: name.into(),
            url: "https://a.com".into(),
            icon: "https://a.com/icon.png".into(),
            description: String::new(),
            notes: notes.into(),
            order_num: 0,
        }
    }

    #[test]
    fn test_identical_fields() {
        assert!(changed_fields(&stored(), &incoming("A", "keep")).is_empty());
    }

    #[test]
    fn test_case_sensitive_differences() {
        assert_eq!(
            changed_fields(&stored(), &incoming("a", "Keep")),
            vec![SiteField::Name, SiteField::Notes]
        );
    }

    #[test]
    fn test_apply_keeps_identity_and_order() {
        let merged = apply_incoming(&stored(), &incoming("A2", "keep"));
        assert_eq!(merged.id, Some(10));
        assert_eq!(merged.group_id, 1);
        assert_eq!(merged.order_num, 3);
        assert_eq!(merged.name, "A2");
    }
}
