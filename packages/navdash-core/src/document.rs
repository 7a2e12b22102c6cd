/// Backup document: the JSON shape written by export and accepted by import.
///
/// ```text
/// { "groups":  [{ "id", "name", "order_num" }],
///   "sites":   [{ "id", "group_id", "name", "url", "icon", "description", "notes", "order_num" }],
///   "configs": { key: value },
///   "version": "1.0",
///   "exportDate": "<RFC 3339>" }
/// ```
///
/// Import input is untrusted. It is first parsed into a `serde_json::Value`
/// and checked member by member into an `ImportDocument`; nothing is
/// deserialized straight into domain entities.
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::replica::Replica;
use crate::storage::StorageError;
use crate::types::{is_blank, ConfigMap, Group, Site};

pub const FORMAT_VERSION: &str = "1.0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportDocument {
    pub groups: Vec<Group>,
    pub sites: Vec<Site>,
    pub configs: ConfigMap,
    pub version: String,
    #[serde(rename = "exportDate")]
    pub export_date: String,
}

impl ExportDocument {
    /// Snapshot the replica: groups in display order, every site flattened
    /// in group order, and the effective settings.
    pub fn from_replica(replica: &Replica, exported_at: DateTime<Utc>) -> Self {
        Self {
            groups: replica.groups().iter().map(|g| g.as_group()).collect(),
            sites: replica.all_sites().cloned().collect(),
            configs: replica.configs().clone(),
            version: FORMAT_VERSION.to_string(),
            export_date: exported_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Default backup file name for a given day.
pub fn export_file_name(date: NaiveDate) -> String {
    format!("navdash-backup_{}.json", date.format("%Y-%m-%d"))
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImportError {
    #[error("Import file is not valid JSON: {0}")]
    Parse(String),

    #[error("Import file must be a JSON object")]
    NotAnObject,

    #[error("Import file is missing `{0}`")]
    MissingMember(&'static str),

    #[error("Import member `{member}` must be {expected}")]
    WrongType {
        member: &'static str,
        expected: &'static str,
    },

    #[error("Invalid entry {index} in `{member}`: {reason}")]
    InvalidEntry {
        member: &'static str,
        index: usize,
        reason: String,
    },
}

impl From<ImportError> for StorageError {
    fn from(e: ImportError) -> Self {
        StorageError::Validation(e.to_string())
    }
}

/// A group as described by an import document. `id` is a reference local
/// to that document, used only to resolve its sites.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportGroup {
    pub id: Option<i64>,
    pub name: String,
    pub order_num: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSite {
    pub id: Option<i64>,
    /// Refers to an `ImportGroup::id` of the same document.
    pub group_id: i64,
    pub name: String,
    pub url: String,
    pub icon: String,
    pub description: String,
    pub notes: String,
    pub order_num: i64,
}

/// Validated import input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportDocument {
    pub groups: Vec<ImportGroup>,
    pub sites: Vec<ImportSite>,
    pub configs: ConfigMap,
}

impl ImportDocument {
    pub fn parse(text: &str) -> Result<Self, ImportError> {
        let value: Value =
            serde_json::from_str(text).map_err(|e| ImportError::Parse(e.to_string()))?;
        Self::from_value(&value)
    }

    /// Check the three required members and every entry in them.
    /// `version` and `exportDate` are informational and not required.
    pub fn from_value(value: &Value) -> Result<Self, ImportError> {
        let root = value.as_object().ok_or(ImportError::NotAnObject)?;

        let groups = member(root, "groups")?
            .as_array()
            .ok_or(ImportError::WrongType {
                member: "groups",
                expected: "an array",
            })?;
        let sites = member(root, "sites")?
            .as_array()
            .ok_or(ImportError::WrongType {
                member: "sites",
                expected: "an array",
            })?;
        let configs = member(root, "configs")?
            .as_object()
            .ok_or(ImportError::WrongType {
                member: "configs",
                expected: "an object",
            })?;

        if let Some(version) = root.get("version").and_then(Value::as_str) {
            if version != FORMAT_VERSION {
                log::warn!(
                    target: "navdash.import",
                    "Import document version {} differs from {}",
                    version,
                    FORMAT_VERSION
                );
            }
        }

        Ok(Self {
            groups: entries(groups, "groups", parse_group)?,
            sites: entries(sites, "sites", parse_site)?,
            configs: parse_configs(configs)?,
        })
    }
}

fn member<'a>(root: &'a Map<String, Value>, name: &'static str) -> Result<&'a Value, ImportError> {
    match root.get(name) {
        None | Some(Value::Null) => Err(ImportError::MissingMember(name)),
        Some(value) => Ok(value),
    }
}

fn entries<T>(
    items: &[Value],
    member: &'static str,
    parse: fn(&Map<String, Value>) -> Result<T, String>,
) -> Result<Vec<T>, ImportError> {
    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let invalid = |reason: String| ImportError::InvalidEntry {
                member,
                index,
                reason,
            };
            let obj = item
                .as_object()
                .ok_or_else(|| invalid("expected an object".to_string()))?;
            parse(obj).map_err(invalid)
        })
        .collect()
}

fn parse_group(obj: &Map<String, Value>) -> Result<ImportGroup, String> {
    Ok(ImportGroup {
        id: opt_int(obj, "id")?,
        name: required_str(obj, "name")?,
        order_num: opt_int(obj, "order_num")?.unwrap_or(0),
    })
}

fn parse_site(obj: &Map<String, Value>) -> Result<ImportSite, String> {
    Ok(ImportSite {
        id: opt_int(obj, "id")?,
        group_id: opt_int(obj, "group_id")?.ok_or("missing `group_id`")?,
        name: required_str(obj, "name")?,
        url: required_str(obj, "url")?,
        icon: opt_str(obj, "icon")?,
        description: opt_str(obj, "description")?,
        notes: opt_str(obj, "notes")?,
        order_num: opt_int(obj, "order_num")?.unwrap_or(0),
    })
}

fn parse_configs(obj: &Map<String, Value>) -> Result<ConfigMap, ImportError> {
    obj.iter()
        .enumerate()
        .map(|(index, (key, value))| match value {
            _ if is_blank(key) => Err(ImportError::InvalidEntry {
                member: "configs",
                index,
                reason: "setting key must not be empty".to_string(),
            }),
            Value::String(s) => Ok((key.clone(), s.clone())),
            _ => Err(ImportError::InvalidEntry {
                member: "configs",
                index,
                reason: format!("value of `{}` must be a string", key),
            }),
        })
        .collect()
}

fn opt_int(obj: &Map<String, Value>, key: &str) -> Result<Option<i64>, String> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && *f >= i64::MIN as f64 && *f < i64::MAX as f64)
                    .map(|f| f as i64)
            })
            .map(Some)
            .ok_or_else(|| format!("`{}` must be an integer", key)),
        Some(_) => Err(format!("`{}` must be a number", key)),
    }
}

fn required_str(obj: &Map<String, Value>, key: &str) -> Result<String, String> {
    match obj.get(key) {
        Some(Value::String(s)) if !is_blank(s) => Ok(s.clone()),
        Some(Value::String(_)) => Err(format!("`{}` must not be empty", key)),
        None | Some(Value::Null) => Err(format!("missing `{}`", key)),
        Some(_) => Err(format!("`{}` must be a string", key)),
    }
}

fn opt_str(obj: &Map<String, Value>, key: &str) -> Result<String, String> {
    match obj.get(key) {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(_) => Err(format!("`{}` must be a string", key)),
    }
}
