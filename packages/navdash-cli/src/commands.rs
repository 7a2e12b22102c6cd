//! Command implementations.
//!
//! Commands drive a `Dashboard` the way the interactive client does: every
//! mutation goes through the controller, reorders are a start/drag/save
//! gesture. Output is written to `out` so tests can capture it.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use navdash_core::config::{DEFAULT_ICON_API, KEY_ICON_API};
use navdash_core::document::export_file_name;
use navdash_core::icon;
use navdash_core::storage::PersistenceClient;
use navdash_core::sync::Dashboard;
use navdash_core::types::{GroupId, NewSite, SiteId};

use crate::cli::{Commands, ConfigAction};
use crate::error::{CliError, Result};

/// Check the session and load the replica. Fails when the token is rejected.
pub async fn connect<P>(dashboard: &mut Dashboard<P>, api_base: &str) -> Result<()>
where
    P: PersistenceClient + ?Sized,
{
    if dashboard.check_session().await? {
        Ok(())
    } else {
        Err(CliError::NotAuthenticated(api_base.to_string()))
    }
}

pub async fn execute<P>(
    dashboard: &mut Dashboard<P>,
    command: Commands,
    out: &mut dyn Write,
) -> Result<()>
where
    P: PersistenceClient + ?Sized,
{
    match command {
        Commands::List { json } => list(dashboard, json, out),
        Commands::Export { output } => export(dashboard, output, out),
        Commands::Import { file, json } => import(dashboard, &file, json, out).await,
        Commands::AddGroup { name } => {
            let group = dashboard.create_group(&name).await?;
            writeln!(out, "Created group {} ({})", group.name, display_id(group.id))?;
            Ok(())
        }
        Commands::RenameGroup { id, name } => rename_group(dashboard, id, name, out).await,
        Commands::DeleteGroup { id } => {
            if !dashboard.delete_group(id).await? {
                return Err(unknown_group(id));
            }
            writeln!(out, "Deleted group {}", id)?;
            Ok(())
        }
        Commands::AddSite {
            group,
            name,
            url,
            icon,
            description,
            notes,
            auto_icon,
        } => {
            let icon = if auto_icon {
                derive_icon(dashboard, &url)
            } else {
                icon.unwrap_or_default()
            };
            let site = dashboard
                .create_site(NewSite {
                    group_id: group,
                    name,
                    url,
                    icon,
                    description: description.unwrap_or_default(),
                    notes: notes.unwrap_or_default(),
                })
                .await?;
            writeln!(out, "Created site {} ({})", site.name, display_id(site.id))?;
            Ok(())
        }
        Commands::EditSite {
            id,
            name,
            url,
            icon,
            description,
            notes,
        } => {
            let mut site = dashboard
                .replica()
                .site(id)
                .cloned()
                .ok_or_else(|| unknown_site(id))?;
            if let Some(name) = name {
                site.name = name;
            }
            if let Some(url) = url {
                site.url = url;
            }
            if let Some(icon) = icon {
                site.icon = icon;
            }
            if let Some(description) = description {
                site.description = description;
            }
            if let Some(notes) = notes {
                site.notes = notes;
            }
            dashboard.update_site(&site).await?;
            writeln!(out, "Updated site {}", id)?;
            Ok(())
        }
        Commands::DeleteSite { id } => {
            if !dashboard.delete_site(id).await? {
                return Err(unknown_site(id));
            }
            writeln!(out, "Deleted site {}", id)?;
            Ok(())
        }
        Commands::MoveGroup { id, over } => move_group(dashboard, id, over, out).await,
        Commands::MoveSite { id, over } => move_site(dashboard, id, over, out).await,
        Commands::Config { action } => config(dashboard, action, out).await,
    }
}

fn display_id(id: Option<i64>) -> String {
    id.map(|id| format!("#{}", id))
        .unwrap_or_else(|| "no id".to_string())
}

fn unknown_group(id: GroupId) -> CliError {
    CliError::user(format!("No group with id {}", id))
}

fn unknown_site(id: SiteId) -> CliError {
    CliError::user(format!("No site with id {}", id))
}

fn list<P>(dashboard: &Dashboard<P>, json: bool, out: &mut dyn Write) -> Result<()>
where
    P: PersistenceClient + ?Sized,
{
    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(dashboard.groups())?)?;
        return Ok(());
    }
    if dashboard.groups().is_empty() {
        writeln!(out, "No groups")?;
        return Ok(());
    }
    for group in dashboard.groups() {
        writeln!(out, "#{} {}", group.id, group.name)?;
        for site in &group.sites {
            writeln!(out, "  {} {}  {}", display_id(site.id), site.name, site.url)?;
        }
    }
    Ok(())
}

fn export<P>(dashboard: &Dashboard<P>, output: Option<PathBuf>, out: &mut dyn Write) -> Result<()>
where
    P: PersistenceClient + ?Sized,
{
    let path = output
        .unwrap_or_else(|| PathBuf::from(export_file_name(chrono::Local::now().date_naive())));
    let document = dashboard.export_document();
    write_atomic(&path, &document.to_json_pretty()?)?;
    log::info!(target: "navdash.cli", "Exported backup to {}", path.display());
    writeln!(
        out,
        "Exported {} groups and {} sites to {}",
        document.groups.len(),
        document.sites.len(),
        path.display()
    )?;
    Ok(())
}

async fn import<P>(
    dashboard: &mut Dashboard<P>,
    file: &Path,
    json: bool,
    out: &mut dyn Write,
) -> Result<()>
where
    P: PersistenceClient + ?Sized,
{
    let text = fs::read_to_string(file)?;
    let result = dashboard.import_json(&text).await;
    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(&result)?)?;
    } else if let Some(stats) = &result.stats {
        writeln!(out, "{}", stats.summary())?;
    }
    if !result.success {
        return Err(CliError::Import(result.error.unwrap_or_default()));
    }
    if let Some(note) = &result.error {
        log::warn!(target: "navdash.cli", "{}", note);
    }
    Ok(())
}

async fn rename_group<P>(
    dashboard: &mut Dashboard<P>,
    id: GroupId,
    name: String,
    out: &mut dyn Write,
) -> Result<()>
where
    P: PersistenceClient + ?Sized,
{
    let mut group = dashboard
        .replica()
        .group(id)
        .map(|g| g.as_group())
        .ok_or_else(|| unknown_group(id))?;
    group.name = name;
    dashboard.update_group(&group).await?;
    writeln!(out, "Renamed group {} to {}", id, group.name)?;
    Ok(())
}

async fn move_group<P>(
    dashboard: &mut Dashboard<P>,
    id: GroupId,
    over: GroupId,
    out: &mut dyn Write,
) -> Result<()>
where
    P: PersistenceClient + ?Sized,
{
    dashboard.start_group_sort()?;
    if !dashboard.drag_group(id, over) {
        dashboard.cancel_sort();
        return Err(CliError::user(format!(
            "Cannot move group {} over group {}",
            id, over
        )));
    }
    dashboard.save_group_order().await?;
    writeln!(out, "Moved group {}", id)?;
    Ok(())
}

async fn move_site<P>(
    dashboard: &mut Dashboard<P>,
    id: SiteId,
    over: SiteId,
    out: &mut dyn Write,
) -> Result<()>
where
    P: PersistenceClient + ?Sized,
{
    let group_id = dashboard
        .replica()
        .site(id)
        .map(|s| s.group_id)
        .ok_or_else(|| unknown_site(id))?;
    dashboard.start_site_sort(group_id)?;
    if !dashboard.drag_site(group_id, id, over) {
        dashboard.cancel_sort();
        return Err(CliError::user(format!(
            "Cannot move site {} over site {}; both must belong to group {}",
            id, over, group_id
        )));
    }
    dashboard.save_site_order(group_id).await?;
    writeln!(out, "Moved site {}", id)?;
    Ok(())
}

async fn config<P>(
    dashboard: &mut Dashboard<P>,
    action: ConfigAction,
    out: &mut dyn Write,
) -> Result<()>
where
    P: PersistenceClient + ?Sized,
{
    match action {
        ConfigAction::Get { key: Some(key) } => {
            let value = dashboard
                .replica()
                .setting(&key)
                .ok_or_else(|| CliError::user(format!("No setting named {}", key)))?;
            writeln!(out, "{}", value)?;
        }
        ConfigAction::Get { key: None } => {
            for (key, value) in dashboard.replica().configs() {
                writeln!(out, "{} = {}", key, value)?;
            }
        }
        ConfigAction::Set { key, value } => {
            let mut edited = dashboard.replica().configs().clone();
            edited.insert(key.clone(), value);
            if dashboard.save_settings(&edited).await? == 0 {
                writeln!(out, "{} unchanged", key)?;
            } else {
                writeln!(out, "Updated {}", key)?;
            }
        }
    }
    Ok(())
}

fn derive_icon<P>(dashboard: &Dashboard<P>, url: &str) -> String
where
    P: PersistenceClient + ?Sized,
{
    let template = dashboard
        .replica()
        .setting(KEY_ICON_API)
        .filter(|t| !t.is_empty())
        .unwrap_or(DEFAULT_ICON_API);
    icon::icon_url(template, url).unwrap_or_else(|| {
        log::warn!(target: "navdash.cli", "No domain in {}, leaving icon empty", url);
        String::new()
    })
}

/// Write via a temp file and rename so a crash never leaves a truncated backup.
fn write_atomic(path: &Path, content: &str) -> std::io::Result<()> {
    let tmp_path = path.with_extension("navdash.tmp");
    let mut file = fs::File::create(&tmp_path)?;
    file.write_all(content.as_bytes())?;
    file.sync_all()?;
    fs::rename(&tmp_path, path)
}
