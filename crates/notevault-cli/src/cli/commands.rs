//! # CLI Layer
//!
//! The **only** place in the workspace that:
//! - Knows about terminal I/O (stdout, stderr)
//! - Installs a logger
//! - Turns user-typed ids into UUIDs
//!
//! ## Responsibilities
//!
//! 1. **Argument Parsing**: clap, see `setup.rs`
//! 2. **Context Setup**: resolve the root, load `notevault.toml`, open the vault
//! 3. **Dispatch**: one handler per command, each returning the text to print
//! 4. **Error Handling**: errors bubble up to `main` as `anyhow::Error`

use super::render::{self, TreeRow};
use super::setup::{Cli, Commands, TrashCommands};
use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use clap::Parser;
use notevault::config::{self, VaultConfig};
use notevault::model::{Entity, EntityKind, RecordKind};
use notevault::store::{FsBackend, Vault};
use std::collections::HashSet;
use uuid::Uuid;

const MIN_PREFIX_LEN: usize = 4;

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let root = cli.root.clone().unwrap_or_else(config::default_root);
    let config = VaultConfig::load(&root)
        .with_context(|| format!("loading config for {}", root.display()))?;
    log::debug!("event=cli_start root={} config={:?}", root.display(), config);

    let vault = Vault::open(root, &config);
    let output = dispatch(&vault, &config, cli.command)?;
    print!("{}", output);
    Ok(())
}

fn init_logging(verbose: bool) {
    let default_level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };
    env_logger::builder()
        .filter_level(default_level)
        .parse_default_env()
        .init();
}

fn dispatch(vault: &Vault<FsBackend>, config: &VaultConfig, command: Commands) -> Result<String> {
    match command {
        Commands::Ls { folder } => list(vault, folder.as_deref()),
        Commands::Tree => tree(vault),
        Commands::New { name, inside } => {
            let parent = resolve_folder_opt(vault, inside.as_deref())?;
            let doc = vault.create_document(&name.join(" "), parent)?;
            Ok(format!("Created document {} ({})\n", doc.name, doc.id))
        }
        Commands::Mkdir { name, inside } => {
            let parent = resolve_folder_opt(vault, inside.as_deref())?;
            let folder = vault.create_container(&name.join(" "), parent)?;
            Ok(format!("Created folder {} ({})\n", folder.name, folder.id))
        }
        Commands::Mv { id, to } => {
            let target = resolve_folder_opt(vault, to.as_deref())?;
            let entity = resolve_entity(vault, &id)?;
            match &entity {
                Entity::Document(doc) => {
                    vault.move_document(&doc.id, target)?;
                }
                Entity::Container(folder) => {
                    vault.move_container(&folder.id, target)?;
                }
            }
            let path = render::render_path(&vault.resolve_path(target)?);
            Ok(format!("Moved {} to {}\n", entity.name(), path))
        }
        Commands::Rename { id, name } => {
            let name = name.join(" ");
            let entity = resolve_entity(vault, &id)?;
            match &entity {
                Entity::Document(doc) => {
                    vault.rename_document(&doc.id, &name)?;
                }
                Entity::Container(folder) => {
                    vault.rename_container(&folder.id, &name)?;
                }
            }
            Ok(format!("Renamed {} to {}\n", entity.name(), name))
        }
        Commands::Rm { id, permanent } => remove(vault, &id, permanent),
        Commands::Path { folder } => {
            let id = resolve_folder(vault, &folder)?;
            Ok(format!("{}\n", render::render_path(&vault.resolve_path(Some(id))?)))
        }
        Commands::Trash { action } => trash(vault, config, action),
        Commands::Doctor => {
            let report = vault.recover()?;
            let mut out = render::render_recovery(&report);
            for kind in RecordKind::ALL {
                for name in vault.quarantined(kind)? {
                    out.push_str(&format!("  {}/quarantine/{}\n", kind.dir_name(), name));
                }
            }
            Ok(out)
        }
    }
}

fn list(vault: &Vault<FsBackend>, folder: Option<&str>) -> Result<String> {
    let parent = resolve_folder_opt(vault, folder)?;
    let path = vault.resolve_path(parent)?;
    let mut folders = Vec::new();
    for container in vault.containers_in(parent)? {
        let count = vault.item_count(Some(container.id))?;
        folders.push((container, count));
    }
    let documents = vault.documents_in(parent)?;
    Ok(render::render_listing(&path, &folders, &documents, Utc::now()))
}

fn tree(vault: &Vault<FsBackend>) -> Result<String> {
    let mut rows = Vec::new();
    let mut seen = HashSet::new();
    collect_tree(vault, None, 0, &mut rows, &mut seen)?;
    Ok(render::render_tree(&rows))
}

fn collect_tree(
    vault: &Vault<FsBackend>,
    parent: Option<Uuid>,
    depth: usize,
    rows: &mut Vec<TreeRow>,
    seen: &mut HashSet<Uuid>,
) -> Result<()> {
    for folder in vault.containers_in(parent)? {
        if !seen.insert(folder.id) {
            continue;
        }
        rows.push(TreeRow {
            depth,
            id: folder.id,
            name: folder.name.clone(),
            is_folder: true,
        });
        collect_tree(vault, Some(folder.id), depth + 1, rows, seen)?;
    }
    for doc in vault.documents_in(parent)? {
        rows.push(TreeRow {
            depth,
            id: doc.id,
            name: doc.name,
            is_folder: false,
        });
    }
    Ok(())
}

fn remove(vault: &Vault<FsBackend>, id: &str, permanent: bool) -> Result<String> {
    let staged = match resolve_entity(vault, id)? {
        Entity::Document(doc) => vault.delete_document(&doc.id, permanent)?,
        Entity::Container(folder) => vault.delete_container(&folder.id, permanent)?,
    };
    if permanent {
        Ok("Deleted permanently.\n".to_string())
    } else {
        let word = if staged.len() == 1 { "item" } else { "items" };
        Ok(format!("Moved {} {} to the trash.\n", staged.len(), word))
    }
}

fn trash(vault: &Vault<FsBackend>, config: &VaultConfig, action: TrashCommands) -> Result<String> {
    let trash = vault.trash();
    match action {
        TrashCommands::Ls => {
            let records = trash.load_all()?;
            Ok(render::render_trash(&records, config.retention(), Utc::now()))
        }
        TrashCommands::Restore { id } => {
            let deleted_id = resolve_deleted(vault, &id)?;
            let entity = vault.restore(&deleted_id)?;
            let kind = match entity.kind() {
                EntityKind::Document => "document",
                EntityKind::Container => "folder",
            };
            let path = render::render_path(&vault.resolve_path(entity.parent_id())?);
            Ok(format!("Restored {} {} to {}\n", kind, entity.name(), path))
        }
        TrashCommands::Purge { id } => {
            let deleted_id = resolve_deleted(vault, &id)?;
            trash.purge(&deleted_id)?;
            Ok("Purged 1 record.\n".to_string())
        }
        TrashCommands::Empty => {
            let purged = trash.purge_all()?;
            Ok(format!("Purged {} records.\n", purged))
        }
        TrashCommands::Sweep => {
            let purged = trash.sweep_expired(config.retention())?;
            Ok(format!("Swept {} expired records.\n", purged))
        }
    }
}

fn resolve_folder_opt(vault: &Vault<FsBackend>, input: Option<&str>) -> Result<Option<Uuid>> {
    input.map(|s| resolve_folder(vault, s)).transpose()
}

fn resolve_folder(vault: &Vault<FsBackend>, input: &str) -> Result<Uuid> {
    let ids: Vec<Uuid> = vault.all_containers()?.iter().map(|c| c.id).collect();
    match_prefix(input, &ids, "folder")
}

fn resolve_entity(vault: &Vault<FsBackend>, input: &str) -> Result<Entity> {
    let mut ids: Vec<Uuid> = vault.all_containers()?.iter().map(|c| c.id).collect();
    ids.extend(vault.all_documents()?.iter().map(|d| d.id));
    let id = match_prefix(input, &ids, "document or folder")?;
    match vault.load_container(&id) {
        Ok(folder) => Ok(Entity::Container(folder)),
        Err(err) if err.is_not_found() => Ok(Entity::Document(vault.load_document(&id)?)),
        Err(err) => Err(err.into()),
    }
}

fn resolve_deleted(vault: &Vault<FsBackend>, input: &str) -> Result<Uuid> {
    let ids: Vec<Uuid> = vault.trash().load_all()?.iter().map(|r| r.id).collect();
    match_prefix(input, &ids, "trash record")
}

/// Matches a full UUID or a unique prefix of one.
fn match_prefix(input: &str, candidates: &[Uuid], what: &str) -> Result<Uuid> {
    if let Ok(id) = Uuid::parse_str(input) {
        if candidates.contains(&id) {
            return Ok(id);
        }
        bail!("no {} with id {}", what, id);
    }

    let needle = input.to_ascii_lowercase();
    if needle.len() < MIN_PREFIX_LEN {
        bail!("id prefix '{}' is too short (need {} characters)", input, MIN_PREFIX_LEN);
    }
    let matches: Vec<&Uuid> = candidates
        .iter()
        .filter(|id| id.to_string().starts_with(&needle))
        .collect();
    match matches.as_slice() {
        [only] => Ok(**only),
        [] => Err(anyhow!("no {} matches '{}'", what, input)),
        many => Err(anyhow!(
            "'{}' is ambiguous: {}",
            input,
            many.iter()
                .map(|id| render::short_id(id))
                .collect::<Vec<_>>()
                .join(", ")
        )),
    }
}
