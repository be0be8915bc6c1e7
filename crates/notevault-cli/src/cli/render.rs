//! # Rendering
//!
//! Plain-text output for every command. Handlers gather data from the vault and pass
//! it here; nothing in this module touches the vault or prints.
//!
//! Rows start with the 8-character short id so it can be pasted back as an argument.

use chrono::{DateTime, Utc};
use notevault::model::{Container, DeletedRecord, Document, EntityKind, RecordKind, RetentionPolicy};
use notevault::store::RecoveryReport;
use std::fmt::Write as _;
use uuid::Uuid;

pub const SHORT_ID_LEN: usize = 8;
const TIME_WIDTH: usize = 14;
const NAME_WIDTH: usize = 28;

pub fn short_id(id: &Uuid) -> String {
    id.to_string()[..SHORT_ID_LEN].to_string()
}

/// One line of `tree` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeRow {
    pub depth: usize,
    pub id: Uuid,
    pub name: String,
    pub is_folder: bool,
}

pub fn render_path(path: &[Container]) -> String {
    if path.is_empty() {
        return "/".to_string();
    }
    path.iter().fold(String::new(), |mut out, c| {
        out.push('/');
        out.push_str(&c.name);
        out
    })
}

pub fn render_listing(
    path: &[Container],
    folders: &[(Container, usize)],
    documents: &[Document],
    now: DateTime<Utc>,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", render_path(path));

    if folders.is_empty() && documents.is_empty() {
        out.push_str("  (empty)\n");
        return out;
    }

    for (folder, items) in folders {
        let item_word = if *items == 1 { "item" } else { "items" };
        let _ = writeln!(
            out,
            "  {}  {:<width$}  {} {}",
            short_id(&folder.id),
            format!("{}/", folder.name),
            items,
            item_word,
            width = NAME_WIDTH
        );
    }
    for doc in documents {
        let page_word = if doc.pages.len() == 1 { "page" } else { "pages" };
        let _ = writeln!(
            out,
            "  {}  {:<width$}  {} {}  {}",
            short_id(&doc.id),
            doc.name,
            doc.pages.len(),
            page_word,
            format_time_ago(doc.updated_at, now),
            width = NAME_WIDTH
        );
    }
    out
}

pub fn render_tree(rows: &[TreeRow]) -> String {
    if rows.is_empty() {
        return "(empty)\n".to_string();
    }
    let mut out = String::new();
    for row in rows {
        let indent = "  ".repeat(row.depth);
        let suffix = if row.is_folder { "/" } else { "" };
        let _ = writeln!(out, "{}  {}{}{}", short_id(&row.id), indent, row.name, suffix);
    }
    out
}

pub fn render_trash(records: &[DeletedRecord], policy: RetentionPolicy, now: DateTime<Utc>) -> String {
    if records.is_empty() {
        return "Trash is empty.\n".to_string();
    }
    let mut out = String::new();
    for record in records {
        let kind = match record.kind {
            EntityKind::Document => "note  ",
            EntityKind::Container => "folder",
        };
        let expiry = match record.days_remaining(policy, now) {
            None => "kept forever".to_string(),
            Some(0) => "expires today".to_string(),
            Some(1) => "expires in 1 day".to_string(),
            Some(days) => format!("expires in {} days", days),
        };
        let _ = writeln!(
            out,
            "  {}  {}  {:<width$}  deleted {}  {}",
            short_id(&record.id),
            kind,
            record.name,
            format_time_ago(record.deleted_at, now).trim_start(),
            expiry,
            width = NAME_WIDTH
        );
    }
    out
}

pub fn render_recovery(report: &RecoveryReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Loaded {} documents, {} folders, {} trash records.",
        report.documents, report.containers, report.deleted
    );
    let _ = writeln!(
        out,
        "Removed {} leftover temp files.",
        report.removed_temp_files
    );
    if report.total_quarantined() == 0 {
        out.push_str("No quarantined records.\n");
    } else {
        for kind in RecordKind::ALL {
            if let Some(count) = report.quarantined.get(&kind) {
                let _ = writeln!(out, "Quarantined {}s: {}", kind, count);
            }
        }
    }
    out
}

fn format_time_ago(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let duration = now.signed_duration_since(timestamp);
    let formatter = timeago::Formatter::new();
    let time_str = formatter.convert(duration.to_std().unwrap_or_default());
    format!("{:>width$}", time_str, width = TIME_WIDTH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::collections::HashMap;

    fn deleted(name: &str, kind: EntityKind, days_ago: i64, now: DateTime<Utc>) -> DeletedRecord {
        DeletedRecord {
            id: Uuid::new_v4(),
            original_id: Uuid::new_v4(),
            name: name.to_string(),
            kind,
            deleted_at: now - Duration::days(days_ago),
            snapshot: Vec::new(),
            original_parent_id: None,
        }
    }

    #[test]
    fn test_render_path() {
        assert_eq!(render_path(&[]), "/");
        let a = Container::new("School", None);
        let b = Container::new("Biology", Some(a.id));
        assert_eq!(render_path(&[a, b]), "/School/Biology");
    }

    #[test]
    fn test_render_empty_listing() {
        let output = render_listing(&[], &[], &[], Utc::now());
        assert_eq!(output, "/\n  (empty)\n");
    }

    #[test]
    fn test_render_listing_rows() {
        let now = Utc::now();
        let folder = Container::new("Archive", None);
        let mut doc = Document::new("Essay", None);
        doc.updated_at = now - Duration::hours(2);

        let output = render_listing(&[], &[(folder.clone(), 1)], &[doc.clone()], now);
        assert!(output.contains(&short_id(&folder.id)));
        assert!(output.contains("Archive/"));
        assert!(output.contains("1 item"));
        assert!(output.contains("Essay"));
        assert!(output.contains("1 page"));
        assert!(output.contains("2 hours ago"));
        // Folders are listed before documents.
        assert!(output.find("Archive/").unwrap() < output.find("Essay").unwrap());
    }

    #[test]
    fn test_render_tree_indents_by_depth() {
        let rows = vec![
            TreeRow {
                depth: 0,
                id: Uuid::new_v4(),
                name: "Top".into(),
                is_folder: true,
            },
            TreeRow {
                depth: 1,
                id: Uuid::new_v4(),
                name: "Leaf".into(),
                is_folder: false,
            },
        ];
        let output = render_tree(&rows);
        let lines: Vec<&str> = output.lines().collect();
        assert!(lines[0].ends_with("  Top/"));
        assert!(lines[1].ends_with("    Leaf"));
        assert_eq!(render_tree(&[]), "(empty)\n");
    }

    #[test]
    fn test_render_trash_expiry() {
        let now = Utc::now();
        let records = vec![
            deleted("Fresh", EntityKind::Document, 0, now),
            deleted("Old folder", EntityKind::Container, 29, now),
        ];
        let output = render_trash(&records, RetentionPolicy::Days(30), now);
        assert!(output.contains("Fresh"));
        assert!(output.contains("expires in 30 days"));
        assert!(output.contains("folder"));
        assert!(output.contains("expires in 1 day"));

        let forever = render_trash(&records, RetentionPolicy::Forever, now);
        assert!(forever.contains("kept forever"));
        assert_eq!(render_trash(&[], RetentionPolicy::Forever, now), "Trash is empty.\n");
    }

    #[test]
    fn test_render_recovery() {
        let mut report = RecoveryReport {
            removed_temp_files: 2,
            documents: 3,
            containers: 1,
            deleted: 0,
            quarantined: HashMap::new(),
        };
        let clean = render_recovery(&report);
        assert!(clean.contains("Loaded 3 documents, 1 folders, 0 trash records."));
        assert!(clean.contains("Removed 2 leftover temp files."));
        assert!(clean.contains("No quarantined records."));

        report.quarantined.insert(RecordKind::Document, 4);
        let dirty = render_recovery(&report);
        assert!(dirty.contains("Quarantined documents: 4"));
    }
}
