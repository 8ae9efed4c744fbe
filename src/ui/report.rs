//! Terminal reports printed to stdout

use serde::Serialize;
use std::path::Path;

use crate::paths::analysis::{PathAnalysis, PathStatus};
use crate::reconcile::validity::ValidityWindow;
use crate::snapshot::analysis::SnapshotSummary;
use crate::snapshot::codec::ImportOutcome;
use crate::state::data::ResolvedEntry;
use crate::writer::apply::ApplyOutcome;

const RULE_WIDTH: usize = 140;

/// Cut `text` to at most `max` characters
fn clip(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// One table line per entry, flagging file times outside `window`
pub fn print_entries(entries: &[ResolvedEntry], window: &ValidityWindow) {
    if entries.is_empty() {
        println!("No entries found.");
        return;
    }

    let invalid = entries
        .iter()
        .filter_map(|e| e.resolved_mtime)
        .filter(|t| !window.is_valid_time(t))
        .count();

    println!("\nTop {} Media Items (with path mapping):", entries.len());
    if invalid > 0 {
        println!("⚠️  Found {invalid} files with invalid timestamps (future/past dates)");
    }
    println!("{}", "=".repeat(RULE_WIDTH));
    println!(
        "{:<30} {:<3} {:<20} {:<6} {:<8} {:<25}",
        "Title", "Lib", "File Modified", "Mapped", "Status", "File"
    );
    println!("{}", "-".repeat(RULE_WIDTH));

    for entry in entries {
        println!("{}", entry_line(entry, window));
    }
}

fn entry_line(entry: &ResolvedEntry, window: &ValidityWindow) -> String {
    let title = clip(entry.record.title.as_deref().unwrap_or("N/A"), 29);
    let library = entry
        .record
        .library_section_id
        .map_or_else(|| "N/A".to_string(), |id| id.to_string());

    let modified = match entry.resolved_mtime {
        Some(t) if window.is_valid_time(&t) => t.format("%Y-%m-%d %H:%M:%S").to_string(),
        Some(t) => format!("{} ⚠️", t.format("%Y-%m-%d %H:%M:%S")),
        None => "N/A".to_string(),
    };

    let mapped = if entry.path_was_remapped { "Yes" } else { "No" };
    let status = if entry.file_exists { "Found" } else { "Missing" };

    let shown_path = entry
        .resolved_path
        .as_deref()
        .unwrap_or(&entry.record.file_path);
    let file_name = Path::new(shown_path)
        .file_name()
        .map(|n| clip(&n.to_string_lossy(), 24))
        .unwrap_or_else(|| "N/A".to_string());

    format!("{title:<30} {library:<3} {modified:<20} {mapped:<6} {status:<8} {file_name:<25}")
}

pub fn print_path_analysis(analysis: &PathAnalysis) {
    for check in &analysis.checks {
        let label = match check.status {
            PathStatus::Original => "ORIGINAL",
            PathStatus::Mapped => "MAPPED",
            PathStatus::Missing => "MISSING",
        };
        println!("{label:<8} {}", check.catalog_path);
        if let Some(mapped) = &check.mapped_path {
            println!("         -> {mapped}");
        }
    }

    println!("\nPath Mapping Analysis:");
    println!("{}", "=".repeat(60));
    println!("Total files checked: {}", analysis.total);
    println!("Files found at original path: {}", analysis.original_exists);
    println!("Files found via mapping: {}", analysis.mapped_exists);
    println!("Files still missing: {}", analysis.still_missing);
    println!("Success rate: {:.1}%", analysis.success_rate());
}

pub fn print_snapshot_summary(path: &Path, summary: &SnapshotSummary) {
    println!("\nCSV Analysis for: {}", path.display());
    println!("{}", "=".repeat(60));
    println!("Total records: {}", summary.total);
    println!(
        "Files found: {} ({:.1}%)",
        summary.files_found,
        summary.found_percent()
    );
    println!(
        "Files missing: {} ({:.1}%)",
        summary.files_missing,
        summary.missing_percent()
    );
    println!("Paths mapped: {}", summary.paths_mapped);
    println!("Updates pending: {}", summary.updates_pending);
    if summary.rows_skipped > 0 {
        println!("Unreadable rows: {}", summary.rows_skipped);
    }
    println!("\nRecords by library:");
    for (library, count) in &summary.libraries {
        println!("  Library {library}: {count} records");
    }
}

pub fn print_import_outcome(outcome: &ImportOutcome) {
    println!(
        "Read {} rows: {} updates, {} without a file, {} unparseable, {} with invalid dates",
        outcome.rows_read,
        outcome.updates.len(),
        outcome.skipped_missing_file,
        outcome.skipped_unparseable,
        outcome.skipped_invalid
    );
}

pub fn print_apply_outcome(outcome: &ApplyOutcome, destination: &Path) {
    if outcome.is_success() {
        println!(
            "✅ Updated {} items in {}",
            outcome.applied,
            destination.display()
        );
    } else {
        println!("No items were updated in {}", destination.display());
    }
    if outcome.skipped_invalid > 0 {
        println!("   Skipped {} invalid timestamps", outcome.skipped_invalid);
    }
    if outcome.failed > 0 || outcome.unmatched > 0 {
        println!(
            "   {} updates failed, {} matched no item",
            outcome.failed, outcome.unmatched
        );
    }
}

pub fn print_json<T: Serialize>(value: &T) -> serde_json::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
