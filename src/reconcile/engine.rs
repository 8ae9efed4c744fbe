use std::collections::HashSet;
use std::rc::Rc;

use crate::events::{EventSink, RepairEvent};
use crate::paths::probe::{FileProbe, ProbeSource};
use crate::state::data::{CatalogRecord, PendingUpdate, ResolvedEntry, SortKey};

/// Log progress every this many records
const PROGRESS_INTERVAL: usize = 100;

/// Result of one reconciliation pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reconciliation {
    /// Sorted newest first and truncated to the requested limit
    pub entries: Vec<ResolvedEntry>,
    /// Only updates whose record is still among `entries`
    pub updates: Vec<PendingUpdate>,
    pub stats: ReconcileStats,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    pub found_original: usize,
    pub found_remapped: usize,
    pub missing: usize,
}

/// Joins catalog records with the files they point at
pub struct ReconciliationEngine {
    probe: FileProbe,
    sink: Rc<dyn EventSink>,
}

impl ReconciliationEngine {
    pub fn new(probe: FileProbe, sink: Rc<dyn EventSink>) -> Self {
        Self { probe, sink }
    }

    /// Probe every record once, derive updates over the whole input, then
    /// sort and truncate the entries and keep only the updates that still
    /// belong to a listed entry. `limit` of `None` means no limit.
    pub fn reconcile(
        &self,
        records: Vec<CatalogRecord>,
        limit: Option<usize>,
        sort_key: SortKey,
    ) -> Reconciliation {
        let mut result = self.reconcile_in_order(records);

        sort_entries(&mut result.entries, sort_key);
        if let Some(limit) = limit {
            result.entries.truncate(limit);
        }

        let listed: HashSet<i64> = result.entries.iter().map(|e| e.record.id).collect();
        result.updates.retain(|u| listed.contains(&u.record_id));

        result
    }

    /// Same as `reconcile` without sorting or a limit: entries keep the
    /// order the catalog query returned them in
    pub fn reconcile_in_order(&self, records: Vec<CatalogRecord>) -> Reconciliation {
        let mut stats = ReconcileStats::default();
        let mut entries = Vec::with_capacity(records.len());
        let mut updates = Vec::new();

        for (i, record) in records.into_iter().enumerate() {
            let entry = self.resolve(record);

            match (entry.file_exists, entry.path_was_remapped) {
                (true, false) => stats.found_original += 1,
                (true, true) => stats.found_remapped += 1,
                (false, _) => stats.missing += 1,
            }

            if let Some(new_timestamp) = entry.corrected_timestamp() {
                updates.push(PendingUpdate {
                    record_id: entry.record.id,
                    new_timestamp,
                });
            }

            entries.push(entry);

            if (i + 1) % PROGRESS_INTERVAL == 0 {
                self.sink.emit(RepairEvent::Progress { processed: i + 1 });
            }
        }

        Reconciliation {
            entries,
            updates,
            stats,
        }
    }

    /// Build the entry for one record; a record whose file cannot be found
    /// is still listed, just without a resolved path or time
    pub fn resolve(&self, record: CatalogRecord) -> ResolvedEntry {
        match self.probe.probe(&record.file_path) {
            Some(found) => ResolvedEntry {
                resolved_path: Some(found.path),
                resolved_mtime: Some(found.mtime),
                file_exists: true,
                path_was_remapped: found.source == ProbeSource::Remapped,
                record,
            },
            None => ResolvedEntry {
                record,
                resolved_path: None,
                resolved_mtime: None,
                file_exists: false,
                path_was_remapped: false,
            },
        }
    }
}

/// Newest first; entries without a value for the key sink to the bottom.
/// The sort is stable, so ties keep input order.
pub fn sort_entries(entries: &mut [ResolvedEntry], key: SortKey) {
    entries.sort_by(|a, b| key.value(b).cmp(&key.value(a)));
}

/// Treats zero and negative limits as "no limit"
pub fn limit_from_arg(limit: i64) -> Option<usize> {
    if limit <= 0 {
        None
    } else {
        usize::try_from(limit).ok()
    }
}
