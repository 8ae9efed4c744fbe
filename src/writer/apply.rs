use std::path::Path;
use std::rc::Rc;

use super::copy::CopyPlan;
use crate::error::Result;
use crate::events::{EventSink, RepairEvent};
use crate::reconcile::validity::ValidityWindow;
use crate::state::data::PendingUpdate;
use crate::state::library::Library;
use crate::state::store::CatalogStore;

/// Log progress every this many updates
const PROGRESS_INTERVAL: usize = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyOutcome {
    pub applied: usize,
    pub skipped_invalid: usize,
    pub failed: usize,
    /// Updates whose id matched no catalog row
    pub unmatched: usize,
}

impl ApplyOutcome {
    /// Nothing applied means the run failed
    pub fn is_success(&self) -> bool {
        self.applied > 0
    }
}

/// Writes corrected timestamps into a duplicate of the catalog
pub struct CatalogWriter {
    copier: CopyPlan,
    validity: ValidityWindow,
    sink: Rc<dyn EventSink>,
}

impl CatalogWriter {
    pub fn new(copier: CopyPlan, sink: Rc<dyn EventSink>) -> Self {
        Self {
            copier,
            validity: ValidityWindow::current(),
            sink,
        }
    }

    pub fn with_validity(mut self, validity: ValidityWindow) -> Self {
        self.validity = validity;
        self
    }

    /// Duplicate `source` to `destination` and apply `updates` to the
    /// duplicate in one transaction. `source` is never opened for writing.
    ///
    /// A duplicate left behind by a failed run is not removed.
    pub fn apply(
        &self,
        updates: &[PendingUpdate],
        source: &Path,
        destination: &Path,
        validate: bool,
    ) -> Result<ApplyOutcome> {
        self.copier.execute(source, destination)?;

        let mut duplicate = Library::open_for_bulk_update(destination)?;
        duplicate.in_transaction(|tx| self.apply_to_store(tx, updates, validate))
    }

    /// Apply each update on its own; one failing row never stops the rest
    pub fn apply_to_store(
        &self,
        store: &dyn CatalogStore,
        updates: &[PendingUpdate],
        validate: bool,
    ) -> ApplyOutcome {
        let mut outcome = ApplyOutcome::default();

        let updates = if validate {
            let kept = self.validity.retain_valid(updates.to_vec(), self.sink.as_ref());
            outcome.skipped_invalid = updates.len() - kept.len();
            kept
        } else {
            updates.to_vec()
        };

        for (i, update) in updates.iter().enumerate() {
            match store.update_timestamp(update.record_id, update.new_timestamp) {
                Ok(0) => {
                    outcome.unmatched += 1;
                    self.sink.emit(RepairEvent::RecordUnmatched {
                        id: update.record_id,
                    });
                }
                Ok(_) => outcome.applied += 1,
                Err(e) => {
                    outcome.failed += 1;
                    self.sink.emit(RepairEvent::RecordWriteWarning {
                        id: update.record_id,
                        error: e.to_string(),
                    });
                }
            }

            if (i + 1) % PROGRESS_INTERVAL == 0 {
                self.sink.emit(RepairEvent::Progress { processed: i + 1 });
            }
        }

        outcome
    }
}
