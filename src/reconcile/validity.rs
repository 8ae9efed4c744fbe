use chrono::{DateTime, Datelike, Utc};

use crate::events::{EventSink, RepairEvent};
use crate::state::data::PendingUpdate;

/// Earliest calendar year a timestamp may fall in
pub const MIN_VALID_YEAR: i32 = 1970;

/// Calendar years a corrected timestamp may fall in, inclusive.
///
/// Rejects epoch-zero leftovers and far-future values from bad clocks
/// without needing to know how old the collection really is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidityWindow {
    pub min_year: i32,
    pub max_year: i32,
}

impl ValidityWindow {
    /// [1970, current year + 1]
    pub fn current() -> Self {
        Self::for_year(Utc::now().year())
    }

    pub fn for_year(current_year: i32) -> Self {
        Self {
            min_year: MIN_VALID_YEAR,
            max_year: current_year + 1,
        }
    }

    pub fn contains_year(&self, year: i32) -> bool {
        (self.min_year..=self.max_year).contains(&year)
    }

    pub fn is_valid(&self, timestamp: i64) -> bool {
        DateTime::from_timestamp(timestamp, 0).is_some_and(|dt| self.contains_year(dt.year()))
    }

    pub fn is_valid_time(&self, time: &DateTime<Utc>) -> bool {
        self.contains_year(time.year())
    }

    /// Drop updates outside the window, reporting each one.
    /// Applying this twice gives the same result as applying it once.
    pub fn retain_valid(&self, updates: Vec<PendingUpdate>, sink: &dyn EventSink) -> Vec<PendingUpdate> {
        updates
            .into_iter()
            .filter(|u| {
                let ok = self.is_valid(u.new_timestamp);
                if !ok {
                    sink.emit(RepairEvent::ValidationSkip {
                        id: u.record_id,
                        timestamp: u.new_timestamp,
                    });
                }
                ok
            })
            .collect()
    }
}
