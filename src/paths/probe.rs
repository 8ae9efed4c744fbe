use chrono::{DateTime, Utc};
use std::fs;
use std::io;
use std::path::Path;
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use super::resolver::PathResolver;
use crate::events::{EventSink, RepairEvent};

/// Where a probed file was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeSource {
    Original,
    Remapped,
}

/// A media file located on disk
#[derive(Debug, Clone, PartialEq)]
pub struct ProbedFile {
    pub mtime: DateTime<Utc>,
    pub path: String,
    pub source: ProbeSource,
}

/// Finds catalog files on the local filesystem, falling back to the
/// remapped path when the stored one is gone.
pub struct FileProbe {
    resolver: PathResolver,
    sink: Rc<dyn EventSink>,
}

impl FileProbe {
    pub fn new(resolver: PathResolver, sink: Rc<dyn EventSink>) -> Self {
        Self { resolver, sink }
    }

    pub fn resolver(&self) -> &PathResolver {
        &self.resolver
    }

    /// Locate `raw_path` and read its modification time.
    ///
    /// The stored path always wins over the remapped one when both exist.
    /// Metadata errors are reported to the sink and treated as "not here".
    pub fn probe(&self, raw_path: &str) -> Option<ProbedFile> {
        if raw_path.is_empty() {
            return None;
        }

        if let Some(mtime) = self.regular_file_mtime(raw_path) {
            return Some(ProbedFile {
                mtime,
                path: raw_path.to_string(),
                source: ProbeSource::Original,
            });
        }

        let mapped = self.resolver.resolve(raw_path);
        if mapped != raw_path {
            if let Some(mtime) = self.regular_file_mtime(&mapped) {
                return Some(ProbedFile {
                    mtime,
                    path: mapped,
                    source: ProbeSource::Remapped,
                });
            }
        }

        None
    }

    fn regular_file_mtime(&self, path: &str) -> Option<DateTime<Utc>> {
        let p = Path::new(path);
        if !p.is_file() {
            return None;
        }
        self.checked_mtime(path, fs::metadata(p).and_then(|m| m.modified()))
    }

    /// Metadata errors and times chrono cannot hold are reported to the sink
    fn checked_mtime(&self, path: &str, modified: io::Result<SystemTime>) -> Option<DateTime<Utc>> {
        let error = match modified {
            Ok(time) => match system_time_to_utc(time) {
                Some(mtime) => return Some(mtime),
                None => "modification time out of range".to_string(),
            },
            Err(e) => e.to_string(),
        };
        self.sink.emit(RepairEvent::ProbeWarning {
            path: path.to_string(),
            error,
        });
        None
    }
}

/// Whole-second UTC time, floored; pre-epoch times come out negative.
/// `None` only beyond chrono's range.
fn system_time_to_utc(time: SystemTime) -> Option<DateTime<Utc>> {
    let secs = match time.duration_since(UNIX_EPOCH) {
        Ok(after) => i64::try_from(after.as_secs()).ok()?,
        Err(e) => {
            let before = e.duration();
            let whole = i64::try_from(before.as_secs()).ok()?;
            -whole - i64::from(before.subsec_nanos() > 0)
        }
    };
    DateTime::from_timestamp(secs, 0)
}
