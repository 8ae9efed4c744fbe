use serde::Serialize;

use super::probe::{FileProbe, ProbeSource};
use crate::error::Result;
use crate::state::reader::as_text;
use crate::state::store::{CatalogStore, JoinSpec};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PathStatus {
    Original,
    Mapped,
    Missing,
}

/// Outcome for one catalog path
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathCheck {
    pub catalog_path: String,
    /// Remapped form, when it differs from the catalog path
    pub mapped_path: Option<String>,
    pub status: PathStatus,
}

/// How well the mapping rules cover the paths stored in the catalog
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PathAnalysis {
    pub total: usize,
    pub original_exists: usize,
    pub mapped_exists: usize,
    pub still_missing: usize,
    pub checks: Vec<PathCheck>,
}

impl PathAnalysis {
    /// Share of paths found either way, in percent (0 with no paths)
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (self.original_exists + self.mapped_exists) as f64 / self.total as f64 * 100.0
    }
}

/// Check up to `limit` catalog file paths against the filesystem
pub fn analyze_paths(
    store: &dyn CatalogStore,
    probe: &FileProbe,
    limit: Option<usize>,
) -> Result<PathAnalysis> {
    let spec = JoinSpec::FilePaths { limit };
    let rows = store.query(&spec)?;
    let mut analysis = PathAnalysis::default();

    for row in &rows.rows {
        let Some(catalog_path) = row.first().map(as_text) else {
            continue;
        };

        let mapped = probe.resolver().resolve(&catalog_path);
        let status = match probe.probe(&catalog_path).map(|f| f.source) {
            Some(ProbeSource::Original) => {
                analysis.original_exists += 1;
                PathStatus::Original
            }
            Some(ProbeSource::Remapped) => {
                analysis.mapped_exists += 1;
                PathStatus::Mapped
            }
            None => {
                analysis.still_missing += 1;
                PathStatus::Missing
            }
        };

        analysis.checks.push(PathCheck {
            mapped_path: (mapped != catalog_path).then_some(mapped),
            catalog_path,
            status,
        });
        analysis.total += 1;
    }

    Ok(analysis)
}
