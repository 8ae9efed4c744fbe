//! Duplicating the catalog before it is written to
//!
//! The media server ships its own SQLite build, and catalogs it has touched
//! may use extensions a stock SQLite refuses. When that binary is installed
//! its `.backup` command gives the most faithful copy; otherwise the file is
//! copied byte for byte.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::rc::Rc;

use crate::error::{RepairError, Result};
use crate::events::{EventSink, RepairEvent};

/// One way of producing a full duplicate of the catalog file
pub trait CopyStrategy {
    fn name(&self) -> String;

    fn copy(&self, source: &Path, destination: &Path) -> Result<()>;
}

/// The media server's bundled SQLite shell, run as
/// `<tool> <source> '.backup "<destination>"'`
#[derive(Debug, Clone, Default)]
pub struct ExternalBackupTool {
    candidates: Vec<PathBuf>,
}

impl ExternalBackupTool {
    /// `candidates` are tried in order; the first existing file is used
    pub fn new(candidates: Vec<PathBuf>) -> Self {
        Self { candidates }
    }

    pub fn locate(&self) -> Option<&Path> {
        self.candidates
            .iter()
            .map(PathBuf::as_path)
            .find(|p| p.is_file())
    }
}

impl CopyStrategy for ExternalBackupTool {
    fn name(&self) -> String {
        match self.locate() {
            Some(tool) => format!("backup tool {}", tool.display()),
            None => "backup tool".to_string(),
        }
    }

    fn copy(&self, source: &Path, destination: &Path) -> Result<()> {
        let tool = self.locate().ok_or_else(|| {
            RepairError::Copy(format!(
                "no backup tool found among {} candidate(s)",
                self.candidates.len()
            ))
        })?;

        let output = Command::new(tool)
            .arg(source)
            .arg(backup_command(destination))
            .output()
            .map_err(|e| RepairError::io(tool, e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(RepairError::Copy(format!(
                "{} exited with {}: {}",
                tool.display(),
                output.status,
                stderr.trim()
            )));
        }

        if !destination.is_file() {
            return Err(RepairError::Copy(format!(
                "{} reported success but wrote no file",
                tool.display()
            )));
        }

        Ok(())
    }
}

/// SQLite shell dot-commands take no escapes inside single quotes, so the
/// destination goes in double quotes with `\` and `"` escaped
fn backup_command(destination: &Path) -> String {
    let escaped = destination
        .display()
        .to_string()
        .replace('\\', "\\\\")
        .replace('"', "\\\"");
    format!(".backup \"{escaped}\"")
}

/// Plain byte-level file copy
#[derive(Debug, Clone, Copy, Default)]
pub struct RawFileCopy;

impl CopyStrategy for RawFileCopy {
    fn name(&self) -> String {
        "raw file copy".to_string()
    }

    fn copy(&self, source: &Path, destination: &Path) -> Result<()> {
        std::fs::copy(source, destination).map_err(|e| RepairError::io(destination, e))?;
        Ok(())
    }
}

/// Ordered list of copy strategies; the first one that succeeds wins
pub struct CopyPlan {
    strategies: Vec<Box<dyn CopyStrategy>>,
    sink: Rc<dyn EventSink>,
}

impl CopyPlan {
    pub fn new(strategies: Vec<Box<dyn CopyStrategy>>, sink: Rc<dyn EventSink>) -> Self {
        Self { strategies, sink }
    }

    /// Backup tool first, raw copy as the fallback
    pub fn standard(tool_candidates: Vec<PathBuf>, sink: Rc<dyn EventSink>) -> Self {
        Self::new(
            vec![
                Box::new(ExternalBackupTool::new(tool_candidates)),
                Box::new(RawFileCopy),
            ],
            sink,
        )
    }

    /// Duplicate `source` to `destination`, returning the strategy that did it
    pub fn execute(&self, source: &Path, destination: &Path) -> Result<String> {
        if !source.is_file() {
            return Err(RepairError::NotFound(source.to_path_buf()));
        }
        if is_same_file(source, destination) {
            return Err(RepairError::Copy(format!(
                "destination {} is the source catalog",
                destination.display()
            )));
        }

        let mut failures = Vec::new();
        for strategy in &self.strategies {
            match strategy.copy(source, destination) {
                Ok(()) => return Ok(strategy.name()),
                Err(e) => {
                    self.sink.emit(RepairEvent::CopyFallback {
                        strategy: strategy.name(),
                        error: e.to_string(),
                    });
                    failures.push(format!("{}: {e}", strategy.name()));
                }
            }
        }

        Err(RepairError::Copy(if failures.is_empty() {
            "no copy strategy configured".to_string()
        } else {
            failures.join("; ")
        }))
    }
}

/// A destination that does not exist yet cannot be the source
fn is_same_file(source: &Path, destination: &Path) -> bool {
    match (source.canonicalize(), destination.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::MemorySink;
    use std::fs;

    struct AlwaysFails;

    impl CopyStrategy for AlwaysFails {
        fn name(&self) -> String {
            "always fails".to_string()
        }

        fn copy(&self, _source: &Path, _destination: &Path) -> Result<()> {
            Err(RepairError::Copy("boom".to_string()))
        }
    }

    fn source_file(dir: &Path) -> PathBuf {
        let source = dir.join("library.db");
        fs::write(&source, b"catalog bytes").unwrap();
        source
    }

    #[test]
    fn test_missing_tool_falls_back_to_raw_copy() {
        let dir = tempfile::tempdir().unwrap();
        let source = source_file(dir.path());
        let dest = dir.path().join("copy.db");
        let sink = Rc::new(MemorySink::default());

        let plan = CopyPlan::standard(vec![dir.path().join("no-such-tool")], sink.clone());
        let used = plan.execute(&source, &dest).unwrap();

        assert_eq!(used, "raw file copy");
        assert_eq!(fs::read(&dest).unwrap(), b"catalog bytes");
        assert_eq!(
            sink.count(|e| matches!(e, RepairEvent::CopyFallback { .. })),
            1
        );
    }

    #[test]
    fn test_first_success_short_circuits() {
        let dir = tempfile::tempdir().unwrap();
        let source = source_file(dir.path());
        let dest = dir.path().join("copy.db");
        let sink = Rc::new(MemorySink::default());

        let plan = CopyPlan::new(vec![Box::new(RawFileCopy), Box::new(AlwaysFails)], sink.clone());
        assert_eq!(plan.execute(&source, &dest).unwrap(), "raw file copy");
        assert!(sink.events().is_empty());
    }

    #[test]
    fn test_all_strategies_failing_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = source_file(dir.path());
        let sink = Rc::new(MemorySink::default());

        let plan = CopyPlan::new(vec![Box::new(AlwaysFails), Box::new(AlwaysFails)], sink.clone());
        let err = plan.execute(&source, &dir.path().join("copy.db")).unwrap_err();

        assert!(matches!(err, RepairError::Copy(_)));
        assert_eq!(sink.events().len(), 2);
    }

    #[test]
    fn test_refuses_to_copy_onto_source() {
        let dir = tempfile::tempdir().unwrap();
        let source = source_file(dir.path());
        let alias = dir.path().join(".").join("library.db");
        let plan = CopyPlan::new(vec![Box::new(RawFileCopy)], Rc::new(MemorySink::default()));

        let err = plan.execute(&source, &alias).unwrap_err();

        assert!(matches!(err, RepairError::Copy(_)));
        assert_eq!(fs::read(&source).unwrap(), b"catalog bytes");
    }

    #[test]
    fn test_missing_source() {
        let dir = tempfile::tempdir().unwrap();
        let plan = CopyPlan::new(vec![Box::new(RawFileCopy)], Rc::new(MemorySink::default()));
        let err = plan
            .execute(&dir.path().join("absent.db"), &dir.path().join("copy.db"))
            .unwrap_err();
        assert!(matches!(err, RepairError::NotFound(_)));
    }

    #[test]
    fn test_backup_command_quotes_destination() {
        assert_eq!(
            backup_command(Path::new("/tmp/fixed.db")),
            r#".backup "/tmp/fixed.db""#
        );
        assert_eq!(
            backup_command(Path::new(r#"/tmp/Bob's "new" lib\x.db"#)),
            r#".backup "/tmp/Bob's \"new\" lib\\x.db""#
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_backup_tool_invocation_and_failure() {
        use std::os::unix::fs::PermissionsExt;

        fn script(path: &Path, body: &str) {
            fs::write(path, format!("#!/bin/sh\n{body}\n")).unwrap();
            fs::set_permissions(path, fs::Permissions::from_mode(0o755)).unwrap();
        }

        let dir = tempfile::tempdir().unwrap();
        let source = source_file(dir.path());

        // Working tool: unpacks the `.backup "<dest>"` argument and copies
        let good = dir.path().join("good-sqlite");
        script(&good, "dest=${2#'.backup \"'}\ndest=${dest%'\"'}\ncp \"$1\" \"$dest\"");
        let dest = dir.path().join("via-tool.db");
        let sink = Rc::new(MemorySink::default());
        let plan = CopyPlan::standard(vec![good.clone()], sink.clone());

        let used = plan.execute(&source, &dest).unwrap();
        assert!(used.starts_with("backup tool"));
        assert_eq!(fs::read(&dest).unwrap(), b"catalog bytes");
        assert!(sink.events().is_empty());

        // Failing tool: non-zero exit falls through to the raw copy
        let bad = dir.path().join("bad-sqlite");
        script(&bad, "echo 'unsupported' >&2\nexit 3");
        let dest = dir.path().join("via-fallback.db");
        let sink = Rc::new(MemorySink::default());
        let plan = CopyPlan::standard(vec![dir.path().join("missing"), bad], sink.clone());

        assert_eq!(plan.execute(&source, &dest).unwrap(), "raw file copy");
        assert_eq!(fs::read(&dest).unwrap(), b"catalog bytes");
        match &sink.events()[0] {
            RepairEvent::CopyFallback { error, .. } => assert!(error.contains("unsupported")),
            other => panic!("unexpected event {other:?}"),
        }
    }
}
