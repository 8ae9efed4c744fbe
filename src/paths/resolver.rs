use std::fs;
use std::path::Path;

use crate::error::{RepairError, Result};

/// One literal prefix substitution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingRule {
    pub old_prefix: String,
    pub new_prefix: String,
}

impl MappingRule {
    pub fn new(old_prefix: impl Into<String>, new_prefix: impl Into<String>) -> Self {
        Self {
            old_prefix: old_prefix.into(),
            new_prefix: new_prefix.into(),
        }
    }

    /// Parse `old,new`, splitting on the first comma only.
    /// Blank lines and `#` comments yield `None`, as do lines without a comma.
    pub fn parse_line(line: &str) -> Option<Self> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }
        let (old, new) = line.split_once(',')?;
        Some(Self::new(old.trim(), new.trim()))
    }
}

/// Translates catalog paths into paths valid on this host.
///
/// Rules are tried in the order given and the first rule whose old prefix
/// starts the path wins, even if a later rule has a longer matching prefix.
#[derive(Debug, Clone)]
pub struct PathResolver {
    rules: Vec<MappingRule>,
}

impl PathResolver {
    /// Build from rules supplied directly. An empty list is a
    /// configuration error: a resolver that maps nothing would silently
    /// hide a missing config.
    pub fn new(rules: Vec<MappingRule>, origin: &Path) -> Result<Self> {
        if rules.is_empty() {
            return Err(RepairError::Configuration(origin.to_path_buf()));
        }
        Ok(Self { rules })
    }

    /// Load rules from a line-oriented mapping file
    pub fn from_config_file(config_path: &Path) -> Result<Self> {
        let rules = if config_path.is_file() {
            let content =
                fs::read_to_string(config_path).map_err(|e| RepairError::io(config_path, e))?;
            parse_rules(&content)
        } else {
            tracing::warn!(path = %config_path.display(), "path mapping file not found");
            Vec::new()
        };

        let resolver = Self::new(rules, config_path)?;
        tracing::info!(
            rules = resolver.rules.len(),
            path = %config_path.display(),
            "loaded path mappings"
        );
        Ok(resolver)
    }

    pub fn rules(&self) -> &[MappingRule] {
        &self.rules
    }

    /// Map a catalog path to the path that should exist on this filesystem.
    /// Empty input comes back unchanged; anything else is trimmed first.
    pub fn resolve(&self, raw_path: &str) -> String {
        if raw_path.is_empty() {
            return String::new();
        }

        let path = raw_path.trim();
        for rule in &self.rules {
            if let Some(rest) = path.strip_prefix(rule.old_prefix.as_str()) {
                return format!("{}{}", rule.new_prefix, rest);
            }
        }

        path.to_string()
    }
}

pub fn parse_rules(content: &str) -> Vec<MappingRule> {
    content
        .lines()
        .filter_map(|line| {
            let rule = MappingRule::parse_line(line);
            let trimmed = line.trim();
            if rule.is_none() && !trimmed.is_empty() && !trimmed.starts_with('#') {
                tracing::warn!(line = trimmed, "ignoring mapping line without a comma");
            }
            rule
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn unittest_resolver() -> PathResolver {
        PathResolver::new(
            vec![MappingRule::new("/unittest/", "/home/unittest/")],
            Path::new("test"),
        )
        .unwrap()
    }

    #[test]
    fn test_resolve_with_mapping() {
        let resolver = unittest_resolver();
        assert_eq!(
            resolver.resolve("/unittest/movies/movie.mkv"),
            "/home/unittest/movies/movie.mkv"
        );
    }

    #[test]
    fn test_resolve_without_mapping_returns_trimmed_path() {
        let resolver = unittest_resolver();
        assert_eq!(resolver.resolve("/other/path/file.mkv"), "/other/path/file.mkv");
        assert_eq!(resolver.resolve("  /other/file.mkv \n"), "/other/file.mkv");
    }

    #[test]
    fn test_resolve_empty() {
        assert_eq!(unittest_resolver().resolve(""), "");
    }

    #[test]
    fn test_resolve_trims_before_matching() {
        assert_eq!(
            unittest_resolver().resolve("  /unittest/a.mkv  "),
            "/home/unittest/a.mkv"
        );
    }

    #[test]
    fn test_only_leading_occurrence_is_replaced() {
        let resolver = unittest_resolver();
        assert_eq!(
            resolver.resolve("/unittest/backup/unittest/a.mkv"),
            "/home/unittest/backup/unittest/a.mkv"
        );
        // prefix appearing later in the path is not a match
        assert_eq!(resolver.resolve("/data/unittest/a.mkv"), "/data/unittest/a.mkv");
    }

    #[test]
    fn test_first_listed_rule_wins_over_longer_match() {
        let resolver = PathResolver::new(
            vec![
                MappingRule::new("/media/", "/mnt/media/"),
                MappingRule::new("/media/movies/", "/srv/movies/"),
            ],
            Path::new("test"),
        )
        .unwrap();

        assert_eq!(resolver.resolve("/media/movies/a.mkv"), "/mnt/media/movies/a.mkv");
    }

    #[test]
    fn test_parse_line() {
        assert_eq!(
            MappingRule::parse_line(" /old/ , /new/ "),
            Some(MappingRule::new("/old/", "/new/"))
        );
        assert_eq!(
            MappingRule::parse_line("/a,b/,/c/"),
            Some(MappingRule::new("/a", "b/,/c/"))
        );
        assert_eq!(MappingRule::parse_line("# /old/,/new/"), None);
        assert_eq!(MappingRule::parse_line("   "), None);
        assert_eq!(MappingRule::parse_line("/no/comma"), None);
    }

    #[test]
    fn test_load_from_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("path_mappings.conf");
        let mut file = fs::File::create(&config_path).unwrap();
        writeln!(file, "# movies moved to the NAS").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "/old/,/new/").unwrap();
        writeln!(file, "/unittest/, /home/unittest/").unwrap();
        drop(file);

        let resolver = PathResolver::from_config_file(&config_path).unwrap();

        assert_eq!(
            resolver.rules(),
            &[
                MappingRule::new("/old/", "/new/"),
                MappingRule::new("/unittest/", "/home/unittest/")
            ]
        );
        assert_eq!(resolver.resolve("/old/file.txt"), "/new/file.txt");
    }

    #[test]
    fn test_missing_config_is_configuration_error() {
        let result = PathResolver::from_config_file(Path::new("/nonexistent/path_mappings.conf"));
        assert!(matches!(result, Err(RepairError::Configuration(_))));
    }

    #[test]
    fn test_config_with_only_comments_is_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("path_mappings.conf");
        fs::write(&config_path, "# nothing here\n\n").unwrap();

        let result = PathResolver::from_config_file(&config_path);
        assert!(matches!(result, Err(RepairError::Configuration(_))));
    }

    #[test]
    fn test_empty_rule_list_is_rejected() {
        let result = PathResolver::new(Vec::new(), Path::new("--map"));
        assert!(matches!(result, Err(RepairError::Configuration(_))));
    }
}
