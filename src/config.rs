//! Default locations and the backup-tool search list

use std::path::{Path, PathBuf};

/// Environment variable naming a media server SQLite binary to try first
pub const BACKUP_TOOL_ENV: &str = "PLEX_SQLITE";

/// Mapping rules file read when no `--map` rules are given
pub const DEFAULT_MAPPINGS_FILE: &str = "path_mappings.conf";

/// Name of the SQLite shell bundled with the media server
const BACKUP_TOOL_NAME: &str = "Plex SQLite";

/// System-wide install locations, checked after the home-relative ones
const SYSTEM_TOOL_DIRS: [&str; 9] = [
    "/usr/lib/plexmediaserver",
    "/opt/plexmediaserver",
    "/usr/local/plexmediaserver",
    "/var/packages/PlexMediaServer/target",
    "/usr/pbi/plexmediaserver-amd64/share/plexmediaserver",
    "/usr/local/share/plexmediaserver",
    "/Applications/Plex Media Server.app/Contents/MacOS",
    "/snap/plexmediaserver/current",
    "/app",
];

/// The user's home directory, or the working directory when unknown
fn home() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

/// Where the media server keeps its library database by default
pub fn default_db_path() -> PathBuf {
    let mut path = home();
    path.push("Plex Media Server");
    path.push("Plug-in Support");
    path.push("Databases");
    path.push("com.plexapp.plugins.library.db");
    path
}

/// Default destination for a repaired catalog
pub fn default_output_path() -> PathBuf {
    home().join("plex_fixed_dates.db")
}

/// Backup tool candidates in the order they are tried: explicit paths,
/// then the environment variable, then the well-known install locations
pub fn backup_tool_candidates(explicit: &[PathBuf], env_value: Option<&str>) -> Vec<PathBuf> {
    let mut candidates: Vec<PathBuf> = explicit.to_vec();

    if let Some(value) = env_value.map(str::trim).filter(|v| !v.is_empty()) {
        candidates.push(PathBuf::from(value));
    }

    let home = home();
    candidates.push(home.join("Plex Media Server").join(BACKUP_TOOL_NAME));
    candidates.push(home.join("plexmediaserver").join(BACKUP_TOOL_NAME));
    candidates.extend(
        SYSTEM_TOOL_DIRS
            .iter()
            .map(|dir| Path::new(dir).join(BACKUP_TOOL_NAME)),
    );

    candidates
}
