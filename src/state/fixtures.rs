//! Test-only catalog fixtures shaped like the media server schema

use rusqlite::{params, Connection};
use std::path::Path;

pub const CATALOG_SCHEMA: &str = "
    CREATE TABLE metadata_items (
        id INTEGER PRIMARY KEY,
        metadata_type INTEGER,
        media_item_count INTEGER,
        title TEXT,
        title_sort TEXT,
        original_title TEXT,
        studio TEXT,
        rating REAL,
        rating_count INTEGER,
        tagline TEXT,
        summary TEXT,
        content_rating TEXT,
        duration INTEGER,
        user_thumb_url TEXT,
        user_art_url TEXT,
        user_banner_url TEXT,
        user_music_url TEXT,
        tags_genre TEXT,
        tags_director TEXT,
        tags_writer TEXT,
        tags_star TEXT,
        originally_available_at INTEGER,
        available_at INTEGER,
        added_at INTEGER,
        created_at INTEGER,
        updated_at INTEGER,
        library_section_id INTEGER,
        parent_id INTEGER,
        hash TEXT
    );
    CREATE TABLE media_items (
        id INTEGER PRIMARY KEY,
        metadata_item_id INTEGER,
        size INTEGER,
        width INTEGER,
        height INTEGER,
        container TEXT,
        video_codec TEXT,
        audio_codec TEXT
    );
    CREATE TABLE media_parts (
        id INTEGER PRIMARY KEY,
        media_item_id INTEGER,
        file TEXT,
        size INTEGER,
        duration INTEGER,
        created_at INTEGER,
        updated_at INTEGER
    );
    CREATE TABLE unrelated_settings (key TEXT PRIMARY KEY, value TEXT);
    INSERT INTO unrelated_settings VALUES ('schema_version', '42');";

/// One metadata item with a single media part
#[derive(Debug, Clone)]
pub struct FixtureItem {
    pub id: i64,
    pub title: String,
    pub file: String,
    pub added_at: i64,
    pub created_at: i64,
    pub updated_at: i64,
    pub library_section_id: i64,
}

impl FixtureItem {
    pub fn new(id: i64, title: &str, file: &str) -> Self {
        Self {
            id,
            title: title.to_string(),
            file: file.to_string(),
            added_at: 1_234_567_890,
            created_at: 1_234_567_890,
            updated_at: 1_234_567_890,
            library_section_id: 1,
        }
    }

    pub fn updated_at(mut self, ts: i64) -> Self {
        self.updated_at = ts;
        self
    }

    pub fn library(mut self, section: i64) -> Self {
        self.library_section_id = section;
        self
    }
}

pub fn create_catalog(path: &Path, items: &[FixtureItem]) {
    let conn = Connection::open(path).unwrap();
    conn.execute_batch(CATALOG_SCHEMA).unwrap();

    for item in items {
        conn.execute(
            "INSERT INTO metadata_items
                (id, metadata_type, title, added_at, created_at, updated_at, library_section_id, hash)
             VALUES (?1, 1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                item.id,
                item.title,
                item.added_at,
                item.created_at,
                item.updated_at,
                item.library_section_id,
                format!("hash{}", item.id),
            ],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO media_items (id, metadata_item_id, container) VALUES (?1, ?1, 'mkv')",
            params![item.id],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO media_parts (id, media_item_id, file, size) VALUES (?1, ?1, ?2, 1024)",
            params![item.id, item.file],
        )
        .unwrap();
    }
}

pub fn updated_at(path: &Path, id: i64) -> Option<i64> {
    let conn = Connection::open(path).unwrap();
    conn.query_row(
        "SELECT updated_at FROM metadata_items WHERE id = ?1",
        params![id],
        |row| row.get(0),
    )
    .unwrap()
}

/// Create `path` (and its parents) with the given modification time
pub fn touch(path: &Path, mtime: i64) {
    use std::time::{Duration, UNIX_EPOCH};

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    let file = std::fs::File::create(path).unwrap();
    let offset = Duration::from_secs(mtime.unsigned_abs());
    let time = if mtime < 0 {
        UNIX_EPOCH - offset
    } else {
        UNIX_EPOCH + offset
    };
    file.set_modified(time).unwrap();
}
