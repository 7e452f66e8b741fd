//! SQLite persistence for movie records.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use crate::library::Movie;

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS movies (
    id            TEXT PRIMARY KEY,
    title         TEXT NOT NULL,
    year          INTEGER,
    duration      INTEGER NOT NULL,
    file_path     TEXT UNIQUE NOT NULL,
    file_size     INTEGER NOT NULL,
    video_codec   TEXT NOT NULL,
    video_width   INTEGER NOT NULL,
    video_height  INTEGER NOT NULL,
    video_bitrate INTEGER NOT NULL,
    audio_codec   TEXT NOT NULL,
    audio_channels INTEGER NOT NULL,
    subtitles     TEXT NOT NULL,
    thumbnail_path TEXT,
    added_at      TEXT NOT NULL,
    modified_at   TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_movies_title ON movies(title);
"#;

pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    pub fn open(path: &Path) -> rusqlite::Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch(SCHEMA)?;
        Ok(Store {
            conn: Mutex::new(conn),
        })
    }

    /// Modification time of a stored record, used to skip unchanged files
    /// during a rescan.
    pub fn modified_at(&self, id: &str) -> rusqlite::Result<Option<DateTime<Utc>>> {
        let conn = self.conn.lock().expect("store lock poisoned");
        conn.query_row(
            "SELECT modified_at FROM movies WHERE id = ?1",
            params![id],
            |row| row.get::<_, String>(0),
        )
        .optional()
        .map(|opt| opt.and_then(|s| s.parse().ok()))
    }

    pub fn upsert(&self, movie: &Movie) -> rusqlite::Result<()> {
        let subtitles = serde_json::to_string(&movie.subtitles).unwrap_or_else(|_| "[]".into());
        let conn = self.conn.lock().expect("store lock poisoned");
        conn.execute(
            "INSERT OR REPLACE INTO movies (
                id, title, year, duration, file_path, file_size,
                video_codec, video_width, video_height, video_bitrate,
                audio_codec, audio_channels, subtitles, thumbnail_path,
                added_at, modified_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
            params![
                movie.id,
                movie.title,
                movie.year,
                movie.duration as i64,
                movie.file_path.to_string_lossy(),
                movie.file_size as i64,
                movie.video_codec,
                movie.video_width,
                movie.video_height,
                movie.video_bitrate as i64,
                movie.audio_codec,
                movie.audio_channels,
                subtitles,
                movie.thumbnail_path.as_ref().map(|p| p.to_string_lossy().into_owned()),
                movie.added_at.to_rfc3339(),
                movie.modified_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// All records, title-sorted — the order Browse pagination slices over.
    pub fn load_all(&self) -> rusqlite::Result<Vec<Movie>> {
        let conn = self.conn.lock().expect("store lock poisoned");
        let mut stmt = conn.prepare(
            "SELECT id, title, year, duration, file_path, file_size,
                    video_codec, video_width, video_height, video_bitrate,
                    audio_codec, audio_channels, subtitles, thumbnail_path,
                    added_at, modified_at
             FROM movies ORDER BY title",
        )?;
        let rows = stmt.query_map([], |row| {
            let subtitles: String = row.get(12)?;
            let added_at: String = row.get(14)?;
            let modified_at: String = row.get(15)?;
            Ok(Movie {
                id: row.get(0)?,
                title: row.get(1)?,
                year: row.get(2)?,
                duration: row.get::<_, i64>(3)? as u64,
                file_path: row.get::<_, String>(4)?.into(),
                file_size: row.get::<_, i64>(5)? as u64,
                video_codec: row.get(6)?,
                video_width: row.get(7)?,
                video_height: row.get(8)?,
                video_bitrate: row.get::<_, i64>(9)? as u64,
                audio_codec: row.get(10)?,
                audio_channels: row.get(11)?,
                subtitles: serde_json::from_str(&subtitles).unwrap_or_default(),
                thumbnail_path: row.get::<_, Option<String>>(13)?.map(Into::into),
                added_at: added_at.parse().unwrap_or_else(|_| Utc::now()),
                modified_at: modified_at.parse().unwrap_or_else(|_| Utc::now()),
            })
        })?;

        let mut movies = Vec::new();
        for row in rows {
            movies.push(row?);
        }
        Ok(movies)
    }
}
