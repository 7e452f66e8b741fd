pub mod probe;
pub mod scanner;
pub mod store;

use std::path::{Path, PathBuf};
use std::sync::RwLock;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Namespace for deriving stable movie ids from file paths. The same path
/// always yields the same id across restarts and rescans.
pub static LIBRARY_NAMESPACE: std::sync::LazyLock<Uuid> =
    std::sync::LazyLock::new(|| Uuid::new_v5(&Uuid::NAMESPACE_DNS, b"cinecast.library"));

/// Derive the id for a movie file from its path.
pub fn movie_id(path: &Path) -> String {
    Uuid::new_v5(&LIBRARY_NAMESPACE, path.as_os_str().as_encoded_bytes()).to_string()
}

/// A subtitle track, either embedded in the container (`index` addresses the
/// ffmpeg stream) or an external sidecar file (`file_path` set, `is_external`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subtitle {
    pub index: i64,
    pub language: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<PathBuf>,
    pub is_external: bool,
    pub format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Movie {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    /// Duration in seconds.
    pub duration: u64,
    pub file_path: PathBuf,
    pub file_size: u64,

    pub video_codec: String,
    pub video_width: u32,
    pub video_height: u32,
    pub video_bitrate: u64,

    pub audio_codec: String,
    pub audio_channels: u32,

    pub subtitles: Vec<Subtitle>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_path: Option<PathBuf>,
    pub added_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl Movie {
    pub fn has_subtitles(&self) -> bool {
        !self.subtitles.is_empty()
    }
}

/// Lightweight view for list endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct MovieSummary {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<i32>,
    pub duration: u64,
    pub has_subtitles: bool,
}

impl From<&Movie> for MovieSummary {
    fn from(m: &Movie) -> Self {
        MovieSummary {
            id: m.id.clone(),
            title: m.title.clone(),
            year: m.year,
            duration: m.duration,
            has_subtitles: m.has_subtitles(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LibraryError {
    #[error("database error: {0}")]
    Db(#[from] rusqlite::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// The movie library: a SQLite-backed store plus an in-memory, title-sorted
/// snapshot. The scanner is the only writer; everything else reads clones.
pub struct Library {
    store: store::Store,
    movies: RwLock<Vec<Movie>>,
}

impl Library {
    /// Open the store at `db_path` and load the persisted records.
    pub fn open(db_path: &Path) -> Result<Self, LibraryError> {
        let store = store::Store::open(db_path)?;
        let movies = store.load_all()?;
        tracing::info!("Library opened with {} movies", movies.len());
        Ok(Library {
            store,
            movies: RwLock::new(movies),
        })
    }

    /// Snapshot of all movies in title order.
    pub fn movies(&self) -> Vec<Movie> {
        self.movies.read().expect("library lock poisoned").clone()
    }

    pub fn movie(&self, id: &str) -> Option<Movie> {
        self.movies
            .read()
            .expect("library lock poisoned")
            .iter()
            .find(|m| m.id == id)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.movies.read().expect("library lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Replace the in-memory snapshot from the store. Called at the end of a
    /// scan; the writer lock is held only for the swap.
    pub fn reload(&self) -> Result<usize, LibraryError> {
        let fresh = self.store.load_all()?;
        let count = fresh.len();
        *self.movies.write().expect("library lock poisoned") = fresh;
        Ok(count)
    }

    /// Direct access to the persistence layer (the scanner writes through
    /// it, then calls [`Library::reload`]).
    pub fn store(&self) -> &store::Store {
        &self.store
    }
}
