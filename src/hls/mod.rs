//! HLS session manager: binds a movie id to a live transcoder child writing
//! playlist + segments into a per-session scratch directory, and garbage-
//! collects sessions nobody is watching.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::time::{Duration, Instant};

use tokio::process::Child;
use tokio::sync::{broadcast, Mutex};
use uuid::Uuid;

pub const PLAYLIST_NAME: &str = "playlist.m3u8";

/// Sessions idle longer than this are torn down by the sweeper.
const IDLE_CUTOFF: Duration = Duration::from_secs(10 * 60);

/// How long a playlist request waits for ffmpeg to materialize the playlist.
const PLAYLIST_POLLS: u32 = 30;
const PLAYLIST_POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, thiserror::Error)]
pub enum HlsError {
    #[error("failed to create session directory: {0}")]
    CreateDir(std::io::Error),
    #[error("failed to start transcoder: {0}")]
    Spawn(std::io::Error),
}

struct Session {
    movie_id: String,
    dir: PathBuf,
    last_accessed: Instant,
    process: Option<Child>,
}

/// A snapshot view of a session handed to HTTP handlers.
#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub id: String,
    pub dir: PathBuf,
}

impl SessionInfo {
    pub fn playlist_path(&self) -> PathBuf {
        self.dir.join(PLAYLIST_NAME)
    }
}

/// Owns every live session: its scratch directory and its child process.
/// Nothing outside this type kills a transcoder or deletes scratch files.
pub struct HlsManager {
    base_dir: PathBuf,
    sessions: Mutex<HashMap<String, Session>>,
}

impl HlsManager {
    /// Wipe and recreate the scratch base directory — no sessions survive a
    /// restart.
    pub fn new(base_dir: PathBuf) -> std::io::Result<Self> {
        let _ = std::fs::remove_dir_all(&base_dir);
        std::fs::create_dir_all(&base_dir)?;
        tracing::info!("HLS scratch directory: {}", base_dir.display());
        Ok(HlsManager {
            base_dir,
            sessions: Mutex::new(HashMap::new()),
        })
    }

    /// Pick the scratch base: RAM-backed /dev/shm when present, system temp
    /// otherwise.
    pub fn default_base_dir() -> PathBuf {
        let shm = Path::new("/dev/shm");
        if shm.is_dir() {
            shm.join("cinecast-hls")
        } else {
            std::env::temp_dir().join("cinecast-hls")
        }
    }

    /// Return the session for `movie_id`, spawning a transcoder for it first
    /// if none exists. At most one session per movie id: the session entry is
    /// inserted before the spawn, so a concurrent request for the same movie
    /// joins it instead of double-spawning.
    ///
    /// Returns the session and whether its playlist file exists yet.
    pub async fn get_or_create<F>(
        &self,
        movie_id: &str,
        spawn: F,
    ) -> Result<(SessionInfo, bool), HlsError>
    where
        F: FnOnce(&Path) -> std::io::Result<Child>,
    {
        let info = {
            let mut sessions = self.sessions.lock().await;
            if let Some((id, session)) = sessions
                .iter_mut()
                .find(|(_, s)| s.movie_id == movie_id)
                .map(|(id, s)| (id.clone(), s))
            {
                session.last_accessed = Instant::now();
                let info = SessionInfo {
                    id,
                    dir: session.dir.clone(),
                };
                let ready = info.playlist_path().exists();
                return Ok((info, ready));
            }

            let id = Uuid::new_v4().to_string();
            let dir = self.base_dir.join(&id);
            std::fs::create_dir_all(&dir).map_err(HlsError::CreateDir)?;
            sessions.insert(
                id.clone(),
                Session {
                    movie_id: movie_id.to_string(),
                    dir: dir.clone(),
                    last_accessed: Instant::now(),
                    process: None,
                },
            );
            SessionInfo { id, dir }
        };

        // Spawn outside the lock; the tentative entry already reserves the
        // movie id.
        match spawn(&info.dir) {
            Ok(child) => {
                let mut sessions = self.sessions.lock().await;
                match sessions.get_mut(&info.id) {
                    Some(session) => session.process = Some(child),
                    None => {
                        // Swept away in the meantime; don't leak the child.
                        let mut child = child;
                        let _ = child.start_kill();
                        tokio::spawn(async move {
                            let _ = child.wait().await;
                        });
                        return Err(HlsError::Spawn(std::io::Error::other("session evicted")));
                    }
                }
                tracing::info!(
                    "HLS: started transcoding session {} for movie {}",
                    info.id,
                    movie_id
                );
            }
            Err(e) => {
                // Leave no half-created session behind.
                let mut sessions = self.sessions.lock().await;
                sessions.remove(&info.id);
                drop(sessions);
                let _ = tokio::fs::remove_dir_all(&info.dir).await;
                return Err(HlsError::Spawn(e));
            }
        }

        let playlist = info.playlist_path();
        let mut ready = false;
        for _ in 0..PLAYLIST_POLLS {
            if playlist.exists() {
                ready = true;
                break;
            }
            tokio::time::sleep(PLAYLIST_POLL_INTERVAL).await;
        }

        // The poll may have taken a while; refresh the access time.
        {
            let mut sessions = self.sessions.lock().await;
            if let Some(session) = sessions.get_mut(&info.id) {
                session.last_accessed = Instant::now();
            }
        }

        Ok((info, ready))
    }

    /// Look up the session serving `movie_id`, bumping its access time.
    pub async fn session_for_movie(&self, movie_id: &str) -> Option<SessionInfo> {
        let mut sessions = self.sessions.lock().await;
        let (id, session) = sessions.iter_mut().find(|(_, s)| s.movie_id == movie_id)?;
        session.last_accessed = Instant::now();
        Some(SessionInfo {
            id: id.clone(),
            dir: session.dir.clone(),
        })
    }

    /// Open a segment file inside a session's scratch directory. The name is
    /// sanitized so requests cannot reach outside the directory.
    pub async fn open_segment(
        &self,
        session: &SessionInfo,
        filename: &str,
    ) -> std::io::Result<tokio::fs::File> {
        if !is_safe_segment_name(filename) {
            return Err(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "invalid segment name",
            ));
        }
        tokio::fs::File::open(session.dir.join(filename)).await
    }

    /// Tear down sessions idle longer than `max_idle`.
    pub async fn sweep_idle(&self, max_idle: Duration) {
        let expired: Vec<Session> = {
            let mut sessions = self.sessions.lock().await;
            let expired_ids: Vec<String> = sessions
                .iter()
                .filter(|(_, s)| s.last_accessed.elapsed() >= max_idle)
                .map(|(id, _)| id.clone())
                .collect();
            expired_ids
                .into_iter()
                .filter_map(|id| {
                    sessions.remove(&id).map(|s| {
                        tracing::info!("HLS: cleaned up expired session {} for movie {}", id, s.movie_id);
                        s
                    })
                })
                .collect()
        };

        for session in expired {
            teardown(session).await;
        }
    }

    /// Run the idle sweeper until shutdown, then tear down everything.
    pub async fn run_sweeper(&self, mut shutdown_rx: broadcast::Receiver<()>) {
        let mut ticker = tokio::time::interval(Duration::from_secs(60));
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sweep_idle(IDLE_CUTOFF).await;
                }
                _ = shutdown_rx.recv() => {
                    self.shutdown().await;
                    return;
                }
            }
        }
    }

    /// Kill and reap every remaining transcoder and remove its scratch
    /// directory.
    pub async fn shutdown(&self) {
        let drained: Vec<Session> = {
            let mut sessions = self.sessions.lock().await;
            sessions.drain().map(|(_, s)| s).collect()
        };
        for session in drained {
            teardown(session).await;
        }
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.lock().await.len()
    }
}

/// Kill-then-reap the child, then wipe the scratch directory.
async fn teardown(mut session: Session) {
    if let Some(mut child) = session.process.take() {
        let _ = child.start_kill();
        let _ = child.wait().await;
    }
    let _ = tokio::fs::remove_dir_all(&session.dir).await;
}

/// A segment name is safe when it is a bare file name: one normal path
/// component, not absolute, no parent references, identical to its cleaned
/// form.
pub fn is_safe_segment_name(name: &str) -> bool {
    if name.is_empty() || name.contains("..") {
        return false;
    }
    let path = Path::new(name);
    if path.is_absolute() {
        return false;
    }
    let mut components = path.components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(c)), None) if c == name
    )
}
