use serde::Deserialize;
use std::path::{Path, PathBuf};

const DEFAULT_PORT: u16 = 8080;

fn default_name() -> String {
    let host = hostname::get()
        .ok()
        .and_then(|os| os.into_string().ok())
        .filter(|s| !s.is_empty())
        .unwrap_or_default();
    if host.is_empty() {
        "cinecast".to_string()
    } else {
        format!("cinecast@{}", host)
    }
}

fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".cinecast")
}

/// A renderer added by hand instead of discovered over SSDP. Useful for TVs
/// that ignore M-SEARCH but answer on a known description URL.
#[derive(Deserialize, Debug, Clone)]
pub struct ManualDevice {
    pub ip: String,
    pub port: u16,
    pub path: String,
    pub name: String,
}

#[derive(Deserialize, Default, Debug)]
pub struct FileConfig {
    pub port: Option<u16>,
    pub host: Option<String>,
    pub name: Option<String>,
    pub paths: Option<Vec<PathBuf>>,
    #[serde(default)]
    pub manual_devices: Vec<ManualDevice>,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub server_host: String,
    pub server_port: u16,

    pub media_paths: Vec<PathBuf>,
    pub media_extensions: Vec<String>,

    pub db_path: PathBuf,

    pub ffmpeg_path: String,
    pub ffprobe_path: String,
    pub video_bitrate: String,
    pub audio_bitrate: String,
    pub preset: String,

    pub friendly_name: String,
    pub device_uuid: Option<String>,

    pub thumbnail_dir: PathBuf,

    pub manual_devices: Vec<ManualDevice>,
}

impl Default for Config {
    fn default() -> Self {
        let data = data_dir();
        Config {
            server_host: "0.0.0.0".to_string(),
            server_port: DEFAULT_PORT,
            media_paths: vec![PathBuf::from("/media/movies")],
            media_extensions: ["mkv", "mp4", "avi", "mov", "wmv", "m4v", "webm", "ts", "m2ts"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            db_path: data.join("library.db"),
            ffmpeg_path: "ffmpeg".to_string(),
            ffprobe_path: "ffprobe".to_string(),
            video_bitrate: "2M".to_string(),
            audio_bitrate: "192k".to_string(),
            preset: "fast".to_string(),
            friendly_name: default_name(),
            device_uuid: None,
            thumbnail_dir: data.join("thumbnails"),
            manual_devices: Vec::new(),
        }
    }
}

impl Config {
    /// Layer the configuration: defaults, then config file, then environment,
    /// then command-line arguments. Later layers win.
    pub fn resolve(file: Option<FileConfig>, args: &crate::cli::Args) -> Self {
        let mut cfg = Config::default();

        if let Some(file) = file {
            if let Some(port) = file.port {
                cfg.server_port = port;
            }
            if let Some(host) = file.host {
                cfg.server_host = host;
            }
            if let Some(name) = file.name {
                cfg.friendly_name = name;
            }
            if let Some(paths) = file.paths {
                cfg.media_paths = paths;
            }
            cfg.manual_devices = file.manual_devices;
        }

        cfg.apply_env();

        if let Some(port) = args.port {
            cfg.server_port = port;
        }
        if let Some(ref name) = args.name {
            cfg.friendly_name = name.clone();
        }
        if !args.paths.is_empty() {
            cfg.media_paths = args.paths.clone();
        }

        cfg
    }

    fn apply_env(&mut self) {
        if let Ok(val) = std::env::var("MEDIA_PATH") {
            self.media_paths = vec![PathBuf::from(val)];
        }
        if let Ok(val) = std::env::var("MEDIA_PATHS") {
            self.media_paths = std::env::split_paths(&val).collect();
        }
        if let Ok(val) = std::env::var("SERVER_HOST") {
            self.server_host = val;
        }
        if let Ok(val) = std::env::var("SERVER_PORT") {
            if let Ok(port) = val.parse() {
                self.server_port = port;
            }
        }
        if let Ok(val) = std::env::var("FFMPEG_PATH") {
            self.ffmpeg_path = val;
        }
        if let Ok(val) = std::env::var("FFPROBE_PATH") {
            self.ffprobe_path = val;
        }
        if let Ok(val) = std::env::var("DB_PATH") {
            self.db_path = PathBuf::from(val);
        }
        if let Ok(val) = std::env::var("VIDEO_BITRATE") {
            self.video_bitrate = val;
        }
        if let Ok(val) = std::env::var("AUDIO_BITRATE") {
            self.audio_bitrate = val;
        }
        if let Ok(val) = std::env::var("DLNA_FRIENDLY_NAME") {
            self.friendly_name = val;
        }
        if let Ok(val) = std::env::var("DLNA_UUID") {
            if !val.is_empty() {
                self.device_uuid = Some(val);
            }
        }
        if let Ok(val) = std::env::var("THUMBNAIL_DIR") {
            self.thumbnail_dir = PathBuf::from(val);
        }
    }

    /// Create the data directories (DB parent, thumbnails) if missing.
    pub fn ensure_directories(&self) -> std::io::Result<()> {
        if let Some(parent) = self.db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::create_dir_all(&self.thumbnail_dir)
    }

    pub fn is_media_extension(&self, ext: &str) -> bool {
        let ext = ext.to_ascii_lowercase();
        self.media_extensions.iter().any(|e| *e == ext)
    }
}

pub fn find_config_file(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_owned());
    }
    let cwd_config = PathBuf::from("cinecast.toml");
    if cwd_config.exists() {
        return Some(cwd_config);
    }
    if let Some(config_dir) = dirs::config_dir() {
        let xdg_config = config_dir.join("cinecast").join("config.toml");
        if xdg_config.exists() {
            return Some(xdg_config);
        }
    }
    None
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

pub fn load_config(path: &Path) -> Result<FileConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: FileConfig = toml::from_str(&content)?;
    Ok(config)
}
