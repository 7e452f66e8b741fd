//! Media directory scanner: walks the configured paths, probes new or
//! changed files, discovers sidecar subtitles, and generates thumbnails.

use std::path::Path;
use std::process::Stdio;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tokio::process::Command;
use walkdir::WalkDir;

use crate::config::Config;
use crate::library::{movie_id, probe, Library, LibraryError, Movie, Subtitle};

const SUBTITLE_EXTENSIONS: &[&str] = &["srt", "ass", "ssa", "sub", "vtt"];

/// Scan every media path, upsert changed movies, then reload the in-memory
/// snapshot. Returns the total number of movies after the scan.
pub async fn scan(library: &Library, cfg: &Config) -> Result<usize, LibraryError> {
    let start = Instant::now();
    let mut updated = 0usize;

    for root in &cfg.media_paths {
        if !root.exists() {
            tracing::warn!("Scan path does not exist, skipping: {}", root.display());
            continue;
        }
        for entry in WalkDir::new(root).follow_links(true) {
            match entry {
                Err(e) => {
                    tracing::warn!("Cannot access entry: {}", e);
                }
                Ok(entry) if entry.file_type().is_file() => {
                    if process_file(library, cfg, entry.path()).await {
                        updated += 1;
                    }
                }
                Ok(_) => {}
            }
        }
    }

    let total = library.reload()?;
    tracing::info!(
        "Scanned {} movies ({} updated) in {:.1}s",
        total,
        updated,
        start.elapsed().as_secs_f64()
    );
    Ok(total)
}

/// Probe and store one file. Returns true when the record was (re)written.
async fn process_file(library: &Library, cfg: &Config, path: &Path) -> bool {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };
    if !cfg.is_media_extension(ext) {
        return false;
    }

    let meta = match std::fs::metadata(path) {
        Ok(m) => m,
        Err(e) => {
            tracing::warn!("Cannot stat {}: {}", path.display(), e);
            return false;
        }
    };
    let modified_at: DateTime<Utc> = meta.modified().map(Into::into).unwrap_or_else(|_| Utc::now());

    let id = movie_id(path);

    // Unchanged files keep their stored record (second-precision compare —
    // the RFC 3339 round-trip through SQLite drops nothing above that).
    if let Ok(Some(stored)) = library.store().modified_at(&id) {
        if stored.timestamp() == modified_at.timestamp() {
            return false;
        }
    }

    let info = match probe::probe(&cfg.ffprobe_path, path).await {
        Ok(info) => info,
        Err(e) => {
            tracing::warn!("Skipping {}: probe failed: {}", path.display(), e);
            return false;
        }
    };

    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default();
    let (title, year) = parse_title(stem);

    let mut subtitles: Vec<Subtitle> = info
        .subtitles
        .iter()
        .map(|s| Subtitle {
            index: s.index,
            language: s.language.clone(),
            title: s.title.clone(),
            file_path: None,
            is_external: false,
            format: s.format.clone(),
        })
        .collect();
    subtitles.extend(find_external_subtitles(path));

    let thumb_path = cfg.thumbnail_dir.join(format!("{id}.jpg"));
    let thumbnail_path = match generate_thumbnail(&cfg.ffmpeg_path, path, &thumb_path, info.duration).await
    {
        Ok(()) => Some(thumb_path),
        Err(e) => {
            tracing::debug!("No thumbnail for {}: {}", path.display(), e);
            None
        }
    };

    let movie = Movie {
        id,
        title,
        year,
        duration: info.duration,
        file_path: path.to_path_buf(),
        file_size: meta.len(),
        video_codec: info.video_codec,
        video_width: info.width,
        video_height: info.height,
        video_bitrate: info.video_bitrate,
        audio_codec: info.audio_codec,
        audio_channels: info.audio_channels,
        subtitles,
        thumbnail_path,
        added_at: Utc::now(),
        modified_at,
    };

    if let Err(e) = library.store().upsert(&movie) {
        tracing::warn!("Failed to store {}: {}", path.display(), e);
        return false;
    }
    tracing::debug!("indexed {} -> {}", movie.id, movie.file_path.display());
    true
}

/// Extract a display title and release year from a file stem like
/// "Movie.Name.2023" or "Movie Name (2023)".
pub fn parse_title(stem: &str) -> (String, Option<i32>) {
    let chars: Vec<char> = stem.chars().collect();
    let mut year = None;
    let mut cut: Option<(usize, usize)> = None;

    for i in 0..chars.len().saturating_sub(3) {
        let w = &chars[i..i + 4];
        if !w.iter().all(|c| c.is_ascii_digit()) {
            continue;
        }
        if !((w[0] == '1' && w[1] == '9') || (w[0] == '2' && w[1] == '0')) {
            continue;
        }
        let before_ok = i == 0 || !chars[i - 1].is_ascii_alphanumeric();
        let after_ok = i + 4 == chars.len() || !chars[i + 4].is_ascii_alphanumeric();
        if !(before_ok && after_ok) {
            continue;
        }

        year = w.iter().collect::<String>().parse::<i32>().ok();

        // Swallow the separators hugging the year ("(2023)", ".2023.").
        let mut lo = i;
        while lo > 0 && matches!(chars[lo - 1], '.' | ' ' | '(') {
            lo -= 1;
        }
        let mut hi = i + 4;
        while hi < chars.len() && matches!(chars[hi], '.' | ' ' | ')') {
            hi += 1;
        }
        cut = Some((lo, hi));
        break;
    }

    let title: String = chars
        .iter()
        .enumerate()
        .filter(|(i, _)| cut.map_or(true, |(lo, hi)| *i < lo || *i >= hi))
        .map(|(_, c)| if *c == '.' || *c == '_' { ' ' } else { *c })
        .collect();
    let title = title.split_whitespace().collect::<Vec<_>>().join(" ");

    (title, year)
}

/// Sidecar subtitle files: same directory, stem prefixed by the video's stem,
/// optional 2–3 letter language suffix ("movie.en.srt").
pub fn find_external_subtitles(video_path: &Path) -> Vec<Subtitle> {
    let mut subtitles = Vec::new();
    let Some(dir) = video_path.parent() else {
        return subtitles;
    };
    let Some(base) = video_path.file_stem().and_then(|s| s.to_str()) else {
        return subtitles;
    };
    let Ok(entries) = std::fs::read_dir(dir) else {
        return subtitles;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            continue;
        };
        let ext = ext.to_ascii_lowercase();
        if !SUBTITLE_EXTENSIONS.contains(&ext.as_str()) {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        if !stem.starts_with(base) {
            continue;
        }

        let suffix = stem[base.len()..].trim_matches(|c| c == '.' || c == '_' || c == '-');
        let language = if suffix.len() == 2 || suffix.len() == 3 {
            suffix.to_string()
        } else {
            String::new()
        };

        subtitles.push(Subtitle {
            index: subtitles.len() as i64,
            language,
            title: None,
            file_path: Some(path),
            is_external: true,
            format: ext,
        });
    }

    subtitles
}

/// Grab one frame as a JPEG thumbnail, seeking to 10% of the runtime capped
/// at 30 s.
async fn generate_thumbnail(
    ffmpeg_path: &str,
    video: &Path,
    thumb: &Path,
    duration: u64,
) -> std::io::Result<()> {
    let seek = (duration / 10).clamp(1, 30);

    let status = Command::new(ffmpeg_path)
        .arg("-ss")
        .arg(seek.to_string())
        .arg("-i")
        .arg(video)
        .args(["-vframes", "1", "-vf", "scale=320:-1", "-y"])
        .arg(thumb)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await?;

    if !status.success() {
        return Err(std::io::Error::other(format!(
            "ffmpeg thumbnail exited with {status}"
        )));
    }
    Ok(())
}
