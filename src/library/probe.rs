//! Container inspection via `ffprobe -print_format json`.

use std::path::Path;
use std::process::Stdio;

use serde::Deserialize;
use tokio::process::Command;

#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("failed to run ffprobe: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("ffprobe exited with status {0}")]
    Failed(std::process::ExitStatus),
    #[error("failed to parse ffprobe output: {0}")]
    Parse(#[from] serde_json::Error),
}

/// One embedded subtitle stream as reported by ffprobe.
#[derive(Debug, Clone)]
pub struct EmbeddedSubtitle {
    pub index: i64,
    pub language: String,
    pub title: Option<String>,
    pub format: String,
}

/// The subset of stream/format data the library records per movie.
#[derive(Debug, Clone, Default)]
pub struct ProbeInfo {
    pub duration: u64,
    pub video_codec: String,
    pub width: u32,
    pub height: u32,
    pub video_bitrate: u64,
    pub audio_codec: String,
    pub audio_channels: u32,
    pub subtitles: Vec<EmbeddedSubtitle>,
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    format: FfprobeFormat,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    index: Option<i64>,
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    bit_rate: Option<String>,
    channels: Option<u32>,
    #[serde(default)]
    tags: FfprobeTags,
}

#[derive(Debug, Default, Deserialize)]
struct FfprobeTags {
    language: Option<String>,
    title: Option<String>,
}

/// Inspect a media file. Returns an error if ffprobe cannot be run, fails,
/// or emits unparseable JSON — callers skip such files.
pub async fn probe(ffprobe_path: &str, path: &Path) -> Result<ProbeInfo, ProbeError> {
    let output = Command::new(ffprobe_path)
        .args(["-v", "quiet", "-print_format", "json", "-show_format", "-show_streams"])
        .arg(path)
        .stdin(Stdio::null())
        .stderr(Stdio::null())
        .output()
        .await?;

    if !output.status.success() {
        return Err(ProbeError::Failed(output.status));
    }

    let parsed: FfprobeOutput = serde_json::from_slice(&output.stdout)?;
    Ok(collect_info(parsed))
}

fn collect_info(parsed: FfprobeOutput) -> ProbeInfo {
    let mut info = ProbeInfo {
        duration: parsed
            .format
            .duration
            .as_deref()
            .and_then(|d| d.parse::<f64>().ok())
            .map(|d| d as u64)
            .unwrap_or(0),
        ..ProbeInfo::default()
    };

    for stream in parsed.streams {
        match stream.codec_type.as_deref() {
            Some("video") if info.video_codec.is_empty() => {
                info.video_codec = stream.codec_name.unwrap_or_default();
                info.width = stream.width.unwrap_or(0);
                info.height = stream.height.unwrap_or(0);
                info.video_bitrate = stream
                    .bit_rate
                    .as_deref()
                    .and_then(|b| b.parse().ok())
                    .unwrap_or(0);
            }
            Some("audio") if info.audio_codec.is_empty() => {
                info.audio_codec = stream.codec_name.unwrap_or_default();
                info.audio_channels = stream.channels.unwrap_or(0);
            }
            Some("subtitle") => {
                info.subtitles.push(EmbeddedSubtitle {
                    index: stream.index.unwrap_or(-1),
                    language: stream.tags.language.unwrap_or_default(),
                    title: stream.tags.title,
                    format: stream.codec_name.unwrap_or_default(),
                });
            }
            _ => {}
        }
    }

    info
}
