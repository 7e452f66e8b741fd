//! FFmpeg invocation: argument construction and child-process lifecycle for
//! both output shapes (fragmented MP4 on stdout, HLS segments on disk).

use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::process::Stdio;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, ReadBuf};
use tokio::process::{Child, ChildStdout, Command};

use crate::config::Config;
use crate::library::Movie;

/// Video codecs DLNA renderers play without help.
const COMPATIBLE_CODECS: &[&str] = &["h264", "avc", "avc1"];

/// Where the transcode goes: a pipe for direct HTTP streaming, or a
/// directory for HLS segments.
#[derive(Debug, Clone)]
pub enum Output {
    Mp4Pipe,
    Hls { dir: PathBuf },
}

#[derive(Debug, Clone)]
pub struct TranscodeOptions {
    pub video_codec: String,
    pub video_bitrate: String,
    /// Target dimensions; 0 keeps the aspect ratio on that axis.
    pub width: u32,
    pub height: u32,

    pub audio_codec: String,
    pub audio_bitrate: String,

    /// External subtitle file to burn into the picture.
    pub subtitle_path: Option<String>,
    /// Embedded subtitle stream to burn (container stream index).
    pub subtitle_index: Option<i64>,

    /// Seek before decoding, in seconds.
    pub start_time: u64,

    pub use_hardware_accel: bool,
}

impl TranscodeOptions {
    pub fn defaults(cfg: &Config) -> Self {
        TranscodeOptions {
            video_codec: "h264".to_string(),
            video_bitrate: cfg.video_bitrate.clone(),
            width: 0,
            height: 0,
            audio_codec: "aac".to_string(),
            audio_bitrate: cfg.audio_bitrate.clone(),
            subtitle_path: None,
            subtitle_index: None,
            start_time: 0,
            use_hardware_accel: hardware_accel_available(),
        }
    }
}

/// Rockchip MPP is the only hardware path supported; its device node is the
/// detection signal.
pub fn hardware_accel_available() -> bool {
    Path::new("/dev/mpp_service").exists()
}

/// Whether a movie must go through the transcoder to play on a renderer.
pub fn needs_transcode(movie: &Movie, burn_subtitle: bool) -> bool {
    if burn_subtitle {
        return true;
    }
    !COMPATIBLE_CODECS
        .iter()
        .any(|c| movie.video_codec.eq_ignore_ascii_case(c))
}

/// A live MP4 transcode: reads ffmpeg's stdout; dropping it kills and reaps
/// the child (client disconnects propagate as a drop of the response body).
pub struct TranscodePipe {
    stdout: ChildStdout,
    _child: Child,
}

impl AsyncRead for TranscodePipe {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        Pin::new(&mut self.stdout).poll_read(cx, buf)
    }
}

pub struct Transcoder {
    ffmpeg_path: String,
    preset: String,
}

impl Transcoder {
    pub fn new(cfg: &Config) -> Self {
        Transcoder {
            ffmpeg_path: cfg.ffmpeg_path.clone(),
            preset: cfg.preset.clone(),
        }
    }

    /// Start a fragmented-MP4 transcode streaming to stdout.
    pub fn spawn_pipe(
        &self,
        movie: &Movie,
        opts: &TranscodeOptions,
    ) -> std::io::Result<TranscodePipe> {
        let args = self.build_args(movie, opts, &Output::Mp4Pipe);
        tracing::debug!("ffmpeg pipe args: {}", args.join(" "));

        let mut child = Command::new(&self.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| std::io::Error::other("ffmpeg stdout not captured"))?;

        Ok(TranscodePipe {
            stdout,
            _child: child,
        })
    }

    /// Start an HLS transcode writing playlist + segments into `dir`. The
    /// child is detached from any request: the session manager owns it.
    pub fn spawn_hls(
        &self,
        movie: &Movie,
        opts: &TranscodeOptions,
        dir: &Path,
    ) -> std::io::Result<Child> {
        let args = self.build_args(movie, opts, &Output::Hls { dir: dir.to_path_buf() });
        tracing::debug!("ffmpeg hls args: {}", args.join(" "));

        Command::new(&self.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
    }

    /// Construct the full ffmpeg argument vector for a movie + options.
    pub fn build_args(
        &self,
        movie: &Movie,
        opts: &TranscodeOptions,
        output: &Output,
    ) -> Vec<String> {
        let mut args: Vec<String> = vec!["-hide_banner".into(), "-loglevel".into(), "warning".into()];

        if opts.use_hardware_accel {
            args.extend([
                "-hwaccel".into(),
                "rkmpp".into(),
                "-hwaccel_output_format".into(),
                "drm_prime".into(),
            ]);
        }

        // -ss before -i for keyframe-level (fast) seeking.
        if opts.start_time > 0 {
            args.extend(["-ss".into(), opts.start_time.to_string()]);
        }

        args.extend(["-i".into(), movie.file_path.to_string_lossy().into_owned()]);

        let mut filters: Vec<String> = Vec::new();

        if opts.use_hardware_accel {
            // Frames must leave the GPU for the subtitle/scale filters.
            filters.push("hwdownload".into());
            filters.push("format=nv12".into());
        }

        if let Some(ref sub_path) = opts.subtitle_path {
            filters.push(format!("subtitles='{}'", escape_filter_path(sub_path)));
        } else if let Some(index) = opts.subtitle_index {
            let input = movie.file_path.to_string_lossy().replace('\'', "\\'");
            filters.push(format!("subtitles='{}':si={}", input, index));
        }

        if opts.width > 0 || opts.height > 0 {
            let w = if opts.width > 0 { opts.width as i64 } else { -2 };
            let h = if opts.height > 0 { opts.height as i64 } else { -2 };
            filters.push(format!("scale={}:{}", w, h));
        }

        if opts.use_hardware_accel {
            filters.push("format=nv12".into());
            filters.push("hwupload".into());
        }

        if !filters.is_empty() {
            args.extend(["-vf".into(), filters.join(",")]);
        }

        if opts.use_hardware_accel {
            let codec = match opts.video_codec.as_str() {
                "hevc" | "h265" => "hevc_rkmpp",
                _ => "h264_rkmpp",
            };
            args.extend(["-c:v".into(), codec.into()]);
        } else {
            match opts.video_codec.as_str() {
                "hevc" | "h265" => {
                    args.extend(["-c:v".into(), "libx265".into(), "-pix_fmt".into(), "yuv420p".into()]);
                }
                _ => {
                    args.extend([
                        "-c:v".into(),
                        "libx264".into(),
                        "-preset".into(),
                        self.preset.clone(),
                        "-pix_fmt".into(),
                        "yuv420p".into(),
                        "-profile:v".into(),
                        "high".into(),
                        "-level:v".into(),
                        "4.0".into(),
                        "-colorspace".into(),
                        "bt709".into(),
                        "-color_primaries".into(),
                        "bt709".into(),
                        "-color_trc".into(),
                        "bt709".into(),
                        "-color_range".into(),
                        "tv".into(),
                    ]);
                }
            }
        }

        args.extend(["-b:v".into(), opts.video_bitrate.clone()]);
        args.extend([
            "-c:a".into(),
            opts.audio_codec.clone(),
            "-b:a".into(),
            opts.audio_bitrate.clone(),
        ]);

        match output {
            Output::Hls { dir } => {
                // Keyframes pinned to segment boundaries: 30 fps * 10 s
                // segments, scene-cut detection off for consistent cuts.
                args.extend([
                    "-g".into(),
                    "300".into(),
                    "-keyint_min".into(),
                    "300".into(),
                    "-sc_threshold".into(),
                    "0".into(),
                ]);
                args.extend([
                    "-f".into(),
                    "hls".into(),
                    "-hls_time".into(),
                    "10".into(),
                    "-hls_list_size".into(),
                    "0".into(),
                    "-hls_segment_filename".into(),
                    dir.join("segment_%03d.ts").to_string_lossy().into_owned(),
                    "-hls_flags".into(),
                    "independent_segments".into(),
                    "-hls_playlist_type".into(),
                    "event".into(),
                    "-start_number".into(),
                    "0".into(),
                    dir.join("playlist.m3u8").to_string_lossy().into_owned(),
                ]);
            }
            Output::Mp4Pipe => {
                args.extend([
                    "-movflags".into(),
                    "frag_keyframe+empty_moov+faststart".into(),
                    "-f".into(),
                    "mp4".into(),
                    "pipe:1".into(),
                ]);
            }
        }

        args
    }
}

/// Escape a path for the ffmpeg subtitles filter: `:` separates filter
/// options, quotes delimit the value, brackets delimit filter graphs.
pub fn escape_filter_path(path: &str) -> String {
    path.replace(':', "\\:")
        .replace('\'', "\\'")
        .replace('[', "\\[")
        .replace(']', "\\]")
}
