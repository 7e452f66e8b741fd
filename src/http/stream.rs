//! Streaming dispatcher: serves `/stream/{id}` either straight off disk
//! (byte ranges) or through a live ffmpeg transcode, and routes HLS
//! playlist/segment requests into the session manager.

use std::path::Path as FsPath;

use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Redirect, Response},
};
use http_range_header::parse_range_header;
use serde::Deserialize;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio_util::io::ReaderStream;

use crate::http::state::AppState;
use crate::library::Movie;
use crate::transcode::{needs_transcode, TranscodeOptions};

// DLNA.ORG_OP=01: byte seek supported. CI flags differ per path: direct
// serve hands out the original content (CI=0), the transcode pipe converts
// it (CI=1).
const DLNA_FEATURES_DIRECT: &str =
    "DLNA.ORG_OP=01;DLNA.ORG_CI=0;DLNA.ORG_FLAGS=01700000000000000000000000000000";
const DLNA_FEATURES_TRANSCODED: &str =
    "DLNA.ORG_OP=01;DLNA.ORG_CI=1;DLNA.ORG_FLAGS=01700000000000000000000000000000";

#[derive(Debug, Default, Deserialize)]
pub struct StreamQuery {
    pub transcode: Option<String>,
    pub subtitle: Option<String>,
    pub subtitle_index: Option<i64>,
    pub format: Option<String>,
    pub start: Option<u64>,
}

impl StreamQuery {
    fn wants_transcode(&self) -> bool {
        self.transcode.as_deref() == Some("1")
    }

    fn wants_subtitles(&self) -> bool {
        self.subtitle.is_some() || self.subtitle_index.is_some()
    }

    /// Query string for the HLS redirect: everything except `format`.
    fn hls_query(&self) -> String {
        let mut params = Vec::new();
        if let Some(ref t) = self.transcode {
            params.push(format!("transcode={}", t));
        }
        if let Some(ref s) = self.subtitle {
            params.push(format!(
                "subtitle={}",
                url::form_urlencoded::byte_serialize(s.as_bytes()).collect::<String>()
            ));
        }
        if let Some(i) = self.subtitle_index {
            params.push(format!("subtitle_index={}", i));
        }
        if let Some(s) = self.start {
            params.push(format!("start={}", s));
        }
        params.join("&")
    }
}

/// GET /stream/{id}: direct byte-range service or a transcoded MP4 pipe;
/// `?format=hls` redirects to the playlist route.
pub async fn stream_movie(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<StreamQuery>,
    req_headers: HeaderMap,
) -> Response {
    let Some(movie) = state.library.movie(&id) else {
        return (StatusCode::NOT_FOUND, "Movie not found").into_response();
    };

    if query.format.as_deref() == Some("hls") {
        let mut target = format!("/stream/{}/hls/playlist.m3u8", movie.id);
        let rest = query.hls_query();
        if !rest.is_empty() {
            target.push('?');
            target.push_str(&rest);
        }
        return Redirect::temporary(&target).into_response();
    }

    let burn = query.wants_subtitles();
    if query.wants_transcode() || burn || needs_transcode(&movie, burn) {
        serve_transcoded(&state, &movie, &query).await
    } else {
        serve_direct(&movie, &req_headers).await
    }
}

/// GET /stream/{id}/hls/{filename}: live playlist or a segment out of the
/// session's scratch directory.
pub async fn stream_hls(
    State(state): State<AppState>,
    Path((id, filename)): Path<(String, String)>,
    Query(query): Query<StreamQuery>,
) -> Response {
    if filename.ends_with(".m3u8") {
        serve_hls_playlist(&state, &id, &query).await
    } else if filename.ends_with(".ts") {
        serve_hls_segment(&state, &id, &filename).await
    } else {
        (StatusCode::BAD_REQUEST, "Invalid HLS file").into_response()
    }
}

async fn serve_hls_playlist(state: &AppState, movie_id: &str, query: &StreamQuery) -> Response {
    let Some(movie) = state.library.movie(movie_id) else {
        return (StatusCode::NOT_FOUND, "Movie not found").into_response();
    };

    let mut opts = TranscodeOptions::defaults(&state.config);
    opts.subtitle_path = query.subtitle.clone();
    opts.subtitle_index = query.subtitle_index;

    let transcoder = state.transcoder.clone();
    let result = state
        .hls
        .get_or_create(movie_id, |dir| transcoder.spawn_hls(&movie, &opts, dir))
        .await;

    let (session, ready) = match result {
        Ok(pair) => pair,
        Err(e) => {
            tracing::error!("HLS session for movie {} failed: {}", movie_id, e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to start HLS transcoding: {e}"),
            )
                .into_response();
        }
    };

    if !ready {
        return (StatusCode::SERVICE_UNAVAILABLE, "Playlist not ready yet").into_response();
    }

    match tokio::fs::read(session.playlist_path()).await {
        Ok(bytes) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, "application/vnd.apple.mpegurl"),
                (header::CACHE_CONTROL, "no-cache"),
            ],
            bytes,
        )
            .into_response(),
        Err(_) => (StatusCode::SERVICE_UNAVAILABLE, "Playlist not ready yet").into_response(),
    }
}

async fn serve_hls_segment(state: &AppState, movie_id: &str, filename: &str) -> Response {
    // No session means the idle sweeper took it; the renderer re-requests
    // the playlist and gets a fresh one.
    let Some(session) = state.hls.session_for_movie(movie_id).await else {
        return (StatusCode::NOT_FOUND, "Session expired").into_response();
    };

    match state.hls.open_segment(&session, filename).await {
        Ok(file) => {
            let body = Body::from_stream(ReaderStream::new(file));
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, "video/mp2t"),
                    (header::CACHE_CONTROL, "max-age=3600"),
                ],
                body,
            )
                .into_response()
        }
        Err(_) => (StatusCode::NOT_FOUND, "Segment not found").into_response(),
    }
}

/// Pipe a fragmented-MP4 transcode into the response body. Dropping the body
/// (client disconnect) kills and reaps the ffmpeg child.
async fn serve_transcoded(state: &AppState, movie: &Movie, query: &StreamQuery) -> Response {
    let mut opts = TranscodeOptions::defaults(&state.config);
    opts.subtitle_path = query.subtitle.clone();
    opts.subtitle_index = query.subtitle_index;
    opts.start_time = query.start.unwrap_or(0);

    let pipe = match state.transcoder.spawn_pipe(movie, &opts) {
        Ok(pipe) => pipe,
        Err(e) => {
            tracing::error!("Transcode of {} failed to start: {}", movie.id, e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Transcoding failed: {e}"),
            )
                .into_response();
        }
    };

    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("video/mp4"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(
        HeaderName::from_static("transfermode.dlna.org"),
        HeaderValue::from_static("Streaming"),
    );
    headers.insert(
        HeaderName::from_static("contentfeatures.dlna.org"),
        HeaderValue::from_static(DLNA_FEATURES_TRANSCODED),
    );

    let body = Body::from_stream(ReaderStream::new(pipe));
    (StatusCode::OK, headers, body).into_response()
}

/// Standard headers present on every direct media response.
fn direct_headers(movie: &Movie) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(content_type_for(&movie.file_path)),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(movie.file_size));
    headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
    headers.insert(
        HeaderName::from_static("transfermode.dlna.org"),
        HeaderValue::from_static("Streaming"),
    );
    headers.insert(
        HeaderName::from_static("contentfeatures.dlna.org"),
        HeaderValue::from_static(DLNA_FEATURES_DIRECT),
    );
    headers
}

/// Serve the file as-is, honouring a single RFC 7233 byte range.
async fn serve_direct(movie: &Movie, req_headers: &HeaderMap) -> Response {
    let headers = direct_headers(movie);

    if let Some(range_val) = req_headers.get(header::RANGE) {
        let range_str = match range_val.to_str() {
            Ok(s) => s.to_owned(),
            Err(_) => return range_not_satisfiable(movie.file_size),
        };
        return range_response(movie, &range_str, headers).await;
    }

    let file = match tokio::fs::File::open(&movie.file_path).await {
        Ok(f) => f,
        Err(e) => {
            tracing::error!("Failed to open {}: {}", movie.file_path.display(), e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to open file").into_response();
        }
    };
    let body = Body::from_stream(ReaderStream::new(file));
    (StatusCode::OK, headers, body).into_response()
}

fn range_not_satisfiable(file_size: u64) -> Response {
    (
        StatusCode::RANGE_NOT_SATISFIABLE,
        [("content-range", format!("bytes */{}", file_size))],
    )
        .into_response()
}

/// Handle a Range request: 206 Partial Content with the first requested
/// range, or 416. Multi-part ranges collapse to their first range.
async fn range_response(movie: &Movie, range_str: &str, mut headers: HeaderMap) -> Response {
    let parsed = match parse_range_header(range_str) {
        Ok(p) => p,
        Err(_) => return range_not_satisfiable(movie.file_size),
    };

    let ranges = match parsed.validate(movie.file_size) {
        Ok(r) => r,
        Err(_) => return range_not_satisfiable(movie.file_size),
    };

    let Some(first) = ranges.into_iter().next() else {
        return range_not_satisfiable(movie.file_size);
    };

    let start = *first.start();
    let end = *first.end(); // inclusive
    let length = end - start + 1;

    let mut file = match tokio::fs::File::open(&movie.file_path).await {
        Ok(f) => f,
        Err(e) => {
            tracing::error!("Failed to open {}: {}", movie.file_path.display(), e);
            return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to open file").into_response();
        }
    };

    if let Err(e) = file.seek(std::io::SeekFrom::Start(start)).await {
        tracing::error!("Failed to seek in {}: {}", movie.file_path.display(), e);
        return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to seek").into_response();
    }

    let content_range = format!("bytes {}-{}/{}", start, end, movie.file_size);
    headers.insert(
        header::CONTENT_RANGE,
        HeaderValue::from_str(&content_range)
            .unwrap_or_else(|_| HeaderValue::from_static("bytes 0-0/0")),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));

    let body = Body::from_stream(ReaderStream::new(file.take(length)));
    (StatusCode::PARTIAL_CONTENT, headers, body).into_response()
}

/// MIME type for direct service, by file extension.
pub fn content_type_for(path: &FsPath) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "mp4" | "m4v" => "video/mp4",
        "mkv" => "video/x-matroska",
        "avi" => "video/x-msvideo",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        "wmv" => "video/x-ms-wmv",
        "ts" | "m2ts" => "video/mp2t",
        _ => "video/mp4",
    }
}
