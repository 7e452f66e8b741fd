//! JSON control surface for the browser UI: library listing, renderer
//! listing, casting, and playback control.

use std::sync::atomic::Ordering;

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::http::state::AppState;
use crate::library::{scanner, Movie, MovieSummary};

/// GET /api/movies
pub async fn list_movies(State(state): State<AppState>) -> Json<Vec<MovieSummary>> {
    let summaries = state.library.movies().iter().map(Into::into).collect();
    Json(summaries)
}

#[derive(Serialize)]
pub struct MovieResponse {
    #[serde(flatten)]
    movie: Movie,
    stream_url: String,
}

/// GET /api/movies/{id}
pub async fn get_movie(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    match state.library.movie(&id) {
        Some(movie) => {
            let stream_url = state.stream_url(&movie.id);
            Json(MovieResponse { movie, stream_url }).into_response()
        }
        None => (StatusCode::NOT_FOUND, "Movie not found").into_response(),
    }
}

/// GET /api/movies/{id}/thumbnail
pub async fn movie_thumbnail(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let Some(movie) = state.library.movie(&id) else {
        return (StatusCode::NOT_FOUND, "Movie not found").into_response();
    };
    let Some(thumb) = movie.thumbnail_path else {
        return (StatusCode::NOT_FOUND, "Thumbnail not available").into_response();
    };
    match tokio::fs::read(&thumb).await {
        Ok(bytes) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "image/jpeg")],
            bytes,
        )
            .into_response(),
        Err(_) => (StatusCode::NOT_FOUND, "Thumbnail not available").into_response(),
    }
}

/// GET /api/devices
pub async fn list_devices(State(state): State<AppState>) -> Response {
    Json(state.ssdp.renderers()).into_response()
}

/// POST /api/devices/refresh: re-issue the M-SEARCH burst and re-insert
/// any configured manual renderers.
pub async fn refresh_devices(State(state): State<AppState>) -> Response {
    state.ssdp.refresh();
    for device in &state.config.manual_devices {
        state.ssdp.add_manual(device);
    }
    Json(json!({"status": "ok"})).into_response()
}

#[derive(Debug, Deserialize)]
pub struct CastRequest {
    pub movie_id: String,
    pub device_uuid: String,
    pub subtitle_path: Option<String>,
    pub subtitle_index: Option<i64>,
    #[serde(default)]
    pub transcode: bool,
}

/// POST /api/cast: point the renderer at a stream URL and hit Play.
///
/// Renderer SOAP failures come back as HTTP 200 with an `error` field; the
/// UI keys off the field, not the status.
pub async fn cast(State(state): State<AppState>, Json(req): Json<CastRequest>) -> Response {
    let Some(movie) = state.library.movie(&req.movie_id) else {
        return (StatusCode::NOT_FOUND, "Movie not found").into_response();
    };
    let Some(device) = state.ssdp.renderer(&req.device_uuid) else {
        return (StatusCode::NOT_FOUND, "Device not found").into_response();
    };

    let stream_url = build_cast_url(&state, &movie, &req);

    if let Err(e) = state.avtransport.set_uri(&device, &stream_url, &movie.title).await {
        return Json(json!({"error": e.to_string()})).into_response();
    }
    if let Err(e) = state.avtransport.play(&device).await {
        return Json(json!({"error": e.to_string()})).into_response();
    }

    tracing::info!(
        "Casting \"{}\" to {} ({})",
        movie.title,
        device.friendly_name.as_deref().unwrap_or(&device.uuid),
        stream_url
    );
    Json(json!({"status": "playing", "stream_url": stream_url})).into_response()
}

/// Renderers buffer HLS better than a raw pipe, so any transcoding cast goes
/// through the playlist URL; a passthrough cast gets the direct URL.
pub fn build_cast_url(state: &AppState, movie: &Movie, req: &CastRequest) -> String {
    let transcoding =
        req.transcode || req.subtitle_path.is_some() || req.subtitle_index.is_some();

    let mut url = if transcoding {
        format!("{}/stream/{}/hls/playlist.m3u8", state.base_url, movie.id)
    } else {
        state.stream_url(&movie.id)
    };

    let mut params = Vec::new();
    if transcoding {
        params.push("transcode=1".to_string());
    }
    if let Some(ref path) = req.subtitle_path {
        params.push(format!(
            "subtitle={}",
            url::form_urlencoded::byte_serialize(path.as_bytes()).collect::<String>()
        ));
    }
    if let Some(index) = req.subtitle_index {
        params.push(format!("subtitle_index={}", index));
    }

    if !params.is_empty() {
        url.push('?');
        url.push_str(&params.join("&"));
    }
    url
}

#[derive(Debug, Deserialize)]
pub struct CastControlRequest {
    pub device_uuid: String,
    /// play, pause, stop, or seek.
    pub action: String,
    /// HH:MM:SS, required for seek.
    pub position: Option<String>,
}

/// POST /api/cast/control
pub async fn cast_control(
    State(state): State<AppState>,
    Json(req): Json<CastControlRequest>,
) -> Response {
    let Some(device) = state.ssdp.renderer(&req.device_uuid) else {
        return (StatusCode::NOT_FOUND, "Device not found").into_response();
    };

    let result = match req.action.as_str() {
        "play" => state.avtransport.play(&device).await,
        "pause" => state.avtransport.pause(&device).await,
        "stop" => state.avtransport.stop(&device).await,
        "seek" => {
            let Some(ref position) = req.position else {
                return (StatusCode::BAD_REQUEST, "position required for seek").into_response();
            };
            state.avtransport.seek(&device, position).await
        }
        _ => return (StatusCode::BAD_REQUEST, "Unknown action").into_response(),
    };

    match result {
        Ok(()) => Json(json!({"status": "ok"})).into_response(),
        Err(e) => Json(json!({"error": e.to_string()})).into_response(),
    }
}

#[derive(Debug, Deserialize)]
pub struct PlaybackQuery {
    pub device_uuid: Option<String>,
}

/// GET /api/cast/control?device_uuid=...: position and transport state in
/// one view.
pub async fn playback_status(
    State(state): State<AppState>,
    Query(query): Query<PlaybackQuery>,
) -> Response {
    let Some(uuid) = query.device_uuid else {
        return (StatusCode::BAD_REQUEST, "device_uuid required").into_response();
    };
    let Some(device) = state.ssdp.renderer(&uuid) else {
        return (StatusCode::NOT_FOUND, "Device not found").into_response();
    };

    let mut playback = match state.avtransport.position_info(&device).await {
        Ok(info) => info,
        Err(e) => return Json(json!({"error": e.to_string()})).into_response(),
    };
    if let Ok(transport) = state.avtransport.transport_info(&device).await {
        playback.transport_state = transport.transport_state;
    }

    Json(playback).into_response()
}

/// POST /api/scan: kick off a rescan in the background and return at once.
pub async fn scan(State(state): State<AppState>) -> Response {
    let library = state.library.clone();
    let config = state.config.clone();
    let update_id = state.update_id.clone();
    tokio::spawn(async move {
        match scanner::scan(&library, &config).await {
            Ok(total) => {
                update_id.fetch_add(1, Ordering::Relaxed);
                tracing::info!("Scan completed: {} movies", total);
            }
            Err(e) => tracing::error!("Scan failed: {}", e),
        }
    });
    Json(json!({"status": "scanning"})).into_response()
}
