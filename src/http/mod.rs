pub mod api;
pub mod content_directory;
pub mod description;
pub mod soap;
pub mod state;
pub mod stream;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::http::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        // REST control surface
        .route("/api/movies", get(api::list_movies))
        .route("/api/movies/{id}", get(api::get_movie))
        .route("/api/movies/{id}/thumbnail", get(api::movie_thumbnail))
        .route("/api/devices", get(api::list_devices))
        .route("/api/devices/refresh", post(api::refresh_devices))
        .route("/api/cast", post(api::cast))
        .route(
            "/api/cast/control",
            get(api::playback_status).post(api::cast_control),
        )
        .route("/api/scan", post(api::scan))
        // Streaming
        .route("/stream/{id}", get(stream::stream_movie))
        .route("/stream/{id}/hls/{filename}", get(stream::stream_hls))
        // UPnP description + control
        .route("/dlna/device.xml", get(description::serve_device_xml))
        .route("/dlna/ContentDirectory.xml", get(description::serve_cds_scpd))
        .route("/dlna/ConnectionManager.xml", get(description::serve_cms_scpd))
        .route(
            "/dlna/ContentDirectory/control",
            post(content_directory::control),
        )
        .route("/dlna/ConnectionManager/control", post(crate::cms::control))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
