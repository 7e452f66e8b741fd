use std::sync::atomic::AtomicU32;
use std::sync::Arc;

use crate::avtransport::AvTransportClient;
use crate::config::Config;
use crate::hls::HlsManager;
use crate::library::Library;
use crate::ssdp::peer::SsdpHandle;
use crate::transcode::Transcoder;

/// Shared application state injected into all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub library: Arc<Library>,
    pub ssdp: SsdpHandle,
    pub avtransport: Arc<AvTransportClient>,
    pub hls: Arc<HlsManager>,
    pub transcoder: Arc<Transcoder>,
    /// ContentDirectory SystemUpdateID: starts at 1, bumped when a scan
    /// completes.
    pub update_id: Arc<AtomicU32>,
    /// e.g. "http://192.168.1.5:8080" — every URL handed to renderers and
    /// clients is rooted here.
    pub base_url: String,
}

impl AppState {
    pub fn stream_url(&self, movie_id: &str) -> String {
        format!("{}/stream/{}", self.base_url, movie_id)
    }
}
