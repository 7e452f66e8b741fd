use std::path::PathBuf;
use std::sync::atomic::AtomicU32;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use chrono::Utc;
use http_body_util::BodyExt;
use tower::ServiceExt;

use cinecast::avtransport::AvTransportClient;
use cinecast::config::{Config, ManualDevice};
use cinecast::hls::HlsManager;
use cinecast::http::{build_router, state::AppState};
use cinecast::library::{Library, Movie};
use cinecast::ssdp::peer::SsdpHandle;
use cinecast::transcode::Transcoder;

const TEST_UUID: &str = "550e8400-e29b-41d4-a716-446655440000";
const TEST_NAME: &str = "Test Movie Server";
const BASE_URL: &str = "http://127.0.0.1:8080";

struct TestApp {
    _tmp: tempfile::TempDir,
    state: AppState,
}

impl TestApp {
    fn router(&self) -> axum::Router {
        build_router(self.state.clone())
    }
}

fn make_app(movies: Vec<Movie>) -> TestApp {
    let tmp = tempfile::tempdir().unwrap();
    let mut config = Config::default();
    config.friendly_name = TEST_NAME.to_string();
    config.db_path = tmp.path().join("library.db");
    config.thumbnail_dir = tmp.path().join("thumbnails");

    let library = Library::open(&config.db_path).unwrap();
    for movie in &movies {
        library.store().upsert(movie).unwrap();
    }
    library.reload().unwrap();

    let hls = HlsManager::new(tmp.path().join("hls")).unwrap();
    let config = Arc::new(config);

    let state = AppState {
        config: Arc::clone(&config),
        library: Arc::new(library),
        ssdp: SsdpHandle::disconnected(TEST_UUID),
        avtransport: Arc::new(AvTransportClient::new().unwrap()),
        hls: Arc::new(hls),
        transcoder: Arc::new(Transcoder::new(&config)),
        update_id: Arc::new(AtomicU32::new(1)),
        base_url: BASE_URL.to_string(),
    };

    TestApp { _tmp: tmp, state }
}

fn movie(id: &str, title: &str, codec: &str, file_path: PathBuf, file_size: u64) -> Movie {
    Movie {
        id: id.to_string(),
        title: title.to_string(),
        year: Some(2020),
        duration: 5400,
        file_path,
        file_size,
        video_codec: codec.to_string(),
        video_width: 1920,
        video_height: 1080,
        video_bitrate: 8_000_000,
        audio_codec: "aac".to_string(),
        audio_channels: 2,
        subtitles: Vec::new(),
        thumbnail_path: None,
        added_at: Utc::now(),
        modified_at: Utc::now(),
    }
}

fn fake_movie(id: &str, title: &str) -> Movie {
    movie(id, title, "h264", PathBuf::from("/fake/test.mp4"), 1_048_576)
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, json: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(json.to_string()))
        .unwrap()
}

fn soap_request(uri: &str, action: &str, body: &'static str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("soapaction", format!("\"{action}\""))
        .header("content-type", "text/xml; charset=\"utf-8\"")
        .body(Body::from(body))
        .unwrap()
}

fn browse_body(object_id: &str, flag: &str, start: u32, count: u32) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/">
  <s:Body>
    <u:Browse xmlns:u="urn:schemas-upnp-org:service:ContentDirectory:1">
      <ObjectID>{object_id}</ObjectID>
      <BrowseFlag>{flag}</BrowseFlag>
      <Filter>*</Filter>
      <StartingIndex>{start}</StartingIndex>
      <RequestedCount>{count}</RequestedCount>
      <SortCriteria></SortCriteria>
    </u:Browse>
  </s:Body>
</s:Envelope>"#
    )
}

fn browse_request(body: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/dlna/ContentDirectory/control")
        .header(
            "soapaction",
            "\"urn:schemas-upnp-org:service:ContentDirectory:1#Browse\"",
        )
        .header("content-type", "text/xml; charset=\"utf-8\"")
        .body(Body::from(body))
        .unwrap()
}

// ── /dlna/device.xml ──────────────────────────────────────────────────────────

#[tokio::test]
async fn device_xml_contains_uuid_and_name() {
    let app = make_app(vec![]);
    let response = app.router().oneshot(get("/dlna/device.xml")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let text = body_text(response).await;
    assert!(text.contains(TEST_UUID), "Expected uuid in device.xml:\n{text}");
    assert!(text.contains(TEST_NAME), "Expected friendly name in device.xml:\n{text}");
}

#[tokio::test]
async fn device_xml_advertises_both_services() {
    let app = make_app(vec![]);
    let response = app.router().oneshot(get("/dlna/device.xml")).await.unwrap();
    let text = body_text(response).await;
    assert!(text.contains("/dlna/ContentDirectory/control"));
    assert!(text.contains("/dlna/ConnectionManager/control"));
}

#[tokio::test]
async fn scpd_documents_are_served() {
    let app = make_app(vec![]);
    let response = app.router().oneshot(get("/dlna/ContentDirectory.xml")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("<name>Browse</name>"));

    let response = app.router().oneshot(get("/dlna/ConnectionManager.xml")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("<name>GetProtocolInfo</name>"));
}

// ── ContentDirectory control ──────────────────────────────────────────────────

#[tokio::test]
async fn browse_root_children_lists_the_movies_container() {
    let app = make_app(vec![fake_movie("m1", "Alpha")]);
    let response = app
        .router()
        .oneshot(browse_request(browse_body("0", "BrowseDirectChildren", 0, 0)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let text = body_text(response).await;
    assert!(text.contains("movies"), "Expected movies container in:\n{text}");
    assert!(text.contains("<NumberReturned>1</NumberReturned>"));
    assert!(text.contains("<TotalMatches>1</TotalMatches>"));
}

#[tokio::test]
async fn browse_movies_returns_items_with_stream_urls() {
    let app = make_app(vec![fake_movie("m1", "Alpha"), fake_movie("m2", "Beta")]);
    let response = app
        .router()
        .oneshot(browse_request(browse_body("movies", "BrowseDirectChildren", 0, 0)))
        .await
        .unwrap();
    let text = body_text(response).await;
    assert!(text.contains("<NumberReturned>2</NumberReturned>"), "in:\n{text}");
    assert!(text.contains("<TotalMatches>2</TotalMatches>"), "in:\n{text}");
    // DIDL is escaped into <Result>; the stream URL survives double-escaping.
    assert!(text.contains("stream/m1"), "Expected stream URL in:\n{text}");
    assert!(text.contains("object.item.videoItem.movie"), "in:\n{text}");
}

#[tokio::test]
async fn browse_pagination_clamps_the_window() {
    // 250 movies, StartingIndex=200, RequestedCount=100 -> 50 returned.
    let movies: Vec<Movie> = (0..250)
        .map(|i| fake_movie(&format!("m{i:03}"), &format!("Movie {i:03}")))
        .collect();
    let app = make_app(movies);

    let response = app
        .router()
        .oneshot(browse_request(browse_body("movies", "BrowseDirectChildren", 200, 100)))
        .await
        .unwrap();
    let text = body_text(response).await;
    assert!(text.contains("<NumberReturned>50</NumberReturned>"), "in:\n{text}");
    assert!(text.contains("<TotalMatches>250</TotalMatches>"), "in:\n{text}");
    assert!(text.contains("Movie 200"), "window should start at position 200");
    assert!(text.contains("Movie 249"), "window should end at position 249");
    assert!(!text.contains("Movie 199"), "positions before the window must be absent");
}

#[tokio::test]
async fn browse_requested_count_zero_defaults_to_100() {
    let movies: Vec<Movie> = (0..150)
        .map(|i| fake_movie(&format!("m{i:03}"), &format!("Movie {i:03}")))
        .collect();
    let app = make_app(movies);

    let response = app
        .router()
        .oneshot(browse_request(browse_body("movies", "BrowseDirectChildren", 0, 0)))
        .await
        .unwrap();
    let text = body_text(response).await;
    assert!(text.contains("<NumberReturned>100</NumberReturned>"), "in:\n{text}");
    assert!(text.contains("<TotalMatches>150</TotalMatches>"), "in:\n{text}");
}

#[tokio::test]
async fn browse_start_beyond_total_returns_zero_items() {
    let app = make_app(vec![fake_movie("m1", "Alpha")]);
    let response = app
        .router()
        .oneshot(browse_request(browse_body("movies", "BrowseDirectChildren", 10, 10)))
        .await
        .unwrap();
    let text = body_text(response).await;
    assert!(text.contains("<NumberReturned>0</NumberReturned>"), "in:\n{text}");
    assert!(text.contains("<TotalMatches>1</TotalMatches>"), "in:\n{text}");
}

#[tokio::test]
async fn browse_single_item_metadata() {
    let app = make_app(vec![fake_movie("m1", "Alpha")]);
    let response = app
        .router()
        .oneshot(browse_request(browse_body("m1", "BrowseMetadata", 0, 0)))
        .await
        .unwrap();
    let text = body_text(response).await;
    assert!(text.contains("<NumberReturned>1</NumberReturned>"), "in:\n{text}");
    assert!(text.contains("Alpha"), "in:\n{text}");
}

#[tokio::test]
async fn browse_unknown_object_returns_empty_didl() {
    let app = make_app(vec![fake_movie("m1", "Alpha")]);
    let response = app
        .router()
        .oneshot(browse_request(browse_body("no-such-id", "BrowseMetadata", 0, 0)))
        .await
        .unwrap();
    let text = body_text(response).await;
    assert!(text.contains("<NumberReturned>0</NumberReturned>"), "in:\n{text}");
    assert!(text.contains("<TotalMatches>0</TotalMatches>"), "in:\n{text}");
}

#[tokio::test]
async fn get_system_update_id_starts_at_one() {
    let app = make_app(vec![]);
    let response = app
        .router()
        .oneshot(soap_request(
            "/dlna/ContentDirectory/control",
            "urn:schemas-upnp-org:service:ContentDirectory:1#GetSystemUpdateID",
            "",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("<Id>1</Id>"));
}

#[tokio::test]
async fn unknown_cds_action_is_a_400() {
    let app = make_app(vec![]);
    let response = app
        .router()
        .oneshot(soap_request(
            "/dlna/ContentDirectory/control",
            "urn:schemas-upnp-org:service:ContentDirectory:1#DestroyObject",
            "",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ── ConnectionManager control ─────────────────────────────────────────────────

#[tokio::test]
async fn cms_get_protocol_info_lists_video_sources() {
    let app = make_app(vec![]);
    let response = app
        .router()
        .oneshot(soap_request(
            "/dlna/ConnectionManager/control",
            "urn:schemas-upnp-org:service:ConnectionManager:1#GetProtocolInfo",
            "",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let text = body_text(response).await;
    assert!(text.contains("<Source>"), "in:\n{text}");
    assert!(text.contains("http-get:*:video/mp4:*"), "in:\n{text}");
}

#[tokio::test]
async fn unknown_cms_action_is_a_400() {
    let app = make_app(vec![]);
    let response = app
        .router()
        .oneshot(soap_request(
            "/dlna/ConnectionManager/control",
            "urn:schemas-upnp-org:service:ConnectionManager:1#PrepareForConnection",
            "",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ── REST API ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn api_movies_lists_summaries() {
    let app = make_app(vec![fake_movie("m1", "Alpha"), fake_movie("m2", "Beta")]);
    let response = app.router().oneshot(get("/api/movies")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    let list = json.as_array().unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0]["title"], "Alpha");
    assert_eq!(list[0]["has_subtitles"], false);
}

#[tokio::test]
async fn api_movie_detail_includes_stream_url() {
    let app = make_app(vec![fake_movie("m1", "Alpha")]);
    let response = app.router().oneshot(get("/api/movies/m1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(json["stream_url"], format!("{BASE_URL}/stream/m1"));
    assert_eq!(json["video_codec"], "h264");
}

#[tokio::test]
async fn api_unknown_movie_is_404() {
    let app = make_app(vec![]);
    let response = app.router().oneshot(get("/api/movies/nope")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn api_thumbnail_missing_is_404() {
    let app = make_app(vec![fake_movie("m1", "Alpha")]);
    let response = app
        .router()
        .oneshot(get("/api/movies/m1/thumbnail"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn api_devices_reflects_manual_insertion() {
    let app = make_app(vec![]);
    let response = app.router().oneshot(get("/api/devices")).await.unwrap();
    let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(json.as_array().unwrap().len(), 0);

    app.state.ssdp.add_manual(&ManualDevice {
        ip: "192.168.1.50".into(),
        port: 49152,
        path: "/desc.xml".into(),
        name: "Bedroom TV".into(),
    });

    let response = app.router().oneshot(get("/api/devices")).await.unwrap();
    let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    let list = json.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["uuid"], "manual-192.168.1.50-49152");
    assert_eq!(list[0]["friendly_name"], "Bedroom TV");
    assert_eq!(list[0]["location"], "http://192.168.1.50:49152/desc.xml");
}

#[tokio::test]
async fn api_refresh_devices_returns_ok() {
    let app = make_app(vec![]);
    let response = app
        .router()
        .oneshot(post_json("/api/devices/refresh", ""))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("\"ok\""));
}

#[tokio::test]
async fn api_cast_unknown_movie_is_404() {
    let app = make_app(vec![]);
    let response = app
        .router()
        .oneshot(post_json(
            "/api/cast",
            r#"{"movie_id": "nope", "device_uuid": "dev"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn api_cast_unknown_device_is_404() {
    let app = make_app(vec![fake_movie("m1", "Alpha")]);
    let response = app
        .router()
        .oneshot(post_json(
            "/api/cast",
            r#"{"movie_id": "m1", "device_uuid": "nope"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ── cast URL construction ─────────────────────────────────────────────────────

use cinecast::http::api::{build_cast_url, CastRequest};

fn cast_request(movie_id: &str) -> CastRequest {
    CastRequest {
        movie_id: movie_id.to_string(),
        device_uuid: "dev".to_string(),
        subtitle_path: None,
        subtitle_index: None,
        transcode: false,
    }
}

#[tokio::test]
async fn cast_url_passthrough_is_the_direct_stream() {
    let app = make_app(vec![]);
    let m = fake_movie("m1", "Alpha");
    let url = build_cast_url(&app.state, &m, &cast_request("m1"));
    assert_eq!(url, format!("{BASE_URL}/stream/m1"));
}

#[tokio::test]
async fn cast_url_transcode_goes_through_hls() {
    let app = make_app(vec![]);
    let m = fake_movie("m1", "Alpha");
    let mut req = cast_request("m1");
    req.transcode = true;
    let url = build_cast_url(&app.state, &m, &req);
    assert_eq!(
        url,
        format!("{BASE_URL}/stream/m1/hls/playlist.m3u8?transcode=1")
    );
}

#[tokio::test]
async fn cast_url_subtitle_selection_forces_hls() {
    let app = make_app(vec![]);
    let m = fake_movie("m1", "Alpha");
    let mut req = cast_request("m1");
    req.subtitle_path = Some("/srt/en fr.srt".to_string());
    let url = build_cast_url(&app.state, &m, &req);
    assert!(url.contains("/hls/playlist.m3u8?"), "got: {url}");
    assert!(url.contains("transcode=1"), "got: {url}");
    assert!(url.contains("subtitle=%2Fsrt%2Fen+fr.srt"), "got: {url}");
}

#[tokio::test]
async fn cast_url_formats_two_digit_subtitle_indices() {
    let app = make_app(vec![]);
    let m = fake_movie("m1", "Alpha");
    let mut req = cast_request("m1");
    req.subtitle_index = Some(12);
    let url = build_cast_url(&app.state, &m, &req);
    assert!(url.contains("subtitle_index=12"), "got: {url}");
}

#[tokio::test]
async fn api_cast_control_requires_device_uuid() {
    let app = make_app(vec![]);
    let response = app.router().oneshot(get("/api/cast/control")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn api_cast_control_unknown_action_is_400() {
    let app = make_app(vec![]);
    app.state.ssdp.add_manual(&ManualDevice {
        ip: "192.168.1.50".into(),
        port: 49152,
        path: "/desc.xml".into(),
        name: "Bedroom TV".into(),
    });
    let response = app
        .router()
        .oneshot(post_json(
            "/api/cast/control",
            r#"{"device_uuid": "manual-192.168.1.50-49152", "action": "rewind"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn api_cast_control_seek_requires_position() {
    let app = make_app(vec![]);
    app.state.ssdp.add_manual(&ManualDevice {
        ip: "192.168.1.50".into(),
        port: 49152,
        path: "/desc.xml".into(),
        name: "Bedroom TV".into(),
    });
    let response = app
        .router()
        .oneshot(post_json(
            "/api/cast/control",
            r#"{"device_uuid": "manual-192.168.1.50-49152", "action": "seek"}"#,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn api_scan_returns_immediately() {
    let app = make_app(vec![]);
    let response = app.router().oneshot(post_json("/api/scan", "")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("scanning"));
}

// ── streaming ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn stream_unknown_movie_is_404() {
    let app = make_app(vec![]);
    let response = app.router().oneshot(get("/stream/nope")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

fn on_disk_movie(tmp: &tempfile::TempDir, size: usize) -> Movie {
    let path = tmp.path().join("video.mp4");
    let data: Vec<u8> = (0..size).map(|i| (i % 251) as u8).collect();
    std::fs::write(&path, &data).unwrap();
    movie("m1", "Alpha", "h264", path, size as u64)
}

#[tokio::test]
async fn direct_stream_full_get_has_range_and_dlna_headers() {
    let tmp = tempfile::tempdir().unwrap();
    let app = make_app(vec![on_disk_movie(&tmp, 10_000)]);

    let response = app.router().oneshot(get("/stream/m1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::ACCEPT_RANGES).unwrap(),
        "bytes"
    );
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "video/mp4"
    );
    let features = response
        .headers()
        .get("contentfeatures.dlna.org")
        .unwrap()
        .to_str()
        .unwrap();
    assert!(features.contains("DLNA.ORG_CI=0"), "direct serve is not converted");
}

#[tokio::test]
async fn direct_stream_honours_byte_ranges() {
    let tmp = tempfile::tempdir().unwrap();
    let app = make_app(vec![on_disk_movie(&tmp, 10_000)]);

    let request = Request::builder()
        .uri("/stream/m1")
        .header(header::RANGE, "bytes=100-199")
        .body(Body::empty())
        .unwrap();
    let response = app.router().oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);
    assert_eq!(response.headers().get(header::CONTENT_LENGTH).unwrap(), "100");
    assert_eq!(
        response.headers().get(header::CONTENT_RANGE).unwrap(),
        "bytes 100-199/10000"
    );

    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let expected: Vec<u8> = (100..200usize).map(|i| (i % 251) as u8).collect();
    assert_eq!(bytes.as_ref(), expected.as_slice());
}

#[tokio::test]
async fn direct_stream_unsatisfiable_range_is_416() {
    let tmp = tempfile::tempdir().unwrap();
    let app = make_app(vec![on_disk_movie(&tmp, 1_000)]);

    let request = Request::builder()
        .uri("/stream/m1")
        .header(header::RANGE, "bytes=5000-6000")
        .body(Body::empty())
        .unwrap();
    let response = app.router().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::RANGE_NOT_SATISFIABLE);
}

#[tokio::test]
async fn format_hls_redirects_to_the_playlist() {
    let tmp = tempfile::tempdir().unwrap();
    let app = make_app(vec![on_disk_movie(&tmp, 1_000)]);

    let response = app
        .router()
        .oneshot(get("/stream/m1?format=hls&subtitle_index=3"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::TEMPORARY_REDIRECT);
    let location = response.headers().get(header::LOCATION).unwrap().to_str().unwrap();
    assert!(location.starts_with("/stream/m1/hls/playlist.m3u8"), "got: {location}");
    assert!(location.contains("subtitle_index=3"), "params survive the redirect: {location}");
    assert!(!location.contains("format="), "format param must not loop: {location}");
}

#[tokio::test]
async fn hls_segment_without_session_is_session_expired() {
    let tmp = tempfile::tempdir().unwrap();
    let app = make_app(vec![on_disk_movie(&tmp, 1_000)]);

    let response = app
        .router()
        .oneshot(get("/stream/m1/hls/segment_000.ts"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_text(response).await, "Session expired");
}

#[tokio::test]
async fn hls_unknown_file_kind_is_400() {
    let tmp = tempfile::tempdir().unwrap();
    let app = make_app(vec![on_disk_movie(&tmp, 1_000)]);

    let response = app
        .router()
        .oneshot(get("/stream/m1/hls/notes.txt"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
