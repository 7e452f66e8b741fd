//! ContentDirectory SOAP service: a two-level catalogue (root → movies →
//! items) browsed by renderers.

use std::sync::atomic::Ordering;

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};

use crate::http::soap::{
    self, apply_pagination, extract_soap_param, format_didl_duration, soap_response, DLNA_FLAGS,
};
use crate::http::state::AppState;
use crate::library::Movie;

const DIDL_OPEN: &str = r#"<DIDL-Lite xmlns="urn:schemas-upnp-org:metadata-1-0/DIDL-Lite/" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:upnp="urn:schemas-upnp-org:metadata-1-0/upnp/" xmlns:dlna="urn:schemas-dlna-org:metadata-1-0/">"#;

fn ok_xml(body: String) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/xml; charset=\"utf-8\"")],
        body,
    )
        .into_response()
}

/// Main CDS control handler: actions are distinguished by substring match on
/// the SOAPAction header; anything unrecognized is a 400.
pub async fn control(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Response {
    let action = headers
        .get("soapaction")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if action.contains("Browse") {
        handle_browse(&state, &body)
    } else if action.contains("GetSystemUpdateID") {
        let inner = format!("<Id>{}</Id>", state.update_id.load(Ordering::Relaxed));
        ok_xml(soap_response("GetSystemUpdateID", &inner))
    } else if action.contains("GetSearchCapabilities") {
        ok_xml(soap_response("GetSearchCapabilities", "<SearchCaps></SearchCaps>"))
    } else if action.contains("GetSortCapabilities") {
        ok_xml(soap_response("GetSortCapabilities", "<SortCaps>dc:title</SortCaps>"))
    } else {
        tracing::warn!("Unknown CDS action: {:?}", action);
        (StatusCode::BAD_REQUEST, "Unknown action").into_response()
    }
}

fn handle_browse(state: &AppState, body: &str) -> Response {
    let object_id = extract_soap_param(body, "ObjectID").unwrap_or_default();
    let browse_flag = extract_soap_param(body, "BrowseFlag").unwrap_or_default();
    let starting_index: u32 = extract_soap_param(body, "StartingIndex")
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);
    let mut requested_count: u32 = extract_soap_param(body, "RequestedCount")
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);
    if requested_count == 0 {
        requested_count = 100;
    }

    let movies = state.library.movies();

    let (didl, number_returned, total_matches) = match object_id {
        "0" => {
            if browse_flag == "BrowseMetadata" {
                (root_metadata(), 1, 1)
            } else {
                (root_children(movies.len()), 1, 1)
            }
        }
        "movies" => {
            if browse_flag == "BrowseMetadata" {
                (movies_container(movies.len()), 1, 1)
            } else {
                movies_list(state, &movies, starting_index, requested_count)
            }
        }
        id => item_metadata(state, &movies, id),
    };

    let inner = format!(
        "<Result>{}</Result><NumberReturned>{}</NumberReturned><TotalMatches>{}</TotalMatches><UpdateID>{}</UpdateID>",
        soap::xml_escape(&didl),
        number_returned,
        total_matches,
        state.update_id.load(Ordering::Relaxed),
    );
    ok_xml(soap_response("Browse", &inner))
}

fn root_metadata() -> String {
    format!(
        r#"{DIDL_OPEN}<container id="0" parentID="-1" restricted="1" searchable="0"><dc:title>Root</dc:title><upnp:class>object.container</upnp:class></container></DIDL-Lite>"#
    )
}

/// The root has exactly one child: the movies container.
fn root_children(movie_count: usize) -> String {
    format!(
        r#"{DIDL_OPEN}<container id="movies" parentID="0" restricted="1" childCount="{movie_count}"><dc:title>Movies</dc:title><upnp:class>object.container.storageFolder</upnp:class></container></DIDL-Lite>"#
    )
}

fn movies_container(movie_count: usize) -> String {
    format!(
        r#"{DIDL_OPEN}<container id="movies" parentID="0" restricted="1" childCount="{movie_count}"><dc:title>Movies</dc:title><upnp:class>object.container.storageFolder</upnp:class></container></DIDL-Lite>"#
    )
}

fn movies_list(
    state: &AppState,
    movies: &[Movie],
    starting_index: u32,
    requested_count: u32,
) -> (String, usize, usize) {
    let total = movies.len();
    let page = apply_pagination(movies, starting_index, requested_count);

    let mut didl = String::from(DIDL_OPEN);
    for movie in page {
        didl.push_str(&movie_item(state, movie));
    }
    didl.push_str("</DIDL-Lite>");

    (didl, page.len(), total)
}

fn item_metadata(state: &AppState, movies: &[Movie], object_id: &str) -> (String, usize, usize) {
    match movies.iter().find(|m| m.id == object_id) {
        Some(movie) => {
            let didl = format!("{DIDL_OPEN}{}</DIDL-Lite>", movie_item(state, movie));
            (didl, 1, 1)
        }
        None => {
            tracing::debug!("Browse unknown ObjectID: {}", object_id);
            (
                r#"<DIDL-Lite xmlns="urn:schemas-upnp-org:metadata-1-0/DIDL-Lite/"></DIDL-Lite>"#
                    .to_string(),
                0,
                0,
            )
        }
    }
}

/// Encode one movie as a DIDL-Lite `<item>` with a single `<res>` carrying
/// the direct-stream URL.
fn movie_item(state: &AppState, movie: &Movie) -> String {
    let profile = dlna_profile(&movie.video_codec);
    format!(
        r#"<item id="{id}" parentID="movies" restricted="1"><dc:title>{title}</dc:title><upnp:class>object.item.videoItem.movie</upnp:class><res protocolInfo="http-get:*:video/mp4:DLNA.ORG_PN={profile};DLNA.ORG_OP=01;DLNA.ORG_FLAGS={flags}" size="{size}" duration="{duration}" resolution="{width}x{height}">{url}</res></item>"#,
        id = movie.id,
        title = soap::xml_escape(&movie.title),
        profile = profile,
        flags = DLNA_FLAGS,
        size = movie.file_size,
        duration = format_didl_duration(movie.duration),
        width = movie.video_width,
        height = movie.video_height,
        url = soap::xml_escape(&state.stream_url(&movie.id)),
    )
}

fn dlna_profile(video_codec: &str) -> &'static str {
    match video_codec {
        "hevc" | "h265" => "HEVC_Main10_L5",
        _ => "AVC_MP4_MP_SD_AAC_MULT5",
    }
}
