//! ConnectionManager SOAP service. Renderers probe it before playback; the
//! answers are static.

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};

use crate::http::soap::{soap_response_ns, CMS_NAMESPACE};
use crate::http::state::AppState;

/// Container formats this server can hand to a sink over http-get.
const SOURCE_MIMES: &[&str] = &[
    "video/mp4",
    "video/x-matroska",
    "video/x-msvideo",
    "video/webm",
];

fn ok_xml(body: String) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/xml; charset=\"utf-8\"")],
        body,
    )
        .into_response()
}

pub async fn control(
    State(_state): State<AppState>,
    headers: HeaderMap,
    _body: String,
) -> Response {
    let action = headers
        .get("soapaction")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if action.contains("GetProtocolInfo") {
        let source: String = SOURCE_MIMES
            .iter()
            .map(|mime| format!("http-get:*:{}:*", mime))
            .collect::<Vec<_>>()
            .join(",");
        let inner = format!("<Source>{}</Source><Sink></Sink>", source);
        ok_xml(soap_response_ns("GetProtocolInfo", &inner, CMS_NAMESPACE))
    } else if action.contains("GetCurrentConnectionIDs") {
        ok_xml(soap_response_ns(
            "GetCurrentConnectionIDs",
            "<ConnectionIDs>0</ConnectionIDs>",
            CMS_NAMESPACE,
        ))
    } else {
        tracing::warn!("Unknown CMS action: {:?}", action);
        (StatusCode::BAD_REQUEST, "Unknown action").into_response()
    }
}
