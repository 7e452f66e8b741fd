//! SSDP wire messages: CRLF-terminated HTTP-like header blocks over UDP.
//! Bare \n line endings cause silent parse failures on strict clients
//! (Samsung TVs), so every builder emits \r\n.

use std::collections::HashMap;

use crate::ssdp::socket::{SSDP_MCAST_V4, SSDP_PORT};

pub const SSDP_MAX_AGE: u64 = 1800;

const SERVER_IDENT: &str = "Linux/6.1 UPnP/1.0 cinecast/0.1";

/// The NT set advertised for a MediaServer:1 with CDS + CMS.
pub const NOTIFY_TYPES: &[&str] = &[
    "upnp:rootdevice",
    "urn:schemas-upnp-org:device:MediaServer:1",
    "urn:schemas-upnp-org:service:ContentDirectory:1",
    "urn:schemas-upnp-org:service:ConnectionManager:1",
];

/// Search targets probed when looking for renderers.
pub const SEARCH_TARGETS: &[&str] = &[
    "ssdp:all",
    "urn:schemas-upnp-org:device:MediaRenderer:1",
    "urn:schemas-upnp-org:service:AVTransport:1",
    "urn:schemas-upnp-org:service:RenderingControl:1",
];

/// STs this server answers M-SEARCH probes for.
pub const ANSWERABLE_TARGETS: &[&str] = &[
    "ssdp:all",
    "upnp:rootdevice",
    "urn:schemas-upnp-org:device:MediaServer:1",
    "urn:schemas-upnp-org:service:ContentDirectory:1",
    "urn:schemas-upnp-org:service:ConnectionManager:1",
];

/// Build a NOTIFY message. `nts` is "ssdp:alive" or "ssdp:byebye";
/// `location` is the full URL of the device description.
pub fn notify(nts: &str, nt: &str, location: &str, device_uuid: &str) -> String {
    format!(
        "NOTIFY * HTTP/1.1\r\n\
HOST: {SSDP_MCAST_V4}:{SSDP_PORT}\r\n\
CACHE-CONTROL: max-age={SSDP_MAX_AGE}\r\n\
LOCATION: {location}\r\n\
NT: {nt}\r\n\
NTS: {nts}\r\n\
SERVER: {SERVER_IDENT}\r\n\
USN: uuid:{device_uuid}::{nt}\r\n\
\r\n"
    )
}

/// Build an M-SEARCH probe for the given search target.
pub fn msearch(st: &str) -> String {
    format!(
        "M-SEARCH * HTTP/1.1\r\n\
HOST: {SSDP_MCAST_V4}:{SSDP_PORT}\r\n\
MAN: \"ssdp:discover\"\r\n\
MX: 3\r\n\
ST: {st}\r\n\
\r\n"
    )
}

/// Build the unicast 200 response to an M-SEARCH, echoing `st`.
pub fn search_response(location: &str, st: &str, device_uuid: &str) -> String {
    let date = chrono::Utc::now().format("%a, %d %b %Y %H:%M:%S GMT");
    format!(
        "HTTP/1.1 200 OK\r\n\
CACHE-CONTROL: max-age={SSDP_MAX_AGE}\r\n\
DATE: {date}\r\n\
EXT:\r\n\
LOCATION: {location}\r\n\
SERVER: {SERVER_IDENT}\r\n\
ST: {st}\r\n\
USN: uuid:{device_uuid}::upnp:rootdevice\r\n\
\r\n"
    )
}

/// Split a datagram into its start line and a lowercase-keyed header map.
/// Returns None for an empty packet.
pub fn parse_message(packet: &str) -> Option<(&str, HashMap<String, String>)> {
    let mut lines = packet.split("\r\n");
    let start_line = lines.next()?.trim();
    if start_line.is_empty() {
        return None;
    }

    let mut headers = HashMap::new();
    for line in lines {
        if line.is_empty() {
            continue;
        }
        if let Some((key, value)) = line.split_once(':') {
            headers.insert(key.trim().to_ascii_lowercase(), value.trim().to_string());
        }
    }
    Some((start_line, headers))
}

/// Pull the device uuid out of a USN header.
/// USN format: uuid:XXXXXXXX-XXXX-XXXX-XXXX-XXXXXXXXXXXX::...
pub fn extract_uuid(usn: &str) -> Option<String> {
    let first = usn.split("::").next()?;
    let uuid = first.strip_prefix("uuid:").unwrap_or(first).trim();
    if uuid.is_empty() {
        None
    } else {
        Some(uuid.to_string())
    }
}

/// Whether an announcement looks like a media renderer worth tracking.
/// Case-insensitive substring match on the NT/ST header or the location URL.
pub fn is_renderer(service_type: &str, location: &str) -> bool {
    let ty = service_type.to_ascii_lowercase();
    let loc = location.to_ascii_lowercase();
    const MARKERS: &[&str] = &[
        "mediarenderer",
        "avtransport",
        "renderingcontrol",
        "tvrenderer",
        "render",
        "tv",
        "display",
    ];
    MARKERS.iter().any(|m| ty.contains(m) || loc.contains(m))
}
