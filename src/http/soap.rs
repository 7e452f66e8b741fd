use std::borrow::Cow;

// ── Constants ─────────────────────────────────────────────────────────────────

pub const CDS_NAMESPACE: &str = "urn:schemas-upnp-org:service:ContentDirectory:1";
pub const CMS_NAMESPACE: &str = "urn:schemas-upnp-org:service:ConnectionManager:1";
pub const DLNA_FLAGS: &str = "01700000000000000000000000000000";

// ── SOAP envelope builder ─────────────────────────────────────────────────────

/// Build a SOAP 1.1 response envelope for an action in the given service
/// namespace.
pub fn soap_response_ns(action: &str, inner_xml: &str, namespace: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/"
            s:encodingStyle="http://schemas.xmlsoap.org/soap/encoding/">
  <s:Body>
    <u:{action}Response xmlns:u="{ns}">
      {inner_xml}
    </u:{action}Response>
  </s:Body>
</s:Envelope>"#,
        action = action,
        ns = namespace,
        inner_xml = inner_xml,
    )
}

/// ContentDirectory response envelope.
pub fn soap_response(action: &str, inner_xml: &str) -> String {
    soap_response_ns(action, inner_xml, CDS_NAMESPACE)
}

// ── SOAP parameter extraction ─────────────────────────────────────────────────

/// Extract a single SOAP body parameter by element name using string search.
/// Finds `<{param}>...</{param}>` and returns the content between the tags.
/// Fast and sufficient for the short, well-known bodies renderers send.
pub fn extract_soap_param<'a>(body: &'a str, param: &str) -> Option<&'a str> {
    let open = format!("<{}>", param);
    let close = format!("</{}>", param);
    let start = body.find(&open)? + open.len();
    let end = body[start..].find(&close)? + start;
    Some(&body[start..end])
}

// ── Pagination ────────────────────────────────────────────────────────────────

/// Slice `items` to the Browse window `[start, min(start+count, len))`.
/// A starting index beyond the end yields an empty slice.
pub fn apply_pagination<T>(items: &[T], starting_index: u32, requested_count: u32) -> &[T] {
    let start = (starting_index as usize).min(items.len());
    let end = start
        .saturating_add(requested_count as usize)
        .min(items.len());
    &items[start..end]
}

// ── XML escaping ──────────────────────────────────────────────────────────────

/// Escape the five XML special characters so titles and URLs can be embedded
/// in text nodes and attribute values.
pub fn xml_escape(s: &str) -> Cow<'_, str> {
    quick_xml::escape::escape(s)
}

// ── Duration formatting ───────────────────────────────────────────────────────

/// DIDL-Lite res duration: `H:MM:SS` (hours unpadded).
pub fn format_didl_duration(total_seconds: u64) -> String {
    let h = total_seconds / 3600;
    let m = (total_seconds % 3600) / 60;
    let s = total_seconds % 60;
    format!("{}:{:02}:{:02}", h, m, s)
}

/// Playback position format: `HH:MM:SS`, zero-padded.
/// `format_hms(parse_hms(x)) == x` for any well-formed x with hours <= 99.
pub fn format_hms(total_seconds: u64) -> String {
    let h = total_seconds / 3600;
    let m = (total_seconds % 3600) / 60;
    let s = total_seconds % 60;
    format!("{:02}:{:02}:{:02}", h, m, s)
}

/// Parse `HH:MM:SS` into seconds. Returns None for anything malformed.
pub fn parse_hms(value: &str) -> Option<u64> {
    let mut parts = value.split(':');
    let h: u64 = parts.next()?.parse().ok()?;
    let m: u64 = parts.next()?.parse().ok()?;
    let s: u64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() || m > 59 || s > 59 {
        return None;
    }
    Some(h * 3600 + m * 60 + s)
}
