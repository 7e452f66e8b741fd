use cinecast::http::soap::{
    apply_pagination, extract_soap_param, format_didl_duration, format_hms, parse_hms,
    soap_response, soap_response_ns, xml_escape, CDS_NAMESPACE, CMS_NAMESPACE,
};

// ── extract_soap_param ────────────────────────────────────────────────────────

fn browse_body() -> &'static str {
    r#"<?xml version="1.0" encoding="utf-8"?>
<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/">
  <s:Body>
    <u:Browse xmlns:u="urn:schemas-upnp-org:service:ContentDirectory:1">
      <ObjectID>movies</ObjectID>
      <BrowseFlag>BrowseDirectChildren</BrowseFlag>
      <Filter>*</Filter>
      <StartingIndex>200</StartingIndex>
      <RequestedCount>100</RequestedCount>
      <SortCriteria></SortCriteria>
    </u:Browse>
  </s:Body>
</s:Envelope>"#
}

#[test]
fn extract_soap_param_object_id() {
    assert_eq!(extract_soap_param(browse_body(), "ObjectID"), Some("movies"));
}

#[test]
fn extract_soap_param_browse_flag() {
    assert_eq!(
        extract_soap_param(browse_body(), "BrowseFlag"),
        Some("BrowseDirectChildren")
    );
}

#[test]
fn extract_soap_param_starting_index() {
    assert_eq!(extract_soap_param(browse_body(), "StartingIndex"), Some("200"));
}

#[test]
fn extract_soap_param_missing_returns_none() {
    let body = "<u:Browse><ObjectID>42</ObjectID></u:Browse>";
    assert_eq!(extract_soap_param(body, "BrowseFlag"), None);
}

#[test]
fn extract_soap_param_empty_body_returns_none() {
    assert_eq!(extract_soap_param("", "ObjectID"), None);
}

// ── apply_pagination ──────────────────────────────────────────────────────────

#[test]
fn apply_pagination_normal_window() {
    let items = [1u32, 2, 3, 4, 5];
    assert_eq!(apply_pagination(&items, 1, 2), &[2, 3]);
}

#[test]
fn apply_pagination_count_exceeds_remaining_clamps() {
    let items = [1u32, 2, 3];
    assert_eq!(apply_pagination(&items, 1, 100), &[2, 3]);
}

#[test]
fn apply_pagination_start_beyond_end_is_empty() {
    let items = [1u32, 2, 3, 4, 5];
    assert_eq!(apply_pagination(&items, 10, 5), &[] as &[u32]);
}

#[test]
fn apply_pagination_start_at_end_is_empty() {
    let items = [1u32, 2, 3];
    assert_eq!(apply_pagination(&items, 3, 5), &[] as &[u32]);
}

#[test]
fn apply_pagination_empty_slice() {
    let items: [u32; 0] = [];
    assert_eq!(apply_pagination(&items, 0, 100), &[] as &[u32]);
}

#[test]
fn apply_pagination_window_size_matches_min_rule() {
    // NumberReturned must equal min(count, max(0, total - start)).
    let items: Vec<u32> = (0..250).collect();
    let page = apply_pagination(&items, 200, 100);
    assert_eq!(page.len(), 50);
    assert_eq!(page[0], 200);
    assert_eq!(page[49], 249);
}

// ── xml_escape ────────────────────────────────────────────────────────────────

#[test]
fn xml_escape_ampersand() {
    assert!(xml_escape("hello & world").contains("&amp;"));
}

#[test]
fn xml_escape_angle_brackets() {
    let result = xml_escape("<title>");
    assert!(result.contains("&lt;"));
    assert!(result.contains("&gt;"));
}

#[test]
fn xml_escape_plain_text_unchanged() {
    assert_eq!(xml_escape("normal text").as_ref(), "normal text");
}

// ── soap_response ─────────────────────────────────────────────────────────────

#[test]
fn soap_response_contains_xml_declaration() {
    let out = soap_response("Browse", "<Result></Result>");
    assert!(out.contains(r#"<?xml version="1.0""#));
}

#[test]
fn soap_response_wraps_action_response_tag() {
    let out = soap_response("Browse", "<Result></Result>");
    assert!(out.contains("<u:BrowseResponse"));
    assert!(out.contains("</u:BrowseResponse>"));
    assert!(out.contains("</s:Envelope>"));
}

#[test]
fn soap_response_contains_inner_xml_verbatim() {
    let inner = "<Result>some content</Result>";
    assert!(soap_response("Browse", inner).contains(inner));
}

#[test]
fn soap_response_uses_cds_namespace() {
    assert!(soap_response("Browse", "").contains(CDS_NAMESPACE));
}

#[test]
fn soap_response_ns_uses_given_namespace() {
    let out = soap_response_ns("GetProtocolInfo", "", CMS_NAMESPACE);
    assert!(out.contains(CMS_NAMESPACE));
    assert!(!out.contains(CDS_NAMESPACE));
}

// ── duration formatting ───────────────────────────────────────────────────────

#[test]
fn didl_duration_hours_unpadded() {
    assert_eq!(format_didl_duration(5025), "1:23:45");
}

#[test]
fn didl_duration_zero() {
    assert_eq!(format_didl_duration(0), "0:00:00");
}

#[test]
fn didl_duration_long_movie() {
    assert_eq!(format_didl_duration(10 * 3600 + 5), "10:00:05");
}

#[test]
fn hms_format_pads_all_fields() {
    assert_eq!(format_hms(5025), "01:23:45");
    assert_eq!(format_hms(0), "00:00:00");
}

#[test]
fn hms_parse_well_formed() {
    assert_eq!(parse_hms("01:23:45"), Some(5025));
    assert_eq!(parse_hms("00:00:00"), Some(0));
}

#[test]
fn hms_parse_rejects_malformed() {
    assert_eq!(parse_hms(""), None);
    assert_eq!(parse_hms("1:2"), None);
    assert_eq!(parse_hms("aa:bb:cc"), None);
    assert_eq!(parse_hms("00:61:00"), None);
    assert_eq!(parse_hms("00:00:00:00"), None);
}

#[test]
fn hms_round_trips_for_well_formed_input() {
    // format(parse(x)) == x for any well-formed HH:MM:SS with H <= 99.
    for x in ["00:00:00", "00:00:59", "01:23:45", "12:34:56", "99:59:59"] {
        let secs = parse_hms(x).unwrap();
        assert_eq!(format_hms(secs), x, "round trip failed for {x}");
    }
}
