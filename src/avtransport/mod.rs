//! SOAP control client for the AVTransport:1 service on remote renderers.

use std::time::Duration;

use serde::Serialize;

use crate::ssdp::peer::Renderer;

const AVTRANSPORT_SERVICE: &str = "urn:schemas-upnp-org:service:AVTransport:1";

#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    #[error("AVTransport control URL not found for device")]
    NoControlUrl,
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("SOAP action failed with status {status}: {body}")]
    Soap { status: u16, body: String },
}

/// What a renderer reports about current playback.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PlaybackState {
    pub transport_state: String,
    pub current_position: String,
    pub duration: String,
    pub current_uri: String,
}

/// Client for driving renderers. The control URL is rediscovered per call —
/// renderers come and go, and the description fetch is one cheap LAN GET.
pub struct AvTransportClient {
    http: reqwest::Client,
}

impl AvTransportClient {
    pub fn new() -> reqwest::Result<Self> {
        Ok(AvTransportClient {
            http: reqwest::Client::builder()
                .timeout(Duration::from_secs(10))
                .build()?,
        })
    }

    /// SetAVTransportURI with a minimal DIDL-Lite item as metadata.
    pub async fn set_uri(
        &self,
        renderer: &Renderer,
        media_url: &str,
        title: &str,
    ) -> Result<(), ControlError> {
        let metadata = xml_escape(&format!(
            r#"<DIDL-Lite xmlns="urn:schemas-upnp-org:metadata-1-0/DIDL-Lite/" xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:upnp="urn:schemas-upnp-org:metadata-1-0/upnp/"><item id="0" parentID="-1" restricted="1"><dc:title>{}</dc:title><res protocolInfo="http-get:*:video/mp4:*">{}</res><upnp:class>object.item.videoItem</upnp:class></item></DIDL-Lite>"#,
            xml_escape(title),
            xml_escape(media_url),
        ));

        let inner = format!(
            "<InstanceID>0</InstanceID><CurrentURI>{}</CurrentURI><CurrentURIMetaData>{}</CurrentURIMetaData>",
            xml_escape(media_url),
            metadata,
        );
        self.invoke(renderer, "SetAVTransportURI", &inner).await?;
        Ok(())
    }

    pub async fn play(&self, renderer: &Renderer) -> Result<(), ControlError> {
        self.invoke(renderer, "Play", "<InstanceID>0</InstanceID><Speed>1</Speed>")
            .await?;
        Ok(())
    }

    pub async fn pause(&self, renderer: &Renderer) -> Result<(), ControlError> {
        self.invoke(renderer, "Pause", "<InstanceID>0</InstanceID>")
            .await?;
        Ok(())
    }

    pub async fn stop(&self, renderer: &Renderer) -> Result<(), ControlError> {
        self.invoke(renderer, "Stop", "<InstanceID>0</InstanceID>")
            .await?;
        Ok(())
    }

    /// Seek to an absolute position, `HH:MM:SS`.
    pub async fn seek(&self, renderer: &Renderer, position: &str) -> Result<(), ControlError> {
        let inner = format!(
            "<InstanceID>0</InstanceID><Unit>REL_TIME</Unit><Target>{}</Target>",
            xml_escape(position),
        );
        self.invoke(renderer, "Seek", &inner).await?;
        Ok(())
    }

    pub async fn transport_info(&self, renderer: &Renderer) -> Result<PlaybackState, ControlError> {
        let response = self
            .invoke(renderer, "GetTransportInfo", "<InstanceID>0</InstanceID>")
            .await?;
        Ok(PlaybackState {
            transport_state: extract_xml_value(&response, "CurrentTransportState")
                .unwrap_or_default(),
            ..PlaybackState::default()
        })
    }

    pub async fn position_info(&self, renderer: &Renderer) -> Result<PlaybackState, ControlError> {
        let response = self
            .invoke(renderer, "GetPositionInfo", "<InstanceID>0</InstanceID>")
            .await?;
        Ok(PlaybackState {
            current_position: extract_xml_value(&response, "RelTime").unwrap_or_default(),
            duration: extract_xml_value(&response, "TrackDuration").unwrap_or_default(),
            current_uri: extract_xml_value(&response, "TrackURI").unwrap_or_default(),
            ..PlaybackState::default()
        })
    }

    /// Wrap `inner` in a SOAP envelope and POST it to the renderer's
    /// AVTransport control URL.
    async fn invoke(
        &self,
        renderer: &Renderer,
        action: &str,
        inner: &str,
    ) -> Result<String, ControlError> {
        let control_url = self.control_url(renderer).await?;
        let body = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/" s:encodingStyle="http://schemas.xmlsoap.org/soap/encoding/">
<s:Body>
<u:{action} xmlns:u="{AVTRANSPORT_SERVICE}">
{inner}
</u:{action}>
</s:Body>
</s:Envelope>"#
        );

        tracing::debug!("AVTransport {} -> {}", action, control_url);

        let response = self
            .http
            .post(&control_url)
            .header("Content-Type", "text/xml; charset=utf-8")
            .header("SOAPAction", format!("\"{AVTRANSPORT_SERVICE}#{action}\""))
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(ControlError::Soap {
                status: status.as_u16(),
                body: text,
            });
        }
        Ok(text)
    }

    /// Fetch the device description and dig out the AVTransport control URL.
    async fn control_url(&self, renderer: &Renderer) -> Result<String, ControlError> {
        if renderer.location.is_empty() {
            return Err(ControlError::NoControlUrl);
        }
        let description = self
            .http
            .get(&renderer.location)
            .send()
            .await?
            .text()
            .await?;

        let control = extract_service_control_url(&description, "AVTransport")
            .ok_or(ControlError::NoControlUrl)?;
        Ok(resolve_control_url(&renderer.location, &control))
    }
}

/// Find the `<service>` block mentioning `service_name` and return its
/// `<controlURL>` content.
pub fn extract_service_control_url(xml: &str, service_name: &str) -> Option<String> {
    let service_start = xml.find(service_name)?;
    let block = &xml[service_start..];
    let block = &block[..block.find("</service>")?];

    let control = extract_xml_value(block, "controlURL")?;
    if control.is_empty() {
        None
    } else {
        Some(control)
    }
}

/// Resolve a control URL against the device description location. Handles
/// absolute URLs, root-relative paths, and paths relative to the location.
pub fn resolve_control_url(location: &str, control: &str) -> String {
    if control.starts_with("http") {
        return control.to_string();
    }

    if let Some(rest) = control.strip_prefix('/') {
        // Root-relative: keep scheme://host:port from the location.
        if let Some(scheme_end) = location.find("//") {
            let after_scheme = &location[scheme_end + 2..];
            let host_end = after_scheme.find('/').unwrap_or(after_scheme.len());
            return format!("{}{}/{}", &location[..scheme_end + 2], &after_scheme[..host_end], rest);
        }
        return control.to_string();
    }

    // Path-relative: swap the last segment of the location.
    match location.rfind('/') {
        Some(idx) if idx > location.find("//").map(|i| i + 1).unwrap_or(0) => {
            format!("{}/{}", &location[..idx], control)
        }
        _ => format!("{}/{}", location, control),
    }
}

/// Extract text content from the first `<tag>...</tag>` occurrence.
pub fn extract_xml_value(xml: &str, tag: &str) -> Option<String> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let start = xml.find(&open)? + open.len();
    let end = xml[start..].find(&close)?;
    Some(xml[start..start + end].trim().to_string())
}

fn xml_escape(s: &str) -> String {
    quick_xml::escape::escape(s).into_owned()
}
