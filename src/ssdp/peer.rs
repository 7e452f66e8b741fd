//! The SSDP peer: advertises this server on the multicast group, answers
//! renderer discovery probes, and keeps a registry of media renderers seen
//! on the segment.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::net::UdpSocket;
use tokio::sync::{broadcast, mpsc};

use crate::config::ManualDevice;
use crate::ssdp::{messages, socket};

/// A renderer on the local segment, keyed by the uuid from its USN.
#[derive(Debug, Clone, Serialize)]
pub struct Renderer {
    pub uuid: String,
    pub friendly_name: Option<String>,
    pub location: String,
    pub device_type: String,
    pub last_seen: DateTime<Utc>,
}

type Registry = Arc<RwLock<HashMap<String, Renderer>>>;

/// Configuration passed from main to the SSDP task.
pub struct SsdpConfig {
    pub device_uuid: String,
    pub friendly_name: String,
    /// e.g. "http://192.168.1.5:8080" — used in every LOCATION header.
    pub base_url: String,
}

/// Shared view onto the peer: registry snapshots plus a refresh side door.
/// All mutation of the registry happens inside the peer task or under the
/// short-lived writer lock here.
#[derive(Clone)]
pub struct SsdpHandle {
    registry: Registry,
    refresh_tx: mpsc::Sender<()>,
    device_uuid: String,
}

impl SsdpHandle {
    /// A handle with an empty registry and no running peer task. Nothing is
    /// advertised or discovered; manual insertion still works. Useful when
    /// SSDP is unavailable and in tests.
    pub fn disconnected(device_uuid: impl Into<String>) -> Self {
        let (refresh_tx, _) = mpsc::channel(4);
        SsdpHandle {
            registry: Arc::new(RwLock::new(HashMap::new())),
            refresh_tx,
            device_uuid: device_uuid.into(),
        }
    }

    pub fn device_uuid(&self) -> &str {
        &self.device_uuid
    }

    /// Snapshot of every known renderer.
    pub fn renderers(&self) -> Vec<Renderer> {
        self.registry
            .read()
            .expect("ssdp registry poisoned")
            .values()
            .cloned()
            .collect()
    }

    pub fn renderer(&self, uuid: &str) -> Option<Renderer> {
        self.registry
            .read()
            .expect("ssdp registry poisoned")
            .get(uuid)
            .cloned()
    }

    /// Ask the peer task to re-issue its M-SEARCH burst.
    pub fn refresh(&self) {
        let _ = self.refresh_tx.try_send(());
    }

    /// Insert a renderer by hand with synthetic uuid `manual-<ip>-<port>`.
    /// Idempotent: an existing entry is left untouched.
    pub fn add_manual(&self, device: &ManualDevice) {
        let uuid = format!("manual-{}-{}", device.ip, device.port);
        let mut registry = self.registry.write().expect("ssdp registry poisoned");
        if registry.contains_key(&uuid) {
            return;
        }
        let location = format!("http://{}:{}{}", device.ip, device.port, device.path);
        tracing::info!("SSDP: added manual renderer {} at {}", device.name, location);
        registry.insert(
            uuid.clone(),
            Renderer {
                uuid,
                friendly_name: Some(device.name.clone()),
                location,
                device_type: "Manual DLNA Renderer".to_string(),
                last_seen: Utc::now(),
            },
        );
    }
}

/// Spawn the peer task. The returned handle stays valid after shutdown (the
/// registry just stops being updated).
pub fn spawn(
    config: SsdpConfig,
    shutdown_rx: broadcast::Receiver<()>,
) -> (SsdpHandle, tokio::task::JoinHandle<()>) {
    let registry: Registry = Arc::new(RwLock::new(HashMap::new()));
    let (refresh_tx, refresh_rx) = mpsc::channel(4);
    let handle = SsdpHandle {
        registry: Arc::clone(&registry),
        refresh_tx,
        device_uuid: config.device_uuid.clone(),
    };
    let task = tokio::spawn(run(config, registry, refresh_rx, shutdown_rx));
    (handle, task)
}

/// SSDP peer task.
///
/// Lifecycle:
/// 1. Discover non-loopback IPv4 interfaces; none — log and return.
/// 2. Create the multicast receive socket and the send socket.
/// 3. Send the startup NOTIFY alive burst and the M-SEARCH burst.
/// 4. Event loop: datagrams, 900 s re-advertisement, 60 s registry sweep,
///    refresh requests, shutdown.
/// 5. On shutdown: send the byebye burst, then return.
async fn run(
    config: SsdpConfig,
    registry: Registry,
    mut refresh_rx: mpsc::Receiver<()>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let ifaces = socket::list_non_loopback_v4();
    if ifaces.is_empty() {
        tracing::warn!("SSDP: no non-loopback IPv4 interfaces — SSDP disabled, HTTP still works");
        return;
    }

    let recv_socket = match socket::build_recv_socket(ifaces[0].addr) {
        Ok(s) => s,
        Err(e) if e.kind() == std::io::ErrorKind::AddrInUse => {
            tracing::error!(
                "SSDP port 1900 is already in use — another UPnP daemon may be running; discovery disabled"
            );
            return;
        }
        Err(e) => {
            tracing::error!("SSDP: failed to create receive socket: {e}");
            return;
        }
    };
    for iface in ifaces.iter().skip(1) {
        if let Err(e) = recv_socket.join_multicast_v4(socket::SSDP_MCAST_V4, iface.addr) {
            tracing::warn!("SSDP: could not join multicast on {}: {}", iface.addr, e);
        }
    }

    let send_socket = match socket::build_send_socket() {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("SSDP: failed to create send socket: {e}");
            return;
        }
    };

    tracing::info!(
        "SSDP advertising \"{}\" (uuid {}) on {}:1900",
        config.friendly_name,
        config.device_uuid,
        ifaces[0].addr
    );

    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .ok();

    let location = format!("{}/dlna/device.xml", config.base_url);

    send_alive_burst(&send_socket, &location, &config.device_uuid).await;
    send_search_burst(&send_socket).await;

    // Half of max-age, per the UPnP re-advertisement rule. Skip the
    // immediate tick — the startup burst was just sent.
    let mut re_advert = tokio::time::interval(Duration::from_secs(messages::SSDP_MAX_AGE / 2));
    re_advert.tick().await;
    let mut sweep = tokio::time::interval(Duration::from_secs(60));
    sweep.tick().await;

    let mut buf = [0u8; 4096];

    loop {
        tokio::select! {
            _ = re_advert.tick() => {
                tracing::debug!("SSDP: re-advertising");
                send_alive_burst(&send_socket, &location, &config.device_uuid).await;
            }

            _ = sweep.tick() => {
                sweep_stale(&registry);
            }

            Some(()) = refresh_rx.recv() => {
                tracing::debug!("SSDP: refresh requested — searching for renderers");
                send_search_burst(&send_socket).await;
            }

            result = recv_socket.recv_from(&mut buf) => {
                match result {
                    Ok((len, sender)) => {
                        let packet = String::from_utf8_lossy(&buf[..len]).into_owned();
                        handle_datagram(
                            &packet,
                            sender,
                            &send_socket,
                            &registry,
                            &location,
                            &config.device_uuid,
                            http.as_ref(),
                        ).await;
                    }
                    Err(e) => {
                        tracing::debug!("SSDP: recv error: {}", e);
                    }
                }
            }

            _ = shutdown_rx.recv() => {
                tracing::debug!("SSDP: shutdown — sending byebye");
                send_byebye_burst(&send_socket, &location, &config.device_uuid).await;
                tracing::info!("SSDP: byebye sent");
                return;
            }
        }
    }
}

fn multicast_addr() -> SocketAddr {
    SocketAddr::from((socket::SSDP_MCAST_V4, socket::SSDP_PORT))
}

/// NOTIFY ssdp:alive for each advertised type, 50 ms apart.
async fn send_alive_burst(send_socket: &UdpSocket, location: &str, device_uuid: &str) {
    send_notify_burst(send_socket, "ssdp:alive", location, device_uuid).await;
}

async fn send_byebye_burst(send_socket: &UdpSocket, location: &str, device_uuid: &str) {
    send_notify_burst(send_socket, "ssdp:byebye", location, device_uuid).await;
}

async fn send_notify_burst(send_socket: &UdpSocket, nts: &str, location: &str, device_uuid: &str) {
    for (i, nt) in messages::NOTIFY_TYPES.iter().enumerate() {
        if i > 0 {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        let msg = messages::notify(nts, nt, location, device_uuid);
        if let Err(e) = send_socket.send_to(msg.as_bytes(), multicast_addr()).await {
            tracing::warn!("SSDP: failed to send NOTIFY: {}", e);
        }
    }
}

/// M-SEARCH for every renderer target, 50 ms apart. Responses come back
/// through the main receive loop.
async fn send_search_burst(send_socket: &UdpSocket) {
    for (i, st) in messages::SEARCH_TARGETS.iter().enumerate() {
        if i > 0 {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        let msg = messages::msearch(st);
        if let Err(e) = send_socket.send_to(msg.as_bytes(), multicast_addr()).await {
            tracing::warn!("SSDP: failed to send M-SEARCH: {}", e);
        }
    }
}

async fn handle_datagram(
    packet: &str,
    sender: SocketAddr,
    send_socket: &UdpSocket,
    registry: &Registry,
    location: &str,
    device_uuid: &str,
    http: Option<&reqwest::Client>,
) {
    let Some((start_line, headers)) = messages::parse_message(packet) else {
        return;
    };

    if start_line.starts_with("M-SEARCH") {
        let Some(st) = headers.get("st") else { return };
        if messages::ANSWERABLE_TARGETS.contains(&st.as_str()) {
            let response = messages::search_response(location, st, device_uuid);
            if let Err(e) = send_socket.send_to(response.as_bytes(), sender).await {
                tracing::debug!("SSDP: failed to answer M-SEARCH from {}: {}", sender, e);
            }
        }
        return;
    }

    if start_line.starts_with("NOTIFY") {
        let nt = headers.get("nt").map(String::as_str).unwrap_or_default();
        let nts = headers.get("nts").map(String::as_str).unwrap_or_default();
        let usn = headers.get("usn").map(String::as_str).unwrap_or_default();
        let loc = headers.get("location").map(String::as_str).unwrap_or_default();

        if !messages::is_renderer(nt, loc) {
            return;
        }
        let Some(uuid) = messages::extract_uuid(usn) else {
            return;
        };
        match nts {
            "ssdp:alive" => touch_renderer(registry, uuid, nt, loc, http),
            "ssdp:byebye" => {
                let mut reg = registry.write().expect("ssdp registry poisoned");
                if reg.remove(&uuid).is_some() {
                    tracing::info!("SSDP: renderer {} said byebye", uuid);
                }
            }
            _ => {}
        }
        return;
    }

    if start_line.starts_with("HTTP/1.1 200") {
        let st = headers.get("st").map(String::as_str).unwrap_or_default();
        let usn = headers.get("usn").map(String::as_str).unwrap_or_default();
        let loc = headers.get("location").map(String::as_str).unwrap_or_default();

        // ssdp:all responses are taken as-is; everything else must look
        // like a renderer.
        if st != "ssdp:all" && !messages::is_renderer(st, loc) {
            return;
        }
        let Some(uuid) = messages::extract_uuid(usn) else {
            return;
        };
        touch_renderer(registry, uuid, st, loc, http);
    }
}

/// Insert a renderer or bump its last-seen. A fresh entry gets its friendly
/// name resolved in the background so the listener never blocks on HTTP.
fn touch_renderer(
    registry: &Registry,
    uuid: String,
    device_type: &str,
    location: &str,
    http: Option<&reqwest::Client>,
) {
    let is_new = {
        let mut reg = registry.write().expect("ssdp registry poisoned");
        match reg.get_mut(&uuid) {
            Some(existing) => {
                existing.last_seen = Utc::now();
                false
            }
            None => {
                reg.insert(
                    uuid.clone(),
                    Renderer {
                        uuid: uuid.clone(),
                        friendly_name: None,
                        location: location.to_string(),
                        device_type: device_type.to_string(),
                        last_seen: Utc::now(),
                    },
                );
                true
            }
        }
    };

    if is_new {
        tracing::info!("SSDP: discovered renderer {} at {}", uuid, location);
        if let Some(client) = http {
            tokio::spawn(fetch_friendly_name(
                client.clone(),
                Arc::clone(registry),
                uuid,
                location.to_string(),
            ));
        }
    }
}

/// Fetch the device description and fill in `<friendlyName>`.
async fn fetch_friendly_name(
    client: reqwest::Client,
    registry: Registry,
    uuid: String,
    location: String,
) {
    let body = match client.get(&location).send().await {
        Ok(resp) => match resp.text().await {
            Ok(text) => text,
            Err(e) => {
                tracing::debug!("SSDP: failed to read description from {}: {}", location, e);
                return;
            }
        },
        Err(e) => {
            tracing::debug!("SSDP: failed to fetch description from {}: {}", location, e);
            return;
        }
    };

    let Some(name) = extract_tag(&body, "friendlyName") else {
        return;
    };
    let mut reg = registry.write().expect("ssdp registry poisoned");
    if let Some(renderer) = reg.get_mut(&uuid) {
        renderer.friendly_name = Some(name);
    }
}

fn extract_tag(xml: &str, tag: &str) -> Option<String> {
    let open = format!("<{tag}>");
    let close = format!("</{tag}>");
    let start = xml.find(&open)? + open.len();
    let end = xml[start..].find(&close)? + start;
    let value = xml[start..end].trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Evict registry entries not seen within 2·max-age.
fn sweep_stale(registry: &Registry) {
    let cutoff = Utc::now() - chrono::Duration::seconds(2 * messages::SSDP_MAX_AGE as i64);
    let mut reg = registry.write().expect("ssdp registry poisoned");
    reg.retain(|uuid, renderer| {
        let keep = renderer.last_seen >= cutoff;
        if !keep {
            tracing::debug!("SSDP: evicting stale renderer {}", uuid);
        }
        keep
    });
}
