use std::sync::{
    atomic::{AtomicBool, AtomicU32, Ordering},
    Arc,
};

use clap::Parser;

use cinecast::avtransport::AvTransportClient;
use cinecast::hls::HlsManager;
use cinecast::http::state::AppState;
use cinecast::library::{scanner, Library};
use cinecast::ssdp;
use cinecast::transcode::Transcoder;
use cinecast::{cli, config, http};

/// Set to true once the first Ctrl+C is received. Second Ctrl+C force-exits.
static SHUTTING_DOWN: AtomicBool = AtomicBool::new(false);

/// Wait for the first Ctrl+C (graceful shutdown).
/// On second Ctrl+C (during shutdown wait), force-exit immediately.
async fn wait_for_shutdown() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install Ctrl+C handler");
    if SHUTTING_DOWN.swap(true, Ordering::SeqCst) {
        eprintln!("\ncinecast: forced exit");
        std::process::exit(1);
    }
}

/// Derive a stable UUID v5 from hostname + friendly name. Stable across
/// restarts on the same machine; changes when the name does.
fn build_server_uuid(hostname: &str, server_name: &str) -> String {
    let seed = format!("{}\x00{}", hostname, server_name);
    uuid::Uuid::new_v5(&uuid::Uuid::NAMESPACE_DNS, seed.as_bytes()).to_string()
}

fn get_hostname() -> String {
    hostname::get()
        .ok()
        .and_then(|os| os.into_string().ok())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "cinecast".to_string())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = cli::Args::parse();

    let file_config = config::find_config_file(args.config.as_deref()).and_then(|path| {
        match config::load_config(&path) {
            Ok(cfg) => {
                tracing::debug!("Loaded config from {}", path.display());
                Some(cfg)
            }
            Err(e) => {
                tracing::warn!("Failed to parse config file: {}", e);
                None
            }
        }
    });

    let config = Arc::new(config::Config::resolve(file_config, &args));

    if let Err(e) = config.ensure_directories() {
        eprintln!("error: failed to create data directories: {e}");
        std::process::exit(1);
    }

    let server_uuid = config
        .device_uuid
        .clone()
        .unwrap_or_else(|| build_server_uuid(&get_hostname(), &config.friendly_name));

    let local_ip = ssdp::socket::local_ipv4();
    let base_url = format!("http://{}:{}", local_ip, config.server_port);

    tracing::info!(
        "cinecast \"{}\" (uuid: {}) at {}",
        config.friendly_name,
        server_uuid,
        base_url
    );

    let library = match Library::open(&config.db_path) {
        Ok(lib) => Arc::new(lib),
        Err(e) => {
            eprintln!("error: failed to open library at {}: {e}", config.db_path.display());
            std::process::exit(1);
        }
    };

    let hls = match HlsManager::new(HlsManager::default_base_dir()) {
        Ok(manager) => Arc::new(manager),
        Err(e) => {
            eprintln!("error: failed to prepare HLS scratch directory: {e}");
            std::process::exit(1);
        }
    };

    let avtransport = match AvTransportClient::new() {
        Ok(client) => Arc::new(client),
        Err(e) => {
            eprintln!("error: failed to build HTTP client: {e}");
            std::process::exit(1);
        }
    };

    let transcoder = Arc::new(Transcoder::new(&config));
    let update_id = Arc::new(AtomicU32::new(1));

    let (shutdown_tx, _) = tokio::sync::broadcast::channel::<()>(8);

    // SSDP peer: advertises this server and discovers renderers.
    let (ssdp_handle, ssdp_task) = ssdp::peer::spawn(
        ssdp::peer::SsdpConfig {
            device_uuid: server_uuid,
            friendly_name: config.friendly_name.clone(),
            base_url: base_url.clone(),
        },
        shutdown_tx.subscribe(),
    );
    for device in &config.manual_devices {
        ssdp_handle.add_manual(device);
    }

    let state = AppState {
        config: Arc::clone(&config),
        library: Arc::clone(&library),
        ssdp: ssdp_handle,
        avtransport,
        hls: Arc::clone(&hls),
        transcoder,
        update_id: Arc::clone(&update_id),
        base_url,
    };

    // Initial scan in the background; the server is browsable immediately
    // with whatever the store already holds.
    {
        let library = Arc::clone(&library);
        let config = Arc::clone(&config);
        let update_id = Arc::clone(&update_id);
        tokio::spawn(async move {
            match scanner::scan(&library, &config).await {
                Ok(total) => {
                    update_id.fetch_add(1, Ordering::Relaxed);
                    tracing::info!("Initial scan completed: {} movies", total);
                }
                Err(e) => tracing::error!("Initial scan failed: {}", e),
            }
        });
    }

    // HLS idle sweeper; on shutdown it kills every remaining transcoder.
    let sweeper_task = {
        let hls = Arc::clone(&hls);
        let rx = shutdown_tx.subscribe();
        tokio::spawn(async move { hls.run_sweeper(rx).await })
    };

    let app = http::build_router(state);
    let addr = format!("{}:{}", config.server_host, config.server_port);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("error: failed to bind {addr}: {e}");
            std::process::exit(1);
        }
    };
    tracing::info!("Serving {} movies on http://{}", library.len(), addr);

    let mut http_rx = shutdown_tx.subscribe();
    tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = http_rx.recv().await;
            })
            .await
            .unwrap_or_else(|e| tracing::error!("HTTP server error: {}", e));
    });

    wait_for_shutdown().await;
    tracing::info!("Shutting down — sending SSDP byebye...");

    let _ = shutdown_tx.send(());

    // Give the byebye burst a second, then let the sweeper reap children.
    let _ = tokio::time::timeout(std::time::Duration::from_secs(1), ssdp_task).await;
    let _ = tokio::time::timeout(std::time::Duration::from_secs(5), sweeper_task).await;

    tracing::info!("Goodbye.");
}
