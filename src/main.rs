use std::sync::atomic::{AtomicBool, Ordering};

use axum::Router;
use clap::Parser;
use tokio::net::TcpListener;

use familystream::{cli, config, http};

/// Set to true once the first Ctrl+C is received. Second Ctrl+C force-exits.
static SHUTTING_DOWN: AtomicBool = AtomicBool::new(false);

/// Wait for the first Ctrl+C (graceful shutdown).
/// On second Ctrl+C (during shutdown wait), force-exits immediately.
async fn wait_for_shutdown() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to install Ctrl+C handler: {}", e);
        std::future::pending::<()>().await;
    }
    if SHUTTING_DOWN.swap(true, Ordering::SeqCst) {
        eprintln!("\nfamilystream: forced exit");
        std::process::exit(1);
    }
}

/// Print a startup error and exit, the way every bind failure is reported.
fn fatal(message: impl std::fmt::Display) -> ! {
    eprintln!("error: {message}");
    std::process::exit(1);
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

    let config = config::Config::resolve(file_config, &args);

    if config.token.is_empty() {
        tracing::warn!("SUPERVISOR_TOKEN is not set; Home Assistant calls will be rejected");
    }

    let state = http::state::AppState::from_config(&config).unwrap_or_else(|e| fatal(e));

    tracing::info!(
        "FamilyStream relay on port {} proxying {} (hub: {})",
        config.port,
        config.target_url,
        config.hub_url
    );
    match &config.default_media_player {
        Some(player) => tracing::info!("Default media player: {}", player),
        None => tracing::info!("No default media player; requests must name an entity"),
    }
    if let Some(dir) = &config.cache_dir {
        tracing::info!("Caching static assets under {}", dir.display());
    }
    if config.capture.is_some() {
        match state.capture_url() {
            Some(url) => tracing::info!("Audio capture available at {}", url),
            None => tracing::info!("Audio capture enabled at /api/capture.mp3 (set public_url to cast it)"),
        }
    }

    let app = http::build_router(state);

    let listeners = if config.localhost {
        vec![bind_localhost(config.port).await]
    } else {
        bind_dual_stack(config.port).await
    };
    serve(listeners, app).await;
}

async fn bind_localhost(port: u16) -> TcpListener {
    let addr = format!("127.0.0.1:{}", port);
    let listener = TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| fatal(format!("failed to bind {}: {}", addr, e)));
    tracing::info!("Listening on http://{} (localhost only)", addr);
    listener
}

/// Bind separate IPv4 (0.0.0.0) and IPv6 (::) sockets.
///
/// Linux defaults IPV6_V6ONLY=false (shared stack), which makes the second bind
/// fail with "Address already in use"; socket2 lets us set it explicitly.
async fn bind_dual_stack(port: u16) -> Vec<TcpListener> {
    let ipv4_addr = format!("0.0.0.0:{}", port);
    let ipv4_listener = TcpListener::bind(&ipv4_addr)
        .await
        .unwrap_or_else(|e| fatal(format!("failed to bind IPv4 {}: {}", ipv4_addr, e)));

    let ipv6_addr: std::net::SocketAddr = (std::net::Ipv6Addr::UNSPECIFIED, port).into();
    let ipv6_raw = socket2::Socket::new(
        socket2::Domain::IPV6,
        socket2::Type::STREAM,
        Some(socket2::Protocol::TCP),
    )
    .unwrap_or_else(|e| fatal(format!("failed to create IPv6 socket: {}", e)));
    if let Err(e) = ipv6_raw.set_only_v6(true) {
        tracing::warn!("Could not set IPV6_V6ONLY: {} -- dual-bind may fail on Linux", e);
    }
    if let Err(e) = ipv6_raw.set_reuse_address(true) {
        tracing::warn!("Could not set SO_REUSEADDR on IPv6 socket: {}", e);
    }

    // IPv6 may be disabled on the host (common in add-on containers): serve IPv4 only.
    let ipv6_listener = ipv6_raw
        .set_nonblocking(true)
        .and_then(|_| ipv6_raw.bind(&ipv6_addr.into()))
        .and_then(|_| ipv6_raw.listen(1024))
        .and_then(|_| TcpListener::from_std(ipv6_raw.into()));

    match ipv6_listener {
        Ok(ipv6_listener) => {
            tracing::info!("Listening on port {} (IPv4 + IPv6)", port);
            vec![ipv4_listener, ipv6_listener]
        }
        Err(e) => {
            tracing::warn!("IPv6 listener unavailable ({}); serving IPv4 only", e);
            tracing::info!("Listening on port {} (IPv4)", port);
            vec![ipv4_listener]
        }
    }
}

async fn serve(listeners: Vec<TcpListener>, app: Router) {
    let (shutdown_tx, _) = tokio::sync::broadcast::channel::<()>(4);

    let mut servers = Vec::with_capacity(listeners.len());
    for listener in listeners {
        let app = app.clone();
        let mut shutdown_rx = shutdown_tx.subscribe();
        servers.push(tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.recv().await;
                })
                .await
                .unwrap_or_else(|e| tracing::error!("HTTP server error: {}", e));
        }));
    }

    wait_for_shutdown().await;
    tracing::info!("Shutting down...");
    let _ = shutdown_tx.send(());

    // Open capture streams never finish on their own; don't wait on them forever.
    for server in servers {
        let _ = tokio::time::timeout(std::time::Duration::from_secs(2), server).await;
    }
    tracing::info!("Goodbye.");
}
