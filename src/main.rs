use clap::Parser;
use dotenvy::dotenv;
use plec_backend::config::AppConfig;
use plec_backend::services::sweeper::RetentionSweeper;
use plec_backend::services::worker::BackgroundWorker;
use plec_backend::{AppState, create_app};
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;
use tokio::signal;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Address to bind
    #[arg(long, default_value = "127.0.0.1")]
    host: IpAddr,

    /// Port for the API server
    #[arg(short, long, default_value_t = 3000)]
    port: u16,

    /// Relaxed media policy for local testing
    #[arg(long)]
    dev: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "plec_backend=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("🚀 Starting SIP generator...");

    let mut config = AppConfig::from_env();
    if args.dev {
        let dev = AppConfig::development();
        config.allowed_media_types = dev.allowed_media_types;
        config.enforce_network_limits = dev.enforce_network_limits;
    }
    info!(
        "📁 Output: {} served at {}, retention {} min, template {}",
        config.output_dir.display(),
        config.public_base_path,
        config.retention_minutes,
        config.template_path.display()
    );
    info!(
        "🛡️  Media policy: types={:?}, network limits={}",
        config.allowed_media_types, config.enforce_network_limits
    );

    tokio::fs::create_dir_all(&config.output_dir).await?;

    let state = AppState::from_config(config.clone());

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let worker_handle = if config.sweep_interval_secs > 0 {
        let worker = BackgroundWorker::new(
            state.store.clone(),
            RetentionSweeper::from_minutes(config.retention_minutes),
            Duration::from_secs(config.sweep_interval_secs),
            shutdown_rx,
        );
        Some(tokio::spawn(worker.run()))
    } else {
        info!("Background sweep disabled");
        None
    };

    let app = create_app(state).layer(
        TraceLayer::new_for_http()
            .make_span_with(|request: &axum::http::Request<_>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("unknown");
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    path = %request.uri().path(),
                    request_id = %request_id,
                )
            })
            .on_request(|request: &axum::http::Request<_>, _span: &tracing::Span| {
                info!("📥 {} {}", request.method(), request.uri().path());
            })
            .on_response(
                |response: &axum::http::Response<_>,
                 latency: std::time::Duration,
                 _span: &tracing::Span| {
                    info!(
                        "📤 Finished in {:?} with status {}",
                        latency,
                        response.status()
                    );
                },
            ),
    );

    let addr = SocketAddr::new(args.host, args.port);
    info!("✅ Server ready at http://{}", addr);
    info!("📖 Swagger UI: http://{}/swagger-ui", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            let _ = shutdown_tx.send(true);
        })
        .await?;

    if let Some(handle) = worker_handle {
        if let Err(e) = handle.await {
            error!("Background sweeper ended abnormally: {}", e);
        }
    }

    info!("🛑 Server shut down gracefully.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("⌨️  Ctrl+C received, starting graceful shutdown...");
        },
        _ = terminate => {
            info!("💤 SIGTERM received, starting graceful shutdown...");
        },
    }
}
