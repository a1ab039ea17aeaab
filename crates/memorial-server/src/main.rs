use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;

use axum::Router;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;
use tracing::info;

use memorial_api::blob::{BlobStore, LocalBlobStore, RemoteBlobStore};
use memorial_api::{AppState, Config, cleanup, routes};

/// Pretty URLs for the static pages, mapped to `{name}.html`.
const PAGES: &[&str] = &["through-years", "memories", "flowers", "admin"];

/// How often expired sessions and idle rate-limit keys are swept.
const CLEANUP_INTERVAL_SECS: u64 = 600;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    "memorial=debug,memorial_api=debug,memorial_db=info,tower_http=debug".into()
                }),
        )
        .init();

    let config = Config::from_env()?;
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;

    let db = Arc::new(memorial_db::Database::open(&config.db_path)?);

    let blobs: Arc<dyn BlobStore> = match &config.remote_blob {
        Some(remote) => {
            info!("Using remote blob store at {}", remote.api_url);
            Arc::new(RemoteBlobStore::new(&remote.api_url, &remote.token))
        }
        None => Arc::new(
            LocalBlobStore::new(config.upload_dir.clone(), &config.upload_url_prefix).await?,
        ),
    };

    let state = AppState::new(config, db, blobs)?;
    let config = state.config.clone();

    tokio::spawn(cleanup::run_cleanup_loop(state.clone(), CLEANUP_INTERVAL_SECS));

    let mut app = routes::router(state);
    if config.remote_blob.is_none() {
        app = app.nest_service(&config.upload_url_prefix, ServeDir::new(&config.upload_dir));
    }

    let app = with_site(app, &config.public_dir);
    let app = routes::with_security_headers(app, config.production)
        .layer(routes::cors_layer(&config))
        .layer(TraceLayer::new_for_http());

    info!("Memorial website listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    Ok(())
}

/// Static front-end: `/` and the named pages, then any other file under
/// `public_dir`.
fn with_site(app: Router, public_dir: &Path) -> Router {
    let mut app = app.route_service("/", ServeFile::new(public_dir.join("index.html")));
    for page in PAGES {
        app = app.route_service(
            &format!("/{}", page),
            ServeFile::new(public_dir.join(format!("{}.html", page))),
        );
    }
    app.fallback_service(ServeDir::new(public_dir))
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                tracing::warn!("Failed to install SIGTERM handler: {}", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
