use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

use parley_server::auth::handshake::{HandshakeVerifier, JwtHandshake, TrustedHandshake};
use parley_server::config::{generate_config_template, AuthMode, Config};
use parley_server::db::{self, store::SqliteStore};
use parley_server::routes;
use parley_server::state::AppState;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load config with layered precedence: defaults < TOML < env < CLI
    let config = Config::load()?;

    // Handle --generate-config: print template and exit
    if config.generate_config {
        print!("{}", generate_config_template());
        return Ok(());
    }

    // Initialize tracing/logging
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("parley_server=info"));
    if config.json_logs {
        tracing_subscriber::fmt().json().with_env_filter(env_filter).init();
    } else {
        tracing_subscriber::fmt().pretty().with_env_filter(env_filter).init();
    }

    tracing::info!("Parley server v{} starting", env!("CARGO_PKG_VERSION"));

    let db = db::init_db(&config.data_dir)?;
    let store = Arc::new(SqliteStore::new(db));

    let auth = config.auth();
    let verifier: Arc<dyn HandshakeVerifier> = match auth.mode {
        AuthMode::Trusted => {
            tracing::warn!("Handshake mode 'trusted': client-supplied userId is not verified");
            Arc::new(TrustedHandshake)
        }
        AuthMode::Jwt => {
            if auth.jwt_secret.is_empty() {
                return Err("auth.mode = \"jwt\" requires auth.jwt_secret".into());
            }
            Arc::new(JwtHandshake::new(auth.jwt_secret.into_bytes()))
        }
    };

    let app_state = AppState::new(store, verifier)
        .with_lookup_timeout(config.lookup_timeout())
        .with_keepalive(config.keepalive());

    let app = routes::build_router(app_state);

    let addr = format!("{}:{}", config.bind_address, config.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Resolve on Ctrl-C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
