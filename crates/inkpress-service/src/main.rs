use inkpress_service::{
    AppState, DefaultAppState,
    config::Config,
    db::{establish_connection, shared},
    routes::create_router,
    shutdown::{ShutdownState, graceful_shutdown},
};
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    if let Err(err) = dotenvy::dotenv() {
        if !err.not_found() {
            eprintln!("Failed to load .env file: {err}");
        }
    }

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("inkpress_service=debug,tower_http=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Config::from_env().unwrap_or_else(|err| {
        error!(error = %err, "Invalid configuration");
        std::process::exit(1);
    });

    let connection = establish_connection(&config.database_url).unwrap_or_else(|err| {
        error!(database_url = %config.database_url, error = %err, "Failed to set up database");
        std::process::exit(1);
    });

    info!(database_url = %config.database_url, "Connected to database");

    let app_state = DefaultAppState::new(shared(connection), config.api_key.clone(), config.auth);
    let shutdown_state = app_state.shutdown().clone();

    let app = create_router(&app_state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(axum::middleware::from_fn_with_state(
                    shutdown_state.clone(),
                    graceful_shutdown,
                ))
                .layer(TimeoutLayer::new(config.request_timeout)),
        )
        .with_state(app_state);

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .unwrap_or_else(|err| {
            error!(bind_address = %config.bind, error = %err, "Failed to bind to address");
            std::process::exit(1);
        });

    info!(bind_address = %config.bind, "Server running");

    let server = axum::serve(listener, app).with_graceful_shutdown(shutdown_signal(shutdown_state));

    if let Err(err) = server.await {
        error!(error = %err, "Server error");
        std::process::exit(1);
    }
}

async fn shutdown_signal(shutdown_state: ShutdownState) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            warn!(error = %err, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "Failed to install SIGTERM handler");
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

    info!("Shutdown signal received, starting graceful shutdown");
    let shutdown_completed = shutdown_state.completed();
    shutdown_state.start_shutdown();

    shutdown_completed.await;
    info!("Graceful shutdown completed - all requests finished");
}
