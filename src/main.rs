use std::{future::IntoFuture, process, sync::Arc, time::Duration};

use kvcache::{
    application::{cache::CacheService, error::AppError, repos::CacheRepo},
    config,
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, HttpState},
        telemetry,
    },
};
use sqlx::PgPool;
use tokio::sync::oneshot;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Migrate(_) => run_migrate(settings).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let pool = connect_and_migrate(&settings.database).await?;
    let repositories = Arc::new(PostgresRepositories::new(pool));
    let cache_repo: Arc<dyn CacheRepo> = repositories;

    let state = HttpState {
        cache: Arc::new(CacheService::new(cache_repo)),
    };

    serve_http(&settings.server, state).await
}

async fn run_migrate(settings: config::Settings) -> Result<(), AppError> {
    connect_and_migrate(&settings.database).await?;
    info!(target: "kvcache::migrate", "Migrations applied");
    Ok(())
}

async fn connect_and_migrate(database: &config::DatabaseSettings) -> Result<PgPool, AppError> {
    let pool = PostgresRepositories::connect(&database.url, database.max_connections.get())
        .await
        .map_err(InfraError::Connect)?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(InfraError::from)?;

    Ok(pool)
}

async fn serve_http(server: &config::ServerSettings, state: HttpState) -> Result<(), AppError> {
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(server.addr)
        .await
        .map_err(|err| InfraError::bind(server.addr, err))?;
    info!(target: "kvcache::http", addr = %server.addr, "Server listening");

    let (signalled_tx, signalled_rx) = oneshot::channel::<()>();
    let serve = axum::serve(listener, router.into_make_service()).with_graceful_shutdown(
        async move {
            shutdown_signal().await;
            let _ = signalled_tx.send(());
        },
    );
    let mut handle = tokio::spawn(serve.into_future());

    let grace = server.graceful_shutdown;
    tokio::select! {
        joined = &mut handle => {
            joined
                .map_err(|err| AppError::unexpected(format!("server task failed: {err}")))?
                .map_err(InfraError::Serve)?;
        }
        _ = drain_deadline(signalled_rx, grace) => {
            warn!(
                target: "kvcache::http",
                grace_secs = grace.as_secs(),
                "Graceful shutdown timed out; aborting in-flight requests"
            );
            handle.abort();
        }
    }

    info!(target: "kvcache::http", "Server stopped");
    Ok(())
}

/// Resolves `grace` after shutdown was requested; never resolves otherwise.
async fn drain_deadline(signalled: oneshot::Receiver<()>, grace: Duration) {
    if signalled.await.is_err() {
        std::future::pending::<()>().await;
    }
    tokio::time::sleep(grace).await;
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to listen for SIGTERM");
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

    info!(target: "kvcache::http", "Shutdown signal received");
}
