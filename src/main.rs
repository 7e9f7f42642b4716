use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use figment::{Figment, providers::Env};
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::oneshot;
use tracing::{error, info, warn};

use outreach::cli::Args;
use outreach::config::Config;
use outreach::db::DbContext;
use outreach::engine::{JobEngine, WorkerPool};
use outreach::logging::setup_logging;
use outreach::scrape::ActorClient;
use outreach::state::AppState;
use outreach::store::HttpRecordStore;
use outreach::web::create_router;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let config: Config = Figment::new()
        .merge(Env::raw())
        .extract()
        .expect("Failed to load config");

    setup_logging(&config, args.tracing);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        commit = env!("GIT_COMMIT_SHORT"),
        environment = if cfg!(debug_assertions) {
            "development"
        } else {
            "production"
        },
        "starting outreach"
    );

    let db_pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .connect(&config.database_url)
        .await
        .expect("Failed to create database pool");

    sqlx::migrate!()
        .run(&db_pool)
        .await
        .expect("Failed to run migrations");

    info!(
        port = config.port,
        db_max_connections = config.db_max_connections,
        shutdown_timeout = format!("{:.2?}", config.shutdown_timeout),
        num_queues_default = config.num_queues_default,
        profiles_per_queue = config.profiles_per_queue,
        "configuration loaded"
    );

    let source = Arc::new(ActorClient::new(&config).expect("Failed to create extraction client"));
    let store =
        Arc::new(HttpRecordStore::new(&config).expect("Failed to create record-store client"));

    let db = DbContext::new(db_pool);
    let pool = WorkerPool::start(config.workers.concurrency, config.workers.recycle_after);
    let engine = Arc::new(JobEngine::new(
        db.clone(),
        source,
        pool,
        config.workers.clone(),
        config.ingest_batch_delay,
    ));

    let shutdown_timeout = config.shutdown_timeout;
    let port = config.port;

    let state = AppState::new(db, engine, store, Arc::new(config));

    let app = create_router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .expect("Failed to bind listen address");

    info!(
        address = %addr,
        link = format!("http://localhost:{}", addr.port()),
        "web server listening"
    );

    // Serve in a task so the main task can race the drain phase against the
    // shutdown timeout after a signal.
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                shutdown_rx.await.ok();
            })
            .await
    });

    shutdown_signal().await;
    let _ = shutdown_tx.send(());

    let exit_code = match tokio::time::timeout(shutdown_timeout, server).await {
        Ok(Ok(Ok(()))) => {
            info!("graceful shutdown complete");
            0
        }
        Ok(Ok(Err(e))) => {
            error!(error = %e, "server error during shutdown");
            1
        }
        Ok(Err(e)) => {
            error!(error = %e, "server task panicked");
            1
        }
        Err(_) => {
            warn!(
                timeout = format!("{shutdown_timeout:.2?}"),
                "graceful shutdown elapsed with requests still in flight"
            );
            2
        }
    };

    info!(exit_code, "application shutdown complete");
    std::process::exit(exit_code);
}

/// Completes when SIGINT or SIGTERM arrives.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install CTRL+C signal handler");
        info!("received ctrl+c, gracefully shutting down...");
    };

    #[cfg(unix)]
    let sigterm = async {
        use tokio::signal::unix::{SignalKind, signal};
        let mut sigterm_stream =
            signal(SignalKind::terminate()).expect("Failed to install SIGTERM signal handler");
        sigterm_stream.recv().await;
        info!("received SIGTERM, gracefully shutting down...");
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = sigterm => {}
    }
}
