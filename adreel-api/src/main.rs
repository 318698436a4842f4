use std::net::SocketAddr;
use std::sync::Arc;

use adreel_api::{app, AppState, AuthConfig};
use adreel_store::{app_config::Config, DbClient, EventProducer, PostgresAdRepository, RedisClient};
use anyhow::Context;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "adreel_api=debug,adreel_core=info,adreel_store=info,tower_http=debug,axum::rejection=trace".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    info!("Starting adreel API on port {}", config.server.port);

    // Postgres
    let db = DbClient::new(&config.database.url, config.database.max_connections)
        .await
        .context("Failed to connect to Postgres")?;
    if config.database.run_migrations {
        db.migrate().await.context("Failed to run migrations")?;
    }
    let repo = Arc::new(PostgresAdRepository::new(db.pool.clone(), config.engagement));

    let mut app_state = AppState::new(
        repo,
        config.delivery.selection,
        AuthConfig {
            secret: config.auth.jwt_secret.clone(),
        },
    )
    .context("Failed to register metrics")?;
    info!("Selection policy: {}", config.delivery.selection.as_str());

    // Redis (optional rate limiting)
    if let Some(redis) = &config.redis {
        let client = RedisClient::new(&redis.url).context("Invalid Redis URL")?;
        app_state = app_state.with_redis(Arc::new(client), config.rate_limit.clone());
        info!("Rate limiting enabled: {} requests per {}s", config.rate_limit.requests, config.rate_limit.window_seconds);
    }

    // Kafka (optional event publishing)
    if let Some(kafka) = &config.kafka {
        let producer = EventProducer::new(&kafka.brokers, &kafka.topic).context("Failed to create Kafka producer")?;
        app_state = app_state.with_events(Arc::new(producer));
        info!("Publishing ad events to {}", kafka.topic);
    }

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                tracing::error!("Failed to install signal handler: {}", e);
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
}
