use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tokio::signal;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use toylink::adapters::http::{api_router, with_http_layers, AppState};
use toylink::adapters::postgres::{
    PostgresAccessChecker, PostgresChatRepository, PostgresDeviceEventLog,
    PostgresDeviceRepository, PostgresSafetyPolicyRepository,
};
use toylink::adapters::websocket::websocket_router;
use toylink::adapters::{
    Ed25519PolicySigner, InMemoryStore, JwtSessionValidator, KeyMaterial, LocalBroker,
    MqttTransport, RoomRegistry, WebSocketState,
};
use toylink::application::{IngestionDispatcher, IngestionPorts, RetryPolicy};
use toylink::config::{AppConfig, DatabaseConfig, LogFormat, ServerConfig};
use toylink::domain::protocol::TopicCodec;
use toylink::ports::{
    AccessChecker, ChatRepository, DeviceEventLog, DeviceRepository, SafetyPolicyRepository,
    SessionValidator,
};

/// Time the MQTT task gets to flush its disconnect after the HTTP server stops.
const TRANSPORT_SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Store ports, backed by Postgres or by memory.
struct Stores {
    devices: Arc<dyn DeviceRepository>,
    policies: Arc<dyn SafetyPolicyRepository>,
    event_log: Arc<dyn DeviceEventLog>,
    chats: Arc<dyn ChatRepository>,
    access: Arc<dyn AccessChecker>,
    pool: Option<PgPool>,
}

impl Stores {
    fn postgres(pool: PgPool) -> Self {
        Self {
            devices: Arc::new(PostgresDeviceRepository::new(pool.clone())),
            policies: Arc::new(PostgresSafetyPolicyRepository::new(pool.clone())),
            event_log: Arc::new(PostgresDeviceEventLog::new(pool.clone())),
            chats: Arc::new(PostgresChatRepository::new(pool.clone())),
            access: Arc::new(PostgresAccessChecker::new(pool.clone())),
            pool: Some(pool),
        }
    }

    fn memory() -> Self {
        let store = Arc::new(InMemoryStore::new());
        Self {
            devices: store.clone(),
            policies: store.clone(),
            event_log: store.clone(),
            chats: store.clone(),
            access: store,
            pool: None,
        }
    }
}

fn init_tracing(server: &ServerConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(server.log_level.as_str()));

    match server.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .init(),
    }
}

async fn connect_store(database: &DatabaseConfig) -> Result<Stores> {
    let Some(url) = database.url() else {
        warn!("No database URL configured; using the in-memory store");
        return Ok(Stores::memory());
    };

    let pool = PgPoolOptions::new()
        .min_connections(database.min_connections)
        .max_connections(database.max_connections)
        .acquire_timeout(database.acquire_timeout())
        .idle_timeout(database.idle_timeout())
        .connect(url)
        .await
        .context("failed to connect to postgres")?;

    if database.run_migrations {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("failed to run database migrations")?;
        info!("Database migrations applied");
    }

    Ok(Stores::postgres(pool))
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load().context("failed to load configuration")?;
    init_tracing(&config.server);
    config.validate().context("invalid configuration")?;

    info!(
        environment = ?config.server.environment,
        broker_url = %config.mqtt.broker_url,
        namespace = %config.mqtt.topic_namespace,
        "Starting toylink"
    );

    run(config).await
}

async fn run(config: AppConfig) -> Result<()> {
    let stores = connect_store(&config.database).await?;

    let signer = Arc::new(Ed25519PolicySigner::new());
    signer
        .initialize(&KeyMaterial {
            secret_key: config.signing.secret_key.clone(),
            public_key: config.signing.public_key.clone(),
            key_id: config.signing.key_id.clone(),
        })
        .context("failed to initialize policy signer")?;

    let broker = if config.mqtt.should_embed_broker()? {
        let port = config.mqtt.broker_address()?.port;
        Some(LocalBroker::start(port).context("failed to start embedded broker")?)
    } else {
        None
    };

    let codec = TopicCodec::new(config.mqtt.topic_namespace.clone())?;
    let (transport, connection) = MqttTransport::new(&config.mqtt, codec.clone())?;

    let rooms = Arc::new(RoomRegistry::default());
    let dispatcher = Arc::new(IngestionDispatcher::new(
        codec,
        IngestionPorts {
            devices: stores.devices.clone(),
            policies: stores.policies.clone(),
            event_log: stores.event_log.clone(),
            chats: stores.chats.clone(),
            notifier: rooms.clone(),
        },
        RetryPolicy {
            max_attempts: config.ingestion.max_attempts,
            initial_backoff: config.ingestion.retry_backoff(),
        },
    ));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut transport_task = tokio::spawn(connection.run(dispatcher, shutdown_rx));

    let sessions: Arc<dyn SessionValidator> =
        Arc::new(JwtSessionValidator::new(config.auth.jwt_secret.clone()));

    let state = AppState {
        devices: stores.devices.clone(),
        policies: stores.policies.clone(),
        event_log: stores.event_log.clone(),
        access: stores.access.clone(),
        transport: Arc::new(transport),
        signer,
    };
    let ws_state = WebSocketState {
        rooms,
        sessions: sessions.clone(),
        devices: stores.devices.clone(),
    };

    let router = api_router(state, sessions).merge(websocket_router().with_state(ws_state));
    let router = with_http_layers(router, &config.server);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!(%addr, "HTTP server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server shutdown with error")?;

    info!("Shutting down device messaging");
    let _ = shutdown_tx.send(true);
    if tokio::time::timeout(TRANSPORT_SHUTDOWN_GRACE, &mut transport_task)
        .await
        .is_err()
    {
        warn!("MQTT connection did not stop in time; aborting");
        transport_task.abort();
    }

    if let Some(broker) = broker {
        broker.stop();
    }
    if let Some(pool) = stores.pool {
        pool.close().await;
    }

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
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

    info!("Shutdown signal received");
}
