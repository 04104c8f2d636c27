//! In-process MQTT broker for development setups.
//!
//! Runs `rumqttd` on a dedicated thread when nothing else is listening on the
//! broker port. If the port is taken, an external broker is assumed to be
//! serving it and no local one is started.

use std::io::ErrorKind;
use std::net::TcpListener;
use std::thread::JoinHandle;

use thiserror::Error;

/// Address the embedded broker listens on.
const LISTEN_HOST: &str = "0.0.0.0";

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("invalid embedded broker configuration: {0}")]
    Config(#[from] config::ConfigError),

    #[error("failed to check broker port {port}: {source}")]
    PortCheck {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to spawn broker thread: {0}")]
    Spawn(#[source] std::io::Error),
}

/// Handle to the embedded broker, or to the fact that none was needed.
#[derive(Debug)]
pub struct LocalBroker {
    port: u16,
    thread: Option<JoinHandle<()>>,
}

impl LocalBroker {
    /// Starts a broker on `port` unless one is already listening there.
    pub fn start(port: u16) -> Result<Self, BrokerError> {
        match TcpListener::bind((LISTEN_HOST, port)) {
            Ok(listener) => drop(listener),
            Err(e) if e.kind() == ErrorKind::AddrInUse => {
                tracing::info!(port, "Port in use, assuming an external MQTT broker");
                return Ok(Self { port, thread: None });
            }
            Err(source) => return Err(BrokerError::PortCheck { port, source }),
        }

        let config = broker_config(port)?;
        let thread = std::thread::Builder::new()
            .name("mqtt-broker".to_string())
            .spawn(move || {
                let mut broker = rumqttd::Broker::new(config);
                if let Err(e) = broker.start() {
                    tracing::error!(error = %e, "Embedded MQTT broker stopped");
                }
            })
            .map_err(BrokerError::Spawn)?;

        tracing::info!(port, "Embedded MQTT broker started");
        Ok(Self {
            port,
            thread: Some(thread),
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Whether this process is running the broker.
    pub fn is_embedded(&self) -> bool {
        self.thread.is_some()
    }

    /// Releases the broker.
    ///
    /// `rumqttd` has no shutdown handle; its thread is detached and ends
    /// with the process.
    pub fn stop(self) {
        if self.thread.is_some() {
            tracing::info!(port = self.port, "Stopping embedded MQTT broker");
        }
    }
}

fn broker_config(port: u16) -> Result<rumqttd::Config, BrokerError> {
    let toml = format!(
        r#"
id = 0

[router]
id = 0
max_connections = 1010
max_outgoing_packet_count = 200
max_segment_size = 104857600
max_segment_count = 10

[v4.1]
name = "v4-1"
listen = "{host}:{port}"
next_connection_delay_ms = 1

[v4.1.connections]
connection_timeout_ms = 60000
max_payload_size = 262144
max_inflight_count = 100
dynamic_filters = true
"#,
        host = LISTEN_HOST,
        port = port
    );

    let config = config::Config::builder()
        .add_source(config::File::from_str(&toml, config::FileFormat::Toml))
        .build()?
        .try_deserialize()?;
    Ok(config)
}
