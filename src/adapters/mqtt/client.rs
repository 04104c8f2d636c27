//! MQTT transport on `rumqttc`.
//!
//! [`MqttTransport`] is the publishing half and implements [`DeviceTransport`].
//! [`MqttConnection`] owns the event loop: it drives the socket, resubscribes
//! on every (re)connect and hands inbound publishes to the ingestion
//! dispatcher one at a time, in arrival order.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rumqttc::{AsyncClient, ConnectionError, Event, EventLoop, MqttOptions, Packet, QoS};
use serde_json::Value;
use tokio::sync::watch;

use crate::application::handlers::ingestion::IngestionDispatcher;
use crate::config::MqttConfig;
use crate::domain::foundation::DeviceId;
use crate::domain::protocol::{TopicCodec, TopicSuffix};
use crate::ports::{DeviceTransport, TransportError};

/// Requests the client may queue before `publish` waits for the event loop.
const REQUEST_CAPACITY: usize = 64;

/// How long a shutdown waits for the DISCONNECT packet to go out.
const DISCONNECT_GRACE: Duration = Duration::from_secs(2);

/// Publishing side of the broker connection.
#[derive(Clone)]
pub struct MqttTransport {
    client: AsyncClient,
    codec: TopicCodec,
    connected: Arc<AtomicBool>,
}

/// Receiving side of the broker connection; run it on its own task.
pub struct MqttConnection {
    eventloop: EventLoop,
    client: AsyncClient,
    codec: TopicCodec,
    connected: Arc<AtomicBool>,
    reconnect_delay: Duration,
}

impl MqttTransport {
    /// Creates the client pair. Nothing touches the network until
    /// [`MqttConnection::run`] polls the event loop.
    pub fn new(
        config: &MqttConfig,
        codec: TopicCodec,
    ) -> Result<(Self, MqttConnection), TransportError> {
        let address = config
            .broker_address()
            .map_err(|e| TransportError::Client(e.to_string()))?;

        let mut options = MqttOptions::new(config.client_id.clone(), address.host, address.port);
        options.set_keep_alive(config.keep_alive());
        options.set_clean_session(true);

        let (client, eventloop) = AsyncClient::new(options, REQUEST_CAPACITY);
        let connected = Arc::new(AtomicBool::new(false));

        let transport = Self {
            client: client.clone(),
            codec: codec.clone(),
            connected: connected.clone(),
        };
        let connection = MqttConnection {
            eventloop,
            client,
            codec,
            connected,
            reconnect_delay: config.reconnect_delay(),
        };

        Ok((transport, connection))
    }
}

#[async_trait]
impl DeviceTransport for MqttTransport {
    async fn publish(
        &self,
        device_id: &DeviceId,
        suffix: TopicSuffix,
        payload: &Value,
    ) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }

        let topic = self.codec.encode(device_id, suffix);
        let bytes = serde_json::to_vec(payload)?;

        self.client
            .publish(topic.as_str(), QoS::AtLeastOnce, false, bytes)
            .await
            .map_err(|e| TransportError::Client(e.to_string()))?;

        tracing::debug!(topic = %topic, "Published device message");
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

impl MqttConnection {
    /// Drives the connection until `shutdown` flips to `true`.
    ///
    /// Transport errors are logged and followed by `reconnect_delay`; the
    /// next poll reconnects. A message already being dispatched when
    /// shutdown is requested is finished before the client disconnects.
    pub async fn run(
        mut self,
        dispatcher: Arc<IngestionDispatcher>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let filter = self.codec.subscription_filter();

        loop {
            tokio::select! {
                biased;

                _ = shutdown.changed() => break,

                event = self.eventloop.poll() => match event {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        self.connected.store(true, Ordering::SeqCst);
                        tracing::info!(filter = %filter, "Connected to MQTT broker");

                        if let Err(e) = self.client.try_subscribe(filter.as_str(), QoS::AtLeastOnce) {
                            tracing::error!(filter = %filter, error = %e, "Failed to subscribe");
                        }
                    }
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        dispatcher.dispatch(&publish.topic, &publish.payload).await;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        self.connection_lost(&e);
                        tokio::select! {
                            _ = shutdown.changed() => break,
                            _ = tokio::time::sleep(self.reconnect_delay) => {}
                        }
                    }
                },
            }
        }

        self.disconnect().await;
    }

    fn connection_lost(&self, error: &ConnectionError) {
        let was_connected = self.connected.swap(false, Ordering::SeqCst);
        if was_connected {
            tracing::warn!(error = %error, "Lost MQTT connection, reconnecting");
        } else {
            tracing::warn!(
                error = %error,
                retry_in_ms = self.reconnect_delay.as_millis() as u64,
                "MQTT connection attempt failed"
            );
        }
    }

    async fn disconnect(mut self) {
        self.connected.store(false, Ordering::SeqCst);

        if self.client.try_disconnect().is_err() {
            return;
        }

        // The DISCONNECT only leaves once the event loop is polled again.
        let flushed = tokio::time::timeout(DISCONNECT_GRACE, async {
            loop {
                match self.eventloop.poll().await {
                    Ok(Event::Outgoing(rumqttc::Outgoing::Disconnect)) | Err(_) => break,
                    Ok(_) => {}
                }
            }
        })
        .await;

        if flushed.is_err() {
            tracing::debug!("Timed out waiting for MQTT disconnect");
        }
        tracing::info!("MQTT client disconnected");
    }
}
