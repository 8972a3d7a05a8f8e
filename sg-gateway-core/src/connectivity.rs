//! MQTT transport, one service per broker side.
//!
//! A supervisor task owns the client lifecycle: connect, subscribe, pump the
//! event loop, and on any failure retry after a fixed delay until stopped.
//! Incoming publishes are handed to the side's inbound handler through a
//! callback; connection edges notify the publisher and status services.

use crate::publishing::MessagePublisher;
use async_trait::async_trait;
use rumqttc::{
    AsyncClient, Event, LastWill, MqttOptions, Packet, QoS, TlsConfiguration, Transport,
};
use sg_gateway_error::{SGError, SGResult};
use sg_gateway_models::domain::Message;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

const RECONNECT_DELAY: Duration = Duration::from_secs(2);
const KEEP_ALIVE: Duration = Duration::from_secs(30);
const CLIENT_CHANNEL_CAPACITY: usize = 100;

pub type MessageCallback = Arc<dyn Fn(&str, &[u8]) + Send + Sync>;
pub type ConnectionCallback = Arc<dyn Fn() + Send + Sync>;

#[derive(Debug, Clone)]
pub struct MqttConfig {
    /// `tcp://host:port` or `ssl://host:port`.
    pub uri: String,
    pub client_id: String,
    pub username: Option<String>,
    pub password: Option<String>,
    /// CA bundle path; required for `ssl://` URIs.
    pub trust_store: Option<String>,
    /// Published by the broker when this client dies unannounced.
    pub last_will: Option<(String, Vec<u8>)>,
}

struct Endpoint {
    tls: bool,
    host: String,
    port: u16,
}

fn parse_uri(uri: &str) -> SGResult<Endpoint> {
    let (scheme, rest) = uri
        .split_once("://")
        .ok_or_else(|| SGError::ConfigurationError(format!("MQTT URI without scheme: {uri}")))?;

    let tls = match scheme {
        "tcp" | "mqtt" => false,
        "ssl" | "mqtts" => true,
        other => {
            return Err(SGError::ConfigurationError(format!(
                "Unsupported MQTT scheme: {other}"
            )))
        }
    };

    let (host, port) = rest
        .split_once(':')
        .ok_or_else(|| SGError::ConfigurationError(format!("MQTT URI without port: {uri}")))?;
    let port: u16 = port
        .parse()
        .map_err(|_| SGError::ConfigurationError(format!("Invalid MQTT port in: {uri}")))?;

    Ok(Endpoint {
        tls,
        host: host.to_string(),
        port,
    })
}

pub struct MqttConnectivityService {
    config: MqttConfig,
    client: Mutex<Option<AsyncClient>>,
    connected: AtomicBool,
    token: CancellationToken,
}

impl MqttConnectivityService {
    pub fn new(config: MqttConfig) -> Arc<Self> {
        Arc::new(Self {
            config,
            client: Mutex::new(None),
            connected: AtomicBool::new(false),
            token: CancellationToken::new(),
        })
    }

    /// Start the supervisor. `subscriptions` is the side's full channel list;
    /// the callbacks fire from the supervisor task.
    pub fn connect(
        self: &Arc<Self>,
        subscriptions: Vec<String>,
        on_message: MessageCallback,
        on_connected: ConnectionCallback,
        on_disconnected: ConnectionCallback,
    ) {
        let service = Arc::clone(self);
        tokio::spawn(async move {
            service
                .supervise(subscriptions, on_message, on_connected, on_disconnected)
                .await;
        });
    }

    async fn supervise(
        &self,
        subscriptions: Vec<String>,
        on_message: MessageCallback,
        on_connected: ConnectionCallback,
        on_disconnected: ConnectionCallback,
    ) {
        loop {
            match self.build_client() {
                Ok((client, mut event_loop)) => {
                    *self.client.lock().unwrap() = Some(client.clone());
                    let mut session_up = false;

                    loop {
                        tokio::select! {
                            _ = self.token.cancelled() => {
                                let _ = client.disconnect().await;
                                info!(uri = self.config.uri, "MQTT supervisor stopped");
                                return;
                            }
                            event = event_loop.poll() => match event {
                                Ok(Event::Incoming(Packet::ConnAck(_))) => {
                                    info!(uri = self.config.uri, "Broker connected");
                                    for channel in &subscriptions {
                                        if let Err(e) = client
                                            .subscribe(channel.as_str(), QoS::AtLeastOnce)
                                            .await
                                        {
                                            warn!(channel, error = %e, "Subscribe failed");
                                        }
                                    }
                                    self.connected.store(true, Ordering::Release);
                                    session_up = true;
                                    on_connected();
                                }
                                Ok(Event::Incoming(Packet::Publish(publish))) => {
                                    on_message(&publish.topic, &publish.payload);
                                }
                                Ok(_) => {}
                                Err(e) => {
                                    warn!(uri = self.config.uri, error = %e, "Broker connection lost");
                                    break;
                                }
                            }
                        }
                    }

                    self.connected.store(false, Ordering::Release);
                    *self.client.lock().unwrap() = None;
                    if session_up {
                        on_disconnected();
                    }
                }
                Err(e) => {
                    error!(uri = self.config.uri, error = %e, "Failed to configure MQTT client");
                }
            }

            tokio::select! {
                _ = self.token.cancelled() => return,
                _ = tokio::time::sleep(RECONNECT_DELAY) => {}
            }
        }
    }

    fn build_client(&self) -> SGResult<(AsyncClient, rumqttc::EventLoop)> {
        let endpoint = parse_uri(&self.config.uri)?;

        let mut options =
            MqttOptions::new(self.config.client_id.clone(), endpoint.host, endpoint.port);
        options.set_keep_alive(KEEP_ALIVE);
        options.set_clean_session(true);

        if let (Some(username), Some(password)) =
            (&self.config.username, &self.config.password)
        {
            options.set_credentials(username, password);
        }

        if let Some((channel, payload)) = &self.config.last_will {
            options.set_last_will(LastWill::new(
                channel.clone(),
                payload.clone(),
                QoS::AtLeastOnce,
                false,
            ));
        }

        if endpoint.tls {
            let ca = match &self.config.trust_store {
                Some(path) => std::fs::read(path)?,
                None => {
                    return Err(SGError::ConfigurationError(
                        "ssl:// URI requires a trust store".to_string(),
                    ))
                }
            };
            options.set_transport(Transport::Tls(TlsConfiguration::Simple {
                ca,
                alpn: None,
                client_auth: None,
            }));
        }

        Ok(AsyncClient::new(options, CLIENT_CHANNEL_CAPACITY))
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Acquire)
    }

    pub fn stop(&self) {
        self.token.cancel();
    }
}

#[async_trait]
impl MessagePublisher for MqttConnectivityService {
    async fn publish(&self, message: &Message) -> SGResult<()> {
        let client = self
            .client
            .lock()
            .unwrap()
            .clone()
            .ok_or(SGError::ServiceUnavailable)?;

        client
            .publish(
                message.channel(),
                QoS::AtLeastOnce,
                false,
                message.payload().to_vec(),
            )
            .await?;
        Ok(())
    }
}
