//! Keep-alive service: pings the platform for the gateway key while the
//! platform connection is up.

use crate::inbound::PlatformMessageListener;
use crate::outbound::OutboundMessageHandler;
use async_trait::async_trait;
use sg_gateway_models::domain::Message;
use sg_gateway_protocol::StatusProtocol;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(60);

pub struct KeepAliveService {
    gateway_key: String,
    protocol: StatusProtocol,
    platform_outbound: Arc<dyn OutboundMessageHandler>,
    interval: Duration,
    ticker: Mutex<Option<CancellationToken>>,
}

impl KeepAliveService {
    pub fn new(
        gateway_key: impl Into<String>,
        protocol: StatusProtocol,
        platform_outbound: Arc<dyn OutboundMessageHandler>,
        interval: Duration,
    ) -> Self {
        Self {
            gateway_key: gateway_key.into(),
            protocol,
            platform_outbound,
            interval,
            ticker: Mutex::new(None),
        }
    }

    /// Start pinging. The first ping goes out immediately.
    pub fn connected(&self) {
        let mut ticker = self.ticker.lock().unwrap();
        if ticker.is_some() {
            return;
        }

        let token = CancellationToken::new();
        *ticker = Some(token.clone());

        let message = self.protocol.make_ping_message(&self.gateway_key);
        let outbound = Arc::clone(&self.platform_outbound);
        let interval = self.interval;
        tokio::spawn(async move {
            loop {
                debug!("Sending keep-alive ping");
                outbound.add_message(message.clone());

                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {}
                }
            }
        });
    }

    /// Stop pinging until the next `connected()`.
    pub fn disconnected(&self) {
        if let Some(token) = self.ticker.lock().unwrap().take() {
            token.cancel();
        }
    }

    pub fn stop(&self) {
        self.disconnected();
    }
}

#[async_trait]
impl PlatformMessageListener for KeepAliveService {
    async fn platform_message_received(&self, message: Message) {
        if self.protocol.is_pong(&message) {
            debug!("Pong received");
        } else {
            warn!(channel = message.channel(), "Unexpected keep-alive message");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outbound::test_support::RecordingOutbound;

    #[tokio::test]
    async fn pings_while_connected_and_stops_after_disconnect() {
        let outbound = Arc::new(RecordingOutbound::default());
        let service = KeepAliveService::new(
            "GW",
            StatusProtocol,
            Arc::clone(&outbound) as Arc<dyn OutboundMessageHandler>,
            Duration::from_millis(10),
        );

        service.connected();
        tokio::time::sleep(Duration::from_millis(35)).await;
        service.disconnected();

        let sent = outbound.take();
        assert!(sent.len() >= 2, "expected repeated pings, got {}", sent.len());
        assert!(sent.iter().all(|m| m.channel() == "d2p/ping/g/GW"));

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(outbound.messages().is_empty());
    }

    #[tokio::test]
    async fn duplicate_connected_does_not_double_the_ticker() {
        let outbound = Arc::new(RecordingOutbound::default());
        let service = KeepAliveService::new(
            "GW",
            StatusProtocol,
            Arc::clone(&outbound) as Arc<dyn OutboundMessageHandler>,
            Duration::from_secs(3600),
        );

        service.connected();
        service.connected();
        tokio::time::sleep(Duration::from_millis(20)).await;
        service.disconnected();

        // One immediate ping from the single ticker.
        assert_eq!(outbound.messages().len(), 1);
    }
}
