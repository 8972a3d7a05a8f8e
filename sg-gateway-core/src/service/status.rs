//! Device status service: surfaces local-broker last wills to the platform so
//! a dead subdevice shows as offline.

use crate::command::CommandBuffer;
use crate::inbound::DeviceMessageListener;
use crate::outbound::OutboundMessageHandler;
use async_trait::async_trait;
use sg_gateway_models::domain::Message;
use sg_gateway_protocol::{GatewayProtocol, StatusProtocol};
use std::sync::Arc;
use tracing::{info, warn};

pub struct DeviceStatusService {
    gateway_key: String,
    protocol: StatusProtocol,
    platform_outbound: Arc<dyn OutboundMessageHandler>,
    command_buffer: CommandBuffer,
}

impl DeviceStatusService {
    pub fn new(
        gateway_key: impl Into<String>,
        protocol: StatusProtocol,
        platform_outbound: Arc<dyn OutboundMessageHandler>,
    ) -> Self {
        Self {
            gateway_key: gateway_key.into(),
            protocol,
            platform_outbound,
            command_buffer: CommandBuffer::new(),
        }
    }

    pub fn connected(&self) {
        info!("Local broker connected");
    }

    pub fn disconnected(&self) {
        warn!("Local broker disconnected");
    }

    pub fn stop(&self) {
        self.command_buffer.stop();
    }
}

#[async_trait]
impl DeviceMessageListener for DeviceStatusService {
    async fn device_message_received(&self, message: Message) {
        let Some(routed) = self
            .protocol
            .route_last_will_message(&message, &self.gateway_key)
        else {
            warn!(
                channel = message.channel(),
                "Unexpected device status message"
            );
            return;
        };

        let device_key = self
            .protocol
            .extract_device_key(message.channel())
            .unwrap_or_default();
        info!(device_key, "Device went offline");

        let outbound = Arc::clone(&self.platform_outbound);
        self.command_buffer
            .push(async move { outbound.add_message(routed) });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outbound::test_support::RecordingOutbound;
    use std::time::Duration;

    #[tokio::test]
    async fn last_will_reaches_the_platform() {
        let platform = Arc::new(RecordingOutbound::default());
        let service = DeviceStatusService::new(
            "GW",
            StatusProtocol,
            Arc::clone(&platform) as Arc<dyn OutboundMessageHandler>,
        );

        service
            .device_message_received(Message::new("d2p/last_will/d/DEV", b"Gone".to_vec()))
            .await;
        tokio::time::sleep(Duration::from_millis(20)).await;

        let messages = platform.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].channel(), "d2p/last_will/g/GW/d/DEV");
    }

    #[tokio::test]
    async fn foreign_channels_are_dropped() {
        let platform = Arc::new(RecordingOutbound::default());
        let service = DeviceStatusService::new(
            "GW",
            StatusProtocol,
            Arc::clone(&platform) as Arc<dyn OutboundMessageHandler>,
        );

        service
            .device_message_received(Message::new("d2p/sensor_reading/d/DEV", Vec::new()))
            .await;
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(platform.messages().is_empty());
    }
}
