//! Data service: the per-protocol bridge for readings, events and commands.
//!
//! Device-side traffic is rewritten onto gateway-scoped platform channels;
//! platform commands are rewritten onto the target device's local channel.
//! Payloads pass through untouched.

use crate::command::CommandBuffer;
use crate::inbound::{DeviceMessageListener, PlatformMessageListener};
use crate::outbound::OutboundMessageHandler;
use async_trait::async_trait;
use sg_gateway_models::domain::Message;
use sg_gateway_protocol::DataProtocol;
use std::sync::Arc;
use tracing::warn;

pub struct DataService {
    gateway_key: String,
    protocol: DataProtocol,
    platform_outbound: Arc<dyn OutboundMessageHandler>,
    device_outbound: Arc<dyn OutboundMessageHandler>,
    command_buffer: CommandBuffer,
}

impl DataService {
    pub fn new(
        gateway_key: impl Into<String>,
        protocol: DataProtocol,
        platform_outbound: Arc<dyn OutboundMessageHandler>,
        device_outbound: Arc<dyn OutboundMessageHandler>,
    ) -> Self {
        Self {
            gateway_key: gateway_key.into(),
            protocol,
            platform_outbound,
            device_outbound,
            command_buffer: CommandBuffer::new(),
        }
    }

    pub fn protocol(&self) -> &DataProtocol {
        &self.protocol
    }

    /// Rewrite a platform command onto its local channel and hand it to the
    /// device-side publisher. Non-blocking; used directly by the resolver.
    pub fn handle_platform_message(&self, message: Message) {
        let Some(routed) = self
            .protocol
            .route_platform_to_device_message(&message, &self.gateway_key)
        else {
            warn!(
                channel = message.channel(),
                "Platform data message could not be routed locally"
            );
            return;
        };

        let outbound = Arc::clone(&self.device_outbound);
        self.command_buffer
            .push(async move { outbound.add_message(routed) });
    }

    /// Rewrite a device report onto its platform channel and hand it to the
    /// platform-side publisher.
    pub fn handle_device_message(&self, message: Message) {
        let Some(routed) = self
            .protocol
            .route_device_to_platform_message(&message, &self.gateway_key)
        else {
            warn!(
                channel = message.channel(),
                "Device data message could not be routed to the platform"
            );
            return;
        };

        let outbound = Arc::clone(&self.platform_outbound);
        self.command_buffer
            .push(async move { outbound.add_message(routed) });
    }

    pub fn stop(&self) {
        self.command_buffer.stop();
    }
}

#[async_trait]
impl PlatformMessageListener for DataService {
    async fn platform_message_received(&self, message: Message) {
        self.handle_platform_message(message);
    }
}

#[async_trait]
impl DeviceMessageListener for DataService {
    async fn device_message_received(&self, message: Message) {
        self.handle_device_message(message);
    }
}
