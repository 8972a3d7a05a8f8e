//! Per-device protocol resolution.
//!
//! Data channels carry no protocol marker, so the resolver looks the device
//! up in the repository and dispatches the message to the data service bound
//! to the protocol its stored manifest declares.

use crate::inbound::{DeviceMessageListener, PlatformMessageListener};
use async_trait::async_trait;
use sg_gateway_models::domain::Message;
use sg_gateway_protocol::{DataProtocol, GatewayProtocol};
use sg_gateway_repository::DeviceRepository;
use std::sync::Arc;
use tracing::warn;

/// Dispatch target: `(protocol name, message)`.
pub type RouteCallback = Arc<dyn Fn(&str, Message) + Send + Sync>;

pub struct ChannelProtocolResolver {
    protocol: DataProtocol,
    device_repository: DeviceRepository,
    platform_route: RouteCallback,
    device_route: RouteCallback,
}

impl ChannelProtocolResolver {
    pub fn new(
        protocol: DataProtocol,
        device_repository: DeviceRepository,
        platform_route: RouteCallback,
        device_route: RouteCallback,
    ) -> Self {
        Self {
            protocol,
            device_repository,
            platform_route,
            device_route,
        }
    }

    /// Protocol name of the device the message refers to, when it matches
    /// this resolver's codec.
    async fn resolve(&self, message: &Message) -> Option<String> {
        let Some(device_key) = self.protocol.extract_device_key(message.channel()) else {
            warn!(
                channel = message.channel(),
                "No device key in data channel"
            );
            return None;
        };

        let device = match self.device_repository.find_by_device_key(&device_key).await {
            Ok(Some(device)) => device,
            Ok(None) => {
                warn!(device_key, "Device not found in repository");
                return None;
            }
            Err(e) => {
                warn!(device_key, error = %e, "Repository lookup failed");
                return None;
            }
        };

        let protocol = device.manifest.protocol;
        if protocol != self.protocol.name() {
            warn!(
                device_key,
                device_protocol = protocol,
                codec = self.protocol.name(),
                "Protocol mismatch, message dropped"
            );
            return None;
        }

        Some(protocol)
    }
}

#[async_trait]
impl PlatformMessageListener for ChannelProtocolResolver {
    async fn platform_message_received(&self, message: Message) {
        if let Some(protocol) = self.resolve(&message).await {
            (self.platform_route)(&protocol, message);
        }
    }
}

#[async_trait]
impl DeviceMessageListener for ChannelProtocolResolver {
    async fn device_message_received(&self, message: Message) {
        if let Some(protocol) = self.resolve(&message).await {
            (self.device_route)(&protocol, message);
        }
    }
}
