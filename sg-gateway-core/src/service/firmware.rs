//! Firmware update service: forwards platform install/abort commands to the
//! target subdevice and relays device status/version reports back up.

use crate::command::CommandBuffer;
use crate::inbound::{DeviceMessageListener, PlatformMessageListener};
use crate::outbound::OutboundMessageHandler;
use async_trait::async_trait;
use sg_gateway_models::domain::Message;
use sg_gateway_protocol::{FirmwareUpdateProtocol, GatewayProtocol};
use sg_gateway_repository::DeviceRepository;
use std::sync::Arc;
use tracing::{info, warn};

pub struct FirmwareUpdateService {
    gateway_key: String,
    protocol: FirmwareUpdateProtocol,
    device_repository: DeviceRepository,
    platform_outbound: Arc<dyn OutboundMessageHandler>,
    device_outbound: Arc<dyn OutboundMessageHandler>,
    command_buffer: CommandBuffer,
}

impl FirmwareUpdateService {
    pub fn new(
        gateway_key: impl Into<String>,
        protocol: FirmwareUpdateProtocol,
        device_repository: DeviceRepository,
        platform_outbound: Arc<dyn OutboundMessageHandler>,
        device_outbound: Arc<dyn OutboundMessageHandler>,
    ) -> Self {
        Self {
            gateway_key: gateway_key.into(),
            protocol,
            device_repository,
            platform_outbound,
            device_outbound,
            command_buffer: CommandBuffer::new(),
        }
    }

    /// Announce the gateway's own firmware version to the platform.
    pub fn publish_firmware_version(&self, version: &str) {
        info!(version, "Publishing gateway firmware version");
        self.platform_outbound
            .add_message(self.protocol.make_gateway_version_message(&self.gateway_key, version));
    }

    pub fn stop(&self) {
        self.command_buffer.stop();
    }

    async fn forward_command(&self, message: Message) {
        let Some(command) = self.protocol.make_firmware_update_command(&message) else {
            warn!(
                channel = message.channel(),
                "Unable to parse firmware command"
            );
            return;
        };

        let Some(device_key) = self.protocol.extract_device_key(message.channel()) else {
            warn!(
                channel = message.channel(),
                "Firmware command without a device key"
            );
            return;
        };

        match self.device_repository.contains_device_with_key(&device_key).await {
            Ok(true) => {}
            Ok(false) => {
                warn!(device_key, "Firmware command for an unknown device");
                return;
            }
            Err(e) => {
                warn!(device_key, error = %e, "Repository lookup failed");
                return;
            }
        }

        let Some(forwarded) = self
            .protocol
            .make_firmware_update_command_message(&device_key, &command)
        else {
            warn!(device_key, "Failed to build firmware command message");
            return;
        };

        let outbound = Arc::clone(&self.device_outbound);
        self.command_buffer
            .push(async move { outbound.add_message(forwarded) });
    }
}

#[async_trait]
impl PlatformMessageListener for FirmwareUpdateService {
    async fn platform_message_received(&self, message: Message) {
        if self.protocol.is_firmware_update_command(&message) {
            self.forward_command(message).await;
            return;
        }

        warn!(
            channel = message.channel(),
            "Unexpected platform firmware message"
        );
    }
}

#[async_trait]
impl DeviceMessageListener for FirmwareUpdateService {
    async fn device_message_received(&self, message: Message) {
        let Some(routed) = self
            .protocol
            .route_device_to_platform_message(&message, &self.gateway_key)
        else {
            warn!(
                channel = message.channel(),
                "Device firmware message could not be routed to the platform"
            );
            return;
        };

        let outbound = Arc::clone(&self.platform_outbound);
        self.command_buffer
            .push(async move { outbound.add_message(routed) });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outbound::test_support::RecordingOutbound;
    use sg_gateway_models::domain::{Device, DeviceManifest};
    use sg_gateway_repository::sqlite;
    use std::time::Duration;

    struct Fixture {
        service: FirmwareUpdateService,
        platform: Arc<RecordingOutbound>,
        device: Arc<RecordingOutbound>,
    }

    async fn fixture(known_devices: &[&str]) -> Fixture {
        let db = sqlite::init_db(sqlite::memory_url()).await.unwrap();
        let repository = DeviceRepository::new(db);
        for key in known_devices {
            repository
                .save(&Device::new(
                    *key,
                    *key,
                    DeviceManifest::new("m", "", "JsonProtocol", "DFUProtocol"),
                ))
                .await
                .unwrap();
        }

        let platform = Arc::new(RecordingOutbound::default());
        let device = Arc::new(RecordingOutbound::default());
        let service = FirmwareUpdateService::new(
            "GW",
            FirmwareUpdateProtocol,
            repository,
            Arc::clone(&platform) as Arc<dyn OutboundMessageHandler>,
            Arc::clone(&device) as Arc<dyn OutboundMessageHandler>,
        );

        Fixture {
            service,
            platform,
            device,
        }
    }

    async fn drain() {
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    #[tokio::test]
    async fn install_command_is_forwarded_to_a_known_device() {
        let fixture = fixture(&["DEV"]).await;

        fixture
            .service
            .platform_message_received(Message::new(
                "p2d/firmware_update_install/g/GW/d/DEV",
                br#"{"command":"INSTALL","fileName":"fw.bin"}"#.to_vec(),
            ))
            .await;
        drain().await;

        let messages = fixture.device.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].channel(), "p2d/firmware_update_install/d/DEV");
    }

    #[tokio::test]
    async fn command_for_an_unknown_device_is_dropped() {
        let fixture = fixture(&[]).await;

        fixture
            .service
            .platform_message_received(Message::new(
                "p2d/firmware_update_install/g/GW/d/GHOST",
                br#"{"command":"INSTALL"}"#.to_vec(),
            ))
            .await;
        drain().await;

        assert!(fixture.device.messages().is_empty());
    }

    #[tokio::test]
    async fn device_status_is_relayed_to_the_platform() {
        let fixture = fixture(&["DEV"]).await;

        fixture
            .service
            .device_message_received(Message::new(
                "d2p/firmware_update_status/d/DEV",
                br#"{"status":"COMPLETED"}"#.to_vec(),
            ))
            .await;
        drain().await;

        let messages = fixture.platform.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].channel(), "d2p/firmware_update_status/g/GW/d/DEV");
    }

    #[tokio::test]
    async fn gateway_version_announcement() {
        let fixture = fixture(&[]).await;

        fixture.service.publish_firmware_version("3.1.4");

        let messages = fixture.platform.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].channel(), "d2p/firmware_version_update/g/GW");
        assert_eq!(messages[0].payload(), b"3.1.4");
    }
}
