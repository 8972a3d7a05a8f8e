//! Firmware update codec: install/abort commands from the platform, status
//! and version reports from devices.

use crate::{channel, GatewayProtocol};
use sg_gateway_models::domain::{
    FirmwareUpdateCommand, FirmwareUpdateCommandType, FirmwareUpdateResponse, Message,
};
use tracing::warn;

const INSTALL_ROOT: &str = "firmware_update_install";
const ABORT_ROOT: &str = "firmware_update_abort";
const STATUS_ROOT: &str = "firmware_update_status";
const VERSION_ROOT: &str = "firmware_version_update";

#[derive(Debug, Default, Clone, Copy)]
pub struct FirmwareUpdateProtocol;

impl GatewayProtocol for FirmwareUpdateProtocol {
    fn name(&self) -> &'static str {
        "DFUProtocol"
    }

    fn inbound_platform_channels(&self) -> Vec<String> {
        [INSTALL_ROOT, ABORT_ROOT]
            .iter()
            .map(|root| {
                channel::gateway_device_channel(
                    channel::PLATFORM_TO_DEVICE,
                    root,
                    channel::SINGLE_LEVEL_WILDCARD,
                    channel::SINGLE_LEVEL_WILDCARD,
                )
            })
            .collect()
    }

    fn inbound_platform_channels_for_gateway_key(&self, gateway_key: &str) -> Vec<String> {
        [INSTALL_ROOT, ABORT_ROOT]
            .iter()
            .map(|root| {
                channel::gateway_device_channel(
                    channel::PLATFORM_TO_DEVICE,
                    root,
                    gateway_key,
                    channel::SINGLE_LEVEL_WILDCARD,
                )
            })
            .collect()
    }

    fn inbound_platform_channels_for_keys(
        &self,
        gateway_key: &str,
        device_key: &str,
    ) -> Vec<String> {
        [INSTALL_ROOT, ABORT_ROOT]
            .iter()
            .map(|root| {
                channel::gateway_device_channel(
                    channel::PLATFORM_TO_DEVICE,
                    root,
                    gateway_key,
                    device_key,
                )
            })
            .collect()
    }

    fn inbound_device_channels(&self) -> Vec<String> {
        [STATUS_ROOT, VERSION_ROOT]
            .iter()
            .map(|root| {
                channel::device_channel(
                    channel::DEVICE_TO_PLATFORM,
                    root,
                    channel::SINGLE_LEVEL_WILDCARD,
                )
            })
            .collect()
    }

    fn inbound_device_channels_for_device_key(&self, device_key: &str) -> Vec<String> {
        [STATUS_ROOT, VERSION_ROOT]
            .iter()
            .map(|root| channel::device_channel(channel::DEVICE_TO_PLATFORM, root, device_key))
            .collect()
    }
}

impl FirmwareUpdateProtocol {
    pub fn is_firmware_update_command(&self, message: &Message) -> bool {
        matches!(
            channel::root(message.channel()),
            Some(INSTALL_ROOT) | Some(ABORT_ROOT)
        )
    }

    pub fn is_firmware_update_response(&self, message: &Message) -> bool {
        channel::root(message.channel()) == Some(STATUS_ROOT)
    }

    pub fn is_firmware_version(&self, message: &Message) -> bool {
        channel::root(message.channel()) == Some(VERSION_ROOT)
    }

    pub fn make_firmware_update_command(&self, message: &Message) -> Option<FirmwareUpdateCommand> {
        if !self.is_firmware_update_command(message) {
            return None;
        }

        // An abort channel with an empty payload is still a valid abort.
        if channel::root(message.channel()) == Some(ABORT_ROOT) && message.payload().is_empty() {
            return Some(FirmwareUpdateCommand {
                command: FirmwareUpdateCommandType::Abort,
                file_name: None,
                file_size: None,
                file_hash: None,
                file_url: None,
                auto_install: false,
            });
        }

        serde_json::from_slice(message.payload())
            .map_err(|e| {
                warn!(channel = message.channel(), error = %e, "Malformed firmware command")
            })
            .ok()
    }

    pub fn make_firmware_update_response(
        &self,
        message: &Message,
    ) -> Option<FirmwareUpdateResponse> {
        if !self.is_firmware_update_response(message) {
            return None;
        }

        serde_json::from_slice(message.payload())
            .map_err(|e| {
                warn!(channel = message.channel(), error = %e, "Malformed firmware status")
            })
            .ok()
    }

    /// Local command message for one subdevice.
    pub fn make_firmware_update_command_message(
        &self,
        device_key: &str,
        command: &FirmwareUpdateCommand,
    ) -> Option<Message> {
        let root = match command.command {
            FirmwareUpdateCommandType::Abort => ABORT_ROOT,
            _ => INSTALL_ROOT,
        };
        let payload = serde_json::to_vec(command).ok()?;
        Some(Message::new(
            channel::device_channel(channel::PLATFORM_TO_DEVICE, root, device_key),
            payload,
        ))
    }

    /// Platform-bound status report for one subdevice.
    pub fn make_firmware_update_response_message(
        &self,
        gateway_key: &str,
        device_key: &str,
        response: &FirmwareUpdateResponse,
    ) -> Option<Message> {
        let payload = serde_json::to_vec(response).ok()?;
        Some(Message::new(
            channel::gateway_device_channel(
                channel::DEVICE_TO_PLATFORM,
                STATUS_ROOT,
                gateway_key,
                device_key,
            ),
            payload,
        ))
    }

    /// Platform-bound firmware version announcement for the gateway itself.
    pub fn make_gateway_version_message(&self, gateway_key: &str, version: &str) -> Message {
        Message::new(
            channel::gateway_channel(channel::DEVICE_TO_PLATFORM, VERSION_ROOT, gateway_key),
            version.as_bytes().to_vec(),
        )
    }

    /// Rewrite a device firmware report onto its platform-bound channel.
    pub fn route_device_to_platform_message(
        &self,
        message: &Message,
        gateway_key: &str,
    ) -> Option<Message> {
        if !self.is_firmware_update_response(message) && !self.is_firmware_version(message) {
            return None;
        }

        let rewritten = channel::route_device_to_platform(message.channel(), gateway_key)?;
        Some(Message::new(rewritten, message.payload()))
    }
}
