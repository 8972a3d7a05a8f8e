//! Data protocol codec: sensor readings, events, actuator and configuration
//! traffic. The data service is a pure router, so this codec deals in channel
//! classification and rewriting rather than payload parsing.

use crate::{channel, GatewayProtocol};
use sg_gateway_models::domain::Message;

/// Roots published by devices towards the platform.
const DEVICE_TO_PLATFORM_ROOTS: [&str; 4] = [
    "sensor_reading",
    "events",
    "actuator_status",
    "configuration_current",
];

/// Roots published by the platform towards devices.
const PLATFORM_TO_DEVICE_ROOTS: [&str; 4] = [
    "actuator_set",
    "actuator_get",
    "configuration_set",
    "configuration_get",
];

#[derive(Debug, Default, Clone, Copy)]
pub struct DataProtocol;

impl GatewayProtocol for DataProtocol {
    fn name(&self) -> &'static str {
        "JsonProtocol"
    }

    fn inbound_platform_channels(&self) -> Vec<String> {
        PLATFORM_TO_DEVICE_ROOTS
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
        PLATFORM_TO_DEVICE_ROOTS
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
        PLATFORM_TO_DEVICE_ROOTS
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
        DEVICE_TO_PLATFORM_ROOTS
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
        DEVICE_TO_PLATFORM_ROOTS
            .iter()
            .map(|root| channel::device_channel(channel::DEVICE_TO_PLATFORM, root, device_key))
            .collect()
    }
}

impl DataProtocol {
    /// True when the message sits on one of this codec's channels, on either
    /// side.
    pub fn is_data_message(&self, message: &Message) -> bool {
        match channel::root(message.channel()) {
            Some(root) => {
                DEVICE_TO_PLATFORM_ROOTS.contains(&root)
                    || PLATFORM_TO_DEVICE_ROOTS.contains(&root)
            }
            None => false,
        }
    }

    /// Rewrite a device-originated message onto its platform-bound channel.
    pub fn route_device_to_platform_message(
        &self,
        message: &Message,
        gateway_key: &str,
    ) -> Option<Message> {
        let root = channel::root(message.channel())?;
        if !DEVICE_TO_PLATFORM_ROOTS.contains(&root) {
            return None;
        }

        let rewritten = channel::route_device_to_platform(message.channel(), gateway_key)?;
        Some(Message::new(rewritten, message.payload()))
    }

    /// Rewrite a platform command onto the local channel of its target device.
    pub fn route_platform_to_device_message(
        &self,
        message: &Message,
        gateway_key: &str,
    ) -> Option<Message> {
        let root = channel::root(message.channel())?;
        if !PLATFORM_TO_DEVICE_ROOTS.contains(&root) {
            return None;
        }

        let rewritten = channel::route_platform_to_device(message.channel(), gateway_key)?;
        Some(Message::new(rewritten, message.payload()))
    }
}
