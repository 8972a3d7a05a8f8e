//! Status / keep-alive codec: gateway pings, platform pongs and device last
//! wills.

use crate::{channel, GatewayProtocol};
use sg_gateway_models::domain::Message;

const PING_ROOT: &str = "ping";
const PONG_ROOT: &str = "pong";
const LAST_WILL_ROOT: &str = "last_will";

#[derive(Debug, Default, Clone, Copy)]
pub struct StatusProtocol;

impl GatewayProtocol for StatusProtocol {
    fn name(&self) -> &'static str {
        "StatusProtocol"
    }

    fn inbound_platform_channels(&self) -> Vec<String> {
        vec![channel::gateway_channel(
            channel::PLATFORM_TO_DEVICE,
            PONG_ROOT,
            channel::SINGLE_LEVEL_WILDCARD,
        )]
    }

    fn inbound_platform_channels_for_gateway_key(&self, gateway_key: &str) -> Vec<String> {
        vec![channel::gateway_channel(
            channel::PLATFORM_TO_DEVICE,
            PONG_ROOT,
            gateway_key,
        )]
    }

    fn inbound_platform_channels_for_keys(
        &self,
        gateway_key: &str,
        _device_key: &str,
    ) -> Vec<String> {
        self.inbound_platform_channels_for_gateway_key(gateway_key)
    }

    fn inbound_device_channels(&self) -> Vec<String> {
        vec![channel::device_channel(
            channel::DEVICE_TO_PLATFORM,
            LAST_WILL_ROOT,
            channel::SINGLE_LEVEL_WILDCARD,
        )]
    }

    fn inbound_device_channels_for_device_key(&self, device_key: &str) -> Vec<String> {
        vec![channel::device_channel(
            channel::DEVICE_TO_PLATFORM,
            LAST_WILL_ROOT,
            device_key,
        )]
    }
}

impl StatusProtocol {
    pub fn is_pong(&self, message: &Message) -> bool {
        channel::root(message.channel()) == Some(PONG_ROOT)
    }

    pub fn is_last_will(&self, message: &Message) -> bool {
        channel::root(message.channel()) == Some(LAST_WILL_ROOT)
    }

    /// Keep-alive ping for the gateway.
    pub fn make_ping_message(&self, gateway_key: &str) -> Message {
        Message::new(
            channel::gateway_channel(channel::DEVICE_TO_PLATFORM, PING_ROOT, gateway_key),
            Vec::new(),
        )
    }

    /// Channel a local device should use as its MQTT last will.
    pub fn last_will_channel(&self, device_key: &str) -> String {
        channel::device_channel(channel::DEVICE_TO_PLATFORM, LAST_WILL_ROOT, device_key)
    }

    /// Last-will channel the gateway registers on the platform broker.
    pub fn gateway_last_will_channel(&self, gateway_key: &str) -> String {
        channel::gateway_channel(channel::DEVICE_TO_PLATFORM, LAST_WILL_ROOT, gateway_key)
    }

    /// Rewrite a device last will onto its platform-bound channel.
    pub fn route_last_will_message(&self, message: &Message, gateway_key: &str) -> Option<Message> {
        if !self.is_last_will(message) {
            return None;
        }

        let rewritten = channel::route_device_to_platform(message.channel(), gateway_key)?;
        Some(Message::new(rewritten, message.payload()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ping_is_gateway_scoped() {
        let protocol = StatusProtocol;
        assert_eq!(protocol.make_ping_message("GW").channel(), "d2p/ping/g/GW");
    }

    #[test]
    fn pong_classification() {
        let protocol = StatusProtocol;
        assert!(protocol.is_pong(&Message::new("p2d/pong/g/GW", Vec::new())));
        assert!(!protocol.is_pong(&Message::new("p2d/actuator_set/g/GW/d/D", Vec::new())));
    }

    #[test]
    fn last_will_routing() {
        let protocol = StatusProtocol;
        let will = Message::new(protocol.last_will_channel("DEV"), b"Gone".to_vec());

        let routed = protocol.route_last_will_message(&will, "GW").unwrap();
        assert_eq!(routed.channel(), "d2p/last_will/g/GW/d/DEV");
        assert_eq!(routed.payload(), b"Gone");
    }
}
