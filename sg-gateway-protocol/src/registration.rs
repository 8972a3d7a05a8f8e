//! Registration protocol codec: subdevice registration requests and
//! responses, reregistration and deletion.

use crate::{channel, GatewayProtocol};
use sg_gateway_models::domain::{
    DeviceRegistrationRequest, DeviceRegistrationResponse, DeviceReregistrationResponse, Message,
};
use tracing::warn;

const REGISTRATION_REQUEST_ROOT: &str = "register_subdevice_request";
const REGISTRATION_RESPONSE_ROOT: &str = "register_subdevice_response";
const REREGISTRATION_ROOT: &str = "reregister_subdevice";
const DELETION_REQUEST_ROOT: &str = "delete_subdevice_request";

#[derive(Debug, Default, Clone, Copy)]
pub struct RegistrationProtocol;

impl GatewayProtocol for RegistrationProtocol {
    fn name(&self) -> &'static str {
        "RegistrationProtocol"
    }

    fn inbound_platform_channels(&self) -> Vec<String> {
        vec![
            channel::gateway_device_channel(
                channel::PLATFORM_TO_DEVICE,
                REGISTRATION_RESPONSE_ROOT,
                channel::SINGLE_LEVEL_WILDCARD,
                channel::SINGLE_LEVEL_WILDCARD,
            ),
            channel::gateway_channel(
                channel::PLATFORM_TO_DEVICE,
                REREGISTRATION_ROOT,
                channel::SINGLE_LEVEL_WILDCARD,
            ),
        ]
    }

    fn inbound_platform_channels_for_gateway_key(&self, gateway_key: &str) -> Vec<String> {
        vec![
            channel::gateway_device_channel(
                channel::PLATFORM_TO_DEVICE,
                REGISTRATION_RESPONSE_ROOT,
                gateway_key,
                channel::SINGLE_LEVEL_WILDCARD,
            ),
            channel::gateway_channel(
                channel::PLATFORM_TO_DEVICE,
                REREGISTRATION_ROOT,
                gateway_key,
            ),
        ]
    }

    fn inbound_platform_channels_for_keys(
        &self,
        gateway_key: &str,
        device_key: &str,
    ) -> Vec<String> {
        vec![channel::gateway_device_channel(
            channel::PLATFORM_TO_DEVICE,
            REGISTRATION_RESPONSE_ROOT,
            gateway_key,
            device_key,
        )]
    }

    fn inbound_device_channels(&self) -> Vec<String> {
        vec![channel::device_channel(
            channel::DEVICE_TO_PLATFORM,
            REGISTRATION_REQUEST_ROOT,
            channel::SINGLE_LEVEL_WILDCARD,
        )]
    }

    fn inbound_device_channels_for_device_key(&self, device_key: &str) -> Vec<String> {
        vec![channel::device_channel(
            channel::DEVICE_TO_PLATFORM,
            REGISTRATION_REQUEST_ROOT,
            device_key,
        )]
    }
}

impl RegistrationProtocol {
    pub fn is_registration_request(&self, message: &Message) -> bool {
        channel::root(message.channel()) == Some(REGISTRATION_REQUEST_ROOT)
    }

    pub fn is_registration_response(&self, message: &Message) -> bool {
        channel::root(message.channel()) == Some(REGISTRATION_RESPONSE_ROOT)
    }

    pub fn is_reregistration_request(&self, message: &Message) -> bool {
        channel::root(message.channel()) == Some(REREGISTRATION_ROOT)
    }

    pub fn make_registration_request(
        &self,
        message: &Message,
    ) -> Option<DeviceRegistrationRequest> {
        if !self.is_registration_request(message) {
            return None;
        }

        serde_json::from_slice(message.payload())
            .map_err(|e| {
                warn!(channel = message.channel(), error = %e, "Malformed registration request")
            })
            .ok()
    }

    pub fn make_registration_response(
        &self,
        message: &Message,
    ) -> Option<DeviceRegistrationResponse> {
        if !self.is_registration_response(message) {
            return None;
        }

        serde_json::from_slice(message.payload())
            .map_err(|e| {
                warn!(channel = message.channel(), error = %e, "Malformed registration response")
            })
            .ok()
    }

    /// Platform-bound registration request for one subdevice (or the gateway
    /// itself when the keys coincide).
    pub fn make_registration_request_message(
        &self,
        gateway_key: &str,
        request: &DeviceRegistrationRequest,
    ) -> Option<Message> {
        let payload = serde_json::to_vec(request).ok()?;
        Some(Message::new(
            channel::gateway_device_channel(
                channel::DEVICE_TO_PLATFORM,
                REGISTRATION_REQUEST_ROOT,
                gateway_key,
                &request.device_key,
            ),
            payload,
        ))
    }

    /// Local response forwarded to the subdevice that asked to register.
    pub fn make_registration_response_message(
        &self,
        device_key: &str,
        response: &DeviceRegistrationResponse,
    ) -> Option<Message> {
        let payload = serde_json::to_vec(response).ok()?;
        Some(Message::new(
            channel::device_channel(
                channel::PLATFORM_TO_DEVICE,
                REGISTRATION_RESPONSE_ROOT,
                device_key,
            ),
            payload,
        ))
    }

    /// Platform-bound acknowledgment of a reregistration request.
    pub fn make_reregistration_response_message(
        &self,
        gateway_key: &str,
        response: &DeviceReregistrationResponse,
    ) -> Option<Message> {
        let payload = serde_json::to_vec(response).ok()?;
        Some(Message::new(
            channel::gateway_channel(channel::DEVICE_TO_PLATFORM, REREGISTRATION_ROOT, gateway_key),
            payload,
        ))
    }

    /// Local reregistration nudge for one subdevice.
    pub fn make_device_reregistration_message(&self, device_key: &str) -> Message {
        Message::new(
            channel::device_channel(channel::PLATFORM_TO_DEVICE, REREGISTRATION_ROOT, device_key),
            Vec::new(),
        )
    }

    /// Platform-bound deletion request for one subdevice.
    pub fn make_deletion_request_message(&self, gateway_key: &str, device_key: &str) -> Message {
        Message::new(
            channel::gateway_device_channel(
                channel::DEVICE_TO_PLATFORM,
                DELETION_REQUEST_ROOT,
                gateway_key,
                device_key,
            ),
            Vec::new(),
        )
    }
}
