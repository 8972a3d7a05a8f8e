//! Subdevice registration pipeline.
//!
//! Requests from the local side are gated on the gateway's own registration:
//! until the gateway is in the repository, subdevice requests queue up and
//! nothing reaches the platform. Responses from the platform are correlated
//! against the in-flight request by device key, persisted on success, and the
//! pending queue drains once the gateway's own registration completes.

use crate::inbound::{DeviceMessageListener, PlatformMessageListener};
use crate::outbound::OutboundMessageHandler;
use async_trait::async_trait;
use sg_gateway_models::domain::{
    Device, DeviceRegistrationRequest, DeviceRegistrationResponse, DeviceReregistrationResponse,
    Message, RegistrationResult,
};
use sg_gateway_models::fingerprint::manifest_fingerprint;
use sg_gateway_models::settings::SubdeviceManagement;
use sg_gateway_protocol::{GatewayProtocol, RegistrationProtocol};
use sg_gateway_repository::DeviceRepository;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Invoked after a device is persisted: `(device key, is the gateway)`.
pub type DeviceRegisteredCallback = Arc<dyn Fn(&str, bool) + Send + Sync>;

#[derive(Default)]
struct RegistrationState {
    /// Requests waiting for the gateway to be registered first.
    pending: Vec<DeviceRegistrationRequest>,
    /// Requests forwarded to the platform, awaiting a response.
    in_flight: HashMap<String, DeviceRegistrationRequest>,
}

pub struct DeviceRegistrationService {
    gateway_key: String,
    management: SubdeviceManagement,
    protocol: RegistrationProtocol,
    device_repository: DeviceRepository,
    platform_outbound: Arc<dyn OutboundMessageHandler>,
    device_outbound: Arc<dyn OutboundMessageHandler>,
    state: Mutex<RegistrationState>,
    on_device_registered: Mutex<Option<DeviceRegisteredCallback>>,
}

impl DeviceRegistrationService {
    pub fn new(
        gateway_key: impl Into<String>,
        management: SubdeviceManagement,
        protocol: RegistrationProtocol,
        device_repository: DeviceRepository,
        platform_outbound: Arc<dyn OutboundMessageHandler>,
        device_outbound: Arc<dyn OutboundMessageHandler>,
    ) -> Self {
        Self {
            gateway_key: gateway_key.into(),
            management,
            protocol,
            device_repository,
            platform_outbound,
            device_outbound,
            state: Mutex::new(RegistrationState::default()),
            on_device_registered: Mutex::new(None),
        }
    }

    pub fn set_on_device_registered(&self, callback: DeviceRegisteredCallback) {
        *self.on_device_registered.lock().unwrap() = Some(callback);
    }

    /// Submit a registration request originating in this process, e.g. the
    /// gateway registering itself at startup. Same path as a device-side
    /// request message.
    pub async fn submit_registration_request(&self, request: DeviceRegistrationRequest) {
        self.handle_registration_request(request).await;
    }

    async fn handle_registration_request(&self, request: DeviceRegistrationRequest) {
        let device_key = request.device_key.clone();

        if !request.manifest.references_unique() {
            warn!(device_key, "Registration request with duplicate references");
            return;
        }

        if device_key == self.gateway_key {
            info!(device_key, "Gateway registration requested");
            self.forward_to_platform(request);
            return;
        }

        if self.management == SubdeviceManagement::Platform {
            warn!(
                device_key,
                "Subdevice registration refused: catalog is platform-managed"
            );
            return;
        }

        let gateway = match self.device_repository.find_by_device_key(&self.gateway_key).await {
            Ok(gateway) => gateway,
            Err(e) => {
                warn!(error = %e, "Gateway lookup failed, queuing registration request");
                None
            }
        };

        let Some(gateway) = gateway else {
            info!(
                device_key,
                "Gateway not registered yet, queuing registration request"
            );
            self.state.lock().unwrap().pending.push(request);
            return;
        };

        if request.manifest.protocol != gateway.manifest.protocol {
            warn!(
                device_key,
                device_protocol = request.manifest.protocol,
                gateway_protocol = gateway.manifest.protocol,
                "Registration request dropped: protocol differs from gateway"
            );
            return;
        }

        match self.device_repository.find_by_device_key(&device_key).await {
            Ok(Some(existing))
                if manifest_fingerprint(&existing.manifest)
                    == manifest_fingerprint(&request.manifest) =>
            {
                debug!(device_key, "Device already registered with equivalent manifest");
                return;
            }
            Err(e) => {
                warn!(device_key, error = %e, "Repository lookup failed, forwarding anyway");
            }
            _ => {}
        }

        self.forward_to_platform(request);
    }

    fn forward_to_platform(&self, request: DeviceRegistrationRequest) {
        let Some(message) = self
            .protocol
            .make_registration_request_message(&self.gateway_key, &request)
        else {
            warn!(
                device_key = request.device_key,
                "Failed to build registration request message"
            );
            return;
        };

        self.state
            .lock()
            .unwrap()
            .in_flight
            .insert(request.device_key.clone(), request);
        self.platform_outbound.add_message(message);
    }

    async fn handle_registration_response(
        &self,
        device_key: String,
        response: DeviceRegistrationResponse,
    ) {
        let request = self.state.lock().unwrap().in_flight.remove(&device_key);
        let Some(request) = request else {
            warn!(device_key, "Registration response without an in-flight request");
            return;
        };

        if !response.result.is_success() {
            warn!(
                device_key,
                result = ?response.result,
                "Platform rejected registration"
            );
            self.forward_response_to_device(&device_key, &response);
            return;
        }

        let device = Device::new(request.device_name, &device_key, request.manifest);
        if let Err(e) = self.device_repository.save(&device).await {
            warn!(device_key, error = %e, "Failed to persist registered device");
        }

        let is_gateway = device_key == self.gateway_key;
        info!(device_key, is_gateway, "Device registered");

        if let Some(callback) = self.on_device_registered.lock().unwrap().as_ref() {
            callback(&device_key, is_gateway);
        }

        self.forward_response_to_device(&device_key, &response);

        if is_gateway {
            self.drain_pending().await;
        }
    }

    fn forward_response_to_device(&self, device_key: &str, response: &DeviceRegistrationResponse) {
        if device_key == self.gateway_key {
            return;
        }
        if let Some(message) = self
            .protocol
            .make_registration_response_message(device_key, response)
        {
            self.device_outbound.add_message(message);
        }
    }

    /// Re-submit every request that queued up while the gateway was
    /// unregistered.
    async fn drain_pending(&self) {
        let pending = std::mem::take(&mut self.state.lock().unwrap().pending);
        if pending.is_empty() {
            return;
        }

        info!(count = pending.len(), "Draining queued registration requests");
        for request in pending {
            Box::pin(self.handle_registration_request(request)).await;
        }
    }

    async fn handle_reregistration_request(&self) {
        let keys = match self.device_repository.find_all_device_keys().await {
            Ok(keys) => keys,
            Err(e) => {
                warn!(error = %e, "Failed to list devices for reregistration");
                return;
            }
        };

        let mut notified = 0usize;
        for key in keys {
            if key == self.gateway_key {
                continue;
            }
            self.device_outbound
                .add_message(self.protocol.make_device_reregistration_message(&key));
            notified += 1;
        }

        info!(notified, "Reregistration fan-out");

        if let Some(ack) = self.protocol.make_reregistration_response_message(
            &self.gateway_key,
            &DeviceReregistrationResponse {
                result: RegistrationResult::Ok,
            },
        ) {
            self.platform_outbound.add_message(ack);
        }
    }

    /// Remove every stored device whose key is in neither `keep` nor the
    /// gateway's own key, emitting one platform deletion request per removal.
    pub async fn delete_devices_other_than(&self, keep: &HashSet<String>) {
        let keys = match self.device_repository.find_all_device_keys().await {
            Ok(keys) => keys,
            Err(e) => {
                warn!(error = %e, "Failed to list devices for deletion");
                return;
            }
        };

        for key in keys {
            if key == self.gateway_key || keep.contains(&key) {
                continue;
            }

            info!(device_key = key, "Deleting device");
            if let Err(e) = self.device_repository.remove(&key).await {
                warn!(device_key = key, error = %e, "Failed to remove device");
                continue;
            }
            self.platform_outbound
                .add_message(self.protocol.make_deletion_request_message(&self.gateway_key, &key));
        }
    }

    /// Wipe the whole catalog. Used when the platform deletes the gateway
    /// itself.
    pub async fn delete_all_devices(&self) {
        if let Err(e) = self.device_repository.remove_all().await {
            warn!(error = %e, "Failed to clear device repository");
        }
    }
}

#[async_trait]
impl DeviceMessageListener for DeviceRegistrationService {
    async fn device_message_received(&self, message: Message) {
        let Some(request) = self.protocol.make_registration_request(&message) else {
            warn!(
                channel = message.channel(),
                "Unable to parse device-side registration message"
            );
            return;
        };

        // The channel names the sender; the payload names the subject. They
        // only differ when a device registers on behalf of another, which is
        // not allowed.
        if let Some(sender) = self.protocol.extract_device_key(message.channel()) {
            if sender != request.device_key {
                warn!(
                    sender,
                    subject = request.device_key,
                    "Registration request key mismatch"
                );
                return;
            }
        }

        self.handle_registration_request(request).await;
    }
}

#[async_trait]
impl PlatformMessageListener for DeviceRegistrationService {
    async fn platform_message_received(&self, message: Message) {
        if self.protocol.is_reregistration_request(&message) {
            self.handle_reregistration_request().await;
            return;
        }

        if let Some(response) = self.protocol.make_registration_response(&message) {
            let Some(device_key) = self.protocol.extract_device_key(message.channel()) else {
                warn!(
                    channel = message.channel(),
                    "Registration response without a device key"
                );
                return;
            };
            self.handle_registration_response(device_key, response).await;
            return;
        }

        warn!(
            channel = message.channel(),
            "Unable to parse platform-side registration message"
        );
    }
}
