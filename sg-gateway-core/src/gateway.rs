//! Gateway façade: owns the repositories, handlers, transports and services,
//! and wires them together.
//!
//! Services never point back at the façade. Routing between the resolver and
//! the per-protocol data services goes through injected callbacks holding a
//! weak reference to the service registry, so teardown is just dropping the
//! façade.

use crate::connectivity::{ConnectionCallback, MessageCallback, MqttConfig, MqttConnectivityService};
use crate::inbound::{
    DeviceMessageListener, InboundDeviceMessageHandler, InboundPlatformMessageHandler,
    PlatformMessageListener,
};
use crate::publishing::{MessagePublisher, PublishingService};
use crate::resolver::{ChannelProtocolResolver, RouteCallback};
use crate::service::keep_alive::KEEP_ALIVE_INTERVAL;
use crate::service::{
    DataService, DeviceRegistrationService, DeviceStatusService, FileDownloadService,
    FirmwareUpdateService, KeepAliveService,
};
use sg_gateway_models::domain::DeviceRegistrationRequest;
use sg_gateway_models::settings::GatewaySettings;
use sg_gateway_protocol::{
    DataProtocol, DownloadProtocol, FirmwareUpdateProtocol, GatewayProtocol, RegistrationProtocol,
    StatusProtocol,
};
use sg_gateway_repository::{DeviceRepository, FileRepository};
use sea_orm::DatabaseConnection;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};
use tracing::{info, warn};

const MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;
const MAX_PACKET_SIZE: u64 = 1024 * 1024;
const DOWNLOAD_DIRECTORY: &str = "files";

struct DataServiceEntry {
    service: Arc<DataService>,
    /// Held so the inbound handlers' weak references stay alive.
    _resolver: Arc<ChannelProtocolResolver>,
}

type DataServices = Arc<Mutex<HashMap<String, DataServiceEntry>>>;

pub struct SGGateway {
    settings: GatewaySettings,
    device_repository: DeviceRepository,

    platform_handler: Arc<InboundPlatformMessageHandler>,
    device_handler: Arc<InboundDeviceMessageHandler>,

    platform_connectivity: Arc<MqttConnectivityService>,
    device_connectivity: Arc<MqttConnectivityService>,
    platform_publisher: Arc<PublishingService>,
    device_publisher: Arc<PublishingService>,

    registration_service: Arc<DeviceRegistrationService>,
    file_download_service: Arc<FileDownloadService>,
    firmware_service: Arc<FirmwareUpdateService>,
    status_service: Arc<DeviceStatusService>,
    keep_alive_service: Option<Arc<KeepAliveService>>,

    data_services: DataServices,
    firmware_version: Option<String>,
}

impl SGGateway {
    pub fn new(
        settings: GatewaySettings,
        db: DatabaseConnection,
        firmware_version: Option<String>,
    ) -> Self {
        let gateway_key = settings.key.clone();
        let device_repository = DeviceRepository::new(db.clone());
        let file_repository = FileRepository::new(db);

        let platform_handler = Arc::new(InboundPlatformMessageHandler::new());
        let device_handler = Arc::new(InboundDeviceMessageHandler::new());

        let status_protocol = StatusProtocol;
        let platform_connectivity = MqttConnectivityService::new(MqttConfig {
            uri: settings.platform_mqtt_uri.clone(),
            client_id: gateway_key.clone(),
            username: Some(gateway_key.clone()),
            password: Some(settings.password.clone()),
            trust_store: settings.platform_trust_store.clone(),
            last_will: Some((
                status_protocol.gateway_last_will_channel(&gateway_key),
                Vec::new(),
            )),
        });
        let device_connectivity = MqttConnectivityService::new(MqttConfig {
            uri: settings.local_mqtt_uri.clone(),
            client_id: format!("{gateway_key}_gateway"),
            username: None,
            password: None,
            trust_store: None,
            last_will: None,
        });

        let platform_publisher = Arc::new(PublishingService::new(
            Arc::clone(&platform_connectivity) as Arc<dyn MessagePublisher>,
        ));
        let device_publisher = Arc::new(PublishingService::new(
            Arc::clone(&device_connectivity) as Arc<dyn MessagePublisher>,
        ));

        let registration_service = Arc::new(DeviceRegistrationService::new(
            gateway_key.clone(),
            settings.subdevice_management,
            RegistrationProtocol,
            device_repository.clone(),
            Arc::clone(&platform_publisher) as _,
            Arc::clone(&device_publisher) as _,
        ));
        registration_service.set_on_device_registered(Arc::new(|device_key, is_gateway| {
            info!(device_key, is_gateway, "Device registration completed");
        }));
        platform_handler.add_listener(
            RegistrationProtocol.inbound_platform_channels_for_gateway_key(&gateway_key),
            Arc::downgrade(&registration_service) as Weak<dyn PlatformMessageListener>,
        );
        device_handler.add_listener(
            RegistrationProtocol.inbound_device_channels(),
            Arc::downgrade(&registration_service) as Weak<dyn DeviceMessageListener>,
        );

        let file_download_service = Arc::new(FileDownloadService::new(
            gateway_key.clone(),
            DownloadProtocol,
            MAX_FILE_SIZE,
            MAX_PACKET_SIZE,
            DOWNLOAD_DIRECTORY,
            Arc::clone(&platform_publisher) as _,
            file_repository,
        ));
        platform_handler.add_listener(
            DownloadProtocol.inbound_platform_channels_for_gateway_key(&gateway_key),
            Arc::downgrade(&file_download_service) as Weak<dyn PlatformMessageListener>,
        );

        let firmware_service = Arc::new(FirmwareUpdateService::new(
            gateway_key.clone(),
            FirmwareUpdateProtocol,
            device_repository.clone(),
            Arc::clone(&platform_publisher) as _,
            Arc::clone(&device_publisher) as _,
        ));
        platform_handler.add_listener(
            FirmwareUpdateProtocol.inbound_platform_channels_for_gateway_key(&gateway_key),
            Arc::downgrade(&firmware_service) as Weak<dyn PlatformMessageListener>,
        );
        device_handler.add_listener(
            FirmwareUpdateProtocol.inbound_device_channels(),
            Arc::downgrade(&firmware_service) as Weak<dyn DeviceMessageListener>,
        );

        let status_service = Arc::new(DeviceStatusService::new(
            gateway_key.clone(),
            status_protocol,
            Arc::clone(&platform_publisher) as _,
        ));
        device_handler.add_listener(
            status_protocol.inbound_device_channels(),
            Arc::downgrade(&status_service) as Weak<dyn DeviceMessageListener>,
        );

        let keep_alive_service = settings.keep_alive.then(|| {
            let service = Arc::new(KeepAliveService::new(
                gateway_key.clone(),
                status_protocol,
                Arc::clone(&platform_publisher) as _,
                KEEP_ALIVE_INTERVAL,
            ));
            platform_handler.add_listener(
                status_protocol.inbound_platform_channels_for_gateway_key(&gateway_key),
                Arc::downgrade(&service) as Weak<dyn PlatformMessageListener>,
            );
            service
        });

        let gateway = Self {
            settings,
            device_repository,
            platform_handler,
            device_handler,
            platform_connectivity,
            device_connectivity,
            platform_publisher,
            device_publisher,
            registration_service,
            file_download_service,
            firmware_service,
            status_service,
            keep_alive_service,
            data_services: Arc::new(Mutex::new(HashMap::new())),
            firmware_version,
        };

        gateway.register_data_protocol(DataProtocol);
        gateway
    }

    /// Register one data protocol family: a data service plus the resolver
    /// that picks it per device.
    pub fn register_data_protocol(&self, protocol: DataProtocol) {
        let name = protocol.name().to_string();
        if self.data_services.lock().unwrap().contains_key(&name) {
            info!(protocol = name, "Data protocol already registered");
            return;
        }

        let service = Arc::new(DataService::new(
            self.settings.key.clone(),
            protocol,
            Arc::clone(&self.platform_publisher) as _,
            Arc::clone(&self.device_publisher) as _,
        ));

        let platform_route: RouteCallback = {
            let services = Arc::downgrade(&self.data_services);
            Arc::new(move |protocol_name, message| {
                let Some(services) = services.upgrade() else {
                    return;
                };
                match services.lock().unwrap().get(protocol_name) {
                    Some(entry) => entry.service.handle_platform_message(message),
                    None => warn!(protocol = protocol_name, "Data service not found"),
                };
            })
        };
        let device_route: RouteCallback = {
            let services = Arc::downgrade(&self.data_services);
            Arc::new(move |protocol_name, message| {
                let Some(services) = services.upgrade() else {
                    return;
                };
                match services.lock().unwrap().get(protocol_name) {
                    Some(entry) => entry.service.handle_device_message(message),
                    None => warn!(protocol = protocol_name, "Data service not found"),
                };
            })
        };

        let resolver = Arc::new(ChannelProtocolResolver::new(
            protocol,
            self.device_repository.clone(),
            platform_route,
            device_route,
        ));

        self.platform_handler.add_listener(
            protocol.inbound_platform_channels_for_gateway_key(&self.settings.key),
            Arc::downgrade(&resolver) as Weak<dyn PlatformMessageListener>,
        );
        self.device_handler.add_listener(
            protocol.inbound_device_channels(),
            Arc::downgrade(&resolver) as Weak<dyn DeviceMessageListener>,
        );

        self.data_services.lock().unwrap().insert(
            name,
            DataServiceEntry {
                service,
                _resolver: resolver,
            },
        );
    }

    /// Bring both broker connections up and keep them up. Also queues the
    /// gateway's own registration when the catalog does not know it yet.
    pub async fn connect(&self) {
        match self
            .device_repository
            .contains_device_with_key(&self.settings.key)
            .await
        {
            Ok(true) => {}
            Ok(false) => {
                info!("Gateway not registered yet, requesting registration");
                let device = self.settings.gateway_device();
                self.registration_service
                    .submit_registration_request(DeviceRegistrationRequest::new(
                        device.name,
                        device.key,
                        device.manifest,
                    ))
                    .await;
            }
            Err(e) => warn!(error = %e, "Gateway registration lookup failed"),
        }

        self.connect_to_platform();
        self.connect_to_devices();
    }

    fn connect_to_platform(&self) {
        let handler = Arc::clone(&self.platform_handler);
        let on_message: MessageCallback =
            Arc::new(move |channel, payload| handler.message_received(channel, payload));

        let on_connected: ConnectionCallback = {
            let publisher = Arc::clone(&self.platform_publisher);
            let keep_alive = self.keep_alive_service.clone();
            let firmware = Arc::clone(&self.firmware_service);
            let version = self.firmware_version.clone();
            Arc::new(move || {
                publisher.connected();
                if let Some(keep_alive) = &keep_alive {
                    keep_alive.connected();
                }
                if let Some(version) = &version {
                    firmware.publish_firmware_version(version);
                }
            })
        };

        let on_disconnected: ConnectionCallback = {
            let publisher = Arc::clone(&self.platform_publisher);
            let keep_alive = self.keep_alive_service.clone();
            Arc::new(move || {
                publisher.disconnected();
                if let Some(keep_alive) = &keep_alive {
                    keep_alive.disconnected();
                }
            })
        };

        self.platform_connectivity.connect(
            self.platform_handler.channels(),
            on_message,
            on_connected,
            on_disconnected,
        );
    }

    fn connect_to_devices(&self) {
        let handler = Arc::clone(&self.device_handler);
        let on_message: MessageCallback =
            Arc::new(move |channel, payload| handler.message_received(channel, payload));

        let on_connected: ConnectionCallback = {
            let publisher = Arc::clone(&self.device_publisher);
            let status = Arc::clone(&self.status_service);
            Arc::new(move || {
                publisher.connected();
                status.connected();
            })
        };

        let on_disconnected: ConnectionCallback = {
            let publisher = Arc::clone(&self.device_publisher);
            let status = Arc::clone(&self.status_service);
            Arc::new(move || {
                publisher.disconnected();
                status.disconnected();
            })
        };

        self.device_connectivity.connect(
            self.device_handler.channels(),
            on_message,
            on_connected,
            on_disconnected,
        );
    }

    pub fn registration_service(&self) -> &Arc<DeviceRegistrationService> {
        &self.registration_service
    }

    pub async fn stop(&self) {
        self.platform_connectivity.stop();
        self.device_connectivity.stop();
        self.platform_publisher.stop();
        self.device_publisher.stop();

        self.file_download_service.stop();
        self.firmware_service.stop();
        self.status_service.stop();
        if let Some(keep_alive) = &self.keep_alive_service {
            keep_alive.stop();
        }
        for entry in self.data_services.lock().unwrap().values() {
            entry.service.stop();
        }

        self.platform_handler.stop();
        self.device_handler.stop();
        info!("Gateway stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sg_gateway_repository::sqlite;

    fn settings() -> GatewaySettings {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gateway.json");
        std::fs::write(
            &path,
            r#"{
                "key": "gateway_key",
                "password": "secret",
                "platformMqttUri": "tcp://platform.example:1883",
                "localMqttUri": "tcp://localhost:1883",
                "subdeviceManagement": "GATEWAY",
                "manifest": {
                    "name": "Gateway",
                    "protocol": "JsonProtocol",
                    "firmwareUpdateProtocol": "DFUProtocol"
                }
            }"#,
        )
        .unwrap();
        GatewaySettings::new(path.to_str().unwrap()).unwrap()
    }

    #[tokio::test]
    async fn wiring_produces_subscription_lists_for_both_sides() {
        let db = sqlite::init_db(sqlite::memory_url()).await.unwrap();
        let gateway = SGGateway::new(settings(), db, Some("1.0.0".to_string()));

        let platform = gateway.platform_handler.channels();
        assert!(platform
            .contains(&"p2d/register_subdevice_response/g/gateway_key/d/+".to_string()));
        assert!(platform.contains(&"p2d/file_upload_initiate/g/gateway_key".to_string()));
        assert!(platform.contains(&"p2d/firmware_update_install/g/gateway_key/d/+".to_string()));
        assert!(platform.contains(&"p2d/pong/g/gateway_key".to_string()));
        assert!(platform.contains(&"p2d/actuator_set/g/gateway_key/d/+".to_string()));

        let device = gateway.device_handler.channels();
        assert!(device.contains(&"d2p/register_subdevice_request/d/+".to_string()));
        assert!(device.contains(&"d2p/last_will/d/+".to_string()));
        assert!(device.contains(&"d2p/sensor_reading/d/+".to_string()));
        assert!(device.contains(&"d2p/firmware_update_status/d/+".to_string()));

        gateway.stop().await;
    }

    #[tokio::test]
    async fn data_protocol_registration_is_idempotent() {
        let db = sqlite::init_db(sqlite::memory_url()).await.unwrap();
        let gateway = SGGateway::new(settings(), db, None);

        gateway.register_data_protocol(DataProtocol);
        assert_eq!(gateway.data_services.lock().unwrap().len(), 1);

        gateway.stop().await;
    }
}
