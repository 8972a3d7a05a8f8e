//! Gateway configuration file.
//!
//! The configuration is a single JSON document given on the command line.
//! Required keys identify the gateway on both brokers; everything else has a
//! default.

use crate::domain::{Device, DeviceManifest};
use config::{Config, File, FileFormat};
use serde::Deserialize;
use sg_gateway_error::SGResult;
use std::{ops::Deref, sync::Arc};

/// Who owns the subdevice catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubdeviceManagement {
    /// The platform drives registration and deletion; local requests are refused.
    Platform,
    /// Subdevices register themselves through the gateway.
    Gateway,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueGenerator {
    Random,
    Incremental,
}

#[derive(Debug, Clone)]
pub struct GatewaySettings(Arc<Inner>);

impl Deref for GatewaySettings {
    type Target = Inner;
    fn deref(&self) -> &Self::Target {
        self.0.as_ref()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inner {
    pub key: String,
    pub password: String,
    pub platform_mqtt_uri: String,
    pub local_mqtt_uri: String,
    pub subdevice_management: SubdeviceManagement,
    pub manifest: DeviceManifest,

    #[serde(default = "Inner::keep_alive_default")]
    pub keep_alive: bool,
    #[serde(default)]
    pub platform_trust_store: Option<String>,
    #[serde(default = "Inner::readings_interval_default")]
    pub readings_interval: u64,
    #[serde(default = "Inner::generator_default")]
    pub generator: ValueGenerator,
}

impl Inner {
    fn keep_alive_default() -> bool {
        true
    }

    fn readings_interval_default() -> u64 {
        1000
    }

    fn generator_default() -> ValueGenerator {
        ValueGenerator::Random
    }
}

impl GatewaySettings {
    pub fn new(config_path: &str) -> SGResult<Self> {
        let builder =
            Config::builder().add_source(File::new(config_path, FileFormat::Json).required(true));
        let inner: Inner = builder.build()?.try_deserialize()?;
        Ok(Self(Arc::new(inner)))
    }

    /// The gateway itself, as a device: configured key plus the configured
    /// manifest, named after the manifest.
    pub fn gateway_device(&self) -> Device {
        Device::new(self.manifest.name.clone(), self.key.clone(), self.manifest.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<Inner, serde_json::Error> {
        serde_json::from_str(json)
    }

    #[test]
    fn full_configuration_parses() {
        let inner = parse(
            r#"{
                "key": "gateway_key",
                "password": "secret",
                "platformMqttUri": "ssl://platform.example:8883",
                "localMqttUri": "tcp://localhost:1883",
                "subdeviceManagement": "GATEWAY",
                "keepAlive": false,
                "platformTrustStore": "ca.crt",
                "readingsInterval": 250,
                "generator": "incremental",
                "manifest": {
                    "name": "Gateway",
                    "protocol": "JsonProtocol",
                    "firmwareUpdateProtocol": "DFU"
                }
            }"#,
        )
        .unwrap();

        assert_eq!(inner.subdevice_management, SubdeviceManagement::Gateway);
        assert!(!inner.keep_alive);
        assert_eq!(inner.readings_interval, 250);
        assert_eq!(inner.generator, ValueGenerator::Incremental);
        assert_eq!(inner.platform_trust_store.as_deref(), Some("ca.crt"));
    }

    #[test]
    fn optionals_take_defaults() {
        let inner = parse(
            r#"{
                "key": "gateway_key",
                "password": "secret",
                "platformMqttUri": "tcp://platform.example:1883",
                "localMqttUri": "tcp://localhost:1883",
                "subdeviceManagement": "PLATFORM",
                "manifest": {
                    "name": "Gateway",
                    "protocol": "JsonProtocol"
                }
            }"#,
        )
        .unwrap();

        assert!(inner.keep_alive);
        assert_eq!(inner.readings_interval, 1000);
        assert_eq!(inner.generator, ValueGenerator::Random);
        assert!(inner.platform_trust_store.is_none());
    }

    #[test]
    fn missing_required_key_fails() {
        assert!(parse(
            r#"{
                "password": "secret",
                "platformMqttUri": "tcp://platform.example:1883",
                "localMqttUri": "tcp://localhost:1883",
                "subdeviceManagement": "PLATFORM",
                "manifest": { "name": "Gateway", "protocol": "JsonProtocol" }
            }"#,
        )
        .is_err());
    }

    #[test]
    fn unknown_management_mode_fails() {
        assert!(parse(
            r#"{
                "key": "gateway_key",
                "password": "secret",
                "platformMqttUri": "tcp://platform.example:1883",
                "localMqttUri": "tcp://localhost:1883",
                "subdeviceManagement": "NEITHER",
                "manifest": { "name": "Gateway", "protocol": "JsonProtocol" }
            }"#,
        )
        .is_err());
    }
}
