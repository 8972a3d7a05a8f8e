//! Device and manifest model.
//!
//! A manifest is the full schema of a device: the sensors, actuators, alarms
//! and configuration items it exposes, plus the protocol names it speaks.
//! Manifests are compared by fingerprint (see `crate::fingerprint`), never
//! field by field.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Value type of a sensor, actuator or configuration item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataType {
    Boolean,
    Numeric,
    String,
}

/// Severity of an alarm as reported to the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlarmSeverity {
    Alert,
    Critical,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlarmManifest {
    pub reference: String,
    pub name: String,
    pub severity: AlarmSeverity,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActuatorManifest {
    pub reference: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub unit_symbol: String,
    #[serde(default)]
    pub reading_type_name: String,
    pub data_type: DataType,
    #[serde(default)]
    pub precision: u32,
    #[serde(default)]
    pub minimum: f64,
    #[serde(default)]
    pub maximum: f64,
    #[serde(default)]
    pub delimiter: String,
    #[serde(default)]
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorManifest {
    pub reference: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub unit_symbol: String,
    #[serde(default)]
    pub reading_type_name: String,
    pub data_type: DataType,
    #[serde(default)]
    pub precision: u32,
    #[serde(default)]
    pub minimum: f64,
    #[serde(default)]
    pub maximum: f64,
    #[serde(default)]
    pub delimiter: String,
    #[serde(default)]
    pub labels: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigurationManifest {
    pub reference: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub data_type: DataType,
    #[serde(default)]
    pub minimum: f64,
    #[serde(default)]
    pub maximum: f64,
    #[serde(default)]
    pub delimiter: String,
    #[serde(default)]
    pub default_value: String,
    #[serde(default)]
    pub labels: Vec<String>,
}

/// Full schema of one device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceManifest {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub protocol: String,
    #[serde(default)]
    pub firmware_update_protocol: String,
    #[serde(default)]
    pub alarms: Vec<AlarmManifest>,
    #[serde(default)]
    pub actuators: Vec<ActuatorManifest>,
    #[serde(default)]
    pub sensors: Vec<SensorManifest>,
    #[serde(default)]
    pub configurations: Vec<ConfigurationManifest>,
}

impl DeviceManifest {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        protocol: impl Into<String>,
        firmware_update_protocol: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            protocol: protocol.into(),
            firmware_update_protocol: firmware_update_protocol.into(),
            alarms: Vec::new(),
            actuators: Vec::new(),
            sensors: Vec::new(),
            configurations: Vec::new(),
        }
    }

    /// References must be unique within each feed kind of a manifest.
    pub fn references_unique(&self) -> bool {
        fn unique<'a>(refs: impl Iterator<Item = &'a str>) -> bool {
            let mut seen = HashSet::new();
            refs.into_iter().all(|r| seen.insert(r))
        }

        unique(self.alarms.iter().map(|a| a.reference.as_str()))
            && unique(self.actuators.iter().map(|a| a.reference.as_str()))
            && unique(self.sensors.iter().map(|s| s.reference.as_str()))
            && unique(self.configurations.iter().map(|c| c.reference.as_str()))
    }
}

/// A device known to the gateway: unique key, display name and manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub key: String,
    pub name: String,
    pub manifest: DeviceManifest,
}

impl Device {
    pub fn new(
        name: impl Into<String>,
        key: impl Into<String>,
        manifest: DeviceManifest,
    ) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            manifest,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sensor(reference: &str) -> SensorManifest {
        SensorManifest {
            reference: reference.to_string(),
            name: "Sensor".to_string(),
            description: String::new(),
            unit_symbol: "℃".to_string(),
            reading_type_name: "TEMPERATURE".to_string(),
            data_type: DataType::Numeric,
            precision: 1,
            minimum: -40.0,
            maximum: 85.0,
            delimiter: String::new(),
            labels: Vec::new(),
        }
    }

    #[test]
    fn duplicate_references_are_detected() {
        let mut manifest = DeviceManifest::new("m", "", "JsonProtocol", "DFU");
        manifest.sensors.push(sensor("T"));
        assert!(manifest.references_unique());

        manifest.sensors.push(sensor("T"));
        assert!(!manifest.references_unique());
    }

    #[test]
    fn manifest_deserializes_from_camel_case() {
        let manifest: DeviceManifest = serde_json::from_str(
            r#"{
                "name": "Gateway manifest",
                "protocol": "JsonProtocol",
                "firmwareUpdateProtocol": "DFU",
                "sensors": [{
                    "reference": "T",
                    "name": "Temperature",
                    "unitSymbol": "℃",
                    "readingTypeName": "TEMPERATURE",
                    "dataType": "NUMERIC",
                    "precision": 1,
                    "minimum": -40.0,
                    "maximum": 85.0
                }]
            }"#,
        )
        .unwrap();

        assert_eq!(manifest.sensors.len(), 1);
        assert_eq!(manifest.sensors[0].data_type, DataType::Numeric);
        assert!(manifest.alarms.is_empty());
    }
}
