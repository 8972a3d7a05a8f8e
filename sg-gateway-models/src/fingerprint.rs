//! Stable manifest fingerprints.
//!
//! Two manifests with equal fingerprints are interchangeable: the device
//! repository links devices to one shared manifest row instead of storing a
//! copy per device. The digest input is therefore part of the persistence
//! contract and must not change between releases.
//!
//! Layout: every feed manifest hashes its fields as UTF-8 in a fixed order,
//! numbers rendered as decimal strings and enums as one-letter tags; the
//! device manifest hashes its own header fields followed by each feed's
//! lowercase-hex digest, in manifest order.

use crate::domain::{
    ActuatorManifest, AlarmManifest, AlarmSeverity, ConfigurationManifest, DataType,
    DeviceManifest, SensorManifest,
};
use sha2::{Digest, Sha256};

fn severity_tag(severity: AlarmSeverity) -> &'static str {
    match severity {
        AlarmSeverity::Alert => "A",
        AlarmSeverity::Critical => "C",
        AlarmSeverity::Error => "E",
    }
}

fn data_type_tag(data_type: DataType) -> &'static str {
    match data_type {
        DataType::Boolean => "B",
        DataType::Numeric => "N",
        DataType::String => "S",
    }
}

/// Canonical decimal rendering of an `f64` field.
///
/// Shortest representation that round-trips, with `.0` kept on integral
/// values, so the digest input is identical on every platform.
fn decimal(value: f64) -> String {
    format!("{value:?}")
}

pub fn alarm_fingerprint(alarm: &AlarmManifest) -> String {
    let mut hasher = Sha256::new();
    hasher.update(&alarm.name);
    hasher.update(&alarm.reference);
    hasher.update(&alarm.message);
    hasher.update(&alarm.description);
    hasher.update(severity_tag(alarm.severity));
    hex::encode(hasher.finalize())
}

pub fn actuator_fingerprint(actuator: &ActuatorManifest) -> String {
    let mut hasher = Sha256::new();
    hasher.update(&actuator.name);
    hasher.update(&actuator.reference);
    hasher.update(&actuator.description);
    hasher.update(&actuator.unit_symbol);
    hasher.update(&actuator.reading_type_name);
    hasher.update(actuator.precision.to_string());
    hasher.update(decimal(actuator.minimum));
    hasher.update(decimal(actuator.maximum));
    hasher.update(&actuator.delimiter);
    hasher.update(data_type_tag(actuator.data_type));
    for label in &actuator.labels {
        hasher.update(label);
    }
    hex::encode(hasher.finalize())
}

pub fn sensor_fingerprint(sensor: &SensorManifest) -> String {
    let mut hasher = Sha256::new();
    hasher.update(&sensor.name);
    hasher.update(&sensor.reference);
    hasher.update(&sensor.description);
    hasher.update(&sensor.unit_symbol);
    hasher.update(&sensor.reading_type_name);
    hasher.update(sensor.precision.to_string());
    hasher.update(decimal(sensor.minimum));
    hasher.update(decimal(sensor.maximum));
    hasher.update(&sensor.delimiter);
    hasher.update(data_type_tag(sensor.data_type));
    for label in &sensor.labels {
        hasher.update(label);
    }
    hex::encode(hasher.finalize())
}

pub fn configuration_fingerprint(configuration: &ConfigurationManifest) -> String {
    let mut hasher = Sha256::new();
    hasher.update(&configuration.name);
    hasher.update(&configuration.reference);
    hasher.update(&configuration.description);
    hasher.update(decimal(configuration.minimum));
    hasher.update(decimal(configuration.maximum));
    hasher.update(&configuration.delimiter);
    hasher.update(&configuration.default_value);
    hasher.update(data_type_tag(configuration.data_type));
    for label in &configuration.labels {
        hasher.update(label);
    }
    hex::encode(hasher.finalize())
}

/// Fingerprint of a full device manifest, lowercase hex.
pub fn manifest_fingerprint(manifest: &DeviceManifest) -> String {
    let mut hasher = Sha256::new();
    hasher.update(&manifest.name);
    hasher.update(&manifest.description);
    hasher.update(&manifest.protocol);
    hasher.update(&manifest.firmware_update_protocol);

    for alarm in &manifest.alarms {
        hasher.update(alarm_fingerprint(alarm));
    }
    for actuator in &manifest.actuators {
        hasher.update(actuator_fingerprint(actuator));
    }
    for sensor in &manifest.sensors {
        hasher.update(sensor_fingerprint(sensor));
    }
    for configuration in &manifest.configurations {
        hasher.update(configuration_fingerprint(configuration));
    }

    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manifest() -> DeviceManifest {
        let mut manifest = DeviceManifest::new(
            "Manifest name",
            "Manifest description",
            "JsonProtocol",
            "DFUProtocol",
        );
        manifest.alarms.push(AlarmManifest {
            reference: "HIGH_TEMP".to_string(),
            name: "High temperature".to_string(),
            severity: AlarmSeverity::Critical,
            message: "Overheating".to_string(),
            description: String::new(),
        });
        manifest.sensors.push(SensorManifest {
            reference: "T".to_string(),
            name: "Temperature".to_string(),
            description: String::new(),
            unit_symbol: "℃".to_string(),
            reading_type_name: "TEMPERATURE".to_string(),
            data_type: DataType::Numeric,
            precision: 1,
            minimum: -40.0,
            maximum: 85.0,
            delimiter: String::new(),
            labels: vec!["a".to_string(), "b".to_string()],
        });
        manifest
    }

    #[test]
    fn equal_manifests_have_equal_fingerprints() {
        assert_eq!(manifest_fingerprint(&manifest()), manifest_fingerprint(&manifest()));
    }

    #[test]
    fn fingerprint_is_lowercase_hex() {
        let fingerprint = manifest_fingerprint(&manifest());
        assert_eq!(fingerprint.len(), 64);
        assert!(fingerprint
            .chars()
            .all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn any_field_change_changes_the_fingerprint() {
        let base = manifest_fingerprint(&manifest());

        let mut changed = manifest();
        changed.sensors[0].maximum = 90.0;
        assert_ne!(base, manifest_fingerprint(&changed));

        let mut changed = manifest();
        changed.alarms[0].severity = AlarmSeverity::Alert;
        assert_ne!(base, manifest_fingerprint(&changed));

        let mut changed = manifest();
        changed.protocol = "OtherProtocol".to_string();
        assert_ne!(base, manifest_fingerprint(&changed));
    }

    #[test]
    fn label_order_is_significant() {
        let base = manifest_fingerprint(&manifest());

        let mut reordered = manifest();
        reordered.sensors[0].labels.reverse();
        assert_ne!(base, manifest_fingerprint(&reordered));
    }

    #[test]
    fn decimal_rendering_is_stable() {
        assert_eq!(decimal(0.0), "0.0");
        assert_eq!(decimal(-40.0), "-40.0");
        assert_eq!(decimal(0.1), "0.1");
    }
}
