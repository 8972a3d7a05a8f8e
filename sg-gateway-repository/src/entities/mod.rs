//! `SeaORM` entities for the persisted catalog.
//!
//! A device row references one manifest row; manifest rows are shared between
//! devices whose manifests fingerprint identically. Child manifest and label
//! rows cascade when their manifest is deleted.

pub mod actuator_label;
pub mod actuator_manifest;
pub mod alarm_manifest;
pub mod configuration_label;
pub mod configuration_manifest;
pub mod device;
pub mod device_manifest;
pub mod file;
pub mod sensor_label;
pub mod sensor_manifest;
