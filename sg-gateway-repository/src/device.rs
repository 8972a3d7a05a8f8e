//! Device catalog with content-addressed manifest sharing.
//!
//! `save` links a device to an existing manifest row whenever the manifest
//! fingerprints match, so any number of identical devices costs one manifest.
//! `remove` deletes the manifest once its last device is gone; the child
//! manifest and label rows go with it through FK cascade.

use crate::entities::{
    actuator_label, actuator_manifest, alarm_manifest, configuration_label,
    configuration_manifest, device, device_manifest, sensor_label, sensor_manifest,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use sg_gateway_error::{storage::StorageError, StorageResult};
use sg_gateway_models::{domain, fingerprint::manifest_fingerprint};
use tracing::warn;

fn severity_to_str(severity: domain::AlarmSeverity) -> &'static str {
    match severity {
        domain::AlarmSeverity::Alert => "ALERT",
        domain::AlarmSeverity::Critical => "CRITICAL",
        domain::AlarmSeverity::Error => "ERROR",
    }
}

fn severity_from_str(value: &str) -> Result<domain::AlarmSeverity, StorageError> {
    match value {
        "ALERT" => Ok(domain::AlarmSeverity::Alert),
        "CRITICAL" => Ok(domain::AlarmSeverity::Critical),
        "ERROR" => Ok(domain::AlarmSeverity::Error),
        other => Err(StorageError::Corrupted(format!(
            "unknown alarm severity `{other}`"
        ))),
    }
}

fn data_type_to_str(data_type: domain::DataType) -> &'static str {
    match data_type {
        domain::DataType::Boolean => "BOOLEAN",
        domain::DataType::Numeric => "NUMERIC",
        domain::DataType::String => "STRING",
    }
}

fn data_type_from_str(value: &str) -> Result<domain::DataType, StorageError> {
    match value {
        "BOOLEAN" => Ok(domain::DataType::Boolean),
        "NUMERIC" => Ok(domain::DataType::Numeric),
        "STRING" => Ok(domain::DataType::String),
        other => Err(StorageError::Corrupted(format!(
            "unknown data type `{other}`"
        ))),
    }
}

#[derive(Clone)]
pub struct DeviceRepository {
    db: DatabaseConnection,
}

impl DeviceRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Persist a device. Saving an existing key replaces the stored device
    /// (remove-then-save); saving a manifest that fingerprints equal to a
    /// stored one links to it instead of inserting a duplicate.
    pub async fn save(&self, device: &domain::Device) -> StorageResult<()> {
        if self.contains_device_with_key(&device.key).await? {
            self.remove(&device.key).await?;
        }

        let sha256 = manifest_fingerprint(&device.manifest);

        if let Some(existing) = device_manifest::Entity::find()
            .filter(device_manifest::Column::Sha256.eq(&sha256))
            .one(&self.db)
            .await?
        {
            device::ActiveModel {
                key: Set(device.key.clone()),
                name: Set(device.name.clone()),
                device_manifest_id: Set(existing.id),
            }
            .insert(&self.db)
            .await?;
            return Ok(());
        }

        let txn = self.db.begin().await?;
        let manifest_id = insert_manifest(&txn, &device.manifest, &sha256).await?;
        device::ActiveModel {
            key: Set(device.key.clone()),
            name: Set(device.name.clone()),
            device_manifest_id: Set(manifest_id),
        }
        .insert(&txn)
        .await?;
        txn.commit().await?;

        Ok(())
    }

    /// Remove a device; a key that is not stored is a no-op. The manifest row
    /// is deleted only when this device was its last reference.
    pub async fn remove(&self, device_key: &str) -> StorageResult<()> {
        let Some(row) = device::Entity::find_by_id(device_key).one(&self.db).await? else {
            return Ok(());
        };

        let references = device::Entity::find()
            .filter(device::Column::DeviceManifestId.eq(row.device_manifest_id))
            .count(&self.db)
            .await?;

        if references > 1 {
            device::Entity::delete_by_id(device_key)
                .exec(&self.db)
                .await?;
            return Ok(());
        }

        let txn = self.db.begin().await?;
        device::Entity::delete_by_id(device_key).exec(&txn).await?;
        device_manifest::Entity::delete_by_id(row.device_manifest_id)
            .exec(&txn)
            .await?;
        txn.commit().await?;

        Ok(())
    }

    pub async fn remove_all(&self) -> StorageResult<()> {
        for key in self.find_all_device_keys().await? {
            self.remove(&key).await?;
        }
        Ok(())
    }

    /// Reconstruct the full device, manifest and children included. Absent
    /// keys and rows that no longer decode both come back as `None`.
    pub async fn find_by_device_key(
        &self,
        device_key: &str,
    ) -> StorageResult<Option<domain::Device>> {
        let Some(row) = device::Entity::find_by_id(device_key).one(&self.db).await? else {
            return Ok(None);
        };

        match self.load_manifest(row.device_manifest_id).await {
            Ok(manifest) => Ok(Some(domain::Device {
                key: row.key,
                name: row.name,
                manifest,
            })),
            Err(StorageError::Corrupted(reason)) => {
                warn!(device_key, reason, "Stored manifest could not be decoded");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    pub async fn find_all_device_keys(&self) -> StorageResult<Vec<String>> {
        Ok(device::Entity::find()
            .order_by_asc(device::Column::Key)
            .all(&self.db)
            .await?
            .into_iter()
            .map(|row| row.key)
            .collect())
    }

    pub async fn contains_device_with_key(&self, device_key: &str) -> StorageResult<bool> {
        let count = device::Entity::find_by_id(device_key)
            .count(&self.db)
            .await?;
        Ok(count > 0)
    }

    async fn load_manifest(&self, manifest_id: i32) -> StorageResult<domain::DeviceManifest> {
        let row = device_manifest::Entity::find_by_id(manifest_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| {
                StorageError::Corrupted(format!("manifest row {manifest_id} is missing"))
            })?;

        let mut manifest = domain::DeviceManifest::new(
            row.name,
            row.description,
            row.protocol,
            row.firmware_update_protocol,
        );

        for alarm in alarm_manifest::Entity::find()
            .filter(alarm_manifest::Column::DeviceManifestId.eq(manifest_id))
            .order_by_asc(alarm_manifest::Column::Id)
            .all(&self.db)
            .await?
        {
            manifest.alarms.push(domain::AlarmManifest {
                reference: alarm.reference,
                name: alarm.name,
                severity: severity_from_str(&alarm.severity)?,
                message: alarm.message,
                description: alarm.description,
            });
        }

        for actuator in actuator_manifest::Entity::find()
            .filter(actuator_manifest::Column::DeviceManifestId.eq(manifest_id))
            .order_by_asc(actuator_manifest::Column::Id)
            .all(&self.db)
            .await?
        {
            let labels = actuator_label::Entity::find()
                .filter(actuator_label::Column::ActuatorManifestId.eq(actuator.id))
                .order_by_asc(actuator_label::Column::Id)
                .all(&self.db)
                .await?
                .into_iter()
                .map(|l| l.label)
                .collect();

            manifest.actuators.push(domain::ActuatorManifest {
                reference: actuator.reference,
                name: actuator.name,
                description: actuator.description,
                unit_symbol: actuator.unit_symbol,
                reading_type_name: actuator.reading_type,
                data_type: data_type_from_str(&actuator.data_type)?,
                precision: actuator.precision,
                minimum: actuator.minimum,
                maximum: actuator.maximum,
                delimiter: actuator.delimiter,
                labels,
            });
        }

        for sensor in sensor_manifest::Entity::find()
            .filter(sensor_manifest::Column::DeviceManifestId.eq(manifest_id))
            .order_by_asc(sensor_manifest::Column::Id)
            .all(&self.db)
            .await?
        {
            let labels = sensor_label::Entity::find()
                .filter(sensor_label::Column::SensorManifestId.eq(sensor.id))
                .order_by_asc(sensor_label::Column::Id)
                .all(&self.db)
                .await?
                .into_iter()
                .map(|l| l.label)
                .collect();

            manifest.sensors.push(domain::SensorManifest {
                reference: sensor.reference,
                name: sensor.name,
                description: sensor.description,
                unit_symbol: sensor.unit_symbol,
                reading_type_name: sensor.reading_type,
                data_type: data_type_from_str(&sensor.data_type)?,
                precision: sensor.precision,
                minimum: sensor.minimum,
                maximum: sensor.maximum,
                delimiter: sensor.delimiter,
                labels,
            });
        }

        for configuration in configuration_manifest::Entity::find()
            .filter(configuration_manifest::Column::DeviceManifestId.eq(manifest_id))
            .order_by_asc(configuration_manifest::Column::Id)
            .all(&self.db)
            .await?
        {
            let labels = configuration_label::Entity::find()
                .filter(
                    configuration_label::Column::ConfigurationManifestId.eq(configuration.id),
                )
                .order_by_asc(configuration_label::Column::Id)
                .all(&self.db)
                .await?
                .into_iter()
                .map(|l| l.label)
                .collect();

            manifest.configurations.push(domain::ConfigurationManifest {
                reference: configuration.reference,
                name: configuration.name,
                description: configuration.description,
                data_type: data_type_from_str(&configuration.data_type)?,
                minimum: configuration.minimum,
                maximum: configuration.maximum,
                delimiter: configuration.delimiter,
                default_value: configuration.default_value,
                labels,
            });
        }

        Ok(manifest)
    }
}

async fn insert_manifest(
    txn: &DatabaseTransaction,
    manifest: &domain::DeviceManifest,
    sha256: &str,
) -> StorageResult<i32> {
    let manifest_row = device_manifest::ActiveModel {
        name: Set(manifest.name.clone()),
        description: Set(manifest.description.clone()),
        protocol: Set(manifest.protocol.clone()),
        firmware_update_protocol: Set(manifest.firmware_update_protocol.clone()),
        sha256: Set(sha256.to_string()),
        ..Default::default()
    }
    .insert(txn)
    .await?;

    for alarm in &manifest.alarms {
        alarm_manifest::ActiveModel {
            reference: Set(alarm.reference.clone()),
            name: Set(alarm.name.clone()),
            severity: Set(severity_to_str(alarm.severity).to_string()),
            message: Set(alarm.message.clone()),
            description: Set(alarm.description.clone()),
            device_manifest_id: Set(manifest_row.id),
            ..Default::default()
        }
        .insert(txn)
        .await?;
    }

    for actuator in &manifest.actuators {
        let actuator_row = actuator_manifest::ActiveModel {
            reference: Set(actuator.reference.clone()),
            name: Set(actuator.name.clone()),
            description: Set(actuator.description.clone()),
            unit_symbol: Set(actuator.unit_symbol.clone()),
            reading_type: Set(actuator.reading_type_name.clone()),
            data_type: Set(data_type_to_str(actuator.data_type).to_string()),
            precision: Set(actuator.precision),
            minimum: Set(actuator.minimum),
            maximum: Set(actuator.maximum),
            delimiter: Set(actuator.delimiter.clone()),
            device_manifest_id: Set(manifest_row.id),
            ..Default::default()
        }
        .insert(txn)
        .await?;

        for label in &actuator.labels {
            actuator_label::ActiveModel {
                label: Set(label.clone()),
                actuator_manifest_id: Set(actuator_row.id),
                ..Default::default()
            }
            .insert(txn)
            .await?;
        }
    }

    for sensor in &manifest.sensors {
        let sensor_row = sensor_manifest::ActiveModel {
            reference: Set(sensor.reference.clone()),
            name: Set(sensor.name.clone()),
            description: Set(sensor.description.clone()),
            unit_symbol: Set(sensor.unit_symbol.clone()),
            reading_type: Set(sensor.reading_type_name.clone()),
            data_type: Set(data_type_to_str(sensor.data_type).to_string()),
            precision: Set(sensor.precision),
            minimum: Set(sensor.minimum),
            maximum: Set(sensor.maximum),
            delimiter: Set(sensor.delimiter.clone()),
            device_manifest_id: Set(manifest_row.id),
            ..Default::default()
        }
        .insert(txn)
        .await?;

        for label in &sensor.labels {
            sensor_label::ActiveModel {
                label: Set(label.clone()),
                sensor_manifest_id: Set(sensor_row.id),
                ..Default::default()
            }
            .insert(txn)
            .await?;
        }
    }

    for configuration in &manifest.configurations {
        let configuration_row = configuration_manifest::ActiveModel {
            reference: Set(configuration.reference.clone()),
            name: Set(configuration.name.clone()),
            description: Set(configuration.description.clone()),
            data_type: Set(data_type_to_str(configuration.data_type).to_string()),
            minimum: Set(configuration.minimum),
            maximum: Set(configuration.maximum),
            delimiter: Set(configuration.delimiter.clone()),
            default_value: Set(configuration.default_value.clone()),
            device_manifest_id: Set(manifest_row.id),
            ..Default::default()
        }
        .insert(txn)
        .await?;

        for label in &configuration.labels {
            configuration_label::ActiveModel {
                label: Set(label.clone()),
                configuration_manifest_id: Set(configuration_row.id),
                ..Default::default()
            }
            .insert(txn)
            .await?;
        }
    }

    Ok(manifest_row.id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sqlite;

    async fn repository() -> DeviceRepository {
        let db = sqlite::init_db(sqlite::memory_url()).await.unwrap();
        DeviceRepository::new(db)
    }

    fn manifest() -> domain::DeviceManifest {
        let mut manifest =
            domain::DeviceManifest::new("Manifest name", "desc", "JsonProtocol", "DFUProtocol");
        manifest.alarms.push(domain::AlarmManifest {
            reference: "ALARM".to_string(),
            name: "Alarm".to_string(),
            severity: domain::AlarmSeverity::Critical,
            message: "boom".to_string(),
            description: String::new(),
        });
        manifest.sensors.push(domain::SensorManifest {
            reference: "T".to_string(),
            name: "Temperature".to_string(),
            description: String::new(),
            unit_symbol: "℃".to_string(),
            reading_type_name: "TEMPERATURE".to_string(),
            data_type: domain::DataType::Numeric,
            precision: 1,
            minimum: -40.0,
            maximum: 85.0,
            delimiter: String::new(),
            labels: vec!["first".to_string(), "second".to_string()],
        });
        manifest.configurations.push(domain::ConfigurationManifest {
            reference: "CFG".to_string(),
            name: "Interval".to_string(),
            description: String::new(),
            data_type: domain::DataType::Numeric,
            minimum: 0.0,
            maximum: 60.0,
            delimiter: ",".to_string(),
            default_value: "5".to_string(),
            labels: Vec::new(),
        });
        manifest
    }

    async fn manifest_rows(repo: &DeviceRepository) -> u64 {
        device_manifest::Entity::find().count(&repo.db).await.unwrap()
    }

    #[tokio::test]
    async fn save_and_find_round_trip() {
        let repo = repository().await;
        let device = domain::Device::new("Device", "device_key", manifest());

        repo.save(&device).await.unwrap();

        let found = repo.find_by_device_key("device_key").await.unwrap().unwrap();
        assert_eq!(found, device);
        assert_eq!(
            manifest_fingerprint(&found.manifest),
            manifest_fingerprint(&device.manifest)
        );
    }

    #[tokio::test]
    async fn equivalent_manifests_share_one_row() {
        let repo = repository().await;

        repo.save(&domain::Device::new("A", "key_a", manifest()))
            .await
            .unwrap();
        repo.save(&domain::Device::new("B", "key_b", manifest()))
            .await
            .unwrap();

        assert_eq!(manifest_rows(&repo).await, 1);
        assert!(repo.contains_device_with_key("key_a").await.unwrap());
        assert!(repo.contains_device_with_key("key_b").await.unwrap());
    }

    #[tokio::test]
    async fn removing_the_last_reference_deletes_the_manifest() {
        let repo = repository().await;
        repo.save(&domain::Device::new("A", "key_a", manifest()))
            .await
            .unwrap();

        repo.remove("key_a").await.unwrap();

        assert!(!repo.contains_device_with_key("key_a").await.unwrap());
        assert_eq!(manifest_rows(&repo).await, 0);
        // FK cascade cleared the children too.
        assert_eq!(
            sensor_manifest::Entity::find().count(&repo.db).await.unwrap(),
            0
        );
        assert_eq!(
            sensor_label::Entity::find().count(&repo.db).await.unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn removing_a_shared_manifest_keeps_it_for_the_other_device() {
        let repo = repository().await;
        repo.save(&domain::Device::new("A", "key_a", manifest()))
            .await
            .unwrap();
        repo.save(&domain::Device::new("B", "key_b", manifest()))
            .await
            .unwrap();

        repo.remove("key_a").await.unwrap();

        assert_eq!(manifest_rows(&repo).await, 1);
        assert!(repo.find_by_device_key("key_b").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn saving_an_existing_key_replaces_the_device() {
        let repo = repository().await;
        repo.save(&domain::Device::new("A", "key_a", manifest()))
            .await
            .unwrap();

        let mut changed = manifest();
        changed.sensors[0].maximum = 125.0;
        repo.save(&domain::Device::new("A2", "key_a", changed.clone()))
            .await
            .unwrap();

        let found = repo.find_by_device_key("key_a").await.unwrap().unwrap();
        assert_eq!(found.name, "A2");
        assert_eq!(found.manifest.sensors[0].maximum, 125.0);
        // The previous manifest had no other reference, so it is gone.
        assert_eq!(manifest_rows(&repo).await, 1);
    }

    #[tokio::test]
    async fn label_order_survives_the_round_trip() {
        let repo = repository().await;
        repo.save(&domain::Device::new("A", "key_a", manifest()))
            .await
            .unwrap();

        let found = repo.find_by_device_key("key_a").await.unwrap().unwrap();
        assert_eq!(found.manifest.sensors[0].labels, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn remove_all_clears_every_key() {
        let repo = repository().await;
        repo.save(&domain::Device::new("A", "key_a", manifest()))
            .await
            .unwrap();
        repo.save(&domain::Device::new("B", "key_b", manifest()))
            .await
            .unwrap();

        repo.remove_all().await.unwrap();

        assert!(repo.find_all_device_keys().await.unwrap().is_empty());
        assert_eq!(manifest_rows(&repo).await, 0);
    }

    #[tokio::test]
    async fn missing_key_reads_as_absent() {
        let repo = repository().await;
        assert!(repo.find_by_device_key("nope").await.unwrap().is_none());
        assert!(!repo.contains_device_with_key("nope").await.unwrap());
        // Removing an unknown key is a no-op.
        repo.remove("nope").await.unwrap();
    }
}
