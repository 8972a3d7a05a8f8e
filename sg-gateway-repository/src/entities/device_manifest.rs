use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "device_manifest")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub name: String,
    pub description: String,
    pub protocol: String,
    pub firmware_update_protocol: String,
    /// Manifest fingerprint, lowercase hex. Unique per distinct manifest.
    #[sea_orm(unique)]
    pub sha256: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::device::Entity")]
    Device,
    #[sea_orm(has_many = "super::alarm_manifest::Entity")]
    AlarmManifest,
    #[sea_orm(has_many = "super::actuator_manifest::Entity")]
    ActuatorManifest,
    #[sea_orm(has_many = "super::sensor_manifest::Entity")]
    SensorManifest,
    #[sea_orm(has_many = "super::configuration_manifest::Entity")]
    ConfigurationManifest,
}

impl Related<super::device::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Device.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
