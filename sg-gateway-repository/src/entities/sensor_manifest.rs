use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "sensor_manifest")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub reference: String,
    pub name: String,
    pub description: String,
    pub unit_symbol: String,
    pub reading_type: String,
    pub data_type: String,
    pub precision: u32,
    pub minimum: f64,
    pub maximum: f64,
    pub delimiter: String,
    pub device_manifest_id: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::device_manifest::Entity",
        from = "Column::DeviceManifestId",
        to = "super::device_manifest::Column::Id",
        on_delete = "Cascade"
    )]
    DeviceManifest,
    #[sea_orm(has_many = "super::sensor_label::Entity")]
    SensorLabel,
}

impl Related<super::device_manifest::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DeviceManifest.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
