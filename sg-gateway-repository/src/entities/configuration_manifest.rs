use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "configuration_manifest")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub reference: String,
    pub name: String,
    pub description: String,
    pub data_type: String,
    pub minimum: f64,
    pub maximum: f64,
    pub delimiter: String,
    pub default_value: String,
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
    #[sea_orm(has_many = "super::configuration_label::Entity")]
    ConfigurationLabel,
}

impl Related<super::device_manifest::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DeviceManifest.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
