use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "device")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub key: String,
    pub name: String,
    pub device_manifest_id: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::device_manifest::Entity",
        from = "Column::DeviceManifestId",
        to = "super::device_manifest::Column::Id"
    )]
    DeviceManifest,
}

impl Related<super::device_manifest::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DeviceManifest.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
