use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "alarm_manifest")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub reference: String,
    pub name: String,
    pub severity: String,
    pub message: String,
    pub description: String,
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
}

impl Related<super::device_manifest::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DeviceManifest.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
