use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "sensor_label")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub label: String,
    pub sensor_manifest_id: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::sensor_manifest::Entity",
        from = "Column::SensorManifestId",
        to = "super::sensor_manifest::Column::Id",
        on_delete = "Cascade"
    )]
    SensorManifest,
}

impl Related<super::sensor_manifest::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SensorManifest.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
