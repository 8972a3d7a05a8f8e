use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "actuator_label")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub label: String,
    pub actuator_manifest_id: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::actuator_manifest::Entity",
        from = "Column::ActuatorManifestId",
        to = "super::actuator_manifest::Column::Id",
        on_delete = "Cascade"
    )]
    ActuatorManifest,
}

impl Related<super::actuator_manifest::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ActuatorManifest.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
