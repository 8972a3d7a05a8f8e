use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "configuration_label")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub label: String,
    pub configuration_manifest_id: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::configuration_manifest::Entity",
        from = "Column::ConfigurationManifestId",
        to = "super::configuration_manifest::Column::Id",
        on_delete = "Cascade"
    )]
    ConfigurationManifest,
}

impl Related<super::configuration_manifest::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ConfigurationManifest.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
