//! Schema migration for the device and file catalog.

use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(CreateCatalogTables)]
    }
}

#[derive(DeriveMigrationName)]
pub struct CreateCatalogTables;

#[async_trait::async_trait]
impl MigrationTrait for CreateCatalogTables {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(DeviceManifest::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DeviceManifest::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(DeviceManifest::Name).text().not_null())
                    .col(ColumnDef::new(DeviceManifest::Description).text().not_null())
                    .col(ColumnDef::new(DeviceManifest::Protocol).text().not_null())
                    .col(
                        ColumnDef::new(DeviceManifest::FirmwareUpdateProtocol)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(DeviceManifest::Sha256)
                            .text()
                            .not_null()
                            .unique_key(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Device::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Device::Key)
                            .text()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Device::Name).text().not_null())
                    .col(ColumnDef::new(Device::DeviceManifestId).integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .from(Device::Table, Device::DeviceManifestId)
                            .to(DeviceManifest::Table, DeviceManifest::Id),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(AlarmManifest::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AlarmManifest::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(AlarmManifest::Reference).text().not_null())
                    .col(ColumnDef::new(AlarmManifest::Name).text().not_null())
                    .col(ColumnDef::new(AlarmManifest::Severity).text().not_null())
                    .col(ColumnDef::new(AlarmManifest::Message).text().not_null())
                    .col(ColumnDef::new(AlarmManifest::Description).text().not_null())
                    .col(
                        ColumnDef::new(AlarmManifest::DeviceManifestId)
                            .integer()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(AlarmManifest::Table, AlarmManifest::DeviceManifestId)
                            .to(DeviceManifest::Table, DeviceManifest::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        for table in [FeedTable::Actuator, FeedTable::Sensor] {
            manager
                .create_table(
                    Table::create()
                        .table(table.manifest_table())
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Feed::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Feed::Reference).text().not_null())
                        .col(ColumnDef::new(Feed::Name).text().not_null())
                        .col(ColumnDef::new(Feed::Description).text().not_null())
                        .col(ColumnDef::new(Feed::UnitSymbol).text().not_null())
                        .col(ColumnDef::new(Feed::ReadingType).text().not_null())
                        .col(ColumnDef::new(Feed::DataType).text().not_null())
                        .col(ColumnDef::new(Feed::Precision).unsigned().not_null())
                        .col(ColumnDef::new(Feed::Minimum).double().not_null())
                        .col(ColumnDef::new(Feed::Maximum).double().not_null())
                        .col(ColumnDef::new(Feed::Delimiter).text().not_null())
                        .col(ColumnDef::new(Feed::DeviceManifestId).integer().not_null())
                        .foreign_key(
                            ForeignKey::create()
                                .from(table.manifest_table(), Feed::DeviceManifestId)
                                .to(DeviceManifest::Table, DeviceManifest::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    Table::create()
                        .table(table.label_table())
                        .if_not_exists()
                        .col(
                            ColumnDef::new(Label::Id)
                                .integer()
                                .not_null()
                                .auto_increment()
                                .primary_key(),
                        )
                        .col(ColumnDef::new(Label::Label).text().not_null())
                        .col(
                            ColumnDef::new(table.label_parent_column())
                                .integer()
                                .not_null(),
                        )
                        .foreign_key(
                            ForeignKey::create()
                                .from(table.label_table(), table.label_parent_column())
                                .to(table.manifest_table(), Feed::Id)
                                .on_delete(ForeignKeyAction::Cascade),
                        )
                        .to_owned(),
                )
                .await?;
        }

        manager
            .create_table(
                Table::create()
                    .table(ConfigurationManifest::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ConfigurationManifest::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ConfigurationManifest::Reference)
                            .text()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ConfigurationManifest::Name).text().not_null())
                    .col(
                        ColumnDef::new(ConfigurationManifest::Description)
                            .text()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ConfigurationManifest::DataType).text().not_null())
                    .col(
                        ColumnDef::new(ConfigurationManifest::Minimum)
                            .double()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ConfigurationManifest::Maximum)
                            .double()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ConfigurationManifest::Delimiter)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ConfigurationManifest::DefaultValue)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ConfigurationManifest::DeviceManifestId)
                            .integer()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(
                                ConfigurationManifest::Table,
                                ConfigurationManifest::DeviceManifestId,
                            )
                            .to(DeviceManifest::Table, DeviceManifest::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(ConfigurationLabel::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ConfigurationLabel::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(ConfigurationLabel::Label).text().not_null())
                    .col(
                        ColumnDef::new(ConfigurationLabel::ConfigurationManifestId)
                            .integer()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .from(
                                ConfigurationLabel::Table,
                                ConfigurationLabel::ConfigurationManifestId,
                            )
                            .to(ConfigurationManifest::Table, ConfigurationManifest::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(FileTable::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(FileTable::Name)
                            .text()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(FileTable::Hash).text().not_null())
                    .col(ColumnDef::new(FileTable::Path).text().not_null())
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for table in [
            TableRef::Table(FileTable::Table.into_iden()),
            TableRef::Table(ConfigurationLabel::Table.into_iden()),
            TableRef::Table(ConfigurationManifest::Table.into_iden()),
            FeedTable::Sensor.label_table(),
            FeedTable::Sensor.manifest_table(),
            FeedTable::Actuator.label_table(),
            FeedTable::Actuator.manifest_table(),
            TableRef::Table(AlarmManifest::Table.into_iden()),
            TableRef::Table(Device::Table.into_iden()),
            TableRef::Table(DeviceManifest::Table.into_iden()),
        ] {
            manager
                .drop_table(Table::drop().table(table).if_exists().to_owned())
                .await?;
        }
        Ok(())
    }
}

/// Actuator and sensor tables share a column set; this picks the table names.
#[derive(Clone, Copy)]
enum FeedTable {
    Actuator,
    Sensor,
}

impl FeedTable {
    fn manifest_table(self) -> TableRef {
        match self {
            FeedTable::Actuator => TableRef::Table(ActuatorManifest::Table.into_iden()),
            FeedTable::Sensor => TableRef::Table(SensorManifest::Table.into_iden()),
        }
    }

    fn label_table(self) -> TableRef {
        match self {
            FeedTable::Actuator => TableRef::Table(ActuatorLabel::Table.into_iden()),
            FeedTable::Sensor => TableRef::Table(SensorLabel::Table.into_iden()),
        }
    }

    fn label_parent_column(self) -> Label {
        match self {
            FeedTable::Actuator => Label::ActuatorManifestId,
            FeedTable::Sensor => Label::SensorManifestId,
        }
    }
}

#[derive(DeriveIden)]
enum DeviceManifest {
    Table,
    Id,
    Name,
    Description,
    Protocol,
    FirmwareUpdateProtocol,
    Sha256,
}

#[derive(DeriveIden)]
enum Device {
    Table,
    Key,
    Name,
    DeviceManifestId,
}

#[derive(DeriveIden)]
enum AlarmManifest {
    Table,
    Id,
    Reference,
    Name,
    Severity,
    Message,
    Description,
    DeviceManifestId,
}

#[derive(DeriveIden)]
enum ActuatorManifest {
    Table,
}

#[derive(DeriveIden)]
enum SensorManifest {
    Table,
}

#[derive(DeriveIden)]
enum ActuatorLabel {
    Table,
}

#[derive(DeriveIden)]
enum SensorLabel {
    Table,
}

/// Shared column set for actuator_manifest / sensor_manifest.
#[derive(DeriveIden)]
enum Feed {
    Id,
    Reference,
    Name,
    Description,
    UnitSymbol,
    ReadingType,
    DataType,
    Precision,
    Minimum,
    Maximum,
    Delimiter,
    DeviceManifestId,
}

/// Shared column set for the label tables.
#[derive(DeriveIden)]
enum Label {
    Id,
    Label,
    ActuatorManifestId,
    SensorManifestId,
}

#[derive(DeriveIden)]
enum ConfigurationManifest {
    Table,
    Id,
    Reference,
    Name,
    Description,
    DataType,
    Minimum,
    Maximum,
    Delimiter,
    DefaultValue,
    DeviceManifestId,
}

#[derive(DeriveIden)]
enum ConfigurationLabel {
    Table,
    Id,
    Label,
    ConfigurationManifestId,
}

#[derive(DeriveIden)]
enum FileTable {
    #[sea_orm(iden = "file")]
    Table,
    Name,
    Hash,
    Path,
}
