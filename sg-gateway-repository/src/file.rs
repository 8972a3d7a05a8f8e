//! Stored-file catalog: one row per fully downloaded file.

use crate::entities::file;
use sea_orm::{
    ActiveModelTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryOrder, Set,
};
use sg_gateway_error::StorageResult;
use sg_gateway_models::domain::FileInfo;

#[derive(Clone)]
pub struct FileRepository {
    db: DatabaseConnection,
}

impl FileRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Insert or replace the record for a file name.
    pub async fn store(&self, info: &FileInfo) -> StorageResult<()> {
        let model = file::ActiveModel {
            name: Set(info.name.clone()),
            hash: Set(info.hash.clone()),
            path: Set(info.path.clone()),
        };

        if self.contains(&info.name).await? {
            model.update(&self.db).await?;
        } else {
            model.insert(&self.db).await?;
        }
        Ok(())
    }

    pub async fn get_file_info(&self, name: &str) -> StorageResult<Option<FileInfo>> {
        Ok(file::Entity::find_by_id(name)
            .one(&self.db)
            .await?
            .map(|row| FileInfo {
                name: row.name,
                hash: row.hash,
                path: row.path,
            }))
    }

    pub async fn get_all_file_names(&self) -> StorageResult<Vec<String>> {
        Ok(file::Entity::find()
            .order_by_asc(file::Column::Name)
            .all(&self.db)
            .await?
            .into_iter()
            .map(|row| row.name)
            .collect())
    }

    pub async fn remove(&self, name: &str) -> StorageResult<()> {
        file::Entity::delete_by_id(name).exec(&self.db).await?;
        Ok(())
    }

    pub async fn contains(&self, name: &str) -> StorageResult<bool> {
        let count = file::Entity::find_by_id(name).count(&self.db).await?;
        Ok(count > 0)
    }
}
