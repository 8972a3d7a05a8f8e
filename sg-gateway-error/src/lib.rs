pub mod storage;

use anyhow::Error as AnyhowError;
use config::ConfigError;
use rumqttc::ClientError;
use serde_json::Error as SerdeJsonError;
use std::{error::Error as StdError, io::Error as IoError};
use storage::StorageError;
use thiserror::Error;
use tokio::task::JoinError;

pub type SGResult<T, E = SGError> = anyhow::Result<T, E>;
pub type StorageResult<T, E = StorageError> = Result<T, E>;

#[derive(Error, Debug, Default)]
pub enum SGError {
    #[error("service unavailable")]
    #[default]
    ServiceUnavailable,
    #[error("{0}")]
    Msg(String),
    #[error("{0}")]
    IoError(#[from] IoError),
    #[error("{0}")]
    Json(#[from] SerdeJsonError),
    #[error("{0}")]
    ConfigError(#[from] ConfigError),
    #[error("{0}")]
    StorageError(#[from] StorageError),
    #[error("{0}")]
    MqttClientError(#[from] ClientError),
    #[error("{0}")]
    JoinError(#[from] JoinError),
    #[error("{0}")]
    Anyhow(#[from] AnyhowError),
    #[error("{0}")]
    StdError(#[from] Box<dyn StdError + Send + Sync>),
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    #[error("Invalid state error: {0}")]
    InvalidStateError(String),
    #[error("Shutdown error: {0}")]
    ShutdownError(String),
}

impl From<String> for SGError {
    #[inline]
    fn from(e: String) -> Self {
        SGError::Msg(e)
    }
}

impl From<&str> for SGError {
    #[inline]
    fn from(e: &str) -> Self {
        SGError::Msg(e.to_string())
    }
}

impl From<sea_orm::DbErr> for SGError {
    #[inline]
    fn from(e: sea_orm::DbErr) -> Self {
        SGError::StorageError(StorageError::DbError(e))
    }
}
