mod file;
mod memory;
mod redis;

pub use self::file::FileStorage;
pub use self::memory::MemoryStorage;
pub use self::redis::RedisStorage;

use async_trait::async_trait;
use log::{ info, warn };
use std::sync::Arc;
use thiserror::Error;

use crate::cli::Args;
use crate::models::product::ProductId;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Storage JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Redis storage error: {0}")]
    Redis(#[from] ::redis::RedisError),
    #[error("Unsupported storage type: {0}")]
    UnsupportedType(String),
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Durable string key-value storage, the server-side counterpart of a
/// browser's local storage.
#[async_trait]
pub trait KeyValueStorage: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

pub fn create_storage(args: &Args) -> Result<Arc<dyn KeyValueStorage>, StorageError> {
    match args.storage_type.to_lowercase().as_str() {
        "file" => {
            info!("Selection will be persisted to file: {}", args.storage_path);
            Ok(Arc::new(FileStorage::new(&args.storage_path)))
        }
        "redis" => {
            info!("Selection will be persisted to redis at {}", args.storage_host);
            Ok(Arc::new(RedisStorage::new(&args.storage_host, &args.storage_redis_prefix)?))
        }
        "memory" => {
            warn!("Selection storage is in-memory; it will not survive a restart");
            Ok(Arc::new(MemoryStorage::default()))
        }
        other => Err(StorageError::UnsupportedType(other.to_string())),
    }
}

/// Decodes a persisted selection record. Anything other than a JSON array of
/// integers is treated as an empty record.
pub fn decode_selection_record(raw: Option<&str>) -> Vec<ProductId> {
    let Some(raw) = raw else {
        return Vec::new();
    };
    match serde_json::from_str::<Vec<ProductId>>(raw) {
        Ok(ids) => ids,
        Err(e) => {
            warn!("Ignoring malformed selection record {:?}: {}", raw, e);
            Vec::new()
        }
    }
}

pub fn encode_selection_record(ids: &[ProductId]) -> String {
    // A slice of integers always serializes.
    serde_json::to_string(ids).unwrap_or_else(|_| "[]".to_string())
}
