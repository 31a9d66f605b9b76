use async_trait::async_trait;
use redis::{ AsyncCommands, Client };

use super::{ KeyValueStorage, StorageError };

pub struct RedisStorage {
    client: Client,
    key_prefix: String,
}

impl RedisStorage {
    pub fn new(host: &str, key_prefix: &str) -> Result<Self, StorageError> {
        Ok(Self {
            client: Client::open(host)?,
            key_prefix: key_prefix.to_string(),
        })
    }

    async fn get_connection(&self) -> Result<redis::aio::MultiplexedConnection, redis::RedisError> {
        self.client.get_multiplexed_async_connection().await
    }
}

#[async_trait]
impl KeyValueStorage for RedisStorage {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let mut conn = self.get_connection().await?;
        let value: Option<String> = conn.get(format!("{}{}", self.key_prefix, key)).await?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut conn = self.get_connection().await?;
        conn.set::<_, _, ()>(format!("{}{}", self.key_prefix, key), value).await?;
        Ok(())
    }
}
