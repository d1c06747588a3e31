use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use tracing::info;

use crate::session::{SessionStore, StoreError};

/// Redis-backed session store. Values are written with `SET .. EX`, and
/// `touch` re-arms the TTL of the other keys, so every key of a session
/// expires `ttl_seconds` after the session's last write.
#[derive(Clone)]
pub struct RedisStore {
    connection: MultiplexedConnection,
    ttl_seconds: u64,
}

impl RedisStore {
    pub async fn connect(redis_url: &str, ttl_seconds: u64) -> Result<Self, StoreError> {
        let client = redis::Client::open(redis_url)?;
        let connection = client.get_multiplexed_async_connection().await?;
        info!("Redis session store connected (ttl={}s)", ttl_seconds);
        Ok(Self {
            connection,
            ttl_seconds,
        })
    }
}

#[async_trait]
impl SessionStore for RedisStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.connection.clone();
        let value = redis::cmd("GET")
            .arg(key)
            .query_async::<_, Option<String>>(&mut conn)
            .await?;
        Ok(value)
    }

    async fn put(&self, key: &str, value: String) -> Result<(), StoreError> {
        let mut conn = self.connection.clone();
        redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("EX")
            .arg(self.ttl_seconds)
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut conn = self.connection.clone();
        redis::cmd("DEL")
            .arg(key)
            .query_async::<_, ()>(&mut conn)
            .await?;
        Ok(())
    }

    async fn touch(&self, keys: &[String]) -> Result<(), StoreError> {
        if keys.is_empty() {
            return Ok(());
        }
        let mut conn = self.connection.clone();
        let mut pipe = redis::pipe();
        for key in keys {
            pipe.cmd("EXPIRE").arg(key).arg(self.ttl_seconds).ignore();
        }
        pipe.query_async::<_, ()>(&mut conn).await?;
        Ok(())
    }
}
