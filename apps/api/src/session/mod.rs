//! Session persistence: the key-value store that carries state between stages.
//!
//! Every entity of an assessment session lives under `session:{id}:{name}` as
//! JSON text. Writes are full replacements.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::assessment::models::Stage;

pub mod memory;
pub mod redis_store;

pub use memory::MemoryStore;
pub use redis_store::RedisStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Serialization error for key '{key}': {source}")]
    Serialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// String-keyed, string-valued store. Implementations must be safe to share across tasks.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    async fn put(&self, key: &str, value: String) -> Result<(), StoreError>;
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Restarts the expiry clock of each existing key. Stores without expiry ignore it.
    async fn touch(&self, _keys: &[String]) -> Result<(), StoreError> {
        Ok(())
    }
}

/// The named entities of one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKey {
    Config,
    ResumeText,
    Questions,
    StageResult(Stage),
    FinalReport,
}

impl SessionKey {
    pub const ALL: [SessionKey; 8] = [
        SessionKey::Config,
        SessionKey::ResumeText,
        SessionKey::Questions,
        SessionKey::StageResult(Stage::Resume),
        SessionKey::StageResult(Stage::Hr),
        SessionKey::StageResult(Stage::Voice),
        SessionKey::StageResult(Stage::Essay),
        SessionKey::FinalReport,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SessionKey::Config => "assessmentConfig",
            SessionKey::ResumeText => "resumeText",
            SessionKey::Questions => "personalizedQuestions",
            SessionKey::StageResult(Stage::Resume) => "resumeAnalysis",
            SessionKey::StageResult(Stage::Hr) => "hrAnalysis",
            SessionKey::StageResult(Stage::Voice) => "voiceAnalysis",
            SessionKey::StageResult(Stage::Essay) => "essayAnalysis",
            SessionKey::FinalReport => "finalReport",
        }
    }

    /// Keys derived from the question set; cleared whenever a new set is generated.
    pub fn downstream_of_questions() -> [SessionKey; 5] {
        [
            SessionKey::StageResult(Stage::Resume),
            SessionKey::StageResult(Stage::Hr),
            SessionKey::StageResult(Stage::Voice),
            SessionKey::StageResult(Stage::Essay),
            SessionKey::FinalReport,
        ]
    }
}

pub fn storage_key(session_id: Uuid, key: SessionKey) -> String {
    format!("session:{session_id}:{}", key.name())
}

/// Reads and deserializes one entity. `Ok(None)` when the key is absent.
pub async fn load<T: DeserializeOwned>(
    store: &dyn SessionStore,
    session_id: Uuid,
    key: SessionKey,
) -> Result<Option<T>, StoreError> {
    let full_key = storage_key(session_id, key);
    match store.get(&full_key).await? {
        Some(raw) => serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| StoreError::Serialization {
                key: full_key,
                source,
            }),
        None => Ok(None),
    }
}

/// Serializes and writes one entity, replacing any previous value. The other
/// keys of the session get their TTL refreshed so the session expires as a unit.
pub async fn save<T: Serialize>(
    store: &dyn SessionStore,
    session_id: Uuid,
    key: SessionKey,
    value: &T,
) -> Result<(), StoreError> {
    let full_key = storage_key(session_id, key);
    let raw = serde_json::to_string(value).map_err(|source| StoreError::Serialization {
        key: full_key.clone(),
        source,
    })?;
    store.put(&full_key, raw).await?;

    let siblings: Vec<String> = SessionKey::ALL
        .into_iter()
        .filter(|other| *other != key)
        .map(|other| storage_key(session_id, other))
        .collect();
    store.touch(&siblings).await
}

pub async fn remove(
    store: &dyn SessionStore,
    session_id: Uuid,
    key: SessionKey,
) -> Result<(), StoreError> {
    store.delete(&storage_key(session_id, key)).await
}
