//! Key-value "brain" used to persist small pieces of agent state

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

use crate::errors::AgentError;
use crate::filesys::file::File;

/// Key-value store trait for testability
#[async_trait]
pub trait Brain: Send + Sync {
    /// Read a value, `None` if the key was never set
    async fn get(&self, key: &str) -> Result<Option<Value>, AgentError>;

    /// Store a value under a key, replacing any previous one
    async fn set(&self, key: &str, value: Value) -> Result<(), AgentError>;
}

impl<'a> dyn Brain + 'a {
    /// Read a value and deserialize it
    pub async fn json_get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, AgentError> {
        match self.get(key).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Serialize a value and store it
    pub async fn json_set<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), AgentError> {
        self.set(key, serde_json::to_value(value)?).await
    }
}

/// Brain persisted as a single JSON object on disk
pub struct FileBrain {
    file: File,
    entries: Mutex<Map<String, Value>>,
}

impl FileBrain {
    /// Open the brain, loading any existing entries
    pub async fn open(file: File) -> Result<Self, AgentError> {
        let entries = if file.exists().await {
            match file.read_json::<Value>().await? {
                Value::Object(map) => map,
                other => {
                    return Err(AgentError::StorageError(format!(
                        "Brain file {} does not hold a JSON object (found {})",
                        file.path().display(),
                        json_kind(&other)
                    )))
                }
            }
        } else {
            Map::new()
        };

        debug!(
            "Opened brain at {} with {} entries",
            file.path().display(),
            entries.len()
        );

        Ok(Self {
            file,
            entries: Mutex::new(entries),
        })
    }
}

#[async_trait]
impl Brain for FileBrain {
    async fn get(&self, key: &str) -> Result<Option<Value>, AgentError> {
        let entries = self.entries.lock().await;
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), AgentError> {
        // Held across the write so concurrent sets hit the disk in order
        let mut entries = self.entries.lock().await;
        entries.insert(key.to_string(), value);
        self.file
            .write_json(&*entries)
            .await
            .map_err(|e| AgentError::StorageError(format!("Failed to persist brain: {}", e)))
    }
}

/// In-memory brain
#[derive(Default)]
pub struct MemoryBrain {
    entries: RwLock<HashMap<String, Value>>,
}

impl MemoryBrain {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Brain for MemoryBrain {
    async fn get(&self, key: &str) -> Result<Option<Value>, AgentError> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), AgentError> {
        self.entries.write().await.insert(key.to_string(), value);
        Ok(())
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
