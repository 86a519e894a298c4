use std::collections::HashSet;

use thiserror::Error;

use crate::domain::task::Task;
use crate::storage::{KeyValueStorage, STORAGE_KEY, StorageError};

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("failed to encode tasks: {0}")]
    Encode(#[from] serde_json::Error),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Debug, Error)]
enum SnapshotError {
    #[error("malformed snapshot: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("duplicate task id {0}")]
    DuplicateId(String),
}

/// Reads and writes the task snapshot under [`STORAGE_KEY`].
pub struct TaskPersistence<S> {
    storage: S,
}

impl<S: KeyValueStorage> TaskPersistence<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Never fails: a missing, unreadable or corrupt snapshot yields an
    /// empty collection.
    pub fn load(&self) -> Vec<Task> {
        let raw = match self.storage.get_item(STORAGE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(err) => {
                tracing::warn!(error = %err, "failed to read tasks, starting empty");
                return Vec::new();
            }
        };

        match decode(&raw) {
            Ok(tasks) => {
                tracing::debug!(count = tasks.len(), "loaded tasks");
                tasks
            }
            Err(err) => {
                tracing::warn!(error = %err, "failed to parse tasks, starting empty");
                Vec::new()
            }
        }
    }

    pub fn save(&mut self, tasks: &[Task]) -> Result<(), PersistError> {
        let raw = serde_json::to_string(tasks)?;
        self.storage.set_item(STORAGE_KEY, &raw)?;
        Ok(())
    }

    #[cfg(test)]
    pub fn storage(&self) -> &S {
        &self.storage
    }
}

fn decode(raw: &str) -> Result<Vec<Task>, SnapshotError> {
    let tasks: Vec<Task> = serde_json::from_str(raw)?;
    let mut seen = HashSet::with_capacity(tasks.len());
    for task in &tasks {
        if !seen.insert(task.id.as_str()) {
            return Err(SnapshotError::DuplicateId(task.id.to_string()));
        }
    }
    Ok(tasks)
}
