//! Conversation thread identity
//!
//! The thread id correlates every backend call of one installation. It is
//! created on first read, persisted, and reused across restarts. Resetting
//! the timeline never touches it; only `clear` does.

use crate::db::{Database, DbError};
use std::sync::{Arc, Mutex, PoisonError};

/// Settings key under which the thread id is persisted
pub const THREAD_ID_KEY: &str = "lumawell_thread_id";

/// Durable string storage for the thread id
pub trait KeyValueStore: Send + Sync {
    fn load(&self, key: &str) -> Result<Option<String>, DbError>;
    fn save(&self, key: &str, value: &str) -> Result<(), DbError>;
    fn remove(&self, key: &str) -> Result<(), DbError>;
}

impl KeyValueStore for Database {
    fn load(&self, key: &str) -> Result<Option<String>, DbError> {
        Ok(self.get_setting(key)?.map(|s| s.value))
    }

    fn save(&self, key: &str, value: &str) -> Result<(), DbError> {
        self.put_setting(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), DbError> {
        self.delete_setting(key).map(|_| ())
    }
}

/// Lazily created, persisted thread id
pub struct ThreadIdentity {
    store: Option<Arc<dyn KeyValueStore>>,
    cached: Mutex<Option<String>>,
}

impl ThreadIdentity {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store: Some(store),
            cached: Mutex::new(None),
        }
    }

    /// Identity without durable storage; the id lives for the process only
    pub fn in_memory() -> Self {
        Self {
            store: None,
            cached: Mutex::new(None),
        }
    }

    /// Return the thread id, creating and persisting it on first use.
    ///
    /// Storage failures degrade to a process-lifetime id.
    pub fn get_or_create(&self) -> String {
        let mut cached = self.cached.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(id) = cached.as_ref() {
            return id.clone();
        }

        if let Some(store) = &self.store {
            match store.load(THREAD_ID_KEY) {
                Ok(Some(existing)) if !existing.is_empty() => {
                    tracing::debug!(thread_id = %existing, "Loaded persisted thread id");
                    *cached = Some(existing.clone());
                    return existing;
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to read thread id, creating a new one");
                }
            }
        }

        let id = uuid::Uuid::new_v4().to_string();
        let Some(store) = &self.store else {
            tracing::info!(thread_id = %id, "Created in-memory thread id");
            *cached = Some(id.clone());
            return id;
        };
        match store.save(THREAD_ID_KEY, &id) {
            Ok(()) => tracing::info!(thread_id = %id, "Created thread id"),
            Err(e) => tracing::warn!(
                error = %e,
                thread_id = %id,
                "Failed to persist thread id, using it for this process only"
            ),
        }

        *cached = Some(id.clone());
        id
    }

    /// Forget the thread id. The next read creates a fresh one.
    pub fn clear(&self) -> Result<(), DbError> {
        let mut cached = self.cached.lock().unwrap_or_else(PoisonError::into_inner);
        *cached = None;
        if let Some(store) = &self.store {
            store.remove(THREAD_ID_KEY)?;
        }
        tracing::info!("Cleared thread id");
        Ok(())
    }
}
