//! Wizard session persistence and recovery
//!
//! Sessions are keyed exactly by the normalized scan-event key. Every field
//! change is persisted synchronously so a full page reload resumes the
//! operator at the same step with the same working values. Stale sessions
//! for abandoned touches are left in storage and ignored, never purged.

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;

use crate::models::WizardSession;
use klangkiste_common::Result;

pub use memory::MemorySessionStore;
pub use sqlite::SqliteSessionStore;

/// Key/value persistence for in-flight wizard sessions
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Load the persisted session for a scan key, if any
    async fn load(&self, key: &str) -> Result<Option<WizardSession>>;

    /// Persist the session under its own scan key, replacing any prior state
    async fn save(&self, session: &WizardSession) -> Result<()>;

    /// Remove the persisted session for a scan key; clearing an absent key
    /// is a no-op.
    async fn clear(&self, key: &str) -> Result<()>;
}

/// Restores at most one persisted session per scan key.
///
/// On each render cycle where an actionable event is present the restore is
/// attempted exactly once; a session persisted under a different key is
/// never returned.
#[derive(Debug, Default)]
pub struct SessionRecovery {
    attempted: HashSet<String>,
}

impl SessionRecovery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attempt restoration for `key`. Returns `Some` only on the first call
    /// per key and only when a session persisted under exactly that key
    /// exists.
    pub async fn restore_once(
        &mut self,
        store: &Arc<dyn SessionStore>,
        key: &str,
    ) -> Result<Option<WizardSession>> {
        if key.is_empty() || !self.attempted.insert(key.to_string()) {
            return Ok(None);
        }

        let restored = store.load(key).await?;
        match &restored {
            Some(session) => {
                debug_assert_eq!(session.key, key);
                tracing::info!(key, step = session.step.index(), "wizard session restored");
            }
            None => tracing::debug!(key, "no persisted wizard session for key"),
        }
        Ok(restored)
    }
}
