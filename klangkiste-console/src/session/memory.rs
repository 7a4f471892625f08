//! In-memory session store
//!
//! Backs unit tests and headless use; production uses the SQLite store.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use super::SessionStore;
use crate::models::WizardSession;
use klangkiste_common::Result;

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: Mutex<HashMap<String, WizardSession>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of persisted sessions (stale ones included)
    pub fn len(&self) -> usize {
        self.sessions.lock().expect("session store lock").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, key: &str) -> Result<Option<WizardSession>> {
        Ok(self
            .sessions
            .lock()
            .expect("session store lock")
            .get(key)
            .cloned())
    }

    async fn save(&self, session: &WizardSession) -> Result<()> {
        self.sessions
            .lock()
            .expect("session store lock")
            .insert(session.key.clone(), session.clone());
        Ok(())
    }

    async fn clear(&self, key: &str) -> Result<()> {
        self.sessions
            .lock()
            .expect("session store lock")
            .remove(key);
        Ok(())
    }
}
