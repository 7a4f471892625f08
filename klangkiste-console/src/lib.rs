//! klangkiste-console - device-management console core
//!
//! The tag identity and provisioning lifecycle for Klangkiste playback
//! boxes: turning a raw NFC scan into a validated, named, media-bound,
//! box-assigned tag, with wizard progress that survives reloads and a
//! per-box block matrix. Rendering, box pairing, the media tree, and the
//! REST backend are collaborator concerns; this crate talks to them through
//! the `TagRegistry` trait.

pub mod identity;
pub mod matrix;
pub mod models;
pub mod poll;
pub mod registry;
pub mod scan;
pub mod session;
pub mod wizard;

pub use klangkiste_common::{ConsoleEvent, Error, EventBus, Result};
pub use models::{Tag, TagStatus, UidMode, WizardSession, WizardStep};
pub use registry::{HttpTagRegistry, NfcCommand, TagRegistry};
pub use scan::{normalized_key, ScanEvent, ScanIntake, ScanWatcher};
pub use session::{MemorySessionStore, SessionRecovery, SessionStore, SqliteSessionStore};
pub use wizard::{CommitOutcome, ProvisioningService};

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use klangkiste_common::config::ConsoleConfig;
use matrix::AssignmentMatrix;
use poll::PollerHandle;

/// Console state shared across views
#[derive(Clone)]
pub struct Console {
    /// Record store collaborator
    pub registry: Arc<dyn TagRegistry>,
    /// Wizard session persistence
    pub sessions: Arc<dyn SessionStore>,
    /// Event bus for view re-synchronization
    pub event_bus: EventBus,
    /// Wizard orchestration
    pub provisioning: ProvisioningService,
    /// Assignment and block matrix view
    pub matrix: Arc<RwLock<AssignmentMatrix>>,
    /// Scan classification and banner state
    pub watcher: Arc<RwLock<ScanWatcher>>,
    /// Session recovery bookkeeping (restore-once per key)
    pub recovery: Arc<RwLock<SessionRecovery>>,
    /// Per-box polling task handles
    pollers: Arc<RwLock<HashMap<String, Vec<PollerHandle>>>>,
    config: ConsoleConfig,
}

impl Console {
    /// Wire the console against the configured backend and session store
    pub async fn connect(config: ConsoleConfig) -> Result<Self> {
        let registry: Arc<dyn TagRegistry> =
            Arc::new(HttpTagRegistry::new(config.registry_url.clone())?);
        let sessions: Arc<dyn SessionStore> =
            Arc::new(SqliteSessionStore::connect(&config.session_db).await?);
        Ok(Self::with_collaborators(registry, sessions, config))
    }

    /// Assemble from explicit collaborators (tests, alternate transports)
    pub fn with_collaborators(
        registry: Arc<dyn TagRegistry>,
        sessions: Arc<dyn SessionStore>,
        config: ConsoleConfig,
    ) -> Self {
        let event_bus = EventBus::new(100);
        let provisioning =
            ProvisioningService::new(registry.clone(), sessions.clone(), event_bus.clone());
        let matrix = Arc::new(RwLock::new(AssignmentMatrix::new(
            registry.clone(),
            event_bus.clone(),
        )));

        Self {
            registry,
            sessions,
            event_bus,
            provisioning,
            matrix,
            watcher: Arc::new(RwLock::new(ScanWatcher::new())),
            recovery: Arc::new(RwLock::new(SessionRecovery::new())),
            pollers: Arc::new(RwLock::new(HashMap::new())),
            config,
        }
    }

    /// Start the three polling loops for a box. Watching an already-watched
    /// box restarts its pollers.
    pub async fn watch_box(&self, box_id: &str) {
        let handles = vec![
            poll::spawn_status_poller(
                self.registry.clone(),
                self.event_bus.clone(),
                box_id.to_string(),
                self.config.status_poll_interval,
            ),
            poll::spawn_box_tags_poller(
                self.registry.clone(),
                self.event_bus.clone(),
                box_id.to_string(),
                self.config.box_poll_interval,
            ),
            poll::spawn_local_storage_poller(
                self.registry.clone(),
                self.event_bus.clone(),
                box_id.to_string(),
                self.config.storage_poll_interval,
            ),
        ];

        let mut pollers = self.pollers.write().await;
        if let Some(old) = pollers.insert(box_id.to_string(), handles) {
            for handle in old {
                handle.cancel();
            }
        }
        tracing::info!(box_id, "box polling started");
    }

    /// Stop a box's polling loops (view teardown)
    pub async fn unwatch_box(&self, box_id: &str) {
        if let Some(handles) = self.pollers.write().await.remove(box_id) {
            for handle in handles {
                handle.cancel();
            }
            tracing::info!(box_id, "box polling stopped");
        }
    }
}
