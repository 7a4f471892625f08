//! Periodic polling tasks
//!
//! Status (scan feed), box tag list, and box local storage are polled by
//! independent, unsynchronized loops; a stale read from one never blocks or
//! invalidates another. Each task owns a cancellation token joined to the
//! lifetime of its consumer: dropping the handle stops the loop, so no loop
//! keeps running after its view is gone.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::registry::TagRegistry;
use crate::scan::normalized_key;
use klangkiste_common::{ConsoleEvent, EventBus};

/// Handle to a running polling task; cancels on drop
#[derive(Debug)]
pub struct PollerHandle {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

impl PollerHandle {
    /// Request cancellation without waiting for the loop to exit
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Cancel and wait for the loop to exit
    pub async fn shutdown(mut self) {
        self.token.cancel();
        let _ = (&mut self.handle).await;
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Poll a box's status feed and surface new scan keys.
///
/// `ScanDetected` is emitted only when the normalized key changes, so the
/// banner always reflects the most recently observed touch and a touch is
/// never announced twice.
pub fn spawn_status_poller(
    registry: Arc<dyn TagRegistry>,
    bus: EventBus,
    box_id: String,
    interval: Duration,
) -> PollerHandle {
    let token = CancellationToken::new();
    let task_token = token.clone();

    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        let mut last_key: Option<String> = None;

        loop {
            tokio::select! {
                _ = task_token.cancelled() => break,
                _ = ticker.tick() => {
                    match registry.get_status(&box_id).await {
                        Ok(status) => {
                            if let Some(event) = status.scan_event() {
                                let key = normalized_key(Some(&event));
                                if last_key.as_deref() != Some(key.as_str()) {
                                    last_key = Some(key.clone());
                                    bus.emit(ConsoleEvent::ScanDetected {
                                        box_id: box_id.clone(),
                                        key,
                                        uid: event.uid,
                                        known: event.known,
                                        hardware_uid: event.hardware_uid,
                                        at: event.at,
                                        timestamp: Utc::now(),
                                    });
                                }
                            }
                        }
                        Err(error) => {
                            tracing::warn!(box_id, %error, "status poll failed");
                        }
                    }
                }
            }
        }
        tracing::debug!(box_id, "status poller stopped");
    });

    PollerHandle { token, handle }
}

/// Poll a box's assigned-tag list
pub fn spawn_box_tags_poller(
    registry: Arc<dyn TagRegistry>,
    bus: EventBus,
    box_id: String,
    interval: Duration,
) -> PollerHandle {
    let token = CancellationToken::new();
    let task_token = token.clone();

    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);

        loop {
            tokio::select! {
                _ = task_token.cancelled() => break,
                _ = ticker.tick() => {
                    match registry.get_box_tags(&box_id).await {
                        Ok(tags) => {
                            bus.emit(ConsoleEvent::BoxTagsRefreshed {
                                box_id: box_id.clone(),
                                count: tags.len(),
                                timestamp: Utc::now(),
                            });
                        }
                        Err(error) => {
                            tracing::warn!(box_id, %error, "box tag poll failed");
                        }
                    }
                }
            }
        }
        tracing::debug!(box_id, "box tag poller stopped");
    });

    PollerHandle { token, handle }
}

/// Poll a box's local tag storage listing
pub fn spawn_local_storage_poller(
    registry: Arc<dyn TagRegistry>,
    bus: EventBus,
    box_id: String,
    interval: Duration,
) -> PollerHandle {
    let token = CancellationToken::new();
    let task_token = token.clone();

    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);

        loop {
            tokio::select! {
                _ = task_token.cancelled() => break,
                _ = ticker.tick() => {
                    match registry.get_box_local_tags(&box_id).await {
                        Ok(local_tags) => {
                            bus.emit(ConsoleEvent::LocalTagsRefreshed {
                                box_id: box_id.clone(),
                                count: local_tags.len(),
                                timestamp: Utc::now(),
                            });
                        }
                        Err(error) => {
                            tracing::warn!(box_id, %error, "local storage poll failed");
                        }
                    }
                }
            }
        }
        tracing::debug!(box_id, "local storage poller stopped");
    });

    PollerHandle { token, handle }
}
