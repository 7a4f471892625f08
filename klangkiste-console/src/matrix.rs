//! Assignment and per-box block matrix
//!
//! Holds the console's local view of tag-to-box assignments and per-box
//! block sets. The local view only changes after the collaborator
//! acknowledges a mutation; nothing here is updated optimistically.
//! Assignment and blocking are independent: a tag can be assigned and
//! blocked at the same time, or unassigned and still sit in a box's block
//! set from prior configuration.

use chrono::Utc;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::registry::TagRegistry;
use klangkiste_common::{ConsoleEvent, Error, EventBus, Result};

pub struct AssignmentMatrix {
    registry: Arc<dyn TagRegistry>,
    bus: EventBus,
    /// A tag is assigned to at most one box; assign supersedes prior
    assignments: HashMap<String, String>,
    /// Per-box block sets, keyed by box id
    blocks: HashMap<String, BTreeSet<String>>,
}

impl AssignmentMatrix {
    pub fn new(registry: Arc<dyn TagRegistry>, bus: EventBus) -> Self {
        Self {
            registry,
            bus,
            assignments: HashMap::new(),
            blocks: HashMap::new(),
        }
    }

    /// Box the tag is currently assigned to, per the local view
    pub fn assigned_box(&self, uid: &str) -> Option<&str> {
        self.assignments.get(uid).map(String::as_str)
    }

    /// The local view of a box's block set
    pub fn block_set(&self, box_id: &str) -> BTreeSet<String> {
        self.blocks.get(box_id).cloned().unwrap_or_default()
    }

    pub fn is_blocked(&self, box_id: &str, uid: &str) -> bool {
        self.blocks
            .get(box_id)
            .map(|set| set.contains(uid))
            .unwrap_or(false)
    }

    /// Assign a tag to a box, superseding any prior assignment.
    ///
    /// Reassigning a tag already on this box is not an error; the call is
    /// skipped. A `NotFound` from the collaborator refreshes the local view
    /// to reconcile before propagating.
    pub async fn assign(&mut self, uid: &str, box_id: &str) -> Result<()> {
        if self.assignments.get(uid).map(String::as_str) == Some(box_id) {
            tracing::debug!(uid, box_id, "tag already assigned to this box");
            return Ok(());
        }

        match self.registry.assign_tag(uid, box_id).await {
            Ok(()) => {
                self.assignments.insert(uid.to_string(), box_id.to_string());
                Ok(())
            }
            Err(error) => {
                self.reconcile_on_not_found(&error, box_id).await;
                Err(error)
            }
        }
    }

    /// Remove the tag-to-box relation without deleting the tag.
    ///
    /// Unassigning a tag not currently assigned there is a no-op.
    pub async fn unassign(&mut self, uid: &str, box_id: &str) -> Result<()> {
        if self.assignments.get(uid).map(String::as_str) != Some(box_id) {
            tracing::debug!(uid, box_id, "tag not assigned to this box");
            return Ok(());
        }

        match self.registry.unassign_tag(uid, box_id).await {
            Ok(()) => {
                self.assignments.remove(uid);
                Ok(())
            }
            Err(error) => {
                self.reconcile_on_not_found(&error, box_id).await;
                Err(error)
            }
        }
    }

    /// Toggle one cell of a box's block set. The local set changes only
    /// after the collaborator acknowledges success.
    pub async fn set_blocked(&mut self, box_id: &str, uid: &str, blocked: bool) -> Result<()> {
        self.registry.set_tag_block(box_id, uid, blocked).await?;

        let set = self.blocks.entry(box_id.to_string()).or_default();
        if blocked {
            set.insert(uid.to_string());
        } else {
            set.remove(uid);
        }

        self.bus.emit(ConsoleEvent::BlockChanged {
            box_id: box_id.to_string(),
            uid: uid.to_string(),
            blocked,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    /// Delete a tag. The registry does not cascade, so the media binding is
    /// cleared first, then the record deleted; afterwards the uid is dropped
    /// from the local assignment view and from every block set.
    pub async fn delete_tag(&mut self, uid: &str) -> Result<()> {
        self.registry.set_tag_media(uid, None).await?;
        self.registry.delete_tag(uid).await?;

        self.assignments.remove(uid);
        for set in self.blocks.values_mut() {
            set.remove(uid);
        }
        tracing::info!(uid, "tag deleted with assignment/block cleanup");
        Ok(())
    }

    /// Update a tag alias; input is trimmed and an empty result clears it
    pub async fn set_tag_alias(&self, uid: &str, alias: &str) -> Result<()> {
        self.registry
            .set_tag_alias(uid, normalize_alias(alias))
            .await
    }

    /// Update a box alias; same trimming rules as tag aliases
    pub async fn set_box_alias(&self, box_id: &str, alias: &str) -> Result<()> {
        self.registry
            .set_box_alias(box_id, normalize_alias(alias))
            .await
    }

    /// Pull a tag's media from a box's local storage into a folder of the
    /// media tree, creating an importable registry record; the box's slice
    /// of the view is refreshed afterwards.
    pub async fn pull_from_box(
        &mut self,
        box_id: &str,
        uid: &str,
        target_folder: &str,
    ) -> Result<()> {
        self.registry
            .pull_tag_from_box(box_id, uid, target_folder)
            .await?;
        tracing::info!(box_id, uid, target_folder, "tag pulled from box storage");
        self.refresh_box(box_id).await
    }

    /// Re-derive a box's slice of the local view from a fresh registry read
    pub async fn refresh_box(&mut self, box_id: &str) -> Result<()> {
        let tags = self.registry.get_box_tags(box_id).await?;
        self.assignments.retain(|_, b| b != box_id);
        for tag in &tags {
            self.assignments
                .insert(tag.uid.clone(), box_id.to_string());
        }

        let blocked = self.registry.get_tag_blocks(box_id).await?;
        self.blocks
            .insert(box_id.to_string(), blocked.into_iter().collect());

        self.bus.emit(ConsoleEvent::BoxTagsRefreshed {
            box_id: box_id.to_string(),
            count: tags.len(),
            timestamp: Utc::now(),
        });
        Ok(())
    }

    async fn reconcile_on_not_found(&mut self, error: &Error, box_id: &str) {
        if matches!(error, Error::NotFound(_)) {
            if let Err(refresh_error) = self.refresh_box(box_id).await {
                tracing::warn!(box_id, %refresh_error, "view reconciliation failed");
            }
        }
    }
}

fn normalize_alias(alias: &str) -> Option<&str> {
    let trimmed = alias.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}
