//! Provisioning wizard orchestration
//!
//! Walks a human operator through claiming, labeling, media-binding, and
//! writing a tag for one scan event. Step navigation is pure (see
//! `models::session`); this service adds persistence on every mutation and
//! the sequential, non-atomic commit against the registry.
//!
//! Commit sub-steps execute strictly sequentially; a failure aborts the
//! remaining sub-steps but never undoes completed ones. The system favors a
//! visible "furthest successfully completed state" over atomicity.

use chrono::Utc;
use std::sync::Arc;

use crate::models::{
    NoticeKind, Tag, TagStatus, ValidationNotice, WizardSession, WizardStep,
};
use crate::registry::{NfcCommand, TagRegistry};
use crate::scan::{ScanIntake, ScanWatcher};
use crate::session::{SessionRecovery, SessionStore};
use klangkiste_common::{ConsoleEvent, Error, EventBus, Result};

/// Outcome of a wizard commit
#[derive(Debug)]
pub enum CommitOutcome {
    /// Tag written, media bound, and assigned to the box
    WrittenAndBound { uid: String, box_id: String },
    /// Tag written; no media folder was chosen, so no assignment was
    /// attempted
    WrittenUnbound { uid: String },
    /// Tag written, but media binding or assignment failed afterwards; the
    /// tag stays claimed/written and unbound, the operator retries the
    /// assignment separately.
    BindFailed { uid: String, error: Error },
}

impl CommitOutcome {
    /// Operator-facing success/notice text; the unbound case is worded
    /// distinctly from the bound one.
    pub fn message(&self) -> String {
        match self {
            CommitOutcome::WrittenAndBound { uid, box_id } => {
                format!("Tag {uid} written and assigned to box {box_id}")
            }
            CommitOutcome::WrittenUnbound { uid } => {
                format!("Tag {uid} saved, unbound")
            }
            CommitOutcome::BindFailed { uid, error } => {
                format!("Tag {uid} written but not assigned: {error}")
            }
        }
    }

    pub fn is_bound(&self) -> bool {
        matches!(self, CommitOutcome::WrittenAndBound { .. })
    }
}

/// Wizard service: session persistence plus registry orchestration
#[derive(Clone)]
pub struct ProvisioningService {
    registry: Arc<dyn TagRegistry>,
    store: Arc<dyn SessionStore>,
    bus: EventBus,
}

impl ProvisioningService {
    pub fn new(
        registry: Arc<dyn TagRegistry>,
        store: Arc<dyn SessionStore>,
        bus: EventBus,
    ) -> Self {
        Self {
            registry,
            store,
            bus,
        }
    }

    /// Start a fresh session for an actionable scan and persist it.
    ///
    /// The caller marks the key actioned on its `ScanWatcher`.
    pub async fn begin(&self, intake: ScanIntake) -> Result<WizardSession> {
        let session = WizardSession::new(
            intake.key,
            intake.uid,
            intake.scanned_uid,
            intake.uid_mode,
            intake.hardware_uid,
            intake.known,
            intake.simulated,
            intake.warning,
        );
        self.store.save(&session).await?;
        tracing::info!(key = %session.key, uid = %session.uid, "wizard session started");
        Ok(session)
    }

    /// Restore a previously persisted session for this key, at most once
    pub async fn restore(
        &self,
        recovery: &mut SessionRecovery,
        key: &str,
    ) -> Result<Option<WizardSession>> {
        let restored = recovery.restore_once(&self.store, key).await?;
        if let Some(session) = &restored {
            self.bus.emit(ConsoleEvent::SessionRestored {
                key: session.key.clone(),
                step: session.step.index(),
                timestamp: Utc::now(),
            });
        }
        Ok(restored)
    }

    /// Dismiss the "tag detected" banner: drop the persisted session and
    /// record the key so the same touch does not re-surface.
    pub async fn dismiss(&self, watcher: &mut ScanWatcher, key: &str) -> Result<()> {
        self.store.clear(key).await?;
        watcher.dismiss(key);
        self.bus.emit(ConsoleEvent::SessionCleared {
            key: key.to_string(),
            timestamp: Utc::now(),
        });
        Ok(())
    }

    /// Advance one step; returns whether the step changed. A validation
    /// failure stays on the current step with the inline notice set. The
    /// session is persisted either way.
    pub async fn advance(&self, session: &mut WizardSession) -> Result<bool> {
        let advanced = session.advance().is_ok();
        self.store.save(session).await?;
        Ok(advanced)
    }

    /// Navigate backward one step
    pub async fn back(&self, session: &mut WizardSession) -> Result<()> {
        session.back();
        self.store.save(session).await
    }

    /// Jump to a step within the unlocked range
    pub async fn goto(&self, session: &mut WizardSession, step: WizardStep) -> Result<bool> {
        let moved = session.goto(step).is_ok();
        self.store.save(session).await?;
        Ok(moved)
    }

    pub async fn set_label(&self, session: &mut WizardSession, label: &str) -> Result<()> {
        session.set_label(label);
        self.store.save(session).await
    }

    /// Edit the working UID (editable only in `New` mode)
    pub async fn set_uid(&self, session: &mut WizardSession, uid: &str) -> Result<bool> {
        let changed = session.set_uid(uid).is_ok();
        self.store.save(session).await?;
        Ok(changed)
    }

    /// Switch UID mode; `New` generates a fresh identifier
    pub async fn set_uid_mode(
        &self,
        session: &mut WizardSession,
        mode: crate::models::UidMode,
    ) -> Result<bool> {
        let changed = session.set_uid_mode(mode).is_ok();
        self.store.save(session).await?;
        Ok(changed)
    }

    pub async fn choose_media(
        &self,
        session: &mut WizardSession,
        media_path: Option<String>,
    ) -> Result<()> {
        session.choose_media(media_path);
        self.store.save(session).await
    }

    /// Commit the wizard from the confirmation step.
    ///
    /// Sub-steps, each awaited before the next:
    /// 1. ensure the tag exists and is marked written (idempotent on an
    ///    already-written tag);
    /// 2. for an unknown scan with a chosen media folder: bind media, then
    ///    assign to the selected box;
    /// 3. on a simulated touch whose assignment succeeded: tell the box to
    ///    report the UID as recognized;
    /// 4. on full success: clear the session and notify subscribers to
    ///    re-derive their views from a fresh registry read.
    ///
    /// A claim rejection (duplicate or invalid UID) routes the operator back
    /// to the identifier step with the inline notice set, then propagates.
    pub async fn commit(
        &self,
        session: &mut WizardSession,
        box_id: &str,
    ) -> Result<CommitOutcome> {
        if !session.ready_to_commit() {
            return Err(Error::InvalidInput(
                "commit is only available from the confirmation step".to_string(),
            ));
        }

        self.ensure_written(session).await?;

        let outcome = match (session.known, session.chosen_media()) {
            (false, Some(media)) => {
                let media = media.to_string();
                match self.bind_and_assign(session, &media, box_id).await {
                    Ok(()) => CommitOutcome::WrittenAndBound {
                        uid: session.uid.clone(),
                        box_id: box_id.to_string(),
                    },
                    Err(error) => CommitOutcome::BindFailed {
                        uid: session.uid.clone(),
                        error,
                    },
                }
            }
            _ => CommitOutcome::WrittenUnbound {
                uid: session.uid.clone(),
            },
        };

        match &outcome {
            CommitOutcome::BindFailed { error, .. } => {
                tracing::warn!(uid = %session.uid, %error, "tag written but left unbound");
                session.notice = Some(ValidationNotice::new(
                    NoticeKind::UnboundAfterWrite,
                    outcome.message(),
                ));
                self.store.save(session).await?;
            }
            _ => {
                self.store.clear(&session.key).await?;
                self.bus.emit(ConsoleEvent::SessionCleared {
                    key: session.key.clone(),
                    timestamp: Utc::now(),
                });
                self.bus.emit(ConsoleEvent::TagWritten {
                    uid: session.uid.clone(),
                    bound: outcome.is_bound(),
                    timestamp: Utc::now(),
                });
                tracing::info!(uid = %session.uid, "{}", outcome.message());
            }
        }

        Ok(outcome)
    }

    /// Reuse a previously imported tag: write-confirm then assign directly,
    /// bypassing the three wizard steps. Imported tags already carry a
    /// trusted media binding pulled from a box's own local storage.
    pub async fn reuse_imported(&self, tag: &Tag, box_id: &str) -> Result<()> {
        if tag.status != TagStatus::Imported {
            return Err(Error::InvalidInput(format!(
                "tag {} is not an imported tag",
                tag.uid
            )));
        }
        // Rejected before any network call
        if !tag.is_assignable() {
            return Err(Error::InvalidInput(format!(
                "tag {} needs a media binding before it can be assigned",
                tag.uid
            )));
        }

        self.registry.mark_tag_written(&tag.uid).await?;
        self.registry.assign_tag(&tag.uid, box_id).await?;

        self.bus.emit(ConsoleEvent::TagWritten {
            uid: tag.uid.clone(),
            bound: true,
            timestamp: Utc::now(),
        });
        tracing::info!(uid = %tag.uid, box_id, "imported tag reused and assigned");
        Ok(())
    }

    /// Store the tag without binding it: claim with an empty label and no
    /// media folder, marking the touch as handled without entering the full
    /// wizard. Only valid while the scan is unknown and no registry record
    /// exists for its UID.
    pub async fn store_without_binding(&self, session: &WizardSession) -> Result<()> {
        if session.known {
            return Err(Error::InvalidInput(
                "only an unrecognized scan can be stored without binding".to_string(),
            ));
        }

        let exists = self
            .registry
            .get_tags()
            .await?
            .iter()
            .any(|t| t.uid == session.uid);
        if exists {
            return Err(Error::Conflict(format!(
                "a registry record already exists for {}",
                session.uid
            )));
        }

        self.registry.claim_tag(&session.uid, "").await?;
        self.store.clear(&session.key).await?;
        self.bus.emit(ConsoleEvent::SessionCleared {
            key: session.key.clone(),
            timestamp: Utc::now(),
        });
        tracing::info!(uid = %session.uid, "tag stored without binding");
        Ok(())
    }

    /// Sub-step 1: make sure a written record exists for the working UID.
    async fn ensure_written(&self, session: &mut WizardSession) -> Result<()> {
        let existing = self
            .registry
            .get_tags()
            .await?
            .into_iter()
            .find(|t| t.uid == session.uid);

        match existing {
            Some(tag) if tag.status == TagStatus::Written => {
                // Repeating the commit on an already-written tag is a no-op
                // success.
                tracing::debug!(uid = %tag.uid, "tag already written");
                Ok(())
            }
            Some(tag) => self.registry.mark_tag_written(&tag.uid).await,
            None => {
                if let Err(error) = self
                    .registry
                    .claim_tag(&session.uid, &session.label)
                    .await
                {
                    if error.is_uid_rejection() {
                        // Same inline notice as a step-0 validation failure;
                        // the operator must change identifiers.
                        let kind = match error {
                            Error::InvalidUid(_) => NoticeKind::InvalidUid,
                            _ => NoticeKind::DuplicateOrConflict,
                        };
                        session.notice =
                            Some(ValidationNotice::new(kind, error.to_string()));
                        session.identifiers_done = false;
                        session.media_done = false;
                        session.step = WizardStep::Identifiers;
                        self.store.save(session).await?;
                    }
                    return Err(error);
                }
                self.registry.mark_tag_written(&session.uid).await
            }
        }
    }

    /// Sub-steps 2 and 3: bind media, assign, then confirm a simulated
    /// reader recognition. The command failure after a successful assignment
    /// is logged but does not demote the outcome; the binding itself held.
    async fn bind_and_assign(
        &self,
        session: &WizardSession,
        media: &str,
        box_id: &str,
    ) -> Result<()> {
        self.registry
            .set_tag_media(&session.uid, Some(media))
            .await?;
        self.registry.assign_tag(&session.uid, box_id).await?;

        if session.simulated {
            if let Err(error) = self
                .registry
                .send_command(box_id, NfcCommand::NfcOn, &session.uid)
                .await
            {
                tracing::warn!(uid = %session.uid, box_id, %error,
                    "reader simulation command failed after assignment");
            }
        }
        Ok(())
    }
}
