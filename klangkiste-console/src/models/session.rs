//! Provisioning wizard session state machine
//!
//! A `WizardSession` is the client-local, ephemeral provisioning progress
//! for exactly one normalized scan-event key. Navigation rules live here as
//! pure transitions; registry round-trips live in the wizard service. Every
//! field is serde-serializable so session recovery is a plain
//! serialize/deserialize pair keyed by the scan key.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity;

/// Wizard steps, ordered but not strictly sequential: the operator may
/// navigate backward freely and jump forward up to the highest step already
/// unlocked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WizardStep {
    /// UID entry and validation
    Identifiers,
    /// Optional media folder selection
    Media,
    /// Summary and commit
    Confirm,
}

impl WizardStep {
    pub fn index(self) -> u8 {
        match self {
            WizardStep::Identifiers => 0,
            WizardStep::Media => 1,
            WizardStep::Confirm => 2,
        }
    }

    fn previous(self) -> Option<WizardStep> {
        match self {
            WizardStep::Identifiers => None,
            WizardStep::Media => Some(WizardStep::Identifiers),
            WizardStep::Confirm => Some(WizardStep::Media),
        }
    }
}

/// Where the working UID comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UidMode {
    /// Use the UID reported by hardware; field is read-only
    Keep,
    /// Freshly generated UID; field is editable but re-validated on every
    /// step advancement
    New,
}

/// Inline notice kinds surfaced next to the wizard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NoticeKind {
    /// Format rejected locally or by the registry; blocks advancement
    InvalidUid,
    /// Duplicate identifier or conflicting registry state
    DuplicateOrConflict,
    /// Record disappeared underneath the operation
    NotFound,
    /// Network failure; operator must re-trigger the action
    Transport,
    /// Tag written but left unassigned; recoverable via the reuse path
    UnboundAfterWrite,
    /// No media folder chosen; informational, never blocks
    MediaUnset,
    /// Scanned UID was unusable and replaced with a generated one
    UidReplaced,
}

/// An inline notice with its operator-facing message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationNotice {
    pub kind: NoticeKind,
    pub message: String,
}

impl ValidationNotice {
    pub fn new(kind: NoticeKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Blocking notices pin the operator to the identifier step
    pub fn is_blocking(&self) -> bool {
        matches!(
            self.kind,
            NoticeKind::InvalidUid
                | NoticeKind::DuplicateOrConflict
                | NoticeKind::NotFound
                | NoticeKind::Transport
        )
    }
}

/// Client-local provisioning progress for one scan-event key
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WizardSession {
    /// Normalized scan-event key this session is attached to
    pub key: String,

    /// Current step
    pub step: WizardStep,

    /// Identifier step completed (working UID validated)
    pub identifiers_done: bool,

    /// Media step completed (passed through, selection optional)
    pub media_done: bool,

    /// Working UID
    pub uid: String,

    /// UID as originally reported by hardware, if any
    pub scanned_uid: Option<String>,

    pub uid_mode: UidMode,

    /// Free-text label applied at claim time
    pub label: String,

    /// Selected media folder reference, if any
    pub media_path: Option<String>,

    /// Low-level reader identifier; cosmetic/diagnostic only
    pub hardware_uid: String,

    /// Whether the reader reported the tag as already recognized
    pub known: bool,

    /// True when the touch was synthesized locally (no physical UID)
    pub simulated: bool,

    /// Last validation notice, if any
    pub notice: Option<ValidationNotice>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WizardSession {
    /// Create a fresh session on the identifier step
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        key: impl Into<String>,
        uid: impl Into<String>,
        scanned_uid: Option<String>,
        uid_mode: UidMode,
        hardware_uid: impl Into<String>,
        known: bool,
        simulated: bool,
        notice: Option<ValidationNotice>,
    ) -> Self {
        let now = Utc::now();
        Self {
            key: key.into(),
            step: WizardStep::Identifiers,
            identifiers_done: false,
            media_done: false,
            uid: uid.into(),
            scanned_uid,
            uid_mode,
            label: String::new(),
            media_path: None,
            hardware_uid: hardware_uid.into(),
            known,
            simulated,
            notice,
            created_at: now,
            updated_at: now,
        }
    }

    /// Highest step the operator may currently jump to
    pub fn highest_unlocked(&self) -> WizardStep {
        if self.identifiers_done && self.media_done {
            WizardStep::Confirm
        } else if self.identifiers_done {
            WizardStep::Media
        } else {
            WizardStep::Identifiers
        }
    }

    /// Whether the commit action is available
    pub fn ready_to_commit(&self) -> bool {
        self.step == WizardStep::Confirm && self.identifiers_done && self.media_done
    }

    /// Advance one step, running the current step's exit action.
    ///
    /// Leaving the identifier step validates the working UID; on failure the
    /// inline notice is set and the step does not change. Leaving the media
    /// step with no folder selected surfaces an informational notice and
    /// still advances.
    pub fn advance(&mut self) -> Result<(), ValidationNotice> {
        match self.step {
            WizardStep::Identifiers => {
                if !identity::is_valid_tag_uid(&self.uid) {
                    let notice = ValidationNotice::new(
                        NoticeKind::InvalidUid,
                        format!("\"{}\" is not a usable tag UID", self.uid),
                    );
                    self.notice = Some(notice.clone());
                    self.touch();
                    return Err(notice);
                }
                self.identifiers_done = true;
                self.notice = None;
                self.step = WizardStep::Media;
            }
            WizardStep::Media => {
                self.media_done = true;
                self.notice = match self.chosen_media() {
                    Some(_) => None,
                    None => Some(ValidationNotice::new(
                        NoticeKind::MediaUnset,
                        "No media folder selected; the tag will be saved unbound",
                    )),
                };
                self.step = WizardStep::Confirm;
            }
            WizardStep::Confirm => {}
        }
        self.touch();
        Ok(())
    }

    /// Navigate backward one step; always allowed, flags are kept
    pub fn back(&mut self) {
        if let Some(previous) = self.step.previous() {
            self.step = previous;
            self.touch();
        }
    }

    /// Jump to a step: backward always, forward only up to the highest
    /// unlocked step.
    pub fn goto(&mut self, step: WizardStep) -> Result<(), ValidationNotice> {
        if step > self.highest_unlocked() {
            return Err(ValidationNotice::new(
                NoticeKind::InvalidUid,
                "Complete the identifier step first",
            ));
        }
        self.step = step;
        self.touch();
        Ok(())
    }

    /// Replace the working UID. Only permitted in `New` mode; any edit
    /// re-locks the later steps until the UID is validated again.
    pub fn set_uid(&mut self, uid: impl Into<String>) -> Result<(), ValidationNotice> {
        if self.uid_mode != UidMode::New {
            return Err(ValidationNotice::new(
                NoticeKind::InvalidUid,
                "The hardware-reported UID is read-only",
            ));
        }
        self.uid = uid.into();
        self.identifiers_done = false;
        self.media_done = false;
        self.touch();
        Ok(())
    }

    /// Switch between the hardware-reported UID and a generated one.
    ///
    /// `Keep` is only available when the scan carried a physical UID.
    pub fn set_uid_mode(&mut self, mode: UidMode) -> Result<(), ValidationNotice> {
        match mode {
            UidMode::Keep => {
                let scanned = self.scanned_uid.clone().ok_or_else(|| {
                    ValidationNotice::new(
                        NoticeKind::InvalidUid,
                        "This touch carried no physical UID to keep",
                    )
                })?;
                self.uid = scanned;
            }
            UidMode::New => {
                self.uid = identity::generate_tag_id();
            }
        }
        self.uid_mode = mode;
        self.identifiers_done = false;
        self.media_done = false;
        self.touch();
        Ok(())
    }

    pub fn set_label(&mut self, label: impl Into<String>) {
        self.label = label.into();
        self.touch();
    }

    /// Select (or clear) the media folder; selection is optional
    pub fn choose_media(&mut self, media_path: Option<String>) {
        self.media_path = media_path.filter(|p| !p.trim().is_empty());
        self.touch();
    }

    /// The effective media selection, empty strings treated as none
    pub fn chosen_media(&self) -> Option<&str> {
        self.media_path.as_deref().filter(|p| !p.trim().is_empty())
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
