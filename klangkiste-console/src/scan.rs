//! Scan event normalization and actionability
//!
//! A scan event is the ephemeral detection signal from a box's status feed
//! (or synthesized locally when no physical UID is available). It is never
//! persisted; it exists only long enough to be normalized to a stable key
//! and consumed by a wizard session.

use serde::{Deserialize, Serialize};

use crate::identity;
use crate::models::{NoticeKind, UidMode, ValidationNotice};

const KEY_SEPARATOR: char = '|';

/// Momentary detection signal observed from a box
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanEvent {
    /// Physical UID, empty when none was available
    #[serde(default)]
    pub uid: String,
    /// Whether the reading device already recognizes the tag
    pub known: bool,
    /// Low-level reader identifier, empty when the backend supplied none
    #[serde(default)]
    pub hardware_uid: String,
    /// Detection timestamp as reported by the box (epoch milliseconds)
    pub at: i64,
}

/// Stable identity for one physical touch.
///
/// Pure: identical `{at, uid, hardware_uid}` triples produce identical keys
/// regardless of object identity, so an event reconstructed from a status
/// poll after a page reload still matches its persisted session.
pub fn normalized_key(event: Option<&ScanEvent>) -> String {
    match event {
        None => String::new(),
        Some(e) => format!(
            "{}{sep}{}{sep}{}",
            e.at,
            e.uid,
            e.hardware_uid,
            sep = KEY_SEPARATOR
        ),
    }
}

/// Classified, actionable scan ready to seed a wizard session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanIntake {
    /// Normalized key of the originating touch
    pub key: String,
    /// Working UID (hardware-reported, or generated on auto-replace /
    /// simulation)
    pub uid: String,
    /// Hardware-reported UID when it was usable
    pub scanned_uid: Option<String>,
    pub uid_mode: UidMode,
    /// Reader identifier; generated when the backend supplied none
    pub hardware_uid: String,
    pub known: bool,
    /// True when the touch carried no physical UID
    pub simulated: bool,
    /// Set when the scanned UID was unusable and replaced
    pub warning: Option<ValidationNotice>,
}

/// Tracks which touches have been actioned or dismissed.
///
/// An event is actionable only if the reader reports it as not recognized
/// and its key differs from the most recently actioned key, so a touch that
/// already opened a wizard does not re-trigger on every poll cycle.
#[derive(Debug, Default)]
pub struct ScanWatcher {
    last_actioned: Option<String>,
    dismissed: Option<String>,
}

impl ScanWatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify an observed event; `Some` means a wizard should surface.
    pub fn observe(&mut self, event: &ScanEvent) -> Option<ScanIntake> {
        if event.known {
            return None;
        }

        let key = normalized_key(Some(event));
        if self.last_actioned.as_deref() == Some(key.as_str()) {
            return None;
        }
        if self.dismissed.as_deref() == Some(key.as_str()) {
            return None;
        }

        let hardware_uid = if event.hardware_uid.is_empty() {
            identity::generate_hardware_uid()
        } else {
            event.hardware_uid.clone()
        };

        let intake = if event.uid.is_empty() {
            // Operator-initiated simulation: provision a UID immediately and
            // mark the touch actioned so a later real detection of the same
            // key is not treated as actionable again.
            self.last_actioned = Some(key.clone());
            ScanIntake {
                key,
                uid: identity::generate_tag_id(),
                scanned_uid: None,
                uid_mode: UidMode::New,
                hardware_uid,
                known: false,
                simulated: true,
                warning: None,
            }
        } else if identity::is_valid_tag_uid(&event.uid) {
            ScanIntake {
                key,
                uid: event.uid.clone(),
                scanned_uid: Some(event.uid.clone()),
                uid_mode: UidMode::Keep,
                hardware_uid,
                known: false,
                simulated: false,
                warning: None,
            }
        } else {
            // One-time auto-replace of an unusable physical UID
            let replacement = identity::generate_tag_id();
            tracing::warn!(
                scanned = %event.uid,
                replacement = %replacement,
                "scanned UID is unusable, auto-replacing"
            );
            ScanIntake {
                key,
                uid: replacement,
                scanned_uid: None,
                uid_mode: UidMode::New,
                hardware_uid,
                known: false,
                simulated: false,
                warning: Some(ValidationNotice::new(
                    NoticeKind::UidReplaced,
                    format!(
                        "Scanned UID \"{}\" is unusable and was replaced with a generated one",
                        event.uid
                    ),
                )),
            }
        };

        Some(intake)
    }

    /// Record that a wizard consumed this key
    pub fn mark_actioned(&mut self, key: &str) {
        self.last_actioned = Some(key.to_string());
    }

    /// Record an explicit banner dismissal; the same key will not surface
    /// again until a new, distinct key appears.
    pub fn dismiss(&mut self, key: &str) {
        self.dismissed = Some(key.to_string());
    }

    pub fn is_dismissed(&self, key: &str) -> bool {
        self.dismissed.as_deref() == Some(key)
    }
}
