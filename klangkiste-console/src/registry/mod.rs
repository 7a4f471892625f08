//! Tag registry client
//!
//! Typed operations against the collaborator tag/box/assignment record
//! store. The trait is the seam the wizard, matrix, and pollers are written
//! against; `HttpTagRegistry` is the production implementation.

pub mod http;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::models::{BoxLocalTag, Tag};
use crate::scan::ScanEvent;
use klangkiste_common::Result;

pub use http::HttpTagRegistry;

/// Reader simulation command sent to a box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NfcCommand {
    /// Simulate/confirm the reader recognizing a UID
    NfcOn,
    /// Stop simulating
    NfcOff,
}

impl NfcCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            NfcCommand::NfcOn => "nfc_on",
            NfcCommand::NfcOff => "nfc_off",
        }
    }
}

/// Result of a successful claim
#[derive(Debug, Clone, Deserialize)]
pub struct ClaimedTag {
    pub uid: String,
}

/// Last detection reported in a box's status feed
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LastScan {
    #[serde(default)]
    pub uid: Option<String>,
    pub known: bool,
    #[serde(rename = "hardwareUid", default)]
    pub hardware_uid: Option<String>,
}

/// Box status snapshot; the scan-event source
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BoxStatus {
    #[serde(default)]
    pub last_nfc: Option<LastScan>,
    #[serde(default)]
    pub last_nfc_at: Option<i64>,
}

impl BoxStatus {
    /// Reconstruct the ephemeral scan event from this snapshot, if any
    pub fn scan_event(&self) -> Option<ScanEvent> {
        let last = self.last_nfc.as_ref()?;
        let at = self.last_nfc_at?;
        Some(ScanEvent {
            uid: last.uid.clone().unwrap_or_default(),
            known: last.known,
            hardware_uid: last.hardware_uid.clone().unwrap_or_default(),
            at,
        })
    }
}

/// Collaborator operations on the tag/box/assignment record store.
///
/// All operations are asynchronous round-trips that may suspend the caller
/// but never block other in-flight operations; all may fail with a reported
/// detail message.
#[async_trait]
pub trait TagRegistry: Send + Sync {
    async fn get_tags(&self) -> Result<Vec<Tag>>;

    async fn claim_tag(&self, uid: &str, label: &str) -> Result<ClaimedTag>;

    async fn mark_tag_written(&self, uid: &str) -> Result<()>;

    async fn delete_tag(&self, uid: &str) -> Result<()>;

    /// `None` clears the media binding
    async fn set_tag_media(&self, uid: &str, media_path: Option<&str>) -> Result<()>;

    /// `None` clears the alias
    async fn set_tag_alias(&self, uid: &str, alias: Option<&str>) -> Result<()>;

    async fn get_box_tags(&self, box_id: &str) -> Result<Vec<Tag>>;

    async fn get_box_local_tags(&self, box_id: &str) -> Result<Vec<BoxLocalTag>>;

    async fn assign_tag(&self, uid: &str, box_id: &str) -> Result<()>;

    async fn unassign_tag(&self, uid: &str, box_id: &str) -> Result<()>;

    async fn pull_tag_from_box(&self, box_id: &str, uid: &str, target_folder: &str) -> Result<()>;

    async fn get_tag_blocks(&self, box_id: &str) -> Result<Vec<String>>;

    async fn set_tag_block(&self, box_id: &str, uid: &str, blocked: bool) -> Result<()>;

    async fn send_command(&self, box_id: &str, command: NfcCommand, uid: &str) -> Result<()>;

    async fn get_status(&self, box_id: &str) -> Result<BoxStatus>;

    /// `None` clears the alias
    async fn set_box_alias(&self, box_id: &str, alias: Option<&str>) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_wire_names() {
        assert_eq!(NfcCommand::NfcOn.as_str(), "nfc_on");
        assert_eq!(NfcCommand::NfcOff.as_str(), "nfc_off");
        let json = serde_json::to_string(&NfcCommand::NfcOn).expect("serialize");
        assert_eq!(json, "\"nfc_on\"");
    }

    #[test]
    fn status_without_detection_yields_no_event() {
        let status = BoxStatus {
            last_nfc: None,
            last_nfc_at: None,
        };
        assert!(status.scan_event().is_none());

        // A detection without a timestamp cannot form a stable key either
        let status = BoxStatus {
            last_nfc: Some(LastScan {
                uid: Some("ab12cd34ef".to_string()),
                known: false,
                hardware_uid: None,
            }),
            last_nfc_at: None,
        };
        assert!(status.scan_event().is_none());
    }

    #[test]
    fn status_reconstructs_scan_event() {
        let status: BoxStatus = serde_json::from_str(
            r#"{"last_nfc":{"uid":"ab12cd34ef","known":false,"hardwareUid":"A1:00:FF:01:02:03:04"},"last_nfc_at":1700000000000}"#,
        )
        .expect("deserialize");

        let event = status.scan_event().expect("event");
        assert_eq!(event.uid, "ab12cd34ef");
        assert!(!event.known);
        assert_eq!(event.hardware_uid, "A1:00:FF:01:02:03:04");
        assert_eq!(event.at, 1_700_000_000_000);
    }
}
