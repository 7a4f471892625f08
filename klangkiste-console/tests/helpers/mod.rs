//! Shared test helpers: an in-memory recording registry and fixtures

// Not every test binary uses every helper.
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;

use klangkiste_common::{Error, Result};
use klangkiste_console::models::{BoxLocalTag, Tag, TagStatus};
use klangkiste_console::registry::{BoxStatus, ClaimedTag, NfcCommand, TagRegistry};

/// Route log output through the test harness; repeated init is a no-op
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "klangkiste_console=debug".into()),
        )
        .with_test_writer()
        .try_init();
}

/// Failure injected into the next matching registry call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    Conflict,
    InvalidUid,
    NotFound,
    Transport,
}

impl Failure {
    fn into_error(self, context: &str) -> Error {
        match self {
            Failure::Conflict => Error::Conflict(format!("conflict: {context}")),
            Failure::InvalidUid => Error::InvalidUid(format!("rejected: {context}")),
            Failure::NotFound => Error::NotFound(format!("missing: {context}")),
            Failure::Transport => Error::Transport(format!("unreachable: {context}")),
        }
    }
}

#[derive(Debug, Default)]
pub struct RegistryState {
    pub tags: Vec<Tag>,
    /// uid -> box_id
    pub assignments: HashMap<String, String>,
    /// box_id -> blocked uids
    pub blocks: HashMap<String, BTreeSet<String>>,
    pub local_tags: HashMap<String, Vec<BoxLocalTag>>,
    pub status: HashMap<String, BoxStatus>,
    /// Call log, one entry per registry round-trip, in order
    pub calls: Vec<String>,
    pub fail_claim: Option<Failure>,
    pub fail_assign: Option<Failure>,
    pub fail_block: Option<Failure>,
    pub fail_set_media: Option<Failure>,
    pub fail_command: Option<Failure>,
}

/// In-memory registry that records every call for assertion
#[derive(Debug, Default)]
pub struct RecordingRegistry {
    pub state: Mutex<RegistryState>,
}

impl RecordingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tags(tags: Vec<Tag>) -> Self {
        let registry = Self::new();
        registry.state.lock().unwrap().tags = tags;
        registry
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn tag(&self, uid: &str) -> Option<Tag> {
        self.state
            .lock()
            .unwrap()
            .tags
            .iter()
            .find(|t| t.uid == uid)
            .cloned()
    }

    pub fn assigned_box(&self, uid: &str) -> Option<String> {
        self.state.lock().unwrap().assignments.get(uid).cloned()
    }
}

pub fn make_tag(uid: &str, status: TagStatus, media_path: Option<&str>) -> Tag {
    Tag {
        uid: uid.to_string(),
        status,
        alias: None,
        label: None,
        media_path: media_path.map(String::from),
    }
}

#[async_trait]
impl TagRegistry for RecordingRegistry {
    async fn get_tags(&self) -> Result<Vec<Tag>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("get_tags".to_string());
        Ok(state.tags.clone())
    }

    async fn claim_tag(&self, uid: &str, label: &str) -> Result<ClaimedTag> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("claim_tag {uid} {label:?}"));
        if let Some(failure) = state.fail_claim.take() {
            return Err(failure.into_error(uid));
        }
        if state.tags.iter().any(|t| t.uid == uid) {
            return Err(Error::Conflict(format!("uid {uid} already claimed")));
        }
        state.tags.push(Tag {
            uid: uid.to_string(),
            status: TagStatus::New,
            alias: None,
            label: (!label.is_empty()).then(|| label.to_string()),
            media_path: None,
        });
        Ok(ClaimedTag {
            uid: uid.to_string(),
        })
    }

    async fn mark_tag_written(&self, uid: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("mark_tag_written {uid}"));
        match state.tags.iter_mut().find(|t| t.uid == uid) {
            Some(tag) => {
                tag.status = TagStatus::Written;
                Ok(())
            }
            None => Err(Error::NotFound(format!("tag {uid}"))),
        }
    }

    async fn delete_tag(&self, uid: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("delete_tag {uid}"));
        let before = state.tags.len();
        state.tags.retain(|t| t.uid != uid);
        if state.tags.len() == before {
            return Err(Error::NotFound(format!("tag {uid}")));
        }
        state.assignments.remove(uid);
        for set in state.blocks.values_mut() {
            set.remove(uid);
        }
        Ok(())
    }

    async fn set_tag_media(&self, uid: &str, media_path: Option<&str>) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state
            .calls
            .push(format!("set_tag_media {uid} {media_path:?}"));
        if let Some(failure) = state.fail_set_media.take() {
            return Err(failure.into_error(uid));
        }
        match state.tags.iter_mut().find(|t| t.uid == uid) {
            Some(tag) => {
                tag.media_path = media_path.map(String::from);
                Ok(())
            }
            None => Err(Error::NotFound(format!("tag {uid}"))),
        }
    }

    async fn set_tag_alias(&self, uid: &str, alias: Option<&str>) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("set_tag_alias {uid} {alias:?}"));
        match state.tags.iter_mut().find(|t| t.uid == uid) {
            Some(tag) => {
                tag.alias = alias.map(String::from);
                Ok(())
            }
            None => Err(Error::NotFound(format!("tag {uid}"))),
        }
    }

    async fn get_box_tags(&self, box_id: &str) -> Result<Vec<Tag>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("get_box_tags {box_id}"));
        let uids: Vec<String> = state
            .assignments
            .iter()
            .filter(|(_, b)| b.as_str() == box_id)
            .map(|(uid, _)| uid.clone())
            .collect();
        Ok(state
            .tags
            .iter()
            .filter(|t| uids.contains(&t.uid))
            .cloned()
            .collect())
    }

    async fn get_box_local_tags(&self, box_id: &str) -> Result<Vec<BoxLocalTag>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("get_box_local_tags {box_id}"));
        Ok(state.local_tags.get(box_id).cloned().unwrap_or_default())
    }

    async fn assign_tag(&self, uid: &str, box_id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("assign_tag {uid} {box_id}"));
        if let Some(failure) = state.fail_assign.take() {
            return Err(failure.into_error(uid));
        }
        // Assign supersedes any prior assignment
        state
            .assignments
            .insert(uid.to_string(), box_id.to_string());
        Ok(())
    }

    async fn unassign_tag(&self, uid: &str, box_id: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("unassign_tag {uid} {box_id}"));
        state.assignments.remove(uid);
        Ok(())
    }

    async fn pull_tag_from_box(&self, box_id: &str, uid: &str, target_folder: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state
            .calls
            .push(format!("pull_tag_from_box {box_id} {uid} {target_folder}"));
        Ok(())
    }

    async fn get_tag_blocks(&self, box_id: &str) -> Result<Vec<String>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("get_tag_blocks {box_id}"));
        Ok(state
            .blocks
            .get(box_id)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn set_tag_block(&self, box_id: &str, uid: &str, blocked: bool) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state
            .calls
            .push(format!("set_tag_block {box_id} {uid} {blocked}"));
        if let Some(failure) = state.fail_block.take() {
            return Err(failure.into_error(uid));
        }
        let set = state.blocks.entry(box_id.to_string()).or_default();
        if blocked {
            set.insert(uid.to_string());
        } else {
            set.remove(uid);
        }
        Ok(())
    }

    async fn send_command(&self, box_id: &str, command: NfcCommand, uid: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state
            .calls
            .push(format!("send_command {box_id} {} {uid}", command.as_str()));
        if let Some(failure) = state.fail_command.take() {
            return Err(failure.into_error(uid));
        }
        Ok(())
    }

    async fn get_status(&self, box_id: &str) -> Result<BoxStatus> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(format!("get_status {box_id}"));
        Ok(state.status.get(box_id).cloned().unwrap_or(BoxStatus {
            last_nfc: None,
            last_nfc_at: None,
        }))
    }

    async fn set_box_alias(&self, box_id: &str, alias: Option<&str>) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state
            .calls
            .push(format!("set_box_alias {box_id} {alias:?}"));
        Ok(())
    }
}
