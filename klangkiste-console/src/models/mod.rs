//! Data models for the console core

pub mod session;
pub mod tag;

pub use session::{NoticeKind, UidMode, ValidationNotice, WizardSession, WizardStep};
pub use tag::{BoxLocalTag, Tag, TagStatus};
