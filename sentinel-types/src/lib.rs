//! Shared data model for the honeypot threat engine and fleet telemetry
//! pipeline.
//!
//! This crate holds the types every other crate in the workspace agrees on:
//! the persisted record shapes (`Bot`, `Session`, `Event`, `NovelPattern`,
//! `Alert`), the in-flight detection vocabulary (`Finding`, `DetectionType`),
//! the conversation `Mode` state machine's labels, and the threshold
//! configuration that governs mode transitions. Nothing here has behavior
//! beyond construction, validation, and small pure helpers — the engines
//! that consume these types live in `sentinel-pipeline` and `sentinel-core`.

pub mod alert;
pub mod blocklist;
pub mod bot;
pub mod detection;
pub mod event;
pub mod hashing;
pub mod mode;
pub mod pattern;
pub mod session;
pub mod threshold;

pub use alert::{Alert, AlertDetection};
pub use blocklist::BlocklistEntry;
pub use bot::{Bot, BotStatus};
pub use detection::{DetectionType, Finding};
pub use event::{Event, EventLevel, EventType};
pub use mode::Mode;
pub use pattern::{NovelPattern, NovelPatternSubmission};
pub use session::{Session, SessionPatch, Turn};
pub use threshold::{Sensitivity, ThresholdConfig, ThresholdError};
