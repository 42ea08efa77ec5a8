//! Threat-detection engine support beyond the pattern pipeline: scoring,
//! the per-user conversation state machine, response selection, alerting,
//! and the blocklist (§4.2-§4.6).

pub mod alert;
pub mod blocklist;
pub mod response;
pub mod scorer;
pub mod state_machine;

pub use alert::{AlertManager, AlertRequest, AlertSink, AlertSinkError, LogSink, MemoryAlertSink};
pub use blocklist::{anonymize_user_id, BlockDuration, Blocklist, BlocklistStore, BlocklistStoreError, InMemoryBlocklistStore};
pub use response::{ModelCallBudget, ModelCollaborator, ResponseStrategy, MODEL_STOP_SEQUENCES};
pub use scorer::{score_turn, BreakdownEntry, Level, ScoreResult};
pub use state_machine::{ConversationState, HistoricalFinding, TurnOutcome};
