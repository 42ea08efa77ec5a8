//! Reporter errors. Per §7, outbound failures degrade to re-queuing —
//! nothing here is meant to propagate to the conversation path.

#[derive(Debug, thiserror::Error)]
pub enum ReporterError {
    #[error("request to central service failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("central service returned non-2xx status {status}")]
    NonSuccessStatus { status: reqwest::StatusCode },
}
