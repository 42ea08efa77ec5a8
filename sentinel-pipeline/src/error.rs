//! Errors a detector can raise. Distinct from a "finding" — this means the
//! detector *could not complete its analysis*.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DetectorError {
    /// A regex pattern in the detector's table failed to compile. Only
    /// possible when a caller supplies custom patterns at runtime — the
    /// built-in table is covered by a compile-time test.
    #[error("detector '{detector}' failed to compile pattern '{pattern_id}': {source}")]
    PatternCompile {
        detector: String,
        pattern_id: String,
        #[source]
        source: regex::Error,
    },

    /// Content exceeded the detector's configured size limit.
    #[error("detector '{detector}' refused content of {size} bytes (limit {limit})")]
    ContentTooLarge {
        detector: String,
        size: usize,
        limit: usize,
    },
}
