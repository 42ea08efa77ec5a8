//! Detection Pipeline (§4.1): normalization plus the six built-in detector
//! kinds, wired together by [`pipeline::DetectionPipeline`].
//!
//! Normalization runs as a first pass, pattern detectors run as a
//! two-pass `RegexSet`-then-`Regex` engine, and a failing detector
//! degrades gracefully rather than aborting the turn.

pub mod detector;
pub mod detectors;
pub mod error;
pub mod input;
pub mod normalize;
pub mod patterns;
pub mod pipeline;

pub use detector::{Detector, PatternDetector};
pub use detectors::builtin_detectors;
pub use error::DetectorError;
pub use input::DetectionInput;
pub use normalize::normalize;
pub use pipeline::DetectionPipeline;
