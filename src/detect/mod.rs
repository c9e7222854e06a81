//! Connascence detectors.
//!
//! Each detector is a pure function from one file's facts (plus the policy
//! limits) to candidate violations. Detectors never assign severities; that
//! is the policy engine's job.

pub mod algorithm;
pub mod execution;
pub mod god_object;
pub mod identity;
pub mod meaning;
pub mod name;
pub mod position;
mod runner;
pub mod timing;
mod types;
pub mod typing;
pub mod value;

pub use runner::{run_detectors, DETECTORS};
pub use types::{
    fingerprint, CandidateViolation, ConnascenceKind, Location, NoteKind, ScanNote, Severity,
    Violation,
};
