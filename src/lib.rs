//! conncheck: a connascence and coupling checker.
//!
//! The pipeline is a straight line: source files are parsed with
//! tree-sitter, distilled into flat per-file [`analysis::FactSet`]s, run
//! through pure [`detect`] functions, graded by a [`policy::Policy`], and
//! deduplicated into a [`report::Report`] rendered as text, JSON or SARIF.

pub mod aggregate;
pub mod analysis;
pub mod cli;
pub mod detect;
pub mod engine;
pub mod policy;
pub mod report;

pub use detect::{ConnascenceKind, Severity, Violation};
pub use engine::{scan_files, ScanOptions};
pub use policy::Policy;
pub use report::Report;
