//! Core finding types shared by every detector.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::analysis::Span;

/// The coupling taxonomies a detector can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnascenceKind {
    Name,
    Type,
    Meaning,
    Position,
    Algorithm,
    Execution,
    Timing,
    Value,
    Identity,
    GodObject,
}

impl ConnascenceKind {
    pub const ALL: [ConnascenceKind; 10] = [
        ConnascenceKind::Name,
        ConnascenceKind::Type,
        ConnascenceKind::Meaning,
        ConnascenceKind::Position,
        ConnascenceKind::Algorithm,
        ConnascenceKind::Execution,
        ConnascenceKind::Timing,
        ConnascenceKind::Value,
        ConnascenceKind::Identity,
        ConnascenceKind::GodObject,
    ];

    /// Short code used as the rule identifier in reports.
    pub fn code(&self) -> &'static str {
        match self {
            ConnascenceKind::Name => "CoN",
            ConnascenceKind::Type => "CoT",
            ConnascenceKind::Meaning => "CoM",
            ConnascenceKind::Position => "CoP",
            ConnascenceKind::Algorithm => "CoA",
            ConnascenceKind::Execution => "CoE",
            ConnascenceKind::Timing => "CoTi",
            ConnascenceKind::Value => "CoV",
            ConnascenceKind::Identity => "CoI",
            ConnascenceKind::GodObject => "GOD",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConnascenceKind::Name => "connascence of name",
            ConnascenceKind::Type => "connascence of type",
            ConnascenceKind::Meaning => "connascence of meaning",
            ConnascenceKind::Position => "connascence of position",
            ConnascenceKind::Algorithm => "connascence of algorithm",
            ConnascenceKind::Execution => "connascence of execution",
            ConnascenceKind::Timing => "connascence of timing",
            ConnascenceKind::Value => "connascence of value",
            ConnascenceKind::Identity => "connascence of identity",
            ConnascenceKind::GodObject => "god object",
        }
    }
}

impl fmt::Display for ConnascenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Finding severity, ordered from least to most severe.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        };
        f.write_str(s)
    }
}

/// A raw detector finding, before policy evaluation.
///
/// Detectors report a magnitude (how far past the configured limit the code
/// is) and a confidence; the policy engine alone decides the severity.
#[derive(Debug, Clone)]
pub struct CandidateViolation {
    pub kind: ConnascenceKind,
    pub file: String,
    pub span: Span,
    pub description: String,
    pub remediation: String,
    pub confidence: f64,
    pub magnitude: u32,
    /// Additional occurrence sites folded into this finding.
    pub extra_spans: Vec<Span>,
}

/// A secondary occurrence site attached to an aggregated violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

/// A policy-evaluated finding, as emitted in reports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    /// Stable fingerprint; survives unrelated edits elsewhere in the file.
    pub id: String,
    pub kind: ConnascenceKind,
    pub severity: Severity,
    pub file: String,
    pub line: usize,
    pub column: usize,
    pub end_line: usize,
    pub description: String,
    pub remediation: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<Location>,
}

/// Stable identifier for a finding.
///
/// FNV-1a over the rule code, file path, position and a description prefix,
/// truncated to 12 hex digits.
pub fn fingerprint(kind: ConnascenceKind, file: &str, span: &Span, description: &str) -> String {
    let prefix: String = description.chars().take(64).collect();
    let key = format!(
        "{}|{}|{}|{}|{}",
        kind.code(),
        file,
        span.start_line,
        span.start_col,
        prefix
    );
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in key.as_bytes() {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    format!("{:012x}", hash & 0xffff_ffff_ffff)
}

/// A non-fatal problem encountered during a scan.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanNote {
    pub file: String,
    pub kind: NoteKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteKind {
    Unparseable,
    Io,
    DetectorFailed,
    Unsupported,
}
