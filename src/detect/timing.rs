//! Connascence of timing: code whose correctness depends on wall-clock
//! delays or thread interleaving.

use crate::analysis::facts::FactKind;
use crate::analysis::FactSet;
use crate::policy::Limits;

use super::{CandidateViolation, ConnascenceKind};

pub fn detect(facts: &FactSet, _limits: &Limits) -> Vec<CandidateViolation> {
    let has_sync = facts
        .facts
        .iter()
        .any(|f| matches!(f.kind, FactKind::SyncPrimitive { .. }));
    let loop_spans: Vec<_> = facts
        .facts
        .iter()
        .filter(|f| matches!(f.kind, FactKind::Loop))
        .map(|f| f.span.clone())
        .collect();

    let mut out = Vec::new();
    for fact in &facts.facts {
        match &fact.kind {
            FactKind::SleepCall { callee } => {
                let in_loop = loop_spans.iter().any(|l| {
                    l.start_line <= fact.span.start_line && fact.span.end_line <= l.end_line
                });
                let (magnitude, description) = if in_loop {
                    (
                        3,
                        format!("'{}' inside a loop polls instead of waiting", callee),
                    )
                } else {
                    (2, format!("blocking delay via '{}'", callee))
                };
                out.push(CandidateViolation {
                    kind: ConnascenceKind::Timing,
                    file: facts.path.clone(),
                    span: fact.span.clone(),
                    description,
                    remediation: "replace fixed delays with events, conditions or timeouts"
                        .to_string(),
                    confidence: 0.8,
                    magnitude,
                    extra_spans: Vec::new(),
                });
            }
            FactKind::ThreadSpawn { callee } if !has_sync => {
                out.push(CandidateViolation {
                    kind: ConnascenceKind::Timing,
                    file: facts.path.clone(),
                    span: fact.span.clone(),
                    description: format!(
                        "'{}' starts concurrent work with no visible synchronization",
                        callee
                    ),
                    remediation: "coordinate spawned work with joins, channels or locks"
                        .to_string(),
                    confidence: 0.6,
                    magnitude: 3,
                    extra_spans: Vec::new(),
                });
            }
            FactKind::AwaitPoint { has_timeout: false } => {
                out.push(CandidateViolation {
                    kind: ConnascenceKind::Timing,
                    file: facts.path.clone(),
                    span: fact.span.clone(),
                    description: "await without a timeout can stall indefinitely".to_string(),
                    remediation: "bound the await with a timeout".to_string(),
                    confidence: 0.5,
                    magnitude: 2,
                    extra_spans: Vec::new(),
                });
            }
            _ => {}
        }
    }
    out
}
