//! Connascence of identity: several functions rebinding one module-level
//! name, so all of them depend on sharing exactly that object.

use std::collections::{BTreeMap, BTreeSet};

use crate::analysis::facts::FactKind;
use crate::analysis::{FactSet, Span};
use crate::policy::Limits;

use super::{CandidateViolation, ConnascenceKind};

pub fn detect(facts: &FactSet, _limits: &Limits) -> Vec<CandidateViolation> {
    let mut declared: BTreeMap<&str, Span> = BTreeMap::new();
    let mut writers: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    let mut write_spans: BTreeMap<&str, Vec<Span>> = BTreeMap::new();

    for fact in &facts.facts {
        let FactKind::GlobalAssign { name, in_function } = &fact.kind else {
            continue;
        };
        match in_function {
            None => {
                declared.entry(name).or_insert_with(|| fact.span.clone());
            }
            Some(function) => {
                writers.entry(name).or_default().insert(function);
                write_spans.entry(name).or_default().push(fact.span.clone());
            }
        }
    }

    let mut out = Vec::new();
    for (name, functions) in writers {
        if functions.len() < 2 {
            continue;
        }
        // Only names with a module-level binding are true globals; a local
        // assigned in two functions is a coincidence of naming.
        let Some(decl_span) = declared.get(name) else {
            continue;
        };
        let list: Vec<&str> = functions.iter().copied().collect();
        out.push(CandidateViolation {
            kind: ConnascenceKind::Identity,
            file: facts.path.clone(),
            span: decl_span.clone(),
            description: format!(
                "global '{}' is reassigned by {} functions ({})",
                name,
                functions.len(),
                list.join(", ")
            ),
            remediation: format!(
                "pass '{}' explicitly or wrap it in an owning type",
                name
            ),
            confidence: 0.8,
            magnitude: functions.len() as u32,
            extra_spans: write_spans.remove(name).unwrap_or_default(),
        });
    }
    out
}
