//! God objects: classes that have accreted too many responsibilities.
//!
//! Declarations are merged by name before the limits apply, so a Rust type
//! with several impl blocks or a class reopened across a file is judged as
//! one unit.

use std::collections::BTreeMap;

use crate::analysis::facts::FactKind;
use crate::analysis::{FactSet, Span};
use crate::policy::Limits;

use super::{CandidateViolation, ConnascenceKind};

#[derive(Default)]
struct ClassTotals {
    methods: usize,
    lines: usize,
    span: Option<Span>,
}

pub fn detect(facts: &FactSet, limits: &Limits) -> Vec<CandidateViolation> {
    let mut totals: BTreeMap<String, ClassTotals> = BTreeMap::new();
    for fact in facts.classes() {
        let FactKind::ClassDecl {
            name,
            method_count,
            line_span,
        } = &fact.kind
        else {
            continue;
        };
        if name.is_empty() {
            continue;
        }
        let entry = totals.entry(name.clone()).or_default();
        entry.methods += method_count;
        entry.lines += line_span;
        if entry.span.is_none() {
            entry.span = Some(fact.span.clone());
        }
    }
    // Receiver methods declared outside any class body (Go) still count;
    // methods inside a recorded body were already counted by the front end.
    let declared: Vec<String> = totals.keys().cloned().collect();
    for fact in facts.signatures() {
        let FactKind::FunctionSig {
            class_name: Some(class_name),
            ..
        } = &fact.kind
        else {
            continue;
        };
        if declared.iter().any(|d| d == class_name) {
            continue;
        }
        let entry = totals.entry(class_name.clone()).or_default();
        entry.methods += 1;
        if entry.span.is_none() {
            entry.span = Some(fact.span.clone());
        }
    }

    let mut out = Vec::new();
    for (name, totals) in totals {
        let Some(span) = totals.span else { continue };
        let method_overage = totals.methods.saturating_sub(limits.god_class_methods);
        let line_overage = totals.lines.saturating_sub(limits.god_class_lines);
        if method_overage == 0 && line_overage == 0 {
            continue;
        }
        // Lines weigh in per hundred over the limit so huge-but-flat classes
        // still register.
        let magnitude = method_overage.max(line_overage.div_ceil(100)) as u32;
        let mut parts = Vec::new();
        if method_overage > 0 {
            parts.push(format!(
                "{} methods (limit {})",
                totals.methods, limits.god_class_methods
            ));
        }
        if line_overage > 0 {
            parts.push(format!(
                "{} lines (limit {})",
                totals.lines, limits.god_class_lines
            ));
        }
        out.push(CandidateViolation {
            kind: ConnascenceKind::GodObject,
            file: facts.path.clone(),
            span,
            description: format!("class '{}' has {}", name, parts.join(" and ")),
            remediation: format!("split '{}' along its responsibility seams", name),
            confidence: 0.9,
            magnitude,
            extra_spans: Vec::new(),
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::testutil::{fact_set, signature, span_at};

    fn class(name: &str, methods: usize, lines: usize) -> FactKind {
        FactKind::ClassDecl {
            name: name.to_string(),
            method_count: methods,
            line_span: lines,
        }
    }

    #[test]
    fn test_many_methods_one_finding() {
        let mut facts = fact_set("python");
        facts.push(class("Everything", 25, 200), span_at(1));
        let found = detect(&facts, &Limits::default());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].magnitude, 7);
        assert!(found[0].description.contains("25 methods"));
    }

    #[test]
    fn test_small_class_clean() {
        let mut facts = fact_set("python");
        facts.push(class("Tidy", 5, 80), span_at(1));
        assert!(detect(&facts, &Limits::default()).is_empty());
    }

    #[test]
    fn test_line_count_alone_triggers() {
        let mut facts = fact_set("python");
        facts.push(class("Sprawl", 3, 950), span_at(1));
        let found = detect(&facts, &Limits::default());
        assert_eq!(found.len(), 1);
        assert!(found[0].description.contains("950 lines"));
    }

    #[test]
    fn test_impl_blocks_merged() {
        let mut facts = fact_set("rust");
        facts.push(class("Engine", 10, 200), span_at(1));
        facts.push(class("Engine", 12, 250), span_at(300));
        let found = detect(&facts, &Limits::default());
        assert_eq!(found.len(), 1);
        assert!(found[0].description.contains("22 methods"));
    }

    #[test]
    fn test_go_receiver_methods_counted() {
        let mut facts = fact_set("go");
        for line in 0..20 {
            facts.push(
                signature("Do", Some("Server".to_string()), 1, false),
                span_at(line * 5 + 1),
            );
        }
        let found = detect(&facts, &Limits::default());
        assert_eq!(found.len(), 1);
        assert!(found[0].description.contains("20 methods"));
    }
}
