//! Connascence of algorithm: structurally duplicated function bodies.
//!
//! Bodies are compared as bigram sets over their normalized operation
//! sequences; Jaccard similarity at or above the policy threshold flags the
//! pair. Short bodies are skipped since trivial functions look alike by
//! nature.

use std::collections::HashSet;

use crate::analysis::facts::FactKind;
use crate::analysis::{FactSet, Span};
use crate::policy::Limits;

use super::{CandidateViolation, ConnascenceKind};

struct Body<'a> {
    function: &'a str,
    bigrams: HashSet<(&'a str, &'a str)>,
    span: Span,
}

fn bigrams(ops: &[String]) -> HashSet<(&str, &str)> {
    ops.windows(2)
        .map(|w| (w[0].as_str(), w[1].as_str()))
        .collect()
}

fn jaccard(a: &HashSet<(&str, &str)>, b: &HashSet<(&str, &str)>) -> f64 {
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    if union == 0 {
        return 0.0;
    }
    intersection as f64 / union as f64
}

pub fn detect(facts: &FactSet, limits: &Limits) -> Vec<CandidateViolation> {
    let bodies: Vec<Body> = facts
        .facts
        .iter()
        .filter_map(|fact| match &fact.kind {
            FactKind::BodyShape { function, ops } if ops.len() >= limits.min_duplicate_ops => {
                Some(Body {
                    function,
                    bigrams: bigrams(ops),
                    span: fact.span.clone(),
                })
            }
            _ => None,
        })
        .collect();

    let mut out = Vec::new();
    for (i, a) in bodies.iter().enumerate() {
        for b in &bodies[i + 1..] {
            let similarity = jaccard(&a.bigrams, &b.bigrams);
            if similarity < limits.duplicate_similarity {
                continue;
            }
            let magnitude = if similarity >= 0.95 { 3 } else { 2 };
            out.push(CandidateViolation {
                kind: ConnascenceKind::Algorithm,
                file: facts.path.clone(),
                span: a.span.clone(),
                description: format!(
                    "functions '{}' and '{}' share near-identical structure ({:.0}% similar)",
                    a.function,
                    b.function,
                    similarity * 100.0
                ),
                remediation: format!(
                    "extract the shared logic of '{}' and '{}' into one helper",
                    a.function, b.function
                ),
                confidence: similarity.min(1.0),
                magnitude,
                extra_spans: vec![b.span.clone()],
            });
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::testutil::{fact_set, span_at};

    fn shape(function: &str, ops: &[&str]) -> FactKind {
        FactKind::BodyShape {
            function: function.to_string(),
            ops: ops.iter().map(|s| s.to_string()).collect(),
        }
    }

    const OPS: &[&str] = &["if", "call", "asgn", "loop", "call", "cmp", "ret"];

    #[test]
    fn test_identical_bodies_flagged() {
        let mut facts = fact_set("python");
        facts.push(shape("load_users", OPS), span_at(1));
        facts.push(shape("load_orders", OPS), span_at(40));
        let found = detect(&facts, &Limits::default());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].magnitude, 3);
        assert_eq!(found[0].extra_spans.len(), 1);
    }

    #[test]
    fn test_short_bodies_skipped() {
        let mut facts = fact_set("python");
        facts.push(shape("a", &["ret"]), span_at(1));
        facts.push(shape("b", &["ret"]), span_at(5));
        assert!(detect(&facts, &Limits::default()).is_empty());
    }

    #[test]
    fn test_dissimilar_bodies_clean() {
        let mut facts = fact_set("python");
        facts.push(shape("walk", OPS), span_at(1));
        facts.push(
            shape("draw", &["asgn", "bin", "asgn", "bin", "asgn", "bin", "asgn"]),
            span_at(40),
        );
        assert!(detect(&facts, &Limits::default()).is_empty());
    }

    #[test]
    fn test_threshold_respected() {
        let mut facts = fact_set("python");
        facts.push(shape("a", OPS), span_at(1));
        // One op changed out of seven; similar but below a lenient 0.95 bar.
        facts.push(
            shape("b", &["if", "call", "asgn", "loop", "call", "cmp", "raise"]),
            span_at(40),
        );
        let strict_limits = Limits {
            duplicate_similarity: 0.6,
            ..Limits::default()
        };
        let lenient_limits = Limits {
            duplicate_similarity: 0.95,
            ..Limits::default()
        };
        assert_eq!(detect(&facts, &strict_limits).len(), 1);
        assert!(detect(&facts, &lenient_limits).is_empty());
    }
}
