//! Connascence of meaning: magic literals.
//!
//! Every occurrence of the same value folds into a single finding so a
//! constant pasted across a file reads as one problem, not twenty.

use std::collections::BTreeMap;

use crate::analysis::facts::{FactKind, LiteralContext, LiteralValue};
use crate::analysis::{FactSet, Span};
use crate::policy::Limits;

use super::{CandidateViolation, ConnascenceKind};

struct Occurrence<'a> {
    value: &'a LiteralValue,
    context: LiteralContext,
    security_hint: bool,
    span: Span,
}

pub fn detect(facts: &FactSet, limits: &Limits) -> Vec<CandidateViolation> {
    let mut groups: BTreeMap<String, Vec<Occurrence>> = BTreeMap::new();
    for fact in &facts.facts {
        let FactKind::Literal {
            value,
            context,
            low_signal,
            security_hint,
        } = &fact.kind
        else {
            continue;
        };
        // Named constants are the remediation, not the problem.
        if *low_signal || *context == LiteralContext::ConstBinding {
            continue;
        }
        groups.entry(value.key()).or_default().push(Occurrence {
            value,
            context: *context,
            security_hint: *security_hint,
            span: fact.span.clone(),
        });
    }

    let mut out = Vec::new();
    for occurrences in groups.values() {
        let first = &occurrences[0];
        let count = occurrences.len();
        let in_comparison = occurrences
            .iter()
            .any(|o| o.context == LiteralContext::Comparison);
        let security = occurrences.iter().any(|o| o.security_hint);

        let mut magnitude = 2u32;
        if in_comparison {
            magnitude = 3;
        }
        if count >= limits.min_literal_occurrences {
            magnitude += 1;
        }
        if security {
            magnitude = 5;
        }

        let noun = match first.value {
            LiteralValue::Str(_) => "magic string",
            _ => "magic number",
        };
        let description = if count > 1 {
            format!("{} {} appears {} times", noun, first.value, count)
        } else {
            format!("{} {}", noun, first.value)
        };
        let confidence = match first.value {
            LiteralValue::Str(_) => 0.7,
            _ => 0.9,
        };

        out.push(CandidateViolation {
            kind: ConnascenceKind::Meaning,
            file: facts.path.clone(),
            span: first.span.clone(),
            description,
            remediation: format!("extract {} into a named constant", first.value),
            confidence,
            magnitude,
            extra_spans: occurrences[1..].iter().map(|o| o.span.clone()).collect(),
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::testutil::{fact_set, literal_at, span_at};

    #[test]
    fn test_single_magic_number_flagged() {
        let mut facts = fact_set("python");
        facts.push(
            literal_at(LiteralValue::Float(3.14159), LiteralContext::Expression),
            span_at(2),
        );
        let found = detect(&facts, &Limits::default());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].span.start_line, 2);
        assert_eq!(found[0].magnitude, 2);
    }

    #[test]
    fn test_low_signal_not_flagged() {
        let mut facts = fact_set("python");
        facts.push(
            FactKind::Literal {
                value: LiteralValue::Int(0),
                context: LiteralContext::Expression,
                low_signal: true,
                security_hint: false,
            },
            span_at(1),
        );
        assert!(detect(&facts, &Limits::default()).is_empty());
    }

    #[test]
    fn test_const_binding_not_flagged() {
        let mut facts = fact_set("python");
        facts.push(
            literal_at(LiteralValue::Int(86400), LiteralContext::ConstBinding),
            span_at(1),
        );
        assert!(detect(&facts, &Limits::default()).is_empty());
    }

    #[test]
    fn test_repeats_aggregate_into_one() {
        let mut facts = fact_set("python");
        for line in [2, 5, 9, 14, 30] {
            facts.push(
                literal_at(LiteralValue::Int(42), LiteralContext::Expression),
                span_at(line),
            );
        }
        let found = detect(&facts, &Limits::default());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].extra_spans.len(), 4);
        assert_eq!(found[0].magnitude, 3);
    }

    #[test]
    fn test_comparison_raises_magnitude() {
        let mut facts = fact_set("python");
        facts.push(
            literal_at(LiteralValue::Int(86400), LiteralContext::Comparison),
            span_at(4),
        );
        let found = detect(&facts, &Limits::default());
        assert_eq!(found[0].magnitude, 3);
    }

    #[test]
    fn test_security_hint_dominates() {
        let mut facts = fact_set("python");
        facts.push(
            FactKind::Literal {
                value: LiteralValue::Str("hunter2".to_string()),
                context: LiteralContext::Assignment,
                low_signal: false,
                security_hint: true,
            },
            span_at(7),
        );
        let found = detect(&facts, &Limits::default());
        assert_eq!(found[0].magnitude, 5);
    }

    #[test]
    fn test_int_and_float_same_value_stay_separate() {
        let mut facts = fact_set("python");
        facts.push(
            literal_at(LiteralValue::Int(7), LiteralContext::Expression),
            span_at(1),
        );
        facts.push(
            literal_at(LiteralValue::Float(7.0), LiteralContext::Expression),
            span_at(2),
        );
        assert_eq!(detect(&facts, &Limits::default()).len(), 2);
    }
}
