//! Connascence of value: mutable state shared across call sites or
//! instances, such as mutable default arguments and class-level containers.

use crate::analysis::facts::FactKind;
use crate::analysis::FactSet;
use crate::policy::Limits;

use super::{CandidateViolation, ConnascenceKind};

pub fn detect(facts: &FactSet, _limits: &Limits) -> Vec<CandidateViolation> {
    let mut out = Vec::new();
    for fact in &facts.facts {
        let FactKind::MutableSharedState { scope, name } = &fact.kind else {
            continue;
        };
        out.push(CandidateViolation {
            kind: ConnascenceKind::Value,
            file: facts.path.clone(),
            span: fact.span.clone(),
            description: format!("'{}' in '{}' is mutable state shared across uses", name, scope),
            remediation: format!("give each use of '{}' its own instance", name),
            confidence: 0.7,
            magnitude: 2,
            extra_spans: Vec::new(),
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::testutil::{fact_set, span_at};

    #[test]
    fn test_mutable_default_flagged() {
        let mut facts = fact_set("python");
        facts.push(
            FactKind::MutableSharedState {
                scope: "append_to".to_string(),
                name: "items".to_string(),
            },
            span_at(1),
        );
        let found = detect(&facts, &Limits::default());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].magnitude, 2);
    }

    #[test]
    fn test_no_shared_state_clean() {
        let facts = fact_set("python");
        assert!(detect(&facts, &Limits::default()).is_empty());
    }
}
