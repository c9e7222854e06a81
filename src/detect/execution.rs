//! Connascence of execution: classes whose methods must run in order.
//!
//! A class exposing paired setup and teardown around regular methods forces
//! every caller to know the calling sequence.

use std::collections::BTreeMap;

use crate::analysis::facts::{FactKind, LifecycleRole};
use crate::analysis::{FactSet, Span};
use crate::policy::Limits;

use super::{CandidateViolation, ConnascenceKind};

#[derive(Default)]
struct Lifecycle {
    setup: Option<(String, Span)>,
    teardown: Option<(String, Span)>,
    regular: usize,
}

pub fn detect(facts: &FactSet, _limits: &Limits) -> Vec<CandidateViolation> {
    let mut classes: BTreeMap<String, Lifecycle> = BTreeMap::new();
    for fact in &facts.facts {
        let FactKind::LifecycleMethod {
            class_name,
            method,
            role,
        } = &fact.kind
        else {
            continue;
        };
        let entry = classes.entry(class_name.clone()).or_default();
        match role {
            LifecycleRole::Setup => {
                if entry.setup.is_none() {
                    entry.setup = Some((method.clone(), fact.span.clone()));
                }
            }
            LifecycleRole::Teardown => {
                if entry.teardown.is_none() {
                    entry.teardown = Some((method.clone(), fact.span.clone()));
                }
            }
            LifecycleRole::Regular => entry.regular += 1,
        }
    }

    let mut out = Vec::new();
    for (class_name, lifecycle) in classes {
        let (Some((setup, setup_span)), Some((teardown, teardown_span))) =
            (lifecycle.setup, lifecycle.teardown)
        else {
            continue;
        };
        if lifecycle.regular == 0 {
            continue;
        }
        out.push(CandidateViolation {
            kind: ConnascenceKind::Execution,
            file: facts.path.clone(),
            span: setup_span,
            description: format!(
                "class '{}' requires '{}' before and '{}' after its {} regular method(s)",
                class_name, setup, teardown, lifecycle.regular
            ),
            remediation: format!(
                "manage the '{}' lifecycle with a context manager or guard object",
                class_name
            ),
            confidence: 0.7,
            magnitude: 3,
            extra_spans: vec![teardown_span],
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::testutil::{fact_set, span_at};

    fn lifecycle(class: &str, method: &str, role: LifecycleRole) -> FactKind {
        FactKind::LifecycleMethod {
            class_name: class.to_string(),
            method: method.to_string(),
            role,
        }
    }

    #[test]
    fn test_full_lifecycle_flagged() {
        let mut facts = fact_set("python");
        facts.push(lifecycle("Conn", "__init__", LifecycleRole::Setup), span_at(2));
        facts.push(lifecycle("Conn", "close", LifecycleRole::Teardown), span_at(20));
        facts.push(lifecycle("Conn", "query", LifecycleRole::Regular), span_at(10));
        let found = detect(&facts, &Limits::default());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].magnitude, 3);
        assert!(found[0].description.contains("__init__"));
    }

    #[test]
    fn test_setup_without_teardown_clean() {
        let mut facts = fact_set("python");
        facts.push(lifecycle("C", "__init__", LifecycleRole::Setup), span_at(2));
        facts.push(lifecycle("C", "run", LifecycleRole::Regular), span_at(5));
        assert!(detect(&facts, &Limits::default()).is_empty());
    }

    #[test]
    fn test_no_regular_methods_clean() {
        let mut facts = fact_set("python");
        facts.push(lifecycle("Guard", "start", LifecycleRole::Setup), span_at(2));
        facts.push(lifecycle("Guard", "stop", LifecycleRole::Teardown), span_at(8));
        assert!(detect(&facts, &Limits::default()).is_empty());
    }
}
