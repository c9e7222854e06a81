//! Connascence of position: long positional parameter lists.

use crate::analysis::facts::FactKind;
use crate::analysis::FactSet;
use crate::policy::Limits;

use super::{CandidateViolation, ConnascenceKind};

pub fn detect(facts: &FactSet, limits: &Limits) -> Vec<CandidateViolation> {
    let mut out = Vec::new();
    for fact in facts.signatures() {
        let FactKind::FunctionSig {
            name,
            class_name,
            positional_params,
            keyword_only,
            ..
        } = &fact.kind
        else {
            continue;
        };
        if *keyword_only || *positional_params <= limits.max_positional_params {
            continue;
        }
        let overage = (*positional_params - limits.max_positional_params) as u32;
        let qualified = match class_name {
            Some(class) => format!("{class}.{name}"),
            None => name.clone(),
        };
        out.push(CandidateViolation {
            kind: ConnascenceKind::Position,
            file: facts.path.clone(),
            span: fact.span.clone(),
            description: format!(
                "function '{}' takes {} positional parameters (limit {})",
                qualified, positional_params, limits.max_positional_params
            ),
            remediation: format!(
                "group parameters of '{}' into a parameter object or make them keyword-only",
                qualified
            ),
            confidence: 1.0,
            magnitude: overage,
            extra_spans: Vec::new(),
        });
    }
    // Callers threading long positional argument lists couple on order just
    // as hard as the callee's declaration does.
    for fact in &facts.facts {
        let FactKind::CallSite {
            callee,
            positional_args,
            ..
        } = &fact.kind
        else {
            continue;
        };
        if *positional_args <= limits.max_positional_params {
            continue;
        }
        out.push(CandidateViolation {
            kind: ConnascenceKind::Position,
            file: facts.path.clone(),
            span: fact.span.clone(),
            description: format!(
                "call to '{}' passes {} positional arguments (limit {})",
                callee, positional_args, limits.max_positional_params
            ),
            remediation: format!("pass the arguments of '{}' by keyword", callee),
            confidence: 0.8,
            magnitude: (*positional_args - limits.max_positional_params) as u32,
            extra_spans: Vec::new(),
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::testutil::{fact_set, signature, span_at};

    #[test]
    fn test_eight_params_one_finding() {
        let mut facts = fact_set("python");
        facts.push(signature("configure", None, 8, false), span_at(1));
        let found = detect(&facts, &Limits::default());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].magnitude, 4);
    }

    #[test]
    fn test_at_limit_not_flagged() {
        let mut facts = fact_set("python");
        facts.push(signature("ok", None, 4, false), span_at(1));
        assert!(detect(&facts, &Limits::default()).is_empty());
    }

    #[test]
    fn test_keyword_only_exempt() {
        let mut facts = fact_set("python");
        facts.push(signature("kw", None, 8, true), span_at(1));
        assert!(detect(&facts, &Limits::default()).is_empty());
    }

    #[test]
    fn test_long_call_site_flagged() {
        let mut facts = fact_set("python");
        facts.push(
            FactKind::CallSite {
                callee: "connect".to_string(),
                positional_args: 7,
                keyword_args: 0,
            },
            span_at(9),
        );
        let found = detect(&facts, &Limits::default());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].magnitude, 3);
        assert!(found[0].description.contains("'connect'"));
    }

    #[test]
    fn test_method_name_qualified() {
        let mut facts = fact_set("python");
        facts.push(
            signature("handle", Some("Server".to_string()), 6, false),
            span_at(3),
        );
        let found = detect(&facts, &Limits::default());
        assert!(found[0].description.contains("Server.handle"));
    }
}
