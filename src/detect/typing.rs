//! Connascence of type: public functions without parameter annotations in
//! languages where annotations are optional.

use crate::analysis::facts::FactKind;
use crate::analysis::FactSet;
use crate::policy::Limits;

use super::{CandidateViolation, ConnascenceKind};

pub fn detect(facts: &FactSet, _limits: &Limits) -> Vec<CandidateViolation> {
    // Statically typed sources never produce unannotated signatures, so this
    // only concerns Python and TypeScript in practice.
    if facts.language != "python" && facts.language != "typescript" {
        return Vec::new();
    }
    let mut out = Vec::new();
    for fact in facts.signatures() {
        let FactKind::FunctionSig {
            name,
            class_name,
            annotated: false,
            positional_params,
            ..
        } = &fact.kind
        else {
            continue;
        };
        if *positional_params == 0 {
            continue;
        }
        let qualified = match class_name {
            Some(class) => format!("{class}.{name}"),
            None => name.clone(),
        };
        out.push(CandidateViolation {
            kind: ConnascenceKind::Type,
            file: facts.path.clone(),
            span: fact.span.clone(),
            description: format!(
                "public function '{}' has unannotated parameters",
                qualified
            ),
            remediation: format!("annotate the parameters of '{}'", qualified),
            confidence: 0.9,
            magnitude: 1,
            extra_spans: Vec::new(),
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::testutil::{fact_set, span_at};

    fn sig(name: &str, annotated: bool, positional: usize) -> FactKind {
        FactKind::FunctionSig {
            name: name.to_string(),
            class_name: None,
            positional_params: positional,
            param_names: Vec::new(),
            keyword_only: false,
            annotated,
        }
    }

    #[test]
    fn test_unannotated_python_flagged() {
        let mut facts = fact_set("python");
        facts.push(sig("handle", false, 2), span_at(1));
        assert_eq!(detect(&facts, &Limits::default()).len(), 1);
    }

    #[test]
    fn test_annotated_clean() {
        let mut facts = fact_set("python");
        facts.push(sig("handle", true, 2), span_at(1));
        assert!(detect(&facts, &Limits::default()).is_empty());
    }

    #[test]
    fn test_other_languages_exempt() {
        let mut facts = fact_set("rust");
        facts.push(sig("handle", false, 2), span_at(1));
        assert!(detect(&facts, &Limits::default()).is_empty());
    }

    #[test]
    fn test_nullary_function_clean() {
        let mut facts = fact_set("python");
        facts.push(sig("tick", false, 0), span_at(1));
        assert!(detect(&facts, &Limits::default()).is_empty());
    }
}
