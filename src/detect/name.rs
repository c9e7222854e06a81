//! Connascence of name: identifiers referenced so widely within a file
//! that renaming them is a minefield.

use std::collections::BTreeMap;

use crate::analysis::facts::FactKind;
use crate::analysis::{FactSet, Span};
use crate::policy::Limits;

use super::{CandidateViolation, ConnascenceKind};

fn countable(name: &str) -> bool {
    name.len() > 2 && !name.starts_with('_') && !matches!(name, "self" | "cls" | "this")
}

pub fn detect(facts: &FactSet, limits: &Limits) -> Vec<CandidateViolation> {
    let mut uses: BTreeMap<&str, (usize, Span)> = BTreeMap::new();
    for fact in &facts.facts {
        let FactKind::NameUse { name } = &fact.kind else {
            continue;
        };
        if !countable(name) {
            continue;
        }
        uses.entry(name)
            .and_modify(|(count, _)| *count += 1)
            .or_insert((1, fact.span.clone()));
    }

    let mut out = Vec::new();
    for (name, (count, first_span)) in uses {
        if count <= limits.max_name_uses {
            continue;
        }
        out.push(CandidateViolation {
            kind: ConnascenceKind::Name,
            file: facts.path.clone(),
            span: first_span,
            description: format!(
                "identifier '{}' is referenced {} times (limit {})",
                name, count, limits.max_name_uses
            ),
            remediation: format!(
                "narrow the scope of '{}' or split the responsibilities that keep reaching for it",
                name
            ),
            confidence: 0.6,
            magnitude: (count - limits.max_name_uses) as u32,
            extra_spans: Vec::new(),
        });
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::testutil::{fact_set, span_at};

    fn name_use(name: &str) -> FactKind {
        FactKind::NameUse {
            name: name.to_string(),
        }
    }

    #[test]
    fn test_heavy_use_flagged() {
        let mut facts = fact_set("python");
        for line in 1..=20 {
            facts.push(name_use("config"), span_at(line));
        }
        let found = detect(&facts, &Limits::default());
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].magnitude, 5);
        assert_eq!(found[0].span.start_line, 1);
    }

    #[test]
    fn test_short_names_ignored() {
        let mut facts = fact_set("python");
        for line in 1..=40 {
            facts.push(name_use("db"), span_at(line));
        }
        assert!(detect(&facts, &Limits::default()).is_empty());
    }

    #[test]
    fn test_self_ignored() {
        let mut facts = fact_set("python");
        for line in 1..=40 {
            facts.push(name_use("self"), span_at(line));
        }
        assert!(detect(&facts, &Limits::default()).is_empty());
    }

    #[test]
    fn test_at_limit_clean() {
        let mut facts = fact_set("python");
        for line in 1..=15 {
            facts.push(name_use("handler"), span_at(line));
        }
        assert!(detect(&facts, &Limits::default()).is_empty());
    }
}
