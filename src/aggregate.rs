//! Deduplication and report assembly.
//!
//! Two findings of the same kind in the same file whose line ranges overlap
//! describe one problem; the merge keeps the most severe of the pair. The
//! merge is idempotent, so aggregating an already-aggregated set changes
//! nothing.

use crate::detect::{Location, Violation};
use crate::report::{Report, RunMetadata, Summary};

fn ranges_overlap(a: &Violation, b: &Violation) -> bool {
    a.line <= b.end_line && b.line <= a.end_line
}

fn merge_into(kept: &mut Violation, other: Violation) {
    kept.end_line = kept.end_line.max(other.end_line);
    if other.severity > kept.severity {
        // The id travels with the finding it fingerprints.
        kept.id = other.id;
        kept.severity = other.severity;
        kept.description = other.description;
        kept.remediation = other.remediation;
    }
    kept.locations.push(Location {
        line: other.line,
        column: other.column,
    });
    kept.locations.extend(other.locations);
    kept.locations.sort_by_key(|l| (l.line, l.column));
    kept.locations.dedup();
}

fn dedup(mut violations: Vec<Violation>) -> Vec<Violation> {
    violations.sort_by(|a, b| {
        (&a.file, a.kind, a.line, a.column).cmp(&(&b.file, b.kind, b.line, b.column))
    });
    let mut merged: Vec<Violation> = Vec::new();
    for violation in violations {
        match merged.last_mut() {
            Some(last)
                if last.file == violation.file
                    && last.kind == violation.kind
                    && ranges_overlap(last, &violation) =>
            {
                merge_into(last, violation);
            }
            _ => merged.push(violation),
        }
    }
    merged
}

/// Assemble the final report from raw evaluated violations.
pub fn aggregate(violations: Vec<Violation>, metadata: RunMetadata) -> Report {
    let mut violations = dedup(violations);
    violations.sort_by(|a, b| {
        (&a.file, a.line, a.kind, a.column).cmp(&(&b.file, b.line, b.kind, b.column))
    });
    let summary = Summary::of(&violations);
    Report {
        violations,
        summary,
        metadata,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::{ConnascenceKind, Severity};

    fn violation(
        kind: ConnascenceKind,
        file: &str,
        line: usize,
        end_line: usize,
        severity: Severity,
    ) -> Violation {
        Violation {
            id: format!("{}-{}-{}", kind.code(), file, line),
            kind,
            severity,
            file: file.to_string(),
            line,
            column: 0,
            end_line,
            description: format!("finding at {line}"),
            remediation: "fix".to_string(),
            locations: Vec::new(),
        }
    }

    fn metadata() -> RunMetadata {
        RunMetadata {
            policy: "standard".to_string(),
            files_scanned: 1,
            duration_ms: 0,
            partial: false,
            notes: Vec::new(),
            unhandled_nodes: 0,
        }
    }

    #[test]
    fn test_overlapping_same_kind_merged() {
        let report = aggregate(
            vec![
                violation(ConnascenceKind::GodObject, "a.py", 1, 60, Severity::Medium),
                violation(ConnascenceKind::GodObject, "a.py", 40, 90, Severity::High),
            ],
            metadata(),
        );
        assert_eq!(report.violations.len(), 1);
        assert_eq!(report.violations[0].severity, Severity::High);
        assert_eq!(report.violations[0].end_line, 90);
    }

    #[test]
    fn test_merge_keeps_winning_fingerprint() {
        let low = violation(ConnascenceKind::GodObject, "a.py", 1, 60, Severity::Medium);
        let high = violation(ConnascenceKind::GodObject, "a.py", 40, 90, Severity::High);
        let winner_id = high.id.clone();
        let report = aggregate(vec![low, high], metadata());
        assert_eq!(report.violations.len(), 1);
        assert_eq!(report.violations[0].id, winner_id);
        assert_eq!(report.violations[0].description, "finding at 40");
    }

    #[test]
    fn test_different_kinds_kept_apart() {
        let report = aggregate(
            vec![
                violation(ConnascenceKind::Meaning, "a.py", 5, 5, Severity::Medium),
                violation(ConnascenceKind::Position, "a.py", 5, 5, Severity::Medium),
            ],
            metadata(),
        );
        assert_eq!(report.violations.len(), 2);
    }

    #[test]
    fn test_disjoint_ranges_kept_apart() {
        let report = aggregate(
            vec![
                violation(ConnascenceKind::Meaning, "a.py", 5, 5, Severity::Medium),
                violation(ConnascenceKind::Meaning, "a.py", 50, 50, Severity::Medium),
            ],
            metadata(),
        );
        assert_eq!(report.violations.len(), 2);
    }

    #[test]
    fn test_aggregate_is_idempotent() {
        let first = aggregate(
            vec![
                violation(ConnascenceKind::GodObject, "a.py", 1, 60, Severity::Medium),
                violation(ConnascenceKind::GodObject, "a.py", 40, 90, Severity::High),
                violation(ConnascenceKind::Meaning, "b.py", 2, 2, Severity::Low),
            ],
            metadata(),
        );
        let again = aggregate(first.violations.clone(), metadata());
        assert_eq!(
            serde_json::to_string(&first.violations).unwrap(),
            serde_json::to_string(&again.violations).unwrap()
        );
    }

    #[test]
    fn test_output_sorted_by_file_then_line() {
        let report = aggregate(
            vec![
                violation(ConnascenceKind::Meaning, "b.py", 1, 1, Severity::Low),
                violation(ConnascenceKind::Meaning, "a.py", 9, 9, Severity::Low),
                violation(ConnascenceKind::Meaning, "a.py", 2, 2, Severity::Low),
            ],
            metadata(),
        );
        let order: Vec<(&str, usize)> = report
            .violations
            .iter()
            .map(|v| (v.file.as_str(), v.line))
            .collect();
        assert_eq!(order, vec![("a.py", 2), ("a.py", 9), ("b.py", 1)]);
    }
}
