//! Scan orchestration.
//!
//! Files are independent: each one is read, parsed, distilled into facts and
//! run through the detectors on its own, so the per-file work fans out across
//! a rayon pool. Everything that can go wrong with a single file is recorded
//! as a note and the scan moves on; only a broken policy aborts the run.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use rayon::prelude::*;

use crate::aggregate::aggregate;
use crate::analysis::frontend_for_extension;
use crate::detect::{run_detectors, NoteKind, ScanNote, Violation};
use crate::policy::{evaluate, Policy};
use crate::report::{Report, RunMetadata};

#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Run file tasks sequentially instead of on the rayon pool.
    pub sequential: bool,
    /// Cooperative cancellation flag, checked before each file task.
    pub cancel: Option<Arc<AtomicBool>>,
}

#[derive(Default)]
struct FileOutcome {
    violations: Vec<Violation>,
    notes: Vec<ScanNote>,
    unhandled_nodes: usize,
    scanned: bool,
    cancelled: bool,
}

fn note(path: &Path, kind: NoteKind, message: String) -> ScanNote {
    ScanNote {
        file: path.display().to_string(),
        kind,
        message,
    }
}

fn scan_one(path: &Path, policy: &Policy) -> FileOutcome {
    let mut outcome = FileOutcome::default();

    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    let Some(frontend) = frontend_for_extension(&ext) else {
        outcome.notes.push(note(
            path,
            NoteKind::Unsupported,
            format!("no front end for extension '.{ext}'"),
        ));
        return outcome;
    };

    let source = match fs::read(path) {
        Ok(source) => source,
        Err(err) => {
            outcome
                .notes
                .push(note(path, NoteKind::Io, format!("read failed: {err}")));
            return outcome;
        }
    };

    let parsed = match frontend.parse(path, &source) {
        Ok(parsed) => parsed,
        Err(err) => {
            outcome
                .notes
                .push(note(path, NoteKind::Unparseable, err.to_string()));
            return outcome;
        }
    };
    if parsed.has_errors() {
        let position = parsed
            .first_error()
            .map(|(line, col)| format!(" near {line}:{col}"))
            .unwrap_or_default();
        outcome.notes.push(note(
            path,
            NoteKind::Unparseable,
            format!("syntax error{position}; file skipped"),
        ));
        return outcome;
    }

    let facts = match frontend.extract_facts(&parsed) {
        Ok(facts) => facts,
        Err(err) => {
            outcome.notes.push(note(
                path,
                NoteKind::DetectorFailed,
                format!("fact extraction failed: {err}"),
            ));
            return outcome;
        }
    };
    // Only files whose facts reached the detectors count as scanned.
    outcome.scanned = true;
    outcome.unhandled_nodes = facts.unhandled_nodes;

    let (candidates, detector_notes) = run_detectors(&facts, policy);
    outcome.notes.extend(detector_notes);
    outcome.violations = candidates
        .iter()
        .filter_map(|candidate| evaluate(candidate, policy))
        .collect();
    outcome
}

/// Scan the given files under one policy and assemble a report.
pub fn scan_files(files: &[PathBuf], policy: &Policy, options: &ScanOptions) -> Result<Report> {
    // A bad policy fails the whole run before any file is touched.
    policy.validate()?;
    let started = Instant::now();

    let task = |path: &PathBuf| -> FileOutcome {
        if let Some(cancel) = &options.cancel {
            if cancel.load(Ordering::Relaxed) {
                return FileOutcome {
                    cancelled: true,
                    ..FileOutcome::default()
                };
            }
        }
        scan_one(path, policy)
    };

    let outcomes: Vec<FileOutcome> = if options.sequential {
        files.iter().map(task).collect()
    } else {
        files.par_iter().map(task).collect()
    };

    let mut violations = Vec::new();
    let mut notes = Vec::new();
    let mut files_scanned = 0;
    let mut unhandled_nodes = 0;
    let mut partial = false;
    for outcome in outcomes {
        violations.extend(outcome.violations);
        notes.extend(outcome.notes);
        unhandled_nodes += outcome.unhandled_nodes;
        if outcome.scanned {
            files_scanned += 1;
        }
        if outcome.cancelled {
            partial = true;
        }
    }
    notes.sort_by(|a, b| a.file.cmp(&b.file));

    let metadata = RunMetadata {
        policy: policy.name.clone(),
        files_scanned,
        duration_ms: started.elapsed().as_millis() as u64,
        partial,
        notes,
        unhandled_nodes,
    };
    Ok(aggregate(violations, metadata))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &tempfile::TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_magic_number_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "circle.py",
            "def area(r):\n    return r * r * 3.14159\n",
        );
        let report =
            scan_files(&[path], &Policy::standard(), &ScanOptions::default()).unwrap();
        assert_eq!(report.summary.total, 1);
        let v = &report.violations[0];
        assert_eq!(v.line, 2);
        assert!(v.description.contains("3.14159"));
    }

    #[test]
    fn test_syntax_error_noted_and_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let good = write_file(&dir, "ok.py", "x = compute()\n");
        let bad = write_file(&dir, "broken.py", "def f(:\n");
        let report = scan_files(
            &[good, bad],
            &Policy::standard(),
            &ScanOptions::default(),
        )
        .unwrap();
        assert_eq!(report.metadata.files_scanned, 1);
        assert!(report
            .metadata
            .notes
            .iter()
            .any(|n| n.kind == NoteKind::Unparseable));
        assert!(!report.metadata.partial);
    }

    #[test]
    fn test_cancellation_marks_partial() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "a.py", "x = 1\n");
        let cancel = Arc::new(AtomicBool::new(true));
        let options = ScanOptions {
            sequential: true,
            cancel: Some(cancel),
        };
        let report = scan_files(&[path], &Policy::standard(), &options).unwrap();
        assert!(report.metadata.partial);
        assert_eq!(report.metadata.files_scanned, 0);
        assert_eq!(report.summary.total, 0);
    }

    #[test]
    fn test_invalid_policy_aborts() {
        let mut policy = Policy::standard();
        policy.rules.clear();
        assert!(scan_files(&[], &policy, &ScanOptions::default()).is_err());
    }

    #[test]
    fn test_unsupported_extension_noted() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "notes.txt", "hello\n");
        let report =
            scan_files(&[path], &Policy::standard(), &ScanOptions::default()).unwrap();
        assert!(report
            .metadata
            .notes
            .iter()
            .any(|n| n.kind == NoteKind::Unsupported));
        assert_eq!(report.metadata.files_scanned, 0);
    }

    #[test]
    fn test_unclassified_constructs_surface_in_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "dispatch.py",
            "def pick(x):\n    match x:\n        case 1:\n            return 1\n        case _:\n            return 0\n",
        );
        let report =
            scan_files(&[path], &Policy::standard(), &ScanOptions::default()).unwrap();
        assert_eq!(report.metadata.files_scanned, 1);
        assert!(report.metadata.unhandled_nodes > 0);
    }
}
