//! Runs every enabled detector over one file's facts.
//!
//! A panicking detector is isolated: its findings for the file are lost and
//! a note is recorded, but the scan keeps going.

use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::analysis::FactSet;
use crate::policy::{Limits, Policy};

use super::{
    algorithm, execution, god_object, identity, meaning, name, position, timing, typing, value,
    CandidateViolation, ConnascenceKind, NoteKind, ScanNote,
};

type DetectorFn = fn(&FactSet, &Limits) -> Vec<CandidateViolation>;

pub const DETECTORS: [(ConnascenceKind, DetectorFn); 10] = [
    (ConnascenceKind::Name, name::detect),
    (ConnascenceKind::Type, typing::detect),
    (ConnascenceKind::Meaning, meaning::detect),
    (ConnascenceKind::Position, position::detect),
    (ConnascenceKind::Algorithm, algorithm::detect),
    (ConnascenceKind::Execution, execution::detect),
    (ConnascenceKind::Timing, timing::detect),
    (ConnascenceKind::Value, value::detect),
    (ConnascenceKind::Identity, identity::detect),
    (ConnascenceKind::GodObject, god_object::detect),
];

pub fn run_detectors(facts: &FactSet, policy: &Policy) -> (Vec<CandidateViolation>, Vec<ScanNote>) {
    let mut candidates = Vec::new();
    let mut notes = Vec::new();
    for (kind, detector) in DETECTORS {
        if !policy.rule_enabled(kind) {
            continue;
        }
        match catch_unwind(AssertUnwindSafe(|| detector(facts, &policy.limits))) {
            Ok(found) => candidates.extend(found),
            Err(_) => notes.push(ScanNote {
                file: facts.path.clone(),
                kind: NoteKind::DetectorFailed,
                message: format!("{} detector panicked", kind.code()),
            }),
        }
    }
    (candidates, notes)
}
