//! Policy configuration and severity assignment.
//!
//! Detectors report how far past a limit the code is; the policy alone maps
//! that magnitude to a severity through a monotonic step table. Policies come
//! from a built-in preset or a YAML/JSON file, and are validated up front so
//! a bad policy fails the whole run instead of silently skipping rules.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::detect::{
    fingerprint, CandidateViolation, ConnascenceKind, Location, Severity, Violation,
};

/// Numeric limits shared by the detectors.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Limits {
    /// Positional parameters a function may take before position coupling
    /// is reported.
    pub max_positional_params: usize,
    /// Methods a class may have before it is a god object.
    pub god_class_methods: usize,
    /// Source lines a class may span before it is a god object.
    pub god_class_lines: usize,
    /// Times one identifier may be referenced in a file before name
    /// coupling is reported.
    pub max_name_uses: usize,
    /// Body-shape similarity at or above which two functions are
    /// considered duplicated logic.
    pub duplicate_similarity: f64,
    /// Bodies shorter than this many operations are never compared.
    pub min_duplicate_ops: usize,
    /// Identical literal occurrences needed before a magic value is
    /// reported.
    pub min_literal_occurrences: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_positional_params: 4,
            god_class_methods: 18,
            god_class_lines: 500,
            max_name_uses: 15,
            duplicate_similarity: 0.85,
            min_duplicate_ops: 6,
            min_literal_occurrences: 3,
        }
    }
}

/// Magnitude thresholds for each severity, checked highest first.
///
/// A finding with magnitude below `low` is dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SeveritySteps {
    pub low: u32,
    pub medium: u32,
    pub high: u32,
    pub critical: u32,
}

impl Default for SeveritySteps {
    fn default() -> Self {
        Self {
            low: 1,
            medium: 2,
            high: 3,
            critical: 5,
        }
    }
}

impl SeveritySteps {
    pub fn classify(&self, magnitude: u32) -> Option<Severity> {
        if magnitude >= self.critical {
            Some(Severity::Critical)
        } else if magnitude >= self.high {
            Some(Severity::High)
        } else if magnitude >= self.medium {
            Some(Severity::Medium)
        } else if magnitude >= self.low {
            Some(Severity::Low)
        } else {
            None
        }
    }

    fn validate(&self, kind: ConnascenceKind) -> Result<()> {
        if self.low > self.medium || self.medium > self.high || self.high > self.critical {
            bail!(
                "severity steps for {} are not monotonic: {}/{}/{}/{}",
                kind.code(),
                self.low,
                self.medium,
                self.high,
                self.critical
            );
        }
        Ok(())
    }
}

/// Per-rule policy knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuleConfig {
    pub enabled: bool,
    /// Candidates below this confidence are dropped.
    pub min_confidence: f64,
    pub steps: SeveritySteps,
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_confidence: 0.5,
            steps: SeveritySteps::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Policy {
    pub name: String,
    pub limits: Limits,
    pub rules: BTreeMap<ConnascenceKind, RuleConfig>,
}

impl Default for Policy {
    fn default() -> Self {
        Self::standard()
    }
}

fn steps(low: u32, medium: u32, high: u32, critical: u32) -> SeveritySteps {
    SeveritySteps {
        low,
        medium,
        high,
        critical,
    }
}

fn rule(min_confidence: f64, steps: SeveritySteps) -> RuleConfig {
    RuleConfig {
        enabled: true,
        min_confidence,
        steps,
    }
}

impl Policy {
    /// Baseline rule table shared by the presets.
    fn base_rules(min_confidence: f64) -> BTreeMap<ConnascenceKind, RuleConfig> {
        let mut rules = BTreeMap::new();
        rules.insert(
            ConnascenceKind::Name,
            rule(min_confidence, steps(1, 5, 20, u32::MAX)),
        );
        rules.insert(
            ConnascenceKind::Type,
            rule(min_confidence, steps(1, u32::MAX, u32::MAX, u32::MAX)),
        );
        rules.insert(
            ConnascenceKind::Meaning,
            rule(min_confidence, SeveritySteps::default()),
        );
        rules.insert(
            ConnascenceKind::Position,
            rule(min_confidence, steps(1, 2, 4, 6)),
        );
        rules.insert(
            ConnascenceKind::Algorithm,
            rule(min_confidence, SeveritySteps::default()),
        );
        rules.insert(
            ConnascenceKind::Execution,
            rule(min_confidence, SeveritySteps::default()),
        );
        rules.insert(
            ConnascenceKind::Timing,
            rule(min_confidence, SeveritySteps::default()),
        );
        rules.insert(
            ConnascenceKind::Value,
            rule(min_confidence, SeveritySteps::default()),
        );
        rules.insert(
            ConnascenceKind::Identity,
            rule(min_confidence, SeveritySteps::default()),
        );
        rules.insert(
            ConnascenceKind::GodObject,
            rule(min_confidence, steps(1, 2, 4, 8)),
        );
        rules
    }

    /// Tight limits for code that must stay clean.
    pub fn strict() -> Self {
        let rules = Self::base_rules(0.4);
        Self {
            name: "strict".to_string(),
            limits: Limits {
                max_positional_params: 3,
                god_class_methods: 15,
                god_class_lines: 300,
                max_name_uses: 10,
                duplicate_similarity: 0.8,
                min_duplicate_ops: 6,
                min_literal_occurrences: 2,
            },
            rules,
        }
    }

    /// The default preset.
    pub fn standard() -> Self {
        let mut rules = Self::base_rules(0.5);
        // Missing annotations are only worth flagging under strict.
        if let Some(r) = rules.get_mut(&ConnascenceKind::Type) {
            r.enabled = false;
        }
        Self {
            name: "standard".to_string(),
            limits: Limits::default(),
            rules,
        }
    }

    /// Loose limits for legacy codebases being cleaned up incrementally.
    pub fn lenient() -> Self {
        let mut rules = Self::base_rules(0.7);
        if let Some(r) = rules.get_mut(&ConnascenceKind::Type) {
            r.enabled = false;
        }
        Self {
            name: "lenient".to_string(),
            limits: Limits {
                max_positional_params: 6,
                god_class_methods: 30,
                god_class_lines: 1000,
                max_name_uses: 25,
                duplicate_similarity: 0.95,
                min_duplicate_ops: 8,
                min_literal_occurrences: 5,
            },
            rules,
        }
    }

    pub fn preset_names() -> &'static [&'static str] {
        &["strict", "standard", "lenient"]
    }

    pub fn by_name(name: &str) -> Result<Self> {
        match name {
            "strict" => Ok(Self::strict()),
            "standard" => Ok(Self::standard()),
            "lenient" => Ok(Self::lenient()),
            other => bail!(
                "unknown policy '{}' (expected one of: {})",
                other,
                Self::preset_names().join(", ")
            ),
        }
    }

    /// Load a policy from a YAML or JSON file.
    ///
    /// Rules absent from the file inherit the standard preset's settings.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read policy file {}", path.display()))?;
        let is_json = path
            .extension()
            .map(|e| e.eq_ignore_ascii_case("json"))
            .unwrap_or(false);
        let mut policy: Policy = if is_json {
            serde_json::from_str(&raw)
                .with_context(|| format!("invalid policy file {}", path.display()))?
        } else {
            serde_yaml::from_str(&raw)
                .with_context(|| format!("invalid policy file {}", path.display()))?
        };
        let defaults = Self::standard();
        for kind in ConnascenceKind::ALL {
            policy
                .rules
                .entry(kind)
                .or_insert_with(|| defaults.rules[&kind].clone());
        }
        if policy.name.is_empty() {
            policy.name = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "custom".to_string());
        }
        policy.validate()?;
        Ok(policy)
    }

    /// Reject malformed policies before any file is scanned.
    pub fn validate(&self) -> Result<()> {
        for kind in ConnascenceKind::ALL {
            let Some(rule) = self.rules.get(&kind) else {
                bail!("policy '{}' has no rule entry for {}", self.name, kind.code());
            };
            rule.steps.validate(kind)?;
            if !(0.0..=1.0).contains(&rule.min_confidence) {
                bail!(
                    "policy '{}': min_confidence for {} must be within [0, 1]",
                    self.name,
                    kind.code()
                );
            }
        }
        if self.limits.max_positional_params == 0 {
            bail!("policy '{}': max_positional_params must be positive", self.name);
        }
        if self.limits.god_class_methods == 0 || self.limits.god_class_lines == 0 {
            bail!("policy '{}': god class limits must be positive", self.name);
        }
        if !(0.0..=1.0).contains(&self.limits.duplicate_similarity) {
            bail!(
                "policy '{}': duplicate_similarity must be within [0, 1]",
                self.name
            );
        }
        if self.limits.min_literal_occurrences < 2 {
            bail!(
                "policy '{}': min_literal_occurrences must be at least 2",
                self.name
            );
        }
        Ok(())
    }

    pub fn rule_enabled(&self, kind: ConnascenceKind) -> bool {
        self.rules.get(&kind).map(|r| r.enabled).unwrap_or(false)
    }
}

/// Apply a policy to one candidate.
///
/// Returns None when the rule is disabled, the confidence is too low, or the
/// magnitude does not reach the lowest severity step.
pub fn evaluate(candidate: &CandidateViolation, policy: &Policy) -> Option<Violation> {
    let rule = policy.rules.get(&candidate.kind)?;
    if !rule.enabled || candidate.confidence < rule.min_confidence {
        return None;
    }
    let severity = rule.steps.classify(candidate.magnitude)?;
    let locations = candidate
        .extra_spans
        .iter()
        .map(|s| Location {
            line: s.start_line,
            column: s.start_col,
        })
        .collect();
    Some(Violation {
        id: fingerprint(
            candidate.kind,
            &candidate.file,
            &candidate.span,
            &candidate.description,
        ),
        kind: candidate.kind,
        severity,
        file: candidate.file.clone(),
        line: candidate.span.start_line,
        column: candidate.span.start_col,
        end_line: candidate.span.end_line,
        description: candidate.description.clone(),
        remediation: candidate.remediation.clone(),
        locations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::Span;

    fn candidate(kind: ConnascenceKind, magnitude: u32, confidence: f64) -> CandidateViolation {
        CandidateViolation {
            kind,
            file: "m.py".to_string(),
            span: Span {
                start_byte: 0,
                end_byte: 0,
                start_line: 3,
                start_col: 0,
                end_line: 3,
                end_col: 10,
            },
            description: "test finding".to_string(),
            remediation: "fix it".to_string(),
            confidence,
            magnitude,
            extra_spans: Vec::new(),
        }
    }

    #[test]
    fn test_presets_validate() {
        Policy::strict().validate().unwrap();
        Policy::standard().validate().unwrap();
        Policy::lenient().validate().unwrap();
    }

    #[test]
    fn test_steps_classify_monotonic() {
        let steps = SeveritySteps::default();
        assert_eq!(steps.classify(0), None);
        assert_eq!(steps.classify(1), Some(Severity::Low));
        assert_eq!(steps.classify(2), Some(Severity::Medium));
        assert_eq!(steps.classify(3), Some(Severity::High));
        assert_eq!(steps.classify(4), Some(Severity::High));
        assert_eq!(steps.classify(5), Some(Severity::Critical));
    }

    #[test]
    fn test_evaluate_respects_confidence_floor() {
        let policy = Policy::standard();
        let candidate = candidate(ConnascenceKind::Meaning, 3, 0.2);
        assert!(evaluate(&candidate, &policy).is_none());
    }

    #[test]
    fn test_evaluate_disabled_rule() {
        let policy = Policy::standard();
        let candidate = candidate(ConnascenceKind::Type, 1, 0.9);
        assert!(evaluate(&candidate, &policy).is_none());
    }

    #[test]
    fn test_severity_never_decreases_with_magnitude() {
        let policy = Policy::standard();
        let mut previous = None;
        for magnitude in 0..12 {
            let c = candidate(ConnascenceKind::Position, magnitude, 0.9);
            let severity = evaluate(&c, &policy).map(|v| v.severity);
            assert!(severity >= previous);
            previous = severity;
        }
    }

    #[test]
    fn test_non_monotonic_steps_rejected() {
        let mut policy = Policy::standard();
        if let Some(r) = policy.rules.get_mut(&ConnascenceKind::Meaning) {
            r.steps = SeveritySteps {
                low: 5,
                medium: 2,
                high: 6,
                critical: 7,
            };
        }
        assert!(policy.validate().is_err());
    }

    #[test]
    fn test_missing_rule_rejected() {
        let mut policy = Policy::standard();
        policy.rules.remove(&ConnascenceKind::Timing);
        assert!(policy.validate().is_err());
    }

    #[test]
    fn test_policy_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("custom.yaml");
        std::fs::write(
            &path,
            "name: custom\nlimits:\n  max_positional_params: 2\nrules:\n  position:\n    min_confidence: 0.1\n",
        )
        .unwrap();
        let policy = Policy::from_file(&path).unwrap();
        assert_eq!(policy.limits.max_positional_params, 2);
        assert_eq!(policy.rules[&ConnascenceKind::Position].min_confidence, 0.1);
        // Unspecified rules inherit standard settings.
        assert!(policy.rules.contains_key(&ConnascenceKind::Meaning));
    }

    #[test]
    fn test_unknown_policy_name() {
        assert!(Policy::by_name("imaginary").is_err());
    }
}
