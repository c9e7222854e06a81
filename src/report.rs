//! Report assembly and rendering.
//!
//! One [`Report`] feeds all three output formats: pretty terminal text,
//! machine-readable JSON, and SARIF 2.1.0 for code-scanning uploads.

use std::collections::BTreeMap;

use anyhow::Result;
use colored::Colorize;
use serde::{Deserialize, Serialize};

use crate::detect::{ConnascenceKind, ScanNote, Severity, Violation};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub violations: Vec<Violation>,
    pub summary: Summary,
    pub metadata: RunMetadata,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Summary {
    pub total: usize,
    pub by_severity: BTreeMap<Severity, usize>,
    pub by_kind: BTreeMap<ConnascenceKind, usize>,
    pub per_file: BTreeMap<String, usize>,
}

impl Summary {
    pub fn of(violations: &[Violation]) -> Self {
        let mut summary = Summary {
            total: violations.len(),
            ..Summary::default()
        };
        for violation in violations {
            *summary.by_severity.entry(violation.severity).or_default() += 1;
            *summary.by_kind.entry(violation.kind).or_default() += 1;
            *summary.per_file.entry(violation.file.clone()).or_default() += 1;
        }
        summary
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.by_severity.get(&severity).copied().unwrap_or(0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadata {
    pub policy: String,
    /// Files that were parsed and analyzed; unsupported, unreadable and
    /// unparseable files are excluded (they appear in `notes` instead).
    pub files_scanned: usize,
    pub duration_ms: u64,
    /// True when the scan was cancelled before covering every file.
    pub partial: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<ScanNote>,
    /// Syntax-tree nodes no front end knew how to classify.
    pub unhandled_nodes: usize,
}

pub fn render_json(report: &Report) -> Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

// Minimal SARIF 2.1.0 model; only what code-scanning consumers read.

#[derive(Serialize)]
struct SarifReport<'a> {
    #[serde(rename = "$schema")]
    schema: &'static str,
    version: &'static str,
    runs: Vec<SarifRun<'a>>,
}

#[derive(Serialize)]
struct SarifRun<'a> {
    tool: SarifTool,
    results: Vec<SarifResult<'a>>,
}

#[derive(Serialize)]
struct SarifTool {
    driver: SarifDriver,
}

#[derive(Serialize)]
struct SarifDriver {
    name: &'static str,
    version: &'static str,
    #[serde(rename = "informationUri")]
    information_uri: &'static str,
    rules: Vec<SarifRule>,
}

#[derive(Serialize)]
struct SarifRule {
    id: &'static str,
    name: &'static str,
    #[serde(rename = "shortDescription")]
    short_description: SarifMessage<'static>,
}

#[derive(Serialize)]
struct SarifResult<'a> {
    #[serde(rename = "ruleId")]
    rule_id: &'static str,
    level: &'static str,
    message: SarifMessage<'a>,
    locations: Vec<SarifLocation<'a>>,
    #[serde(rename = "partialFingerprints")]
    partial_fingerprints: BTreeMap<&'static str, &'a str>,
}

#[derive(Serialize)]
struct SarifMessage<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct SarifLocation<'a> {
    #[serde(rename = "physicalLocation")]
    physical_location: SarifPhysicalLocation<'a>,
}

#[derive(Serialize)]
struct SarifPhysicalLocation<'a> {
    #[serde(rename = "artifactLocation")]
    artifact_location: SarifArtifactLocation<'a>,
    region: SarifRegion,
}

#[derive(Serialize)]
struct SarifArtifactLocation<'a> {
    uri: &'a str,
}

#[derive(Serialize)]
struct SarifRegion {
    #[serde(rename = "startLine")]
    start_line: usize,
    #[serde(rename = "startColumn")]
    start_column: usize,
    #[serde(rename = "endLine")]
    end_line: usize,
}

fn sarif_level(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical | Severity::High => "error",
        Severity::Medium => "warning",
        Severity::Low => "note",
    }
}

pub fn render_sarif(report: &Report) -> Result<String> {
    let rules = ConnascenceKind::ALL
        .iter()
        .map(|kind| SarifRule {
            id: kind.code(),
            name: kind.as_str(),
            short_description: SarifMessage { text: kind.as_str() },
        })
        .collect();

    let results = report
        .violations
        .iter()
        .map(|v| {
            let mut locations = vec![SarifLocation {
                physical_location: SarifPhysicalLocation {
                    artifact_location: SarifArtifactLocation { uri: &v.file },
                    region: SarifRegion {
                        start_line: v.line,
                        start_column: v.column + 1,
                        end_line: v.end_line,
                    },
                },
            }];
            for extra in &v.locations {
                locations.push(SarifLocation {
                    physical_location: SarifPhysicalLocation {
                        artifact_location: SarifArtifactLocation { uri: &v.file },
                        region: SarifRegion {
                            start_line: extra.line,
                            start_column: extra.column + 1,
                            end_line: extra.line,
                        },
                    },
                });
            }
            let mut partial_fingerprints = BTreeMap::new();
            partial_fingerprints.insert("primaryLocationLineHash", v.id.as_str());
            SarifResult {
                rule_id: v.kind.code(),
                level: sarif_level(v.severity),
                message: SarifMessage {
                    text: &v.description,
                },
                locations,
                partial_fingerprints,
            }
        })
        .collect();

    let sarif = SarifReport {
        schema: "https://json.schemastore.org/sarif-2.1.0.json",
        version: "2.1.0",
        runs: vec![SarifRun {
            tool: SarifTool {
                driver: SarifDriver {
                    name: env!("CARGO_PKG_NAME"),
                    version: env!("CARGO_PKG_VERSION"),
                    information_uri: "https://github.com/zen-systems/conncheck",
                    rules,
                },
            },
            results,
        }],
    };
    Ok(serde_json::to_string_pretty(&sarif)?)
}

fn paint(severity: Severity, text: &str) -> String {
    match severity {
        Severity::Critical => text.red().bold().to_string(),
        Severity::High => text.red().to_string(),
        Severity::Medium => text.yellow().to_string(),
        Severity::Low => text.dimmed().to_string(),
    }
}

pub fn render_text(report: &Report) -> Result<String> {
    use std::fmt::Write;

    let mut out = String::new();
    writeln!(
        out,
        "{} policy={} files={} ({} ms)",
        "conncheck".bold(),
        report.metadata.policy,
        report.metadata.files_scanned,
        report.metadata.duration_ms
    )?;
    if report.metadata.partial {
        writeln!(out, "{}", "scan cancelled early; results are partial".yellow())?;
    }
    writeln!(out)?;

    for violation in &report.violations {
        let tag = format!("[{}]", violation.severity);
        writeln!(
            out,
            "{}:{}:{} {} {} {}",
            violation.file,
            violation.line,
            violation.column,
            paint(violation.severity, &tag),
            violation.kind.code().bold(),
            violation.description
        )?;
        if !violation.locations.is_empty() {
            let lines: Vec<String> = violation
                .locations
                .iter()
                .map(|l| l.line.to_string())
                .collect();
            writeln!(out, "    also at lines {}", lines.join(", "))?;
        }
        writeln!(out, "    {} {}", "fix:".dimmed(), violation.remediation)?;
    }

    if !report.violations.is_empty() {
        writeln!(out)?;
    }
    writeln!(
        out,
        "{} finding(s): {} critical, {} high, {} medium, {} low",
        report.summary.total,
        report.summary.count(Severity::Critical),
        report.summary.count(Severity::High),
        report.summary.count(Severity::Medium),
        report.summary.count(Severity::Low),
    )?;

    for note in &report.metadata.notes {
        writeln!(
            out,
            "{} {}: {}",
            "warning:".yellow(),
            note.file,
            note.message
        )?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_report() -> Report {
        let violations = vec![Violation {
            id: "abc123def456".to_string(),
            kind: ConnascenceKind::Meaning,
            severity: Severity::Medium,
            file: "app.py".to_string(),
            line: 2,
            column: 11,
            end_line: 2,
            description: "magic number 3.14159".to_string(),
            remediation: "extract 3.14159 into a named constant".to_string(),
            locations: Vec::new(),
        }];
        let summary = Summary::of(&violations);
        Report {
            violations,
            summary,
            metadata: RunMetadata {
                policy: "standard".to_string(),
                files_scanned: 1,
                duration_ms: 3,
                partial: false,
                notes: Vec::new(),
                unhandled_nodes: 0,
            },
        }
    }

    #[test]
    fn test_json_round_trips() {
        let report = sample_report();
        let json = render_json(&report).unwrap();
        let parsed: Report = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.summary.total, 1);
        assert_eq!(parsed.violations[0].kind, ConnascenceKind::Meaning);
    }

    #[test]
    fn test_sarif_structure() {
        let sarif = render_sarif(&sample_report()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&sarif).unwrap();
        assert_eq!(value["version"], "2.1.0");
        let result = &value["runs"][0]["results"][0];
        assert_eq!(result["ruleId"], "CoM");
        assert_eq!(result["level"], "warning");
        assert_eq!(
            result["locations"][0]["physicalLocation"]["region"]["startLine"],
            2
        );
        assert_eq!(value["runs"][0]["tool"]["driver"]["rules"].as_array().unwrap().len(), 10);
    }

    #[test]
    fn test_text_contains_summary() {
        colored::control::set_override(false);
        let text = render_text(&sample_report()).unwrap();
        assert!(text.contains("app.py:2:11"));
        assert!(text.contains("1 finding(s)"));
        assert!(text.contains("magic number 3.14159"));
    }

    #[test]
    fn test_summary_counts() {
        let report = sample_report();
        assert_eq!(report.summary.count(Severity::Medium), 1);
        assert_eq!(report.summary.count(Severity::Critical), 0);
        assert_eq!(report.summary.per_file["app.py"], 1);
    }
}
