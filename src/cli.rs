//! Command-line interface.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use globset::{Glob, GlobSet, GlobSetBuilder};
use walkdir::WalkDir;

use crate::analysis::supported_extensions;
use crate::detect::Severity;
use crate::engine::{scan_files, ScanOptions};
use crate::policy::Policy;
use crate::report::{render_json, render_sarif, render_text, Report};

/// No critical findings.
pub const EXIT_SUCCESS: i32 = 0;
/// At least one critical finding.
pub const EXIT_FAILED: i32 = 1;
/// Usage, IO or policy error.
pub const EXIT_ERROR: i32 = 2;

#[derive(Parser)]
#[command(
    name = "conncheck",
    version,
    about = "Connascence and coupling checker for multi-language codebases"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan paths and report coupling violations.
    Scan(ScanArgs),
    /// List the built-in policy presets.
    Policies,
}

#[derive(clap::Args)]
struct ScanArgs {
    /// Files or directories to scan.
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Built-in policy preset.
    #[arg(long, default_value = "standard", conflicts_with = "policy_file")]
    policy: String,

    /// Load the policy from a YAML or JSON file instead.
    #[arg(long)]
    policy_file: Option<PathBuf>,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Glob patterns to exclude (repeatable).
    #[arg(long)]
    exclude: Vec<String>,

    /// Write the report to a file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Scan files one at a time instead of in parallel.
    #[arg(long)]
    sequential: bool,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
    Sarif,
}

/// Directories that hold generated or third-party code.
const SKIPPED_DIRS: &[&str] = &[
    ".git",
    "node_modules",
    "vendor",
    "target",
    "dist",
    "build",
    "__pycache__",
    ".venv",
    "venv",
];

fn build_excludes(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob =
            Glob::new(pattern).with_context(|| format!("invalid exclude pattern '{pattern}'"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

fn skippable_dir(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|name| SKIPPED_DIRS.contains(&name) || name.starts_with('.'))
        .unwrap_or(false)
}

fn has_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| supported_extensions().contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Expand the argument paths into the concrete file list to scan.
///
/// Directories are walked recursively; hidden and vendored directories are
/// skipped. Files named explicitly are kept even without a known extension
/// so the engine can report them as unsupported.
pub fn collect_files(paths: &[PathBuf], excludes: &GlobSet) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_file() {
            if !excludes.is_match(path) {
                files.push(path.clone());
            }
            continue;
        }
        if !path.is_dir() {
            bail!("path does not exist: {}", path.display());
        }
        let walker = WalkDir::new(path)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !skippable_dir(e.path()));
        for entry in walker {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let candidate = entry.path();
            if has_supported_extension(candidate) && !excludes.is_match(candidate) {
                files.push(candidate.to_path_buf());
            }
        }
    }
    files.sort();
    files.dedup();
    Ok(files)
}

fn run_scan(args: &ScanArgs) -> Result<i32> {
    let policy = match &args.policy_file {
        Some(path) => Policy::from_file(path)?,
        None => Policy::by_name(&args.policy)?,
    };
    let excludes = build_excludes(&args.exclude)?;
    let files = collect_files(&args.paths, &excludes)?;

    // Ctrl-C finishes the files already in flight and reports partial results.
    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = cancel.clone();
        let _ = ctrlc::set_handler(move || cancel.store(true, Ordering::Relaxed));
    }

    let options = ScanOptions {
        sequential: args.sequential,
        cancel: Some(cancel),
    };
    let report = scan_files(&files, &policy, &options)?;

    let rendered = match args.format {
        OutputFormat::Text => render_text(&report)?,
        OutputFormat::Json => render_json(&report)?,
        OutputFormat::Sarif => render_sarif(&report)?,
    };
    match &args.output {
        Some(path) => fs::write(path, rendered)
            .with_context(|| format!("failed to write report to {}", path.display()))?,
        None => print!("{rendered}"),
    }

    Ok(exit_code(&report))
}

fn exit_code(report: &Report) -> i32 {
    if report.summary.count(Severity::Critical) > 0 {
        EXIT_FAILED
    } else {
        EXIT_SUCCESS
    }
}

fn run_policies() -> i32 {
    for name in Policy::preset_names() {
        let policy = match Policy::by_name(name) {
            Ok(policy) => policy,
            Err(_) => continue,
        };
        println!(
            "{:<10} max_params={} god_methods={} god_lines={} name_uses={} similarity={}",
            policy.name,
            policy.limits.max_positional_params,
            policy.limits.god_class_methods,
            policy.limits.god_class_lines,
            policy.limits.max_name_uses,
            policy.limits.duplicate_similarity,
        );
    }
    EXIT_SUCCESS
}

pub fn run() -> i32 {
    let cli = Cli::parse();
    match cli.command {
        Command::Scan(args) => match run_scan(&args) {
            Ok(code) => code,
            Err(err) => {
                eprintln!("error: {err:#}");
                EXIT_ERROR
            }
        },
        Command::Policies => run_policies(),
    }
}
