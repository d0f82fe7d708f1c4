use anyhow::{Result, bail};
use clap::Parser;
use serde_json::json;
use sklint::cancel::NeverCancel;
use sklint::cli::{self, OutputFormat};
use sklint::config::{Config, Vocabulary};
use sklint::diagnostics::{self, Diagnostic};
use sklint::host::scan::ScanOptions;
use sklint::host::{FileReport, FixOptions, Workspace};
use sklint::model::Severity;
use sklint::rules::{DESCRIPTORS, RuleId};
use sklint::{logging, util};
use std::process::ExitCode;

fn vocabulary(config: &Config, token: Option<String>) -> Vocabulary {
    match token {
        Some(token) => config.vocabulary().clone().with_token_expr(&token),
        None => config.vocabulary().clone(),
    }
}

fn main() -> Result<ExitCode> {
    logging::init_tracing();
    let args = cli::Args::parse();
    let config = Config::get();

    match args.command {
        cli::Command::Check {
            repo,
            format,
            token,
            no_ignore,
        } => {
            let vocab = vocabulary(config, token);
            let workspace = Workspace::load(&repo, ScanOptions::new(no_ignore))?;
            let reports = workspace.analyze(&vocab, &NeverCancel)?;
            let all: Vec<&Diagnostic> = reports
                .iter()
                .flat_map(|report| report.diagnostics.iter())
                .collect();
            match format {
                OutputFormat::Json => {
                    let records: Vec<_> = all.iter().map(|diagnostic| diagnostic.record()).collect();
                    println!("{}", serde_json::to_string_pretty(&records)?);
                }
                OutputFormat::Sarif => {
                    let owned: Vec<Diagnostic> = all.iter().map(|diagnostic| (*diagnostic).clone()).collect();
                    println!("{}", serde_json::to_string_pretty(&diagnostics::to_sarif(&owned))?);
                }
                OutputFormat::Text => print_text(&workspace, &reports),
            }
            let failing = all
                .iter()
                .any(|diagnostic| diagnostic.severity >= Severity::Warning);
            Ok(if failing {
                ExitCode::from(1)
            } else {
                ExitCode::SUCCESS
            })
        }
        cli::Command::Fixes {
            repo,
            path,
            line,
            token,
        } => {
            let vocab = vocabulary(config, token);
            let rel_path = util::repo_rel_path(&repo, &path)?;
            let workspace = Workspace::load(&repo, ScanOptions::default())?;
            let offers = workspace.fixes_at(&rel_path, line, &vocab)?;
            let value: Vec<_> = offers
                .iter()
                .map(|offer| {
                    json!({
                        "diagnostic": offer.diagnostic.record(),
                        "fixes": offer.fixes,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(ExitCode::SUCCESS)
        }
        cli::Command::Fix {
            repo,
            rules,
            prefer,
            token,
            max_passes,
            dry_run,
            no_ignore,
        } => {
            let vocab = vocabulary(config, token);
            let mut parsed_rules = Vec::new();
            for code in &rules {
                match RuleId::from_code(code) {
                    Some(rule) => parsed_rules.push(rule),
                    None => bail!("unknown rule: {code}"),
                }
            }
            let options = FixOptions {
                rules: parsed_rules,
                prefer,
                max_passes: max_passes.unwrap_or(config.max_fix_passes),
            };
            let mut workspace = Workspace::load(&repo, ScanOptions::new(no_ignore))?;
            let summary = workspace.fix_all(&vocab, &options, &NeverCancel)?;
            let written = if dry_run {
                Vec::new()
            } else {
                workspace.write()?
            };
            let value = json!({
                "dry_run": dry_run,
                "summary": summary,
                "written": written,
            });
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(ExitCode::SUCCESS)
        }
        cli::Command::Rules => {
            println!("{}", serde_json::to_string_pretty(&DESCRIPTORS)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn print_text(workspace: &Workspace, reports: &[FileReport]) {
    let mut counts = [0usize; 3];
    for report in reports {
        let source = workspace.source(&report.path).unwrap_or("");
        for diagnostic in &report.diagnostics {
            let span = &diagnostic.location.span;
            println!(
                "{}:{}:{}: {} {}: {}",
                report.path,
                span.start_line,
                span.start_col,
                diagnostic.severity.as_str(),
                diagnostic.rule.code(),
                diagnostic.message
            );
            let line = util::slice_lines(source, span.start_line, span.start_line);
            if !line.trim().is_empty() {
                println!("    | {}", util::truncate_str_bytes(line.trim_end(), 160));
            }
            counts[diagnostic.severity as usize] += 1;
        }
    }
    println!(
        "{} warning(s), {} info, {} error(s) in {} file(s)",
        counts[Severity::Warning as usize],
        counts[Severity::Info as usize],
        counts[Severity::Error as usize],
        reports.len()
    );
}
