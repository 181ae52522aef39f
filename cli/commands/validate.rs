use crate::cli_args::ValidateArgs;
use crate::commands::parse_rule_kind;
use crate::output::print_data_or_text;
use anyhow::Result;
use colored::*;
use serde::Serialize;
use xconcat_core::rules::matches;
use xconcat_core::{AppError, ExclusionRule, PatternValidation, RuleKind, validate};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ValidateReport<'a> {
    kind: RuleKind,
    pattern: &'a str,
    #[serde(flatten)]
    validation: PatternValidation,
    tests: Vec<PathTest<'a>>,
}

#[derive(Debug, Serialize)]
struct PathTest<'a> {
    path: &'a str,
    excluded: bool,
}

pub fn handle_validate_command(args: ValidateArgs) -> Result<()> {
    let kind = parse_rule_kind(&args.kind)?;
    let validation = validate(&args.pattern, kind);
    let rule = ExclusionRule::new(kind, args.pattern.clone());

    let report = ValidateReport {
        kind,
        pattern: &args.pattern,
        validation,
        tests: args
            .test_paths
            .iter()
            .map(|path| PathTest {
                path,
                excluded: matches(path, &rule),
            })
            .collect(),
    };

    print_data_or_text(&report, &args.format_output, || {
        if report.validation.valid {
            println!(
                "{} {} pattern '{}' is valid",
                "✅".green(),
                report.kind,
                report.pattern.cyan()
            );
        }
        for test in &report.tests {
            let verdict = if test.excluded {
                "excluded".yellow()
            } else {
                "included".green()
            };
            println!("  {} -> {}", test.path, verdict);
        }
        Ok(())
    })?;

    match report.validation.error {
        Some(message) => Err(AppError::InvalidArgument(format!(
            "Invalid {} pattern '{}': {}",
            kind, args.pattern, message
        ))
        .into()),
        None => Ok(()),
    }
}
