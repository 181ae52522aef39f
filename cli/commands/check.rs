use crate::cli_args::CheckArgs;
use crate::commands::prepare_working_set;
use crate::output::{new_table, print_data_or_text, section_title};
use anyhow::{Context, Result};
use colored::*;
use comfy_table::{Cell, Color};
use serde::Serialize;
use xconcat_core::{Config, ExclusionRule, PatternValidation, SkippedFile, validate};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CheckReport<'a> {
    effective_config: &'a Config,
    rules: Vec<RuleReport<'a>>,
    included: Vec<&'a str>,
    excluded: Vec<ExcludedEntry<'a>>,
    skipped: &'a [SkippedFile],
}

#[derive(Debug, Serialize)]
struct RuleReport<'a> {
    #[serde(flatten)]
    rule: &'a ExclusionRule,
    validation: PatternValidation,
}

#[derive(Debug, Serialize)]
struct ExcludedEntry<'a> {
    path: &'a str,
    rule: String,
}

pub fn handle_check_command(args: CheckArgs, _quiet: bool) -> Result<()> {
    let working = prepare_working_set(&args.source)?;
    let outcome = working.session.outcome();

    let report = CheckReport {
        effective_config: &working.config,
        rules: working
            .session
            .rules()
            .iter()
            .map(|rule| RuleReport {
                rule,
                validation: validate(&rule.pattern, rule.kind),
            })
            .collect(),
        included: outcome.included.iter().map(|f| f.path.as_str()).collect(),
        excluded: outcome
            .excluded
            .iter()
            .map(|(file, rule)| ExcludedEntry {
                path: file.path.as_str(),
                rule: rule.to_string(),
            })
            .collect(),
        skipped: &working.skipped,
    };

    print_data_or_text(&report, &args.format_output, || print_check_pretty(&report))
}

fn print_check_pretty(report: &CheckReport) -> Result<()> {
    section_title("Effective Configuration");
    let config_toml = toml::to_string_pretty(report.effective_config)
        .context("Failed to serialize effective config to TOML")?;
    println!("{}", config_toml);

    section_title("Rules (evaluated in order)");
    if report.rules.is_empty() {
        println!("{}", "(None)".dimmed());
    } else {
        let mut table = new_table(&["#", "Kind", "Pattern", "Enabled", "Status"]);
        for (index, entry) in report.rules.iter().enumerate() {
            let status = match &entry.validation.error {
                None => Cell::new("ok").fg(Color::Green),
                Some(err) => Cell::new(format!("never matches: {}", err)).fg(Color::Red),
            };
            table.add_row(vec![
                Cell::new(index + 1),
                Cell::new(entry.rule.kind),
                Cell::new(&entry.rule.pattern).fg(Color::Cyan),
                Cell::new(if entry.rule.enabled { "yes" } else { "no" }),
                status,
            ]);
        }
        println!("{table}");
    }

    section_title("Included Files");
    if report.included.is_empty() {
        println!("{}", "(None)".dimmed());
    } else {
        report.included.iter().for_each(|p| println!("- {}", p.cyan()));
    }

    section_title("Excluded Files");
    if report.excluded.is_empty() {
        println!("{}", "(None)".dimmed());
    } else {
        for entry in &report.excluded {
            println!("- {} {}", entry.path.yellow(), format!("({})", entry.rule).dimmed());
        }
    }

    section_title("Skipped Files");
    if report.skipped.is_empty() {
        println!("{}", "(None)".dimmed());
    } else {
        for skipped in report.skipped {
            println!(
                "- {} {}",
                skipped.path.red(),
                format!("({})", skipped.reason).dimmed()
            );
        }
    }

    println!("{}", "\n--- End Check ---".green().bold());
    Ok(())
}
