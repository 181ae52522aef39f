use crate::cli_args::StatsArgs;
use crate::commands::prepare_working_set;
use crate::output::{print_data_or_text, print_stats_pretty_table};
use anyhow::Result;
use serde::Serialize;
use xconcat_core::{FileStats, stats};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatsReport {
    #[serde(flatten)]
    stats: FileStats,
    excluded_count: usize,
    skipped_count: usize,
}

pub fn handle_stats_command(args: StatsArgs, quiet: bool) -> Result<()> {
    let working = prepare_working_set(&args.source)?;
    let outcome = working.session.outcome();

    let report = StatsReport {
        stats: stats(outcome.included.iter().copied()),
        excluded_count: outcome.excluded.len(),
        skipped_count: working.skipped.len(),
    };

    if report.stats.file_count == 0 && args.format_output.format.is_none() && !quiet {
        println!("No files left after filtering.");
        return Ok(());
    }

    print_data_or_text(&report, &args.format_output, || {
        print_stats_pretty_table(&report.stats, report.excluded_count, report.skipped_count);
        Ok(())
    })
}
