use crate::cli_args::SuggestArgs;
use crate::commands::prepare_working_set;
use crate::output::{new_table, print_data_or_text};
use anyhow::Result;
use colored::*;
use comfy_table::{Cell, CellAlignment, Color};
use xconcat_core::suggest_rules;

pub fn handle_suggest_command(args: SuggestArgs, quiet: bool) -> Result<()> {
    let working = prepare_working_set(&args.source)?;
    let suggestions = suggest_rules(working.session.files(), working.session.rules());

    print_data_or_text(&suggestions, &args.format_output, || {
        if suggestions.is_empty() {
            if !quiet {
                println!("{} No common noise found among the included files.", "✅".green());
            }
            return Ok(());
        }
        let mut table = new_table(&["Kind", "Pattern", "Files", "Reason"]);
        for suggestion in &suggestions {
            table.add_row(vec![
                Cell::new(suggestion.rule.kind),
                Cell::new(&suggestion.rule.pattern).fg(Color::Cyan),
                Cell::new(suggestion.affected_files).set_alignment(CellAlignment::Right),
                Cell::new(suggestion.reason),
            ]);
        }
        println!("{table}");
        println!(
            "{}",
            "Add a rule with e.g. '--exclude-path node_modules/' or a [[rules]] entry in xconcat.toml."
                .dimmed()
        );
        Ok(())
    })
}
