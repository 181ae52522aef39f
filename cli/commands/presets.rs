use crate::cli_args::PresetsArgs;
use crate::output::{new_table, print_data_or_text};
use anyhow::Result;
use colored::*;
use comfy_table::{Cell, CellAlignment, Color};
use xconcat_core::rules::{preset, presets};

pub fn handle_presets_command(args: PresetsArgs) -> Result<()> {
    match &args.name {
        Some(name) => {
            let preset = preset(name)?;
            print_data_or_text(preset, &args.format_output, || {
                println!("{} {}", preset.name.green().bold(), preset.description.dimmed());
                let mut table = new_table(&["Kind", "Pattern", "Description"]);
                for rule in &preset.rules {
                    table.add_row(vec![
                        Cell::new(rule.kind),
                        Cell::new(&rule.pattern).fg(Color::Cyan),
                        Cell::new(rule.description.as_deref().unwrap_or("")),
                    ]);
                }
                println!("{table}");
                Ok(())
            })
        }
        None => {
            let all = presets();
            print_data_or_text(&all, &args.format_output, || {
                let mut table = new_table(&["Preset", "Rules", "Description"]);
                for preset in all {
                    table.add_row(vec![
                        Cell::new(&preset.name).fg(Color::Cyan),
                        Cell::new(preset.rules.len()).set_alignment(CellAlignment::Right),
                        Cell::new(&preset.description),
                    ]);
                }
                println!("{table}");
                println!(
                    "{}",
                    "Use '--preset NAME' or 'presets = [\"NAME\"]' in xconcat.toml to apply one."
                        .dimmed()
                );
                Ok(())
            })
        }
    }
}
