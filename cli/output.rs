use anyhow::{Context, Result};
use colored::*;
use comfy_table::{Cell, CellAlignment, Color, ContentArrangement, Table, presets::UTF8_FULL};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::Path;
use xconcat_core::{FileStats, output_formats};

use crate::cli_args::DataFormatOpts;

/// Prints `data` as JSON/YAML when a format was requested, otherwise runs
/// `pretty` to print the human-readable form.
pub fn print_data_or_text<T: Serialize>(
    data: &T,
    format_opts: &DataFormatOpts,
    pretty: impl FnOnce() -> Result<()>,
) -> Result<()> {
    match format_opts.format.as_deref().map(str::to_lowercase).as_deref() {
        None => pretty(),
        Some("yaml") | Some("yml") => {
            let content = output_formats::serialize_to_yaml(data)?;
            write_to_stdout(&content)
        }
        Some(_) => {
            let content = output_formats::serialize_to_json(data, format_opts.pretty)?;
            write_to_stdout(&content)
        }
    }
}

pub fn write_to_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory {}", parent.display()))?;
    }
    let mut file =
        File::create(path).with_context(|| format!("Failed to create file {}", path.display()))?;
    file.write_all(content.as_bytes())
        .with_context(|| format!("Failed to write to file {}", path.display()))?;
    Ok(())
}

pub fn write_to_stdout(content: &str) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(content.as_bytes())
        .context("Failed to write to stdout")?;
    if !content.is_empty() && !content.ends_with('\n') {
        handle
            .write_all(b"\n")
            .context("Failed to write newline to stdout")?;
    }
    handle.flush().context("Failed to flush stdout")?;
    Ok(())
}

pub fn print_saved(what: &str, path: &Path, quiet: bool) {
    if !quiet {
        eprintln!(
            "{} {} saved to: {}",
            "✅".green(),
            what,
            path.display().to_string().blue()
        );
    }
}

pub fn section_title(title: &str) {
    println!(
        "{}",
        format!("\n--- {} ---", title).green().bold().underline()
    );
}

pub fn new_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(
        headers
            .iter()
            .map(|h| Cell::new(h).fg(Color::Green))
            .collect::<Vec<_>>(),
    );
    table
}

pub fn print_stats_pretty_table(stats: &FileStats, excluded: usize, skipped: usize) {
    println!();
    println!("{}", " File Statistics ".green().bold().underline());
    println!(
        "{:<20} {}",
        "Included Files:".green(),
        stats.file_count.to_string().cyan()
    );
    println!(
        "{:<20} {}",
        "Excluded Files:".green(),
        excluded.to_string().cyan()
    );
    println!(
        "{:<20} {}",
        "Skipped Files:".green(),
        skipped.to_string().cyan()
    );
    println!(
        "{:<20} {}",
        "Total Lines:".green(),
        stats.total_lines.to_string().cyan()
    );
    println!(
        "{:<20} {}",
        "Total Size:".green(),
        output_formats::human_size(stats.total_size_bytes).cyan()
    );
    println!(
        "{:<20} {}",
        "Average Size:".green(),
        output_formats::human_size(stats.average_file_size).cyan()
    );

    if stats.file_type_histogram.is_empty() {
        println!("\n{}", "(No files included)".yellow());
    } else {
        println!("\n{}", " File Types ".green().bold().underline());
        let mut table = new_table(&["Type", "Files"]);
        let mut rows: Vec<(&String, &usize)> = stats.file_type_histogram.iter().collect();
        rows.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        for (kind, count) in rows {
            table.add_row(vec![
                Cell::new(kind).fg(Color::Cyan),
                Cell::new(count).set_alignment(CellAlignment::Right),
            ]);
        }
        println!("{table}");
    }
    println!();
}
