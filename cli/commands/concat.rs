use crate::cli_args::{ConcatArgs, unescape_separator};
use crate::commands::prepare_working_set;
use crate::output::{print_saved, write_to_file, write_to_stdout};
use anyhow::{Context, Result};
use colored::*;
use xconcat_core::{
    ConcatenationOptions, ExportDocument, ExportFormat, HeaderFormat, SortKey, SortOrder,
    concatenate, render,
};

pub fn handle_concat_command(args: ConcatArgs, quiet: bool) -> Result<()> {
    let mut working = prepare_working_set(&args.source)?;

    apply_option_overrides(working.session.options_mut(), &args)?;
    if let Some(key) = &args.sort {
        let order = if args.desc {
            SortOrder::Desc
        } else {
            SortOrder::Asc
        };
        working.session.sort(key.parse::<SortKey>()?, order);
    }

    let format = match &args.format {
        Some(f) => f.parse::<ExportFormat>()?,
        None => working.config.output.format,
    };
    let pretty = args.pretty || !working.config.output.json_minify;
    let title = args
        .title
        .clone()
        .unwrap_or_else(|| working.config.get_effective_title(&working.project_root));

    let outcome = working.session.outcome();
    let body = concatenate(outcome.included.iter().copied(), working.session.options());
    let document = ExportDocument::new(title, &body, outcome.included.iter().copied());
    let rendered = render(&document, format, pretty)?;

    match &args.save {
        Some(path) => {
            write_to_file(path, &rendered)?;
            print_saved(&format!("{} output", format), path, quiet);
        }
        None => write_to_stdout(&rendered)?,
    }

    if let Some(path) = &args.collection_out {
        let name = working
            .config
            .get_effective_project_name(&working.project_root);
        working
            .session
            .to_collection(name)
            .save_to_path(path)
            .with_context(|| format!("Failed to save collection to {}", path.display()))?;
        print_saved("Collection", path, quiet);
    }

    if !quiet {
        eprintln!(
            "{} {} included, {} excluded, {} skipped",
            "ℹ️".blue(),
            outcome.included.len().to_string().cyan(),
            outcome.excluded.len().to_string().yellow(),
            working.skipped.len().to_string().dimmed()
        );
    }
    Ok(())
}

fn apply_option_overrides(options: &mut ConcatenationOptions, args: &ConcatArgs) -> Result<()> {
    if let Some(format) = &args.header_format {
        options.header_format = format.parse::<HeaderFormat>()?;
    }
    if let Some(template) = &args.template {
        options.custom_header_template = Some(template.clone());
        options.header_format = HeaderFormat::Custom;
    }
    if let Some(separator) = &args.separator {
        options.separator = unescape_separator(separator);
    }
    if args.no_headers {
        options.include_headers = false;
    }
    log::debug!("Concatenation options: {:?}", options);
    Ok(())
}
