mod cli_args;
mod commands;
mod output;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use colored::*;
use std::process;

use cli_args::{Cli, Commands, IgnoreTogglesGroup, ProjectConfigOpts};
use xconcat_core::{AppError, Config};

fn main() {
    let cli_args = Cli::parse();

    setup_logging(cli_args.quiet, cli_args.verbose);

    let quiet = cli_args.quiet;

    log::debug!("CLI args parsed: {:?}", cli_args);

    let exit_code = match run_app(cli_args, quiet) {
        Ok(_) => {
            log::info!("Application finished successfully.");
            0
        }
        Err(e) => {
            let exit_code = exit_code_for(&e);

            // Config and argument errors are always shown, even when quiet.
            if !quiet || exit_code == 1 || exit_code == 5 {
                eprintln!("{} {:#}\n", "Error:".red().bold(), e);
            } else {
                log::error!("Application failed: {:#}", e);
            }

            exit_code
        }
    };
    log::debug!("Exiting with code {}", exit_code);
    process::exit(exit_code);
}

fn exit_code_for(e: &anyhow::Error) -> i32 {
    match e.downcast_ref::<AppError>() {
        Some(AppError::Config(_)) => 1,
        Some(AppError::TomlParse(_)) => 1,
        Some(AppError::TomlSerialize(_)) => 1,
        Some(AppError::Io(_)) => 2,
        Some(AppError::FileRead { .. }) => 2,
        Some(AppError::FileWrite { .. }) => 2,
        Some(AppError::DirCreation { .. }) => 2,
        Some(AppError::Glob(_)) => 2,
        Some(AppError::InvalidArgument(_)) => 5,
        Some(AppError::UnknownRuleKind(_)) => 5,
        Some(AppError::UnknownPreset(_)) => 5,
        Some(AppError::SizeParse(_)) => 5,
        Some(AppError::JsonSerialize(_)) => 6,
        Some(AppError::YamlError(_)) => 6,
        Some(AppError::XmlSerialize(_)) => 6,
        Some(AppError::Collection(_)) => 6,
        Some(_) => 1,
        None => 1,
    }
}

fn setup_logging(quiet: bool, verbose: u8) {
    let log_level = if quiet {
        log::LevelFilter::Off
    } else {
        match verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            2 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    };
    env_logger::Builder::new()
        .filter_level(log_level)
        .format_timestamp(None)
        .init();
    log::trace!("Logger initialized with level: {:?}", log_level);
}

fn run_app(cli: Cli, quiet: bool) -> Result<()> {
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };
    match command {
        Commands::Concat(args) => {
            log::debug!("Executing 'concat' command...");
            commands::concat::handle_concat_command(args, quiet)?;
        }
        Commands::Stats(args) => {
            log::debug!("Executing 'stats' command...");
            commands::stats::handle_stats_command(args, quiet)?;
        }
        Commands::Check(args) => {
            log::debug!("Executing 'check' command...");
            commands::check::handle_check_command(args, quiet)?;
        }
        Commands::Validate(args) => {
            log::debug!("Executing 'validate' command...");
            commands::validate::handle_validate_command(args)?;
        }
        Commands::Presets(args) => {
            log::debug!("Executing 'presets' command...");
            commands::presets::handle_presets_command(args)?;
        }
        Commands::Suggest(args) => {
            log::debug!("Executing 'suggest' command...");
            commands::suggest::handle_suggest_command(args, quiet)?;
        }
        Commands::Completion(args) => {
            log::debug!("Executing 'completion' command...");
            commands::completion::handle_completion_command(&args, quiet)?;
        }
        Commands::Config(args) => {
            log::debug!("Executing 'config' command...");
            let project_root =
                Config::determine_project_root(args.project_config.project_root.as_ref())
                    .context("Failed to determine project root for config command")?;
            commands::config::handle_config_command(&args, &project_root, quiet)?;
        }
    }
    Ok(())
}

fn merge_config_with_cli_overrides(
    mut config: Config,
    project_opts: &ProjectConfigOpts,
    ignore_toggles: &IgnoreTogglesGroup,
) -> Config {
    log::trace!("Applying CLI overrides to config...");

    if let Some(name) = &project_opts.project_name {
        config.general.project_name = Some(name.clone());
    }

    if ignore_toggles.disable_gitignore {
        config.general.use_gitignore = false;
    }
    if ignore_toggles.enable_gitignore {
        config.general.use_gitignore = true;
    }
    if ignore_toggles.disable_builtin_ignore {
        config.general.enable_builtin_ignore = false;
    }
    if ignore_toggles.enable_builtin_ignore {
        config.general.enable_builtin_ignore = true;
    }
    if ignore_toggles.follow_links {
        config.general.follow_links = true;
    }
    if let Some(size) = &ignore_toggles.max_file_size {
        config.general.max_file_size = size.clone();
    }

    log::trace!("Config after CLI overrides: {:?}", config);
    config
}

/// Loads the config file selected by `project_opts` (or the defaults) and
/// applies the command-line overrides on top.
pub fn load_config_for_command(
    project_root: &std::path::Path,
    project_opts: &ProjectConfigOpts,
    ignore_toggles: &IgnoreTogglesGroup,
) -> Result<Config> {
    let config_path = Config::resolve_config_path(
        project_root,
        project_opts.config_file.as_ref(),
        project_opts.no_config_file,
    )
    .context("Failed to resolve configuration path")?;

    let config = match &config_path {
        Some(path) => Config::load_from_path(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::default(),
    };

    let mut config = merge_config_with_cli_overrides(config, project_opts, ignore_toggles);
    config.general.project_name = Some(config.get_effective_project_name(project_root));

    Ok(config)
}
