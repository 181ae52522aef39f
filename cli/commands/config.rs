use crate::cli_args::ConfigArgs;
use crate::commands::completion::confirm_overwrite;
use crate::output::{print_saved, write_to_file, write_to_stdout};
use anyhow::{Context, Result};
use std::path::Path;
use xconcat_core::config::{DEFAULT_CONFIG_DIR, DEFAULT_CONFIG_FILENAME};
use xconcat_core::{Config, ExclusionRule, RuleKind};

fn starter_config() -> Config {
    Config {
        rules: vec![
            ExclusionRule::new(RuleKind::Extension, "log").with_description("Log files"),
            ExclusionRule::new(RuleKind::PathSubstring, "node_modules/")
                .with_description("npm dependencies"),
        ],
        ..Config::default()
    }
}

pub fn handle_config_command(args: &ConfigArgs, project_root: &Path, quiet: bool) -> Result<()> {
    let content = starter_config()
        .to_toml_string()
        .context("Failed to serialize default config")?;

    if !args.save {
        return write_to_stdout(&content);
    }

    let path = project_root
        .join(DEFAULT_CONFIG_DIR)
        .join(DEFAULT_CONFIG_FILENAME);
    if !confirm_overwrite(&path, quiet)? {
        println!("Save cancelled.");
        return Ok(());
    }
    write_to_file(&path, &content)?;
    print_saved("Config", &path, quiet);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starter_config_parses_back() {
        let text = starter_config().to_toml_string().unwrap();
        let parsed = Config::from_toml_str(&text).unwrap();
        assert_eq!(parsed.rules.len(), 2);
        assert_eq!(parsed.general.max_file_size, "2MB");
    }
}
