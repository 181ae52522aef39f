pub mod check;
pub mod completion;
pub mod concat;
pub mod config;
pub mod presets;
pub mod stats;
pub mod suggest;
pub mod validate;

use crate::cli_args::{ExclusionGroup, SourceOpts};
use crate::load_config_for_command;
use anyhow::{Context, Result};
use std::path::PathBuf;
use xconcat_core::{
    AppError, Collection, Config, ExclusionRule, RuleKind, Session, SkippedFile, gather_files,
};

/// Everything a command needs after config loading and ingestion.
pub struct WorkingSet {
    pub project_root: PathBuf,
    pub config: Config,
    pub session: Session,
    pub skipped: Vec<SkippedFile>,
}

/// Resolves the project, loads the config, ingests files (or a saved
/// collection) and installs the rule list: collection rules, then config
/// rules and presets, then command-line rules and presets.
pub fn prepare_working_set(source: &SourceOpts) -> Result<WorkingSet> {
    let project_root = Config::determine_project_root(source.project_config.project_root.as_ref())
        .context("Failed to determine project root")?;
    log::info!("Project root determined: {}", project_root.display());

    let config = load_config_for_command(
        &project_root,
        &source.project_config,
        &source.ignore_toggles,
    )?;

    let (mut session, skipped) = match &source.exclusion.collection {
        Some(path) => {
            let collection = Collection::load_from_path(path)
                .with_context(|| format!("Failed to load collection {}", path.display()))?;
            (Session::from_collection(collection), Vec::new())
        }
        None => {
            let report = gather_files(&project_root, &config)
                .context("Failed to gather project files")?;
            let mut session = Session::with_options(config.concat.clone());
            session.add_files(report.files);
            (session, report.skipped)
        }
    };

    for rule in config.effective_rules()? {
        let description = rule.to_string();
        match session.add_rule(rule) {
            Ok(true) => {}
            Ok(false) => log::debug!("Configured rule {} is already active", description),
            Err(e) => log::warn!("Ignoring configured rule {}: {}", description, e),
        }
    }
    for rule in cli_rules(&source.exclusion) {
        let description = rule.to_string();
        if !session.add_rule(rule)? {
            log::debug!("Command-line rule {} is already active", description);
        }
    }
    for name in &source.exclusion.preset {
        let added = session.apply_preset(name)?;
        log::debug!("CLI preset '{}' added {} rules", name, added);
    }

    if let Some(key) = config.sort.key {
        session.sort(key, config.sort.order);
    }

    log::debug!(
        "Working set ready: {} files, {} rules, {} skipped",
        session.files().len(),
        session.rules().len(),
        skipped.len()
    );
    Ok(WorkingSet {
        project_root,
        config,
        session,
        skipped,
    })
}

fn cli_rules(exclusion: &ExclusionGroup) -> Vec<ExclusionRule> {
    let groups = [
        (RuleKind::Extension, &exclusion.exclude_ext),
        (RuleKind::Glob, &exclusion.exclude_glob),
        (RuleKind::Regex, &exclusion.exclude_regex),
        (RuleKind::PathSubstring, &exclusion.exclude_path),
    ];
    groups
        .into_iter()
        .flat_map(|(kind, patterns)| {
            patterns.iter().map(move |pattern| {
                ExclusionRule::new(kind, pattern.clone()).with_description("command line")
            })
        })
        .collect()
}

pub fn parse_rule_kind(kind: &str) -> Result<RuleKind> {
    Ok(kind.parse::<RuleKind>()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli_args::ProjectConfigOpts;
    use std::fs;
    use tempfile::TempDir;

    fn source_for(dir: &TempDir) -> SourceOpts {
        SourceOpts {
            project_config: ProjectConfigOpts {
                project_root: Some(dir.path().to_path_buf()),
                no_config_file: true,
                ..ProjectConfigOpts::default()
            },
            ..SourceOpts::default()
        }
    }

    #[test]
    fn cli_rules_keep_flag_order_by_kind() {
        let exclusion = ExclusionGroup {
            exclude_ext: vec!["log".into()],
            exclude_path: vec!["vendor/".into()],
            exclude_glob: vec!["*.snap".into()],
            ..ExclusionGroup::default()
        };
        let rules: Vec<String> = cli_rules(&exclusion).iter().map(|r| r.to_string()).collect();
        assert_eq!(rules, vec!["extension:log", "glob:*.snap", "path:vendor/"]);
    }

    #[test]
    fn working_set_combines_walk_and_rules() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("main.rs"), "fn main() {}\n").unwrap();
        fs::write(dir.path().join("debug.log"), "noise\n").unwrap();
        fs::write(dir.path().join("logo.png"), b"\x89PNG\r\n\x1a\n\x00").unwrap();

        let mut source = source_for(&dir);
        source.exclusion.exclude_ext = vec!["log".into()];
        let working = prepare_working_set(&source).unwrap();

        assert_eq!(working.session.files().len(), 2);
        assert_eq!(working.skipped.len(), 1);
        let outcome = working.session.outcome();
        let included: Vec<&str> = outcome.included.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(included, vec!["main.rs"]);
    }

    #[test]
    fn invalid_cli_rule_is_an_error() {
        let dir = TempDir::new().unwrap();
        let mut source = source_for(&dir);
        source.exclusion.exclude_regex = vec!["(".into()];
        let err = prepare_working_set(&source).err().unwrap();
        assert!(matches!(
            err.downcast_ref::<AppError>(),
            Some(AppError::InvalidArgument(_))
        ));
    }

    #[test]
    fn reloading_a_collection_does_not_grow_its_rules() {
        let dir = TempDir::new().unwrap();
        let project = dir.path().join("project");
        let config_dir = project.join(".xconcat");
        fs::create_dir_all(&config_dir).unwrap();
        fs::write(project.join("main.rs"), "fn main() {}\n").unwrap();
        fs::write(
            config_dir.join("xconcat.toml"),
            "[[rules]]\nkind = \"extension\"\npattern = \"log\"\n",
        )
        .unwrap();
        let collection_path = dir.path().join("set.json");

        let mut source = SourceOpts {
            project_config: ProjectConfigOpts {
                project_root: Some(project.clone()),
                ..ProjectConfigOpts::default()
            },
            ..SourceOpts::default()
        };
        source.exclusion.exclude_path = vec!["target/".into()];
        let first = prepare_working_set(&source).unwrap();
        let expected = first.session.rules().len();
        assert_eq!(expected, 2);
        first
            .session
            .to_collection("set")
            .save_to_path(&collection_path)
            .unwrap();

        source.exclusion.collection = Some(collection_path.clone());
        for _ in 0..2 {
            let working = prepare_working_set(&source).unwrap();
            assert_eq!(working.session.rules().len(), expected);
            assert_eq!(working.session.files().len(), 1);
            working
                .session
                .to_collection("set")
                .save_to_path(&collection_path)
                .unwrap();
        }
    }
}
