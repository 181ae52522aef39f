use crate::error::{AppError, Result};
use crate::gather::WalkOptions;
use crate::model::ConcatenationOptions;
use crate::ordering::{SortKey, SortOrder};
use crate::output_formats::ExportFormat;
use crate::rules::{ExclusionRule, preset};
use byte_unit::Byte;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const DEFAULT_CONFIG_DIR: &str = ".xconcat";
pub const DEFAULT_CONFIG_FILENAME: &str = "xconcat.toml";
pub const DEFAULT_MAX_FILE_SIZE: &str = "2MB";

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Built-in presets applied after `rules`, by name.
    #[serde(default)]
    pub presets: Vec<String>,
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub concat: ConcatenationOptions,
    #[serde(default)]
    pub sort: SortConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub rules: Vec<ExclusionRule>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct GeneralConfig {
    #[serde(default)]
    pub project_name: Option<String>,
    #[serde(default = "default_true")]
    pub use_gitignore: bool,
    #[serde(default = "default_true")]
    pub enable_builtin_ignore: bool,
    #[serde(default)]
    pub follow_links: bool,
    #[serde(default = "default_max_file_size")]
    pub max_file_size: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct SortConfig {
    /// `None` keeps ingestion order.
    #[serde(default)]
    pub key: Option<SortKey>,
    #[serde(default)]
    pub order: SortOrder,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: ExportFormat,
    #[serde(default = "default_true")]
    pub json_minify: bool,
    #[serde(default)]
    pub title: Option<String>,
}

fn default_true() -> bool {
    true
}
fn default_max_file_size() -> String {
    DEFAULT_MAX_FILE_SIZE.to_string()
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            project_name: None,
            use_gitignore: default_true(),
            enable_builtin_ignore: default_true(),
            follow_links: false,
            max_file_size: default_max_file_size(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: ExportFormat::default(),
            json_minify: default_true(),
            title: None,
        }
    }
}

impl Config {
    /// Resolves the directory xconcat works in: the `--project-root` value,
    /// then `PROJECT_ROOT`, then the current directory. `~` is expanded and
    /// the result canonicalized.
    pub fn determine_project_root(cli_project_root: Option<&PathBuf>) -> Result<PathBuf> {
        let requested = match cli_project_root {
            Some(root) => Some(root.to_string_lossy().into_owned()),
            None => env::var("PROJECT_ROOT").ok().filter(|s| !s.is_empty()),
        };
        let root = match requested {
            Some(raw) => PathBuf::from(shellexpand::tilde(&raw).as_ref()),
            None => env::current_dir()?,
        };
        root.canonicalize().map_err(|e| {
            AppError::Io(std::io::Error::new(
                e.kind(),
                format!("Project root '{}' is not usable: {}", root.display(), e),
            ))
        })
    }

    /// Picks the config file for a run. `--config-file` may be a path (a
    /// missing `.toml` extension is added) or a bare name looked up in
    /// `.xconcat/`. Without it, `.xconcat/xconcat.toml` is used when present.
    pub fn resolve_config_path(
        project_root: &Path,
        cli_config_file: Option<&String>,
        cli_disable_config: bool,
    ) -> Result<Option<PathBuf>> {
        if cli_disable_config {
            log::debug!("Skipping config file (--no-config-file)");
            return Ok(None);
        }
        let config_dir = project_root.join(DEFAULT_CONFIG_DIR);

        let Some(requested) = cli_config_file else {
            let default_file = config_dir.join(DEFAULT_CONFIG_FILENAME);
            if default_file.is_file() {
                log::debug!("Found project config {}", default_file.display());
                return Ok(Some(default_file));
            }
            log::debug!("No project config at {}", default_file.display());
            return Ok(None);
        };

        let expanded = PathBuf::from(shellexpand::tilde(requested).as_ref());
        let is_bare_name = !expanded.is_absolute()
            && expanded.components().count() == 1
            && !requested.contains(['/', '\\']);

        let candidate = if is_bare_name {
            let mut file_name = expanded.into_os_string();
            if !requested.ends_with(".toml") {
                file_name.push(".toml");
            }
            config_dir.join(file_name)
        } else if !expanded.exists() && expanded.extension().is_none() {
            expanded.with_extension("toml")
        } else {
            expanded
        };

        if !candidate.exists() {
            return Err(AppError::Config(format!(
                "Config file '{}' does not exist (looked for {})",
                requested,
                candidate.display()
            )));
        }
        log::debug!("Using config file {}", candidate.display());
        Ok(Some(candidate))
    }

    pub fn load_from_path(config_path: &Path) -> Result<Self> {
        log::info!("Loading configuration from: {}", config_path.display());
        let toml_content = fs::read_to_string(config_path).map_err(|e| AppError::FileRead {
            path: config_path.to_path_buf(),
            source: e,
        })?;
        Self::from_toml_str(&toml_content).map_err(|e| match e {
            AppError::TomlParse(msg) => AppError::TomlParse(format!(
                "Error parsing config file '{}': {}. Check TOML syntax and structure.",
                config_path.display(),
                msg
            )),
            other => other,
        })
    }

    pub fn from_toml_str(toml_content: &str) -> Result<Self> {
        toml::from_str::<Config>(toml_content).map_err(|e| AppError::TomlParse(e.to_string()))
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn max_file_size_bytes(&self) -> Result<u64> {
        Byte::from_str(&self.general.max_file_size)
            .map(|b| b.as_u64())
            .map_err(|e| {
                AppError::SizeParse(format!(
                    "Invalid max_file_size '{}': {}. Use a value like '512KB' or '2MiB'.",
                    self.general.max_file_size, e
                ))
            })
    }

    pub fn walk_options(&self) -> WalkOptions {
        WalkOptions {
            use_gitignore: self.general.use_gitignore,
            enable_builtin_ignore: self.general.enable_builtin_ignore,
            follow_links: self.general.follow_links,
        }
    }

    /// Configured rules followed by the rules of every listed preset.
    /// Preset rules whose filter is already present are not duplicated.
    pub fn effective_rules(&self) -> Result<Vec<ExclusionRule>> {
        let mut rules = self.rules.clone();
        for name in &self.presets {
            let added = preset(name)?.apply_to(&mut rules);
            log::debug!("Preset '{}' contributed {} rules", name, added);
        }
        Ok(rules)
    }

    pub fn get_effective_project_name(&self, project_root: &Path) -> String {
        self.general.project_name.clone().unwrap_or_else(|| {
            project_root
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| "UnknownProject".to_string())
        })
    }

    pub fn get_effective_title(&self, project_root: &Path) -> String {
        self.output.title.clone().unwrap_or_else(|| {
            format!("{} files", self.get_effective_project_name(project_root))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::HeaderFormat;
    use crate::rules::RuleKind;
    use tempfile::TempDir;

    #[test]
    fn empty_file_yields_defaults() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(config.max_file_size_bytes().unwrap(), 2_000_000);
        assert!(config.general.use_gitignore);
        assert_eq!(config.concat.separator, "\n\n");
    }

    #[test]
    fn full_file_parses() {
        let config = Config::from_toml_str(
            r#"
presets = ["lockfiles"]

[general]
project_name = "demo"
max_file_size = "512KiB"

[concat]
header_format = "markdown"
separator = "\n---\n"

[sort]
key = "size"
order = "desc"

[output]
format = "json"
json_minify = false

[[rules]]
kind = "extension"
pattern = "log"

[[rules]]
kind = "path"
pattern = "node_modules/"
enabled = false
"#,
        )
        .unwrap();
        assert_eq!(config.general.project_name.as_deref(), Some("demo"));
        assert_eq!(config.max_file_size_bytes().unwrap(), 512 * 1024);
        assert_eq!(config.concat.header_format, HeaderFormat::Markdown);
        assert_eq!(config.sort.key, Some(SortKey::Size));
        assert_eq!(config.sort.order, SortOrder::Desc);
        assert_eq!(config.output.format, ExportFormat::Json);
        assert_eq!(config.rules.len(), 2);
        assert_eq!(config.rules[1].kind, RuleKind::PathSubstring);
        assert!(!config.rules[1].enabled);

        let rules = config.effective_rules().unwrap();
        assert!(rules.len() > 2);
        assert_eq!(rules[0].pattern, "log");
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(matches!(
            Config::from_toml_str("[general]\nbogus = 1\n"),
            Err(AppError::TomlParse(_))
        ));
    }

    #[test]
    fn bad_size_and_unknown_preset_are_errors() {
        let mut config = Config::default();
        config.general.max_file_size = "lots".into();
        assert!(matches!(config.max_file_size_bytes(), Err(AppError::SizeParse(_))));

        let config = Config {
            presets: vec!["nope".into()],
            ..Config::default()
        };
        assert!(matches!(config.effective_rules(), Err(AppError::UnknownPreset(_))));
    }

    #[test]
    fn default_config_round_trips_through_toml() {
        let config = Config {
            rules: vec![ExclusionRule::new(RuleKind::Glob, "*.snap")],
            presets: vec!["rust".into()],
            ..Config::default()
        };
        let text = config.to_toml_string().unwrap();
        assert_eq!(Config::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn config_path_resolution() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        assert_eq!(Config::resolve_config_path(root, None, false).unwrap(), None);

        let config_dir = root.join(DEFAULT_CONFIG_DIR);
        fs::create_dir_all(&config_dir).unwrap();
        fs::write(config_dir.join(DEFAULT_CONFIG_FILENAME), "").unwrap();
        fs::write(config_dir.join("alt.toml"), "").unwrap();

        assert_eq!(
            Config::resolve_config_path(root, None, false).unwrap(),
            Some(config_dir.join(DEFAULT_CONFIG_FILENAME))
        );
        assert_eq!(
            Config::resolve_config_path(root, Some(&"alt".to_string()), false).unwrap(),
            Some(config_dir.join("alt.toml"))
        );
        assert_eq!(Config::resolve_config_path(root, None, true).unwrap(), None);
        assert!(Config::resolve_config_path(root, Some(&"missing".to_string()), false).is_err());
    }

    #[test]
    fn config_path_given_as_path_gets_toml_extension() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("conf").join("team.toml");
        fs::create_dir_all(file.parent().unwrap()).unwrap();
        fs::write(&file, "").unwrap();

        let without_ext = dir.path().join("conf").join("team");
        let requested = without_ext.to_string_lossy().to_string();
        assert_eq!(
            Config::resolve_config_path(dir.path(), Some(&requested), false).unwrap(),
            Some(file)
        );
    }

    #[test]
    fn project_root_is_canonicalized() {
        let dir = TempDir::new().unwrap();
        let nested = dir.path().join("a");
        fs::create_dir_all(&nested).unwrap();
        let dotted = nested.join("..").join("a");
        assert_eq!(
            Config::determine_project_root(Some(&dotted)).unwrap(),
            nested.canonicalize().unwrap()
        );
        assert!(Config::determine_project_root(Some(&dir.path().join("missing"))).is_err());
    }

    #[test]
    fn title_falls_back_to_project_name() {
        let config = Config::default();
        assert_eq!(config.get_effective_title(Path::new("/work/demo")), "demo files");
    }
}
