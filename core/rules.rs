use crate::error::{AppError, Result};
use crate::model::new_id;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub mod exclusion;
pub mod matcher;
pub mod presets;
pub mod suggest;

pub use exclusion::{Evaluation, FilterOutcome, PatternValidation, evaluate, filter_files, validate};
pub use matcher::{CompiledRule, glob_to_regex, matches};
pub use presets::{Preset, preset, presets};
pub use suggest::{RuleSuggestion, suggest_rules};

/// The four exclusion dialects. Unknown tags are rejected when parsing, both
/// from strings and from configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    Extension,
    Glob,
    Regex,
    #[serde(alias = "path")]
    PathSubstring,
}

impl RuleKind {
    pub const ALL: [RuleKind; 4] = [
        RuleKind::Extension,
        RuleKind::Glob,
        RuleKind::Regex,
        RuleKind::PathSubstring,
    ];
}

impl FromStr for RuleKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "extension" | "ext" => Ok(RuleKind::Extension),
            "glob" => Ok(RuleKind::Glob),
            "regex" | "re" => Ok(RuleKind::Regex),
            "path" | "path_substring" | "substring" => Ok(RuleKind::PathSubstring),
            other => Err(AppError::UnknownRuleKind(other.to_string())),
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RuleKind::Extension => "extension",
            RuleKind::Glob => "glob",
            RuleKind::Regex => "regex",
            RuleKind::PathSubstring => "path",
        };
        f.write_str(s)
    }
}

/// One user-authored filter. Rules are evaluated in list order and the first
/// match is reported as the exclusion reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExclusionRule {
    #[serde(default = "new_id")]
    pub id: String,
    pub kind: RuleKind,
    pub pattern: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn default_enabled() -> bool {
    true
}

impl ExclusionRule {
    pub fn new(kind: RuleKind, pattern: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            kind,
            pattern: pattern.into(),
            enabled: true,
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Two rules with the same dialect and case-folded pattern exclude the
    /// same paths.
    pub fn same_filter(&self, other: &ExclusionRule) -> bool {
        self.kind == other.kind && self.pattern.to_lowercase() == other.pattern.to_lowercase()
    }
}

impl fmt::Display for ExclusionRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.pattern)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_kind_parses_aliases() {
        assert_eq!("ext".parse::<RuleKind>().unwrap(), RuleKind::Extension);
        assert_eq!("GLOB".parse::<RuleKind>().unwrap(), RuleKind::Glob);
        assert_eq!("re".parse::<RuleKind>().unwrap(), RuleKind::Regex);
        assert_eq!("path".parse::<RuleKind>().unwrap(), RuleKind::PathSubstring);
    }

    #[test]
    fn unknown_rule_kind_is_an_error() {
        let err = "wildcard".parse::<RuleKind>().unwrap_err();
        assert!(matches!(err, AppError::UnknownRuleKind(ref k) if k == "wildcard"));
    }

    #[test]
    fn rules_deserialize_with_generated_ids() {
        let rule: ExclusionRule =
            toml::from_str("kind = \"path\"\npattern = \"node_modules/\"").unwrap();
        assert_eq!(rule.kind, RuleKind::PathSubstring);
        assert!(rule.enabled);
        assert!(!rule.id.is_empty());
    }

    #[test]
    fn unknown_kind_tag_fails_deserialization() {
        let parsed: std::result::Result<ExclusionRule, _> =
            toml::from_str("kind = \"fuzzy\"\npattern = \"x\"");
        assert!(parsed.is_err());
    }

    #[test]
    fn same_filter_ignores_case_and_id() {
        let a = ExclusionRule::new(RuleKind::Glob, "*.LOG");
        let b = ExclusionRule::new(RuleKind::Glob, "*.log");
        let c = ExclusionRule::new(RuleKind::PathSubstring, "*.log");
        assert!(a.same_filter(&b));
        assert!(!a.same_filter(&c));
    }
}
