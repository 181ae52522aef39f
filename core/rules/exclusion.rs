use super::matcher::{CompiledRule, build_case_insensitive, glob_to_regex};
use super::{ExclusionRule, RuleKind};
use crate::model::ProcessedFile;
use once_cell::sync::Lazy;
use rayon::prelude::*;
use regex::Regex;
use serde::Serialize;

static EXTENSION_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\.?[A-Za-z0-9]+$").expect("extension validation pattern is valid")
});

/// Outcome of evaluating an ordered rule list against one path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Evaluation<'r> {
    pub excluded: bool,
    pub matched_rule: Option<&'r ExclusionRule>,
}

impl<'r> Evaluation<'r> {
    fn included() -> Self {
        Self {
            excluded: false,
            matched_rule: None,
        }
    }

    fn excluded_by(rule: &'r ExclusionRule) -> Self {
        Self {
            excluded: true,
            matched_rule: Some(rule),
        }
    }
}

/// Returns the first rule in list order that matches `path`.
pub fn evaluate<'r>(path: &str, rules: &'r [ExclusionRule]) -> Evaluation<'r> {
    let compiled: Vec<CompiledRule<'r>> = rules.iter().map(CompiledRule::new).collect();
    first_match(path, &compiled)
}

fn first_match<'r>(path: &str, compiled: &[CompiledRule<'r>]) -> Evaluation<'r> {
    for rule in compiled {
        if rule.is_match(path) {
            log::trace!("'{}' excluded by rule {}", path, rule.rule);
            return Evaluation::excluded_by(rule.rule);
        }
    }
    Evaluation::included()
}

/// Files split by the exclusion pass. Both lists keep input order.
#[derive(Debug, Clone, Default)]
pub struct FilterOutcome<'f, 'r> {
    pub included: Vec<&'f ProcessedFile>,
    pub excluded: Vec<(&'f ProcessedFile, &'r ExclusionRule)>,
}

/// Evaluates every file against `rules`, compiling each rule once.
pub fn filter_files<'f, 'r>(
    files: &'f [ProcessedFile],
    rules: &'r [ExclusionRule],
) -> FilterOutcome<'f, 'r> {
    let compiled: Vec<CompiledRule<'r>> = rules.iter().map(CompiledRule::new).collect();
    log::debug!(
        "Filtering {} files against {} rules ({} enabled)",
        files.len(),
        rules.len(),
        rules.iter().filter(|r| r.enabled).count()
    );

    let decisions: Vec<Option<&'r ExclusionRule>> = files
        .par_iter()
        .map(|file| first_match(&file.path, &compiled).matched_rule)
        .collect();

    let mut outcome = FilterOutcome::default();
    for (file, decision) in files.iter().zip(decisions) {
        match decision {
            Some(rule) => outcome.excluded.push((file, rule)),
            None => outcome.included.push(file),
        }
    }
    log::info!(
        "{} files included, {} excluded",
        outcome.included.len(),
        outcome.excluded.len()
    );
    outcome
}

/// Authoring-time check of a pattern. Matching never consults this.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatternValidation {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PatternValidation {
    fn ok() -> Self {
        Self {
            valid: true,
            error: None,
        }
    }

    fn invalid(message: impl Into<String>) -> Self {
        Self {
            valid: false,
            error: Some(message.into()),
        }
    }
}

pub fn validate(pattern: &str, kind: RuleKind) -> PatternValidation {
    if pattern.trim().is_empty() {
        return PatternValidation::invalid("Pattern cannot be empty");
    }
    match kind {
        RuleKind::Extension => {
            if EXTENSION_PATTERN.is_match(pattern) {
                PatternValidation::ok()
            } else {
                PatternValidation::invalid(
                    "Extension may only contain letters and digits, optionally prefixed with '.'",
                )
            }
        }
        RuleKind::Glob => match build_case_insensitive(&glob_to_regex(pattern)) {
            Ok(_) => PatternValidation::ok(),
            Err(e) => PatternValidation::invalid(format!("Invalid glob pattern: {}", e)),
        },
        RuleKind::Regex => match build_case_insensitive(pattern) {
            Ok(_) => PatternValidation::ok(),
            Err(e) => PatternValidation::invalid(format!("Invalid regular expression: {}", e)),
        },
        RuleKind::PathSubstring => {
            if pattern.contains("..") {
                PatternValidation::invalid("Path pattern must not contain '..'")
            } else {
                PatternValidation::ok()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn file(path: &str) -> ProcessedFile {
        ProcessedFile::new(path, "content").unwrap()
    }

    #[test]
    fn empty_rule_list_never_excludes() {
        let eval = evaluate("src/main.rs", &[]);
        assert!(!eval.excluded);
        assert!(eval.matched_rule.is_none());
    }

    #[test]
    fn first_matching_rule_wins() {
        let rules = vec![
            ExclusionRule::new(RuleKind::Extension, "ts"),
            ExclusionRule::new(RuleKind::PathSubstring, "test"),
        ];
        let eval = evaluate("test/file.ts", &rules);
        assert!(eval.excluded);
        assert_eq!(eval.matched_rule.map(|r| r.id.as_str()), Some(rules[0].id.as_str()));
    }

    #[test]
    fn disabled_rules_are_skipped_in_order() {
        let rules = vec![
            ExclusionRule::new(RuleKind::Extension, "ts").disabled(),
            ExclusionRule::new(RuleKind::PathSubstring, "test"),
        ];
        let eval = evaluate("test/file.ts", &rules);
        assert_eq!(eval.matched_rule.map(|r| r.id.as_str()), Some(rules[1].id.as_str()));
    }

    #[test]
    fn broken_rule_does_not_block_later_rules() {
        let rules = vec![
            ExclusionRule::new(RuleKind::Regex, "[invalid("),
            ExclusionRule::new(RuleKind::Glob, "*.log"),
        ];
        let eval = evaluate("debug.log", &rules);
        assert_eq!(eval.matched_rule.map(|r| r.kind), Some(RuleKind::Glob));
        assert!(!evaluate("main.rs", &rules).excluded);
    }

    #[test]
    fn filter_files_preserves_order_and_reasons() {
        let files = vec![file("b.rs"), file("node_modules/x.js"), file("a.rs"), file("c.lock")];
        let rules = vec![
            ExclusionRule::new(RuleKind::PathSubstring, "node_modules"),
            ExclusionRule::new(RuleKind::Extension, "lock"),
        ];
        let outcome = filter_files(&files, &rules);
        let included: Vec<&str> = outcome.included.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(included, vec!["b.rs", "a.rs"]);
        let excluded: Vec<(&str, RuleKind)> = outcome
            .excluded
            .iter()
            .map(|(f, r)| (f.path.as_str(), r.kind))
            .collect();
        assert_eq!(
            excluded,
            vec![
                ("node_modules/x.js", RuleKind::PathSubstring),
                ("c.lock", RuleKind::Extension)
            ]
        );
    }

    #[test]
    fn validate_rejects_blank_patterns() {
        for kind in RuleKind::ALL {
            let v = validate("   ", kind);
            assert!(!v.valid);
            assert_eq!(v.error.as_deref(), Some("Pattern cannot be empty"));
        }
    }

    #[test]
    fn validate_extension_characters() {
        assert!(validate("rs", RuleKind::Extension).valid);
        assert!(validate(".tsx", RuleKind::Extension).valid);
        assert!(!validate("*.rs", RuleKind::Extension).valid);
        assert!(!validate("tar.gz", RuleKind::Extension).valid);
    }

    #[test]
    fn validate_glob_and_regex_compile() {
        assert!(validate("src/**/*.rs", RuleKind::Glob).valid);
        assert!(validate(r"\.(test|spec)\.js$", RuleKind::Regex).valid);
        let bad = validate("[invalid(", RuleKind::Regex);
        assert!(!bad.valid);
        assert!(bad.error.unwrap().starts_with("Invalid regular expression"));
    }

    #[test]
    fn validate_path_rejects_traversal() {
        assert!(validate("src/generated", RuleKind::PathSubstring).valid);
        assert!(!validate("../secrets", RuleKind::PathSubstring).valid);
    }

    proptest! {
        #[test]
        fn no_rules_means_not_excluded(path in "[a-zA-Z0-9_./-]{0,60}") {
            let eval = evaluate(&path, &[]);
            prop_assert!(!eval.excluded);
            prop_assert!(eval.matched_rule.is_none());
        }
    }
}
