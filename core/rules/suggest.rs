use super::matcher::CompiledRule;
use super::{ExclusionRule, RuleKind, filter_files};
use crate::model::ProcessedFile;
use serde::Serialize;

/// A rule worth adding, with the number of currently included files it
/// would remove.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleSuggestion {
    pub rule: ExclusionRule,
    pub reason: &'static str,
    pub affected_files: usize,
}

const CATALOGUE: &[(RuleKind, &str, &str)] = &[
    (RuleKind::PathSubstring, "node_modules/", "Installed npm dependencies"),
    (RuleKind::PathSubstring, "vendor/", "Vendored third-party code"),
    (RuleKind::PathSubstring, "target/", "Cargo build output"),
    (RuleKind::PathSubstring, "__pycache__/", "Python bytecode cache"),
    (RuleKind::PathSubstring, ".venv/", "Python virtual environment"),
    (RuleKind::Regex, "(^|/)(dist|build|out)/", "Build output directory"),
    (RuleKind::PathSubstring, "coverage/", "Test coverage reports"),
    (RuleKind::PathSubstring, ".git/", "Git metadata"),
    (RuleKind::PathSubstring, ".idea/", "IDE settings"),
    (RuleKind::PathSubstring, ".vscode/", "Editor settings"),
    (RuleKind::Extension, "lock", "Lock file"),
    (RuleKind::Glob, "*package-lock.json", "npm lock file"),
    (RuleKind::Glob, "*pnpm-lock.yaml", "pnpm lock file"),
    (RuleKind::Regex, r"\.min\.(js|css)$", "Minified bundle"),
    (RuleKind::Extension, "map", "Source map"),
    (RuleKind::Extension, "log", "Log file"),
];

/// Proposes rules for well-known noise found among the files that
/// `existing_rules` currently let through. Filters already covered by an
/// enabled rule are never suggested.
pub fn suggest_rules(
    files: &[ProcessedFile],
    existing_rules: &[ExclusionRule],
) -> Vec<RuleSuggestion> {
    let included = filter_files(files, existing_rules).included;
    let mut suggestions = Vec::new();

    for &(kind, pattern, reason) in CATALOGUE {
        let rule = ExclusionRule::new(kind, pattern).with_description(reason);
        if existing_rules
            .iter()
            .any(|existing| existing.enabled && existing.same_filter(&rule))
        {
            continue;
        }
        let compiled = CompiledRule::new(&rule);
        let affected_files = included.iter().filter(|f| compiled.is_match(&f.path)).count();
        if affected_files > 0 {
            log::debug!("Suggesting rule {} ({} files)", rule, affected_files);
            suggestions.push(RuleSuggestion {
                rule,
                reason,
                affected_files,
            });
        }
    }
    suggestions
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files(paths: &[&str]) -> Vec<ProcessedFile> {
        paths
            .iter()
            .map(|p| ProcessedFile::new(p, "x").unwrap())
            .collect()
    }

    #[test]
    fn suggests_noise_with_counts_in_catalogue_order() {
        let working_set = files(&[
            "src/main.rs",
            "Cargo.lock",
            "web/node_modules/a/index.js",
            "web/node_modules/b/index.js",
            "web/app.min.js",
        ]);
        let suggestions = suggest_rules(&working_set, &[]);
        let summary: Vec<(&str, usize)> = suggestions
            .iter()
            .map(|s| (s.rule.pattern.as_str(), s.affected_files))
            .collect();
        assert_eq!(
            summary,
            vec![("node_modules/", 2), ("lock", 1), (r"\.min\.(js|css)$", 1)]
        );
    }

    #[test]
    fn covered_filters_are_not_suggested() {
        let working_set = files(&["Cargo.lock", "a/node_modules/x.js"]);
        let existing = vec![ExclusionRule::new(RuleKind::PathSubstring, "NODE_MODULES/")];
        let suggestions = suggest_rules(&working_set, &existing);
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].rule.pattern, "lock");
    }

    #[test]
    fn disabled_existing_rule_does_not_cover() {
        let working_set = files(&["Cargo.lock"]);
        let existing = vec![ExclusionRule::new(RuleKind::Extension, "lock").disabled()];
        assert_eq!(suggest_rules(&working_set, &existing).len(), 1);
    }

    #[test]
    fn clean_working_set_has_no_suggestions() {
        assert!(suggest_rules(&files(&["src/lib.rs", "README.md"]), &[]).is_empty());
    }
}
