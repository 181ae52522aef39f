use super::{ExclusionRule, RuleKind};
use regex::{Regex, RegexBuilder};

/// A rule with its pattern prepared for repeated matching.
///
/// Compilation never fails outward: a pattern that cannot be turned into a
/// matcher yields [`Matcher::Never`], so one bad rule only ever fails to
/// exclude and never aborts a filtering pass.
#[derive(Debug, Clone)]
pub struct CompiledRule<'r> {
    pub rule: &'r ExclusionRule,
    matcher: Matcher,
}

#[derive(Debug, Clone)]
enum Matcher {
    Never,
    Suffix(String),
    Pattern(Regex),
    Substring(String),
}

impl<'r> CompiledRule<'r> {
    pub fn new(rule: &'r ExclusionRule) -> Self {
        Self {
            rule,
            matcher: compile(rule),
        }
    }

    pub fn is_match(&self, path: &str) -> bool {
        match &self.matcher {
            Matcher::Never => false,
            Matcher::Suffix(suffix) => path.to_lowercase().ends_with(suffix.as_str()),
            // Glob patterns are compiled case-insensitively, regex patterns
            // see the original-case path.
            Matcher::Pattern(re) => re.is_match(path),
            Matcher::Substring(needle) => path.to_lowercase().contains(needle.as_str()),
        }
    }
}

fn compile(rule: &ExclusionRule) -> Matcher {
    if !rule.enabled {
        return Matcher::Never;
    }
    if rule.pattern.trim().is_empty() {
        log::debug!("Rule {} has a blank pattern and matches nothing", rule.id);
        return Matcher::Never;
    }
    let lower = rule.pattern.to_lowercase();
    match rule.kind {
        RuleKind::Extension => {
            if lower.starts_with('.') {
                Matcher::Suffix(lower)
            } else {
                Matcher::Suffix(format!(".{}", lower))
            }
        }
        RuleKind::Glob => match build_case_insensitive(&glob_to_regex(&lower)) {
            Ok(re) => Matcher::Pattern(re),
            Err(e) => {
                log::warn!("Glob rule '{}' does not compile: {}", rule.pattern, e);
                Matcher::Never
            }
        },
        RuleKind::Regex => match build_case_insensitive(&rule.pattern) {
            Ok(re) => Matcher::Pattern(re),
            Err(e) => {
                log::warn!("Regex rule '{}' does not compile: {}", rule.pattern, e);
                Matcher::Never
            }
        },
        RuleKind::PathSubstring => Matcher::Substring(lower),
    }
}

pub(crate) fn build_case_insensitive(pattern: &str) -> Result<Regex, regex::Error> {
    RegexBuilder::new(pattern).case_insensitive(true).build()
}

/// Converts a glob to an anchored regular expression. Only `*` (any run of
/// characters, `/` included) and `?` (any single character) are special;
/// everything else is literal.
pub fn glob_to_regex(glob: &str) -> String {
    let mut out = String::with_capacity(glob.len() + 8);
    out.push('^');
    let mut literal = String::new();
    for c in glob.chars() {
        match c {
            '*' | '?' => {
                out.push_str(&regex::escape(&literal));
                literal.clear();
                out.push_str(if c == '*' { ".*" } else { "." });
            }
            _ => literal.push(c),
        }
    }
    out.push_str(&regex::escape(&literal));
    out.push('$');
    out
}

/// Whether `rule` matches `path`. Disabled rules never match, and neither
/// does a rule whose pattern cannot be compiled.
///
/// A blank pattern is treated as malformed and matches nothing in every
/// dialect, including [`RuleKind::PathSubstring`] where an empty needle
/// would otherwise match every path.
pub fn matches(path: &str, rule: &ExclusionRule) -> bool {
    let matched = CompiledRule::new(rule).is_match(path);
    log::trace!("Rule {} against '{}': {}", rule, path, matched);
    matched
}
