use super::{ExclusionRule, RuleKind};
use crate::error::{AppError, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

/// A named bundle of rules shipped with the binary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preset {
    pub name: String,
    pub description: String,
    pub rules: Vec<PresetRule>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresetRule {
    pub kind: RuleKind,
    pub pattern: String,
    #[serde(default)]
    pub description: Option<String>,
}

static BUILTIN_PRESETS: Lazy<Vec<Preset>> = Lazy::new(|| {
    let yaml_content = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/../data/presets.yaml"));
    serde_yml::from_str(yaml_content).expect("Failed to parse embedded data/presets.yaml")
});

pub fn presets() -> &'static [Preset] {
    &BUILTIN_PRESETS
}

pub fn preset(name: &str) -> Result<&'static Preset> {
    presets()
        .iter()
        .find(|p| p.name.eq_ignore_ascii_case(name.trim()))
        .ok_or_else(|| AppError::UnknownPreset(name.to_string()))
}

impl Preset {
    /// Fresh rules (new ids) for every entry of the preset.
    pub fn to_rules(&self) -> Vec<ExclusionRule> {
        self.rules
            .iter()
            .map(|r| {
                let rule = ExclusionRule::new(r.kind, r.pattern.clone());
                match &r.description {
                    Some(desc) => rule.with_description(desc.clone()),
                    None => rule.with_description(format!("preset: {}", self.name)),
                }
            })
            .collect()
    }

    /// Appends this preset's rules to `rules`, skipping filters already
    /// present. Returns how many rules were added.
    pub fn apply_to(&self, rules: &mut Vec<ExclusionRule>) -> usize {
        let mut added = 0;
        for candidate in self.to_rules() {
            if rules.iter().any(|existing| existing.same_filter(&candidate)) {
                log::trace!("Preset '{}' rule {} already present", self.name, candidate);
                continue;
            }
            rules.push(candidate);
            added += 1;
        }
        log::debug!("Applied preset '{}': {} rules added", self.name, added);
        added
    }
}
