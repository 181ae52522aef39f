//! Working-set state: the ingested files, the ordered rule list and the
//! concatenation options, plus their saved form as a [`Collection`].

use crate::concat::concatenate;
use crate::error::{AppError, Result};
use crate::model::{ConcatenationOptions, ProcessedFile, new_id};
use crate::ordering::{SortKey, SortOrder, sort_files};
use crate::rules::{ExclusionRule, FilterOutcome, filter_files, preset, validate};
use crate::stats::{FileStats, stats};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct Session {
    files: Vec<ProcessedFile>,
    rules: Vec<ExclusionRule>,
    options: ConcatenationOptions,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: ConcatenationOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    pub fn files(&self) -> &[ProcessedFile] {
        &self.files
    }

    pub fn rules(&self) -> &[ExclusionRule] {
        &self.rules
    }

    pub fn options(&self) -> &ConcatenationOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut ConcatenationOptions {
        &mut self.options
    }

    /// Adds files to the working set. A file whose path is already present
    /// replaces the existing entry in place. Returns the number of new paths.
    pub fn add_files<I>(&mut self, files: I) -> usize
    where
        I: IntoIterator<Item = ProcessedFile>,
    {
        let mut added = 0;
        for file in files {
            match self.files.iter_mut().find(|f| f.path == file.path) {
                Some(existing) => {
                    log::debug!("Replacing '{}' in working set", file.path);
                    *existing = file;
                }
                None => {
                    self.files.push(file);
                    added += 1;
                }
            }
        }
        added
    }

    pub fn remove_file(&mut self, id: &str) -> Option<ProcessedFile> {
        let index = self.files.iter().position(|f| f.id == id)?;
        Some(self.files.remove(index))
    }

    pub fn clear_files(&mut self) {
        self.files.clear();
    }

    /// Appends a rule after checking its pattern. A rule that filters the
    /// same paths as one already present is not added again; the return
    /// value says whether the list grew.
    pub fn add_rule(&mut self, rule: ExclusionRule) -> Result<bool> {
        let check = validate(&rule.pattern, rule.kind);
        if !check.valid {
            return Err(AppError::InvalidArgument(format!(
                "Rule {} rejected: {}",
                rule,
                check.error.unwrap_or_default()
            )));
        }
        Ok(self.push_rule(rule))
    }

    fn push_rule(&mut self, rule: ExclusionRule) -> bool {
        if self.rules.iter().any(|existing| existing.same_filter(&rule)) {
            log::trace!("Rule {} already present", rule);
            return false;
        }
        self.rules.push(rule);
        true
    }

    pub fn remove_rule(&mut self, id: &str) -> Option<ExclusionRule> {
        let index = self.rules.iter().position(|r| r.id == id)?;
        Some(self.rules.remove(index))
    }

    /// Flips a rule's `enabled` flag and returns the new value.
    pub fn toggle_rule(&mut self, id: &str) -> Option<bool> {
        let rule = self.rules.iter_mut().find(|r| r.id == id)?;
        rule.enabled = !rule.enabled;
        Some(rule.enabled)
    }

    pub fn apply_preset(&mut self, name: &str) -> Result<usize> {
        Ok(preset(name)?.apply_to(&mut self.rules))
    }

    pub fn sort(&mut self, key: SortKey, order: SortOrder) {
        sort_files(&mut self.files, key, order);
    }

    pub fn outcome(&self) -> FilterOutcome<'_, '_> {
        filter_files(&self.files, &self.rules)
    }

    pub fn stats(&self) -> FileStats {
        stats(self.outcome().included)
    }

    /// Concatenates the files that survive the current rules.
    pub fn concatenate(&self) -> String {
        concatenate(self.outcome().included, &self.options)
    }

    pub fn to_collection(&self, name: impl Into<String>) -> Collection {
        let now = Utc::now();
        Collection {
            name: name.into(),
            created_at: now,
            updated_at: now,
            files: self.files.clone(),
            rules: self.rules.clone(),
            options: self.options.clone(),
        }
    }

    /// Rebuilds a session from a saved collection. Files go through the
    /// same checks as freshly ingested ones: files without a path are
    /// dropped, sizes are recomputed, repeated ids are replaced and a
    /// repeated path keeps the last entry. Repeated rules are dropped.
    pub fn from_collection(collection: Collection) -> Self {
        let Collection {
            name,
            files,
            rules,
            options,
            ..
        } = collection;
        let mut session = Self::with_options(options);
        let mut seen_ids = HashSet::new();
        let files = files.into_iter().filter_map(|file| {
            match file.revalidated() {
                Ok(mut file) => {
                    if !seen_ids.insert(file.id.clone()) {
                        log::debug!("Collection repeats id '{}', assigning a new one", file.id);
                        file.id = new_id();
                        seen_ids.insert(file.id.clone());
                    }
                    Some(file)
                }
                Err(e) => {
                    log::warn!("Dropping file from collection '{}': {}", name, e);
                    None
                }
            }
        });
        session.add_files(files);
        for rule in rules {
            session.push_rule(rule);
        }
        session
    }
}

/// A saved working set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub files: Vec<ProcessedFile>,
    #[serde(default)]
    pub rules: Vec<ExclusionRule>,
    #[serde(default)]
    pub options: ConcatenationOptions,
}

impl Collection {
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| AppError::DirCreation {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|e| AppError::FileWrite {
            path: path.to_path_buf(),
            source: e,
        })?;
        log::info!(
            "Saved collection '{}' ({} files) to {}",
            self.name,
            self.files.len(),
            path.display()
        );
        Ok(())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path).map_err(|e| AppError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        let collection: Collection = serde_json::from_str(&json).map_err(|e| {
            AppError::Collection(format!("Invalid collection file '{}': {}", path.display(), e))
        })?;
        log::info!(
            "Loaded collection '{}' ({} files) from {}",
            collection.name,
            collection.files.len(),
            path.display()
        );
        Ok(collection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::HeaderFormat;
    use crate::rules::RuleKind;
    use tempfile::TempDir;

    fn file(path: &str, content: &str) -> ProcessedFile {
        ProcessedFile::new(path, content).unwrap()
    }

    fn plain_session() -> Session {
        Session::with_options(ConcatenationOptions {
            include_headers: false,
            header_format: HeaderFormat::None,
            custom_header_template: None,
            separator: "|".into(),
        })
    }

    #[test]
    fn same_path_replaces_in_place() {
        let mut session = Session::new();
        assert_eq!(session.add_files([file("a.rs", "1"), file("b.rs", "2")]), 2);
        assert_eq!(session.add_files([file("a.rs", "new")]), 0);
        assert_eq!(session.files().len(), 2);
        assert_eq!(session.files()[0].content, "new");
    }

    #[test]
    fn rules_drive_concatenation() {
        let mut session = plain_session();
        session.add_files([file("a.rs", "A"), file("b.log", "B"), file("c.rs", "C")]);
        let rule = ExclusionRule::new(RuleKind::Extension, "log");
        let id = rule.id.clone();
        session.add_rule(rule).unwrap();
        assert_eq!(session.concatenate(), "A|C");
        assert_eq!(session.stats().file_count, 2);

        assert_eq!(session.toggle_rule(&id), Some(false));
        assert_eq!(session.concatenate(), "A|B|C");
        assert!(session.remove_rule(&id).is_some());
        assert!(session.toggle_rule(&id).is_none());
    }

    #[test]
    fn invalid_rules_are_rejected() {
        let mut session = Session::new();
        assert!(session.add_rule(ExclusionRule::new(RuleKind::Regex, "(")).is_err());
        assert!(session.add_rule(ExclusionRule::new(RuleKind::Glob, "  ")).is_err());
        assert!(session.rules().is_empty());
    }

    #[test]
    fn presets_do_not_duplicate() {
        let mut session = Session::new();
        let first = session.apply_preset("rust").unwrap();
        assert!(first > 0);
        assert_eq!(session.apply_preset("RUST").unwrap(), 0);
        assert!(session.apply_preset("cobol").is_err());
    }

    #[test]
    fn remove_and_clear_files() {
        let mut session = Session::new();
        session.add_files([file("a", "1"), file("b", "2")]);
        let id = session.files()[0].id.clone();
        assert_eq!(session.remove_file(&id).map(|f| f.path), Some("a".to_string()));
        assert!(session.remove_file(&id).is_none());
        session.clear_files();
        assert!(session.files().is_empty());
    }

    #[test]
    fn sorting_changes_concatenation_order() {
        let mut session = plain_session();
        session.add_files([file("b", "B"), file("a", "A")]);
        session.sort(SortKey::Name, SortOrder::Asc);
        assert_eq!(session.concatenate(), "A|B");
    }

    #[test]
    fn collection_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/work.json");

        let mut session = plain_session();
        session.add_files([file("src/a.rs", "fn a() {}\n")]);
        session
            .add_rule(ExclusionRule::new(RuleKind::Glob, "*.snap").with_description("snapshots"))
            .unwrap();
        let collection = session.to_collection("work");
        collection.save_to_path(&path).unwrap();

        let loaded = Collection::load_from_path(&path).unwrap();
        assert_eq!(loaded, collection);
        let restored = Session::from_collection(loaded);
        assert_eq!(restored.files(), session.files());
        assert_eq!(restored.rules(), session.rules());
        assert_eq!(restored.options(), session.options());
    }

    #[test]
    fn equivalent_rules_are_added_once() {
        let mut session = Session::new();
        assert!(session.add_rule(ExclusionRule::new(RuleKind::Extension, "log")).unwrap());
        assert!(!session.add_rule(ExclusionRule::new(RuleKind::Extension, "LOG")).unwrap());
        assert!(session.add_rule(ExclusionRule::new(RuleKind::PathSubstring, "log")).unwrap());
        assert_eq!(session.rules().len(), 2);
    }

    #[test]
    fn repeated_collection_round_trips_keep_rule_count() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("set.json");
        let configured = || vec![ExclusionRule::new(RuleKind::Extension, "log")];

        let mut session = Session::new();
        session.add_files([file("a.rs", "A")]);
        session.add_rule(ExclusionRule::new(RuleKind::Glob, "*.snap")).unwrap();
        for rule in configured() {
            session.add_rule(rule).unwrap();
        }
        session.to_collection("set").save_to_path(&path).unwrap();
        let expected = session.rules().len();

        for _ in 0..2 {
            let mut reloaded = Session::from_collection(Collection::load_from_path(&path).unwrap());
            for rule in configured() {
                reloaded.add_rule(rule).unwrap();
            }
            assert_eq!(reloaded.rules().len(), expected);
            reloaded.to_collection("set").save_to_path(&path).unwrap();
        }
    }

    #[test]
    fn loaded_collection_files_are_revalidated() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("crafted.json");
        let json = r#"{
            "name": "crafted",
            "createdAt": "2024-01-01T00:00:00Z",
            "updatedAt": "2024-01-01T00:00:00Z",
            "files": [
                {"id": "a", "name": "x", "path": "", "content": "hello", "size": 999,
                 "lastModified": "2024-01-01T00:00:00Z"},
                {"id": "a", "name": "b", "path": "./b", "content": "hi", "size": 999,
                 "lastModified": "2024-01-01T00:00:00Z"},
                {"id": "a", "name": "c.rs", "path": "src\\c.rs", "content": "fn c() {}", "size": 1,
                 "lastModified": "2024-01-01T00:00:00Z"}
            ]
        }"#;
        fs::write(&path, json).unwrap();

        let session = Session::from_collection(Collection::load_from_path(&path).unwrap());
        let paths: Vec<&str> = session.files().iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["b", "src/c.rs"]);
        assert_eq!(session.files()[0].id, "a");
        assert_ne!(session.files()[1].id, "a");
        assert_eq!(session.files()[0].size, 2);
        assert_eq!(session.files()[1].name, "c.rs");

        let stats = session.stats();
        assert_eq!(stats.total_size_bytes, 11);
        assert!(!stats.file_type_histogram.contains_key(""));
    }

    #[test]
    fn collection_with_repeated_paths_keeps_last() {
        let mut first = file("a.txt", "old");
        first.id = "one".into();
        let mut second = file("a.txt", "new");
        second.id = "two".into();
        let collection = Collection {
            name: "dup".into(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            files: vec![first, second],
            rules: vec![
                ExclusionRule::new(RuleKind::Glob, "*.log"),
                ExclusionRule::new(RuleKind::Glob, "*.LOG"),
            ],
            options: ConcatenationOptions::default(),
        };
        let session = Session::from_collection(collection);
        assert_eq!(session.files().len(), 1);
        assert_eq!(session.files()[0].content, "new");
        assert_eq!(session.rules().len(), 1);
    }

    #[test]
    fn malformed_collection_is_a_collection_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "{\"name\": 3}").unwrap();
        assert!(matches!(
            Collection::load_from_path(&path),
            Err(AppError::Collection(_))
        ));
    }
}
