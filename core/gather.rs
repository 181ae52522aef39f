use crate::classify::{FileClass, classify, extension_of, has_text_extension, is_text_media_type};
use crate::config::{Config, DEFAULT_CONFIG_DIR};
use crate::error::{AppError, Result};
use crate::model::ProcessedFile;
use chrono::{DateTime, Utc};
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::Match;
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A file found by an ingestion source, before it has been read.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub absolute_path: PathBuf,
    /// Slash-separated, relative to the source root.
    pub relative_path: String,
    pub size: u64,
    pub last_modified: DateTime<Utc>,
    pub media_type: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkOptions {
    pub use_gitignore: bool,
    pub enable_builtin_ignore: bool,
    pub follow_links: bool,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            use_gitignore: true,
            enable_builtin_ignore: true,
            follow_links: false,
        }
    }
}

pub fn builtin_ignore_patterns() -> Vec<String> {
    vec!["**/.git/".to_string(), format!("{}/", DEFAULT_CONFIG_DIR)]
}

fn build_glob_set_from_vec(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern_str in patterns {
        let mut processed_pattern = pattern_str.trim().to_string();
        if processed_pattern.ends_with('/') && processed_pattern.len() > 1 {
            processed_pattern.push_str("**");
        }
        let glob = Glob::new(&processed_pattern).map_err(|e| {
            AppError::Glob(format!(
                "Invalid glob pattern \"{}\" (processed as \"{}\"): {}",
                pattern_str, processed_pattern, e
            ))
        })?;
        log::trace!("Adding builtin ignore glob: {}", processed_pattern);
        builder.add(glob);
    }
    Ok(builder.build()?)
}

/// Directory ingestion source. Each call to [`DirectorySource::walk`]
/// starts a fresh, lazy traversal.
#[derive(Debug)]
pub struct DirectorySource {
    root: PathBuf,
    options: WalkOptions,
    builtin_ignores: GlobSet,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>, options: WalkOptions) -> Result<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(AppError::InvalidArgument(format!(
                "Source root is not a directory: {}",
                root.display()
            )));
        }
        let builtin_ignores = if options.enable_builtin_ignore {
            build_glob_set_from_vec(&builtin_ignore_patterns())?
        } else {
            GlobSet::empty()
        };
        Ok(Self {
            root,
            options,
            builtin_ignores,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn walk(&self) -> CandidateWalk<'_> {
        log::debug!("Starting walk of {}", self.root.display());
        CandidateWalk {
            source: self,
            pending_dirs: vec![PendingDir {
                path: self.root.clone(),
                ignores: Vec::new(),
            }],
            ready: VecDeque::new(),
            visited: HashSet::new(),
        }
    }

    fn relative(&self, path: &Path) -> Option<String> {
        let rel = pathdiff::diff_paths(path, &self.root)?;
        let parts: Vec<String> = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(parts.join("/"))
    }

    fn is_builtin_ignored(&self, relative: &str, is_dir: bool) -> bool {
        self.builtin_ignores.is_match(relative)
            || (is_dir
                && self
                    .builtin_ignores
                    .is_match(format!("{}/dummy_file_for_dir_match", relative)))
    }
}

#[derive(Debug, Clone)]
struct PendingDir {
    path: PathBuf,
    /// Gitignore matchers from the root down to this directory.
    ignores: Vec<Arc<Gitignore>>,
}

/// Lazy traversal over a [`DirectorySource`], driven by an explicit stack of
/// pending directories. Entries within a directory are visited in name
/// order.
pub struct CandidateWalk<'s> {
    source: &'s DirectorySource,
    pending_dirs: Vec<PendingDir>,
    ready: VecDeque<Candidate>,
    visited: HashSet<PathBuf>,
}

impl CandidateWalk<'_> {
    fn is_git_ignored(ignores: &[Arc<Gitignore>], path: &Path, is_dir: bool) -> bool {
        for gitignore in ignores.iter().rev() {
            match gitignore.matched(path, is_dir) {
                Match::Ignore(_) => return true,
                Match::Whitelist(_) => return false,
                Match::None => {}
            }
        }
        false
    }

    fn load_gitignore(dir: &Path) -> Option<Arc<Gitignore>> {
        let file = dir.join(".gitignore");
        if !file.is_file() {
            return None;
        }
        let mut builder = GitignoreBuilder::new(dir);
        if let Some(err) = builder.add(&file) {
            log::warn!("Problem reading {}: {}", file.display(), err);
        }
        match builder.build() {
            Ok(gitignore) => Some(Arc::new(gitignore)),
            Err(e) => {
                log::warn!("Ignoring unusable {}: {}", file.display(), e);
                None
            }
        }
    }

    fn expand(&mut self, dir: PendingDir) {
        if self.source.options.follow_links {
            let canonical = dir.path.canonicalize().unwrap_or_else(|_| dir.path.clone());
            if !self.visited.insert(canonical) {
                log::debug!("Skipping already visited directory: {}", dir.path.display());
                return;
            }
        }

        let entries = match fs::read_dir(&dir.path) {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!("Cannot read directory {}: {}", dir.path.display(), e);
                return;
            }
        };
        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry.path()),
                Err(e) => {
                    log::warn!("Error walking directory {}: {}", dir.path.display(), e);
                    None
                }
            })
            .collect();
        paths.sort();

        let mut ignores = dir.ignores.clone();
        if self.source.options.use_gitignore {
            if let Some(gitignore) = Self::load_gitignore(&dir.path) {
                ignores.push(gitignore);
            }
        }

        let mut subdirs = Vec::new();
        for path in paths {
            let metadata = if self.source.options.follow_links {
                fs::metadata(&path)
            } else {
                fs::symlink_metadata(&path)
            };
            let metadata = match metadata {
                Ok(m) => m,
                Err(e) => {
                    log::warn!("Cannot stat {}: {}", path.display(), e);
                    continue;
                }
            };
            if metadata.file_type().is_symlink() {
                log::trace!("Skipping symlink: {}", path.display());
                continue;
            }
            let is_dir = metadata.is_dir();
            let Some(relative_path) = self.source.relative(&path) else {
                log::warn!("Could not get relative path for: {}", path.display());
                continue;
            };
            if self.source.is_builtin_ignored(&relative_path, is_dir) {
                log::trace!("Skipping builtin-ignored path: {}", relative_path);
                continue;
            }
            if Self::is_git_ignored(&ignores, &path, is_dir) {
                log::trace!("Skipping gitignored path: {}", relative_path);
                continue;
            }

            if is_dir {
                subdirs.push(PendingDir {
                    path,
                    ignores: ignores.clone(),
                });
            } else if metadata.is_file() {
                let last_modified = metadata
                    .modified()
                    .map(DateTime::<Utc>::from)
                    .unwrap_or_else(|_| Utc::now());
                let media_type = extension_of(&relative_path).unwrap_or_default();
                self.ready.push_back(Candidate {
                    absolute_path: path,
                    relative_path,
                    size: metadata.len(),
                    last_modified,
                    media_type,
                });
            }
        }
        // Reversed so the alphabetically first directory is popped first.
        self.pending_dirs.extend(subdirs.into_iter().rev());
    }
}

impl Iterator for CandidateWalk<'_> {
    type Item = Candidate;

    fn next(&mut self) -> Option<Candidate> {
        loop {
            if let Some(candidate) = self.ready.pop_front() {
                return Some(candidate);
            }
            let dir = self.pending_dirs.pop()?;
            self.expand(dir);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "camelCase")]
pub enum SkipReason {
    Binary,
    TooLarge { size: u64, limit: u64 },
    Unreadable { message: String },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::Binary => f.write_str("binary content"),
            SkipReason::TooLarge { size, limit } => {
                write!(f, "too large ({} bytes, limit {} bytes)", size, limit)
            }
            SkipReason::Unreadable { message } => write!(f, "unreadable: {}", message),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedFile {
    pub path: String,
    #[serde(flatten)]
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Default)]
pub struct LoadReport {
    pub files: Vec<ProcessedFile>,
    pub skipped: Vec<SkippedFile>,
}

/// Reads and classifies a single candidate.
pub fn load_candidate(
    candidate: &Candidate,
    max_file_size: u64,
) -> std::result::Result<ProcessedFile, SkipReason> {
    if candidate.size > max_file_size {
        return Err(SkipReason::TooLarge {
            size: candidate.size,
            limit: max_file_size,
        });
    }
    let bytes = fs::read(&candidate.absolute_path).map_err(|e| SkipReason::Unreadable {
        message: e.to_string(),
    })?;

    let name = crate::model::base_name(&candidate.relative_path);
    if classify(name, &candidate.media_type, Some(&bytes)) == FileClass::Binary {
        return Err(SkipReason::Binary);
    }

    let content = if has_text_extension(name) || is_text_media_type(&candidate.media_type) {
        String::from_utf8_lossy(&bytes).into_owned()
    } else {
        String::from_utf8(bytes).map_err(|_| SkipReason::Binary)?
    };

    ProcessedFile::new(&candidate.relative_path, content)
        .map(|file| {
            file.with_media_type(candidate.media_type.clone())
                .with_last_modified(candidate.last_modified)
        })
        .map_err(|e| SkipReason::Unreadable {
            message: e.to_string(),
        })
}

/// Loads candidates in parallel. Results keep the candidates' order.
pub fn load_candidates(candidates: &[Candidate], max_file_size: u64) -> LoadReport {
    log::info!("Reading content for {} candidate files...", candidates.len());
    let results: Vec<_> = candidates
        .par_iter()
        .map(|candidate| load_candidate(candidate, max_file_size))
        .collect();

    let mut report = LoadReport::default();
    for (candidate, result) in candidates.iter().zip(results) {
        match result {
            Ok(file) => report.files.push(file),
            Err(reason) => {
                log::debug!("Skipping {}: {}", candidate.relative_path, reason);
                report.skipped.push(SkippedFile {
                    path: candidate.relative_path.clone(),
                    reason,
                });
            }
        }
    }
    log::info!(
        "Loaded {} files, skipped {}",
        report.files.len(),
        report.skipped.len()
    );
    report
}

/// Walks `project_root` with the walk settings from `config` and loads every
/// candidate.
pub fn gather_files(project_root: &Path, config: &Config) -> Result<LoadReport> {
    let source = DirectorySource::new(project_root, config.walk_options())?;
    let candidates: Vec<Candidate> = source.walk().collect();
    log::info!(
        "Directory walk complete. Found {} candidate files.",
        candidates.len()
    );
    let max_file_size = config.max_file_size_bytes()?;
    Ok(load_candidates(&candidates, max_file_size))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, bytes: &[u8]) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, bytes).unwrap();
    }

    fn walk_paths(root: &Path, options: WalkOptions) -> Vec<String> {
        DirectorySource::new(root, options)
            .unwrap()
            .walk()
            .map(|c| c.relative_path)
            .collect()
    }

    #[test]
    fn walk_is_ordered_and_restartable() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "b.txt", b"b");
        write(dir.path(), "a/z.txt", b"z");
        write(dir.path(), "a/b/c.txt", b"c");
        write(dir.path(), "c/d.txt", b"d");

        let source = DirectorySource::new(dir.path(), WalkOptions::default()).unwrap();
        let first: Vec<String> = source.walk().map(|c| c.relative_path).collect();
        let second: Vec<String> = source.walk().map(|c| c.relative_path).collect();
        assert_eq!(first, vec!["b.txt", "a/z.txt", "a/b/c.txt", "c/d.txt"]);
        assert_eq!(first, second);
    }

    #[test]
    fn walk_is_lazy() {
        let dir = TempDir::new().unwrap();
        for i in 0..5 {
            write(dir.path(), &format!("d{i}/f.txt"), b"x");
        }
        let source = DirectorySource::new(dir.path(), WalkOptions::default()).unwrap();
        let mut walk = source.walk();
        assert_eq!(walk.next().map(|c| c.relative_path), Some("d0/f.txt".to_string()));
        assert!(!walk.pending_dirs.is_empty());
    }

    #[test]
    fn gitignore_files_are_honoured_at_every_level() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), ".gitignore", b"*.log\nbuild/\n");
        write(dir.path(), "keep.rs", b"fn a() {}");
        write(dir.path(), "debug.log", b"noise");
        write(dir.path(), "build/out.txt", b"noise");
        write(dir.path(), "sub/.gitignore", b"secret.txt\n!important.log\n");
        write(dir.path(), "sub/secret.txt", b"noise");
        write(dir.path(), "sub/important.log", b"keep");

        let paths = walk_paths(dir.path(), WalkOptions::default());
        assert_eq!(paths, vec![".gitignore", "keep.rs", "sub/.gitignore", "sub/important.log"]);

        let all = walk_paths(
            dir.path(),
            WalkOptions {
                use_gitignore: false,
                ..WalkOptions::default()
            },
        );
        assert!(all.contains(&"debug.log".to_string()));
        assert!(all.contains(&"build/out.txt".to_string()));
    }

    #[test]
    fn builtin_ignores_skip_git_and_config_dirs() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), ".git/HEAD", b"ref: refs/heads/main");
        write(dir.path(), "nested/.git/config", b"x");
        write(dir.path(), ".xconcat/xconcat.toml", b"");
        write(dir.path(), "src/lib.rs", b"");

        assert_eq!(walk_paths(dir.path(), WalkOptions::default()), vec!["src/lib.rs"]);
        let everything = walk_paths(
            dir.path(),
            WalkOptions {
                enable_builtin_ignore: false,
                ..WalkOptions::default()
            },
        );
        assert_eq!(everything.len(), 4);
    }

    #[test]
    fn load_classifies_and_preserves_order() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "a.rs", b"fn a() {}\n");
        write(dir.path(), "b.png", b"\x89PNG\r\n\x1a\n\x00\x00");
        write(dir.path(), "c/Makefile", b"all:\n\techo hi\n");
        write(dir.path(), "d.txt", &[b'x'; 64]);
        write(dir.path(), "e.md", b"caf\xe9");

        let source = DirectorySource::new(dir.path(), WalkOptions::default()).unwrap();
        let candidates: Vec<Candidate> = source.walk().collect();
        let report = load_candidates(&candidates, 32);

        let loaded: Vec<&str> = report.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(loaded, vec!["a.rs", "e.md", "c/Makefile"]);
        assert_eq!(report.files[1].content, "caf\u{FFFD}");
        assert_eq!(report.files[0].media_type, "rs");
        assert_eq!(report.files[0].size, 10);

        let skipped: Vec<(&str, &SkipReason)> = report
            .skipped
            .iter()
            .map(|s| (s.path.as_str(), &s.reason))
            .collect();
        assert_eq!(skipped[0], ("b.png", &SkipReason::Binary));
        assert_eq!(skipped[1].0, "d.txt");
        assert!(matches!(skipped[1].1, SkipReason::TooLarge { size: 64, limit: 32 }));
    }

    #[test]
    fn missing_file_is_reported_unreadable() {
        let candidate = Candidate {
            absolute_path: PathBuf::from("/definitely/not/here.txt"),
            relative_path: "here.txt".into(),
            size: 1,
            last_modified: Utc::now(),
            media_type: String::new(),
        };
        assert!(matches!(
            load_candidate(&candidate, 100),
            Err(SkipReason::Unreadable { .. })
        ));
    }

    #[test]
    fn non_directory_root_is_rejected() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "file.txt", b"x");
        assert!(DirectorySource::new(dir.path().join("file.txt"), WalkOptions::default()).is_err());
    }
}
