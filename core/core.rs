pub mod classify;
pub mod concat;
pub mod config;
pub mod error;
pub mod gather;
pub mod model;
pub mod ordering;
pub mod output_formats;
pub mod rules;
pub mod session;
pub mod stats;

pub use classify::{FileClass, classify, language_hint};
pub use concat::{concatenate, concatenate_at, render_template};
pub use config::Config;
pub use error::{AppError, Result};
pub use gather::{
    Candidate, DirectorySource, LoadReport, SkipReason, SkippedFile, WalkOptions, gather_files,
    load_candidates,
};
pub use model::{ConcatenationOptions, HeaderFormat, ProcessedFile};
pub use ordering::{SortKey, SortOrder, sort_files};
pub use output_formats::{ExportDocument, ExportFormat, render};
pub use rules::{
    Evaluation, ExclusionRule, FilterOutcome, PatternValidation, Preset, RuleKind, RuleSuggestion,
    evaluate, filter_files, suggest_rules, validate,
};
pub use session::{Collection, Session};
pub use stats::{FileStats, stats};
