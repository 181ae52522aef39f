use crate::model::ProcessedFile;
use indexmap::IndexMap;
use serde::Serialize;

/// Aggregate metrics over a set of files.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileStats {
    pub file_count: usize,
    pub total_size_bytes: u64,
    pub total_lines: usize,
    /// Keyed by lower-cased extension (or whole name), in first-seen order.
    pub file_type_histogram: IndexMap<String, usize>,
    pub average_file_size: u64,
}

/// Number of `\n`-delimited segments. A trailing newline yields one extra
/// empty segment and empty content counts as one segment.
pub fn line_count(content: &str) -> usize {
    content.split('\n').count()
}

pub fn stats<'a, I>(files: I) -> FileStats
where
    I: IntoIterator<Item = &'a ProcessedFile>,
{
    let mut result = FileStats::default();
    for file in files {
        result.file_count += 1;
        result.total_size_bytes += file.size;
        result.total_lines += line_count(&file.content);
        *result.file_type_histogram.entry(file.type_key()).or_insert(0) += 1;
    }
    if result.file_count > 0 {
        result.average_file_size =
            (result.total_size_bytes as f64 / result.file_count as f64).round() as u64;
    }
    log::trace!("Computed stats: {:?}", result);
    result
}
