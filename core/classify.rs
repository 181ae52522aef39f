//! Text/binary classification for ingestion candidates.
//!
//! A candidate is text when its extension is on the allow-list, when its
//! declared media type is textual, or when the first [`SAMPLE_SIZE`] bytes
//! decode cleanly and carry no disallowed control bytes. Anything that cannot
//! be sampled is binary.

use serde::Serialize;

pub const SAMPLE_SIZE: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileClass {
    Text,
    Binary,
}

impl FileClass {
    pub fn is_text(self) -> bool {
        self == FileClass::Text
    }
}

pub const TEXT_EXTENSIONS: &[&str] = &[
    "txt", "md", "markdown", "rst", "js", "mjs", "cjs", "ts", "jsx", "tsx", "py", "java", "kt",
    "c", "cpp", "cc", "h", "hpp", "cs", "go", "rs", "php", "rb", "swift", "scala", "lua", "html",
    "htm", "css", "scss", "sass", "less", "vue", "svelte", "json", "xml", "yaml", "yml", "toml",
    "ini", "cfg", "conf", "config", "env", "sh", "bash", "zsh", "sql", "csv", "graphql",
];

const TEXT_MEDIA_TYPES: &[&str] = &[
    "application/json",
    "application/xml",
    "application/javascript",
];

/// Lower-cased substring after the final `.` of `name`, if any.
pub fn extension_of(name: &str) -> Option<String> {
    name.rsplit_once('.')
        .map(|(_, ext)| ext.to_lowercase())
        .filter(|ext| !ext.is_empty())
}

pub fn has_text_extension(name: &str) -> bool {
    extension_of(name).is_some_and(|ext| TEXT_EXTENSIONS.contains(&ext.as_str()))
}

pub fn is_text_media_type(media_type: &str) -> bool {
    let media_type = media_type.trim().to_lowercase();
    media_type.starts_with("text/") || TEXT_MEDIA_TYPES.contains(&media_type.as_str())
}

/// Decides whether a candidate is eligible for inclusion.
///
/// `sample` is `None` when reading the candidate failed; such files are
/// binary. Only the first [`SAMPLE_SIZE`] bytes of a sample are inspected.
pub fn classify(name: &str, declared_media_type: &str, sample: Option<&[u8]>) -> FileClass {
    if has_text_extension(name) {
        log::trace!("Classified '{}' as text by extension", name);
        return FileClass::Text;
    }
    if is_text_media_type(declared_media_type) {
        log::trace!(
            "Classified '{}' as text by media type '{}'",
            name,
            declared_media_type
        );
        return FileClass::Text;
    }
    let Some(sample) = sample else {
        log::debug!("No content sample for '{}', treating as binary", name);
        return FileClass::Binary;
    };
    match decode_sample(&sample[..sample.len().min(SAMPLE_SIZE)]) {
        Some(text) if !text.chars().any(is_disallowed_control) => FileClass::Text,
        Some(_) => {
            log::trace!("Control bytes found in '{}', treating as binary", name);
            FileClass::Binary
        }
        None => {
            log::trace!("Sample of '{}' is not valid UTF-8, treating as binary", name);
            FileClass::Binary
        }
    }
}

/// Decodes a sample as UTF-8. A multi-byte sequence cut off by the sample
/// boundary is tolerated; any other invalid sequence is a decode failure.
fn decode_sample(sample: &[u8]) -> Option<&str> {
    match std::str::from_utf8(sample) {
        Ok(text) => Some(text),
        Err(e) if e.error_len().is_none() => std::str::from_utf8(&sample[..e.valid_up_to()]).ok(),
        Err(_) => None,
    }
}

fn is_disallowed_control(c: char) -> bool {
    matches!(c, '\u{00}'..='\u{08}' | '\u{0E}'..='\u{1F}' | '\u{7F}')
}

/// Fenced-code language tag for a file name, when one is known.
pub fn language_hint(name: &str) -> Option<&'static str> {
    let ext = extension_of(name)?;
    let lang = match ext.as_str() {
        "rs" => "rust",
        "js" | "mjs" | "cjs" => "javascript",
        "jsx" => "jsx",
        "ts" => "typescript",
        "tsx" => "tsx",
        "py" => "python",
        "rb" => "ruby",
        "go" => "go",
        "java" => "java",
        "kt" => "kotlin",
        "c" | "h" => "c",
        "cpp" | "cc" | "hpp" => "cpp",
        "cs" => "csharp",
        "php" => "php",
        "swift" => "swift",
        "scala" => "scala",
        "lua" => "lua",
        "html" | "htm" => "html",
        "css" => "css",
        "scss" => "scss",
        "sass" => "sass",
        "less" => "less",
        "vue" => "vue",
        "svelte" => "svelte",
        "json" => "json",
        "xml" => "xml",
        "yaml" | "yml" => "yaml",
        "toml" => "toml",
        "ini" | "cfg" | "conf" => "ini",
        "sh" | "bash" | "zsh" => "bash",
        "sql" => "sql",
        "md" | "markdown" => "markdown",
        "graphql" => "graphql",
        "csv" => "csv",
        _ => return None,
    };
    Some(lang)
}
