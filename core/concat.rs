use crate::classify::language_hint;
use crate::model::{ConcatenationOptions, HeaderFormat, ProcessedFile};
use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt::Write;

const RULE_LINE: &str = "==================================================";

/// Framing actually applied to a run, after resolving fallbacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Framing<'t> {
    None,
    Comment,
    Markdown,
    Custom(&'t str),
}

impl<'t> Framing<'t> {
    fn resolve(options: &'t ConcatenationOptions) -> Self {
        if !options.include_headers {
            return Framing::None;
        }
        match options.header_format {
            HeaderFormat::None => Framing::None,
            HeaderFormat::Comment => Framing::Comment,
            HeaderFormat::Markdown => Framing::Markdown,
            HeaderFormat::Custom => match options.custom_header_template.as_deref() {
                Some(template) if !template.is_empty() => Framing::Custom(template),
                _ => {
                    log::debug!("Custom header format without a template, using comment framing");
                    Framing::Comment
                }
            },
        }
    }
}

pub(crate) fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Merges `files`, in the given order, into one string.
///
/// Content is copied verbatim. The separator goes strictly between file
/// blocks. The document header carries the current time; use
/// [`concatenate_at`] for reproducible output.
pub fn concatenate<'a, I>(files: I, options: &ConcatenationOptions) -> String
where
    I: IntoIterator<Item = &'a ProcessedFile>,
{
    concatenate_at(files, options, Utc::now())
}

pub fn concatenate_at<'a, I>(
    files: I,
    options: &ConcatenationOptions,
    generated_at: DateTime<Utc>,
) -> String
where
    I: IntoIterator<Item = &'a ProcessedFile>,
{
    let files: Vec<&ProcessedFile> = files.into_iter().collect();
    if files.is_empty() {
        return String::new();
    }

    let framing = Framing::resolve(options);
    let capacity = files.iter().map(|f| f.content.len() + 160).sum::<usize>();
    let mut out = String::with_capacity(capacity);

    write_document_header(&mut out, framing, files.len(), &generated_at);
    for (index, file) in files.iter().enumerate() {
        if index > 0 {
            out.push_str(&options.separator);
        }
        write_file_header(&mut out, framing, file);
        out.push_str(&file.content);
        write_file_footer(&mut out, framing, file);
    }

    log::debug!(
        "Concatenated {} files into {} bytes ({:?} framing)",
        files.len(),
        out.len(),
        framing
    );
    out
}

fn write_document_header(out: &mut String, framing: Framing, count: usize, at: &DateTime<Utc>) {
    match framing {
        Framing::None => {}
        Framing::Comment | Framing::Custom(_) => {
            let _ = write!(
                out,
                "/*\n * Concatenated files: {}\n * Generated: {}\n */\n\n",
                count,
                timestamp(at)
            );
        }
        Framing::Markdown => {
            let _ = write!(
                out,
                "# Concatenated Files\n\n> {} files, generated {}\n\n",
                count,
                timestamp(at)
            );
        }
    }
}

fn write_file_header(out: &mut String, framing: Framing, file: &ProcessedFile) {
    match framing {
        Framing::None => {}
        Framing::Comment => {
            let _ = write!(
                out,
                "/* {rule}\n * File: {}\n * Size: {} bytes\n * Modified: {}\n * {rule} */\n",
                file.path,
                file.size,
                timestamp(&file.last_modified),
                rule = RULE_LINE
            );
        }
        Framing::Markdown => {
            let _ = write!(
                out,
                "## {}\n\n```{}\n",
                file.path,
                language_hint(&file.name).unwrap_or("")
            );
        }
        Framing::Custom(template) => {
            let header = render_template(template, file);
            out.push_str(&header);
            if !header.ends_with('\n') {
                out.push('\n');
            }
        }
    }
}

fn write_file_footer(out: &mut String, framing: Framing, file: &ProcessedFile) {
    if framing == Framing::Markdown {
        if !file.content.is_empty() && !file.content.ends_with('\n') {
            out.push('\n');
        }
        out.push_str("```\n");
    }
}

/// Substitutes `{path}`, `{name}`, `{size}` and `{modified}`. Unknown
/// placeholders are left as written.
pub fn render_template(template: &str, file: &ProcessedFile) -> String {
    template
        .replace("{path}", &file.path)
        .replace("{name}", &file.name)
        .replace("{size}", &file.size.to_string())
        .replace("{modified}", &timestamp(&file.last_modified))
}
