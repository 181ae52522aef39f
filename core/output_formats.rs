use crate::classify::language_hint;
use crate::concat::timestamp;
use crate::error::{AppError, Result};
use crate::model::ProcessedFile;
use crate::stats::{FileStats, line_count, stats};
use byte_unit::{Byte, UnitType};
use chrono::{DateTime, Utc};
use quick_xml::Writer;
use quick_xml::escape::escape;
use quick_xml::events::{BytesCData, BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Write as _};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Plain,
    Markdown,
    Json,
    Xml,
    Html,
}

impl ExportFormat {
    pub fn file_extension(self) -> &'static str {
        match self {
            ExportFormat::Plain => "txt",
            ExportFormat::Markdown => "md",
            ExportFormat::Json => "json",
            ExportFormat::Xml => "xml",
            ExportFormat::Html => "html",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "plain" | "text" | "txt" => Ok(ExportFormat::Plain),
            "markdown" | "md" => Ok(ExportFormat::Markdown),
            "json" => Ok(ExportFormat::Json),
            "xml" => Ok(ExportFormat::Xml),
            "html" | "htm" => Ok(ExportFormat::Html),
            other => Err(AppError::InvalidArgument(format!(
                "Unknown export format '{}' (expected plain, markdown, json, xml or html)",
                other
            ))),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExportFormat::Plain => "plain",
            ExportFormat::Markdown => "markdown",
            ExportFormat::Json => "json",
            ExportFormat::Xml => "xml",
            ExportFormat::Html => "html",
        };
        f.write_str(s)
    }
}

/// Everything an envelope needs: the concatenated body plus metadata about
/// the files that went into it.
#[derive(Debug, Clone)]
pub struct ExportDocument<'a> {
    pub title: String,
    pub generated_at: DateTime<Utc>,
    pub body: &'a str,
    pub files: Vec<&'a ProcessedFile>,
    pub stats: FileStats,
}

impl<'a> ExportDocument<'a> {
    pub fn new<I>(title: impl Into<String>, body: &'a str, files: I) -> Self
    where
        I: IntoIterator<Item = &'a ProcessedFile>,
    {
        let files: Vec<&'a ProcessedFile> = files.into_iter().collect();
        Self {
            title: title.into(),
            generated_at: Utc::now(),
            body,
            stats: stats(files.iter().copied()),
            files,
        }
    }

    pub fn with_generated_at(mut self, generated_at: DateTime<Utc>) -> Self {
        self.generated_at = generated_at;
        self
    }
}

pub fn human_size(bytes: u64) -> String {
    Byte::from_u64(bytes)
        .get_appropriate_unit(UnitType::Binary)
        .to_string()
}

/// Wraps a document in the chosen envelope.
///
/// Only [`ExportFormat::Plain`] emits `body`, so it is the only format that
/// reflects the header framing and separator chosen for concatenation. The
/// structured envelopes build one section per entry of `files` and lay out
/// their own headings.
pub fn render(document: &ExportDocument, format: ExportFormat, pretty: bool) -> Result<String> {
    log::debug!(
        "Rendering {} files as {} ({} body bytes)",
        document.files.len(),
        format,
        document.body.len()
    );
    match format {
        ExportFormat::Plain => Ok(to_plain(document)),
        ExportFormat::Markdown => Ok(to_markdown(document)),
        ExportFormat::Json => to_json(document, pretty),
        ExportFormat::Xml => to_xml(document),
        ExportFormat::Html => Ok(to_html(document)),
    }
}

pub fn to_plain(document: &ExportDocument) -> String {
    document.body.to_string()
}

/// A backtick fence longer than any run inside `content`.
fn fence_for(content: &str) -> String {
    let mut longest = 0;
    let mut run = 0;
    for c in content.chars() {
        if c == '`' {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    "`".repeat((longest + 1).max(3))
}

/// Report header, file-type table, then a `### path` heading and a fenced
/// block per file. Built from `files`; `body` is not consulted.
pub fn to_markdown(document: &ExportDocument) -> String {
    let s = &document.stats;
    let mut out = String::new();
    let _ = writeln!(out, "# {}\n", document.title);
    let _ = writeln!(out, "- **Generated:** {}", timestamp(&document.generated_at));
    let _ = writeln!(out, "- **Files:** {}", s.file_count);
    let _ = writeln!(
        out,
        "- **Total size:** {} ({} bytes)",
        human_size(s.total_size_bytes),
        s.total_size_bytes
    );
    let _ = writeln!(out, "- **Total lines:** {}", s.total_lines);
    let _ = writeln!(out, "- **Average file size:** {}\n", human_size(s.average_file_size));

    if !s.file_type_histogram.is_empty() {
        out.push_str("## File Types\n\n| Type | Files |\n|------|-------|\n");
        for (kind, count) in &s.file_type_histogram {
            let _ = writeln!(out, "| {} | {} |", kind, count);
        }
        out.push('\n');
    }

    out.push_str("## Files\n");
    for file in &document.files {
        let fence = fence_for(&file.content);
        let _ = write!(
            out,
            "\n### {}\n\n{}{}\n{}",
            file.path,
            fence,
            language_hint(&file.name).unwrap_or(""),
            file.content
        );
        if !file.content.is_empty() && !file.content.ends_with('\n') {
            out.push('\n');
        }
        let _ = writeln!(out, "{}", fence);
    }
    out
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonExport<'a> {
    metadata: JsonMetadata<'a>,
    files: Vec<JsonFile<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonMetadata<'a> {
    title: &'a str,
    generated_at: String,
    #[serde(flatten)]
    stats: &'a FileStats,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonFile<'a> {
    path: &'a str,
    name: &'a str,
    size: u64,
    media_type: &'a str,
    last_modified: String,
    lines: usize,
    content: &'a str,
}

pub fn to_json(document: &ExportDocument, pretty: bool) -> Result<String> {
    let export = JsonExport {
        metadata: JsonMetadata {
            title: &document.title,
            generated_at: timestamp(&document.generated_at),
            stats: &document.stats,
        },
        files: document
            .files
            .iter()
            .map(|f| JsonFile {
                path: &f.path,
                name: &f.name,
                size: f.size,
                media_type: &f.media_type,
                last_modified: timestamp(&f.last_modified),
                lines: line_count(&f.content),
                content: &f.content,
            })
            .collect(),
    };
    serialize_to_json(&export, pretty)
}

fn xml_err(err: impl fmt::Display) -> AppError {
    AppError::XmlSerialize(err.to_string())
}

fn write_text_element(writer: &mut Writer<Vec<u8>>, name: &str, text: &str) -> Result<()> {
    writer
        .write_event(Event::Start(BytesStart::new(name)))
        .map_err(xml_err)?;
    writer
        .write_event(Event::Text(BytesText::new(text)))
        .map_err(xml_err)?;
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .map_err(xml_err)?;
    Ok(())
}

/// Writes `content` as CDATA, splitting around any `]]>` it contains.
fn write_cdata(writer: &mut Writer<Vec<u8>>, content: &str) -> Result<()> {
    let mut rest = content;
    while let Some(idx) = rest.find("]]>") {
        let (head, tail) = rest.split_at(idx + 2);
        writer
            .write_event(Event::CData(BytesCData::new(head)))
            .map_err(xml_err)?;
        rest = tail;
    }
    writer
        .write_event(Event::CData(BytesCData::new(rest)))
        .map_err(xml_err)?;
    Ok(())
}

pub fn to_xml(document: &ExportDocument) -> Result<String> {
    let s = &document.stats;
    let mut writer = Writer::new(Vec::new());
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(xml_err)?;
    writer
        .write_event(Event::Start(BytesStart::new("concatenation")))
        .map_err(xml_err)?;

    writer
        .write_event(Event::Start(BytesStart::new("metadata")))
        .map_err(xml_err)?;
    write_text_element(&mut writer, "title", &document.title)?;
    write_text_element(&mut writer, "generatedAt", &timestamp(&document.generated_at))?;
    write_text_element(&mut writer, "fileCount", &s.file_count.to_string())?;
    write_text_element(&mut writer, "totalSizeBytes", &s.total_size_bytes.to_string())?;
    write_text_element(&mut writer, "totalLines", &s.total_lines.to_string())?;
    write_text_element(&mut writer, "averageFileSize", &s.average_file_size.to_string())?;
    writer
        .write_event(Event::Start(BytesStart::new("fileTypes")))
        .map_err(xml_err)?;
    for (kind, count) in &s.file_type_histogram {
        let mut entry = BytesStart::new("type");
        entry.push_attribute(("extension", kind.as_str()));
        entry.push_attribute(("count", count.to_string().as_str()));
        writer.write_event(Event::Empty(entry)).map_err(xml_err)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new("fileTypes")))
        .map_err(xml_err)?;
    writer
        .write_event(Event::End(BytesEnd::new("metadata")))
        .map_err(xml_err)?;

    writer
        .write_event(Event::Start(BytesStart::new("files")))
        .map_err(xml_err)?;
    for file in &document.files {
        let mut element = BytesStart::new("file");
        element.push_attribute(("path", file.path.as_str()));
        element.push_attribute(("size", file.size.to_string().as_str()));
        element.push_attribute(("mediaType", file.media_type.as_str()));
        element.push_attribute(("lastModified", timestamp(&file.last_modified).as_str()));
        writer.write_event(Event::Start(element)).map_err(xml_err)?;
        writer
            .write_event(Event::Start(BytesStart::new("content")))
            .map_err(xml_err)?;
        write_cdata(&mut writer, &file.content)?;
        writer
            .write_event(Event::End(BytesEnd::new("content")))
            .map_err(xml_err)?;
        writer
            .write_event(Event::End(BytesEnd::new("file")))
            .map_err(xml_err)?;
    }
    writer
        .write_event(Event::End(BytesEnd::new("files")))
        .map_err(xml_err)?;
    writer
        .write_event(Event::End(BytesEnd::new("concatenation")))
        .map_err(xml_err)?;

    String::from_utf8(writer.into_inner()).map_err(xml_err)
}

const HTML_STYLE: &str = "body{font-family:system-ui,sans-serif;margin:0 auto;max-width:1100px;padding:2rem;color:#1f2328}\
header{border-bottom:1px solid #d0d7de;margin-bottom:1.5rem}\
.meta{color:#57606a;font-size:.9rem}\
nav ul{columns:2;font-size:.9rem}\
section.file{margin:2rem 0}\
section.file h2{font-family:ui-monospace,monospace;font-size:1rem;background:#f6f8fa;padding:.5rem;border:1px solid #d0d7de;border-radius:6px 6px 0 0;margin:0}\
pre{margin:0;padding:1rem;overflow-x:auto;background:#fff;border:1px solid #d0d7de;border-top:0;border-radius:0 0 6px 6px}\
code{font-family:ui-monospace,monospace;font-size:.85rem}";

pub fn to_html(document: &ExportDocument) -> String {
    let s = &document.stats;
    let title = escape(document.title.as_str());
    let mut out = String::new();
    let _ = writeln!(out, "<!DOCTYPE html>\n<html lang=\"en\">\n<head>");
    let _ = writeln!(out, "<meta charset=\"utf-8\">\n<title>{}</title>", title);
    let _ = writeln!(out, "<style>{}</style>\n</head>\n<body>", HTML_STYLE);
    let _ = writeln!(
        out,
        "<header>\n<h1>{}</h1>\n<p class=\"meta\">Generated {} &middot; {} files &middot; {} &middot; {} lines</p>\n</header>",
        title,
        timestamp(&document.generated_at),
        s.file_count,
        human_size(s.total_size_bytes),
        s.total_lines
    );

    if !document.files.is_empty() {
        out.push_str("<nav>\n<ul>\n");
        for (index, file) in document.files.iter().enumerate() {
            let _ = writeln!(
                out,
                "<li><a href=\"#file-{}\">{}</a></li>",
                index,
                escape(file.path.as_str())
            );
        }
        out.push_str("</ul>\n</nav>\n");
    }

    for (index, file) in document.files.iter().enumerate() {
        let language = language_hint(&file.name)
            .map(|lang| format!(" class=\"language-{}\"", lang))
            .unwrap_or_default();
        let _ = writeln!(
            out,
            "<section class=\"file\" id=\"file-{}\">\n<h2>{}</h2>\n<p class=\"meta\">{} &middot; modified {}</p>\n<pre><code{}>{}</code></pre>\n</section>",
            index,
            escape(file.path.as_str()),
            human_size(file.size),
            timestamp(&file.last_modified),
            language,
            escape(file.content.as_str())
        );
    }
    out.push_str("</body>\n</html>\n");
    out
}

pub fn serialize_to_json<T: Serialize>(value: &T, pretty: bool) -> Result<String, AppError> {
    if pretty {
        serde_json::to_string_pretty(value).map_err(AppError::JsonSerialize)
    } else {
        serde_json::to_string(value).map_err(AppError::JsonSerialize)
    }
}

pub fn serialize_to_yaml<T: Serialize>(value: &T) -> Result<String, AppError> {
    serde_yml::to_string(value).map_err(AppError::YamlError)
}
