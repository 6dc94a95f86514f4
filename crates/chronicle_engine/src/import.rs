//! Turns an uploaded file into an editor post.
use std::path::Path;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use thiserror::Error;

use chronicle_core::frontmatter::parse_document;
use chronicle_core::post::slug_from_title;
use chronicle_core::Post;
use chronicle_logging::chronicle_debug;

use crate::convert::{Converter, Html2MdConverter, PlainTextConverter};

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("{0} files cannot be imported")]
    Unsupported(String),
    #[error("cannot read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImportResult {
    pub file_type: String,
    pub file_name: String,
    pub title: String,
    pub content: String,
    pub post: Post,
}

static HTML_TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<title[^>]*>(.*?)</title>").expect("title pattern is valid"));
static HTML_H1: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<h1[^>]*>(.*?)</h1>").expect("h1 pattern is valid"));
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("tag pattern is valid"));
static MD_HEADING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^#\s+(.+)$").expect("heading pattern is valid"));

pub fn title_from_html(html: &str) -> Option<String> {
    let title = HTML_TITLE
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|t| !t.is_empty());
    title.or_else(|| {
        HTML_H1
            .captures(html)
            .and_then(|caps| caps.get(1))
            .map(|m| TAG.replace_all(m.as_str().trim(), "").into_owned())
            .filter(|t| !t.is_empty())
    })
}

/// Reads and imports a file from disk.
pub fn import_path(path: &Path, today: NaiveDate) -> Result<ImportResult, ImportError> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let text = std::fs::read_to_string(path).map_err(|source| ImportError::Read {
        path: path.display().to_string(),
        source,
    })?;
    import_file(&name, &text, today)
}

/// Converts `text` according to the extension of `file_name`.
///
/// Markdown with a titled frontmatter block restores the whole post; other
/// inputs produce a fresh draft titled from the document or the file name.
pub fn import_file(file_name: &str, text: &str, today: NaiveDate) -> Result<ImportResult, ImportError> {
    let file_type = Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    let stem = match file_name.rsplit_once('.') {
        Some((stem, _)) if !file_type.is_empty() => stem.to_string(),
        _ => file_name.to_string(),
    };
    chronicle_debug!("Importing {} as {:?}", file_name, file_type);

    let mut title = stem.clone();
    let mut restored = None;
    let content = match file_type.as_str() {
        "txt" => PlainTextConverter.to_markdown(text),
        "html" | "htm" => {
            if let Some(found) = title_from_html(text) {
                title = found;
            }
            Html2MdConverter.to_markdown(text)
        }
        "md" | "markdown" | "mdx" => {
            if text.starts_with("---") {
                match parse_document(text) {
                    Ok(doc) => {
                        if doc.frontmatter.title.as_deref().is_some_and(|t| !t.is_empty()) {
                            let post = Post::from_document(&doc, &stem, today);
                            title = post.title.clone();
                            restored = Some(post);
                        }
                        doc.body
                    }
                    Err(err) => {
                        chronicle_debug!("Frontmatter of {} unreadable ({}), importing as text", file_name, err);
                        text.to_string()
                    }
                }
            } else {
                if let Some(heading) = MD_HEADING.captures(text).and_then(|caps| caps.get(1)) {
                    title = heading.as_str().trim().to_string();
                }
                text.to_string()
            }
        }
        "docx" | "doc" => return Err(ImportError::Unsupported(file_type)),
        _ => format!("# Imported Content\n\nOriginal file: {file_name}\n\n{text}"),
    };

    let post = restored.unwrap_or_else(|| {
        let mut post = Post::empty(today);
        post.title = title.clone();
        post.slug = slug_from_title(&title);
        post.content = content.clone();
        post
    });

    Ok(ImportResult {
        file_type,
        file_name: file_name.to_string(),
        title,
        content,
        post,
    })
}
