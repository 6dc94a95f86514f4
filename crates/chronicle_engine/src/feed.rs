//! RSS 2.0 and Atom item extraction.
//!
//! Feeds in the wild are rarely valid XML, so items are picked apart with
//! forgiving patterns rather than a strict parser. Each field has a chain of
//! element names that are tried in order.
use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use chronicle_core::friend::{parse_published, FriendPost, DEFAULT_WORD_COUNT};
use chronicle_core::post::reading_time_minutes;
use chronicle_logging::chronicle_debug;

use crate::text::{absolute_url, decode_entities, last_path_segment, prefix_site, truncate_chars};

pub const DESCRIPTION_CHARS: usize = 150;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FeedError {
    #[error("document is not an RSS or Atom feed")]
    NotAFeed,
}

const ELEMENTS: &[&str] = &[
    "title",
    "link",
    "description",
    "summary",
    "pubDate",
    "published",
    "updated",
    "dc:date",
    "content:encoded",
    "content",
    "category",
    "frontmatter",
    "tags",
    "timelineYear",
    "timelineEra",
    "isKeyEvent",
    "image",
];

static ELEMENT_PATTERNS: LazyLock<HashMap<&'static str, Regex>> = LazyLock::new(|| {
    ELEMENTS
        .iter()
        .map(|name| {
            let pattern = format!(r"(?is)<{}(?:\s[^>]*)?>(.*?)</{}\s*>", regex::escape(name), regex::escape(name));
            (*name, Regex::new(&pattern).expect("element pattern is valid"))
        })
        .collect()
});

static FEED_ROOT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<(rss|feed|rdf:RDF)[\s>]").expect("root pattern is valid"));
static ITEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<(item|entry)(?:\s[^>]*)?>(.*?)</(?:item|entry)\s*>").expect("item pattern is valid")
});
static LINK_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<link(\s[^>]*)/?>").expect("link pattern is valid"));
static CATEGORY_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<category(\s[^>]*?)/?>").expect("category pattern is valid"));
static ENCLOSURE_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<enclosure(\s[^>]*)/?>").expect("enclosure pattern is valid"));
static IMG_SRC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<img[^>]+src=["']([^"']+)["']"#).expect("img pattern is valid")
});
static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([A-Za-z_][\w:.-]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#).expect("attribute pattern is valid")
});
static CDATA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!\[CDATA\[(.*?)\]\]>").expect("cdata pattern is valid"));

/// Parses feed items into friend posts. `site_url` resolves relative links
/// and images.
///
/// Items whose date is missing or unparseable are dropped: a fabricated
/// date would misplace the post in the merged listing.
pub fn parse_feed(xml: &str, site_url: &str) -> Result<Vec<FriendPost>, FeedError> {
    if !FEED_ROOT.is_match(xml) {
        return Err(FeedError::NotAFeed);
    }

    let mut posts = Vec::new();
    for (index, caps) in ITEM.captures_iter(xml).enumerate() {
        let Some(body) = caps.get(2) else { continue };
        match parse_item(body.as_str(), index, site_url) {
            Some(post) => posts.push(post),
            None => chronicle_debug!("Dropping feed item {} from {}: no usable date", index, site_url),
        }
    }
    Ok(posts)
}

fn parse_item(item: &str, index: usize, site_url: &str) -> Option<FriendPost> {
    let frontmatter = element_raw(item, "frontmatter");
    let item_without_frontmatter = match &frontmatter {
        Some(_) => ELEMENT_PATTERNS["frontmatter"].replace(item, "").into_owned(),
        None => item.to_string(),
    };
    let item = item_without_frontmatter.as_str();

    let published = first_text(item, &["pubDate", "published", "updated", "dc:date"])
        .as_deref()
        .and_then(parse_published)?;

    let title = text(item, "title")
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| format!("Post {}", index + 1));
    let link = item_link(item)
        .map(|href| absolute_url(site_url, &href))
        .unwrap_or_else(|| format!("{site_url}/post-{index}"));
    let description = first_text(item, &["description", "summary"]).unwrap_or_default();
    let content = first_text(item, &["content:encoded", "content"])
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| description.clone());

    let mut image = enclosure_image(item).or_else(|| {
        IMG_SRC
            .captures(&content)
            .and_then(|caps| caps.get(1))
            .map(|src| absolute_url(site_url, src.as_str()))
    });

    let mut category = None;
    let mut tags = Vec::new();
    let mut timeline_year = None;
    let mut timeline_era = None;
    let mut is_key_event = false;
    if let Some(block) = frontmatter.as_deref() {
        category = text(block, "category").filter(|c| !c.is_empty());
        if let Some(raw) = text(block, "tags") {
            tags = raw
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(ToOwned::to_owned)
                .collect();
        }
        timeline_year = text(block, "timelineYear").and_then(|y| y.parse::<i64>().ok());
        timeline_era = text(block, "timelineEra").filter(|e| !e.is_empty());
        is_key_event = text(block, "isKeyEvent").is_some_and(|v| v.eq_ignore_ascii_case("true"));
        if image.is_none() {
            image = text(block, "image")
                .filter(|src| !src.is_empty())
                .map(|src| prefix_site(site_url, &src));
        }
    }

    let categories = item_categories(item);
    if category.is_none() {
        category = categories.first().cloned();
    }
    if tags.is_empty() {
        tags = categories;
    }

    let slug = last_path_segment(&link).unwrap_or_else(|| format!("post-{index}"));
    let word_count = if content.is_empty() {
        DEFAULT_WORD_COUNT
    } else {
        content.split_whitespace().count().max(1)
    };

    Some(FriendPost {
        id: format!("rss-{slug}"),
        title,
        slug,
        description: truncate_chars(&description, DESCRIPTION_CHARS),
        published: published.to_rfc3339(),
        content: Some(content),
        source_url: Some(link),
        tags,
        category,
        image,
        word_count: Some(word_count),
        reading_time: Some(reading_time_minutes(word_count)),
        timeline_year,
        timeline_era,
        is_key_event,
        ..FriendPost::default()
    })
}

fn element_raw(block: &str, name: &str) -> Option<String> {
    ELEMENT_PATTERNS
        .get(name)?
        .captures(block)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Element text with CDATA unwrapped and entities decoded.
fn text(block: &str, name: &str) -> Option<String> {
    element_raw(block, name).map(|raw| clean(&raw))
}

fn first_text(block: &str, names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| text(block, name))
}

fn all_text(block: &str, name: &str) -> Vec<String> {
    let Some(pattern) = ELEMENT_PATTERNS.get(name) else {
        return Vec::new();
    };
    pattern
        .captures_iter(block)
        .filter_map(|caps| caps.get(1))
        .map(|m| clean(m.as_str()))
        .filter(|t| !t.is_empty())
        .collect()
}

fn clean(raw: &str) -> String {
    let unwrapped = CDATA.replace_all(raw, "$1");
    decode_entities(unwrapped.trim())
}

fn attributes(tag_attrs: &str) -> HashMap<String, String> {
    ATTRIBUTE
        .captures_iter(tag_attrs)
        .filter_map(|caps| {
            let name = caps.get(1)?.as_str().to_ascii_lowercase();
            let value = caps.get(2).or_else(|| caps.get(3))?.as_str();
            Some((name, decode_entities(value)))
        })
        .collect()
}

/// RSS `<category>` text, else Atom `<category term>` attributes.
fn item_categories(item: &str) -> Vec<String> {
    let named = all_text(item, "category");
    if !named.is_empty() {
        return named;
    }
    CATEGORY_TAG
        .captures_iter(item)
        .filter_map(|caps| caps.get(1))
        .filter_map(|attrs| attributes(attrs.as_str()).remove("term"))
        .map(|term| term.trim().to_string())
        .filter(|term| !term.is_empty())
        .collect()
}

/// Atom `<link href>` (preferring `rel="alternate"`), else RSS link text.
fn item_link(item: &str) -> Option<String> {
    let mut fallback = None;
    for caps in LINK_TAG.captures_iter(item) {
        let Some(attrs) = caps.get(1) else { continue };
        let attrs = attributes(attrs.as_str());
        let Some(href) = attrs.get("href").filter(|h| !h.is_empty()) else {
            continue;
        };
        match attrs.get("rel").map(String::as_str) {
            None | Some("alternate") => return Some(href.clone()),
            Some(_) if fallback.is_none() => fallback = Some(href.clone()),
            Some(_) => {}
        }
    }
    text(item, "link").filter(|l| !l.is_empty()).or(fallback)
}

fn enclosure_image(item: &str) -> Option<String> {
    ENCLOSURE_TAG.captures_iter(item).find_map(|caps| {
        let attrs = attributes(caps.get(1)?.as_str());
        let is_image = attrs.get("type").is_some_and(|t| t.starts_with("image"));
        if is_image {
            attrs.get("url").filter(|u| !u.is_empty()).cloned()
        } else {
            None
        }
    })
}
