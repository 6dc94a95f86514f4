//! RSS 2.0 output for the local site.
use std::fmt::Write as _;

use pulldown_cmark::{html, CowStr, Event, Options, Parser, Tag};

use crate::site::LocalPost;
use crate::text::{cdata, escape_xml};

/// Headers the feed is served with so friend sites can read it from a
/// browser.
pub const CORS_HEADERS: [(&str, &str); 3] = [
    ("Access-Control-Allow-Origin", "*"),
    ("Access-Control-Allow-Methods", "GET, OPTIONS"),
    ("Access-Control-Allow-Headers", "Content-Type"),
];

pub const DEFAULT_DESCRIPTION: &str = "No description";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedChannel {
    pub title: String,
    pub description: String,
    pub site_url: String,
    pub lang: String,
}

pub fn post_link(site_url: &str, slug: &str) -> String {
    format!("{}/posts/{}/", site_url.trim_end_matches('/'), slug)
}

const SAFE_SCHEMES: [&str; 5] = ["http", "https", "ftp", "mailto", "tel"];

/// Keeps relative URLs and the schemes in `SAFE_SCHEMES`; anything else
/// becomes `#`.
fn safe_url(url: CowStr<'_>) -> CowStr<'_> {
    let cleaned: String = url
        .chars()
        .filter(|c| !c.is_ascii_whitespace() && !c.is_ascii_control())
        .collect();
    let Some(colon) = cleaned.find(':') else {
        return url;
    };
    let scheme = &cleaned[..colon];
    let is_scheme = scheme.starts_with(|c: char| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    if !is_scheme || SAFE_SCHEMES.iter().any(|safe| scheme.eq_ignore_ascii_case(safe)) {
        url
    } else {
        CowStr::Borrowed("#")
    }
}

/// Markdown to HTML with raw HTML blocks and inline tags dropped and
/// link or image targets limited to safe schemes.
pub fn render_markdown(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    let parser = Parser::new_ext(markdown, options)
        .filter(|event| !matches!(event, Event::Html(_) | Event::InlineHtml(_)))
        .map(|event| match event {
            Event::Start(Tag::Link {
                link_type,
                dest_url,
                title,
                id,
            }) => Event::Start(Tag::Link {
                link_type,
                dest_url: safe_url(dest_url),
                title,
                id,
            }),
            Event::Start(Tag::Image {
                link_type,
                dest_url,
                title,
                id,
            }) => Event::Start(Tag::Image {
                link_type,
                dest_url: safe_url(dest_url),
                title,
                id,
            }),
            other => other,
        });
    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

/// Renders the channel with one item per post, in the order given.
pub fn render_feed(channel: &FeedChannel, posts: &[LocalPost]) -> String {
    let description = if channel.description.trim().is_empty() {
        DEFAULT_DESCRIPTION
    } else {
        channel.description.as_str()
    };

    let mut xml = String::new();
    xml.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    xml.push_str(
        "<rss version=\"2.0\" xmlns:content=\"http://purl.org/rss/1.0/modules/content/\">\n",
    );
    xml.push_str("<channel>\n");
    let _ = writeln!(xml, "<title>{}</title>", escape_xml(&channel.title));
    let _ = writeln!(xml, "<description>{}</description>", escape_xml(description));
    let _ = writeln!(xml, "<link>{}</link>", escape_xml(&channel.site_url));
    let _ = writeln!(xml, "<language>{}</language>", escape_xml(&channel.lang));

    for post in posts {
        let link = post_link(&channel.site_url, &post.slug);
        xml.push_str("<item>\n");
        let _ = writeln!(xml, "<title>{}</title>", escape_xml(post.title()));
        let _ = writeln!(xml, "<link>{}</link>", escape_xml(&link));
        let _ = writeln!(xml, "<guid isPermaLink=\"true\">{}</guid>", escape_xml(&link));
        let _ = writeln!(xml, "<description>{}</description>", escape_xml(post.description()));
        let _ = writeln!(xml, "<pubDate>{}</pubDate>", post.published.to_rfc2822());
        for tag in &post.frontmatter.tags {
            let _ = writeln!(xml, "<category>{}</category>", escape_xml(tag));
        }
        let _ = writeln!(
            xml,
            "<content:encoded>{}</content:encoded>",
            cdata(&render_markdown(&post.body))
        );
        xml.push_str("</item>\n");
    }

    xml.push_str("</channel>\n</rss>\n");
    xml
}
