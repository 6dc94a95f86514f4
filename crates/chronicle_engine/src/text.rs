//! Small string helpers shared by the discovery stages and the writers.
use std::sync::LazyLock;

use regex::{Captures, Regex};
use url::Url;

static ENTITY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"&(#[0-9]+|#[xX][0-9a-fA-F]+|[A-Za-z]+);").expect("entity pattern is valid")
});

/// Decodes the XML entities plus the handful of HTML ones feeds commonly
/// leak. Unknown named entities are left as written.
pub fn decode_entities(value: &str) -> String {
    if !value.contains('&') {
        return value.to_string();
    }
    ENTITY
        .replace_all(value, |caps: &Captures<'_>| {
            let name = &caps[1];
            let decoded = match name {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                _ => name
                    .strip_prefix("#x")
                    .or_else(|| name.strip_prefix("#X"))
                    .map(|hex| u32::from_str_radix(hex, 16))
                    .or_else(|| name.strip_prefix('#').map(str::parse::<u32>))
                    .and_then(Result::ok)
                    .and_then(char::from_u32),
            };
            decoded.map_or_else(|| caps[0].to_string(), String::from)
        })
        .into_owned()
}

/// Escapes text for element content and attribute values.
pub fn escape_xml(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

/// Wraps text in a CDATA section, splitting any embedded terminator.
pub fn cdata(value: &str) -> String {
    format!("<![CDATA[{}]]>", value.replace("]]>", "]]]]><![CDATA[>"))
}

/// Resolves `href` against `base`; returns `href` unchanged when either
/// side does not parse.
pub fn absolute_url(base: &str, href: &str) -> String {
    if href.starts_with("http://") || href.starts_with("https://") {
        return href.to_string();
    }
    Url::parse(base)
        .and_then(|base| base.join(href))
        .map(|url| url.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// Joins a site-relative path onto the site root by plain concatenation,
/// so `img.png` and `/img.png` both land directly under the root.
pub fn prefix_site(site_url: &str, path: &str) -> String {
    if path.starts_with("http") {
        path.to_string()
    } else if path.starts_with('/') {
        format!("{site_url}{path}")
    } else {
        format!("{site_url}/{path}")
    }
}

/// Last non-empty path segment, e.g. `my-post` for `https://a.b/posts/my-post/`.
pub fn last_path_segment(link: &str) -> Option<String> {
    let path = match Url::parse(link) {
        Ok(url) => url.path().to_string(),
        Err(_) => link.to_string(),
    };
    path.split('/')
        .rev()
        .find(|segment| !segment.is_empty())
        .map(ToOwned::to_owned)
}

pub fn truncate_chars(value: &str, max: usize) -> String {
    value.chars().take(max).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entities_decode_numeric_and_named() {
        assert_eq!(decode_entities("a &amp; b &#39;c&#x27; &bogus;"), "a & b 'c' &bogus;");
    }

    #[test]
    fn cdata_splits_terminator() {
        assert_eq!(cdata("a]]>b"), "<![CDATA[a]]]]><![CDATA[>b]]>");
    }

    #[test]
    fn relative_links_resolve_against_site() {
        assert_eq!(absolute_url("https://a.example", "/posts/x"), "https://a.example/posts/x");
        assert_eq!(last_path_segment("https://a.example/posts/x/").as_deref(), Some("x"));
        assert_eq!(last_path_segment("https://a.example/"), None);
    }
}
