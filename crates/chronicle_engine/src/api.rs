//! JSON post listings: the `/api/posts.json` convention and the
//! `friend-content.json` documents this platform publishes itself.
use serde::Deserialize;
use thiserror::Error;

use chronicle_core::friend::{parse_published, FriendPost, DEFAULT_WORD_COUNT};
use chronicle_core::post::reading_time_minutes;
use chronicle_logging::chronicle_debug;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid posts document: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PostsDocument {
    posts: Vec<ApiPost>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ApiPost {
    id: Option<String>,
    slug: Option<String>,
    title: Option<String>,
    description: Option<String>,
    excerpt: Option<String>,
    published: Option<String>,
    date: Option<String>,
    updated: Option<String>,
    content: Option<String>,
    body: Option<String>,
    url: Option<String>,
    tags: TagList,
    category: Option<String>,
    image: Option<String>,
    word_count: Option<usize>,
    reading_time: Option<usize>,
    timeline_year: Option<i64>,
    timeline_era: Option<String>,
    is_key_event: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(untagged)]
enum TagList {
    #[default]
    Missing,
    List(Vec<String>),
    Joined(String),
}

impl TagList {
    fn into_vec(self) -> Vec<String> {
        match self {
            TagList::Missing => Vec::new(),
            TagList::List(tags) => tags,
            TagList::Joined(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .map(ToOwned::to_owned)
                .collect(),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Parses a `{ "posts": [...] }` document. Posts without a parseable date
/// or without any identifier are dropped.
pub fn parse_posts(json: &[u8], site_url: &str) -> Result<Vec<FriendPost>, ApiError> {
    let document: PostsDocument = serde_json::from_slice(json)?;
    Ok(document
        .posts
        .into_iter()
        .filter_map(|post| map_post(post, site_url))
        .collect())
}

fn map_post(post: ApiPost, site_url: &str) -> Option<FriendPost> {
    let slug = non_empty(post.slug).unwrap_or_default();
    let Some(id) = non_empty(post.id).or_else(|| (!slug.is_empty()).then(|| slug.clone())) else {
        chronicle_debug!("Skipping post without id or slug from {}", site_url);
        return None;
    };
    let raw_date = non_empty(post.published).or(non_empty(post.date))?;
    let Some(published) = parse_published(&raw_date) else {
        chronicle_debug!("Skipping post {} from {}: bad date {:?}", id, site_url, raw_date);
        return None;
    };

    let word_count = post.word_count.filter(|w| *w > 0).unwrap_or(DEFAULT_WORD_COUNT);
    let reading_time = post
        .reading_time
        .filter(|m| *m > 0)
        .unwrap_or_else(|| reading_time_minutes(word_count));

    Some(FriendPost {
        title: non_empty(post.title).unwrap_or_else(|| "Untitled".to_string()),
        description: non_empty(post.description)
            .or(non_empty(post.excerpt))
            .unwrap_or_default(),
        published: published.to_rfc3339(),
        updated: non_empty(post.updated),
        content: Some(non_empty(post.content).or(non_empty(post.body)).unwrap_or_default()),
        source_url: Some(non_empty(post.url).unwrap_or_else(|| format!("{site_url}/{slug}"))),
        tags: post.tags.into_vec(),
        category: non_empty(post.category),
        image: non_empty(post.image),
        word_count: Some(word_count),
        reading_time: Some(reading_time),
        timeline_year: post.timeline_year,
        timeline_era: non_empty(post.timeline_era),
        is_key_event: post.is_key_event.unwrap_or(false),
        id,
        slug,
        ..FriendPost::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_fall_back_to_alternate_names() {
        let json = br#"{"posts":[{"slug":"hello","excerpt":"short","date":"2024-01-02","body":"text","tags":"a, b"}]}"#;
        let posts = parse_posts(json, "https://a.example").unwrap();
        assert_eq!(posts.len(), 1);
        let post = &posts[0];
        assert_eq!(post.id, "hello");
        assert_eq!(post.title, "Untitled");
        assert_eq!(post.description, "short");
        assert_eq!(post.published, "2024-01-02T00:00:00+00:00");
        assert_eq!(post.source_url.as_deref(), Some("https://a.example/hello"));
        assert_eq!(post.tags, vec!["a", "b"]);
        assert_eq!(post.word_count, Some(100));
        assert_eq!(post.reading_time, Some(1));
    }

    #[test]
    fn undated_posts_are_dropped() {
        let json = br#"{"posts":[{"id":"x","title":"No date"},{"id":"y","published":"never"}]}"#;
        assert!(parse_posts(json, "https://a.example").unwrap().is_empty());
    }
}
