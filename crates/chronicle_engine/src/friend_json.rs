//! The `friend-content.json` document other sites poll for our posts.
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::site::LocalPost;

pub const FORMAT_VERSION: &str = "1.0";
pub const DEFAULT_AVATAR: &str = "/avatar.png";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiteMeta {
    pub name: String,
    pub description: String,
    pub url: String,
    pub owner: String,
    pub avatar: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FriendContent {
    pub site: SiteMeta,
    pub cors: bool,
    pub version: &'static str,
    pub generated: String,
    pub posts: Vec<FriendContentPost>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FriendContentPost {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub description: String,
    pub published: String,
    pub updated: Option<String>,
    pub tags: Vec<String>,
    pub category: String,
    pub image: Option<String>,
}

fn iso(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Published posts only, newest first.
pub fn build(site: &SiteMeta, posts: &[LocalPost], generated: DateTime<Utc>) -> FriendContent {
    let mut published: Vec<&LocalPost> = posts.iter().filter(|p| !p.is_draft()).collect();
    published.sort_by(|a, b| b.published.cmp(&a.published));

    let mut site = site.clone();
    if site.avatar.is_empty() {
        site.avatar = DEFAULT_AVATAR.to_string();
    }

    FriendContent {
        site,
        cors: true,
        version: FORMAT_VERSION,
        generated: iso(generated),
        posts: published
            .into_iter()
            .map(|post| FriendContentPost {
                id: post.slug.clone(),
                title: post.title().to_string(),
                slug: post.slug.clone(),
                description: post.description().to_string(),
                published: iso(post.published),
                updated: post.updated.map(iso),
                tags: post.frontmatter.tags.clone(),
                category: post.frontmatter.category.clone().unwrap_or_default(),
                image: post.frontmatter.image.clone().filter(|i| !i.is_empty()),
            })
            .collect(),
    }
}

pub fn to_json(content: &FriendContent) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(content)
}
