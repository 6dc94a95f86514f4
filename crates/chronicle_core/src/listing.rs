use chrono::{DateTime, Utc};
use serde::Serialize;

/// Where a listing entry comes from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase", tag = "kind")]
pub enum EntrySource {
    Local,
    Friend {
        name: String,
        url: String,
        avatar: Option<String>,
        source_url: Option<String>,
    },
}

/// One row of the merged post listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostEntry {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub published: DateTime<Utc>,
    pub updated: Option<DateTime<Utc>>,
    pub description: String,
    pub tags: Vec<String>,
    pub category: String,
    pub image: String,
    pub body: String,
    pub words: usize,
    pub minutes: usize,
    pub draft: bool,
    pub source: EntrySource,
}

impl PostEntry {
    pub fn is_friend_content(&self) -> bool {
        matches!(self.source, EntrySource::Friend { .. })
    }
}

/// Interleaves local and friend entries, newest first. Entries with equal
/// dates keep local-before-friend order.
pub fn merge_listing(local: Vec<PostEntry>, friends: Vec<PostEntry>) -> Vec<PostEntry> {
    let mut merged = local;
    merged.extend(friends);
    merged.sort_by(|a, b| b.published.cmp(&a.published));
    merged
}
