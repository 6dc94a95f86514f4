//! Friend sites and the posts discovered on them.
//!
//! [`FriendRoster`] is the explicit replacement for the shared friends
//! store: callers own it, load it from a [`KeyValueStore`], and save it back.
use std::collections::BTreeMap;
use std::fmt::Write as _;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;

use chronicle_logging::{chronicle_debug, chronicle_warn};

use crate::listing::{EntrySource, PostEntry};
use crate::post::{reading_time_minutes, word_count};
use crate::store::{get_json, set_json, KeyValueStore, StoreError};
use crate::timeline::TimelineEvent;

pub const FRIENDS_KEY: &str = "blogFriends";
pub const FRIEND_CONTENT_ENABLED_KEY: &str = "friendContentEnabled";
pub const PERMANENT_POSTS_KEY: &str = "permanentFriendPosts";
pub const DEFAULT_WORD_COUNT: usize = 100;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FriendPost {
    pub id: String,
    pub title: String,
    pub slug: String,
    pub description: String,
    /// RFC 3339 timestamp.
    pub published: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub word_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reading_time: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeline_year: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeline_era: Option<String>,
    pub is_key_event: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub friend_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub friend_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub friend_avatar: Option<String>,
    pub is_friend_content: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Friend {
    pub id: String,
    pub name: String,
    pub url: String,
    pub bio: String,
    pub avatar: String,
    pub last_synced: Option<String>,
    pub post_count: usize,
    pub posts: Vec<FriendPost>,
    #[serde(rename = "isPermanent")]
    pub permanent: bool,
}

impl Friend {
    /// A temporary friend built from validated site info.
    pub fn from_site(info: &SiteInfo) -> Self {
        Self {
            id: friend_id(&info.url),
            name: info.name.clone(),
            url: info.url.clone(),
            bio: info.description.clone(),
            avatar: info.avatar.clone(),
            ..Self::default()
        }
    }

    pub fn set_posts(&mut self, posts: Vec<FriendPost>, synced_at: DateTime<Utc>) {
        self.post_count = posts.len();
        self.posts = posts;
        self.last_synced = Some(synced_at.to_rfc3339());
    }
}

/// What a friend's homepage says about itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SiteInfo {
    pub name: String,
    pub description: String,
    pub avatar: String,
    pub url: String,
}

#[derive(Debug, Error)]
pub enum RosterError {
    #[error("a friend with url {0} is already registered")]
    Duplicate(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Last sync of a permanent friend. The friend itself lives in site
/// content, so only what the sync produced is stored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct SyncedPosts {
    last_synced: Option<String>,
    posts: Vec<FriendPost>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FriendRoster {
    friends: Vec<Friend>,
    content_enabled: bool,
    /// Synced posts of permanent friends, by friend id.
    permanent_posts: BTreeMap<String, SyncedPosts>,
}

impl Default for FriendRoster {
    fn default() -> Self {
        Self {
            friends: Vec::new(),
            content_enabled: true,
            permanent_posts: BTreeMap::new(),
        }
    }
}

impl FriendRoster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads the persisted friends, all marked temporary.
    pub fn load(store: &dyn KeyValueStore) -> Self {
        let mut friends: Vec<Friend> = get_json(store, FRIENDS_KEY).unwrap_or_default();
        for friend in &mut friends {
            friend.permanent = false;
        }
        let content_enabled = store.get(FRIEND_CONTENT_ENABLED_KEY).as_deref() != Some("false");
        let permanent_posts: BTreeMap<String, SyncedPosts> =
            get_json(store, PERMANENT_POSTS_KEY).unwrap_or_default();
        chronicle_debug!(
            "Loaded {} friends and synced posts for {} permanent friends",
            friends.len(),
            permanent_posts.len()
        );
        Self {
            friends,
            content_enabled,
            permanent_posts,
        }
    }

    /// Persists temporary friends, the content toggle, and the synced posts
    /// of permanent friends. The permanent friends themselves come from site
    /// content and are never written.
    pub fn save(&self, store: &mut dyn KeyValueStore) -> Result<(), StoreError> {
        let temporary: Vec<&Friend> = self.temporary().collect();
        set_json(store, FRIENDS_KEY, &temporary)?;
        set_json(store, PERMANENT_POSTS_KEY, &self.permanent_posts)?;
        store.set(FRIEND_CONTENT_ENABLED_KEY, self.content_enabled.to_string())
    }

    pub fn friends(&self) -> &[Friend] {
        &self.friends
    }

    pub fn temporary(&self) -> impl Iterator<Item = &Friend> {
        self.friends.iter().filter(|friend| !friend.permanent)
    }

    pub fn permanent(&self) -> impl Iterator<Item = &Friend> {
        self.friends.iter().filter(|friend| friend.permanent)
    }

    pub fn get(&self, id: &str) -> Option<&Friend> {
        self.friends.iter().find(|friend| friend.id == id)
    }

    /// Looks a friend up by id, or by URL in any of its accepted spellings.
    pub fn find(&self, id_or_url: &str) -> Option<&Friend> {
        let url = format_url(id_or_url);
        self.friends
            .iter()
            .find(|friend| friend.id == id_or_url || friend.url == url)
    }

    pub fn content_enabled(&self) -> bool {
        self.content_enabled
    }

    pub fn set_content_enabled(&mut self, enabled: bool) {
        self.content_enabled = enabled;
    }

    pub fn add(&mut self, friend: Friend) -> Result<(), RosterError> {
        if self.friends.iter().any(|existing| existing.url == friend.url) {
            return Err(RosterError::Duplicate(friend.url));
        }
        self.friends.push(friend);
        Ok(())
    }

    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.friends.len();
        self.friends.retain(|friend| friend.id != id);
        self.friends.len() != before
    }

    /// Replaces the friend with the same id. The stored permanent flag wins.
    pub fn update(&mut self, updated: Friend) -> bool {
        match self.friends.iter_mut().find(|friend| friend.id == updated.id) {
            Some(slot) => {
                let permanent = slot.permanent;
                if permanent {
                    self.permanent_posts.insert(
                        updated.id.clone(),
                        SyncedPosts {
                            last_synced: updated.last_synced.clone(),
                            posts: updated.posts.clone(),
                        },
                    );
                }
                *slot = Friend {
                    permanent,
                    ..updated
                };
                true
            }
            None => false,
        }
    }

    /// Replaces every permanent friend with `friends`, appended after the
    /// temporary ones. Posts from an earlier sync are restored for friends
    /// that arrive without any; synced posts of friends no longer listed
    /// are dropped.
    pub fn set_permanent(&mut self, friends: Vec<Friend>) {
        self.friends.retain(|friend| !friend.permanent);
        self.permanent_posts
            .retain(|id, _| friends.iter().any(|friend| &friend.id == id));
        for mut friend in friends {
            friend.permanent = true;
            if friend.posts.is_empty() {
                if let Some(synced) = self.permanent_posts.get(&friend.id) {
                    friend.posts = synced.posts.clone();
                    if synced.last_synced.is_some() {
                        friend.last_synced = synced.last_synced.clone();
                    }
                }
            }
            friend.post_count = friend.posts.len();
            self.friends.push(friend);
        }
    }

    /// All friend posts with attribution and reading stats, newest first.
    pub fn friend_content(&self) -> Vec<FriendPost> {
        let mut posts: Vec<FriendPost> = self
            .friends
            .iter()
            .flat_map(|friend| {
                friend.posts.iter().map(move |post| {
                    let words = post.word_count.unwrap_or_else(|| {
                        post.content
                            .as_deref()
                            .map(word_count)
                            .filter(|count| *count > 0)
                            .unwrap_or(DEFAULT_WORD_COUNT)
                    });
                    FriendPost {
                        friend_name: Some(friend.name.clone()),
                        friend_url: Some(friend.url.clone()),
                        friend_avatar: Some(friend.avatar.clone()).filter(|a| !a.is_empty()),
                        is_friend_content: true,
                        word_count: Some(words),
                        reading_time: Some(post.reading_time.unwrap_or_else(|| reading_time_minutes(words))),
                        ..post.clone()
                    }
                })
            })
            .collect();
        posts.sort_by(|a, b| parse_published(&b.published).cmp(&parse_published(&a.published)));
        posts
    }

    /// Friend posts in the local listing shape. Posts without a readable
    /// date are left out.
    pub fn as_entries(&self) -> Vec<PostEntry> {
        self.friend_content()
            .into_iter()
            .filter_map(|post| {
                let Some(published) = parse_published(&post.published) else {
                    chronicle_warn!("Skipping friend post '{}' with unreadable date", post.title);
                    return None;
                };
                let slug = if post.slug.is_empty() {
                    post.id.clone()
                } else {
                    post.slug.clone()
                };
                let words = post.word_count.unwrap_or(DEFAULT_WORD_COUNT);
                Some(PostEntry {
                    id: post.id.clone(),
                    slug,
                    title: post.title.clone(),
                    published,
                    updated: post.updated.as_deref().and_then(parse_published),
                    body: post
                        .content
                        .clone()
                        .unwrap_or_else(|| post.description.clone()),
                    description: post.description.clone(),
                    tags: post.tags.clone(),
                    category: post
                        .category
                        .clone()
                        .filter(|c| !c.is_empty())
                        .unwrap_or_else(|| "Uncategorized".to_string()),
                    image: post.image.clone().unwrap_or_default(),
                    words,
                    minutes: post.reading_time.unwrap_or_else(|| reading_time_minutes(words)),
                    draft: false,
                    source: EntrySource::Friend {
                        name: post.friend_name.clone().unwrap_or_default(),
                        url: post.friend_url.clone().unwrap_or_default(),
                        avatar: post.friend_avatar.clone(),
                        source_url: post.source_url.clone(),
                    },
                })
            })
            .collect()
    }

    /// Friend posts placed on the timeline by their timeline year, or their
    /// publish year when they have none.
    pub fn as_timeline_events(&self) -> Vec<TimelineEvent> {
        self.friend_content()
            .into_iter()
            .filter_map(|post| {
                let year = post
                    .timeline_year
                    .or_else(|| parse_published(&post.published).map(|dt| i64::from(dt.year())))?;
                let slug = if post.slug.is_empty() {
                    post.id.clone()
                } else {
                    post.slug.clone()
                };
                let mut event = TimelineEvent::new(post.title, slug, year);
                event.description = post.description;
                event.era = post.timeline_era;
                event.category = post.category;
                event.is_key_event = post.is_key_event;
                event.friend_name = post.friend_name;
                Some(event)
            })
            .collect()
    }
}

/// Parses the date spellings friend sites use: RFC 3339, RFC 2822, bare
/// dates and naive timestamps (taken as UTC).
pub fn parse_published(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
        return Some(dt.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// True when `value` parses and is not dated `today`, which usually means a
/// page stamped the fetch time instead of the post date.
pub fn has_valid_date(value: &str, today: NaiveDate) -> bool {
    parse_published(value).is_some_and(|dt| dt.date_naive() != today)
}

/// Adds `https://` when no scheme is given and drops one trailing slash.
pub fn format_url(url: &str) -> String {
    let url = url.trim();
    let mut clean = if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{url}")
    };
    if clean.ends_with('/') {
        clean.pop();
    }
    clean
}

/// Stable id derived from the site URL.
pub fn friend_id(url: &str) -> String {
    let digest = Sha256::digest(format_url(url).as_bytes());
    let mut id = String::from("friend-");
    for byte in digest.iter().take(4) {
        let _ = write!(&mut id, "{byte:02x}");
    }
    id
}

/// Hostname without a leading `www.`.
pub fn site_name_from_url(url: &str) -> String {
    url::Url::parse(&format_url(url))
        .ok()
        .and_then(|parsed| parsed.host_str().map(|host| host.trim_start_matches("www.").to_string()))
        .unwrap_or_else(|| url.to_string())
}

fn yaml_quote(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("\"{value}\""))
}

/// Markdown page describing a friend, for committing into the site's
/// friends collection.
pub fn friend_markdown(friend: &Friend, now: DateTime<Utc>) -> String {
    let synced = friend.last_synced.clone().unwrap_or_else(|| now.to_rfc3339());
    let synced_label = friend
        .last_synced
        .as_deref()
        .and_then(parse_published)
        .map(|dt| dt.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| "Never".to_string());
    let bio_line = if friend.bio.is_empty() {
        String::new()
    } else {
        format!("Bio: {}", friend.bio)
    };
    format!(
        "---\nname: {name}\nurl: {url}\nbio: {bio}\navatar: {avatar}\nlastSynced: {synced}\n---\n\n# {raw_name}\n\nFriend site: [{raw_url}]({raw_url})\n\n{bio_line}\n\nLast synced: {synced_label}\n",
        name = yaml_quote(&friend.name),
        url = yaml_quote(&friend.url),
        bio = yaml_quote(&friend.bio),
        avatar = yaml_quote(&friend.avatar),
        synced = yaml_quote(&synced),
        raw_name = friend.name,
        raw_url = friend.url,
    )
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct FriendPage {
    name: String,
    url: String,
    bio: String,
    avatar: String,
    last_synced: Option<String>,
}

/// Reads a friend page (as written by [`friend_markdown`]) back into a
/// permanent friend. Pages without a URL are rejected.
pub fn parse_friend_markdown(text: &str) -> Option<Friend> {
    let normalized = text.replace("\r\n", "\n");
    let (yaml, _) = crate::frontmatter::split_frontmatter(&normalized)?;
    let page: FriendPage = match serde_yaml_ng::from_str(yaml) {
        Ok(page) => page,
        Err(err) => {
            chronicle_warn!("Unreadable friend page: {}", err);
            return None;
        }
    };
    if page.url.trim().is_empty() {
        return None;
    }
    let url = format_url(&page.url);
    let name = if page.name.trim().is_empty() {
        site_name_from_url(&url)
    } else {
        page.name
    };
    Some(Friend {
        id: friend_id(&url),
        name,
        url,
        bio: page.bio,
        avatar: page.avatar,
        last_synced: page.last_synced.filter(|s| !s.is_empty()),
        permanent: true,
        ..Friend::default()
    })
}

/// `Some Site!` becomes `some-site-.md`.
pub fn friend_filename(name: &str) -> String {
    let sanitized: String = name
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_lowercase() || c.is_ascii_digit() { c } else { '-' })
        .collect();
    format!("{sanitized}.md")
}
