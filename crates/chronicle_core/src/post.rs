use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::frontmatter::ParsedDocument;
use crate::store::{get_json, set_json, KeyValueStore, StoreError};

pub const WORDS_PER_MINUTE: usize = 200;
pub const EXCERPT_CHARS: usize = 150;
pub const CACHED_POSTS_KEY: &str = "cachedPosts";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AdvancedOptions {
    pub avatar_image: String,
    pub author_name: String,
    pub author_bio: String,
    pub show_image_on_post: bool,
    pub lang: String,
    pub banner_image: String,
}

impl Default for AdvancedOptions {
    fn default() -> Self {
        Self {
            avatar_image: String::new(),
            author_name: String::new(),
            author_bio: String::new(),
            show_image_on_post: false,
            lang: "en".to_string(),
            banner_image: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TimelineData {
    pub enabled: bool,
    pub year: Option<i64>,
    pub era: String,
    pub location: String,
    pub is_key_event: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BannerSettings {
    /// `image`, `video`, `timeline`, or empty for none.
    #[serde(rename = "type")]
    pub kind: String,
    pub video_id: String,
    pub timeline_category: String,
}

/// A post as edited before it is committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub title: String,
    pub description: String,
    pub slug: String,
    pub published: String,
    pub image: String,
    pub tags: Vec<String>,
    pub category: String,
    pub show_advanced_options: bool,
    pub advanced: AdvancedOptions,
    #[serde(rename = "timelineData")]
    pub timeline: TimelineData,
    pub banner: BannerSettings,
    pub content: String,
    pub draft: bool,
    pub filepath: Option<String>,
}

impl Post {
    /// A blank draft dated `today`.
    pub fn empty(today: NaiveDate) -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            slug: String::new(),
            published: today.format("%Y-%m-%d").to_string(),
            image: String::new(),
            tags: Vec::new(),
            category: String::new(),
            show_advanced_options: false,
            advanced: AdvancedOptions::default(),
            timeline: TimelineData::default(),
            banner: BannerSettings::default(),
            content: String::new(),
            draft: true,
            filepath: None,
        }
    }

    /// Rebuilds an editor post from a parsed document.
    ///
    /// Advanced, timeline and banner sections are switched on when any of
    /// their fields is present. `fallback_title` is used for the slug when
    /// the document has none.
    pub fn from_document(doc: &ParsedDocument, fallback_title: &str, today: NaiveDate) -> Self {
        let fm = &doc.frontmatter;
        let mut post = Post::empty(today);
        post.title = fm.title.clone().unwrap_or_default();
        post.description = fm.description.clone().unwrap_or_default();
        post.slug = fm
            .slug
            .clone()
            .filter(|slug| !slug.is_empty())
            .unwrap_or_else(|| slug_from_title(fallback_title));
        if let Some(published) = fm.published.clone().filter(|p| !p.is_empty()) {
            post.published = published;
        }
        post.image = fm.image.clone().unwrap_or_default();
        post.tags = fm.tags.clone();
        post.category = fm.category.clone().unwrap_or_default();
        post.draft = fm.draft.unwrap_or(true);
        post.content = doc.body.clone();

        let has_advanced = fm.avatar_image.is_some()
            || fm.author_name.is_some()
            || fm.author_bio.is_some()
            || fm.show_image_on_post.is_some()
            || fm.lang.is_some();
        if has_advanced {
            post.show_advanced_options = true;
            post.advanced = AdvancedOptions {
                avatar_image: fm.avatar_image.clone().unwrap_or_default(),
                author_name: fm.author_name.clone().unwrap_or_default(),
                author_bio: fm.author_bio.clone().unwrap_or_default(),
                show_image_on_post: fm.show_image_on_post.unwrap_or(false),
                lang: fm.lang.clone().unwrap_or_else(|| "en".to_string()),
                banner_image: String::new(),
            };
        }
        post.advanced.banner_image = fm
            .banner_image
            .clone()
            .or_else(|| {
                fm.banner_data
                    .as_ref()
                    .and_then(|data| data.image().map(str::to_string))
            })
            .unwrap_or_default();

        if fm.timeline_year.is_some() || fm.timeline_era.is_some() || fm.timeline_location.is_some() {
            post.timeline = TimelineData {
                enabled: true,
                year: fm.timeline_year,
                era: fm.timeline_era.clone().unwrap_or_default(),
                location: fm.timeline_location.clone().unwrap_or_default(),
                is_key_event: fm.is_key_event.unwrap_or(false),
            };
        }

        if let Some(kind) = fm.banner_type.clone().filter(|kind| !kind.is_empty()) {
            let data = fm.banner_data.clone().unwrap_or_default();
            post.banner = BannerSettings {
                kind,
                video_id: data.video_id.unwrap_or_default(),
                timeline_category: data.category.unwrap_or_default(),
            };
        }
        post
    }
}

/// Listing entry for a post, as cached and as fetched from the repository.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PostMetadata {
    pub id: String,
    pub title: String,
    pub description: String,
    pub slug: String,
    pub published: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated: Option<String>,
    pub tags: Vec<String>,
    pub category: String,
    pub draft: bool,
    pub filepath: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub error: bool,
}

/// URL-friendly slug: lowercase, word characters only, dash separated.
pub fn slug_from_title(title: &str) -> String {
    let kept: String = title
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '-' || c.is_whitespace())
        .collect();
    let mut slug = String::with_capacity(kept.len());
    let mut prev_dash = false;
    for c in kept.trim().chars() {
        let c = if c.is_whitespace() { '-' } else { c };
        if c == '-' {
            if !prev_dash {
                slug.push('-');
            }
            prev_dash = true;
        } else {
            slug.push(c);
            prev_dash = false;
        }
    }
    slug
}

pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(ToOwned::to_owned)
        .collect()
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Minutes at 200 words per minute, never less than one.
pub fn reading_time_minutes(words: usize) -> usize {
    words.div_ceil(WORDS_PER_MINUTE).max(1)
}

/// First 150 characters, with `...` appended when the text was cut.
pub fn excerpt(text: &str) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(EXCERPT_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}...")
    } else {
        head
    }
}

pub fn full_post_key(slug: &str) -> String {
    format!("fullPost_{slug}")
}

/// Full cached copy of a post, stored next to its listing entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CachedPost {
    #[serde(flatten)]
    pub metadata: PostMetadata,
    #[serde(default)]
    pub advanced: AdvancedOptions,
    #[serde(default)]
    pub timeline_data: TimelineData,
    #[serde(default)]
    pub banner: BannerSettings,
}

/// Local cache of edited posts kept in the key-value store.
pub struct PostCache<'a> {
    store: &'a mut dyn KeyValueStore,
}

impl<'a> PostCache<'a> {
    pub fn new(store: &'a mut dyn KeyValueStore) -> Self {
        Self { store }
    }

    pub fn list(&self) -> Vec<PostMetadata> {
        get_json(&*self.store, CACHED_POSTS_KEY).unwrap_or_default()
    }

    /// Upserts the listing entry by slug and stores the full post.
    /// Returns the updated listing.
    pub fn save(
        &mut self,
        post: &Post,
        folder: &str,
        today: NaiveDate,
    ) -> Result<Vec<PostMetadata>, StoreError> {
        let metadata = PostMetadata {
            id: format!("{}.mdx", post.slug),
            title: post.title.clone(),
            description: post.description.clone(),
            slug: post.slug.clone(),
            published: post.published.clone(),
            updated: Some(today.format("%Y-%m-%d").to_string()),
            tags: post.tags.clone(),
            category: post.category.clone(),
            draft: post.draft,
            filepath: post
                .filepath
                .clone()
                .filter(|path| !path.is_empty())
                .unwrap_or_else(|| format!("{folder}/{}.mdx", post.slug)),
            content: Some(excerpt(&post.content)),
            error: false,
        };

        let mut posts = self.list();
        match posts.iter_mut().find(|entry| entry.slug == post.slug) {
            Some(existing) => *existing = metadata.clone(),
            None => posts.push(metadata.clone()),
        }
        set_json(&mut *self.store, CACHED_POSTS_KEY, &posts)?;

        let full = CachedPost {
            metadata: PostMetadata {
                content: Some(post.content.clone()),
                ..metadata
            },
            advanced: post.advanced.clone(),
            timeline_data: post.timeline.clone(),
            banner: post.banner.clone(),
        };
        set_json(&mut *self.store, &full_post_key(&post.slug), &full)?;
        Ok(posts)
    }

    pub fn load_full(&self, slug: &str) -> Option<CachedPost> {
        get_json(&*self.store, &full_post_key(slug))
    }
}
