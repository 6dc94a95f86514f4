//! Local content directory: loads `.md`/`.mdx` posts for listings, the
//! timeline and the generated feeds.
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, Utc};
use thiserror::Error;

use chronicle_core::friend::{parse_friend_markdown, parse_published, Friend};
use chronicle_core::frontmatter::parse_document;
use chronicle_core::post::{reading_time_minutes, word_count};
use chronicle_core::{EntrySource, Frontmatter, PostEntry, TimelineEvent};
use chronicle_logging::{chronicle_debug, chronicle_warn};

pub const TIMELINE_BANNER: &str = "timeline";

#[derive(Debug, Error)]
pub enum SiteError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct LocalPost {
    /// Path relative to the content directory without extension, using `/`.
    pub slug: String,
    pub path: PathBuf,
    pub frontmatter: Frontmatter,
    pub published: DateTime<Utc>,
    pub updated: Option<DateTime<Utc>>,
    pub body: String,
}

impl LocalPost {
    pub fn title(&self) -> &str {
        self.frontmatter.title.as_deref().unwrap_or(&self.slug)
    }

    pub fn description(&self) -> &str {
        self.frontmatter.description.as_deref().unwrap_or("")
    }

    pub fn is_draft(&self) -> bool {
        self.frontmatter.draft.unwrap_or(false)
    }

    pub fn to_entry(&self) -> PostEntry {
        let words = word_count(&self.body);
        PostEntry {
            id: self.slug.clone(),
            slug: self.slug.clone(),
            title: self.title().to_string(),
            published: self.published,
            updated: self.updated,
            description: self.description().to_string(),
            tags: self.frontmatter.tags.clone(),
            category: self.frontmatter.category.clone().unwrap_or_default(),
            image: self.frontmatter.image.clone().unwrap_or_default(),
            body: self.body.clone(),
            words,
            minutes: reading_time_minutes(words),
            draft: self.is_draft(),
            source: EntrySource::Local,
        }
    }

    /// Posts with a timeline year, or a timeline banner, become events.
    /// Banner posts without a year sit at their publish year.
    pub fn to_timeline_event(&self) -> Option<TimelineEvent> {
        let fm = &self.frontmatter;
        let is_banner = fm.banner_type.as_deref() == Some(TIMELINE_BANNER);
        let year = match fm.timeline_year {
            Some(year) => year,
            None if is_banner => i64::from(self.published.year()),
            None => return None,
        };
        let mut event = TimelineEvent::new(self.title(), self.slug.clone(), year);
        event.description = self.description().to_string();
        event.era = fm.timeline_era.clone().filter(|era| !era.is_empty());
        event.category = fm.category.clone();
        event.is_key_event = fm.is_key_event.unwrap_or(false);
        event.location = fm.timeline_location.clone();
        event.is_draft = self.is_draft();
        event.y_index = fm.y_index;
        if is_banner {
            event.banner = fm.banner_data.as_ref().map(|data| data.to_timeline_banner());
        }
        Some(event)
    }
}

/// Reads every post under `dir`, newest first. Files with an unreadable
/// frontmatter or publish date are skipped with a warning.
pub fn load_posts(dir: &Path, include_drafts: bool) -> Result<Vec<LocalPost>, SiteError> {
    let mut files = Vec::new();
    collect_post_files(dir, &mut files)?;
    files.sort();

    let mut posts = Vec::new();
    for path in files {
        let text = fs::read_to_string(&path).map_err(|source| SiteError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let doc = match parse_document(&text) {
            Ok(doc) => doc,
            Err(err) => {
                chronicle_warn!("Skipping {}: {}", path.display(), err);
                continue;
            }
        };
        let Some(published) = doc.frontmatter.published.as_deref().and_then(parse_published) else {
            chronicle_warn!("Skipping {}: missing or invalid published date", path.display());
            continue;
        };
        let post = LocalPost {
            slug: slug_for(dir, &path),
            updated: doc.frontmatter.updated.as_deref().and_then(parse_published),
            published,
            frontmatter: doc.frontmatter,
            body: doc.body,
            path,
        };
        if post.is_draft() && !include_drafts {
            chronicle_debug!("Leaving out draft {}", post.slug);
            continue;
        }
        posts.push(post);
    }
    posts.sort_by(|a, b| b.published.cmp(&a.published));
    Ok(posts)
}

pub fn timeline_events(posts: &[LocalPost]) -> Vec<TimelineEvent> {
    posts.iter().filter_map(LocalPost::to_timeline_event).collect()
}

/// Friend pages kept in the site's content collection. A missing directory
/// means no permanent friends.
pub fn load_friends(dir: &Path) -> Result<Vec<Friend>, SiteError> {
    if !dir.is_dir() {
        chronicle_debug!("No friends directory at {}", dir.display());
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    collect_post_files(dir, &mut files)?;
    files.sort();

    let mut friends = Vec::new();
    for path in files {
        let text = fs::read_to_string(&path).map_err(|source| SiteError::Read {
            path: path.display().to_string(),
            source,
        })?;
        match parse_friend_markdown(&text) {
            Some(friend) => friends.push(friend),
            None => chronicle_warn!("Skipping friend page {}: no url", path.display()),
        }
    }
    Ok(friends)
}

fn collect_post_files(dir: &Path, out: &mut Vec<PathBuf>) -> Result<(), SiteError> {
    let read_err = |source| SiteError::Read {
        path: dir.display().to_string(),
        source,
    };
    for entry in fs::read_dir(dir).map_err(read_err)? {
        let path = entry.map_err(read_err)?.path();
        if path.is_dir() {
            collect_post_files(&path, out)?;
        } else if is_post_file(&path) {
            out.push(path);
        }
    }
    Ok(())
}

pub fn is_post_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|ext| ext.to_str()),
        Some("md") | Some("mdx")
    )
}

fn slug_for(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path).with_extension("");
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
