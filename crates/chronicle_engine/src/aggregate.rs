//! Friend content discovery.
//!
//! Three stages run in order and the first one that yields posts wins:
//! feeds at the configured paths, JSON listings, then the homepage itself.
//! Nothing here returns an error; every failure is logged and the next
//! stage is tried.
use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};

use chronicle_core::friend::{format_url, Friend, FriendPost, SiteInfo};
use chronicle_logging::{chronicle_debug, chronicle_info, chronicle_warn};

use crate::api::parse_posts;
use crate::decode::decode_text;
use crate::feed::parse_feed;
use crate::fetch::{FetchOutput, FetchRequest, Fetcher, ACCEPT_FEED, ACCEPT_HTML, ACCEPT_JSON};
use crate::scrape::{fallback_site_info, scrape_posts, site_info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoverySettings {
    pub rss_paths: Vec<String>,
    pub json_paths: Vec<String>,
    pub feed_timeout: Duration,
    pub probe_timeout: Duration,
}

impl Default for DiscoverySettings {
    fn default() -> Self {
        Self {
            rss_paths: ["/rss.xml", "/feed.xml", "/feed", "/rss", "/atom.xml"]
                .into_iter()
                .map(ToOwned::to_owned)
                .collect(),
            json_paths: ["/api/posts.json", "/friend-content.json"]
                .into_iter()
                .map(ToOwned::to_owned)
                .collect(),
            feed_timeout: Duration::from_millis(3000),
            probe_timeout: Duration::from_millis(2000),
        }
    }
}

/// Which stage produced a friend's posts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryStage {
    Feed,
    Json,
    Homepage,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Discovery {
    pub stage: Option<DiscoveryStage>,
    pub source: Option<String>,
    pub posts: Vec<FriendPost>,
}

pub struct FriendAggregator {
    fetcher: Arc<dyn Fetcher>,
    settings: DiscoverySettings,
}

impl FriendAggregator {
    pub fn new(fetcher: Arc<dyn Fetcher>, settings: DiscoverySettings) -> Self {
        Self { fetcher, settings }
    }

    pub fn settings(&self) -> &DiscoverySettings {
        &self.settings
    }

    /// Posts published by the site at `url`, newest stage first. Returns an
    /// empty list when nothing usable was found.
    pub async fn discover(&self, url: &str) -> Vec<FriendPost> {
        self.discover_with_source(url, Utc::now().date_naive()).await.posts
    }

    /// Like [`discover`](Self::discover) but reports where the posts came
    /// from. `today` drives the homepage stage's fallback-date filter.
    pub async fn discover_with_source(&self, url: &str, today: NaiveDate) -> Discovery {
        let site = format_url(url);
        chronicle_info!("Discovering posts for {}", site);

        for path in &self.settings.rss_paths {
            let feed_url = format!("{site}{path}");
            if let Some(posts) = self.try_feed(&feed_url, &site).await {
                return Discovery::found(DiscoveryStage::Feed, feed_url, posts);
            }
        }

        for path in &self.settings.json_paths {
            let json_url = format!("{site}{path}");
            if let Some(posts) = self.try_json(&json_url, &site).await {
                return Discovery::found(DiscoveryStage::Json, json_url, posts);
            }
        }

        if let Some(posts) = self.try_homepage(&site, today).await {
            return Discovery::found(DiscoveryStage::Homepage, site, posts);
        }

        chronicle_warn!("No posts found for {}", site);
        Discovery {
            stage: None,
            source: None,
            posts: Vec::new(),
        }
    }

    /// Refreshes a friend's posts and sync time. Returns the number of posts
    /// now stored.
    pub async fn sync(&self, friend: &mut Friend) -> usize {
        let posts = self.discover(&friend.url).await;
        friend.set_posts(posts, Utc::now());
        friend.post_count
    }

    /// Reads the homepage's identity. Always succeeds: unreachable sites get
    /// a hostname-based placeholder.
    pub async fn validate_site(&self, url: &str) -> SiteInfo {
        let site = format_url(url);
        let request = FetchRequest::new(&site, ACCEPT_HTML).with_timeout(self.settings.probe_timeout);
        match self.fetch_text(request).await {
            Some(html) => site_info(&html, &site),
            None => {
                chronicle_warn!("Could not read {}, using defaults", site);
                fallback_site_info(&site)
            }
        }
    }

    async fn try_feed(&self, feed_url: &str, site: &str) -> Option<Vec<FriendPost>> {
        let request = FetchRequest::new(feed_url, ACCEPT_FEED).with_timeout(self.settings.feed_timeout);
        let xml = self.fetch_text(request).await?;
        match parse_feed(&xml, site) {
            Ok(posts) if !posts.is_empty() => Some(posts),
            Ok(_) => {
                chronicle_debug!("Feed {} has no dated items", feed_url);
                None
            }
            Err(err) => {
                chronicle_debug!("Skipping {}: {}", feed_url, err);
                None
            }
        }
    }

    async fn try_json(&self, json_url: &str, site: &str) -> Option<Vec<FriendPost>> {
        let request = FetchRequest::new(json_url, ACCEPT_JSON).with_timeout(self.settings.feed_timeout);
        let output = self.fetch(request).await?;
        match parse_posts(&output.bytes, site) {
            Ok(posts) if !posts.is_empty() => Some(posts),
            Ok(_) => {
                chronicle_debug!("Listing {} has no usable posts", json_url);
                None
            }
            Err(err) => {
                chronicle_debug!("Skipping {}: {}", json_url, err);
                None
            }
        }
    }

    async fn try_homepage(&self, site: &str, today: NaiveDate) -> Option<Vec<FriendPost>> {
        let request = FetchRequest::new(site, ACCEPT_HTML);
        let html = self.fetch_text(request).await?;
        let posts = scrape_posts(&html, site, today);
        if posts.is_empty() {
            chronicle_debug!("Homepage {} has no recognisable post cards", site);
            None
        } else {
            Some(posts)
        }
    }

    async fn fetch(&self, request: FetchRequest<'_>) -> Option<FetchOutput> {
        match self.fetcher.fetch(request).await {
            Ok(output) => Some(output),
            Err(err) => {
                chronicle_debug!("Fetch of {} failed: {}", request.url, err);
                None
            }
        }
    }

    async fn fetch_text(&self, request: FetchRequest<'_>) -> Option<String> {
        let output = self.fetch(request).await?;
        let decoded = decode_text(&output.bytes, output.metadata.content_type.as_deref());
        Some(decoded.text)
    }
}

impl Discovery {
    fn found(stage: DiscoveryStage, source: String, posts: Vec<FriendPost>) -> Self {
        chronicle_info!("Found {} posts at {}", posts.len(), source);
        Self {
            stage: Some(stage),
            source: Some(source),
            posts,
        }
    }
}
