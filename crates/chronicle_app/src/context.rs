//! Everything a command needs: configuration, the state store, and the
//! clients built from them.

use std::sync::Arc;

use anyhow::{Context as _, Result};
use chrono::{NaiveDate, Utc};

use chronicle_core::{EraTable, FriendRoster, KeyValueStore};
use chronicle_engine::github::TOKEN_KEY;
use chronicle_engine::{
    load_friends, load_posts, FetchSettings, FileStore, FriendAggregator, GitHubClient, LocalPost,
    ReqwestFetcher,
};
use chronicle_logging::{chronicle_debug, chronicle_warn};

use crate::config::{AppConfig, TOKEN_ENV};

pub struct AppContext {
    pub config: AppConfig,
    pub store: FileStore,
    pub eras: EraTable,
}

impl AppContext {
    pub fn open(config: AppConfig) -> Result<Self> {
        let store = FileStore::open(&config.state.path)
            .with_context(|| format!("opening state store {}", config.state.path.display()))?;
        let eras = config.era_table();
        Ok(Self {
            config,
            store,
            eras,
        })
    }

    pub fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }

    /// Stored friends plus the permanent ones from the site's friend pages.
    pub fn roster(&self) -> Result<FriendRoster> {
        let mut roster = FriendRoster::load(&self.store);
        let dir = self.config.site.friends_path();
        let permanent = load_friends(&dir)
            .with_context(|| format!("reading friend pages in {}", dir.display()))?;
        chronicle_debug!("{} permanent friends from {}", permanent.len(), dir.display());
        roster.set_permanent(permanent);
        Ok(roster)
    }

    pub fn save_roster(&mut self, roster: &FriendRoster) -> Result<()> {
        roster.save(&mut self.store).context("saving friends")
    }

    /// Local posts, newest first. A missing posts directory is an empty
    /// site rather than an error.
    pub fn local_posts(&self, include_drafts: bool) -> Result<Vec<LocalPost>> {
        let dir = self.config.site.posts_path();
        if !dir.is_dir() {
            chronicle_warn!("Posts directory {} does not exist", dir.display());
            return Ok(Vec::new());
        }
        load_posts(&dir, include_drafts).with_context(|| format!("loading posts from {}", dir.display()))
    }

    pub fn aggregator(&self) -> Result<FriendAggregator> {
        let fetcher = ReqwestFetcher::new(FetchSettings::default()).context("building HTTP client")?;
        Ok(FriendAggregator::new(
            Arc::new(fetcher),
            self.config.friends.discovery_settings(),
        ))
    }

    /// The environment token wins over the stored one.
    pub fn github(&self) -> Result<GitHubClient> {
        let token = std::env::var(TOKEN_ENV)
            .ok()
            .filter(|token| !token.trim().is_empty())
            .or_else(|| self.store.get(TOKEN_KEY));
        GitHubClient::new(self.config.repository.repo.clone(), token).context("building GitHub client")
    }
}
