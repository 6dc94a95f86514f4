use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::era::{deserialize_overrides, EraOverride, EraTable};

/// A dated post projected onto the timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEvent {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub slug: String,
    pub year: i64,
    #[serde(default)]
    pub era: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub is_key_event: bool,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub is_draft: bool,
    #[serde(default)]
    pub y_index: Option<i64>,
    #[serde(default)]
    pub banner: Option<BannerData>,
    /// Set for events that come from a friend's site.
    #[serde(default)]
    pub friend_name: Option<String>,
}

impl TimelineEvent {
    pub fn new(title: impl Into<String>, slug: impl Into<String>, year: i64) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            slug: slug.into(),
            year,
            era: None,
            category: None,
            is_key_event: false,
            location: None,
            is_draft: false,
            y_index: None,
            banner: None,
            friend_name: None,
        }
    }
}

/// Timeline banner settings attached to a post.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BannerData {
    pub category: Option<String>,
    pub start_year: Option<i64>,
    pub end_year: Option<i64>,
    pub background: Option<String>,
    #[serde(deserialize_with = "deserialize_overrides", skip_serializing)]
    pub era_config: Vec<EraOverride>,
}

/// Optional filters applied by [`process_events`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimelineFilter {
    pub category: Option<String>,
    pub start_year: Option<i64>,
    pub end_year: Option<i64>,
    pub era: Option<String>,
    pub only_key_events: bool,
}

impl TimelineFilter {
    fn accepts(&self, event: &TimelineEvent) -> bool {
        if let Some(category) = &self.category {
            let from_banner = event.banner.as_ref().and_then(|b| b.category.as_ref());
            if event.category.as_ref() != Some(category) && from_banner != Some(category) {
                return false;
            }
        }
        if self.start_year.is_some_and(|start| event.year < start) {
            return false;
        }
        if self.end_year.is_some_and(|end| event.year > end) {
            return false;
        }
        if let Some(era) = &self.era {
            if event.era.as_ref() != Some(era) {
                return false;
            }
        }
        !self.only_key_events || event.is_key_event
    }
}

/// Builds the era table in effect for a set of events: `base` plus the
/// overrides carried by the first banner that declares any.
pub fn extract_era_table(events: &[TimelineEvent], base: &EraTable) -> EraTable {
    let mut table = base.clone();
    let overrides = events
        .iter()
        .filter_map(|event| event.banner.as_ref())
        .find(|banner| !banner.era_config.is_empty());
    if let Some(banner) = overrides {
        table.merge_overrides(&banner.era_config);
    }
    table
}

/// Fills in missing eras, applies `filter`, and orders events by year.
///
/// Events sharing a year keep their input order.
pub fn process_events(
    events: &[TimelineEvent],
    filter: &TimelineFilter,
    base: &EraTable,
) -> Vec<TimelineEvent> {
    let table = extract_era_table(events, base);
    let mut out: Vec<TimelineEvent> = events
        .iter()
        .cloned()
        .map(|mut event| {
            if event.era.as_deref().map_or(true, str::is_empty) {
                event.era = Some(table.classify(event.year).to_string());
            }
            event
        })
        .filter(|event| filter.accepts(event))
        .collect();
    out.sort_by_key(|event| event.year);
    out
}

/// Groups events by era key. Groups are ordered by their earliest year.
pub fn group_by_era(events: &[TimelineEvent]) -> Vec<(String, Vec<TimelineEvent>)> {
    let mut groups: Vec<(String, Vec<TimelineEvent>)> = Vec::new();
    for event in events {
        let key = event.era.clone().unwrap_or_default();
        match groups.iter_mut().find(|(era, _)| *era == key) {
            Some((_, members)) => members.push(event.clone()),
            None => groups.push((key, vec![event.clone()])),
        }
    }
    groups.sort_by_key(|(_, members)| members.iter().map(|event| event.year).min());
    groups
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimelineStatistics {
    pub total: usize,
    pub key_events: usize,
    pub earliest_year: i64,
    pub latest_year: i64,
    pub span: i64,
    pub categories: usize,
    /// Era keys in first-seen order.
    pub eras: Vec<String>,
}

pub fn statistics(events: &[TimelineEvent]) -> TimelineStatistics {
    let (Some(earliest), Some(latest)) = (
        events.iter().map(|e| e.year).min(),
        events.iter().map(|e| e.year).max(),
    ) else {
        return TimelineStatistics::default();
    };
    let categories: BTreeSet<&str> = events.iter().filter_map(|e| e.category.as_deref()).collect();
    let mut eras: Vec<String> = Vec::new();
    for era in events.iter().filter_map(|e| e.era.as_deref()) {
        if !eras.iter().any(|seen| seen == era) {
            eras.push(era.to_string());
        }
    }
    TimelineStatistics {
        total: events.len(),
        key_events: events.iter().filter(|e| e.is_key_event).count(),
        earliest_year: earliest,
        latest_year: latest,
        span: latest - earliest,
        categories: categories.len(),
        eras,
    }
}
