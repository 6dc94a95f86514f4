use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::store::{KeyValueStore, StoreError};
use crate::view_model::TimelineViewModel;
use crate::{process_events, EraTable, TimelineEvent, TimelineFilter};

pub const DEFAULT_BACKGROUND: &str = "/assets/banner/0001.png";
pub const MIN_SCALE: f64 = 0.5;
pub const MAX_SCALE: f64 = 5.0;
pub const ZOOM_STEP: f64 = 0.2;

pub const VIEW_MODE_KEY: &str = "timeline-view-preference";
pub const COMPACT_KEY: &str = "timeline-compact-mode";
pub const LAST_ERA_KEY: &str = "timeline-last-era";
pub const LAST_ERA_SCALE_KEY: &str = "timeline-last-era-scale";
pub const LAST_ERA_OFFSET_X_KEY: &str = "timeline-last-era-offset-x";
pub const LAST_ERA_OFFSET_Y_KEY: &str = "timeline-last-era-offset-y";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Timeline,
    List,
    Tree,
    Map,
}

impl ViewMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ViewMode::Timeline => "timeline",
            ViewMode::List => "list",
            ViewMode::Tree => "tree",
            ViewMode::Map => "map",
        }
    }
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ViewMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "timeline" => Ok(ViewMode::Timeline),
            "list" => Ok(ViewMode::List),
            "tree" => Ok(ViewMode::Tree),
            "map" => Ok(ViewMode::Map),
            other => Err(format!("unknown view mode '{other}'")),
        }
    }
}

/// Persisted subset of the view state. Absent fields leave the
/// corresponding state untouched when restored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewPreferences {
    pub view_mode: Option<ViewMode>,
    pub compact: Option<bool>,
    pub last_era: Option<String>,
    pub scale: Option<f64>,
    pub offset_x: Option<f64>,
    pub offset_y: Option<f64>,
}

impl ViewPreferences {
    /// Reads whatever preferences are present. Malformed values are skipped.
    pub fn load(store: &dyn KeyValueStore) -> Self {
        let number = |key: &str| store.get(key).and_then(|raw| raw.trim().parse::<f64>().ok());
        Self {
            view_mode: store.get(VIEW_MODE_KEY).and_then(|raw| raw.parse().ok()),
            compact: store
                .get(COMPACT_KEY)
                .filter(|raw| !raw.is_empty())
                .map(|raw| raw == "true"),
            last_era: store.get(LAST_ERA_KEY).filter(|raw| !raw.is_empty()),
            scale: number(LAST_ERA_SCALE_KEY),
            offset_x: number(LAST_ERA_OFFSET_X_KEY),
            offset_y: number(LAST_ERA_OFFSET_Y_KEY),
        }
    }

    /// Writes the present fields as plain strings. An absent era clears the
    /// stored one, so leaving an era is remembered too.
    pub fn save(&self, store: &mut dyn KeyValueStore) -> Result<(), StoreError> {
        if let Some(mode) = self.view_mode {
            store.set(VIEW_MODE_KEY, mode.as_str().to_string())?;
        }
        if let Some(compact) = self.compact {
            store.set(COMPACT_KEY, compact.to_string())?;
        }
        match &self.last_era {
            Some(era) => store.set(LAST_ERA_KEY, era.clone())?,
            None => store.remove(LAST_ERA_KEY)?,
        }
        if let Some(scale) = self.scale {
            store.set(LAST_ERA_SCALE_KEY, scale.to_string())?;
        }
        if let Some(x) = self.offset_x {
            store.set(LAST_ERA_OFFSET_X_KEY, x.to_string())?;
        }
        if let Some(y) = self.offset_y {
            store.set(LAST_ERA_OFFSET_Y_KEY, y.to_string())?;
        }
        Ok(())
    }
}

/// State of the pan/zoom timeline widget.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineViewState {
    view_mode: ViewMode,
    compact: bool,
    as_banner: bool,
    scale: f64,
    offset_x: f64,
    offset_y: f64,
    selected_event: Option<String>,
    category: Option<String>,
    era: Option<String>,
    start_year: Option<i64>,
    end_year: Option<i64>,
    show_only_key_events: bool,
    background: String,
    events: Vec<TimelineEvent>,
    last_era: Option<String>,
    last_era_scale: Option<f64>,
    last_era_offset_x: Option<f64>,
    last_era_offset_y: Option<f64>,
}

impl Default for TimelineViewState {
    fn default() -> Self {
        Self {
            view_mode: ViewMode::Timeline,
            compact: false,
            as_banner: false,
            scale: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
            selected_event: None,
            category: None,
            era: None,
            start_year: None,
            end_year: None,
            show_only_key_events: false,
            background: DEFAULT_BACKGROUND.to_string(),
            events: Vec::new(),
            last_era: None,
            last_era_scale: None,
            last_era_offset_x: None,
            last_era_offset_y: None,
        }
    }
}

impl TimelineViewState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> TimelineViewModel {
        TimelineViewModel {
            view_mode: self.view_mode,
            compact: self.compact,
            as_banner: self.as_banner,
            scale: self.scale,
            offset_x: self.offset_x,
            offset_y: self.offset_y,
            selected_event: self.selected_event.clone(),
            category: self.category.clone(),
            era: self.era.clone(),
            start_year: self.start_year,
            end_year: self.end_year,
            show_only_key_events: self.show_only_key_events,
            background: self.background.clone(),
            event_count: self.events.len(),
            last_era: self.last_era.clone(),
        }
    }

    /// Events after the active filters, ordered by year.
    pub fn filtered_events(&self, table: &EraTable) -> Vec<TimelineEvent> {
        let filter = TimelineFilter {
            category: self.category.clone(),
            start_year: self.start_year,
            end_year: self.end_year,
            era: self.era.clone(),
            only_key_events: self.show_only_key_events,
        };
        process_events(&self.events, &filter, table)
    }

    /// The selected event, looked up by slug among the filtered events.
    pub fn selected_event(&self, table: &EraTable) -> Option<TimelineEvent> {
        let slug = self.selected_event.as_deref()?;
        self.filtered_events(table)
            .into_iter()
            .find(|event| event.slug == slug)
    }

    /// Years visible in a viewport of `viewport_width` pixels over a
    /// timeline laid out across `container_width` pixels at scale 1.
    ///
    /// Returns `None` for an empty layout or span.
    pub fn visible_year_range(
        &self,
        span: (i64, i64),
        viewport_width: f64,
        container_width: f64,
    ) -> Option<(i64, i64)> {
        let (start, end) = span;
        if container_width <= 0.0 || self.scale <= 0.0 || end <= start {
            return None;
        }
        let total = (end - start) as f64;
        let scaled = container_width * self.scale;
        let visible_span = total * (viewport_width / scaled);
        let center_offset = self.offset_x / (scaled / 2.0);
        let middle = start as f64 + total / 2.0 - total * center_offset / 2.0;
        Some((
            (middle - visible_span / 2.0).round() as i64,
            (middle + visible_span / 2.0).round() as i64,
        ))
    }

    pub(crate) fn preferences(&self) -> ViewPreferences {
        ViewPreferences {
            view_mode: Some(self.view_mode),
            compact: Some(self.compact),
            last_era: self.era.clone(),
            scale: Some(self.scale),
            offset_x: Some(self.offset_x),
            offset_y: Some(self.offset_y),
        }
    }

    pub(crate) fn restore(&mut self, prefs: ViewPreferences) {
        if let Some(mode) = prefs.view_mode {
            self.view_mode = mode;
        }
        if let Some(compact) = prefs.compact {
            self.compact = compact;
        }
        if let Some(era) = prefs.last_era {
            self.era = Some(era.clone());
            self.last_era = Some(era);
        }
        if let Some(scale) = prefs.scale {
            self.scale = scale.clamp(MIN_SCALE, MAX_SCALE);
            self.last_era_scale = Some(scale);
        }
        if let Some(x) = prefs.offset_x {
            self.offset_x = x;
            self.last_era_offset_x = Some(x);
        }
        if let Some(y) = prefs.offset_y {
            self.offset_y = y;
            self.last_era_offset_y = Some(y);
        }
    }

    pub(crate) fn set_events(&mut self, events: Vec<TimelineEvent>) {
        self.events = events;
    }

    pub(crate) fn set_view_mode(&mut self, mode: ViewMode) {
        self.view_mode = mode;
    }

    pub(crate) fn toggle_compact(&mut self) {
        self.compact = !self.compact;
    }

    pub(crate) fn set_banner_mode(&mut self, as_banner: bool) {
        self.as_banner = as_banner;
    }

    /// Steps the scale, clamped and rounded to two decimals so repeated
    /// steps do not drift.
    pub(crate) fn zoom_by(&mut self, delta: f64) {
        let next = (self.scale + delta).clamp(MIN_SCALE, MAX_SCALE);
        self.scale = (next * 100.0).round() / 100.0;
    }

    pub(crate) fn pan(&mut self, dx: f64, dy: f64) {
        self.offset_x += dx;
        self.offset_y += dy;
    }

    pub(crate) fn reset_view(&mut self) {
        self.scale = 1.0;
        self.offset_x = 0.0;
        self.offset_y = 0.0;
    }

    pub(crate) fn select_event(&mut self, slug: Option<String>) {
        self.selected_event = slug;
    }

    pub(crate) fn set_category(&mut self, category: Option<String>) {
        self.category = category;
    }

    pub(crate) fn set_era(&mut self, era: Option<String>) {
        self.last_era = era.clone();
        self.era = era;
    }

    pub(crate) fn set_year_range(&mut self, start: Option<i64>, end: Option<i64>) {
        self.start_year = start;
        self.end_year = end;
    }

    pub(crate) fn toggle_key_events_only(&mut self) {
        self.show_only_key_events = !self.show_only_key_events;
    }

    pub(crate) fn set_background(&mut self, background: String) {
        self.background = background;
    }

    pub(crate) fn has_era(&self) -> bool {
        self.era.is_some()
    }

    pub(crate) fn save_era_position(&mut self, scale: f64, offset_x: f64, offset_y: f64) {
        self.scale = scale;
        self.offset_x = offset_x;
        self.offset_y = offset_y;
        self.last_era_scale = Some(scale);
        self.last_era_offset_x = Some(offset_x);
        self.last_era_offset_y = Some(offset_y);
    }
}
