use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

pub const UNKNOWN_ERA: &str = "unknown";
pub const UNKNOWN_DISPLAY_NAME: &str = "Unknown Era";

const DEFAULT_BADGE_CLASS: &str = "bg-[oklch(0.9_0.05_var(--hue))/0.1] dark:bg-[oklch(0.3_0.05_var(--hue))/0.2] text-[oklch(0.4_0.05_var(--hue))] dark:text-[oklch(0.9_0.05_var(--hue))]";
const PALE_BADGE_CLASS: &str = "bg-[oklch(0.8_0.1_var(--hue))/0.1] dark:bg-[oklch(0.8_0.1_var(--hue))/0.2] text-[oklch(0.3_0.1_var(--hue))] dark:text-[oklch(0.8_0.1_var(--hue))]";
const BRIGHT_BADGE_CLASS: &str = "bg-[oklch(0.7_0.2_var(--hue))/0.1] dark:bg-[oklch(0.7_0.2_var(--hue))/0.2] text-[oklch(0.3_0.2_var(--hue))] dark:text-[oklch(0.7_0.2_var(--hue))]";
const VIVID_BADGE_CLASS: &str = "bg-[oklch(0.6_0.3_var(--hue))/0.1] dark:bg-[oklch(0.6_0.3_var(--hue))/0.2] text-[oklch(0.3_0.3_var(--hue))] dark:text-[oklch(0.6_0.3_var(--hue))]";
const DUSK_BADGE_CLASS: &str = "bg-[oklch(0.5_0.1_var(--hue))/0.1] dark:bg-[oklch(0.5_0.1_var(--hue))/0.2] text-[oklch(0.2_0.1_var(--hue))] dark:text-[oklch(0.5_0.1_var(--hue))]";
const DEFAULT_BACKGROUND: &str = "/posts/timeline/universe.png";

/// How an era participates in lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EraKind {
    /// A main epoch; epochs are meant to tile the timeline.
    #[default]
    Epoch,
    /// Deliberately overlaps one or more epochs.
    Overlay,
    /// Whole-timeline view preset such as `all-time`.
    Span,
}

/// One named year range plus its presentation hints.
///
/// The range is half-open: `[start_year, end_year)`. A missing bound is
/// unbounded on that side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EraConfig {
    pub key: String,
    pub display_name: String,
    #[serde(default)]
    pub start_year: Option<i64>,
    #[serde(default)]
    pub end_year: Option<i64>,
    #[serde(default)]
    pub kind: EraKind,
    /// When set, this era is skipped by [`EraTable::classify`] for years
    /// that also fall inside the named epoch.
    #[serde(default)]
    pub yields_to: Option<String>,
    #[serde(default)]
    pub zoom_level: Option<f64>,
    #[serde(default)]
    pub pan_to_year: Option<i64>,
    #[serde(default)]
    pub custom_padding: Option<f64>,
    #[serde(default)]
    pub background_image: Option<String>,
    #[serde(default)]
    pub badge_class: Option<String>,
}

impl EraConfig {
    pub fn new(key: impl Into<String>, display_name: impl Into<String>, start: i64, end: i64) -> Self {
        Self {
            key: key.into(),
            display_name: display_name.into(),
            start_year: Some(start),
            end_year: Some(end),
            kind: EraKind::Epoch,
            yields_to: None,
            zoom_level: None,
            pan_to_year: None,
            custom_padding: None,
            background_image: None,
            badge_class: None,
        }
    }

    pub fn with_kind(mut self, kind: EraKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn yielding_to(mut self, epoch: impl Into<String>) -> Self {
        self.yields_to = Some(epoch.into());
        self
    }

    fn with_view(mut self, zoom_level: f64, pan_to_year: Option<i64>) -> Self {
        self.zoom_level = Some(zoom_level);
        self.pan_to_year = pan_to_year;
        self.background_image = Some(DEFAULT_BACKGROUND.to_string());
        self
    }

    fn with_badge(mut self, class: &str) -> Self {
        self.badge_class = Some(class.to_string());
        self
    }

    /// Half-open containment used for classification.
    pub fn contains(&self, year: i64) -> bool {
        self.start_year.map_or(true, |start| year >= start)
            && self.end_year.map_or(true, |end| year < end)
    }

    /// Inclusive containment used for view-preset lookups.
    pub fn contains_inclusive(&self, year: i64) -> bool {
        self.start_year.map_or(true, |start| year >= start)
            && self.end_year.map_or(true, |end| year <= end)
    }
}

/// Partial era settings carried by a timeline banner post.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EraOverride {
    #[serde(skip)]
    pub key: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub start_year: Option<i64>,
    #[serde(default)]
    pub end_year: Option<i64>,
}

/// Deserializes a `{ key: { displayName, startYear, endYear } }` mapping
/// into overrides, keeping declaration order.
pub fn deserialize_overrides<'de, D>(deserializer: D) -> Result<Vec<EraOverride>, D::Error>
where
    D: Deserializer<'de>,
{
    struct OrderedOverrides;

    impl<'de> Visitor<'de> for OrderedOverrides {
        type Value = Vec<EraOverride>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a mapping of era keys to era settings")
        }

        fn visit_unit<E>(self) -> Result<Self::Value, E> {
            Ok(Vec::new())
        }

        fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut out = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some((key, mut settings)) = map.next_entry::<String, EraOverride>()? {
                settings.key = key;
                out.push(settings);
            }
            Ok(out)
        }
    }

    deserializer.deserialize_any(OrderedOverrides)
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EraTableError {
    #[error("era '{0}' ends before it starts")]
    InvertedRange(String),
    #[error("era '{0}' is declared more than once")]
    DuplicateKey(String),
    #[error("era '{era}' yields to unknown era '{target}'")]
    UnknownYieldTarget { era: String, target: String },
}

/// Ordered era table. Declaration order is the classification precedence.
#[derive(Debug, Clone, PartialEq)]
pub struct EraTable {
    eras: Vec<EraConfig>,
}

impl EraTable {
    pub fn new(eras: Vec<EraConfig>) -> Self {
        Self { eras }
    }

    pub fn eras(&self) -> &[EraConfig] {
        &self.eras
    }

    pub fn get(&self, key: &str) -> Option<&EraConfig> {
        self.eras.iter().find(|era| era.key == key)
    }

    /// Returns the key of the first era containing `year`, or
    /// [`UNKNOWN_ERA`].
    ///
    /// An era with `yields_to` is passed over when the year also lies in the
    /// epoch it yields to, so that epoch (or a later entry) wins.
    pub fn classify(&self, year: i64) -> &str {
        for era in &self.eras {
            if !era.contains(year) {
                continue;
            }
            if let Some(target) = era.yields_to.as_deref() {
                if self.get(target).is_some_and(|epoch| epoch.contains(year)) {
                    continue;
                }
            }
            return &era.key;
        }
        UNKNOWN_ERA
    }

    /// View preset for a year: epochs first, then overlays, then spans.
    pub fn config_for_year(&self, year: i64) -> Option<&EraConfig> {
        [EraKind::Epoch, EraKind::Overlay, EraKind::Span]
            .into_iter()
            .find_map(|kind| {
                self.eras
                    .iter()
                    .filter(|era| era.kind == kind)
                    .find(|era| era.contains_inclusive(year))
            })
    }

    pub fn display_name<'a>(&'a self, key: &str) -> &'a str {
        self.get(key)
            .map(|era| era.display_name.as_str())
            .unwrap_or(UNKNOWN_DISPLAY_NAME)
    }

    pub fn badge_class<'a>(&'a self, key: &str) -> &'a str {
        self.get(key)
            .and_then(|era| era.badge_class.as_deref())
            .filter(|class| !class.is_empty())
            .unwrap_or(DEFAULT_BADGE_CLASS)
    }

    /// Applies banner overrides: known keys are updated in place, new keys
    /// are appended after the existing entries.
    pub fn merge_overrides(&mut self, overrides: &[EraOverride]) {
        for settings in overrides {
            if let Some(existing) = self.eras.iter_mut().find(|era| era.key == settings.key) {
                if let Some(name) = &settings.display_name {
                    existing.display_name = name.clone();
                }
                if settings.start_year.is_some() {
                    existing.start_year = settings.start_year;
                }
                if settings.end_year.is_some() {
                    existing.end_year = settings.end_year;
                }
            } else {
                let mut era = EraConfig::new(
                    settings.key.clone(),
                    settings
                        .display_name
                        .clone()
                        .unwrap_or_else(|| settings.key.clone()),
                    0,
                    0,
                );
                era.start_year = settings.start_year;
                era.end_year = settings.end_year;
                self.eras.push(era);
            }
        }
    }

    pub fn validate(&self) -> Result<(), EraTableError> {
        for (idx, era) in self.eras.iter().enumerate() {
            if self.eras[..idx].iter().any(|prev| prev.key == era.key) {
                return Err(EraTableError::DuplicateKey(era.key.clone()));
            }
            if let (Some(start), Some(end)) = (era.start_year, era.end_year) {
                if end < start {
                    return Err(EraTableError::InvertedRange(era.key.clone()));
                }
            }
            if let Some(target) = &era.yields_to {
                if self.get(target).is_none() {
                    return Err(EraTableError::UnknownYieldTarget {
                        era: era.key.clone(),
                        target: target.clone(),
                    });
                }
            }
        }
        Ok(())
    }
}

impl Default for EraTable {
    /// The span era has no badge of its own and falls back to the default.
    fn default() -> Self {
        Self::new(vec![
            EraConfig::new("early-history", "Early History", 1, 1500)
                .with_view(3.5, Some(750))
                .with_badge(PALE_BADGE_CLASS),
            EraConfig::new("middle-period", "Middle Period", 1501, 1900)
                .with_view(2.75, Some(1700))
                .with_badge(BRIGHT_BADGE_CLASS),
            EraConfig::new("modern-era", "Modern Era", 1901, 2000)
                .with_view(2.75, Some(1950))
                .with_badge(VIVID_BADGE_CLASS),
            EraConfig::new("contemporary", "Contemporary Period", 2001, 2025)
                .with_view(2.75, Some(2010))
                .with_badge(DUSK_BADGE_CLASS),
            EraConfig::new("future-vision", "Future Vision", 2026, 2100)
                .with_view(2.75, Some(2050))
                .with_badge(BRIGHT_BADGE_CLASS),
            EraConfig::new("speculative", "Speculative Period", 2050, 2100)
                .with_view(2.5, Some(2075))
                .with_badge(VIVID_BADGE_CLASS),
            EraConfig::new("alternative-timeline", "Alternative Timeline", 1900, 2050)
                .with_kind(EraKind::Overlay)
                .yielding_to("contemporary")
                .with_view(2.0, Some(1975))
                .with_badge(PALE_BADGE_CLASS),
            EraConfig::new("all-time", "All-Time", 1, 2100)
                .with_kind(EraKind::Span)
                .with_view(1.0, Some(2000)),
        ])
    }
}
