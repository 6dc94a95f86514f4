use crate::ViewMode;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct TimelineViewModel {
    pub view_mode: ViewMode,
    pub compact: bool,
    pub as_banner: bool,
    pub scale: f64,
    pub offset_x: f64,
    pub offset_y: f64,
    pub selected_event: Option<String>,
    pub category: Option<String>,
    pub era: Option<String>,
    pub start_year: Option<i64>,
    pub end_year: Option<i64>,
    pub show_only_key_events: bool,
    pub background: String,
    pub event_count: usize,
    pub last_era: Option<String>,
}
