use crate::{TimelineEvent, ViewMode, ViewPreferences};

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// Replace the events shown by the widget.
    SetEvents(Vec<TimelineEvent>),
    /// Return to the initial state without persisting anything.
    Reset,
    SetViewMode(ViewMode),
    ToggleCompact,
    /// Banner mode hides the filter controls and locks the layout.
    SetBannerMode(bool),
    ZoomIn,
    ZoomOut,
    /// Move the viewport by a delta in pixels.
    Pan { dx: f64, dy: f64 },
    /// Zoom back to 1 and re-center.
    ResetView,
    SelectEvent(Option<String>),
    SetCategory(Option<String>),
    /// Focus an era; `None` clears the focus.
    SetEra(Option<String>),
    SetYearRange {
        start: Option<i64>,
        end: Option<i64>,
    },
    ToggleKeyEventsOnly,
    SetBackground(String),
    /// Remember where the user left the current era.
    SaveEraPosition {
        scale: f64,
        offset_x: f64,
        offset_y: f64,
    },
    /// Preferences read back from the key-value store at startup.
    RestorePreferences(ViewPreferences),
    NoOp,
}
