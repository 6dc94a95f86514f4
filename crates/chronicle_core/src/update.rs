use crate::{Effect, Msg, TimelineViewState, ZOOM_STEP};

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: TimelineViewState, msg: Msg) -> (TimelineViewState, Vec<Effect>) {
    let persist = match msg {
        Msg::SetEvents(events) => {
            state.set_events(events);
            false
        }
        Msg::Reset => {
            return (TimelineViewState::new(), Vec::new());
        }
        Msg::SetViewMode(mode) => {
            state.set_view_mode(mode);
            true
        }
        Msg::ToggleCompact => {
            state.toggle_compact();
            true
        }
        Msg::SetBannerMode(as_banner) => {
            state.set_banner_mode(as_banner);
            false
        }
        Msg::ZoomIn => {
            state.zoom_by(ZOOM_STEP);
            true
        }
        Msg::ZoomOut => {
            state.zoom_by(-ZOOM_STEP);
            true
        }
        Msg::Pan { dx, dy } => {
            state.pan(dx, dy);
            true
        }
        Msg::ResetView => {
            state.reset_view();
            true
        }
        Msg::SelectEvent(slug) => {
            state.select_event(slug);
            false
        }
        Msg::SetCategory(category) => {
            state.set_category(category);
            false
        }
        Msg::SetEra(era) => {
            state.set_era(era);
            true
        }
        Msg::SetYearRange { start, end } => {
            state.set_year_range(start, end);
            false
        }
        Msg::ToggleKeyEventsOnly => {
            state.toggle_key_events_only();
            false
        }
        Msg::SetBackground(background) => {
            state.set_background(background);
            false
        }
        Msg::SaveEraPosition {
            scale,
            offset_x,
            offset_y,
        } => {
            // Positions are only remembered per era.
            if !state.has_era() {
                return (state, Vec::new());
            }
            state.save_era_position(scale, offset_x, offset_y);
            true
        }
        Msg::RestorePreferences(prefs) => {
            state.restore(prefs);
            false
        }
        Msg::NoOp => false,
    };

    let effects = if persist {
        vec![Effect::PersistPreferences(state.preferences())]
    } else {
        Vec::new()
    };
    (state, effects)
}
