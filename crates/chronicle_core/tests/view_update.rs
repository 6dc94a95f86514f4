use std::sync::Once;

use chronicle_core::{
    update, Effect, EraTable, KeyValueStore, MemoryStore, Msg, TimelineEvent, TimelineViewState,
    ViewMode, ViewPreferences, MAX_SCALE, MIN_SCALE,
};
use pretty_assertions::assert_eq;

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(chronicle_logging::initialize_for_tests);
}

fn apply(state: TimelineViewState, msgs: Vec<Msg>) -> (TimelineViewState, Vec<Effect>) {
    let mut effects = Vec::new();
    let mut state = state;
    for msg in msgs {
        let (next, mut produced) = update(state, msg);
        state = next;
        effects.append(&mut produced);
    }
    (state, effects)
}

#[test]
fn zoom_is_clamped_to_bounds() {
    init_logging();
    let (state, _) = apply(TimelineViewState::new(), vec![Msg::ZoomIn; 40]);
    assert_eq!(state.view().scale, MAX_SCALE);

    let (state, _) = apply(state, vec![Msg::ZoomOut; 40]);
    assert_eq!(state.view().scale, MIN_SCALE);

    let (state, _) = update(state, Msg::ResetView);
    assert_eq!(state.view().scale, 1.0);
}

#[test]
fn zoom_steps_do_not_drift() {
    init_logging();
    let (state, _) = apply(TimelineViewState::new(), vec![Msg::ZoomIn, Msg::ZoomIn, Msg::ZoomOut]);
    assert_eq!(state.view().scale, 1.2);
}

#[test]
fn persisting_messages_emit_preferences() {
    init_logging();
    let (state, effects) = update(TimelineViewState::new(), Msg::SetViewMode(ViewMode::List));
    assert_eq!(
        effects,
        vec![Effect::PersistPreferences(ViewPreferences {
            view_mode: Some(ViewMode::List),
            compact: Some(false),
            last_era: None,
            scale: Some(1.0),
            offset_x: Some(0.0),
            offset_y: Some(0.0),
        })]
    );

    let (state, effects) = update(state, Msg::Pan { dx: 10.0, dy: -5.0 });
    assert_eq!(effects.len(), 1);
    assert_eq!(state.view().offset_x, 10.0);
    assert_eq!(state.view().offset_y, -5.0);

    let (_, effects) = update(state, Msg::SetCategory(Some("space".into())));
    assert!(effects.is_empty());
}

#[test]
fn era_position_is_only_saved_with_an_era() {
    init_logging();
    let position = Msg::SaveEraPosition {
        scale: 2.5,
        offset_x: 40.0,
        offset_y: 0.0,
    };
    let (state, effects) = update(TimelineViewState::new(), position.clone());
    assert!(effects.is_empty());
    assert_eq!(state.view().scale, 1.0);

    let (state, _) = update(state, Msg::SetEra(Some("modern-era".into())));
    let (state, effects) = update(state, position);
    assert_eq!(state.view().scale, 2.5);
    match &effects[..] {
        [Effect::PersistPreferences(prefs)] => {
            assert_eq!(prefs.last_era.as_deref(), Some("modern-era"));
            assert_eq!(prefs.offset_x, Some(40.0));
        }
        other => panic!("unexpected effects {other:?}"),
    }
}

#[test]
fn preferences_round_trip_through_store() {
    init_logging();
    let (state, effects) = apply(
        TimelineViewState::new(),
        vec![
            Msg::ToggleCompact,
            Msg::SetEra(Some("contemporary".into())),
            Msg::ZoomIn,
        ],
    );
    let Some(Effect::PersistPreferences(prefs)) = effects.last() else {
        panic!("expected a persist effect");
    };
    let mut store = MemoryStore::new();
    prefs.save(&mut store).unwrap();
    assert_eq!(store.get("timeline-compact-mode").as_deref(), Some("true"));
    assert_eq!(store.get("timeline-last-era").as_deref(), Some("contemporary"));

    let restored = ViewPreferences::load(&store);
    assert_eq!(&restored, prefs);

    let (fresh, effects) = update(TimelineViewState::new(), Msg::RestorePreferences(restored));
    assert!(effects.is_empty());
    assert_eq!(fresh.view().compact, state.view().compact);
    assert_eq!(fresh.view().era, state.view().era);
    assert_eq!(fresh.view().scale, state.view().scale);
}

#[test]
fn clearing_the_era_removes_it_from_the_store() {
    init_logging();
    let mut store = MemoryStore::new();
    let (state, effects) = update(TimelineViewState::new(), Msg::SetEra(Some("modern-era".into())));
    let [Effect::PersistPreferences(prefs)] = &effects[..] else {
        panic!("expected a persist effect");
    };
    prefs.save(&mut store).unwrap();
    assert_eq!(store.get("timeline-last-era").as_deref(), Some("modern-era"));

    let (_, effects) = update(state, Msg::SetEra(None));
    let [Effect::PersistPreferences(prefs)] = &effects[..] else {
        panic!("expected a persist effect");
    };
    prefs.save(&mut store).unwrap();
    assert_eq!(store.get("timeline-last-era"), None);

    let (fresh, _) = update(
        TimelineViewState::new(),
        Msg::RestorePreferences(ViewPreferences::load(&store)),
    );
    assert_eq!(fresh.view().era, None);
}

#[test]
fn reset_returns_initial_state_without_effects() {
    init_logging();
    let (state, _) = apply(
        TimelineViewState::new(),
        vec![Msg::ToggleCompact, Msg::SetBannerMode(true), Msg::ZoomIn],
    );
    let (state, effects) = update(state, Msg::Reset);
    assert!(effects.is_empty());
    assert_eq!(state, TimelineViewState::new());
}

#[test]
fn selection_resolves_against_filtered_events() {
    init_logging();
    let mut key = TimelineEvent::new("Key", "key", 1950);
    key.is_key_event = true;
    let events = vec![TimelineEvent::new("Minor", "minor", 1960), key];
    let table = EraTable::default();

    let (state, _) = apply(
        TimelineViewState::new(),
        vec![Msg::SetEvents(events), Msg::SelectEvent(Some("minor".into()))],
    );
    assert_eq!(state.selected_event(&table).map(|e| e.title), Some("Minor".to_string()));
    assert_eq!(state.filtered_events(&table).len(), 2);

    let (state, _) = update(state, Msg::ToggleKeyEventsOnly);
    assert_eq!(state.selected_event(&table), None);
    assert_eq!(state.filtered_events(&table).len(), 1);
}

#[test]
fn visible_range_tracks_scale_and_offset() {
    init_logging();
    let state = TimelineViewState::new();
    assert_eq!(state.visible_year_range((1900, 2100), 1000.0, 1000.0), Some((1900, 2100)));

    let (zoomed, _) = apply(state, vec![Msg::ZoomIn; 5]);
    assert_eq!(zoomed.view().scale, 2.0);
    assert_eq!(zoomed.visible_year_range((1900, 2100), 1000.0, 1000.0), Some((1950, 2050)));

    // Panning right by a quarter of the scaled width moves the window back in time.
    let (panned, _) = update(zoomed, Msg::Pan { dx: 500.0, dy: 0.0 });
    assert_eq!(panned.visible_year_range((1900, 2100), 1000.0, 1000.0), Some((1900, 2000)));

    assert_eq!(panned.visible_year_range((2000, 2000), 1000.0, 1000.0), None);
}
