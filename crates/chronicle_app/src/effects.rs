use chronicle_core::{Effect, KeyValueStore, StoreError};
use chronicle_logging::chronicle_debug;

/// Carries out the side effects requested by the view update.
pub fn run_effects(effects: Vec<Effect>, store: &mut dyn KeyValueStore) -> Result<(), StoreError> {
    for effect in effects {
        match effect {
            Effect::PersistPreferences(prefs) => {
                chronicle_debug!("Persisting view preferences {:?}", prefs);
                prefs.save(store)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chronicle_core::{update, MemoryStore, Msg, TimelineViewState, ViewMode, ViewPreferences};

    #[test]
    fn persisted_preferences_restore_the_view() {
        let mut store = MemoryStore::new();
        let (state, effects) = update(TimelineViewState::new(), Msg::SetViewMode(ViewMode::List));
        let (_, more) = update(state, Msg::ZoomIn);
        run_effects(effects.into_iter().chain(more).collect(), &mut store).unwrap();

        let prefs = ViewPreferences::load(&store);
        assert_eq!(prefs.view_mode, Some(ViewMode::List));
        assert_eq!(prefs.scale, Some(1.2));

        let (restored, effects) = update(TimelineViewState::new(), Msg::RestorePreferences(prefs));
        assert!(effects.is_empty());
        assert_eq!(restored.view().view_mode, ViewMode::List);
    }
}
