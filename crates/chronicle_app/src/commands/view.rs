//! One step of the timeline view per invocation: preferences are restored,
//! the requested message is applied, and whatever the update asks to
//! persist is written back.

use anyhow::{bail, Context as _, Result};

use chronicle_core::{update, Msg, TimelineViewState, ViewPreferences};

use super::timeline::collect_events;
use crate::cli::ViewCommand;
use crate::context::AppContext;
use crate::effects::run_effects;

const DEFAULT_VIEWPORT: f64 = 1200.0;

pub fn run(ctx: &mut AppContext, action: ViewCommand) -> Result<()> {
    let mut viewport = DEFAULT_VIEWPORT;
    let msg = match action {
        ViewCommand::Show { viewport: width } => {
            viewport = width;
            Msg::NoOp
        }
        ViewCommand::Mode { mode } => Msg::SetViewMode(mode),
        ViewCommand::Compact => Msg::ToggleCompact,
        ViewCommand::ZoomIn => Msg::ZoomIn,
        ViewCommand::ZoomOut => Msg::ZoomOut,
        ViewCommand::Pan { dx, dy } => Msg::Pan { dx, dy },
        ViewCommand::Reset => Msg::ResetView,
        ViewCommand::Era { key } => {
            if let Some(key) = key.as_deref() {
                if ctx.eras.get(key).is_none() {
                    bail!("Unknown era '{key}'");
                }
            }
            Msg::SetEra(key)
        }
    };

    let events = collect_events(ctx, true)?;
    let prefs = ViewPreferences::load(&ctx.store);
    let (state, _) = update(TimelineViewState::new(), Msg::RestorePreferences(prefs));
    let (state, _) = update(state, Msg::SetEvents(events));
    let (state, effects) = update(state, msg);
    run_effects(effects, &mut ctx.store).context("saving view preferences")?;

    print_view(ctx, &state, viewport);
    Ok(())
}

fn print_view(ctx: &AppContext, state: &TimelineViewState, viewport: f64) {
    let view = state.view();
    println!("mode:     {}", view.view_mode);
    println!("compact:  {}", view.compact);
    println!("scale:    {:.2}", view.scale);
    println!("offset:   {:.0}, {:.0}", view.offset_x, view.offset_y);
    match view.era.as_deref() {
        Some(era) => println!("era:      {}", ctx.eras.display_name(era)),
        None => println!("era:      all"),
    }

    let visible = state.filtered_events(&ctx.eras);
    println!("events:   {} of {}", visible.len(), view.event_count);

    let span = visible
        .iter()
        .map(|event| event.year)
        .fold(None, |acc: Option<(i64, i64)>, year| match acc {
            Some((lo, hi)) => Some((lo.min(year), hi.max(year))),
            None => Some((year, year)),
        });
    if let Some((start, end)) = span.and_then(|span| state.visible_year_range(span, viewport, viewport)) {
        println!("visible:  {start} to {end}");
    }
}
