use anyhow::Result;

use chronicle_core::{
    extract_era_table, group_by_era, process_events, statistics, TimelineEvent, TimelineFilter,
};
use chronicle_engine::timeline_events;

use crate::context::AppContext;

pub struct TimelineArgs {
    pub era: Option<String>,
    pub category: Option<String>,
    pub from: Option<i64>,
    pub to: Option<i64>,
    pub key_only: bool,
    pub with_friends: bool,
    pub stats: bool,
}

pub fn era(ctx: &AppContext, year: i64) -> Result<()> {
    let key = ctx.eras.classify(year);
    println!("{year}: {} ({key})", ctx.eras.display_name(key));
    Ok(())
}

/// Local events, plus friend events when asked for and enabled.
pub(super) fn collect_events(ctx: &AppContext, with_friends: bool) -> Result<Vec<TimelineEvent>> {
    let mut events = timeline_events(&ctx.local_posts(false)?);
    if with_friends {
        let roster = ctx.roster()?;
        if roster.content_enabled() {
            events.extend(roster.as_timeline_events());
        }
    }
    Ok(events)
}

pub fn list(ctx: &AppContext, args: TimelineArgs) -> Result<()> {
    let events = collect_events(ctx, args.with_friends)?;
    let filter = TimelineFilter {
        category: args.category,
        start_year: args.from,
        end_year: args.to,
        era: args.era,
        only_key_events: args.key_only,
    };
    let processed = process_events(&events, &filter, &ctx.eras);

    if args.stats {
        let stats = statistics(&processed);
        println!("events:     {}", stats.total);
        println!("key events: {}", stats.key_events);
        println!("span:       {} to {} ({} years)", stats.earliest_year, stats.latest_year, stats.span);
        println!("categories: {}", stats.categories);
        println!("eras:       {}", stats.eras.join(", "));
        return Ok(());
    }

    if processed.is_empty() {
        println!("No timeline events");
        return Ok(());
    }
    let table = extract_era_table(&events, &ctx.eras);
    for (era, members) in group_by_era(&processed) {
        println!("{} ({})", table.display_name(&era), members.len());
        for event in members {
            let marker = if event.is_key_event { "*" } else { " " };
            let source = event
                .friend_name
                .as_deref()
                .map(|name| format!("  [{name}]"))
                .unwrap_or_default();
            println!("  {marker}{:>7}  {}{source}", event.year, event.title);
        }
    }
    Ok(())
}
