use std::path::PathBuf;

use anyhow::{bail, Context as _, Result};
use chrono::Utc;

use chronicle_core::friend::{friend_filename, friend_markdown};
use chronicle_core::Friend;
use chronicle_engine::AtomicFileWriter;
use chronicle_logging::{chronicle_info, chronicle_warn};

use crate::cli::FriendsCommand;
use crate::context::AppContext;

pub async fn run(ctx: &mut AppContext, action: FriendsCommand) -> Result<()> {
    match action {
        FriendsCommand::Add { url } => add(ctx, &url).await,
        FriendsCommand::Remove { friend } => remove(ctx, &friend),
        FriendsCommand::List => list(ctx),
        FriendsCommand::Sync { friend } => sync(ctx, friend.as_deref()).await,
        FriendsCommand::Toggle { enabled } => toggle(ctx, enabled),
        FriendsCommand::Export { friend, out } => export(ctx, &friend, out),
    }
}

async fn add(ctx: &mut AppContext, url: &str) -> Result<()> {
    let mut roster = ctx.roster()?;
    if let Some(existing) = roster.find(url) {
        bail!("{} is already a friend ({})", existing.url, existing.id);
    }

    let aggregator = ctx.aggregator()?;
    let info = aggregator.validate_site(url).await;
    let mut friend = Friend::from_site(&info);
    let count = aggregator.sync(&mut friend).await;
    println!("Added {} ({}) with {} posts", friend.name, friend.url, count);

    roster.add(friend)?;
    ctx.save_roster(&roster)
}

fn remove(ctx: &mut AppContext, key: &str) -> Result<()> {
    let mut roster = ctx.roster()?;
    let Some(friend) = roster.find(key).cloned() else {
        bail!("No friend matches '{key}'");
    };
    if friend.permanent {
        bail!(
            "{} comes from the site's friend pages; delete its page to remove it",
            friend.name
        );
    }
    roster.remove(&friend.id);
    ctx.save_roster(&roster)?;
    println!("Removed {}", friend.name);
    Ok(())
}

fn list(ctx: &AppContext) -> Result<()> {
    let roster = ctx.roster()?;
    if roster.friends().is_empty() {
        println!("No friends yet");
        return Ok(());
    }
    for friend in roster.friends() {
        let kind = if friend.permanent { "permanent" } else { "added" };
        let synced = friend.last_synced.as_deref().unwrap_or("never");
        println!(
            "{}  {:<24} {:<40} {:>4} posts  synced {}  ({kind})",
            friend.id, friend.name, friend.url, friend.post_count, synced
        );
    }
    println!(
        "Friend content is {}",
        if roster.content_enabled() { "on" } else { "off" }
    );
    Ok(())
}

/// Refreshes one friend or all of them. Failures leave a friend with no
/// posts rather than aborting the rest.
async fn sync(ctx: &mut AppContext, key: Option<&str>) -> Result<()> {
    let mut roster = ctx.roster()?;
    let targets: Vec<Friend> = match key {
        Some(key) => match roster.find(key) {
            Some(friend) => vec![friend.clone()],
            None => bail!("No friend matches '{key}'"),
        },
        None => roster.friends().to_vec(),
    };

    let aggregator = ctx.aggregator()?;
    for mut friend in targets {
        let count = aggregator.sync(&mut friend).await;
        if count == 0 {
            chronicle_warn!("No posts found for {}", friend.url);
        }
        println!("{}: {} posts", friend.name, count);
        roster.update(friend);
    }
    ctx.save_roster(&roster)
}

fn toggle(ctx: &mut AppContext, enabled: Option<bool>) -> Result<()> {
    let mut roster = ctx.roster()?;
    let enabled = enabled.unwrap_or(!roster.content_enabled());
    roster.set_content_enabled(enabled);
    ctx.save_roster(&roster)?;
    println!("Friend content is {}", if enabled { "on" } else { "off" });
    Ok(())
}

fn export(ctx: &AppContext, key: &str, out: PathBuf) -> Result<()> {
    let roster = ctx.roster()?;
    let Some(friend) = roster.find(key) else {
        bail!("No friend matches '{key}'");
    };
    let writer = AtomicFileWriter::new(out);
    let path = writer
        .write(&friend_filename(&friend.name), &friend_markdown(friend, Utc::now()))
        .with_context(|| format!("writing page for {}", friend.name))?;
    chronicle_info!("Exported {} to {}", friend.name, path.display());
    println!("{}", path.display());
    Ok(())
}
