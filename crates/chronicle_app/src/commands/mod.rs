mod friends;
mod output;
mod posts;
mod remote;
mod timeline;
mod view;

use anyhow::{bail, Result};

use chronicle_engine::OperationResult;

use crate::cli::Command;
use crate::context::AppContext;

pub async fn run(command: Command, ctx: &mut AppContext) -> Result<()> {
    match command {
        Command::Era { year } => timeline::era(ctx, year),
        Command::Timeline {
            era,
            category,
            from,
            to,
            key_only,
            with_friends,
            stats,
        } => timeline::list(
            ctx,
            timeline::TimelineArgs {
                era,
                category,
                from,
                to,
                key_only,
                with_friends,
                stats,
            },
        ),
        Command::Friends { action } => friends::run(ctx, action).await,
        Command::Posts {
            with_friends,
            drafts,
        } => posts::list(ctx, with_friends, drafts),
        Command::NewPost {
            title,
            description,
            category,
            tags,
            timeline_year,
            out,
        } => posts::new_post(
            ctx,
            posts::NewPostArgs {
                title,
                description,
                category,
                tags,
                timeline_year,
                out,
            },
        ),
        Command::Import { file, out } => posts::import(ctx, &file, out),
        Command::Publish {
            file,
            draft,
            subfolder,
        } => remote::publish(ctx, &file, draft, subfolder.as_deref()).await,
        Command::Delete { path, title } => remote::delete(ctx, &path, title.as_deref()).await,
        Command::RemotePosts { folder } => remote::list(ctx, folder).await,
        Command::Rebuild => remote::rebuild(ctx).await,
        Command::Login { token } => remote::login(ctx, &token),
        Command::Logout => remote::logout(ctx),
        Command::Rss { out } => output::rss(ctx, &out),
        Command::FriendJson { out } => output::friend_json(ctx, &out),
        Command::View { action } => view::run(ctx, action),
    }
}

/// Turns an editor outcome into the command's exit status.
fn report(result: OperationResult, done: &str) -> Result<()> {
    if result.success {
        match (&result.filepath, result.changed) {
            (Some(path), false) => println!("{path} is already up to date"),
            (Some(path), true) => println!("{done}: {path}"),
            (None, _) => println!("{done}"),
        }
        Ok(())
    } else {
        bail!(result.error.unwrap_or_else(|| "operation failed".to_string()))
    }
}
