use std::fs;
use std::path::Path;

use anyhow::{bail, Context as _, Result};

use chronicle_core::frontmatter::parse_document;
use chronicle_core::Post;
use chronicle_engine::editor::{delete_post, fetch_posts, save_post, trigger_rebuild};
use chronicle_logging::chronicle_info;

use super::report;
use crate::context::AppContext;

pub async fn publish(
    ctx: &AppContext,
    file: &Path,
    draft: bool,
    subfolder: Option<&str>,
) -> Result<()> {
    let text = fs::read_to_string(file).with_context(|| format!("reading {}", file.display()))?;
    let doc = parse_document(&text).with_context(|| format!("parsing {}", file.display()))?;
    let stem = file
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut post = Post::from_document(&doc, &stem, ctx.today());
    if post.title.trim().is_empty() {
        bail!("{} has no title", file.display());
    }
    post.filepath = repository_path(ctx, file);

    let client = ctx.github()?;
    let label = if draft { "Saved draft" } else { "Published" };
    report(save_post(&client, &post, draft, subfolder).await, label)
}

/// Files inside the local posts directory keep their relative location in
/// the repository. Anything else is placed by slug.
fn repository_path(ctx: &AppContext, file: &Path) -> Option<String> {
    let posts_dir = ctx.config.site.posts_path();
    let base = fs::canonicalize(&posts_dir).ok()?;
    let file = fs::canonicalize(file).ok()?;
    let relative = file.strip_prefix(&base).ok()?;
    let segments: Vec<String> = relative
        .components()
        .map(|part| part.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(format!(
        "{}/{}",
        ctx.config.repository.repo.posts_path.trim_end_matches('/'),
        segments.join("/")
    ))
}

pub async fn delete(ctx: &AppContext, path: &str, title: Option<&str>) -> Result<()> {
    let client = ctx.github()?;
    report(delete_post(&client, path, title.unwrap_or_default()).await, "Deleted")
}

pub async fn list(ctx: &AppContext, folder: Option<String>) -> Result<()> {
    let client = ctx.github()?;
    let folder = folder.unwrap_or_else(|| ctx.config.repository.repo.posts_path.clone());
    let posts = fetch_posts(&client, &folder, ctx.today())
        .await
        .map_err(|err| match err.user_message() {
            Some(message) => anyhow::anyhow!(message),
            None => anyhow::Error::new(err),
        })
        .with_context(|| format!("listing {folder}"))?;

    if posts.is_empty() {
        println!("No posts in {folder}");
        return Ok(());
    }
    for post in &posts {
        let flag = if post.error {
            " (unreadable)"
        } else if post.draft {
            " (draft)"
        } else {
            ""
        };
        println!("{:<12} {:<40} {}{flag}", post.published, post.title, post.filepath);
    }
    Ok(())
}

pub async fn rebuild(ctx: &AppContext) -> Result<()> {
    let client = ctx.github()?;
    let workflow = &ctx.config.repository.workflow;
    chronicle_info!("Dispatching {}", workflow);
    report(trigger_rebuild(&client, workflow).await, "Rebuild triggered")
}

pub fn login(ctx: &mut AppContext, token: &str) -> Result<()> {
    let mut client = ctx.github()?;
    if !client.authenticate(token, &mut ctx.store)? {
        bail!("The token is empty");
    }
    println!("Token stored");
    Ok(())
}

pub fn logout(ctx: &mut AppContext) -> Result<()> {
    let mut client = ctx.github()?;
    client.logout(&mut ctx.store)?;
    println!("Logged out");
    Ok(())
}
