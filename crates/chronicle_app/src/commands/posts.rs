use std::path::{Path, PathBuf};

use anyhow::{bail, Context as _, Result};

use chronicle_core::frontmatter::build_document;
use chronicle_core::post::{parse_tags, slug_from_title};
use chronicle_core::{merge_listing, EntrySource, Post, PostCache, PostEntry};
use chronicle_engine::import::import_path;
use chronicle_engine::AtomicFileWriter;
use chronicle_logging::chronicle_info;

use crate::context::AppContext;

pub struct NewPostArgs {
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub tags: Option<String>,
    pub timeline_year: Option<i64>,
    pub out: Option<PathBuf>,
}

pub fn list(ctx: &AppContext, with_friends: bool, include_drafts: bool) -> Result<()> {
    let local: Vec<PostEntry> = ctx
        .local_posts(include_drafts)?
        .iter()
        .map(|post| post.to_entry())
        .collect();
    let friends = if with_friends {
        let roster = ctx.roster()?;
        if roster.content_enabled() {
            roster.as_entries()
        } else {
            chronicle_info!("Friend content is switched off");
            Vec::new()
        }
    } else {
        Vec::new()
    };

    let entries = merge_listing(local, friends);
    if entries.is_empty() {
        println!("No posts");
        return Ok(());
    }
    for entry in &entries {
        let source = match &entry.source {
            EntrySource::Local if entry.draft => " (draft)".to_string(),
            EntrySource::Local => String::new(),
            EntrySource::Friend { name, .. } => format!("  [{name}]"),
        };
        println!(
            "{}  {:<40} {:>3} min{}",
            entry.published.format("%Y-%m-%d"),
            entry.title,
            entry.minutes,
            source
        );
    }
    Ok(())
}

pub fn new_post(ctx: &mut AppContext, args: NewPostArgs) -> Result<()> {
    if args.title.trim().is_empty() {
        bail!("A post needs a title");
    }
    let today = ctx.today();
    let mut post = Post::empty(today);
    post.slug = slug_from_title(&args.title);
    post.title = args.title;
    post.description = args.description.unwrap_or_default();
    post.category = args.category.unwrap_or_default();
    post.tags = args.tags.as_deref().map(parse_tags).unwrap_or_default();
    if let Some(year) = args.timeline_year {
        post.timeline.enabled = true;
        post.timeline.year = Some(year);
        post.timeline.era = ctx.eras.classify(year).to_string();
    }

    let path = write_post(ctx, &post, args.out)?;
    println!("{}", path.display());
    Ok(())
}

pub fn import(ctx: &mut AppContext, file: &Path, out: Option<PathBuf>) -> Result<()> {
    let imported = import_path(file, ctx.today())
        .with_context(|| format!("importing {}", file.display()))?;
    chronicle_info!(
        "Imported {} as {} ('{}')",
        imported.file_name,
        imported.file_type,
        imported.title
    );
    let path = write_post(ctx, &imported.post, out)?;
    println!("{}", path.display());
    Ok(())
}

/// Writes `<slug>.mdx` and records the post in the local cache.
fn write_post(ctx: &mut AppContext, post: &Post, out: Option<PathBuf>) -> Result<PathBuf> {
    let dir = out.unwrap_or_else(|| ctx.config.site.posts_path());
    let path = AtomicFileWriter::new(dir)
        .write(&format!("{}.mdx", post.slug), &build_document(post))
        .with_context(|| format!("writing {}", post.slug))?;

    let folder = ctx.config.repository.repo.posts_path.clone();
    let today = ctx.today();
    PostCache::new(&mut ctx.store)
        .save(post, &folder, today)
        .context("caching post")?;
    Ok(path)
}
