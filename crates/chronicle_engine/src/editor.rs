//! Post editor operations on top of [`GitHubClient`].
//!
//! These never fail with an error value; the outcome and a user-facing
//! message travel in [`OperationResult`].
use chrono::NaiveDate;
use serde::Serialize;

use chronicle_core::frontmatter::{build_document, parse_document};
use chronicle_core::post::excerpt;
use chronicle_core::{Post, PostMetadata};
use chronicle_logging::{chronicle_error, chronicle_warn};

use crate::github::{CommitOutcome, GitHubClient, GitHubError};

pub const DEPLOY_WORKFLOW: &str = "deploy.yml";
const NOT_AUTHENTICATED: &str = "Please authenticate with GitHub first";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OperationResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filepath: Option<String>,
    /// False when a save found the file already up to date.
    #[serde(skip)]
    pub changed: bool,
}

impl OperationResult {
    fn ok(filepath: Option<String>, changed: bool) -> Self {
        Self {
            success: true,
            error: None,
            filepath,
            changed,
        }
    }

    fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(message.into()),
            filepath: None,
            changed: false,
        }
    }
}

/// Repository path for a post: its existing path, else
/// `<posts>/<subfolder>/<slug>.mdx`.
pub fn post_path(post: &Post, posts_path: &str, subfolder: Option<&str>) -> String {
    if let Some(existing) = post.filepath.as_deref().filter(|p| !p.is_empty()) {
        return existing.to_string();
    }
    let posts_path = posts_path.trim_end_matches('/');
    match subfolder.map(|s| s.trim_matches('/')).filter(|s| !s.is_empty()) {
        Some(sub) => format!("{posts_path}/{sub}/{}.mdx", post.slug),
        None => format!("{posts_path}/{}.mdx", post.slug),
    }
}

pub async fn save_post(
    client: &GitHubClient,
    post: &Post,
    is_draft: bool,
    subfolder: Option<&str>,
) -> OperationResult {
    if !client.is_authenticated() {
        return OperationResult::failed(NOT_AUTHENTICATED);
    }
    let mut post = post.clone();
    post.draft = is_draft;
    let path = post_path(&post, &client.config().posts_path, subfolder);
    let message = format!("{}: {}", if is_draft { "Draft" } else { "Publish" }, post.title);

    match client.commit_file(&path, &build_document(&post), &message).await {
        Ok(outcome) => OperationResult::ok(Some(path), outcome != CommitOutcome::Unchanged),
        Err(err) => {
            chronicle_error!("Saving {} failed: {}", path, err);
            OperationResult::failed(
                err.user_message()
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("Failed to save to GitHub: {err}")),
            )
        }
    }
}

pub async fn delete_post(client: &GitHubClient, filepath: &str, title: &str) -> OperationResult {
    if !client.is_authenticated() {
        return OperationResult::failed(NOT_AUTHENTICATED);
    }
    let label = if title.is_empty() { filepath } else { title };
    match client.delete_file(filepath, &format!("Delete: {label}")).await {
        Ok(()) => OperationResult::ok(Some(filepath.to_string()), true),
        Err(err) => {
            chronicle_error!("Deleting {} failed: {}", filepath, err);
            OperationResult::failed(
                err.user_message()
                    .map(str::to_string)
                    .unwrap_or_else(|| format!("Failed to delete from GitHub: {err}")),
            )
        }
    }
}

/// Dispatches the deploy workflow, normally [`DEPLOY_WORKFLOW`].
pub async fn trigger_rebuild(client: &GitHubClient, workflow: &str) -> OperationResult {
    if !client.is_authenticated() {
        return OperationResult::failed(NOT_AUTHENTICATED);
    }
    match client.trigger_workflow(workflow).await {
        Ok(()) => OperationResult::ok(None, true),
        Err(err) if err.status() == Some(404) => OperationResult::failed(format!(
            "Failed to trigger rebuild: Workflow file not found. Make sure '{workflow}' exists in your repository's .github/workflows directory."
        )),
        Err(err) => OperationResult::failed(format!("Failed to trigger rebuild: {err}")),
    }
}

/// Lists `.md`/`.mdx` files under `folder` with their frontmatter.
///
/// A file that cannot be read or parsed becomes an entry with `error` set
/// rather than failing the whole listing.
pub async fn fetch_posts(
    client: &GitHubClient,
    folder: &str,
    today: NaiveDate,
) -> Result<Vec<PostMetadata>, GitHubError> {
    let entries = client.list_directory(folder).await?;
    let mut posts = Vec::new();
    for entry in entries.into_iter().filter(|e| e.is_file()) {
        let Some(slug) = entry
            .name
            .strip_suffix(".mdx")
            .or_else(|| entry.name.strip_suffix(".md"))
            .map(str::to_string)
        else {
            continue;
        };
        let filepath = format!("{}/{}", folder.trim_end_matches('/'), entry.name);
        match read_metadata(client, &filepath, &entry.name, &slug, today).await {
            Ok(meta) => posts.push(meta),
            Err(reason) => {
                chronicle_warn!("Could not load {}: {}", filepath, reason);
                posts.push(PostMetadata {
                    id: entry.name.clone(),
                    slug,
                    title: entry.name.clone(),
                    description: "Error loading post content".to_string(),
                    published: "Unknown".to_string(),
                    filepath,
                    error: true,
                    ..PostMetadata::default()
                });
            }
        }
    }
    Ok(posts)
}

async fn read_metadata(
    client: &GitHubClient,
    filepath: &str,
    name: &str,
    slug: &str,
    today: NaiveDate,
) -> Result<PostMetadata, String> {
    let file = client
        .get_file(filepath)
        .await
        .map_err(|err| err.to_string())?
        .ok_or_else(|| "file vanished".to_string())?;
    let doc = parse_document(&file.content).map_err(|err| err.to_string())?;
    let fm = doc.frontmatter;
    Ok(PostMetadata {
        id: name.to_string(),
        slug: slug.to_string(),
        title: fm.title.unwrap_or_else(|| name.to_string()),
        description: fm.description.unwrap_or_default(),
        published: fm
            .published
            .unwrap_or_else(|| today.format("%Y-%m-%d").to_string()),
        updated: fm.updated,
        tags: fm.tags,
        category: fm.category.unwrap_or_default(),
        draft: fm.draft.unwrap_or(false),
        filepath: filepath.to_string(),
        content: Some(excerpt(&doc.body)),
        error: false,
    })
}
