//! Source-hosting REST client: read, list, commit and delete repository
//! files, and dispatch the deploy workflow.
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use chronicle_core::{KeyValueStore, StoreError};
use chronicle_logging::{chronicle_debug, chronicle_info};

pub const TOKEN_KEY: &str = "github_token";
pub const DEFAULT_API_BASE: &str = "https://api.github.com";
const API_ACCEPT: &str = "application/vnd.github.v3+json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepoConfig {
    pub owner: String,
    pub repo: String,
    pub branch: String,
    pub posts_path: String,
    pub config_path: String,
    pub api_base: String,
}

impl Default for RepoConfig {
    fn default() -> Self {
        Self {
            owner: String::new(),
            repo: String::new(),
            branch: "main".to_string(),
            posts_path: "src/content/posts".to_string(),
            config_path: "src/config".to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum GitHubError {
    #[error("not authenticated with GitHub")]
    NotAuthenticated,
    #[error("GitHub API error: {status} {message}")]
    Status { status: u16, message: String },
    #[error("network error: {0}")]
    Network(String),
    #[error("unexpected response: {0}")]
    InvalidResponse(String),
    #[error("{0} is not a directory")]
    NotADirectory(String),
    #[error("{0} does not exist")]
    NotFound(String),
    #[error("invalid API url: {0}")]
    InvalidUrl(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl GitHubError {
    pub fn status(&self) -> Option<u16> {
        match self {
            GitHubError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Friendly text for the statuses users can act on.
    pub fn user_message(&self) -> Option<&'static str> {
        match self.status() {
            Some(401) => Some("Authentication failed. Please refresh your GitHub token."),
            Some(404) => Some("Repository or path not found. Check your repository settings."),
            _ => None,
        }
    }
}

/// A decoded repository file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub path: String,
    pub sha: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DirEntry {
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub sha: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl DirEntry {
    pub fn is_file(&self) -> bool {
        self.kind == "file"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Created,
    Updated,
    /// The file already held exactly this content; nothing was written.
    Unchanged,
}

#[derive(Debug, Deserialize)]
struct ContentsResponse {
    path: String,
    sha: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    encoding: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

#[derive(Serialize)]
struct PutBody<'a> {
    message: &'a str,
    content: String,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
}

#[derive(Serialize)]
struct DeleteBody<'a> {
    message: &'a str,
    sha: &'a str,
    branch: &'a str,
}

#[derive(Serialize)]
struct DispatchBody<'a> {
    #[serde(rename = "ref")]
    git_ref: &'a str,
    inputs: DispatchInputs<'a>,
}

#[derive(Serialize)]
struct DispatchInputs<'a> {
    source: &'a str,
}

pub struct GitHubClient {
    config: RepoConfig,
    token: Option<String>,
    http: reqwest::Client,
}

impl GitHubClient {
    pub fn new(config: RepoConfig, token: Option<String>) -> Result<Self, GitHubError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("chronicle/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| GitHubError::Network(err.to_string()))?;
        Ok(Self {
            config,
            token: token.filter(|t| !t.is_empty()),
            http,
        })
    }

    /// Client whose token is read from the store.
    pub fn from_store(config: RepoConfig, store: &dyn KeyValueStore) -> Result<Self, GitHubError> {
        Self::new(config, store.get(TOKEN_KEY))
    }

    pub fn config(&self) -> &RepoConfig {
        &self.config
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    /// Stores the token. An empty token is refused and `false` returned.
    pub fn authenticate(
        &mut self,
        token: &str,
        store: &mut dyn KeyValueStore,
    ) -> Result<bool, GitHubError> {
        let token = token.trim();
        if token.is_empty() {
            return Ok(false);
        }
        store.set(TOKEN_KEY, token.to_string())?;
        self.token = Some(token.to_string());
        Ok(true)
    }

    pub fn logout(&mut self, store: &mut dyn KeyValueStore) -> Result<(), GitHubError> {
        self.token = None;
        store.remove(TOKEN_KEY)?;
        Ok(())
    }

    /// Reads a file. `None` when the path does not exist on the branch.
    pub async fn get_file(&self, path: &str) -> Result<Option<RemoteFile>, GitHubError> {
        let mut url = self.contents_url(path)?;
        url.query_pairs_mut().append_pair("ref", &self.config.branch);
        let response = self.send(Method::GET, url, None).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body = read_success(response).await?;
        let data: ContentsResponse = serde_json::from_slice(&body)
            .map_err(|err| GitHubError::InvalidResponse(err.to_string()))?;
        let content = if data.encoding == "base64" {
            decode_content(&data.content)?
        } else {
            data.content
        };
        Ok(Some(RemoteFile {
            path: data.path,
            sha: data.sha,
            content,
        }))
    }

    pub async fn list_directory(&self, path: &str) -> Result<Vec<DirEntry>, GitHubError> {
        let mut url = self.contents_url(path)?;
        url.query_pairs_mut().append_pair("ref", &self.config.branch);
        let response = self.send(Method::GET, url, None).await?;
        let body = read_success(response).await?;
        let value: serde_json::Value = serde_json::from_slice(&body)
            .map_err(|err| GitHubError::InvalidResponse(err.to_string()))?;
        if !value.is_array() {
            return Err(GitHubError::NotADirectory(path.to_string()));
        }
        serde_json::from_value(value).map_err(|err| GitHubError::InvalidResponse(err.to_string()))
    }

    /// Creates or updates a file. Identical content is detected up front and
    /// no write is issued.
    pub async fn commit_file(
        &self,
        path: &str,
        content: &str,
        message: &str,
    ) -> Result<CommitOutcome, GitHubError> {
        let existing = self.get_file(path).await?;
        if let Some(file) = &existing {
            if file.content == content {
                chronicle_info!("{} is unchanged, skipping commit", path);
                return Ok(CommitOutcome::Unchanged);
            }
        }

        let body = PutBody {
            message,
            content: STANDARD.encode(content.as_bytes()),
            branch: &self.config.branch,
            sha: existing.as_ref().map(|file| file.sha.as_str()),
        };
        let url = self.contents_url(path)?;
        let response = self.send(Method::PUT, url, Some(to_json(&body)?)).await?;
        read_success(response).await?;

        let outcome = if existing.is_some() {
            CommitOutcome::Updated
        } else {
            CommitOutcome::Created
        };
        chronicle_info!("Committed {} ({:?})", path, outcome);
        Ok(outcome)
    }

    pub async fn delete_file(&self, path: &str, message: &str) -> Result<(), GitHubError> {
        let Some(existing) = self.get_file(path).await? else {
            return Err(GitHubError::NotFound(path.to_string()));
        };
        let body = DeleteBody {
            message,
            sha: &existing.sha,
            branch: &self.config.branch,
        };
        let url = self.contents_url(path)?;
        let response = self.send(Method::DELETE, url, Some(to_json(&body)?)).await?;
        read_success(response).await?;
        chronicle_info!("Deleted {}", path);
        Ok(())
    }

    pub async fn trigger_workflow(&self, workflow_file: &str) -> Result<(), GitHubError> {
        let url = self.api_url(&[
            "repos",
            self.config.owner.as_str(),
            self.config.repo.as_str(),
            "actions",
            "workflows",
            workflow_file,
            "dispatches",
        ])?;
        let body = DispatchBody {
            git_ref: &self.config.branch,
            inputs: DispatchInputs {
                source: "post-editor",
            },
        };
        let response = self.send(Method::POST, url, Some(to_json(&body)?)).await?;
        read_success(response).await?;
        chronicle_info!("Dispatched workflow {}", workflow_file);
        Ok(())
    }

    fn api_url(&self, segments: &[&str]) -> Result<Url, GitHubError> {
        let mut url = Url::parse(&self.config.api_base)
            .map_err(|err| GitHubError::InvalidUrl(err.to_string()))?;
        url.path_segments_mut()
            .map_err(|_| GitHubError::InvalidUrl(self.config.api_base.clone()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Each path segment is percent-encoded on its own so `/` separators
    /// survive.
    fn contents_url(&self, path: &str) -> Result<Url, GitHubError> {
        let mut segments = vec!["repos", self.config.owner.as_str(), self.config.repo.as_str(), "contents"];
        segments.extend(path.split('/').filter(|s| !s.is_empty()));
        self.api_url(&segments)
    }

    async fn send(
        &self,
        method: Method,
        url: Url,
        body: Option<Vec<u8>>,
    ) -> Result<reqwest::Response, GitHubError> {
        let token = self.token.as_deref().ok_or(GitHubError::NotAuthenticated)?;
        chronicle_debug!("{} {}", method, url);
        let mut request = self
            .http
            .request(method, url)
            .header(AUTHORIZATION, format!("token {token}"))
            .header(ACCEPT, API_ACCEPT);
        if let Some(body) = body {
            request = request.header(CONTENT_TYPE, "application/json").body(body);
        }
        request
            .send()
            .await
            .map_err(|err| GitHubError::Network(err.to_string()))
    }
}

async fn read_success(response: reqwest::Response) -> Result<Vec<u8>, GitHubError> {
    let status = response.status();
    let body = response
        .bytes()
        .await
        .map_err(|err| GitHubError::Network(err.to_string()))?;
    if status.is_success() {
        return Ok(body.to_vec());
    }
    let message = serde_json::from_slice::<ErrorBody>(&body)
        .ok()
        .and_then(|e| e.message)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("").to_string());
    Err(GitHubError::Status {
        status: status.as_u16(),
        message,
    })
}

fn to_json<T: Serialize>(body: &T) -> Result<Vec<u8>, GitHubError> {
    serde_json::to_vec(body).map_err(|err| GitHubError::InvalidResponse(err.to_string()))
}

/// The API wraps base64 at 60 columns.
fn decode_content(encoded: &str) -> Result<String, GitHubError> {
    let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = STANDARD
        .decode(compact)
        .map_err(|err| GitHubError::InvalidResponse(err.to_string()))?;
    String::from_utf8(bytes).map_err(|err| GitHubError::InvalidResponse(err.to_string()))
}
