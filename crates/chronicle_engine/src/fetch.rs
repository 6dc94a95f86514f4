//! HTTP GET with limits, shared by every discovery stage.
use std::fmt;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::header::{ACCEPT, CACHE_CONTROL, CONTENT_TYPE};

use chronicle_logging::chronicle_trace;

pub const ACCEPT_FEED: &str = "application/xml, text/xml, application/rss+xml";
pub const ACCEPT_JSON: &str = "application/json";
pub const ACCEPT_HTML: &str = "text/html";

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub redirect_limit: usize,
    pub max_bytes: u64,
    pub allowed_content_types: Vec<String>,
    pub user_agent: String,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
            redirect_limit: 5,
            max_bytes: 5 * 1024 * 1024,
            allowed_content_types: [
                "text/html",
                "application/xhtml+xml",
                "application/xml",
                "text/xml",
                "application/rss+xml",
                "application/atom+xml",
                "application/json",
                "application/feed+json",
                "text/plain",
            ]
            .into_iter()
            .map(ToOwned::to_owned)
            .collect(),
            user_agent: concat!("chronicle/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// One GET request. The timeout, when set, overrides the settings' request
/// timeout.
#[derive(Debug, Clone, Copy)]
pub struct FetchRequest<'a> {
    pub url: &'a str,
    pub accept: &'a str,
    pub timeout: Option<Duration>,
}

impl<'a> FetchRequest<'a> {
    pub fn new(url: &'a str, accept: &'a str) -> Self {
        Self {
            url,
            accept,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutput {
    pub bytes: Vec<u8>,
    pub metadata: FetchMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchMetadata {
    pub original_url: String,
    pub final_url: String,
    pub content_type: Option<String>,
}

impl FetchMetadata {
    pub fn redirected(&self) -> bool {
        self.original_url != self.final_url
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    RedirectLimitExceeded,
    TooLarge { max_bytes: u64, actual: Option<u64> },
    UnsupportedContentType { content_type: String },
    Network,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timed out"),
            FailureKind::RedirectLimitExceeded => write!(f, "too many redirects"),
            FailureKind::TooLarge { max_bytes, actual } => match actual {
                Some(actual) => write!(f, "body of {actual} bytes exceeds {max_bytes}"),
                None => write!(f, "body exceeds {max_bytes} bytes"),
            },
            FailureKind::UnsupportedContentType { content_type } => {
                write!(f, "content type {content_type} not accepted")
            }
            FailureKind::Network => write!(f, "network error"),
        }
    }
}

#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, request: FetchRequest<'_>) -> Result<FetchOutput, FetchError>;
}

/// Fetcher over one shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: reqwest::Client,
    max_bytes: u64,
    allowed_content_types: Vec<String>,
}

impl ReqwestFetcher {
    pub fn new(settings: FetchSettings) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .user_agent(settings.user_agent)
            .redirect(reqwest::redirect::Policy::limited(settings.redirect_limit))
            .build()
            .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self {
            client,
            max_bytes: settings.max_bytes,
            allowed_content_types: settings.allowed_content_types,
        })
    }

    fn accepts(&self, content_type: &str) -> bool {
        let media_type = content_type.split(';').next().unwrap_or_default().trim();
        self.allowed_content_types
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(media_type))
    }

    fn too_large(&self, actual: Option<u64>) -> FetchError {
        FetchError::new(
            FailureKind::TooLarge {
                max_bytes: self.max_bytes,
                actual,
            },
            "response too large",
        )
    }

    /// Streams the body, stopping as soon as it passes the size cap.
    async fn read_body(&self, response: reqwest::Response) -> Result<Vec<u8>, FetchError> {
        if let Some(declared) = response.content_length().filter(|len| *len > self.max_bytes) {
            return Err(self.too_large(Some(declared)));
        }
        let mut body = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            let len = (body.len() + chunk.len()) as u64;
            if len > self.max_bytes {
                return Err(self.too_large(Some(len)));
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body)
    }
}

#[async_trait::async_trait]
impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, request: FetchRequest<'_>) -> Result<FetchOutput, FetchError> {
        let url = reqwest::Url::parse(request.url)
            .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))?;

        let mut builder = self
            .client
            .get(url)
            .header(ACCEPT, request.accept)
            .header(CACHE_CONTROL, "no-cache");
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }
        let response = builder.send().await.map_err(map_reqwest_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::new(
                FailureKind::HttpStatus(status.as_u16()),
                status.to_string(),
            ));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        if let Some(ct) = content_type.as_deref().filter(|ct| !self.accepts(ct)) {
            return Err(FetchError::new(
                FailureKind::UnsupportedContentType {
                    content_type: ct.to_string(),
                },
                "unsupported content type",
            ));
        }

        let final_url = response.url().to_string();
        let bytes = self.read_body(response).await?;
        chronicle_trace!("Fetched {} bytes from {}", bytes.len(), final_url);

        Ok(FetchOutput {
            bytes,
            metadata: FetchMetadata {
                original_url: request.url.to_string(),
                final_url,
                content_type,
            },
        })
    }
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    let kind = if err.is_timeout() {
        FailureKind::Timeout
    } else if err.is_redirect() {
        FailureKind::RedirectLimitExceeded
    } else {
        FailureKind::Network
    };
    FetchError::new(kind, err.to_string())
}
