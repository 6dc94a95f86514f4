//! Chronicle engine: everything that touches the network or the disk.
//!
//! Friend discovery ([`FriendAggregator`]), the source-hosting client and
//! editor operations, the file-backed key-value store, local content
//! loading, feed and JSON output, and file import.
mod aggregate;
mod api;
mod convert;
mod decode;
mod feed;
mod fetch;
mod persist;
mod scrape;
mod store;
mod text;

pub mod editor;
pub mod friend_json;
pub mod github;
pub mod import;
pub mod rss;
pub mod site;

pub use aggregate::{Discovery, DiscoverySettings, DiscoveryStage, FriendAggregator};
pub use api::{parse_posts, ApiError};
pub use convert::{Converter, Html2MdConverter, PlainTextConverter};
pub use decode::{decode_text, DecodedText};
pub use editor::OperationResult;
pub use feed::{parse_feed, FeedError};
pub use fetch::{
    FailureKind, FetchError, FetchMetadata, FetchOutput, FetchRequest, FetchSettings, Fetcher,
    ReqwestFetcher, ACCEPT_FEED, ACCEPT_HTML, ACCEPT_JSON,
};
pub use github::{CommitOutcome, GitHubClient, GitHubError, RepoConfig};
pub use import::{import_file, ImportError, ImportResult};
pub use persist::{ensure_output_dir, write_atomic, AtomicFileWriter, PersistError};
pub use rss::{render_feed, FeedChannel};
pub use scrape::{fallback_site_info, scrape_posts, site_info};
pub use site::{load_friends, load_posts, timeline_events, LocalPost, SiteError};
pub use store::FileStore;
