//! Chronicle core: eras, timeline processing, the timeline view state
//! machine, posts and frontmatter, and the friend roster.
//!
//! Nothing in this crate performs network IO. Persistence goes through the
//! [`store::KeyValueStore`] trait.
pub mod era;
pub mod friend;
pub mod frontmatter;
pub mod listing;
pub mod post;
pub mod store;
pub mod timeline;

mod effect;
mod msg;
mod state;
mod update;
mod view_model;

pub use effect::Effect;
pub use era::{EraConfig, EraKind, EraOverride, EraTable, EraTableError, UNKNOWN_ERA};
pub use friend::{Friend, FriendPost, FriendRoster, RosterError, SiteInfo};
pub use frontmatter::{Frontmatter, FrontmatterError, ParsedDocument};
pub use listing::{merge_listing, EntrySource, PostEntry};
pub use msg::Msg;
pub use post::{Post, PostCache, PostMetadata};
pub use state::{
    TimelineViewState, ViewMode, ViewPreferences, DEFAULT_BACKGROUND, MAX_SCALE, MIN_SCALE,
    ZOOM_STEP,
};
pub use store::{KeyValueStore, MemoryStore, StoreError};
pub use timeline::{
    extract_era_table, group_by_era, process_events, statistics, BannerData, TimelineEvent,
    TimelineFilter, TimelineStatistics,
};
pub use update::update;
pub use view_model::TimelineViewModel;
