//! Review Timeline - unified author/referee update feed for manuscript review
//!
//! This crate provides the update timeline of a manuscript entry:
//!
//! - **Model**: Entries, participants, author updates and referee updates
//! - **Timeline**: Merge of both streams, newest first, with a deterministic tie-break
//! - **Permissions**: Role-based visibility and the time-boxed deletion window
//! - **Names**: Cached, concurrent display-name lookups with sentinel fallbacks
//! - **Export**: Canonical plain-text rendering that never leaks restricted content
//! - **Clipboard**: Layered copy fallback (system, terminal escape, manual)
//! - **Presentation**: Client-local expand/collapse state
//! - **Feed**: A viewer's session tying the above to an [`UpdateRepository`]
//! - **Repository**: The persistence collaborator and an in-memory snapshot store
//! - **Config**: Deletion window, fallback names and export settings
//!
//! # Architecture
//!
//! Capabilities are never stored. Every read of the feed recomputes them from
//! the viewer, the entry rosters and the current time, so a switch of viewer or
//! the passing of the deletion window shows up on the next render.
//!
//! ```text
//! Repository ─┬─ author updates ──┐
//!             └─ referee updates ─┴─ merge ─ authorize ─ names ─ feed
//! ```

pub mod clipboard;
pub mod config;
pub mod error;
pub mod export;
pub mod feed;
pub mod model;
pub mod names;
pub mod permissions;
pub mod presentation;
pub mod repository;
pub mod timeline;

pub use clipboard::{
    copy_to_clipboard, ClipboardChain, ClipboardStrategy, CommandClipboard, CopyOutcome,
    LayerFailure, MemoryClipboard, Osc52Clipboard,
};
pub use config::{ExportConfig, NameConfig, PolicyConfig, TimelineConfig};
pub use error::{ClipboardError, ConfigError, DeleteError, RepositoryError, Result, TimelineError};
pub use export::{serialize, Exporter, RESTRICTED_MARKER};
pub use feed::{FeedItem, LoadOutcome, Notice, TimelineFeed};
pub use model::{
    AuthorUpdate, EntryId, GlobalRole, ManuscriptEntry, Participant, RefereeUpdate,
    TimelineUpdate, UpdateId, UpdateKind, UserId, Viewer,
};
pub use names::{NameCache, NameResolver, ResolutionReport};
pub use permissions::{authorize, entry_actions, AccessPolicy, Authorization, EntryActions};
pub use presentation::{ExpansionState, UpdateKey};
pub use repository::{EntryRecord, InMemoryRepository, RepositorySnapshot, UpdateRepository};
pub use timeline::{build_timeline, feed_order, merge_timeline, CombinedUpdate, TimelineBuilder};
