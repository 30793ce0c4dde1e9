//! Persistence: chapter records on disk, version history, restore.
//!
//! # Invariants
//! - A save appends at most one version, and it captures the pre-save state.
//! - Auto-saves never add or drop versions.
//! - Restore is non-destructive: the live state is snapshotted before it is overwritten.
//! - Aggregate story totals are a projection recomputed after every write.

pub mod history;
pub mod revision;
pub mod stats;
pub mod store;

pub use history::{
    SaveRequest, discard_chapter, get_chapter_version, list_versions, restore_version,
    save_chapter,
};
pub use revision::Revision;
pub use stats::{StoryMetadata, StoryStats, load_or_init_metadata, recompute_aggregate_stats};
pub use store::{ChapterRepository, FileStore, MemoryStore, StoreError};
