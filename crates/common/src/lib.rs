//! Shared identifiers for chapters and their version history.

mod types;

pub use types::{ChangedField, ChapterId, VersionId};
