//! Story Kernel: the chapter aggregate, its version history, and the pure
//! functions that compare two chapter states.
//!
//! # Invariants
//! - A chapter's `versions` only ever grow; entries are never rewritten or reordered.
//! - Version ids are unique within their chapter.
//! - Diffing and classification are pure and cannot fail.

pub mod chapter;
pub mod classify;
pub mod text;

pub use chapter::{Chapter, ChapterStatus, ChapterVersion, ContentDiff};
pub use classify::{ChangeLabel, Classification, classify, has_content_changed};
pub use text::{diff, similarity, strip_markup, word_count, words};
