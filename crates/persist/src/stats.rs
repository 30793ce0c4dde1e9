//! Story metadata and the aggregate totals projected from all chapters.

use crate::store::{ChapterRepository, StoreError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use storykeep_kernel::Chapter;
use tracing::debug;

const DEFAULT_STORY_TITLE: &str = "My Anime Story";

/// Story-wide metadata stored in `metadata.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryMetadata {
    pub title: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub genre: Vec<String>,
    #[serde(default)]
    pub synopsis: String,
    #[serde(default)]
    pub total_chapters: usize,
    #[serde(default)]
    pub total_word_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Settings owned by other tools (theme, goals, cover image), kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl StoryMetadata {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            title: DEFAULT_STORY_TITLE.to_owned(),
            author: String::new(),
            genre: Vec::new(),
            synopsis: String::new(),
            total_chapters: 0,
            total_word_count: 0,
            created_at: now,
            updated_at: now,
            extra: Map::new(),
        }
    }
}

/// Totals derived from the full set of chapters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoryStats {
    pub total_chapters: usize,
    pub total_word_count: usize,
}

impl StoryStats {
    /// Project totals from the chapters' cached word counts.
    pub fn project(chapters: &[Chapter]) -> Self {
        Self {
            total_chapters: chapters.len(),
            total_word_count: chapters.iter().map(|c| c.word_count).sum(),
        }
    }

    pub fn apply_to(&self, metadata: &mut StoryMetadata, now: DateTime<Utc>) {
        metadata.total_chapters = self.total_chapters;
        metadata.total_word_count = self.total_word_count;
        metadata.updated_at = now;
    }
}

/// Load the story metadata, writing the default record if none exists yet.
pub fn load_or_init_metadata<R: ChapterRepository + ?Sized>(
    repo: &mut R,
) -> Result<StoryMetadata, StoreError> {
    if let Some(metadata) = repo.load_metadata()? {
        return Ok(metadata);
    }
    let metadata = StoryMetadata::new(Utc::now());
    repo.save_metadata(&metadata)?;
    debug!("initialized story metadata");
    Ok(metadata)
}

/// Rescan every chapter and refresh the cached totals in the metadata.
pub fn recompute_aggregate_stats<R: ChapterRepository + ?Sized>(
    repo: &mut R,
) -> Result<StoryMetadata, StoreError> {
    let chapters = repo.list_chapters()?;
    let stats = StoryStats::project(&chapters);

    let mut metadata = load_or_init_metadata(repo)?;
    stats.apply_to(&mut metadata, Utc::now());
    repo.save_metadata(&metadata)?;

    debug!(
        chapters = stats.total_chapters,
        words = stats.total_word_count,
        "recomputed story totals"
    );
    Ok(metadata)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{FileStore, MemoryStore};
    use storykeep_common::ChapterId;

    fn chapter(id: &str, words: usize) -> Chapter {
        let now = DateTime::from_timestamp_millis(0).unwrap();
        let mut ch = Chapter::new(ChapterId::new(id), id, 1, now);
        ch.word_count = words;
        ch
    }

    #[test]
    fn projection_sums_cached_word_counts() {
        let stats = StoryStats::project(&[chapter("a", 120), chapter("b", 30)]);
        assert_eq!(
            stats,
            StoryStats {
                total_chapters: 2,
                total_word_count: 150
            }
        );
        assert_eq!(StoryStats::project(&[]), StoryStats::default());
    }

    #[test]
    fn recompute_initializes_and_updates_metadata() {
        let mut store = MemoryStore::new();
        store.persist_chapter(&chapter("a", 10)).unwrap();
        store.persist_chapter(&chapter("b", 5)).unwrap();

        let metadata = recompute_aggregate_stats(&mut store).unwrap();
        assert_eq!(metadata.title, "My Anime Story");
        assert_eq!(metadata.total_chapters, 2);
        assert_eq!(metadata.total_word_count, 15);
        assert_eq!(store.load_metadata().unwrap(), Some(metadata));
    }

    #[test]
    fn recompute_preserves_user_fields() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(
            tmp.path().join("metadata.json"),
            r#"{
                "title": "Skyfall Academy",
                "author": "R. Ito",
                "genre": ["fantasy"],
                "synopsis": "",
                "totalChapters": 0,
                "totalWordCount": 0,
                "createdAt": "2024-03-01T00:00:00Z",
                "updatedAt": "2024-03-01T00:00:00Z",
                "darkMode": true
            }"#,
        )
        .unwrap();
        let mut store = FileStore::open(tmp.path()).unwrap();
        store.persist_chapter(&chapter("a", 42)).unwrap();

        let metadata = recompute_aggregate_stats(&mut store).unwrap();
        assert_eq!(metadata.title, "Skyfall Academy");
        assert_eq!(metadata.total_word_count, 42);
        assert_eq!(metadata.extra.get("darkMode"), Some(&Value::Bool(true)));
    }
}
