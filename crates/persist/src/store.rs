//! File-backed chapter persistence.
//!
//! Layout inside the store directory:
//! ```text
//! metadata.json          - story metadata and cached totals
//! chapters/
//!   <chapter-id>.json    - one pretty-printed record per chapter, versions inline
//! ```
//!
//! Every write is a full overwrite of the record. There is no locking; callers
//! serialize access per chapter or accept last-writer-wins.

use crate::revision::Revision;
use crate::stats::StoryMetadata;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use storykeep_common::ChapterId;
use storykeep_kernel::Chapter;
use tracing::debug;

const CHAPTERS_DIR: &str = "chapters";
const METADATA_FILE: &str = "metadata.json";

/// Errors from persistence operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid chapter id {0:?}")]
    InvalidId(String),
    #[error("revision conflict on chapter {chapter}: expected {expected}, found {actual}")]
    RevisionConflict {
        chapter: ChapterId,
        expected: Revision,
        actual: String,
    },
}

/// Storage seam used by the version history engine.
pub trait ChapterRepository {
    /// Load a chapter by id. `None` when no record exists.
    fn load_chapter(&self, id: &ChapterId) -> Result<Option<Chapter>, StoreError>;

    /// Write the full chapter record, replacing any previous one.
    fn persist_chapter(&mut self, chapter: &Chapter) -> Result<(), StoreError>;

    /// All chapters, ordered by episode number.
    fn list_chapters(&self) -> Result<Vec<Chapter>, StoreError>;

    /// Remove a chapter record. Returns whether it existed.
    fn delete_chapter(&mut self, id: &ChapterId) -> Result<bool, StoreError>;

    fn load_metadata(&self) -> Result<Option<StoryMetadata>, StoreError>;

    fn save_metadata(&mut self, metadata: &StoryMetadata) -> Result<(), StoreError>;
}

/// Directory of JSON files.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Open or create a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let root = path.as_ref().to_path_buf();
        std::fs::create_dir_all(root.join(CHAPTERS_DIR))?;
        debug!(root = %root.display(), "opened story store");
        Ok(Self { root })
    }

    /// Get the path to the store root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn chapter_path(&self, id: &ChapterId) -> Result<PathBuf, StoreError> {
        validate_id(id)?;
        Ok(self
            .root
            .join(CHAPTERS_DIR)
            .join(format!("{}.json", id.as_str())))
    }

    fn metadata_path(&self) -> PathBuf {
        self.root.join(METADATA_FILE)
    }
}

impl ChapterRepository for FileStore {
    fn load_chapter(&self, id: &ChapterId) -> Result<Option<Chapter>, StoreError> {
        let path = self.chapter_path(id)?;
        if !path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&path)?;
        debug!(chapter = %id, "loaded chapter");
        Ok(Some(serde_json::from_str(&raw)?))
    }

    fn persist_chapter(&mut self, chapter: &Chapter) -> Result<(), StoreError> {
        let path = self.chapter_path(&chapter.id)?;
        std::fs::write(&path, serde_json::to_string_pretty(chapter)?)?;
        debug!(
            chapter = %chapter.id,
            versions = chapter.versions.len(),
            "persisted chapter"
        );
        Ok(())
    }

    fn list_chapters(&self) -> Result<Vec<Chapter>, StoreError> {
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(self.root.join(CHAPTERS_DIR))? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut chapters = Vec::with_capacity(paths.len());
        for path in paths {
            let raw = std::fs::read_to_string(&path)?;
            chapters.push(serde_json::from_str::<Chapter>(&raw)?);
        }
        chapters.sort_by_key(|c| c.episode_number);
        Ok(chapters)
    }

    fn delete_chapter(&mut self, id: &ChapterId) -> Result<bool, StoreError> {
        let path = self.chapter_path(id)?;
        if !path.exists() {
            return Ok(false);
        }
        std::fs::remove_file(&path)?;
        Ok(true)
    }

    fn load_metadata(&self) -> Result<Option<StoryMetadata>, StoreError> {
        let path = self.metadata_path();
        if !path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&path)?;
        Ok(Some(serde_json::from_str(&raw)?))
    }

    fn save_metadata(&mut self, metadata: &StoryMetadata) -> Result<(), StoreError> {
        std::fs::write(self.metadata_path(), serde_json::to_string_pretty(metadata)?)?;
        Ok(())
    }
}

/// In-memory store for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    chapters: BTreeMap<ChapterId, Chapter>,
    metadata: Option<StoryMetadata>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of chapters stored.
    pub fn len(&self) -> usize {
        self.chapters.len()
    }

    /// Whether the store holds no chapters.
    pub fn is_empty(&self) -> bool {
        self.chapters.is_empty()
    }
}

impl ChapterRepository for MemoryStore {
    fn load_chapter(&self, id: &ChapterId) -> Result<Option<Chapter>, StoreError> {
        Ok(self.chapters.get(id).cloned())
    }

    fn persist_chapter(&mut self, chapter: &Chapter) -> Result<(), StoreError> {
        validate_id(&chapter.id)?;
        self.chapters.insert(chapter.id.clone(), chapter.clone());
        Ok(())
    }

    fn list_chapters(&self) -> Result<Vec<Chapter>, StoreError> {
        let mut chapters: Vec<Chapter> = self.chapters.values().cloned().collect();
        chapters.sort_by_key(|c| c.episode_number);
        Ok(chapters)
    }

    fn delete_chapter(&mut self, id: &ChapterId) -> Result<bool, StoreError> {
        Ok(self.chapters.remove(id).is_some())
    }

    fn load_metadata(&self) -> Result<Option<StoryMetadata>, StoreError> {
        Ok(self.metadata.clone())
    }

    fn save_metadata(&mut self, metadata: &StoryMetadata) -> Result<(), StoreError> {
        self.metadata = Some(metadata.clone());
        Ok(())
    }
}

/// Chapter ids become file names; reject anything that could escape the directory.
fn validate_id(id: &ChapterId) -> Result<(), StoreError> {
    let raw = id.as_str();
    if raw.is_empty() || raw == "." || raw == ".." || raw.contains(['/', '\\']) {
        return Err(StoreError::InvalidId(raw.to_owned()));
    }
    Ok(())
}
