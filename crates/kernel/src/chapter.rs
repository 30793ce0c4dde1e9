use crate::classify::ChangeLabel;
use crate::text;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use storykeep_common::{ChangedField, ChapterId, VersionId};

/// Writing status of a chapter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChapterStatus {
    #[default]
    Draft,
    InProgress,
    Completed,
}

/// Approximate word delta between two contents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentDiff {
    pub added: usize,
    pub removed: usize,
}

/// Immutable snapshot of a chapter's title, content and word count.
///
/// `timestamp` is when the captured state became live (the chapter's
/// `updatedAt` at capture time), not when the snapshot was taken.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterVersion {
    pub id: VersionId,
    pub content: String,
    pub title: String,
    pub word_count: usize,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub label: ChangeLabel,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub changed_fields: Option<Vec<ChangedField>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_diff: Option<ContentDiff>,
}

impl ChapterVersion {
    /// Capture the live state of `chapter` under the given id and label.
    pub fn capture(chapter: &Chapter, id: VersionId, label: ChangeLabel) -> Self {
        Self {
            id,
            content: chapter.content.clone(),
            title: chapter.title.clone(),
            word_count: chapter.word_count,
            timestamp: chapter.updated_at,
            note: None,
            label,
            changed_fields: None,
            content_diff: None,
        }
    }
}

/// The live, mutable unit of story content together with its history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    pub id: ChapterId,
    pub title: String,
    #[serde(default)]
    pub episode_number: u32,
    #[serde(default)]
    pub arc: String,
    #[serde(default)]
    pub content: String,
    /// Cached word count of `content`. Maintained by the editor, not the core.
    #[serde(default)]
    pub word_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub status: ChapterStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    /// Oldest first. Array position is the only reliable chronology.
    #[serde(default)]
    pub versions: Vec<ChapterVersion>,
    /// Fields owned by other tools (scene plans and the like), kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Chapter {
    /// Create an empty draft chapter with no history.
    pub fn new(
        id: ChapterId,
        title: impl Into<String>,
        episode_number: u32,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            episode_number,
            arc: String::new(),
            content: String::new(),
            word_count: 0,
            created_at: now,
            updated_at: now,
            status: ChapterStatus::Draft,
            notes: None,
            tags: None,
            versions: Vec::new(),
            extra: Map::new(),
        }
    }

    /// Recompute the cached word count from the current content.
    pub fn recount_words(&mut self) -> usize {
        self.word_count = text::word_count(&self.content);
        self.word_count
    }

    /// Find a version by id.
    pub fn find_version(&self, id: &VersionId) -> Option<&ChapterVersion> {
        self.versions.iter().find(|v| &v.id == id)
    }

    /// Versions newest first, for display.
    pub fn history_latest_first(&self) -> impl Iterator<Item = &ChapterVersion> {
        self.versions.iter().rev()
    }

    /// A version id derived from `now` that no existing version of this chapter uses.
    pub fn next_version_id(&self, now: DateTime<Utc>) -> VersionId {
        let mut millis = now.timestamp_millis();
        loop {
            let id = VersionId::from_millis(millis);
            if self.find_version(&id).is_none() {
                return id;
            }
            millis += 1;
        }
    }
}
