//! Version history: deciding when a save snapshots the prior state, and
//! rolling a chapter back to an earlier version.

use crate::revision::Revision;
use crate::stats::recompute_aggregate_stats;
use crate::store::{ChapterRepository, StoreError};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use storykeep_common::{ChangedField, ChapterId, VersionId};
use storykeep_kernel::{
    ChangeLabel, Chapter, ChapterVersion, Classification, classify, diff, has_content_changed,
};
use tracing::{debug, info, warn};

/// A request to persist a chapter.
///
/// Deserializes from either `{"chapter": {...}, "createVersion": true,
/// "versionNote": "..."}` or a bare chapter object, which saves without
/// versioning.
#[derive(Debug, Clone, Deserialize)]
#[serde(from = "SavePayload")]
pub struct SaveRequest {
    pub chapter: Chapter,
    pub create_version: bool,
    pub version_note: Option<String>,
    /// When set, the save is refused unless the stored chapter still has this revision.
    pub expected_revision: Option<Revision>,
}

impl SaveRequest {
    /// Save without creating a version.
    pub fn autosave(chapter: Chapter) -> Self {
        Self {
            chapter,
            create_version: false,
            version_note: None,
            expected_revision: None,
        }
    }

    /// Save and snapshot the prior state if title or content changed.
    pub fn with_version(chapter: Chapter, note: Option<String>) -> Self {
        Self {
            chapter,
            create_version: true,
            version_note: note,
            expected_revision: None,
        }
    }

    pub fn expecting(mut self, revision: Revision) -> Self {
        self.expected_revision = Some(revision);
        self
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum SavePayload {
    Structured {
        chapter: Chapter,
        #[serde(default, rename = "createVersion")]
        create_version: bool,
        #[serde(default, rename = "versionNote")]
        version_note: Option<String>,
        #[serde(default, rename = "expectedRevision")]
        expected_revision: Option<Revision>,
    },
    Bare(Chapter),
}

impl From<SavePayload> for SaveRequest {
    fn from(payload: SavePayload) -> Self {
        match payload {
            SavePayload::Structured {
                chapter,
                create_version,
                version_note,
                expected_revision,
            } => Self {
                chapter,
                create_version,
                version_note,
                expected_revision,
            },
            SavePayload::Bare(chapter) => Self::autosave(chapter),
        }
    }
}

/// Persist a chapter, appending a version of its prior state when requested.
///
/// - New chapters are stored as given; no version is created.
/// - Otherwise the stored history is authoritative: any `versions` carried by
///   the incoming chapter are replaced by the persisted ones.
/// - A version is appended only when `create_version` is set and the title or
///   content actually changed. It captures the stored (pre-edit) state.
///
/// Returns the chapter as written.
pub fn save_chapter<R: ChapterRepository + ?Sized>(
    repo: &mut R,
    request: SaveRequest,
) -> Result<Chapter, StoreError> {
    let SaveRequest {
        mut chapter,
        create_version,
        version_note,
        expected_revision,
    } = request;

    let existing = repo.load_chapter(&chapter.id)?;
    if let Some(expected) = expected_revision {
        check_revision(&chapter.id, existing.as_ref(), expected)?;
    }

    match existing {
        Some(existing) => {
            let note = version_note.filter(|n| !n.is_empty());
            chapter.versions = resolve_history(existing, &chapter, create_version, note, Utc::now());
        }
        None => debug!(chapter = %chapter.id, "saving new chapter"),
    }

    repo.persist_chapter(&chapter)?;
    recompute_aggregate_stats(repo)?;
    Ok(chapter)
}

/// The version list to persist for `incoming`, given the stored chapter.
fn resolve_history(
    existing: Chapter,
    incoming: &Chapter,
    create_version: bool,
    note: Option<String>,
    now: DateTime<Utc>,
) -> Vec<ChapterVersion> {
    if !create_version {
        return existing.versions;
    }
    if !has_content_changed(&existing, incoming) {
        debug!(chapter = %existing.id, "no changes, skipping version");
        return existing.versions;
    }

    let Classification {
        label,
        changed_fields,
    } = classify(&existing, incoming);
    let label = if note.is_some() {
        ChangeLabel::ManualSave
    } else {
        label
    };

    let mut version = ChapterVersion::capture(&existing, existing.next_version_id(now), label);
    version.note = note;
    version.changed_fields = Some(changed_fields);
    version.content_diff = Some(diff(&existing.content, &incoming.content));

    info!(
        chapter = %existing.id,
        version = %version.id,
        label = %version.label,
        "appended version"
    );

    let mut versions = existing.versions;
    versions.push(version);
    versions
}

fn check_revision(
    id: &ChapterId,
    existing: Option<&Chapter>,
    expected: Revision,
) -> Result<(), StoreError> {
    let actual = existing.map(Revision::of).transpose()?;
    if actual.as_ref() == Some(&expected) {
        return Ok(());
    }
    let actual = actual.map_or_else(|| "no record".to_owned(), |r| r.0);
    warn!(chapter = %id, %expected, %actual, "revision conflict");
    Err(StoreError::RevisionConflict {
        chapter: id.clone(),
        expected,
        actual,
    })
}

/// Look up a single version. `None` if the chapter or the version is unknown.
pub fn get_chapter_version<R: ChapterRepository + ?Sized>(
    repo: &R,
    chapter_id: &ChapterId,
    version_id: &VersionId,
) -> Result<Option<ChapterVersion>, StoreError> {
    Ok(repo
        .load_chapter(chapter_id)?
        .and_then(|chapter| chapter.find_version(version_id).cloned()))
}

/// All versions of a chapter, oldest first. `None` if the chapter is unknown.
pub fn list_versions<R: ChapterRepository + ?Sized>(
    repo: &R,
    chapter_id: &ChapterId,
) -> Result<Option<Vec<ChapterVersion>>, StoreError> {
    Ok(repo.load_chapter(chapter_id)?.map(|chapter| chapter.versions))
}

/// Make a stored version live again.
///
/// The current live state is first appended as a "Before restore" version, so
/// every restore can itself be undone. Restoring the same version twice is not
/// a no-op: each call appends a fresh snapshot.
///
/// Returns `None` if the chapter or the version is unknown.
pub fn restore_version<R: ChapterRepository + ?Sized>(
    repo: &mut R,
    chapter_id: &ChapterId,
    version_id: &VersionId,
) -> Result<Option<Chapter>, StoreError> {
    let Some(mut chapter) = repo.load_chapter(chapter_id)? else {
        debug!(chapter = %chapter_id, "restore: chapter not found");
        return Ok(None);
    };
    let Some(target) = chapter.find_version(version_id).cloned() else {
        debug!(chapter = %chapter_id, version = %version_id, "restore: version not found");
        return Ok(None);
    };

    let now = Utc::now();
    let mut before = ChapterVersion::capture(
        &chapter,
        chapter.next_version_id(now),
        ChangeLabel::BeforeRestore,
    );
    before.changed_fields = Some(vec![ChangedField::Content, ChangedField::Title]);

    chapter.content = target.content;
    chapter.title = target.title;
    chapter.word_count = target.word_count;
    chapter.updated_at = now;
    chapter.versions.push(before);

    repo.persist_chapter(&chapter)?;
    recompute_aggregate_stats(repo)?;

    info!(chapter = %chapter_id, version = %version_id, "restored version");
    Ok(Some(chapter))
}

/// Delete a chapter and its entire history. Returns whether it existed.
pub fn discard_chapter<R: ChapterRepository + ?Sized>(
    repo: &mut R,
    chapter_id: &ChapterId,
) -> Result<bool, StoreError> {
    let existed = repo.delete_chapter(chapter_id)?;
    if existed {
        recompute_aggregate_stats(repo)?;
        info!(chapter = %chapter_id, "deleted chapter");
    }
    Ok(existed)
}
