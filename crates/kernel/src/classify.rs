//! Change classification between two chapter states.

use crate::chapter::Chapter;
use serde::{Deserialize, Serialize};
use std::fmt;
use storykeep_common::ChangedField;

/// Content changes above this percentage are a major edit.
pub const MAJOR_EDIT_PERCENT: f64 = 20.0;
/// Content changes above this percentage (and up to the major threshold) are moderate.
pub const MODERATE_EDIT_PERCENT: f64 = 5.0;

/// Human-readable kind of change recorded on a version.
///
/// Serialized as its display string. Labels written by older tools that do not
/// match a known kind survive as `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ChangeLabel {
    TitleAndContentChanged,
    TitleChanged,
    MajorEdit,
    ModerateEdit,
    MinorEdit,
    ManualSave,
    BeforeRestore,
    Other(String),
}

impl ChangeLabel {
    pub fn as_str(&self) -> &str {
        match self {
            Self::TitleAndContentChanged => "Title and content changed",
            Self::TitleChanged => "Title changed",
            Self::MajorEdit => "Major edit",
            Self::ModerateEdit => "Moderate edit",
            Self::MinorEdit => "Minor edit",
            Self::ManualSave => "Manual save",
            Self::BeforeRestore => "Before restore",
            Self::Other(label) => label,
        }
    }
}

impl From<String> for ChangeLabel {
    fn from(label: String) -> Self {
        match label.as_str() {
            "Title and content changed" => Self::TitleAndContentChanged,
            "Title changed" => Self::TitleChanged,
            "Major edit" => Self::MajorEdit,
            "Moderate edit" => Self::ModerateEdit,
            "Minor edit" => Self::MinorEdit,
            "Manual save" => Self::ManualSave,
            "Before restore" => Self::BeforeRestore,
            _ => Self::Other(label),
        }
    }
}

impl From<ChangeLabel> for String {
    fn from(label: ChangeLabel) -> Self {
        match label {
            ChangeLabel::Other(label) => label,
            known => known.as_str().to_owned(),
        }
    }
}

impl fmt::Display for ChangeLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Result of comparing two chapter states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub label: ChangeLabel,
    /// Title before content when both changed.
    pub changed_fields: Vec<ChangedField>,
}

/// Whether the title or the raw content differ.
pub fn has_content_changed(old: &Chapter, new: &Chapter) -> bool {
    old.content != new.content || old.title != new.title
}

/// Relative change of the cached word counts, in percent.
///
/// An empty old chapter counts as a 100% change.
pub fn percent_change(old_word_count: usize, new_word_count: usize) -> f64 {
    if old_word_count == 0 {
        return 100.0;
    }
    let delta = old_word_count.abs_diff(new_word_count);
    delta as f64 / old_word_count as f64 * 100.0
}

/// Classify the change from `old` to `new`.
///
/// Fields are compared by exact string equality; the percentage uses the
/// cached `word_count` of each chapter.
pub fn classify(old: &Chapter, new: &Chapter) -> Classification {
    let mut changed_fields = Vec::with_capacity(2);
    if old.title != new.title {
        changed_fields.push(ChangedField::Title);
    }
    if old.content != new.content {
        changed_fields.push(ChangedField::Content);
    }

    let title = changed_fields.contains(&ChangedField::Title);
    let content = changed_fields.contains(&ChangedField::Content);

    let label = match (title, content) {
        (true, true) => ChangeLabel::TitleAndContentChanged,
        (true, false) => ChangeLabel::TitleChanged,
        (false, true) => {
            let percent = percent_change(old.word_count, new.word_count);
            if percent > MAJOR_EDIT_PERCENT {
                ChangeLabel::MajorEdit
            } else if percent > MODERATE_EDIT_PERCENT {
                ChangeLabel::ModerateEdit
            } else {
                ChangeLabel::MinorEdit
            }
        }
        (false, false) => ChangeLabel::ManualSave,
    };

    Classification {
        label,
        changed_fields,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use storykeep_common::ChapterId;

    fn chapter(title: &str, content: &str, word_count: usize) -> Chapter {
        let now = DateTime::from_timestamp_millis(0).unwrap();
        let mut ch = Chapter::new(ChapterId::new("c1"), title, 1, now);
        ch.content = content.into();
        ch.word_count = word_count;
        ch
    }

    #[test]
    fn label_boundaries_for_content_only_changes() {
        let old = chapter("T", "old", 100);

        let moderate = classify(&old, &chapter("T", "new", 119));
        assert_eq!(moderate.label, ChangeLabel::ModerateEdit);

        let major = classify(&old, &chapter("T", "new", 121));
        assert_eq!(major.label, ChangeLabel::MajorEdit);

        let minor = classify(&old, &chapter("T", "new", 104));
        assert_eq!(minor.label, ChangeLabel::MinorEdit);
    }

    #[test]
    fn exact_thresholds_fall_to_the_lower_label() {
        let old = chapter("T", "old", 100);
        assert_eq!(classify(&old, &chapter("T", "new", 120)).label, ChangeLabel::ModerateEdit);
        assert_eq!(classify(&old, &chapter("T", "new", 105)).label, ChangeLabel::MinorEdit);
        assert_eq!(classify(&old, &chapter("T", "new", 80)).label, ChangeLabel::ModerateEdit);
    }

    #[test]
    fn shrinking_counts_as_change() {
        let old = chapter("T", "old", 100);
        assert_eq!(classify(&old, &chapter("T", "new", 50)).label, ChangeLabel::MajorEdit);
    }

    #[test]
    fn empty_old_chapter_is_major() {
        let old = chapter("T", "", 0);
        let c = classify(&old, &chapter("T", "first words", 2));
        assert_eq!(c.label, ChangeLabel::MajorEdit);
        assert_eq!(c.changed_fields, vec![ChangedField::Content]);
    }

    #[test]
    fn same_word_count_rewrite_is_minor() {
        let old = chapter("T", "alpha beta", 2);
        assert_eq!(classify(&old, &chapter("T", "gamma delta", 2)).label, ChangeLabel::MinorEdit);
    }

    #[test]
    fn title_labels() {
        let old = chapter("Old", "body", 1);
        let title_only = classify(&old, &chapter("New", "body", 1));
        assert_eq!(title_only.label, ChangeLabel::TitleChanged);
        assert_eq!(title_only.changed_fields, vec![ChangedField::Title]);

        let both = classify(&old, &chapter("New", "other body", 2));
        assert_eq!(both.label, ChangeLabel::TitleAndContentChanged);
        assert_eq!(
            both.changed_fields,
            vec![ChangedField::Title, ChangedField::Content]
        );
    }

    #[test]
    fn unchanged_defaults_to_manual_save() {
        let old = chapter("T", "body", 1);
        let c = classify(&old, &old.clone());
        assert_eq!(c.label, ChangeLabel::ManualSave);
        assert!(c.changed_fields.is_empty());
        assert!(!has_content_changed(&old, &old.clone()));
    }

    #[test]
    fn word_count_alone_does_not_count_as_change() {
        let old = chapter("T", "body", 1);
        let recounted = chapter("T", "body", 7);
        assert!(!has_content_changed(&old, &recounted));
    }

    #[test]
    fn unknown_labels_round_trip() {
        let label: ChangeLabel = serde_json::from_str("\"Autosave\"").unwrap();
        assert_eq!(label, ChangeLabel::Other("Autosave".into()));
        assert_eq!(serde_json::to_string(&label).unwrap(), "\"Autosave\"");
        let known: ChangeLabel = serde_json::from_str("\"Before restore\"").unwrap();
        assert_eq!(known, ChangeLabel::BeforeRestore);
    }
}
