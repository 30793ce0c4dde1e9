use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use storykeep_kernel::Chapter;

use crate::store::StoreError;

/// Content hash of a persisted chapter record.
///
/// A writer that read revision `r` can pass it back on save; the save is
/// refused if the stored chapter has moved on in the meantime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Revision(pub String);

impl Revision {
    pub fn new(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    /// SHA-256 over the chapter's JSON encoding.
    pub fn of(chapter: &Chapter) -> Result<Self, StoreError> {
        let bytes = serde_json::to_vec(chapter)?;
        Ok(Self(sha256_hex(&bytes)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;
    use storykeep_common::ChapterId;

    fn chapter() -> Chapter {
        let now = DateTime::from_timestamp_millis(0).unwrap();
        Chapter::new(ChapterId::new("c1"), "Title", 1, now)
    }

    #[test]
    fn revision_is_stable_for_equal_chapters() {
        let a = Revision::of(&chapter()).unwrap();
        let b = Revision::of(&chapter()).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.as_str().len(), 64);
    }

    #[test]
    fn revision_changes_with_content() {
        let before = Revision::of(&chapter()).unwrap();
        let mut edited = chapter();
        edited.content = "more".into();
        assert_ne!(before, Revision::of(&edited).unwrap());
    }
}
