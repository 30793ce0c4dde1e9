use anyhow::{Context, bail};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use storykeep_common::{ChapterId, VersionId};
use storykeep_kernel::{Chapter, diff, similarity};
use storykeep_persist::{
    ChapterRepository, FileStore, Revision, SaveRequest, discard_chapter, get_chapter_version,
    list_versions, recompute_aggregate_stats, restore_version, save_chapter,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "storykeep", about = "Chapter storage with version history")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Story data directory
    #[arg(long, env = "STORYKEEP_DATA_DIR", default_value = "story-data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an empty draft chapter
    New {
        title: String,
        /// Episode number used for ordering
        #[arg(short, long, default_value = "1")]
        episode: u32,
        /// Explicit chapter id (random when omitted)
        #[arg(long)]
        id: Option<String>,
    },
    /// Save a chapter from a JSON payload (bare chapter or {chapter, createVersion, versionNote})
    Save {
        payload: PathBuf,
        /// Snapshot the stored state before overwriting it
        #[arg(long)]
        version: bool,
        /// Note attached to the snapshot
        #[arg(short, long)]
        note: Option<String>,
        /// Refuse to save unless the stored chapter has this revision
        #[arg(long)]
        expect_revision: Option<String>,
        /// Reject the payload if its id differs
        #[arg(long)]
        id: Option<String>,
    },
    /// Print a chapter as JSON
    Show { id: String },
    /// List chapters in episode order
    List,
    /// List the versions of a chapter, newest first
    History {
        id: String,
        #[arg(long)]
        oldest_first: bool,
    },
    /// Print one version as JSON
    Version { id: String, version_id: String },
    /// Make a version live again (the current state is kept as a new version)
    Restore { id: String, version_id: String },
    /// Compare a version against the live content
    Compare { id: String, version_id: String },
    /// Delete a chapter and its history
    Delete { id: String },
    /// Recompute and print story totals
    Stats,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut store = FileStore::open(&cli.data_dir)
        .with_context(|| format!("opening story data at {}", cli.data_dir.display()))?;
    debug!(root = %store.root().display(), "store ready");

    match cli.command {
        Commands::New { title, episode, id } => {
            let id = id.map(ChapterId::new).unwrap_or_else(ChapterId::generate);
            if store.load_chapter(&id)?.is_some() {
                bail!("chapter {id} already exists");
            }
            let chapter = Chapter::new(id, title, episode, Utc::now());
            let saved = save_chapter(&mut store, SaveRequest::autosave(chapter))?;
            println!("{}", saved.id);
        }
        Commands::Save {
            payload,
            version,
            note,
            expect_revision,
            id,
        } => {
            let mut request = read_request(&payload)?;
            if version {
                request.create_version = true;
            }
            if note.is_some() {
                request.version_note = note;
            }
            if let Some(revision) = expect_revision {
                request.expected_revision = Some(Revision::new(revision));
            }
            prepare(&mut request, id.as_deref())?;

            let saved = save_chapter(&mut store, request)?;
            println!(
                "saved {} ({} words, {} versions, revision {})",
                saved.id,
                saved.word_count,
                saved.versions.len(),
                Revision::of(&saved)?
            );
        }
        Commands::Show { id } => {
            let chapter = load(&store, &id)?;
            println!("{}", serde_json::to_string_pretty(&chapter)?);
        }
        Commands::List => {
            for chapter in store.list_chapters()? {
                println!(
                    "{:>4}  {:<36}  {:>6} words  {:>3} versions  {}",
                    chapter.episode_number,
                    chapter.id,
                    chapter.word_count,
                    chapter.versions.len(),
                    chapter.title
                );
            }
        }
        Commands::History { id, oldest_first } => {
            let chapter_id = ChapterId::new(id);
            let Some(mut versions) = list_versions(&store, &chapter_id)? else {
                bail!("chapter {chapter_id} not found");
            };
            if !oldest_first {
                versions.reverse();
            }
            for v in versions {
                let delta = v
                    .content_diff
                    .map(|d| format!("+{} -{}", d.added, d.removed))
                    .unwrap_or_default();
                println!(
                    "{}  {}  {:<26}  {:>6} words  {:<8}  {}",
                    v.id,
                    v.timestamp.to_rfc3339(),
                    v.label,
                    v.word_count,
                    delta,
                    v.note.as_deref().unwrap_or("")
                );
            }
        }
        Commands::Version { id, version_id } => {
            let (chapter_id, version_id) = (ChapterId::new(id), VersionId::new(version_id));
            let version = get_chapter_version(&store, &chapter_id, &version_id)?
                .with_context(|| format!("version {version_id} of chapter {chapter_id} not found"))?;
            println!("{}", serde_json::to_string_pretty(&version)?);
        }
        Commands::Restore { id, version_id } => {
            let (chapter_id, version_id) = (ChapterId::new(id), VersionId::new(version_id));
            let chapter = restore_version(&mut store, &chapter_id, &version_id)?
                .with_context(|| format!("version {version_id} of chapter {chapter_id} not found"))?;
            println!(
                "restored {} to {} ({} versions)",
                chapter.id,
                version_id,
                chapter.versions.len()
            );
        }
        Commands::Compare { id, version_id } => {
            let chapter = load(&store, &id)?;
            let version_id = VersionId::new(version_id);
            let version = chapter
                .find_version(&version_id)
                .with_context(|| format!("version {version_id} of chapter {id} not found"))?;
            let delta = diff(&version.content, &chapter.content);
            println!("similarity: {}%", similarity(&version.content, &chapter.content));
            println!("words: +{} -{}", delta.added, delta.removed);
            if version.title != chapter.title {
                println!("title: {:?} -> {:?}", version.title, chapter.title);
            }
        }
        Commands::Delete { id } => {
            let chapter_id = ChapterId::new(id);
            if !discard_chapter(&mut store, &chapter_id)? {
                bail!("chapter {chapter_id} not found");
            }
            println!("deleted {chapter_id}");
        }
        Commands::Stats => {
            let metadata = recompute_aggregate_stats(&mut store)?;
            println!("{}", metadata.title);
            println!("chapters: {}", metadata.total_chapters);
            println!("words: {}", metadata.total_word_count);
        }
    }

    Ok(())
}

fn read_request(path: &Path) -> anyhow::Result<SaveRequest> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("reading payload {}", path.display()))?;
    serde_json::from_str(&raw).with_context(|| format!("parsing payload {}", path.display()))
}

/// Stamp the edit time and word count the way the editor does before saving.
fn prepare(request: &mut SaveRequest, expected_id: Option<&str>) -> anyhow::Result<()> {
    if let Some(expected) = expected_id {
        if request.chapter.id.as_str() != expected {
            bail!(
                "ID mismatch: payload is {}, expected {expected}",
                request.chapter.id
            );
        }
    }
    request.chapter.updated_at = Utc::now();
    request.chapter.recount_words();
    Ok(())
}

fn load(store: &FileStore, id: &str) -> anyhow::Result<Chapter> {
    store
        .load_chapter(&ChapterId::new(id))?
        .with_context(|| format!("chapter {id} not found"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> SaveRequest {
        let then = chrono::DateTime::from_timestamp_millis(0).unwrap();
        let mut chapter = Chapter::new(ChapterId::new("ch-1"), "T", 1, then);
        chapter.content = "<p>three little words</p>".into();
        SaveRequest::autosave(chapter)
    }

    #[test]
    fn cli_parses_save_flags() {
        let cli = Cli::try_parse_from([
            "storykeep",
            "--data-dir",
            "/tmp/story",
            "save",
            "chapter.json",
            "--version",
            "--note",
            "draft",
        ])
        .unwrap();
        assert_eq!(cli.data_dir, PathBuf::from("/tmp/story"));
        match cli.command {
            Commands::Save { version, note, .. } => {
                assert!(version);
                assert_eq!(note.as_deref(), Some("draft"));
            }
            _ => panic!("expected save command"),
        }
    }

    #[test]
    fn prepare_recounts_and_stamps() {
        let mut req = request();
        prepare(&mut req, Some("ch-1")).unwrap();
        assert_eq!(req.chapter.word_count, 3);
        assert!(req.chapter.updated_at > req.chapter.created_at);
    }

    #[test]
    fn prepare_rejects_id_mismatch() {
        let mut req = request();
        assert!(prepare(&mut req, Some("other")).is_err());
    }

    #[test]
    fn save_and_restore_through_file_store() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = FileStore::open(tmp.path()).unwrap();

        let mut req = request();
        prepare(&mut req, None).unwrap();
        let first = save_chapter(&mut store, req).unwrap();

        let mut edited = first.clone();
        edited.content = "<p>only two</p>".into();
        let mut req = SaveRequest::with_version(edited, None);
        prepare(&mut req, None).unwrap();
        let second = save_chapter(&mut store, req).unwrap();
        assert_eq!(second.versions.len(), 1);

        let restored = restore_version(&mut store, &second.id, &second.versions[0].id)
            .unwrap()
            .unwrap();
        assert_eq!(restored.word_count, 3);
    }
}
