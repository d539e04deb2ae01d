//! # Uploaded Policy Files
//!
//! Filename sanitization, text extraction off the async runtime, and the
//! optional on-disk copy of raw uploads under `UPLOAD_DIR`.
//!
//! Writes to `UPLOAD_DIR` go through two steps so a failed upload leaves
//! the directory as it was:
//!
//! ```text
//! stage_uploads()  → .<name>.partial
//! commit()         → <name>   (replaced file kept as .<name>.previous)
//! finish()         → backups removed     | rollback() → backups restored
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use polcheck_core::Policy;
use polcheck_extract::{ExtractionError, TextExtractor};

use crate::state::{PolicyStore, StoreError};

/// Sanitize a client-supplied filename for use as a store key and a file
/// name under the upload directory.
///
/// Keeps only the last path component, drops non-ASCII, turns whitespace
/// runs into `_`, removes anything outside `[A-Za-z0-9._-]` and trims
/// leading and trailing `.`/`_`. Returns `None` when nothing survives.
pub fn sanitize_filename(raw: &str) -> Option<String> {
    let base = raw.rsplit(['/', '\\']).next().unwrap_or(raw);

    let joined = base
        .split(|c: char| c.is_ascii_whitespace())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_");

    let kept: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(*c, '.' | '_' | '-'))
        .collect();

    let trimmed = kept.trim_matches(|c| c == '.' || c == '_');
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Whether `filename` has a `.pdf` extension (any case).
pub fn is_pdf(filename: &str) -> bool {
    Path::new(filename)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

/// Run `extractor` on the blocking pool.
///
/// The outer error is a join failure (the extractor panicked past its own
/// guard or the runtime is shutting down).
pub async fn extract_blocking(
    extractor: Arc<dyn TextExtractor>,
    bytes: Vec<u8>,
) -> Result<Result<String, ExtractionError>, tokio::task::JoinError> {
    tokio::task::spawn_blocking(move || extractor.extract(&bytes)).await
}

fn staging_path(dir: &Path, filename: &str) -> PathBuf {
    dir.join(format!(".{filename}.partial"))
}

fn backup_path(dir: &Path, filename: &str) -> PathBuf {
    dir.join(format!(".{filename}.previous"))
}

async fn remove_quietly(path: &Path) {
    if let Err(e) = tokio::fs::remove_file(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            tracing::warn!(file = %path.display(), error = %e, "failed to clean up upload file");
        }
    }
}

/// Raw uploads written under hidden staging names. Nothing here is visible
/// to [`load_upload_dir`] until [`StagedUploads::commit`].
#[derive(Debug)]
#[must_use = "staged uploads must be committed or discarded"]
pub struct StagedUploads {
    dir: PathBuf,
    filenames: Vec<String>,
}

/// Write every upload in `files` to its staging name under `dir`, creating
/// `dir` if needed. On failure the files staged so far are removed.
pub async fn stage_uploads<B: AsRef<[u8]>>(
    dir: &Path,
    files: &[(String, B)],
) -> std::io::Result<StagedUploads> {
    tokio::fs::create_dir_all(dir).await?;
    let mut staged = StagedUploads {
        dir: dir.to_path_buf(),
        filenames: Vec::with_capacity(files.len()),
    };
    for (filename, bytes) in files {
        if let Err(e) = tokio::fs::write(staging_path(dir, filename), bytes.as_ref()).await {
            staged.discard().await;
            return Err(e);
        }
        staged.filenames.push(filename.clone());
    }
    Ok(staged)
}

impl StagedUploads {
    /// Move every staged file to its final name. Files being replaced are
    /// kept as backups until [`CommittedUploads::finish`].
    ///
    /// All or nothing: on failure every file already moved is reverted,
    /// replaced files are restored, and remaining staged files are removed.
    pub async fn commit(self) -> std::io::Result<CommittedUploads> {
        let mut committed = CommittedUploads {
            dir: self.dir.clone(),
            entries: Vec::with_capacity(self.filenames.len()),
        };

        for (i, filename) in self.filenames.iter().enumerate() {
            if let Err(e) = committed.move_into_place(filename).await {
                committed.rollback().await;
                for rest in &self.filenames[i..] {
                    remove_quietly(&staging_path(&self.dir, rest)).await;
                }
                return Err(e);
            }
        }
        Ok(committed)
    }

    /// Remove every staged file.
    pub async fn discard(self) {
        for filename in &self.filenames {
            remove_quietly(&staging_path(&self.dir, filename)).await;
        }
    }
}

/// Uploads moved to their final names, with backups of any files they
/// replaced.
#[derive(Debug)]
#[must_use = "committed uploads must be finished or rolled back"]
pub struct CommittedUploads {
    dir: PathBuf,
    /// (filename, whether a previous file was backed up)
    entries: Vec<(String, bool)>,
}

impl CommittedUploads {
    async fn move_into_place(&mut self, filename: &str) -> std::io::Result<()> {
        let target = self.dir.join(filename);
        let had_previous = match tokio::fs::metadata(&target).await {
            Ok(meta) if meta.is_file() => {
                tokio::fs::rename(&target, backup_path(&self.dir, filename)).await?;
                true
            }
            _ => false,
        };

        if let Err(e) = tokio::fs::rename(staging_path(&self.dir, filename), &target).await {
            if had_previous {
                if let Err(restore) =
                    tokio::fs::rename(backup_path(&self.dir, filename), &target).await
                {
                    tracing::error!(%filename, error = %restore, "failed to restore replaced upload");
                }
            }
            remove_quietly(&staging_path(&self.dir, filename)).await;
            return Err(e);
        }

        self.entries.push((filename.to_string(), had_previous));
        Ok(())
    }

    /// Paths of the committed files, in upload order.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.entries
            .iter()
            .map(|(name, _)| self.dir.join(name))
            .collect()
    }

    /// Drop the backups of replaced files.
    pub async fn finish(self) {
        for (filename, had_previous) in &self.entries {
            if *had_previous {
                remove_quietly(&backup_path(&self.dir, filename)).await;
            }
        }
    }

    /// Undo the commit: remove the new files and restore what they replaced.
    pub async fn rollback(self) {
        for (filename, had_previous) in self.entries.iter().rev() {
            let target = self.dir.join(filename);
            if *had_previous {
                if let Err(e) = tokio::fs::rename(backup_path(&self.dir, filename), &target).await {
                    tracing::error!(%filename, error = %e, "failed to restore replaced upload");
                }
            } else {
                remove_quietly(&target).await;
            }
        }
    }
}

/// Remove `dir/filename` if it exists.
pub async fn remove_upload(dir: &Path, filename: &str) -> std::io::Result<()> {
    match tokio::fs::remove_file(dir.join(filename)).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Startup load failures.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to read upload directory {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Extract every `*.pdf` in `dir` and upsert the results into `store`.
///
/// A missing directory is treated as empty. Files that fail extraction are
/// skipped with a warning. Returns the number of policies loaded.
pub async fn load_upload_dir(
    dir: &Path,
    extractor: Arc<dyn TextExtractor>,
    store: &PolicyStore,
) -> Result<usize, LoadError> {
    let io_err = |source: std::io::Error| LoadError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::info!(dir = %dir.display(), "upload directory does not exist yet");
            return Ok(0);
        }
        Err(e) => return Err(io_err(e)),
    };

    let mut paths = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
        let path = entry.path();
        let is_file = entry.file_type().await.map_err(io_err)?.is_file();
        if is_file && path.file_name().and_then(|n| n.to_str()).is_some_and(is_pdf) {
            paths.push(path);
        }
    }
    paths.sort();

    let mut policies = Vec::with_capacity(paths.len());
    for path in paths {
        let Some(filename) = path.file_name().and_then(|n| n.to_str()).map(str::to_string) else {
            continue;
        };
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(file = %path.display(), error = %e, "skipping unreadable policy file");
                continue;
            }
        };
        match extract_blocking(Arc::clone(&extractor), bytes).await {
            Ok(Ok(text)) => policies.push(Policy::new(filename, text)),
            Ok(Err(e)) => {
                tracing::warn!(file = %path.display(), error = %e, "skipping policy file that failed extraction");
            }
            Err(e) => {
                tracing::warn!(file = %path.display(), error = %e, "extraction task failed");
            }
        }
    }

    let count = policies.len();
    if count > 0 {
        store.upsert_policies(policies).await?;
    }
    tracing::info!(dir = %dir.display(), count, "loaded policies from upload directory");
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use polcheck_extract::Utf8TextExtractor;

    #[test]
    fn sanitize_keeps_plain_names() {
        assert_eq!(sanitize_filename("handbook.pdf").as_deref(), Some("handbook.pdf"));
        assert_eq!(
            sanitize_filename("Refund-Policy_v2.pdf").as_deref(),
            Some("Refund-Policy_v2.pdf")
        );
    }

    #[test]
    fn sanitize_strips_path_components() {
        assert_eq!(sanitize_filename("../../etc/passwd").as_deref(), Some("passwd"));
        assert_eq!(
            sanitize_filename(r"C:\Users\me\policy.pdf").as_deref(),
            Some("policy.pdf")
        );
    }

    #[test]
    fn sanitize_collapses_whitespace_and_drops_odd_chars() {
        assert_eq!(
            sanitize_filename("my  refund\tpolicy (final).pdf").as_deref(),
            Some("my_refund_policy_final.pdf")
        );
        assert_eq!(sanitize_filename("politique é.pdf").as_deref(), Some("politique_.pdf"));
    }

    #[test]
    fn sanitize_trims_dots_and_underscores() {
        assert_eq!(sanitize_filename(".hidden.pdf").as_deref(), Some("hidden.pdf"));
        assert_eq!(sanitize_filename("__x.pdf__").as_deref(), Some("x.pdf"));
    }

    #[test]
    fn sanitize_rejects_empty_results() {
        assert_eq!(sanitize_filename(""), None);
        assert_eq!(sanitize_filename("..."), None);
        assert_eq!(sanitize_filename("dir/"), None);
        assert_eq!(sanitize_filename("日本語"), None);
    }

    #[test]
    fn pdf_extension_is_case_insensitive() {
        assert!(is_pdf("a.pdf"));
        assert!(is_pdf("a.PDF"));
        assert!(!is_pdf("a.pdf.txt"));
        assert!(!is_pdf("pdf"));
    }

    fn dir_entries(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(dir)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    fn files(items: &[(&str, &str)]) -> Vec<(String, Vec<u8>)> {
        items
            .iter()
            .map(|(name, body)| (name.to_string(), body.as_bytes().to_vec()))
            .collect()
    }

    #[tokio::test]
    async fn staged_uploads_are_hidden_until_committed() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("uploads");

        let staged = stage_uploads(&nested, &files(&[("a.pdf", "A")])).await.unwrap();
        assert_eq!(dir_entries(&nested), vec![".a.pdf.partial"]);
        let store = PolicyStore::new();
        let loaded = load_upload_dir(&nested, Arc::new(Utf8TextExtractor), &store)
            .await
            .unwrap();
        assert_eq!(loaded, 0);

        let committed = staged.commit().await.unwrap();
        assert_eq!(committed.paths(), vec![nested.join("a.pdf")]);
        committed.finish().await;
        assert_eq!(dir_entries(&nested), vec!["a.pdf"]);
        assert_eq!(std::fs::read(nested.join("a.pdf")).unwrap(), b"A");
    }

    #[tokio::test]
    async fn commit_replaces_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.pdf"), "old").unwrap();

        let staged = stage_uploads(dir.path(), &files(&[("a.pdf", "new")])).await.unwrap();
        staged.commit().await.unwrap().finish().await;

        assert_eq!(dir_entries(dir.path()), vec!["a.pdf"]);
        assert_eq!(std::fs::read_to_string(dir.path().join("a.pdf")).unwrap(), "new");
    }

    #[tokio::test]
    async fn failed_commit_leaves_directory_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.pdf"), "old").unwrap();
        // A directory where b.pdf should go makes its rename fail.
        std::fs::create_dir(dir.path().join("b.pdf")).unwrap();

        let staged = stage_uploads(
            dir.path(),
            &files(&[("a.pdf", "new"), ("b.pdf", "B"), ("c.pdf", "C")]),
        )
        .await
        .unwrap();
        assert!(staged.commit().await.is_err());

        assert_eq!(dir_entries(dir.path()), vec!["a.pdf", "b.pdf"]);
        assert_eq!(std::fs::read_to_string(dir.path().join("a.pdf")).unwrap(), "old");

        let store = PolicyStore::new();
        let loaded = load_upload_dir(dir.path(), Arc::new(Utf8TextExtractor), &store)
            .await
            .unwrap();
        assert_eq!(loaded, 1);
        assert_eq!(store.snapshot().await.unwrap(), vec![Policy::new("a.pdf", "old")]);
    }

    #[tokio::test]
    async fn rollback_restores_replaced_files_and_removes_new_ones() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.pdf"), "old").unwrap();

        let staged = stage_uploads(dir.path(), &files(&[("a.pdf", "new"), ("b.pdf", "B")]))
            .await
            .unwrap();
        staged.commit().await.unwrap().rollback().await;

        assert_eq!(dir_entries(dir.path()), vec!["a.pdf"]);
        assert_eq!(std::fs::read_to_string(dir.path().join("a.pdf")).unwrap(), "old");
    }

    #[tokio::test]
    async fn discard_removes_staged_files() {
        let dir = tempfile::tempdir().unwrap();
        let staged = stage_uploads(dir.path(), &files(&[("a.pdf", "A"), ("b.pdf", "B")]))
            .await
            .unwrap();
        staged.discard().await;
        assert!(dir_entries(dir.path()).is_empty());
    }

    #[tokio::test]
    async fn remove_upload_ignores_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.pdf"), "A").unwrap();
        remove_upload(dir.path(), "a.pdf").await.unwrap();
        assert!(!dir.path().join("a.pdf").exists());
        remove_upload(dir.path(), "a.pdf").await.unwrap();
    }

    #[tokio::test]
    async fn load_upload_dir_skips_failures_and_non_pdfs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.pdf"), "No refunds after 30 days").unwrap();
        std::fs::write(dir.path().join("a.PDF"), "Be kind").unwrap();
        std::fs::write(dir.path().join("broken.pdf"), [0xff, 0xfe]).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let store = PolicyStore::new();
        let loaded = load_upload_dir(dir.path(), Arc::new(Utf8TextExtractor), &store)
            .await
            .unwrap();

        assert_eq!(loaded, 2);
        let snapshot = store.snapshot().await.unwrap();
        assert_eq!(
            snapshot,
            vec![
                Policy::new("a.PDF", "Be kind"),
                Policy::new("b.pdf", "No refunds after 30 days"),
            ]
        );
    }

    #[tokio::test]
    async fn load_missing_upload_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = PolicyStore::new();
        let loaded = load_upload_dir(&dir.path().join("absent"), Arc::new(Utf8TextExtractor), &store)
            .await
            .unwrap();
        assert_eq!(loaded, 0);
        assert!(store.is_empty());
    }
}
