//! Delivering artifacts when no office application is focused.

use crate::clipboard::ClipboardSource;
use crate::config::{Config, NoAppAction};
use crate::i18n::{ArtifactKind, Message};
use anyhow::{Context, Result};
use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

const FILE_PREFIX: &str = "pastemd";

/// Generated bytes waiting to be delivered.
#[derive(Debug, Clone, PartialEq)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub bytes: Vec<u8>,
}

impl Artifact {
    pub fn document(bytes: Vec<u8>) -> Self {
        Self {
            kind: ArtifactKind::Document,
            bytes,
        }
    }

    pub fn spreadsheet(bytes: Vec<u8>) -> Self {
        Self {
            kind: ArtifactKind::Spreadsheet,
            bytes,
        }
    }
}

pub trait Launcher: Send + Sync {
    /// Open `path` with the default handler for its type.
    fn open(&self, path: &Path) -> Result<()>;
}

#[derive(Debug, Default)]
pub struct SystemLauncher;

impl Launcher for SystemLauncher {
    fn open(&self, path: &Path) -> Result<()> {
        open::that(path).with_context(|| format!("Failed to open {}", path.display()))
    }
}

/// A free path for a new artifact in `dir`: `pastemd_<timestamp>.<ext>`, with
/// `_1`, `_2`, ... appended when that name is taken.
pub fn output_path(dir: &Path, kind: ArtifactKind) -> PathBuf {
    let stem = format!("{FILE_PREFIX}_{}", Local::now().format("%Y%m%d_%H%M%S"));
    let extension = kind.extension();

    let mut candidate = dir.join(format!("{stem}.{extension}"));
    let mut suffix = 1;
    while candidate.exists() {
        candidate = dir.join(format!("{stem}_{suffix}.{extension}"));
        suffix += 1;
    }
    candidate
}

/// Write `artifact` to a fresh file in `dir`, creating the directory first.
pub fn write_artifact(dir: &Path, artifact: &Artifact) -> Result<PathBuf> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;
    let path = output_path(dir, artifact.kind);
    fs::write(&path, &artifact.bytes)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    tracing::info!("Wrote {}", path.display());
    Ok(path)
}

/// A temporary copy of `bytes` for handing to an office application.
///
/// The file is deleted when the returned handle is dropped.
pub fn ephemeral_file(
    bytes: &[u8],
    kind: ArtifactKind,
    temp_dir: Option<&Path>,
) -> Result<NamedTempFile> {
    use std::io::Write;

    let suffix = format!(".{}", kind.extension());
    let mut builder = tempfile::Builder::new();
    builder.prefix(FILE_PREFIX).suffix(&suffix);

    let mut file = match temp_dir {
        Some(dir) => {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
            builder.tempfile_in(dir)
        }
        None => builder.tempfile(),
    }
    .context("Failed to create temporary file")?;

    file.write_all(bytes).context("Failed to write temporary file")?;
    file.flush()?;
    Ok(file)
}

/// Performs the configured no-app action.
pub struct OutputExecutor<'a> {
    clipboard: &'a dyn ClipboardSource,
    launcher: &'a dyn Launcher,
}

impl<'a> OutputExecutor<'a> {
    pub fn new(clipboard: &'a dyn ClipboardSource, launcher: &'a dyn Launcher) -> Self {
        Self { clipboard, launcher }
    }

    /// Where files produced by `action` go: the save directory when they are
    /// kept, the temp directory otherwise.
    fn destination(action: NoAppAction, config: &Config) -> PathBuf {
        if action.keeps_file(config.keep_file) {
            config.resolved_save_dir()
        } else {
            config
                .resolved_temp_dir()
                .unwrap_or_else(|| std::env::temp_dir().join(FILE_PREFIX))
        }
    }

    /// Deliver one artifact. Returns the single message describing the outcome.
    pub fn execute(&self, action: NoAppAction, artifact: &Artifact, config: &Config) -> Message {
        if action == NoAppAction::None {
            return Message::NoAppDetected;
        }

        let path = match write_artifact(&Self::destination(action, config), artifact) {
            Ok(path) => path,
            Err(e) => {
                tracing::error!("{e:?}");
                return match artifact.kind {
                    ArtifactKind::Document => Message::DocumentSaveFailed,
                    ArtifactKind::Spreadsheet => Message::TableExportFailed,
                };
            }
        };

        match action {
            NoAppAction::Open => match self.launcher.open(&path) {
                Ok(()) => Message::Opened {
                    kind: artifact.kind,
                    path,
                },
                Err(e) => {
                    tracing::error!("{e:?}");
                    Message::OpenFailed { path }
                }
            },
            NoAppAction::Save => Message::Saved {
                kind: artifact.kind,
                path,
            },
            NoAppAction::Clipboard => match self.clipboard.set_text(&path.display().to_string()) {
                Ok(()) => Message::CopiedToClipboard {
                    kind: artifact.kind,
                },
                Err(e) => {
                    tracing::error!("Failed to put {} on the clipboard: {e}", path.display());
                    Message::ClipboardActionFailed
                }
            },
            NoAppAction::None => Message::NoAppDetected,
        }
    }

    /// Deliver every generated artifact of a batch. Items that failed to
    /// generate, and the `pre_failures` that never got that far, count as
    /// failed. Returns one summary message.
    pub fn execute_batch(
        &self,
        action: NoAppAction,
        items: Vec<Result<Artifact>>,
        pre_failures: usize,
        config: &Config,
    ) -> Message {
        if action == NoAppAction::None {
            return Message::NoAppDetected;
        }

        let mut succeeded = 0;
        let mut failed = pre_failures;
        let mut copied = Vec::new();
        let destination = Self::destination(action, config);

        for item in items {
            let artifact = match item {
                Ok(artifact) => artifact,
                Err(e) => {
                    tracing::error!("Batch item failed: {e:?}");
                    failed += 1;
                    continue;
                }
            };

            let path = match write_artifact(&destination, &artifact) {
                Ok(path) => path,
                Err(e) => {
                    tracing::error!("{e:?}");
                    failed += 1;
                    continue;
                }
            };

            match action {
                NoAppAction::Open => match self.launcher.open(&path) {
                    Ok(()) => succeeded += 1,
                    Err(e) => {
                        tracing::error!("{e:?}");
                        failed += 1;
                    }
                },
                NoAppAction::Clipboard => copied.push(path.display().to_string()),
                NoAppAction::Save | NoAppAction::None => succeeded += 1,
            }
        }

        if !copied.is_empty() {
            match self.clipboard.set_text(&copied.join("\n")) {
                Ok(()) => succeeded += copied.len(),
                Err(e) => {
                    tracing::error!("Failed to put batch paths on the clipboard: {e}");
                    failed += copied.len();
                }
            }
        }

        tracing::info!("Batch finished: {succeeded} succeeded, {failed} failed");
        Message::BatchSummary { succeeded, failed }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clipboard::ClipboardSnapshot;
    use crate::error::ClipboardError;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingClipboard {
        written: Mutex<Vec<String>>,
    }

    impl ClipboardSource for RecordingClipboard {
        fn snapshot(&self) -> Result<ClipboardSnapshot, ClipboardError> {
            Ok(ClipboardSnapshot::default())
        }

        fn set_text(&self, text: &str) -> Result<(), ClipboardError> {
            self.written.lock().unwrap().push(text.to_string());
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingLauncher {
        opened: Mutex<Vec<PathBuf>>,
        fail: bool,
    }

    impl Launcher for RecordingLauncher {
        fn open(&self, path: &Path) -> Result<()> {
            anyhow::ensure!(!self.fail, "no handler");
            self.opened.lock().unwrap().push(path.to_path_buf());
            Ok(())
        }
    }

    fn config_in(dir: &Path) -> Config {
        Config {
            save_dir: dir.join("saved").display().to_string(),
            temp_dir: Some(dir.join("tmp").display().to_string()),
            ..Config::default()
        }
    }

    #[test]
    fn output_paths_do_not_clobber() {
        let dir = tempfile::tempdir().unwrap();
        let first = write_artifact(dir.path(), &Artifact::document(b"a".to_vec())).unwrap();
        let second = write_artifact(dir.path(), &Artifact::document(b"b".to_vec())).unwrap();
        assert_ne!(first, second);
        assert_eq!(fs::read(&first).unwrap(), b"a");
        assert_eq!(fs::read(&second).unwrap(), b"b");

        let name = first.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("pastemd_"));
        assert!(name.ends_with(".docx"));
    }

    #[test]
    fn ephemeral_file_is_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let file = ephemeral_file(b"x", ArtifactKind::Spreadsheet, Some(dir.path())).unwrap();
        let path = file.path().to_path_buf();
        assert!(path.exists());
        assert_eq!(path.extension().unwrap(), "xlsx");
        drop(file);
        assert!(!path.exists());
    }

    #[test]
    fn open_writes_to_save_dir_and_launches() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let clipboard = RecordingClipboard::default();
        let launcher = RecordingLauncher::default();
        let executor = OutputExecutor::new(&clipboard, &launcher);

        let message = executor.execute(NoAppAction::Open, &Artifact::document(b"doc".to_vec()), &config);
        let opened = launcher.opened.lock().unwrap().clone();
        assert_eq!(opened.len(), 1);
        assert!(opened[0].starts_with(dir.path().join("saved")));
        assert_eq!(
            message,
            Message::Opened {
                kind: ArtifactKind::Document,
                path: opened[0].clone()
            }
        );
    }

    #[test]
    fn clipboard_without_keep_file_uses_temp_dir() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let clipboard = RecordingClipboard::default();
        let launcher = RecordingLauncher::default();
        let executor = OutputExecutor::new(&clipboard, &launcher);

        let message = executor.execute(
            NoAppAction::Clipboard,
            &Artifact::spreadsheet(b"xlsx".to_vec()),
            &config,
        );
        assert_eq!(
            message,
            Message::CopiedToClipboard {
                kind: ArtifactKind::Spreadsheet
            }
        );
        let written = clipboard.written.lock().unwrap().clone();
        assert_eq!(written.len(), 1);
        assert!(Path::new(&written[0]).starts_with(dir.path().join("tmp")));
        assert!(launcher.opened.lock().unwrap().is_empty());
    }

    #[test]
    fn failed_launch_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let clipboard = RecordingClipboard::default();
        let launcher = RecordingLauncher {
            fail: true,
            ..RecordingLauncher::default()
        };
        let executor = OutputExecutor::new(&clipboard, &launcher);
        let message = executor.execute(NoAppAction::Open, &Artifact::document(vec![1]), &config);
        assert!(matches!(message, Message::OpenFailed { .. }));
    }

    #[test]
    fn batch_counts_every_item_once() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let clipboard = RecordingClipboard::default();
        let launcher = RecordingLauncher::default();
        let executor = OutputExecutor::new(&clipboard, &launcher);

        let items = vec![
            Ok(Artifact::document(vec![1])),
            Err(anyhow::anyhow!("converter failed")),
            Ok(Artifact::spreadsheet(vec![2])),
        ];
        let message = executor.execute_batch(NoAppAction::Open, items, 1, &config);
        assert_eq!(
            message,
            Message::BatchSummary {
                succeeded: 2,
                failed: 2
            }
        );
        assert_eq!(launcher.opened.lock().unwrap().len(), 2);
    }

    #[test]
    fn none_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        let clipboard = RecordingClipboard::default();
        let launcher = RecordingLauncher::default();
        let executor = OutputExecutor::new(&clipboard, &launcher);
        let message = executor.execute(NoAppAction::None, &Artifact::document(vec![1]), &config);
        assert_eq!(message, Message::NoAppDetected);
        assert!(!dir.path().join("saved").exists());
    }
}
