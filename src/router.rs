//! The paste workflow: detect the target, classify the clipboard, run the
//! matching pipeline and tell the user how it went.

use crate::classify::{classify, classify_markdown, ClipboardContent};
use crate::clipboard::files::merge_markdown;
use crate::clipboard::{ClipboardSource, SystemClipboard};
use crate::config::{Config, ConfigStore, NoAppAction};
use crate::convert::{Converter, DocumentGenerator, Pandoc, SpreadsheetGenerator};
use crate::error::{ConfigError, InsertionError};
use crate::i18n::{ArtifactKind, Message};
use crate::insert::{Inserter, ScriptInserter};
use crate::markdown;
use crate::notify::{DesktopNotifier, Notifier};
use crate::output::{self, Artifact, Launcher, OutputExecutor, SystemLauncher};
use crate::target::{ForegroundDetector, TargetApp, TargetDetector};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Inputs at least this long get a "conversion started" notice first.
const LARGE_INPUT_LINES: usize = 100;

/// Everything the router talks to outside the process.
pub struct Collaborators {
    pub clipboard: Box<dyn ClipboardSource>,
    pub detector: Box<dyn TargetDetector>,
    pub converter: Box<dyn Converter>,
    pub inserter: Box<dyn Inserter>,
    pub launcher: Box<dyn Launcher>,
    pub notifier: Box<dyn Notifier>,
}

impl Collaborators {
    /// The real desktop implementations.
    pub fn system() -> anyhow::Result<Self> {
        Ok(Self {
            clipboard: Box::new(SystemClipboard::new()?),
            detector: Box::new(ForegroundDetector),
            converter: Box::new(Pandoc::new()),
            inserter: Box::new(ScriptInserter),
            launcher: Box::new(SystemLauncher),
            notifier: Box::new(DesktopNotifier),
        })
    }
}

enum DocumentInput {
    Markdown(String),
    Html(String),
}

/// Where inserted document content came from, for the success message.
enum Source {
    Text,
    Html,
    Files(usize),
}

/// Application context plus the workflow itself. Built once at startup and
/// shared with whoever triggers paste runs.
pub struct Router {
    config: Mutex<Config>,
    store: Option<ConfigStore>,
    clipboard: Box<dyn ClipboardSource>,
    detector: Box<dyn TargetDetector>,
    documents: DocumentGenerator,
    sheets: SpreadsheetGenerator,
    inserter: Box<dyn Inserter>,
    launcher: Box<dyn Launcher>,
    notifier: Box<dyn Notifier>,
}

impl Router {
    /// `store` is where config changes are persisted; `None` keeps them in
    /// memory only.
    pub fn new(config: Config, store: Option<ConfigStore>, parts: Collaborators) -> Self {
        Self {
            config: Mutex::new(config),
            store,
            clipboard: parts.clipboard,
            detector: parts.detector,
            documents: DocumentGenerator::new(parts.converter),
            sheets: SpreadsheetGenerator,
            inserter: parts.inserter,
            launcher: parts.launcher,
            notifier: parts.notifier,
        }
    }

    fn lock_config(&self) -> MutexGuard<'_, Config> {
        self.config.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// A copy of the current config.
    pub fn config(&self) -> Config {
        self.lock_config().clone()
    }

    /// Apply `change` and persist it.
    pub fn update_config(&self, change: impl FnOnce(&mut Config)) -> Result<(), ConfigError> {
        let mut config = self.lock_config();
        match &self.store {
            Some(store) => store.update(&mut config, change),
            None => {
                change(&mut config);
                Ok(())
            }
        }
    }

    /// Re-read the config file.
    pub fn reload_config(&self) -> Result<(), ConfigError> {
        if let Some(store) = &self.store {
            let (config, _) = store.load_reconciled()?;
            *self.lock_config() = config;
            tracing::info!("Reloaded config from {}", store.path().display());
        }
        Ok(())
    }

    pub fn notify(&self, message: &Message, config: &Config) {
        if message.is_success() {
            tracing::info!("{message}");
        } else {
            tracing::warn!("{message}");
        }
        if config.notify {
            self.notifier.notify(message, config.language());
        }
    }

    /// One paste run. Never panics on a failed conversion or insertion; every
    /// outcome ends in a notification.
    pub fn run(&self) {
        let config = self.config();
        let target = self.detector.detect();
        tracing::info!("Detected target app: {target:?}");

        let message = match self.dispatch(target, &config) {
            Ok(message) => message,
            Err(e) => {
                tracing::error!("Paste workflow failed: {e:?}");
                Message::GenericFailure
            }
        };
        self.notify(&message, &config);
    }

    fn dispatch(&self, target: TargetApp, config: &Config) -> anyhow::Result<Message> {
        let snapshot = match self.clipboard.snapshot() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::error!("{e}");
                return Ok(Message::ClipboardReadFailed);
            }
        };

        let content = match classify(&snapshot) {
            ClipboardContent::Empty => return Ok(Message::ClipboardEmpty),
            ClipboardContent::MarkdownFiles { files, failures } => {
                for failure in failures {
                    self.notify(
                        &Message::MarkdownFileReadFailed {
                            file_name: failure.name,
                            error: failure.error,
                        },
                        config,
                    );
                }
                if files.is_empty() {
                    return Ok(Message::ClipboardEmpty);
                }
                ClipboardContent::MarkdownFiles {
                    files,
                    failures: Vec::new(),
                }
            }
            content => content,
        };
        tracing::info!("Clipboard content: {}", content.kind());

        match target {
            TargetApp::Word | TargetApp::Wps => self.document_app_flow(target, content, config),
            TargetApp::Excel | TargetApp::WpsSpreadsheet => {
                self.spreadsheet_app_flow(target, content, config)
            }
            TargetApp::None => Ok(self.no_app_flow(content, config)),
        }
    }

    /// Generate a document and insert it at the cursor.
    fn document_app_flow(
        &self,
        target: TargetApp,
        content: ClipboardContent,
        config: &Config,
    ) -> anyhow::Result<Message> {
        let (input, source) = match content {
            ClipboardContent::HtmlRichText(html) => (DocumentInput::Html(html), Source::Html),
            // A table is just more Markdown to a word processor.
            ClipboardContent::MarkdownTable { markdown, .. }
            | ClipboardContent::MarkdownText(markdown) => {
                (DocumentInput::Markdown(markdown), Source::Text)
            }
            ClipboardContent::MarkdownFiles { files, .. } => (
                DocumentInput::Markdown(merge_markdown(&files)),
                Source::Files(files.len()),
            ),
            ClipboardContent::Empty => return Ok(Message::ClipboardEmpty),
        };

        let bytes = match self.generate_document(&input, config) {
            Ok(bytes) => bytes,
            Err(message) => return Ok(message),
        };

        let app = target.display_name();
        let file = match output::ephemeral_file(
            &bytes,
            ArtifactKind::Document,
            config.resolved_temp_dir().as_deref(),
        ) {
            Ok(file) => file,
            Err(e) => {
                tracing::error!("Could not stage the document for {app}: {e:?}");
                return Ok(Message::DocumentGenerateFailed);
            }
        };
        match self
            .inserter
            .insert_document(target, file.path(), config.move_cursor_to_end)
        {
            Ok(()) => {}
            Err(InsertionError::Unsupported(_)) => {
                tracing::warn!("{app} cannot be scripted here, using the no-app action");
                return Ok(self.fallback_delivery(Artifact::document(bytes), config));
            }
            Err(e) => {
                tracing::error!("Insertion into {app} failed: {e}");
                return Ok(Message::InsertFailed { app });
            }
        }
        drop(file);

        if config.keep_file {
            let artifact = Artifact::document(bytes);
            if let Err(e) = output::write_artifact(&config.resolved_save_dir(), &artifact) {
                tracing::error!("Could not keep the generated document: {e:?}");
                self.notify(&Message::DocumentSaveFailed, config);
            }
        }

        Ok(match source {
            Source::Html => Message::HtmlInserted { app },
            Source::Text => Message::MarkdownInserted { app },
            Source::Files(1) => Message::MarkdownFileInserted { app },
            Source::Files(count) => Message::MarkdownFilesInserted { app, count },
        })
    }

    /// Write a table into cells; anything that is not a table is delivered
    /// as a document through the no-app action.
    fn spreadsheet_app_flow(
        &self,
        target: TargetApp,
        content: ClipboardContent,
        config: &Config,
    ) -> anyhow::Result<Message> {
        if !config.enable_excel {
            tracing::info!("Spreadsheet insertion is disabled, using the no-app action");
            return Ok(self.no_app_flow(content, config));
        }

        let app = target.display_name();
        let content = match content {
            ClipboardContent::MarkdownFiles { files, .. } => match files.into_iter().next() {
                Some(first) => classify_markdown(first.content),
                None => return Ok(Message::ClipboardEmpty),
            },
            content => content,
        };

        match content {
            ClipboardContent::MarkdownTable { markdown, table } => {
                tracing::info!("Inserting a {}-row table into {app}", table.row_count());
                match self
                    .inserter
                    .insert_table(target, &table, config.excel_keep_format)
                {
                    Ok(()) => Ok(Message::TableInserted {
                        app,
                        rows: table.row_count(),
                    }),
                    Err(InsertionError::Unsupported(_)) => {
                        tracing::warn!("{app} cannot be scripted here, using the no-app action");
                        Ok(self.no_app_flow(
                            ClipboardContent::MarkdownTable { markdown, table },
                            config,
                        ))
                    }
                    Err(e) => {
                        tracing::error!("Table insertion into {app} failed: {e}");
                        Ok(Message::TableInsertFailed {
                            app,
                            error: e.to_string(),
                        })
                    }
                }
            }
            _ if config.no_app_action == NoAppAction::None => Ok(Message::TableInvalid { app }),
            content => {
                tracing::info!("Content is not a table, delivering it as a document");
                Ok(self.deliver(content, config.no_app_action, config))
            }
        }
    }

    fn no_app_flow(&self, content: ClipboardContent, config: &Config) -> Message {
        let action = config.no_app_action;
        if action == NoAppAction::None {
            tracing::info!("No application detected and no_app_action is none, skipping");
            return Message::NoAppDetected;
        }

        match content {
            ClipboardContent::MarkdownFiles { files, .. } if files.len() > 1 => {
                let items = files
                    .into_iter()
                    .map(|file| {
                        tracing::info!("Processing Markdown file {}", file.name);
                        self.generate_artifact(classify_markdown(file.content), config)
                            .map_err(|message| anyhow::anyhow!("{}: {message}", file.name))
                    })
                    .collect();
                self.executor().execute_batch(action, items, 0, config)
            }
            ClipboardContent::MarkdownFiles { files, .. } => match files.into_iter().next() {
                Some(file) => self.deliver(classify_markdown(file.content), action, config),
                None => Message::ClipboardEmpty,
            },
            content => self.deliver(content, action, config),
        }
    }

    fn executor(&self) -> OutputExecutor<'_> {
        OutputExecutor::new(self.clipboard.as_ref(), self.launcher.as_ref())
    }

    fn deliver(&self, content: ClipboardContent, action: NoAppAction, config: &Config) -> Message {
        match self.generate_artifact(content, config) {
            Ok(artifact) => self.executor().execute(action, &artifact, config),
            Err(message) => message,
        }
    }

    /// Hand an already generated artifact to the no-app action.
    fn fallback_delivery(&self, artifact: Artifact, config: &Config) -> Message {
        match config.no_app_action {
            NoAppAction::None => Message::NoAppDetected,
            action => self.executor().execute(action, &artifact, config),
        }
    }

    /// A table becomes a spreadsheet when spreadsheets are enabled, everything
    /// else a document.
    fn generate_artifact(
        &self,
        content: ClipboardContent,
        config: &Config,
    ) -> Result<Artifact, Message> {
        match content {
            ClipboardContent::HtmlRichText(html) => self
                .generate_document(&DocumentInput::Html(html), config)
                .map(Artifact::document),
            ClipboardContent::MarkdownTable { table, .. } if config.enable_excel => self
                .sheets
                .table_to_xlsx(&table, config.excel_keep_format)
                .map(Artifact::spreadsheet)
                .map_err(|e| {
                    tracing::error!("{e}");
                    Message::TableExportFailed
                }),
            ClipboardContent::MarkdownTable { markdown, .. }
            | ClipboardContent::MarkdownText(markdown) => self
                .generate_document(&DocumentInput::Markdown(markdown), config)
                .map(Artifact::document),
            ClipboardContent::MarkdownFiles { files, .. } => self
                .generate_document(&DocumentInput::Markdown(merge_markdown(&files)), config)
                .map(Artifact::document),
            ClipboardContent::Empty => Err(Message::ClipboardEmpty),
        }
    }

    fn generate_document(
        &self,
        input: &DocumentInput,
        config: &Config,
    ) -> Result<Vec<u8>, Message> {
        let text = match input {
            DocumentInput::Markdown(text) | DocumentInput::Html(text) => text,
        };
        let lines = markdown::line_count(text);
        if lines >= LARGE_INPUT_LINES {
            self.notify(&Message::ConversionStarted { lines }, config);
        }

        let result = match input {
            DocumentInput::Markdown(md) => self.documents.markdown_to_docx(md, config),
            DocumentInput::Html(html) => self.documents.html_to_docx(html, config),
        };
        self.persist_corrected_converter_path();

        result.map_err(|e| {
            tracing::error!("Document conversion failed: {e}");
            match input {
                DocumentInput::Markdown(_) => Message::MarkdownConvertFailed,
                DocumentInput::Html(_) => Message::HtmlConvertFailed,
            }
        })
    }

    fn persist_corrected_converter_path(&self) {
        let Some(path) = self.documents.take_corrected_path() else {
            return;
        };
        tracing::info!("Saving working converter path {path:?}");
        if let Err(e) = self.update_config(|config| config.pandoc_path = path) {
            tracing::warn!("Could not save the converter path: {e}");
        }
    }
}
