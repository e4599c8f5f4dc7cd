//! System clipboard access.

pub mod files;
pub mod html;

use crate::error::ClipboardError;
use anyhow::anyhow;
use arboard::Clipboard;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};
use std::{thread, time::Duration};

const READ_RETRIES: u32 = 3;
const READ_RETRY_DELAY_MS: u64 = 30;

/// One read of everything the workflow cares about.
///
/// Taken fresh on every trigger, never cached.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClipboardSnapshot {
    pub text: Option<String>,
    /// HTML fragment with any CF_HTML header already stripped.
    pub html: Option<String>,
    pub files: Vec<PathBuf>,
}

impl ClipboardSnapshot {
    pub fn has_text(&self) -> bool {
        self.text.as_deref().is_some_and(|text| !text.trim().is_empty())
    }

    pub fn has_html(&self) -> bool {
        self.html.as_deref().is_some_and(|html| !html.trim().is_empty())
    }
}

pub trait ClipboardSource: Send + Sync {
    fn snapshot(&self) -> Result<ClipboardSnapshot, ClipboardError>;

    fn set_text(&self, text: &str) -> Result<(), ClipboardError>;
}

/// Clipboard backed by `arboard`.
pub struct SystemClipboard {
    clipboard: Mutex<Clipboard>,
}

impl SystemClipboard {
    pub fn new() -> anyhow::Result<Self> {
        let clipboard = Clipboard::new()
            .map_err(|e| anyhow!("Could not create a clipboard instance: {e}"))?;
        Ok(Self {
            clipboard: clipboard.into(),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Clipboard>, ClipboardError> {
        self.clipboard
            .lock()
            .map_err(|e| ClipboardError::Unavailable(format!("clipboard lock poisoned: {e}")))
    }

    fn read_text(clipboard: &mut Clipboard) -> Result<Option<String>, ClipboardError> {
        let mut last_error = None;

        // Other applications may hold the clipboard for a moment.
        for _ in 0..READ_RETRIES {
            match clipboard.get_text() {
                Ok(text) => return Ok(Some(text)),
                Err(arboard::Error::ContentNotAvailable) => return Ok(None),
                Err(e) => {
                    last_error = Some(e);
                    thread::sleep(Duration::from_millis(READ_RETRY_DELAY_MS));
                }
            }
        }

        Err(ClipboardError::ReadText(
            last_error.map(|e| e.to_string()).unwrap_or_default(),
        ))
    }

    fn read_html(clipboard: &mut Clipboard) -> Option<String> {
        match clipboard.get().html() {
            Ok(raw) => Some(html::extract_fragment(&raw)),
            Err(arboard::Error::ContentNotAvailable) => None,
            Err(e) => {
                tracing::debug!("HTML clipboard format not readable: {e}");
                None
            }
        }
    }

    fn read_files(clipboard: &mut Clipboard) -> Vec<PathBuf> {
        match clipboard.get().file_list() {
            Ok(files) => files,
            Err(arboard::Error::ContentNotAvailable) => Vec::new(),
            Err(e) => {
                tracing::debug!("File list clipboard format not readable: {e}");
                Vec::new()
            }
        }
    }
}

impl ClipboardSource for SystemClipboard {
    fn snapshot(&self) -> Result<ClipboardSnapshot, ClipboardError> {
        let mut clipboard = self.lock()?;

        let text = Self::read_text(&mut clipboard)?;
        let html = Self::read_html(&mut clipboard);
        let files = if text.as_deref().is_some_and(|t| !t.trim().is_empty()) {
            Vec::new()
        } else {
            Self::read_files(&mut clipboard)
        };

        tracing::debug!(
            "Clipboard snapshot: text={} html={} files={}",
            text.as_ref().map_or(0, String::len),
            html.as_ref().map_or(0, String::len),
            files.len()
        );

        Ok(ClipboardSnapshot { text, html, files })
    }

    fn set_text(&self, text: &str) -> Result<(), ClipboardError> {
        self.lock()?
            .set_text(text.to_string())
            .map_err(|e| ClipboardError::Write(e.to_string()))
    }
}
