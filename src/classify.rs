//! Deciding what kind of content is on the clipboard.

use crate::clipboard::files::{read_markdown_files, FileReadFailure, MarkdownFile};
use crate::clipboard::html::is_plain_html_fragment;
use crate::clipboard::ClipboardSnapshot;
use crate::markdown::{parse_markdown_table, Table};

#[derive(Debug, Clone, PartialEq)]
pub enum ClipboardContent {
    HtmlRichText(String),
    /// Text that is, in its entirety, one Markdown table.
    MarkdownTable {
        markdown: String,
        table: Table,
    },
    MarkdownText(String),
    /// Markdown files referenced by the clipboard. `files` may be empty when
    /// every referenced file failed to read.
    MarkdownFiles {
        files: Vec<MarkdownFile>,
        failures: Vec<FileReadFailure>,
    },
    Empty,
}

impl ClipboardContent {
    pub fn kind(&self) -> &'static str {
        match self {
            ClipboardContent::HtmlRichText(_) => "html-rich-text",
            ClipboardContent::MarkdownTable { .. } => "markdown-table",
            ClipboardContent::MarkdownText(_) => "markdown-text",
            ClipboardContent::MarkdownFiles { .. } => "markdown-files",
            ClipboardContent::Empty => "empty",
        }
    }
}

type Probe = fn(&ClipboardSnapshot) -> Option<ClipboardContent>;

/// Tried in order; the first probe that recognises the snapshot wins.
const PROBES: [Probe; 3] = [rich_html, markdown_text, markdown_files];

pub fn classify(snapshot: &ClipboardSnapshot) -> ClipboardContent {
    PROBES
        .iter()
        .find_map(|probe| probe(snapshot))
        .unwrap_or(ClipboardContent::Empty)
}

/// Markdown text, or a table when the whole text is one.
pub fn classify_markdown(markdown: String) -> ClipboardContent {
    match parse_markdown_table(&markdown) {
        Some(table) => ClipboardContent::MarkdownTable { markdown, table },
        None => ClipboardContent::MarkdownText(markdown),
    }
}

fn rich_html(snapshot: &ClipboardSnapshot) -> Option<ClipboardContent> {
    let html = snapshot.html.as_deref().filter(|_| snapshot.has_html())?;
    if is_plain_html_fragment(html) {
        tracing::debug!("HTML fragment carries no formatting, using text instead");
        return None;
    }
    Some(ClipboardContent::HtmlRichText(html.to_string()))
}

fn markdown_text(snapshot: &ClipboardSnapshot) -> Option<ClipboardContent> {
    let text = snapshot.text.as_deref().filter(|_| snapshot.has_text())?;
    Some(classify_markdown(text.to_string()))
}

fn markdown_files(snapshot: &ClipboardSnapshot) -> Option<ClipboardContent> {
    let (files, failures) = read_markdown_files(&snapshot.files);
    if files.is_empty() && failures.is_empty() {
        return None;
    }
    Some(ClipboardContent::MarkdownFiles { files, failures })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const TABLE: &str = "| name | qty |\n|------|-----|\n| apple | 3 |\n| pear | 5 |";

    fn text(text: &str) -> ClipboardSnapshot {
        ClipboardSnapshot {
            text: Some(text.to_string()),
            ..ClipboardSnapshot::default()
        }
    }

    #[test]
    fn whole_table_is_a_table() {
        assert!(matches!(
            classify(&text(TABLE)),
            ClipboardContent::MarkdownTable { .. }
        ));
    }

    #[test]
    fn table_with_a_paragraph_is_text() {
        let mixed = format!("{TABLE}\n\nTotal is eight.");
        assert_eq!(
            classify(&text(&mixed)),
            ClipboardContent::MarkdownText(mixed)
        );
    }

    #[test]
    fn plain_html_falls_back_to_text() {
        let snapshot = ClipboardSnapshot {
            text: Some("# Title\n\n**bold**".to_string()),
            html: Some("<div><span># Title</span><br><span>**bold**</span></div>".to_string()),
            files: Vec::new(),
        };
        assert_eq!(classify(&snapshot).kind(), "markdown-text");
    }

    #[test]
    fn formatted_html_wins() {
        let snapshot = ClipboardSnapshot {
            text: Some("Title bold".to_string()),
            html: Some("<h1>Title</h1><p><strong>bold</strong> and <em>it</em></p>".to_string()),
            files: Vec::new(),
        };
        assert_eq!(classify(&snapshot).kind(), "html-rich-text");
    }

    #[test]
    fn blank_everything_is_empty() {
        let snapshot = ClipboardSnapshot {
            text: Some("   \n".to_string()),
            html: Some(" ".to_string()),
            files: vec!["notes.txt".into()],
        };
        assert_eq!(classify(&snapshot), ClipboardContent::Empty);
    }

    #[test]
    fn markdown_files_are_read_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.md");
        let b = dir.path().join("b.MARKDOWN");
        fs::write(&a, "# A").unwrap();
        fs::write(&b, "# B").unwrap();

        let snapshot = ClipboardSnapshot {
            files: vec![a, dir.path().join("skip.txt"), b, dir.path().join("gone.md")],
            ..ClipboardSnapshot::default()
        };
        match classify(&snapshot) {
            ClipboardContent::MarkdownFiles { files, failures } => {
                let names: Vec<_> = files.iter().map(|f| f.name.as_str()).collect();
                assert_eq!(names, ["a.md", "b.MARKDOWN"]);
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].name, "gone.md");
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}
