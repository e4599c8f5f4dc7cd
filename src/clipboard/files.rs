//! Markdown files dropped onto the clipboard.

use std::fs;
use std::path::{Path, PathBuf};

const MARKDOWN_EXTENSIONS: [&str; 6] = ["md", "markdown", "mdown", "mkd", "mkdn", "mdx"];

/// Separator placed between merged files.
pub const MERGE_SEPARATOR: &str = "\n\n---\n\n";

#[derive(Debug, Clone, PartialEq)]
pub struct MarkdownFile {
    pub name: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileReadFailure {
    pub name: String,
    pub error: String,
}

pub fn is_markdown_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            MARKDOWN_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Read every Markdown file in `paths`, in order. Non-Markdown paths are
/// skipped silently; unreadable Markdown files are reported per file.
pub fn read_markdown_files(paths: &[PathBuf]) -> (Vec<MarkdownFile>, Vec<FileReadFailure>) {
    let mut files = Vec::new();
    let mut failures = Vec::new();

    for path in paths.iter().filter(|path| is_markdown_path(path)) {
        let name = display_name(path);
        match fs::read(path)
            .map_err(|e| e.to_string())
            .and_then(|bytes| decode_text(&bytes))
        {
            Ok(content) => files.push(MarkdownFile {
                name,
                content,
            }),
            Err(error) => {
                tracing::warn!("Could not read Markdown file {}: {error}", path.display());
                failures.push(FileReadFailure { name, error });
            }
        }
    }

    (files, failures)
}

/// UTF-8 (with or without BOM), then UTF-16 with a BOM.
pub fn decode_text(bytes: &[u8]) -> Result<String, String> {
    if let Some(rest) = bytes.strip_prefix(b"\xEF\xBB\xBF") {
        return String::from_utf8(rest.to_vec()).map_err(|e| e.to_string());
    }
    if let Some(rest) = bytes.strip_prefix(b"\xFF\xFE") {
        return decode_utf16(rest, u16::from_le_bytes);
    }
    if let Some(rest) = bytes.strip_prefix(b"\xFE\xFF") {
        return decode_utf16(rest, u16::from_be_bytes);
    }
    String::from_utf8(bytes.to_vec()).map_err(|_| "file is not valid UTF-8 text".to_string())
}

fn decode_utf16(bytes: &[u8], to_unit: fn([u8; 2]) -> u16) -> Result<String, String> {
    if bytes.len() % 2 != 0 {
        return Err("truncated UTF-16 text".to_string());
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| to_unit([pair[0], pair[1]]))
        .collect();
    String::from_utf16(&units).map_err(|e| e.to_string())
}

/// Concatenate file contents into one logical document.
pub fn merge_markdown(files: &[MarkdownFile]) -> String {
    files
        .iter()
        .map(|file| file.content.trim_end_matches(['\r', '\n']))
        .collect::<Vec<_>>()
        .join(MERGE_SEPARATOR)
}
