//! User-facing notification messages.

use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    Zh,
    #[default]
    En,
}

impl Language {
    /// Unknown codes fall back to English.
    pub fn from_code(code: &str) -> Self {
        let code = code.trim().to_ascii_lowercase();
        if code == "zh" || code.starts_with("zh-") || code.starts_with("zh_") {
            Language::Zh
        } else {
            Language::En
        }
    }
}

/// Which kind of artifact an output action produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    Document,
    Spreadsheet,
}

/// Every outcome the user can be told about.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    ClipboardEmpty,
    ClipboardReadFailed,
    MarkdownConvertFailed,
    HtmlConvertFailed,
    ConversionStarted { lines: usize },
    MarkdownInserted { app: &'static str },
    HtmlInserted { app: &'static str },
    MarkdownFileInserted { app: &'static str },
    MarkdownFilesInserted { app: &'static str, count: usize },
    InsertFailed { app: &'static str },
    TableInserted { app: &'static str, rows: usize },
    TableInsertFailed { app: &'static str, error: String },
    TableInvalid { app: &'static str },
    NoAppDetected,
    Opened { kind: ArtifactKind, path: PathBuf },
    Saved { kind: ArtifactKind, path: PathBuf },
    CopiedToClipboard { kind: ArtifactKind },
    OpenFailed { path: PathBuf },
    ClipboardActionFailed,
    DocumentGenerateFailed,
    DocumentSaveFailed,
    TableExportFailed,
    BatchSummary { succeeded: usize, failed: usize },
    MarkdownFileReadFailed { file_name: String, error: String },
    GenericFailure,
}

impl Message {
    pub fn is_success(&self) -> bool {
        match self {
            Message::ConversionStarted { .. }
            | Message::MarkdownInserted { .. }
            | Message::HtmlInserted { .. }
            | Message::MarkdownFileInserted { .. }
            | Message::MarkdownFilesInserted { .. }
            | Message::TableInserted { .. }
            | Message::Opened { .. }
            | Message::Saved { .. }
            | Message::CopiedToClipboard { .. } => true,
            Message::BatchSummary { failed, .. } => *failed == 0,
            _ => false,
        }
    }

    pub fn text(&self, language: Language) -> String {
        match language {
            Language::En => self.english(),
            Language::Zh => self.chinese(),
        }
    }

    fn english(&self) -> String {
        match self {
            Message::ClipboardEmpty => "Clipboard is empty or holds no Markdown".to_string(),
            Message::ClipboardReadFailed => "Could not read the clipboard".to_string(),
            Message::MarkdownConvertFailed => {
                "Markdown conversion failed, check the converter path and your content".to_string()
            }
            Message::HtmlConvertFailed => "Rich text conversion failed".to_string(),
            Message::ConversionStarted { lines } => {
                format!("Converting {lines} lines, this may take a moment...")
            }
            Message::MarkdownInserted { app } => format!("Converted and inserted into {app}"),
            Message::HtmlInserted { app } => format!("Rich text inserted into {app}"),
            Message::MarkdownFileInserted { app } => format!("Markdown file inserted into {app}"),
            Message::MarkdownFilesInserted { app, count } => {
                format!("{count} Markdown files merged and inserted into {app}")
            }
            Message::InsertFailed { app } => {
                format!("Could not insert, make sure a {app} document is open")
            }
            Message::TableInserted { app, rows } => format!("Inserted {rows} rows into {app}"),
            Message::TableInsertFailed { app, error } => {
                format!("Could not insert the table into {app}: {error}")
            }
            Message::TableInvalid { app } => {
                format!("Clipboard content is not a Markdown table, nothing inserted into {app}")
            }
            Message::NoAppDetected => {
                "No Word, WPS or Excel window is focused, nothing was pasted".to_string()
            }
            Message::Opened { kind, path } => {
                format!("{} created and opened: {}", kind.english(), path.display())
            }
            Message::Saved { kind, path } => {
                format!("{} saved to {}", kind.english(), path.display())
            }
            Message::CopiedToClipboard { kind } => {
                format!("{} copied to the clipboard, paste it where you need it", kind.english())
            }
            Message::OpenFailed { path } => {
                format!("File saved but could not be opened: {}", path.display())
            }
            Message::ClipboardActionFailed => "Could not copy the file to the clipboard".to_string(),
            Message::DocumentGenerateFailed => "Could not generate the document".to_string(),
            Message::DocumentSaveFailed => "Could not save the document".to_string(),
            Message::TableExportFailed => "Could not export the table".to_string(),
            Message::BatchSummary { succeeded, failed } => {
                format!("Batch finished: {succeeded} succeeded, {failed} failed")
            }
            Message::MarkdownFileReadFailed { file_name, error } => {
                format!("Could not read {file_name}: {error}")
            }
            Message::GenericFailure => "Operation failed, see the log for details".to_string(),
        }
    }

    fn chinese(&self) -> String {
        match self {
            Message::ClipboardEmpty => "剪贴板为空或没有 Markdown 内容".to_string(),
            Message::ClipboardReadFailed => "剪贴板读取失败".to_string(),
            Message::MarkdownConvertFailed => "Markdown 转换失败，请检查 Pandoc 路径和内容".to_string(),
            Message::HtmlConvertFailed => "富文本转换失败".to_string(),
            Message::ConversionStarted { lines } => format!("正在转换 {lines} 行内容，请稍候..."),
            Message::MarkdownInserted { app } => format!("已转换并插入到 {app}"),
            Message::HtmlInserted { app } => format!("富文本已插入到 {app}"),
            Message::MarkdownFileInserted { app } => format!("Markdown 文件已插入到 {app}"),
            Message::MarkdownFilesInserted { app, count } => {
                format!("已合并 {count} 个 Markdown 文件并插入到 {app}")
            }
            Message::InsertFailed { app } => format!("插入失败，请确认 {app} 文档已打开"),
            Message::TableInserted { app, rows } => format!("已插入 {rows} 行到 {app}"),
            Message::TableInsertFailed { app, error } => format!("表格插入 {app} 失败：{error}"),
            Message::TableInvalid { app } => {
                format!("剪贴板内容不是 Markdown 表格，未插入到 {app}")
            }
            Message::NoAppDetected => "未检测到 Word、WPS 或 Excel 窗口，未执行粘贴".to_string(),
            Message::Opened { kind, path } => {
                format!("已创建并打开{}：{}", kind.chinese(), path.display())
            }
            Message::Saved { kind, path } => {
                format!("{}已保存到 {}", kind.chinese(), path.display())
            }
            Message::CopiedToClipboard { kind } => {
                format!("{}已复制到剪贴板，可直接粘贴", kind.chinese())
            }
            Message::OpenFailed { path } => format!("文件已保存但无法打开：{}", path.display()),
            Message::ClipboardActionFailed => "复制文件到剪贴板失败".to_string(),
            Message::DocumentGenerateFailed => "文档生成失败".to_string(),
            Message::DocumentSaveFailed => "文档保存失败".to_string(),
            Message::TableExportFailed => "表格导出失败".to_string(),
            Message::BatchSummary { succeeded, failed } => {
                format!("批量处理完成：成功 {succeeded} 个，失败 {failed} 个")
            }
            Message::MarkdownFileReadFailed { file_name, error } => {
                format!("读取 {file_name} 失败：{error}")
            }
            Message::GenericFailure => "操作失败，请查看日志".to_string(),
        }
    }
}

impl ArtifactKind {
    fn english(self) -> &'static str {
        match self {
            ArtifactKind::Document => "Document",
            ArtifactKind::Spreadsheet => "Spreadsheet",
        }
    }

    fn chinese(self) -> &'static str {
        match self {
            ArtifactKind::Document => "文档",
            ArtifactKind::Spreadsheet => "表格",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ArtifactKind::Document => "docx",
            ArtifactKind::Spreadsheet => "xlsx",
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.english())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn language_codes() {
        assert_eq!(Language::from_code("zh"), Language::Zh);
        assert_eq!(Language::from_code("zh-CN"), Language::Zh);
        assert_eq!(Language::from_code("en"), Language::En);
        assert_eq!(Language::from_code("fr"), Language::En);
    }

    #[test]
    fn batch_summary_reports_counts() {
        let message = Message::BatchSummary {
            succeeded: 2,
            failed: 1,
        };
        assert!(!message.is_success());
        assert_eq!(
            message.text(Language::En),
            "Batch finished: 2 succeeded, 1 failed"
        );
        assert!(Message::BatchSummary { succeeded: 3, failed: 0 }.is_success());
    }

    #[test]
    fn failures_are_not_success() {
        assert!(!Message::NoAppDetected.is_success());
        assert!(!Message::GenericFailure.is_success());
        assert!(Message::MarkdownInserted { app: "Word" }.is_success());
    }
}
