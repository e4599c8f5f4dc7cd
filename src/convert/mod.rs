//! Markdown/HTML to document generation.
//!
//! The heavy lifting is done by an external converter behind [`Converter`];
//! this module prepares the input, picks options from the config and
//! post-processes the result.

pub mod docx;
pub mod pandoc;
pub mod sheet;

use crate::clipboard::html::clean_html;
use crate::config::Config;
use crate::error::ConversionError;
use crate::markdown;
use std::path::PathBuf;

pub use pandoc::Pandoc;
pub use sheet::SpreadsheetGenerator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Markdown,
    Html,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConvertOptions {
    /// Converter executable as configured.
    pub converter_path: String,
    pub reference_docx: Option<PathBuf>,
    pub keep_original_formula: bool,
    pub filters: Vec<PathBuf>,
    pub working_dir: Option<PathBuf>,
}

impl ConvertOptions {
    pub fn from_config(config: &Config) -> Self {
        let working_dir = config.resolved_save_dir();
        Self {
            converter_path: config.pandoc_path.clone(),
            reference_docx: config
                .reference_docx
                .as_deref()
                .filter(|path| !path.trim().is_empty())
                .map(crate::config::expand_path),
            keep_original_formula: config.keep_original_formula,
            filters: config
                .pandoc_filters
                .iter()
                .filter(|path| !path.trim().is_empty())
                .map(|path| crate::config::expand_path(path))
                .collect(),
            working_dir: working_dir.is_dir().then_some(working_dir),
        }
    }
}

pub trait Converter: Send + Sync {
    fn to_docx(
        &self,
        input: &str,
        format: InputFormat,
        options: &ConvertOptions,
    ) -> Result<Vec<u8>, ConversionError>;

    /// A converter path that had to replace the configured one, reported once.
    fn take_corrected_path(&self) -> Option<String> {
        None
    }
}

/// Turns clipboard text into DOCX bytes.
pub struct DocumentGenerator {
    converter: Box<dyn Converter>,
}

impl DocumentGenerator {
    pub fn new(converter: Box<dyn Converter>) -> Self {
        Self { converter }
    }

    pub fn markdown_to_docx(&self, md: &str, config: &Config) -> Result<Vec<u8>, ConversionError> {
        let md = markdown::normalize(md);
        let bytes = self.converter.to_docx(
            &md,
            InputFormat::Markdown,
            &ConvertOptions::from_config(config),
        )?;
        Self::post_process(bytes, config.md_disable_first_para_indent)
    }

    pub fn html_to_docx(&self, html: &str, config: &Config) -> Result<Vec<u8>, ConversionError> {
        let html = clean_html(html, &config.html_formatting);
        let bytes = self.converter.to_docx(
            &html,
            InputFormat::Html,
            &ConvertOptions::from_config(config),
        )?;
        Self::post_process(bytes, config.html_disable_first_para_indent)
    }

    pub fn take_corrected_path(&self) -> Option<String> {
        self.converter.take_corrected_path()
    }

    fn post_process(
        bytes: Vec<u8>,
        disable_first_para_indent: bool,
    ) -> Result<Vec<u8>, ConversionError> {
        if bytes.is_empty() {
            return Err(ConversionError::EmptyOutput);
        }
        if disable_first_para_indent {
            docx::suppress_first_paragraph_indent(&bytes)
        } else {
            Ok(bytes)
        }
    }
}
