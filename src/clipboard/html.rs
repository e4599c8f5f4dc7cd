//! HTML clipboard payload handling: fragment extraction, cleanup and the
//! "is this just Markdown wrapped in HTML" check.

use crate::config::HtmlFormatting;
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

type Probe = fn(&str) -> Option<String>;

/// Fragment probes, tried in order. The first hit wins.
const FRAGMENT_PROBES: [(&str, Probe); 3] = [
    ("fragment offsets", by_fragment_offsets),
    ("fragment anchors", by_comment_anchors),
    ("html offsets", by_html_offsets),
];

/// Pull the copied fragment out of a CF_HTML style payload. Payloads without
/// any header or markers are returned as they are.
pub fn extract_fragment(raw: &str) -> String {
    FRAGMENT_PROBES
        .iter()
        .find_map(|(name, probe)| {
            probe(raw).inspect(|fragment| {
                tracing::debug!("HTML fragment found by {name} ({} bytes)", fragment.len())
            })
        })
        .unwrap_or_else(|| raw.to_string())
}

/// `Key:Value` header lines that precede the markup.
fn header(raw: &str) -> HashMap<&str, &str> {
    raw.lines()
        .take_while(|line| !line.trim_start().starts_with('<'))
        .filter_map(|line| line.split_once(':'))
        .map(|(key, value)| (key.trim(), value.trim()))
        .collect()
}

fn slice_by_header(raw: &str, start_key: &str, end_key: &str) -> Option<String> {
    let meta = header(raw);
    let start: usize = meta.get(start_key)?.parse().ok()?;
    let end: usize = meta.get(end_key)?.parse().ok()?;
    if start >= end {
        return None;
    }
    raw.get(start..end).map(str::to_string)
}

fn by_fragment_offsets(raw: &str) -> Option<String> {
    slice_by_header(raw, "StartFragment", "EndFragment")
}

fn by_html_offsets(raw: &str) -> Option<String> {
    slice_by_header(raw, "StartHTML", "EndHTML")
}

fn by_comment_anchors(raw: &str) -> Option<String> {
    const START: &str = "<!--StartFragment-->";
    const END: &str = "<!--EndFragment-->";
    let start = raw.find(START)? + START.len();
    let end = raw.rfind(END)?;
    (start <= end).then(|| raw[start..end].to_string())
}

static SVG_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<svg\b[^>]*>.*?</svg\s*>|<svg\b[^>]*/>").unwrap());
static SVG_IMG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<img\b[^>]*\bsrc\s*=\s*["'][^"']*\.svg(?:\?[^"']*)?["'][^>]*>"#).unwrap()
});
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").unwrap());
static STRIKETHROUGH: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"~~([^~]+?)~~").unwrap());

/// Remove content the converter cannot use and apply formatting rules.
pub fn clean_html(html: &str, formatting: &HtmlFormatting) -> String {
    let html = SVG_BLOCK.replace_all(html, "");
    let html = SVG_IMG.replace_all(&html, "");

    if !formatting.strikethrough_to_del {
        return html.into_owned();
    }

    // Only touch text between tags, never attribute values.
    let mut cleaned = String::with_capacity(html.len());
    let mut last = 0;
    for tag in TAG.find_iter(&html) {
        cleaned.push_str(&STRIKETHROUGH.replace_all(&html[last..tag.start()], "<del>$1</del>"));
        cleaned.push_str(tag.as_str());
        last = tag.end();
    }
    cleaned.push_str(&STRIKETHROUGH.replace_all(&html[last..], "<del>$1</del>"));
    cleaned
}

static IGNORED_BLOCKS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<!--.*?-->|<style\b[^>]*>.*?</style\s*>|<script\b[^>]*>.*?</script\s*>")
        .unwrap()
});
static TAG_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<\s*/?\s*([A-Za-z][A-Za-z0-9:-]*)").unwrap());

/// Tags that only wrap text. Editors that copy Markdown source as HTML emit
/// nothing else, whatever inline styles they attach.
const WRAPPER_TAGS: [&str; 11] = [
    "html", "head", "body", "meta", "title", "div", "p", "span", "br", "font", "o:p",
];

/// True when the fragment carries no structure beyond wrapper tags, i.e. it
/// is a re-serialisation of plain text (typically Markdown source) rather than
/// rich content. Inline styles are ignored; only element names decide.
pub fn is_plain_html_fragment(html: &str) -> bool {
    let stripped = IGNORED_BLOCKS.replace_all(html, "");
    TAG_NAME
        .captures_iter(&stripped)
        .filter_map(|caps| caps.get(1))
        .map(|name| name.as_str().to_ascii_lowercase())
        .all(|name| WRAPPER_TAGS.contains(&name.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cf_html(fragment: &str) -> String {
        let prefix = "<html><body>\r\n<!--StartFragment-->";
        let suffix = "<!--EndFragment-->\r\n</body></html>";
        let header_len = "Version:0.9\r\nStartHTML:0000000000\r\nEndHTML:0000000000\r\nStartFragment:0000000000\r\nEndFragment:0000000000\r\n".len();
        let start_fragment = header_len + prefix.len();
        let end_fragment = start_fragment + fragment.len();
        let end_html = end_fragment + suffix.len();
        format!(
            "Version:0.9\r\nStartHTML:{header_len:010}\r\nEndHTML:{end_html:010}\r\nStartFragment:{start_fragment:010}\r\nEndFragment:{end_fragment:010}\r\n{prefix}{fragment}{suffix}"
        )
    }

    #[test]
    fn fragment_by_offsets() {
        assert_eq!(extract_fragment(&cf_html("<b>bold</b>")), "<b>bold</b>");
        assert_eq!(extract_fragment(&cf_html("<i>中文</i>")), "<i>中文</i>");
    }

    #[test]
    fn fragment_by_anchors_when_offsets_are_bad() {
        let raw = "Version:0.9\r\nStartFragment:9999\r\nEndFragment:10000\r\n<html><!--StartFragment--><i>x</i><!--EndFragment--></html>";
        assert_eq!(extract_fragment(raw), "<i>x</i>");
    }

    #[test]
    fn fragment_passthrough_without_markers() {
        assert_eq!(extract_fragment("<p>hello</p>"), "<p>hello</p>");
    }

    #[test]
    fn clean_removes_svg() {
        let html = r#"<p>a<svg width="1"><path d="M0"/></svg>b<img src="x/logo.SVG"><img src="y.png"></p>"#;
        let cleaned = clean_html(html, &HtmlFormatting::default());
        assert_eq!(cleaned, r#"<p>ab<img src="y.png"></p>"#);
    }

    #[test]
    fn clean_converts_strikethrough_in_text_only() {
        let html = r#"<a title="~~keep~~">~~gone~~ text</a>"#;
        let cleaned = clean_html(html, &HtmlFormatting::default());
        assert_eq!(cleaned, r#"<a title="~~keep~~"><del>gone</del> text</a>"#);

        let off = HtmlFormatting {
            strikethrough_to_del: false,
            ..HtmlFormatting::default()
        };
        assert_eq!(clean_html("~~x~~", &off), "~~x~~");
    }

    #[test]
    fn markdown_source_copied_from_editor_is_plain() {
        let html = r#"<meta charset='utf-8'><div style="color: #d4d4d4;font-family: Consolas;"><div><span style="color: #569cd6;font-weight: bold;"># Title</span></div><br><div><span>Some **bold** text</span></div></div>"#;
        assert!(is_plain_html_fragment(html));
    }

    #[test]
    fn bold_and_italic_markup_is_rich() {
        assert!(!is_plain_html_fragment("<p>Some <b>bold</b> text</p>"));
        assert!(!is_plain_html_fragment("<p>Some <em>italic</em> text</p>"));
        assert!(!is_plain_html_fragment("<h1>Title</h1>"));
        assert!(!is_plain_html_fragment("<table><tr><td>1</td></tr></table>"));
    }

    #[test]
    fn comments_and_styles_do_not_count() {
        assert!(is_plain_html_fragment(
            "<!-- <b>not real</b> --><style>b { color: red }</style><p>text</p>"
        ));
    }
}
