//! Markdown pipe tables to typed cell grids.

use regex::Regex;
use std::sync::LazyLock;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InlineStyle {
    pub bold: bool,
    pub italic: bool,
    pub strikethrough: bool,
    pub code: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Number(f64),
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cell {
    pub value: CellValue,
    pub style: InlineStyle,
}

impl Cell {
    pub fn text(value: &str) -> Self {
        Self {
            value: CellValue::Text(value.to_string()),
            style: InlineStyle::default(),
        }
    }
}

/// A parsed table. The first row is the header; all rows share its width.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.rows.first().map_or(0, Vec::len)
    }
}

static DELIMITER_CELL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^:?-+:?$").unwrap());

/// Parse `text` as a single pipe table.
///
/// Returns `None` unless every non-blank line belongs to the table: a header
/// row, a delimiter row with a matching column count, then body rows. Blank
/// lines are only allowed before and after the table.
pub fn parse_markdown_table(text: &str) -> Option<Table> {
    let lines: Vec<&str> = text.lines().map(str::trim).collect();
    let first = lines.iter().position(|line| !line.is_empty())?;
    let last = lines.iter().rposition(|line| !line.is_empty())?;
    let lines = &lines[first..=last];

    if lines.len() < 2 || lines.iter().any(|line| !line.contains('|')) {
        return None;
    }

    let header = split_row(lines[0]);
    let delimiter = split_row(lines[1]);
    if header.is_empty()
        || delimiter.len() != header.len()
        || !delimiter.iter().all(|cell| DELIMITER_CELL.is_match(cell))
    {
        return None;
    }

    let width = header.len();
    let mut rows = vec![header.iter().map(|raw| parse_cell(raw)).collect::<Vec<_>>()];
    for line in &lines[2..] {
        let mut cells: Vec<Cell> = split_row(line).iter().map(|raw| parse_cell(raw)).collect();
        cells.resize_with(width, || Cell::text(""));
        rows.push(cells);
    }

    Some(Table { rows })
}

/// Split on unescaped pipes, dropping the optional outer pipes.
fn split_row(line: &str) -> Vec<String> {
    let mut line = line.trim();
    if let Some(rest) = line.strip_prefix('|') {
        line = rest;
    }
    if line.ends_with('|') && !line.ends_with("\\|") {
        line = &line[..line.len() - 1];
    }

    let mut cells = Vec::new();
    let mut current = String::new();
    let mut in_code = false;
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' if chars.peek() == Some(&'|') => {
                current.push('|');
                chars.next();
            }
            '`' => {
                in_code = !in_code;
                current.push(c);
            }
            '|' if !in_code => cells.push(std::mem::take(&mut current).trim().to_string()),
            _ => current.push(c),
        }
    }
    cells.push(current.trim().to_string());
    cells
}

static CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"`([^`]+)`").unwrap());
static BOLD_ITALIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*\*(.+?)\*\*\*|___(.+?)___").unwrap());
static BOLD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*\*(.+?)\*\*|__(.+?)__").unwrap());
static ITALIC: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*([^*]+?)\*|\b_([^_]+?)_\b").unwrap());
static STRIKE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"~~(.+?)~~").unwrap());
static LINE_BREAK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>").unwrap());
static PLAIN_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-]?(?:0|[1-9]\d*)(?:\.\d+)?(?:[eE][+-]?\d+)?$").unwrap());
static GROUPED_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[+-]?[1-9]\d{0,2}(?:,\d{3})+(?:\.\d+)?$").unwrap());

/// Replace every match with its first non-empty group; report whether any matched.
fn strip_marker(re: &Regex, text: &str) -> (String, bool) {
    let mut found = false;
    let stripped = re
        .replace_all(text, |caps: &regex::Captures<'_>| {
            found = true;
            caps.iter()
                .skip(1)
                .flatten()
                .next()
                .map_or("", |m| m.as_str())
                .to_string()
        })
        .into_owned();
    (stripped, found)
}

fn parse_cell(raw: &str) -> Cell {
    let text = LINE_BREAK.replace_all(raw.trim(), "\n").into_owned();
    let mut style = InlineStyle::default();

    let (text, code) = strip_marker(&CODE, &text);
    style.code = code;
    let (text, bold_italic) = strip_marker(&BOLD_ITALIC, &text);
    let (text, bold) = strip_marker(&BOLD, &text);
    let (text, italic) = strip_marker(&ITALIC, &text);
    let (text, strike) = strip_marker(&STRIKE, &text);
    style.bold = bold || bold_italic;
    style.italic = italic || bold_italic;
    style.strikethrough = strike;

    let value = parse_number(&text)
        .filter(|_| !style.code)
        .map_or_else(|| CellValue::Text(text.clone()), CellValue::Number);

    Cell { value, style }
}

/// Numbers keep their meaning in a spreadsheet; codes with leading zeros and
/// percentages stay text.
fn parse_number(text: &str) -> Option<f64> {
    let text = text.trim();
    let candidate = if PLAIN_NUMBER.is_match(text) {
        text.to_string()
    } else if GROUPED_NUMBER.is_match(text) {
        text.replace(',', "")
    } else {
        return None;
    };
    candidate.parse::<f64>().ok().filter(|n| n.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TABLE: &str = "| Name | Qty | Note |\n|:-----|----:|:----:|\n| **apple** | 1,200 | fresh |\n| pear | 3.5 |\n";

    #[test]
    fn parses_whole_table() {
        let table = parse_markdown_table(TABLE).unwrap();
        assert_eq!(table.row_count(), 3);
        assert_eq!(table.column_count(), 3);

        let apple = &table.rows[1][0];
        assert_eq!(apple.value, CellValue::Text("apple".to_string()));
        assert!(apple.style.bold);

        assert_eq!(table.rows[1][1].value, CellValue::Number(1200.0));
        assert_eq!(table.rows[2][1].value, CellValue::Number(3.5));
        // short rows are padded to the header width
        assert_eq!(table.rows[2][2], Cell::text(""));
    }

    #[test]
    fn surrounding_blank_lines_are_fine() {
        assert!(parse_markdown_table(&format!("\n\n{TABLE}\n\n")).is_some());
    }

    #[test]
    fn extra_paragraph_is_not_a_table() {
        assert!(parse_markdown_table(&format!("{TABLE}\nSome closing words.\n")).is_none());
        assert!(parse_markdown_table(&format!("Intro\n\n{TABLE}")).is_none());
    }

    #[test]
    fn requires_delimiter_row() {
        assert!(parse_markdown_table("| a | b |\n| c | d |").is_none());
        assert!(parse_markdown_table("| a | b |\n|---|").is_none());
        assert!(parse_markdown_table("just text").is_none());
        assert!(parse_markdown_table("").is_none());
    }

    #[test]
    fn escaped_and_code_pipes_stay_in_cell() {
        let table = parse_markdown_table("| expr | v |\n|---|---|\n| `a|b` | x \\| y |").unwrap();
        let expr = &table.rows[1][0];
        assert_eq!(expr.value, CellValue::Text("a|b".to_string()));
        assert!(expr.style.code);
        assert_eq!(table.rows[1][1].value, CellValue::Text("x | y".to_string()));
    }

    #[test]
    fn cell_typing() {
        assert_eq!(parse_cell("007").value, CellValue::Text("007".to_string()));
        assert_eq!(parse_cell("12%").value, CellValue::Text("12%".to_string()));
        assert_eq!(parse_cell("-4e2").value, CellValue::Number(-400.0));
        assert_eq!(parse_cell("`42`").value, CellValue::Text("42".to_string()));

        let cell = parse_cell("***both*** and ~~gone~~");
        assert_eq!(cell.value, CellValue::Text("both and gone".to_string()));
        assert!(cell.style.bold && cell.style.italic && cell.style.strikethrough);

        assert_eq!(
            parse_cell("a<br>b").value,
            CellValue::Text("a\nb".to_string())
        );
        assert_eq!(parse_cell("snake_case_name").style, InlineStyle::default());
    }
}
