//! Inserting generated content into the focused office application.

use crate::error::InsertionError;
use crate::markdown::{CellValue, Table};
use crate::target::TargetApp;
use serde_json::{json, Value};
use std::path::Path;
use std::process::Command;

pub trait Inserter: Send + Sync {
    /// Insert the DOCX at `path` at the current cursor of a document app.
    fn insert_document(
        &self,
        target: TargetApp,
        path: &Path,
        move_cursor_to_end: bool,
    ) -> Result<(), InsertionError>;

    /// Write `table` into cells starting at the active cell of a spreadsheet app.
    fn insert_table(
        &self,
        target: TargetApp,
        table: &Table,
        keep_format: bool,
    ) -> Result<(), InsertionError>;
}

/// Drives the application's automation interface through a script host:
/// COM via PowerShell on Windows, AppleScript on macOS.
#[derive(Debug, Default)]
pub struct ScriptInserter;

impl ScriptInserter {
    fn com_prog_id(target: TargetApp) -> Result<&'static str, InsertionError> {
        match target {
            TargetApp::Word => Ok("Word.Application"),
            TargetApp::Wps => Ok("Kwps.Application"),
            TargetApp::Excel => Ok("Excel.Application"),
            TargetApp::WpsSpreadsheet => Ok("Ket.Application"),
            TargetApp::None => Err(InsertionError::NoTarget),
        }
    }

    fn run_script(target: TargetApp, program: &str, args: &[&str]) -> Result<(), InsertionError> {
        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|e| InsertionError::AppUnavailable {
                app: target.display_name(),
                reason: format!("could not start {program}: {e}"),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            tracing::error!("{program} failed for {}: {stderr}", target.display_name());
            return Err(InsertionError::Script(stderr));
        }
        Ok(())
    }

    /// JSON shape consumed by the table scripts.
    pub fn table_payload(table: &Table, keep_format: bool) -> Value {
        let rows: Vec<Value> = table
            .rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|cell| {
                        let (value, numeric) = match &cell.value {
                            CellValue::Number(n) => (json!(n), true),
                            CellValue::Text(text) => (json!(text), false),
                        };
                        json!({
                            "v": value,
                            "n": numeric,
                            "b": keep_format && cell.style.bold,
                            "i": keep_format && cell.style.italic,
                            "s": keep_format && cell.style.strikethrough,
                        })
                    })
                    .collect()
            })
            .collect();
        Value::Array(rows)
    }

    fn windows_document_script(prog_id: &str, path: &Path, move_cursor_to_end: bool) -> String {
        let path = crate::notify::powershell_string(&path.display().to_string());
        let restore = if move_cursor_to_end {
            ""
        } else {
            "$sel.SetRange($start, $start)"
        };
        format!(
            "$ErrorActionPreference = 'Stop'\n\
             $app = [Runtime.InteropServices.Marshal]::GetActiveObject('{prog_id}')\n\
             $sel = $app.Selection\n\
             $start = $sel.Start\n\
             $sel.InsertFile({path})\n\
             {restore}\n"
        )
    }

    fn windows_table_script(prog_id: &str, payload_path: &Path) -> String {
        let payload_path = crate::notify::powershell_string(&payload_path.display().to_string());
        format!(
            "$ErrorActionPreference = 'Stop'\n\
             $app = [Runtime.InteropServices.Marshal]::GetActiveObject('{prog_id}')\n\
             $origin = $app.ActiveCell\n\
             $rows = Get-Content -Raw -Encoding UTF8 {payload_path} | ConvertFrom-Json\n\
             for ($r = 0; $r -lt $rows.Count; $r++) {{\n\
               for ($c = 0; $c -lt $rows[$r].Count; $c++) {{\n\
                 $cell = $rows[$r][$c]\n\
                 $range = $origin.Offset($r, $c)\n\
                 if (-not $cell.n) {{ $range.NumberFormat = '@' }}\n\
                 $range.Value2 = $cell.v\n\
                 $range.Font.Bold = [bool]$cell.b\n\
                 $range.Font.Italic = [bool]$cell.i\n\
                 $range.Font.Strikethrough = [bool]$cell.s\n\
               }}\n\
             }}\n"
        )
    }
}

impl Inserter for ScriptInserter {
    #[allow(unreachable_code)]
    fn insert_document(
        &self,
        target: TargetApp,
        path: &Path,
        move_cursor_to_end: bool,
    ) -> Result<(), InsertionError> {
        if !target.is_document() {
            return Err(InsertionError::NoTarget);
        }
        tracing::info!("Inserting {} into {}", path.display(), target.display_name());

        #[cfg(windows)]
        {
            let script =
                Self::windows_document_script(Self::com_prog_id(target)?, path, move_cursor_to_end);
            return Self::run_script(target, "powershell", &["-NoProfile", "-Command", &script]);
        }

        #[cfg(target_os = "macos")]
        {
            if target != TargetApp::Word {
                return Err(InsertionError::Unsupported(target.display_name()));
            }
            let _ = move_cursor_to_end;
            let script = format!(
                "tell application \"Microsoft Word\"\n\
                 insert file at text object of selection file name (POSIX file {} as string)\n\
                 end tell",
                crate::notify::applescript_string(&path.display().to_string())
            );
            return Self::run_script(target, "osascript", &["-e", &script]);
        }

        let _ = (path, move_cursor_to_end);
        Err(InsertionError::Unsupported(target.display_name()))
    }

    #[allow(unreachable_code)]
    fn insert_table(
        &self,
        target: TargetApp,
        table: &Table,
        keep_format: bool,
    ) -> Result<(), InsertionError> {
        if !target.is_spreadsheet() {
            return Err(InsertionError::NoTarget);
        }
        tracing::info!(
            "Inserting {}x{} table into {}",
            table.row_count(),
            table.column_count(),
            target.display_name()
        );

        #[cfg(windows)]
        {
            use std::io::Write;
            let payload = Self::table_payload(table, keep_format);
            let mut file = tempfile::Builder::new()
                .prefix("pastemd-table")
                .suffix(".json")
                .tempfile()
                .map_err(|e| InsertionError::Script(e.to_string()))?;
            file.write_all(payload.to_string().as_bytes())
                .map_err(|e| InsertionError::Script(e.to_string()))?;
            let script = Self::windows_table_script(Self::com_prog_id(target)?, file.path());
            return Self::run_script(target, "powershell", &["-NoProfile", "-Command", &script]);
        }

        #[cfg(target_os = "macos")]
        {
            if target != TargetApp::Excel {
                return Err(InsertionError::Unsupported(target.display_name()));
            }
            let mut script = String::from("tell application \"Microsoft Excel\"\nset origin to active cell\n");
            for (r, row) in table.rows.iter().enumerate() {
                for (c, cell) in row.iter().enumerate() {
                    let value = match &cell.value {
                        CellValue::Number(n) => n.to_string(),
                        CellValue::Text(text) => crate::notify::applescript_string(text),
                    };
                    script.push_str(&format!(
                        "set value of (get offset origin row offset {r} column offset {c}) to {value}\n"
                    ));
                    if keep_format && cell.style.bold {
                        script.push_str(&format!(
                            "set bold of font object of (get offset origin row offset {r} column offset {c}) to true\n"
                        ));
                    }
                }
            }
            script.push_str("end tell");
            return Self::run_script(target, "osascript", &["-e", &script]);
        }

        let _ = (table, keep_format);
        Err(InsertionError::Unsupported(target.display_name()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markdown::parse_markdown_table;
    use std::path::PathBuf;

    #[test]
    fn prog_ids() {
        assert_eq!(ScriptInserter::com_prog_id(TargetApp::Wps).unwrap(), "Kwps.Application");
        assert_eq!(
            ScriptInserter::com_prog_id(TargetApp::WpsSpreadsheet).unwrap(),
            "Ket.Application"
        );
        assert!(matches!(
            ScriptInserter::com_prog_id(TargetApp::None),
            Err(InsertionError::NoTarget)
        ));
    }

    #[test]
    fn payload_marks_numbers_and_styles() {
        let table = parse_markdown_table("| a | b |\n|---|---|\n| **x** | 2 |").unwrap();
        let payload = ScriptInserter::table_payload(&table, true);
        assert_eq!(payload[1][0]["v"], "x");
        assert_eq!(payload[1][0]["b"], true);
        assert_eq!(payload[1][1]["n"], true);
        assert_eq!(payload[1][1]["v"], 2.0);

        let plain = ScriptInserter::table_payload(&table, false);
        assert_eq!(plain[1][0]["b"], false);
    }

    #[test]
    fn document_script_restores_cursor_when_asked() {
        let path = PathBuf::from(r"C:\Temp\it's.docx");
        let keep = ScriptInserter::windows_document_script("Word.Application", &path, false);
        assert!(keep.contains("$sel.SetRange($start, $start)"));
        assert!(keep.contains(r"'C:\Temp\it''s.docx'"));
        let end = ScriptInserter::windows_document_script("Word.Application", &path, true);
        assert!(!end.contains("SetRange"));
    }

    #[test]
    fn wrong_family_is_rejected() {
        let table = parse_markdown_table("| a |\n|---|").unwrap();
        assert!(matches!(
            ScriptInserter.insert_table(TargetApp::Word, &table, true),
            Err(InsertionError::NoTarget)
        ));
        assert!(matches!(
            ScriptInserter.insert_document(TargetApp::Excel, Path::new("x.docx"), true),
            Err(InsertionError::NoTarget)
        ));
    }
}
