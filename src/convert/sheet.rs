//! Tables to XLSX workbooks.

use crate::error::ConversionError;
use crate::markdown::{CellValue, InlineStyle, Table};
use rust_xlsxwriter::{Format, Workbook};

#[derive(Debug, Default)]
pub struct SpreadsheetGenerator;

impl SpreadsheetGenerator {
    /// Render `table` into a workbook with a single sheet. The header row is
    /// always bold; inline styles are applied only with `keep_format`.
    pub fn table_to_xlsx(
        &self,
        table: &Table,
        keep_format: bool,
    ) -> Result<Vec<u8>, ConversionError> {
        let spreadsheet_error =
            |e: rust_xlsxwriter::XlsxError| ConversionError::Spreadsheet(e.to_string());

        let mut workbook = Workbook::new();
        let worksheet = workbook.add_worksheet();

        for (row_index, row) in table.rows.iter().enumerate() {
            let row_number = u32::try_from(row_index)
                .map_err(|_| ConversionError::Spreadsheet("too many rows".to_string()))?;
            for (col_index, cell) in row.iter().enumerate() {
                let col_number = u16::try_from(col_index)
                    .map_err(|_| ConversionError::Spreadsheet("too many columns".to_string()))?;

                let style = if keep_format { cell.style } else { InlineStyle::default() };
                let format = cell_format(style, row_index == 0);

                match &cell.value {
                    CellValue::Number(number) => {
                        worksheet
                            .write_number_with_format(row_number, col_number, *number, &format)
                            .map_err(spreadsheet_error)?;
                    }
                    CellValue::Text(text) => {
                        worksheet
                            .write_string_with_format(row_number, col_number, text, &format)
                            .map_err(spreadsheet_error)?;
                    }
                }
            }
        }
        worksheet.autofit();

        workbook.save_to_buffer().map_err(spreadsheet_error)
    }
}

fn cell_format(style: InlineStyle, header: bool) -> Format {
    let mut format = Format::new();
    if style.bold || header {
        format = format.set_bold();
    }
    if style.italic {
        format = format.set_italic();
    }
    if style.strikethrough {
        format = format.set_font_strikethrough();
    }
    if style.code {
        format = format.set_font_name("Consolas");
    }
    format
}
