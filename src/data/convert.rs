use std::io::Cursor;

use anyhow::{Context, Result};
use rust_xlsxwriter::{Format, Workbook};
use serde::{Deserialize, Serialize};

use super::error::SweepError;
use super::model::{CellValue, Table};

/// Worksheet limits of the xlsx format.
const XLSX_MAX_ROWS: usize = 1_048_576;
const XLSX_MAX_COLS: usize = 16_384;

// ---------------------------------------------------------------------------
// Target formats
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetFormat {
    #[default]
    #[serde(rename = "CSV")]
    Csv,
    #[serde(rename = "EXCEL")]
    Excel,
}

impl TargetFormat {
    pub const ALL: [TargetFormat; 2] = [TargetFormat::Csv, TargetFormat::Excel];

    pub fn label(self) -> &'static str {
        match self {
            TargetFormat::Csv => "CSV",
            TargetFormat::Excel => "EXCEL",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            TargetFormat::Csv => ".csv",
            TargetFormat::Excel => ".xlsx",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            TargetFormat::Csv => "text/csv",
            TargetFormat::Excel => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Conversion
// ---------------------------------------------------------------------------

pub struct ConversionRequest<'a> {
    pub target: TargetFormat,
    pub table: &'a Table,
    /// Name of the uploaded file the table came from.
    pub source_name: &'a str,
}

/// A serialized table ready to be saved.
#[derive(Debug, Clone, PartialEq)]
pub struct ConvertedFile {
    pub target: TargetFormat,
    pub file_name: String,
    pub mime_type: &'static str,
    pub data: Vec<u8>,
}

impl ConvertedFile {
    pub fn download_label(&self, source_name: &str) -> String {
        format!("Download {source_name} as {}", self.target.label())
    }

    /// A reader over the whole buffer, starting at the first byte.
    pub fn reader(&self) -> Cursor<&[u8]> {
        Cursor::new(self.data.as_slice())
    }
}

/// Swap the trailing extension of `source_name` for the target's.
pub fn output_file_name(source_name: &str, target: TargetFormat) -> String {
    let stem = match source_name.rfind('.') {
        Some(dot) if dot > 0 => &source_name[..dot],
        _ => source_name,
    };
    format!("{stem}{}", target.extension())
}

pub fn convert(request: ConversionRequest<'_>) -> Result<ConvertedFile, SweepError> {
    let ConversionRequest {
        target,
        table,
        source_name,
    } = request;

    if table.width() == 0 {
        return Err(SweepError::EmptySelection);
    }

    let data = match target {
        TargetFormat::Csv => write_csv(table),
        TargetFormat::Excel => write_excel(table),
    }
    .map_err(|e| SweepError::conversion(source_name, e))?;

    let file_name = output_file_name(source_name, target);
    log::info!(
        "Converted {source_name} to {file_name} ({} rows, {} bytes)",
        table.len(),
        data.len()
    );
    Ok(ConvertedFile {
        target,
        file_name,
        mime_type: target.mime_type(),
        data,
    })
}

/// Header row of column names, no index column, `\n` line endings.
fn write_csv(table: &Table) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer
        .write_record(table.columns().iter().map(|c| c.name.as_str()))
        .context("writing CSV header")?;
    for (row_no, row) in table.rows().iter().enumerate() {
        writer
            .write_record(row.iter().map(CellValue::to_field))
            .with_context(|| format!("writing CSV row {row_no}"))?;
    }
    writer
        .into_inner()
        .map_err(|e| e.into_error())
        .context("flushing CSV buffer")
}

/// Single `Sheet1` worksheet with a bold header row and no index column.
fn write_excel(table: &Table) -> Result<Vec<u8>> {
    if table.len() + 1 > XLSX_MAX_ROWS || table.width() > XLSX_MAX_COLS {
        anyhow::bail!(
            "{} rows x {} columns does not fit in a worksheet",
            table.len(),
            table.width()
        );
    }

    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let sheet = workbook.add_worksheet();
    sheet.set_name("Sheet1").context("naming worksheet")?;

    for (col, column) in table.columns().iter().enumerate() {
        sheet
            .write_string_with_format(0, col as u16, &column.name, &header_format)
            .context("writing header row")?;
    }

    for (r, row) in table.rows().iter().enumerate() {
        let xl_row = (r + 1) as u32;
        for (col, cell) in row.iter().enumerate() {
            let xl_col = col as u16;
            let written = match cell {
                CellValue::Integer(i) => sheet.write_number(xl_row, xl_col, *i as f64),
                CellValue::Float(v) => sheet.write_number(xl_row, xl_col, *v),
                CellValue::Bool(b) => sheet.write_boolean(xl_row, xl_col, *b),
                CellValue::Text(s) | CellValue::DateTime(s) => {
                    sheet.write_string(xl_row, xl_col, s)
                }
                CellValue::Null => continue,
            };
            written.with_context(|| format!("writing cell ({r}, {col})"))?;
        }
    }

    workbook.save_to_buffer().context("serializing workbook")
}
