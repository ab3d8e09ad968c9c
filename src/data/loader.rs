use std::collections::HashSet;
use std::fmt;
use std::io::Cursor;
use std::path::Path;

use anyhow::{bail, Context, Result};
use calamine::{Data, Reader, Xlsx};
use chrono::NaiveDateTime;

use super::error::SweepError;
use super::model::{CellValue, ColumnType, Table};

// ---------------------------------------------------------------------------
// Uploaded files
// ---------------------------------------------------------------------------

/// Stable identifier of one upload. Two uploads with the same name get
/// different ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FileId(pub u64);

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A named byte blob as received from the user. Never modified.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub id: FileId,
    pub name: String,
    pub data: Vec<u8>,
}

impl UploadedFile {
    pub fn new(id: FileId, name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            id,
            name: name.into(),
            data,
        }
    }

    pub fn from_path(id: FileId, path: &Path) -> Result<Self> {
        let data =
            std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self::new(id, name, data))
    }

    /// Size in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

// ---------------------------------------------------------------------------
// Extension detection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Xlsx,
}

impl FileFormat {
    /// Detect the format from the file name alone (case-insensitive).
    pub fn detect(name: &str) -> Result<Self, SweepError> {
        let ext = Path::new(name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();

        match ext.as_str() {
            "csv" => Ok(FileFormat::Csv),
            "xlsx" => Ok(FileFormat::Xlsx),
            "" => Err(SweepError::UnsupportedFormat {
                extension: "(none)".to_string(),
            }),
            other => Err(SweepError::UnsupportedFormat {
                extension: format!(".{other}"),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Parse an uploaded file into a [`Table`]. Dispatch by extension.
pub fn parse(file: &UploadedFile) -> Result<Table, SweepError> {
    let format = FileFormat::detect(&file.name)?;
    let parsed = match format {
        FileFormat::Csv => parse_csv(&file.data),
        FileFormat::Xlsx => parse_xlsx(&file.data),
    };
    parsed.map_err(|e| SweepError::parse(&file.name, e))
}

/// Cell texts treated as missing, the same set pandas uses by default.
const MISSING_MARKERS: &[&str] = &[
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND",
    "1.#QNAN", "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

fn is_missing(s: &str) -> bool {
    MISSING_MARKERS.contains(&s)
}

/// Turn raw header cells into unique column names.
///
/// Blank headers become `Unnamed: <idx>`; repeats get `.1`, `.2`, ... suffixes.
fn column_names(raw: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut taken: HashSet<String> = HashSet::new();
    raw.into_iter()
        .enumerate()
        .map(|(idx, header)| {
            let base = if header.trim().is_empty() {
                format!("Unnamed: {idx}")
            } else {
                header
            };
            let mut name = base.clone();
            let mut n = 1;
            while taken.contains(&name) {
                name = format!("{base}.{n}");
                n += 1;
            }
            taken.insert(name.clone());
            name
        })
        .collect()
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// Header row with column names, then one record per row. Column types are
/// decided per column over all of its cells.
fn parse_csv(bytes: &[u8]) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(bytes);

    let headers = reader.headers().context("reading CSV headers")?.clone();
    if headers.is_empty() {
        bail!("no columns to parse from file");
    }
    let names = column_names(headers.iter().map(|h| h.to_string()));
    let width = names.len();

    let mut raw_columns: Vec<Vec<Option<String>>> = vec![Vec::new(); width];
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("CSV row {row_no}"))?;
        if record.len() > width {
            bail!(
                "CSV row {row_no}: expected {width} fields, saw {}",
                record.len()
            );
        }
        for (col_idx, column) in raw_columns.iter_mut().enumerate() {
            let value = record.get(col_idx).filter(|v| !is_missing(v));
            column.push(value.map(str::to_string));
        }
    }

    let typed: Vec<Vec<CellValue>> = raw_columns.into_iter().map(type_csv_column).collect();
    let n_rows = typed.first().map_or(0, Vec::len);
    let rows = (0..n_rows)
        .map(|r| typed.iter().map(|col| col[r].clone()).collect())
        .collect();
    Ok(Table::new(names, rows))
}

fn is_bool_literal(s: &str) -> bool {
    matches!(s, "True" | "False" | "true" | "false" | "TRUE" | "FALSE")
}

/// Decide one type for the whole column and convert its cells.
fn type_csv_column(raw: Vec<Option<String>>) -> Vec<CellValue> {
    let present = || raw.iter().flatten();
    let has_missing = raw.iter().any(Option::is_none);

    let convert = |f: &dyn Fn(&str) -> CellValue| -> Vec<CellValue> {
        raw.iter()
            .map(|v| v.as_deref().map_or(CellValue::Null, f))
            .collect()
    };

    if present().all(|s| s.trim().parse::<i64>().is_ok()) {
        // Integers with gaps become floats.
        if has_missing {
            return convert(&|s| s.trim().parse::<f64>().map_or(CellValue::Null, CellValue::Float));
        }
        return convert(&|s| s.trim().parse::<i64>().map_or(CellValue::Null, CellValue::Integer));
    }
    if present().all(|s| s.trim().parse::<f64>().is_ok()) {
        return convert(&|s| s.trim().parse::<f64>().map_or(CellValue::Null, CellValue::Float));
    }
    if present().all(|s| is_bool_literal(s)) {
        return convert(&|s| CellValue::Bool(s.eq_ignore_ascii_case("true")));
    }
    convert(&|s| CellValue::Text(s.to_string()))
}

// ---------------------------------------------------------------------------
// XLSX loader
// ---------------------------------------------------------------------------

/// First worksheet only; its first row holds the column names.
fn parse_xlsx(bytes: &[u8]) -> Result<Table> {
    let mut workbook: Xlsx<_> =
        Xlsx::new(Cursor::new(bytes)).context("opening Excel workbook")?;
    let range = workbook
        .worksheet_range_at(0)
        .context("workbook has no worksheet")?
        .context("reading first worksheet")?;

    let mut rows_iter = range.rows();
    let Some(header) = rows_iter.next() else {
        bail!("no columns to parse from file");
    };
    let names = column_names(header.iter().map(header_name));
    let width = names.len();

    let mut columns: Vec<Vec<CellValue>> = vec![Vec::new(); width];
    for row in rows_iter {
        for (col_idx, column) in columns.iter_mut().enumerate() {
            column.push(row.get(col_idx).map_or(CellValue::Null, excel_cell));
        }
    }

    let typed: Vec<Vec<CellValue>> = columns.into_iter().map(type_excel_column).collect();
    let n_rows = typed.first().map_or(0, Vec::len);
    let rows = (0..n_rows)
        .map(|r| typed.iter().map(|col| col[r].clone()).collect())
        .collect();
    Ok(Table::new(names, rows))
}

/// Header text for a first-row cell. Whole-number headers such as a year
/// keep their integer spelling.
fn header_name(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::Float(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
            (*f as i64).to_string()
        }
        other => excel_cell(other).to_field(),
    }
}

fn datetime_text(d: NaiveDateTime) -> String {
    d.format("%Y-%m-%d %H:%M:%S").to_string()
}

fn excel_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Int(i) => CellValue::Integer(*i),
        Data::Float(f) => CellValue::Float(*f),
        Data::String(s) if is_missing(s) => CellValue::Null,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::DateTime(dt) => match dt.as_datetime() {
            Some(d) => CellValue::DateTime(datetime_text(d)),
            None => CellValue::Float(dt.as_f64()),
        },
        Data::DateTimeIso(s) => CellValue::DateTime(s.clone()),
        Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(_) | Data::Empty => CellValue::Null,
    }
}

/// Spreadsheets store every number as a float: a gap-free column of whole
/// numbers is an integer column, any other numeric column is a float column,
/// and a numeric/text mix is text.
fn type_excel_column(cells: Vec<CellValue>) -> Vec<CellValue> {
    match ColumnType::infer(&cells) {
        ColumnType::Integer | ColumnType::Float => {
            let gap_free = cells.iter().all(|c| !c.is_null());
            let integral = cells
                .iter()
                .filter_map(CellValue::as_f64)
                .all(|v| v.fract() == 0.0 && v.abs() < i64::MAX as f64);
            cells
                .into_iter()
                .map(|c| match c.as_f64() {
                    Some(v) if gap_free && integral => CellValue::Integer(v as i64),
                    Some(v) => CellValue::Float(v),
                    None => CellValue::Null,
                })
                .collect()
        }
        ColumnType::Text => cells
            .into_iter()
            .map(|c| match c {
                CellValue::Null | CellValue::Text(_) => c,
                other => CellValue::Text(other.to_field()),
            })
            .collect(),
        _ => cells,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn upload(name: &str, data: &str) -> UploadedFile {
        UploadedFile::new(FileId(1), name, data.as_bytes().to_vec())
    }

    #[test]
    fn detects_supported_extensions_case_insensitively() {
        assert_eq!(FileFormat::detect("data.csv"), Ok(FileFormat::Csv));
        assert_eq!(FileFormat::detect("Report.XLSX"), Ok(FileFormat::Xlsx));
        assert_eq!(FileFormat::detect("archive.tar.csv"), Ok(FileFormat::Csv));
    }

    #[test]
    fn rejects_other_extensions_without_parsing() {
        // Garbage bytes: detection must fail before any parse is attempted.
        let file = UploadedFile::new(FileId(1), "notes.txt", vec![0xff, 0xfe, 0x00]);
        assert_eq!(
            parse(&file),
            Err(SweepError::UnsupportedFormat {
                extension: ".txt".into()
            })
        );
        assert!(matches!(
            FileFormat::detect("README"),
            Err(SweepError::UnsupportedFormat { .. })
        ));
        assert!(FileFormat::detect("book.xls").is_err());
    }

    #[test]
    fn parses_csv_with_types_and_missing_values() {
        let table = parse(&upload("data.csv", "A,B,name,flag\n1,NaN,x,True\n2,4,,False\n")).unwrap();
        let types: Vec<ColumnType> = table.columns().iter().map(|c| c.dtype).collect();
        assert_eq!(
            types,
            vec![ColumnType::Integer, ColumnType::Float, ColumnType::Text, ColumnType::Bool]
        );
        assert_eq!(
            table.rows()[0],
            vec![
                CellValue::Integer(1),
                CellValue::Null,
                CellValue::Text("x".into()),
                CellValue::Bool(true)
            ]
        );
        assert_eq!(table.rows()[1][1], CellValue::Float(4.0));
        assert_eq!(table.rows()[1][2], CellValue::Null);
    }

    #[test]
    fn mixed_csv_column_stays_text() {
        let table = parse(&upload("m.csv", "v\n1\nabc\n")).unwrap();
        assert_eq!(table.columns()[0].dtype, ColumnType::Text);
        assert_eq!(table.rows()[0][0], CellValue::Text("1".into()));
    }

    #[test]
    fn names_blank_and_repeated_headers() {
        let table = parse(&upload("h.csv", "A,,A,A\n1,2,3,4\n")).unwrap();
        assert_eq!(table.column_names(), vec!["A", "Unnamed: 1", "A.1", "A.2"]);
    }

    #[test]
    fn pads_short_rows_and_rejects_long_ones() {
        let table = parse(&upload("s.csv", "a,b\n1\n")).unwrap();
        assert_eq!(table.rows()[0], vec![CellValue::Integer(1), CellValue::Null]);

        let err = parse(&upload("l.csv", "a,b\n1,2,3\n")).unwrap_err();
        assert!(matches!(err, SweepError::ParseFailure { ref file, .. } if file == "l.csv"));
    }

    #[test]
    fn empty_csv_is_a_parse_failure() {
        assert!(matches!(
            parse(&upload("empty.csv", "")),
            Err(SweepError::ParseFailure { .. })
        ));
    }

    #[test]
    fn malformed_xlsx_is_a_parse_failure() {
        let file = upload("broken.xlsx", "this is not a zip archive");
        assert!(matches!(parse(&file), Err(SweepError::ParseFailure { .. })));
    }

    #[test]
    fn excel_numbers_are_normalised_per_column() {
        let whole = vec![CellValue::Float(1.0), CellValue::Float(2.0)];
        assert_eq!(
            type_excel_column(whole),
            vec![CellValue::Integer(1), CellValue::Integer(2)]
        );
        let gappy = vec![CellValue::Float(1.0), CellValue::Null];
        assert_eq!(
            type_excel_column(gappy),
            vec![CellValue::Float(1.0), CellValue::Null]
        );
        let mixed = vec![CellValue::Float(1.5), CellValue::Text("x".into())];
        assert_eq!(
            type_excel_column(mixed),
            vec![CellValue::Text("1.5".into()), CellValue::Text("x".into())]
        );
    }

    #[test]
    fn csv_missing_markers_become_null() {
        let table = parse(&upload("m.csv", "a,b,c\n#N/A,NULL,x\nNone,1,null\n")).unwrap();
        assert_eq!(table.columns()[0].dtype, ColumnType::Empty);
        assert_eq!(
            table.rows()[0],
            vec![CellValue::Null, CellValue::Null, CellValue::Text("x".into())]
        );
        assert_eq!(
            table.rows()[1],
            vec![CellValue::Null, CellValue::Float(1.0), CellValue::Null]
        );
    }

    #[test]
    fn padded_integers_stay_integers() {
        let table = parse(&upload("p.csv", "v,w\n1,1.5\n 2, 3\n")).unwrap();
        assert_eq!(table.columns()[0].dtype, ColumnType::Integer);
        assert_eq!(table.columns()[1].dtype, ColumnType::Float);
        assert_eq!(
            table.rows()[1],
            vec![CellValue::Integer(2), CellValue::Float(3.0)]
        );
    }

    #[test]
    fn xlsx_cells_keep_dates_bools_markers_and_numeric_headers() {
        use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};

        let mut workbook = Workbook::new();
        let sheet = workbook.add_worksheet();
        let stamp = ExcelDateTime::from_ymd(2024, 3, 5)
            .unwrap()
            .and_hms(10, 20, 30)
            .unwrap();
        let date_format = Format::new().set_num_format("yyyy-mm-dd hh:mm:ss");
        sheet.write_string(0, 0, "when").unwrap();
        sheet.write_string(0, 1, "flag").unwrap();
        sheet.write_number(0, 2, 2020).unwrap();
        sheet.write_string(0, 3, "n").unwrap();
        sheet.write_datetime_with_format(1, 0, &stamp, &date_format).unwrap();
        sheet.write_boolean(1, 1, true).unwrap();
        sheet.write_number(1, 2, 1.5).unwrap();
        sheet.write_string(1, 3, "NA").unwrap();
        let bytes = workbook.save_to_buffer().unwrap();

        let table = parse(&UploadedFile::new(FileId(1), "book.xlsx", bytes)).unwrap();
        assert_eq!(table.column_names(), vec!["when", "flag", "2020", "n"]);
        assert_eq!(
            table.rows()[0],
            vec![
                CellValue::DateTime("2024-03-05 10:20:30".into()),
                CellValue::Bool(true),
                CellValue::Float(1.5),
                CellValue::Null,
            ]
        );
        assert_eq!(table.columns()[0].dtype, ColumnType::DateTime);
        assert_eq!(table.columns()[1].dtype, ColumnType::Bool);
    }

    #[test]
    fn numeric_headers_drop_the_fraction_only_when_whole() {
        assert_eq!(header_name(&Data::Float(2020.0)), "2020");
        assert_eq!(header_name(&Data::Float(2.5)), "2.5");
        assert_eq!(header_name(&Data::Int(7)), "7");
        assert_eq!(header_name(&Data::Empty), "");

        let noon = chrono::NaiveDate::from_ymd_opt(2024, 3, 5)
            .and_then(|d| d.and_hms_opt(12, 0, 0))
            .unwrap();
        assert_eq!(datetime_text(noon), "2024-03-05 12:00:00");
    }

    #[test]
    fn reads_uploads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("k.csv");
        std::fs::write(&path, vec![b'a'; 2048]).unwrap();

        let file = UploadedFile::from_path(FileId(7), &path).unwrap();
        assert_eq!(file.name, "k.csv");
        assert_eq!(file.size(), 2048);
        assert!(UploadedFile::from_path(FileId(8), &dir.path().join("gone.csv")).is_err());
    }
}
