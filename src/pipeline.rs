use std::collections::BTreeMap;

use crate::data::chart::{self, BarChartData};
use crate::data::clean::{self, CleaningOptions, CleaningReport};
use crate::data::convert::{self, ConversionRequest, ConvertedFile, TargetFormat};
use crate::data::error::SweepError;
use crate::data::loader::{self, FileId, UploadedFile};
use crate::data::model::Table;

// ---------------------------------------------------------------------------
// Per-file stages
// ---------------------------------------------------------------------------

/// Where a file got to in the flow. Stages only ever move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FileStage {
    Uploaded,
    Parsed,
    Cleaned,
    Projected,
    Visualized,
    Converted,
    Downloadable,
    /// Extension not handled; nothing after detection ran.
    Unsupported,
    /// Parsing, projection or conversion failed; see the report's error.
    Failed,
}

// ---------------------------------------------------------------------------
// Per-file session options
// ---------------------------------------------------------------------------

/// Everything the user chose for one file. This is the only state that
/// survives between interactions; tables are rebuilt from the upload each time.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FileOptions {
    /// The "Clean Data" checkbox. Cleaning steps only run while it is ticked.
    pub clean_enabled: bool,
    pub cleaning: CleaningOptions,
    /// `None` selects every column in file order.
    pub selection: Option<Vec<String>>,
    pub show_chart: bool,
    pub target: TargetFormat,
    pub convert_requested: bool,
}

impl FileOptions {
    pub fn with_target(target: TargetFormat) -> Self {
        Self {
            target,
            ..Self::default()
        }
    }
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct FileReport {
    pub id: FileId,
    pub name: String,
    pub size: usize,
    pub stage: FileStage,
    /// Columns as parsed, before projection.
    pub original_columns: Vec<String>,
    /// The table after cleaning and projection.
    pub table: Option<Table>,
    pub cleaning: Option<CleaningReport>,
    pub chart: Option<BarChartData>,
    pub converted: Option<ConvertedFile>,
    pub error: Option<SweepError>,
}

impl FileReport {
    fn new(file: &UploadedFile) -> Self {
        Self {
            id: file.id,
            name: file.name.clone(),
            size: file.size(),
            stage: FileStage::Uploaded,
            original_columns: Vec::new(),
            table: None,
            cleaning: None,
            chart: None,
            converted: None,
            error: None,
        }
    }

    fn advance(&mut self, next: FileStage) {
        debug_assert!(next > self.stage, "{:?} -> {:?}", self.stage, next);
        self.stage = next;
    }

    fn fail(mut self, err: SweepError) -> Self {
        log::warn!("{} ({}): {err}", self.name, self.id);
        self.stage = match err {
            SweepError::UnsupportedFormat { .. } => FileStage::Unsupported,
            _ => FileStage::Failed,
        };
        self.error = Some(err);
        self
    }

    pub fn size_kb(&self) -> f64 {
        self.size as f64 / 1024.0
    }
}

/// Outcome of one pass over every uploaded file.
#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    pub files: Vec<FileReport>,
}

impl BatchReport {
    /// Every file was visited, whatever happened to it.
    pub fn completed(&self) -> bool {
        !self.files.is_empty()
    }

    pub fn failures(&self) -> impl Iterator<Item = &FileReport> {
        self.files.iter().filter(|f| f.error.is_some())
    }

    pub fn get(&self, id: FileId) -> Option<&FileReport> {
        self.files.iter().find(|f| f.id == id)
    }
}

// ---------------------------------------------------------------------------
// Running the flow
// ---------------------------------------------------------------------------

/// Run one file from its raw bytes through every step its options ask for.
pub fn run_file(file: &UploadedFile, options: &FileOptions) -> FileReport {
    let mut report = FileReport::new(file);

    let mut table = match loader::parse(file) {
        Ok(table) => table,
        Err(e) => return report.fail(e),
    };
    report.advance(FileStage::Parsed);
    report.original_columns = table.column_names();

    if options.clean_enabled {
        let cleaning = clean::apply(&mut table, &options.cleaning);
        if cleaning.any_applied() {
            report.advance(FileStage::Cleaned);
        }
        report.cleaning = Some(cleaning);
    }

    let selection = options
        .selection
        .as_deref()
        .unwrap_or(&report.original_columns);
    let table = match table.project(selection) {
        Ok(projected) => projected,
        Err(e) => return report.fail(e),
    };
    report.advance(FileStage::Projected);

    if options.show_chart {
        report.chart = chart::bar_chart(&table);
        report.advance(FileStage::Visualized);
    }

    if options.convert_requested {
        let request = ConversionRequest {
            target: options.target,
            table: &table,
            source_name: &file.name,
        };
        match convert::convert(request) {
            Ok(converted) => {
                report.advance(FileStage::Converted);
                report.converted = Some(converted);
                report.advance(FileStage::Downloadable);
            }
            Err(e) => {
                report.table = Some(table);
                return report.fail(e);
            }
        }
    }

    report.table = Some(table);
    report
}

/// Run every file independently; a failure never stops its siblings.
pub fn run_batch(files: &[UploadedFile], options: &BTreeMap<FileId, FileOptions>) -> BatchReport {
    let defaults = FileOptions::default();
    let files: Vec<FileReport> = files
        .iter()
        .map(|file| run_file(file, options.get(&file.id).unwrap_or(&defaults)))
        .collect();

    let failed = files.iter().filter(|f| f.error.is_some()).count();
    log::info!("Processed {} files ({failed} with errors)", files.len());
    BatchReport { files }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::CellValue;

    fn upload(id: u64, name: &str, data: &str) -> UploadedFile {
        UploadedFile::new(FileId(id), name, data.as_bytes().to_vec())
    }

    #[test]
    fn data_csv_scenario() {
        let file = upload(1, "data.csv", "A,B\n1,NaN\n2,4\n1,NaN\n");
        let options = FileOptions {
            clean_enabled: true,
            cleaning: CleaningOptions {
                remove_duplicates: true,
                fill_missing: true,
            },
            target: TargetFormat::Excel,
            convert_requested: true,
            ..FileOptions::default()
        };

        let report = run_file(&file, &options);
        assert_eq!(report.stage, FileStage::Downloadable);
        assert_eq!(report.error, None);

        let table = report.table.as_ref().unwrap();
        assert_eq!(
            table.rows(),
            &[
                vec![CellValue::Integer(1), CellValue::Float(4.0)],
                vec![CellValue::Integer(2), CellValue::Float(4.0)],
            ]
        );
        let converted = report.converted.as_ref().unwrap();
        assert_eq!(converted.file_name, "data.xlsx");
        assert_eq!(
            converted.mime_type,
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
        );
        assert_eq!(converted.download_label(&report.name), "Download data.csv as EXCEL");
        assert_eq!(report.size, 20);
        assert!((report.size_kb() - 20.0 / 1024.0).abs() < 1e-12);
    }

    #[test]
    fn cleaning_buttons_do_nothing_while_the_checkbox_is_off() {
        let file = upload(1, "d.csv", "a\n1\n1\n");
        let options = FileOptions {
            cleaning: CleaningOptions {
                remove_duplicates: true,
                fill_missing: false,
            },
            ..FileOptions::default()
        };
        let report = run_file(&file, &options);
        assert_eq!(report.table.unwrap().len(), 2);
        assert_eq!(report.stage, FileStage::Projected);
    }

    #[test]
    fn report_xlsx_without_numbers_shows_no_chart() {
        let text_only = Table::new(
            vec!["region".into(), "owner".into()],
            vec![vec![CellValue::Text("north".into()), CellValue::Text("kim".into())]],
        );
        let bytes = convert::convert(ConversionRequest {
            target: TargetFormat::Excel,
            table: &text_only,
            source_name: "report.csv",
        })
        .unwrap()
        .data;
        let file = UploadedFile::new(FileId(3), "report.xlsx", bytes);
        let options = FileOptions {
            show_chart: true,
            ..FileOptions::default()
        };

        let report = run_file(&file, &options);
        assert_eq!(report.error, None);
        assert_eq!(report.stage, FileStage::Visualized);
        assert!(report.chart.is_none());
    }

    #[test]
    fn batch_continues_past_bad_files() {
        let files = vec![
            upload(1, "notes.txt", "hello"),
            upload(2, "broken.csv", "a,b\n1,2,3\n"),
            upload(3, "good.csv", "a,b\n1,2\n"),
        ];
        let batch = run_batch(&files, &BTreeMap::new());

        assert!(batch.completed());
        assert_eq!(batch.files.len(), 3);
        assert_eq!(batch.get(FileId(1)).unwrap().stage, FileStage::Unsupported);
        assert!(batch.get(FileId(1)).unwrap().table.is_none());
        assert_eq!(batch.get(FileId(2)).unwrap().stage, FileStage::Failed);
        assert_eq!(batch.get(FileId(3)).unwrap().stage, FileStage::Projected);
        assert_eq!(batch.failures().count(), 2);
    }

    #[test]
    fn same_name_uploads_keep_their_own_options() {
        let files = vec![
            upload(1, "data.csv", "a,b\n1,2\n"),
            upload(2, "data.csv", "a,b\n1,2\n"),
        ];
        let mut options = BTreeMap::new();
        options.insert(
            FileId(2),
            FileOptions {
                selection: Some(vec!["b".into()]),
                ..FileOptions::default()
            },
        );
        let batch = run_batch(&files, &options);
        let widths: Vec<usize> = batch
            .files
            .iter()
            .map(|f| f.table.as_ref().unwrap().width())
            .collect();
        assert_eq!(widths, vec![2, 1]);
    }

    #[test]
    fn unknown_selected_column_fails_the_file() {
        let file = upload(1, "d.csv", "a\n1\n");
        let options = FileOptions {
            selection: Some(vec!["gone".into()]),
            ..FileOptions::default()
        };
        let report = run_file(&file, &options);
        assert_eq!(report.stage, FileStage::Failed);
        assert_eq!(report.error, Some(SweepError::UnknownColumn("gone".into())));
    }

    #[test]
    fn converting_nothing_reports_empty_selection() {
        let file = upload(1, "d.csv", "a\n1\n");
        let options = FileOptions {
            selection: Some(Vec::new()),
            convert_requested: true,
            ..FileOptions::default()
        };
        let report = run_file(&file, &options);
        assert_eq!(report.error, Some(SweepError::EmptySelection));
        assert!(report.converted.is_none());
    }

    #[test]
    fn empty_batch_is_not_complete() {
        assert!(!run_batch(&[], &BTreeMap::new()).completed());
    }
}
