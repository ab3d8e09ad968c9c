use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::data::convert::{ConvertedFile, TargetFormat};
use crate::data::loader::{FileId, UploadedFile};
use crate::pipeline::{self, BatchReport, FileOptions, FileReport};
use crate::settings::Settings;

// ---------------------------------------------------------------------------
// Interactions
// ---------------------------------------------------------------------------

/// One widget interaction on a file card.
#[derive(Debug, Clone, PartialEq)]
pub enum FileAction {
    SetCleanEnabled(bool),
    RemoveDuplicates,
    FillMissing,
    ToggleColumn(String),
    SelectAllColumns,
    SetShowChart(bool),
    SetTarget(TargetFormat),
    Convert,
}

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    pub settings: Settings,

    /// Uploads in the order they were added.
    pub files: Vec<UploadedFile>,

    /// Per-file choices, keyed by upload id rather than file name.
    pub options: BTreeMap<FileId, FileOptions>,

    /// Result of the last pass over `files`.
    pub batch: BatchReport,

    /// Status / error message shown in the top bar.
    pub status_message: Option<String>,

    next_id: u64,
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            files: Vec::new(),
            options: BTreeMap::new(),
            batch: BatchReport::default(),
            status_message: None,
            next_id: 1,
        }
    }

    /// Register an upload and rerun the batch.
    pub fn add_file(&mut self, name: &str, data: Vec<u8>) -> FileId {
        let id = self.allocate_id();
        log::info!("Uploaded {name} as {id} ({} bytes)", data.len());
        self.files.push(UploadedFile::new(id, name, data));
        self.options
            .insert(id, FileOptions::with_target(self.settings.default_target));
        self.recompute();
        id
    }

    /// Read and register files picked in the upload dialog. Unreadable paths
    /// are reported in the status bar; the rest are still added.
    pub fn add_paths(&mut self, paths: &[PathBuf]) {
        let mut failed = Vec::new();
        for path in paths {
            let id = self.allocate_id();
            match UploadedFile::from_path(id, path) {
                Ok(file) => {
                    log::info!("Uploaded {} as {id} ({} bytes)", file.name, file.size());
                    self.options
                        .insert(id, FileOptions::with_target(self.settings.default_target));
                    self.files.push(file);
                }
                Err(e) => {
                    log::error!("Failed to upload: {e:#}");
                    failed.push(format!("{e:#}"));
                }
            }
        }
        self.status_message = (!failed.is_empty()).then(|| format!("Error: {}", failed.join("; ")));
        self.recompute();
    }

    fn allocate_id(&mut self) -> FileId {
        let id = FileId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Rebuild every file's report from its upload and current options.
    pub fn recompute(&mut self) {
        self.batch = pipeline::run_batch(&self.files, &self.options);
    }

    pub fn report(&self, id: FileId) -> Option<&FileReport> {
        self.batch.get(id)
    }

    /// Whether another upload in the batch has the same name.
    pub fn has_duplicate_name(&self, id: FileId) -> bool {
        let Some(file) = self.files.iter().find(|f| f.id == id) else {
            return false;
        };
        self.files
            .iter()
            .any(|other| other.id != id && other.name == file.name)
    }

    /// Apply one interaction and recompute.
    ///
    /// The converted download only survives until the next interaction, like
    /// a one-shot button.
    pub fn apply(&mut self, id: FileId, action: FileAction) {
        let original_columns = self
            .report(id)
            .map(|r| r.original_columns.clone())
            .unwrap_or_default();
        let Some(options) = self.options.get_mut(&id) else {
            log::warn!("Ignoring {action:?} for unknown file {id}");
            return;
        };
        options.convert_requested = false;

        match action {
            FileAction::SetCleanEnabled(on) => options.clean_enabled = on,
            FileAction::RemoveDuplicates => options.cleaning.remove_duplicates = true,
            FileAction::FillMissing => options.cleaning.fill_missing = true,
            FileAction::ToggleColumn(column) => {
                let selection = options.selection.get_or_insert(original_columns);
                match selection.iter().position(|c| *c == column) {
                    Some(pos) => {
                        selection.remove(pos);
                    }
                    None => selection.push(column),
                }
            }
            FileAction::SelectAllColumns => options.selection = None,
            FileAction::SetShowChart(on) => options.show_chart = on,
            FileAction::SetTarget(target) => options.target = target,
            FileAction::Convert => options.convert_requested = true,
        }
        self.recompute();
    }

    /// Forget an upload and its options.
    pub fn dismiss(&mut self, id: FileId) {
        self.files.retain(|f| f.id != id);
        self.options.remove(&id);
        self.recompute();
    }

    /// Columns currently selected for a file, in selection order.
    pub fn selected_columns(&self, id: FileId) -> Vec<String> {
        match self.options.get(&id).and_then(|o| o.selection.clone()) {
            Some(selection) => selection,
            None => self
                .report(id)
                .map(|r| r.original_columns.clone())
                .unwrap_or_default(),
        }
    }

    pub fn converted(&self, id: FileId) -> Option<&ConvertedFile> {
        self.report(id).and_then(|r| r.converted.as_ref())
    }

    /// Write a file's converted buffer to `path`.
    pub fn save_converted(&self, id: FileId, path: &Path) -> Result<()> {
        let converted = self
            .converted(id)
            .with_context(|| format!("file {id} has not been converted"))?;
        let mut out = std::fs::File::create(path)
            .with_context(|| format!("creating {}", path.display()))?;
        std::io::copy(&mut converted.reader(), &mut out)
            .with_context(|| format!("writing {}", path.display()))?;
        log::info!("Saved {} to {}", converted.file_name, path.display());
        Ok(())
    }
}
