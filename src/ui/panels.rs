use eframe::egui::{self, Color32, RichText, ScrollArea, Ui};
use egui_extras::{Column as TableColumn, TableBuilder};

use crate::data::convert::TargetFormat;
use crate::data::loader::FileId;
use crate::data::model::Table;
use crate::pipeline::FileReport;
use crate::state::{AppState, FileAction};
use crate::ui::plot;

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / toolbar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Upload…").clicked() {
                open_files_dialog(state);
                ui.close_menu();
            }
        });

        ui.separator();

        if !state.files.is_empty() {
            ui.label(format!(
                "{} files uploaded, {} with errors",
                state.files.len(),
                state.batch.failures().count()
            ));
        }

        if let Some(msg) = &state.status_message {
            ui.separator();
            ui.label(RichText::new(msg).color(Color32::RED));
        }
    });
}

// ---------------------------------------------------------------------------
// Central panel – one card per uploaded file
// ---------------------------------------------------------------------------

pub fn file_cards(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Data Sweeper");
    ui.label("Transform your files between CSV and Excel formats with built-in data cleaning and visualization.");
    ui.separator();

    if state.files.is_empty() {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Upload CSV or Excel files to begin  (File → Upload…)");
        });
        return;
    }

    // Collect interactions and apply them once everything is drawn.
    let mut actions: Vec<(FileId, FileAction)> = Vec::new();
    let mut downloads: Vec<FileId> = Vec::new();
    let mut dismissed: Vec<FileId> = Vec::new();

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            for report in &state.batch.files {
                ui.push_id(report.id, |ui: &mut Ui| {
                    egui::Frame::group(ui.style()).show(ui, |ui: &mut Ui| {
                        ui.set_width(ui.available_width());
                        let mut card = CardOutput::default();
                        file_card(ui, state, report, &mut card);
                        actions.extend(card.actions.into_iter().map(|a| (report.id, a)));
                        if card.download {
                            downloads.push(report.id);
                        }
                        if card.dismiss {
                            dismissed.push(report.id);
                        }
                    });
                });
                ui.add_space(8.0);
            }

            if state.batch.completed() {
                ui.label(RichText::new("✅ All files processed!").color(Color32::DARK_GREEN).strong());
            }
        });

    for (id, action) in actions {
        state.apply(id, action);
    }
    for id in downloads {
        save_file_dialog(state, id);
    }
    for id in dismissed {
        state.dismiss(id);
    }
}

#[derive(Default)]
struct CardOutput {
    actions: Vec<FileAction>,
    download: bool,
    dismiss: bool,
}

fn file_card(ui: &mut Ui, state: &AppState, report: &FileReport, out: &mut CardOutput) {
    let Some(options) = state.options.get(&report.id) else {
        return;
    };

    ui.horizontal(|ui: &mut Ui| {
        ui.label(RichText::new(format!("File Name: {}", report.name)).strong());
        if state.has_duplicate_name(report.id) {
            ui.label(RichText::new(format!("(upload {})", report.id)).weak());
        }
        ui.label(format!("File Size: {:.2} KB", report.size_kb()));
        if ui.small_button("✖").on_hover_text("Remove this file").clicked() {
            out.dismiss = true;
        }
    });

    if let Some(err) = &report.error {
        ui.label(RichText::new(err.to_string()).color(Color32::RED));
    }
    let Some(table) = &report.table else {
        return;
    };

    ui.label("Preview the head of the table");
    preview_table(ui, table, state.settings.preview_rows);

    // ---- Cleaning ----
    ui.add_space(4.0);
    ui.strong("⚙ Data Cleaning Options");
    let mut clean = options.clean_enabled;
    if ui.checkbox(&mut clean, format!("Clean Data for {}", report.name)).changed() {
        out.actions.push(FileAction::SetCleanEnabled(clean));
    }
    if clean {
        ui.horizontal(|ui: &mut Ui| {
            if ui.button(format!("Remove Duplicates from {}", report.name)).clicked() {
                out.actions.push(FileAction::RemoveDuplicates);
            }
            if ui.button(format!("Fill Missing Values for {}", report.name)).clicked() {
                out.actions.push(FileAction::FillMissing);
            }
        });
        if let Some(cleaning) = &report.cleaning {
            if let Some(n) = cleaning.duplicates_removed {
                ui.label(format!("Duplicates removed! ({n} rows)"));
            }
            if let Some(n) = cleaning.cells_filled {
                ui.label(format!("Missing values have been filled ({n} cells)"));
            }
        }
    }

    // ---- Column selection ----
    ui.add_space(4.0);
    ui.strong("📍 Select Columns to Convert");
    let selected = state.selected_columns(report.id);
    egui::CollapsingHeader::new(format!(
        "Choose columns for {}  ({}/{})",
        report.name,
        selected.len(),
        report.original_columns.len()
    ))
    .id_salt("columns")
    .default_open(false)
    .show(ui, |ui: &mut Ui| {
        if ui.small_button("All").clicked() {
            out.actions.push(FileAction::SelectAllColumns);
        }
        for col in &report.original_columns {
            let mut checked = selected.contains(col);
            if ui.checkbox(&mut checked, col.as_str()).changed() {
                out.actions.push(FileAction::ToggleColumn(col.clone()));
            }
        }
    });

    // ---- Visualization ----
    ui.add_space(4.0);
    ui.strong("📊 Data Visualization");
    let mut show_chart = options.show_chart;
    if ui
        .checkbox(&mut show_chart, format!("Show Visualization for {}", report.name))
        .changed()
    {
        out.actions.push(FileAction::SetShowChart(show_chart));
    }
    if options.show_chart {
        plot::bar_chart(ui, ("chart", report.id), report.chart.as_ref());
    }

    // ---- Conversion ----
    ui.add_space(4.0);
    ui.strong("🔁 Conversion Options");
    ui.horizontal(|ui: &mut Ui| {
        ui.label(format!("Convert {} to:", report.name));
        let mut target = options.target;
        for format in TargetFormat::ALL {
            ui.radio_value(&mut target, format, format.label());
        }
        if target != options.target {
            out.actions.push(FileAction::SetTarget(target));
        }
    });

    ui.horizontal(|ui: &mut Ui| {
        if ui.button(format!("Convert {}", report.name)).clicked() {
            out.actions.push(FileAction::Convert);
        }
        if let Some(converted) = &report.converted {
            if ui
                .button(format!("📩 {}", converted.download_label(&report.name)))
                .on_hover_text(converted.file_name.as_str())
                .clicked()
            {
                out.download = true;
            }
        }
    });
}

/// First rows of the table, one column per table column.
fn preview_table(ui: &mut Ui, table: &Table, rows: usize) {
    if table.width() == 0 {
        ui.label("No columns selected.");
        return;
    }
    if table.is_empty() {
        ui.label("No rows.");
        return;
    }
    let head = table.head(rows);

    ui.push_id("preview", |ui: &mut Ui| {
        ScrollArea::horizontal().show(ui, |ui: &mut Ui| {
            TableBuilder::new(ui)
                .striped(true)
                .vscroll(false)
                .columns(TableColumn::auto().at_least(60.0), table.width())
                .header(20.0, |mut header| {
                    for column in table.columns() {
                        header.col(|ui: &mut Ui| {
                            ui.strong(column.name.as_str())
                                .on_hover_text(column.dtype.label());
                        });
                    }
                })
                .body(|mut body| {
                    for row in head {
                        body.row(18.0, |mut table_row| {
                            for cell in row {
                                table_row.col(|ui: &mut Ui| {
                                    ui.label(cell.to_string());
                                });
                            }
                        });
                    }
                });
        });
    });
    ui.label(format!("{} rows × {} columns", table.len(), table.width()));
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

pub fn open_files_dialog(state: &mut AppState) {
    let files = rfd::FileDialog::new()
        .set_title("Upload your CSV or Excel files")
        .add_filter("CSV or Excel", &["csv", "xlsx"])
        .add_filter("All files", &["*"])
        .pick_files();

    if let Some(paths) = files {
        state.add_paths(&paths);
    }
}

fn save_file_dialog(state: &mut AppState, id: FileId) {
    let Some(converted) = state.converted(id) else {
        return;
    };
    let path = rfd::FileDialog::new()
        .set_title("Save converted file")
        .set_file_name(&converted.file_name)
        .save_file();

    if let Some(path) = path {
        match state.save_converted(id, &path) {
            Ok(()) => state.status_message = None,
            Err(e) => {
                log::error!("Failed to save file: {e:#}");
                state.status_message = Some(format!("Error: {e:#}"));
            }
        }
    }
}
