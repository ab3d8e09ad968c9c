use std::collections::HashSet;

use super::model::{CellValue, ColumnType, Table};

// ---------------------------------------------------------------------------
// Cleaning options and report
// ---------------------------------------------------------------------------

/// Which cleaning steps the user switched on for a file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleaningOptions {
    pub remove_duplicates: bool,
    pub fill_missing: bool,
}

/// What the cleaning pass actually changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleaningReport {
    /// `None` when the step was not requested.
    pub duplicates_removed: Option<usize>,
    pub cells_filled: Option<usize>,
}

impl CleaningReport {
    pub fn any_applied(&self) -> bool {
        self.duplicates_removed.is_some() || self.cells_filled.is_some()
    }
}

/// Run the requested steps. Duplicates always go first so the fill means are
/// computed over distinct rows.
pub fn apply(table: &mut Table, options: &CleaningOptions) -> CleaningReport {
    let mut report = CleaningReport::default();
    if options.remove_duplicates {
        report.duplicates_removed = Some(remove_duplicates(table));
    }
    if options.fill_missing {
        report.cells_filled = Some(fill_missing_numeric(table));
    }
    report
}

// ---------------------------------------------------------------------------
// Steps
// ---------------------------------------------------------------------------

/// Drop every row identical to an earlier one, keeping the first occurrence.
/// Returns the number of rows dropped.
pub fn remove_duplicates(table: &mut Table) -> usize {
    let before = table.len();
    let mut seen: HashSet<Vec<CellValue>> = HashSet::with_capacity(before);
    table.rows_mut().retain(|row| seen.insert(row.clone()));
    let removed = before - table.len();
    if removed > 0 {
        log::debug!("Removed {removed} duplicate rows");
    }
    removed
}

/// Arithmetic mean of the non-missing cells of a numeric column.
pub fn column_mean(table: &Table, idx: usize) -> Option<f64> {
    let (sum, count) = table
        .rows()
        .iter()
        .filter_map(|row| row[idx].as_f64())
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Replace missing cells of every numeric column with that column's mean.
/// Text, bool, date and all-missing columns keep their gaps.
/// Returns the number of cells filled.
pub fn fill_missing_numeric(table: &mut Table) -> usize {
    let mut filled = 0;
    for idx in table.numeric_columns() {
        if table.missing_count(idx) == 0 {
            continue;
        }
        let Some(mean) = column_mean(table, idx) else {
            continue;
        };

        // An integer column cannot hold a fractional mean.
        if table.columns()[idx].dtype == ColumnType::Integer {
            table.set_dtype(idx, ColumnType::Float);
            for row in table.rows_mut() {
                if let CellValue::Integer(i) = row[idx] {
                    row[idx] = CellValue::Float(i as f64);
                }
            }
        }
        for row in table.rows_mut() {
            if row[idx].is_null() {
                row[idx] = CellValue::Float(mean);
                filled += 1;
            }
        }
    }
    filled
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn table(names: &[&str], rows: Vec<Vec<CellValue>>) -> Table {
        Table::new(names.iter().map(|n| n.to_string()).collect(), rows)
    }

    fn i(v: i64) -> CellValue {
        CellValue::Integer(v)
    }

    fn f(v: f64) -> CellValue {
        CellValue::Float(v)
    }

    #[test]
    fn keeps_first_of_identical_rows() {
        let mut t = table(
            &["A", "B"],
            vec![
                vec![i(1), CellValue::Null],
                vec![i(2), f(4.0)],
                vec![i(1), CellValue::Null],
                vec![i(2), f(5.0)],
            ],
        );
        assert_eq!(remove_duplicates(&mut t), 1);
        assert_eq!(
            t.rows(),
            &[
                vec![i(1), CellValue::Null],
                vec![i(2), f(4.0)],
                vec![i(2), f(5.0)]
            ]
        );
    }

    #[test]
    fn removing_duplicates_is_idempotent() {
        let mut t = table(
            &["k"],
            vec![vec![i(3)], vec![i(3)], vec![i(1)], vec![i(3)]],
        );
        remove_duplicates(&mut t);
        let once = t.clone();
        assert_eq!(remove_duplicates(&mut t), 0);
        assert_eq!(t, once);
    }

    #[test]
    fn fills_numeric_gaps_with_the_mean() {
        let mut t = table(
            &["x", "label"],
            vec![
                vec![f(1.0), CellValue::Text("a".into())],
                vec![CellValue::Null, CellValue::Null],
                vec![f(3.0), CellValue::Text("c".into())],
                vec![f(8.0), CellValue::Text("d".into())],
            ],
        );
        let before = column_mean(&t, 0).unwrap();

        assert_eq!(fill_missing_numeric(&mut t), 1);
        assert_eq!(t.missing_count(0), 0);
        assert_relative_eq!(t.rows()[1][0].as_f64().unwrap(), 4.0);
        // Cells that were already present keep the same mean.
        let kept: Vec<f64> = [0, 2, 3].iter().map(|&r| t.rows()[r][0].as_f64().unwrap()).collect();
        assert_relative_eq!(kept.iter().sum::<f64>() / 3.0, before);
        assert_relative_eq!(column_mean(&t, 0).unwrap(), before);
        // Text column keeps its gap.
        assert_eq!(t.rows()[1][1], CellValue::Null);
    }

    #[test]
    fn integer_column_with_gaps_becomes_float() {
        let mut t = Table::new(vec!["n".into()], vec![vec![i(1)], vec![CellValue::Null], vec![i(2)]]);
        assert_eq!(t.columns()[0].dtype, ColumnType::Integer);
        fill_missing_numeric(&mut t);
        assert_eq!(t.columns()[0].dtype, ColumnType::Float);
        assert_eq!(t.rows(), &[vec![f(1.0)], vec![f(1.5)], vec![f(2.0)]]);
    }

    #[test]
    fn all_missing_column_is_left_alone() {
        let mut t = table(&["empty"], vec![vec![CellValue::Null], vec![CellValue::Null]]);
        assert_eq!(fill_missing_numeric(&mut t), 0);
        assert_eq!(t.missing_count(0), 2);
    }

    #[test]
    fn duplicates_are_removed_before_the_mean_is_taken() {
        // Three copies of 10.0 would pull the mean up if counted.
        let rows = vec![
            vec![i(1), f(10.0)],
            vec![i(1), f(10.0)],
            vec![i(1), f(10.0)],
            vec![i(2), f(2.0)],
            vec![i(3), CellValue::Null],
        ];
        let mut t = table(&["id", "v"], rows);
        let report = apply(
            &mut t,
            &CleaningOptions {
                remove_duplicates: true,
                fill_missing: true,
            },
        );
        assert_eq!(report.duplicates_removed, Some(2));
        assert_eq!(report.cells_filled, Some(1));
        assert_relative_eq!(t.rows()[2][1].as_f64().unwrap(), 6.0);
    }

    #[test]
    fn nothing_requested_changes_nothing() {
        let mut t = table(&["a"], vec![vec![i(1)], vec![i(1)]]);
        let report = apply(&mut t, &CleaningOptions::default());
        assert!(!report.any_applied());
        assert_eq!(t.len(), 2);
    }
}
