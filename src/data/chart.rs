use super::model::Table;

/// Bars are drawn for at most this many numeric columns.
pub const MAX_SERIES: usize = 2;

/// One bar per row; `None` where the cell is missing.
#[derive(Debug, Clone, PartialEq)]
pub struct BarSeries {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BarChartData {
    pub series: Vec<BarSeries>,
}

impl BarChartData {
    /// Number of row positions on the x axis.
    pub fn categories(&self) -> usize {
        self.series.first().map_or(0, |s| s.values.len())
    }
}

/// Chart the first numeric columns of `table`.
///
/// Tables with a single numeric column get a single series; tables without
/// one get no chart at all.
pub fn bar_chart(table: &Table) -> Option<BarChartData> {
    let series: Vec<BarSeries> = table
        .numeric_columns()
        .into_iter()
        .take(MAX_SERIES)
        .map(|idx| BarSeries {
            name: table.columns()[idx].name.clone(),
            values: table.rows().iter().map(|row| row[idx].as_f64()).collect(),
        })
        .collect();

    if series.is_empty() {
        log::debug!("No numeric columns to chart");
        return None;
    }
    Some(BarChartData { series })
}
