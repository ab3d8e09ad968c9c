use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};

use super::error::SweepError;

// ---------------------------------------------------------------------------
// CellValue – a single cell of a table
// ---------------------------------------------------------------------------

/// A dynamically-typed cell mirroring the usual dataframe dtypes.
/// Rows are hashed and compared for duplicate removal, so `CellValue` must be
/// `Eq + Hash`. `Null` is the only representation of a missing value.
#[derive(Debug, Clone)]
pub enum CellValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    /// `YYYY-MM-DD HH:MM:SS` text, as read from a spreadsheet date cell.
    DateTime(String),
    Null,
}

/// `-0.0` and `0.0` are the same value for row comparison.
fn canonical(v: f64) -> f64 {
    if v == 0.0 {
        0.0
    } else {
        v
    }
}

impl PartialEq for CellValue {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for CellValue {}

impl PartialOrd for CellValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CellValue {
    fn cmp(&self, other: &Self) -> Ordering {
        use CellValue::*;
        fn discriminant(v: &CellValue) -> u8 {
            match v {
                Null => 0,
                Bool(_) => 1,
                Integer(_) => 2,
                Float(_) => 3,
                Text(_) => 4,
                DateTime(_) => 5,
            }
        }
        match (self, other) {
            (Null, Null) => Ordering::Equal,
            (Bool(a), Bool(b)) => a.cmp(b),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => canonical(*a).total_cmp(&canonical(*b)),
            (Text(a), Text(b)) | (DateTime(a), DateTime(b)) => a.cmp(b),
            _ => discriminant(self).cmp(&discriminant(other)),
        }
    }
}

impl Hash for CellValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            CellValue::Text(s) | CellValue::DateTime(s) => s.hash(state),
            CellValue::Integer(i) => i.hash(state),
            CellValue::Float(f) => canonical(*f).to_bits().hash(state),
            CellValue::Bool(b) => b.hash(state),
            CellValue::Null => {}
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) | CellValue::DateTime(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v:.4}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Null => write!(f, "<null>"),
        }
    }
}

impl CellValue {
    /// Interpret the value as an `f64` (numeric cells only).
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Float(v) => Some(*v),
            CellValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Text used when the cell is written to a CSV field.
    ///
    /// Integral floats keep a trailing `.0` so a float column reads back as
    /// float; booleans use the capitalised spelling.
    pub fn to_field(&self) -> String {
        match self {
            CellValue::Text(s) | CellValue::DateTime(s) => s.clone(),
            CellValue::Integer(i) => i.to_string(),
            CellValue::Float(v) if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e16 => {
                format!("{v:.1}")
            }
            CellValue::Float(v) => v.to_string(),
            CellValue::Bool(true) => "True".to_string(),
            CellValue::Bool(false) => "False".to_string(),
            CellValue::Null => String::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Column types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Float,
    Bool,
    DateTime,
    Text,
    /// Every cell is missing.
    Empty,
}

impl ColumnType {
    /// Infer the type of a column from its cells, ignoring missing ones.
    pub fn infer<'a>(cells: impl IntoIterator<Item = &'a CellValue>) -> Self {
        let mut inferred = ColumnType::Empty;
        for cell in cells {
            let this = match cell {
                CellValue::Null => continue,
                CellValue::Integer(_) => ColumnType::Integer,
                CellValue::Float(_) => ColumnType::Float,
                CellValue::Bool(_) => ColumnType::Bool,
                CellValue::DateTime(_) => ColumnType::DateTime,
                CellValue::Text(_) => ColumnType::Text,
            };
            inferred = match (inferred, this) {
                (ColumnType::Empty, t) => t,
                (a, b) if a == b => a,
                (ColumnType::Integer, ColumnType::Float)
                | (ColumnType::Float, ColumnType::Integer) => ColumnType::Float,
                _ => return ColumnType::Text,
            };
        }
        inferred
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, ColumnType::Integer | ColumnType::Float)
    }

    pub fn label(self) -> &'static str {
        match self {
            ColumnType::Integer => "int",
            ColumnType::Float => "float",
            ColumnType::Bool => "bool",
            ColumnType::DateTime => "datetime",
            ColumnType::Text => "text",
            ColumnType::Empty => "empty",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub dtype: ColumnType,
}

// ---------------------------------------------------------------------------
// Table – the parsed, rectangular dataset
// ---------------------------------------------------------------------------

/// Named, typed columns over ordered rows. Every row has exactly one cell per
/// column.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    rows: Vec<Vec<CellValue>>,
}

impl Table {
    /// Build a table, padding short rows with `Null` and inferring each
    /// column's type from its cells.
    pub fn new(names: Vec<String>, mut rows: Vec<Vec<CellValue>>) -> Self {
        let width = names.len();
        for row in &mut rows {
            row.resize(width, CellValue::Null);
        }
        let columns = names
            .into_iter()
            .enumerate()
            .map(|(idx, name)| Column {
                name,
                dtype: ColumnType::infer(rows.iter().map(|r| &r[idx])),
            })
            .collect();
        Table { columns, rows }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<String> {
        self.columns.iter().map(|c| c.name.clone()).collect()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn rows(&self) -> &[Vec<CellValue>] {
        &self.rows
    }

    pub(crate) fn rows_mut(&mut self) -> &mut Vec<Vec<CellValue>> {
        &mut self.rows
    }

    pub(crate) fn set_dtype(&mut self, idx: usize, dtype: ColumnType) {
        self.columns[idx].dtype = dtype;
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of columns.
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    /// The first `n` rows.
    pub fn head(&self, n: usize) -> &[Vec<CellValue>] {
        &self.rows[..n.min(self.rows.len())]
    }

    /// Indices of numeric columns, in column order.
    pub fn numeric_columns(&self) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.dtype.is_numeric())
            .map(|(i, _)| i)
            .collect()
    }

    pub fn missing_count(&self, idx: usize) -> usize {
        self.rows.iter().filter(|r| r[idx].is_null()).count()
    }

    /// Keep only the selected columns, in selection order.
    ///
    /// A name repeated in `selection` is taken once.
    pub fn project(&self, selection: &[String]) -> Result<Table, SweepError> {
        let mut seen = HashSet::new();
        let mut indices = Vec::with_capacity(selection.len());
        for name in selection {
            if !seen.insert(name.as_str()) {
                continue;
            }
            let idx = self
                .column_index(name)
                .ok_or_else(|| SweepError::UnknownColumn(name.clone()))?;
            indices.push(idx);
        }

        let columns = indices.iter().map(|&i| self.columns[i].clone()).collect();
        let rows = self
            .rows
            .iter()
            .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
            .collect();
        Ok(Table { columns, rows })
    }
}
