/// Data layer: table model, loading, cleaning, charting and conversion.
///
/// Architecture:
/// ```text
///  .csv / .xlsx bytes
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  detect extension, parse → Table
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  clean    │  drop duplicate rows, fill numeric gaps with the mean
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  model    │  Table::project → selected columns
///   └──────────┘
///        │
///        ├──────────────┐
///        ▼              ▼
///   ┌──────────┐   ┌──────────┐
///   │  chart    │   │ convert  │  Table → CSV / XLSX bytes
///   └──────────┘   └──────────┘
/// ```

pub mod chart;
pub mod clean;
pub mod convert;
pub mod error;
pub mod loader;
pub mod model;
