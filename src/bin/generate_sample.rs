//! Writes `sample_data.csv` and `sample_data.xlsx` into the working directory:
//! a small sales table with repeated rows, gaps in the numeric columns and a
//! text column, for trying out the cleaning steps by hand.

use anyhow::{Context, Result};
use rust_xlsxwriter::{Format, Workbook};

const REGIONS: [&str; 4] = ["north", "south", "east", "west"];
const HEADERS: [&str; 4] = ["region", "units", "price", "note"];

/// Minimal deterministic PRNG (64-bit LCG), so every run writes the same data.
struct Lcg(u64);

impl Lcg {
    fn next_u32(&mut self) -> u32 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.0 >> 33) as u32
    }

    fn below(&mut self, n: u32) -> u32 {
        self.next_u32() % n
    }
}

struct Row {
    region: &'static str,
    units: Option<i64>,
    price: Option<f64>,
    note: Option<String>,
}

fn generate_rows(n: usize) -> Vec<Row> {
    let mut rng = Lcg(42);
    let mut rows: Vec<Row> = Vec::with_capacity(n);
    for i in 0..n {
        // Every seventh row repeats the previous one verbatim.
        if i % 7 == 6 {
            let prev = &rows[i - 1];
            rows.push(Row {
                region: prev.region,
                units: prev.units,
                price: prev.price,
                note: prev.note.clone(),
            });
            continue;
        }
        rows.push(Row {
            region: REGIONS[rng.below(REGIONS.len() as u32) as usize],
            units: (rng.below(5) != 0).then(|| 10 + rng.below(90) as i64),
            price: (rng.below(6) != 0).then(|| (500 + rng.below(5000)) as f64 / 100.0),
            note: (rng.below(3) == 0).then(|| format!("batch {}", rng.below(10))),
        });
    }
    rows
}

fn write_csv(rows: &[Row], path: &str) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).with_context(|| format!("creating {path}"))?;
    writer.write_record(HEADERS)?;
    for row in rows {
        writer.write_record([
            row.region.to_string(),
            row.units.map(|u| u.to_string()).unwrap_or_default(),
            row.price.map(|p| p.to_string()).unwrap_or_default(),
            row.note.clone().unwrap_or_default(),
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn write_xlsx(rows: &[Row], path: &str) -> Result<()> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let sheet = workbook.add_worksheet();

    for (col, header) in HEADERS.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *header, &bold)?;
    }
    for (r, row) in rows.iter().enumerate() {
        let xl_row = r as u32 + 1;
        sheet.write_string(xl_row, 0, row.region)?;
        if let Some(units) = row.units {
            sheet.write_number(xl_row, 1, units as f64)?;
        }
        if let Some(price) = row.price {
            sheet.write_number(xl_row, 2, price)?;
        }
        if let Some(note) = &row.note {
            sheet.write_string(xl_row, 3, note)?;
        }
    }
    workbook
        .save(path)
        .with_context(|| format!("writing {path}"))?;
    Ok(())
}

fn main() -> Result<()> {
    let rows = generate_rows(40);
    write_csv(&rows, "sample_data.csv")?;
    write_xlsx(&rows, "sample_data.xlsx")?;
    println!("Wrote {} rows to sample_data.csv and sample_data.xlsx", rows.len());
    Ok(())
}
