//! Pair summary persistence and per-slice coefficient tables

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use roadfit_core::AreaId;
use roadfit_core::aggregate::PairSummaryTable;
use roadfit_core::fit::{CoefficientReport, Estimate};
use serde::Serialize;
use tracing::info;

use crate::error::AppError;

#[derive(Debug, Serialize)]
struct CoefficientRow {
    area: AreaId,
    /// Seconds per meter, empty for unconstrained areas without fallback
    coefficient: Option<f64>,
    speed_kmh: Option<f64>,
    status: &'static str,
    samples: usize,
    mean_residual: f64,
    rmse: f64,
}

fn create(path: &Path) -> Result<BufWriter<File>, AppError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(AppError::io(parent))?;
    }
    let file = File::create(path).map_err(AppError::io(path))?;
    Ok(BufWriter::new(file))
}

pub fn write_pair_table(path: &Path, table: &PairSummaryTable) -> Result<(), AppError> {
    let mut writer = create(path)?;
    serde_json::to_writer_pretty(&mut writer, table).map_err(AppError::json(path))?;
    writer.flush().map_err(AppError::io(path))?;
    info!(
        "Wrote {} pair summaries ({} missing) to {}",
        table.len(),
        table.missing.len(),
        path.display()
    );
    Ok(())
}

pub fn read_pair_table(path: &Path) -> Result<PairSummaryTable, AppError> {
    let file = File::open(path).map_err(AppError::io(path))?;
    let mut table: PairSummaryTable =
        serde_json::from_reader(BufReader::new(file)).map_err(AppError::json(path))?;
    // Lookups binary-search the summaries
    table
        .summaries
        .sort_by_key(|s| (s.origin, s.destination));
    Ok(table)
}

/// Writes `area,coefficient,speed_kmh,status,samples,mean_residual,rmse`
pub fn write_coefficients<W: io::Write>(
    writer: W,
    report: &CoefficientReport,
) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(writer);
    for coefficient in &report.coefficients {
        let status = match coefficient.estimate {
            Estimate::Fitted(_) => "fitted",
            Estimate::Unconstrained { fallback: Some(_) } => "fallback",
            Estimate::Unconstrained { fallback: None } => "unconstrained",
        };
        writer.serialize(CoefficientRow {
            area: coefficient.area,
            coefficient: coefficient.estimate.value(),
            speed_kmh: coefficient.speed_kmh(),
            status,
            samples: coefficient.diagnostics.samples,
            mean_residual: coefficient.diagnostics.mean_residual,
            rmse: coefficient.diagnostics.rmse,
        })?;
    }
    writer.flush()?;
    Ok(())
}

/// File stem for a slice name, restricted to `[A-Za-z0-9_-]`
fn file_stem(slice: &str) -> String {
    let stem: String = slice
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    if stem.is_empty() { "slice".into() } else { stem }
}

/// Writes `<slice>.csv` with the coefficients and `<slice>.json` with the full
/// report into `dir`, returning the CSV path
pub fn write_slice_report(dir: &Path, report: &CoefficientReport) -> Result<PathBuf, AppError> {
    let stem = file_stem(&report.slice);
    let csv_path = dir.join(format!("{stem}.csv"));
    let json_path = dir.join(format!("{stem}.json"));

    write_coefficients(create(&csv_path)?, report).map_err(AppError::csv(&csv_path))?;

    let mut writer = create(&json_path)?;
    serde_json::to_writer_pretty(&mut writer, report).map_err(AppError::json(&json_path))?;
    writer.flush().map_err(AppError::io(&json_path))?;

    info!(
        "Wrote {} coefficients of slice '{}' to {}",
        report.coefficients.len(),
        report.slice,
        csv_path.display()
    );
    Ok(csv_path)
}
