use std::collections::BTreeSet;

use hashbrown::HashMap;
use itertools::Itertools;
use log::{debug, warn};
use serde::Serialize;

use crate::{AreaId, Error, Length, aggregate::PairSummaryTable, model::ObservedTrip};

/// Sparse trips × areas matrix of traveled meters, with the observed durations.
///
/// Rows are stored compressed: the entries of row `i` are
/// `columns[offsets[i]..offsets[i + 1]]` and the matching `values`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DesignMatrix {
    areas: Vec<AreaId>,
    offsets: Vec<usize>,
    columns: Vec<usize>,
    values: Vec<f64>,
    observed: Vec<f64>,
}

impl DesignMatrix {
    /// Builds the matrix from sparse rows of `(column, value)`.
    ///
    /// # Errors
    ///
    /// [`Error::DimensionMismatch`] if row and observation counts differ or a
    /// column is out of range, [`Error::InvalidData`] for non-finite values
    pub fn from_sparse_rows(
        areas: Vec<AreaId>,
        rows: Vec<Vec<(usize, f64)>>,
        observed: Vec<f64>,
    ) -> Result<Self, Error> {
        if rows.len() != observed.len() {
            return Err(Error::DimensionMismatch {
                expected: rows.len(),
                actual: observed.len(),
            });
        }
        if observed.iter().any(|t| !t.is_finite()) {
            return Err(Error::InvalidData("non-finite observed duration".into()));
        }

        let mut matrix = Self {
            areas,
            offsets: Vec::with_capacity(rows.len() + 1),
            columns: Vec::new(),
            values: Vec::new(),
            observed,
        };
        matrix.offsets.push(0);
        for mut row in rows {
            row.sort_by_key(|&(col, _)| col);
            for (col, value) in row {
                if col >= matrix.areas.len() {
                    return Err(Error::DimensionMismatch {
                        expected: matrix.areas.len(),
                        actual: col + 1,
                    });
                }
                if !value.is_finite() {
                    return Err(Error::InvalidData(format!(
                        "non-finite distance in column {col}"
                    )));
                }
                if value != 0.0 {
                    matrix.columns.push(col);
                    matrix.values.push(value);
                }
            }
            matrix.offsets.push(matrix.columns.len());
        }
        Ok(matrix)
    }

    /// Builds the matrix from dense rows, one value per area
    pub fn from_dense_rows(
        areas: Vec<AreaId>,
        rows: &[Vec<f64>],
        observed: Vec<f64>,
    ) -> Result<Self, Error> {
        let width = areas.len();
        let mut sparse = Vec::with_capacity(rows.len());
        for row in rows {
            if row.len() != width {
                return Err(Error::DimensionMismatch {
                    expected: width,
                    actual: row.len(),
                });
            }
            sparse.push(row.iter().copied().enumerate().collect());
        }
        Self::from_sparse_rows(areas, sparse, observed)
    }

    pub fn rows(&self) -> usize {
        self.observed.len()
    }

    pub fn cols(&self) -> usize {
        self.areas.len()
    }

    pub fn areas(&self) -> &[AreaId] {
        &self.areas
    }

    pub fn observed(&self) -> &[f64] {
        &self.observed
    }

    /// Non-zero `(column, value)` entries of one row
    pub fn row(&self, row: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let range = self.offsets[row]..self.offsets[row + 1];
        self.columns[range.clone()]
            .iter()
            .copied()
            .zip(self.values[range].iter().copied())
    }

    /// `D x`
    pub fn mul(&self, x: &[f64]) -> Vec<f64> {
        (0..self.rows())
            .map(|row| self.row(row).map(|(col, value)| value * x[col]).sum())
            .collect()
    }

    /// `D^T r`
    pub fn mul_transpose(&self, r: &[f64]) -> Vec<f64> {
        let mut out = vec![0.0; self.cols()];
        for (row, &weight) in r.iter().enumerate() {
            for (col, value) in self.row(row) {
                out[col] += value * weight;
            }
        }
        out
    }

    /// Number of rows with a non-zero entry, per column
    pub fn column_support(&self) -> Vec<usize> {
        let mut support = vec![0; self.cols()];
        for &col in &self.columns {
            support[col] += 1;
        }
        support
    }

    pub fn column_norms_squared(&self) -> Vec<f64> {
        let mut norms = vec![0.0; self.cols()];
        for (&col, &value) in self.columns.iter().zip(&self.values) {
            norms[col] += value * value;
        }
        norms
    }

    /// Splits off every `stride`-th row (index `% stride == stride - 1`) as
    /// test set; `stride < 2` keeps all rows for training.
    pub fn split_holdout(&self, stride: usize) -> (Self, Option<Self>) {
        if stride < 2 || self.rows() < stride {
            return (self.clone(), None);
        }
        let (test, train): (Vec<usize>, Vec<usize>) =
            (0..self.rows()).partition(|row| row % stride == stride - 1);
        (self.select_rows(&train), Some(self.select_rows(&test)))
    }

    fn select_rows(&self, rows: &[usize]) -> Self {
        let mut selected = Self {
            areas: self.areas.clone(),
            offsets: vec![0],
            ..Self::default()
        };
        for &row in rows {
            for (col, value) in self.row(row) {
                selected.columns.push(col);
                selected.values.push(value);
            }
            selected.offsets.push(selected.columns.len());
            selected.observed.push(self.observed[row]);
        }
        selected
    }
}

/// Bookkeeping of [`build_design_matrix`]
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DesignReport {
    pub trips: usize,
    pub rows: usize,
    /// Trips whose area pair has no path summary
    pub missing: usize,
    /// Trips with a non-finite or negative duration
    pub invalid: usize,
    /// Trips whose path only crosses excluded areas or has zero length
    pub empty: usize,
    /// Meters in the used rows that belong to no area
    pub unassigned_length: Length,
}

/// Turns observed trips into design-matrix rows using the routed pair summaries.
///
/// Columns are `areas` together with every area the used paths cross, minus
/// `excluded`, in ascending order. Trips without summary are counted as missing
/// observations, not errors.
pub fn build_design_matrix<'a>(
    trips: impl IntoIterator<Item = &'a ObservedTrip>,
    table: &PairSummaryTable,
    areas: &[AreaId],
    excluded: &[AreaId],
) -> Result<(DesignMatrix, DesignReport), Error> {
    let excluded: BTreeSet<AreaId> = excluded.iter().copied().collect();
    let mut report = DesignReport::default();

    let mut used = Vec::new();
    for trip in trips {
        report.trips += 1;
        if !trip.duration.is_finite() || trip.duration < 0.0 {
            report.invalid += 1;
            continue;
        }
        let Some(summary) = table.get(trip.origin, trip.destination) else {
            debug!(
                "No path summary for areas {} -> {}",
                trip.origin, trip.destination
            );
            report.missing += 1;
            continue;
        };
        if summary
            .traversal
            .areas
            .iter()
            .all(|(area, share)| excluded.contains(area) || share.length <= 0.0)
        {
            report.empty += 1;
            continue;
        }
        report.unassigned_length += summary.traversal.unassigned.length;
        used.push((trip, summary));
    }

    let columns: Vec<AreaId> = areas
        .iter()
        .copied()
        .chain(used.iter().flat_map(|(_, s)| s.traversal.areas.keys().copied()))
        .filter(|area| !excluded.contains(area))
        .sorted_unstable()
        .dedup()
        .collect();
    let column_of: HashMap<AreaId, usize> = columns
        .iter()
        .enumerate()
        .map(|(col, &area)| (area, col))
        .collect();

    let mut rows = Vec::with_capacity(used.len());
    let mut observed = Vec::with_capacity(used.len());
    for (trip, summary) in used {
        let row = summary
            .traversal
            .areas
            .iter()
            .filter_map(|(area, share)| column_of.get(area).map(|&col| (col, share.length)))
            .collect();
        rows.push(row);
        observed.push(trip.duration);
    }
    report.rows = rows.len();

    if report.missing > 0 {
        warn!(
            "{} of {} trips have no routed path and were left out",
            report.missing, report.trips
        );
    }

    let matrix = DesignMatrix::from_sparse_rows(columns, rows, observed)?;
    Ok((matrix, report))
}
