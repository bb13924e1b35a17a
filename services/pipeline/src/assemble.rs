//! Record assembly - periods × indicator rows into weekly records
//!
//! Walks the sheet once per period column, resolving each row label
//! against the catalog, coercing the cell at the intersection and
//! applying plausibility caps. Ends with dedup and chronological
//! ordering. Every local recovery (rescale, discard, duplicate, catalog
//! miss) is logged and collected into the report.

use std::collections::HashSet;

use chrono::NaiveDate;
use tracing::{debug, info, warn};

use crate::catalog;
use crate::error::{IngestError, PeriodCandidate, PeriodDiagnostic};
use crate::label::normalize_label;
use crate::matrix::{CellValue, SheetMatrix};
use crate::numeric;
use crate::period::{infer_period_start, is_valid_period, normalize_period};
use crate::record::{FieldKind, Indicator, WeeklyRecord};
use crate::report::IngestReport;

/// Rows scanned for a replacement header when the nominal header row
/// holds no periods. Google Sheets exports often carry banner rows
/// above the real header.
const HEADER_SCAN_ROWS: usize = 10;

#[derive(Debug)]
pub struct PipelineOutcome {
    pub records: Vec<WeeklyRecord>,
    pub report: IngestReport,
}

struct PeriodColumn {
    index: usize,
    period: String,
}

/// Run the full normalization pipeline over one sheet matrix.
///
/// `today` resolves the calendar year of each period; the result is
/// stored on the record (`period_start`) so the inference happens once,
/// at first ingestion, and never again on read.
pub fn run(matrix: &SheetMatrix, today: NaiveDate) -> Result<PipelineOutcome, IngestError> {
    if matrix.is_empty() || matrix.rows.is_empty() {
        return Err(IngestError::EmptySource);
    }

    let (columns, rows) = anchor_header(matrix);
    let period_columns = find_period_columns(&columns);
    if period_columns.is_empty() {
        return Err(IngestError::NoValidPeriods(diagnose(&columns, rows)));
    }

    let mut report = IngestReport::default();
    report.period_columns = period_columns.iter().map(|p| p.period.clone()).collect();

    let period_indices: HashSet<usize> = period_columns.iter().map(|p| p.index).collect();
    let label_col = (0..columns.len())
        .find(|i| !period_indices.contains(i))
        .unwrap_or(0);

    let mut unmatched_seen: HashSet<String> = HashSet::new();
    let mut records = Vec::with_capacity(period_columns.len());

    for pc in &period_columns {
        let mut record = WeeklyRecord::with_period(pc.period.clone());
        record.period_start = infer_period_start(&pc.period, today);

        for row in rows {
            let Some(raw_label) = row.get(label_col).and_then(CellValue::as_text) else {
                continue;
            };
            let label = normalize_label(raw_label);
            let Some(indicator) = catalog::resolve(&label) else {
                if row_has_value_under(row, &period_indices) && unmatched_seen.insert(label.clone())
                {
                    warn!(label = %raw_label, "row label matched no catalog entry");
                    report.unmatched_labels.push(raw_label.trim().to_string());
                }
                continue;
            };

            let Some(cell) = row.get(pc.index) else { continue };
            if cell.is_blank() {
                continue;
            }

            match indicator {
                Indicator::ListaAtrasosRaiza => {
                    if let Some(text) = cell.as_text() {
                        record.lista_atrasos_raiza = Some(text.trim().to_string());
                    }
                    continue;
                }
                // Always recomputed from the OI counts; a raw count in
                // this cell must never be stored as a percent.
                Indicator::PercentualOisRealizadas => {
                    debug!(period = %pc.period, "ignoring source cell for derived OI conversion");
                    continue;
                }
                _ => {}
            }

            let coercion = numeric::coerce(cell, indicator.kind());
            if let Some(rule) = coercion.rescale {
                debug!(
                    period = %pc.period,
                    field = indicator.key(),
                    %rule,
                    value = ?coercion.value,
                    "percentage rescale applied"
                );
                report.record_rescale(
                    &pc.period,
                    indicator.key(),
                    rule,
                    coercion.parsed.unwrap_or_default(),
                    coercion.value,
                );
            }
            let Some(value) = coercion.value else { continue };

            if value < 0.0 {
                warn!(period = %pc.period, field = indicator.key(), value, "negative value discarded");
                report.record_implausible(&pc.period, indicator.key(), value, 0.0);
                continue;
            }
            if let Some(cap) = indicator.cap() {
                if value > cap {
                    warn!(
                        period = %pc.period,
                        field = indicator.key(),
                        value,
                        cap,
                        "implausible value discarded, default kept"
                    );
                    report.record_implausible(&pc.period, indicator.key(), value, cap);
                    continue;
                }
            }
            // Later rows resolving to the same field override earlier
            // ones.
            indicator.apply(&mut record, value);
        }

        record.compute_derived();
        records.push(record);
    }

    let records = finalize(records, &mut report);
    info!(
        records = records.len(),
        duplicates = report.duplicate_periods.len(),
        unmatched = report.unmatched_labels.len(),
        rescales = report.rescales.len(),
        "pipeline run complete"
    );
    Ok(PipelineOutcome { records, report })
}

/// Collapse duplicate periods (first seen wins) and order the survivors
/// chronologically. Records without a resolvable date sort lexically
/// after all dated ones and are flagged as anomalies.
fn finalize(records: Vec<WeeklyRecord>, report: &mut IngestReport) -> Vec<WeeklyRecord> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut kept: Vec<WeeklyRecord> = Vec::with_capacity(records.len());
    for record in records {
        let key = record.period.trim().to_lowercase();
        if seen.insert(key) {
            kept.push(record);
        } else {
            debug!(period = %record.period, "duplicate period dropped, first seen wins");
            report.duplicate_periods.push(record.period);
        }
    }

    for record in &kept {
        if record.period_start.is_none() {
            warn!(period = %record.period, "period has no resolvable date, sorting lexically");
            report.unsortable_periods.push(record.period.clone());
        }
    }

    kept.sort_by(|a, b| match (a.period_start, b.period_start) {
        (Some(x), Some(y)) => x.cmp(&y).then_with(|| a.period.cmp(&b.period)),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.period.cmp(&b.period),
    });
    kept
}

/// Use the nominal header row when it holds at least one valid period;
/// otherwise scan the leading data rows for a row holding two or more
/// and re-anchor there.
fn anchor_header(matrix: &SheetMatrix) -> (Vec<String>, &[Vec<CellValue>]) {
    let header_has_periods = matrix.columns.iter().any(|c| is_valid_period(c));
    if header_has_periods {
        return (matrix.columns.clone(), &matrix.rows);
    }

    for (idx, row) in matrix.rows.iter().take(HEADER_SCAN_ROWS).enumerate() {
        let period_cells = row
            .iter()
            .filter(|cell| cell.as_text().is_some_and(is_valid_period))
            .count();
        if period_cells >= 2 {
            debug!(row = idx, "re-anchored header below banner rows");
            let columns = row.iter().map(raw_text_of).collect();
            return (columns, &matrix.rows[idx + 1..]);
        }
    }
    (matrix.columns.clone(), &matrix.rows)
}

fn find_period_columns(columns: &[String]) -> Vec<PeriodColumn> {
    columns
        .iter()
        .enumerate()
        .filter(|(_, label)| is_valid_period(label))
        .map(|(index, label)| PeriodColumn {
            index,
            period: normalize_period(label),
        })
        .collect()
}

/// Build the user-facing diagnostic for a sheet with no period columns:
/// every label seen, plus the ones that look like malformed periods
/// with a few sample values from their column.
fn diagnose(columns: &[String], rows: &[Vec<CellValue>]) -> PeriodDiagnostic {
    let candidates = columns
        .iter()
        .enumerate()
        .filter(|(_, label)| {
            label.contains('/') && label.chars().any(|c| c.is_ascii_digit())
        })
        .map(|(index, label)| PeriodCandidate {
            label: label.clone(),
            sample_values: rows
                .iter()
                .filter_map(|row| row.get(index))
                .filter(|cell| !cell.is_blank())
                .take(3)
                .map(raw_text_of)
                .collect(),
        })
        .collect();

    PeriodDiagnostic {
        columns: columns
            .iter()
            .filter(|c| !c.trim().is_empty())
            .cloned()
            .collect(),
        candidates,
    }
}

fn row_has_value_under(row: &[CellValue], period_indices: &HashSet<usize>) -> bool {
    period_indices
        .iter()
        .any(|&i| row.get(i).is_some_and(|cell| !cell.is_blank()))
}

fn raw_text_of(cell: &CellValue) -> String {
    match cell {
        CellValue::Empty => String::new(),
        CellValue::Number(n) => format!("{}", n),
        CellValue::Text(s) => s.trim().to_string(),
    }
}
