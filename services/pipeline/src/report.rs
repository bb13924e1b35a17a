//! Ingest report - everything a run decided on the caller's behalf
//!
//! Rescales, discarded values, dropped duplicates and catalog misses
//! are recovered locally but never silently: each is logged at the
//! point of decision and collected here for the response body.

use serde::Serialize;

use crate::numeric::RescaleRule;

#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestReport {
    /// Column labels accepted as periods, in sheet order.
    pub period_columns: Vec<String>,
    /// Periods dropped because an earlier record claimed them.
    pub duplicate_periods: Vec<String>,
    /// Row labels carrying numeric data that matched no catalog entry.
    /// Surfaced to catch catalog gaps.
    pub unmatched_labels: Vec<String>,
    /// Every percentage rescale applied, for audit.
    pub rescales: Vec<RescaleEvent>,
    /// Values discarded as implausible; the field kept its default.
    pub implausible: Vec<ImplausibleEvent>,
    /// Periods that could not be placed on the calendar and were sorted
    /// lexically after all dated ones.
    pub unsortable_periods: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RescaleEvent {
    pub period: String,
    pub field: &'static str,
    pub rule: String,
    pub from: f64,
    pub to: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ImplausibleEvent {
    pub period: String,
    pub field: &'static str,
    pub value: f64,
    pub cap: f64,
}

impl IngestReport {
    pub fn record_rescale(
        &mut self,
        period: &str,
        field: &'static str,
        rule: RescaleRule,
        from: f64,
        to: Option<f64>,
    ) {
        self.rescales.push(RescaleEvent {
            period: period.to_string(),
            field,
            rule: rule.to_string(),
            from,
            to,
        });
    }

    pub fn record_implausible(&mut self, period: &str, field: &'static str, value: f64, cap: f64) {
        self.implausible.push(ImplausibleEvent {
            period: period.to_string(),
            field,
            value,
            cap,
        });
    }
}
