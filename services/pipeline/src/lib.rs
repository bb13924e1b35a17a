//! Pipeline - Normalizes weekly KPI spreadsheets into canonical records
//!
//! One shared pipeline, three entry points (live CSV sync, file upload,
//! local backfill) differing only in how the `SheetMatrix` is built and
//! where the resulting records go.
//!
//! Stages:
//! - Label normalization (case/accents/punctuation folding)
//! - Period validation and normalization ("18/08 a 24/08")
//! - Numeric coercion (Brazilian formatting, percentage rescaling)
//! - Indicator resolution against the variant catalog
//! - Per-period record assembly with plausibility caps
//! - Deduplication and chronological ordering
//!
//! The pipeline is pure: no network, no database, no clock reads. The
//! caller supplies the matrix and "today" (used once, to resolve the year
//! of each period; the resolved date is persisted with the record so it
//! is never recomputed on read).

pub mod assemble;
pub mod catalog;
pub mod error;
pub mod label;
pub mod matrix;
pub mod numeric;
pub mod period;
pub mod record;
pub mod report;

pub use assemble::{run, PipelineOutcome};
pub use error::{IngestError, PeriodDiagnostic};
pub use matrix::{CellValue, SheetMatrix};
pub use record::WeeklyRecord;
pub use report::IngestReport;
