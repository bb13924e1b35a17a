//! Sheet matrix - the tokenized input the pipeline consumes
//!
//! Builders turn CSV text, uploaded workbook bytes or a local file into
//! one `SheetMatrix` of rows × named columns. Decoding is the only
//! responsibility here; all interpretation happens downstream.

use std::io::Cursor;
use std::path::Path;

use anyhow::{Context, Result};
use calamine::{open_workbook_auto, open_workbook_auto_from_rs, Data, Reader};

/// One cell, as decoded. Text is kept verbatim; the coercion engine
/// owns all number interpretation.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Number(f64),
    Text(String),
}

impl CellValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) if !s.trim().is_empty() => Some(s),
            _ => None,
        }
    }

    /// Empty, whitespace-only and lone-dash cells carry no value.
    pub fn is_blank(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Number(_) => false,
            CellValue::Text(s) => {
                let t = s.trim();
                t.is_empty() || t == "-"
            }
        }
    }
}

/// Rows × named columns, as handed to the pipeline.
#[derive(Debug, Clone, Default)]
pub struct SheetMatrix {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl SheetMatrix {
    pub fn is_empty(&self) -> bool {
        self.columns.iter().all(|c| c.trim().is_empty()) && self.rows.is_empty()
    }

    /// Parse CSV text (comma-delimited, UTF-8, BOM tolerated). The
    /// first record becomes the column header row.
    pub fn from_csv_text(text: &str) -> Result<SheetMatrix> {
        let text = text.strip_prefix('\u{feff}').unwrap_or(text);
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .has_headers(false)
            .from_reader(text.as_bytes());

        let mut records = reader.records();
        let columns: Vec<String> = match records.next() {
            Some(first) => first
                .context("failed to read CSV header row")?
                .iter()
                .map(|c| c.to_string())
                .collect(),
            None => return Ok(SheetMatrix::default()),
        };

        let mut rows = Vec::new();
        for record in records {
            let record = record.context("failed to read CSV row")?;
            rows.push(
                record
                    .iter()
                    .map(|c| {
                        if c.trim().is_empty() {
                            CellValue::Empty
                        } else {
                            CellValue::Text(c.to_string())
                        }
                    })
                    .collect(),
            );
        }
        Ok(SheetMatrix { columns, rows })
    }

    /// Decode uploaded CSV bytes: UTF-8 when valid, WINDOWS-1252
    /// otherwise (Brazilian Excel exports are routinely latin-1).
    pub fn from_csv_bytes(bytes: &[u8]) -> Result<SheetMatrix> {
        let text = match std::str::from_utf8(bytes) {
            Ok(s) => s.to_string(),
            Err(_) => encoding_rs::WINDOWS_1252.decode(bytes).0.into_owned(),
        };
        Self::from_csv_text(&text)
    }

    /// Open an uploaded Excel workbook from memory. Only the first
    /// sheet is read; the KPI sheets are single-tab exports.
    pub fn from_workbook_bytes(bytes: &[u8]) -> Result<SheetMatrix> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))
            .context("failed to open workbook from uploaded bytes")?;
        Self::from_first_sheet(&mut workbook)
    }

    /// Open a spreadsheet on disk; CSV by extension, Excel otherwise.
    pub fn from_path(path: &Path) -> Result<SheetMatrix> {
        let is_csv = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("csv"));
        if is_csv {
            let bytes = std::fs::read(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            return Self::from_csv_bytes(&bytes);
        }
        let mut workbook = open_workbook_auto(path)
            .with_context(|| format!("failed to open workbook {}", path.display()))?;
        Self::from_first_sheet(&mut workbook)
    }

    fn from_first_sheet<RS: std::io::Read + std::io::Seek>(
        workbook: &mut calamine::Sheets<RS>,
    ) -> Result<SheetMatrix> {
        let sheet_names = workbook.sheet_names().to_vec();
        let sheet_name = sheet_names.first().context("workbook has no sheets")?;
        let range = workbook
            .worksheet_range(sheet_name)
            .with_context(|| format!("failed to read sheet '{}'", sheet_name))?;

        let mut all_rows = range.rows().map(|row| {
            row.iter()
                .map(|cell| match cell {
                    Data::Empty => CellValue::Empty,
                    Data::Float(f) => CellValue::Number(*f),
                    Data::Int(i) => CellValue::Number(*i as f64),
                    Data::String(s) => {
                        if s.trim().is_empty() {
                            CellValue::Empty
                        } else {
                            CellValue::Text(s.clone())
                        }
                    }
                    other => CellValue::Text(format!("{}", other)),
                })
                .collect::<Vec<_>>()
        });

        let columns: Vec<String> = match all_rows.next() {
            Some(header) => header
                .into_iter()
                .map(|cell| match cell {
                    CellValue::Text(s) => s.trim().to_string(),
                    CellValue::Number(n) => format!("{}", n),
                    CellValue::Empty => String::new(),
                })
                .collect(),
            None => return Ok(SheetMatrix::default()),
        };
        Ok(SheetMatrix {
            columns,
            rows: all_rows.collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_header_and_rows() {
        let csv = "Indicador,18/08 a 24/08\nPA Semanal Realizado,95000\nN da Semana,6\n";
        let matrix = SheetMatrix::from_csv_text(csv).unwrap();
        assert_eq!(matrix.columns, vec!["Indicador", "18/08 a 24/08"]);
        assert_eq!(matrix.rows.len(), 2);
        assert_eq!(matrix.rows[0][0], CellValue::Text("PA Semanal Realizado".to_string()));
    }

    #[test]
    fn test_csv_bom_is_stripped() {
        let csv = "\u{feff}Indicador,18/08 a 24/08\nPA Semanal,95000\n";
        let matrix = SheetMatrix::from_csv_text(csv).unwrap();
        assert_eq!(matrix.columns[0], "Indicador");
    }

    #[test]
    fn test_csv_ragged_rows_tolerated() {
        let csv = "Indicador,18/08 a 24/08,25/08 a 31/08\nPA Semanal,95000\n";
        let matrix = SheetMatrix::from_csv_text(csv).unwrap();
        assert_eq!(matrix.columns.len(), 3);
        assert_eq!(matrix.rows[0].len(), 2);
    }

    #[test]
    fn test_csv_empty_cells() {
        let csv = "Indicador,18/08 a 24/08\nPA Semanal,\n";
        let matrix = SheetMatrix::from_csv_text(csv).unwrap();
        assert_eq!(matrix.rows[0][1], CellValue::Empty);
    }

    #[test]
    fn test_empty_text_is_empty_matrix() {
        let matrix = SheetMatrix::from_csv_text("").unwrap();
        assert!(matrix.is_empty());
    }

    #[test]
    fn test_latin1_bytes_decoded() {
        // "Apólices" in WINDOWS-1252.
        let bytes = b"Indicador,18/08 a 24/08\nAp\xf3lices Emitidas,6\n";
        let matrix = SheetMatrix::from_csv_bytes(bytes).unwrap();
        assert_eq!(
            matrix.rows[0][0],
            CellValue::Text("Apólices Emitidas".to_string())
        );
    }

    #[test]
    fn test_blank_detection() {
        assert!(CellValue::Empty.is_blank());
        assert!(CellValue::Text("  ".to_string()).is_blank());
        assert!(CellValue::Text(" - ".to_string()).is_blank());
        assert!(!CellValue::Text("0".to_string()).is_blank());
        assert!(!CellValue::Number(0.0).is_blank());
    }
}
