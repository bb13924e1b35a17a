//! End-to-end pipeline scenarios over realistic sheet shapes.

use chrono::NaiveDate;
use pipeline::{run, CellValue, SheetMatrix};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn two_row_single_period_matrix_produces_one_record_with_defaults() {
    let csv = "Indicador,18/08 a 24/08\nPA Semanal Realizado,95000\nN da Semana,6\n";
    let matrix = SheetMatrix::from_csv_text(csv).unwrap();

    let outcome = run(&matrix, date(2025, 8, 26)).unwrap();
    assert_eq!(outcome.records.len(), 1);

    let r = &outcome.records[0];
    assert_eq!(r.period, "18/08 a 24/08");
    assert_eq!(r.pa_semanal, 95_000.0);
    assert_eq!(r.n_semana, 6.0);

    // Untouched fields sit at their documented defaults.
    assert_eq!(r.pa_acumulado, 0.0);
    assert_eq!(r.meta_n_semanal, 2.0);
    assert_eq!(r.meta_ois_agendadas, 8.0);
    assert_eq!(r.meta_pcs_c2_agendados, 5.0);
    assert!(r.meta_recs.is_none());
    assert!(r.lista_atrasos_raiza.is_none());

    // apolicesEmitidas defaults to 0, which blocks the ticket average.
    assert!(r.ticket_medio.is_none());
    // The OI conversion is recomputed, not sourced: 0 realized / 8 goal.
    assert_eq!(r.percentual_ois_realizadas, 0.0);

    assert_eq!(outcome.report.period_columns, vec!["18/08 a 24/08"]);
    assert!(outcome.report.duplicate_periods.is_empty());
    assert!(outcome.report.unmatched_labels.is_empty());
}

#[test]
fn full_sheet_flows_through_coercion_dedup_and_ordering() {
    let csv = "\u{feff}Indicador,25/08 a 31/08,18/08 a 24/08,18/08 A 24/08\n\
               PA Semanal Realizado,\"88.500,00\",\"114.668,50\",1\n\
               Apólices Emitidas,4,5,1\n\
               OIs Agendadas,10,9,-\n\
               OIs Realizadas,7,6,-\n\
               Índice de Inadimplência (%),\"2,1\",\"1,2\",-\n\
               Observações da semana,tudo certo,revisar,-\n";
    let matrix = SheetMatrix::from_csv_text(csv).unwrap();

    let outcome = run(&matrix, date(2025, 9, 2)).unwrap();

    // Duplicate of 18/08 collapsed first-seen-wins, then sorted by date.
    assert_eq!(outcome.records.len(), 2);
    assert_eq!(outcome.records[0].period, "18/08 a 24/08");
    assert_eq!(outcome.records[1].period, "25/08 a 31/08");
    assert_eq!(outcome.report.duplicate_periods, vec!["18/08 a 24/08"]);

    let week1 = &outcome.records[0];
    assert_eq!(week1.pa_semanal, 114_668.50);
    assert_eq!(week1.apolices_emitidas, 5.0);
    assert_eq!(week1.ticket_medio, Some(114_668.50 / 5.0));
    // 6 realized over max(8 goal, 9 agreed) = 66.7%.
    assert_eq!(week1.percentual_ois_realizadas, 66.7);
    // "1,2" rescaled by the small-integer rule, and audited.
    assert_eq!(week1.inadimplencia, 120.0);
    assert!(outcome
        .report
        .rescales
        .iter()
        .any(|e| e.field == "inadimplencia" && e.period == "18/08 a 24/08"));

    let week2 = &outcome.records[1];
    assert_eq!(week2.pa_semanal, 88_500.0);
    assert_eq!(week2.percentual_ois_realizadas, 70.0);

    // The prose row is surfaced as a catalog gap, not silently dropped.
    assert_eq!(
        outcome.report.unmatched_labels,
        vec!["Observações da semana"]
    );
}

#[test]
fn workbook_matrix_with_numeric_cells_assembles() {
    // Excel decodes numbers as floats; build the matrix directly the
    // way the calamine adapter would.
    let matrix = SheetMatrix {
        columns: vec!["Indicador".to_string(), "01/12 a 07/12".to_string()],
        rows: vec![
            vec![
                CellValue::Text("PA Semanal Realizado".to_string()),
                CellValue::Number(95_000.0),
            ],
            vec![
                CellValue::Text("N da Semana".to_string()),
                CellValue::Number(6.0),
            ],
        ],
    };

    let outcome = run(&matrix, date(2026, 1, 15)).unwrap();
    let r = &outcome.records[0];
    assert_eq!(r.pa_semanal, 95_000.0);
    // December processed in January belongs to the prior year.
    assert_eq!(r.period_start, Some(date(2025, 12, 1)));
}
