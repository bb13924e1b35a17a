//! Persistence adapter - weekly records in Postgres
//!
//! One table, conflict key `period`. Pure shape translation between
//! `WeeklyRecord` and the snake_case row; no business logic. The
//! inferred `period_start` is written on insert and deliberately NOT
//! touched on conflict, so the year resolved at first ingestion sticks
//! and re-syncs can never re-date a stored period.

use std::collections::HashSet;

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use pipeline::WeeklyRecord;

/// Snake_case projection of a `WeeklyRecord`, as stored.
#[derive(Debug, sqlx::FromRow)]
pub struct WeeklyRow {
    pub id: Uuid,
    pub period: String,
    pub period_start: Option<NaiveDate>,
    pub pa_semanal: f64,
    pub pa_acumulado: f64,
    pub meta_pa_semanal: f64,
    pub meta_pa_anual: f64,
    pub percentual_meta_semanal: f64,
    pub percentual_meta_anual: f64,
    pub n_semana: f64,
    pub n_acumulado: f64,
    pub meta_n_semanal: f64,
    pub apolices_emitidas: f64,
    pub apolices_canceladas: f64,
    pub meta_ois_agendadas: f64,
    pub ois_agendadas: f64,
    pub ois_realizadas: f64,
    pub meta_recs: Option<f64>,
    pub recs_agendadas: f64,
    pub recs_realizadas: f64,
    pub meta_pcs_c2_agendados: f64,
    pub pcs_c2_agendados: f64,
    pub pcs_c2_realizados: f64,
    pub atrasos_raiza: f64,
    pub parcelas_regularizadas: f64,
    pub lista_atrasos_raiza: Option<String>,
    pub inadimplencia: f64,
    pub meta_inadimplencia: Option<f64>,
    pub revisitas_agendadas: f64,
    pub revisitas_realizadas: f64,
    pub meta_revisitas: Option<f64>,
    pub reunioes_realizadas: f64,
    pub cotacoes_feitas: f64,
    pub ligacoes_feitas: f64,
    pub tarefas_trello: f64,
    pub indicacoes_recebidas: f64,
    pub ticket_medio: Option<f64>,
    pub percentual_ois_realizadas: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WeeklyRow {
    pub fn from_record(record: &WeeklyRecord) -> WeeklyRow {
        WeeklyRow {
            id: record.id.unwrap_or_else(Uuid::new_v4),
            period: record.period.clone(),
            period_start: record.period_start,
            pa_semanal: record.pa_semanal,
            pa_acumulado: record.pa_acumulado,
            meta_pa_semanal: record.meta_pa_semanal,
            meta_pa_anual: record.meta_pa_anual,
            percentual_meta_semanal: record.percentual_meta_semanal,
            percentual_meta_anual: record.percentual_meta_anual,
            n_semana: record.n_semana,
            n_acumulado: record.n_acumulado,
            meta_n_semanal: record.meta_n_semanal,
            apolices_emitidas: record.apolices_emitidas,
            apolices_canceladas: record.apolices_canceladas,
            meta_ois_agendadas: record.meta_ois_agendadas,
            ois_agendadas: record.ois_agendadas,
            ois_realizadas: record.ois_realizadas,
            meta_recs: record.meta_recs,
            recs_agendadas: record.recs_agendadas,
            recs_realizadas: record.recs_realizadas,
            meta_pcs_c2_agendados: record.meta_pcs_c2_agendados,
            pcs_c2_agendados: record.pcs_c2_agendados,
            pcs_c2_realizados: record.pcs_c2_realizados,
            atrasos_raiza: record.atrasos_raiza,
            parcelas_regularizadas: record.parcelas_regularizadas,
            lista_atrasos_raiza: record.lista_atrasos_raiza.clone(),
            inadimplencia: record.inadimplencia,
            meta_inadimplencia: record.meta_inadimplencia,
            revisitas_agendadas: record.revisitas_agendadas,
            revisitas_realizadas: record.revisitas_realizadas,
            meta_revisitas: record.meta_revisitas,
            reunioes_realizadas: record.reunioes_realizadas,
            cotacoes_feitas: record.cotacoes_feitas,
            ligacoes_feitas: record.ligacoes_feitas,
            tarefas_trello: record.tarefas_trello,
            indicacoes_recebidas: record.indicacoes_recebidas,
            ticket_medio: record.ticket_medio,
            percentual_ois_realizadas: record.percentual_ois_realizadas,
            created_at: record.created_at.unwrap_or_else(Utc::now),
            updated_at: record.updated_at.unwrap_or_else(Utc::now),
        }
    }

    pub fn into_record(self) -> WeeklyRecord {
        WeeklyRecord {
            period: self.period,
            pa_semanal: self.pa_semanal,
            pa_acumulado: self.pa_acumulado,
            meta_pa_semanal: self.meta_pa_semanal,
            meta_pa_anual: self.meta_pa_anual,
            percentual_meta_semanal: self.percentual_meta_semanal,
            percentual_meta_anual: self.percentual_meta_anual,
            n_semana: self.n_semana,
            n_acumulado: self.n_acumulado,
            meta_n_semanal: self.meta_n_semanal,
            apolices_emitidas: self.apolices_emitidas,
            apolices_canceladas: self.apolices_canceladas,
            meta_ois_agendadas: self.meta_ois_agendadas,
            ois_agendadas: self.ois_agendadas,
            ois_realizadas: self.ois_realizadas,
            meta_recs: self.meta_recs,
            recs_agendadas: self.recs_agendadas,
            recs_realizadas: self.recs_realizadas,
            meta_pcs_c2_agendados: self.meta_pcs_c2_agendados,
            pcs_c2_agendados: self.pcs_c2_agendados,
            pcs_c2_realizados: self.pcs_c2_realizados,
            atrasos_raiza: self.atrasos_raiza,
            parcelas_regularizadas: self.parcelas_regularizadas,
            lista_atrasos_raiza: self.lista_atrasos_raiza,
            inadimplencia: self.inadimplencia,
            meta_inadimplencia: self.meta_inadimplencia,
            revisitas_agendadas: self.revisitas_agendadas,
            revisitas_realizadas: self.revisitas_realizadas,
            meta_revisitas: self.meta_revisitas,
            reunioes_realizadas: self.reunioes_realizadas,
            cotacoes_feitas: self.cotacoes_feitas,
            ligacoes_feitas: self.ligacoes_feitas,
            tarefas_trello: self.tarefas_trello,
            indicacoes_recebidas: self.indicacoes_recebidas,
            ticket_medio: self.ticket_medio,
            percentual_ois_realizadas: self.percentual_ois_realizadas,
            id: Some(self.id),
            period_start: self.period_start,
            created_at: Some(self.created_at),
            updated_at: Some(self.updated_at),
        }
    }
}

#[derive(Debug, Default)]
pub struct UpsertOutcome {
    pub inserted: usize,
    pub updated: usize,
    pub updated_periods: Vec<String>,
}

/// Bootstrap the table at startup.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS weekly_records (
            id UUID PRIMARY KEY,
            period TEXT NOT NULL UNIQUE,
            period_start DATE,
            pa_semanal DOUBLE PRECISION NOT NULL DEFAULT 0,
            pa_acumulado DOUBLE PRECISION NOT NULL DEFAULT 0,
            meta_pa_semanal DOUBLE PRECISION NOT NULL DEFAULT 0,
            meta_pa_anual DOUBLE PRECISION NOT NULL DEFAULT 0,
            percentual_meta_semanal DOUBLE PRECISION NOT NULL DEFAULT 0,
            percentual_meta_anual DOUBLE PRECISION NOT NULL DEFAULT 0,
            n_semana DOUBLE PRECISION NOT NULL DEFAULT 0,
            n_acumulado DOUBLE PRECISION NOT NULL DEFAULT 0,
            meta_n_semanal DOUBLE PRECISION NOT NULL DEFAULT 2,
            apolices_emitidas DOUBLE PRECISION NOT NULL DEFAULT 0,
            apolices_canceladas DOUBLE PRECISION NOT NULL DEFAULT 0,
            meta_ois_agendadas DOUBLE PRECISION NOT NULL DEFAULT 8,
            ois_agendadas DOUBLE PRECISION NOT NULL DEFAULT 0,
            ois_realizadas DOUBLE PRECISION NOT NULL DEFAULT 0,
            meta_recs DOUBLE PRECISION,
            recs_agendadas DOUBLE PRECISION NOT NULL DEFAULT 0,
            recs_realizadas DOUBLE PRECISION NOT NULL DEFAULT 0,
            meta_pcs_c2_agendados DOUBLE PRECISION NOT NULL DEFAULT 5,
            pcs_c2_agendados DOUBLE PRECISION NOT NULL DEFAULT 0,
            pcs_c2_realizados DOUBLE PRECISION NOT NULL DEFAULT 0,
            atrasos_raiza DOUBLE PRECISION NOT NULL DEFAULT 0,
            parcelas_regularizadas DOUBLE PRECISION NOT NULL DEFAULT 0,
            lista_atrasos_raiza TEXT,
            inadimplencia DOUBLE PRECISION NOT NULL DEFAULT 0,
            meta_inadimplencia DOUBLE PRECISION,
            revisitas_agendadas DOUBLE PRECISION NOT NULL DEFAULT 0,
            revisitas_realizadas DOUBLE PRECISION NOT NULL DEFAULT 0,
            meta_revisitas DOUBLE PRECISION,
            reunioes_realizadas DOUBLE PRECISION NOT NULL DEFAULT 0,
            cotacoes_feitas DOUBLE PRECISION NOT NULL DEFAULT 0,
            ligacoes_feitas DOUBLE PRECISION NOT NULL DEFAULT 0,
            tarefas_trello DOUBLE PRECISION NOT NULL DEFAULT 0,
            indicacoes_recebidas DOUBLE PRECISION NOT NULL DEFAULT 0,
            ticket_medio DOUBLE PRECISION,
            percentual_ois_realizadas DOUBLE PRECISION NOT NULL DEFAULT 0,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

const UPSERT_SQL: &str = r#"
    INSERT INTO weekly_records (
        id, period, period_start,
        pa_semanal, pa_acumulado, meta_pa_semanal, meta_pa_anual,
        percentual_meta_semanal, percentual_meta_anual,
        n_semana, n_acumulado, meta_n_semanal, apolices_emitidas, apolices_canceladas,
        meta_ois_agendadas, ois_agendadas, ois_realizadas,
        meta_recs, recs_agendadas, recs_realizadas,
        meta_pcs_c2_agendados, pcs_c2_agendados, pcs_c2_realizados,
        atrasos_raiza, parcelas_regularizadas, lista_atrasos_raiza,
        inadimplencia, meta_inadimplencia,
        revisitas_agendadas, revisitas_realizadas, meta_revisitas,
        reunioes_realizadas, cotacoes_feitas, ligacoes_feitas, tarefas_trello,
        indicacoes_recebidas, ticket_medio, percentual_ois_realizadas
    ) VALUES (
        $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16,
        $17, $18, $19, $20, $21, $22, $23, $24, $25, $26, $27, $28, $29, $30,
        $31, $32, $33, $34, $35, $36, $37, $38
    )
    ON CONFLICT (period) DO UPDATE SET
        pa_semanal = EXCLUDED.pa_semanal,
        pa_acumulado = EXCLUDED.pa_acumulado,
        meta_pa_semanal = EXCLUDED.meta_pa_semanal,
        meta_pa_anual = EXCLUDED.meta_pa_anual,
        percentual_meta_semanal = EXCLUDED.percentual_meta_semanal,
        percentual_meta_anual = EXCLUDED.percentual_meta_anual,
        n_semana = EXCLUDED.n_semana,
        n_acumulado = EXCLUDED.n_acumulado,
        meta_n_semanal = EXCLUDED.meta_n_semanal,
        apolices_emitidas = EXCLUDED.apolices_emitidas,
        apolices_canceladas = EXCLUDED.apolices_canceladas,
        meta_ois_agendadas = EXCLUDED.meta_ois_agendadas,
        ois_agendadas = EXCLUDED.ois_agendadas,
        ois_realizadas = EXCLUDED.ois_realizadas,
        meta_recs = EXCLUDED.meta_recs,
        recs_agendadas = EXCLUDED.recs_agendadas,
        recs_realizadas = EXCLUDED.recs_realizadas,
        meta_pcs_c2_agendados = EXCLUDED.meta_pcs_c2_agendados,
        pcs_c2_agendados = EXCLUDED.pcs_c2_agendados,
        pcs_c2_realizados = EXCLUDED.pcs_c2_realizados,
        atrasos_raiza = EXCLUDED.atrasos_raiza,
        parcelas_regularizadas = EXCLUDED.parcelas_regularizadas,
        lista_atrasos_raiza = EXCLUDED.lista_atrasos_raiza,
        inadimplencia = EXCLUDED.inadimplencia,
        meta_inadimplencia = EXCLUDED.meta_inadimplencia,
        revisitas_agendadas = EXCLUDED.revisitas_agendadas,
        revisitas_realizadas = EXCLUDED.revisitas_realizadas,
        meta_revisitas = EXCLUDED.meta_revisitas,
        reunioes_realizadas = EXCLUDED.reunioes_realizadas,
        cotacoes_feitas = EXCLUDED.cotacoes_feitas,
        ligacoes_feitas = EXCLUDED.ligacoes_feitas,
        tarefas_trello = EXCLUDED.tarefas_trello,
        indicacoes_recebidas = EXCLUDED.indicacoes_recebidas,
        ticket_medio = EXCLUDED.ticket_medio,
        percentual_ois_realizadas = EXCLUDED.percentual_ois_realizadas,
        updated_at = now()
"#;

/// Upsert all records keyed by `period`. Existing periods are pre-read
/// to split the counts; row-level atomicity is the backend's
/// upsert-on-conflict, no in-process locking.
pub async fn upsert(pool: &PgPool, records: &[WeeklyRecord]) -> Result<UpsertOutcome, sqlx::Error> {
    let periods: Vec<String> = records.iter().map(|r| r.period.clone()).collect();
    let existing: Vec<(String,)> =
        sqlx::query_as("SELECT period FROM weekly_records WHERE period = ANY($1)")
            .bind(&periods)
            .fetch_all(pool)
            .await?;
    let existing: HashSet<String> = existing.into_iter().map(|(p,)| p).collect();

    let mut outcome = UpsertOutcome::default();
    for record in records {
        let row = WeeklyRow::from_record(record);
        sqlx::query(UPSERT_SQL)
            .bind(row.id)
            .bind(&row.period)
            .bind(row.period_start)
            .bind(row.pa_semanal)
            .bind(row.pa_acumulado)
            .bind(row.meta_pa_semanal)
            .bind(row.meta_pa_anual)
            .bind(row.percentual_meta_semanal)
            .bind(row.percentual_meta_anual)
            .bind(row.n_semana)
            .bind(row.n_acumulado)
            .bind(row.meta_n_semanal)
            .bind(row.apolices_emitidas)
            .bind(row.apolices_canceladas)
            .bind(row.meta_ois_agendadas)
            .bind(row.ois_agendadas)
            .bind(row.ois_realizadas)
            .bind(row.meta_recs)
            .bind(row.recs_agendadas)
            .bind(row.recs_realizadas)
            .bind(row.meta_pcs_c2_agendados)
            .bind(row.pcs_c2_agendados)
            .bind(row.pcs_c2_realizados)
            .bind(row.atrasos_raiza)
            .bind(row.parcelas_regularizadas)
            .bind(&row.lista_atrasos_raiza)
            .bind(row.inadimplencia)
            .bind(row.meta_inadimplencia)
            .bind(row.revisitas_agendadas)
            .bind(row.revisitas_realizadas)
            .bind(row.meta_revisitas)
            .bind(row.reunioes_realizadas)
            .bind(row.cotacoes_feitas)
            .bind(row.ligacoes_feitas)
            .bind(row.tarefas_trello)
            .bind(row.indicacoes_recebidas)
            .bind(row.ticket_medio)
            .bind(row.percentual_ois_realizadas)
            .execute(pool)
            .await?;

        if existing.contains(&record.period) {
            outcome.updated += 1;
            outcome.updated_periods.push(record.period.clone());
        } else {
            outcome.inserted += 1;
        }
    }
    Ok(outcome)
}

/// All stored records, chronologically by the persisted period date.
pub async fn read_all(pool: &PgPool) -> Result<Vec<WeeklyRecord>, sqlx::Error> {
    let rows: Vec<WeeklyRow> = sqlx::query_as(
        "SELECT * FROM weekly_records ORDER BY period_start ASC NULLS LAST, period ASC",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows.into_iter().map(WeeklyRow::into_record).collect())
}

/// Stored ids and period labels, for the cleanup sweep.
pub async fn list_periods(pool: &PgPool) -> Result<Vec<(Uuid, String)>, sqlx::Error> {
    sqlx::query_as("SELECT id, period FROM weekly_records ORDER BY period")
        .fetch_all(pool)
        .await
}

pub async fn delete_by_ids(pool: &PgPool, ids: &[Uuid]) -> Result<u64, sqlx::Error> {
    if ids.is_empty() {
        return Ok(0);
    }
    let result = sqlx::query("DELETE FROM weekly_records WHERE id = ANY($1)")
        .bind(ids)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_round_trip_preserves_all_data_fields() {
        let mut record = WeeklyRecord::with_period("18/08 a 24/08");
        record.pa_semanal = 114_668.50;
        record.n_semana = 6.0;
        record.meta_recs = Some(4.0);
        record.lista_atrasos_raiza = Some("Fulano".to_string());
        record.period_start = NaiveDate::from_ymd_opt(2025, 8, 18);
        record.compute_derived();

        let back = WeeklyRow::from_record(&record).into_record();

        // Backend metadata is assigned on the way through; everything
        // else must survive untouched.
        let mut expected = record.clone();
        expected.id = back.id;
        expected.created_at = back.created_at;
        expected.updated_at = back.updated_at;
        assert_eq!(back, expected);
        assert!(back.id.is_some());
    }

    #[test]
    fn test_existing_metadata_is_kept() {
        let mut record = WeeklyRecord::with_period("18/08 a 24/08");
        let id = Uuid::new_v4();
        record.id = Some(id);
        let row = WeeklyRow::from_record(&record);
        assert_eq!(row.id, id);
    }
}
