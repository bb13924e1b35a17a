//! Period validation and normalization
//!
//! A period is a labeled date range identifying one week of KPI data,
//! canonical form "DD/MM a DD/MM". The source sheets mix period labels
//! with dozens of business-glossary labels that also carry digits, so
//! validity is a conjunction of length bounds, a glossary denylist and
//! date-pattern checks.

use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::label::normalize_label;

/// Canonical length bounds for a period label, in characters.
/// Applied uniformly at every entry point.
pub const PERIOD_MIN_LEN: usize = 8;
pub const PERIOD_MAX_LEN: usize = 25;

/// Glossary terms that co-occur with digits in the source sheets but
/// never denote a period. Checked against the accent-folded label, so
/// entries are listed without accents. Extend here, not in code.
const PERIOD_DENYLIST: &[&str] = &[
    "simples nacional",
    "anexo",
    "indice",
    "taxa",
    "meta",
    "realizado",
    "realizada",
    "realizados",
    "realizadas",
    "agendado",
    "agendada",
    "agendados",
    "agendadas",
    "acumulado",
    "acumulada",
    "percentual",
    "inadimplencia",
    "apolice",
    "apolices",
    "emitida",
    "emitidas",
    "cancelada",
    "canceladas",
    "premio",
    "faturamento",
    "comissao",
    "comissoes",
    "ticket",
    "medio",
    "cotacao",
    "cotacoes",
    "ligacao",
    "ligacoes",
    "reuniao",
    "reunioes",
    "visita",
    "visitas",
    "revisita",
    "revisitas",
    "atraso",
    "atrasos",
    "parcela",
    "parcelas",
    "regularizada",
    "regularizadas",
    "cliente",
    "clientes",
    "indicacao",
    "indicacoes",
    "recebida",
    "recebidas",
    "trello",
    "tarefa",
    "tarefas",
    "raiza",
    "semanal",
    "anual",
    "mensal",
    "segunda",
    "terca",
    "quarta",
    "quinta",
    "sexta",
    "sabado",
    "domingo",
    "feriado",
    "total",
    "soma",
    "media",
    "observacao",
    "observacoes",
    "resultado",
    "producao",
    "vendas",
    "renovacao",
    "renovacoes",
    "seguro",
    "seguros",
];

static RE_DDMM_FRAGMENT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{1,2})/(\d{1,2})").expect("valid regex"));
static RE_SINGLE_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{1,2}/\d{1,2}(/\d{4})?$").expect("valid regex"));
static RE_DATE_RANGE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{1,2}/\d{1,2}(/\d{4})?\s+[aA]\s+\d{1,2}/\d{1,2}(/\d{4})?$")
        .expect("valid regex")
});
static RE_ISO_WEEK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-[Ww]\d{1,2}$").expect("valid regex"));
static RE_LEADING_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{1,2})/(\d{1,2})(?:/(\d{4}))?").expect("valid regex"));
static RE_CONNECTOR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d)\s*[aA]\s*(\d)").expect("valid regex"));

/// Decide whether a raw string denotes a date-range period.
pub fn is_valid_period(raw: &str) -> bool {
    let trimmed = raw.trim();
    let len = trimmed.chars().count();
    if !(PERIOD_MIN_LEN..=PERIOD_MAX_LEN).contains(&len) {
        return false;
    }
    if !trimmed.chars().any(|c| c.is_ascii_digit()) {
        return false;
    }

    let folded = normalize_label(trimmed);
    if PERIOD_DENYLIST.iter().any(|term| folded.contains(term)) {
        return false;
    }

    let collapsed = collapse_whitespace(trimmed);
    let shape_matches = RE_SINGLE_DATE.is_match(&collapsed)
        || RE_DATE_RANGE.is_match(&collapsed)
        || RE_ISO_WEEK.is_match(&collapsed)
        || looks_like_date_range(&collapsed);
    if !shape_matches {
        return false;
    }

    // Every DD/MM fragment must be numerically plausible, even when the
    // syntactic pattern matched.
    for caps in RE_DDMM_FRAGMENT.captures_iter(&collapsed) {
        let day: u32 = caps[1].parse().unwrap_or(0);
        let month: u32 = caps[2].parse().unwrap_or(0);
        if !(1..=31).contains(&day) || !(1..=12).contains(&month) {
            return false;
        }
    }
    true
}

/// Permissive fallback: a slash, a digit and a standalone connector "a"
/// together are taken as date-range-like. Known to admit false
/// positives; kept deliberately loose so slightly mangled range labels
/// still flow through (the denylist screens the worst offenders).
fn looks_like_date_range(collapsed: &str) -> bool {
    collapsed.contains('/')
        && collapsed.chars().any(|c| c.is_ascii_digit())
        && collapsed
            .split_whitespace()
            .any(|w| w.eq_ignore_ascii_case("a"))
}

/// Standardize the textual form of a period label: trim, collapse
/// whitespace, rewrite the connector between date tokens to `" a "`.
/// Slash-separated date tokens are preserved verbatim.
pub fn normalize_period(raw: &str) -> String {
    let collapsed = collapse_whitespace(raw.trim());
    RE_CONNECTOR.replace_all(&collapsed, "$1 a $2").into_owned()
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Resolve the leading `DD/MM` of a period into a concrete calendar
/// date, inferring the year from `today` when the label carries none.
///
/// December labels processed in January/February belong to the previous
/// year; January labels processed in December belong to the next year;
/// otherwise a month ahead of today's is last year's and a month behind
/// (or equal) is this year's. The caller persists the result so the
/// inference runs once per period, at first ingestion.
pub fn infer_period_start(period: &str, today: NaiveDate) -> Option<NaiveDate> {
    let caps = RE_LEADING_DATE.captures(period.trim())?;
    let day: u32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    if let Some(year) = caps.get(3) {
        let year: i32 = year.as_str().parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    let year = if month == 12 && (today.month() == 1 || today.month() == 2) {
        today.year() - 1
    } else if month == 1 && today.month() == 12 {
        today.year() + 1
    } else if month > today.month() {
        today.year() - 1
    } else {
        today.year()
    };
    NaiveDate::from_ymd_opt(year, month, day)
}
