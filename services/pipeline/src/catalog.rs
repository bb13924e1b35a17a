//! Indicator catalog - label variants to canonical fields
//!
//! The ordered variant table below is the single largest piece of
//! business knowledge in the system. The sheets have been renamed and
//! reworded many times over the years; every known spelling of every
//! indicator lives here, grouped by family, as declarative data. Extend
//! the table, not the resolver.
//!
//! Resolution: exact match on the normalized label first; failing that,
//! a bidirectional substring match with patterns tried longest-first so
//! "meta de pcs c2 agendados" cannot be shadowed by "meta".

use once_cell::sync::Lazy;

use crate::label::normalize_label;
use crate::record::Indicator;

/// (label variant, canonical field), grouped by indicator family.
/// Variants are matched after normalization, so they are written
/// lowercase and accent-free.
pub const CATALOG: &[(&str, Indicator)] = &[
    // --- PA (annualized premium) ---
    ("pa semanal realizado", Indicator::PaSemanal),
    ("pa realizado na semana", Indicator::PaSemanal),
    ("pa da semana", Indicator::PaSemanal),
    ("pa semanal", Indicator::PaSemanal),
    ("premio anual da semana", Indicator::PaSemanal),
    ("pa anual acumulado", Indicator::PaAcumulado),
    ("pa realizado acumulado", Indicator::PaAcumulado),
    ("pa acumulado no ano", Indicator::PaAcumulado),
    ("pa acumulado", Indicator::PaAcumulado),
    ("meta de pa semanal", Indicator::MetaPaSemanal),
    ("meta semanal de pa", Indicator::MetaPaSemanal),
    ("meta pa semanal", Indicator::MetaPaSemanal),
    ("meta de pa anual", Indicator::MetaPaAnual),
    ("meta anual de pa", Indicator::MetaPaAnual),
    ("meta pa anual", Indicator::MetaPaAnual),
    ("percentual da meta semanal", Indicator::PercentualMetaSemanal),
    ("atingimento da meta semanal", Indicator::PercentualMetaSemanal),
    ("da meta semanal", Indicator::PercentualMetaSemanal),
    ("percentual da meta anual", Indicator::PercentualMetaAnual),
    ("atingimento da meta anual", Indicator::PercentualMetaAnual),
    ("da meta anual", Indicator::PercentualMetaAnual),
    // --- N (policy counts) ---
    ("n da semana", Indicator::NSemana),
    ("n realizado na semana", Indicator::NSemana),
    ("n semanal", Indicator::NSemana),
    ("n acumulado no ano", Indicator::NAcumulado),
    ("n anual acumulado", Indicator::NAcumulado),
    ("n acumulado", Indicator::NAcumulado),
    ("meta de n semanal", Indicator::MetaNSemanal),
    ("meta n semanal", Indicator::MetaNSemanal),
    ("meta de n", Indicator::MetaNSemanal),
    ("apolices emitidas na semana", Indicator::ApolicesEmitidas),
    ("numero de apolices emitidas", Indicator::ApolicesEmitidas),
    ("apolices emitidas", Indicator::ApolicesEmitidas),
    ("apolices canceladas na semana", Indicator::ApolicesCanceladas),
    ("apolices canceladas", Indicator::ApolicesCanceladas),
    ("cancelamentos da semana", Indicator::ApolicesCanceladas),
    // --- OI (innovation opportunities) ---
    ("meta de ois agendadas", Indicator::MetaOisAgendadas),
    ("meta ois agendadas", Indicator::MetaOisAgendadas),
    ("meta de oi agendada", Indicator::MetaOisAgendadas),
    ("meta ois", Indicator::MetaOisAgendadas),
    ("ois agendadas na semana", Indicator::OisAgendadas),
    ("ois agendadas", Indicator::OisAgendadas),
    ("oi agendadas", Indicator::OisAgendadas),
    ("ois realizadas na semana", Indicator::OisRealizadas),
    ("ois realizadas", Indicator::OisRealizadas),
    ("oi realizadas", Indicator::OisRealizadas),
    ("percentual de ois realizadas", Indicator::PercentualOisRealizadas),
    ("conversao de ois", Indicator::PercentualOisRealizadas),
    ("conversao ois", Indicator::PercentualOisRealizadas),
    // --- RECS (portfolio review) ---
    ("meta de recs", Indicator::MetaRecs),
    ("meta recs", Indicator::MetaRecs),
    ("recs agendadas na semana", Indicator::RecsAgendadas),
    ("recs agendadas", Indicator::RecsAgendadas),
    ("recs agendados", Indicator::RecsAgendadas),
    ("recs realizadas na semana", Indicator::RecsRealizadas),
    ("recs realizadas", Indicator::RecsRealizadas),
    ("recs realizados", Indicator::RecsRealizadas),
    // --- PCs/C2 (scheduled visits) ---
    ("meta de pcs c2 agendados", Indicator::MetaPcsC2Agendados),
    ("meta pcs c2 agendados", Indicator::MetaPcsC2Agendados),
    ("meta de pcs", Indicator::MetaPcsC2Agendados),
    ("meta pcs", Indicator::MetaPcsC2Agendados),
    ("pcs c2 agendados na semana", Indicator::PcsC2Agendados),
    ("pcs c2 agendados", Indicator::PcsC2Agendados),
    ("pcs agendados", Indicator::PcsC2Agendados),
    ("c2 agendados", Indicator::PcsC2Agendados),
    ("pcs c2 realizados na semana", Indicator::PcsC2Realizados),
    ("pcs c2 realizados", Indicator::PcsC2Realizados),
    ("pcs realizados", Indicator::PcsC2Realizados),
    ("c2 realizados", Indicator::PcsC2Realizados),
    // --- Arrears ---
    ("atrasos na raiza", Indicator::AtrasosRaiza),
    ("atrasos raiza", Indicator::AtrasosRaiza),
    ("quantidade de atrasos raiza", Indicator::AtrasosRaiza),
    ("parcelas regularizadas", Indicator::ParcelasRegularizadas),
    ("atrasos regularizados", Indicator::ParcelasRegularizadas),
    ("lista de atrasos raiza", Indicator::ListaAtrasosRaiza),
    ("lista atrasos raiza", Indicator::ListaAtrasosRaiza),
    // --- Delinquency ---
    ("indice de inadimplencia", Indicator::Inadimplencia),
    ("taxa de inadimplencia", Indicator::Inadimplencia),
    ("inadimplencia", Indicator::Inadimplencia),
    ("meta de inadimplencia", Indicator::MetaInadimplencia),
    ("meta inadimplencia", Indicator::MetaInadimplencia),
    // --- Revisits ---
    ("revisitas agendadas na semana", Indicator::RevisitasAgendadas),
    ("revisitas agendadas", Indicator::RevisitasAgendadas),
    ("revisitas realizadas na semana", Indicator::RevisitasRealizadas),
    ("revisitas realizadas", Indicator::RevisitasRealizadas),
    ("meta de revisitas", Indicator::MetaRevisitas),
    ("meta revisitas", Indicator::MetaRevisitas),
    // --- Productivity ---
    ("reunioes realizadas na semana", Indicator::ReunioesRealizadas),
    ("reunioes realizadas", Indicator::ReunioesRealizadas),
    ("reunioes da semana", Indicator::ReunioesRealizadas),
    ("cotacoes feitas na semana", Indicator::CotacoesFeitas),
    ("cotacoes feitas", Indicator::CotacoesFeitas),
    ("cotacoes realizadas", Indicator::CotacoesFeitas),
    ("numero de cotacoes", Indicator::CotacoesFeitas),
    ("ligacoes feitas na semana", Indicator::LigacoesFeitas),
    ("ligacoes feitas", Indicator::LigacoesFeitas),
    ("ligacoes realizadas", Indicator::LigacoesFeitas),
    ("numero de ligacoes", Indicator::LigacoesFeitas),
    ("tarefas concluidas no trello", Indicator::TarefasTrello),
    ("tarefas do trello", Indicator::TarefasTrello),
    ("tarefas trello", Indicator::TarefasTrello),
    ("indicacoes recebidas na semana", Indicator::IndicacoesRecebidas),
    ("indicacoes recebidas", Indicator::IndicacoesRecebidas),
    ("pedidos de indicacao", Indicator::IndicacoesRecebidas),
    // --- Ticket ---
    ("ticket medio da semana", Indicator::TicketMedio),
    ("ticket medio", Indicator::TicketMedio),
];

/// Catalog with every pattern normalized once at first use.
static NORMALIZED: Lazy<Vec<(String, Indicator)>> = Lazy::new(|| {
    CATALOG
        .iter()
        .map(|(pattern, field)| (normalize_label(pattern), *field))
        .collect()
});

/// Catalog indices ordered by decreasing pattern length, for the
/// substring pass.
static LONGEST_FIRST: Lazy<Vec<usize>> = Lazy::new(|| {
    let mut order: Vec<usize> = (0..NORMALIZED.len()).collect();
    order.sort_by(|&a, &b| NORMALIZED[b].0.len().cmp(&NORMALIZED[a].0.len()));
    order
});

/// Map a normalized row/column label to a canonical indicator field.
pub fn resolve(normalized_label: &str) -> Option<Indicator> {
    if normalized_label.is_empty() {
        return None;
    }
    for (pattern, field) in NORMALIZED.iter() {
        if pattern == normalized_label {
            return Some(*field);
        }
    }
    for &idx in LONGEST_FIRST.iter() {
        let (pattern, field) = &NORMALIZED[idx];
        if normalized_label.contains(pattern.as_str()) || pattern.contains(normalized_label) {
            return Some(*field);
        }
    }
    None
}
