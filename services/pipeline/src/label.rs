//! Label normalization - folds raw header/cell text into a comparison key

use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

/// Normalize a raw header or row label into a comparison key.
///
/// Lowercases, strips accents (NFD decomposition, combining marks
/// dropped), drops `%`, `(` and `)` entirely, maps every other
/// non-alphanumeric character to a space, and collapses whitespace.
///
/// Idempotent: normalizing an already-normalized label is a no-op.
pub fn normalize_label(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.to_lowercase().nfd() {
        if is_combining_mark(ch) {
            continue;
        }
        if ch == '%' || ch == '(' || ch == ')' {
            continue;
        }
        if ch.is_alphanumeric() {
            out.push(ch);
        } else {
            out.push(' ');
        }
    }
    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowercases_and_trims() {
        assert_eq!(normalize_label("  PA Semanal  "), "pa semanal");
    }

    #[test]
    fn test_accents_are_folded() {
        assert_eq!(normalize_label("Índice"), "indice");
        assert_eq!(normalize_label("indice"), "indice");
        assert_eq!(normalize_label("INDICE"), "indice");
        assert_eq!(normalize_label("Inadimplência"), "inadimplencia");
    }

    #[test]
    fn test_percent_and_parens_are_stripped() {
        assert_eq!(normalize_label("% da Meta (Semanal)"), "da meta semanal");
    }

    #[test]
    fn test_punctuation_becomes_space() {
        assert_eq!(normalize_label("OIs - Realizadas/Semana"), "ois realizadas semana");
    }

    #[test]
    fn test_whitespace_runs_collapse() {
        assert_eq!(normalize_label("N   da\t semana"), "n da semana");
    }

    #[test]
    fn test_idempotence() {
        let samples = [
            "PA Semanal Realizado",
            "% Meta Anual",
            "Índice de Inadimplência",
            "  Cotações   feitas!!  ",
            "",
        ];
        for s in samples {
            let once = normalize_label(s);
            assert_eq!(normalize_label(&once), once, "not idempotent for {:?}", s);
        }
    }
}
