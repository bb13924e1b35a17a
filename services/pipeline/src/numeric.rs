//! Numeric coercion - Brazilian-formatted cell values into floats
//!
//! Source sheets mix "percent already ×100" and "fraction" conventions
//! inconsistently across columns. The rescaling heuristic reconciles
//! them best-effort; every threshold is a named constant and every
//! applied rescale is reported to the caller for audit.

use std::fmt;

use crate::matrix::CellValue;
use crate::record::FieldKind;

/// Integer-looking values in this range on percent-like cells are taken
/// as accidentally multiplied by 100.
pub const INTEGER_SCALED_MIN: f64 = 100.0;
pub const INTEGER_SCALED_MAX: f64 = 100_000.0;
/// Fractions in (0, FRACTION_MAX) on percent fields are scaled up.
pub const FRACTION_MAX: f64 = 1.0;
/// Small integers in [1, SMALL_INT_MAX) with no explicit decimal
/// punctuation in the source are taken as unscaled percentages.
pub const SMALL_INT_MAX: f64 = 10.0;
/// Goal-share fields are routinely far above 100%; values at or below
/// this bound are taken as unscaled.
pub const GOAL_SHARE_MAX: f64 = 2.0;
/// Values in [OVERSCALED_MIN, OVERSCALED_MAX) on percent fields are
/// taken as double-scaled and divided back down.
pub const OVERSCALED_MIN: f64 = 1_000.0;
pub const OVERSCALED_MAX: f64 = 10_000.0;
/// A percent-like value above this after rescaling is implausible and
/// dropped rather than stored.
pub const PERCENT_PLAUSIBLE_MAX: f64 = 10_000.0;

/// Which rescaling rule fired, for the audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RescaleRule {
    /// Integer in [100, 100000) divided by 100.
    IntegerScaledDown,
    /// Fraction in (0, 1) multiplied by 100.
    FractionScaledUp,
    /// Small integer in [1, 10) without decimal punctuation, ×100.
    SmallIntegerScaledUp,
    /// Goal share in (1, 2] multiplied by 100.
    GoalShareScaledUp,
    /// Value in [1000, 10000) divided by 100.
    OverscaledDown,
}

impl fmt::Display for RescaleRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RescaleRule::IntegerScaledDown => "integer/100",
            RescaleRule::FractionScaledUp => "fraction*100",
            RescaleRule::SmallIntegerScaledUp => "small-integer*100",
            RescaleRule::GoalShareScaledUp => "goal-share*100",
            RescaleRule::OverscaledDown => "overscaled/100",
        };
        f.write_str(name)
    }
}

/// Outcome of coercing one cell. `value` is `None` when the cell does
/// not parse or the result is implausible; `parsed` is the pre-rescale
/// float and `rescale` the rule applied, if any, so the caller can log
/// and report the decision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coercion {
    pub value: Option<f64>,
    pub parsed: Option<f64>,
    pub rescale: Option<RescaleRule>,
}

impl Coercion {
    fn absent() -> Self {
        Coercion { value: None, parsed: None, rescale: None }
    }
}

/// Convert a raw cell value into a float for a field of the given kind.
pub fn coerce(cell: &CellValue, kind: FieldKind) -> Coercion {
    let (parsed, had_percent_sign, had_decimal_dot) = match cell {
        CellValue::Empty => return Coercion::absent(),
        CellValue::Number(n) => {
            if !n.is_finite() {
                return Coercion::absent();
            }
            (*n, false, n.fract() != 0.0)
        }
        CellValue::Text(raw) => {
            let Some(cleaned) = clean_numeric_text(raw) else {
                return Coercion::absent();
            };
            let Ok(n) = cleaned.parse::<f64>() else {
                return Coercion::absent();
            };
            // "1,2" carries a decimal comma but no literal dot: the
            // small-integer rule treats it as punctuation-free.
            (n, raw.contains('%'), raw.contains('.') && !raw.contains(','))
        }
    };

    let percent_field = matches!(kind, FieldKind::Percent | FieldKind::GoalPercent);
    let percent_like = percent_field || had_percent_sign;
    if !percent_like {
        return Coercion { value: Some(parsed), parsed: Some(parsed), rescale: None };
    }

    let rescale = pick_rescale(parsed, kind, percent_field, had_decimal_dot);
    let value = match rescale {
        Some(RescaleRule::IntegerScaledDown) | Some(RescaleRule::OverscaledDown) => parsed / 100.0,
        Some(_) => parsed * 100.0,
        None => parsed,
    };

    if value > PERCENT_PLAUSIBLE_MAX {
        return Coercion { value: None, parsed: Some(parsed), rescale };
    }
    Coercion { value: Some(value), parsed: Some(parsed), rescale }
}

/// First matching rule wins.
fn pick_rescale(
    parsed: f64,
    kind: FieldKind,
    percent_field: bool,
    had_decimal_dot: bool,
) -> Option<RescaleRule> {
    if parsed.fract() == 0.0 && (INTEGER_SCALED_MIN..INTEGER_SCALED_MAX).contains(&parsed) {
        return Some(RescaleRule::IntegerScaledDown);
    }
    if percent_field {
        if parsed > 0.0 && parsed < FRACTION_MAX {
            return Some(RescaleRule::FractionScaledUp);
        }
        if (1.0..SMALL_INT_MAX).contains(&parsed) && !had_decimal_dot {
            return Some(RescaleRule::SmallIntegerScaledUp);
        }
        if kind == FieldKind::GoalPercent && parsed > 1.0 && parsed <= GOAL_SHARE_MAX {
            return Some(RescaleRule::GoalShareScaledUp);
        }
        if (OVERSCALED_MIN..OVERSCALED_MAX).contains(&parsed) {
            return Some(RescaleRule::OverscaledDown);
        }
    }
    None
}

/// Strip a raw numeric string down to digits, separators and a leading
/// minus, then resolve Brazilian separators: when a comma is present,
/// dots are thousands separators and the comma is the decimal mark.
fn clean_numeric_text(raw: &str) -> Option<String> {
    let mut kept = String::with_capacity(raw.len());
    for ch in raw.trim().chars() {
        match ch {
            '0'..='9' | '.' | ',' => kept.push(ch),
            '-' if kept.is_empty() => kept.push('-'),
            _ => {}
        }
    }
    if kept.is_empty() || kept == "-" {
        return None;
    }
    if kept.contains(',') {
        kept = kept.replace('.', "").replace(',', ".");
    }
    Some(kept)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    // -------------------------------------------------------------------------
    // BRAZILIAN FORMATTING
    // -------------------------------------------------------------------------

    #[test]
    fn test_brazilian_thousands_and_decimal() {
        let c = coerce(&text("114.668,50"), FieldKind::Currency);
        assert_eq!(c.value, Some(114_668.50));
        assert_eq!(c.rescale, None);
    }

    #[test]
    fn test_currency_prefix_stripped() {
        let c = coerce(&text("R$ 95.000,00"), FieldKind::Currency);
        assert_eq!(c.value, Some(95_000.0));
    }

    #[test]
    fn test_plain_decimal_without_comma() {
        let c = coerce(&text("1234.56"), FieldKind::Count);
        assert_eq!(c.value, Some(1234.56));
    }

    #[test]
    fn test_negative_sign_only_leading() {
        assert_eq!(coerce(&text("-12"), FieldKind::Count).value, Some(-12.0));
        assert_eq!(coerce(&text("12-3"), FieldKind::Count).value, Some(123.0));
    }

    #[test]
    fn test_empty_and_dash_are_absent() {
        assert_eq!(coerce(&text(""), FieldKind::Count).value, None);
        assert_eq!(coerce(&text("-"), FieldKind::Count).value, None);
        assert_eq!(coerce(&text("n/d"), FieldKind::Count).value, None);
        assert_eq!(coerce(&CellValue::Empty, FieldKind::Count).value, None);
    }

    #[test]
    fn test_numeric_passthrough() {
        let c = coerce(&CellValue::Number(42.5), FieldKind::Count);
        assert_eq!(c.value, Some(42.5));
        assert_eq!(coerce(&CellValue::Number(f64::NAN), FieldKind::Count).value, None);
    }

    // -------------------------------------------------------------------------
    // PERCENTAGE RESCALING
    // -------------------------------------------------------------------------

    #[test]
    fn test_small_integer_comma_decimal_rescales() {
        // "1,2" has no literal dot, parses to 1.2 in [1, 10): the
        // small-integer rule multiplies by 100.
        let c = coerce(&text("1,2"), FieldKind::Percent);
        assert_eq!(c.value, Some(120.0));
        assert_eq!(c.rescale, Some(RescaleRule::SmallIntegerScaledUp));
    }

    #[test]
    fn test_explicit_decimal_dot_blocks_small_integer_rule() {
        let c = coerce(&text("1.2"), FieldKind::Percent);
        assert_eq!(c.value, Some(1.2));
        assert_eq!(c.rescale, None);
    }

    #[test]
    fn test_integer_scaled_down() {
        let c = coerce(&CellValue::Number(4500.0), FieldKind::Percent);
        assert_eq!(c.value, Some(45.0));
        assert_eq!(c.rescale, Some(RescaleRule::IntegerScaledDown));
    }

    #[test]
    fn test_percent_sign_triggers_integer_rule_on_count_field() {
        let c = coerce(&text("4500%"), FieldKind::Count);
        assert_eq!(c.value, Some(45.0));
        assert_eq!(c.rescale, Some(RescaleRule::IntegerScaledDown));
    }

    #[test]
    fn test_fraction_scaled_up() {
        let c = coerce(&CellValue::Number(0.85), FieldKind::Percent);
        assert_eq!(c.value, Some(85.0));
        assert_eq!(c.rescale, Some(RescaleRule::FractionScaledUp));
    }

    #[test]
    fn test_goal_share_scaled_up() {
        let c = coerce(&CellValue::Number(1.5), FieldKind::GoalPercent);
        assert_eq!(c.value, Some(150.0));
        assert_eq!(c.rescale, Some(RescaleRule::GoalShareScaledUp));
    }

    #[test]
    fn test_goal_share_rule_only_for_goal_fields() {
        let c = coerce(&CellValue::Number(1.5), FieldKind::Percent);
        assert_eq!(c.value, Some(1.5));
        assert_eq!(c.rescale, None);
    }

    #[test]
    fn test_overscaled_down() {
        let c = coerce(&CellValue::Number(8550.5), FieldKind::Percent);
        assert_eq!(c.value, Some(85.505));
        assert_eq!(c.rescale, Some(RescaleRule::OverscaledDown));
    }

    #[test]
    fn test_implausible_after_rescale_rejected() {
        let c = coerce(&CellValue::Number(123_456.0), FieldKind::Percent);
        assert_eq!(c.value, None);
    }

    #[test]
    fn test_plain_percent_within_range_untouched() {
        let c = coerce(&CellValue::Number(97.3), FieldKind::Percent);
        assert_eq!(c.value, Some(97.3));
        assert_eq!(c.rescale, None);
    }

    #[test]
    fn test_counts_never_rescaled_without_percent_sign() {
        let c = coerce(&CellValue::Number(4500.0), FieldKind::Count);
        assert_eq!(c.value, Some(4500.0));
        assert_eq!(c.rescale, None);
    }
}
