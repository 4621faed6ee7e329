//! Amount normalization for declaration values.
//!
//! Declarations mix locales: `1.234,56`, `1,234.56`, `1234.56` and `1.234`
//! all show up. [`SeparatorStyle`] is the decision table that resolves which
//! separator is the decimal point; [`normalize_amount`] applies it and never
//! fails. A single separator followed by exactly three digits is always read
//! as a thousands separator, so `1,234` and `1.234` both become 1234.

use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};

use super::patterns::LEADING_DECIMAL;

/// How the separators in a token are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeparatorStyle {
    /// No separators.
    Plain,
    /// Only commas, all of them grouping thousands (`1,234,567`).
    CommaThousands,
    /// Only commas, the first one is the decimal point (`1234,56`).
    CommaDecimal,
    /// Only periods, all of them grouping thousands (`1.234.567`, `1.234`).
    PeriodThousands,
    /// A single period used as decimal point (`1234.56`).
    PeriodDecimal,
    /// Both present, comma last: periods group, comma is decimal (`1.234,56`).
    CommaDecimalMixed,
    /// Both present, period last: commas group, period is decimal (`1,234.56`).
    PeriodDecimalMixed,
}

impl SeparatorStyle {
    /// Classify a whitespace-free token.
    pub fn classify(s: &str) -> Self {
        let commas = s.matches(',').count();
        let periods = s.matches('.').count();

        match (commas > 0, periods > 0) {
            (false, false) => Self::Plain,
            (true, false) => {
                let groups: Vec<&str> = s.split(',').collect();
                let last_len = groups.last().map_or(0, |g| g.len());
                if groups.len() > 1 && last_len == 3 {
                    Self::CommaThousands
                } else {
                    Self::CommaDecimal
                }
            }
            (false, true) => {
                let groups: Vec<&str> = s.split('.').collect();
                if groups.len() > 2 || (groups.len() == 2 && groups[1].len() == 3) {
                    Self::PeriodThousands
                } else {
                    Self::PeriodDecimal
                }
            }
            (true, true) => {
                if s.rfind(',') > s.rfind('.') {
                    Self::CommaDecimalMixed
                } else {
                    Self::PeriodDecimalMixed
                }
            }
        }
    }

    /// Rewrite the token so that `.` is the only decimal separator.
    pub fn canonicalize(self, s: &str) -> String {
        match self {
            Self::Plain | Self::PeriodDecimal => s.to_string(),
            Self::CommaThousands | Self::PeriodDecimalMixed => s.replace(',', ""),
            Self::CommaDecimal => s.replacen(',', ".", 1),
            Self::PeriodThousands => s.replace('.', ""),
            Self::CommaDecimalMixed => s.replace('.', "").replacen(',', ".", 1),
        }
    }
}

/// Normalize an amount token of unknown locale into a decimal.
///
/// Returns zero for anything that does not start with a number.
pub fn normalize_amount(token: &str) -> Decimal {
    let cleaned: String = token.chars().filter(|c| !c.is_whitespace()).collect();
    if cleaned.is_empty() {
        return Decimal::ZERO;
    }

    let canonical = SeparatorStyle::classify(&cleaned).canonicalize(&cleaned);
    parse_plain_decimal(&canonical).unwrap_or(Decimal::ZERO)
}

/// Parse the leading decimal number of a canonical string (`.` as decimal
/// point), ignoring whatever follows it.
pub fn parse_plain_decimal(s: &str) -> Option<Decimal> {
    let caps = LEADING_DECIMAL.captures(s.trim())?;
    let sign = if &caps[1] == "-" { "-" } else { "" };

    let (integer, fraction) = match (caps.get(2), caps.get(4)) {
        (Some(int), _) => (int.as_str(), caps.get(3).map_or("", |m| m.as_str())),
        (None, Some(frac)) => ("0", frac.as_str()),
        (None, None) => return None,
    };

    let literal = if fraction.is_empty() {
        format!("{}{}", sign, integer)
    } else {
        format!("{}{}.{}", sign, integer, fraction)
    };
    Decimal::from_str(&literal).ok()
}

/// Round a value that has become a reported total.
pub fn round_total(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Sum amounts, `None` when the sum leaves the decimal range.
pub fn checked_sum(values: impl IntoIterator<Item = Decimal>) -> Option<Decimal> {
    values
        .into_iter()
        .try_fold(Decimal::ZERO, |acc, value| acc.checked_add(value))
}

/// Format an amount the way declarations print it (`1.234,56`).
pub fn format_amount(amount: Decimal) -> String {
    let s = format!("{:.2}", round_total(amount));
    let (sign, digits) = match s.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", s.as_str()),
    };
    let (integer_part, decimal_part) = digits.split_once('.').unwrap_or((digits, "00"));

    let chars: Vec<char> = integer_part.chars().collect();
    let mut formatted = String::new();

    for (i, c) in chars.iter().enumerate() {
        if i > 0 && (chars.len() - i) % 3 == 0 {
            formatted.push('.');
        }
        formatted.push(*c);
    }

    format!("{}{},{}", sign, formatted, decimal_part)
}
