//! Reporting periods and their canonical ordering.

use std::cmp::Ordering;
use std::fmt;

use chrono::Month;
use serde::{Deserialize, Serialize};

/// Month names as they appear on declarations, January first.
pub const MONTH_NAMES: [&str; 12] = [
    "ENERO", "FEBRERO", "MARZO", "ABRIL", "MAYO", "JUNIO",
    "JULIO", "AGOSTO", "SEPTIEMBRE", "OCTUBRE", "NOVIEMBRE", "DICIEMBRE",
];

/// Three-letter month abbreviations used for report columns.
pub const MONTH_SHORT_NAMES: [&str; 12] = [
    "ENE", "FEB", "MAR", "ABR", "MAY", "JUN", "JUL", "AGO", "SEP", "OCT", "NOV", "DIC",
];

/// Half of a fiscal year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Semester {
    /// January to June.
    First,
    /// July to December.
    Second,
}

impl Semester {
    /// Month that closes the semester.
    pub fn closing_month(self) -> Month {
        match self {
            Self::First => Month::June,
            Self::Second => Month::December,
        }
    }

    /// Whether a 1-based month number falls inside this semester.
    pub fn contains(self, month: u32) -> bool {
        match self {
            Self::First => (1..=6).contains(&month),
            Self::Second => (7..=12).contains(&month),
        }
    }

    /// Semester for a 1-based month number.
    pub fn of_month(month: u32) -> Option<Self> {
        match month {
            1..=6 => Some(Self::First),
            7..=12 => Some(Self::Second),
            _ => None,
        }
    }

    /// Ordinal word used on declarations.
    pub fn word(self) -> &'static str {
        match self {
            Self::First => "PRIMER",
            Self::Second => "SEGUNDO",
        }
    }

    /// Parse the ordinal word ("PRIMER" / "SEGUNDO"), case-insensitive.
    pub fn from_word(word: &str) -> Option<Self> {
        match word.to_uppercase().as_str() {
            "PRIMER" => Some(Self::First),
            "SEGUNDO" => Some(Self::Second),
            _ => None,
        }
    }
}

/// Identity of one reporting interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PeriodKey {
    /// A calendar month.
    Month { year: i32, month: Month },
    /// A semester.
    Semester { year: i32, half: Semester },
}

impl PeriodKey {
    pub fn month(year: i32, month: Month) -> Self {
        Self::Month { year, month }
    }

    pub fn semester(year: i32, half: Semester) -> Self {
        Self::Semester { year, half }
    }

    /// Build a key from a declaration label pair such as ("MARZO", "2024")
    /// or ("SEGUNDO", "2024") for semesters.
    pub fn from_label_parts(name: &str, year: &str) -> Option<Self> {
        let year: i32 = year.trim().parse().ok()?;
        if let Some(month) = month_from_name(name) {
            return Some(Self::month(year, month));
        }
        Semester::from_word(name).map(|half| Self::semester(year, half))
    }

    pub fn year(&self) -> i32 {
        match self {
            Self::Month { year, .. } | Self::Semester { year, .. } => *year,
        }
    }

    /// Calendar month that closes the period.
    pub fn closing_month(&self) -> Month {
        match self {
            Self::Month { month, .. } => *month,
            Self::Semester { half, .. } => half.closing_month(),
        }
    }

    /// Month of a monthly key, `None` for semesters.
    pub fn as_month(&self) -> Option<Month> {
        match self {
            Self::Month { month, .. } => Some(*month),
            Self::Semester { .. } => None,
        }
    }

    /// Label in declaration style, e.g. `ENERO 2024` or `PRIMER SEMESTRE 2024`.
    pub fn label(&self) -> String {
        match self {
            Self::Month { year, month } => format!("{} {}", month_name(*month), year),
            Self::Semester { year, half } => format!("{} SEMESTRE {}", half.word(), year),
        }
    }

    /// Column heading for report tables: `ENE`, `FEB`, ... or `1S`/`2S`.
    pub fn short_label(&self) -> String {
        match self {
            Self::Month { month, .. } => {
                MONTH_SHORT_NAMES[month.number_from_month() as usize - 1].to_string()
            }
            Self::Semester { half: Semester::First, .. } => "1S".to_string(),
            Self::Semester { half: Semester::Second, .. } => "2S".to_string(),
        }
    }

    fn sort_key(&self) -> (i32, u32, u8) {
        let rank = match self {
            Self::Month { .. } => 0,
            Self::Semester { .. } => 1,
        };
        (self.year(), self.closing_month().number_from_month(), rank)
    }
}

impl Ord for PeriodKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl PartialOrd for PeriodKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// How structured documents are labelled: one per month or one per semester.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodMode {
    #[default]
    Monthly,
    Semiannual,
}

/// Declaration variant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclarationKind {
    /// First filing for the period.
    #[default]
    Original,
    /// Replacement of an earlier filing.
    Substitute,
}

impl DeclarationKind {
    /// Parse the keyword printed on the declaration.
    pub fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword.to_uppercase().as_str() {
            "ORIGINAL" => Some(Self::Original),
            "SUSTITUTIVA" => Some(Self::Substitute),
            _ => None,
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            Self::Original => "ORIGINAL",
            Self::Substitute => "SUSTITUTIVA",
        }
    }
}

/// Declaration name of a month.
pub fn month_name(month: Month) -> &'static str {
    MONTH_NAMES[month.number_from_month() as usize - 1]
}

/// Parse a declaration month name, case-insensitive.
pub fn month_from_name(name: &str) -> Option<Month> {
    let upper = name.trim().to_uppercase();
    MONTH_NAMES
        .iter()
        .position(|m| *m == upper)
        .and_then(|idx| Month::try_from(idx as u8 + 1).ok())
}

/// Month for a 1-based number.
pub fn month_from_number(number: u32) -> Option<Month> {
    u8::try_from(number).ok().and_then(|n| Month::try_from(n).ok())
}
