//! Reporting period normalization.
//!
//! Turns the raw header period (`"Janeiro de 2020"`, `"13° mês de 2019"`)
//! into a numeric month and year. Month 13 stands for the thirteenth salary.

use crate::catalog::PERIOD_FIELD;
use crate::error::{GfipError, Result};
use crate::constants::MISSING_SENTINEL;
use crate::models::FieldList;
use serde::{Deserialize, Serialize};

const PERIOD_SEPARATOR: &str = " de ";

const MONTHS: &[(&str, u8)] = &[
    ("Janeiro", 1),
    ("Fevereiro", 2),
    ("Março", 3),
    ("Abril", 4),
    ("Maio", 5),
    ("Junho", 6),
    ("Julho", 7),
    ("Agosto", 8),
    ("Setembro", 9),
    ("Outubro", 10),
    ("Novembro", 11),
    ("Dezembro", 12),
    ("13° mês", 13),
    ("13º mês", 13),
];

/// Normalized reporting period
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Period {
    pub month: u8,
    pub year: i32,
}

impl Period {
    /// Parse `"<MonthName> de <Year>"`
    pub fn parse(raw: &str) -> Result<Self> {
        let parts: Vec<&str> = raw.trim().split(PERIOD_SEPARATOR).collect();
        let [month_name, year] = parts.as_slice() else {
            return Err(GfipError::MalformedPeriod {
                raw: raw.to_string(),
                line: None,
            });
        };

        let month = month_number(month_name.trim()).ok_or_else(|| {
            GfipError::UnrecognizedMonth {
                month: month_name.trim().to_string(),
                line: None,
            }
        })?;

        let year = year
            .trim()
            .parse::<i32>()
            .map_err(|_| GfipError::MalformedPeriod {
                raw: raw.to_string(),
                line: None,
            })?;

        Ok(Self { month, year })
    }

    /// Whether this is the thirteenth-salary pseudo-month
    pub fn is_thirteenth(&self) -> bool {
        self.month == 13
    }
}

fn month_number(name: &str) -> Option<u8> {
    MONTHS
        .iter()
        .find(|(month, _)| *month == name)
        .map(|(_, number)| *number)
}

/// Replace the raw period field of a flushed header with `month` and `year`.
///
/// A period that was tolerated as missing carries the sentinel into both
/// derived fields instead of failing.
pub fn normalize_header(fields: FieldList) -> Result<FieldList> {
    let mut normalized = Vec::with_capacity(fields.len() + 1);

    for (name, value) in fields {
        if name != PERIOD_FIELD {
            normalized.push((name, value));
            continue;
        }

        let (month, year) = if value == MISSING_SENTINEL {
            (MISSING_SENTINEL.to_string(), MISSING_SENTINEL.to_string())
        } else {
            let period = Period::parse(&value)?;
            (period.month.to_string(), period.year.to_string())
        };
        normalized.push(("month".to_string(), month));
        normalized.push(("year".to_string(), year));
    }

    Ok(normalized)
}
