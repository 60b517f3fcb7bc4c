//! Window-size tokens (`1s`, `5m`, `1h`, `1d`, `1wk`, `1mo`).

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::infrastructure::ksql::errors::KsqlError;

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum WindowUnit {
    Seconds,
    Minutes,
    Hours,
    Days,
    Weeks,
    Months,
}

impl WindowUnit {
    fn suffix(&self) -> &'static str {
        match self {
            WindowUnit::Seconds => "s",
            WindowUnit::Minutes => "m",
            WindowUnit::Hours => "h",
            WindowUnit::Days => "d",
            WindowUnit::Weeks => "wk",
            WindowUnit::Months => "mo",
        }
    }
}

/// A parsed tumbling window size.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Timeframe {
    pub value: u32,
    pub unit: WindowUnit,
}

impl Timeframe {
    pub fn parse(token: &str) -> Result<Self, KsqlError> {
        let invalid = || KsqlError::InvalidWindowSpec {
            token: token.to_string(),
        };

        let normalized = token.trim().to_ascii_lowercase();
        // two-letter suffixes first so "1mo" is not read as minutes
        let (digits, unit) = if let Some(digits) = normalized.strip_suffix("wk") {
            (digits, WindowUnit::Weeks)
        } else if let Some(digits) = normalized.strip_suffix("mo") {
            (digits, WindowUnit::Months)
        } else if let Some(digits) = normalized.strip_suffix('s') {
            (digits, WindowUnit::Seconds)
        } else if let Some(digits) = normalized.strip_suffix('m') {
            (digits, WindowUnit::Minutes)
        } else if let Some(digits) = normalized.strip_suffix('h') {
            (digits, WindowUnit::Hours)
        } else if let Some(digits) = normalized.strip_suffix('d') {
            (digits, WindowUnit::Days)
        } else {
            return Err(invalid());
        };

        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        let value = digits.parse::<u32>().map_err(|_| invalid())?;
        if value == 0 {
            return Err(invalid());
        }

        Ok(Self { value, unit })
    }

    /// Approximate length in seconds, used for ordering. A month counts as 30 days.
    pub fn to_seconds(&self) -> u64 {
        let unit_seconds: u64 = match self.unit {
            WindowUnit::Seconds => 1,
            WindowUnit::Minutes => 60,
            WindowUnit::Hours => 3_600,
            WindowUnit::Days => 86_400,
            WindowUnit::Weeks => 7 * 86_400,
            WindowUnit::Months => 30 * 86_400,
        };
        u64::from(self.value) * unit_seconds
    }

    /// `SIZE <n> <UNIT>` as accepted inside a `WINDOW TUMBLING (...)` clause.
    pub fn size_clause(&self) -> String {
        match self.unit {
            WindowUnit::Seconds => format!("SIZE {} SECONDS", self.value),
            WindowUnit::Minutes => format!("SIZE {} MINUTES", self.value),
            WindowUnit::Hours => format!("SIZE {} HOURS", self.value),
            WindowUnit::Days => format!("SIZE {} DAYS", self.value),
            WindowUnit::Weeks => format!("SIZE {} DAYS", u64::from(self.value) * 7),
            WindowUnit::Months => format!("SIZE {} MONTHS", self.value),
        }
    }
}

impl FromStr for Timeframe {
    type Err = KsqlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}{}", self.value, self.unit.suffix())
    }
}
