//! The quincena, the half-month period expenses are accounted under.

use chrono::Datelike;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::fmt::{Display, Formatter};

/// The half of the month a date falls in: [`Quincena::First`] covers days 1 through
/// 15, [`Quincena::Second`] the rest of the month.
///
/// A pure function of the date's day-of-month. No timezone handling happens here;
/// the caller supplies a date already in the reference timezone and its reported
/// day-of-month is taken as authoritative.
///
/// ```
/// # use wa_gastos::model::Quincena;
/// # use chrono::NaiveDate;
/// let date = NaiveDate::from_ymd_opt(2026, 8, 15).unwrap();
/// assert_eq!(Quincena::of(&date), Quincena::First);
/// let date = NaiveDate::from_ymd_opt(2026, 8, 16).unwrap();
/// assert_eq!(Quincena::of(&date), Quincena::Second);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Ord, PartialOrd, Hash)]
pub enum Quincena {
    First,
    Second,
}

impl Quincena {
    /// The quincena `date` falls in.
    pub fn of(date: &impl Datelike) -> Self {
        if date.day() <= 15 {
            Quincena::First
        } else {
            Quincena::Second
        }
    }

    /// The period identifier: `1` or `2`. This is what gets persisted and shown.
    pub fn number(self) -> u8 {
        match self {
            Quincena::First => 1,
            Quincena::Second => 2,
        }
    }

    /// The inverse of [`Quincena::number`], for values read back from storage.
    pub fn from_number(number: i64) -> crate::Result<Self> {
        match number {
            1 => Ok(Quincena::First),
            2 => Ok(Quincena::Second),
            other => Err(anyhow::anyhow!("Invalid quincena number {other}")),
        }
    }
}

impl Display for Quincena {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// Serializes as the bare period number so stored and exported records show `1`/`2`.
impl Serialize for Quincena {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.number())
    }
}

impl<'de> Deserialize<'de> for Quincena {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let number = i64::deserialize(deserializer)?;
        Quincena::from_number(number).map_err(D::Error::custom)
    }
}
