//! The persisted expense record.

use crate::model::Quincena;
use chrono::{DateTime, Datelike, Local, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

/// Which transport delivered the message that produced a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Source {
    /// Meta's WhatsApp Cloud API (JSON webhook push).
    WhatsappCloud,
    /// A Twilio-style provider (form-encoded webhook push).
    WhatsappTwilio,
}

impl Source {
    /// The tag stored in the `source` column.
    pub fn as_str(self) -> &'static str {
        match self {
            Source::WhatsappCloud => "whatsapp-cloud",
            Source::WhatsappTwilio => "whatsapp-twilio",
        }
    }
}

impl Display for Source {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Source {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "whatsapp-cloud" => Ok(Source::WhatsappCloud),
            "whatsapp-twilio" => Ok(Source::WhatsappTwilio),
            other => Err(anyhow::anyhow!("Unknown expense source '{other}'")),
        }
    }
}

/// One recorded expense, as it is persisted.
///
/// The accounting-period fields (`year`, `month`, `day`, `quincena`) are derived
/// once from the server-assigned timestamp at construction and stored denormalized
/// so period queries need no date arithmetic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Expense {
    id: String,
    user_wa_id: String,
    label: String,
    amount: f64,
    currency: String,
    raw: String,
    source: Source,
    timestamp: DateTime<Utc>,
    year: i32,
    month: u32,
    day: u32,
    quincena: Quincena,
}

impl Expense {
    /// Builds a new record from the parsed message pieces and the server time.
    ///
    /// `now` is the server-assigned timestamp in the reference (local) timezone;
    /// the period fields come from its local calendar date, while the stored
    /// timestamp is normalized to UTC.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        user_wa_id: impl Into<String>,
        label: impl Into<String>,
        amount: f64,
        currency: impl Into<String>,
        raw: impl Into<String>,
        source: Source,
        now: DateTime<Local>,
    ) -> Self {
        let date = now.date_naive();
        Self {
            id: Uuid::new_v4().to_string(),
            user_wa_id: user_wa_id.into(),
            label: label.into(),
            amount,
            currency: currency.into(),
            raw: raw.into(),
            source,
            timestamp: now.with_timezone(&Utc),
            year: date.year(),
            month: date.month(),
            day: date.day(),
            quincena: Quincena::of(&date),
        }
    }

    /// Rebuilds a record from its stored columns. Used by the database layer.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn from_stored(
        id: String,
        user_wa_id: String,
        label: String,
        amount: f64,
        currency: String,
        raw: String,
        source: Source,
        timestamp: DateTime<Utc>,
        year: i32,
        month: u32,
        day: u32,
        quincena: Quincena,
    ) -> Self {
        Self {
            id,
            user_wa_id,
            label,
            amount,
            currency,
            raw,
            source,
            timestamp,
            year,
            month,
            day,
            quincena,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn user_wa_id(&self) -> &str {
        &self.user_wa_id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn source(&self) -> Source {
        self.source
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn day(&self) -> u32 {
        self.day
    }

    pub fn quincena(&self) -> Quincena {
        self.quincena
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn local(y: i32, m: u32, d: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(y, m, d, 12, 30, 0).unwrap()
    }

    #[test]
    fn test_expense_derives_period_fields() {
        let e = Expense::new(
            "50761234567",
            "super",
            23.5,
            "USD",
            "super 23.50 USD",
            Source::WhatsappCloud,
            local(2026, 8, 7),
        );
        assert_eq!(e.year(), 2026);
        assert_eq!(e.month(), 8);
        assert_eq!(e.day(), 7);
        assert_eq!(e.quincena(), Quincena::First);
        assert_eq!(e.source().as_str(), "whatsapp-cloud");
    }

    #[test]
    fn test_expense_second_quincena() {
        let e = Expense::new(
            "50761234567",
            "farmacia",
            12.3,
            "PAB",
            "farmacia 12,30",
            Source::WhatsappTwilio,
            local(2026, 8, 28),
        );
        assert_eq!(e.quincena(), Quincena::Second);
    }

    #[test]
    fn test_expense_ids_are_unique() {
        let now = local(2026, 8, 7);
        let a = Expense::new("u", "a", 1.0, "USD", "a 1", Source::WhatsappCloud, now);
        let b = Expense::new("u", "a", 1.0, "USD", "a 1", Source::WhatsappCloud, now);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn test_source_round_trip() {
        for source in [Source::WhatsappCloud, Source::WhatsappTwilio] {
            assert_eq!(source.as_str().parse::<Source>().unwrap(), source);
        }
        assert!("firestore".parse::<Source>().is_err());
    }
}
