//! Lists recently recorded expenses from the local database.

use crate::args::QueryArgs;
use crate::commands::Out;
use crate::model::Expense;
use crate::{Config, Result};

/// Returns the most recently recorded expenses, newest first, optionally
/// restricted to one sender. The message is a human-readable listing; the
/// structure carries the full records.
pub async fn query(config: Config, args: QueryArgs) -> Result<Out<Vec<Expense>>> {
    let expenses = config
        .db()
        .recent_expenses(args.user(), args.limit())
        .await?;

    if expenses.is_empty() {
        return Ok(Out::new("No expenses recorded yet".to_string(), expenses));
    }

    let mut lines = vec![format!("Showing {} expense(s):", expenses.len())];
    for expense in &expenses {
        lines.push(format!(
            "{:04}-{:02}-{:02} (q{})  {:>10.2} {}  {}  [{}]",
            expense.year(),
            expense.month(),
            expense.day(),
            expense.quincena(),
            expense.amount(),
            expense.currency(),
            expense.label(),
            expense.user_wa_id(),
        ));
    }
    Ok(Out::new(lines.join("\n"), expenses))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Source;
    use chrono::{Local, TimeZone};
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_query_lists_newest_first() {
        let dir = TempDir::new().unwrap();
        let config = Config::create(dir.path().join("home"), "12345", None, None, None)
            .await
            .unwrap();

        for (label, day) in [("older", 1), ("newer", 20)] {
            let expense = crate::model::Expense::new(
                "50761234567",
                label,
                9.99,
                "USD",
                format!("{label} 9.99"),
                Source::WhatsappCloud,
                Local.with_ymd_and_hms(2026, 8, day, 10, 0, 0).unwrap(),
            );
            config.db().insert_expense(&expense).await.unwrap();
        }

        let out = query(config, QueryArgs::new(None, 10)).await.unwrap();
        assert!(out.message().starts_with("Showing 2 expense(s):"));
        let structure = out.structure().unwrap();
        assert_eq!(structure.len(), 2);
        assert_eq!(structure[0].label(), "newer");
        assert_eq!(structure[0].quincena().number(), 2);
        assert_eq!(structure[1].label(), "older");
    }

    #[tokio::test]
    async fn test_query_empty_database() {
        let dir = TempDir::new().unwrap();
        let config = Config::create(dir.path().join("home"), "12345", None, None, None)
            .await
            .unwrap();

        let out = query(config, QueryArgs::new(None, 10)).await.unwrap();
        assert_eq!(out.message(), "No expenses recorded yet");
        assert!(out.structure().unwrap().is_empty());
    }
}
