//! Turns one inbound message into a reply and, when the message is a valid
//! expense, a persisted record.
//!
//! Both transport adapters funnel into [`handle_message`], so the validity policy
//! (a storable message needs both a label and an amount) and the reply texts exist
//! in exactly one place.

use crate::model::{parse, Expense, Source};
use crate::{Config, Result};
use chrono::Local;
use tracing::{debug, info};

/// Sent when the message carried no usable text at all (empty, media, buttons).
pub(crate) const USAGE_REPLY: &str =
    "Envíame el gasto como: 'lugar monto' (ej: super 23.50 USD)";

/// Sent when the text did not parse into both a label and an amount.
pub(crate) const INVALID_FORMAT_REPLY: &str =
    "Formato inválido. Usa: 'lugar monto' (ej: farmacia 12,30). Moneda opcional: '5 USD'.";

/// Handles one inbound message and returns the reply text for the transport to
/// deliver.
///
/// `text` is `None` when the transport delivered a non-text message. The reply is
/// one of: the usage prompt, the invalid-format prompt, or a confirmation echoing
/// the stored label, amount (two decimals) and currency. An `Err` means the record
/// could not be persisted; the transports log it and acknowledge the delivery
/// anyway.
pub(crate) async fn handle_message(
    config: &Config,
    from_wa_id: &str,
    text: Option<&str>,
    source: Source,
) -> Result<String> {
    let text = text.map(str::trim).unwrap_or_default();
    if text.is_empty() {
        debug!("Message from {from_wa_id} has no text, sending usage prompt");
        return Ok(USAGE_REPLY.to_string());
    }

    let parsed = parse(text, config.default_currency());
    let (Some(label), Some(amount)) = (parsed.label(), parsed.amount()) else {
        debug!("Message from {from_wa_id} is not a valid expense: '{text}'");
        return Ok(INVALID_FORMAT_REPLY.to_string());
    };

    let expense = Expense::new(
        from_wa_id,
        label,
        amount,
        parsed.currency(),
        parsed.raw(),
        source,
        Local::now(),
    );
    config.db().insert_expense(&expense).await?;
    info!(
        "Recorded expense {} from {}: {} {:.2} {} (quincena {})",
        expense.id(),
        from_wa_id,
        expense.label(),
        expense.amount(),
        expense.currency(),
        expense.quincena()
    );

    Ok(format!(
        "✅ Guardado: {} – {:.2} {}",
        expense.label(),
        expense.amount(),
        expense.currency()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn test_config(dir: &TempDir) -> Config {
        Config::create(dir.path().join("home"), "12345", Some("PAB"), None, None)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_non_text_message_gets_usage_prompt() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir).await;

        let reply = handle_message(&config, "50761234567", None, Source::WhatsappCloud)
            .await
            .unwrap();
        assert_eq!(reply, USAGE_REPLY);
        assert_eq!(config.db().count_expenses().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_blank_text_gets_usage_prompt() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir).await;

        let reply = handle_message(&config, "50761234567", Some("   "), Source::WhatsappCloud)
            .await
            .unwrap();
        assert_eq!(reply, USAGE_REPLY);
    }

    #[tokio::test]
    async fn test_unparseable_text_gets_format_prompt() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir).await;

        // No amount
        let reply = handle_message(
            &config,
            "50761234567",
            Some("cine con ana"),
            Source::WhatsappCloud,
        )
        .await
        .unwrap();
        assert_eq!(reply, INVALID_FORMAT_REPLY);

        // Amount and currency but no label
        let reply = handle_message(&config, "50761234567", Some("5 USD"), Source::WhatsappCloud)
            .await
            .unwrap();
        assert_eq!(reply, INVALID_FORMAT_REPLY);

        assert_eq!(config.db().count_expenses().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_valid_message_is_recorded_and_confirmed() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir).await;

        let reply = handle_message(
            &config,
            "50761234567",
            Some("super 23.50 USD"),
            Source::WhatsappCloud,
        )
        .await
        .unwrap();
        assert_eq!(reply, "✅ Guardado: super – 23.50 USD");

        let stored = config.db().recent_expenses(None, 10).await.unwrap();
        assert_eq!(stored.len(), 1);
        let expense = &stored[0];
        assert_eq!(expense.user_wa_id(), "50761234567");
        assert_eq!(expense.label(), "super");
        assert_eq!(expense.amount(), 23.5);
        assert_eq!(expense.currency(), "USD");
        assert_eq!(expense.raw(), "super 23.50 USD");
        assert_eq!(expense.source(), Source::WhatsappCloud);
    }

    #[tokio::test]
    async fn test_decimal_comma_uses_default_currency() {
        let dir = TempDir::new().unwrap();
        let config = test_config(&dir).await;

        let reply = handle_message(
            &config,
            "50761234567",
            Some("farmacia 12,30"),
            Source::WhatsappTwilio,
        )
        .await
        .unwrap();
        assert_eq!(reply, "✅ Guardado: farmacia – 12.30 PAB");

        let stored = config.db().recent_expenses(None, 10).await.unwrap();
        assert_eq!(stored[0].currency(), "PAB");
        assert_eq!(stored[0].source(), Source::WhatsappTwilio);
    }
}
