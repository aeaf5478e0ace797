//! Clients for delivering outbound messages to the messaging provider.

mod cloud;
mod test_sender;
pub(crate) mod twilio;

use crate::{Config, Result};
use std::sync::Arc;

pub(crate) use cloud::{CloudApi, WebhookPayload};
pub(crate) use test_sender::TestSender;

/// Sends outbound WhatsApp text messages. The webhook handlers only ever talk to
/// this trait, so the whole service can run against [`TestSender`] without the
/// provider.
#[async_trait::async_trait]
pub(crate) trait Sender: Send + Sync {
    /// Delivers `body` as a text message to the WhatsApp id `to`.
    async fn send_text(&self, to: &str, body: &str) -> Result<()>;
}

/// Determines whether outbound messages go to the real provider or to an in-memory
/// test client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Cloud,
    Test,
}

impl Mode {
    /// When GASTOS_IN_TEST_MODE is set and non-zero in length the mode will be
    /// `Mode::Test`, otherwise `Mode::Cloud`. This allows running the program
    /// end-to-end without hitting the Graph API.
    pub fn from_env() -> Self {
        match std::env::var("GASTOS_IN_TEST_MODE") {
            Ok(value) if !value.is_empty() => Mode::Test,
            _ => Mode::Cloud,
        }
    }
}

/// Creates the [`Sender`] for `mode`.
pub(crate) async fn sender(config: &Config, mode: Mode) -> Result<Arc<dyn Sender>> {
    match mode {
        Mode::Cloud => Ok(Arc::new(CloudApi::new(config).await?)),
        Mode::Test => Ok(Arc::new(TestSender::default())),
    }
}
