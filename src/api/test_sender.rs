//! Implements the very simple `Sender` trait using in-memory storage for testing.
//!
//! Note: this is compiled even in the "production" version of this app so that we can
//! run the whole service, top-to-bottom, without talking to the messaging provider.

use crate::api::Sender;
use crate::Result;
use std::sync::Mutex;
use tracing::info;

/// One captured outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SentMessage {
    pub(crate) to: String,
    pub(crate) body: String,
}

/// An implementation of the `Sender` trait that records messages instead of
/// delivering them.
#[derive(Debug, Default)]
pub(crate) struct TestSender {
    sent: Mutex<Vec<SentMessage>>,
}

impl TestSender {
    /// A snapshot of everything "sent" so far, in send order.
    pub(crate) fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().expect("sent messages lock").clone()
    }
}

#[async_trait::async_trait]
impl Sender for TestSender {
    async fn send_text(&self, to: &str, body: &str) -> Result<()> {
        info!("[test mode] would send to {to}: {body}");
        self.sent.lock().expect("sent messages lock").push(SentMessage {
            to: to.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}
