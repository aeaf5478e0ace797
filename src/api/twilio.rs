//! The Twilio-style WhatsApp transport.
//!
//! This provider pushes inbound messages as `application/x-www-form-urlencoded`
//! webhook requests and reads the reply from the response body as a TwiML
//! document, so no outbound client or credentials are involved.

use serde::Deserialize;

/// The form fields of one inbound message push. The provider sends many more
/// fields; only the sender and the text matter here.
#[derive(Debug, Deserialize)]
pub(crate) struct TwilioMessage {
    #[serde(rename = "From", default)]
    from: String,
    #[serde(rename = "Body")]
    body: Option<String>,
}

impl TwilioMessage {
    /// The sender's WhatsApp id with the provider's `whatsapp:` prefix stripped,
    /// e.g. `"whatsapp:+50761234567"` -> `"+50761234567"`.
    pub(crate) fn from_wa_id(&self) -> &str {
        self.from.strip_prefix("whatsapp:").unwrap_or(&self.from)
    }

    /// The text body, `None` when the push carried no text (e.g. media).
    pub(crate) fn text_body(&self) -> Option<&str> {
        self.body.as_deref()
    }
}

/// Renders a TwiML document replying with `body`.
pub(crate) fn twiml_reply(body: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?><Response><Message>{}</Message></Response>",
        escape_xml(body)
    )
}

/// Renders a TwiML document that sends nothing back.
pub(crate) fn twiml_empty() -> String {
    "<?xml version=\"1.0\" encoding=\"UTF-8\"?><Response></Response>".to_string()
}

/// Escapes the characters that are significant in XML text content.
fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            other => out.push(other),
        }
    }
    out
}
