use crate::api::{self, Mode};
use crate::server::{self, AppState};
use crate::{Config, Result};
use tracing::info;

/// Runs the webhook server until the process is stopped.
///
/// Loads the webhook verify token and builds the outbound sender up front so a
/// missing secret fails at startup, not on the first delivery.
pub async fn serve(config: Config, mode: Mode, port: u16) -> Result<()> {
    let verify_token = config.verify_token().await?;
    let sender = api::sender(&config, mode).await?;
    if mode == Mode::Test {
        info!("Running in test mode, outbound messages will not be delivered");
    }
    server::serve(AppState::new(config, sender, verify_token), port).await
}
