use crate::args::InitArgs;
use crate::commands::Out;
use crate::{Config, Result};
use anyhow::Context;
use std::path::Path;

/// Creates the data directory, its subdirectories and:
/// - Creates an initial `config.json` file with the Cloud API settings
/// - Moves the provided secret files into their default locations in the data dir
/// - Initializes the SQLite database
///
/// # Arguments
/// - `gastos_home` - The directory that will be the root of the data directory,
///   e.g. `$HOME/gastos`
/// - `args` - The phone number id, optional default currency and optional paths to
///   files holding the access token and webhook verify token.
///
/// # Errors
/// - Returns an error if any file operations fail.
pub async fn init(gastos_home: &Path, args: &InitArgs) -> Result<Out<()>> {
    let _config = Config::create(
        gastos_home,
        args.phone_number_id(),
        args.default_currency(),
        args.token_file(),
        args.verify_token_file(),
    )
    .await
    .context("Unable to create the data directory and configs")?;
    Ok("Successfully created the gastos directory and config".into())
}
