//! These structs provide the CLI interface for the gastos CLI.

use clap::{Parser, Subcommand};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::error;
use tracing_subscriber::filter::LevelFilter;

/// gastos: a WhatsApp bot that records free-text expense messages.
///
/// Inbound messages like "super 23.50 USD" are parsed into a label, an amount and a
/// currency, stored in a local SQLite ledger with accounting-period fields (year,
/// month, day, quincena), and confirmed back to the sender.
///
/// Set up a WhatsApp Cloud API app, run 'gastos init' with your phone number id and
/// token files, then point your webhook subscription at a running 'gastos serve'.
#[derive(Debug, Parser, Clone)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn new(common: Common, command: Command) -> Self {
        Self { common, command }
    }

    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the data directory and initialize the configuration files.
    ///
    /// This is the first command you should run when setting up the gastos CLI. You
    /// need to get a few things ready beforehand.
    ///
    /// - Decide what directory you want to store data in and pass this as
    ///   --gastos-home. By default, it will be $HOME/gastos.
    ///
    /// - Get your WhatsApp Cloud API phone number id and pass it as
    ///   --phone-number-id.
    ///
    /// - Put your Cloud API access token and your chosen webhook verify token each
    ///   into a file and pass them as --token-file and --verify-token-file. They
    ///   will be moved into the .secrets directory. You can also skip this and drop
    ///   the files into place yourself later.
    Init(InitArgs),
    /// Run the webhook server that receives and records expense messages.
    Serve(ServeArgs),
    /// List recently recorded expenses from the local database.
    Query(QueryArgs),
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The directory where gastos data and configuration is held. Defaults to ~/gastos
    #[arg(long, env = "GASTOS_HOME", default_value_t = default_gastos_home())]
    gastos_home: DisplayPath,
}

impl Common {
    pub fn new(log_level: LevelFilter, gastos_home: PathBuf) -> Self {
        Self {
            log_level,
            gastos_home: gastos_home.into(),
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn gastos_home(&self) -> &DisplayPath {
        &self.gastos_home
    }
}

/// Args for the `gastos init` command.
#[derive(Debug, Parser, Clone)]
pub struct InitArgs {
    /// The WhatsApp Cloud API phone number id that replies are sent from.
    #[arg(long)]
    phone_number_id: String,

    /// The 3-letter currency code assumed when a message names no currency.
    /// Defaults to USD.
    #[arg(long)]
    default_currency: Option<String>,

    /// The path to a file holding your Cloud API access token. This file will be
    /// moved to the default secrets location in the main data directory.
    #[arg(long)]
    token_file: Option<PathBuf>,

    /// The path to a file holding the webhook verify token you configured with the
    /// provider. This file will be moved to the default secrets location in the
    /// main data directory.
    #[arg(long)]
    verify_token_file: Option<PathBuf>,
}

impl InitArgs {
    pub fn new(
        phone_number_id: impl Into<String>,
        default_currency: Option<String>,
        token_file: Option<PathBuf>,
        verify_token_file: Option<PathBuf>,
    ) -> Self {
        Self {
            phone_number_id: phone_number_id.into(),
            default_currency,
            token_file,
            verify_token_file,
        }
    }

    pub fn phone_number_id(&self) -> &str {
        &self.phone_number_id
    }

    pub fn default_currency(&self) -> Option<&str> {
        self.default_currency.as_deref()
    }

    pub fn token_file(&self) -> Option<&Path> {
        self.token_file.as_deref()
    }

    pub fn verify_token_file(&self) -> Option<&Path> {
        self.verify_token_file.as_deref()
    }
}

/// Args for the `gastos serve` command.
#[derive(Debug, Parser, Clone)]
pub struct ServeArgs {
    /// The port the webhook server listens on.
    #[arg(long, env = "GASTOS_PORT", default_value_t = 10000)]
    port: u16,
}

impl ServeArgs {
    pub fn new(port: u16) -> Self {
        Self { port }
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

/// Args for the `gastos query` command.
#[derive(Debug, Parser, Clone)]
pub struct QueryArgs {
    /// Only list expenses recorded for this WhatsApp id.
    #[arg(long)]
    user: Option<String>,

    /// The maximum number of expenses to list.
    #[arg(long, default_value_t = 20)]
    limit: u32,
}

impl QueryArgs {
    pub fn new(user: Option<String>, limit: u32) -> Self {
        Self { user, limit }
    }

    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }
}

fn default_gastos_home() -> DisplayPath {
    DisplayPath(match dirs::home_dir() {
        Some(home) => home.join("gastos"),
        None => {
            error!(
                "There was an error when trying to get your home directory. You can get around \
                this by providing --gastos-home or GASTOS_HOME instead of relying on the default \
                gastos home directory. If you continue using the program right now, you may have \
                problems!",
            );
            PathBuf::from("gastos")
        }
    })
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DisplayPath(PathBuf);

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        DisplayPath(value)
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for DisplayPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl DisplayPath {
    pub fn new(path: PathBuf) -> Self {
        Self(path)
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}
