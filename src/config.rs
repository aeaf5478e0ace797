//! Configuration file handling for the gastos service.
//!
//! The configuration file is stored at `$GASTOS_HOME/config.json` and contains the
//! WhatsApp Cloud API settings and the default currency. Secrets (the Cloud API
//! access token and the webhook verify token) live as plain files under
//! `$GASTOS_HOME/.secrets/` and are never written into `config.json`.

use crate::db::Db;
use crate::{utils, Result};
use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const APP_NAME: &str = "gastos";
const CONFIG_VERSION: u8 = 1;
const SECRETS: &str = ".secrets";
const WHATSAPP_TOKEN: &str = "whatsapp_token";
const VERIFY_TOKEN: &str = "verify_token";
const CONFIG_JSON: &str = "config.json";
const GASTOS_SQLITE: &str = "gastos.sqlite";

/// The currency assumed when neither the message nor the config names one.
const FALLBACK_CURRENCY: &str = "USD";

/// The Graph API version-pinned base URL used unless the config overrides it.
const GRAPH_API_BASE: &str = "https://graph.facebook.com/v21.0";

/// The `Config` object represents the configuration of the app. You instantiate it by
/// providing the path to `$GASTOS_HOME` and from there it loads
/// `$GASTOS_HOME/config.json`. It is constructed once at process start and passed by
/// reference into the transport adapters and commands; nothing else reads process
/// state for configuration.
#[derive(Debug, Clone)]
pub struct Config {
    root: PathBuf,
    secrets: PathBuf,
    config_path: PathBuf,
    config_file: ConfigFile,
    db: Db,
    sqlite_path: PathBuf,
    default_currency: String,
}

impl Config {
    /// Creates the data directory, its subdirectories and:
    /// - Creates an initial `config.json` file with the Cloud API settings
    /// - Moves the provided secret files into their default locations in the data dir
    /// - Initializes the SQLite database
    ///
    /// # Arguments
    /// - `dir` - The directory that will be the root of the data directory, e.g. `$HOME/gastos`
    /// - `phone_number_id` - The WhatsApp Cloud API phone number id replies are sent from
    /// - `default_currency` - Optional 3-letter code assumed for messages that name no
    ///   currency; defaults to USD
    /// - `token_file` - Optional path to a file holding the Cloud API access token; moved
    ///   to `.secrets/whatsapp_token`
    /// - `verify_token_file` - Optional path to a file holding the webhook verify token;
    ///   moved to `.secrets/verify_token`
    ///
    /// # Errors
    /// - Returns an error if any file operations fail or the currency code is malformed.
    pub async fn create(
        dir: impl Into<PathBuf>,
        phone_number_id: &str,
        default_currency: Option<&str>,
        token_file: Option<&Path>,
        verify_token_file: Option<&Path>,
    ) -> Result<Self> {
        let maybe_relative = dir.into();
        utils::make_dir(&maybe_relative)
            .await
            .context("Unable to create the gastos home directory")?;
        let root = utils::canonicalize(&maybe_relative).await?;

        let secrets_dir = root.join(SECRETS);
        utils::make_dir(&secrets_dir).await?;

        if let Some(token_file) = token_file {
            utils::rename(token_file, secrets_dir.join(WHATSAPP_TOKEN)).await?;
        }
        if let Some(verify_token_file) = verify_token_file {
            utils::rename(verify_token_file, secrets_dir.join(VERIFY_TOKEN)).await?;
        }

        let default_currency = normalize_currency(default_currency.unwrap_or(FALLBACK_CURRENCY))?;

        let config_path = root.join(CONFIG_JSON);
        let config_file = ConfigFile {
            app_name: APP_NAME.to_string(),
            config_version: CONFIG_VERSION,
            phone_number_id: phone_number_id.to_string(),
            default_currency: Some(default_currency.clone()),
            graph_api_base: None,
            token_path: None,
            verify_token_path: None,
        };
        config_file.save(&config_path).await?;

        let sqlite_path = root.join(GASTOS_SQLITE);
        let db = Db::init(&sqlite_path)
            .await
            .context("Unable to create SQLite DB")?;

        Ok(Self {
            root,
            secrets: secrets_dir,
            config_path,
            config_file,
            db,
            sqlite_path,
            default_currency,
        })
    }

    /// This will
    /// - validate that the `gastos_home` exists and that the config file exists
    /// - load the config file
    /// - validate that the secrets directory exists
    /// - load the SQLite database, migrating it if needed
    /// - return the loaded configuration object
    pub async fn load(gastos_home: impl Into<PathBuf>) -> Result<Self> {
        let maybe_relative = gastos_home.into();
        let root = utils::canonicalize(&maybe_relative).await?;

        // Validate that the home directory exists.
        let _ = utils::read_dir(&root)
            .await
            .context("Gastos home is missing")?;

        let config_path = root.join(CONFIG_JSON);
        if !config_path.is_file() {
            bail!("The config file is missing '{}'", config_path.display())
        }
        let config_file = ConfigFile::load(&config_path).await?;

        let default_currency = normalize_currency(
            config_file
                .default_currency
                .as_deref()
                .unwrap_or(FALLBACK_CURRENCY),
        )?;

        let sqlite_path = root.join(GASTOS_SQLITE);
        let db = Db::load(&sqlite_path)
            .await
            .context("Unable to load SQLite DB")?;

        let config = Self {
            root: root.clone(),
            secrets: root.join(SECRETS),
            config_path,
            config_file,
            db,
            sqlite_path,
            default_currency,
        };
        if !config.secrets.is_dir() {
            bail!(
                "The secrets directory is missing '{}'",
                config.secrets.display()
            )
        }
        Ok(config)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub(crate) fn db(&self) -> &Db {
        &self.db
    }

    pub fn secrets(&self) -> &Path {
        &self.secrets
    }

    pub fn sqlite_path(&self) -> &Path {
        &self.sqlite_path
    }

    pub fn phone_number_id(&self) -> &str {
        &self.config_file.phone_number_id
    }

    /// The 3-letter uppercase code assumed for messages that name no currency.
    pub fn default_currency(&self) -> &str {
        &self.default_currency
    }

    /// The Graph API base URL, e.g. `https://graph.facebook.com/v21.0`. Overridable
    /// in the config file, which tests use to point the client at a local server.
    pub fn graph_api_base(&self) -> &str {
        self.config_file
            .graph_api_base
            .as_deref()
            .unwrap_or(GRAPH_API_BASE)
    }

    /// Reads the Cloud API access token from its secrets file.
    pub async fn access_token(&self) -> Result<String> {
        self.read_secret(self.config_file.token_path(), WHATSAPP_TOKEN)
            .await
    }

    /// Reads the webhook verify token from its secrets file.
    pub async fn verify_token(&self) -> Result<String> {
        self.read_secret(self.config_file.verify_token_path(), VERIFY_TOKEN)
            .await
    }

    /// Reads and trims one secret file, resolving a relative override against root.
    async fn read_secret(&self, p: PathBuf, what: &str) -> Result<String> {
        let path = if p.is_absolute() { p } else { self.root.join(p) };
        let value = utils::read(&path)
            .await
            .with_context(|| format!("Unable to read the {what} secret"))?;
        let value = value.trim().to_string();
        if value.is_empty() {
            bail!("The {what} secret at {} is empty", path.display());
        }
        Ok(value)
    }
}

/// Represents the serialization and deserialization format of the configuration file.
///
/// Example configuration:
/// ```json
/// {
///   "app_name": "gastos",
///   "config_version": 1,
///   "phone_number_id": "386742109515873",
///   "default_currency": "PAB"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Eq, PartialEq)]
struct ConfigFile {
    /// Application name, should always be "gastos"
    app_name: String,

    /// Configuration file version
    config_version: u8,

    /// The WhatsApp Cloud API phone number id that replies are sent from
    phone_number_id: String,

    /// 3-letter code assumed when a message names no currency (optional, defaults to USD)
    #[serde(skip_serializing_if = "Option::is_none")]
    default_currency: Option<String>,

    /// Override for the Graph API base URL (optional)
    #[serde(skip_serializing_if = "Option::is_none")]
    graph_api_base: Option<String>,

    /// Path to the Cloud API access token file (optional, relative to the home dir or absolute)
    /// Defaults to $GASTOS_HOME/.secrets/whatsapp_token if not specified
    #[serde(skip_serializing_if = "Option::is_none")]
    token_path: Option<PathBuf>,

    /// Path to the webhook verify token file (optional, relative to the home dir or absolute)
    /// Defaults to $GASTOS_HOME/.secrets/verify_token if not specified
    #[serde(skip_serializing_if = "Option::is_none")]
    verify_token_path: Option<PathBuf>,
}

impl ConfigFile {
    /// Loads a ConfigFile asynchronously from the specified path.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed
    async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = utils::read(path).await?;

        let config: ConfigFile = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file at {}", path.display()))?;

        anyhow::ensure!(
            config.app_name == APP_NAME,
            "Invalid app_name in config file: expected '{}', got '{}'",
            APP_NAME,
            config.app_name
        );

        Ok(config)
    }

    /// Saves the ConfigFile to the specified path.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written
    async fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let p = path.as_ref();
        let data = serde_json::to_string_pretty(self).context("Unable to serialize config")?;
        utils::write(p, data)
            .await
            .context("Unable to write config file")
    }

    /// Gets the access token path, defaulting to `.secrets/whatsapp_token`.
    fn token_path(&self) -> PathBuf {
        self.token_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(SECRETS).join(WHATSAPP_TOKEN))
    }

    /// Gets the verify token path, defaulting to `.secrets/verify_token`.
    fn verify_token_path(&self) -> PathBuf {
        self.verify_token_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(SECRETS).join(VERIFY_TOKEN))
    }
}

/// Validates a currency code: exactly three ASCII letters, returned uppercased.
fn normalize_currency(code: &str) -> Result<String> {
    let code = code.trim();
    if code.len() != 3 || !code.bytes().all(|b| b.is_ascii_alphabetic()) {
        bail!("'{code}' is not a 3-letter currency code");
    }
    Ok(code.to_uppercase())
}
