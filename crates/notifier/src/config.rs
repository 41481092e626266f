//! Configuration loading for the notifier
//!
//! [`NotifierConfig`] mirrors the JSON options the presentation layer sends
//! with `init`. Missing OAuth client credentials fall back to a Google
//! Cloud Console client secret file, then to environment variables.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Notifier options filename in the config directory
const CONFIG_FILE: &str = "notifier.json";

/// Credentials filename in the config directory
const CREDENTIALS_FILE: &str = "google-credentials.json";

/// Token file location relative to the config directory
const TOKEN_FILE: &str = "oauth/gmail-oauth.json";

/// Bounds on the number of display slots
pub const MIN_MAX_RESULTS: usize = 1;
pub const MAX_MAX_RESULTS: usize = 10;
pub const DEFAULT_MAX_RESULTS: usize = 5;

/// Bounds on the polling interval, in milliseconds
pub const MIN_CHECK_FREQ_MS: u64 = 60_000;
pub const MAX_CHECK_FREQ_MS: u64 = 3_600_000;

pub const DEFAULT_EMAIL: &str = "me";
pub const DEFAULT_REDIRECT_URL: &str = "http://localhost:8080/gmail-notifier/redirect.html";
pub const GMAIL_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/gmail.readonly";

/// Options for one mailbox configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NotifierConfig {
    /// Number of display slots (clamped to 1..=10)
    pub max_results: usize,
    /// Polling interval in milliseconds (clamped to one minute..one hour)
    pub check_freq: u64,
    pub client_id: String,
    pub client_secret: String,
    /// Mailbox identifier; "me" is the authorized user
    pub email: String,
    #[serde(rename = "redirectURL")]
    pub redirect_url: String,
    pub scopes: Vec<String>,
    /// Where the credential pair is persisted
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_path: Option<PathBuf>,
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self {
            max_results: DEFAULT_MAX_RESULTS,
            check_freq: MIN_CHECK_FREQ_MS,
            client_id: String::new(),
            client_secret: String::new(),
            email: DEFAULT_EMAIL.to_string(),
            redirect_url: DEFAULT_REDIRECT_URL.to_string(),
            scopes: vec![GMAIL_READONLY_SCOPE.to_string()],
            token_path: None,
        }
    }
}

impl NotifierConfig {
    /// Load options from ~/.config/gmail-notifier/notifier.json (defaults if
    /// absent), then fill in missing client credentials.
    pub fn load() -> Result<Self> {
        let config = if config::config_exists(CONFIG_FILE) {
            config::load_json(CONFIG_FILE)?
        } else {
            Self::default()
        };
        Ok(config.with_fallback_credentials())
    }

    /// Load options from a specific JSON file, then fill in missing client
    /// credentials.
    pub fn from_file(path: &Path) -> Result<Self> {
        let config: Self = config::load_json_file(path)?;
        Ok(config.with_fallback_credentials())
    }

    /// Parse options from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse notifier config JSON")
    }

    /// Fill an empty client id/secret from [`GmailCredentials::load`]
    pub fn with_fallback_credentials(mut self) -> Self {
        if self.has_credentials() {
            return self;
        }
        match GmailCredentials::load() {
            Ok(creds) => {
                self.client_id = creds.client_id;
                self.client_secret = creds.client_secret;
            }
            Err(e) => log::debug!("No fallback OAuth credentials: {:#}", e),
        }
        self
    }

    pub fn has_credentials(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty()
    }

    /// Reject configurations that can never authorize
    pub fn validate(&self) -> Result<()> {
        if !self.has_credentials() {
            anyhow::bail!("Client ID/Secret missing. Check your config.");
        }
        if self.scopes.is_empty() {
            anyhow::bail!("At least one OAuth scope is required");
        }
        Ok(())
    }

    /// Number of display slots, clamped to the supported range
    pub fn max_results(&self) -> usize {
        self.max_results.clamp(MIN_MAX_RESULTS, MAX_MAX_RESULTS)
    }

    /// Polling interval, clamped to the provider's quota-friendly range
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.check_freq.clamp(MIN_CHECK_FREQ_MS, MAX_CHECK_FREQ_MS))
    }

    /// Configured token path, or ~/.config/gmail-notifier/oauth/gmail-oauth.json
    pub fn token_path(&self) -> Result<PathBuf> {
        match &self.token_path {
            Some(path) => Ok(path.clone()),
            None => config::config_path(TOKEN_FILE).context("Could not determine config directory"),
        }
    }
}

/// OAuth client id and secret used when the notifier config has none
#[derive(Debug, Clone)]
pub struct GmailCredentials {
    pub client_id: String,
    pub client_secret: String,
}

/// Client secret download from the Google Cloud Console; desktop clients
/// use `installed`, web clients use `web`
#[derive(Deserialize)]
struct ClientSecretFile {
    #[serde(alias = "web")]
    installed: ClientSecret,
}

#[derive(Deserialize)]
struct ClientSecret {
    client_id: String,
    client_secret: String,
}

impl From<ClientSecret> for GmailCredentials {
    fn from(secret: ClientSecret) -> Self {
        Self {
            client_id: secret.client_id,
            client_secret: secret.client_secret,
        }
    }
}

impl GmailCredentials {
    /// `google-credentials.json` in the config directory if present,
    /// otherwise `GMAIL_CLIENT_ID`/`GMAIL_CLIENT_SECRET`
    pub fn load() -> Result<Self> {
        if config::config_exists(CREDENTIALS_FILE) {
            let file: ClientSecretFile = config::load_json(CREDENTIALS_FILE)?;
            return Ok(file.installed.into());
        }
        Self::from_env()
    }

    /// Parse a client secret download
    pub fn from_json(json: &str) -> Result<Self> {
        let file: ClientSecretFile = serde_json::from_str(json)
            .context("Credentials file needs an 'installed' or 'web' section")?;
        Ok(file.installed.into())
    }

    /// Where [`GmailCredentials::load`] looks for the client secret file
    pub fn default_credentials_path() -> Option<PathBuf> {
        config::config_path(CREDENTIALS_FILE)
    }

    pub fn from_env() -> Result<Self> {
        let client_id = std::env::var("GMAIL_CLIENT_ID").context("GMAIL_CLIENT_ID is not set")?;
        let client_secret =
            std::env::var("GMAIL_CLIENT_SECRET").context("GMAIL_CLIENT_SECRET is not set")?;
        Ok(Self {
            client_id,
            client_secret,
        })
    }
}
