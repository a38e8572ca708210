//! Provider and notifier configuration
//!
//! Built once at startup and never mutated. Every constructor takes a
//! lookup function so tests can supply values without touching the
//! process environment.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;
use url::Url;

pub const DOCUSIGN_DEMO_BASE: &str = "https://demo.docusign.net";
pub const DOCUSIGN_DEMO_OAUTH: &str = "https://account-d.docusign.com";
pub const DOCUSIGN_PRODUCTION_BASE: &str = "https://www.docusign.net";
pub const DOCUSIGN_PRODUCTION_OAUTH: &str = "https://account.docusign.com";
pub const DEFAULT_POKE_WEBHOOK_URL: &str = "https://poke.com/api/v1/inbound-sms/webhook";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Failed to read private key from {path}: {reason}")]
    PrivateKeyFile { path: String, reason: String },

    #[error("Invalid URL in {name}: {value}")]
    InvalidUrl { name: &'static str, value: String },
}

fn lookup_nonempty<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_url(name: &'static str, value: &str) -> Result<String, ConfigError> {
    Url::parse(value).map_err(|_| ConfigError::InvalidUrl {
        name,
        value: value.to_string(),
    })?;
    Ok(value.trim_end_matches('/').to_string())
}

/// DocuSign JWT-grant credentials and API hosts
#[derive(Clone, PartialEq, Eq)]
pub struct DocuSignConfig {
    /// REST host, e.g. `https://demo.docusign.net` (no `/restapi` suffix)
    pub base_path: String,
    /// OAuth host, e.g. `https://account-d.docusign.com`
    pub oauth_base: String,
    pub account_id: String,
    pub integration_key: String,
    pub user_id: String,
    private_key_pem: String,
}

impl DocuSignConfig {
    pub fn new(
        base_path: impl Into<String>,
        oauth_base: impl Into<String>,
        account_id: impl Into<String>,
        integration_key: impl Into<String>,
        user_id: impl Into<String>,
        private_key_pem: impl Into<String>,
    ) -> Self {
        Self {
            base_path: base_path.into().trim_end_matches('/').to_string(),
            oauth_base: oauth_base.into().trim_end_matches('/').to_string(),
            account_id: account_id.into(),
            integration_key: integration_key.into(),
            user_id: user_id.into(),
            private_key_pem: normalize_pem(&private_key_pem.into()),
        }
    }

    pub fn private_key_pem(&self) -> &str {
        &self.private_key_pem
    }

    /// JWT audience: the OAuth host without scheme
    pub fn oauth_audience(&self) -> &str {
        self.oauth_base
            .split_once("://")
            .map_or(self.oauth_base.as_str(), |(_, host)| host)
    }

    pub fn token_url(&self) -> String {
        format!("{}/oauth/token", self.oauth_base)
    }

    pub fn envelopes_url(&self) -> String {
        format!(
            "{}/restapi/v2.1/accounts/{}/envelopes",
            self.base_path, self.account_id
        )
    }

    /// Read the DocuSign settings.
    ///
    /// Returns `Ok(None)` when any of the account id, integration key,
    /// user id or private key is missing; callers register an unconfigured
    /// provider in that case.
    pub fn from_lookup<F>(lookup: F) -> Result<Option<Self>, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let production = lookup_nonempty(&lookup, "DOCUSIGN_ENVIRONMENT")
            .or_else(|| lookup_nonempty(&lookup, "ENVIRONMENT"))
            .is_some_and(|env| env.eq_ignore_ascii_case("production"));
        let (default_base, default_oauth) = if production {
            (DOCUSIGN_PRODUCTION_BASE, DOCUSIGN_PRODUCTION_OAUTH)
        } else {
            (DOCUSIGN_DEMO_BASE, DOCUSIGN_DEMO_OAUTH)
        };

        let base_path = match lookup_nonempty(&lookup, "DOCUSIGN_BASE_PATH") {
            Some(value) => {
                let value = parse_url("DOCUSIGN_BASE_PATH", &value)?;
                value.trim_end_matches("/restapi").to_string()
            }
            None => default_base.to_string(),
        };
        let oauth_base = match lookup_nonempty(&lookup, "DOCUSIGN_OAUTH_BASE") {
            Some(value) => parse_url("DOCUSIGN_OAUTH_BASE", &value)?,
            None => default_oauth.to_string(),
        };

        let private_key = match lookup_nonempty(&lookup, "DOCUSIGN_PRIVATE_KEY") {
            Some(pem) => Some(pem),
            None => match lookup_nonempty(&lookup, "DOCUSIGN_PRIVATE_KEY_PATH") {
                Some(path) => Some(std::fs::read_to_string(PathBuf::from(&path)).map_err(
                    |e| ConfigError::PrivateKeyFile {
                        path,
                        reason: e.to_string(),
                    },
                )?),
                None => None,
            },
        };

        let account_id = lookup_nonempty(&lookup, "DOCUSIGN_ACCOUNT_ID");
        let integration_key = lookup_nonempty(&lookup, "DOCUSIGN_INTEGRATION_KEY");
        let user_id = lookup_nonempty(&lookup, "DOCUSIGN_USER_ID");

        match (account_id, integration_key, user_id, private_key) {
            (Some(account_id), Some(integration_key), Some(user_id), Some(private_key)) => {
                Ok(Some(Self::new(
                    base_path,
                    oauth_base,
                    account_id,
                    integration_key,
                    user_id,
                    private_key,
                )))
            }
            (None, None, None, None) => Ok(None),
            _ => {
                tracing::warn!(
                    "DocuSign is partially configured; account id, integration key, user id and private key are all required"
                );
                Ok(None)
            }
        }
    }
}

impl fmt::Debug for DocuSignConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocuSignConfig")
            .field("base_path", &self.base_path)
            .field("oauth_base", &self.oauth_base)
            .field("account_id", &self.account_id)
            .field("integration_key", &self.integration_key)
            .field("user_id", &self.user_id)
            .field("private_key_pem", &"[REDACTED]")
            .finish()
    }
}

/// Keys pasted into a single-line env var carry literal `\n` sequences
fn normalize_pem(pem: &str) -> String {
    let pem = pem.trim().trim_matches('"');
    if pem.contains("\\n") {
        pem.replace("\\n", "\n")
    } else {
        pem.to_string()
    }
}

/// Configuration for every signature provider
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvidersConfig {
    pub docusign: Option<DocuSignConfig>,
}

impl ProvidersConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            docusign: DocuSignConfig::from_lookup(lookup)?,
        })
    }
}

/// Poke inbox webhook; disabled without an API key
#[derive(Clone, PartialEq, Eq)]
pub struct NotifierConfig {
    pub webhook_url: String,
    api_key: Option<String>,
}

impl NotifierConfig {
    pub fn new(webhook_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            webhook_url: webhook_url.into(),
            api_key,
        }
    }

    pub fn disabled() -> Self {
        Self::new(DEFAULT_POKE_WEBHOOK_URL, None)
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    pub fn is_enabled(&self) -> bool {
        self.api_key.is_some()
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let webhook_url = match lookup_nonempty(&lookup, "POKE_WEBHOOK_URL") {
            Some(url) => parse_url("POKE_WEBHOOK_URL", &url)?,
            None => DEFAULT_POKE_WEBHOOK_URL.to_string(),
        };
        Ok(Self::new(
            webhook_url,
            lookup_nonempty(&lookup, "POKE_API_KEY"),
        ))
    }
}

impl fmt::Debug for NotifierConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotifierConfig")
            .field("webhook_url", &self.webhook_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}
