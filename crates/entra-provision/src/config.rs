//! Provisioning settings.
//!
//! Settings come from a shell-style `KEY=value` file (the same file the
//! deployment scripts `source`) or from any iterator of key/value pairs.
//!
//! ```text
//! # API Management authentication app
//! APP_NAME=MyAPIM-AuthApp
//! REDIRECT_URI=https://myapi.example.com/auth/callback
//! export ROLE_NAME="Reader"
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use entra_directory::RetryPolicy;
use entra_types::{DesiredRegistration, SignInAudience, SubscriptionId, TenantId};
use thiserror::Error;
use url::Url;

use crate::reconcile::RedirectPolicy;

/// Longest display name the directory accepts.
pub const MAX_APP_NAME_LEN: usize = 120;

/// Log file used when `LOG_FILE` is not set.
pub const DEFAULT_LOG_FILE: &str = "app_registration.log";

/// Errors produced while loading settings.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required key is absent or empty.
    #[error("missing required setting {key}")]
    MissingVariable {
        /// The missing key.
        key: String,
    },

    /// A key has a value that fails validation.
    #[error("invalid value for {key}: {reason}")]
    InvalidFormat {
        /// The offending key.
        key: String,
        /// Why the value was rejected.
        reason: String,
    },

    /// A non-comment line without `=`.
    #[error("line {line}: expected KEY=value")]
    Syntax {
        /// 1-based line number.
        line: usize,
    },

    /// The settings file could not be read.
    #[error("cannot read {}: {source}", path.display())]
    Io {
        /// The file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    fn invalid(key: &str, reason: impl Into<String>) -> Self {
        Self::InvalidFormat {
            key: key.to_string(),
            reason: reason.into(),
        }
    }

    /// The key this error is about, if any.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::MissingVariable { key } | Self::InvalidFormat { key, .. } => Some(key),
            Self::Syntax { .. } | Self::Io { .. } => None,
        }
    }
}

/// Check that `uri` is usable as a web redirect URI.
///
/// Only `https` is accepted, except for `http` on a loopback host
/// (`localhost`, `127.0.0.1`, `[::1]`).
///
/// # Errors
///
/// Returns a human-readable reason when the URI is rejected.
pub fn check_redirect_uri(uri: &str) -> Result<(), String> {
    let url = Url::parse(uri).map_err(|e| format!("`{uri}` is not an absolute URL: {e}"))?;
    let host = url
        .host_str()
        .ok_or_else(|| format!("`{uri}` has no host"))?;
    match url.scheme() {
        "https" => Ok(()),
        "http" if is_loopback(host) => Ok(()),
        "http" => Err(format!(
            "`{uri}` uses http; only https is allowed outside localhost"
        )),
        other => Err(format!("`{uri}` uses unsupported scheme `{other}`")),
    }
}

fn is_loopback(host: &str) -> bool {
    matches!(host, "localhost" | "127.0.0.1" | "[::1]")
}

/// Validated provisioning settings.
///
/// Immutable for the duration of a run; the builder setters exist for
/// command-line overrides and tests.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct Settings {
    /// Registration display name (`APP_NAME`).
    pub app_name: String,
    /// Web redirect URI (`REDIRECT_URI`).
    pub redirect_uri: String,
    /// Role granted to the service principal (`ROLE_NAME`, default `Reader`).
    pub role_name: String,
    /// Expected tenant (`AZURE_TENANT_ID`); taken from the CLI session when unset.
    pub tenant_id: Option<TenantId>,
    /// Subscription (`AZURE_SUBSCRIPTION_ID`); taken from the CLI session when unset.
    pub subscription_id: Option<SubscriptionId>,
    /// Target audience (`SIGN_IN_AUDIENCE`, default `AzureADMultipleOrgs`).
    pub sign_in_audience: SignInAudience,
    /// Role assignment scope (`ROLE_SCOPE`, default the subscription).
    pub role_scope: Option<String>,
    /// Handling of redirect URIs on existing registrations (`REDIRECT_URI_POLICY`).
    pub redirect_policy: RedirectPolicy,
    /// Secret display name (`SECRET_DISPLAY_NAME`, default `{APP_NAME}-secret`).
    pub secret_display_name: Option<String>,
    /// Secret lifetime in years (`SECRET_YEARS`, 1 or 2).
    pub secret_years: u8,
    /// Whether a run mints a client secret.
    pub mint_secret: bool,
    /// Log file (`LOG_FILE`).
    pub log_file: PathBuf,
    /// Retry policy (`MAX_RETRIES`, `RETRY_DELAY_SECS`).
    pub retry: RetryPolicy,
}

impl Settings {
    /// Settings with only the two required values.
    ///
    /// # Errors
    ///
    /// Fails if either value is invalid.
    pub fn new(app_name: &str, redirect_uri: &str) -> Result<Self, ConfigError> {
        Self::from_pairs([("APP_NAME", app_name), ("REDIRECT_URI", redirect_uri)])
    }

    /// Load settings from a file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, otherwise
    /// whatever [`Settings::parse`] returns.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "loaded settings file");
        Self::parse(&text)
    }

    /// Parse shell-style `KEY=value` text.
    ///
    /// Blank lines and `#` comments are skipped, a leading `export ` is
    /// ignored, and matching single or double quotes around the value are
    /// removed. Unquoted values end at ` #`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Syntax`] for a line without `=`, or the
    /// validation errors of [`Settings::from_pairs`].
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let mut pairs = Vec::new();

        for (index, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let line = line.strip_prefix("export ").map_or(line, str::trim_start);

            let (key, value) = line
                .split_once('=')
                .ok_or(ConfigError::Syntax { line: index + 1 })?;

            pairs.push((key.trim().to_string(), unquote(value.trim()).to_string()));
        }

        Self::from_pairs(pairs)
    }

    /// Build settings from key/value pairs. Later duplicates win.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingVariable`] or
    /// [`ConfigError::InvalidFormat`] naming the offending key.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut app_name = None;
        let mut redirect_uri = None;
        let mut role_name = "Reader".to_string();
        let mut tenant_id = None;
        let mut subscription_id = None;
        let mut sign_in_audience = SignInAudience::AzureAdMultipleOrgs;
        let mut role_scope = None;
        let mut redirect_policy = RedirectPolicy::default();
        let mut secret_display_name = None;
        let mut secret_years = 1;
        let mut log_file = PathBuf::from(DEFAULT_LOG_FILE);
        let mut max_retries = 3;
        let mut retry_delay = 5;

        for (key, value) in pairs {
            let key = key.as_ref().trim().to_ascii_uppercase();
            let value = value.as_ref().trim();

            // Empty values fall back to the default, like an unset variable.
            if value.is_empty() {
                continue;
            }

            match key.as_str() {
                "APP_NAME" => {
                    if value.chars().count() > MAX_APP_NAME_LEN {
                        return Err(ConfigError::invalid(
                            &key,
                            format!("longer than {MAX_APP_NAME_LEN} characters"),
                        ));
                    }
                    app_name = Some(value.to_string());
                }
                "REDIRECT_URI" => {
                    check_redirect_uri(value).map_err(|reason| ConfigError::invalid(&key, reason))?;
                    redirect_uri = Some(value.to_string());
                }
                "ROLE_NAME" => role_name = value.to_string(),
                "AZURE_TENANT_ID" => {
                    tenant_id = Some(
                        TenantId::parse(value).map_err(|e| ConfigError::invalid(&key, e.to_string()))?,
                    );
                }
                "AZURE_SUBSCRIPTION_ID" => {
                    subscription_id = Some(
                        SubscriptionId::parse(value)
                            .map_err(|e| ConfigError::invalid(&key, e.to_string()))?,
                    );
                }
                "SIGN_IN_AUDIENCE" => {
                    sign_in_audience = SignInAudience::parse(value)
                        .map_err(|e| ConfigError::invalid(&key, e.to_string()))?;
                }
                "ROLE_SCOPE" => {
                    if !value.starts_with("/subscriptions/") {
                        return Err(ConfigError::invalid(&key, "must start with /subscriptions/"));
                    }
                    role_scope = Some(value.trim_end_matches('/').to_string());
                }
                "REDIRECT_URI_POLICY" => {
                    redirect_policy = value
                        .parse()
                        .map_err(|reason: String| ConfigError::invalid(&key, reason))?;
                }
                "SECRET_DISPLAY_NAME" => secret_display_name = Some(value.to_string()),
                "SECRET_YEARS" => secret_years = parse_bounded(&key, value, 1, 2)?,
                "LOG_FILE" => log_file = PathBuf::from(value),
                "MAX_RETRIES" => max_retries = parse_bounded(&key, value, 0, 10)?,
                "RETRY_DELAY_SECS" => retry_delay = parse_bounded(&key, value, 0, 300)?,
                _ => {
                    // Settings files are shared with the deployment scripts.
                    tracing::debug!(key = %key, "ignoring unknown setting");
                }
            }
        }

        let app_name = app_name.ok_or_else(|| ConfigError::MissingVariable {
            key: "APP_NAME".into(),
        })?;
        let redirect_uri = redirect_uri.ok_or_else(|| ConfigError::MissingVariable {
            key: "REDIRECT_URI".into(),
        })?;

        Ok(Self {
            app_name,
            redirect_uri,
            role_name,
            tenant_id,
            subscription_id,
            sign_in_audience,
            role_scope,
            redirect_policy,
            secret_display_name,
            secret_years: secret_years as u8,
            mint_secret: true,
            log_file,
            retry: RetryPolicy::new()
                .max_retries(max_retries)
                .initial_backoff(Duration::from_secs(u64::from(retry_delay))),
        })
    }

    /// The desired registration state for this run.
    #[must_use]
    pub fn desired(&self) -> DesiredRegistration {
        DesiredRegistration::new(&self.app_name, &self.redirect_uri)
            .role_name(&self.role_name)
            .sign_in_audience(self.sign_in_audience.clone())
    }

    /// The role assignment scope, given the session's subscription.
    ///
    /// The configured subscription takes precedence over the session's.
    #[must_use]
    pub fn scope_for(&self, session_subscription: &SubscriptionId) -> String {
        match &self.role_scope {
            Some(scope) => scope.clone(),
            None => {
                let subscription = self.subscription_id.as_ref().unwrap_or(session_subscription);
                format!("/subscriptions/{subscription}")
            }
        }
    }

    /// Display name for minted secrets.
    #[must_use]
    pub fn secret_name(&self) -> String {
        self.secret_display_name
            .clone()
            .unwrap_or_else(|| format!("{}-secret", self.app_name))
    }

    /// Set the role name.
    #[must_use]
    pub fn role_name(mut self, role: impl Into<String>) -> Self {
        self.role_name = role.into();
        self
    }

    /// Set the target audience.
    #[must_use]
    pub fn audience(mut self, audience: SignInAudience) -> Self {
        self.sign_in_audience = audience;
        self
    }

    /// Set the redirect URI policy.
    #[must_use]
    pub fn redirect_policy(mut self, policy: RedirectPolicy) -> Self {
        self.redirect_policy = policy;
        self
    }

    /// Set the role assignment scope.
    #[must_use]
    pub fn role_scope(mut self, scope: impl Into<String>) -> Self {
        self.role_scope = Some(scope.into());
        self
    }

    /// Set the expected tenant.
    #[must_use]
    pub fn tenant_id(mut self, tenant: TenantId) -> Self {
        self.tenant_id = Some(tenant);
        self
    }

    /// Enable or disable minting a client secret.
    #[must_use]
    pub fn mint_secret(mut self, enabled: bool) -> Self {
        self.mint_secret = enabled;
        self
    }

    /// Set the retry policy.
    #[must_use]
    pub fn retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    /// Set the log file.
    #[must_use]
    pub fn log_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.log_file = path.into();
        self
    }
}

fn parse_bounded(key: &str, value: &str, min: u32, max: u32) -> Result<u32, ConfigError> {
    let parsed: u32 = value
        .parse()
        .map_err(|_| ConfigError::invalid(key, format!("`{value}` is not a whole number")))?;
    if !(min..=max).contains(&parsed) {
        return Err(ConfigError::invalid(
            key,
            format!("{parsed} is outside {min}..={max}"),
        ));
    }
    Ok(parsed)
}

fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        let Some(body) = value.strip_prefix(quote) else {
            continue;
        };
        if let Some(close) = body.find(quote) {
            let rest = body[close + 1..].trim_start();
            if rest.is_empty() || rest.starts_with('#') {
                return &body[..close];
            }
        }
    }
    match value.find(" #") {
        Some(end) => value[..end].trim_end(),
        None => value,
    }
}
