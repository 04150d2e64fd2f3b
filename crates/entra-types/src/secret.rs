//! Client secret credential.

use std::fmt;

use crate::ids::AppId;

/// A freshly minted client secret.
///
/// The value is only available through [`ClientSecret::expose`]. `Debug`
/// redacts it and the type deliberately has no `Serialize` impl, so it cannot
/// end up in a log line or a JSON report by accident.
#[derive(Clone)]
pub struct ClientSecret {
    app_id: AppId,
    value: String,
    key_id: Option<String>,
    end_date: Option<String>,
}

impl ClientSecret {
    /// Wrap a secret value issued for `app_id`.
    pub fn new(app_id: AppId, value: impl Into<String>) -> Self {
        Self {
            app_id,
            value: value.into(),
            key_id: None,
            end_date: None,
        }
    }

    /// Attach the provider's key id.
    #[must_use]
    pub fn with_key_id(mut self, key_id: impl Into<String>) -> Self {
        self.key_id = Some(key_id.into());
        self
    }

    /// Attach the expiry timestamp as reported by the provider.
    #[must_use]
    pub fn with_end_date(mut self, end_date: impl Into<String>) -> Self {
        self.end_date = Some(end_date.into());
        self
    }

    /// Application the secret belongs to.
    #[must_use]
    pub fn app_id(&self) -> &AppId {
        &self.app_id
    }

    /// Key id, when the provider reported one.
    #[must_use]
    pub fn key_id(&self) -> Option<&str> {
        self.key_id.as_deref()
    }

    /// Expiry, when the provider reported one.
    #[must_use]
    pub fn end_date(&self) -> Option<&str> {
        self.end_date.as_deref()
    }

    /// The secret value. Print it once; never log it.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.value
    }
}

impl fmt::Debug for ClientSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSecret")
            .field("app_id", &self.app_id)
            .field("value", &"[REDACTED]")
            .field("key_id", &self.key_id)
            .field("end_date", &self.end_date)
            .finish()
    }
}
