//! Deployment parameters.

use std::collections::BTreeMap;

use entra_types::is_canonical_guid;

use crate::error::InfraError;

/// Default API Management tier.
pub const DEFAULT_APIM_SKU: &str = "Consumption";

/// Inputs of a deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfraParams {
    /// Environment name, `[a-z0-9-]+`. Also the `azd-env-name` tag.
    pub environment_name: String,
    /// Azure region, e.g. `eastus2`.
    pub location: String,
    /// Scope the deployment targets (subscription or resource group id).
    pub scope_id: String,
    /// Principal that also gets `AcrPull`; empty for none.
    pub principal_id: String,
    /// API Management publisher email.
    pub publisher_email: String,
    /// API Management publisher name.
    pub publisher_name: String,
    /// API Management SKU name.
    pub apim_sku: String,
    /// Extra tags for every taggable resource.
    pub tags: BTreeMap<String, String>,
}

impl InfraParams {
    /// Parameters with defaults for everything but the three naming inputs.
    pub fn new(
        environment_name: impl Into<String>,
        location: impl Into<String>,
        scope_id: impl Into<String>,
    ) -> Self {
        Self {
            environment_name: environment_name.into(),
            location: location.into(),
            scope_id: scope_id.into(),
            principal_id: String::new(),
            publisher_email: "apim-admin@example.com".to_string(),
            publisher_name: "API Publisher".to_string(),
            apim_sku: DEFAULT_APIM_SKU.to_string(),
            tags: BTreeMap::new(),
        }
    }

    /// Grant `AcrPull` to this principal as well.
    #[must_use]
    pub fn principal_id(mut self, principal_id: impl Into<String>) -> Self {
        self.principal_id = principal_id.into();
        self
    }

    /// Set the API Management publisher.
    #[must_use]
    pub fn publisher(mut self, email: impl Into<String>, name: impl Into<String>) -> Self {
        self.publisher_email = email.into();
        self.publisher_name = name.into();
        self
    }

    /// Set the API Management SKU.
    #[must_use]
    pub fn apim_sku(mut self, sku: impl Into<String>) -> Self {
        self.apim_sku = sku.into();
        self
    }

    /// Add a tag.
    #[must_use]
    pub fn tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    /// The principal id, if one was given.
    #[must_use]
    pub fn principal(&self) -> Option<&str> {
        let trimmed = self.principal_id.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }

    /// Check every parameter.
    ///
    /// # Errors
    ///
    /// [`InfraError::InvalidParameter`] naming the first bad parameter.
    pub fn validate(&self) -> Result<(), InfraError> {
        if self.environment_name.is_empty() {
            return Err(InfraError::invalid("environment_name", "must not be empty"));
        }
        if !self
            .environment_name
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
        {
            return Err(InfraError::invalid(
                "environment_name",
                format!(
                    "`{}` may only contain lowercase letters, digits and hyphens",
                    self.environment_name
                ),
            ));
        }
        if self.location.is_empty() {
            return Err(InfraError::invalid("location", "must not be empty"));
        }
        if !self
            .location
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit())
        {
            return Err(InfraError::invalid(
                "location",
                format!("`{}` is not a region name such as eastus2", self.location),
            ));
        }
        if self.scope_id.trim().is_empty() {
            return Err(InfraError::invalid("scope_id", "must not be empty"));
        }
        if let Some(principal) = self.principal() {
            if !is_canonical_guid(principal) {
                return Err(InfraError::invalid(
                    "principal_id",
                    format!("`{principal}` is not a GUID"),
                ));
            }
        }
        if self.publisher_email.trim().is_empty() || !self.publisher_email.contains('@') {
            return Err(InfraError::invalid(
                "publisher_email",
                format!("`{}` is not an email address", self.publisher_email),
            ));
        }
        if self.apim_sku.trim().is_empty() {
            return Err(InfraError::invalid("apim_sku", "must not be empty"));
        }
        if self.tags.keys().any(|k| k.trim().is_empty()) {
            return Err(InfraError::invalid("tags", "tag names must not be empty"));
        }
        Ok(())
    }
}
