//! Sign-in audience values and their classification.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

/// Which accounts may sign in to an application.
///
/// The four named variants are the values the identity provider accepts on
/// write. Anything else the provider reports on read is kept verbatim in
/// [`SignInAudience::Other`] so that it can be shown to the user.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SignInAudience {
    /// Accounts in the home tenant only.
    AzureAdMyOrg,
    /// Work and school accounts from any tenant.
    AzureAdMultipleOrgs,
    /// Any tenant plus personal Microsoft accounts.
    AzureAdAndPersonalMicrosoftAccount,
    /// Personal Microsoft accounts only.
    PersonalMicrosoftAccount,
    /// A value this tool does not know about.
    Other(String),
}

impl SignInAudience {
    /// The provider's wire value.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::AzureAdMyOrg => "AzureADMyOrg",
            Self::AzureAdMultipleOrgs => "AzureADMultipleOrgs",
            Self::AzureAdAndPersonalMicrosoftAccount => "AzureADandPersonalMicrosoftAccount",
            Self::PersonalMicrosoftAccount => "PersonalMicrosoftAccount",
            Self::Other(raw) => raw,
        }
    }

    /// Interpret a value reported by the provider.
    ///
    /// Never fails: unrecognized values become [`SignInAudience::Other`].
    #[must_use]
    pub fn from_wire(value: &str) -> Self {
        Self::known(value.trim()).unwrap_or_else(|| Self::Other(value.trim().to_string()))
    }

    /// Parse user input: a wire value or one of the friendly aliases
    /// `single-tenant`, `multitenant`, `multitenant+personal`, `personal-only`.
    ///
    /// # Errors
    ///
    /// Returns [`TypeError::UnknownAudience`] for anything else, since an
    /// unknown value must never be written back to the provider.
    pub fn parse(input: &str) -> Result<Self, TypeError> {
        let trimmed = input.trim();
        if let Some(known) = Self::known(trimmed) {
            return Ok(known);
        }
        match trimmed.to_ascii_lowercase().as_str() {
            "single-tenant" | "singletenant" => Ok(Self::AzureAdMyOrg),
            "multitenant" | "multi-tenant" => Ok(Self::AzureAdMultipleOrgs),
            "multitenant+personal" | "multi-tenant+personal" => {
                Ok(Self::AzureAdAndPersonalMicrosoftAccount)
            }
            "personal-only" | "personal" => Ok(Self::PersonalMicrosoftAccount),
            _ => Err(TypeError::UnknownAudience(input.to_string())),
        }
    }

    fn known(value: &str) -> Option<Self> {
        [
            Self::AzureAdMyOrg,
            Self::AzureAdMultipleOrgs,
            Self::AzureAdAndPersonalMicrosoftAccount,
            Self::PersonalMicrosoftAccount,
        ]
        .into_iter()
        .find(|candidate| candidate.as_str().eq_ignore_ascii_case(value))
    }

    /// Classify the audience against the multitenant policy.
    #[must_use]
    pub fn class(&self) -> AudienceClass {
        match self {
            Self::AzureAdMyOrg => AudienceClass::SingleTenant,
            Self::AzureAdMultipleOrgs => AudienceClass::Multitenant,
            Self::AzureAdAndPersonalMicrosoftAccount => AudienceClass::MultitenantAndPersonal,
            Self::PersonalMicrosoftAccount => AudienceClass::PersonalOnly,
            Self::Other(_) => AudienceClass::Unknown,
        }
    }

    /// Whether work accounts from other tenants can sign in.
    #[must_use]
    pub fn is_multitenant(&self) -> bool {
        matches!(
            self,
            Self::AzureAdMultipleOrgs | Self::AzureAdAndPersonalMicrosoftAccount
        )
    }
}

impl fmt::Display for SignInAudience {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SignInAudience {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for SignInAudience {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for SignInAudience {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::from_wire(&raw))
    }
}

/// Coarse classification used by the validation report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AudienceClass {
    /// Home tenant only.
    #[serde(rename = "single-tenant")]
    SingleTenant,
    /// Any work or school tenant.
    #[serde(rename = "multitenant")]
    Multitenant,
    /// Any tenant plus personal accounts.
    #[serde(rename = "multitenant+personal")]
    MultitenantAndPersonal,
    /// Personal accounts only.
    #[serde(rename = "personal-only")]
    PersonalOnly,
    /// Not a recognized audience.
    #[serde(rename = "unknown")]
    Unknown,
}

impl AudienceClass {
    /// Short label shown in reports.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::SingleTenant => "single-tenant",
            Self::Multitenant => "multitenant",
            Self::MultitenantAndPersonal => "multitenant+personal",
            Self::PersonalOnly => "personal-only",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for AudienceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
