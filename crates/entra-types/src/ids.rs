//! GUID-backed identifiers.
//!
//! The identity provider hands out every identifier as a GUID string. Each
//! kind of identifier gets its own newtype so an application id can never be
//! passed where a principal object id is expected.

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TypeError;

#[allow(clippy::expect_used)]
static CANONICAL_GUID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
        .expect("canonical GUID pattern is valid")
});

/// Check whether `value` is a GUID in canonical hyphenated form.
///
/// Braced (`{...}`), URN and un-hyphenated spellings are rejected even though
/// they denote the same UUID; command-line input has to match the format the
/// portal and the CLI print.
#[must_use]
pub fn is_canonical_guid(value: &str) -> bool {
    CANONICAL_GUID.is_match(value)
}

macro_rules! guid_id {
    ($(#[$meta:meta])* $name:ident, $kind:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Parse an identifier, normalizing it to lowercase.
            ///
            /// # Errors
            ///
            /// Returns [`TypeError::InvalidId`] if `value` is not a canonical GUID.
            pub fn parse(value: &str) -> Result<Self, TypeError> {
                let trimmed = value.trim();
                if is_canonical_guid(trimmed) {
                    Ok(Self(trimmed.to_ascii_lowercase()))
                } else {
                    Err(TypeError::InvalidId {
                        kind: $kind,
                        value: value.to_string(),
                    })
                }
            }

            /// Build an identifier from a UUID value.
            #[must_use]
            pub fn from_uuid(uuid: Uuid) -> Self {
                Self(uuid.hyphenated().to_string())
            }

            /// Borrow the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = TypeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Self::parse(s)
            }
        }

        impl TryFrom<String> for $name {
            type Error = TypeError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::parse(&value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

guid_id!(
    /// Application (client) id of an app registration.
    AppId,
    "application id"
);

guid_id!(
    /// Directory object id (registration object or service principal).
    ObjectId,
    "object id"
);

guid_id!(
    /// Directory tenant id.
    TenantId,
    "tenant id"
);

guid_id!(
    /// Azure subscription id.
    SubscriptionId,
    "subscription id"
);
