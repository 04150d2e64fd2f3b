//! Test fixture utilities.

use std::collections::BTreeSet;

use entra_directory::Account;
use entra_types::{
    AppId, DesiredRegistration, ObjectId, Registration, SignInAudience, SubscriptionId, TenantId,
};

/// Tenant of the fixture account.
pub const TENANT_ID: &str = "72f988bf-86f1-41af-91ab-2d7cd011db47";

/// Subscription of the fixture account.
pub const SUBSCRIPTION_ID: &str = "3f2a9c1e-5b7d-4e8f-a6c0-1d2e3f4a5b6c";

/// Display name used by the end-to-end scenario.
pub const SCENARIO_APP_NAME: &str = "MyAPIM-AuthApp";

/// Redirect URI used by the end-to-end scenario.
pub const SCENARIO_REDIRECT_URI: &str = "https://myapi.example.com/auth/callback";

/// Configuration file text for the end-to-end scenario.
pub const SCENARIO_CONFIG: &str = "\
# API Management authentication app
APP_NAME=MyAPIM-AuthApp
REDIRECT_URI=https://myapi.example.com/auth/callback
ROLE_NAME=Reader
";

/// The signed-in account every [`InMemoryDirectory`](crate::InMemoryDirectory)
/// starts with.
#[must_use]
pub fn account() -> Account {
    Account {
        tenant_id: tenant_id(),
        subscription_id: subscription_id(),
        user: Some("ops@contoso.example".to_string()),
    }
}

/// The fixture tenant id.
#[must_use]
pub fn tenant_id() -> TenantId {
    TenantId::from_uuid(parse_uuid(TENANT_ID))
}

/// The fixture subscription id.
#[must_use]
pub fn subscription_id() -> SubscriptionId {
    SubscriptionId::from_uuid(parse_uuid(SUBSCRIPTION_ID))
}

/// `/subscriptions/{SUBSCRIPTION_ID}`.
#[must_use]
pub fn subscription_scope() -> String {
    format!("/subscriptions/{SUBSCRIPTION_ID}")
}

/// The scenario's desired state: multitenant, `Reader`.
#[must_use]
pub fn scenario_desired() -> DesiredRegistration {
    DesiredRegistration::new(SCENARIO_APP_NAME, SCENARIO_REDIRECT_URI)
}

/// A registration with fresh ids, the given name and audience, and the
/// scenario redirect URI.
#[must_use]
pub fn registration(display_name: &str, audience: SignInAudience) -> Registration {
    Registration {
        app_id: AppId::from_uuid(uuid::Uuid::new_v4()),
        object_id: ObjectId::from_uuid(uuid::Uuid::new_v4()),
        display_name: display_name.to_string(),
        sign_in_audience: audience,
        redirect_uris: BTreeSet::from([SCENARIO_REDIRECT_URI.to_string()]),
    }
}

fn parse_uuid(literal: &str) -> uuid::Uuid {
    uuid::Uuid::try_parse(literal).unwrap_or_default()
}
