//! Settings file parsing tests.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use entra_provision::{ConfigError, RedirectPolicy, Settings};
use entra_types::SignInAudience;

const MINIMAL: &str = "APP_NAME=MyAPIM-AuthApp\nREDIRECT_URI=https://myapi.example.com/auth/callback\n";

// ============================================================================
// Required Keys
// ============================================================================

#[test]
fn test_minimal_settings_use_defaults() {
    let settings = Settings::parse(MINIMAL).unwrap();
    assert_eq!(settings.app_name, "MyAPIM-AuthApp");
    assert_eq!(settings.role_name, "Reader");
    assert_eq!(settings.sign_in_audience, SignInAudience::AzureAdMultipleOrgs);
    assert_eq!(settings.redirect_policy, RedirectPolicy::Preserve);
    assert_eq!(settings.secret_years, 1);
    assert_eq!(settings.secret_name(), "MyAPIM-AuthApp-secret");
    assert_eq!(settings.log_file, PathBuf::from("app_registration.log"));
    assert_eq!(settings.retry.max_retries, 3);
    assert_eq!(settings.retry.initial_backoff, Duration::from_secs(5));
    assert!(settings.mint_secret);
    assert!(settings.tenant_id.is_none());
}

#[test]
fn test_missing_app_name() {
    let err = Settings::parse("REDIRECT_URI=https://myapi.example.com/auth/callback").unwrap_err();
    assert!(matches!(err, ConfigError::MissingVariable { ref key } if key == "APP_NAME"));
}

#[test]
fn test_empty_app_name_counts_as_missing() {
    let err = Settings::parse("APP_NAME=   \nREDIRECT_URI=https://a.example.com/cb").unwrap_err();
    assert_eq!(err.key(), Some("APP_NAME"));
}

#[test]
fn test_missing_redirect_uri() {
    let err = Settings::parse("APP_NAME=demo").unwrap_err();
    assert!(matches!(err, ConfigError::MissingVariable { ref key } if key == "REDIRECT_URI"));
}

#[test]
fn test_app_name_too_long() {
    let text = format!(
        "APP_NAME={}\nREDIRECT_URI=https://a.example.com/cb",
        "x".repeat(121)
    );
    let err = Settings::parse(&text).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidFormat { ref key, .. } if key == "APP_NAME"));
}

// ============================================================================
// Redirect URI Validation
// ============================================================================

#[test]
fn test_http_redirect_outside_localhost_rejected() {
    let err = Settings::parse("APP_NAME=demo\nREDIRECT_URI=http://myapi.example.com/cb").unwrap_err();
    assert!(matches!(err, ConfigError::InvalidFormat { ref key, .. } if key == "REDIRECT_URI"));
}

#[test]
fn test_http_localhost_redirect_accepted() {
    let settings =
        Settings::parse("APP_NAME=demo\nREDIRECT_URI=http://localhost:5000/signin-oidc").unwrap();
    assert_eq!(settings.redirect_uri, "http://localhost:5000/signin-oidc");
}

// ============================================================================
// Syntax
// ============================================================================

#[test]
fn test_shell_syntax() {
    let text = r#"
# comment line
export APP_NAME="MyAPIM-AuthApp"
REDIRECT_URI='https://myapi.example.com/auth/callback'
ROLE_NAME=Contributor   # inline comment
    UNRELATED_SCRIPT_VAR=whatever
"#;
    let settings = Settings::parse(text).unwrap();
    assert_eq!(settings.app_name, "MyAPIM-AuthApp");
    assert_eq!(settings.redirect_uri, "https://myapi.example.com/auth/callback");
    assert_eq!(settings.role_name, "Contributor");

    let text = "APP_NAME=\"MyApp\" # prod\nREDIRECT_URI=\"https://myapi.example.com/cb\" # prod\n";
    let settings = Settings::parse(text).unwrap();
    assert_eq!(settings.app_name, "MyApp");
    assert_eq!(settings.redirect_uri, "https://myapi.example.com/cb");
}

#[test]
fn test_line_without_equals() {
    let err = Settings::parse("APP_NAME=demo\nthis is not valid\n").unwrap_err();
    assert!(matches!(err, ConfigError::Syntax { line: 2 }));
}

#[test]
fn test_value_split_on_first_equals() {
    let text = "APP_NAME=demo\nREDIRECT_URI=https://a.example.com/cb?x=1&y=2";
    let settings = Settings::parse(text).unwrap();
    assert_eq!(settings.redirect_uri, "https://a.example.com/cb?x=1&y=2");
}

#[test]
fn test_later_duplicates_win() {
    let text = format!("{MINIMAL}ROLE_NAME=Reader\nROLE_NAME=Owner\n");
    assert_eq!(Settings::parse(&text).unwrap().role_name, "Owner");
}

// ============================================================================
// Optional Keys
// ============================================================================

#[test]
fn test_optional_keys() {
    let text = format!(
        "{MINIMAL}\
AZURE_TENANT_ID=72F988BF-86F1-41AF-91AB-2D7CD011DB47
AZURE_SUBSCRIPTION_ID=3f2a9c1e-5b7d-4e8f-a6c0-1d2e3f4a5b6c
SIGN_IN_AUDIENCE=multitenant+personal
REDIRECT_URI_POLICY=merge
SECRET_DISPLAY_NAME=apim-gateway
SECRET_YEARS=2
LOG_FILE=/var/log/appreg.log
MAX_RETRIES=0
RETRY_DELAY_SECS=1
"
    );
    let settings = Settings::parse(&text).unwrap();
    assert_eq!(
        settings.tenant_id.as_ref().unwrap().as_str(),
        "72f988bf-86f1-41af-91ab-2d7cd011db47"
    );
    assert_eq!(
        settings.sign_in_audience,
        SignInAudience::AzureAdAndPersonalMicrosoftAccount
    );
    assert_eq!(settings.redirect_policy, RedirectPolicy::Merge);
    assert_eq!(settings.secret_name(), "apim-gateway");
    assert_eq!(settings.secret_years, 2);
    assert_eq!(settings.retry.max_retries, 0);
    assert_eq!(
        settings.scope_for(settings.subscription_id.as_ref().unwrap()),
        "/subscriptions/3f2a9c1e-5b7d-4e8f-a6c0-1d2e3f4a5b6c"
    );
}

#[test]
fn test_invalid_optional_values_name_their_key() {
    for (line, key) in [
        ("AZURE_TENANT_ID=not-a-guid", "AZURE_TENANT_ID"),
        ("AZURE_SUBSCRIPTION_ID=123", "AZURE_SUBSCRIPTION_ID"),
        ("SIGN_IN_AUDIENCE=everyone", "SIGN_IN_AUDIENCE"),
        ("ROLE_SCOPE=/resourceGroups/rg", "ROLE_SCOPE"),
        ("REDIRECT_URI_POLICY=keep", "REDIRECT_URI_POLICY"),
        ("SECRET_YEARS=5", "SECRET_YEARS"),
        ("MAX_RETRIES=eleven", "MAX_RETRIES"),
        ("RETRY_DELAY_SECS=301", "RETRY_DELAY_SECS"),
    ] {
        let err = Settings::parse(&format!("{MINIMAL}{line}\n")).unwrap_err();
        assert_eq!(err.key(), Some(key), "{line}");
    }
}

#[test]
fn test_role_scope_overrides_subscription() {
    let text = format!("{MINIMAL}ROLE_SCOPE=/subscriptions/abc/resourceGroups/rg-api/\n");
    let settings = Settings::parse(&text).unwrap();
    let subscription =
        entra_types::SubscriptionId::parse("3f2a9c1e-5b7d-4e8f-a6c0-1d2e3f4a5b6c").unwrap();
    assert_eq!(
        settings.scope_for(&subscription),
        "/subscriptions/abc/resourceGroups/rg-api"
    );
}

#[test]
fn test_from_pairs() {
    let settings = Settings::from_pairs([
        ("app_name", "lowercase-keys"),
        ("REDIRECT_URI", "https://a.example.com/cb"),
    ])
    .unwrap();
    assert_eq!(settings.app_name, "lowercase-keys");
}

// ============================================================================
// Files
// ============================================================================

#[test]
fn test_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(MINIMAL.as_bytes()).unwrap();

    let settings = Settings::from_file(file.path()).unwrap();
    assert_eq!(settings.app_name, "MyAPIM-AuthApp");
}

#[test]
fn test_from_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = Settings::from_file(dir.path().join("absent.env")).unwrap_err();
    assert!(matches!(err, ConfigError::Io { .. }));
    assert!(err.to_string().contains("absent.env"));
}
