//! End-to-end provisioning runs against the in-memory directory.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::io;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use entra_directory::{Directory, DirectoryError, RetryPolicy, Retrying};
use entra_provision::{Action, Error, Outcome, Provisioner, RedirectPolicy, Settings, plan};
use entra_testing::{InMemoryDirectory, Operation, fixtures};
use entra_types::SignInAudience;

fn scenario_settings() -> Settings {
    Settings::parse(fixtures::SCENARIO_CONFIG).unwrap()
}

fn fast_retry(max: u32) -> RetryPolicy {
    RetryPolicy::new()
        .max_retries(max)
        .initial_backoff(Duration::ZERO)
}

/// Collects formatted log output.
#[derive(Clone, Default)]
struct CapturedLog(Arc<Mutex<Vec<u8>>>);

impl CapturedLog {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl io::Write for CapturedLog {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn with_captured_log<T>(f: impl FnOnce() -> T) -> (T, String) {
    let log = CapturedLog::default();
    let writer = log.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::TRACE)
        .finish();
    let result = tracing::subscriber::with_default(subscriber, f);
    (result, log.contents())
}

// ============================================================================
// Scenario
// ============================================================================

#[test]
fn test_scenario_creates_then_converges() {
    let directory = InMemoryDirectory::new();
    let provisioner = Provisioner::new(&directory);
    let settings = scenario_settings();

    let first = provisioner.provision(&settings).unwrap();
    assert!(matches!(first.plan.action, Action::CreateNew(_)));
    assert_eq!(first.service_principal_outcome, Outcome::Created);
    assert_eq!(first.role_assignment_outcome, Outcome::Created);
    assert_eq!(first.role_assignment.role_name, "Reader");
    assert_eq!(first.role_assignment.scope, fixtures::subscription_scope());
    assert_eq!(
        first.registration.sign_in_audience,
        SignInAudience::AzureAdMultipleOrgs
    );
    assert!(
        first
            .registration
            .has_redirect_uri(fixtures::SCENARIO_REDIRECT_URI)
    );

    let second = provisioner.provision(&settings).unwrap();
    assert!(second.plan.is_noop());
    assert_eq!(second.registration.app_id, first.registration.app_id);
    assert_eq!(second.service_principal_outcome, Outcome::Existing);
    assert_eq!(second.role_assignment_outcome, Outcome::Existing);

    assert_eq!(
        directory
            .registrations_named(fixtures::SCENARIO_APP_NAME)
            .len(),
        1
    );
    assert_eq!(directory.count(Operation::CreateRegistration), 1);
    assert_eq!(directory.count(Operation::CreateServicePrincipal), 1);
    assert_eq!(directory.count(Operation::CreateRoleAssignment), 1);
    assert_eq!(directory.role_assignments().len(), 1);
}

#[test]
fn test_rerun_without_secret_makes_no_changes() {
    let directory = InMemoryDirectory::new();
    let provisioner = Provisioner::new(&directory);
    let settings = scenario_settings().mint_secret(false);

    provisioner.provision(&settings).unwrap();
    directory.clear_calls();

    let summary = provisioner.provision(&settings).unwrap();
    assert!(summary.secret.is_none());
    assert_eq!(directory.mutation_count(), 0);
}

#[test]
fn test_audience_drift_is_corrected_once() {
    let existing = fixtures::registration(fixtures::SCENARIO_APP_NAME, SignInAudience::AzureAdMyOrg);
    let directory = InMemoryDirectory::builder()
        .with_registration(existing.clone())
        .build();
    let provisioner = Provisioner::new(&directory);
    let settings = scenario_settings().mint_secret(false);

    let first = provisioner.provision(&settings).unwrap();
    assert_eq!(
        first.plan.action,
        Action::UpdateAudience(existing.object_id.clone(), SignInAudience::AzureAdMultipleOrgs)
    );
    assert_eq!(first.registration.app_id, existing.app_id);

    let second = provisioner.provision(&settings).unwrap();
    assert_eq!(second.plan.action, Action::NoOp);
    assert_eq!(directory.count(Operation::UpdateAudience), 1);
    assert_eq!(directory.count(Operation::CreateRegistration), 0);
}

#[test]
fn test_plan_against_observed_state() {
    let desired = fixtures::scenario_desired();
    assert_eq!(
        plan(&desired, None, RedirectPolicy::Preserve).action,
        Action::CreateNew(desired.clone())
    );

    let directory = InMemoryDirectory::new();
    let created = directory.create_registration(&desired).unwrap();
    assert!(plan(&desired, Some(&created), RedirectPolicy::Preserve).is_noop());
}

#[test]
fn test_preview_makes_no_changes() {
    let directory = InMemoryDirectory::new();
    let preview = Provisioner::new(&directory)
        .preview(&scenario_settings())
        .unwrap();

    assert!(preview.observed.is_none());
    assert!(matches!(preview.plan.action, Action::CreateNew(_)));
    assert_eq!(preview.scope, fixtures::subscription_scope());
    assert_eq!(directory.mutation_count(), 0);
}

#[test]
fn test_merge_policy_adds_redirect_uri() {
    let mut existing =
        fixtures::registration(fixtures::SCENARIO_APP_NAME, SignInAudience::AzureAdMultipleOrgs);
    existing.redirect_uris = ["https://legacy.example.com/cb".to_string()].into();
    let directory = InMemoryDirectory::builder()
        .with_registration(existing)
        .build();
    let settings = scenario_settings()
        .mint_secret(false)
        .redirect_policy(RedirectPolicy::Merge);

    let summary = Provisioner::new(&directory).provision(&settings).unwrap();
    assert_eq!(summary.registration.redirect_uris.len(), 2);

    let stored = &directory.registrations_named(fixtures::SCENARIO_APP_NAME)[0];
    assert!(stored.has_redirect_uri("https://legacy.example.com/cb"));
    assert!(stored.has_redirect_uri(fixtures::SCENARIO_REDIRECT_URI));
}

#[test]
fn test_preserve_policy_leaves_redirect_uris() {
    let mut existing =
        fixtures::registration(fixtures::SCENARIO_APP_NAME, SignInAudience::AzureAdMultipleOrgs);
    existing.redirect_uris = ["https://legacy.example.com/cb".to_string()].into();
    let directory = InMemoryDirectory::builder()
        .with_registration(existing)
        .build();

    Provisioner::new(&directory)
        .provision(&scenario_settings().mint_secret(false))
        .unwrap();
    assert_eq!(directory.count(Operation::SetRedirectUris), 0);
}

#[test]
fn test_duplicate_display_names_abort() {
    let directory = InMemoryDirectory::builder()
        .with_registration(fixtures::registration(
            fixtures::SCENARIO_APP_NAME,
            SignInAudience::AzureAdMultipleOrgs,
        ))
        .with_registration(fixtures::registration(
            fixtures::SCENARIO_APP_NAME,
            SignInAudience::AzureAdMyOrg,
        ))
        .build();

    let err = Provisioner::new(&directory)
        .provision(&scenario_settings())
        .unwrap_err();
    assert!(matches!(err, Error::Conflict(_)));
    assert_eq!(directory.mutation_count(), 0);
}

// ============================================================================
// Role Assignments
// ============================================================================

#[test]
fn test_identical_role_assignment_twice() {
    let directory = InMemoryDirectory::new();
    let provisioner = Provisioner::new(&directory);
    let principal = entra_types::ObjectId::parse("99999999-8888-7777-6666-555555555555").unwrap();
    let scope = fixtures::subscription_scope();

    let (first, outcome) = provisioner.assign_role(&principal, "Reader", &scope).unwrap();
    assert_eq!(outcome, Outcome::Created);
    let (second, outcome) = provisioner
        .assign_role(&principal, "reader", &scope.to_uppercase())
        .unwrap();
    assert_eq!(outcome, Outcome::Existing);
    assert_eq!(first.id, second.id);
    assert_eq!(directory.role_assignments().len(), 1);
}

// ============================================================================
// Secrets
// ============================================================================

#[test]
fn test_secrets_are_distinct_and_never_logged() {
    let directory = InMemoryDirectory::new();
    let provisioner = Provisioner::new(&directory);
    let settings = scenario_settings();

    let ((summary, extra), log) = with_captured_log(|| {
        let summary = provisioner.provision(&settings).unwrap();
        let extra = provisioner
            .create_secret(&summary.registration.app_id, "second", 1)
            .unwrap();
        (summary, extra)
    });

    let first = summary.secret.as_ref().unwrap();
    assert_ne!(first.expose(), extra.expose());
    assert_eq!(directory.secret_count(&summary.registration.app_id), 2);
    assert_eq!(
        directory.secret_names(&summary.registration.app_id),
        ["MyAPIM-AuthApp-secret", "second"]
    );

    assert!(log.contains("created client secret"), "{log}");
    assert!(!log.contains(first.expose()));
    assert!(!log.contains(extra.expose()));
    assert!(!format!("{summary}").contains(first.expose()));
    assert!(!format!("{summary:?}").contains(first.expose()));
}

// ============================================================================
// Failures
// ============================================================================

#[test]
fn test_signed_out_run_fails_before_any_lookup() {
    let directory = InMemoryDirectory::builder().signed_out().build();
    let err = Provisioner::new(&directory)
        .provision(&scenario_settings())
        .unwrap_err();

    assert!(matches!(err, Error::Authentication(_)));
    assert!(err.to_string().contains("az login"));
    assert_eq!(directory.calls(), [Operation::CurrentAccount]);
}

#[test]
fn test_permission_error_is_fatal_and_verbatim() {
    let directory = InMemoryDirectory::new();
    directory.fail_next(
        Operation::CreateRegistration,
        DirectoryError::PermissionDenied(
            "Insufficient privileges to complete the operation.".into(),
        ),
    );
    let retrying = Retrying::new(&directory, fast_retry(3));

    let err = Provisioner::new(&retrying)
        .provision(&scenario_settings())
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "permission denied: Insufficient privileges to complete the operation."
    );
    assert_eq!(directory.count(Operation::CreateRegistration), 1);
}

#[test]
fn test_transient_errors_are_retried() {
    let directory = InMemoryDirectory::new();
    directory.fail_next(
        Operation::FindRegistration,
        DirectoryError::Transient("(TooManyRequests)".into()),
    );
    let retrying = Retrying::new(&directory, fast_retry(3));

    let summary = Provisioner::new(&retrying)
        .provision(&scenario_settings())
        .unwrap();
    assert!(matches!(summary.plan.action, Action::CreateNew(_)));
    assert_eq!(directory.count(Operation::FindRegistration), 2);
}

#[test]
fn test_transient_errors_surface_after_bound() {
    let directory = InMemoryDirectory::new();
    for _ in 0..3 {
        directory.fail_next(
            Operation::FindRegistration,
            DirectoryError::Transient("Service Unavailable".into()),
        );
    }
    let retrying = Retrying::new(&directory, fast_retry(2));

    let err = Provisioner::new(&retrying)
        .provision(&scenario_settings())
        .unwrap_err();
    assert!(matches!(err, Error::TransientProvider(_)));
    assert!(err.is_transient());
    assert_eq!(directory.count(Operation::FindRegistration), 3);
    assert_eq!(directory.mutation_count(), 0);
}

#[test]
fn test_lost_create_response_does_not_duplicate() {
    let directory = InMemoryDirectory::new();
    directory.fail_next_after_effect(
        Operation::CreateRegistration,
        DirectoryError::Transient("Read timed out.".into()),
    );
    let retrying = Retrying::new(&directory, fast_retry(3));

    Provisioner::new(&retrying)
        .provision(&scenario_settings())
        .unwrap();
    assert_eq!(
        directory
            .registrations_named(fixtures::SCENARIO_APP_NAME)
            .len(),
        1
    );
}

#[test]
fn test_rerun_converges_from_partial_state() {
    let directory = InMemoryDirectory::new();
    directory.fail_next(
        Operation::CreateRoleAssignment,
        DirectoryError::PermissionDenied("AuthorizationFailed".into()),
    );
    let provisioner = Provisioner::new(&directory);
    let settings = scenario_settings().mint_secret(false);

    assert!(matches!(
        provisioner.provision(&settings),
        Err(Error::Permission(_))
    ));
    assert_eq!(
        directory
            .registrations_named(fixtures::SCENARIO_APP_NAME)
            .len(),
        1
    );
    assert!(directory.role_assignments().is_empty());

    let summary = provisioner.provision(&settings).unwrap();
    assert!(summary.plan.is_noop());
    assert_eq!(summary.service_principal_outcome, Outcome::Existing);
    assert_eq!(summary.role_assignment_outcome, Outcome::Created);
    assert_eq!(directory.count(Operation::CreateRegistration), 1);
}
