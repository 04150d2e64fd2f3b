//! Bounded retries for transient directory failures.

use std::collections::BTreeSet;
use std::thread;
use std::time::Duration;

use entra_types::{
    AppId, ClientSecret, DesiredRegistration, ObjectId, Registration, RoleAssignment,
    ServicePrincipal, SignInAudience,
};

use crate::directory::{Account, Directory};
use crate::error::DirectoryError;

/// How the delay grows between attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BackoffStrategy {
    /// Same delay before every retry.
    Fixed,
    /// `initial_backoff * attempt`.
    Linear,
    /// `initial_backoff * multiplier^(attempt - 1)`.
    Exponential {
        /// Growth factor per attempt.
        multiplier: f64,
    },
}

/// Retry policy for transient failures.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of retry attempts (default: 3).
    pub max_retries: u32,
    /// Delay before the first retry (default: 5s).
    pub initial_backoff: Duration,
    /// Upper bound on any single delay (default: 60s).
    pub max_backoff: Duration,
    /// Delay growth (default: fixed).
    pub strategy: BackoffStrategy,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_secs(5),
            max_backoff: Duration::from_secs(60),
            strategy: BackoffStrategy::Fixed,
        }
    }
}

impl RetryPolicy {
    /// Create a new retry policy with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of retry attempts.
    #[must_use]
    pub fn max_retries(mut self, max: u32) -> Self {
        self.max_retries = max;
        self
    }

    /// Set the initial backoff duration.
    #[must_use]
    pub fn initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }

    /// Set the maximum backoff duration.
    #[must_use]
    pub fn max_backoff(mut self, backoff: Duration) -> Self {
        self.max_backoff = backoff;
        self
    }

    /// Set the backoff strategy.
    #[must_use]
    pub fn strategy(mut self, strategy: BackoffStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Disable automatic retries.
    #[must_use]
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    /// Calculate the backoff duration for a given retry attempt (1-based).
    #[must_use]
    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let initial = self.initial_backoff.as_millis() as f64;
        let base = match self.strategy {
            BackoffStrategy::Fixed => initial,
            BackoffStrategy::Linear => initial * f64::from(attempt),
            BackoffStrategy::Exponential { multiplier } => {
                initial * multiplier.powi(attempt.saturating_sub(1).min(30) as i32)
            }
        };
        let capped = base.min(self.max_backoff.as_millis() as f64).max(0.0);

        Duration::from_millis(capped as u64)
    }

    /// Check if more retries are allowed after `attempt` failed attempts.
    #[must_use]
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_retries
    }
}

/// A [`Directory`] that retries transient failures of the wrapped one.
///
/// Non-transient errors are returned immediately. When the retry budget is
/// exhausted the last transient error is returned.
#[derive(Debug)]
pub struct Retrying<D> {
    inner: D,
    policy: RetryPolicy,
}

impl<D: Directory> Retrying<D> {
    /// Wrap `inner` with `policy`.
    pub fn new(inner: D, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    /// The active policy.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Borrow the wrapped directory.
    pub fn inner(&self) -> &D {
        &self.inner
    }

    fn run<T>(
        &self,
        operation: &'static str,
        mut call: impl FnMut(&D) -> Result<T, DirectoryError>,
    ) -> Result<T, DirectoryError> {
        let mut attempt = 0;
        loop {
            match call(&self.inner) {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && self.policy.should_retry(attempt) => {
                    attempt += 1;
                    let delay = self.policy.backoff_for_attempt(attempt);
                    tracing::warn!(
                        operation,
                        attempt,
                        max_retries = self.policy.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient directory failure; retrying"
                    );
                    if !delay.is_zero() {
                        thread::sleep(delay);
                    }
                }
                Err(err) => {
                    if err.is_transient() {
                        tracing::warn!(operation, attempts = attempt + 1, error = %err, "retries exhausted");
                    }
                    return Err(err);
                }
            }
        }
    }
}

impl<D: Directory> Directory for Retrying<D> {
    fn current_account(&self) -> Result<Account, DirectoryError> {
        self.run("current_account", |d| d.current_account())
    }

    fn find_registration(&self, display_name: &str) -> Result<Option<Registration>, DirectoryError> {
        self.run("find_registration", |d| d.find_registration(display_name))
    }

    fn get_registration(&self, app_id: &AppId) -> Result<Option<Registration>, DirectoryError> {
        self.run("get_registration", |d| d.get_registration(app_id))
    }

    /// A create that failed transiently may still have landed. Before each
    /// retry the display name is probed again so a retry never produces a
    /// second registration.
    fn create_registration(
        &self,
        desired: &DesiredRegistration,
    ) -> Result<Registration, DirectoryError> {
        let mut first = true;
        self.run("create_registration", |d| {
            if !first {
                if let Some(existing) = d.find_registration(&desired.display_name)? {
                    tracing::info!(
                        app_id = %existing.app_id,
                        "registration appeared after a failed create; using it"
                    );
                    return Ok(existing);
                }
            }
            first = false;
            d.create_registration(desired)
        })
    }

    fn update_audience(
        &self,
        object_id: &ObjectId,
        audience: &SignInAudience,
    ) -> Result<(), DirectoryError> {
        self.run("update_audience", |d| d.update_audience(object_id, audience))
    }

    fn set_redirect_uris(
        &self,
        object_id: &ObjectId,
        uris: &BTreeSet<String>,
    ) -> Result<(), DirectoryError> {
        self.run("set_redirect_uris", |d| d.set_redirect_uris(object_id, uris))
    }

    fn find_service_principal(
        &self,
        app_id: &AppId,
    ) -> Result<Option<ServicePrincipal>, DirectoryError> {
        self.run("find_service_principal", |d| d.find_service_principal(app_id))
    }

    fn create_service_principal(&self, app_id: &AppId) -> Result<ServicePrincipal, DirectoryError> {
        self.run("create_service_principal", |d| d.create_service_principal(app_id))
    }

    fn find_role_assignments(
        &self,
        principal_id: &ObjectId,
        role: &str,
        scope: &str,
    ) -> Result<Vec<RoleAssignment>, DirectoryError> {
        self.run("find_role_assignments", |d| {
            d.find_role_assignments(principal_id, role, scope)
        })
    }

    fn create_role_assignment(
        &self,
        principal_id: &ObjectId,
        role: &str,
        scope: &str,
    ) -> Result<RoleAssignment, DirectoryError> {
        self.run("create_role_assignment", |d| {
            d.create_role_assignment(principal_id, role, scope)
        })
    }

    fn add_client_secret(
        &self,
        app_id: &AppId,
        display_name: &str,
        years: u8,
    ) -> Result<ClientSecret, DirectoryError> {
        self.run("add_client_secret", |d| {
            d.add_client_secret(app_id, display_name, years)
        })
    }
}
