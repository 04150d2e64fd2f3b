//! Run-scoped session guard.

use std::thread;
use std::time::Instant;

use entra_directory::{Account, Directory};

use crate::error::Error;

/// An authenticated run against a directory.
///
/// Opening a session resolves the CLI account, which fails fast when the
/// caller is not signed in. Dropping it logs the end of the run on every
/// exit path, including early returns and panics.
pub struct Session<'d, D: Directory> {
    directory: &'d D,
    account: Account,
    operation: &'static str,
    started: Instant,
    succeeded: bool,
}

impl<'d, D: Directory> Session<'d, D> {
    /// Verify authentication and start a run named `operation`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Authentication`] if there is no usable CLI session,
    /// or any other error the account lookup produces.
    pub fn open(directory: &'d D, operation: &'static str) -> Result<Self, Error> {
        let started = Instant::now();
        let account = directory.current_account()?;
        tracing::info!(
            operation,
            tenant_id = %account.tenant_id,
            subscription_id = %account.subscription_id,
            user = account.user.as_deref().unwrap_or("unknown"),
            "session opened"
        );
        Ok(Self {
            directory,
            account,
            operation,
            started,
            succeeded: false,
        })
    }

    /// The signed-in account.
    pub fn account(&self) -> &Account {
        &self.account
    }

    /// The directory this session runs against.
    pub fn directory(&self) -> &'d D {
        self.directory
    }

    /// Mark the run as successful.
    pub fn succeed(&mut self) {
        self.succeeded = true;
    }
}

impl<D: Directory> Drop for Session<'_, D> {
    fn drop(&mut self) {
        let elapsed_ms = self.started.elapsed().as_millis() as u64;
        if thread::panicking() {
            tracing::error!(operation = self.operation, elapsed_ms, "run aborted by panic");
        } else if self.succeeded {
            tracing::info!(operation = self.operation, elapsed_ms, "run finished");
        } else {
            tracing::warn!(
                operation = self.operation,
                elapsed_ms,
                "run ended early; rerun to converge from partial state"
            );
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use entra_testing::InMemoryDirectory;

    #[test]
    fn test_open_requires_login() {
        let directory = InMemoryDirectory::builder().signed_out().build();
        let result = Session::open(&directory, "test");
        assert!(matches!(result, Err(Error::Authentication(_))));
    }

    #[test]
    fn test_open_resolves_account() {
        let directory = InMemoryDirectory::new();
        let mut session = Session::open(&directory, "test").unwrap();
        assert_eq!(
            session.account().subscription_id,
            entra_testing::fixtures::subscription_id()
        );
        session.succeed();
    }
}
