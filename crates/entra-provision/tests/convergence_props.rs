//! Property tests for convergence idempotence.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::BTreeSet;

use entra_provision::{RedirectPolicy, apply, plan};
use entra_testing::{InMemoryDirectory, Operation, fixtures};
use entra_types::{DesiredRegistration, SignInAudience};
use proptest::prelude::*;

fn arb_audience() -> impl Strategy<Value = SignInAudience> {
    prop_oneof![
        Just(SignInAudience::AzureAdMyOrg),
        Just(SignInAudience::AzureAdMultipleOrgs),
        Just(SignInAudience::AzureAdAndPersonalMicrosoftAccount),
        Just(SignInAudience::PersonalMicrosoftAccount),
    ]
}

fn arb_policy() -> impl Strategy<Value = RedirectPolicy> {
    prop_oneof![
        Just(RedirectPolicy::Preserve),
        Just(RedirectPolicy::Merge),
        Just(RedirectPolicy::Replace),
    ]
}

fn arb_uris() -> impl Strategy<Value = BTreeSet<String>> {
    prop::collection::btree_set("https://[a-z]{1,8}\\.example\\.com/cb", 0..4)
}

proptest! {
    #[test]
    fn apply_then_plan_is_noop(
        existing in proptest::option::of((arb_audience(), arb_uris())),
        target in arb_audience(),
        policy in arb_policy(),
    ) {
        let desired = DesiredRegistration::new(
            fixtures::SCENARIO_APP_NAME,
            fixtures::SCENARIO_REDIRECT_URI,
        )
        .sign_in_audience(target);

        let mut builder = InMemoryDirectory::builder();
        let observed = existing.map(|(audience, uris)| {
            let mut registration = fixtures::registration(fixtures::SCENARIO_APP_NAME, audience);
            registration.redirect_uris = uris;
            registration
        });
        if let Some(registration) = &observed {
            builder = builder.with_registration(registration.clone());
        }
        let directory = builder.build();

        let first = plan(&desired, observed.as_ref(), policy);
        let converged = apply(&directory, &first, observed.as_ref()).unwrap();

        let reread = directory
            .registrations_named(fixtures::SCENARIO_APP_NAME)
            .pop()
            .unwrap();
        prop_assert_eq!(&reread, &converged);

        let second = plan(&desired, Some(&reread), policy);
        prop_assert!(second.is_noop(), "second plan: {:?}", second);
        prop_assert_eq!(directory.count(Operation::CreateRegistration), usize::from(observed.is_none()));
        prop_assert_eq!(directory.registrations_named(fixtures::SCENARIO_APP_NAME).len(), 1);
    }
}
