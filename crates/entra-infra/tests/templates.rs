//! Properties of the declared deployment.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use entra_infra::{Deployment, InfraError, InfraParams, ResourceKind, ResourceNames};
use proptest::prelude::*;

const SCOPE: &str = "/subscriptions/3f2a9c1e-5b7d-4e8f-a6c0-1d2e3f4a5b6c";
const PRINCIPAL: &str = "0a1b2c3d-4e5f-6071-8293-a4b5c6d7e8f9";

fn arb_environment() -> impl Strategy<Value = String> {
    "[a-z0-9][a-z0-9-]{0,15}"
}

fn arb_location() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("eastus2".to_string()),
        Just("westeurope".to_string()),
        Just("australiaeast".to_string()),
    ]
}

// ============================================================================
// Naming
// ============================================================================

proptest! {
    #[test]
    fn names_are_deterministic(env in arb_environment(), location in arb_location()) {
        let params = InfraParams::new(env, location, SCOPE);
        prop_assert_eq!(ResourceNames::derive(&params), ResourceNames::derive(&params));

        let first = Deployment::declare(&params).unwrap().to_arm_template();
        let second = Deployment::declare(&params).unwrap().to_arm_template();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn names_differ_across_environments(
        a in arb_environment(),
        b in arb_environment(),
        location in arb_location(),
    ) {
        prop_assume!(a != b);
        let left = ResourceNames::derive(&InfraParams::new(a, location.clone(), SCOPE));
        let right = ResourceNames::derive(&InfraParams::new(b, location, SCOPE));
        prop_assert_ne!(left.token, right.token);
        prop_assert_ne!(left.registry, right.registry);
    }

    #[test]
    fn principal_assignment_iff_principal_given(
        env in arb_environment(),
        with_principal in any::<bool>(),
    ) {
        let mut params = InfraParams::new(env, "eastus2", SCOPE);
        if with_principal {
            params = params.principal_id(PRINCIPAL);
        }
        let deployment = Deployment::declare(&params).unwrap();
        prop_assert_eq!(
            deployment.resource(ResourceKind::PrincipalAcrPull).is_some(),
            with_principal
        );
        prop_assert_eq!(deployment.role_assignments().count(), 1 + usize::from(with_principal));
    }
}

// ============================================================================
// Rendered template
// ============================================================================

#[test]
fn test_template_shape() {
    let params = InfraParams::new("dev", "eastus2", SCOPE).tag("owner", "platform");
    let deployment = Deployment::declare(&params).unwrap();
    let template = deployment.to_arm_template();

    assert!(
        template["$schema"]
            .as_str()
            .unwrap()
            .contains("deploymentTemplate.json")
    );
    assert_eq!(template["contentVersion"], "1.0.0.0");

    let resources = template["resources"].as_array().unwrap();
    assert_eq!(resources.len(), 6);
    for resource in resources {
        if resource["type"] == "Microsoft.Authorization/roleAssignments" {
            continue;
        }
        assert_eq!(resource["tags"]["azd-env-name"], "dev");
        assert_eq!(resource["tags"]["owner"], "platform");
    }

    let outputs = &template["outputs"];
    let registry = &deployment.names.registry;
    assert_eq!(
        outputs["AZURE_CONTAINER_REGISTRY_ENDPOINT"]["value"],
        format!("{registry}.azurecr.io")
    );
    assert_eq!(
        outputs["API_MANAGEMENT_GATEWAY_URL"]["value"],
        format!("https://{}.azure-api.net", deployment.names.api_management)
    );
    assert!(
        outputs["AZURE_MANAGED_IDENTITY_CLIENT_ID"]["value"]
            .as_str()
            .unwrap()
            .starts_with("[reference(")
    );
}

#[test]
fn test_principal_assignment_uses_given_id() {
    let params = InfraParams::new("dev", "eastus2", SCOPE).principal_id(PRINCIPAL);
    let deployment = Deployment::declare(&params).unwrap();
    let assignment = deployment
        .resource(ResourceKind::PrincipalAcrPull)
        .unwrap()
        .to_arm();
    assert_eq!(assignment["properties"]["principalId"], PRINCIPAL);
    assert_eq!(assignment["properties"]["principalType"], "User");
}

#[test]
fn test_pretty_json_parses_back() {
    let deployment = Deployment::declare(&InfraParams::new("dev", "eastus2", SCOPE)).unwrap();
    let text = deployment.to_json_pretty().unwrap();
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(value, deployment.to_arm_template());
}

// ============================================================================
// Validation
// ============================================================================

#[test]
fn test_declare_rejects_bad_parameters() {
    let cases = [
        InfraParams::new("", "eastus2", SCOPE),
        InfraParams::new("Dev_Env", "eastus2", SCOPE),
        InfraParams::new("dev", "", SCOPE),
        InfraParams::new("dev", "eastus2", SCOPE).principal_id("not-a-guid"),
    ];
    for params in cases {
        assert!(matches!(
            Deployment::declare(&params),
            Err(InfraError::InvalidParameter { .. })
        ));
    }
}
