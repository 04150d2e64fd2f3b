//! Resource declarations and ARM template rendering.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Value, json};
use uuid::Uuid;

use crate::error::InfraError;
use crate::naming::ResourceNames;
use crate::params::InfraParams;

/// Built-in `AcrPull` role definition id.
pub const ACR_PULL_ROLE_ID: &str = "7f951dda-4ed3-4680-a7ca-43fe172d538d";

const SCHEMA: &str =
    "https://schema.management.azure.com/schemas/2019-04-01/deploymentTemplate.json#";
const ENV_TAG: &str = "azd-env-name";

const IDENTITY_TYPE: &str = "Microsoft.ManagedIdentity/userAssignedIdentities";
const IDENTITY_API: &str = "2023-01-31";
const WORKSPACE_TYPE: &str = "Microsoft.OperationalInsights/workspaces";
const WORKSPACE_API: &str = "2022-10-01";
const REGISTRY_TYPE: &str = "Microsoft.ContainerRegistry/registries";
const REGISTRY_API: &str = "2023-07-01";
const ENVIRONMENT_TYPE: &str = "Microsoft.App/managedEnvironments";
const ENVIRONMENT_API: &str = "2024-03-01";
const APIM_TYPE: &str = "Microsoft.ApiManagement/service";
const APIM_API: &str = "2023-05-01-preview";
const ROLE_ASSIGNMENT_TYPE: &str = "Microsoft.Authorization/roleAssignments";
const ROLE_ASSIGNMENT_API: &str = "2022-04-01";

/// What a declared resource is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// User-assigned managed identity.
    ManagedIdentity,
    /// Log Analytics workspace.
    LogAnalytics,
    /// Container registry.
    ContainerRegistry,
    /// Container Apps environment.
    ContainerAppsEnvironment,
    /// API Management service.
    ApiManagement,
    /// `AcrPull` for the managed identity.
    IdentityAcrPull,
    /// `AcrPull` for the deploying principal.
    PrincipalAcrPull,
}

/// One declared resource.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    /// What it is.
    pub kind: ResourceKind,
    /// ARM resource type.
    pub resource_type: &'static str,
    /// ARM API version.
    pub api_version: &'static str,
    /// Resource name.
    pub name: String,
    /// Tags; empty for extension resources, which cannot carry tags.
    pub tags: BTreeMap<String, String>,
    /// ARM `resourceId(...)` expressions of resources that must exist first.
    pub depends_on: Vec<String>,
    /// Remaining top-level ARM properties (`properties`, `sku`, `identity`,
    /// `scope`, `location`).
    pub body: serde_json::Map<String, Value>,
}

impl Resource {
    fn new(
        kind: ResourceKind,
        resource_type: &'static str,
        api_version: &'static str,
        name: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            resource_type,
            api_version,
            name: name.into(),
            tags: BTreeMap::new(),
            depends_on: Vec::new(),
            body: serde_json::Map::new(),
        }
    }

    fn with(mut self, key: &str, value: Value) -> Self {
        self.body.insert(key.to_string(), value);
        self
    }

    fn depends_on(mut self, expression: String) -> Self {
        self.depends_on.push(expression);
        self
    }

    fn tagged(mut self, tags: &BTreeMap<String, String>) -> Self {
        self.tags = tags.clone();
        self
    }

    /// The resource as an ARM template `resources` entry.
    #[must_use]
    pub fn to_arm(&self) -> Value {
        let mut object = serde_json::Map::new();
        object.insert("type".into(), json!(self.resource_type));
        object.insert("apiVersion".into(), json!(self.api_version));
        object.insert("name".into(), json!(self.name));
        object.extend(self.body.clone());
        if !self.tags.is_empty() {
            object.insert("tags".into(), json!(self.tags));
        }
        if !self.depends_on.is_empty() {
            object.insert("dependsOn".into(), json!(self.depends_on));
        }
        Value::Object(object)
    }
}

/// A template output.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Output {
    /// ARM output type; always `string` here.
    #[serde(rename = "type")]
    pub output_type: &'static str,
    /// Literal value or ARM expression.
    pub value: String,
}

impl Output {
    fn string(value: impl Into<String>) -> Self {
        Self {
            output_type: "string",
            value: value.into(),
        }
    }
}

/// The full declared deployment.
#[derive(Debug, Clone)]
pub struct Deployment {
    /// Validated inputs.
    pub params: InfraParams,
    /// Derived names.
    pub names: ResourceNames,
    /// Resources in deployment order.
    pub resources: Vec<Resource>,
    /// Outputs consumed by the orchestrator.
    pub outputs: BTreeMap<String, Output>,
}

fn resource_id(resource_type: &str, name: &str) -> String {
    format!("[resourceId('{resource_type}', '{name}')]")
}

fn reference(resource_type: &str, name: &str, api_version: &str, property: &str) -> String {
    format!("[reference(resourceId('{resource_type}', '{name}'), '{api_version}').{property}]")
}

/// Deterministic role assignment name for `(scope, principal, role)`.
#[must_use]
pub fn role_assignment_name(scope: &str, principal: &str, role_definition_id: &str) -> Uuid {
    let key = format!("{scope}|{principal}|{role_definition_id}");
    Uuid::new_v5(&Uuid::NAMESPACE_URL, key.as_bytes())
}

impl Deployment {
    /// Declare the deployment for `params`.
    ///
    /// # Errors
    ///
    /// [`InfraError::InvalidParameter`] if the parameters fail validation.
    pub fn declare(params: &InfraParams) -> Result<Self, InfraError> {
        params.validate()?;
        let names = ResourceNames::derive(params);

        let mut tags = params.tags.clone();
        tags.insert(ENV_TAG.to_string(), params.environment_name.clone());
        let location = json!(params.location);
        let apim_capacity = u8::from(!params.apim_sku.eq_ignore_ascii_case("Consumption"));

        let workspace_id = resource_id(WORKSPACE_TYPE, &names.log_analytics);
        let registry_id = resource_id(REGISTRY_TYPE, &names.registry);
        let identity_id = resource_id(IDENTITY_TYPE, &names.identity);
        let identity_principal =
            reference(IDENTITY_TYPE, &names.identity, IDENTITY_API, "principalId");
        let registry_scope = format!("{REGISTRY_TYPE}/{}", names.registry);
        let acr_pull_definition = format!(
            "[subscriptionResourceId('Microsoft.Authorization/roleDefinitions', '{ACR_PULL_ROLE_ID}')]"
        );

        let mut resources = vec![
            Resource::new(
                ResourceKind::ManagedIdentity,
                IDENTITY_TYPE,
                IDENTITY_API,
                &names.identity,
            )
            .with("location", location.clone())
            .tagged(&tags),
            Resource::new(
                ResourceKind::LogAnalytics,
                WORKSPACE_TYPE,
                WORKSPACE_API,
                &names.log_analytics,
            )
            .with("location", location.clone())
            .with(
                "properties",
                json!({ "sku": { "name": "PerGB2018" }, "retentionInDays": 30 }),
            )
            .tagged(&tags),
            Resource::new(
                ResourceKind::ContainerRegistry,
                REGISTRY_TYPE,
                REGISTRY_API,
                &names.registry,
            )
            .with("location", location.clone())
            .with("sku", json!({ "name": "Basic" }))
            .with(
                "properties",
                json!({ "adminUserEnabled": false, "publicNetworkAccess": "Enabled" }),
            )
            .tagged(&tags),
            Resource::new(
                ResourceKind::ContainerAppsEnvironment,
                ENVIRONMENT_TYPE,
                ENVIRONMENT_API,
                &names.container_apps_environment,
            )
            .with("location", location.clone())
            .with(
                "properties",
                json!({
                    "appLogsConfiguration": {
                        "destination": "log-analytics",
                        "logAnalyticsConfiguration": {
                            "customerId": reference(WORKSPACE_TYPE, &names.log_analytics, WORKSPACE_API, "customerId"),
                            "sharedKey": format!(
                                "[listKeys(resourceId('{WORKSPACE_TYPE}', '{}'), '{WORKSPACE_API}').primarySharedKey]",
                                names.log_analytics
                            ),
                        }
                    }
                }),
            )
            .depends_on(workspace_id)
            .tagged(&tags),
            Resource::new(
                ResourceKind::ApiManagement,
                APIM_TYPE,
                APIM_API,
                &names.api_management,
            )
            .with("location", location)
            .with(
                "sku",
                json!({
                    "name": params.apim_sku,
                    "capacity": apim_capacity,
                }),
            )
            .with("identity", json!({ "type": "SystemAssigned" }))
            .with(
                "properties",
                json!({
                    "publisherEmail": params.publisher_email,
                    "publisherName": params.publisher_name,
                }),
            )
            .tagged(&tags),
            Resource::new(
                ResourceKind::IdentityAcrPull,
                ROLE_ASSIGNMENT_TYPE,
                ROLE_ASSIGNMENT_API,
                role_assignment_name(&params.scope_id, &names.identity, ACR_PULL_ROLE_ID)
                    .to_string(),
            )
            .with("scope", json!(registry_scope))
            .with(
                "properties",
                json!({
                    "principalId": identity_principal,
                    "principalType": "ServicePrincipal",
                    "roleDefinitionId": acr_pull_definition,
                }),
            )
            .depends_on(registry_id.clone())
            .depends_on(identity_id),
        ];

        if let Some(principal) = params.principal() {
            resources.push(
                Resource::new(
                    ResourceKind::PrincipalAcrPull,
                    ROLE_ASSIGNMENT_TYPE,
                    ROLE_ASSIGNMENT_API,
                    role_assignment_name(&params.scope_id, principal, ACR_PULL_ROLE_ID).to_string(),
                )
                .with("scope", json!(registry_scope))
                .with(
                    "properties",
                    json!({
                        "principalId": principal,
                        "principalType": "User",
                        "roleDefinitionId": acr_pull_definition,
                    }),
                )
                .depends_on(registry_id),
            );
        }

        let outputs = BTreeMap::from([
            (
                "AZURE_CONTAINER_REGISTRY_NAME".to_string(),
                Output::string(&names.registry),
            ),
            (
                "AZURE_CONTAINER_REGISTRY_ENDPOINT".to_string(),
                Output::string(names.registry_login_server()),
            ),
            (
                "AZURE_CONTAINER_APPS_ENVIRONMENT_NAME".to_string(),
                Output::string(&names.container_apps_environment),
            ),
            (
                "AZURE_LOG_ANALYTICS_WORKSPACE_NAME".to_string(),
                Output::string(&names.log_analytics),
            ),
            (
                "API_MANAGEMENT_NAME".to_string(),
                Output::string(&names.api_management),
            ),
            (
                "API_MANAGEMENT_GATEWAY_URL".to_string(),
                Output::string(names.gateway_url()),
            ),
            (
                "AZURE_MANAGED_IDENTITY_NAME".to_string(),
                Output::string(&names.identity),
            ),
            (
                "AZURE_MANAGED_IDENTITY_PRINCIPAL_ID".to_string(),
                Output::string(reference(
                    IDENTITY_TYPE,
                    &names.identity,
                    IDENTITY_API,
                    "principalId",
                )),
            ),
            (
                "AZURE_MANAGED_IDENTITY_CLIENT_ID".to_string(),
                Output::string(reference(
                    IDENTITY_TYPE,
                    &names.identity,
                    IDENTITY_API,
                    "clientId",
                )),
            ),
        ]);

        Ok(Self {
            params: params.clone(),
            names,
            resources,
            outputs,
        })
    }

    /// The first resource of `kind`.
    #[must_use]
    pub fn resource(&self, kind: ResourceKind) -> Option<&Resource> {
        self.resources.iter().find(|r| r.kind == kind)
    }

    /// All role assignments.
    pub fn role_assignments(&self) -> impl Iterator<Item = &Resource> {
        self.resources
            .iter()
            .filter(|r| r.resource_type == ROLE_ASSIGNMENT_TYPE)
    }

    /// Render the ARM deployment template.
    #[must_use]
    pub fn to_arm_template(&self) -> Value {
        json!({
            "$schema": SCHEMA,
            "contentVersion": "1.0.0.0",
            "metadata": {
                "environmentName": self.params.environment_name,
                "resourceToken": self.names.token,
            },
            "resources": self.resources.iter().map(Resource::to_arm).collect::<Vec<_>>(),
            "outputs": self.outputs,
        })
    }

    /// Render the ARM template as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Only if serialization itself fails.
    pub fn to_json_pretty(&self) -> Result<String, InfraError> {
        Ok(serde_json::to_string_pretty(&self.to_arm_template())?)
    }
}
