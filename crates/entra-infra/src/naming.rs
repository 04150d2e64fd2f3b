//! Deterministic resource naming.

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::params::InfraParams;

const TOKEN_LEN: usize = 13;
const ALPHABET: &[u8; 32] = b"abcdefghijklmnopqrstuvwxyz234567";

/// A 13-character lowercase base32 token unique to `(scope, location,
/// environment)`.
///
/// The token is the first 65 bits of `SHA-256("{scope}|{location}|{environment}")`.
#[must_use]
pub fn resource_token(scope: &str, location: &str, environment: &str) -> String {
    let digest = Sha256::digest(format!("{scope}|{location}|{environment}").as_bytes());

    let mut token = String::with_capacity(TOKEN_LEN);
    let mut buffer: u32 = 0;
    let mut bits = 0;
    for byte in digest.iter() {
        buffer = (buffer << 8) | u32::from(*byte);
        bits += 8;
        while bits >= 5 && token.len() < TOKEN_LEN {
            bits -= 5;
            let index = ((buffer >> bits) & 0x1f) as usize;
            token.push(char::from(ALPHABET[index]));
        }
        if token.len() == TOKEN_LEN {
            break;
        }
        buffer &= (1 << bits) - 1;
    }
    token
}

/// Names of every resource in a deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceNames {
    /// The shared token.
    pub token: String,
    /// `id-{token}`.
    pub identity: String,
    /// `cr{token}`; registries only allow alphanumerics.
    pub registry: String,
    /// `log-{token}`.
    pub log_analytics: String,
    /// `cae-{token}`.
    pub container_apps_environment: String,
    /// `apim-{token}`.
    pub api_management: String,
}

impl ResourceNames {
    /// Derive names from the parameters' scope, location and environment.
    #[must_use]
    pub fn derive(params: &InfraParams) -> Self {
        Self::from_token(resource_token(
            &params.scope_id,
            &params.location,
            &params.environment_name,
        ))
    }

    fn from_token(token: String) -> Self {
        Self {
            identity: format!("id-{token}"),
            registry: format!("cr{token}"),
            log_analytics: format!("log-{token}"),
            container_apps_environment: format!("cae-{token}"),
            api_management: format!("apim-{token}"),
            token,
        }
    }

    /// `{registry}.azurecr.io`.
    #[must_use]
    pub fn registry_login_server(&self) -> String {
        format!("{}.azurecr.io", self.registry)
    }

    /// `https://{api_management}.azure-api.net`.
    #[must_use]
    pub fn gateway_url(&self) -> String {
        format!("https://{}.azure-api.net", self.api_management)
    }
}
