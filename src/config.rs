//! Environment-driven configuration for both functions.
//!
//! Values are read through a lookup function so tests can supply a map
//! instead of mutating the process environment.
use crate::error::RelayError;
use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::Value;
use std::fmt;

/// Selects sandbox credentials when set to `true` (any case).
pub const SANDBOX_FLAG_VAR: &str = "PLM_IS_SANDBOX";
/// Credential bundle, JSON-encoded twice by the deployment pipeline.
pub const CREDENTIALS_VAR: &str = "PLM_CREDS";
pub const API_VERSION_VAR: &str = "SF_API_VERSION";
pub const STATE_MACHINE_ARN_VAR: &str = "METAMAN_STATE_MACHINE_ARN";

pub const DEFAULT_API_VERSION: &str = "59.0";

/// The two credential shapes the CRM connector accepts.
#[derive(Clone, PartialEq, Eq)]
pub enum CrmCredentials {
    /// A pre-obtained session for a sandbox org.
    Sandbox {
        instance_url: String,
        access_token: String,
    },
    /// Username/password login against the production login endpoint.
    Production {
        username: String,
        password: String,
        security_token: String,
    },
}

impl fmt::Debug for CrmCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrmCredentials::Sandbox { instance_url, .. } => f
                .debug_struct("Sandbox")
                .field("instance_url", instance_url)
                .field("access_token", &"<redacted>")
                .finish(),
            CrmCredentials::Production { username, .. } => f
                .debug_struct("Production")
                .field("username", username)
                .field("password", &"<redacted>")
                .field("security_token", &"<redacted>")
                .finish(),
        }
    }
}

impl CrmCredentials {
    pub fn mode(&self) -> &'static str {
        match self {
            CrmCredentials::Sandbox { .. } => "sandbox",
            CrmCredentials::Production { .. } => "production",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrmConfig {
    pub credentials: CrmCredentials,
    /// Bare version number, e.g. `59.0`.
    pub api_version: String,
}

#[derive(Debug, Default, Deserialize)]
struct CredentialBundle {
    #[serde(default)]
    instance_url: Option<String>,
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    plm_username: Option<String>,
    #[serde(default)]
    plm_password: Option<String>,
    #[serde(default)]
    plm_token: Option<String>,
}

impl CrmConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let sandbox = is_sandbox(lookup(SANDBOX_FLAG_VAR).as_deref());
        let raw = lookup(CREDENTIALS_VAR)
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| RelayError::Config(format!("{CREDENTIALS_VAR} is not set")))?;
        let bundle = decode_bundle(&raw)?;

        let credentials = if sandbox {
            CrmCredentials::Sandbox {
                instance_url: required(unquoted(bundle.instance_url), "instance_url")?,
                access_token: required(unquoted(bundle.access_token), "access_token")?,
            }
        } else {
            CrmCredentials::Production {
                username: required(unquoted(bundle.plm_username), "plm_username")?,
                password: required(bundle.plm_password, "plm_password")?,
                security_token: bundle.plm_token.unwrap_or_default(),
            }
        };

        Ok(Self {
            credentials,
            api_version: api_version(lookup(API_VERSION_VAR).as_deref()),
        })
    }
}

/// Orchestration target for the trigger function, if configured.
pub fn state_machine_arn<F>(lookup: F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(STATE_MACHINE_ARN_VAR)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

pub fn is_sandbox(flag: Option<&str>) -> bool {
    flag.is_some_and(|value| value.trim().eq_ignore_ascii_case("true"))
}

/// Drop stray double quotes left over from the double encoding.
pub fn strip_quotes(value: &str) -> String {
    value.replace('"', "").trim().to_string()
}

fn api_version(raw: Option<&str>) -> String {
    raw.map(strip_quotes)
        .map(|value| value.trim_start_matches(['v', 'V']).to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_API_VERSION.to_string())
}

fn decode_bundle(raw: &str) -> Result<CredentialBundle> {
    let outer: Value =
        serde_json::from_str(raw.trim()).with_context(|| format!("parse {CREDENTIALS_VAR}"))?;
    // The bundle normally arrives as a JSON string holding the JSON object.
    let inner = match outer {
        Value::String(text) => serde_json::from_str(&text)
            .with_context(|| format!("parse inner {CREDENTIALS_VAR} document"))?,
        other => other,
    };
    serde_json::from_value(inner).with_context(|| format!("decode {CREDENTIALS_VAR} bundle"))
}

/// Passwords and tokens are used as given; other values lose stray quotes.
fn unquoted(value: Option<String>) -> Option<String> {
    value.map(|value| strip_quotes(&value))
}

fn required(value: Option<String>, field: &str) -> Result<String> {
    value
        .filter(|value| !value.is_empty())
        .ok_or_else(|| {
            RelayError::Config(format!("{CREDENTIALS_VAR} is missing `{field}`")).into()
        })
}
