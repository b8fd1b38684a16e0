//! One CRM session per invocation, built from the configured credentials.
use super::rest::{http_agent, RestSession};
use super::soap;
use super::CrmSession;
use crate::config::{CrmConfig, CrmCredentials};
use crate::error::RelayError;
use anyhow::{Context, Result};
use std::time::Instant;

/// Open a session in sandbox or production mode.
///
/// No retries: a failure here ends the invocation.
pub fn connect(config: &CrmConfig) -> Result<RestSession> {
    let start = Instant::now();
    let session = match &config.credentials {
        CrmCredentials::Sandbox {
            instance_url,
            access_token,
        } => {
            let instance = bare_host(instance_url)?;
            RestSession::new(http_agent(), &instance, &config.api_version, access_token)
        }
        CrmCredentials::Production {
            username,
            password,
            security_token,
        } => login(config, username, password, security_token)?,
    };

    tracing::info!(
        mode = config.credentials.mode(),
        instance_url = session.instance_url(),
        api_version = %config.api_version,
        elapsed_ms = start.elapsed().as_millis(),
        "salesforce session ready"
    );
    Ok(session)
}

fn login(
    config: &CrmConfig,
    username: &str,
    password: &str,
    security_token: &str,
) -> Result<RestSession> {
    let agent = http_agent();
    let url = soap::login_url(soap::LOGIN_DOMAIN, &config.api_version);
    let envelope = soap::login_envelope(username, password, security_token);
    let mut response = agent
        .post(&url)
        .header("Content-Type", "text/xml")
        .header("charset", "UTF-8")
        .header("SOAPAction", "login")
        .send(envelope.as_str())
        .with_context(|| format!("POST {url}"))?;
    let status = response.status().as_u16();
    let body = response
        .body_mut()
        .read_to_string()
        .context("read login response")?;

    let session = soap::parse_login_response(&body)
        .with_context(|| format!("login as {username} (HTTP {status})"))?;
    Ok(RestSession::new(
        agent,
        &session.instance,
        &config.api_version,
        session.session_id,
    ))
}

/// `https://acme.my.salesforce.com/` -> `acme.my.salesforce.com`
pub fn bare_host(instance_url: &str) -> Result<String> {
    let trimmed = instance_url.trim();
    let host = trimmed
        .strip_prefix("https://")
        .or_else(|| trimmed.strip_prefix("http://"))
        .ok_or_else(|| {
            RelayError::Config(format!("instance_url `{trimmed}` has no http(s) scheme"))
        })?
        .trim_end_matches('/');
    if host.is_empty() || host.contains('/') {
        return Err(
            RelayError::Config(format!("instance_url `{trimmed}` is not a bare origin")).into(),
        );
    }
    Ok(host.to_string())
}
