//! Partner SOAP `login` call used for production credentials.
use crate::error::RelayError;
use anyhow::{anyhow, Context, Result};
use regex::Regex;
use std::sync::OnceLock;

/// Production orgs authenticate against `login.salesforce.com`.
pub const LOGIN_DOMAIN: &str = "login";
const CLIENT_ID: &str = "metaman-relay";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginSession {
    pub session_id: String,
    /// Bare host, e.g. `acme.my.salesforce.com`.
    pub instance: String,
}

pub fn login_url(domain: &str, api_version: &str) -> String {
    format!("https://{domain}.salesforce.com/services/Soap/u/{api_version}")
}

/// The security token is appended to the password, as the login API expects.
pub fn login_envelope(username: &str, password: &str, security_token: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8" ?>
<env:Envelope
        xmlns:xsd="http://www.w3.org/2001/XMLSchema"
        xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance"
        xmlns:env="http://schemas.xmlsoap.org/soap/envelope/"
        xmlns:urn="urn:partner.soap.sforce.com">
    <env:Header>
        <urn:CallOptions>
            <urn:client>{client}</urn:client>
            <urn:defaultNamespace>sf</urn:defaultNamespace>
        </urn:CallOptions>
    </env:Header>
    <env:Body>
        <n1:login xmlns:n1="urn:partner.soap.sforce.com">
            <n1:username>{username}</n1:username>
            <n1:password>{password}{token}</n1:password>
        </n1:login>
    </env:Body>
</env:Envelope>"#,
        client = CLIENT_ID,
        username = xml_escape(username),
        password = xml_escape(password),
        token = xml_escape(security_token),
    )
}

/// Extract the session from a login response body.
///
/// Faults are reported as [`RelayError::Login`] with the CRM's exception code
/// and message when present.
pub fn parse_login_response(body: &str) -> Result<LoginSession> {
    let patterns = LoginPatterns::get()?;
    if let Some(session_id) = element_text(&patterns.session_id, body) {
        let server_url = element_text(&patterns.server_url, body)
            .context("login response has a sessionId but no serverUrl")?;
        return Ok(LoginSession {
            session_id,
            instance: instance_from_server_url(&server_url),
        });
    }

    let code = element_text(&patterns.exception_code, body);
    let message = element_text(&patterns.exception_message, body)
        .or_else(|| element_text(&patterns.fault_string, body));
    let detail = match (code, message) {
        (Some(code), Some(message)) => format!("{code}: {message}"),
        (Some(text), None) | (None, Some(text)) => text,
        (None, None) => "login response carried neither a session nor a fault".to_string(),
    };
    Err(RelayError::Login(detail).into())
}

/// Element patterns for the login response, compiled on first use.
struct LoginPatterns {
    session_id: Regex,
    server_url: Regex,
    exception_code: Regex,
    exception_message: Regex,
    fault_string: Regex,
}

impl LoginPatterns {
    fn get() -> Result<&'static LoginPatterns> {
        static PATTERNS: OnceLock<Result<LoginPatterns, regex::Error>> = OnceLock::new();
        PATTERNS
            .get_or_init(LoginPatterns::compile)
            .as_ref()
            .map_err(|err| anyhow!("compile login response patterns: {err}"))
    }

    fn compile() -> Result<LoginPatterns, regex::Error> {
        Ok(LoginPatterns {
            session_id: element_pattern("sessionId")?,
            server_url: element_pattern("serverUrl")?,
            exception_code: element_pattern("exceptionCode")?,
            exception_message: element_pattern("exceptionMessage")?,
            fault_string: element_pattern("faultstring")?,
        })
    }
}

/// `https://acme-api.my.salesforce.com/services/Soap/u/59.0/00D..` -> `acme.my.salesforce.com`
pub fn instance_from_server_url(server_url: &str) -> String {
    let without_scheme = server_url
        .trim_start_matches("https://")
        .trim_start_matches("http://");
    without_scheme
        .split('/')
        .next()
        .unwrap_or_default()
        .replace("-api", "")
}

fn element_pattern(name: &str) -> Result<Regex, regex::Error> {
    Regex::new(&format!(
        r"<(?:\w+:)?{name}(?:\s[^>]*)?>([^<]*)</(?:\w+:)?{name}>"
    ))
}

fn element_text(pattern: &Regex, xml: &str) -> Option<String> {
    pattern
        .captures(xml)
        .and_then(|caps| caps.get(1))
        .map(|m| xml_unescape(m.as_str().trim()))
}

fn xml_escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

fn xml_unescape(value: &str) -> String {
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
