//! Blocking REST client for sObject writes.
use super::{CrmResponse, CrmSession, NewAttachment, ATTACHMENT_OBJECT};
use anyhow::{Context, Result};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fmt;
use std::time::{Duration, Instant};
use ureq::Agent;

const HTTP_TIMEOUT: Duration = Duration::from_secs(60);

/// Session bound to one org instance, API version and token.
pub struct RestSession {
    agent: Agent,
    instance_url: String,
    api_version: String,
    session_id: String,
}

impl fmt::Debug for RestSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestSession")
            .field("instance_url", &self.instance_url)
            .field("api_version", &self.api_version)
            .finish_non_exhaustive()
    }
}

/// Agent shared by login and REST calls; non-2xx answers are returned, not raised.
pub fn http_agent() -> Agent {
    Agent::config_builder()
        .timeout_global(Some(HTTP_TIMEOUT))
        .http_status_as_error(false)
        .build()
        .into()
}

#[derive(Debug, Deserialize)]
struct CreateResult {
    id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default, rename = "errorCode")]
    error_code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl RestSession {
    pub fn new(
        agent: Agent,
        instance: &str,
        api_version: impl Into<String>,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            agent,
            instance_url: format!("https://{instance}"),
            api_version: api_version.into(),
            session_id: session_id.into(),
        }
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    fn sobject_url(&self, object_type: &str, record_id: Option<&str>) -> String {
        sobject_url(&self.instance_url, &self.api_version, object_type, record_id)
    }

    fn send(&self, method: &str, url: &str, body: &Value) -> Result<(u16, String)> {
        let start = Instant::now();
        let authorization = format!("Bearer {}", self.session_id);
        let request = match method {
            "POST" => self.agent.post(url),
            _ => self.agent.patch(url),
        };
        let mut response = request
            .header("Authorization", &authorization)
            .header("Accept", "application/json")
            .send_json(body)
            .with_context(|| format!("{method} {url}"))?;
        let status = response.status().as_u16();
        let text = response
            .body_mut()
            .read_to_string()
            .with_context(|| format!("read response of {method} {url}"))?;

        tracing::debug!(
            method,
            url,
            status,
            elapsed_ms = start.elapsed().as_millis(),
            "crm request complete"
        );
        Ok((status, text))
    }
}

impl CrmSession for RestSession {
    fn instance_url(&self) -> &str {
        &self.instance_url
    }

    fn create_attachment(&self, attachment: &NewAttachment) -> Result<CrmResponse> {
        let url = self.sobject_url(ATTACHMENT_OBJECT, None);
        let body = serde_json::to_value(attachment).context("serialize attachment")?;
        let (status, text) = self.send("POST", &url, &body)?;
        Ok(interpret(status, &text))
    }

    fn update_record(
        &self,
        object_type: &str,
        record_id: &str,
        fields: &Map<String, Value>,
    ) -> Result<CrmResponse> {
        let url = self.sobject_url(object_type, Some(record_id));
        let (status, text) = self.send("PATCH", &url, &Value::Object(fields.clone()))?;
        let mut response = interpret(status, &text);
        if response.success && response.id.is_none() {
            response.id = Some(record_id.to_string());
        }
        Ok(response)
    }
}

pub fn sobject_url(
    instance_url: &str,
    api_version: &str,
    object_type: &str,
    record_id: Option<&str>,
) -> String {
    let base = format!(
        "{}/services/data/v{api_version}/sobjects/{object_type}",
        instance_url.trim_end_matches('/')
    );
    match record_id {
        Some(id) => format!("{base}/{id}"),
        None => format!("{base}/"),
    }
}

/// Map an HTTP answer onto a [`CrmResponse`].
///
/// Creates answer `201` with `{"id": ..}`, updates answer `204` with no body;
/// failures carry a JSON array of `{errorCode, message}`.
pub fn interpret(status: u16, body: &str) -> CrmResponse {
    if (200..300).contains(&status) {
        let id = serde_json::from_str::<CreateResult>(body)
            .ok()
            .and_then(|created| created.id);
        return CrmResponse::accepted(status, id);
    }

    let detail = match serde_json::from_str::<Vec<ApiError>>(body) {
        Ok(errors) if !errors.is_empty() => errors
            .into_iter()
            .map(|error| match (error.error_code, error.message) {
                (Some(code), Some(message)) => format!("{code}: {message}"),
                (Some(text), None) | (None, Some(text)) => text,
                (None, None) => "unknown error".to_string(),
            })
            .collect::<Vec<_>>()
            .join("; "),
        _ if body.trim().is_empty() => format!("HTTP {status}"),
        _ => body.trim().to_string(),
    };
    CrmResponse::rejected(status, detail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sobject_urls() {
        assert_eq!(
            sobject_url("https://acme.my.salesforce.com", "59.0", "Attachment", None),
            "https://acme.my.salesforce.com/services/data/v59.0/sobjects/Attachment/"
        );
        assert_eq!(
            sobject_url(
                "https://acme.my.salesforce.com/",
                "59.0",
                "PackageManager__Metadata_Differential__c",
                Some("a001")
            ),
            "https://acme.my.salesforce.com/services/data/v59.0/sobjects/PackageManager__Metadata_Differential__c/a001"
        );
    }

    #[test]
    fn created_response_carries_id() {
        let response = interpret(201, r#"{"id":"00P000000000001","success":true,"errors":[]}"#);
        assert!(response.success);
        assert_eq!(response.id.as_deref(), Some("00P000000000001"));
    }

    #[test]
    fn no_content_update_is_success() {
        let response = interpret(204, "");
        assert!(response.success);
        assert_eq!(response.status, 204);
        assert_eq!(response.detail, None);
    }

    #[test]
    fn error_array_becomes_detail() {
        let response = interpret(
            400,
            r#"[{"message":"bad value for restricted picklist field: DONE","errorCode":"INVALID_OR_NULL_FOR_RESTRICTED_PICKLIST","fields":["PackageManager__Metadata_Status__c"]}]"#,
        );
        assert!(!response.success);
        assert_eq!(
            response.detail.as_deref(),
            Some("INVALID_OR_NULL_FOR_RESTRICTED_PICKLIST: bad value for restricted picklist field: DONE")
        );
    }

    #[test]
    fn expired_session_is_rejected() {
        let response = interpret(
            401,
            r#"[{"message":"Session expired or invalid","errorCode":"INVALID_SESSION_ID"}]"#,
        );
        assert!(!response.success);
        assert_eq!(response.status, 401);
    }

    #[test]
    fn non_json_failure_keeps_raw_text() {
        assert_eq!(
            interpret(503, "Service Unavailable").detail.as_deref(),
            Some("Service Unavailable")
        );
        assert_eq!(interpret(500, "").detail.as_deref(), Some("HTTP 500"));
    }

    #[test]
    fn debug_hides_session_token() {
        let session = RestSession::new(http_agent(), "acme.my.salesforce.com", "59.0", "secret!");
        let text = format!("{session:?}");
        assert!(!text.contains("secret!"));
        assert!(text.contains("https://acme.my.salesforce.com"));
    }

    /// Accept one request on a loopback socket, answer 204, return the raw request.
    fn serve_once(listener: std::net::TcpListener) -> std::thread::JoinHandle<String> {
        use std::io::{BufRead, BufReader, Read, Write};
        std::thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream);
            let mut head = String::new();
            let mut content_length = 0;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                if let Some((name, value)) = line.split_once(':') {
                    if name.eq_ignore_ascii_case("content-length") {
                        content_length = value.trim().parse().unwrap();
                    }
                }
                head.push_str(&line);
                if line == "\r\n" {
                    break;
                }
            }
            let mut body = vec![0; content_length];
            reader.read_exact(&mut body).unwrap();
            reader
                .get_mut()
                .write_all(b"HTTP/1.1 204 No Content\r\nContent-Length: 0\r\n\r\n")
                .unwrap();
            head + &String::from_utf8(body).unwrap()
        })
    }

    #[test]
    fn patch_sends_json_body() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/record", listener.local_addr().unwrap());
        let server = serve_once(listener);

        let session = RestSession::new(http_agent(), "unused", "59.0", "tok");
        let (status, text) = session
            .send("PATCH", &url, &serde_json::json!({"Field__c": "COMPLETED"}))
            .unwrap();
        let request = server.join().unwrap();

        assert_eq!(status, 204);
        assert!(text.is_empty());
        assert!(request.starts_with("PATCH /record"));
        assert!(request.to_ascii_lowercase().contains("content-type: application/json"));
        assert!(request.contains("Bearer tok"));
        assert!(request.ends_with(r#"{"Field__c":"COMPLETED"}"#));
    }
}
