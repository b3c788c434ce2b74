//! OSHA public API integration (major occupational disasters).
//!
//! One blocking GET per window. The response is a bare JSON array of incident
//! objects, truncated by the server at a fixed cap.

use reqwest::blocking::Client;
use serde_json::Value;
use tracing::debug;

use crate::domain::{FetchConfig, IncidentRecord, QueryFilter, QueryWindow};
use crate::error::AppError;

const USER_AGENT: &str = concat!("osha-disasters/", env!("CARGO_PKG_VERSION"));

/// Parsed response for one window.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub records: Vec<IncidentRecord>,
    /// The response body as parsed JSON, kept for the raw archive.
    pub body: Value,
}

impl FetchedPage {
    pub fn empty() -> Self {
        Self {
            records: Vec::new(),
            body: Value::Array(Vec::new()),
        }
    }
}

/// Anything that can answer a windowed incident query.
///
/// The pipeline only talks to this trait, so tests can substitute a canned source.
pub trait IncidentSource {
    /// Human-readable origin, used in logs and the run summary.
    fn describe(&self) -> String;

    fn fetch_window(&self, window: &QueryWindow, filter: &QueryFilter) -> Result<FetchedPage, AppError>;
}

pub struct OshaClient {
    client: Client,
    api_url: String,
}

impl OshaClient {
    /// Build a client for `config.api_url`.
    ///
    /// The upstream host serves a certificate chain that does not validate.
    /// When `accept_invalid_certs` is set, verification is disabled on this
    /// client instance only; nothing else in the process is affected. This is
    /// an accepted, known risk for a read-only public dataset.
    pub fn new(config: &FetchConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout)
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .build()
            .map_err(|e| AppError::network(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
        })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }
}

impl IncidentSource for OshaClient {
    fn describe(&self) -> String {
        self.api_url().to_string()
    }

    fn fetch_window(&self, window: &QueryWindow, filter: &QueryFilter) -> Result<FetchedPage, AppError> {
        let start = window.api_start();
        let end = window.api_end();

        let mut req = self
            .client
            .get(&self.api_url)
            .query(&[("info_PostdateS", start.as_str()), ("info_PostdateE", end.as_str())]);

        let extra = filter.query_params();
        if !extra.is_empty() {
            req = req.query(&extra);
        }

        debug!(%window, ?filter, "requesting window");

        let resp = req
            .send()
            .map_err(|e| AppError::network(format!("OSHA request for {window} failed: {e}")))?;

        if !resp.status().is_success() {
            return Err(AppError::network(format!(
                "OSHA request for {window} failed with status {}.",
                resp.status()
            )));
        }

        let bytes = resp
            .bytes()
            .map_err(|e| AppError::network(format!("Failed to read OSHA response for {window}: {e}")))?;

        parse_payload(&bytes).map_err(|e| AppError::payload(format!("Window {window}: {e}")))
    }
}

/// Parse a response body into incident records.
///
/// Accepts a JSON array of objects, or `null` as an empty result. Anything
/// else is a malformed payload.
pub fn parse_payload(bytes: &[u8]) -> Result<FetchedPage, AppError> {
    let body: Value = serde_json::from_slice(bytes)
        .map_err(|e| AppError::payload(format!("Failed to parse OSHA response as JSON: {e}")))?;

    let records = match &body {
        Value::Null => return Ok(FetchedPage::empty()),
        Value::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for (idx, item) in items.iter().enumerate() {
                match item {
                    Value::Object(map) => out.push(map.clone()),
                    other => {
                        return Err(AppError::payload(format!(
                            "Expected an object at index {idx}, got {}.",
                            json_kind(other)
                        )));
                    }
                }
            }
            out
        }
        other => {
            return Err(AppError::payload(format!(
                "Expected a JSON array of incidents, got {}.",
                json_kind(other)
            )));
        }
    };

    Ok(FetchedPage { records, body })
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_array_of_objects_in_order() {
        let body = r#"[{"序號":"1","發生日期":"20180105"},{"序號":"2","發生日期":"20180220"}]"#;
        let page = parse_payload(body.as_bytes()).unwrap();
        assert_eq!(page.records.len(), 2);
        assert_eq!(page.records[0]["序號"], "1");
        assert_eq!(page.records[1]["發生日期"], "20180220");
        assert!(page.body.is_array());
    }

    #[test]
    fn empty_array_and_null_are_empty_results() {
        assert!(parse_payload(b"[]").unwrap().records.is_empty());
        assert!(parse_payload(b"null").unwrap().records.is_empty());
    }

    #[test]
    fn non_array_payload_is_rejected() {
        let err = parse_payload(br#"{"message":"error"}"#).unwrap_err();
        assert_eq!(err.exit_code(), 3);
        assert!(err.to_string().contains("an object"));
    }

    #[test]
    fn non_object_item_is_rejected() {
        let err = parse_payload(br#"[{"a":1}, 2]"#).unwrap_err();
        assert!(err.to_string().contains("index 1"));
    }

    #[test]
    fn broken_json_is_rejected() {
        let err = parse_payload(b"<html>502 Bad Gateway</html>").unwrap_err();
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn client_builds_with_verification_disabled() {
        let client = OshaClient::new(&FetchConfig::default()).unwrap();
        assert_eq!(client.api_url(), crate::domain::DEFAULT_API_URL);
        assert_eq!(client.describe(), crate::domain::DEFAULT_API_URL);
    }
}
