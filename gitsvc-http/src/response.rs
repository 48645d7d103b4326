//! Response bodies and format negotiation

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, FixedOffset};
use gitsvc_core::FileContent;
use serde::Serialize;

use crate::AppError;

/// Output encoding requested via `?format=`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Format {
    #[default]
    Json,
    Yaml,
}

impl Format {
    /// Only the exact value `yaml` selects YAML
    pub fn from_query(value: Option<&str>) -> Self {
        match value {
            Some("yaml") => Format::Yaml,
            _ => Format::Json,
        }
    }
}

/// A 200 response encoded in the negotiated format
#[derive(Debug)]
pub struct Negotiated<T> {
    pub format: Format,
    pub body: T,
}

impl<T> Negotiated<T> {
    pub fn new(format: Format, body: T) -> Self {
        Self { format, body }
    }
}

impl<T: Serialize> IntoResponse for Negotiated<T> {
    fn into_response(self) -> Response {
        match self.format {
            Format::Json => (StatusCode::OK, Json(self.body)).into_response(),
            Format::Yaml => match serde_yaml::to_string(&self.body) {
                Ok(yaml) => (
                    StatusCode::OK,
                    [(header::CONTENT_TYPE, "application/yaml")],
                    yaml,
                )
                    .into_response(),
                Err(e) => AppError::Internal(anyhow::anyhow!("YAML encoding failed: {e}")).into_response(),
            },
        }
    }
}

/// `GET /file`
#[derive(Debug, Serialize)]
pub struct FileResponse {
    pub content: FileContent,
    pub timestamp: DateTime<FixedOffset>,
    pub commit_hash: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub offline: bool,
}

/// `GET /tree`
#[derive(Debug, Serialize)]
pub struct TreeResponse {
    pub files: Vec<String>,
    pub timestamp: DateTime<FixedOffset>,
    pub commit_hash: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub offline: bool,
}

/// `GET /update`
#[derive(Debug, Serialize)]
pub struct UpdateResponse {
    pub message: String,
    pub commit_hash: String,
    pub timestamp: DateTime<FixedOffset>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_query() {
        assert_eq!(Format::from_query(Some("yaml")), Format::Yaml);
        assert_eq!(Format::from_query(Some("json")), Format::Json);
        assert_eq!(Format::from_query(Some("YAML")), Format::Json);
        assert_eq!(Format::from_query(Some("yml")), Format::Json);
        assert_eq!(Format::from_query(None), Format::Json);
    }

    #[test]
    fn test_offline_omitted_when_false() {
        let timestamp = DateTime::parse_from_rfc3339("2024-05-01T12:00:00+02:00").unwrap();
        let mut body = TreeResponse {
            files: vec!["README.md".to_string()],
            timestamp,
            commit_hash: "abc".to_string(),
            offline: false,
        };

        let json = serde_json::to_value(&body).unwrap();
        assert!(json.get("offline").is_none());
        assert_eq!(json["timestamp"], "2024-05-01T12:00:00+02:00");

        body.offline = true;
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["offline"], true);
    }
}
