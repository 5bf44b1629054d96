//! Response building.
//!
//! # Responsibilities
//! - Collect content, status and headers while an action runs
//! - Convert the result into an axum response ("send")
//!
//! # Design Decisions
//! - Mutable builder passed by `&mut` through dispatch, never global
//! - Header names compare case-insensitively; setting one replaces it
//! - HTML content type unless the action sets its own
//! - Invalid status codes become 500, invalid headers are dropped and logged

use axum::{
    body::Body,
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};

const DEFAULT_CONTENT_TYPE: &str = "text/html; charset=utf-8";

/// Accumulates what the client will receive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseBuilder {
    content: String,
    status_code: u16,
    status_text: String,
    headers: Vec<(String, String)>,
}

impl Default for ResponseBuilder {
    fn default() -> Self {
        Self {
            content: String::new(),
            status_code: 200,
            status_text: "OK".to_string(),
            headers: Vec::new(),
        }
    }
}

impl ResponseBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    /// Set status code and reason text (informational; HTTP/2 drops it).
    pub fn set_status_code(&mut self, status_code: u16, status_text: impl Into<String>) {
        self.status_code = status_code;
        self.status_text = status_text.into();
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn status_text(&self) -> &str {
        &self.status_text
    }

    /// Set a header, replacing any existing value with the same name.
    pub fn set_http_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self
            .headers
            .iter_mut()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(&name))
        {
            Some(slot) => slot.1 = value,
            None => self.headers.push((name, value)),
        }
    }

    pub fn http_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Headers in the order they were first set.
    pub fn http_headers(&self) -> &[(String, String)] {
        &self.headers
    }
}

impl IntoResponse for ResponseBuilder {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status_code).unwrap_or_else(|_| {
            tracing::error!(status_code = self.status_code, "Invalid status code, sending 500");
            StatusCode::INTERNAL_SERVER_ERROR
        });

        let mut response = Response::new(Body::from(self.content));
        *response.status_mut() = status;

        let headers = response.headers_mut();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(DEFAULT_CONTENT_TYPE),
        );
        for (name, value) in self.headers {
            match (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(&value),
            ) {
                (Ok(name), Ok(value)) => {
                    headers.insert(name, value);
                }
                _ => tracing::warn!(header = %name, "Dropping invalid response header"),
            }
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let builder = ResponseBuilder::new();
        assert_eq!(builder.status_code(), 200);
        assert_eq!(builder.status_text(), "OK");
        assert_eq!(builder.content(), "");
    }

    #[test]
    fn test_headers_replace_case_insensitively() {
        let mut builder = ResponseBuilder::new();
        builder.set_http_header("Location", "/a");
        builder.set_http_header("X-Extra", "1");
        builder.set_http_header("location", "/b");

        assert_eq!(builder.http_header("LOCATION"), Some("/b"));
        assert_eq!(builder.http_headers().len(), 2);
    }

    #[test]
    fn test_into_response_carries_status_and_headers() {
        let mut builder = ResponseBuilder::new();
        builder.set_status_code(302, "Found");
        builder.set_http_header("Location", "http://example.com/");
        builder.set_http_header("Bad Header", "x");

        let response = builder.into_response();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()["location"], "http://example.com/");
        assert_eq!(response.headers()["content-type"], DEFAULT_CONTENT_TYPE);
        assert!(response.headers().get("bad header").is_none());
    }

    #[test]
    fn test_content_type_can_be_overridden() {
        let mut builder = ResponseBuilder::new();
        builder.set_http_header("Content-Type", "application/json");
        let response = builder.into_response();
        assert_eq!(response.headers()["content-type"], "application/json");
    }

    #[test]
    fn test_invalid_status_becomes_500() {
        let mut builder = ResponseBuilder::new();
        builder.set_status_code(1000, "Nope");
        assert_eq!(
            builder.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
