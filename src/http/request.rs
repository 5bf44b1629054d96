//! Request context.
//!
//! # Responsibilities
//! - Capture everything an action may read about the request, once
//! - Derive base URL and path info relative to the front controller
//! - Expose query and form parameters with defaults
//!
//! # Design Decisions
//! - Immutable after construction; passed by reference through dispatch
//! - Host falls back to the configured server name
//! - Prefix checks respect segment boundaries (`/app` does not own `/apple`)

use std::collections::HashMap;

use axum::http::{header, request::Parts, Method};

/// Header carrying the request id set by the request-id layer.
pub const X_REQUEST_ID: &str = "x-request-id";

const X_FORWARDED_PROTO: &str = "x-forwarded-proto";

/// Immutable view of the incoming request.
#[derive(Debug, Clone)]
pub struct RequestContext {
    method: Method,
    host: String,
    is_ssl: bool,
    request_uri: String,
    script_name: String,
    query: HashMap<String, String>,
    form: HashMap<String, String>,
    request_id: String,
}

impl RequestContext {
    /// Minimal context for `method` + `request_uri`; refine with the
    /// `with_*` methods.
    pub fn new(method: Method, request_uri: impl Into<String>) -> Self {
        let request_uri = request_uri.into();
        let query = request_uri
            .split_once('?')
            .map(|(_, q)| parse_urlencoded(q.as_bytes()))
            .unwrap_or_default();

        Self {
            method,
            host: String::new(),
            is_ssl: false,
            request_uri,
            script_name: String::new(),
            query,
            form: HashMap::new(),
            request_id: String::new(),
        }
    }

    /// Build from HTTP request parts and an already-decoded form body.
    pub fn from_parts(
        parts: &Parts,
        form: HashMap<String, String>,
        server_name: &str,
        script_name: &str,
    ) -> Self {
        let request_uri = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| parts.uri.path().to_string());

        let host = parts
            .headers
            .get(header::HOST)
            .and_then(|h| h.to_str().ok())
            .filter(|h| !h.is_empty())
            .map(str::to_string)
            .or_else(|| parts.uri.authority().map(|a| a.to_string()))
            .unwrap_or_else(|| server_name.to_string());

        let forwarded_https = parts
            .headers
            .get(X_FORWARDED_PROTO)
            .and_then(|h| h.to_str().ok())
            .map(|proto| proto.eq_ignore_ascii_case("https"))
            .unwrap_or(false);
        let is_ssl = forwarded_https || parts.uri.scheme_str() == Some("https");

        let request_id = parts
            .headers
            .get(X_REQUEST_ID)
            .and_then(|h| h.to_str().ok())
            .unwrap_or_default()
            .to_string();

        Self::new(parts.method.clone(), request_uri)
            .with_host(host)
            .with_ssl(is_ssl)
            .with_script_name(script_name)
            .with_form(form)
            .with_request_id(request_id)
    }

    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    pub fn with_ssl(mut self, is_ssl: bool) -> Self {
        self.is_ssl = is_ssl;
        self
    }

    /// Path of the front controller, e.g. `/index.php` or `/app/index`.
    pub fn with_script_name(mut self, script_name: impl Into<String>) -> Self {
        self.script_name = script_name.into();
        self
    }

    pub fn with_form(mut self, form: HashMap<String, String>) -> Self {
        self.form = form;
        self
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = request_id.into();
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn is_post(&self) -> bool {
        self.method == Method::POST
    }

    /// Query parameter, or `default` when absent.
    pub fn get_query<'a>(&'a self, name: &str, default: Option<&'a str>) -> Option<&'a str> {
        self.query.get(name).map(String::as_str).or(default)
    }

    /// Form parameter, or `default` when absent.
    pub fn get_post<'a>(&'a self, name: &str, default: Option<&'a str>) -> Option<&'a str> {
        self.form.get(name).map(String::as_str).or(default)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn is_ssl(&self) -> bool {
        self.is_ssl
    }

    /// Everything after the host: path plus query string.
    pub fn request_uri(&self) -> &str {
        &self.request_uri
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// URL prefix the application is mounted under.
    ///
    /// The script name itself when it appears in the request URI, else its
    /// directory, else empty. Never ends with `/`.
    pub fn base_url(&self) -> String {
        let script_name = self.script_name.as_str();
        let request_uri = self.request_uri.as_str();

        if !script_name.is_empty() && has_path_prefix(request_uri, script_name) {
            return script_name.trim_end_matches('/').to_string();
        }

        let dir = dirname(script_name);
        if has_path_prefix(request_uri, dir) {
            return dir.trim_end_matches('/').to_string();
        }

        String::new()
    }

    /// Request URI without query string and base URL.
    pub fn path_info(&self) -> String {
        let base_url = self.base_url();
        let path = self
            .request_uri
            .split_once('?')
            .map(|(path, _)| path)
            .unwrap_or(&self.request_uri);

        path.strip_prefix(base_url.as_str()).unwrap_or(path).to_string()
    }
}

/// Decode an `application/x-www-form-urlencoded` payload. Later keys win.
pub fn parse_urlencoded(input: &[u8]) -> HashMap<String, String> {
    url::form_urlencoded::parse(input).into_owned().collect()
}

fn has_path_prefix(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => {
            prefix.ends_with('/') || rest.is_empty() || rest.starts_with('/') || rest.starts_with('?')
        }
        None => false,
    }
}

fn dirname(path: &str) -> &str {
    match path.rsplit_once('/') {
        Some(("", _)) => "/",
        Some((dir, _)) => dir,
        None => ".",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;

    fn context(script_name: &str, request_uri: &str) -> RequestContext {
        RequestContext::new(Method::GET, request_uri).with_script_name(script_name)
    }

    #[test]
    fn test_base_url_with_front_controller_in_uri() {
        let ctx = context("/index.php", "/index.php/user/42?tab=posts");
        assert_eq!(ctx.base_url(), "/index.php");
        assert_eq!(ctx.path_info(), "/user/42");
    }

    #[test]
    fn test_base_url_with_front_controller_omitted() {
        let ctx = context("/blog/index.php", "/blog/user/42");
        assert_eq!(ctx.base_url(), "/blog");
        assert_eq!(ctx.path_info(), "/user/42");

        let root = context("/index.php", "/user/42");
        assert_eq!(root.base_url(), "");
        assert_eq!(root.path_info(), "/user/42");
    }

    #[test]
    fn test_base_url_unrelated_script() {
        let ctx = context("/blog/index.php", "/shop/item");
        assert_eq!(ctx.base_url(), "");
        assert_eq!(ctx.path_info(), "/shop/item");
    }

    #[test]
    fn test_base_url_respects_segment_boundary() {
        let ctx = context("/app/index.php", "/apple/pie");
        assert_eq!(ctx.base_url(), "");
        assert_eq!(ctx.path_info(), "/apple/pie");
    }

    #[test]
    fn test_root_script_name() {
        let ctx = context("/", "/account?next=1");
        assert_eq!(ctx.base_url(), "");
        assert_eq!(ctx.path_info(), "/account");

        let ctx = context("/app/", "/app/account");
        assert_eq!(ctx.base_url(), "/app");
        assert_eq!(ctx.path_info(), "/account");
    }

    #[test]
    fn test_empty_script_name() {
        let ctx = context("", "/user/42?x=1");
        assert_eq!(ctx.base_url(), "");
        assert_eq!(ctx.path_info(), "/user/42");
    }

    #[test]
    fn test_query_and_form_parameters() {
        let mut form = HashMap::new();
        form.insert("body".to_string(), "hello".to_string());
        let ctx = RequestContext::new(Method::POST, "/status/post?page=2&q=a%20b").with_form(form);

        assert!(ctx.is_post());
        assert_eq!(ctx.get_query("page", None), Some("2"));
        assert_eq!(ctx.get_query("q", None), Some("a b"));
        assert_eq!(ctx.get_query("missing", Some("1")), Some("1"));
        assert_eq!(ctx.get_post("body", None), Some("hello"));
        assert_eq!(ctx.get_post("missing", None), None);
    }

    #[test]
    fn test_from_parts() {
        let (parts, _) = Request::builder()
            .method("GET")
            .uri("/user/42?x=1")
            .header("Host", "example.com:8080")
            .header("X-Forwarded-Proto", "https")
            .header("X-Request-Id", "req-1")
            .body(Body::empty())
            .unwrap()
            .into_parts();

        let ctx = RequestContext::from_parts(&parts, HashMap::new(), "localhost", "");
        assert_eq!(ctx.host(), "example.com:8080");
        assert!(ctx.is_ssl());
        assert_eq!(ctx.request_uri(), "/user/42?x=1");
        assert_eq!(ctx.request_id(), "req-1");
        assert_eq!(ctx.get_query("x", None), Some("1"));
    }

    #[test]
    fn test_host_falls_back_to_server_name() {
        let (parts, _) = Request::builder()
            .uri("/")
            .body(Body::empty())
            .unwrap()
            .into_parts();

        let ctx = RequestContext::from_parts(&parts, HashMap::new(), "localhost", "");
        assert_eq!(ctx.host(), "localhost");
        assert!(!ctx.is_ssl());
    }
}
