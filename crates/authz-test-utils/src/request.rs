//! HTTP request builders
//!
//! Produces real `axum::http::Request` values so tests run through the same
//! `RequestContext` implementation a service would.

use axum::body::Body;
use axum::http::{Method, Request};

/// Builder for requests carrying tokens in headers, cookies or the query.
#[derive(Debug, Clone)]
pub struct TestRequestBuilder {
    method: Method,
    path: String,
    headers: Vec<(String, String)>,
    cookies: Vec<(String, String)>,
    query: Vec<(String, String)>,
}

impl TestRequestBuilder {
    pub fn new(method: Method, path: &str) -> Self {
        Self {
            method,
            path: path.to_string(),
            headers: Vec::new(),
            cookies: Vec::new(),
            query: Vec::new(),
        }
    }

    pub fn get(path: &str) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// `Authorization: Bearer <token>`
    pub fn bearer(self, token: &str) -> Self {
        self.header("authorization", &format!("Bearer {token}"))
    }

    /// `Authorization: <name>=<token>`
    pub fn authorization(self, name: &str, token: &str) -> Self {
        self.header("authorization", &format!("{name}={token}"))
    }

    pub fn cookie(mut self, name: &str, value: &str) -> Self {
        self.cookies.push((name.to_string(), value.to_string()));
        self
    }

    pub fn query(mut self, name: &str, value: &str) -> Self {
        self.query.push((name.to_string(), value.to_string()));
        self
    }

    /// Client address as reported by a fronting proxy.
    pub fn real_ip(self, addr: &str) -> Self {
        self.header("x-real-ip", addr)
    }

    pub fn build(self) -> Request<Body> {
        let mut uri = self.path;
        if !self.query.is_empty() {
            let pairs: Vec<String> = self
                .query
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect();
            uri.push('?');
            uri.push_str(&pairs.join("&"));
        }

        let mut builder = Request::builder().method(self.method).uri(uri);
        for (name, value) in &self.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !self.cookies.is_empty() {
            let cookie: Vec<String> = self
                .cookies
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect();
            builder = builder.header("cookie", cookie.join("; "));
        }
        builder
            .body(Body::empty())
            .expect("test request should be well formed")
    }
}
