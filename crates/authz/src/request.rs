//! Request abstraction consumed by the validator.
//!
//! The validator only needs read access to a handful of request facts.
//! [`RequestContext`] is implemented for `axum::http::Request<B>` so a host
//! middleware can pass its request straight through.

use axum::extract::{ConnectInfo, Query};
use axum::http::{header, Request};
use std::collections::HashMap;
use std::net::SocketAddr;

/// Read-only view of an inbound HTTP request.
pub trait RequestContext {
    fn method(&self) -> &str;

    /// URL path without the query string.
    fn path(&self) -> &str;

    /// First value of a header, if present and valid UTF-8. Names are
    /// case-insensitive.
    fn header(&self, name: &str) -> Option<&str>;

    fn cookie(&self, name: &str) -> Option<String>;

    fn query(&self, name: &str) -> Option<String>;

    /// Best-effort client address used for `addr` claim checks.
    fn source_address(&self) -> Option<String>;
}

/// Find a cookie in a `Cookie` header value (`a=1; b=2`).
pub(crate) fn find_cookie<'a>(cookie_header: &'a str, name: &str) -> Option<&'a str> {
    cookie_header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.trim_matches('"'))
}

impl<B> RequestContext for Request<B> {
    fn method(&self) -> &str {
        Request::method(self).as_str()
    }

    fn path(&self) -> &str {
        self.uri().path()
    }

    fn header(&self, name: &str) -> Option<&str> {
        self.headers().get(name).and_then(|v| v.to_str().ok())
    }

    fn cookie(&self, name: &str) -> Option<String> {
        self.headers()
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find_map(|v| find_cookie(v, name))
            .map(ToString::to_string)
    }

    fn query(&self, name: &str) -> Option<String> {
        let Query(mut params) = Query::<HashMap<String, String>>::try_from_uri(self.uri()).ok()?;
        params.remove(name)
    }

    fn source_address(&self) -> Option<String> {
        let real_ip = RequestContext::header(self, "x-real-ip")
            .map(str::trim)
            .filter(|v| !v.is_empty());
        let forwarded = || {
            RequestContext::header(self, "x-forwarded-for")
                .and_then(|v| v.split(',').next())
                .map(str::trim)
                .filter(|v| !v.is_empty())
        };

        real_ip
            .or_else(forwarded)
            .map(ToString::to_string)
            .or_else(|| {
                self.extensions()
                    .get::<ConnectInfo<SocketAddr>>()
                    .map(|ConnectInfo(addr)| addr.ip().to_string())
            })
    }
}
