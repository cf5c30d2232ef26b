//! Per-request data the decorator needs: where the request arrived and what it addressed.

use http::{HeaderMap, Uri, header};

const X_FORWARDED_PROTO: &str = "x-forwarded-proto";
const X_FORWARDED_HOST: &str = "x-forwarded-host";

/// Origin of the inbound request plus its path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    base_url: String,
    instance: Option<String>,
}

impl RequestContext {
    /// Context with an explicit `scheme://authority` base.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url: String = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            instance: None,
        }
    }

    #[must_use]
    pub fn with_instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = Some(instance.into());
        self
    }

    /// Derive the context from request head data.
    ///
    /// Scheme: `X-Forwarded-Proto`, then the URI scheme, then `http`.
    /// Authority: `X-Forwarded-Host`, then the URI authority, then `Host`.
    #[must_use]
    pub fn from_request_head(uri: &Uri, headers: &HeaderMap) -> Self {
        let scheme = first_header_value(headers, X_FORWARDED_PROTO)
            .or_else(|| uri.scheme_str())
            .unwrap_or("http");

        let authority = first_header_value(headers, X_FORWARDED_HOST)
            .or_else(|| uri.authority().map(http::uri::Authority::as_str))
            .or_else(|| first_header_value(headers, header::HOST.as_str()))
            .unwrap_or("localhost");

        Self {
            base_url: format!("{scheme}://{authority}"),
            instance: Some(uri.path().to_owned()),
        }
    }

    #[must_use]
    pub fn from_parts(parts: &http::request::Parts) -> Self {
        Self::from_request_head(&parts.uri, &parts.headers)
    }

    /// `scheme://authority` of the request, without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn instance(&self) -> Option<&str> {
        self.instance.as_deref()
    }
}

/// First comma-separated element of a header, trimmed.
fn first_header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use http::HeaderValue;

    #[test]
    fn uses_host_header_for_origin_form_uri() {
        let uri: Uri = "/users/7?expand=true".parse().unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("api.example.com:8443"));

        let ctx = RequestContext::from_request_head(&uri, &headers);
        assert_eq!(ctx.base_url(), "http://api.example.com:8443");
        assert_eq!(ctx.instance(), Some("/users/7"));
    }

    #[test]
    fn absolute_uri_supplies_scheme_and_authority() {
        let uri: Uri = "https://svc.internal/orders".parse().unwrap();
        let ctx = RequestContext::from_request_head(&uri, &HeaderMap::new());
        assert_eq!(ctx.base_url(), "https://svc.internal");
    }

    #[test]
    fn forwarded_headers_reflect_the_proxy() {
        let uri: Uri = "/orders".parse().unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("10.0.0.5:8080"));
        headers.insert(X_FORWARDED_PROTO, HeaderValue::from_static("https, http"));
        headers.insert(X_FORWARDED_HOST, HeaderValue::from_static("shop.example.com"));

        let ctx = RequestContext::from_request_head(&uri, &headers);
        assert_eq!(ctx.base_url(), "https://shop.example.com");
    }

    #[test]
    fn missing_origin_defaults_to_localhost() {
        let uri: Uri = "/x".parse().unwrap();
        let ctx = RequestContext::from_request_head(&uri, &HeaderMap::new());
        assert_eq!(ctx.base_url(), "http://localhost");
    }

    #[test]
    fn explicit_base_is_normalized() {
        let ctx = RequestContext::new("https://api.example.com/").with_instance("/a");
        assert_eq!(ctx.base_url(), "https://api.example.com");
        assert_eq!(ctx.instance(), Some("/a"));
    }
}
