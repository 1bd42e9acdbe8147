use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};

use super::gate::is_admin_path;

const SECURITY_HEADERS: [(&str, &str); 5] = [
    ("x-content-type-options", "nosniff"),
    ("x-frame-options", "DENY"),
    ("x-xss-protection", "1; mode=block"),
    ("referrer-policy", "strict-origin-when-cross-origin"),
    (
        "permissions-policy",
        "camera=(), microphone=(), geolocation=()",
    ),
];

const ADMIN_CONTENT_SECURITY_POLICY: &str = "default-src 'self'; \
    script-src 'self' 'unsafe-inline' 'unsafe-eval'; \
    style-src 'self' 'unsafe-inline'; \
    img-src 'self' data: https:; \
    font-src 'self'; \
    connect-src 'self'; \
    frame-ancestors 'none'";

/// Stamp hardening headers on every response, plus a CSP under `/admin`.
pub async fn security_headers(request: Request, next: Next) -> Response {
    let admin = is_admin_path(request.uri().path());
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    for (name, value) in SECURITY_HEADERS {
        headers.insert(
            HeaderName::from_static(name),
            HeaderValue::from_static(value),
        );
    }

    if admin {
        headers.insert(
            HeaderName::from_static("content-security-policy"),
            HeaderValue::from_static(ADMIN_CONTENT_SECURITY_POLICY),
        );
    }

    response
}
