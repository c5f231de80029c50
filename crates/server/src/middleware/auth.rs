use axum::{
    Json,
    body::Body,
    extract::Request,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use emr_core::Envelope;

/// Header carrying the shared API key
pub const API_KEY_HEADER: &str = "X-API-Key";

/// API Key authentication state
#[derive(Clone)]
pub struct ApiKeyAuth {
    api_key: Option<String>,
}

impl ApiKeyAuth {
    pub fn new(api_key: Option<String>) -> Self {
        Self { api_key }
    }

    /// Whether the request headers satisfy the configured key.
    /// Everything passes when no key is configured.
    fn allows(&self, headers: &HeaderMap) -> bool {
        let Some(expected) = &self.api_key else {
            return true;
        };
        headers
            .get(API_KEY_HEADER)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|provided| provided == expected)
    }
}

/// Reject requests without a valid `X-API-Key`
pub async fn auth_middleware(request: Request<Body>, next: Next) -> Response {
    let allowed = request
        .extensions()
        .get::<ApiKeyAuth>()
        .is_none_or(|auth| auth.allows(request.headers()));

    if !allowed {
        tracing::warn!(path = %request.uri().path(), "Rejected request with missing or invalid API key");
        return (
            StatusCode::UNAUTHORIZED,
            Json(Envelope::error("Missing or invalid API key")),
        )
            .into_response();
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn open_when_no_key_configured() {
        assert!(ApiKeyAuth::new(None).allows(&HeaderMap::new()));
    }

    #[test]
    fn checks_header_value() {
        let auth = ApiKeyAuth::new(Some("secret".into()));
        let mut headers = HeaderMap::new();
        assert!(!auth.allows(&headers));

        headers.insert(API_KEY_HEADER, HeaderValue::from_static("wrong"));
        assert!(!auth.allows(&headers));

        headers.insert(API_KEY_HEADER, HeaderValue::from_static("secret"));
        assert!(auth.allows(&headers));
    }
}
