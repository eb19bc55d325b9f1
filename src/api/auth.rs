//! HTTP basic authentication
//!
//! Active only when credentials are configured. `OPTIONS` requests always
//! pass so CORS preflights work without credentials.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::sync::Arc;

use crate::api::error::ApiError;
use crate::api::state::AppState;

/// Middleware rejecting requests without the configured credentials
pub async fn require_basic_auth(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    let Some((user, password)) = state.config.credentials.as_ref() else {
        return next.run(request).await;
    };

    if request.method() == Method::OPTIONS || check_credentials(request.headers(), user, password) {
        return next.run(request).await;
    }

    tracing::warn!(uri = %request.uri(), "Rejected request with missing or wrong credentials");
    ApiError::Unauthorized.into_response()
}

/// Whether the `Authorization` header carries exactly these credentials
fn check_credentials(headers: &HeaderMap, user: &str, password: &str) -> bool {
    decode_basic(headers).map_or(false, |(u, p)| u == user && p == password)
}

fn decode_basic(headers: &HeaderMap) -> Option<(String, String)> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, encoded) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }

    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let text = String::from_utf8(decoded).ok()?;
    let (user, password) = text.split_once(':')?;
    Some((user.to_string(), password.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn test_decode_basic() {
        let encoded = STANDARD.encode("admin:s3cr:et");
        let decoded = decode_basic(&headers(&format!("Basic {}", encoded)));
        assert_eq!(decoded, Some(("admin".to_string(), "s3cr:et".to_string())));

        assert_eq!(decode_basic(&HeaderMap::new()), None);
        assert_eq!(decode_basic(&headers("Basic")), None);
        assert_eq!(decode_basic(&headers("Basic !!!")), None);
        assert_eq!(decode_basic(&headers(&format!("Bearer {}", encoded))), None);
        assert_eq!(
            decode_basic(&headers(&format!("Basic {}", STANDARD.encode("nocolon")))),
            None
        );
    }

    #[test]
    fn test_check_credentials() {
        let good = headers(&format!("basic {}", STANDARD.encode("admin:secret")));
        assert!(check_credentials(&good, "admin", "secret"));
        assert!(!check_credentials(&good, "admin", "other"));
        assert!(!check_credentials(&good, "root", "secret"));
    }
}
