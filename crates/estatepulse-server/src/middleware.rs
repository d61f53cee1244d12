use axum::{extract::Request, http::HeaderValue, middleware::Next, response::Response};
use uuid::Uuid;

/// Client-supplied ids longer than this are replaced with a fresh one.
const MAX_REQUEST_ID_LEN: usize = 128;

/// Newtype wrapping a request ID string, stored as a request extension.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Tags every request with an id, echoed back in the `x-request-id` header.
///
/// A well-formed incoming `x-request-id` is reused so callers can correlate
/// logs across services; otherwise a v4 UUID is generated.
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .and_then(accept_client_id)
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);

    req.extensions_mut().insert(RequestId(id.clone()));

    let mut res = next.run(req).await;

    if let Ok(val) = HeaderValue::from_str(&id) {
        res.headers_mut().insert("x-request-id", val);
    }

    res
}

fn accept_client_id(raw: &str) -> Option<&str> {
    let id = raw.trim();
    let well_formed = !id.is_empty()
        && id.len() <= MAX_REQUEST_ID_LEN
        && id.chars().all(|c| c.is_ascii_graphic());
    well_formed.then_some(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, routing::get, Extension, Router};
    use tower::ServiceExt;

    fn echo_app() -> Router {
        Router::new()
            .route(
                "/",
                get(|Extension(id): Extension<RequestId>| async move { id.0 }),
            )
            .layer(axum::middleware::from_fn(request_id))
    }

    #[test]
    fn accept_client_id_rejects_blank_and_oversized_values() {
        assert_eq!(accept_client_id("  abc-123 "), Some("abc-123"));
        assert_eq!(accept_client_id("   "), None);
        assert_eq!(accept_client_id("has space"), None);
        assert_eq!(accept_client_id(&"a".repeat(MAX_REQUEST_ID_LEN + 1)), None);
    }

    #[tokio::test]
    async fn incoming_request_id_is_reused() {
        let response = echo_app()
            .oneshot(
                axum::http::Request::builder()
                    .uri("/")
                    .header("x-request-id", "trace-42")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        assert_eq!(
            response.headers().get("x-request-id").map(HeaderValue::as_bytes),
            Some(b"trace-42".as_slice())
        );
    }

    #[tokio::test]
    async fn missing_request_id_gets_a_uuid() {
        let response = echo_app()
            .oneshot(
                axum::http::Request::builder()
                    .uri("/")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");

        let id = response
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .expect("x-request-id header");
        assert!(Uuid::parse_str(id).is_ok());
    }
}
