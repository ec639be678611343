//! Request tracing middleware with correlation IDs.
//!
//! Every request runs inside an `http_request` span carrying its correlation
//! id, so authorization denials and validation failures logged by the
//! services can be tied back to the request that caused them.

use axum::{
    extract::Request,
    http::{header::HeaderValue, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::Instrument;
use uuid::Uuid;

/// The header name for correlation IDs.
pub const CORRELATION_ID_HEADER: &str = "X-Correlation-ID";

/// W3C Trace Context header.
const TRACEPARENT_HEADER: &str = "traceparent";

/// Longest client-supplied correlation id that is accepted as-is.
const MAX_CORRELATION_ID_LEN: usize = 128;

/// Extension that holds the correlation ID for the current request.
#[derive(Debug, Clone)]
pub struct CorrelationId(pub String);

impl CorrelationId {
    pub fn new(id: String) -> Self {
        Self(id)
    }

    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Accept a client-supplied id only if it is short and printable.
    fn from_header(value: &str) -> Option<Self> {
        let value = value.trim();
        let acceptable = !value.is_empty()
            && value.len() <= MAX_CORRELATION_ID_LEN
            && value.chars().all(|c| c.is_ascii_graphic());
        acceptable.then(|| Self::new(value.to_string()))
    }

    /// Pick the id for a request from its headers, generating one if needed.
    fn from_headers(headers: &HeaderMap) -> Self {
        header_str(headers, CORRELATION_ID_HEADER)
            .and_then(Self::from_header)
            .or_else(|| {
                header_str(headers, TRACEPARENT_HEADER)
                    .and_then(|tp| tp.split('-').nth(1))
                    .and_then(Self::from_header)
            })
            .unwrap_or_else(Self::generate)
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|h| h.to_str().ok())
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Correlation ID middleware.
///
/// Priority for the correlation ID:
/// 1. a well-formed `X-Correlation-ID` header
/// 2. the trace id of a W3C `traceparent` header (version-traceid-parentid-flags)
/// 3. a new UUID
///
/// The chosen id is echoed on the response.
pub async fn correlation_id_middleware(mut request: Request, next: Next) -> Response {
    let correlation_id = CorrelationId::from_headers(request.headers());

    let method = request.method().clone();
    let uri = request.uri().path().to_string();

    request.extensions_mut().insert(correlation_id.clone());

    let span = tracing::info_span!(
        "http_request",
        correlation_id = %correlation_id,
        method = %method,
        uri = %uri,
    );

    async move {
        let mut response = next.run(request).await;

        if let Ok(value) = HeaderValue::from_str(correlation_id.as_str()) {
            response.headers_mut().insert(CORRELATION_ID_HEADER, value);
        }

        tracing::info!(status = %response.status().as_u16(), "Request completed");

        response
    }
    .instrument(span)
    .await
}
