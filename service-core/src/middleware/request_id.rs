use axum::http::HeaderValue;
use axum::{extract::Request, middleware::Next, response::Response};
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

// Inbound ids longer than this are treated as absent; the cap keeps log
// fields and response headers from carrying attacker-sized values.
const MAX_INBOUND_ID_LEN: usize = 64;

/// Correlation id for one request, available to handlers via extensions.
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

fn inbound_id(req: &Request) -> Option<String> {
    let value = req.headers().get(REQUEST_ID_HEADER)?.to_str().ok()?;
    if value.is_empty() || value.len() > MAX_INBOUND_ID_LEN {
        return None;
    }
    Some(value.to_string())
}

/// Reuses a well-formed inbound `x-request-id` or mints a UUID, then echoes
/// the id on the request (for downstream layers) and the response.
pub async fn request_id_middleware(mut req: Request, next: Next) -> Response {
    let id = inbound_id(&req).unwrap_or_else(|| Uuid::new_v4().to_string());

    if let Ok(header_value) = HeaderValue::from_str(&id) {
        req.headers_mut().insert(REQUEST_ID_HEADER, header_value);
    }
    req.extensions_mut().insert(RequestId(id.clone()));

    let mut response = next.run(req).await;

    if let Ok(header_value) = HeaderValue::from_str(&id) {
        response
            .headers_mut()
            .insert(REQUEST_ID_HEADER, header_value);
    }

    response
}
