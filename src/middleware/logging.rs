use axum::{
    extract::Request,
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

tokio::task_local! {
    static REQUEST_ID: String;
}

/// The id of the request being served, when called from inside
/// [`logging_middleware`]. Error bodies carry it so they match the header.
pub fn current_request_id() -> Option<String> {
    REQUEST_ID.try_with(|id| id.clone()).ok()
}

/// Tags each request with an `x-request-id` (kept if the client sent a
/// usable one) and logs its start and completion.
pub async fn logging_middleware(mut request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let uri = request.uri().clone();
    let version = request.version();

    let incoming = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .filter(|value| is_usable_request_id(value))
        .cloned();

    let request_id = match incoming {
        Some(value) => value,
        None => {
            let generated = HeaderValue::from_str(&Uuid::new_v4().to_string())
                .unwrap_or_else(|_| HeaderValue::from_static("unknown"));
            request.headers_mut().insert(REQUEST_ID_HEADER, generated.clone());
            generated
        }
    };
    let request_id_str = request_id.to_str().unwrap_or("unknown").to_string();

    tracing::info!(
        request_id = %request_id_str,
        method = %method,
        uri = %uri,
        version = ?version,
        "Request started"
    );

    let mut response = REQUEST_ID.scope(request_id_str.clone(), next.run(request)).await;

    let duration = start.elapsed();
    let status = response.status();

    tracing::info!(
        request_id = %request_id_str,
        method = %method,
        uri = %uri,
        status = %status,
        duration_ms = %duration.as_millis(),
        "Request completed"
    );

    response.headers_mut().insert(REQUEST_ID_HEADER, request_id);
    response
}

fn is_usable_request_id(value: &HeaderValue) -> bool {
    value
        .to_str()
        .map(|s| !s.is_empty() && s.len() <= 64 && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-'))
        .unwrap_or(false)
}
