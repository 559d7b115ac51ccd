use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

/// Access log: one line per request once the response head is ready.
/// For streamed replies the latency covers time-to-first-byte, not the whole stream.
pub async fn monitor_middleware(request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let uri = request.uri().to_string();

    if uri == "/healthz" {
        return next.run(request).await;
    }

    let start = Instant::now();
    let response = next.run(request).await;
    let duration = start.elapsed().as_millis();
    let status = response.status();

    if status.is_server_error() {
        tracing::warn!("{} {} -> {} ({}ms)", method, uri, status.as_u16(), duration);
    } else {
        tracing::info!("{} {} -> {} ({}ms)", method, uri, status.as_u16(), duration);
    }

    response
}
