//! axum integration.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;

use crate::middleware::EarlyHints;

/// Middleware function for `axum::middleware::from_fn_with_state`.
///
/// ```ignore
/// let app = Router::new()
///     .fallback_service(ServeDir::new("public"))
///     .layer(axum::middleware::from_fn_with_state(hints, early_hints));
/// ```
pub async fn early_hints(State(hints): State<EarlyHints>, request: Request, next: Next) -> Response {
    hints.handle(request, |request| next.run(request)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::routing::get;
    use early_hints_core::HintsConfig;

    fn assert_send_middleware<F, Fut>(_: F)
    where
        F: Fn(State<EarlyHints>, Request, Next) -> Fut,
        Fut: std::future::Future<Output = Response> + Send,
    {
    }

    #[test]
    fn test_early_hints_future_is_send() {
        assert_send_middleware(early_hints);
    }

    #[test]
    fn test_layer_mounts_on_router() {
        let hints = EarlyHints::builder(HintsConfig::default()).build();
        let _app: Router = Router::new()
            .route("/", get(|| async { "ok" }))
            .layer(axum::middleware::from_fn_with_state(hints, early_hints));
    }
}
