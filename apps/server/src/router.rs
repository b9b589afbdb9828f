use axum::Router;
use axum::body::Body;
use axum::http::{HeaderName, HeaderValue, Request};
use parley::kernel::safe_nanoid;
use parley::kernel::server::{ApiState, REQUEST_ID_HEADER};
use parley::server::router::{discussion_router, system_router};
use tower_http::request_id::{
    MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;
use utoipa_scalar::{Scalar, Servable};

#[derive(OpenApi)]
struct ApiDoc;

/// Request ids for callers that do not send their own.
#[derive(Debug, Clone, Copy, Default)]
struct NanoRequestId;

impl MakeRequestId for NanoRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        HeaderValue::from_str(&safe_nanoid!()).ok().map(RequestId::new)
    }
}

#[allow(unreachable_pub)]
pub fn init(state: ApiState) -> Router {
    let api = ApiDoc::openapi();
    let request_id = HeaderName::from_static(REQUEST_ID_HEADER);

    let trace = TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
        let request_id = request
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default();
        tracing::info_span!(
            "request",
            method = %request.method(),
            uri = %request.uri(),
            request_id,
        )
    });

    // The last layer is outermost, so the id is set before the span opens.
    let (openapi_routes, api_doc) = OpenApiRouter::with_openapi(api)
        .merge(system_router())
        .merge(discussion_router())
        .layer(PropagateRequestIdLayer::new(request_id.clone()))
        .layer(trace)
        .layer(SetRequestIdLayer::new(request_id, NanoRequestId))
        .with_state(state)
        .split_for_parts();

    let scalar_routes = Scalar::with_url("/api", api_doc);

    Router::new().merge(openapi_routes).merge(scalar_routes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use parley::domain::config::ApiConfig;
    use parley_database::Database;
    use parley_events::SubscriptionRegistry;
    use tower::ServiceExt;

    async fn app() -> Router {
        let config = ApiConfig::default();
        let database = Database::builder().memory().init().await.unwrap();
        let subscriptions = SubscriptionRegistry::default();
        let slices = parley::init(&config, &database, &subscriptions).unwrap();
        let state = ApiState::builder()
            .config(config)
            .db(database)
            .subscriptions(subscriptions)
            .register_slices(slices)
            .build()
            .unwrap();
        init(state)
    }

    #[tokio::test]
    async fn responses_carry_a_request_id() {
        let response = app()
            .await
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let id = response.headers()[REQUEST_ID_HEADER].to_str().unwrap();
        assert_eq!(id.len(), 12);
    }

    #[tokio::test]
    async fn caller_request_id_is_kept() {
        let request = Request::builder()
            .uri("/posts/1")
            .header(REQUEST_ID_HEADER, "caller-id")
            .body(Body::empty())
            .unwrap();
        let response = app().await.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.headers()[REQUEST_ID_HEADER], "caller-id");
    }

    #[tokio::test]
    async fn api_reference_is_served() {
        let response = app()
            .await
            .oneshot(Request::builder().uri("/api").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
