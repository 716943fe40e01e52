//! Rate limiting middleware - runs the request gate in front of every route.

use actix_web::{
    Error, HttpResponse,
    body::EitherBody,
    dev::{Service, ServiceRequest, ServiceResponse, Transform, forward_ready},
    http::{
        StatusCode,
        header::{HeaderName, HeaderValue},
    },
};
use quota_shared::ErrorResponse;
use std::future::{Future, Ready, ready};
use std::pin::Pin;
use std::rc::Rc;
use std::sync::Arc;

use quota_core::QuotaError;
use quota_core::domain::Decision;
use quota_core::services::{CLIENT_ID_HEADER, RequestGate};

/// Header reporting tokens left after an admitted or rejected request.
pub const REMAINING_HEADER: &str = "X-RateLimit-Remaining";

/// Rate limiting middleware factory.
pub struct RateLimitMiddleware {
    gate: Arc<RequestGate>,
}

impl RateLimitMiddleware {
    pub fn new(gate: Arc<RequestGate>) -> Self {
        Self { gate }
    }
}

impl<S, B> Transform<S, ServiceRequest> for RateLimitMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = RateLimitMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RateLimitMiddlewareService {
            service: Rc::new(service),
            gate: self.gate.clone(),
        }))
    }
}

pub struct RateLimitMiddlewareService<S> {
    service: Rc<S>,
    gate: Arc<RequestGate>,
}

impl<S, B> Service<ServiceRequest> for RateLimitMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>>>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let gate = self.gate.clone();

        Box::pin(async move {
            // Classify on the percent-decoded path the router matches, not the raw URI.
            let path = req.match_info().as_str().to_string();
            // A header that is not valid UTF-8 counts as missing.
            let client_id = req
                .headers()
                .get(CLIENT_ID_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(String::from);

            // The request is held until the gate answers; nothing is forwarded speculatively.
            let rejection = match gate.decide(&path, client_id.as_deref()).await {
                Ok(Decision::Forward { remaining }) => {
                    let mut res = service.call(req).await?;
                    if let Some(remaining) = remaining {
                        res.headers_mut().insert(
                            HeaderName::from_static("x-ratelimit-remaining"),
                            HeaderValue::from(remaining),
                        );
                    }
                    return Ok(res.map_into_left_body());
                }
                Ok(Decision::RejectMissingIdentity) => {
                    HttpResponse::Forbidden().json(ErrorResponse::forbidden().with_detail(
                        format!("The {} header is required on this path.", CLIENT_ID_HEADER),
                    ))
                }
                Ok(Decision::RejectOverLimit { retry_after }) => {
                    let retry_secs = retry_after.as_millis().div_ceil(1000).to_string();
                    let mut error = ErrorResponse::too_many_requests().with_detail(format!(
                        "Rate limit exceeded. Try again in {} seconds.",
                        retry_secs
                    ));
                    if let Some(client_id) = client_id.as_deref() {
                        error = error.with_client_id(client_id.trim());
                    }
                    HttpResponse::TooManyRequests()
                        .insert_header((REMAINING_HEADER, "0"))
                        .insert_header(("Retry-After", retry_secs))
                        .json(error)
                }
                Err(err) => error_response(&err),
            };

            let (http_req, _payload) = req.into_parts();
            Ok(ServiceResponse::new(http_req, rejection).map_into_right_body())
        })
    }
}

/// Map a gate failure to its HTTP response. Every path is logged.
fn error_response(err: &QuotaError) -> HttpResponse {
    let (status, body) = match err {
        QuotaError::PolicyNotFound { client_id } => {
            tracing::warn!(client_id = %client_id, "Rejecting unknown client");
            (
                StatusCode::FORBIDDEN,
                ErrorResponse::forbidden()
                    .with_detail("Unknown client.")
                    .with_client_id(client_id.clone()),
            )
        }
        QuotaError::BackendUnavailable(reason) => {
            tracing::error!(error = %reason, "Quota backend unavailable, rejecting request");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorResponse::service_unavailable()
                    .with_detail("Rate limiting backend unavailable."),
            )
        }
        QuotaError::InvalidPolicy { client_id, reason } => {
            tracing::error!(client_id = %client_id, reason = %reason, "Invalid quota policy");
            (StatusCode::INTERNAL_SERVER_ERROR, ErrorResponse::internal_error())
        }
    };

    HttpResponse::build(status).json(body)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use actix_web::{App, http::header::CONTENT_TYPE, test, web};
    use quota_core::ports::BucketStore;
    use quota_core::services::{FailureMode, GateConfig};
    use quota_infra::{InMemoryBucketStore, InMemoryPolicyStore};

    use super::*;
    use crate::config::RateLimitConfig;
    use crate::handlers;
    use crate::state::{AppState, Backends};

    const BACKENDS: Backends = Backends {
        bucket_store: "memory",
        policy_store: "memory",
    };

    async fn state_with(
        bucket_store: Arc<dyn BucketStore>,
        failure_mode: FailureMode,
    ) -> AppState {
        let policies = InMemoryPolicyStore::new(Duration::from_secs(60));
        policies.upsert("1", 5).await;
        policies.upsert("9", 0).await;

        let config = RateLimitConfig {
            gate: GateConfig {
                gated_prefixes: vec!["/v1".to_string()],
                failure_mode,
            },
            backend_timeout: Duration::from_millis(200),
            ..RateLimitConfig::default()
        };
        AppState::from_parts(Arc::new(policies), bucket_store, &config, BACKENDS)
    }

    async fn default_state() -> AppState {
        state_with(Arc::new(InMemoryBucketStore::new()), FailureMode::Closed).await
    }

    macro_rules! app {
        ($state:expr) => {{
            let state = $state;
            test::init_service(
                App::new()
                    .wrap(RateLimitMiddleware::new(state.gate.clone()))
                    .app_data(web::Data::new(state))
                    .configure(handlers::configure_routes),
            )
            .await
        }};
    }

    fn get(path: &str, client_id: Option<&str>) -> test::TestRequest {
        let req = test::TestRequest::get().uri(path);
        match client_id {
            Some(id) => req.insert_header((CLIENT_ID_HEADER, id)),
            None => req,
        }
    }

    struct Unreachable;

    #[async_trait::async_trait]
    impl BucketStore for Unreachable {
        async fn try_consume(
            &self,
            _key: &str,
            _config: &quota_core::domain::BucketConfiguration,
            _tokens: u64,
        ) -> Result<quota_core::domain::ConsumeOutcome, QuotaError> {
            Err(QuotaError::BackendUnavailable("connection refused".to_string()))
        }
    }

    #[actix_web::test]
    async fn test_end_to_end_quota_scenario() {
        let app = app!(default_state().await);

        for i in 0..5 {
            let res = test::call_service(&app, get("/v1/secure", Some("1")).to_request()).await;
            assert_eq!(res.status(), StatusCode::OK, "request {} should pass", i + 1);
            assert_eq!(
                res.headers().get(REMAINING_HEADER).unwrap(),
                &(4 - i).to_string()
            );
        }

        let res = test::call_service(&app, get("/v1/secure", Some("1")).to_request()).await;
        assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(res.headers().get(CONTENT_TYPE).unwrap(), "application/json");
        assert!(res.headers().contains_key("Retry-After"));
        assert_eq!(res.headers().get(REMAINING_HEADER).unwrap(), "0");

        let res = test::call_service(&app, get("/v2/open", None).to_request()).await;
        assert_eq!(res.status(), StatusCode::OK);

        let res = test::call_service(&app, get("/v1/secure", None).to_request()).await;
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
        assert_eq!(res.headers().get(CONTENT_TYPE).unwrap(), "application/json");
    }

    #[actix_web::test]
    async fn test_percent_encoded_prefix_is_still_gated() {
        let app = app!(default_state().await);

        // `%76` decodes to `v`, so this routes to /v1/secure.
        let res = test::call_service(&app, get("/%761/secure", None).to_request()).await;
        assert_eq!(res.status(), StatusCode::FORBIDDEN);

        for i in 0..5 {
            let res = test::call_service(&app, get("/%761/secure", Some("1")).to_request()).await;
            assert_eq!(res.status(), StatusCode::OK);
            assert_eq!(
                res.headers().get(REMAINING_HEADER).unwrap(),
                &(4 - i).to_string()
            );
        }

        let res = test::call_service(&app, get("/%761/secure", Some("1")).to_request()).await;
        assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
        let res = test::call_service(&app, get("/v1/secure", Some("1")).to_request()).await;
        assert_eq!(res.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[actix_web::test]
    async fn test_open_route_ignores_exhausted_quota() {
        let app = app!(default_state().await);

        for _ in 0..6 {
            test::call_service(&app, get("/v1/secure", Some("1")).to_request()).await;
        }
        let res = test::call_service(&app, get("/v2/open", Some("1")).to_request()).await;
        assert_eq!(res.status(), StatusCode::OK);
        assert!(!res.headers().contains_key(REMAINING_HEADER));
    }

    #[actix_web::test]
    async fn test_blank_identity_is_forbidden() {
        let app = app!(default_state().await);

        let res = test::call_service(&app, get("/v1/secure", Some("  ")).to_request()).await;
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }

    #[actix_web::test]
    async fn test_unknown_client_is_forbidden() {
        let app = app!(default_state().await);

        let res = test::call_service(&app, get("/v1/secure", Some("404")).to_request()).await;
        assert_eq!(res.status(), StatusCode::FORBIDDEN);

        let body: serde_json::Value = test::read_body_json(res).await;
        assert_eq!(body["detail"], "Unknown client.");
        assert_eq!(body["client_id"], "404");
    }

    #[actix_web::test]
    async fn test_invalid_policy_is_internal_error() {
        let app = app!(default_state().await);

        let res = test::call_service(&app, get("/v1/secure", Some("9")).to_request()).await;
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[actix_web::test]
    async fn test_backend_down_fails_closed() {
        let app = app!(state_with(Arc::new(Unreachable), FailureMode::Closed).await);

        let res = test::call_service(&app, get("/v1/secure", Some("1")).to_request()).await;
        assert_eq!(res.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[actix_web::test]
    async fn test_backend_down_fails_open_when_configured() {
        let app = app!(state_with(Arc::new(Unreachable), FailureMode::Open).await);

        let res = test::call_service(&app, get("/v1/secure", Some("1")).to_request()).await;
        assert_eq!(res.status(), StatusCode::OK);
    }
}
