//! Demo endpoints on either side of the quota gate.

use actix_web::HttpResponse;
use quota_shared::ApiResponse;
use quota_shared::dto::GreetingResponse;

/// GET /v1/secure
pub async fn secure() -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse::ok(GreetingResponse {
        message: "Hello, Secure User".to_string(),
    }))
}

/// GET /v2/open
pub async fn open() -> HttpResponse {
    HttpResponse::Ok().json(ApiResponse::ok(GreetingResponse {
        message: "Hello, Open User".to_string(),
    }))
}
