use actix_web::{HttpResponse, Responder, Scope, get, web};
use serde::Serialize;
use tracing::warn;

use crate::error::SERVICE_UNAVAILABLE;
use crate::model::common::AppState;
use crate::model::response::Result;

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: String,
    pub storage_mode: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[get("/liveness")]
async fn liveness() -> web::Json<Result<String>> {
    web::Json(Result::<String>::success("ok".to_string()))
}

#[get("")]
async fn health_check(data: web::Data<AppState>) -> impl Responder {
    let storage_mode = data.persistence.storage_mode().to_string();
    let version = data.configuration.version();

    match data.persistence.health_check().await {
        Ok(()) => Result::<()>::http_success(HealthStatus {
            status: "healthy".to_string(),
            storage_mode,
            version,
            message: None,
        }),
        Err(e) => {
            warn!(storage_mode = %storage_mode, "Health check failed: {}", e);
            Result::<()>::http_response(
                503,
                SERVICE_UNAVAILABLE.code,
                SERVICE_UNAVAILABLE.message.to_string(),
                HealthStatus {
                    status: "unhealthy".to_string(),
                    storage_mode,
                    version,
                    message: Some(e.to_string()),
                },
            )
        }
    }
}

/// Prometheus scrape output, mounted at the server root
#[get("/metrics")]
pub async fn metrics_endpoint(data: web::Data<AppState>) -> HttpResponse {
    match &data.prometheus {
        Some(handle) => HttpResponse::Ok()
            .content_type("text/plain; version=0.0.4")
            .body(handle.render()),
        None => HttpResponse::ServiceUnavailable()
            .content_type("text/plain")
            .body("metrics recorder not installed"),
    }
}

pub fn routes() -> Scope {
    web::scope("/health")
        .service(health_check)
        .service(liveness)
}
