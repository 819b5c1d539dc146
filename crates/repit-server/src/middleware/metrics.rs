//! Request metrics middleware
//!
//! Records count, latency and errors per method and matched route pattern.
//! The pattern (`/api/v1/students/{id}`) is used instead of the raw path so
//! ids do not explode label cardinality.

use actix_web::Error;
use actix_web::body::MessageBody;
use actix_web::dev::{ServiceRequest, ServiceResponse};
use actix_web::middleware::Next;

use crate::metrics::{Timer, record_http_request};

pub async fn track_requests(
    req: ServiceRequest,
    next: Next<impl MessageBody>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    let timer = Timer::new();
    let method = req.method().to_string();

    let res = next.call(req).await?;

    let path = res
        .request()
        .match_pattern()
        .unwrap_or_else(|| "unmatched".to_string());
    record_http_request(&method, &path, res.status().as_u16(), timer.elapsed_secs());
    Ok(res)
}
