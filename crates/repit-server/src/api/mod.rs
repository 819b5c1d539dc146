//! REST API under `/api/v1`

use actix_web::{Scope, error::InternalError, web};

use repit_common::{API_PREFIX, RepitError};

use crate::error::AppError;

pub mod achievement;
pub mod analytics;
pub mod gamification;
pub mod health;
pub mod model;
pub mod progress;
pub mod student;

pub type HandlerResult = Result<actix_web::HttpResponse, AppError>;

/// All versioned routes
pub fn routes() -> Scope {
    web::scope(API_PREFIX)
        .service(health::routes())
        .service(student::routes())
        .service(achievement::routes())
        .service(gamification::routes())
        .service(analytics::routes())
}

/// Malformed JSON bodies answer with the 400 envelope
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        let response = actix_web::ResponseError::error_response(&AppError::from(
            RepitError::IllegalArgument(err.to_string()),
        ));
        InternalError::from_response(err, response).into()
    })
}

/// Malformed query strings answer with the 400 envelope
pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _req| {
        let response = actix_web::ResponseError::error_response(&AppError::from(
            RepitError::IllegalArgument(err.to_string()),
        ));
        InternalError::from_response(err, response).into()
    })
}
