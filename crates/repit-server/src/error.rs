// Error mapping for the REST API
// Translates service errors into status codes and response envelopes

use std::fmt::{Display, Formatter};

use actix_web::HttpResponse;

pub use repit_common::error::{
    ACHIEVEMENT_NOT_EXIST, BADGE_NOT_EXIST, CHALLENGE_CLOSED, CHALLENGE_NOT_EXIST,
    DATA_ACCESS_ERROR, GOAL_NOT_EXIST, NO_LESSON_DATA, PARAMETER_VALIDATE_ERROR,
    REPORT_FORMAT_UNSUPPORTED, RESOURCE_CONFLICT, RESOURCE_NOT_FOUND, SERVER_ERROR,
    SERVICE_UNAVAILABLE, STUDENT_ALREADY_EXIST, STUDENT_NOT_EXIST, XP_AWARD_REJECTED,
};
pub use repit_common::error::{ErrorCode, RepitError};

use crate::model::response as common;

// Local wrapper so actix-web's ResponseError can be implemented
#[derive(Debug)]
pub struct AppError {
    inner: anyhow::Error,
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.inner)
    }
}

impl From<anyhow::Error> for AppError {
    fn from(value: anyhow::Error) -> Self {
        AppError { inner: value }
    }
}

impl From<RepitError> for AppError {
    fn from(value: RepitError) -> Self {
        AppError {
            inner: anyhow::Error::new(value),
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(value: validator::ValidationErrors) -> Self {
        RepitError::IllegalArgument(value.to_string()).into()
    }
}

impl AppError {
    pub fn inner(&self) -> &anyhow::Error {
        &self.inner
    }

    pub fn downcast_ref<E: std::error::Error + Send + Sync + 'static>(&self) -> Option<&E> {
        self.inner.downcast_ref::<E>()
    }

    /// HTTP status and API error code for this error
    pub fn status_and_code(&self) -> (u16, i32) {
        let Some(e) = self.downcast_ref::<RepitError>() else {
            return (500, SERVER_ERROR.code);
        };
        match e {
            RepitError::IllegalArgument(_) => (400, PARAMETER_VALIDATE_ERROR.code),
            RepitError::StudentNotExist(_) => (404, STUDENT_NOT_EXIST.code),
            RepitError::AchievementNotExist(_) => (404, ACHIEVEMENT_NOT_EXIST.code),
            RepitError::BadgeNotExist(_) => (404, BADGE_NOT_EXIST.code),
            RepitError::ChallengeNotExist(_) => (404, CHALLENGE_NOT_EXIST.code),
            RepitError::GoalNotExist(_) => (404, GOAL_NOT_EXIST.code),
            RepitError::StudentAlreadyExist(_) => (409, STUDENT_ALREADY_EXIST.code),
            RepitError::ChallengeClosed(..) => (409, CHALLENGE_CLOSED.code),
            RepitError::ApiError(status, code, ..) => {
                (u16::try_from(*status).unwrap_or(500), *code)
            }
            RepitError::DatabaseError(_) => (500, DATA_ACCESS_ERROR.code),
            RepitError::ConfigError(_) | RepitError::InternalError(_) => (500, SERVER_ERROR.code),
        }
    }
}

impl actix_web::error::ResponseError for AppError {
    fn status_code(&self) -> actix_web::http::StatusCode {
        actix_web::http::StatusCode::from_u16(self.status_and_code().0)
            .unwrap_or(actix_web::http::StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn error_response(&self) -> HttpResponse {
        let (status, code) = self.status_and_code();
        if status >= 500 {
            tracing::error!(status, code, "Request failed: {:#}", self.inner);
        }
        let data = match self.downcast_ref::<RepitError>() {
            Some(RepitError::ApiError(_, _, _, data)) => data.clone(),
            _ => String::new(),
        };
        common::Result::<String>::http_response(status, code, self.inner.to_string(), data)
    }
}

/// 404 envelope for a missing resource that is not an error in the service layer
pub fn not_found(code: &ErrorCode<'_>, message: impl Into<String>) -> HttpResponse {
    common::Result::<()>::http_response(404, code.code, message.into(), ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::ResponseError;
    use actix_web::http::StatusCode;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (RepitError::IllegalArgument("x".to_string()), 400, 20002),
            (RepitError::StudentNotExist(1), 404, 21000),
            (RepitError::ChallengeNotExist(3), 404, 21005),
            (RepitError::GoalNotExist(4), 404, 21007),
            (RepitError::StudentAlreadyExist(9), 409, 21001),
            (RepitError::ChallengeClosed(3, "full".to_string()), 409, 21006),
            (RepitError::DatabaseError("down".to_string()), 500, 10002),
            (
                RepitError::ApiError(422, 42, "bad".to_string(), String::new()),
                422,
                42,
            ),
        ];
        for (err, status, code) in cases {
            let app_err = AppError::from(err);
            assert_eq!(app_err.status_and_code(), (status, code));
        }
    }

    #[test]
    fn test_untyped_error_is_server_error() {
        let app_err = AppError::from(anyhow::anyhow!("boom"));
        assert_eq!(app_err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(app_err.status_and_code().1, SERVER_ERROR.code);
        assert!(app_err.downcast_ref::<RepitError>().is_none());
    }

    #[test]
    fn test_downcast_through_context() {
        let err = anyhow::Error::new(RepitError::StudentNotExist(7)).context("loading dashboard");
        let app_err = AppError::from(err);
        assert!(matches!(
            app_err.downcast_ref::<RepitError>(),
            Some(RepitError::StudentNotExist(7))
        ));
        assert_eq!(app_err.error_response().status(), StatusCode::NOT_FOUND);
    }
}
