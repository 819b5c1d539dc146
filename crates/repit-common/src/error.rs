//! Error types and error codes for Repit
//!
//! This module defines:
//! - `RepitError`: Application-specific error enum
//! - `ErrorCode`: Structured error codes for API responses

use serde::{Deserialize, Serialize};

/// Application-specific error types
#[derive(thiserror::Error, Debug)]
pub enum RepitError {
    #[error("caused: {0}")]
    IllegalArgument(String),

    #[error("student '{0}' not exist")]
    StudentNotExist(i64),

    #[error("student profile for user '{0}' already exist")]
    StudentAlreadyExist(i64),

    #[error("achievement '{0}' not exist")]
    AchievementNotExist(i64),

    #[error("badge '{0}' not exist")]
    BadgeNotExist(String),

    #[error("challenge '{0}' not exist")]
    ChallengeNotExist(i64),

    #[error("challenge '{0}' is not open for joining: {1}")]
    ChallengeClosed(i64, String),

    #[error("learning goal '{0}' not exist")]
    GoalNotExist(i64),

    #[error("{2}")]
    ApiError(i32, i32, String, String),

    #[error("database error: {0}")]
    DatabaseError(String),

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("internal error: {0}")]
    InternalError(String),
}

impl RepitError {
    /// Whether the error denotes a missing resource
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            RepitError::StudentNotExist(_)
                | RepitError::AchievementNotExist(_)
                | RepitError::BadgeNotExist(_)
                | RepitError::ChallengeNotExist(_)
                | RepitError::GoalNotExist(_)
        )
    }
}

/// Error code structure for API responses
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ErrorCode<'a> {
    pub code: i32,
    pub message: &'a str,
}

pub const SUCCESS: ErrorCode<'static> = ErrorCode {
    code: 0,
    message: "success",
};

pub const PARAMETER_MISSING: ErrorCode<'static> = ErrorCode {
    code: 10000,
    message: "parameter missing",
};

pub const ACCESS_DENIED: ErrorCode<'static> = ErrorCode {
    code: 10001,
    message: "access denied",
};

pub const DATA_ACCESS_ERROR: ErrorCode<'static> = ErrorCode {
    code: 10002,
    message: "data access error",
};

pub const PARAMETER_VALIDATE_ERROR: ErrorCode<'static> = ErrorCode {
    code: 20002,
    message: "parameter validate error",
};

pub const RESOURCE_NOT_FOUND: ErrorCode<'static> = ErrorCode {
    code: 20004,
    message: "resource not found",
};

pub const RESOURCE_CONFLICT: ErrorCode<'static> = ErrorCode {
    code: 20005,
    message: "resource conflict",
};

// Gamification
pub const STUDENT_NOT_EXIST: ErrorCode<'static> = ErrorCode {
    code: 21000,
    message: "student not exist",
};

pub const STUDENT_ALREADY_EXIST: ErrorCode<'static> = ErrorCode {
    code: 21001,
    message: "student already exist",
};

pub const ACHIEVEMENT_NOT_EXIST: ErrorCode<'static> = ErrorCode {
    code: 21002,
    message: "achievement not exist",
};

pub const BADGE_NOT_EXIST: ErrorCode<'static> = ErrorCode {
    code: 21003,
    message: "badge not exist",
};

pub const XP_AWARD_REJECTED: ErrorCode<'static> = ErrorCode {
    code: 21004,
    message: "xp award rejected",
};

pub const CHALLENGE_NOT_EXIST: ErrorCode<'static> = ErrorCode {
    code: 21005,
    message: "challenge not exist",
};

pub const CHALLENGE_CLOSED: ErrorCode<'static> = ErrorCode {
    code: 21006,
    message: "challenge closed",
};

pub const GOAL_NOT_EXIST: ErrorCode<'static> = ErrorCode {
    code: 21007,
    message: "learning goal not exist",
};

// Analytics
pub const NO_LESSON_DATA: ErrorCode<'static> = ErrorCode {
    code: 22000,
    message: "no lesson data",
};

pub const REPORT_FORMAT_UNSUPPORTED: ErrorCode<'static> = ErrorCode {
    code: 22001,
    message: "report format unsupported",
};

pub const SERVER_ERROR: ErrorCode<'static> = ErrorCode {
    code: 30000,
    message: "server error",
};

pub const SERVICE_UNAVAILABLE: ErrorCode<'static> = ErrorCode {
    code: 30001,
    message: "service unavailable",
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repit_error_display() {
        let err = RepitError::IllegalArgument("invalid param".to_string());
        assert_eq!(format!("{}", err), "caused: invalid param");

        let err = RepitError::StudentNotExist(42);
        assert_eq!(format!("{}", err), "student '42' not exist");

        let err = RepitError::BadgeNotExist("xp_100".to_string());
        assert_eq!(format!("{}", err), "badge 'xp_100' not exist");
    }

    #[test]
    fn test_is_not_found() {
        assert!(RepitError::StudentNotExist(1).is_not_found());
        assert!(RepitError::ChallengeNotExist(1).is_not_found());
        assert!(RepitError::GoalNotExist(1).is_not_found());
        assert!(!RepitError::StudentAlreadyExist(1).is_not_found());
        assert!(!RepitError::DatabaseError("x".to_string()).is_not_found());
    }

    #[test]
    fn test_error_code_constants() {
        assert_eq!(SUCCESS.code, 0);
        assert_eq!(SUCCESS.message, "success");
        assert_eq!(PARAMETER_MISSING.code, 10000);
        assert_eq!(STUDENT_NOT_EXIST.code, 21000);
        assert_eq!(SERVER_ERROR.code, 30000);
    }
}
