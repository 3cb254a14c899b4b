use thiserror::Error;
use tide::StatusCode;

use crate::validation::Rejection;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Rejected(#[from] Rejection),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Admin credentials are required")]
    Forbidden,

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Failed to migrate database: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

impl Error {
    pub fn not_found(what: &str, id: i64) -> Self {
        Error::NotFound(format!("{} {}", what, id))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Error::Rejected(_) => StatusCode::BadRequest,
            Error::NotFound(_) => StatusCode::NotFound,
            Error::Forbidden => StatusCode::Forbidden,
            Error::Config(_) | Error::Database(_) | Error::Migration(_) => {
                StatusCode::InternalServerError
            }
        }
    }

    /**
     * Whether the message can be shown to the API client as-is
     */
    pub fn is_public(&self) -> bool {
        self.status().is_client_error()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rule_violations_are_bad_requests() {
        let err: Error = Rejection::AlreadyAnswered.into();
        assert_eq!(err.status(), StatusCode::BadRequest);
        assert!(err.is_public());
        assert_eq!(err.to_string(), Rejection::AlreadyAnswered.to_string());
    }

    #[test]
    fn internal_failures_stay_private() {
        let err = Error::Database(sqlx::Error::RowNotFound);
        assert_eq!(err.status(), StatusCode::InternalServerError);
        assert!(!err.is_public());
        assert_eq!(Error::Forbidden.status(), StatusCode::Forbidden);
        assert_eq!(Error::not_found("poll", 222).to_string(), "poll 222 not found");
    }
}
