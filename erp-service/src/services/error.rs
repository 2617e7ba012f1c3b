use service_core::error::AppError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Access forbidden")]
    Forbidden,

    #[error("User not found")]
    UserNotFound,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{entity} not found: {}", ids.join(", "))]
    MissingReferences {
        entity: &'static str,
        ids: Vec<String>,
    },

    #[error("{0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl ServiceError {
    pub fn missing<I, T>(entity: &'static str, ids: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: ToString,
    {
        ServiceError::MissingReferences {
            entity,
            ids: ids.into_iter().map(|id| id.to_string()).collect(),
        }
    }

    /// Turn a unique-constraint violation into `Conflict(message)`; any other
    /// database error is passed through.
    pub fn conflict_on_unique(message: &str) -> impl FnOnce(sqlx::Error) -> ServiceError + '_ {
        move |err| match &err {
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                ServiceError::Conflict(message.to_string())
            }
            _ => ServiceError::Database(err),
        }
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Database(e) => AppError::DatabaseError(anyhow::Error::new(e)),
            ServiceError::Internal(e) => AppError::InternalError(e),
            ServiceError::InvalidCredentials => {
                AppError::Unauthorized(anyhow::anyhow!("Invalid credentials"))
            }
            ServiceError::InvalidToken => AppError::InvalidToken,
            ServiceError::Forbidden => AppError::Forbidden(anyhow::anyhow!("Access forbidden")),
            ServiceError::UserNotFound => AppError::NotFound(anyhow::anyhow!("User not found")),
            e @ ServiceError::NotFound(_) => AppError::NotFound(anyhow::anyhow!(e.to_string())),
            e @ ServiceError::MissingReferences { .. } => {
                AppError::NotFound(anyhow::anyhow!(e.to_string()))
            }
            ServiceError::Conflict(msg) => AppError::Conflict(anyhow::anyhow!(msg)),
            ServiceError::Validation(msg) => AppError::Unprocessable(anyhow::anyhow!(msg)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_missing_references_lists_every_id() {
        let err = ServiceError::missing("Tag", ["a", "b"]);
        assert_eq!(err.to_string(), "Tag not found: a, b");
        assert_eq!(AppError::from(err).status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::from(ServiceError::InvalidToken).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::from(ServiceError::InvalidCredentials).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            AppError::from(ServiceError::Forbidden).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::from(ServiceError::Conflict("dup".into())).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::from(ServiceError::Validation("bad".into())).status_code(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            AppError::from(ServiceError::Database(sqlx::Error::PoolClosed)).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
