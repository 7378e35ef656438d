use actix_web::{HttpResponse, ResponseError, http::StatusCode};
use derive_more::Display;
use serde_json::json;

/// Every failure the service reports. The message is what the caller sees.
#[derive(Debug, Display, PartialEq)]
pub enum AppError {
    #[display(fmt = "{}", _0)]
    Validation(String),

    #[display(fmt = "{}", _0)]
    Unauthorized(String),

    #[display(fmt = "{}", _0)]
    Forbidden(String),

    #[display(fmt = "{}", _0)]
    NotFound(String),

    #[display(fmt = "{}", _0)]
    Conflict(String),

    /// Store unreachable or pool exhausted
    #[display(fmt = "Service temporarily unavailable, please try again")]
    Network,

    #[display(fmt = "Something went wrong, contact the system admin")]
    Unknown,
}

pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        AppError::NotFound(msg.into())
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Network => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Unknown => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({
            "error": self.to_string()
        }))
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23000") => {
                AppError::Conflict("Record already exists".to_string())
            }
            // data too long for column
            sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("22001") => {
                AppError::Validation("A value is too long".to_string())
            }
            sqlx::Error::RowNotFound => AppError::NotFound("Record not found".to_string()),
            sqlx::Error::Io(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Tls(_) => {
                tracing::error!(error = %e, "Database unreachable");
                AppError::Network
            }
            _ => {
                tracing::error!(error = %e, "Database error");
                AppError::Unknown
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::body::to_bytes;
    use sqlx::error::{DatabaseError, ErrorKind};
    use std::borrow::Cow;

    /// Store error carrying only an SQLSTATE.
    #[derive(Debug)]
    struct SqlState(&'static str);

    impl std::fmt::Display for SqlState {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "sqlstate {}", self.0)
        }
    }

    impl std::error::Error for SqlState {}

    impl DatabaseError for SqlState {
        fn message(&self) -> &str {
            "database error"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            Some(Cow::Borrowed(self.0))
        }

        fn as_error(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn std::error::Error + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn std::error::Error + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            ErrorKind::Other
        }
    }

    fn db_error(code: &'static str) -> sqlx::Error {
        sqlx::Error::Database(Box::new(SqlState(code)))
    }

    #[test]
    fn status_codes_follow_error_kind() {
        assert_eq!(
            AppError::validation("bad").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::Forbidden("no".into()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(AppError::Network.status_code(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(AppError::Unknown.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[actix_web::test]
    async fn error_body_carries_message() {
        let resp = AppError::not_found("User not found").error_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let body = to_bytes(resp.into_body()).await.unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value["error"], "User not found");
    }

    #[test]
    fn pool_timeout_maps_to_network() {
        assert_eq!(AppError::from(sqlx::Error::PoolTimedOut), AppError::Network);
    }

    #[test]
    fn store_constraint_codes_map_to_client_errors() {
        assert!(matches!(
            AppError::from(db_error("23000")),
            AppError::Conflict(_)
        ));
        assert_eq!(
            AppError::from(db_error("22001")).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(AppError::from(db_error("HY000")), AppError::Unknown);
    }
}
