use axum::{http::StatusCode, response::Json};

pub mod data;
pub mod scenarios;

pub type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Service(#[from] crate::services::ServiceError),

    #[error("validation error: {0}")]
    Validation(String),
}

impl axum::response::IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let status: StatusCode = (&self).into();
        let body = Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<&ApiError> for StatusCode {
    fn from(err: &ApiError) -> Self {
        match err {
            ApiError::Service(service_err) => match service_err {
                crate::services::ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
                crate::services::ServiceError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                crate::services::ServiceError::NoFeasibleSolution(_) => StatusCode::UNPROCESSABLE_ENTITY,
                crate::services::ServiceError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
        }
    }
}
