use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        FromRequest, FromRequestParts,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use shared::error::{ApiError, ErrorCode};

/// `Json` whose rejection is an `ApiError` body with type `ValidationError`.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ExtractRejection))]
pub(crate) struct ApiJson<T>(pub(crate) T);

/// `Query` whose rejection is an `ApiError` body with type `ValidationError`.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ExtractRejection))]
pub(crate) struct ApiQuery<T>(pub(crate) T);

#[derive(Debug)]
pub(crate) struct ExtractRejection {
    status: StatusCode,
    error: ApiError,
}

impl From<JsonRejection> for ExtractRejection {
    fn from(rejection: JsonRejection) -> Self {
        Self {
            status: rejection.status(),
            error: ApiError::new(ErrorCode::Validation, rejection.body_text()),
        }
    }
}

impl From<QueryRejection> for ExtractRejection {
    fn from(rejection: QueryRejection) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error: ApiError::new(ErrorCode::Validation, rejection.body_text()),
        }
    }
}

impl IntoResponse for ExtractRejection {
    fn into_response(self) -> Response {
        (self.status, Json(self.error)).into_response()
    }
}
