use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Map, Value};
use thiserror::Error;
use validator::ValidationErrors;

use crate::booking::{BookingError, SeatError};
use crate::storage::StoreError;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Нет или неверные учётные данные
    #[error("Authentication credentials were not provided or are invalid")]
    Unauthenticated,

    #[error("You do not have permission to perform this action")]
    Forbidden,

    #[error("{0}")]
    BadRequest(String),

    /// Обязательное поле тела запроса отсутствует
    #[error("{0} is required")]
    MissingField(&'static str),

    /// Ошибки правил `validator` на входном DTO
    #[error("Invalid input")]
    Validation(#[from] ValidationErrors),

    #[error("{resource} with ID {id} not found")]
    NotFound { resource: &'static str, id: i64 },

    #[error(transparent)]
    Booking(#[from] BookingError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::Store(err.into())
    }
}

// Тело не разобралось как JSON нужной формы: 400 вместо 422 от axum
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Unauthenticated => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::BadRequest(_) | ApiError::MissingField(_) | ApiError::Validation(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Booking(err) => match err {
                BookingError::EmptyRequest | BookingError::Validation(_) => StatusCode::BAD_REQUEST,
                BookingError::NotFound { .. } => StatusCode::NOT_FOUND,
                BookingError::SeatAlreadyTaken { .. } => StatusCode::CONFLICT,
                BookingError::Store(store) => store_status(store),
            },
            ApiError::Store(store) => store_status(store),
            ApiError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Тело ответа. Внутренние детали наружу не попадают.
    pub fn body(&self) -> Value {
        match self {
            ApiError::Validation(errors) => validation_body(errors),
            ApiError::MissingField(field) => {
                let mut body = Map::new();
                body.insert(field.to_string(), json!(["This field is required."]));
                Value::Object(body)
            }
            ApiError::Booking(BookingError::EmptyRequest) => {
                json!({ "tickets": ["This list may not be empty."] })
            }
            ApiError::Booking(BookingError::Validation(tickets)) => json!({
                "tickets": tickets.iter().map(|errors| seat_errors_body(errors)).collect::<Vec<_>>()
            }),
            ApiError::Booking(err @ BookingError::NotFound { performance }) => json!({
                "detail": err.to_string(),
                "performance": performance,
            }),
            ApiError::Booking(err @ BookingError::SeatAlreadyTaken { performance, row, seat }) => json!({
                "detail": err.to_string(),
                "performance": performance,
                "row": row,
                "seat": seat,
            }),
            ApiError::Booking(BookingError::Store(store)) | ApiError::Store(store) => {
                json!({ "detail": store_message(store) })
            }
            ApiError::Other(_) => json!({ "detail": "Internal server error" }),
            other => json!({ "detail": other.to_string() }),
        }
    }
}

fn store_status(err: &StoreError) -> StatusCode {
    match err {
        StoreError::NotFound => StatusCode::NOT_FOUND,
        StoreError::UniqueViolation { .. } => StatusCode::CONFLICT,
        StoreError::ForeignKeyViolation { .. } => StatusCode::BAD_REQUEST,
        StoreError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn store_message(err: &StoreError) -> &'static str {
    match err {
        StoreError::NotFound => "Resource not found",
        StoreError::UniqueViolation { .. } => "Resource already exists",
        StoreError::ForeignKeyViolation { .. } => "Invalid reference to related resource",
        StoreError::Other(_) => "Internal server error",
    }
}

// {} для корректного билета, {"row": ["..."], "seat": ["..."]} для ошибочного
fn seat_errors_body(errors: &[SeatError]) -> Value {
    let mut body = Map::new();
    for error in errors {
        let messages = body
            .entry(error.field().as_str())
            .or_insert_with(|| Value::Array(Vec::new()));
        if let Value::Array(messages) = messages {
            messages.push(Value::String(error.to_string()));
        }
    }
    Value::Object(body)
}

fn validation_body(errors: &ValidationErrors) -> Value {
    let mut body = Map::new();
    for (field, field_errors) in errors.field_errors() {
        let messages: Vec<Value> = field_errors
            .iter()
            .map(|e| {
                let message = e
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("invalid value ({})", e.code));
                Value::String(message)
            })
            .collect();
        body.insert(field.to_string(), Value::Array(messages));
    }
    Value::Object(body)
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Уровень логирования по серьёзности
        if status.is_server_error() {
            tracing::error!("Internal service error: {:#}", self);
        } else if status == StatusCode::CONFLICT {
            tracing::warn!("Conflict: {}", self);
        } else {
            tracing::debug!("Client error: {}", self);
        }

        (status, Json(self.body())).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::SeatField;
    use serde::Deserialize;
    use validator::Validate;

    #[derive(Debug, Deserialize, Validate)]
    struct HallInput {
        #[validate(range(min = 1, message = "Ensure this value is greater than or equal to 1."))]
        row: i32,
    }

    #[test]
    fn seat_taken_is_conflict_with_coordinates() {
        let err = ApiError::from(BookingError::SeatAlreadyTaken { performance: 4, row: 1, seat: 2 });
        assert_eq!(err.status_code(), StatusCode::CONFLICT);

        let body = err.body();
        assert_eq!(body["performance"], 4);
        assert_eq!(body["row"], 1);
        assert_eq!(body["seat"], 2);
    }

    #[test]
    fn validation_body_has_one_entry_per_requested_ticket() {
        let err = ApiError::from(BookingError::Validation(vec![
            Vec::new(),
            vec![
                SeatError::OutOfRange { field: SeatField::Row, min: 1, max: 5, got: 6 },
                SeatError::OutOfRange { field: SeatField::Seat, min: 1, max: 10, got: 11 },
            ],
            Vec::new(),
        ]));
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            err.body(),
            json!({
                "tickets": [
                    {},
                    {
                        "row": ["row must be in range [1, 5], got 6"],
                        "seat": ["seat must be in range [1, 10], got 11"],
                    },
                    {},
                ]
            })
        );
    }

    #[test]
    fn missing_field_is_keyed_by_name() {
        let err = ApiError::MissingField("tickets");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(err.body(), json!({ "tickets": ["This field is required."] }));
    }

    #[test]
    fn empty_and_missing_performance() {
        let empty = ApiError::from(BookingError::EmptyRequest);
        assert_eq!(empty.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(empty.body(), json!({ "tickets": ["This list may not be empty."] }));

        let missing = ApiError::from(BookingError::NotFound { performance: 9 });
        assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(missing.body()["performance"], 9);
    }

    #[test]
    fn internal_errors_do_not_leak_details() {
        let err = ApiError::from(StoreError::Other(anyhow::anyhow!("connection reset by peer")));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.body(), json!({ "detail": "Internal server error" }));
    }

    #[test]
    fn foreign_key_violation_is_bad_request() {
        let err = ApiError::from(StoreError::ForeignKeyViolation {
            constraint: None,
            message: "violates foreign key".into(),
        });
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn validator_errors_are_keyed_by_field() {
        let errors = HallInput { row: 0 }.validate().unwrap_err();
        let err = ApiError::from(errors);
        assert_eq!(
            err.body(),
            json!({ "row": ["Ensure this value is greater than or equal to 1."] })
        );
    }

    #[tokio::test]
    async fn response_carries_status_and_json() {
        let response = ApiError::Forbidden.into_response();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["detail"], "You do not have permission to perform this action");
    }
}
