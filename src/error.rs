use axum::{
    extract::rejection::JsonRejection,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Map, Value};
use thiserror::Error;
use validator::ValidationErrors;

use crate::booking::{BookingError, SeatField};
use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Authentication credentials were not provided or are invalid")]
    Unauthorized,

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    /// Ошибки по полям: `{"field": ["message", ...]}`.
    #[error("invalid request")]
    BadRequest(Value),

    #[error("validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    #[error(transparent)]
    Booking(#[from] BookingError),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn not_found(what: &str, id: i64) -> Self {
        ApiError::NotFound(format!("{} {} not found", what, id))
    }

    pub fn field(field: &str, message: impl Into<String>) -> Self {
        ApiError::BadRequest(json!({ field: [message.into()] }))
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Booking(BookingError::Storage(err))
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!("rejected request body: {}", rejection.body_text());
        ApiError::BadRequest(json_rejection_body(&rejection))
    }
}

/// Тело 400 для JSON, который не разложился в тип запроса. Путь serde
/// раскладывается во вложенные поля: `tickets[0].row` превращается в
/// `{"tickets": {"0": {"row": ["invalid type: ..."]}}}`.
pub fn json_rejection_body(rejection: &JsonRejection) -> Value {
    let text = rejection.body_text();
    let detail = match rejection {
        JsonRejection::JsonDataError(_) => text.split_once(": ").map(|(_, detail)| detail),
        _ => None,
    };
    let Some(detail) = detail else {
        return json!({ "non_field_errors": [text] });
    };

    // Без пути serde пишет только сообщение, в котором тоже бывает ": "
    let (path, message) = match detail.split_once(": ") {
        Some((path, message)) if !path.contains(' ') => (path, message),
        _ => ("", detail),
    };
    let message = message
        .rfind(" at line ")
        .map_or(message, |at| &message[..at]);

    let mut fields: Vec<&str> = path
        .split(['.', '[', ']'])
        .filter(|s| !s.is_empty() && *s != "?")
        .collect();
    if let Some(missing) = message
        .strip_prefix("missing field `")
        .and_then(|rest| rest.split('`').next())
    {
        fields.push(missing);
    }
    if fields.is_empty() {
        return json!({ "non_field_errors": [message] });
    }

    fields
        .into_iter()
        .rev()
        .fold(json!([message]), |inner, field| json!({ field: inner }))
}

/// Тело ответа 400 для отказа в брони. Ошибка привязана к индексу билета
/// и полю: `{"code", "detail", "tickets": {"2": {"row": [...]}}}`.
pub fn booking_rejection_body(err: &BookingError) -> Value {
    let mut fields = Map::new();
    match err {
        BookingError::SeatOutOfBounds { violation, .. } => {
            for field in [SeatField::Row, SeatField::Seat] {
                if let Some(v) = violation.get(field) {
                    fields.insert(field.as_str().to_string(), json!([v.to_string()]));
                }
            }
        }
        BookingError::SessionNotFound { .. } => {
            fields.insert("show_session".to_string(), json!([err.to_string()]));
        }
        _ => {
            fields.insert("non_field_errors".to_string(), json!([err.to_string()]));
        }
    }

    let tickets = match err.ticket_index() {
        Some(index) => json!({ index.to_string(): fields }),
        None => Value::Object(fields),
    };

    json!({
        "code": err.code(),
        "detail": err.to_string(),
        "tickets": tickets,
    })
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                [(header::WWW_AUTHENTICATE, "Basic realm=\"planetarium\"")],
                Json(json!({ "detail": self.to_string() })),
            )
                .into_response(),
            ApiError::Forbidden(msg) => {
                (StatusCode::FORBIDDEN, Json(json!({ "detail": msg }))).into_response()
            }
            ApiError::NotFound(msg) => {
                (StatusCode::NOT_FOUND, Json(json!({ "detail": msg }))).into_response()
            }
            ApiError::BadRequest(body) => (StatusCode::BAD_REQUEST, Json(body)).into_response(),
            ApiError::Validation(errors) => {
                let body = serde_json::to_value(&errors).unwrap_or_default();
                (StatusCode::BAD_REQUEST, Json(body)).into_response()
            }
            ApiError::Booking(err) if err.is_rejection() => {
                (StatusCode::BAD_REQUEST, Json(booking_rejection_body(&err))).into_response()
            }
            ApiError::Booking(err) => {
                tracing::error!("booking storage failure: {:?}", err);
                internal_error()
            }
            ApiError::Database(err) => {
                tracing::error!("sql error: {:?}", err);
                internal_error()
            }
            ApiError::Internal(msg) => {
                tracing::error!("internal error: {}", msg);
                internal_error()
            }
        }
    }
}

fn internal_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "detail": "Internal Server Error" })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::booking::{validate_seat, DomeCapacity};
    use crate::models::PlanetariumDome;

    struct Dome;

    impl DomeCapacity for Dome {
        fn rows(&self) -> i32 {
            10
        }
        fn seats_in_row(&self) -> i32 {
            15
        }
    }

    #[test]
    fn out_of_bounds_is_attributed_to_ticket_and_field() {
        let violation = validate_seat(11, 1, &Dome).unwrap_err();
        let err = BookingError::SeatOutOfBounds { ticket: 2, session: 7, row: 11, seat: 1, violation };

        let body = booking_rejection_body(&err);
        assert_eq!(body["code"], "seat_out_of_bounds");
        assert_eq!(
            body["tickets"]["2"]["row"][0],
            "row number must be in available range: (1, rows): (1, 10)"
        );
        assert!(body["tickets"]["2"].get("seat").is_none());
    }

    #[test]
    fn empty_request_has_no_ticket_index() {
        let body = booking_rejection_body(&BookingError::EmptyReservationRequest);
        assert_eq!(body["code"], "empty_reservation_request");
        assert_eq!(body["tickets"]["non_field_errors"][0], "reservation must contain at least one ticket");
    }

    #[test]
    fn rejections_are_bad_request_and_storage_is_500() {
        let taken = ApiError::Booking(BookingError::SeatAlreadyTaken { ticket: 0, session: 1, row: 2, seat: 3 });
        assert_eq!(taken.into_response().status(), StatusCode::BAD_REQUEST);

        let storage = ApiError::from(StoreError::Backend("connection reset".into()));
        assert_eq!(storage.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn unauthorized_asks_for_basic_auth() {
        let res = ApiError::Unauthorized.into_response();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert!(res.headers().get(header::WWW_AUTHENTICATE).is_some());
    }

    #[test]
    fn dome_model_feeds_the_same_message() {
        let dome = PlanetariumDome { id: 1, name: "A".into(), rows: 2, seats_in_row: 2 };
        let violation = validate_seat(1, 3, &dome).unwrap_err();
        assert_eq!(
            violation.to_string(),
            "seat number must be in available range: (1, seats_in_row): (1, 2)"
        );
    }
}
