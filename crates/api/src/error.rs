//! API error types with HTTP response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use domain::{CatalogError, FieldErrors, OrderError};
use settlement::{GATEWAY_ERROR_MESSAGE, SettlementError};
use store::StoreError;

/// API-level error type that maps to HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    /// Resource not found.
    NotFound(String),
    /// Bad request from the client.
    BadRequest(String),
    /// Field-by-field validation failure.
    Validation(FieldErrors),
    /// Settlement, cart or payment error.
    Settlement(SettlementError),
    /// Order state machine rejection.
    Order(OrderError),
    /// Catalog rule violation.
    Catalog(CatalogError),
    /// Persistence error.
    Store(StoreError),
}

struct ErrorBody {
    status: StatusCode,
    message: String,
    fields: Option<FieldErrors>,
    redirect: Option<String>,
}

impl ErrorBody {
    fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            fields: None,
            redirect: None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = match self {
            ApiError::NotFound(msg) => ErrorBody::new(StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => ErrorBody::new(StatusCode::BAD_REQUEST, msg),
            ApiError::Validation(fields) => validation_body(fields),
            ApiError::Settlement(err) => settlement_error_to_body(err),
            ApiError::Order(err) => order_error_to_body(err),
            ApiError::Catalog(err) => catalog_error_to_body(err),
            ApiError::Store(err) => store_error_to_body(err),
        };

        let mut json = serde_json::json!({ "error": body.message });
        if let Some(fields) = body.fields {
            json["fields"] = serde_json::json!(fields);
        }
        if let Some(redirect) = body.redirect {
            json["redirect"] = serde_json::json!(redirect);
        }
        (body.status, axum::Json(json)).into_response()
    }
}

fn validation_body(fields: FieldErrors) -> ErrorBody {
    let message = format!(
        "Please fix the following errors: {}",
        fields.full_messages().join(", ")
    );
    ErrorBody {
        fields: Some(fields),
        ..ErrorBody::new(StatusCode::UNPROCESSABLE_ENTITY, message)
    }
}

fn settlement_error_to_body(err: SettlementError) -> ErrorBody {
    match err {
        SettlementError::AuthenticationRequired { ref return_to } => ErrorBody {
            redirect: Some(format!("/login?return_to={return_to}")),
            ..ErrorBody::new(StatusCode::UNAUTHORIZED, err.to_string())
        },
        SettlementError::Validation(fields) => validation_body(fields),
        SettlementError::EmptyCart
        | SettlementError::OfferNotFound { .. }
        | SettlementError::OfferRejected { .. }
        | SettlementError::Cart(_) => ErrorBody::new(StatusCode::BAD_REQUEST, err.to_string()),
        SettlementError::OfferUnavailable { .. }
        | SettlementError::DuplicateOffer { .. }
        | SettlementError::TrialAlreadyUsed { .. } => {
            ErrorBody::new(StatusCode::CONFLICT, err.to_string())
        }
        SettlementError::ProductNotFound(_) | SettlementError::OrderNotFound(_) => {
            ErrorBody::new(StatusCode::NOT_FOUND, err.to_string())
        }
        SettlementError::Gateway(cause) => {
            tracing::error!(error = %cause, "payment gateway error");
            ErrorBody::new(StatusCode::BAD_GATEWAY, GATEWAY_ERROR_MESSAGE)
        }
        SettlementError::Order(order_err) => order_error_to_body(order_err),
        SettlementError::Store(store_err) => store_error_to_body(store_err),
    }
}

fn order_error_to_body(err: OrderError) -> ErrorBody {
    match &err {
        OrderError::InvalidStatusTransition { .. }
        | OrderError::PaymentRequired
        | OrderError::PaymentAlreadySettled { .. }
        | OrderError::PaymentNotFailed { .. }
        | OrderError::NotRefundable { .. }
        | OrderError::MissingPaymentId
        | OrderError::OfferAlreadyApplied { .. } => {
            ErrorBody::new(StatusCode::CONFLICT, err.to_string())
        }
        OrderError::NoItems
        | OrderError::InvalidRefundAmount { .. }
        | OrderError::OfferNotApplicable { .. }
        | OrderError::UnknownStatus(_) => ErrorBody::new(StatusCode::BAD_REQUEST, err.to_string()),
    }
}

fn catalog_error_to_body(err: CatalogError) -> ErrorBody {
    match &err {
        CatalogError::PlanNotFound { .. } => ErrorBody::new(StatusCode::NOT_FOUND, err.to_string()),
        _ => ErrorBody::new(StatusCode::BAD_REQUEST, err.to_string()),
    }
}

fn store_error_to_body(err: StoreError) -> ErrorBody {
    match err {
        StoreError::DuplicateOfferCode { .. } | StoreError::DuplicateAppliedOffer { .. } => {
            ErrorBody::new(StatusCode::CONFLICT, err.to_string())
        }
        StoreError::OrderNotFound(_) => ErrorBody::new(StatusCode::NOT_FOUND, err.to_string()),
        StoreError::Catalog(catalog_err) => catalog_error_to_body(catalog_err),
        other => {
            tracing::error!(error = %other, "internal server error");
            ErrorBody::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
        }
    }
}

impl From<SettlementError> for ApiError {
    fn from(err: SettlementError) -> Self {
        ApiError::Settlement(err)
    }
}

impl From<OrderError> for ApiError {
    fn from(err: OrderError) -> Self {
        ApiError::Order(err)
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        ApiError::Catalog(err)
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Store(err)
    }
}

impl From<FieldErrors> for ApiError {
    fn from(errors: FieldErrors) -> Self {
        ApiError::Validation(errors)
    }
}
