//! HTTP mapping for [`Error`].

use crate::{api::response::error as error_response, errors::Error};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

impl Error {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation { .. }
            | Self::InvalidAmount { .. }
            | Self::VoucherRejected { .. }
            | Self::RefundWindowClosed { .. } => StatusCode::BAD_REQUEST,
            Self::Unauthorized { .. } => StatusCode::UNAUTHORIZED,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Conflict { .. } | Self::SeatUnavailable { .. } | Self::InvalidTransition { .. } => {
                StatusCode::CONFLICT
            }
            Self::PaymentGateway { .. } => StatusCode::BAD_GATEWAY,
            Self::Config { .. } | Self::Database(_) | Self::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Stable machine-readable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "VALIDATION_ERROR",
            Self::InvalidAmount { .. } => "INVALID_AMOUNT",
            Self::VoucherRejected { .. } => "VOUCHER_REJECTED",
            Self::RefundWindowClosed { .. } => "REFUND_WINDOW_CLOSED",
            Self::Unauthorized { .. } => "UNAUTHORIZED",
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Conflict { .. } => "CONFLICT",
            Self::SeatUnavailable { .. } => "SEAT_UNAVAILABLE",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::PaymentGateway { .. } => "PAYMENT_GATEWAY_ERROR",
            Self::Config { .. } | Self::Database(_) | Self::Io(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    /// Structured fields a client can act on.
    fn details(&self) -> Option<serde_json::Value> {
        match self {
            Self::SeatUnavailable {
                showtime_id,
                showtime_seat_id,
            } => Some(json!({ "showtime_id": showtime_id, "showtime_seat_id": showtime_seat_id })),
            Self::VoucherRejected { code, .. } => Some(json!({ "voucher": code })),
            Self::InvalidTransition { entity, from, to } => {
                Some(json!({ "entity": entity, "from": from, "to": to }))
            }
            _ => None,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Internal details are logged, never returned
        let public_message = if status.is_server_error() && status != StatusCode::BAD_GATEWAY {
            tracing::error!(error = %self, "Request failed");
            "An internal error occurred".to_string()
        } else {
            if status == StatusCode::BAD_GATEWAY {
                tracing::error!(error = %self, "Payment gateway error");
            } else {
                tracing::debug!(error = %self, "Request rejected");
            }
            self.to_string()
        };

        error_response(self.code(), public_message, self.details(), status)
    }
}
