use thiserror::Error;

/// Every failure the booking service reports.
#[derive(Debug, Error)]
pub enum Error {
    /// Unreadable or invalid configuration
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Any SeaORM failure
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Filesystem failure, e.g. creating the data directory
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Unknown id, code or reference
    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },

    /// Malformed or out-of-policy input
    #[error("Invalid request: {message}")]
    Validation { message: String },

    /// An amount that overflows or does not match what was charged
    #[error("Invalid amount: {amount}")]
    InvalidAmount { amount: i64 },

    /// The request clashes with existing data, e.g. overlapping showtimes
    #[error("Conflict: {message}")]
    Conflict { message: String },

    /// Seat already booked or held by another customer
    #[error("Seat {showtime_seat_id} is not available for showtime {showtime_id}")]
    SeatUnavailable {
        showtime_id: i64,
        showtime_seat_id: i64,
    },

    /// Voucher inactive, outside its window, used up or below its minimum order
    #[error("Voucher '{code}' cannot be applied: {reason}")]
    VoucherRejected { code: String, reason: String },

    /// A status change the lifecycle does not allow
    #[error("{entity} cannot move from '{from}' to '{to}'")]
    InvalidTransition {
        entity: &'static str,
        from: String,
        to: String,
    },

    /// Refund requested too close to the showtime
    #[error("Refunds close {cutoff_hours}h before the showtime starts")]
    RefundWindowClosed { cutoff_hours: i64 },

    /// The payment provider refused or failed a request
    #[error("Payment gateway error: {message}")]
    PaymentGateway { message: String },

    /// Caller could not prove who it is, e.g. an unsigned webhook
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },
}

impl Error {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub(crate) fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    pub(crate) fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
