use crate::types::{Credits, DbId};

/// Domain error taxonomy shared by every layer above this crate.
///
/// Admission-time variants (`InsufficientCredit`, `UserBanned`,
/// `ConcurrencyLimitExceeded`, `QueueFull`) are returned synchronously to
/// the submitting caller with no surviving side effects. `QueueFull` is
/// advisory backpressure: callers should retry later.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Insufficient credit: {required} required, {available} available")]
    InsufficientCredit {
        required: Credits,
        available: Credits,
    },

    #[error("User is banned")]
    UserBanned,

    #[error("Concurrency limit exceeded: at most {limit} active jobs per user")]
    ConcurrencyLimitExceeded { limit: i64 },

    #[error("Queue is full, retry later")]
    QueueFull,

    #[error("Reservation already resolved or unknown")]
    InvalidReservation,

    #[error("Invalid price: {0}")]
    InvalidPrice(Credits),

    #[error("Unknown media type: {0}")]
    UnknownType(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(Credits),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience alias used throughout the engine crates.
pub type CoreResult<T> = Result<T, CoreError>;
