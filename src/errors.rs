//! Unified error types for the voucher ledger.
//!
//! Every core operation returns [`Result`], and each failure path maps to one
//! [`ErrorKind`] so the boundary layer can report a status and a message.

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

/// Coarse error categories reported to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Missing or malformed input
    InvalidArgument,
    /// Referenced record does not exist or is soft-deleted
    NotFound,
    /// Redeem attempted on a record that is already used
    AlreadyUsed,
    /// Undo attempted on a record that was never redeemed
    NotYetRedeemed,
    /// Redemption past the voucher validity window
    Expired,
    /// Not enough voucher inventory for a purchase
    InsufficientInventory,
    /// Not enough user balance for a purchase
    InsufficientBalance,
    /// Voucher field validation failure
    ValidationFailed,
    /// Bulk upsert called without items
    NoItems,
    /// Bulk upsert where no item could be applied
    AllItemsFailed,
    /// Operation aborted through its cancellation token
    Cancelled,
    /// Storage, configuration or I/O failure
    Internal,
}

/// All errors produced by the ledger.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("Invalid amount: {amount}")]
    InvalidAmount { amount: f64 },

    #[error("User not found: {id}")]
    UserNotFound { id: Uuid },

    #[error("Voucher not found: {id}")]
    VoucherNotFound { id: Uuid },

    #[error("Delivery record not found: {id}")]
    DeliveryNotFound { id: Uuid },

    #[error("Brand not found: {id}")]
    BrandNotFound { id: Uuid },

    #[error("Voucher delivery {id} has already been redeemed")]
    AlreadyUsed { id: Uuid },

    #[error("Voucher delivery {id} has not been redeemed")]
    NotYetRedeemed { id: Uuid },

    #[error("Voucher {voucher_id} expired at {expired_at}")]
    Expired {
        voucher_id: Uuid,
        expired_at: DateTime<Utc>,
    },

    #[error("Insufficient inventory: {available} available, {requested} requested")]
    InsufficientInventory { available: i32, requested: i32 },

    #[error("Insufficient balance: current {current:.2}, required {required:.2}")]
    InsufficientBalance { current: f64, required: f64 },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    #[error("No items supplied")]
    NoItems,

    #[error("All {failed} items failed")]
    AllItemsFailed { failed: usize },

    #[error("Operation cancelled")]
    Cancelled,
}

impl Error {
    /// Category of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument { .. } | Self::InvalidAmount { .. } => ErrorKind::InvalidArgument,
            Self::UserNotFound { .. }
            | Self::VoucherNotFound { .. }
            | Self::DeliveryNotFound { .. }
            | Self::BrandNotFound { .. } => ErrorKind::NotFound,
            Self::AlreadyUsed { .. } => ErrorKind::AlreadyUsed,
            Self::NotYetRedeemed { .. } => ErrorKind::NotYetRedeemed,
            Self::Expired { .. } => ErrorKind::Expired,
            Self::InsufficientInventory { .. } => ErrorKind::InsufficientInventory,
            Self::InsufficientBalance { .. } => ErrorKind::InsufficientBalance,
            Self::ValidationFailed { .. } => ErrorKind::ValidationFailed,
            Self::NoItems => ErrorKind::NoItems,
            Self::AllItemsFailed { .. } => ErrorKind::AllItemsFailed,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Config { .. } | Self::Database(_) | Self::Io(_) => ErrorKind::Internal,
        }
    }

    /// HTTP-equivalent status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        match self.kind() {
            ErrorKind::InvalidArgument
            | ErrorKind::ValidationFailed
            | ErrorKind::NoItems
            | ErrorKind::AllItemsFailed
            | ErrorKind::InsufficientInventory
            | ErrorKind::InsufficientBalance => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::AlreadyUsed | ErrorKind::NotYetRedeemed => 409,
            ErrorKind::Expired => 410,
            ErrorKind::Cancelled => 499,
            ErrorKind::Internal => 500,
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes_follow_kind() {
        let id = Uuid::new_v4();
        assert_eq!(Error::VoucherNotFound { id }.status_code(), 404);
        assert_eq!(Error::AlreadyUsed { id }.status_code(), 409);
        assert_eq!(Error::NoItems.status_code(), 400);
        assert_eq!(
            Error::InsufficientBalance {
                current: 1.0,
                required: 2.0
            }
            .kind(),
            ErrorKind::InsufficientBalance
        );
        assert_eq!(
            Error::Database(sea_orm::DbErr::Custom("boom".to_string())).kind(),
            ErrorKind::Internal
        );
    }

    #[test]
    fn test_error_messages_carry_context() {
        let err = Error::InsufficientInventory {
            available: 1,
            requested: 3,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient inventory: 1 available, 3 requested"
        );
    }

    #[test]
    fn test_io_errors_are_internal() {
        let err: Error = std::io::Error::new(std::io::ErrorKind::NotFound, "config.toml").into();
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(err.status_code(), 500);
    }
}
