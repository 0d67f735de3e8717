//! Core business logic - framework-agnostic voucher sale, redemption and bulk upsert.
//!
//! Every operation is an async free function over a `SeaORM` connection. Mutating
//! operations run in one database transaction, take an injected [`Clock`], and
//! check a [`CancellationToken`] before committing.

use crate::errors::{Error, Result};
use tokio_util::sync::CancellationToken;

/// Brand existence checks
pub mod brand;
/// Batched create-or-update of vouchers with per-item results
pub mod bulk;
/// Injected time source
pub mod clock;
/// Redeem / undo state machine and the audit trail
pub mod redemption;
/// Voucher purchase
pub mod sale;
/// User balance access
pub mod user;
/// Voucher validation and lifecycle
pub mod voucher;

pub use clock::{Clock, SystemClock};

/// Fails with [`Error::Cancelled`] once the caller has cancelled the operation.
pub(crate) fn ensure_not_cancelled(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        return Err(Error::Cancelled);
    }
    Ok(())
}
