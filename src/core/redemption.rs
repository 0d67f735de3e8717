//! Redemption state machine - `Unused` ⇄ `Used` for delivery records.
//!
//! Each successful transition updates the delivery record, adjusts the owning
//! voucher's `redeemed` counter and appends exactly one audit row, all in a
//! single transaction. Rejected transitions write nothing.
//!
//! The state change is a conditional UPDATE filtered on the expected current
//! state. If two callers race on the same record, only one UPDATE matches and
//! the other fails as if it had seen the new state.

use crate::{
    core::{clock::Clock, ensure_not_cancelled, voucher::expires_at},
    entities::{
        DeliveryState, RedeemAction, Voucher, VoucherDeliveryInfo, VoucherRedeemAudit, voucher,
        voucher_delivery_info, voucher_redeem_audit,
    },
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{
    DatabaseTransaction, QueryOrder, QuerySelect, Set, TransactionTrait, prelude::*,
    sea_query::Expr,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Who is acting on which delivery record.
#[derive(Debug, Clone, Copy)]
struct Transition {
    delivery_info_id: Uuid,
    performed_by: Uuid,
}

impl Transition {
    fn new(delivery_info_id: Uuid, performed_by: Uuid) -> Result<Self> {
        require_id(delivery_info_id, "Delivery info id")?;
        require_id(performed_by, "Performed by")?;
        Ok(Self {
            delivery_info_id,
            performed_by,
        })
    }
}

fn require_id(id: Uuid, what: &str) -> Result<()> {
    if id.is_nil() {
        return Err(Error::InvalidArgument {
            message: format!("{what} is required"),
        });
    }
    Ok(())
}

fn redeemed_overflow(voucher_id: Uuid) -> Error {
    Error::InvalidArgument {
        message: format!("Redeemed count of voucher {voucher_id} would overflow"),
    }
}

async fn load_delivery(
    txn: &DatabaseTransaction,
    delivery_info_id: Uuid,
) -> Result<voucher_delivery_info::Model> {
    VoucherDeliveryInfo::find_by_id(delivery_info_id)
        .one(txn)
        .await?
        .ok_or(Error::DeliveryNotFound {
            id: delivery_info_id,
        })
}

async fn load_live_voucher(txn: &DatabaseTransaction, voucher_id: Uuid) -> Result<voucher::Model> {
    Voucher::find_by_id(voucher_id)
        .filter(voucher::Column::IsDeleted.eq(false))
        .one(txn)
        .await?
        .ok_or(Error::VoucherNotFound { id: voucher_id })
}

/// Moves the record from `from` to `to`. Returns false when the record was
/// no longer in `from`.
async fn switch_state(
    txn: &DatabaseTransaction,
    delivery_info_id: Uuid,
    from: DeliveryState,
    to: DeliveryState,
    used_date: Option<DateTime<Utc>>,
) -> Result<bool> {
    let result = VoucherDeliveryInfo::update_many()
        .set(voucher_delivery_info::ActiveModel {
            state: Set(to),
            used_date: Set(used_date),
            ..Default::default()
        })
        .filter(voucher_delivery_info::Column::Id.eq(delivery_info_id))
        .filter(voucher_delivery_info::Column::State.eq(from))
        .exec(txn)
        .await?;
    Ok(result.rows_affected == 1)
}

/// Adds `quantity` to the voucher's `redeemed` counter unless the sum would
/// leave the `i32` range.
async fn credit_redeemed(txn: &DatabaseTransaction, voucher_id: Uuid, quantity: i32) -> Result<()> {
    let result = Voucher::update_many()
        .col_expr(
            voucher::Column::Redeemed,
            Expr::col(voucher::Column::Redeemed).add(quantity),
        )
        .filter(voucher::Column::Id.eq(voucher_id))
        .filter(voucher::Column::Redeemed.lte(i32::MAX - quantity))
        .exec(txn)
        .await?;
    if result.rows_affected == 0 {
        return Err(redeemed_overflow(voucher_id));
    }
    Ok(())
}

/// Subtracts `quantity` from the voucher's `redeemed` counter, flooring at zero.
async fn debit_redeemed(txn: &DatabaseTransaction, voucher_id: Uuid, quantity: i32) -> Result<()> {
    let floored = Expr::case(
        Expr::col(voucher::Column::Redeemed).gte(quantity),
        Expr::col(voucher::Column::Redeemed).sub(quantity),
    )
    .finally(0);
    Voucher::update_many()
        .col_expr(voucher::Column::Redeemed, floored.into())
        .filter(voucher::Column::Id.eq(voucher_id))
        .exec(txn)
        .await?;
    Ok(())
}

async fn append_audit(
    txn: &DatabaseTransaction,
    transition: Transition,
    delivery: &voucher_delivery_info::Model,
    action: RedeemAction,
    timestamp: DateTime<Utc>,
) -> Result<voucher_redeem_audit::Model> {
    let last: Option<Option<i64>> = VoucherRedeemAudit::find()
        .select_only()
        .column_as(voucher_redeem_audit::Column::Sequence.max(), "last")
        .filter(voucher_redeem_audit::Column::VoucherId.eq(delivery.voucher_id))
        .into_tuple()
        .one(txn)
        .await?;
    let sequence = last.flatten().unwrap_or(0) + 1;

    let previous_is_used = matches!(action, RedeemAction::UndoRedeem);
    voucher_redeem_audit::ActiveModel {
        id: Set(Uuid::new_v4()),
        delivery_info_id: Set(transition.delivery_info_id),
        voucher_id: Set(delivery.voucher_id),
        performed_by: Set(transition.performed_by),
        action: Set(action),
        timestamp: Set(timestamp),
        sequence: Set(sequence),
        quantity: Set(delivery.quantity),
        previous_is_used: Set(previous_is_used),
        new_is_used: Set(!previous_is_used),
    }
    .insert(txn)
    .await
    .map_err(Into::into)
}

/// Writes a redeem for a delivery loaded as unused inside `txn`.
///
/// Fails with `AlreadyUsed` when the record changed state after it was loaded.
async fn write_redeem(
    txn: &DatabaseTransaction,
    transition: Transition,
    delivery: &voucher_delivery_info::Model,
    now: DateTime<Utc>,
) -> Result<()> {
    if !switch_state(
        txn,
        delivery.id,
        DeliveryState::Unused,
        DeliveryState::Used,
        Some(now),
    )
    .await?
    {
        warn!("Redeem lost a race with a concurrent transition");
        return Err(Error::AlreadyUsed { id: delivery.id });
    }
    credit_redeemed(txn, delivery.voucher_id, delivery.quantity).await?;
    append_audit(txn, transition, delivery, RedeemAction::Redeem, now).await?;
    Ok(())
}

/// Writes an undo for a delivery loaded as used inside `txn`.
///
/// Fails with `NotYetRedeemed` when the record changed state after it was loaded.
async fn write_undo(
    txn: &DatabaseTransaction,
    transition: Transition,
    delivery: &voucher_delivery_info::Model,
    now: DateTime<Utc>,
) -> Result<()> {
    if !switch_state(
        txn,
        delivery.id,
        DeliveryState::Used,
        DeliveryState::Unused,
        None,
    )
    .await?
    {
        warn!("Undo lost a race with a concurrent transition");
        return Err(Error::NotYetRedeemed { id: delivery.id });
    }
    debit_redeemed(txn, delivery.voucher_id, delivery.quantity).await?;
    append_audit(txn, transition, delivery, RedeemAction::UndoRedeem, now).await?;
    Ok(())
}

/// Marks a delivery record as used and credits the voucher's `redeemed` counter.
///
/// # Errors
/// - `InvalidArgument` if either id is nil
/// - `DeliveryNotFound` if the record does not exist
/// - `AlreadyUsed` if it is already redeemed
/// - `VoucherNotFound` if its voucher has been deleted
/// - `Expired` if its voucher's validity window has passed
/// - `InvalidArgument` if the voucher's `redeemed` counter would overflow
#[instrument(skip(db, clock, cancel))]
pub async fn redeem(
    db: &DatabaseConnection,
    clock: &dyn Clock,
    cancel: &CancellationToken,
    delivery_info_id: Uuid,
    performed_by: Uuid,
) -> Result<voucher_delivery_info::Model> {
    ensure_not_cancelled(cancel)?;
    let transition = Transition::new(delivery_info_id, performed_by)?;

    let txn = db.begin().await?;

    let delivery = load_delivery(&txn, delivery_info_id).await?;
    if delivery.state.is_used() {
        warn!("Redeem rejected: already used");
        return Err(Error::AlreadyUsed {
            id: delivery_info_id,
        });
    }

    let voucher = load_live_voucher(&txn, delivery.voucher_id).await?;
    let now = clock.now();
    if let Some(expired_at) = expires_at(&voucher).filter(|expiry| now > *expiry) {
        warn!(%expired_at, "Redeem rejected: voucher expired");
        return Err(Error::Expired {
            voucher_id: voucher.id,
            expired_at,
        });
    }
    if voucher.redeemed.checked_add(delivery.quantity).is_none() {
        warn!(redeemed = voucher.redeemed, "Redeem rejected: counter would overflow");
        return Err(redeemed_overflow(voucher.id));
    }

    write_redeem(&txn, transition, &delivery, now).await?;

    ensure_not_cancelled(cancel)?;
    txn.commit().await?;

    info!(voucher_id = %voucher.id, quantity = delivery.quantity, "Voucher redeemed");
    Ok(voucher_delivery_info::Model {
        state: DeliveryState::Used,
        used_date: Some(now),
        ..delivery
    })
}

/// Reverses a redemption. The voucher's `redeemed` counter is reduced by the
/// record's quantity but never below zero. Expiry is not checked, so a past
/// redemption can always be reversed.
///
/// # Errors
/// - `InvalidArgument` if either id is nil
/// - `DeliveryNotFound` if the record does not exist
/// - `NotYetRedeemed` if it is not currently used
/// - `VoucherNotFound` if its voucher has been deleted
#[instrument(skip(db, clock, cancel))]
pub async fn undo_redeem(
    db: &DatabaseConnection,
    clock: &dyn Clock,
    cancel: &CancellationToken,
    delivery_info_id: Uuid,
    performed_by: Uuid,
) -> Result<voucher_delivery_info::Model> {
    ensure_not_cancelled(cancel)?;
    let transition = Transition::new(delivery_info_id, performed_by)?;

    let txn = db.begin().await?;

    let delivery = load_delivery(&txn, delivery_info_id).await?;
    if !delivery.state.is_used() {
        warn!("Undo rejected: not redeemed");
        return Err(Error::NotYetRedeemed {
            id: delivery_info_id,
        });
    }

    let voucher = load_live_voucher(&txn, delivery.voucher_id).await?;

    write_undo(&txn, transition, &delivery, clock.now()).await?;

    ensure_not_cancelled(cancel)?;
    txn.commit().await?;

    info!(voucher_id = %voucher.id, quantity = delivery.quantity, "Redemption undone");
    Ok(voucher_delivery_info::Model {
        state: DeliveryState::Unused,
        used_date: None,
        ..delivery
    })
}

/// Audit rows for a voucher, newest first, at most `take` of them when given.
///
/// Rows sharing a timestamp are ordered by their position in the trail.
#[instrument(skip(db))]
pub async fn get_audits(
    db: &DatabaseConnection,
    voucher_id: Uuid,
    take: Option<u64>,
) -> Result<Vec<voucher_redeem_audit::Model>> {
    require_id(voucher_id, "Voucher id")?;

    let mut query = VoucherRedeemAudit::find()
        .filter(voucher_redeem_audit::Column::VoucherId.eq(voucher_id))
        .order_by_desc(voucher_redeem_audit::Column::Timestamp)
        .order_by_desc(voucher_redeem_audit::Column::Sequence);
    if let Some(take) = take {
        query = query.limit(take);
    }

    let audits = query.all(db).await?;
    debug!(count = audits.len(), "Loaded redeem audits");
    Ok(audits)
}
