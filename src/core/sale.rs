//! Voucher purchase - moves units out of inventory into a delivery record.
//!
//! A purchase checks, in order: the buyer exists, the voucher is live, there is
//! enough inventory, and the buyer can afford it. Only then are the voucher
//! counters, the buyer balance and the new delivery record written, all in one
//! transaction. Purchases are not audited; the audit trail covers redemption only.

use crate::{
    core::{clock::Clock, ensure_not_cancelled},
    entities::{DeliveryState, User, Voucher, user, voucher, voucher_delivery_info},
    errors::{Error, Result},
};
use sea_orm::{DatabaseTransaction, Set, TransactionTrait, prelude::*, sea_query::Expr};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

/// Everything needed to buy a voucher for a recipient.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyRequest {
    pub voucher_id: Uuid,
    pub user_id: Uuid,
    pub quantity: i32,
    pub recipient_name: String,
    pub recipient_phone: String,
    pub recipient_city: String,
    pub recipient_address: String,
    #[serde(default)]
    pub recipient_email: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Price charged per unit.
///
/// Percentage vouchers are charged their face `amount` as well; there is no
/// base price to resolve a discount against.
#[must_use]
pub const fn unit_price(voucher: &voucher::Model) -> f64 {
    voucher.amount
}

fn validate_request(request: &BuyRequest) -> Result<()> {
    if request.quantity <= 0 {
        return Err(Error::InvalidArgument {
            message: format!("Quantity must be positive, got {}", request.quantity),
        });
    }
    if request.voucher_id.is_nil() {
        return Err(Error::InvalidArgument {
            message: "Voucher id is required".to_string(),
        });
    }
    if request.user_id.is_nil() {
        return Err(Error::InvalidArgument {
            message: "User id is required".to_string(),
        });
    }
    Ok(())
}

fn sold_count_overflow(voucher_id: Uuid) -> Error {
    Error::InvalidArgument {
        message: format!("Sold count of voucher {voucher_id} would overflow"),
    }
}

/// Takes `quantity` units out of stock and adds them to `sold_count`.
///
/// The UPDATE only matches while the voucher is live, still holds enough
/// stock and `sold_count` stays within `i32`; otherwise nothing is written and
/// `InsufficientInventory` is returned.
async fn reserve_inventory(
    txn: &DatabaseTransaction,
    voucher: &voucher::Model,
    quantity: i32,
) -> Result<()> {
    let mut inventory = Voucher::update_many()
        .col_expr(
            voucher::Column::SoldCount,
            Expr::col(voucher::Column::SoldCount).add(quantity),
        )
        .filter(voucher::Column::Id.eq(voucher.id))
        .filter(voucher::Column::IsDeleted.eq(false))
        .filter(voucher::Column::SoldCount.lte(i32::MAX - quantity));
    if !voucher.is_unlimited {
        inventory = inventory
            .col_expr(
                voucher::Column::Quantity,
                Expr::col(voucher::Column::Quantity).sub(quantity),
            )
            .filter(voucher::Column::Quantity.gte(quantity));
    }
    if inventory.exec(txn).await?.rows_affected == 0 {
        warn!("Purchase lost a race for inventory");
        return Err(Error::InsufficientInventory {
            available: voucher.quantity,
            requested: quantity,
        });
    }
    Ok(())
}

/// Debits `cost` from the buyer, only while the balance still covers it.
async fn debit_buyer(txn: &DatabaseTransaction, buyer: &user::Model, cost: f64) -> Result<()> {
    let debit = User::update_many()
        .col_expr(user::Column::Balance, Expr::col(user::Column::Balance).sub(cost))
        .filter(user::Column::Id.eq(buyer.id))
        .filter(user::Column::Balance.gte(cost))
        .exec(txn)
        .await?;
    if debit.rows_affected == 0 {
        warn!("Purchase lost a race for balance");
        return Err(Error::InsufficientBalance {
            current: buyer.balance,
            required: cost,
        });
    }
    Ok(())
}

/// Buys `request.quantity` units of a voucher on behalf of `request.user_id`.
///
/// On success the voucher's `quantity` drops (unless unlimited), its
/// `sold_count` rises, the buyer is debited `amount * quantity` and a new
/// unused delivery record is returned. Any failure leaves everything untouched.
///
/// The counter writes are conditional UPDATEs, so a concurrent purchase that
/// drains stock or balance between the checks and the write still fails cleanly.
#[instrument(
    skip(db, clock, cancel, request),
    fields(voucher_id = %request.voucher_id, user_id = %request.user_id, quantity = request.quantity)
)]
pub async fn buy(
    db: &DatabaseConnection,
    clock: &dyn Clock,
    cancel: &CancellationToken,
    request: BuyRequest,
) -> Result<voucher_delivery_info::Model> {
    ensure_not_cancelled(cancel)?;
    validate_request(&request)?;

    let txn = db.begin().await?;

    let buyer = User::find_by_id(request.user_id)
        .one(&txn)
        .await?
        .ok_or(Error::UserNotFound {
            id: request.user_id,
        })?;

    let voucher = Voucher::find_by_id(request.voucher_id)
        .filter(voucher::Column::IsDeleted.eq(false))
        .one(&txn)
        .await?
        .ok_or(Error::VoucherNotFound {
            id: request.voucher_id,
        })?;

    if !voucher.is_unlimited && voucher.quantity < request.quantity {
        warn!(available = voucher.quantity, "Purchase rejected: not enough inventory");
        return Err(Error::InsufficientInventory {
            available: voucher.quantity,
            requested: request.quantity,
        });
    }

    let cost = unit_price(&voucher) * f64::from(request.quantity);
    if buyer.balance < cost {
        warn!(balance = buyer.balance, cost, "Purchase rejected: not enough balance");
        return Err(Error::InsufficientBalance {
            current: buyer.balance,
            required: cost,
        });
    }

    if voucher.sold_count.checked_add(request.quantity).is_none() {
        warn!(sold_count = voucher.sold_count, "Purchase rejected: sold count would overflow");
        return Err(sold_count_overflow(voucher.id));
    }

    reserve_inventory(&txn, &voucher, request.quantity).await?;
    debit_buyer(&txn, &buyer, cost).await?;

    let delivery = voucher_delivery_info::ActiveModel {
        id: Set(Uuid::new_v4()),
        voucher_id: Set(voucher.id),
        sender_id: Set(Some(buyer.id)),
        sender_name: Set(Some(buyer.name)),
        recipient_name: Set(request.recipient_name),
        recipient_email: Set(request.recipient_email),
        recipient_phone: Set(request.recipient_phone),
        recipient_city: Set(request.recipient_city),
        recipient_address: Set(request.recipient_address),
        message: Set(request.message),
        quantity: Set(request.quantity),
        state: Set(DeliveryState::Unused),
        used_date: Set(None),
        create_date: Set(clock.now()),
    }
    .insert(&txn)
    .await?;

    ensure_not_cancelled(cancel)?;
    txn.commit().await?;

    info!(delivery_info_id = %delivery.id, cost, "Voucher purchased");
    Ok(delivery)
}
