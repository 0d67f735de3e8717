//! User balance access for purchases.
//!
//! Accounts are owned by the authentication layer; the ledger only reads a
//! user's balance and display name and debits or credits the balance.

use crate::{
    core::clock::Clock,
    entities::{User, user},
    errors::{Error, Result},
};
use sea_orm::{Set, TransactionTrait, prelude::*, sea_query::Expr};
use tracing::info;

/// Finds a user by id.
pub async fn get_user<C>(db: &C, user_id: Uuid) -> Result<Option<user::Model>>
where
    C: ConnectionTrait,
{
    User::find_by_id(user_id).one(db).await.map_err(Into::into)
}

/// Creates a user with an opening balance.
pub async fn create_user(
    db: &DatabaseConnection,
    clock: &dyn Clock,
    name: String,
    balance: f64,
) -> Result<user::Model> {
    if !balance.is_finite() || balance < 0.0 {
        return Err(Error::InvalidAmount { amount: balance });
    }

    let user = user::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name),
        balance: Set(balance),
        create_date: Set(clock.now()),
    };
    user.insert(db).await.map_err(Into::into)
}

/// Credits `amount` to a user's balance with a single atomic UPDATE.
pub async fn top_up_balance(
    db: &DatabaseConnection,
    user_id: Uuid,
    amount: f64,
) -> Result<user::Model> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(Error::InvalidAmount { amount });
    }

    let txn = db.begin().await?;

    let result = User::update_many()
        .col_expr(user::Column::Balance, Expr::col(user::Column::Balance).add(amount))
        .filter(user::Column::Id.eq(user_id))
        .exec(&txn)
        .await?;
    if result.rows_affected == 0 {
        return Err(Error::UserNotFound { id: user_id });
    }

    let user = get_user(&txn, user_id)
        .await?
        .ok_or(Error::UserNotFound { id: user_id })?;
    txn.commit().await?;

    info!(user_id = %user_id, amount, balance = user.balance, "Balance topped up");
    Ok(user)
}
