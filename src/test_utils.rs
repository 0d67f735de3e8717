//! Shared test utilities for the voucher ledger.
//!
//! This module provides a controllable clock, an in-memory database setup and
//! helpers that create users, vouchers and delivery records with sensible
//! defaults.

#![allow(clippy::unwrap_used)]

use crate::{
    core::{
        clock::Clock,
        sale::{self, BuyRequest},
        user,
        voucher::{self as voucher_ops, DEFAULT_VALID_MONTHS, VoucherDraft},
    },
    entities::{self, voucher},
    errors::Result,
};
use chrono::{DateTime, TimeZone, Utc};
use sea_orm::DatabaseConnection;
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    #[must_use]
    pub const fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap() = now;
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// A fixed clock at 2025-03-15 10:00:00 UTC.
#[must_use]
pub fn test_clock() -> FixedClock {
    FixedClock::new(Utc.with_ymd_and_hms(2025, 3, 15, 10, 0, 0).unwrap())
}

/// Installs a test subscriber once; later calls are no-ops.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("voucher_ledger=debug")
        .with_test_writer()
        .try_init();
}

/// Creates an in-memory `SQLite` database with all tables initialized, plus
/// the fixed clock the test should drive it with.
pub async fn setup_test_db() -> Result<(DatabaseConnection, FixedClock)> {
    let db = sea_orm::Database::connect("sqlite::memory:").await?;
    crate::config::database::create_tables(&db).await?;
    Ok((db, test_clock()))
}

/// Creates a user named "Test User" with the given balance.
pub async fn create_test_user(
    db: &DatabaseConnection,
    clock: &FixedClock,
    balance: f64,
) -> Result<entities::user::Model> {
    user::create_user(db, clock, "Test User".to_string(), balance).await
}

/// Creates a limited voucher with the given stock.
///
/// # Defaults
/// * amount: 10.0 (fixed value)
/// * validity: six months
/// * no brand
pub async fn create_test_voucher(
    db: &DatabaseConnection,
    clock: &FixedClock,
    quantity: i32,
) -> Result<voucher::Model> {
    let mut draft = VoucherDraft::new("Test Voucher", "Test description", 10.0);
    draft.quantity = quantity;
    voucher_ops::create_voucher(db, clock, &draft).await
}

/// An unsaved voucher model for pure tests.
#[must_use]
pub fn sample_voucher_model(created: DateTime<Utc>) -> voucher::Model {
    voucher::Model {
        id: Uuid::new_v4(),
        title: "Sample".to_string(),
        description: "Sample voucher".to_string(),
        amount: 10.0,
        is_percentage: false,
        brand_id: None,
        valid_months: DEFAULT_VALID_MONTHS,
        is_unlimited: false,
        quantity: 5,
        redeemed: 0,
        sold_count: 0,
        is_active: true,
        image: None,
        is_deleted: false,
        delete_date: None,
        create_date: created,
        update_date: None,
    }
}

/// A purchase request with placeholder recipient details.
#[must_use]
pub fn buy_request(voucher_id: Uuid, user_id: Uuid, quantity: i32) -> BuyRequest {
    BuyRequest {
        voucher_id,
        user_id,
        quantity,
        recipient_name: "Jane Doe".to_string(),
        recipient_phone: "+1 555 0100".to_string(),
        recipient_city: "Springfield".to_string(),
        recipient_address: "742 Evergreen Terrace".to_string(),
        recipient_email: None,
        message: None,
    }
}

/// Buys `quantity` of a voucher for `user_id` and returns the delivery record.
pub async fn buy_test_delivery(
    db: &DatabaseConnection,
    clock: &FixedClock,
    voucher_id: Uuid,
    user_id: Uuid,
    quantity: i32,
) -> Result<entities::voucher_delivery_info::Model> {
    sale::buy(
        db,
        clock,
        &CancellationToken::new(),
        buy_request(voucher_id, user_id, quantity),
    )
    .await
}

/// Creates a voucher with `voucher_quantity` stock and one unused delivery
/// record of `delivery_quantity` bought by a well-funded user.
pub async fn setup_with_delivery(
    db: &DatabaseConnection,
    clock: &FixedClock,
    voucher_quantity: i32,
    delivery_quantity: i32,
) -> Result<(voucher::Model, entities::voucher_delivery_info::Model)> {
    let buyer = create_test_user(db, clock, 1_000.0).await?;
    let voucher = create_test_voucher(db, clock, voucher_quantity).await?;
    let delivery = buy_test_delivery(db, clock, voucher.id, buyer.id, delivery_quantity).await?;
    Ok((voucher, delivery))
}
