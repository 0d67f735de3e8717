//! Voucher business logic - Field validation and the single-voucher lifecycle.
//!
//! [`VoucherDraft`] carries every caller-editable voucher field. The same
//! validation rules apply to single creates/edits here and to each item of a
//! bulk upsert, so both paths agree on what a valid voucher is.

use crate::{
    core::{brand, clock::Clock},
    entities::{Voucher, VoucherDeliveryInfo, voucher, voucher_delivery_info},
    errors::{Error, Result},
};
use chrono::{DateTime, Months, Utc};
use sea_orm::{QueryOrder, Set, prelude::*};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

/// Validity period applied when a draft does not specify one.
pub const DEFAULT_VALID_MONTHS: i32 = 6;

const fn default_valid_months() -> i32 {
    DEFAULT_VALID_MONTHS
}

const fn default_active() -> bool {
    true
}

/// Caller-supplied voucher fields for a create or an edit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VoucherDraft {
    pub title: String,
    pub description: String,
    pub amount: f64,
    #[serde(default)]
    pub is_percentage: bool,
    #[serde(default)]
    pub brand_id: Option<Uuid>,
    #[serde(default = "default_valid_months")]
    pub valid_months: i32,
    #[serde(default)]
    pub is_unlimited: bool,
    #[serde(default)]
    pub quantity: i32,
    #[serde(default)]
    pub redeemed: i32,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub image: Option<String>,
}

impl VoucherDraft {
    /// A fixed-value, limited, active draft with the default validity and no stock.
    #[must_use]
    pub fn new(title: impl Into<String>, description: impl Into<String>, amount: f64) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            amount,
            is_percentage: false,
            brand_id: None,
            valid_months: DEFAULT_VALID_MONTHS,
            is_unlimited: false,
            quantity: 0,
            redeemed: 0,
            is_active: true,
            image: None,
        }
    }

    /// Checks the field rules in a fixed order and reports the first violation.
    ///
    /// Brand existence is not checked here since it needs the database.
    pub fn validate(&self) -> Result<()> {
        let failure = |message: &str| {
            Err(Error::ValidationFailed {
                message: message.to_string(),
            })
        };

        if self.title.trim().is_empty() {
            return failure("Title is required");
        }
        if self.description.trim().is_empty() {
            return failure("Description is required");
        }
        if !self.amount.is_finite() {
            return failure("Amount must be a finite number");
        }
        if !self.is_percentage && self.amount <= 0.0 {
            return failure("Amount must be greater than zero");
        }
        if self.valid_months < 0 {
            return failure("Valid months cannot be negative");
        }
        if self.quantity < 0 {
            return failure("Quantity cannot be negative");
        }
        if self.redeemed < 0 {
            return failure("Redeemed cannot be negative");
        }
        Ok(())
    }

    /// Builds a fully populated active model for a brand-new voucher.
    #[must_use]
    pub fn to_new_active_model(&self, id: Uuid, now: DateTime<Utc>) -> voucher::ActiveModel {
        let mut model = voucher::ActiveModel {
            id: Set(id),
            sold_count: Set(0),
            is_deleted: Set(false),
            delete_date: Set(None),
            create_date: Set(now),
            update_date: Set(None),
            ..Default::default()
        };
        self.apply_to(&mut model);
        model
    }

    /// Overwrites every caller-editable field on `model`. Counters owned by
    /// sales (`sold_count`) and lifecycle fields are left untouched.
    pub fn apply_to(&self, model: &mut voucher::ActiveModel) {
        model.title = Set(self.title.trim().to_string());
        model.description = Set(self.description.trim().to_string());
        model.amount = Set(self.amount);
        model.is_percentage = Set(self.is_percentage);
        model.brand_id = Set(self.brand_id);
        model.valid_months = Set(self.valid_months);
        model.is_unlimited = Set(self.is_unlimited);
        model.quantity = Set(self.quantity);
        model.redeemed = Set(self.redeemed);
        model.is_active = Set(self.is_active);
        model.image = Set(self.image.clone());
    }
}

/// When the voucher stops being redeemable: `create_date` plus `valid_months`
/// calendar months. Unlimited vouchers never expire.
#[must_use]
pub fn expires_at(voucher: &voucher::Model) -> Option<DateTime<Utc>> {
    if voucher.is_unlimited {
        return None;
    }
    let months = u32::try_from(voucher.valid_months).unwrap_or(0);
    voucher.create_date.checked_add_months(Months::new(months))
}

/// Whether the voucher is past its validity window at `now`.
#[must_use]
pub fn is_expired(voucher: &voucher::Model, now: DateTime<Utc>) -> bool {
    expires_at(voucher).is_some_and(|expiry| now > expiry)
}

async fn ensure_brand(db: &DatabaseConnection, brand_id: Option<Uuid>) -> Result<()> {
    match brand_id {
        Some(id) if !brand::brand_exists(db, id).await? => Err(Error::BrandNotFound { id }),
        _ => Ok(()),
    }
}

async fn find_live_voucher(db: &DatabaseConnection, voucher_id: Uuid) -> Result<voucher::Model> {
    Voucher::find_by_id(voucher_id)
        .filter(voucher::Column::IsDeleted.eq(false))
        .one(db)
        .await?
        .ok_or(Error::VoucherNotFound { id: voucher_id })
}

/// Finds a voucher by id, including soft-deleted ones.
pub async fn get_voucher(
    db: &DatabaseConnection,
    voucher_id: Uuid,
) -> Result<Option<voucher::Model>> {
    Voucher::find_by_id(voucher_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Retrieves all non-deleted vouchers ordered by title.
pub async fn get_active_vouchers(db: &DatabaseConnection) -> Result<Vec<voucher::Model>> {
    Voucher::find()
        .filter(voucher::Column::IsDeleted.eq(false))
        .order_by_asc(voucher::Column::Title)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Creates a voucher after validating the draft and its brand.
#[instrument(skip(db, clock, draft), fields(title = %draft.title))]
pub async fn create_voucher(
    db: &DatabaseConnection,
    clock: &dyn Clock,
    draft: &VoucherDraft,
) -> Result<voucher::Model> {
    draft.validate()?;
    ensure_brand(db, draft.brand_id).await?;

    let voucher = draft
        .to_new_active_model(Uuid::new_v4(), clock.now())
        .insert(db)
        .await?;
    info!(voucher_id = %voucher.id, "Voucher created");
    Ok(voucher)
}

/// Replaces the editable fields of a live voucher.
#[instrument(skip(db, clock, draft))]
pub async fn edit_voucher(
    db: &DatabaseConnection,
    clock: &dyn Clock,
    voucher_id: Uuid,
    draft: &VoucherDraft,
) -> Result<voucher::Model> {
    draft.validate()?;
    let mut voucher: voucher::ActiveModel = find_live_voucher(db, voucher_id).await?.into();
    ensure_brand(db, draft.brand_id).await?;

    draft.apply_to(&mut voucher);
    voucher.update_date = Set(Some(clock.now()));
    voucher.update(db).await.map_err(Into::into)
}

/// Soft deletes a voucher; its delivery records and audit rows are preserved.
#[instrument(skip(db, clock))]
pub async fn delete_voucher(
    db: &DatabaseConnection,
    clock: &dyn Clock,
    voucher_id: Uuid,
) -> Result<voucher::Model> {
    let mut voucher: voucher::ActiveModel = find_live_voucher(db, voucher_id).await?.into();

    let now = clock.now();
    voucher.is_deleted = Set(true);
    voucher.delete_date = Set(Some(now));
    voucher.update_date = Set(Some(now));
    let voucher = voucher.update(db).await?;
    info!(voucher_id = %voucher_id, "Voucher deleted");
    Ok(voucher)
}

/// Brings a soft-deleted voucher back.
#[instrument(skip(db, clock))]
pub async fn restore_voucher(
    db: &DatabaseConnection,
    clock: &dyn Clock,
    voucher_id: Uuid,
) -> Result<voucher::Model> {
    let mut voucher: voucher::ActiveModel = Voucher::find_by_id(voucher_id)
        .filter(voucher::Column::IsDeleted.eq(true))
        .one(db)
        .await?
        .ok_or(Error::VoucherNotFound { id: voucher_id })?
        .into();

    voucher.is_deleted = Set(false);
    voucher.delete_date = Set(None);
    voucher.update_date = Set(Some(clock.now()));
    let voucher = voucher.update(db).await?;
    info!(voucher_id = %voucher_id, "Voucher restored");
    Ok(voucher)
}

/// Delivery records of a voucher, newest first.
pub async fn get_deliveries_for_voucher(
    db: &DatabaseConnection,
    voucher_id: Uuid,
) -> Result<Vec<voucher_delivery_info::Model>> {
    VoucherDeliveryInfo::find()
        .filter(voucher_delivery_info::Column::VoucherId.eq(voucher_id))
        .order_by_desc(voucher_delivery_info::Column::CreateDate)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Finds a delivery record by id.
pub async fn get_delivery(
    db: &DatabaseConnection,
    delivery_info_id: Uuid,
) -> Result<Option<voucher_delivery_info::Model>> {
    VoucherDeliveryInfo::find_by_id(delivery_info_id)
        .one(db)
        .await
        .map_err(Into::into)
}
