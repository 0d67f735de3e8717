//! Voucher entity - A sellable, redeemable offer with an inventory count.
//!
//! `quantity` is the remaining inventory and is only decremented by a purchase.
//! `redeemed` and `sold_count` are cumulative counters. Soft-deleted vouchers
//! are excluded from sale and redemption.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Voucher database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "vouchers")]
pub struct Model {
    /// Unique identifier for the voucher
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Display title
    pub title: String,
    /// Display description
    pub description: String,
    /// Face value, or a discount percentage when `is_percentage` is set
    pub amount: f64,
    /// Whether `amount` is a percentage discount rather than a fixed value
    pub is_percentage: bool,
    /// Optional brand this voucher belongs to
    pub brand_id: Option<Uuid>,
    /// Validity period in calendar months, counted from `create_date`
    pub valid_months: i32,
    /// Unlimited vouchers do not track inventory and never expire
    pub is_unlimited: bool,
    /// Remaining inventory (ignored when unlimited)
    pub quantity: i32,
    /// Units redeemed so far
    pub redeemed: i32,
    /// Units sold so far
    pub sold_count: i32,
    /// Whether the voucher is shown as active
    pub is_active: bool,
    /// Optional image reference
    pub image: Option<String>,
    /// Soft delete flag - if true, voucher is hidden but data is preserved
    pub is_deleted: bool,
    /// When the voucher was soft-deleted
    pub delete_date: Option<DateTimeUtc>,
    /// When the voucher was created
    pub create_date: DateTimeUtc,
    /// When the voucher was last modified
    pub update_date: Option<DateTimeUtc>,
}

/// Defines relationships between Voucher and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each voucher optionally belongs to one brand
    #[sea_orm(
        belongs_to = "super::brand::Entity",
        from = "Column::BrandId",
        to = "super::brand::Column::Id"
    )]
    Brand,
    /// One voucher has many delivery records
    #[sea_orm(has_many = "super::voucher_delivery_info::Entity")]
    DeliveryInfos,
    /// One voucher has many audit rows
    #[sea_orm(has_many = "super::voucher_redeem_audit::Entity")]
    RedeemAudits,
}

impl Related<super::brand::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Brand.def()
    }
}

impl Related<super::voucher_delivery_info::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DeliveryInfos.def()
    }
}

impl Related<super::voucher_redeem_audit::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RedeemAudits.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
