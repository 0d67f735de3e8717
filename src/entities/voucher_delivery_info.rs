//! Voucher delivery entity - One purchased batch of a voucher addressed to a recipient.
//!
//! Created by a purchase and afterwards only toggled between
//! [`DeliveryState::Unused`] and [`DeliveryState::Used`] by redemption.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Redemption state of a delivery record
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum DeliveryState {
    /// Purchased, not yet redeemed
    #[sea_orm(string_value = "unused")]
    Unused,
    /// Redeemed; `used_date` is set
    #[sea_orm(string_value = "used")]
    Used,
}

impl DeliveryState {
    /// Whether this state counts as used.
    #[must_use]
    pub const fn is_used(self) -> bool {
        matches!(self, Self::Used)
    }
}

/// Voucher delivery database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "voucher_delivery_infos")]
pub struct Model {
    /// Unique identifier for the delivery record
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Voucher this record was purchased from
    pub voucher_id: Uuid,
    /// User who bought the voucher
    pub sender_id: Option<Uuid>,
    /// Display name of the sender
    pub sender_name: Option<String>,
    pub recipient_name: String,
    pub recipient_email: Option<String>,
    pub recipient_phone: String,
    pub recipient_city: String,
    pub recipient_address: String,
    /// Optional gift message
    pub message: Option<String>,
    /// Units purchased in this record
    pub quantity: i32,
    /// Current redemption state
    pub state: DeliveryState,
    /// When the record was redeemed; `Some` exactly when `state` is `Used`
    pub used_date: Option<DateTimeUtc>,
    /// When the record was created
    pub create_date: DateTimeUtc,
}

/// Defines relationships between `VoucherDeliveryInfo` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// Each delivery record belongs to one voucher
    #[sea_orm(
        belongs_to = "super::voucher::Entity",
        from = "Column::VoucherId",
        to = "super::voucher::Column::Id"
    )]
    Voucher,
    /// One delivery record has many audit rows
    #[sea_orm(has_many = "super::voucher_redeem_audit::Entity")]
    RedeemAudits,
}

impl Related<super::voucher::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Voucher.def()
    }
}

impl Related<super::voucher_redeem_audit::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RedeemAudits.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
