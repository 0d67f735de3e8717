//! Redeem audit entity - Append-only log of redemption state transitions.
//!
//! Rows are inserted once per successful redeem or undo and never updated.
//! `voucher_id` is denormalized from the delivery record for fast lookups.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Transition recorded by an audit row
#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
pub enum RedeemAction {
    #[sea_orm(string_value = "Redeem")]
    Redeem,
    #[sea_orm(string_value = "UndoRedeem")]
    UndoRedeem,
}

/// Redeem audit database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "voucher_redeem_audits")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub delivery_info_id: Uuid,
    pub voucher_id: Uuid,
    /// User who performed the transition
    pub performed_by: Uuid,
    pub action: RedeemAction,
    pub timestamp: DateTimeUtc,
    /// Position in the voucher's audit trail, starting at 1
    pub sequence: i64,
    /// Units affected by the transition
    pub quantity: i32,
    pub previous_is_used: bool,
    pub new_is_used: bool,
}

/// Defines relationships between `VoucherRedeemAudit` and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::voucher_delivery_info::Entity",
        from = "Column::DeliveryInfoId",
        to = "super::voucher_delivery_info::Column::Id"
    )]
    DeliveryInfo,
    #[sea_orm(
        belongs_to = "super::voucher::Entity",
        from = "Column::VoucherId",
        to = "super::voucher::Column::Id"
    )]
    Voucher,
}

impl Related<super::voucher_delivery_info::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DeliveryInfo.def()
    }
}

impl Related<super::voucher::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Voucher.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
