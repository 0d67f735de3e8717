//! Brand entity - Only used by the ledger to check that a voucher's brand exists.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Brand database model
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "brands")]
pub struct Model {
    /// Unique identifier for the brand
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Brand name; a soft-deleted brand frees its name
    pub name: String,
    /// Soft delete flag
    pub is_deleted: bool,
    /// When the brand was soft-deleted
    pub delete_date: Option<DateTimeUtc>,
    /// When the brand was created
    pub create_date: DateTimeUtc,
}

/// Defines relationships between Brand and other entities
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    /// One brand has many vouchers
    #[sea_orm(has_many = "super::voucher::Entity")]
    Vouchers,
}

impl Related<super::voucher::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Vouchers.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
