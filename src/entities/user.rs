//! User entity - The slice of a user account the ledger needs: a display name and a balance.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// User database model
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    /// Unique identifier for the user
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// Display name, copied onto delivery records as the sender name
    pub name: String,
    /// Spendable balance
    pub balance: f64,
    /// When the user was created
    pub create_date: DateTimeUtc,
}

/// `User` has no relationships the ledger navigates
#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
