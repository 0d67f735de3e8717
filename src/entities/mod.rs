//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod brand;
pub mod user;
pub mod voucher;
pub mod voucher_delivery_info;
pub mod voucher_redeem_audit;

// Re-export specific types to avoid conflicts
pub use brand::{Column as BrandColumn, Entity as Brand, Model as BrandModel};
pub use user::{Column as UserColumn, Entity as User, Model as UserModel};
pub use voucher::{Column as VoucherColumn, Entity as Voucher, Model as VoucherModel};
pub use voucher_delivery_info::{
    Column as VoucherDeliveryInfoColumn, DeliveryState, Entity as VoucherDeliveryInfo,
    Model as VoucherDeliveryInfoModel,
};
pub use voucher_redeem_audit::{
    Column as VoucherRedeemAuditColumn, Entity as VoucherRedeemAudit,
    Model as VoucherRedeemAuditModel, RedeemAction,
};
