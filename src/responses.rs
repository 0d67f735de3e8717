//! Caller-facing response shapes.
//!
//! Each builder takes the `Result` of a core operation and never fails: every
//! error becomes `success = false` with a status code and a message. Stored
//! timestamps are UTC; they are shifted into the display offset here.

use crate::{
    core::bulk::{BulkItemResult, BulkOutcome, BulkUpsertReport},
    entities::{RedeemAction, voucher_delivery_info, voucher_redeem_audit},
    errors::{Error, ErrorKind, Result},
};
use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use tracing::error;
use uuid::Uuid;

const OK: u16 = 200;

fn failure_message(err: &Error) -> String {
    if err.kind() == ErrorKind::Internal {
        error!(error = %err, "Operation failed");
        "Internal error".to_string()
    } else {
        err.to_string()
    }
}

/// Result of a purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuyResponse {
    pub success: bool,
    pub status_code: u16,
    pub message: String,
    /// The delivery record created by the purchase
    pub delivery_info_id: Option<Uuid>,
}

impl BuyResponse {
    #[must_use]
    pub fn from_result(result: &Result<voucher_delivery_info::Model>) -> Self {
        match result {
            Ok(delivery) => Self {
                success: true,
                status_code: OK,
                message: format!("Purchased {} voucher(s)", delivery.quantity),
                delivery_info_id: Some(delivery.id),
            },
            Err(err) => Self {
                success: false,
                status_code: err.status_code(),
                message: failure_message(err),
                delivery_info_id: None,
            },
        }
    }
}

/// Result of a redeem or an undo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RedeemResponse {
    pub success: bool,
    pub status_code: u16,
    pub message: String,
    /// State after the operation; absent on failure
    pub is_used: Option<bool>,
    pub used_date: Option<DateTime<FixedOffset>>,
}

impl RedeemResponse {
    fn build(
        result: &Result<voucher_delivery_info::Model>,
        offset: FixedOffset,
        done: &str,
    ) -> Self {
        match result {
            Ok(delivery) => Self {
                success: true,
                status_code: OK,
                message: done.to_string(),
                is_used: Some(delivery.state.is_used()),
                used_date: delivery.used_date.map(|at| at.with_timezone(&offset)),
            },
            Err(err) => Self {
                success: false,
                status_code: err.status_code(),
                message: failure_message(err),
                is_used: None,
                used_date: None,
            },
        }
    }

    #[must_use]
    pub fn redeemed(result: &Result<voucher_delivery_info::Model>, offset: FixedOffset) -> Self {
        Self::build(result, offset, "Voucher redeemed")
    }

    #[must_use]
    pub fn undone(result: &Result<voucher_delivery_info::Model>, offset: FixedOffset) -> Self {
        Self::build(result, offset, "Redemption undone")
    }
}

/// Result of a bulk upsert.
///
/// A partially applied batch still reports status 200 with `success = false`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkUpsertResponse {
    pub success: bool,
    pub status_code: u16,
    pub message: String,
    pub results: Vec<BulkItemResult>,
    pub created_count: usize,
    pub updated_count: usize,
    pub failed_count: usize,
}

impl BulkUpsertResponse {
    #[must_use]
    pub fn from_result(result: Result<BulkUpsertReport>) -> Self {
        match result {
            Ok(report) => {
                let (status_code, message) = match report.outcome() {
                    BulkOutcome::AllItemsFailed => {
                        let err = Error::AllItemsFailed {
                            failed: report.failed_count,
                        };
                        (err.status_code(), err.to_string())
                    }
                    BulkOutcome::Applied | BulkOutcome::PartiallyApplied => (OK, report.message()),
                };
                Self {
                    success: report.success(),
                    status_code,
                    message,
                    created_count: report.created_count,
                    updated_count: report.updated_count,
                    failed_count: report.failed_count,
                    results: report.results,
                }
            }
            Err(err) => Self {
                success: false,
                status_code: err.status_code(),
                message: failure_message(&err),
                results: Vec::new(),
                created_count: 0,
                updated_count: 0,
                failed_count: 0,
            },
        }
    }
}

/// One audit row as shown to callers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditItem {
    pub delivery_info_id: Uuid,
    pub voucher_id: Uuid,
    pub performed_by: Uuid,
    pub action: RedeemAction,
    pub quantity: i32,
    pub previous_is_used: bool,
    pub new_is_used: bool,
    pub timestamp: DateTime<FixedOffset>,
}

/// Audit history for a voucher, newest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditsResponse {
    pub success: bool,
    pub status_code: u16,
    pub message: Option<String>,
    pub items: Vec<AuditItem>,
}

impl AuditsResponse {
    #[must_use]
    pub fn from_result(
        result: Result<Vec<voucher_redeem_audit::Model>>,
        offset: FixedOffset,
    ) -> Self {
        match result {
            Ok(audits) => Self {
                success: true,
                status_code: OK,
                message: None,
                items: audits
                    .into_iter()
                    .map(|audit| AuditItem {
                        delivery_info_id: audit.delivery_info_id,
                        voucher_id: audit.voucher_id,
                        performed_by: audit.performed_by,
                        action: audit.action,
                        quantity: audit.quantity,
                        previous_is_used: audit.previous_is_used,
                        new_is_used: audit.new_is_used,
                        timestamp: audit.timestamp.with_timezone(&offset),
                    })
                    .collect(),
            },
            Err(err) => Self {
                success: false,
                status_code: err.status_code(),
                message: Some(failure_message(&err)),
                items: Vec::new(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::config::ledger::LedgerSettings;
    use crate::core::{
        Clock,
        bulk::{BulkUpsertItem, bulk_upsert},
        redemption::{get_audits, redeem, undo_redeem},
        voucher::VoucherDraft,
    };
    use crate::entities::DeliveryState;
    use crate::test_utils::*;
    use chrono::{TimeZone, Timelike, Utc};
    use tokio_util::sync::CancellationToken;

    fn offset() -> FixedOffset {
        LedgerSettings::default().display_offset().unwrap()
    }

    #[tokio::test]
    async fn test_redeem_response_uses_display_offset() -> Result<()> {
        let (db, clock) = setup_test_db().await?;
        let (_voucher, delivery) = setup_with_delivery(&db, &clock, 5, 1).await?;
        let cancel = CancellationToken::new();

        let result = redeem(&db, &clock, &cancel, delivery.id, Uuid::new_v4()).await;
        let response = RedeemResponse::redeemed(&result, offset());
        assert!(response.success);
        assert_eq!(response.status_code, 200);
        assert_eq!(response.is_used, Some(true));
        let used_date = response.used_date.unwrap();
        assert_eq!(used_date, clock.now());
        assert_eq!(used_date.hour(), 14);

        let again = redeem(&db, &clock, &cancel, delivery.id, Uuid::new_v4()).await;
        let response = RedeemResponse::redeemed(&again, offset());
        assert!(!response.success);
        assert_eq!(response.status_code, 409);
        assert_eq!(response.is_used, None);

        let undone = undo_redeem(&db, &clock, &cancel, delivery.id, Uuid::new_v4()).await;
        let response = RedeemResponse::undone(&undone, offset());
        assert!(response.success);
        assert_eq!(response.message, "Redemption undone");
        assert_eq!(response.is_used, Some(false));
        assert_eq!(response.used_date, None);
        Ok(())
    }

    #[test]
    fn test_buy_response_failure() {
        let response = BuyResponse::from_result(&Err(Error::InsufficientBalance {
            current: 5.0,
            required: 20.0,
        }));
        assert!(!response.success);
        assert_eq!(response.status_code, 400);
        assert_eq!(response.message, "Insufficient balance: current 5.00, required 20.00");
        assert_eq!(response.delivery_info_id, None);
    }

    #[test]
    fn test_internal_errors_are_not_leaked() {
        let response = BuyResponse::from_result(&Err(Error::Database(
            sea_orm::DbErr::Custom("disk I/O error at page 7".to_string()),
        )));
        assert_eq!(response.status_code, 500);
        assert_eq!(response.message, "Internal error");
    }

    #[test]
    fn test_bulk_empty_batch_response() {
        let response = BulkUpsertResponse::from_result(Err(Error::NoItems));
        assert!(!response.success);
        assert_eq!(response.status_code, 400);
        assert!(response.results.is_empty());
    }

    #[tokio::test]
    async fn test_bulk_partial_response_shape() -> Result<()> {
        let (db, clock) = setup_test_db().await?;
        let items = vec![
            BulkUpsertItem::create(VoucherDraft::new("", "", 10.0)),
            BulkUpsertItem::create(VoucherDraft::new("Gift", "D", 5.0)),
        ];
        let result = bulk_upsert(&db, &clock, &CancellationToken::new(), &items).await;
        let response = BulkUpsertResponse::from_result(result);

        assert_eq!(response.status_code, 200);
        assert!(!response.success);
        assert_eq!(response.created_count, 1);
        assert_eq!(response.failed_count, 1);

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["statusCode"], 200);
        assert_eq!(json["createdCount"], 1);
        assert_eq!(json["results"][0]["error"], "Title is required");
        assert_eq!(json["results"][1]["created"], true);
        Ok(())
    }

    #[tokio::test]
    async fn test_bulk_all_failed_response() -> Result<()> {
        let (db, clock) = setup_test_db().await?;
        let items = vec![BulkUpsertItem::create(VoucherDraft::new("Gift", "D", 0.0))];
        let result = bulk_upsert(&db, &clock, &CancellationToken::new(), &items).await;
        let response = BulkUpsertResponse::from_result(result);

        assert!(!response.success);
        assert_eq!(response.status_code, 400);
        assert_eq!(response.results.len(), 1);
        assert_eq!(response.failed_count, 1);
        Ok(())
    }

    #[test]
    fn test_audits_response_shifts_timestamps() {
        let audit = voucher_redeem_audit::Model {
            id: Uuid::new_v4(),
            delivery_info_id: Uuid::new_v4(),
            voucher_id: Uuid::new_v4(),
            performed_by: Uuid::new_v4(),
            action: RedeemAction::Redeem,
            timestamp: Utc.with_ymd_and_hms(2025, 3, 15, 22, 30, 0).unwrap(),
            sequence: 1,
            quantity: 2,
            previous_is_used: false,
            new_is_used: true,
        };
        let response = AuditsResponse::from_result(Ok(vec![audit]), offset());
        assert!(response.success);
        let item = &response.items[0];
        assert_eq!(item.timestamp.to_rfc3339(), "2025-03-16T02:30:00+04:00");

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["items"][0]["action"], "Redeem");
        assert_eq!(json["items"][0]["previousIsUsed"], false);
        assert_eq!(json["items"][0]["newIsUsed"], true);
    }

    #[tokio::test]
    async fn test_audits_response_respects_take_cap() -> Result<()> {
        init_test_tracing();
        let (db, clock) = setup_test_db().await?;
        let (voucher, delivery) = setup_with_delivery(&db, &clock, 5, 1).await?;
        let cancel = CancellationToken::new();
        for _ in 0..3 {
            redeem(&db, &clock, &cancel, delivery.id, Uuid::new_v4()).await?;
            undo_redeem(&db, &clock, &cancel, delivery.id, Uuid::new_v4()).await?;
        }

        let settings = LedgerSettings {
            max_audit_take: 4,
            ..LedgerSettings::default()
        };
        let take = settings.audit_take(Some(50));
        let response =
            AuditsResponse::from_result(get_audits(&db, voucher.id, Some(take)).await, offset());
        assert_eq!(response.items.len(), 4);
        assert!(response.items.iter().all(|item| item.delivery_info_id == delivery.id));

        let failed = AuditsResponse::from_result(get_audits(&db, Uuid::nil(), None).await, offset());
        assert!(!failed.success);
        assert_eq!(failed.status_code, 400);
        assert!(failed.items.is_empty());

        let delivery = crate::core::voucher::get_delivery(&db, delivery.id).await?.unwrap();
        assert_eq!(delivery.state, DeliveryState::Unused);
        Ok(())
    }
}
