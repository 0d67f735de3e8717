//! Bulk upsert - create or update many vouchers in one call.
//!
//! Items are judged independently: one bad item never stops the others. The
//! work is split in two passes:
//!
//! 1. [`plan_bulk_upsert`] folds the items into per-item results plus the
//!    staged creates and updates. It is pure and touches no database.
//! 2. [`bulk_upsert`] loads what the plan needs, then writes every staged row
//!    in a single transaction.
//!
//! If an id appears more than once, every item for it edits the same staged
//! voucher, so the last item for that id decides the final state.

use crate::{
    core::{brand, clock::Clock, ensure_not_cancelled, voucher::VoucherDraft},
    entities::{Voucher, voucher},
    errors::{Error, Result},
};
use chrono::{DateTime, Utc};
use sea_orm::{Set, TransactionTrait, prelude::*};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

/// One create-or-update instruction. No `id` means create.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkUpsertItem {
    #[serde(default)]
    pub id: Option<Uuid>,
    #[serde(flatten)]
    pub voucher: VoucherDraft,
}

impl BulkUpsertItem {
    /// An item that creates a new voucher.
    #[must_use]
    pub const fn create(voucher: VoucherDraft) -> Self {
        Self { id: None, voucher }
    }

    /// An item that overwrites voucher `id`.
    #[must_use]
    pub const fn update(id: Uuid, voucher: VoucherDraft) -> Self {
        Self {
            id: Some(id),
            voucher,
        }
    }
}

/// Outcome of a single item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BulkItemResult {
    /// Id supplied with the item, if any
    pub input_id: Option<Uuid>,
    /// Id of the created or updated voucher; `None` when the item failed
    pub id: Option<Uuid>,
    pub created: bool,
    pub updated: bool,
    pub success: bool,
    /// Why the item failed
    pub error: Option<String>,
    /// Title echoed from the item
    pub title: String,
}

impl BulkItemResult {
    fn failed(item: &BulkUpsertItem, error: &Error) -> Self {
        let reason = match error {
            Error::ValidationFailed { message } => message.clone(),
            other => other.to_string(),
        };
        Self {
            input_id: item.id,
            id: None,
            created: false,
            updated: false,
            success: false,
            error: Some(reason),
            title: item.voucher.title.clone(),
        }
    }

    fn applied(item: &BulkUpsertItem, id: Uuid) -> Self {
        Self {
            input_id: item.id,
            id: Some(id),
            created: item.id.is_none(),
            updated: item.id.is_some(),
            success: true,
            error: None,
            title: item.voucher.title.clone(),
        }
    }
}

/// How much of a batch was applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BulkOutcome {
    /// Every item succeeded
    Applied,
    /// Some items succeeded and were committed, some failed
    PartiallyApplied,
    /// No item succeeded; nothing was written
    AllItemsFailed,
}

/// Result of a bulk upsert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BulkUpsertReport {
    /// Per-item results in input order
    pub results: Vec<BulkItemResult>,
    pub created_count: usize,
    pub updated_count: usize,
    pub failed_count: usize,
}

impl BulkUpsertReport {
    fn from_results(results: Vec<BulkItemResult>) -> Self {
        let created_count = results.iter().filter(|r| r.created).count();
        let updated_count = results.iter().filter(|r| r.updated).count();
        let failed_count = results.iter().filter(|r| !r.success).count();
        Self {
            results,
            created_count,
            updated_count,
            failed_count,
        }
    }

    #[must_use]
    pub const fn outcome(&self) -> BulkOutcome {
        if self.created_count + self.updated_count == 0 {
            BulkOutcome::AllItemsFailed
        } else if self.failed_count == 0 {
            BulkOutcome::Applied
        } else {
            BulkOutcome::PartiallyApplied
        }
    }

    /// True only when every item was applied.
    #[must_use]
    pub const fn success(&self) -> bool {
        matches!(self.outcome(), BulkOutcome::Applied)
    }

    #[must_use]
    pub fn message(&self) -> String {
        format!(
            "Created {}, updated {}, failed {}",
            self.created_count, self.updated_count, self.failed_count
        )
    }
}

/// What the first pass decided.
#[derive(Debug)]
pub struct BulkPlan {
    pub results: Vec<BulkItemResult>,
    /// New vouchers, in input order
    pub creates: Vec<voucher::ActiveModel>,
    /// Edited vouchers, one entry per distinct id, in first-touched order
    pub updates: Vec<voucher::ActiveModel>,
}

impl BulkPlan {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.creates.is_empty() && self.updates.is_empty()
    }
}

/// Judges every item against the current vouchers and live brands.
///
/// `existing` holds the live vouchers for the ids named by the items; ids
/// missing from it fail with `VoucherNotFound`.
#[must_use]
pub fn plan_bulk_upsert(
    items: &[BulkUpsertItem],
    existing: HashMap<Uuid, voucher::Model>,
    live_brands: &HashSet<Uuid>,
    now: DateTime<Utc>,
) -> BulkPlan {
    let mut staged: HashMap<Uuid, voucher::ActiveModel> = existing
        .into_iter()
        .map(|(id, model)| (id, model.into()))
        .collect();
    let mut update_order: Vec<Uuid> = Vec::new();
    let mut creates = Vec::new();
    let mut results = Vec::with_capacity(items.len());

    for item in items {
        let checked = item.voucher.validate().and_then(|()| match item.voucher.brand_id {
            Some(id) if !live_brands.contains(&id) => Err(Error::BrandNotFound { id }),
            _ => Ok(()),
        });
        if let Err(error) = checked {
            results.push(BulkItemResult::failed(item, &error));
            continue;
        }

        match item.id {
            None => {
                let id = Uuid::new_v4();
                creates.push(item.voucher.to_new_active_model(id, now));
                results.push(BulkItemResult::applied(item, id));
            }
            Some(id) => {
                let Some(model) = staged.get_mut(&id) else {
                    results.push(BulkItemResult::failed(item, &Error::VoucherNotFound { id }));
                    continue;
                };
                item.voucher.apply_to(model);
                model.update_date = Set(Some(now));
                if !update_order.contains(&id) {
                    update_order.push(id);
                }
                results.push(BulkItemResult::applied(item, id));
            }
        }
    }

    let updates = update_order
        .iter()
        .filter_map(|id| staged.remove(id))
        .collect();

    BulkPlan {
        results,
        creates,
        updates,
    }
}

/// Applies a batch of voucher creates and updates.
///
/// Fails with `NoItems` for an empty batch. Otherwise always returns a report:
/// when no item is valid nothing is written and the report's outcome is
/// [`BulkOutcome::AllItemsFailed`]; when at least one is valid, all valid
/// items are committed together.
#[instrument(skip(db, clock, cancel, items), fields(items = items.len()))]
pub async fn bulk_upsert(
    db: &DatabaseConnection,
    clock: &dyn Clock,
    cancel: &CancellationToken,
    items: &[BulkUpsertItem],
) -> Result<BulkUpsertReport> {
    ensure_not_cancelled(cancel)?;
    if items.is_empty() {
        return Err(Error::NoItems);
    }

    let txn = db.begin().await?;

    let mut ids: Vec<Uuid> = items.iter().filter_map(|item| item.id).collect();
    ids.sort_unstable();
    ids.dedup();
    let existing: HashMap<Uuid, voucher::Model> = if ids.is_empty() {
        HashMap::new()
    } else {
        Voucher::find()
            .filter(voucher::Column::Id.is_in(ids))
            .filter(voucher::Column::IsDeleted.eq(false))
            .all(&txn)
            .await?
            .into_iter()
            .map(|model| (model.id, model))
            .collect()
    };

    let mut brand_ids: Vec<Uuid> = items.iter().filter_map(|item| item.voucher.brand_id).collect();
    brand_ids.sort_unstable();
    brand_ids.dedup();
    let live_brands = brand::existing_brand_ids(&txn, &brand_ids).await?;

    let plan = plan_bulk_upsert(items, existing, &live_brands, clock.now());
    if plan.is_empty() {
        let report = BulkUpsertReport::from_results(plan.results);
        warn!(failed = report.failed_count, "Bulk upsert rejected: every item failed");
        return Ok(report);
    }

    for model in plan.creates {
        model.insert(&txn).await?;
    }
    for model in plan.updates {
        model.update(&txn).await?;
    }

    ensure_not_cancelled(cancel)?;
    txn.commit().await?;

    let report = BulkUpsertReport::from_results(plan.results);
    info!(
        created = report.created_count,
        updated = report.updated_count,
        failed = report.failed_count,
        "Bulk upsert committed"
    );
    Ok(report)
}
