//! Brand lookups used by voucher validation, plus the minimal create/delete
//! needed to seed and test them. Full brand management lives elsewhere.

use crate::{
    core::clock::Clock,
    entities::{Brand, brand},
    errors::{Error, Result},
};
use sea_orm::{QuerySelect, Set, prelude::*};
use std::collections::HashSet;
use tracing::{debug, info};

/// Returns true if a live (non-deleted) brand with this id exists.
pub async fn brand_exists<C>(db: &C, brand_id: Uuid) -> Result<bool>
where
    C: ConnectionTrait,
{
    let count = Brand::find_by_id(brand_id)
        .filter(brand::Column::IsDeleted.eq(false))
        .count(db)
        .await?;
    Ok(count > 0)
}

/// Returns the subset of `brand_ids` that reference live brands, in one query.
pub async fn existing_brand_ids<C>(db: &C, brand_ids: &[Uuid]) -> Result<HashSet<Uuid>>
where
    C: ConnectionTrait,
{
    if brand_ids.is_empty() {
        return Ok(HashSet::new());
    }

    let ids: Vec<Uuid> = Brand::find()
        .select_only()
        .column(brand::Column::Id)
        .filter(brand::Column::Id.is_in(brand_ids.iter().copied()))
        .filter(brand::Column::IsDeleted.eq(false))
        .into_tuple()
        .all(db)
        .await?;

    debug!(requested = brand_ids.len(), found = ids.len(), "Resolved brand ids");
    Ok(ids.into_iter().collect())
}

/// Finds a live brand by name.
pub async fn get_brand_by_name(db: &DatabaseConnection, name: &str) -> Result<Option<brand::Model>> {
    Brand::find()
        .filter(brand::Column::Name.eq(name))
        .filter(brand::Column::IsDeleted.eq(false))
        .one(db)
        .await
        .map_err(Into::into)
}

/// Creates a brand.
pub async fn create_brand(
    db: &DatabaseConnection,
    clock: &dyn Clock,
    name: String,
) -> Result<brand::Model> {
    if name.trim().is_empty() {
        return Err(Error::InvalidArgument {
            message: "Brand name cannot be empty".to_string(),
        });
    }

    let brand = brand::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.trim().to_string()),
        is_deleted: Set(false),
        delete_date: Set(None),
        create_date: Set(clock.now()),
    };
    let brand = brand.insert(db).await?;
    info!(brand_id = %brand.id, name = %brand.name, "Brand created");
    Ok(brand)
}

/// Soft deletes a brand. Vouchers referencing it keep the reference but new
/// writes naming it are rejected.
pub async fn delete_brand(
    db: &DatabaseConnection,
    clock: &dyn Clock,
    brand_id: Uuid,
) -> Result<brand::Model> {
    let mut brand: brand::ActiveModel = Brand::find_by_id(brand_id)
        .filter(brand::Column::IsDeleted.eq(false))
        .one(db)
        .await?
        .ok_or(Error::BrandNotFound { id: brand_id })?
        .into();

    brand.is_deleted = Set(true);
    brand.delete_date = Set(Some(clock.now()));
    brand.update(db).await.map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_brand_exists_ignores_deleted() -> Result<()> {
        let (db, clock) = setup_test_db().await?;
        let live = create_brand(&db, &clock, "Acme".to_string()).await?;
        let gone = create_brand(&db, &clock, "Initech".to_string()).await?;
        delete_brand(&db, &clock, gone.id).await?;

        assert!(brand_exists(&db, live.id).await?);
        assert!(!brand_exists(&db, gone.id).await?);
        assert!(!brand_exists(&db, Uuid::new_v4()).await?);
        Ok(())
    }

    #[tokio::test]
    async fn test_existing_brand_ids_batch() -> Result<()> {
        let (db, clock) = setup_test_db().await?;
        let a = create_brand(&db, &clock, "A".to_string()).await?;
        let b = create_brand(&db, &clock, "B".to_string()).await?;
        delete_brand(&db, &clock, b.id).await?;
        let missing = Uuid::new_v4();

        let found = existing_brand_ids(&db, &[a.id, b.id, missing]).await?;
        assert_eq!(found, HashSet::from([a.id]));

        assert!(existing_brand_ids(&db, &[]).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn test_deleted_brand_frees_its_name() -> Result<()> {
        let (db, clock) = setup_test_db().await?;
        let old = create_brand(&db, &clock, "Acme".to_string()).await?;
        assert_eq!(get_brand_by_name(&db, "Acme").await?.map(|b| b.id), Some(old.id));

        delete_brand(&db, &clock, old.id).await?;
        assert!(get_brand_by_name(&db, "Acme").await?.is_none());

        let new = create_brand(&db, &clock, " Acme ".to_string()).await?;
        assert_eq!(get_brand_by_name(&db, "Acme").await?.map(|b| b.id), Some(new.id));
        Ok(())
    }

    #[tokio::test]
    async fn test_create_brand_rejects_blank_name() -> Result<()> {
        let (db, clock) = setup_test_db().await?;
        let result = create_brand(&db, &clock, "  ".to_string()).await;
        assert!(matches!(result, Err(Error::InvalidArgument { .. })));
        Ok(())
    }

    #[tokio::test]
    async fn test_delete_brand_twice_is_not_found() -> Result<()> {
        let (db, clock) = setup_test_db().await?;
        let brand = create_brand(&db, &clock, "Acme".to_string()).await?;
        delete_brand(&db, &clock, brand.id).await?;

        let again = delete_brand(&db, &clock, brand.id).await;
        assert!(matches!(again, Err(Error::BrandNotFound { id }) if id == brand.id));
        Ok(())
    }
}
