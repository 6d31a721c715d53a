use chrono::{DateTime, NaiveDate, Utc};
use color_eyre::{eyre::WrapErr, Result};
use kitchen::{DateRange, GroceryItem, ItemStatus};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

/// One user's shopping list for a date range.
///
/// `revision` moves on every write to the list or its items. Regeneration
/// only commits when the revision it read is still current.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct GroceryList {
    pub id: Uuid,
    pub user_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub revision: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroceryListWithItems {
    #[serde(flatten)]
    pub list: GroceryList,
    pub items: Vec<GroceryItem>,
}

const LIST_COLUMNS: &str = "id, user_id, start_date, end_date, revision, created_at, updated_at";

const ITEM_COLUMNS: &str = r"
    id, item_name, normalized_name, quantity, unit, unit_family,
    department, status, is_manual, source_recipe_id
";

impl GroceryList {
    pub fn range(&self) -> kitchen::Result<DateRange> {
        DateRange::new(self.start_date, self.end_date)
    }

    #[tracing::instrument(skip(pool), err)]
    pub async fn find_for_range(
        pool: &PgPool,
        user_id: Uuid,
        range: DateRange,
    ) -> Result<Option<Self>> {
        let list = sqlx::query_as::<_, Self>(&format!(
            "SELECT {LIST_COLUMNS} FROM grocery_lists WHERE user_id = $1 AND start_date = $2 AND end_date = $3"
        ))
        .bind(user_id)
        .bind(range.start())
        .bind(range.end())
        .fetch_optional(pool)
        .await?;

        Ok(list)
    }

    /// `None` when another request created the list for this range first.
    #[tracing::instrument(skip(pool), err)]
    pub async fn create(pool: &PgPool, user_id: Uuid, range: DateRange) -> Result<Option<Self>> {
        let list = sqlx::query_as::<_, Self>(&format!(
            r"
            INSERT INTO grocery_lists (user_id, start_date, end_date)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, start_date, end_date) DO NOTHING
            RETURNING {LIST_COLUMNS}
            "
        ))
        .bind(user_id)
        .bind(range.start())
        .bind(range.end())
        .fetch_optional(pool)
        .await
        .wrap_err("Failed to create grocery list")?;

        Ok(list)
    }

    /// Lists owned by someone else are reported as missing.
    #[tracing::instrument(skip(pool), err)]
    pub async fn get_for_user(pool: &PgPool, user_id: Uuid, list_id: Uuid) -> Result<Option<Self>> {
        let list = sqlx::query_as::<_, Self>(&format!(
            "SELECT {LIST_COLUMNS} FROM grocery_lists WHERE id = $1 AND user_id = $2"
        ))
        .bind(list_id)
        .bind(user_id)
        .fetch_optional(pool)
        .await?;

        Ok(list)
    }

    #[tracing::instrument(skip(pool), err)]
    pub async fn list_for_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<GroceryListWithItems>> {
        let lists = sqlx::query_as::<_, Self>(&format!(
            "SELECT {LIST_COLUMNS} FROM grocery_lists WHERE user_id = $1 ORDER BY start_date DESC, end_date DESC"
        ))
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        let mut with_items = Vec::with_capacity(lists.len());
        for list in lists {
            with_items.push(list.with_items(pool).await?);
        }

        Ok(with_items)
    }

    #[tracing::instrument(skip(pool), err)]
    pub async fn delete_for_user(pool: &PgPool, user_id: Uuid, list_id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM grocery_lists WHERE id = $1 AND user_id = $2")
            .bind(list_id)
            .bind(user_id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Items in aisle order.
    #[tracing::instrument(skip_all, fields(list_id = %self.id), err)]
    pub async fn items(&self, pool: &PgPool) -> Result<Vec<GroceryItem>> {
        let mut items = sqlx::query_as::<_, GroceryItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM grocery_list_items WHERE grocery_list_id = $1"
        ))
        .bind(self.id)
        .fetch_all(pool)
        .await
        .wrap_err("Failed to load grocery list items")?;

        kitchen::sort_items(&mut items);

        Ok(items)
    }

    pub async fn with_items(self, pool: &PgPool) -> Result<GroceryListWithItems> {
        let items = self.items(pool).await?;

        Ok(GroceryListWithItems { list: self, items })
    }

    /// Replace the derived items if the list is still at the revision it was
    /// read at. Returns the list at its new revision, or `None` when another
    /// write got there first and nothing was changed.
    ///
    /// Manual items are left alone; only the non-manual entries of `items`
    /// are written.
    #[tracing::instrument(skip_all, fields(list_id = %self.id, revision = self.revision), err)]
    pub async fn commit_generation(
        &self,
        pool: &PgPool,
        items: &[GroceryItem],
    ) -> Result<Option<Self>> {
        let mut tx = pool.begin().await?;

        let updated = sqlx::query_as::<_, Self>(&format!(
            r"
            UPDATE grocery_lists
            SET revision = revision + 1, updated_at = NOW()
            WHERE id = $1 AND revision = $2
            RETURNING {LIST_COLUMNS}
            "
        ))
        .bind(self.id)
        .bind(self.revision)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(updated) = updated else {
            tx.rollback().await?;
            tracing::info!("Grocery list revision moved, not committing");
            return Ok(None);
        };

        sqlx::query("DELETE FROM grocery_list_items WHERE grocery_list_id = $1 AND NOT is_manual")
            .bind(self.id)
            .execute(&mut *tx)
            .await?;

        for item in items.iter().filter(|item| !item.is_manual) {
            insert_item(&mut tx, self.id, item).await?;
        }

        tx.commit().await?;

        Ok(Some(updated))
    }

    #[tracing::instrument(skip_all, fields(list_id = %self.id), err)]
    pub async fn add_manual_item(&self, pool: &PgPool, item: &GroceryItem) -> Result<GroceryItem> {
        let mut tx = pool.begin().await?;

        bump_revision(&mut tx, self.id).await?;
        let inserted = insert_item(&mut tx, self.id, item).await?;

        tx.commit().await?;

        Ok(inserted)
    }
}

/// Set one item's status. `None` when the item doesn't exist or isn't on one
/// of the user's lists.
#[tracing::instrument(skip(pool), err)]
pub async fn update_item_status(
    pool: &PgPool,
    user_id: Uuid,
    item_id: Uuid,
    status: ItemStatus,
) -> Result<Option<GroceryItem>> {
    let mut tx = pool.begin().await?;

    let list_id = sqlx::query_scalar::<_, Uuid>(
        r"
        SELECT i.grocery_list_id
        FROM grocery_list_items i
        JOIN grocery_lists l ON l.id = i.grocery_list_id
        WHERE i.id = $1 AND l.user_id = $2
        ",
    )
    .bind(item_id)
    .bind(user_id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(list_id) = list_id else {
        return Ok(None);
    };

    bump_revision(&mut tx, list_id).await?;

    // A regeneration that committed since the lookup may have dropped the item.
    let item = sqlx::query_as::<_, GroceryItem>(&format!(
        "UPDATE grocery_list_items SET status = $2 WHERE id = $1 RETURNING {ITEM_COLUMNS}"
    ))
    .bind(item_id)
    .bind(status)
    .fetch_optional(&mut *tx)
    .await
    .wrap_err("Failed to update item status")?;

    let Some(item) = item else {
        tx.rollback().await?;
        return Ok(None);
    };

    tx.commit().await?;

    Ok(Some(item))
}

async fn bump_revision(tx: &mut Transaction<'_, Postgres>, list_id: Uuid) -> Result<()> {
    sqlx::query(
        "UPDATE grocery_lists SET revision = revision + 1, updated_at = NOW() WHERE id = $1",
    )
    .bind(list_id)
    .execute(&mut **tx)
    .await?;

    Ok(())
}

async fn insert_item(
    tx: &mut Transaction<'_, Postgres>,
    list_id: Uuid,
    item: &GroceryItem,
) -> Result<GroceryItem> {
    let inserted = sqlx::query_as::<_, GroceryItem>(&format!(
        r"
        INSERT INTO grocery_list_items (
            id, grocery_list_id, item_name, normalized_name, quantity, unit,
            unit_family, department, status, is_manual, source_recipe_id
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        RETURNING {ITEM_COLUMNS}
        "
    ))
    .bind(item.id.unwrap_or_else(Uuid::new_v4))
    .bind(list_id)
    .bind(&item.item_name)
    .bind(&item.normalized_name)
    .bind(item.quantity)
    .bind(&item.unit)
    .bind(item.unit_family)
    .bind(item.department)
    .bind(item.status)
    .bind(item.is_manual)
    .bind(item.source_recipe_id)
    .fetch_one(&mut **tx)
    .await
    .wrap_err_with(|| format!("Failed to insert grocery item {}", item.item_name))?;

    Ok(inserted)
}
