//! PostgreSQL-backed partitioned store.
//!
//! Each logical collection is a table of the shape:
//!
//! ```sql
//! CREATE TABLE <name> (
//!     target_id  TEXT  NOT NULL,
//!     item_id    TEXT  NOT NULL,
//!     attributes JSONB NOT NULL,
//!     PRIMARY KEY (target_id, item_id)
//! );
//! ```
//!
//! Pagination is keyset-based: the continuation cursor's `item_id` becomes
//! an exclusive bound on the sort key, so a resumed scan picks up exactly
//! where the prior page stopped. The table name comes from configuration and
//! is identifier-validated at construction; all values are bound parameters.

use crate::errors::ApiError;
use crate::store::{
    assemble_page, Attributes, Page, PartitionedStore, QueryOptions, StoreItem,
};
use serde_json::Value;
use sqlx::{PgPool, Row};
use tracing::instrument;

/// Valid table identifier: lowercase alphanumerics and underscores.
fn valid_identifier(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 63
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
        && !name.starts_with(|c: char| c.is_ascii_digit())
}

/// Partitioned store over one PostgreSQL table.
#[derive(Clone)]
pub struct PgPartitionedStore {
    pool: PgPool,
    table: String,
}

impl PgPartitionedStore {
    /// Bind to a table. The name is interpolated into query text, so it is
    /// restricted to a plain lowercase identifier; anything else is a
    /// configuration error.
    pub fn new(pool: PgPool, table: &str) -> Result<Self, ApiError> {
        if !valid_identifier(table) {
            return Err(ApiError::internal());
        }
        Ok(Self {
            pool,
            table: table.to_string(),
        })
    }

    fn row_to_item(row: &sqlx::postgres::PgRow) -> Result<StoreItem, ApiError> {
        let partition_key: String = row.try_get("target_id")?;
        let sort_key: String = row.try_get("item_id")?;
        let attributes: Value = row.try_get("attributes")?;
        let attributes = match attributes {
            Value::Object(map) => map,
            other => {
                return Err(ApiError::database(format!(
                    "attributes column held non-object JSON: {}",
                    other
                )))
            }
        };
        Ok(StoreItem {
            partition_key,
            sort_key,
            attributes,
        })
    }
}

#[async_trait::async_trait]
impl PartitionedStore for PgPartitionedStore {
    #[instrument(skip_all, fields(table = %self.table, partition_key = %partition_key))]
    async fn put(
        &self,
        partition_key: &str,
        sort_key: &str,
        attributes: Attributes,
    ) -> Result<(), ApiError> {
        let sql = format!(
            r#"
            INSERT INTO {} (target_id, item_id, attributes)
            VALUES ($1, $2, $3)
            ON CONFLICT (target_id, item_id)
            DO UPDATE SET attributes = EXCLUDED.attributes
            "#,
            self.table
        );

        sqlx::query(&sql)
            .bind(partition_key)
            .bind(sort_key)
            .bind(Value::Object(attributes))
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    #[instrument(skip_all, fields(table = %self.table, partition_key = %partition_key))]
    async fn get(
        &self,
        partition_key: &str,
        sort_key: &str,
    ) -> Result<Option<StoreItem>, ApiError> {
        let sql = format!(
            "SELECT target_id, item_id, attributes FROM {} WHERE target_id = $1 AND item_id = $2",
            self.table
        );

        let row = sqlx::query(&sql)
            .bind(partition_key)
            .bind(sort_key)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(Self::row_to_item).transpose()
    }

    #[instrument(skip_all, fields(table = %self.table, partition_key = %partition_key))]
    async fn query_page(
        &self,
        partition_key: &str,
        options: QueryOptions,
    ) -> Result<Page, ApiError> {
        // Over-fetch one row to learn whether the scan has a remainder.
        let fetch = i64::from(options.limit) + 1;

        let sql = if options.scan_descending {
            format!(
                r#"
                SELECT target_id, item_id, attributes FROM {}
                WHERE target_id = $1 AND ($2::text IS NULL OR item_id < $2)
                ORDER BY item_id DESC
                LIMIT $3
                "#,
                self.table
            )
        } else {
            format!(
                r#"
                SELECT target_id, item_id, attributes FROM {}
                WHERE target_id = $1 AND ($2::text IS NULL OR item_id > $2)
                ORDER BY item_id ASC
                LIMIT $3
                "#,
                self.table
            )
        };

        let exclusive_start = options.cursor.as_ref().map(|c| c.item_id.clone());

        let rows = sqlx::query(&sql)
            .bind(partition_key)
            .bind(exclusive_start)
            .bind(fetch)
            .fetch_all(&self.pool)
            .await?;

        let scanned: Vec<StoreItem> = rows
            .iter()
            .map(Self::row_to_item)
            .collect::<Result<_, _>>()?;

        Ok(assemble_page(
            scanned,
            options.limit,
            options.filter.as_ref(),
        ))
    }

    #[instrument(skip_all, fields(table = %self.table, partition_key = %partition_key, attribute = %attribute))]
    async fn query_flag_index(
        &self,
        partition_key: &str,
        attribute: &str,
        value: bool,
        limit: u32,
    ) -> Result<Vec<StoreItem>, ApiError> {
        // Served by the partial expression index created in the migrations;
        // the attribute name is a bound parameter, not interpolated.
        let sql = format!(
            r#"
            SELECT target_id, item_id, attributes FROM {}
            WHERE target_id = $1
              AND COALESCE((attributes ->> $2)::boolean, false) = $3
            ORDER BY item_id DESC
            LIMIT $4
            "#,
            self.table
        );

        let rows = sqlx::query(&sql)
            .bind(partition_key)
            .bind(attribute)
            .bind(value)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(Self::row_to_item).collect()
    }

    #[instrument(skip_all, fields(table = %self.table, partition_key = %partition_key))]
    async fn update(
        &self,
        partition_key: &str,
        sort_key: &str,
        deltas: Attributes,
    ) -> Result<(), ApiError> {
        // jsonb || is a shallow top-level merge, matching the partial-update
        // contract: listed attributes set, unlisted ones preserved.
        let sql = format!(
            r#"
            INSERT INTO {} (target_id, item_id, attributes)
            VALUES ($1, $2, $3)
            ON CONFLICT (target_id, item_id)
            DO UPDATE SET attributes = {}.attributes || EXCLUDED.attributes
            "#,
            self.table, self.table
        );

        sqlx::query(&sql)
            .bind(partition_key)
            .bind(sort_key)
            .bind(Value::Object(deltas))
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
