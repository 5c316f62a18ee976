/*
 *  Copyright 2025-2026 Colliery Software
 *
 *  Licensed under the Apache License, Version 2.0 (the "License");
 *  you may not use this file except in compliance with the License.
 *  You may obtain a copy of the License at
 *
 *      http://www.apache.org/licenses/LICENSE-2.0
 *
 *  Unless required by applicable law or agreed to in writing, software
 *  distributed under the License is distributed on an "AS IS" BASIS,
 *  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 *  See the License for the specific language governing permissions and
 *  limitations under the License.
 */

//! Unified Delivery Queue DAL with runtime backend selection
//!
//! The queue is a durable retry ledger keyed by
//! `(target_server_id, post_uri_id)`. Multiple worker processes may operate
//! on it concurrently, so every mutation here is a single atomic statement:
//! the upsert, the `failed = failed + 1` increment, and the keyed deletes
//! never read-modify-write. "No row matched" is reported as `false`, not as
//! an error; see `crate::error` for the split between the two.

use diesel::prelude::*;
use rand::seq::SliceRandom;
use tracing::debug;

use super::models::UnifiedDeliveryQueueItem;
use super::DAL;
use crate::database::schema::unified::delivery_queue;
use crate::error::StorageError;
use crate::models::delivery_queue_item::{DeliveryQueueAggregate, DeliveryQueueItem};

/// Data access layer for delivery queue operations with runtime backend
/// selection.
#[derive(Clone)]
pub struct DeliveryQueueDAL<'a> {
    dal: &'a DAL,
}

impl<'a> DeliveryQueueDAL<'a> {
    /// Creates a new DeliveryQueueDAL instance.
    pub fn new(dal: &'a DAL) -> Self {
        Self { dal }
    }

    /// Inserts a delivery item, or overwrites the existing row for the same
    /// `(target_server_id, post_uri_id)` pair.
    ///
    /// The overwrite replaces every non-key column with the supplied item's
    /// values, `created_at` and `failed` included - re-enqueueing resets the
    /// failure count. Callers who want to keep the original enqueue time
    /// must read-then-write. Destinations unknown to the server registry are
    /// accepted; referential integrity is the caller's concern.
    pub async fn enqueue(&self, item: DeliveryQueueItem) -> Result<(), StorageError> {
        debug!(
            target_server_id = item.target_server_id,
            post_uri_id = item.post_uri_id,
            command = %item.command,
            "Enqueueing delivery item"
        );
        crate::dispatch_backend!(
            self.dal.backend(),
            self.enqueue_postgres(item).await,
            self.enqueue_sqlite(item).await
        )
    }

    #[cfg(feature = "postgres")]
    async fn enqueue_postgres(&self, item: DeliveryQueueItem) -> Result<(), StorageError> {
        let conn = self
            .dal
            .database
            .get_postgres_connection()
            .await
            .map_err(|e| StorageError::ConnectionPool(e.to_string()))?;

        let row = UnifiedDeliveryQueueItem::from(item);
        conn.interact(move |conn| {
            let overwrite = row.clone();
            diesel::insert_into(delivery_queue::table)
                .values(&row)
                .on_conflict((
                    delivery_queue::target_server_id,
                    delivery_queue::post_uri_id,
                ))
                .do_update()
                .set(&overwrite)
                .execute(conn)
        })
        .await
        .map_err(|e| StorageError::ConnectionPool(e.to_string()))??;

        Ok(())
    }

    #[cfg(feature = "sqlite")]
    async fn enqueue_sqlite(&self, item: DeliveryQueueItem) -> Result<(), StorageError> {
        let conn = self
            .dal
            .database
            .get_sqlite_connection()
            .await
            .map_err(|e| StorageError::ConnectionPool(e.to_string()))?;

        let row = UnifiedDeliveryQueueItem::from(item);
        conn.interact(move |conn| {
            let overwrite = row.clone();
            diesel::insert_into(delivery_queue::table)
                .values(&row)
                .on_conflict((
                    delivery_queue::target_server_id,
                    delivery_queue::post_uri_id,
                ))
                .do_update()
                .set(&overwrite)
                .execute(conn)
        })
        .await
        .map_err(|e| StorageError::ConnectionPool(e.to_string()))??;

        Ok(())
    }

    /// Returns the destination's pending items with `failed` strictly below
    /// `max_failed_count`, oldest first.
    ///
    /// The threshold is a query parameter on purpose: an item with
    /// `failed == max_failed_count` is excluded, which is how abandoned
    /// items stop being handed to workers. The result is a finite snapshot;
    /// re-running the query reflects the current queue state.
    pub async fn list_by_destination(
        &self,
        target_server_id: i64,
        max_failed_count: i32,
    ) -> Result<Vec<DeliveryQueueItem>, StorageError> {
        let rows = crate::dispatch_backend!(
            self.dal.backend(),
            self.list_by_destination_postgres(target_server_id, max_failed_count)
                .await,
            self.list_by_destination_sqlite(target_server_id, max_failed_count)
                .await
        )?;

        Ok(rows.into_iter().map(DeliveryQueueItem::from).collect())
    }

    #[cfg(feature = "postgres")]
    async fn list_by_destination_postgres(
        &self,
        target_server_id: i64,
        max_failed_count: i32,
    ) -> Result<Vec<UnifiedDeliveryQueueItem>, StorageError> {
        let conn = self
            .dal
            .database
            .get_postgres_connection()
            .await
            .map_err(|e| StorageError::ConnectionPool(e.to_string()))?;

        let rows = conn
            .interact(move |conn| {
                delivery_queue::table
                    .filter(delivery_queue::target_server_id.eq(target_server_id))
                    .filter(delivery_queue::failed.lt(max_failed_count))
                    .order(delivery_queue::created_at.asc())
                    .load::<UnifiedDeliveryQueueItem>(conn)
            })
            .await
            .map_err(|e| StorageError::ConnectionPool(e.to_string()))??;

        Ok(rows)
    }

    #[cfg(feature = "sqlite")]
    async fn list_by_destination_sqlite(
        &self,
        target_server_id: i64,
        max_failed_count: i32,
    ) -> Result<Vec<UnifiedDeliveryQueueItem>, StorageError> {
        let conn = self
            .dal
            .database
            .get_sqlite_connection()
            .await
            .map_err(|e| StorageError::ConnectionPool(e.to_string()))?;

        let rows = conn
            .interact(move |conn| {
                delivery_queue::table
                    .filter(delivery_queue::target_server_id.eq(target_server_id))
                    .filter(delivery_queue::failed.lt(max_failed_count))
                    .order(delivery_queue::created_at.asc())
                    .load::<UnifiedDeliveryQueueItem>(conn)
            })
            .await
            .map_err(|e| StorageError::ConnectionPool(e.to_string()))??;

        Ok(rows)
    }

    /// Returns one aggregate per destination with queued items, carrying the
    /// destination's worst outstanding failure count.
    ///
    /// The order is shuffled per call. When several destinations are equally
    /// overdue none of them should be perpetually serviced first, so
    /// consumers get a different order every time; tests must assert the set
    /// of aggregates, never the sequence.
    pub async fn list_aggregates_by_destination(
        &self,
    ) -> Result<Vec<DeliveryQueueAggregate>, StorageError> {
        let rows = crate::dispatch_backend!(
            self.dal.backend(),
            self.list_aggregates_postgres().await,
            self.list_aggregates_sqlite().await
        )?;

        let mut aggregates: Vec<DeliveryQueueAggregate> = rows
            .into_iter()
            .map(|(target_server_id, max_failed)| DeliveryQueueAggregate {
                target_server_id,
                max_failed: max_failed.unwrap_or(0),
            })
            .collect();

        aggregates.shuffle(&mut rand::thread_rng());
        Ok(aggregates)
    }

    #[cfg(feature = "postgres")]
    async fn list_aggregates_postgres(&self) -> Result<Vec<(i64, Option<i32>)>, StorageError> {
        let conn = self
            .dal
            .database
            .get_postgres_connection()
            .await
            .map_err(|e| StorageError::ConnectionPool(e.to_string()))?;

        let rows = conn
            .interact(|conn| {
                delivery_queue::table
                    .group_by(delivery_queue::target_server_id)
                    .select((
                        delivery_queue::target_server_id,
                        diesel::dsl::max(delivery_queue::failed),
                    ))
                    .load::<(i64, Option<i32>)>(conn)
            })
            .await
            .map_err(|e| StorageError::ConnectionPool(e.to_string()))??;

        Ok(rows)
    }

    #[cfg(feature = "sqlite")]
    async fn list_aggregates_sqlite(&self) -> Result<Vec<(i64, Option<i32>)>, StorageError> {
        let conn = self
            .dal
            .database
            .get_sqlite_connection()
            .await
            .map_err(|e| StorageError::ConnectionPool(e.to_string()))?;

        let rows = conn
            .interact(|conn| {
                delivery_queue::table
                    .group_by(delivery_queue::target_server_id)
                    .select((
                        delivery_queue::target_server_id,
                        diesel::dsl::max(delivery_queue::failed),
                    ))
                    .load::<(i64, Option<i32>)>(conn)
            })
            .await
            .map_err(|e| StorageError::ConnectionPool(e.to_string()))??;

        Ok(rows)
    }

    /// Deletes the row for the exact `(target_server_id, post_uri_id)` pair.
    ///
    /// Returns whether a row was actually deleted. Removing an absent key is
    /// a normal outcome (two workers racing after a crash, for instance) and
    /// yields `Ok(false)`.
    pub async fn remove(
        &self,
        target_server_id: i64,
        post_uri_id: i64,
    ) -> Result<bool, StorageError> {
        crate::dispatch_backend!(
            self.dal.backend(),
            self.remove_postgres(target_server_id, post_uri_id).await,
            self.remove_sqlite(target_server_id, post_uri_id).await
        )
    }

    #[cfg(feature = "postgres")]
    async fn remove_postgres(
        &self,
        target_server_id: i64,
        post_uri_id: i64,
    ) -> Result<bool, StorageError> {
        let conn = self
            .dal
            .database
            .get_postgres_connection()
            .await
            .map_err(|e| StorageError::ConnectionPool(e.to_string()))?;

        let deleted = conn
            .interact(move |conn| {
                diesel::delete(delivery_queue::table.find((target_server_id, post_uri_id)))
                    .execute(conn)
            })
            .await
            .map_err(|e| StorageError::ConnectionPool(e.to_string()))??;

        Ok(deleted > 0)
    }

    #[cfg(feature = "sqlite")]
    async fn remove_sqlite(
        &self,
        target_server_id: i64,
        post_uri_id: i64,
    ) -> Result<bool, StorageError> {
        let conn = self
            .dal
            .database
            .get_sqlite_connection()
            .await
            .map_err(|e| StorageError::ConnectionPool(e.to_string()))?;

        let deleted = conn
            .interact(move |conn| {
                diesel::delete(delivery_queue::table.find((target_server_id, post_uri_id)))
                    .execute(conn)
            })
            .await
            .map_err(|e| StorageError::ConnectionPool(e.to_string()))??;

        Ok(deleted > 0)
    }

    /// Bulk-deletes the destination's rows whose `failed` is at or above the
    /// threshold.
    ///
    /// Rows below the threshold and rows of other destinations are left
    /// untouched. Returns whether anything was removed.
    pub async fn remove_failed_at_or_above(
        &self,
        target_server_id: i64,
        failed_threshold: i32,
    ) -> Result<bool, StorageError> {
        debug!(
            target_server_id,
            failed_threshold, "Purging exhausted delivery items"
        );
        crate::dispatch_backend!(
            self.dal.backend(),
            self.remove_failed_at_or_above_postgres(target_server_id, failed_threshold)
                .await,
            self.remove_failed_at_or_above_sqlite(target_server_id, failed_threshold)
                .await
        )
    }

    #[cfg(feature = "postgres")]
    async fn remove_failed_at_or_above_postgres(
        &self,
        target_server_id: i64,
        failed_threshold: i32,
    ) -> Result<bool, StorageError> {
        let conn = self
            .dal
            .database
            .get_postgres_connection()
            .await
            .map_err(|e| StorageError::ConnectionPool(e.to_string()))?;

        let deleted = conn
            .interact(move |conn| {
                diesel::delete(
                    delivery_queue::table
                        .filter(delivery_queue::target_server_id.eq(target_server_id))
                        .filter(delivery_queue::failed.ge(failed_threshold)),
                )
                .execute(conn)
            })
            .await
            .map_err(|e| StorageError::ConnectionPool(e.to_string()))??;

        Ok(deleted > 0)
    }

    #[cfg(feature = "sqlite")]
    async fn remove_failed_at_or_above_sqlite(
        &self,
        target_server_id: i64,
        failed_threshold: i32,
    ) -> Result<bool, StorageError> {
        let conn = self
            .dal
            .database
            .get_sqlite_connection()
            .await
            .map_err(|e| StorageError::ConnectionPool(e.to_string()))?;

        let deleted = conn
            .interact(move |conn| {
                diesel::delete(
                    delivery_queue::table
                        .filter(delivery_queue::target_server_id.eq(target_server_id))
                        .filter(delivery_queue::failed.ge(failed_threshold)),
                )
                .execute(conn)
            })
            .await
            .map_err(|e| StorageError::ConnectionPool(e.to_string()))??;

        Ok(deleted > 0)
    }

    /// Atomically increments `failed` for the matching row.
    ///
    /// Issued as a single `UPDATE ... SET failed = failed + 1`, so
    /// concurrent reporters on the same key all land; there is no window in
    /// which an increment can be lost. Returns whether a row matched.
    pub async fn increment_failed(
        &self,
        target_server_id: i64,
        post_uri_id: i64,
    ) -> Result<bool, StorageError> {
        crate::dispatch_backend!(
            self.dal.backend(),
            self.increment_failed_postgres(target_server_id, post_uri_id)
                .await,
            self.increment_failed_sqlite(target_server_id, post_uri_id)
                .await
        )
    }

    #[cfg(feature = "postgres")]
    async fn increment_failed_postgres(
        &self,
        target_server_id: i64,
        post_uri_id: i64,
    ) -> Result<bool, StorageError> {
        let conn = self
            .dal
            .database
            .get_postgres_connection()
            .await
            .map_err(|e| StorageError::ConnectionPool(e.to_string()))?;

        let updated_rows = conn
            .interact(move |conn| {
                diesel::update(delivery_queue::table.find((target_server_id, post_uri_id)))
                    .set(delivery_queue::failed.eq(delivery_queue::failed + 1))
                    .execute(conn)
            })
            .await
            .map_err(|e| StorageError::ConnectionPool(e.to_string()))??;

        Ok(updated_rows == 1)
    }

    #[cfg(feature = "sqlite")]
    async fn increment_failed_sqlite(
        &self,
        target_server_id: i64,
        post_uri_id: i64,
    ) -> Result<bool, StorageError> {
        let conn = self
            .dal
            .database
            .get_sqlite_connection()
            .await
            .map_err(|e| StorageError::ConnectionPool(e.to_string()))?;

        let updated_rows = conn
            .interact(move |conn| {
                diesel::update(delivery_queue::table.find((target_server_id, post_uri_id)))
                    .set(delivery_queue::failed.eq(delivery_queue::failed + 1))
                    .execute(conn)
            })
            .await
            .map_err(|e| StorageError::ConnectionPool(e.to_string()))??;

        Ok(updated_rows == 1)
    }

    /// Performs storage-level maintenance on the queue table.
    ///
    /// Reclaims space and refreshes planner statistics (`VACUUM ANALYZE` on
    /// PostgreSQL, `PRAGMA optimize` on SQLite); queue contents are not
    /// affected.
    pub async fn compact(&self) -> Result<(), StorageError> {
        debug!("Compacting delivery queue storage");
        crate::dispatch_backend!(
            self.dal.backend(),
            self.compact_postgres().await,
            self.compact_sqlite().await
        )
    }

    #[cfg(feature = "postgres")]
    async fn compact_postgres(&self) -> Result<(), StorageError> {
        let conn = self
            .dal
            .database
            .get_postgres_connection()
            .await
            .map_err(|e| StorageError::ConnectionPool(e.to_string()))?;

        conn.interact(|conn| diesel::sql_query("VACUUM ANALYZE delivery_queue").execute(conn))
            .await
            .map_err(|e| StorageError::ConnectionPool(e.to_string()))??;

        Ok(())
    }

    #[cfg(feature = "sqlite")]
    async fn compact_sqlite(&self) -> Result<(), StorageError> {
        let conn = self
            .dal
            .database
            .get_sqlite_connection()
            .await
            .map_err(|e| StorageError::ConnectionPool(e.to_string()))?;

        conn.interact(|conn| diesel::sql_query("PRAGMA optimize").execute(conn))
            .await
            .map_err(|e| StorageError::ConnectionPool(e.to_string()))??;

        Ok(())
    }
}
