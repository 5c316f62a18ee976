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

//! Periodic queue maintenance.
//!
//! The sweep is destination-scoped garbage collection: destinations whose
//! worst failure count has crossed the ceiling get their exhausted items
//! bulk-deleted, then the backing store is compacted. Everything here is
//! best-effort. A destination whose purge fails is logged and skipped;
//! un-purged items simply stay queued for the next sweep.

use tracing::{debug, info, warn};

use crate::dal::DAL;
use crate::models::delivery_queue_item::DeliveryQueueAggregate;

/// What one maintenance sweep did, for the caller's logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MaintenanceReport {
    /// Destinations that had at least one queued item.
    pub destinations_examined: usize,
    /// Ceiling-crossed destinations whose purge completed.
    pub destinations_purged: usize,
    /// Ceiling-crossed destinations whose purge hit a storage error.
    pub destinations_failed: usize,
    /// Whether the storage compaction succeeded.
    pub compacted: bool,
}

/// Destination-scoped garbage collector for the delivery queue.
#[derive(Clone, Debug)]
pub struct QueueMaintenance {
    dal: DAL,
}

impl QueueMaintenance {
    /// Creates a maintenance job over the given data access layer.
    pub fn new(dal: DAL) -> Self {
        Self { dal }
    }

    /// Runs sweeps forever at the given cadence.
    ///
    /// This future never resolves and is meant to be raced against a
    /// shutdown signal.
    pub async fn run_maintenance_loop(
        &self,
        sweep_interval: std::time::Duration,
        failure_ceiling: i32,
    ) {
        let mut ticker = tokio::time::interval(sweep_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        info!(
            sweep_interval_secs = sweep_interval.as_secs(),
            failure_ceiling, "Queue maintenance started"
        );

        loop {
            ticker.tick().await;
            self.sweep(failure_ceiling).await;
        }
    }

    /// Runs one sweep: purge every ceiling-crossed destination, then
    /// compact the store.
    ///
    /// The compaction runs regardless of how the purge phase went. Storage
    /// errors never escape the sweep; they are logged per destination and
    /// reflected in the report.
    pub async fn sweep(&self, failure_ceiling: i32) -> MaintenanceReport {
        let queue = self.dal.delivery_queue();
        let mut report = MaintenanceReport::default();

        match queue.list_aggregates_by_destination().await {
            Ok(aggregates) => {
                report.destinations_examined = aggregates.len();
                for target_server_id in destinations_to_purge(&aggregates, failure_ceiling) {
                    match queue
                        .remove_failed_at_or_above(target_server_id, failure_ceiling)
                        .await
                    {
                        Ok(removed) => {
                            debug!(target_server_id, removed, "Purged exhausted destination");
                            report.destinations_purged += 1;
                        }
                        Err(error) => {
                            warn!(
                                target_server_id,
                                %error,
                                "Purge failed for destination; continuing sweep"
                            );
                            report.destinations_failed += 1;
                        }
                    }
                }
            }
            Err(error) => {
                warn!(%error, "Could not read destination aggregates; skipping purge phase");
            }
        }

        report.compacted = match queue.compact().await {
            Ok(()) => true,
            Err(error) => {
                warn!(%error, "Queue compaction failed");
                false
            }
        };

        info!(
            destinations_examined = report.destinations_examined,
            destinations_purged = report.destinations_purged,
            destinations_failed = report.destinations_failed,
            compacted = report.compacted,
            "Maintenance sweep complete"
        );
        report
    }
}

/// Selects the destinations whose worst failure count has reached the
/// ceiling. Reaching it exactly counts as crossed.
fn destinations_to_purge(
    aggregates: &[DeliveryQueueAggregate],
    failure_ceiling: i32,
) -> Vec<i64> {
    aggregates
        .iter()
        .filter(|aggregate| aggregate.max_failed >= failure_ceiling)
        .map(|aggregate| aggregate.target_server_id)
        .collect()
}
