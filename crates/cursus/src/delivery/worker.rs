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

//! Per-destination delivery worker.
//!
//! One cycle reads the destination aggregates, then works each destination
//! still under the failure ceiling as a batch: fetch its pending items
//! oldest first, hand them to the transport one by one, and record every
//! outcome through the [`OutcomeRecorder`]. A destination whose server is
//! down gets cut short; the remaining items take a failure mark without a
//! network attempt each.
//!
//! Destinations already at or past the ceiling are left alone here. The
//! maintenance sweep purges them.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, error, info, warn};

use crate::clock::Clock;
use crate::dal::DAL;
use crate::error::StorageError;

use super::recorder::OutcomeRecorder;
use super::transport::{DeliveryOutcome, DeliveryTransport};

/// Tuning knobs for the delivery worker.
#[derive(Debug, Clone, Copy)]
pub struct DeliveryWorkerConfig {
    /// Items with `failed` at or above this value are no longer attempted.
    pub failure_ceiling: i32,
    /// How long to wait before re-probing a server that was unreachable.
    pub unreachable_backoff: Duration,
    /// How far ahead to schedule the next routine contact after a success.
    pub reachable_recheck: Duration,
}

impl Default for DeliveryWorkerConfig {
    fn default() -> Self {
        Self {
            failure_ceiling: 5,
            unreachable_backoff: Duration::from_secs(60 * 60),
            reachable_recheck: Duration::from_secs(24 * 60 * 60),
        }
    }
}

/// Outcome summary for one destination batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DestinationReport {
    /// Items confirmed delivered and removed from the queue.
    pub delivered: usize,
    /// Items whose failure count was incremented.
    pub failed: usize,
    /// Whether the transport declared the server unreachable mid-batch.
    pub unreachable: bool,
    /// Whether the batch was skipped because the registry already considers
    /// the server unreachable or blocked.
    pub skipped: bool,
}

/// Outcome summary for one full worker cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Destinations that had at least one queued item.
    pub destinations_examined: usize,
    /// Destinations under the failure ceiling that were handed to the
    /// transport this cycle.
    pub destinations_serviced: usize,
    /// Total items delivered across all serviced destinations.
    pub delivered: usize,
    /// Total failure marks recorded across all serviced destinations.
    pub failed: usize,
}

/// Drains pending deliveries destination by destination.
pub struct DeliveryWorker {
    dal: DAL,
    recorder: OutcomeRecorder,
    transport: Arc<dyn DeliveryTransport>,
    clock: Arc<dyn Clock>,
    config: DeliveryWorkerConfig,
}

impl DeliveryWorker {
    /// Creates a worker over the given storage, transport and clock.
    pub fn new(
        dal: DAL,
        transport: Arc<dyn DeliveryTransport>,
        clock: Arc<dyn Clock>,
        config: DeliveryWorkerConfig,
    ) -> Self {
        let recorder = OutcomeRecorder::new(dal.clone());
        Self {
            dal,
            recorder,
            transport,
            clock,
            config,
        }
    }

    /// Runs delivery cycles forever at the given cadence.
    ///
    /// A failed cycle is logged and the next tick gets a fresh chance;
    /// transient storage trouble must not kill the service. This future
    /// never resolves and is meant to be raced against a shutdown signal.
    pub async fn run_delivery_loop(&self, poll_interval: Duration) {
        let mut ticker = tokio::time::interval(poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        info!(
            poll_interval_secs = poll_interval.as_secs(),
            "Delivery worker started"
        );

        loop {
            ticker.tick().await;
            if let Err(error) = self.run_cycle().await {
                error!(%error, "Delivery cycle failed");
            }
        }
    }

    /// Runs one delivery pass over every destination with queued items.
    ///
    /// Destinations are serviced in the randomized order the aggregate
    /// query returns them. A destination whose worst failure count has
    /// reached the ceiling is counted as examined but not serviced.
    pub async fn run_cycle(&self) -> Result<CycleReport, StorageError> {
        let aggregates = self
            .dal
            .delivery_queue()
            .list_aggregates_by_destination()
            .await?;

        let mut cycle = CycleReport {
            destinations_examined: aggregates.len(),
            ..Default::default()
        };

        for aggregate in aggregates {
            if aggregate.max_failed >= self.config.failure_ceiling {
                debug!(
                    target_server_id = aggregate.target_server_id,
                    max_failed = aggregate.max_failed,
                    "Destination past failure ceiling; leaving it to maintenance"
                );
                continue;
            }

            let report = self.deliver_destination(aggregate.target_server_id).await?;
            cycle.destinations_serviced += 1;
            cycle.delivered += report.delivered;
            cycle.failed += report.failed;
        }

        info!(
            destinations_examined = cycle.destinations_examined,
            destinations_serviced = cycle.destinations_serviced,
            delivered = cycle.delivered,
            failed = cycle.failed,
            "Delivery cycle complete"
        );
        Ok(cycle)
    }

    /// Delivers the destination's pending batch, oldest item first.
    ///
    /// A registry-unreachable destination is skipped outright. When the
    /// transport reports the server unreachable mid-batch, the current item
    /// and every remaining item take a failure mark without further
    /// transport calls. Afterwards the registry is updated: a batch with at
    /// least one success marks the server reachable, and an unreachable
    /// report marks it failed (the failure mark wins when both happened,
    /// since it is the most recent information).
    pub async fn deliver_destination(
        &self,
        target_server_id: i64,
    ) -> Result<DestinationReport, StorageError> {
        if !self.dal.server_registry().is_reachable(target_server_id).await? {
            debug!(target_server_id, "Destination marked unreachable; skipping batch");
            return Ok(DestinationReport {
                skipped: true,
                ..Default::default()
            });
        }

        let batch = self
            .dal
            .delivery_queue()
            .list_by_destination(target_server_id, self.config.failure_ceiling)
            .await?;

        let mut report = DestinationReport::default();
        let mut items = batch.into_iter();

        while let Some(item) = items.next() {
            match self.transport.deliver(&item).await {
                DeliveryOutcome::Delivered => {
                    self.recorder
                        .record_success(item.target_server_id, item.post_uri_id)
                        .await?;
                    report.delivered += 1;
                }
                DeliveryOutcome::Failed => {
                    self.recorder
                        .record_failure(item.target_server_id, item.post_uri_id)
                        .await?;
                    report.failed += 1;
                }
                DeliveryOutcome::Unreachable => {
                    warn!(target_server_id, "Server unreachable; cutting batch short");
                    report.unreachable = true;
                    self.recorder
                        .record_failure(item.target_server_id, item.post_uri_id)
                        .await?;
                    report.failed += 1;

                    // The server is down. Mark the rest failed without
                    // burning a network attempt on each.
                    for remaining in items.by_ref() {
                        self.recorder
                            .record_failure(remaining.target_server_id, remaining.post_uri_id)
                            .await?;
                        report.failed += 1;
                    }
                }
            }
        }

        let now = self.clock.now();
        if report.delivered > 0 {
            let next_contact = schedule_after(now, self.config.reachable_recheck);
            self.dal
                .server_registry()
                .mark_reachable(target_server_id, now, next_contact)
                .await?;
        }
        if report.unreachable {
            let next_contact = schedule_after(now, self.config.unreachable_backoff);
            self.dal
                .server_registry()
                .mark_failure(target_server_id, now, next_contact)
                .await?;
        }

        debug!(
            target_server_id,
            delivered = report.delivered,
            failed = report.failed,
            unreachable = report.unreachable,
            "Destination batch complete"
        );
        Ok(report)
    }
}

/// Adds a delay to a point in time, saturating instead of overflowing.
fn schedule_after(from: DateTime<Utc>, delay: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(delay)
        .ok()
        .and_then(|delta| from.checked_add_signed(delta))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}
