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

//! Delivery Queue Item Model
//!
//! Domain structures for the delivery queue: one row per pending delivery of
//! one piece of content to one destination server. The queue is a bounded
//! retry ledger - it tracks how often a delivery has failed, not when it
//! should next be attempted. Retry cadence is owned by whoever schedules the
//! worker cycles.

use crate::database::universal_types::UniversalTimestamp;
use serde::{Deserialize, Serialize};

/// One pending or retrying delivery attempt (domain type).
///
/// `(target_server_id, post_uri_id)` is the natural key: at most one live
/// row exists per content/destination pair, and re-enqueueing the same pair
/// overwrites the row instead of fanning out duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryQueueItem {
    /// Destination server id (Server Registry key; not enforced by the store)
    pub target_server_id: i64,
    /// Identifier of the content to deliver
    pub post_uri_id: i64,
    /// Enqueue time, written verbatim on upsert
    pub created_at: UniversalTimestamp,
    /// Delivery verb the remote endpoint should apply to the content
    pub command: String,
    /// The remote contact/actor to deliver to
    pub target_contact_id: i64,
    /// The local user on whose behalf delivery is performed
    pub sender_user_id: i64,
    /// Consecutive failure count for this row
    pub failed: i32,
}

impl DeliveryQueueItem {
    /// Creates a fresh queue item with a zero failure count.
    pub fn new(
        target_server_id: i64,
        post_uri_id: i64,
        created_at: UniversalTimestamp,
        command: impl Into<String>,
        target_contact_id: i64,
        sender_user_id: i64,
    ) -> Self {
        Self {
            target_server_id,
            post_uri_id,
            created_at,
            command: command.into(),
            target_contact_id,
            sender_user_id,
            failed: 0,
        }
    }
}

/// Per-destination rollup of the queue (domain type, never persisted).
///
/// Carries the worst outstanding failure count for one destination. The
/// store returns these in randomized order on purpose; consumers must not
/// rely on any particular ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeliveryQueueAggregate {
    /// Destination server id
    pub target_server_id: i64,
    /// Maximum `failed` value among that destination's queued items
    pub max_failed: i32,
}
