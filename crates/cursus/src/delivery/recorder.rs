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

//! Delivery outcome recording.
//!
//! The recorder is the only place a delivery attempt's result becomes
//! durable: success removes the queue row, failure bumps its counter. It
//! deliberately knows nothing about retry timing. The queue tracks how
//! often an item failed, never when, so retry cadence stays with the
//! scheduling loop and abandonment is enforced by the list threshold and
//! the maintenance purge rather than here.

use tracing::debug;

use crate::dal::DAL;
use crate::error::StorageError;

/// Translates a single delivery attempt's result into a queue mutation.
#[derive(Clone, Debug)]
pub struct OutcomeRecorder {
    dal: DAL,
}

impl OutcomeRecorder {
    /// Creates a recorder over the given data access layer.
    pub fn new(dal: DAL) -> Self {
        Self { dal }
    }

    /// Records a successful delivery by removing the queue entry.
    ///
    /// Returns `Ok(false)` when the entry was already gone, which is normal
    /// when two workers race to report the same item. Storage failures are
    /// errors; "nothing to remove" is not.
    pub async fn record_success(
        &self,
        target_server_id: i64,
        post_uri_id: i64,
    ) -> Result<bool, StorageError> {
        let removed = self
            .dal
            .delivery_queue()
            .remove(target_server_id, post_uri_id)
            .await?;

        if removed {
            debug!(target_server_id, post_uri_id, "Delivery succeeded; item removed");
        } else {
            debug!(
                target_server_id,
                post_uri_id, "Delivery succeeded for an item no longer queued"
            );
        }
        Ok(removed)
    }

    /// Records a failed delivery by incrementing the entry's failure count.
    ///
    /// Returns `Ok(false)` when no row matched (the item was delivered or
    /// purged in the meantime). Whether the updated count crosses the
    /// abandonment ceiling is the caller's decision, not the recorder's.
    pub async fn record_failure(
        &self,
        target_server_id: i64,
        post_uri_id: i64,
    ) -> Result<bool, StorageError> {
        let updated = self
            .dal
            .delivery_queue()
            .increment_failed(target_server_id, post_uri_id)
            .await?;

        if updated {
            debug!(target_server_id, post_uri_id, "Delivery failed; failure count incremented");
        } else {
            debug!(
                target_server_id,
                post_uri_id, "Delivery failure reported for an item no longer queued"
            );
        }
        Ok(updated)
    }
}
