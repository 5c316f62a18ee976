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

//! Transport seam between the queue and the network.
//!
//! Everything protocol-shaped (HTTP signing, inbox discovery, payload
//! rendering) lives behind [`DeliveryTransport`]. The queue core never sees
//! a socket; it only learns how an attempt went.

use async_trait::async_trait;

use crate::models::delivery_queue_item::DeliveryQueueItem;

/// Result of one delivery attempt against a remote server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The destination accepted the payload. The item is done.
    Delivered,
    /// The destination rejected this item or the attempt errored, but the
    /// server itself is responsive. Other items may still get through.
    Failed,
    /// The server could not be contacted at all. Further attempts against
    /// it this batch are pointless.
    Unreachable,
}

/// Performs the actual network delivery of a queued item.
///
/// Implementations own all protocol concerns and fold their errors into a
/// [`DeliveryOutcome`]; the distinction that matters to the queue is whether
/// the failure was item-scoped (`Failed`) or server-scoped (`Unreachable`).
#[async_trait]
pub trait DeliveryTransport: Send + Sync {
    /// Attempts to deliver one queued item to its destination.
    async fn deliver(&self, item: &DeliveryQueueItem) -> DeliveryOutcome;
}
