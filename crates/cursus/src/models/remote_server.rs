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

//! Remote Server Model
//!
//! Domain structures for the server registry: one row per known federation
//! peer, carrying contact-health metadata. The delivery queue store never
//! touches this registry; the delivery worker reads it to skip destinations
//! that are known to be down and marks contact outcomes after each batch.

use crate::database::universal_types::UniversalTimestamp;
use serde::{Deserialize, Serialize};

/// A known federation peer (domain type).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteServer {
    /// Registry-assigned id; the delivery queue keys destinations by this
    pub id: i64,
    /// Base URL of the peer
    pub url: String,
    /// Federation protocol spoken by the peer (e.g. "activitypub")
    pub protocol: String,
    /// When the peer was first registered
    pub created_at: UniversalTimestamp,
    /// Last registry mutation
    pub updated_at: UniversalTimestamp,
    /// Last successful contact, if any
    pub last_contact_at: Option<UniversalTimestamp>,
    /// Last failed contact, if any
    pub last_failure_at: Option<UniversalTimestamp>,
    /// When the peer should next be contacted or re-probed
    pub next_contact_at: Option<UniversalTimestamp>,
    /// Whether the peer is currently considered unreachable
    pub failed: bool,
    /// Whether the peer is administratively blocked
    pub blocked: bool,
}

impl RemoteServer {
    /// Whether delivery attempts toward this peer are worthwhile right now.
    pub fn is_reachable(&self) -> bool {
        !self.blocked && !self.failed
    }
}

/// Structure for registering a new federation peer (domain type).
///
/// Health fields start empty; the registry stamps `created_at`/`updated_at`
/// when the row is inserted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRemoteServer {
    /// Base URL of the peer
    pub url: String,
    /// Federation protocol spoken by the peer
    pub protocol: String,
}
