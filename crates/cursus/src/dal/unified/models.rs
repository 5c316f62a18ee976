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

//! Database row structures for the unified DAL.
//!
//! These mirror the domain models in `crate::models` but carry the Diesel
//! derives. `UniversalTimestamp` implements the serialization traits for
//! both backends, so one set of row structs serves PostgreSQL and SQLite.

use diesel::prelude::*;

use crate::database::schema::unified::{delivery_queue, remote_servers};
use crate::database::universal_types::UniversalTimestamp;
use crate::models::delivery_queue_item::DeliveryQueueItem;
use crate::models::remote_server::RemoteServer;

/// Row form of a pending delivery.
///
/// `AsChangeset` skips the two primary-key columns, which makes this struct
/// double as the overwrite payload for the enqueue upsert.
#[derive(Debug, Clone, Queryable, Selectable, Insertable, AsChangeset)]
#[diesel(table_name = delivery_queue)]
pub struct UnifiedDeliveryQueueItem {
    pub target_server_id: i64,
    pub post_uri_id: i64,
    pub created_at: UniversalTimestamp,
    pub command: String,
    pub target_contact_id: i64,
    pub sender_user_id: i64,
    pub failed: i32,
}

impl From<DeliveryQueueItem> for UnifiedDeliveryQueueItem {
    fn from(item: DeliveryQueueItem) -> Self {
        Self {
            target_server_id: item.target_server_id,
            post_uri_id: item.post_uri_id,
            created_at: item.created_at,
            command: item.command,
            target_contact_id: item.target_contact_id,
            sender_user_id: item.sender_user_id,
            failed: item.failed,
        }
    }
}

impl From<UnifiedDeliveryQueueItem> for DeliveryQueueItem {
    fn from(row: UnifiedDeliveryQueueItem) -> Self {
        Self {
            target_server_id: row.target_server_id,
            post_uri_id: row.post_uri_id,
            created_at: row.created_at,
            command: row.command,
            target_contact_id: row.target_contact_id,
            sender_user_id: row.sender_user_id,
            failed: row.failed,
        }
    }
}

/// Row form of a registered federation peer.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = remote_servers)]
pub struct UnifiedRemoteServer {
    pub id: i64,
    pub url: String,
    pub protocol: String,
    pub created_at: UniversalTimestamp,
    pub updated_at: UniversalTimestamp,
    pub last_contact_at: Option<UniversalTimestamp>,
    pub last_failure_at: Option<UniversalTimestamp>,
    pub next_contact_at: Option<UniversalTimestamp>,
    pub failed: bool,
    pub blocked: bool,
}

impl From<UnifiedRemoteServer> for RemoteServer {
    fn from(row: UnifiedRemoteServer) -> Self {
        Self {
            id: row.id,
            url: row.url,
            protocol: row.protocol,
            created_at: row.created_at,
            updated_at: row.updated_at,
            last_contact_at: row.last_contact_at,
            last_failure_at: row.last_failure_at,
            next_contact_at: row.next_contact_at,
            failed: row.failed,
            blocked: row.blocked,
        }
    }
}

/// Insert form of a new registration; the id is store-assigned and the
/// health columns start NULL.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = remote_servers)]
pub struct NewUnifiedRemoteServer {
    pub url: String,
    pub protocol: String,
    pub created_at: UniversalTimestamp,
    pub updated_at: UniversalTimestamp,
    pub failed: bool,
    pub blocked: bool,
}
