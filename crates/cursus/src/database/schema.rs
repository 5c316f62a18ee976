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

//! Diesel table definitions shared by both database backends.
//!
//! The column types here are deliberately backend-neutral (`BigInt`,
//! `Integer`, `Text`, `Timestamp`, `Bool`) so a single set of definitions
//! serves PostgreSQL and SQLite. Backend differences are absorbed by the
//! migrations and by `UniversalTimestamp`'s per-backend SQL conversions.

/// Table definitions for the unified (runtime backend selected) DAL.
pub mod unified {
    diesel::table! {
        /// Pending delivery attempts, at most one row per
        /// (destination server, content) pair.
        delivery_queue (target_server_id, post_uri_id) {
            target_server_id -> BigInt,
            post_uri_id -> BigInt,
            created_at -> Timestamp,
            command -> Text,
            target_contact_id -> BigInt,
            sender_user_id -> BigInt,
            failed -> Integer,
        }
    }

    diesel::table! {
        /// Known federation peers and their contact health.
        remote_servers (id) {
            id -> BigInt,
            url -> Text,
            protocol -> Text,
            created_at -> Timestamp,
            updated_at -> Timestamp,
            last_contact_at -> Nullable<Timestamp>,
            last_failure_at -> Nullable<Timestamp>,
            next_contact_at -> Nullable<Timestamp>,
            failed -> Bool,
            blocked -> Bool,
        }
    }

    diesel::allow_tables_to_appear_in_same_query!(delivery_queue, remote_servers);
}
