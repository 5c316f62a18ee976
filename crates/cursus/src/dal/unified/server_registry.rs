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

//! Unified Server Registry DAL with runtime backend selection
//!
//! The registry tracks known federation peers and their contact health. It
//! is advisory: the delivery queue carries no foreign key into it, and a
//! destination the registry has never heard of is treated as reachable
//! until proven otherwise. Health timestamps are supplied by callers so the
//! service layer stays in charge of the clock.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use tracing::debug;

use super::models::{NewUnifiedRemoteServer, UnifiedRemoteServer};
use super::DAL;
use crate::database::schema::unified::remote_servers;
use crate::database::universal_types::UniversalTimestamp;
use crate::error::StorageError;
use crate::models::remote_server::{NewRemoteServer, RemoteServer};

/// Data access layer for the remote server registry with runtime backend
/// selection.
#[derive(Clone)]
pub struct ServerRegistryDAL<'a> {
    dal: &'a DAL,
}

impl<'a> ServerRegistryDAL<'a> {
    /// Creates a new ServerRegistryDAL instance.
    pub fn new(dal: &'a DAL) -> Self {
        Self { dal }
    }

    /// Registers a newly discovered peer and returns the stored record.
    ///
    /// New servers start unblocked and not failed.
    pub async fn register(&self, new_server: NewRemoteServer) -> Result<RemoteServer, StorageError> {
        debug!(url = %new_server.url, protocol = %new_server.protocol, "Registering remote server");
        let now = UniversalTimestamp::now();
        let row = NewUnifiedRemoteServer {
            url: new_server.url,
            protocol: new_server.protocol,
            created_at: now,
            updated_at: now,
            failed: false,
            blocked: false,
        };

        let stored = crate::dispatch_backend!(
            self.dal.backend(),
            self.register_postgres(row).await,
            self.register_sqlite(row).await
        )?;

        Ok(RemoteServer::from(stored))
    }

    #[cfg(feature = "postgres")]
    async fn register_postgres(
        &self,
        row: NewUnifiedRemoteServer,
    ) -> Result<UnifiedRemoteServer, StorageError> {
        let conn = self
            .dal
            .database
            .get_postgres_connection()
            .await
            .map_err(|e| StorageError::ConnectionPool(e.to_string()))?;

        let stored = conn
            .interact(move |conn| {
                diesel::insert_into(remote_servers::table)
                    .values(&row)
                    .get_result::<UnifiedRemoteServer>(conn)
            })
            .await
            .map_err(|e| StorageError::ConnectionPool(e.to_string()))??;

        Ok(stored)
    }

    #[cfg(feature = "sqlite")]
    async fn register_sqlite(
        &self,
        row: NewUnifiedRemoteServer,
    ) -> Result<UnifiedRemoteServer, StorageError> {
        let conn = self
            .dal
            .database
            .get_sqlite_connection()
            .await
            .map_err(|e| StorageError::ConnectionPool(e.to_string()))?;

        let stored = conn
            .interact(move |conn| {
                diesel::insert_into(remote_servers::table)
                    .values(&row)
                    .get_result::<UnifiedRemoteServer>(conn)
            })
            .await
            .map_err(|e| StorageError::ConnectionPool(e.to_string()))??;

        Ok(stored)
    }

    /// Looks up a server by its registry id.
    pub async fn get_by_id(&self, server_id: i64) -> Result<Option<RemoteServer>, StorageError> {
        let row = crate::dispatch_backend!(
            self.dal.backend(),
            self.get_by_id_postgres(server_id).await,
            self.get_by_id_sqlite(server_id).await
        )?;

        Ok(row.map(RemoteServer::from))
    }

    #[cfg(feature = "postgres")]
    async fn get_by_id_postgres(
        &self,
        server_id: i64,
    ) -> Result<Option<UnifiedRemoteServer>, StorageError> {
        let conn = self
            .dal
            .database
            .get_postgres_connection()
            .await
            .map_err(|e| StorageError::ConnectionPool(e.to_string()))?;

        let row = conn
            .interact(move |conn| {
                remote_servers::table
                    .find(server_id)
                    .first::<UnifiedRemoteServer>(conn)
                    .optional()
            })
            .await
            .map_err(|e| StorageError::ConnectionPool(e.to_string()))??;

        Ok(row)
    }

    #[cfg(feature = "sqlite")]
    async fn get_by_id_sqlite(
        &self,
        server_id: i64,
    ) -> Result<Option<UnifiedRemoteServer>, StorageError> {
        let conn = self
            .dal
            .database
            .get_sqlite_connection()
            .await
            .map_err(|e| StorageError::ConnectionPool(e.to_string()))?;

        let row = conn
            .interact(move |conn| {
                remote_servers::table
                    .find(server_id)
                    .first::<UnifiedRemoteServer>(conn)
                    .optional()
            })
            .await
            .map_err(|e| StorageError::ConnectionPool(e.to_string()))??;

        Ok(row)
    }

    /// Records a successful contact with the server.
    ///
    /// Clears the failed flag and stores when the server was reached and
    /// when it should next be probed. Returns whether a row matched.
    pub async fn mark_reachable(
        &self,
        server_id: i64,
        contacted_at: DateTime<Utc>,
        next_contact_at: DateTime<Utc>,
    ) -> Result<bool, StorageError> {
        crate::dispatch_backend!(
            self.dal.backend(),
            self.mark_reachable_postgres(server_id, contacted_at, next_contact_at)
                .await,
            self.mark_reachable_sqlite(server_id, contacted_at, next_contact_at)
                .await
        )
    }

    #[cfg(feature = "postgres")]
    async fn mark_reachable_postgres(
        &self,
        server_id: i64,
        contacted_at: DateTime<Utc>,
        next_contact_at: DateTime<Utc>,
    ) -> Result<bool, StorageError> {
        let conn = self
            .dal
            .database
            .get_postgres_connection()
            .await
            .map_err(|e| StorageError::ConnectionPool(e.to_string()))?;

        let updated_rows = conn
            .interact(move |conn| {
                diesel::update(remote_servers::table.find(server_id))
                    .set((
                        remote_servers::failed.eq(false),
                        remote_servers::last_contact_at
                            .eq(Some(UniversalTimestamp::from(contacted_at))),
                        remote_servers::next_contact_at
                            .eq(Some(UniversalTimestamp::from(next_contact_at))),
                        remote_servers::updated_at.eq(UniversalTimestamp::from(contacted_at)),
                    ))
                    .execute(conn)
            })
            .await
            .map_err(|e| StorageError::ConnectionPool(e.to_string()))??;

        Ok(updated_rows == 1)
    }

    #[cfg(feature = "sqlite")]
    async fn mark_reachable_sqlite(
        &self,
        server_id: i64,
        contacted_at: DateTime<Utc>,
        next_contact_at: DateTime<Utc>,
    ) -> Result<bool, StorageError> {
        let conn = self
            .dal
            .database
            .get_sqlite_connection()
            .await
            .map_err(|e| StorageError::ConnectionPool(e.to_string()))?;

        let updated_rows = conn
            .interact(move |conn| {
                diesel::update(remote_servers::table.find(server_id))
                    .set((
                        remote_servers::failed.eq(false),
                        remote_servers::last_contact_at
                            .eq(Some(UniversalTimestamp::from(contacted_at))),
                        remote_servers::next_contact_at
                            .eq(Some(UniversalTimestamp::from(next_contact_at))),
                        remote_servers::updated_at.eq(UniversalTimestamp::from(contacted_at)),
                    ))
                    .execute(conn)
            })
            .await
            .map_err(|e| StorageError::ConnectionPool(e.to_string()))??;

        Ok(updated_rows == 1)
    }

    /// Records a failed contact attempt.
    ///
    /// Sets the failed flag and stores when the failure happened and when
    /// the server should next be probed. Returns whether a row matched.
    pub async fn mark_failure(
        &self,
        server_id: i64,
        failed_at: DateTime<Utc>,
        next_contact_at: DateTime<Utc>,
    ) -> Result<bool, StorageError> {
        debug!(server_id, "Marking remote server as failed");
        crate::dispatch_backend!(
            self.dal.backend(),
            self.mark_failure_postgres(server_id, failed_at, next_contact_at)
                .await,
            self.mark_failure_sqlite(server_id, failed_at, next_contact_at)
                .await
        )
    }

    #[cfg(feature = "postgres")]
    async fn mark_failure_postgres(
        &self,
        server_id: i64,
        failed_at: DateTime<Utc>,
        next_contact_at: DateTime<Utc>,
    ) -> Result<bool, StorageError> {
        let conn = self
            .dal
            .database
            .get_postgres_connection()
            .await
            .map_err(|e| StorageError::ConnectionPool(e.to_string()))?;

        let updated_rows = conn
            .interact(move |conn| {
                diesel::update(remote_servers::table.find(server_id))
                    .set((
                        remote_servers::failed.eq(true),
                        remote_servers::last_failure_at
                            .eq(Some(UniversalTimestamp::from(failed_at))),
                        remote_servers::next_contact_at
                            .eq(Some(UniversalTimestamp::from(next_contact_at))),
                        remote_servers::updated_at.eq(UniversalTimestamp::from(failed_at)),
                    ))
                    .execute(conn)
            })
            .await
            .map_err(|e| StorageError::ConnectionPool(e.to_string()))??;

        Ok(updated_rows == 1)
    }

    #[cfg(feature = "sqlite")]
    async fn mark_failure_sqlite(
        &self,
        server_id: i64,
        failed_at: DateTime<Utc>,
        next_contact_at: DateTime<Utc>,
    ) -> Result<bool, StorageError> {
        let conn = self
            .dal
            .database
            .get_sqlite_connection()
            .await
            .map_err(|e| StorageError::ConnectionPool(e.to_string()))?;

        let updated_rows = conn
            .interact(move |conn| {
                diesel::update(remote_servers::table.find(server_id))
                    .set((
                        remote_servers::failed.eq(true),
                        remote_servers::last_failure_at
                            .eq(Some(UniversalTimestamp::from(failed_at))),
                        remote_servers::next_contact_at
                            .eq(Some(UniversalTimestamp::from(next_contact_at))),
                        remote_servers::updated_at.eq(UniversalTimestamp::from(failed_at)),
                    ))
                    .execute(conn)
            })
            .await
            .map_err(|e| StorageError::ConnectionPool(e.to_string()))??;

        Ok(updated_rows == 1)
    }

    /// Sets or clears the administrative block on a server.
    ///
    /// Returns whether a row matched.
    pub async fn set_blocked(
        &self,
        server_id: i64,
        blocked: bool,
        at: DateTime<Utc>,
    ) -> Result<bool, StorageError> {
        crate::dispatch_backend!(
            self.dal.backend(),
            self.set_blocked_postgres(server_id, blocked, at).await,
            self.set_blocked_sqlite(server_id, blocked, at).await
        )
    }

    #[cfg(feature = "postgres")]
    async fn set_blocked_postgres(
        &self,
        server_id: i64,
        blocked: bool,
        at: DateTime<Utc>,
    ) -> Result<bool, StorageError> {
        let conn = self
            .dal
            .database
            .get_postgres_connection()
            .await
            .map_err(|e| StorageError::ConnectionPool(e.to_string()))?;

        let updated_rows = conn
            .interact(move |conn| {
                diesel::update(remote_servers::table.find(server_id))
                    .set((
                        remote_servers::blocked.eq(blocked),
                        remote_servers::updated_at.eq(UniversalTimestamp::from(at)),
                    ))
                    .execute(conn)
            })
            .await
            .map_err(|e| StorageError::ConnectionPool(e.to_string()))??;

        Ok(updated_rows == 1)
    }

    #[cfg(feature = "sqlite")]
    async fn set_blocked_sqlite(
        &self,
        server_id: i64,
        blocked: bool,
        at: DateTime<Utc>,
    ) -> Result<bool, StorageError> {
        let conn = self
            .dal
            .database
            .get_sqlite_connection()
            .await
            .map_err(|e| StorageError::ConnectionPool(e.to_string()))?;

        let updated_rows = conn
            .interact(move |conn| {
                diesel::update(remote_servers::table.find(server_id))
                    .set((
                        remote_servers::blocked.eq(blocked),
                        remote_servers::updated_at.eq(UniversalTimestamp::from(at)),
                    ))
                    .execute(conn)
            })
            .await
            .map_err(|e| StorageError::ConnectionPool(e.to_string()))??;

        Ok(updated_rows == 1)
    }

    /// Returns whether deliveries toward the server are worth attempting.
    ///
    /// A server nobody has registered yet is reachable: having no health
    /// data is no reason to skip it.
    pub async fn is_reachable(&self, server_id: i64) -> Result<bool, StorageError> {
        Ok(self
            .get_by_id(server_id)
            .await?
            .map(|server| server.is_reachable())
            .unwrap_or(true))
    }
}
