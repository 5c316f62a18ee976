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

//! Unified Data Access Layer with runtime backend selection
//!
//! Each DAL operation dispatches to a PostgreSQL or SQLite implementation
//! based on the connection type detected when the [`Database`] was created.
//! The two implementations are kept side by side per operation so backend
//! differences stay visible at the point where they matter.
//!
//! # Example
//!
//! ```rust,ignore
//! use cursus::dal::DAL;
//! use cursus::database::Database;
//!
//! let db = Database::new("postgres://localhost/federation", 10);
//! let dal = DAL::new(db);
//!
//! // Operations automatically use the correct backend
//! let aggregates = dal.delivery_queue().list_aggregates_by_destination().await?;
//! ```

use crate::database::{AnyPool, BackendType, Database};

// Sub-modules for each entity type
pub mod delivery_queue;
pub mod models;
pub mod server_registry;

// Re-export DAL components
pub use delivery_queue::DeliveryQueueDAL;
pub use server_registry::ServerRegistryDAL;

/// Helper macro for dispatching an operation based on backend type.
///
/// # Example
///
/// ```rust,ignore
/// crate::dispatch_backend!(
///     self.dal.backend(),
///     self.remove_postgres(server_id, post_uri_id).await,
///     self.remove_sqlite(server_id, post_uri_id).await
/// )
/// ```
#[macro_export]
macro_rules! dispatch_backend {
    ($backend:expr, $postgres:expr, $sqlite:expr) => {
        match $backend {
            #[cfg(feature = "postgres")]
            $crate::database::BackendType::Postgres => $postgres,
            #[cfg(feature = "sqlite")]
            $crate::database::BackendType::Sqlite => $sqlite,
            #[cfg(not(all(feature = "postgres", feature = "sqlite")))]
            other => panic!("Database backend {:?} is not enabled in this build", other),
        }
    };
}

/// The unified Data Access Layer struct.
///
/// Provides access to all storage operations through a single interface that
/// works with both PostgreSQL and SQLite backends.
///
/// # Thread Safety
///
/// `DAL` is `Clone` and can be safely shared between tasks. Each clone
/// references the same underlying connection pool.
#[derive(Clone, Debug)]
pub struct DAL {
    /// The database instance with connection pool
    pub database: Database,
}

impl DAL {
    /// Creates a new unified DAL instance.
    pub fn new(database: Database) -> Self {
        DAL { database }
    }

    /// Returns the backend type for this DAL instance.
    pub fn backend(&self) -> BackendType {
        self.database.backend()
    }

    /// Returns the connection pool.
    pub fn pool(&self) -> AnyPool {
        self.database.pool()
    }

    /// Returns a delivery queue DAL for queue operations.
    pub fn delivery_queue(&self) -> DeliveryQueueDAL {
        DeliveryQueueDAL::new(self)
    }

    /// Returns a server registry DAL for peer lookups and health marks.
    pub fn server_registry(&self) -> ServerRegistryDAL {
        ServerRegistryDAL::new(self)
    }
}
