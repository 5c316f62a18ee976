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

//! Database layer: pooled connections, embedded migrations, table
//! definitions, and the cross-backend timestamp type.

pub mod connection;
pub mod schema;
pub mod universal_types;

pub use connection::{AnyPool, BackendType, Database};
pub use universal_types::{current_timestamp, UniversalTimestamp};

use diesel_migrations::{embed_migrations, EmbeddedMigrations, MigrationHarness};

/// Embedded migrations for the PostgreSQL backend.
pub const POSTGRES_MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations/postgres");

/// Embedded migrations for the SQLite backend.
pub const SQLITE_MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations/sqlite");

/// Runs pending PostgreSQL migrations on an already-acquired connection.
///
/// Test fixtures use this synchronous form; services go through
/// [`Database::run_migrations`].
#[cfg(feature = "postgres")]
pub fn run_migrations_postgres(
    conn: &mut diesel::PgConnection,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    conn.run_pending_migrations(POSTGRES_MIGRATIONS)?;
    Ok(())
}

/// Runs pending SQLite migrations on an already-acquired connection.
///
/// Test fixtures use this synchronous form; services go through
/// [`Database::run_migrations`].
#[cfg(feature = "sqlite")]
pub fn run_migrations_sqlite(
    conn: &mut diesel::SqliteConnection,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    conn.run_pending_migrations(SQLITE_MIGRATIONS)?;
    Ok(())
}
