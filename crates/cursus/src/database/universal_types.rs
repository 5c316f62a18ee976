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

//! Cross-backend timestamp type.
//!
//! PostgreSQL stores `TIMESTAMP` as binary microseconds while SQLite stores
//! text. [`UniversalTimestamp`] wraps `chrono::DateTime<Utc>` and implements
//! Diesel's serialization traits for both backends so the same model structs
//! can be queried and inserted regardless of which backend was selected at
//! runtime.
//!
//! The SQLite encoding uses Diesel's own `%F %T%.f` text format. That format
//! is zero padded, so lexicographic comparison of stored values matches
//! chronological order and `ORDER BY created_at` behaves identically on both
//! backends.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use diesel::deserialize::{self, FromSql, FromSqlRow};
use diesel::expression::AsExpression;
use diesel::sql_types::Timestamp;
use serde::{Deserialize, Serialize};

/// A UTC timestamp usable with both PostgreSQL and SQLite.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    AsExpression,
    FromSqlRow,
)]
#[diesel(sql_type = Timestamp)]
#[serde(transparent)]
pub struct UniversalTimestamp(pub DateTime<Utc>);

impl UniversalTimestamp {
    /// Returns the current time.
    pub fn now() -> Self {
        UniversalTimestamp(Utc::now())
    }

    /// Returns the wrapped `DateTime<Utc>`.
    pub fn into_inner(self) -> DateTime<Utc> {
        self.0
    }
}

/// Returns the current time as a [`UniversalTimestamp`].
pub fn current_timestamp() -> UniversalTimestamp {
    UniversalTimestamp::now()
}

impl From<DateTime<Utc>> for UniversalTimestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        UniversalTimestamp(dt)
    }
}

impl From<UniversalTimestamp> for DateTime<Utc> {
    fn from(ts: UniversalTimestamp) -> Self {
        ts.0
    }
}

impl std::ops::Deref for UniversalTimestamp {
    type Target = DateTime<Utc>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::fmt::Display for UniversalTimestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

#[cfg(feature = "postgres")]
mod postgres_impls {
    use super::*;
    use diesel::pg::{Pg, PgValue};
    use diesel::serialize::{self, Output, ToSql};

    impl ToSql<Timestamp, Pg> for UniversalTimestamp {
        fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Pg>) -> serialize::Result {
            <NaiveDateTime as ToSql<Timestamp, Pg>>::to_sql(
                &self.0.naive_utc(),
                &mut out.reborrow(),
            )
        }
    }

    impl FromSql<Timestamp, Pg> for UniversalTimestamp {
        fn from_sql(bytes: PgValue<'_>) -> deserialize::Result<Self> {
            let naive = <NaiveDateTime as FromSql<Timestamp, Pg>>::from_sql(bytes)?;
            Ok(UniversalTimestamp(Utc.from_utc_datetime(&naive)))
        }
    }
}

#[cfg(feature = "sqlite")]
mod sqlite_impls {
    use super::*;
    use diesel::serialize::{self, IsNull, Output, ToSql};
    use diesel::sqlite::{Sqlite, SqliteValue};

    impl ToSql<Timestamp, Sqlite> for UniversalTimestamp {
        fn to_sql<'b>(&'b self, out: &mut Output<'b, '_, Sqlite>) -> serialize::Result {
            // Same text encoding Diesel uses for NaiveDateTime, kept explicit
            // so the lexicographic-equals-chronological property is pinned
            // here rather than inherited silently.
            out.set_value(self.0.naive_utc().format("%F %T%.f").to_string());
            Ok(IsNull::No)
        }
    }

    impl FromSql<Timestamp, Sqlite> for UniversalTimestamp {
        fn from_sql(value: SqliteValue<'_, '_, '_>) -> deserialize::Result<Self> {
            let naive = <NaiveDateTime as FromSql<Timestamp, Sqlite>>::from_sql(value)?;
            Ok(UniversalTimestamp(Utc.from_utc_datetime(&naive)))
        }
    }
}
