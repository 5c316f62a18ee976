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

//! Error types for the delivery queue and its surrounding services.
//!
//! The storage surface distinguishes two very different situations:
//!
//! - **Nothing matched**: deleting or incrementing a row that does not exist
//!   is a normal outcome of concurrent workers racing on the same key. DAL
//!   methods report it as `Ok(false)`, never as an error.
//! - **The storage call itself failed**: connection loss, pool exhaustion,
//!   SQL errors. These surface as [`StorageError`] so callers can tell
//!   "nothing to update" apart from "couldn't update".
//!
//! [`RunnerError`] covers configuration validation and startup of the
//! background runner, wrapping [`StorageError`] where storage is involved.

use thiserror::Error;

/// Errors raised by the delivery queue storage layer.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to acquire a pooled connection or to execute the pool
    /// interaction closure.
    #[error("Connection pool error: {0}")]
    ConnectionPool(String),

    /// Error returned by the underlying database.
    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),

    /// Running embedded migrations failed.
    #[error("Migration error: {0}")]
    Migration(String),
}

/// Errors raised while configuring or starting the delivery runner.
#[derive(Error, Debug)]
pub enum RunnerError {
    /// A configuration value failed validation.
    #[error("Invalid configuration: {message}")]
    Configuration {
        /// Description of the invalid value
        message: String,
    },

    /// A storage operation failed during startup or shutdown.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Error returned when parsing an unknown delivery command string.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown delivery command: {0}")]
pub struct CommandParseError(pub String);
