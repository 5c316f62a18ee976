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

//! Time source abstraction for the delivery services.
//!
//! Services that stamp registry contact times or compute next-contact
//! schedules take an `Arc<dyn Clock>` instead of calling `Utc::now()`
//! directly, so tests can pin time with [`FixedClock`]. The storage layer
//! itself never reads the clock; DAL methods take explicit timestamps.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Duration, Utc};

/// A source of the current time.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// Returns the current instant in UTC.
    fn now(&self) -> DateTime<Utc>;
}

/// Clock backed by the system time. The default for production use.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to an explicit instant, advanced manually.
///
/// Stores the instant as nanoseconds since the Unix epoch so `set` and
/// `advance` are safe from concurrent tasks without a lock.
#[derive(Debug)]
pub struct FixedClock {
    nanos: AtomicI64,
}

impl FixedClock {
    /// Creates a clock pinned to `now`.
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            nanos: AtomicI64::new(now.timestamp_nanos_opt().unwrap_or_default()),
        }
    }

    /// Re-pins the clock to `now`.
    pub fn set(&self, now: DateTime<Utc>) {
        self.nanos
            .store(now.timestamp_nanos_opt().unwrap_or_default(), Ordering::SeqCst);
    }

    /// Moves the clock forward (or backward, for negative durations).
    pub fn advance(&self, delta: Duration) {
        self.nanos
            .fetch_add(delta.num_nanoseconds().unwrap_or_default(), Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_nanos(self.nanos.load(Ordering::SeqCst))
    }
}
