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

//! Delivery services built on top of the queue store.
//!
//! - [`transport`]: the seam behind which all network protocol work lives.
//! - [`recorder`]: turns attempt outcomes into durable queue mutations.
//! - [`worker`]: drains pending deliveries destination by destination.
//! - [`maintenance`]: purges exhausted destinations and compacts storage.

pub mod maintenance;
pub mod recorder;
pub mod transport;
pub mod worker;

pub use maintenance::{MaintenanceReport, QueueMaintenance};
pub use recorder::OutcomeRecorder;
pub use transport::{DeliveryOutcome, DeliveryTransport};
pub use worker::{CycleReport, DeliveryWorker, DeliveryWorkerConfig, DestinationReport};
