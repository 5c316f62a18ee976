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

//! Background delivery runner.
//!
//! [`DeliveryRunner`] is the batteries-included entry point: it owns the
//! database pool, runs migrations on startup and drives two background
//! loops, one delivering queued items and one sweeping exhausted
//! destinations. Both loops are raced against a shared shutdown signal so
//! [`DeliveryRunner::shutdown`] can stop them cleanly.
//!
//! Publishers that only need to enqueue can skip the runner entirely and
//! talk to [`DeliveryQueueDAL`](crate::dal::DeliveryQueueDAL) directly.

pub mod config;

pub use config::{DeliveryRunnerBuilder, DeliveryRunnerConfig, DeliveryRunnerConfigBuilder};

use std::sync::Arc;

use tokio::sync::{broadcast, RwLock};
use tracing::info;

use crate::dal::DAL;
use crate::database::Database;
use crate::delivery::{DeliveryWorker, QueueMaintenance};
use crate::error::RunnerError;

/// Owns the delivery worker and maintenance loops over one database.
#[derive(Clone)]
pub struct DeliveryRunner {
    /// Database connection pool shared by all services
    database: Database,
    /// Configuration the runner was built with
    config: DeliveryRunnerConfig,
    /// Per-destination delivery worker
    worker: Arc<DeliveryWorker>,
    /// Destination-scoped garbage collector
    maintenance: Arc<QueueMaintenance>,
    /// Runtime handles for managing background services
    runtime_handles: Arc<RwLock<RuntimeHandles>>,
}

/// Internal structure for managing runtime handles of background services
///
/// This struct maintains references to the running background tasks and the
/// shutdown channel used to coordinate graceful shutdown of services.
struct RuntimeHandles {
    /// Handle to the delivery worker background task
    worker_handle: Option<tokio::task::JoinHandle<()>>,
    /// Handle to the maintenance background task
    maintenance_handle: Option<tokio::task::JoinHandle<()>>,
    /// Channel sender for broadcasting shutdown signals
    shutdown_sender: Option<broadcast::Sender<()>>,
}

impl DeliveryRunner {
    /// Creates a new builder for configuring a runner.
    pub fn builder() -> DeliveryRunnerBuilder {
        DeliveryRunnerBuilder::new()
    }

    /// The database this runner operates on.
    pub fn database(&self) -> &Database {
        &self.database
    }

    /// A data access layer over the runner's database, for publishers that
    /// enqueue items while the runner delivers them.
    pub fn dal(&self) -> DAL {
        DAL::new(self.database.clone())
    }

    /// The configuration this runner was built with.
    pub fn config(&self) -> &DeliveryRunnerConfig {
        &self.config
    }

    /// Starts the background worker and maintenance services
    ///
    /// This method:
    /// 1. Creates the shutdown channel for graceful termination
    /// 2. Spawns the delivery worker background task
    /// 3. Spawns the maintenance background task
    /// 4. Stores the runtime handles for later shutdown
    async fn start_background_services(&self) -> Result<(), RunnerError> {
        let mut handles = self.runtime_handles.write().await;

        info!("Starting delivery worker and queue maintenance background services");

        // Create shutdown channel
        let (shutdown_tx, mut worker_shutdown_rx) = broadcast::channel(1);
        let mut maintenance_shutdown_rx = shutdown_tx.subscribe();

        // Start delivery worker
        let worker = self.worker.clone();
        let poll_interval = self.config.worker_poll_interval();
        let worker_handle = tokio::spawn(async move {
            let mut worker_future = Box::pin(worker.run_delivery_loop(poll_interval));

            tokio::select! {
                _ = &mut worker_future => {
                    info!("Delivery loop completed");
                }
                _ = worker_shutdown_rx.recv() => {
                    info!("Delivery worker shutdown requested");
                }
            }
        });

        // Start maintenance sweep
        let maintenance = self.maintenance.clone();
        let sweep_interval = self.config.maintenance_interval();
        let failure_ceiling = self.config.failure_ceiling();
        let maintenance_handle = tokio::spawn(async move {
            let mut maintenance_future =
                Box::pin(maintenance.run_maintenance_loop(sweep_interval, failure_ceiling));

            tokio::select! {
                _ = &mut maintenance_future => {
                    info!("Maintenance loop completed");
                }
                _ = maintenance_shutdown_rx.recv() => {
                    info!("Queue maintenance shutdown requested");
                }
            }
        });

        // Store handles
        handles.worker_handle = Some(worker_handle);
        handles.maintenance_handle = Some(maintenance_handle);
        handles.shutdown_sender = Some(shutdown_tx);

        Ok(())
    }

    /// Gracefully shuts down the runner and its background services
    ///
    /// This method:
    /// 1. Sends the shutdown signal to background services
    /// 2. Waits for both services to complete
    /// 3. Cleans up runtime handles
    ///
    /// Calling it twice is harmless; the second call finds nothing left to
    /// stop.
    pub async fn shutdown(&self) -> Result<(), RunnerError> {
        let mut handles = self.runtime_handles.write().await;

        info!("Shutting down delivery runner");

        // Send shutdown signal
        if let Some(sender) = handles.shutdown_sender.take() {
            let _ = sender.send(());
        }

        // Wait for the worker to finish
        if let Some(handle) = handles.worker_handle.take() {
            let _ = handle.await;
        }

        // Wait for maintenance to finish
        if let Some(handle) = handles.maintenance_handle.take() {
            let _ = handle.await;
        }

        info!("Delivery runner shutdown complete");
        Ok(())
    }
}
