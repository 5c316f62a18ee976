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

//! End-to-end tests for the delivery runner.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serial_test::serial;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cursus::database::UniversalTimestamp;
use cursus::delivery::{DeliveryOutcome, DeliveryTransport};
use cursus::models::delivery_command::DeliveryCommand;
use cursus::models::delivery_queue_item::DeliveryQueueItem;
use cursus::runner::{DeliveryRunner, DeliveryRunnerConfig};
use cursus::RunnerError;

use crate::fixtures::get_or_init_fixture;

/// Transport stub returning one fixed outcome and counting attempts.
struct UniformTransport {
    outcome: DeliveryOutcome,
    attempts: AtomicUsize,
}

impl UniformTransport {
    fn new(outcome: DeliveryOutcome) -> Arc<Self> {
        Arc::new(Self {
            outcome,
            attempts: AtomicUsize::new(0),
        })
    }

    fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DeliveryTransport for UniformTransport {
    async fn deliver(&self, _item: &DeliveryQueueItem) -> DeliveryOutcome {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        self.outcome
    }
}

fn queue_item(target_server_id: i64, post_uri_id: i64) -> DeliveryQueueItem {
    let created_at = UniversalTimestamp(
        DateTime::parse_from_rfc3339("2025-11-10T08:00:00Z")
            .expect("valid timestamp literal")
            .with_timezone(&Utc),
    );
    DeliveryQueueItem::new(
        target_server_id,
        post_uri_id,
        created_at,
        DeliveryCommand::WallNew.as_str(),
        70,
        1,
    )
}

/// Polls the queue until it drains or the deadline passes.
async fn wait_for_empty_queue(runner: &DeliveryRunner, target_server_id: i64) -> bool {
    for _ in 0..100 {
        let items = runner
            .dal()
            .delivery_queue()
            .list_by_destination(target_server_id, i32::MAX)
            .await
            .expect("Listing should succeed");
        if items.is_empty() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    false
}

#[tokio::test]
#[serial]
async fn test_runner_delivers_enqueued_items() {
    let fixture = get_or_init_fixture().await;
    let mut guard = fixture.lock().unwrap_or_else(|e| e.into_inner());
    guard.reset_database().await;
    guard.initialize().await;
    let database_url = guard.get_database_url();
    drop(guard);

    let transport = UniformTransport::new(DeliveryOutcome::Delivered);
    let config = DeliveryRunnerConfig::builder()
        .worker_poll_interval(Duration::from_millis(50))
        .maintenance_interval(Duration::from_secs(3600))
        .build()
        .expect("Config should validate");

    let runner = DeliveryRunner::builder()
        .database_url(&database_url)
        .transport(Arc::clone(&transport) as Arc<dyn DeliveryTransport>)
        .with_config(config)
        .build()
        .await
        .expect("Runner should start");

    runner
        .dal()
        .delivery_queue()
        .enqueue(queue_item(5, 100))
        .await
        .expect("Enqueue should succeed");

    assert!(
        wait_for_empty_queue(&runner, 5).await,
        "The background worker should drain the queue"
    );
    assert!(
        transport.attempts() >= 1,
        "The item should have gone through the transport"
    );

    tokio::time::timeout(Duration::from_secs(5), runner.shutdown())
        .await
        .expect("Shutdown should not hang")
        .expect("Shutdown should succeed");
}

#[tokio::test]
#[serial]
async fn test_runner_purges_poisoned_destination() {
    let fixture = get_or_init_fixture().await;
    let mut guard = fixture.lock().unwrap_or_else(|e| e.into_inner());
    guard.reset_database().await;
    guard.initialize().await;
    let database_url = guard.get_database_url();
    drop(guard);

    // Every attempt fails, so the item climbs to the ceiling and the
    // maintenance sweep disposes of it.
    let transport = UniformTransport::new(DeliveryOutcome::Failed);
    let config = DeliveryRunnerConfig::builder()
        .failure_ceiling(2)
        .worker_poll_interval(Duration::from_millis(25))
        .maintenance_interval(Duration::from_millis(100))
        .build()
        .expect("Config should validate");

    let runner = DeliveryRunner::builder()
        .database_url(&database_url)
        .transport(Arc::clone(&transport) as Arc<dyn DeliveryTransport>)
        .with_config(config)
        .build()
        .await
        .expect("Runner should start");

    runner
        .dal()
        .delivery_queue()
        .enqueue(queue_item(5, 100))
        .await
        .expect("Enqueue should succeed");

    assert!(
        wait_for_empty_queue(&runner, 5).await,
        "The maintenance sweep should purge the poisoned item"
    );
    assert_eq!(
        transport.attempts(),
        2,
        "Delivery stops once the failure count reaches the ceiling"
    );

    tokio::time::timeout(Duration::from_secs(5), runner.shutdown())
        .await
        .expect("Shutdown should not hang")
        .expect("Shutdown should succeed");
}

#[tokio::test]
#[serial]
async fn test_runner_shutdown_is_idempotent() {
    let fixture = get_or_init_fixture().await;
    let mut guard = fixture.lock().unwrap_or_else(|e| e.into_inner());
    guard.reset_database().await;
    guard.initialize().await;
    let database_url = guard.get_database_url();
    drop(guard);

    let transport = UniformTransport::new(DeliveryOutcome::Delivered);
    let runner = DeliveryRunner::builder()
        .database_url(&database_url)
        .transport(Arc::clone(&transport) as Arc<dyn DeliveryTransport>)
        .build()
        .await
        .expect("Runner should start");

    runner.shutdown().await.expect("First shutdown should succeed");
    runner
        .shutdown()
        .await
        .expect("Second shutdown should be a no-op");
}

#[tokio::test]
#[serial]
async fn test_builder_requires_transport() {
    let fixture = get_or_init_fixture().await;
    let mut guard = fixture.lock().unwrap_or_else(|e| e.into_inner());
    guard.reset_database().await;
    guard.initialize().await;
    let database_url = guard.get_database_url();
    drop(guard);

    let result = DeliveryRunner::builder()
        .database_url(&database_url)
        .build()
        .await;

    match result {
        Err(RunnerError::Configuration { message }) => {
            assert!(
                message.contains("transport"),
                "The error should name the missing piece, got: {}",
                message
            );
        }
        other => panic!("Expected a configuration error, got {:?}", other.map(|_| ())),
    }
}
