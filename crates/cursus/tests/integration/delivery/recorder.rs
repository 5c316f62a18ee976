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

//! Integration tests for the delivery outcome recorder.

use chrono::{DateTime, Utc};
use serial_test::serial;

use cursus::database::UniversalTimestamp;
use cursus::delivery::OutcomeRecorder;
use cursus::models::delivery_command::DeliveryCommand;
use cursus::models::delivery_queue_item::DeliveryQueueItem;

use crate::fixtures::get_or_init_fixture;

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

#[tokio::test]
#[serial]
async fn test_record_success_removes_item() {
    let fixture = get_or_init_fixture().await;
    let mut guard = fixture.lock().unwrap_or_else(|e| e.into_inner());
    guard.reset_database().await;
    guard.initialize().await;
    let dal = guard.get_dal();

    dal.delivery_queue()
        .enqueue(queue_item(5, 100))
        .await
        .expect("Enqueue should succeed");

    let recorder = OutcomeRecorder::new(dal.clone());
    let recorded = recorder
        .record_success(5, 100)
        .await
        .expect("Recording should succeed");
    assert!(recorded, "The delivered item should have been dequeued");

    let items = dal
        .delivery_queue()
        .list_by_destination(5, 10)
        .await
        .expect("Listing should succeed");
    assert!(items.is_empty(), "A delivered item leaves the queue");

    // Duplicate reports happen when two workers race; they are harmless.
    let recorded_again = recorder
        .record_success(5, 100)
        .await
        .expect("A duplicate report should not error");
    assert!(!recorded_again, "The second report finds nothing to remove");
}

#[tokio::test]
#[serial]
async fn test_record_failure_increments_count() {
    let fixture = get_or_init_fixture().await;
    let mut guard = fixture.lock().unwrap_or_else(|e| e.into_inner());
    guard.reset_database().await;
    guard.initialize().await;
    let dal = guard.get_dal();

    dal.delivery_queue()
        .enqueue(queue_item(5, 100))
        .await
        .expect("Enqueue should succeed");

    let recorder = OutcomeRecorder::new(dal.clone());
    for _ in 0..2 {
        let recorded = recorder
            .record_failure(5, 100)
            .await
            .expect("Recording should succeed");
        assert!(recorded, "The failed item should have been updated");
    }

    let items = dal
        .delivery_queue()
        .list_by_destination(5, 10)
        .await
        .expect("Listing should succeed");
    assert_eq!(items.len(), 1, "A failed item stays queued for retry");
    assert_eq!(items[0].failed, 2, "Each failure adds one to the count");
}

#[tokio::test]
#[serial]
async fn test_recording_against_missing_item_reports_nothing_done() {
    let fixture = get_or_init_fixture().await;
    let mut guard = fixture.lock().unwrap_or_else(|e| e.into_inner());
    guard.reset_database().await;
    guard.initialize().await;
    let dal = guard.get_dal();

    let recorder = OutcomeRecorder::new(dal);

    let success = recorder
        .record_success(5, 999)
        .await
        .expect("Recording should not error");
    assert!(!success);

    let failure = recorder
        .record_failure(5, 999)
        .await
        .expect("Recording should not error");
    assert!(!failure);
}
