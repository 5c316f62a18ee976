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

//! Integration tests for queue maintenance sweeps.

use chrono::{DateTime, Utc};
use serial_test::serial;

use cursus::database::UniversalTimestamp;
use cursus::delivery::{MaintenanceReport, QueueMaintenance};
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
async fn test_sweep_purges_destinations_past_ceiling() {
    let fixture = get_or_init_fixture().await;
    let mut guard = fixture.lock().unwrap_or_else(|e| e.into_inner());
    guard.reset_database().await;
    guard.initialize().await;
    let dal = guard.get_dal();

    let queue = dal.delivery_queue();
    // Destination 5 has one exhausted post and one that is still viable.
    for (post, failures) in [(100, 3), (101, 1)] {
        queue
            .enqueue(queue_item(5, post))
            .await
            .expect("Enqueue should succeed");
        for _ in 0..failures {
            queue
                .increment_failed(5, post)
                .await
                .expect("Increment should succeed");
        }
    }
    // Destination 6 is healthy throughout.
    queue
        .enqueue(queue_item(6, 200))
        .await
        .expect("Enqueue should succeed");

    let maintenance = QueueMaintenance::new(dal.clone());
    let report = maintenance.sweep(3).await;

    assert_eq!(
        report,
        MaintenanceReport {
            destinations_examined: 2,
            destinations_purged: 1,
            destinations_failed: 0,
            compacted: true,
        }
    );

    let surviving: Vec<i64> = queue
        .list_by_destination(5, i32::MAX)
        .await
        .expect("Listing should succeed")
        .iter()
        .map(|item| item.post_uri_id)
        .collect();
    assert_eq!(
        surviving,
        vec![101],
        "Only items at or past the ceiling are purged"
    );

    let healthy = queue
        .list_by_destination(6, i32::MAX)
        .await
        .expect("Listing should succeed");
    assert_eq!(healthy.len(), 1, "Healthy destinations are untouched");
}

#[tokio::test]
#[serial]
async fn test_sweep_counts_every_purged_destination() {
    let fixture = get_or_init_fixture().await;
    let mut guard = fixture.lock().unwrap_or_else(|e| e.into_inner());
    guard.reset_database().await;
    guard.initialize().await;
    let dal = guard.get_dal();

    let queue = dal.delivery_queue();
    for server in [5, 6, 7] {
        queue
            .enqueue(queue_item(server, 100))
            .await
            .expect("Enqueue should succeed");
    }
    // Two of the three destinations cross the ceiling.
    for server in [5, 6] {
        for _ in 0..2 {
            queue
                .increment_failed(server, 100)
                .await
                .expect("Increment should succeed");
        }
    }

    let maintenance = QueueMaintenance::new(dal.clone());
    let report = maintenance.sweep(2).await;

    assert_eq!(report.destinations_examined, 3);
    assert_eq!(report.destinations_purged, 2);
    assert_eq!(report.destinations_failed, 0);
    assert!(report.compacted);

    for server in [5, 6] {
        let items = queue
            .list_by_destination(server, i32::MAX)
            .await
            .expect("Listing should succeed");
        assert!(
            items.is_empty(),
            "Destination {} should have been emptied",
            server
        );
    }
    let survivor = queue
        .list_by_destination(7, i32::MAX)
        .await
        .expect("Listing should succeed");
    assert_eq!(survivor.len(), 1);
}

#[tokio::test]
#[serial]
async fn test_sweep_on_empty_queue_still_compacts() {
    let fixture = get_or_init_fixture().await;
    let mut guard = fixture.lock().unwrap_or_else(|e| e.into_inner());
    guard.reset_database().await;
    guard.initialize().await;
    let dal = guard.get_dal();

    let maintenance = QueueMaintenance::new(dal);
    let report = maintenance.sweep(3).await;

    assert_eq!(
        report,
        MaintenanceReport {
            destinations_examined: 0,
            destinations_purged: 0,
            destinations_failed: 0,
            compacted: true,
        },
        "An idle sweep reclaims storage even with nothing to purge"
    );
}
