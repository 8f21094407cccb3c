//! End-to-end tests of the layered pipeline over an in-memory source

mod common;

use hrms_semantic::core::cache::{MemorySnapshotStore, ReadMode, SnapshotMeta, SnapshotStore};
use hrms_semantic::core::refresh::RebuildCoordinator;
use hrms_semantic::domain::{EntityName, Value};
use std::collections::BTreeSet;
use std::sync::Arc;

fn entity(name: &str) -> EntityName {
    name.parse().unwrap()
}

#[tokio::test]
async fn test_attendance_batches_union_with_provenance() {
    let controller = common::controller(
        common::config(),
        Arc::new(common::source()),
        Arc::new(MemorySnapshotStore::new()),
    );

    let staged = controller
        .get(&entity("staging.stg_attendance"), ReadMode::Bypass)
        .await
        .unwrap();
    let employee_100: Vec<_> = staged
        .table
        .rows()
        .filter(|r| r.get("emp_id") == &Value::Int(100))
        .collect();
    assert_eq!(employee_100.len(), 4);

    let sources: BTreeSet<String> = employee_100
        .iter()
        .map(|r| r.get("_source").to_string())
        .collect();
    assert_eq!(sources.len(), 2);
    assert!(sources.contains("Attendance_2024H2"));

    // Grouping the business view by employee and shift keeps both shifts
    let detail = controller
        .get(&entity("business.attendance_detail"), ReadMode::Bypass)
        .await
        .unwrap();
    let shifts: BTreeSet<String> = detail
        .table
        .rows()
        .filter(|r| r.get("emp_id") == &Value::Int(100))
        .map(|r| r.get("shift_type").to_string())
        .collect();
    assert_eq!(
        shifts,
        BTreeSet::from(["Day".to_string(), "Night".to_string()])
    );
}

#[tokio::test]
async fn test_activity_log_retention_window() {
    let controller = common::controller(
        common::config(),
        Arc::new(common::source()),
        Arc::new(MemorySnapshotStore::new()),
    );

    let activity = controller
        .get(&entity("staging.stg_activity_log"), ReadMode::Bypass)
        .await
        .unwrap();
    assert_eq!(activity.table.len(), 1);
    assert_eq!(activity.table.raw_rows()[0][0], Value::Int(2));
}

#[tokio::test]
async fn test_alert_feed_priorities_and_order() {
    let controller = common::controller(
        common::config(),
        Arc::new(common::source()),
        Arc::new(MemorySnapshotStore::new()),
    );

    let feed = controller
        .get(&entity("alerts.alert_feed"), ReadMode::Bypass)
        .await
        .unwrap();
    assert!(feed.freshness.is_live());

    let find = |alert_type: &str, subject: &str| {
        feed.table
            .rows()
            .find(|r| r.str("alert_type") == Some(alert_type) && r.str("subject") == Some(subject))
            .map(|r| r.str("priority").unwrap_or_default().to_string())
    };

    assert_eq!(
        find("excessive_overtime", "Ann Lee (100)").as_deref(),
        Some("Low")
    );
    assert_eq!(find("high_arrears", "Bob Ray (200)").as_deref(), Some("High"));
    assert_eq!(find("high_arrears", "Ann Lee (100)"), None);

    let first = feed.table.rows().next().unwrap();
    assert_eq!(first.str("priority"), Some("High"));

    // Priorities never increase down the feed
    let ranks: Vec<i64> = feed
        .table
        .rows()
        .map(|r| match r.str("priority") {
            Some("High") => 0,
            Some("Medium") => 1,
            _ => 2,
        })
        .collect();
    assert!(ranks.windows(2).all(|w| w[0] <= w[1]));
}

#[tokio::test]
async fn test_rebuild_is_idempotent() {
    let source = Arc::new(common::source());
    let controller = common::controller(
        common::config(),
        Arc::clone(&source),
        Arc::new(MemorySnapshotStore::new()),
    );
    let coordinator = RebuildCoordinator::new(Arc::clone(&controller)).unwrap();

    let first = coordinator.rebuild().await.unwrap();
    assert!(first.is_successful(), "{:?}", first.failures);
    let checksums = |metas: Vec<SnapshotMeta>| {
        metas
            .into_iter()
            .map(|m| (m.entity.qualified(), m.checksum))
            .collect::<Vec<_>>()
    };
    let before = checksums(controller.store().list().await.unwrap());

    let second = coordinator.rebuild().await.unwrap();
    assert!(second.is_successful());
    let after = checksums(controller.store().list().await.unwrap());

    assert_eq!(before, after);
    assert!(before.iter().any(|(e, _)| e == "metrics.headcount_metrics"));
    assert!(before.iter().any(|(e, _)| e == "alerts.alert_feed"));
}

#[tokio::test]
async fn test_read_before_and_after_refresh() {
    let controller = common::controller(
        common::config(),
        Arc::new(common::source()),
        Arc::new(MemorySnapshotStore::new()),
    );
    let headcount = entity("metrics.headcount_metrics");

    let before = controller.get(&headcount, ReadMode::Cached).await.unwrap();
    assert!(before.freshness.is_live());

    controller.refresh(&headcount).await.unwrap();
    let cached = controller.get(&headcount, ReadMode::Cached).await.unwrap();
    let live = controller.get(&headcount, ReadMode::Bypass).await.unwrap();

    assert!(!cached.freshness.is_live());
    assert!(live.freshness.is_live());
    assert_eq!(*cached.table, *live.table);

    let alias = controller
        .get(&entity("cache.headcount_metrics"), ReadMode::Cached)
        .await
        .unwrap();
    assert_eq!(*alias.table, *cached.table);
}

#[tokio::test]
async fn test_failed_refresh_keeps_prior_snapshot() {
    let source = Arc::new(common::source());
    let controller = common::controller(
        common::config(),
        Arc::clone(&source),
        Arc::new(MemorySnapshotStore::new()),
    );
    let summary = entity("business.employee_summary");

    let meta = controller.refresh(&summary).await.unwrap();
    let prior = controller.get(&summary, ReadMode::Cached).await.unwrap();

    source.fail_table("Employee_Master");
    assert!(controller.refresh(&summary).await.is_err());

    let after = controller.get(&summary, ReadMode::Cached).await.unwrap();
    assert_eq!(*after.table, *prior.table);
    assert_eq!(
        controller.store().load_meta(&summary).await.unwrap().unwrap().checksum,
        meta.checksum
    );

    let status = controller.status().await.unwrap();
    let record = status
        .iter()
        .find(|s| s.entity == summary)
        .and_then(|s| s.last_refresh.clone())
        .unwrap();
    assert!(!record.status.is_completed());
    assert_eq!(record.row_count, meta.row_count);
}

#[tokio::test]
async fn test_upstream_failure_skips_dependents_only() {
    let source = Arc::new(common::source());
    let controller = common::controller(
        common::config(),
        Arc::clone(&source),
        Arc::new(MemorySnapshotStore::new()),
    );
    let coordinator = RebuildCoordinator::new(Arc::clone(&controller)).unwrap();
    coordinator.rebuild().await.unwrap();

    source.fail_table("Activity_Log");
    let summary = coordinator.rebuild().await.unwrap();

    let failed: Vec<String> = summary.failures.iter().map(|f| f.entity.qualified()).collect();
    let skipped: Vec<String> = summary.skipped.iter().map(|e| e.qualified()).collect();
    assert_eq!(failed, vec!["staging.stg_activity_log"]);
    assert_eq!(skipped, vec!["metrics.activity_summary"]);
    assert!(summary
        .materialized
        .iter()
        .any(|e| e.qualified() == "alerts.alert_feed"));

    // The skipped metric is still served from its previous snapshot
    let activity = controller
        .get(&entity("metrics.activity_summary"), ReadMode::Cached)
        .await
        .unwrap();
    assert!(!activity.freshness.is_live());
}
