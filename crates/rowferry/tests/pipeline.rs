//! End-to-end pipeline scenarios over the in-memory driver.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use rowferry::{Migration, MigrationError};
use rowferry_connectors::testing::{register_memory_driver, MemoryStore};
use rowferry_connectors::{Direction, Operator};
use rowferry_core::types;
use rowferry_core::{Datum, Row, SchemaMap};

fn users_schema() -> SchemaMap {
    let mut schema = SchemaMap::new();
    schema.insert("id", types::INT64, false, false);
    schema.insert("name", types::STRING, true, false);
    schema
}

fn user_row(id: i64, name: &str) -> Row {
    let mut row = Row::new();
    let mut idv = types::INT64.new_value();
    idv.parse(Datum::Int64(id)).unwrap();
    row.push("id", idv);
    let mut namev = types::STRING.new_value();
    namev.parse(Datum::Text(name.into())).unwrap();
    row.push("name", namev);
    row
}

fn seeded_endpoints(test: &str, rows: i64) -> (Arc<MemoryStore>, Arc<MemoryStore>, String, String) {
    let src = MemoryStore::new();
    src.create_table("users", users_schema());
    src.insert_rows(
        "users",
        (0..rows).map(|i| user_row(i, &format!("user-{i}"))),
    );

    let dest = MemoryStore::new();
    dest.create_table("users", users_schema());

    let src_name = format!("mem-src-{test}");
    let dest_name = format!("mem-dest-{test}");
    register_memory_driver(&src_name, &src);
    register_memory_driver(&dest_name, &dest);
    (src, dest, src_name, dest_name)
}

fn ids_of(rows: &[Row]) -> Vec<i64> {
    rows.iter()
        .map(|row| match row.get("id").unwrap().get() {
            Some(Datum::Int64(v)) => v,
            other => panic!("unexpected id datum: {other:?}"),
        })
        .collect()
}

#[tokio::test]
async fn test_small_table_single_worker_preserves_order() {
    let (src, dest, src_name, dest_name) = seeded_endpoints("s1", 0);
    src.insert_rows(
        "users",
        [user_row(1, "a"), user_row(2, "b"), user_row(3, "c")],
    );

    Migration::new()
        .source(&src_name, "")
        .unwrap()
        .dest(&dest_name, "")
        .unwrap()
        .workers(1)
        .rows_per_batch(10)
        .start()
        .await
        .unwrap();

    let rows = dest.rows("users");
    assert_eq!(ids_of(&rows), vec![1, 2, 3]);
    assert_eq!(
        rows[0].get("name").unwrap().get(),
        Some(Datum::Text("a".into()))
    );
}

#[tokio::test]
async fn test_parallel_workers_move_every_row_exactly_once() {
    let (_src, dest, src_name, dest_name) = seeded_endpoints("s2", 1000);

    Migration::new()
        .source(&src_name, "")
        .unwrap()
        .dest(&dest_name, "")
        .unwrap()
        .workers(4)
        .rows_per_batch(50)
        .start()
        .await
        .unwrap();

    let rows = dest.rows("users");
    assert_eq!(rows.len(), 1000);
    let ids = ids_of(&rows);
    let distinct: HashSet<i64> = ids.iter().copied().collect();
    assert_eq!(distinct.len(), 1000);
    assert_eq!(ids.iter().sum::<i64>(), 499_500);
}

#[tokio::test]
async fn test_root_filter_limits_migrated_rows() {
    let (_src, dest, src_name, dest_name) = seeded_endpoints("s3", 100);

    Migration::new()
        .source(&src_name, "")
        .unwrap()
        .dest(&dest_name, "")
        .unwrap()
        .filter_all("id", Operator::Gt, "50")
        .start()
        .await
        .unwrap();

    let ids = ids_of(&dest.rows("users"));
    assert_eq!(ids.len(), 49);
    assert_eq!(*ids.iter().min().unwrap(), 51);
    assert_eq!(*ids.iter().max().unwrap(), 99);
}

#[tokio::test]
async fn test_descending_order_single_worker() {
    let (_src, dest, src_name, dest_name) = seeded_endpoints("s4", 100);

    Migration::new()
        .source(&src_name, "")
        .unwrap()
        .dest(&dest_name, "")
        .unwrap()
        .order_by("users", "id", Direction::Desc)
        .workers(1)
        .start()
        .await
        .unwrap();

    let expected: Vec<i64> = (0..100).rev().collect();
    assert_eq!(ids_of(&dest.rows("users")), expected);
}

#[tokio::test]
async fn test_transient_read_failures_are_retried() {
    let (src, dest, src_name, dest_name) = seeded_endpoints("s5", 10);
    src.fail_next_reads(2);

    Migration::new()
        .source(&src_name, "")
        .unwrap()
        .dest(&dest_name, "")
        .unwrap()
        .workers(1)
        .start()
        .await
        .unwrap();

    let ids = ids_of(&dest.rows("users"));
    let distinct: HashSet<i64> = ids.iter().copied().collect();
    assert_eq!(distinct.len(), 10);
    assert_eq!(ids.len(), 10);
}

#[tokio::test]
async fn test_stop_mid_run_returns_cleanly() {
    let (_src, dest, src_name, dest_name) = seeded_endpoints("s6", 5);

    let migration = Arc::new(
        Migration::new()
            .source(&src_name, "")
            .unwrap()
            .dest(&dest_name, "")
            .unwrap()
            .workers(1)
            .rows_per_batch(1),
    );

    let runner = {
        let migration = Arc::clone(&migration);
        tokio::spawn(async move { migration.start().await })
    };

    // Wait for the first row to land, then stop.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while dest.row_count("users") == 0 && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
    migration.stop();

    let result = tokio::time::timeout(Duration::from_secs(5), runner)
        .await
        .expect("no task leak: start() must return after stop()")
        .unwrap();
    assert!(result.is_ok(), "stop must not surface an error: {result:?}");
    assert!(dest.row_count("users") <= 5);
}

#[tokio::test]
async fn test_rows_per_batch_larger_than_table_writes_one_batch() {
    let (_src, dest, src_name, dest_name) = seeded_endpoints("partial-batch", 7);

    Migration::new()
        .source(&src_name, "")
        .unwrap()
        .dest(&dest_name, "")
        .unwrap()
        .workers(1)
        .rows_per_batch(1000)
        .start()
        .await
        .unwrap();

    assert_eq!(dest.row_count("users"), 7);
}

#[tokio::test]
async fn test_more_workers_than_rows() {
    let (_src, dest, src_name, dest_name) = seeded_endpoints("surplus-workers", 2);

    Migration::new()
        .source(&src_name, "")
        .unwrap()
        .dest(&dest_name, "")
        .unwrap()
        .workers(8)
        .start()
        .await
        .unwrap();

    assert_eq!(ids_of(&dest.rows("users")).len(), 2);
}

#[tokio::test]
async fn test_offsets_bound_the_row_range() {
    let (_src, dest, src_name, dest_name) = seeded_endpoints("offsets", 100);

    Migration::new()
        .source(&src_name, "")
        .unwrap()
        .dest(&dest_name, "")
        .unwrap()
        .workers(1)
        .set_start_offset("users", 10)
        .set_end_offset("users", 20)
        .start()
        .await
        .unwrap();

    let mut ids = ids_of(&dest.rows("users"));
    ids.sort_unstable();
    assert_eq!(ids, (10..20).collect::<Vec<i64>>());
}

#[tokio::test]
async fn test_include_and_exclude_select_collections() {
    let src = MemoryStore::new();
    for table in ["a", "b", "c"] {
        src.create_table(table, users_schema());
        src.insert_rows(table, [user_row(1, "x")]);
    }
    let dest = MemoryStore::new();
    for table in ["a", "b", "c"] {
        dest.create_table(table, users_schema());
    }
    register_memory_driver("mem-src-select", &src);
    register_memory_driver("mem-dest-select", &dest);

    Migration::new()
        .source("mem-src-select", "")
        .unwrap()
        .dest("mem-dest-select", "")
        .unwrap()
        .include(["a", "b"])
        .exclude(["b"])
        .start()
        .await
        .unwrap();

    assert_eq!(dest.row_count("a"), 1);
    assert_eq!(dest.row_count("b"), 0);
    assert_eq!(dest.row_count("c"), 0);
}

#[tokio::test]
async fn test_collection_states_reach_done() {
    let (_src, _dest, src_name, dest_name) = seeded_endpoints("states", 10);

    let migration = Migration::new()
        .source(&src_name, "")
        .unwrap()
        .dest(&dest_name, "")
        .unwrap();
    migration.start().await.unwrap();

    let states = migration.states();
    assert_eq!(
        states.get("users").copied(),
        Some(rowferry::CollectionState::Done)
    );
}

#[tokio::test]
async fn test_metrics_track_buffer_traffic() {
    let (_src, _dest, src_name, dest_name) = seeded_endpoints("metrics", 25);

    let migration = Migration::new()
        .source(&src_name, "")
        .unwrap()
        .dest(&dest_name, "")
        .unwrap();
    let stats = migration.stats();
    migration.start().await.unwrap();

    assert_eq!(
        stats.value(rowferry::metrics::METRIC_BUFFER_TOTAL_WRITE_LENGTH_ROWS, "users"),
        25
    );
    assert_eq!(
        stats.value(rowferry::metrics::METRIC_BUFFER_TOTAL_READ_LENGTH_ROWS, "users"),
        25
    );
    assert_eq!(
        stats.value(rowferry::metrics::METRIC_BUFFER_LENGTH_ROWS, "users"),
        0
    );
}

#[tokio::test]
async fn test_missing_required_column_fails_the_collection() {
    let src = MemoryStore::new();
    src.create_table("users", users_schema());
    src.insert_rows("users", [user_row(1, "a")]);

    // Destination demands a column the source never produces.
    let dest = MemoryStore::new();
    let mut dest_schema = users_schema();
    dest_schema.insert("must_have", types::STRING, false, false);
    dest.create_table("users", dest_schema);

    register_memory_driver("mem-src-required", &src);
    register_memory_driver("mem-dest-required", &dest);

    let err = Migration::new()
        .source("mem-src-required", "")
        .unwrap()
        .dest("mem-dest-required", "")
        .unwrap()
        .start()
        .await
        .unwrap_err();

    assert!(
        matches!(
            err,
            MigrationError::Connector(
                rowferry_connectors::ConnectorError::RequiredColumnMissing(ref col)
            ) if col == "must_have"
        ),
        "unexpected error: {err}"
    );
    assert_eq!(dest.row_count("users"), 0);
}
