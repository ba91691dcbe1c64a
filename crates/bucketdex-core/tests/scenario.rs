use bucketdex_core::{
    obs::{metrics_report, metrics_reset_all},
    prelude::*,
};
use std::rc::Rc;

///
/// World
///

struct World {
    cache: Rc<MemoryCache>,
    store: Rc<MemoryStore>,
    index: TopKIndex,
}

impl World {
    fn new(limit: usize) -> Self {
        let cache = Rc::new(MemoryCache::new());
        let store = Rc::new(MemoryStore::new());
        let index = TopKIndex::new(
            cache.clone(),
            store.clone(),
            CacheNamespace::new("posts:parent", "wikidb", 1),
            ["parent"],
            TopKOptions::new(["created"])
                .order(SortDirection::Desc)
                .limit(limit),
        )
        .expect("index should build");

        Self {
            cache,
            store,
            index,
        }
    }

    // persist, then fire the hook the way domain storage does
    fn insert(&self, parent: &str, created: i64) -> Row {
        let row = row! { "parent" => parent, "created" => created };
        self.store.insert(row.clone());
        self.index
            .on_after_insert(&(), &row, &Metadata::new())
            .expect("insert hook should succeed");

        row
    }

    fn remove(&self, row: &Row) {
        self.store.remove_where(row);
        self.index
            .on_after_remove(&(), row, &Metadata::new())
            .expect("remove hook should succeed");
    }

    fn read(&self, parent: &str, options: &QueryOptions) -> Vec<i64> {
        self.index
            .find(&row! { "parent" => parent }, options)
            .expect("find should succeed")
            .map(|rows| created(&rows))
            .unwrap_or_default()
    }
}

fn created(rows: &[Row]) -> Vec<i64> {
    rows.iter()
        .map(|row| match row.canonical("created") {
            Value::Int(v) => v,
            other => panic!("unexpected created value {other:?}"),
        })
        .collect()
}

#[test]
fn bucket_keeps_the_newest_rows_and_rebuilds_after_removal() {
    let world = World::new(3);
    let rows = (1..=4)
        .map(|c| world.insert("P1", c))
        .collect::<Vec<_>>();

    assert_eq!(world.read("P1", &QueryOptions::default()), vec![4, 3, 2]);

    world.remove(&rows[2]);

    // the rebuilt bucket refills from the store
    let after = world.read("P1", &QueryOptions::default());
    assert_eq!(after[..2], [4, 2]);
    assert_eq!(after, vec![4, 2, 1]);
}

#[test]
fn removal_from_a_full_store_window_leaves_the_survivors() {
    let world = World::new(3);
    let rows = (2..=4)
        .map(|c| world.insert("P1", c))
        .collect::<Vec<_>>();

    assert_eq!(world.read("P1", &QueryOptions::default()), vec![4, 3, 2]);

    world.remove(&rows[1]);

    assert_eq!(world.read("P1", &QueryOptions::default()), vec![4, 2]);
}

#[test]
fn extra_query_columns_are_unanswerable() {
    let world = World::new(3);
    world.insert("P1", 1);

    let err = world
        .index
        .find_multi(
            &[row! { "parent" => "P1", "extra" => "X" }],
            &QueryOptions::default(),
        )
        .expect_err("extra column should be refused");

    assert!(matches!(err, IndexError::UnanswerableQuery { .. }));
    assert_eq!(world.store.query_count(), 0);
}

#[test]
fn repeated_reads_are_identical_and_served_from_cache() {
    metrics_reset_all();
    let world = World::new(5);
    for c in 1..=3 {
        world.insert("P1", c);
        world.insert("P2", c * 10);
    }
    let queries = [row! { "parent" => "P1" }, row! { "parent" => "P2" }];

    let first = world
        .index
        .find_multi(&queries, &QueryOptions::default())
        .expect("first read should succeed");
    let traffic = world.store.query_count();
    let second = world
        .index
        .find_multi(&queries, &QueryOptions::default())
        .expect("second read should succeed");

    assert_eq!(first, second);
    assert_eq!(world.store.query_count(), traffic);
    assert_eq!(world.cache.len(), 2);

    let report = metrics_report();
    assert_eq!(report.ops.cache_hits, 2);
    assert_eq!(report.ops.cache_misses, 2);
}

#[test]
fn moving_a_row_updates_both_buckets() {
    let world = World::new(5);
    let moving = world.insert("P1", 7);
    world.insert("P1", 1);
    world.insert("P2", 2);

    assert_eq!(world.read("P1", &QueryOptions::default()), vec![7, 1]);
    assert_eq!(world.read("P2", &QueryOptions::default()), vec![2]);

    let moved = moving.clone().with("parent", "P2");
    world.store.replace(&moving, &moved);
    world
        .index
        .on_after_update(&(), &moving, &moved, &Metadata::new())
        .expect("update hook should succeed");

    assert_eq!(world.read("P1", &QueryOptions::default()), vec![1]);
    assert_eq!(world.read("P2", &QueryOptions::default()), vec![7, 2]);
}

#[test]
fn unchanged_update_keeps_the_cached_bucket() {
    let world = World::new(5);
    let row = world.insert("P1", 3);
    world.read("P1", &QueryOptions::default());
    let traffic = world.store.query_count();

    world
        .index
        .on_after_update(&(), &row, &row.clone(), &Metadata::new())
        .expect("update hook should succeed");
    world.read("P1", &QueryOptions::default());

    assert_eq!(world.store.query_count(), traffic);
}

#[test]
fn forward_pages_walk_the_bucket_by_cursor() {
    let world = World::new(10);
    for c in 1..=6 {
        world.insert("P1", c);
    }

    let first = world.read("P1", &QueryOptions::new().limit(2));
    assert_eq!(first, vec![6, 5]);

    let cursor = world
        .index
        .offset_value_for(&row! { "created" => 5 });
    let second = world.read("P1", &QueryOptions::new().limit(2).offset_value(cursor));
    assert_eq!(second, vec![4, 3]);

    let inclusive = world.read(
        "P1",
        &QueryOptions::new()
            .limit(2)
            .offset_value("4")
            .include_offset(true),
    );
    assert_eq!(inclusive, vec![4, 3]);
}

#[test]
fn reverse_pages_end_before_the_cursor() {
    let world = World::new(10);
    for c in 1..=6 {
        world.insert("P1", c);
    }

    let page = world.read(
        "P1",
        &QueryOptions::new()
            .limit(2)
            .offset_value("3")
            .offset_dir(OffsetDir::Rev),
    );
    assert_eq!(page, vec![5, 4]);

    // one row precedes the cursor
    let short = world.read(
        "P1",
        &QueryOptions::new()
            .limit(3)
            .offset_value("5")
            .offset_dir(OffsetDir::Rev)
            .offset_elastic(false),
    );
    assert_eq!(short, vec![6]);

    let elastic = world.read(
        "P1",
        &QueryOptions::new()
            .limit(3)
            .offset_value("5")
            .offset_dir(OffsetDir::Rev),
    );
    assert_eq!(elastic, vec![6, 5, 4]);
}

#[test]
fn cursor_past_the_window_is_reported() {
    let world = World::new(3);
    for c in 5..=9 {
        world.insert("P1", c);
    }

    let err = world
        .index
        .find(
            &row! { "parent" => "P1" },
            &QueryOptions::new().limit(2).offset_value("2"),
        )
        .expect_err("cursor below the cached window should miss");

    assert!(matches!(err, IndexError::OffsetNotFound { .. }));
    assert!(err.is_recoverable());
}
