use super::*;
use crate::value::Value;
use proptest::prelude::*;
use ulid::Ulid;

fn indexed(columns: &[&str]) -> Vec<String> {
    let mut columns = columns.iter().map(ToString::to_string).collect::<Vec<_>>();
    columns.sort();
    columns
}

#[test]
fn from_query_rejects_extra_and_missing_columns() {
    let columns = indexed(&["parent"]);

    let extra = Row::new().with("parent", "P1").with("extra", "X");
    assert!(BucketKey::from_query(&columns, &extra).is_none());

    let missing = Row::new().with("other", "P1");
    assert!(BucketKey::from_query(&columns, &missing).is_none());

    let exact = Row::new().with("parent", "P1");
    assert!(BucketKey::from_query(&columns, &exact).is_some());
}

#[test]
fn from_row_ignores_non_indexed_columns() {
    let columns = indexed(&["parent"]);
    let row = Row::new().with("parent", "P1").with("created", 4);

    assert_eq!(
        BucketKey::from_row(&columns, &row),
        BucketKey::from_query(&columns, &Row::new().with("parent", "P1")),
    );
}

#[test]
fn hash_is_length_framed() {
    let columns = indexed(&["a", "b"]);
    let left = Row::new().with("a", "ab").with("b", "c");
    let right = Row::new().with("a", "a").with("b", "bc");

    let left = BucketKey::from_query(&columns, &left).expect("left key should build");
    let right = BucketKey::from_query(&columns, &right).expect("right key should build");
    assert_ne!(left.hash(), right.hash());
}

#[test]
fn values_of_different_types_hash_apart() {
    let columns = indexed(&["parent"]);
    let hash = |value: Value| {
        BucketKey::from_query(&columns, &Row::new().with("parent", value))
            .expect("key should build")
            .hash()
    };

    let hashes = [
        hash(Value::Int(5)),
        hash(Value::Uint(5)),
        hash(Value::from("5")),
        hash(Value::Bool(true)),
        hash(Value::Int(1)),
        hash(Value::Null),
        hash(Value::from("")),
    ];

    for (i, a) in hashes.iter().enumerate() {
        for b in &hashes[i + 1..] {
            assert_ne!(a, b);
        }
    }
}

#[test]
fn cache_key_combines_namespace_and_hash() {
    let namespace = CacheNamespace::new("topic_list:list", "wikidb", 3);
    let key = make_cache_key(&namespace, "deadbeef");

    assert_eq!(key.as_str(), "topic_list:list:wikidb:deadbeef:3");
}

#[test]
fn namespace_version_defaults_when_omitted() {
    let namespace: CacheNamespace =
        serde_json::from_str(r#"{"prefix":"p","domain":"d"}"#).expect("namespace should decode");

    assert_eq!(namespace.version, 1);
}

proptest! {
    #[test]
    fn key_is_invariant_to_attribute_order(
        values in prop::collection::vec("[a-z0-9]{0,6}", 1..5),
        rotate in 0usize..5,
    ) {
        let names = ["alpha", "beta", "gamma", "delta", "epsilon"];
        let mut pairs = names
            .iter()
            .zip(values.iter())
            .map(|(name, value)| ((*name).to_string(), Value::from(value.as_str())))
            .collect::<Vec<_>>();
        let columns = indexed(&names[..pairs.len()]);

        let forward = pairs.iter().cloned().collect::<Row>();
        let len = pairs.len();
        pairs.rotate_left(rotate % len);
        pairs.reverse();
        let shuffled = pairs.into_iter().collect::<Row>();

        let a = BucketKey::from_query(&columns, &forward).expect("forward key should build");
        let b = BucketKey::from_query(&columns, &shuffled).expect("shuffled key should build");
        prop_assert_eq!(a.hash(), b.hash());
    }

    #[test]
    fn key_is_invariant_to_id_encoding(
        raw in any::<u128>(),
        parent in "[A-Z][0-9]{1,3}",
        pick in (0usize..4, 0usize..4),
    ) {
        let id = Ulid(raw);
        let columns = indexed(&["parent", "topic_id"]);
        let encodings = [
            Value::Ulid(id),
            Value::Blob(id.to_bytes().to_vec()),
            Value::Text(id.to_string()),
            Value::Text(id.to_string().to_lowercase()),
        ];

        let left = Row::new().with("topic_id", encodings[pick.0].clone()).with("parent", parent.as_str());
        let right = Row::new().with("parent", parent.as_str()).with("topic_id", encodings[pick.1].clone());

        let left = BucketKey::from_query(&columns, &left).expect("left key should build");
        let right = BucketKey::from_query(&columns, &right).expect("right key should build");
        prop_assert_eq!(left.hash(), right.hash());
    }

    #[test]
    fn key_distinguishes_different_ids(a in any::<u128>(), b in any::<u128>()) {
        prop_assume!(a != b);
        let columns = indexed(&["topic_id"]);
        let left = BucketKey::from_query(&columns, &Row::new().with("topic_id", Ulid(a)))
            .expect("left key should build");
        let right = BucketKey::from_query(&columns, &Row::new().with("topic_id", Ulid(b)))
            .expect("right key should build");
        prop_assert_ne!(left.hash(), right.hash());
    }
}
