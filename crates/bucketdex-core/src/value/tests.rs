use super::*;
use std::cmp::Ordering;
use ulid::Ulid;

fn sample_id() -> Ulid {
    Ulid::from_parts(1_700_000_000_000, 0x0123_4567_89ab_cdef_0011)
}

#[test]
fn binary_and_text_ids_canonicalize_to_the_same_value() {
    let id = sample_id();
    let binary = Value::Blob(id.to_bytes().to_vec());
    let upper = Value::Text(id.to_string());
    let lower = Value::Text(id.to_string().to_lowercase());

    assert_eq!(binary.canonical_for("rev_id"), Value::Ulid(id));
    assert_eq!(upper.canonical_for("rev_id"), Value::Ulid(id));
    assert_eq!(lower.canonical_for("rev_id"), Value::Ulid(id));
}

#[test]
fn id_canonicalization_requires_an_id_column() {
    let id = sample_id();
    let binary = Value::Blob(id.to_bytes().to_vec());

    assert_eq!(binary.canonical_for("payload"), binary);
    assert_eq!(
        Value::Ulid(id).canonical_for("payload"),
        Value::Ulid(id),
        "typed ids are canonical under any column"
    );
}

#[test]
fn blobs_of_the_wrong_length_are_not_ids() {
    let short = Value::Blob(vec![0xAB; ID_BINARY_LEN - 1]);
    assert!(canonical_id("topic_id", &short).is_none());
    assert_eq!(short.canonical_text(), "ab".repeat(ID_BINARY_LEN - 1));
}

#[test]
fn canonical_text_renders_scalars_deterministically() {
    assert_eq!(Value::Null.canonical_text(), "");
    assert_eq!(Value::Bool(true).canonical_text(), "1");
    assert_eq!(Value::Int(-7).canonical_text(), "-7");
    assert_eq!(Value::Uint(42).canonical_text(), "42");
    assert_eq!(Value::from("P1").canonical_text(), "P1");
}

#[test]
fn cursor_components_compare_numerically_for_integers() {
    assert_eq!(Value::Int(10).cmp_cursor_component("9"), Ordering::Greater);
    assert_eq!(Value::Int(9).cmp_cursor_component("10"), Ordering::Less);
    assert_eq!(Value::Uint(3).cmp_cursor_component("3"), Ordering::Equal);
}

#[test]
fn cursor_components_compare_ids_by_id_order() {
    let early = Ulid::from_parts(1_000, 1);
    let late = Ulid::from_parts(2_000, 1);

    assert_eq!(
        Value::Ulid(late).cmp_cursor_component(&early.to_string()),
        Ordering::Greater
    );
    assert_eq!(
        Value::Ulid(early).cmp_cursor_component(&early.to_string().to_lowercase()),
        Ordering::Equal
    );
}

#[test]
fn unparsable_components_fall_back_to_text_comparison() {
    assert_eq!(Value::Int(5).cmp_cursor_component("abc"), "5".cmp("abc"));
    assert_eq!(Value::from("b").cmp_cursor_component("a"), Ordering::Greater);
}

#[test]
fn mixed_variants_order_by_rank() {
    assert!(Value::Null < Value::Int(i64::MIN));
    assert!(Value::Int(i64::MAX) < Value::Uint(0));
    assert!(Value::Text("z".into()) < Value::Blob(vec![]));
}

#[test]
fn option_converts_none_to_null() {
    assert_eq!(Value::from(None::<i64>), Value::Null);
    assert_eq!(Value::from(Some(3_i64)), Value::Int(3));
}
