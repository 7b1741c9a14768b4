use super::*;
use serde_json::json;

fn doc(path: &str, data: Value) -> Document {
    let Value::Object(data) = data else { panic!("test data must be an object") };
    Document { path: DocPath::parse(path).unwrap(), data }
}

// =============================================================================
// Paths
// =============================================================================

#[test]
fn doc_path_parse_accepts_even_segment_counts() {
    assert!(DocPath::parse("users/u1").is_ok());
    assert!(DocPath::parse("boards/b1/columns/c1/cards/k1").is_ok());
}

#[test]
fn doc_path_parse_rejects_bad_shapes() {
    assert!(DocPath::parse("").is_err());
    assert!(DocPath::parse("users").is_err());
    assert!(DocPath::parse("boards/b1/columns").is_err());
    assert!(DocPath::parse("boards//columns/c1").is_err());
    assert!(DocPath::parse("boards/b1/").is_err());
}

#[test]
fn child_paths_nest_under_parent() {
    let board = DocPath::root("boards", "b1").unwrap();
    let column = board.child("columns", "c1").unwrap();
    let card = column.child("cards", "k1").unwrap();
    assert_eq!(card.as_str(), "boards/b1/columns/c1/cards/k1");
    assert_eq!(card.id(), "k1");
    assert_eq!(card.parent_collection().as_str(), "boards/b1/columns/c1/cards");
}

#[test]
fn segments_with_slashes_are_rejected() {
    assert!(DocPath::root("boards", "a/b").is_err());
    assert!(CollectionPath::root("").is_err());
    let board = DocPath::root("boards", "b1").unwrap();
    assert!(board.collection_of("col/umns").is_err());
}

#[test]
fn new_doc_generates_distinct_ids() {
    let coll = CollectionPath::root("boards").unwrap();
    let a = coll.new_doc();
    let b = coll.new_doc();
    assert_ne!(a, b);
    assert_eq!(a.parent_collection(), coll);
    assert_eq!(a.id().len(), 32);
}

// =============================================================================
// Queries
// =============================================================================

#[test]
fn query_matches_filters_and_requires_sort_field() {
    let q = Query::new().filter_eq("columnId", "c1").order_by("order", Direction::Asc);
    let with_order = doc("cards/a", json!({"columnId": "c1", "order": 1}));
    let without_order = doc("cards/b", json!({"columnId": "c1"}));
    let other_column = doc("cards/c", json!({"columnId": "c2", "order": 1}));
    assert!(q.matches(&with_order.data));
    assert!(!q.matches(&without_order.data));
    assert!(!q.matches(&other_column.data));
}

#[test]
fn finish_sorts_descending_and_limits() {
    let q = Query::new().order_by("order", Direction::Desc).limit(1);
    let mut docs = vec![
        doc("columns/a", json!({"order": 2})),
        doc("columns/b", json!({"order": 10})),
        doc("columns/c", json!({"order": 3})),
    ];
    q.finish(&mut docs);
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].id(), "b");
}

#[test]
fn finish_breaks_ties_by_path() {
    let q = Query::new().order_by("order", Direction::Asc);
    let mut docs = vec![doc("columns/z", json!({"order": 1})), doc("columns/a", json!({"order": 1}))];
    q.finish(&mut docs);
    assert_eq!(docs[0].id(), "a");
    assert_eq!(docs[1].id(), "z");
}

#[test]
fn compare_values_orders_numbers_numerically() {
    assert_eq!(compare_values(Some(&json!(2)), Some(&json!(10))), Ordering::Less);
    assert_eq!(compare_values(Some(&json!(2.5)), Some(&json!(2))), Ordering::Greater);
    assert_eq!(compare_values(Some(&json!("b")), Some(&json!("a"))), Ordering::Greater);
    assert_eq!(compare_values(None, Some(&json!(0))), Ordering::Less);
}

#[test]
fn compare_values_ranks_types_like_jsonb() {
    let ranked = [json!(null), json!("1"), json!(1), json!(false), json!([1]), json!({"a": 1})];
    for pair in ranked.windows(2) {
        assert_eq!(compare_values(Some(&pair[0]), Some(&pair[1])), Ordering::Less, "{} < {}", pair[0], pair[1]);
    }
}

#[test]
fn document_field_accessors() {
    let d = doc("cards/a", json!({"order": 4, "content": "hi"}));
    assert_eq!(d.get_i64("order"), Some(4));
    assert_eq!(d.get_str("content"), Some("hi"));
    assert_eq!(d.get_i64("content"), None);
    assert_eq!(d.id(), "a");
}
