use super::*;
use serde_json::json;
use time::macros::datetime;

#[test]
fn column_body_uses_wire_field_names_and_omits_id() {
    let column = Column {
        id: "c1".into(),
        title: "To Do".into(),
        order: 1,
        board_id: "board-u1".into(),
        user_id: "u1".into(),
        created_at: datetime!(2025-01-02 03:04:05 UTC),
    };
    let data = column.to_data().unwrap();
    assert_eq!(data.get("title"), Some(&json!("To Do")));
    assert_eq!(data.get("order"), Some(&json!(1)));
    assert_eq!(data.get("boardId"), Some(&json!("board-u1")));
    assert_eq!(data.get("userId"), Some(&json!("u1")));
    assert_eq!(data.get("createdAt"), Some(&json!("2025-01-02T03:04:05Z")));
    assert!(!data.contains_key("id"));
}

#[test]
fn card_decodes_id_from_path() {
    let path = card_path("board-u1", "c1", "k1").unwrap();
    let body = json!({"content": "write tests", "order": 3, "columnId": "c1"});
    let doc = Document { path, data: body.as_object().cloned().unwrap() };
    let card = Card::from_document(&doc).unwrap();
    assert_eq!(card.id, "k1");
    assert_eq!(card.content, "write tests");
    assert_eq!(card.order, 3);
    assert_eq!(card.column_id, "c1");
}

#[test]
fn malformed_body_reports_path() {
    let path = card_path("board-u1", "c1", "k1").unwrap();
    let doc = Document { path, data: json!({"content": 5}).as_object().cloned().unwrap() };
    let err = Card::from_document(&doc).unwrap_err();
    match err {
        StoreError::Malformed { path, .. } => assert_eq!(path, "boards/board-u1/columns/c1/cards/k1"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn paths_follow_board_hierarchy() {
    assert_eq!(board_id_for_user("u1"), "board-u1");
    assert_eq!(columns_path("board-u1").unwrap().as_str(), "boards/board-u1/columns");
    assert_eq!(cards_path("b", "c").unwrap().as_str(), "boards/b/columns/c/cards");
    assert_eq!(credential_path("u1").unwrap().as_str(), "users/u1/private/credential");
    assert_eq!(session_path("tok").unwrap().as_str(), "sessions/tok");
}

#[test]
fn paths_reject_ids_with_slashes() {
    assert!(column_path("b", "../x").is_err());
    assert!(card_path("b", "c", "").is_err());
}
