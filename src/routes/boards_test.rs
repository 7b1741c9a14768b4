use axum::http::StatusCode;
use serde_json::{Value, json};

use crate::routes::app;
use crate::routes::test_helpers::*;
use crate::state::test_helpers::test_app_state;

async fn board_and_columns(app: &axum::Router, cookie: &str) -> (String, Vec<Value>) {
    let board = body_json(send(app, request("GET", "/api/board", Some(cookie), None)).await).await;
    let board_id = board["id"].as_str().unwrap().to_owned();
    let columns = body_json(send(app, request("GET", &format!("/api/board/{board_id}/columns"), Some(cookie), None)).await).await;
    (board_id, columns.as_array().unwrap().clone())
}

fn column_id(columns: &[Value], title: &str) -> String {
    columns.iter().find(|c| c["title"] == title).unwrap()["id"].as_str().unwrap().to_owned()
}

#[tokio::test]
async fn board_requires_session() {
    let (state, _) = test_app_state();
    let app = app(state);
    let response = send(&app, request("GET", "/api/board", None, None)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["code"], "E_NOT_AUTHENTICATED");
}

#[tokio::test]
async fn signup_provisions_default_columns() {
    let (state, _) = test_app_state();
    let app = app(state);
    let cookie = signup_cookie(&app, "user@example.com").await;
    let (_, columns) = board_and_columns(&app, &cookie).await;

    let layout = columns
        .iter()
        .map(|c| (c["title"].as_str().unwrap().to_owned(), c["order"].as_i64().unwrap()))
        .collect::<Vec<_>>();
    assert_eq!(
        layout,
        vec![("To Do".to_owned(), 1), ("Progress".to_owned(), 2), ("Done".to_owned(), 3)]
    );
}

#[tokio::test]
async fn create_card_and_move_it_across_columns() {
    let (state, _) = test_app_state();
    let app = app(state);
    let cookie = signup_cookie(&app, "user@example.com").await;
    let (board_id, columns) = board_and_columns(&app, &cookie).await;
    let todo = column_id(&columns, "To Do");
    let progress = column_id(&columns, "Progress");

    let response = send(
        &app,
        request(
            "POST",
            &format!("/api/board/{board_id}/columns/{todo}/cards"),
            Some(&cookie),
            Some(json!({"content": "Write tests"})),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let card = body_json(response).await;
    assert_eq!(card["order"], 1);
    let card_id = card["id"].as_str().unwrap().to_owned();

    let response = send(
        &app,
        request(
            "POST",
            &format!("/api/board/{board_id}/cards/{card_id}/move"),
            Some(&cookie),
            Some(json!({"fromColumnId": todo, "toColumnId": progress, "order": 1})),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let moved = body_json(response).await;
    assert_eq!(moved["id"], card_id);
    assert_eq!(moved["columnId"], progress);

    let todo_cards = body_json(
        send(&app, request("GET", &format!("/api/board/{board_id}/columns/{todo}/cards"), Some(&cookie), None)).await,
    )
    .await;
    assert_eq!(todo_cards, json!([]));
    let progress_cards = body_json(
        send(&app, request("GET", &format!("/api/board/{board_id}/columns/{progress}/cards"), Some(&cookie), None))
            .await,
    )
    .await;
    assert_eq!(progress_cards.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn foreign_board_is_forbidden() {
    let (state, store) = test_app_state();
    let app = app(state);
    let owner = signup_cookie(&app, "owner@example.com").await;
    let intruder = signup_cookie(&app, "intruder@example.com").await;
    let (board_id, _) = board_and_columns(&app, &owner).await;
    let before = store.snapshot().await;

    let response = send(
        &app,
        request("POST", &format!("/api/board/{board_id}/columns"), Some(&intruder), Some(json!({"title": "Mine"}))),
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(body_json(response).await["code"], "E_UNAUTHORIZED");
    assert_eq!(store.snapshot().await, before);
}

#[tokio::test]
async fn moving_missing_card_is_not_found() {
    let (state, _) = test_app_state();
    let app = app(state);
    let cookie = signup_cookie(&app, "user@example.com").await;
    let (board_id, columns) = board_and_columns(&app, &cookie).await;
    let todo = column_id(&columns, "To Do");
    let done = column_id(&columns, "Done");

    let response = send(
        &app,
        request(
            "POST",
            &format!("/api/board/{board_id}/cards/ghost/move"),
            Some(&cookie),
            Some(json!({"fromColumnId": todo, "toColumnId": done, "order": 1})),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn store_failure_maps_to_bad_gateway() {
    let (state, store) = test_app_state();
    let app = app(state);
    let cookie = signup_cookie(&app, "user@example.com").await;
    let (board_id, _) = board_and_columns(&app, &cookie).await;

    store.fail_next_commit();
    let response = send(
        &app,
        request("POST", &format!("/api/board/{board_id}/columns"), Some(&cookie), Some(json!({"title": "Review"}))),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(body_json(response).await["code"], "E_REMOTE");
}

#[tokio::test]
async fn structure_report_lists_default_columns() {
    let (state, _) = test_app_state();
    let app = app(state);
    let cookie = signup_cookie(&app, "user@example.com").await;
    let response = send(&app, request("GET", "/api/board/structure", Some(&cookie), None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!([
            {"title": "To Do", "status": "ok", "order": 1},
            {"title": "Progress", "status": "ok", "order": 2},
            {"title": "Done", "status": "ok", "order": 3}
        ])
    );
}

#[tokio::test]
async fn mistyped_move_patch_is_bad_request_and_cards_stay_listable() {
    let (state, _) = test_app_state();
    let app = app(state);
    let cookie = signup_cookie(&app, "user@example.com").await;
    let (board_id, columns) = board_and_columns(&app, &cookie).await;
    let todo = column_id(&columns, "To Do");
    let done = column_id(&columns, "Done");

    let created = send(
        &app,
        request(
            "POST",
            &format!("/api/board/{board_id}/columns/{todo}/cards"),
            Some(&cookie),
            Some(json!({"content": "Write tests"})),
        ),
    )
    .await;
    let card_id = body_json(created).await["id"].as_str().unwrap().to_owned();

    let response = send(
        &app,
        request(
            "POST",
            &format!("/api/board/{board_id}/cards/{card_id}/move"),
            Some(&cookie),
            Some(json!({"fromColumnId": todo, "toColumnId": done, "order": 1, "patch": {"content": 42}})),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "E_VALIDATION");

    for (column, expected) in [(&todo, 1), (&done, 0)] {
        let response =
            send(&app, request("GET", &format!("/api/board/{board_id}/columns/{column}/cards"), Some(&cookie), None))
                .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await.as_array().unwrap().len(), expected);
    }
}

#[tokio::test]
async fn board_by_id_checks_ownership() {
    let (state, _) = test_app_state();
    let app = app(state);
    let owner = signup_cookie(&app, "owner@example.com").await;
    let intruder = signup_cookie(&app, "intruder@example.com").await;
    let (board_id, _) = board_and_columns(&app, &owner).await;

    let response = send(&app, request("GET", &format!("/api/board/{board_id}"), Some(&owner), None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["id"], board_id.as_str());

    let response = send(&app, request("GET", &format!("/api/board/{board_id}"), Some(&intruder), None)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = send(&app, request("GET", "/api/board/board-nobody", Some(&owner), None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
