//! End-to-end tests: boot the service on an ephemeral port and drive it over
//! HTTP with a real client, against both backings. Redirects are disabled so
//! the 303 from POST /todos/ is observable.

use std::sync::Arc;

use serde_json::{Value, json};
use todo_backend::api;
use todo_backend::store::SharedStore;
use todo_backend::store::memory::MemoryStore;
use todo_backend::store::sqlite::SqliteStore;

async fn spawn_server(make_store: impl FnOnce(String) -> SharedStore) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    let store = make_store(base_url.clone());

    tokio::spawn(async move {
        axum::serve(listener, api::router(store)).await.unwrap();
    });
    base_url
}

fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .unwrap()
}

/// The full association scenario, §-by-§: create todo and tag, associate,
/// query both directions, delete the tag, observe the filtered reference.
async fn run_scenario(base_url: &str) {
    let client = client();

    // Create the todo; expect the redirect-style answer.
    let response = client
        .post(format!("{base_url}/todos/"))
        .json(&json!({ "title": "write spec" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 303);
    let location = response
        .headers()
        .get("location")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert_eq!(location, format!("{base_url}/todos/1"));

    // The Location header resolves to the created record.
    let todo: Value = client.get(&location).send().await.unwrap().json().await.unwrap();
    assert_eq!(todo["id"], json!(1));
    assert_eq!(todo["completed"], json!(false));
    assert_eq!(todo["tags"], json!([]));

    // Create the tag.
    let response = client
        .post(format!("{base_url}/tags/"))
        .json(&json!({ "title": "work" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 201);
    let tag: Value = response.json().await.unwrap();
    assert_eq!(tag["id"], json!(1));

    // Associate, twice; the second call is a no-op.
    for _ in 0..2 {
        let response = client
            .post(format!("{base_url}/todos/1/tags/"))
            .json(&json!({ "tag_id": 1 }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), 200);
        let todo: Value = response.json().await.unwrap();
        assert_eq!(todo["tags"], json!([1]));
    }

    // Both directions of the association view.
    let todos: Value = client
        .get(format!("{base_url}/tags/1/todos/"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(todos[0]["id"], json!(1));
    assert_eq!(todos[0]["title"], json!("write spec"));

    let tags: Value = client
        .get(format!("{base_url}/todos/1/tags/"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(tags[0]["title"], json!("work"));

    // Delete the tag; the todo's reference dangles and reads filter it.
    let response = client
        .delete(format!("{base_url}/tags/1"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 204);

    let tags: Value = client
        .get(format!("{base_url}/todos/1/tags/"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(tags, json!([]));

    // Clear everything; allocation restarts at 1.
    let response = client
        .delete(format!("{base_url}/todos/"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 204);

    let response = client
        .post(format!("{base_url}/todos/"))
        .json(&json!({ "title": "fresh start" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 303);
    assert_eq!(
        response.headers().get("location").unwrap().to_str().unwrap(),
        format!("{base_url}/todos/1")
    );
}

#[tokio::test]
async fn scenario_against_memory_backing() {
    let base_url = spawn_server(|base| Arc::new(MemoryStore::new(base))).await;
    run_scenario(&base_url).await;
}

#[tokio::test]
async fn scenario_against_sqlite_backing() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("todos.db");
    let base_url =
        spawn_server(move |base| Arc::new(SqliteStore::open(&db_path, base).unwrap())).await;
    run_scenario(&base_url).await;
}

#[tokio::test]
async fn validation_and_not_found_mapping_over_the_wire() {
    let base_url = spawn_server(|base| Arc::new(MemoryStore::new(base))).await;
    let client = client();

    let response = client
        .post(format!("{base_url}/todos/"))
        .json(&json!({ "title": "" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(
        body["error"],
        json!("\"title\" must be a string with at least one character")
    );

    let response = client
        .get(format!("{base_url}/todos/999"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 404);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], json!("Todo not found"));

    // Non-numeric id never reaches the store; routing answers for it.
    let response = client
        .get(format!("{base_url}/todos/abc"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 400);
}
