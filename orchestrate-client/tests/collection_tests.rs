use orchestrate_client::{
    Client, ClientConfig, Conditional, EventRange, HasKey, HasRef, HasValue, ItemKind,
    SearchOptions,
};
use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn mock_config(server: &MockServer) -> ClientConfig {
    ClientConfig {
        host: server.uri(),
        ..ClientConfig::new("test-key")
    }
}

fn client(server: &MockServer) -> Client {
    Client::new(mock_config(server)).unwrap()
}

// ── Client ──────────────────────────────────────────────────────

#[tokio::test]
async fn ping_succeeds_on_200() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .and(path("/v0/"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    assert!(client(&server).ping().await);
}

#[tokio::test]
async fn ping_fails_on_401() {
    let server = MockServer::start().await;
    Mock::given(method("HEAD"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    assert!(!client(&server).ping().await);
}

#[tokio::test]
async fn one_shot_get_and_put() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v0/users/alice"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("ETag", "\"r1\"")
                .set_body_json(json!({"name": "Alice"})),
        )
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/v0/users/alice"))
        .respond_with(ResponseTemplate::new(201).insert_header("ETag", "\"r2\""))
        .mount(&server)
        .await;

    let client = client(&server);
    let alice = client.get("users", "alice", None).await.unwrap();
    assert!(alice.is_success());
    assert_eq!(alice.value().get("name"), Some(&json!("Alice")));

    let value = json!({"name": "Alice B."}).as_object().cloned().unwrap();
    let written = client
        .put("users", "alice", value, Conditional::match_ref("r1"))
        .await
        .unwrap();
    assert_eq!(written.ref_(), Some("r2"));
}

// ── Search ──────────────────────────────────────────────────────

#[tokio::test]
async fn search_passes_options_and_reads_aggregates() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v0/users"))
        .and(query_param("query", "name:alice"))
        .and(query_param("sort", "value.name:asc"))
        .and(query_param("aggregate", "value.age:stats"))
        .and(query_param("limit", "5"))
        .and(query_param("offset", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 1,
            "total_count": 11,
            "results": [{
                "path": {"collection": "users", "kind": "item", "key": "alice", "ref": "r1"},
                "value": {"name": "alice"},
                "score": 2.5
            }],
            "aggregates": [{"aggregate_kind": "stats", "field_name": "value.age"}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let options = SearchOptions::new()
        .sort("value.name:asc")
        .aggregate("value.age:stats")
        .limit(5)
        .offset(10);
    let list = client(&server)
        .search("users", "name:alice", &options)
        .await
        .unwrap();

    assert_eq!(list.total_count(), Some(11));
    assert_eq!(list.aggregates().len(), 1);
    assert_eq!(list[0].as_item().unwrap().score(), Some(2.5));
}

#[tokio::test]
async fn totals_use_zero_limit_search() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v0/users"))
        .and(query_param("query", "@path.kind:item"))
        .and(query_param("limit", "0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 0, "total_count": 42, "results": []
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v0/users"))
        .and(query_param("query", "@path.kind:event AND @path.type:login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 0, "total_count": 7, "results": []
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v0/users"))
        .and(query_param("query", "@path.kind:relationship"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let mut users = client(&server).collection("users");
    assert_eq!(users.total_items().await.unwrap(), Some(42));
    assert_eq!(users.total_events(Some("login")).await.unwrap(), Some(7));
    assert_eq!(users.total_relationships(None).await.unwrap(), None);
    assert_eq!(users.last_response().unwrap().status(), 500);
}

// ── Events, refs and graph ──────────────────────────────────────

#[tokio::test]
async fn list_events_with_range() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v0/users/alice/events/login"))
        .and(query_param("limit", "20"))
        .and(query_param("startEvent", "1000/1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 1,
            "results": [{
                "path": {"collection": "users", "kind": "event", "key": "alice",
                         "type": "login", "timestamp": 1500, "ordinal": 3, "ref": "e1"},
                "value": {}
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let users = client(&server).collection("users");
    let range = EventRange::new().start(1000, Some(1));
    let list = users.events("alice", "login", 20, Some(&range)).await.unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0].kind(), ItemKind::Event);
    assert_eq!(list[0].as_event().unwrap().ordinal(), Some(3));
}

#[tokio::test]
async fn list_refs_with_values() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v0/users/alice/refs"))
        .and(query_param("values", "true"))
        .and(query_param("offset", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 2,
            "results": [
                {"path": {"collection": "users", "kind": "item", "key": "alice", "ref": "r2",
                          "reftime": 2000, "tombstone": true}, "value": null},
                {"path": {"collection": "users", "kind": "item", "key": "alice", "ref": "r1",
                          "reftime": 1000}, "value": {"name": "Alice"}}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let users = client(&server).collection("users");
    let history = users.refs("alice", 10, 1, true).await.unwrap();
    assert_eq!(history.len(), 2);
    assert!(history[0].as_item().unwrap().is_tombstone());
    assert_eq!(history[1].ref_(), Some("r1"));
}

#[tokio::test]
async fn graph_traversal_from_item() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v0/users/alice/relations/friend/likes"))
        .and(query_param("limit", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 1,
            "results": [{"path": {"collection": "movies", "kind": "item", "key": "heat"},
                         "value": {}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let alice = client(&server).collection("users").item("alice");
    let list = alice.relations(&["friend", "likes"], 10, 0).await.unwrap();
    assert_eq!(list[0].key(), Some("heat"));
}

// ── Collection delete ───────────────────────────────────────────

#[tokio::test]
async fn delete_collection_requires_204() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/v0/users"))
        .and(query_param("force", "true"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/v0/archive"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let client = client(&server);
    assert!(client.collection("users").delete().await.unwrap());
    assert!(!client.collection("archive").delete().await.unwrap());
}
