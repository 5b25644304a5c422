use orchestrate_client::{
    ClientConfig, ClientError, Conditional, EdgeEnd, Event, HasRef, HasValue, HttpExecutor,
    Relationship, SharedExecutor,
};
use serde_json::{Map, Value, json};
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn mock_config(server: &MockServer) -> ClientConfig {
    ClientConfig {
        host: server.uri(),
        ..ClientConfig::new("test-key")
    }
}

fn executor(server: &MockServer) -> SharedExecutor {
    HttpExecutor::new(mock_config(server)).unwrap().shared()
}

fn object(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap()
}

fn follows(server: &MockServer) -> Relationship {
    Relationship::new("users", "alice", "follows", EdgeEnd::new("users", "bob"))
        .with_executor(executor(server))
}

// ── Relationships ───────────────────────────────────────────────

#[tokio::test]
async fn put_edge_with_properties() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/v0/users/alice/relation/follows/users/bob"))
        .and(body_json(json!({"since": 2014})))
        .respond_with(ResponseTemplate::new(201).insert_header("ETag", "\"e1\""))
        .expect(1)
        .mount(&server)
        .await;

    let mut edge = follows(&server);
    assert!(edge.put(Some(object(json!({"since": 2014}))), Conditional::Unconditional).await.unwrap());
    assert_eq!(edge.ref_(), Some("e1"));
    assert_eq!(edge.value().get("since"), Some(&json!(2014)));
}

#[tokio::test]
async fn fetch_edge() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v0/users/alice/relation/follows/users/bob"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("ETag", "\"e1\"")
                .set_body_json(json!({"since": 2014})),
        )
        .mount(&server)
        .await;

    let mut edge = follows(&server);
    assert!(edge.fetch().await.unwrap());
    assert_eq!(edge.ref_(), Some("e1"));
}

#[tokio::test]
async fn put_both_writes_forward_and_reverse() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/v0/users/alice/relation/follows/users/bob"))
        .respond_with(ResponseTemplate::new(201).insert_header("ETag", "\"fwd\""))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/v0/users/bob/relation/follows/users/alice"))
        .respond_with(ResponseTemplate::new(201).insert_header("ETag", "\"rev\""))
        .expect(1)
        .mount(&server)
        .await;

    let mut edge = follows(&server);
    assert!(edge.put_both(None).await.unwrap());
    assert_eq!(edge.ref_(), Some("fwd"));
}

#[tokio::test]
async fn put_both_fails_if_reverse_fails() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/v0/users/alice/relation/follows/users/bob"))
        .respond_with(ResponseTemplate::new(201).insert_header("ETag", "\"fwd\""))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/v0/users/bob/relation/follows/users/alice"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "message": "The requested items could not be found.",
            "code": "relation_not_found"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut edge = follows(&server);
    assert!(!edge.put_both(None).await.unwrap());
    // The forward edge stays written.
    assert_eq!(edge.ref_(), Some("fwd"));
    assert_eq!(edge.last_response().unwrap().status(), 404);
}

#[tokio::test]
async fn delete_both_purges_both_directions() {
    let server = MockServer::start().await;
    for edge_path in [
        "/v0/users/alice/relation/follows/users/bob",
        "/v0/users/bob/relation/follows/users/alice",
    ] {
        Mock::given(method("DELETE"))
            .and(path(edge_path))
            .and(query_param("purge", "true"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;
    }

    let mut edge = follows(&server);
    assert!(edge.delete_both().await.unwrap());
    assert_eq!(edge.ref_(), None);
}

// ── Events ──────────────────────────────────────────────────────

#[tokio::test]
async fn post_event_reads_location() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v0/users/alice/events/login"))
        .and(body_json(json!({"ip": "10.0.0.1"})))
        .respond_with(
            ResponseTemplate::new(201)
                .insert_header("Location", "/v0/users/alice/events/login/1395860452000/2")
                .insert_header("ETag", "\"ev1\""),
        )
        .expect(1)
        .mount(&server)
        .await;

    let mut event = Event::new("users", "alice", "login").with_executor(executor(&server));
    assert!(event.post(Some(object(json!({"ip": "10.0.0.1"}))), None).await.unwrap());
    assert_eq!(event.timestamp(), Some(1_395_860_452_000));
    assert_eq!(event.ordinal(), Some(2));
    assert_eq!(event.ref_(), Some("ev1"));
    assert!(event.datetime().is_some());
}

#[tokio::test]
async fn put_and_purge_event() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/v0/users/alice/events/login/1000/1"))
        .respond_with(ResponseTemplate::new(204).insert_header("ETag", "\"ev2\""))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/v0/users/alice/events/login/1000/1"))
        .and(query_param("purge", "true"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let mut event = Event::new("users", "alice", "login")
        .at(1000, 1)
        .with_executor(executor(&server));
    assert!(event.put(None, Conditional::Unconditional).await.unwrap());
    assert_eq!(event.ref_(), Some("ev2"));
    assert!(event.purge(Conditional::MatchCurrent).await.unwrap());
    assert_eq!(event.ref_(), None);
}

#[tokio::test]
async fn event_put_rejects_create_only() {
    let mut event = Event::new("users", "alice", "login").at(1000, 1);
    let err = event.put(None, Conditional::NoneMatch).await.unwrap_err();
    assert!(matches!(err, ClientError::InvalidConditional(_)));
}
