use orchestrate_client::{
    ClientConfig, ClientError, Collection, Entity, HasKey, HasRef, HttpExecutor, ItemKind,
    KeyRange, ResultList, SharedExecutor,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::{Value, json};
use wiremock::matchers::{method, path, query_param};
use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

fn mock_config(server: &MockServer) -> ClientConfig {
    ClientConfig {
        host: server.uri(),
        ..ClientConfig::new("test-key")
    }
}

fn executor(server: &MockServer) -> SharedExecutor {
    HttpExecutor::new(mock_config(server)).unwrap().shared()
}

fn item(key: &str) -> Value {
    json!({
        "path": {"collection": "users", "kind": "item", "key": key, "ref": format!("ref-{key}")},
        "value": {"name": key}
    })
}

fn keys(list: &ResultList) -> Vec<&str> {
    list.iter().filter_map(|e| e.key()).collect()
}

/// Matches the raw query string byte for byte.
struct RawQuery(&'static str);

impl Match for RawQuery {
    fn matches(&self, request: &Request) -> bool {
        request.url.query() == Some(self.0)
    }
}

// ── Pagination ──────────────────────────────────────────────────

#[tokio::test]
async fn list_follows_cursors_until_exhausted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v0/users"))
        .and(RawQuery("limit=2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 2,
            "results": [item("a"), item("b")],
            "next": "/v0/users?limit=2&afterKey=b"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v0/users"))
        .and(RawQuery("limit=2&afterKey=b"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 1,
            "results": [item("c")],
            "prev": "/v0/users?limit=2&beforeKey=c"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let users = Collection::new("users").with_executor(executor(&server));
    let mut list = users.list(2, None).await.unwrap();
    assert!(list.is_success());
    assert_eq!(keys(&list), vec!["a", "b"]);
    assert_eq!(list.next_cursor(), Some("/v0/users?limit=2&afterKey=b"));

    assert!(list.next().await.unwrap());
    assert_eq!(keys(&list), vec!["c"]);
    assert!(list.has_prev());

    // No cursor left: no request, no change.
    assert!(!list.next().await.unwrap());
    assert_eq!(keys(&list), vec!["c"]);
}

#[tokio::test]
async fn cursor_with_encoded_characters_is_sent_verbatim() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v0/users"))
        .and(RawQuery("limit=10&afterKey=a%20b"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 1, "results": [item("c d")]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut list = ResultList::from_payload(&json!({
        "results": [],
        "next": "/v0/users?limit=10&afterKey=a%20b"
    }))
    .unwrap()
    .with_executor(executor(&server));

    assert!(list.next().await.unwrap());
    assert_eq!(keys(&list), vec!["c d"]);
}

#[tokio::test]
async fn prev_follows_cursor_verbatim() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v0/users"))
        .and(RawQuery("limit=2&beforeKey=c%3Ad"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 2,
            "results": [item("a"), item("b")],
            "next": "/v0/users?limit=2&afterKey=b"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut list = ResultList::from_payload(&json!({
        "results": [item("c:d")],
        "prev": "/v0/users?limit=2&beforeKey=c%3Ad"
    }))
    .unwrap()
    .with_executor(executor(&server));

    assert!(list.prev().await.unwrap());
    assert_eq!(keys(&list), vec!["a", "b"]);
    assert!(!list.has_prev());
    assert_eq!(list.next_cursor(), Some("/v0/users?limit=2&afterKey=b"));
}

#[tokio::test]
async fn prev_without_cursor_sends_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let mut list = ResultList::from_payload(&json!({"results": [item("a")]}))
        .unwrap()
        .with_executor(executor(&server));

    assert!(!list.prev().await.unwrap());
    assert_eq!(keys(&list), vec!["a"]);
    assert!(list.last_response().is_none());
}

#[tokio::test]
async fn failed_page_keeps_previous_results() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v0/users"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({
            "message": "internal error", "code": "api_error"
        })))
        .mount(&server)
        .await;

    let mut list = ResultList::from_payload(&json!({
        "results": [item("a")],
        "total_count": 7,
        "next": "/v0/users?afterKey=a"
    }))
    .unwrap()
    .with_executor(executor(&server));

    assert!(!list.next().await.unwrap());
    assert_eq!(keys(&list), vec!["a"]);
    assert_eq!(list.total_count(), Some(7));
    assert_eq!(list.next_cursor(), Some("/v0/users?afterKey=a"));
    assert_eq!(list.last_response().unwrap().status(), 500);
}

#[tokio::test]
async fn list_limit_capped_and_range_passed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v0/users"))
        .and(query_param("limit", "100"))
        .and(query_param("startKey", "m"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"count": 0, "results": []})))
        .expect(1)
        .mount(&server)
        .await;

    let users = Collection::new("users").with_executor(executor(&server));
    let range = KeyRange::new().start("m");
    let list = users.list(1000, Some(&range)).await.unwrap();
    assert!(list.is_success());
    assert!(list.is_empty());
}

// ── Materialization ─────────────────────────────────────────────

#[tokio::test]
async fn unknown_kinds_are_skipped_and_counted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v0/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 4,
            "total_count": 4,
            "results": [
                item("a"),
                {"path": {"collection": "users", "kind": "mystery", "key": "x"}, "value": {}},
                {"path": {"collection": "users", "key": "no-kind"}, "value": {}},
                {"path": {"collection": "users", "kind": "event", "key": "a",
                          "type": "login", "timestamp": 1000, "ordinal": 1}, "value": {}}
            ]
        })))
        .mount(&server)
        .await;

    let users = Collection::new("users").with_executor(executor(&server));
    let list = users.list(10, None).await.unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list.skipped(), 2);
    assert_eq!(list[0].kind(), ItemKind::Item);
    assert_eq!(list[1].kind(), ItemKind::Event);
    assert!(list.iter().all(Entity::is_bound));
}

#[tokio::test]
async fn total_count_kept_when_page_omits_it() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v0/users"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "count": 1, "results": [item("b")]
        })))
        .mount(&server)
        .await;

    let mut list = ResultList::from_payload(&json!({
        "results": [item("a")], "total_count": 12, "next": "/v0/users?afterKey=a"
    }))
    .unwrap()
    .with_executor(executor(&server));

    assert!(list.next().await.unwrap());
    assert_eq!(list.total_count(), Some(12));
    assert_eq!(list.next_cursor(), None);
}

// ── Local access ────────────────────────────────────────────────

#[test]
fn merge_appends_without_touching_cursors() {
    let mut first = ResultList::from_payload(&json!({
        "results": [item("a")], "next": "/v0/users?afterKey=a", "total_count": 3
    }))
    .unwrap();
    let second = ResultList::from_payload(&json!({
        "results": [item("b"), item("c")], "prev": "/v0/users?beforeKey=b"
    }))
    .unwrap();

    first.merge_results_from(&second);
    assert_eq!(keys(&first), vec!["a", "b", "c"]);
    assert_eq!(first.next_cursor(), Some("/v0/users?afterKey=a"));
    assert_eq!(first.prev_cursor(), None);
    assert_eq!(first.total_count(), Some(3));
}

#[test]
fn index_and_iteration_follow_server_order() {
    let mut list = ResultList::from_payload(&json!({
        "results": [item("a"), item("b"), item("a")]
    }))
    .unwrap();

    assert_eq!(list.len(), 3);
    assert_eq!(list[2].ref_(), Some("ref-a"));
    assert!(list.get(3).is_none());

    let removed = list.remove(0).unwrap();
    assert_eq!(removed.key(), Some("a"));
    assert_eq!(keys(&list), vec!["b", "a"]);

    let values: Vec<_> = list.values().into_iter().map(|v| v["name"].clone()).collect();
    assert_eq!(values, vec![json!("b"), json!("a")]);

    let owned: Vec<Entity> = list.into_iter().collect();
    assert_eq!(owned.len(), 2);
}

#[test]
fn reset_clears_page() {
    let mut list = ResultList::from_payload(&json!({
        "results": [item("a")], "next": "/x", "aggregates": [{"field_name": "value.age"}]
    }))
    .unwrap();
    list.reset().unwrap();
    assert!(list.is_empty());
    assert!(!list.has_next());
    assert!(list.aggregates().is_empty());
}

// ── Payload round trip ──────────────────────────────────────────

#[test]
fn payload_shape() {
    let list = ResultList::from_payload(&json!({
        "results": [item("a")], "total_count": 5, "next": "/v0/users?afterKey=a"
    }))
    .unwrap();

    let payload = list.to_payload().unwrap();
    assert_eq!(payload["kind"], json!("list"));
    assert_eq!(payload["count"], json!(1));
    assert_eq!(payload["total_count"], json!(5));
    assert_eq!(payload["next"], json!("/v0/users?afterKey=a"));
    assert_eq!(payload["results"][0]["path"]["kind"], json!("item"));
    assert!(payload.get("prev").is_none());
}

#[test]
fn json_string_round_trip() {
    let list = ResultList::from_payload(&json!({
        "results": [item("a"), item("b")], "total_count": 2
    }))
    .unwrap();
    let json = list.to_json_string().unwrap();
    let restored = ResultList::from_json_str(&json).unwrap();
    assert_eq!(restored.to_payload().unwrap(), list.to_payload().unwrap());
}

// ── Extraction ──────────────────────────────────────────────────

#[test]
fn extract_queries_the_payload() {
    let list = ResultList::from_payload(&json!({
        "results": [item("a"), item("b")], "total_count": 9
    }))
    .unwrap();

    assert_eq!(list.extract("total_count").unwrap(), json!(9));
    assert_eq!(list.extract("results[].path.key").unwrap(), json!(["a", "b"]));
    assert_eq!(list.extract("missing").unwrap(), Value::Null);
}

#[test]
fn extract_values_queries_entity_values() {
    let list = ResultList::from_payload(&json!({
        "results": [item("a"), item("b")]
    }))
    .unwrap();

    assert_eq!(list.extract_values("[].name").unwrap(), json!(["a", "b"]));
    assert_eq!(list.extract_values("[?name == 'b'] | [0].name").unwrap(), json!("b"));
}

#[test]
fn extract_rejects_bad_expression() {
    let list = ResultList::from_payload(&json!({"results": []})).unwrap();
    assert!(matches!(list.extract("results[?"), Err(ClientError::Query(_))));
}

fn raw_entity() -> impl Strategy<Value = Value> {
    let key = "[a-z0-9]{1,8}";
    let reference = "[a-f0-9]{16}";
    prop_oneof![
        (key, reference, any::<i32>()).prop_map(|(k, r, n)| json!({
            "path": {"collection": "users", "kind": "item", "key": k, "ref": r},
            "value": {"n": n}
        })),
        (key, reference, 0i64..2_000_000_000_000, 1i64..100).prop_map(|(k, r, ts, ord)| json!({
            "path": {"collection": "users", "kind": "event", "key": k, "ref": r,
                     "type": "login", "timestamp": ts, "ordinal": ord},
            "value": {}
        })),
        (key, key).prop_map(|(from, to)| json!({
            "path": {"kind": "relationship", "relation": "follows",
                     "source": {"collection": "users", "key": from},
                     "destination": {"collection": "users", "key": to}},
            "value": {}
        })),
    ]
}

proptest! {
    #[test]
    fn payload_round_trips(
        results in prop::collection::vec(raw_entity(), 0..6),
        total in prop::option::of(0u64..10_000),
        next in prop::option::of("/v0/users\\?afterKey=[a-z]{1,6}"),
    ) {
        let count = results.len() as u64;
        let mut body = json!({"results": results});
        if let Some(total) = total {
            body["total_count"] = json!(total);
        }
        if let Some(next) = next {
            body["next"] = json!(next);
        }

        let payload = ResultList::from_payload(&body).unwrap().to_payload().unwrap();
        let again = ResultList::from_payload(&payload).unwrap().to_payload().unwrap();
        prop_assert_eq!(&again, &payload);
        prop_assert_eq!(payload["count"].as_u64(), Some(count));
    }
}
