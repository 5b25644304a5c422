use orchestrate_types::{EventLocation, KeyLocation, ref_from_etag};
use proptest::prelude::*;

// ── KeyLocation ─────────────────────────────────────────────────

#[test]
fn key_location_from_relative_path() {
    let loc = KeyLocation::parse("/v0/mycoll/mykey/refs/abc123").unwrap();
    assert_eq!(loc.collection, "mycoll");
    assert_eq!(loc.key, "mykey");
    assert_eq!(loc.ref_, "abc123");
}

#[test]
fn key_location_from_absolute_url() {
    let loc = KeyLocation::parse("https://api.orchestrate.io/v0/users/k1/refs/r1").unwrap();
    assert_eq!(loc.collection, "users");
    assert_eq!(loc.key, "k1");
    assert_eq!(loc.ref_, "r1");
}

#[test]
fn key_location_without_leading_slash() {
    let loc = KeyLocation::parse("v0/users/k1/refs/r1/").unwrap();
    assert_eq!(loc.key, "k1");
    assert_eq!(loc.ref_, "r1");
}

#[test]
fn key_location_decodes_segments() {
    let loc = KeyLocation::parse("/v0/users/john%40example.com/refs/r1").unwrap();
    assert_eq!(loc.key, "john@example.com");
}

#[test]
fn key_location_rejects_short_paths() {
    assert!(KeyLocation::parse("/v0/users/k1").is_err());
    assert!(KeyLocation::parse("").is_err());
    assert!(KeyLocation::parse("/refs/r1").is_err());
}

// ── EventLocation ───────────────────────────────────────────────

#[test]
fn event_location_parses_all_parts() {
    let loc = EventLocation::parse("/v0/users/alice/events/login/1395860452000/2").unwrap();
    assert_eq!(loc.collection, "users");
    assert_eq!(loc.key, "alice");
    assert_eq!(loc.event_type, "login");
    assert_eq!(loc.timestamp, 1_395_860_452_000);
    assert_eq!(loc.ordinal, 2);
}

#[test]
fn event_location_rejects_non_numeric_timestamp() {
    assert!(EventLocation::parse("/v0/users/alice/events/login/yesterday/2").is_err());
}

#[test]
fn event_location_rejects_key_location() {
    assert!(EventLocation::parse("/v0/users/k1/refs/r1").is_err());
}

// ── ETag ────────────────────────────────────────────────────────

#[test]
fn etag_quotes_are_stripped() {
    assert_eq!(ref_from_etag("\"82eafab14dc84ed3\""), Some("82eafab14dc84ed3".into()));
}

#[test]
fn etag_weak_and_gzip_forms() {
    assert_eq!(ref_from_etag("W/\"abc\""), Some("abc".into()));
    assert_eq!(ref_from_etag("\"abc-gzip\""), Some("abc".into()));
}

#[test]
fn etag_empty_is_none() {
    assert_eq!(ref_from_etag("\"\""), None);
    assert_eq!(ref_from_etag("  "), None);
}

proptest! {
    #[test]
    fn key_location_recovers_segments(
        collection in "[a-z][a-z0-9_]{0,15}",
        key in "[a-zA-Z0-9_]{1,20}",
        ref_ in "[a-f0-9]{16}",
    ) {
        let header = format!("/v0/{collection}/{key}/refs/{ref_}");
        let loc = KeyLocation::parse(&header).unwrap();
        prop_assert_eq!(loc.collection, collection);
        prop_assert_eq!(loc.key, key);
        prop_assert_eq!(loc.ref_, ref_);
    }
}
