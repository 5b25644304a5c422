use orchestrate_types::{Conditional, Error, IF_MATCH, IF_NONE_MATCH};

// ── Header rendering ────────────────────────────────────────────

#[test]
fn unconditional_emits_no_header() {
    let header = Conditional::Unconditional.header(Some("r1")).unwrap();
    assert!(header.is_none());
}

#[test]
fn match_current_uses_known_ref() {
    let header = Conditional::MatchCurrent.header(Some("r1")).unwrap();
    assert_eq!(header, Some((IF_MATCH, "\"r1\"".to_string())));
}

#[test]
fn match_current_without_ref_is_an_error() {
    let err = Conditional::MatchCurrent.header(None).unwrap_err();
    assert!(matches!(err, Error::MissingRef));
}

#[test]
fn match_ref_ignores_current_ref() {
    let header = Conditional::MatchRef("r9".into()).header(Some("r1")).unwrap();
    assert_eq!(header, Some((IF_MATCH, "\"r9\"".to_string())));
}

#[test]
fn none_match_is_wildcard() {
    let header = Conditional::NoneMatch.header(None).unwrap();
    assert_eq!(header, Some((IF_NONE_MATCH, "\"*\"".to_string())));
}

// ── Construction ────────────────────────────────────────────────

#[test]
fn match_ref_strips_etag_quotes() {
    assert_eq!(
        Conditional::match_ref("\"abc\""),
        Conditional::MatchRef("abc".to_string())
    );
}

#[test]
fn from_str_builds_match_ref() {
    let cond: Conditional = "abc".into();
    assert_eq!(cond, Conditional::MatchRef("abc".to_string()));
}

#[test]
fn default_is_unconditional() {
    assert!(Conditional::default().is_unconditional());
    assert!(!Conditional::NoneMatch.is_unconditional());
}
