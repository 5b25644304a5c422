//! Range filters for collection and event listings.
//!
//! Both are opaque parameter objects as far as the list machinery is
//! concerned: they only know how to render themselves as query pairs.

/// Key bounds for a collection listing.
///
/// `start`/`end` are inclusive, `after`/`before` exclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyRange {
    start: Option<String>,
    after: Option<String>,
    before: Option<String>,
    end: Option<String>,
}

impl KeyRange {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inclusive lower bound.
    #[must_use]
    pub fn start(mut self, key: impl Into<String>) -> Self {
        self.start = Some(key.into());
        self.after = None;
        self
    }

    /// Exclusive lower bound.
    #[must_use]
    pub fn after(mut self, key: impl Into<String>) -> Self {
        self.after = Some(key.into());
        self.start = None;
        self
    }

    /// Exclusive upper bound.
    #[must_use]
    pub fn before(mut self, key: impl Into<String>) -> Self {
        self.before = Some(key.into());
        self.end = None;
        self
    }

    /// Inclusive upper bound.
    #[must_use]
    pub fn end(mut self, key: impl Into<String>) -> Self {
        self.end = Some(key.into());
        self.before = None;
        self
    }

    /// Renders the range as query parameters.
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        push(&mut query, "startKey", &self.start);
        push(&mut query, "afterKey", &self.after);
        push(&mut query, "beforeKey", &self.before);
        push(&mut query, "endKey", &self.end);
        query
    }
}

/// Time bounds for an event listing.
///
/// Each bound is a millisecond timestamp, optionally narrowed to one ordinal
/// at that timestamp.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventRange {
    start: Option<String>,
    after: Option<String>,
    before: Option<String>,
    end: Option<String>,
}

impl EventRange {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn start(mut self, timestamp: i64, ordinal: Option<i64>) -> Self {
        self.start = Some(position(timestamp, ordinal));
        self.after = None;
        self
    }

    #[must_use]
    pub fn after(mut self, timestamp: i64, ordinal: Option<i64>) -> Self {
        self.after = Some(position(timestamp, ordinal));
        self.start = None;
        self
    }

    #[must_use]
    pub fn before(mut self, timestamp: i64, ordinal: Option<i64>) -> Self {
        self.before = Some(position(timestamp, ordinal));
        self.end = None;
        self
    }

    #[must_use]
    pub fn end(mut self, timestamp: i64, ordinal: Option<i64>) -> Self {
        self.end = Some(position(timestamp, ordinal));
        self.before = None;
        self
    }

    /// Renders the range as query parameters.
    pub fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = Vec::new();
        push(&mut query, "startEvent", &self.start);
        push(&mut query, "afterEvent", &self.after);
        push(&mut query, "beforeEvent", &self.before);
        push(&mut query, "endEvent", &self.end);
        query
    }
}

fn position(timestamp: i64, ordinal: Option<i64>) -> String {
    match ordinal {
        Some(ordinal) => format!("{timestamp}/{ordinal}"),
        None => timestamp.to_string(),
    }
}

fn push(query: &mut Vec<(&'static str, String)>, name: &'static str, value: &Option<String>) {
    if let Some(v) = value {
        query.push((name, v.clone()));
    }
}
