//! Parsing of `Location` and `ETag` response headers.
//!
//! Creation requests do not return a body. The server reports the assigned
//! identity in the `Location` (or `Content-Location`) header instead, e.g.
//! `/v0/users/0eb4f8a6d4407a10/refs/ad39c0f8f807bf40` for a key-value item
//! or `/v0/users/alice/events/login/1395860452000/2` for an event.

use crate::{Error, Result};

/// Identity of a key-value version parsed from a `Location` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyLocation {
    pub collection: String,
    pub key: String,
    pub ref_: String,
}

impl KeyLocation {
    /// Parses `.../{collection}/{key}/refs/{ref}`.
    pub fn parse(location: &str) -> Result<Self> {
        let segments = segments(location)?;
        let n = segments.len();
        // The marker must have two segments before it and exactly one after.
        if n >= 4 && segments[n - 2] == "refs" {
            return Ok(Self {
                collection: segments[n - 4].clone(),
                key: segments[n - 3].clone(),
                ref_: segments[n - 1].clone(),
            });
        }
        Err(Error::InvalidLocation(location.to_string()))
    }
}

/// Identity of an event parsed from a `Location` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventLocation {
    pub collection: String,
    pub key: String,
    pub event_type: String,
    pub timestamp: i64,
    pub ordinal: i64,
}

impl EventLocation {
    /// Parses `.../{collection}/{key}/events/{type}/{timestamp}/{ordinal}`.
    pub fn parse(location: &str) -> Result<Self> {
        let segments = segments(location)?;
        let n = segments.len();
        if n >= 6 && segments[n - 4] == "events" {
            let invalid = || Error::InvalidLocation(location.to_string());
            return Ok(Self {
                collection: segments[n - 6].clone(),
                key: segments[n - 5].clone(),
                event_type: segments[n - 3].clone(),
                timestamp: segments[n - 2].parse().map_err(|_| invalid())?,
                ordinal: segments[n - 1].parse().map_err(|_| invalid())?,
            });
        }
        Err(Error::InvalidLocation(location.to_string()))
    }
}

/// Extracts a ref from an `ETag` header value.
///
/// Accepts weak validators and strips the surrounding quotes. Returns `None`
/// for an empty tag.
pub fn ref_from_etag(etag: &str) -> Option<String> {
    let tag = etag.trim();
    let tag = tag.strip_prefix("W/").unwrap_or(tag);
    let tag = tag.trim_matches('"');
    // Compressed responses append an encoding suffix to the version.
    let tag = tag.strip_suffix("-gzip").unwrap_or(tag);
    if tag.is_empty() {
        None
    } else {
        Some(tag.to_string())
    }
}

fn segments(location: &str) -> Result<Vec<String>> {
    // Drop scheme/host and any query string; only the path matters.
    let path = match location.find("://") {
        Some(idx) => {
            let rest = &location[idx + 3..];
            rest.find('/').map_or("", |slash| &rest[slash..])
        }
        None => location,
    };
    let path = path.split(['?', '#']).next().unwrap_or_default();

    path.trim_matches('/')
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| {
            urlencoding::decode(s)
                .map(|d| d.into_owned())
                .map_err(|_| Error::InvalidLocation(location.to_string()))
        })
        .collect()
}
