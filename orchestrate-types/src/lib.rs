//! Wire-level type definitions for the Orchestrate client.
//!
//! This crate holds everything that describes what travels over HTTP without
//! performing any I/O:
//! - Item kinds and the tagged `path`/`value` item shape
//! - List response bodies (results, cursors, total count)
//! - Conditional-write policies and the headers they render to
//! - `Location` header and `ETag` parsing
//! - Opaque query parameter objects (key/event ranges, search options, patch
//!   operations)
//!
//! The stateful objects that issue requests live in `orchestrate-client`.

mod conditional;
mod item;
mod kind;
mod location;
mod patch;
mod range;
mod search;

pub use conditional::{Conditional, IF_MATCH, IF_NONE_MATCH};
pub use item::{EdgeEnd, ItemPath, ListBody, RawItem};
pub use kind::ItemKind;
pub use location::{EventLocation, KeyLocation, ref_from_etag};
pub use patch::{PatchBuilder, PatchOp};
pub use range::{EventRange, KeyRange};
pub use search::{DEFAULT_SEARCH_LIMIT, SearchOptions};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while interpreting wire data.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid location header: {0}")]
    InvalidLocation(String),

    #[error("conditional write requires a known ref")]
    MissingRef,

    #[error("invalid payload: {0}")]
    InvalidPayload(String),
}
