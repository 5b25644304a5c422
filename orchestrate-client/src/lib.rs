//! Stateful client for the Orchestrate key-value, graph and search API.
//!
//! REST calls are exposed as objects that applications read, mutate and
//! submit back:
//! - [`KeyValue`], [`Event`] and [`Relationship`] own their identity, value
//!   and version ref, and write with optimistic concurrency control
//! - [`ResultList`] holds one page of results and follows the server's
//!   opaque cursors to neighbouring pages
//! - [`ItemFactory`] turns the tagged items of a result page into entities
//!
//! # Architecture
//!
//! ## Components
//!
//! - **Executor**: performs one HTTP call and always yields an
//!   [`HttpResponse`]; transport failures become status `0` or `500`
//! - **Entities**: conditional mutation through [`Conditional`]
//! - **Lists**: pagination and materialization through the factory
//! - **Collection / Client**: entry points that hand out bound objects
//!
//! ## Failure model
//!
//! Operations return `ClientResult<bool>`. `Err` is reserved for local
//! problems caught before anything is sent (missing key, no executor, an
//! invalid conditional). A request the server rejects is `Ok(false)`, with
//! the details in `last_response()`.
//!
//! ## Deferred operations
//!
//! Every operation has a `*_deferred` form that spawns the request and
//! returns at once. The response is applied by `settle()` (or
//! `settle_blocking()`), and any later operation on the same object settles
//! first, so requests on one object always apply in order.
//!
//! # Example
//!
//! ```no_run
//! use orchestrate_client::{Client, ClientConfig, Conditional, HasRef};
//!
//! # async fn run() -> orchestrate_client::ClientResult<()> {
//! let client = Client::new(ClientConfig::new("api-key"))?;
//! let users = client.collection("users");
//!
//! let mut alice = users.item("alice");
//! if alice.fetch(None).await? {
//!     alice.set("visits", 1);
//!     // Fails with 412 if someone else wrote in the meantime.
//!     alice.put(None, Conditional::MatchCurrent).await?;
//!     println!("now at ref {:?}", alice.ref_());
//! }
//!
//! let mut page = users.list(10, None).await?;
//! while page.next().await? {
//!     println!("{} items", page.len());
//! }
//! # Ok(())
//! # }
//! ```

mod client;
mod collection;
mod config;
mod entity;
mod error;
mod executor;
mod factory;
mod list;
mod pending;
mod response;

pub use client::Client;
pub use collection::{Collection, MAX_LIST_LIMIT};
pub use config::ClientConfig;
pub use entity::{
    Entity, EntityState, Event, HasCollection, HasKey, HasRef, HasValue, KeyValue, Relationship,
    ToPayload,
};
pub use error::{ClientError, ClientResult};
pub use executor::{ApiRequest, HttpExecutor, RequestExecutor, SharedExecutor, api_path};
pub use factory::{Constructor, ItemFactory};
pub use list::ResultList;
pub use response::{
    HttpResponse, REQUEST_ID_HEADER, STATUS_TRANSPORT_FAILURE, STATUS_UNEXPECTED_FAILURE,
};

pub use orchestrate_types::{
    Conditional, EdgeEnd, EventRange, ItemKind, ItemPath, KeyRange, PatchBuilder, RawItem,
    SearchOptions,
};
