//! Application-level entry point.

use crate::collection::Collection;
use crate::config::ClientConfig;
use crate::entity::KeyValue;
use crate::error::ClientResult;
use crate::executor::{ApiRequest, HttpExecutor, SharedExecutor};
use crate::factory::ItemFactory;
use crate::list::ResultList;
use orchestrate_types::{Conditional, SearchOptions};
use serde_json::{Map, Value};
use std::fmt;
use tracing::{debug, warn};

/// Holds the shared executor and hands out bound collections and items.
///
/// One-shot helpers return the entity they operated on; its
/// `last_response` tells whether the request succeeded.
#[derive(Clone)]
pub struct Client {
    executor: SharedExecutor,
    factory: ItemFactory,
}

impl Client {
    /// Creates a client backed by [`HttpExecutor`].
    pub fn new(config: ClientConfig) -> ClientResult<Self> {
        Ok(Self::from_executor(HttpExecutor::new(config)?.shared()))
    }

    /// Creates a client over any executor.
    pub fn from_executor(executor: SharedExecutor) -> Self {
        Self {
            executor,
            factory: ItemFactory::default(),
        }
    }

    /// Uses `factory` for every collection this client hands out.
    #[must_use]
    pub fn with_factory(mut self, factory: ItemFactory) -> Self {
        self.factory = factory;
        self
    }

    pub fn executor(&self) -> &SharedExecutor {
        &self.executor
    }

    /// Checks that the API is reachable and the key is accepted.
    pub async fn ping(&self) -> bool {
        let response = self.executor.execute(ApiRequest::head("")).await;
        if response.status() == 200 {
            debug!("Ping succeeded");
            true
        } else {
            warn!("Ping failed with status {}: {}", response.status(), response.reason());
            false
        }
    }

    pub fn collection(&self, name: impl Into<String>) -> Collection {
        Collection::new(name)
            .with_executor(self.executor.clone())
            .with_factory(self.factory.clone())
    }

    fn item(&self, collection: &str, key: &str) -> KeyValue {
        KeyValue::with_key(collection, key).with_executor(self.executor.clone())
    }

    /// Fetches `collection/key`, optionally at `ref_`.
    pub async fn get(
        &self,
        collection: &str,
        key: &str,
        ref_: Option<&str>,
    ) -> ClientResult<KeyValue> {
        let mut item = self.item(collection, key);
        item.fetch(ref_).await?;
        Ok(item)
    }

    pub async fn put(
        &self,
        collection: &str,
        key: &str,
        value: Map<String, Value>,
        cond: Conditional,
    ) -> ClientResult<KeyValue> {
        let mut item = self.item(collection, key);
        item.put(Some(value), cond).await?;
        Ok(item)
    }

    /// Creates an item under a server-assigned key.
    pub async fn post(&self, collection: &str, value: Map<String, Value>) -> ClientResult<KeyValue> {
        let mut item = KeyValue::new(collection).with_executor(self.executor.clone());
        item.post(Some(value)).await?;
        Ok(item)
    }

    pub async fn delete(
        &self,
        collection: &str,
        key: &str,
        cond: Conditional,
    ) -> ClientResult<KeyValue> {
        let mut item = self.item(collection, key);
        item.delete(cond).await?;
        Ok(item)
    }

    pub async fn purge(&self, collection: &str, key: &str) -> ClientResult<KeyValue> {
        let mut item = self.item(collection, key);
        item.purge().await?;
        Ok(item)
    }

    pub async fn search(
        &self,
        collection: &str,
        query: &str,
        options: &SearchOptions,
    ) -> ClientResult<ResultList> {
        self.collection(collection).search(query, options).await
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("factory", &self.factory)
            .finish_non_exhaustive()
    }
}
