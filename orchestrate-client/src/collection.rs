//! Collection-level operations: listing, search, history and graph queries.

use crate::entity::{Event, KeyValue, Relationship, require};
use crate::error::{ClientError, ClientResult};
use crate::executor::{ApiRequest, Binding, SharedExecutor, api_path};
use crate::factory::ItemFactory;
use crate::list::ResultList;
use crate::response::HttpResponse;
use orchestrate_types::{EdgeEnd, EventRange, ItemKind, KeyRange, SearchOptions};
use tracing::{info, warn};

/// Upper bound the server accepts for a key listing page.
pub const MAX_LIST_LIMIT: u32 = 100;

type Query = Vec<(&'static str, String)>;

/// A named collection bound to an executor.
#[derive(Debug, Clone)]
pub struct Collection {
    name: String,
    binding: Binding,
    factory: ItemFactory,
    last_response: Option<HttpResponse>,
}

impl Collection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            binding: Binding::default(),
            factory: ItemFactory::default(),
            last_response: None,
        }
    }

    #[must_use]
    pub fn with_executor(mut self, executor: SharedExecutor) -> Self {
        self.binding.set(executor);
        self
    }

    /// Uses `factory` for every list this collection produces.
    #[must_use]
    pub fn with_factory(mut self, factory: ItemFactory) -> Self {
        self.factory = factory;
        self
    }

    pub fn bind(&mut self, executor: SharedExecutor) {
        self.binding.set(executor);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Response to the last `delete` or total-count request.
    pub fn last_response(&self) -> Option<&HttpResponse> {
        self.last_response.as_ref()
    }

    // ── Builders ────────────────────────────────────────────────

    /// An item addressing `key` in this collection.
    pub fn item(&self, key: impl Into<String>) -> KeyValue {
        let mut item = KeyValue::with_key(self.name.clone(), key);
        self.bind_to(|e| item.bind(e));
        item
    }

    /// An item without a key, to be created with `post`.
    pub fn new_item(&self) -> KeyValue {
        let mut item = KeyValue::new(self.name.clone());
        self.bind_to(|e| item.bind(e));
        item
    }

    pub fn event(&self, key: impl Into<String>, event_type: impl Into<String>) -> Event {
        let mut event = Event::new(self.name.clone(), key, event_type);
        self.bind_to(|e| event.bind(e));
        event
    }

    pub fn relationship(
        &self,
        key: impl Into<String>,
        relation: impl Into<String>,
        destination: EdgeEnd,
    ) -> Relationship {
        let mut relationship = Relationship::new(self.name.clone(), key, relation, destination);
        self.bind_to(|e| relationship.bind(e));
        relationship
    }

    fn bind_to(&self, bind: impl FnOnce(SharedExecutor)) {
        if let Some(executor) = self.binding.get() {
            bind(executor.clone());
        }
    }

    fn empty_list(&self) -> ResultList {
        let mut list = ResultList::new(self.name.clone()).with_factory(self.factory.clone());
        self.bind_to(|e| list.bind(e));
        list
    }

    fn collection_path(&self) -> ClientResult<String> {
        Ok(api_path(&[require(Some(self.name.as_str()), "collection")?]))
    }

    // ── Queries ─────────────────────────────────────────────────

    async fn load(&self, path: String, query: Query) -> ClientResult<ResultList> {
        let mut list = self.empty_list();
        list.fetch_page(&path, query).await?;
        Ok(list)
    }

    async fn load_deferred(&self, path: String, query: Query) -> ClientResult<ResultList> {
        let mut list = self.empty_list();
        list.fetch_page_deferred(&path, query).await?;
        Ok(list)
    }

    fn list_query(limit: u32, range: Option<&KeyRange>) -> Query {
        let mut query = range.map(KeyRange::to_query).unwrap_or_default();
        query.push(("limit", limit.min(MAX_LIST_LIMIT).to_string()));
        query
    }

    /// Lists items in key order. `limit` is capped at [`MAX_LIST_LIMIT`].
    ///
    /// The returned list carries the outcome in `last_response`.
    pub async fn list(&self, limit: u32, range: Option<&KeyRange>) -> ClientResult<ResultList> {
        self.load(self.collection_path()?, Self::list_query(limit, range))
            .await
    }

    pub async fn list_deferred(
        &self,
        limit: u32,
        range: Option<&KeyRange>,
    ) -> ClientResult<ResultList> {
        self.load_deferred(self.collection_path()?, Self::list_query(limit, range))
            .await
    }

    /// Runs a Lucene query against the collection.
    pub async fn search(&self, query: &str, options: &SearchOptions) -> ClientResult<ResultList> {
        self.load(self.collection_path()?, options.to_query(query))
            .await
    }

    pub async fn search_deferred(
        &self,
        query: &str,
        options: &SearchOptions,
    ) -> ClientResult<ResultList> {
        self.load_deferred(self.collection_path()?, options.to_query(query))
            .await
    }

    /// Lists events of one type on `key`, newest first.
    pub async fn events(
        &self,
        key: &str,
        event_type: &str,
        limit: u32,
        range: Option<&EventRange>,
    ) -> ClientResult<ResultList> {
        let collection = require(Some(self.name.as_str()), "collection")?;
        let key = require(Some(key), "key")?;
        let event_type = require(Some(event_type), "event type")?;
        let mut query = range.map(EventRange::to_query).unwrap_or_default();
        query.push(("limit", limit.to_string()));
        self.load(api_path(&[collection, key, "events", event_type]), query)
            .await
    }

    /// Lists the ref history of `key`. With `values`, each entry carries the
    /// value at that ref.
    pub async fn refs(
        &self,
        key: &str,
        limit: u32,
        offset: u32,
        values: bool,
    ) -> ClientResult<ResultList> {
        let collection = require(Some(self.name.as_str()), "collection")?;
        let key = require(Some(key), "key")?;
        let mut query = paging(limit, offset);
        if values {
            query.push(("values", "true".to_string()));
        }
        self.load(api_path(&[collection, key, "refs"]), query).await
    }

    /// Walks the graph from `key`, one hop per relation kind.
    pub async fn relations(
        &self,
        key: &str,
        kinds: &[&str],
        limit: u32,
        offset: u32,
    ) -> ClientResult<ResultList> {
        let (path, query) = relations_query(&self.name, key, kinds, limit, offset)?;
        self.load(path, query).await
    }

    // ── Collection management ───────────────────────────────────

    /// Deletes the collection and everything in it. Only `204 No Content`
    /// counts as success.
    pub async fn delete(&mut self) -> ClientResult<bool> {
        let request = ApiRequest::delete(self.collection_path()?).query("force", "true");
        let executor = self.binding.require()?;
        let response = executor.execute(request).await;

        let ok = response.status() == 204;
        if ok {
            info!("Deleted collection {}", self.name);
        } else {
            warn!(
                "Delete of collection {} returned status {}",
                self.name,
                response.status()
            );
        }
        self.last_response = Some(response);
        Ok(ok)
    }

    /// Number of key-value items, or `None` if the count request failed.
    pub async fn total_items(&mut self) -> ClientResult<Option<u64>> {
        self.count(&kind_query(ItemKind::Item)).await
    }

    /// Number of events, optionally of one type.
    pub async fn total_events(&mut self, event_type: Option<&str>) -> ClientResult<Option<u64>> {
        let mut query = kind_query(ItemKind::Event);
        if let Some(event_type) = event_type {
            query = format!("{query} AND @path.type:{event_type}");
        }
        self.count(&query).await
    }

    /// Number of relationships, optionally of one relation kind.
    pub async fn total_relationships(
        &mut self,
        relation: Option<&str>,
    ) -> ClientResult<Option<u64>> {
        let mut query = kind_query(ItemKind::Relationship);
        if let Some(relation) = relation {
            query = format!("{query} AND @path.relation:{relation}");
        }
        self.count(&query).await
    }

    async fn count(&mut self, query: &str) -> ClientResult<Option<u64>> {
        let list = self
            .search(query, &SearchOptions::new().limit(0))
            .await?;
        let total = if list.is_success() {
            list.total_count()
        } else {
            None
        };
        self.last_response = list.last_response().cloned();
        Ok(total)
    }
}

fn kind_query(kind: ItemKind) -> String {
    format!("@path.kind:{kind}")
}

fn paging(limit: u32, offset: u32) -> Query {
    let mut query = vec![("limit", limit.to_string())];
    if offset > 0 {
        query.push(("offset", offset.to_string()));
    }
    query
}

/// Path and query for a graph traversal from `collection/key`.
pub(crate) fn relations_query(
    collection: &str,
    key: &str,
    kinds: &[&str],
    limit: u32,
    offset: u32,
) -> ClientResult<(String, Query)> {
    let collection = require(Some(collection), "collection")?;
    let key = require(Some(key), "key")?;
    if kinds.is_empty() || kinds.iter().any(|k| k.is_empty()) {
        return Err(ClientError::MissingProperty("relation kind"));
    }

    let mut segments = vec![collection, key, "relations"];
    segments.extend_from_slice(kinds);
    Ok((api_path(&segments), paging(limit, offset)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_limit_is_capped() {
        let query = Collection::list_query(500, None);
        assert_eq!(query, vec![("limit", "100".to_string())]);
    }

    #[test]
    fn relations_path_joins_kinds() {
        let (path, query) = relations_query("users", "alice", &["friend", "likes"], 10, 0).unwrap();
        assert_eq!(path, "users/alice/relations/friend/likes");
        assert_eq!(query, vec![("limit", "10".to_string())]);
    }

    #[test]
    fn relations_need_a_kind() {
        assert!(relations_query("users", "alice", &[], 10, 0).is_err());
    }
}
