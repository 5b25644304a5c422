//! Paginated result lists.
//!
//! A [`ResultList`] holds one page of materialized entities plus the cursors
//! the server handed out for the neighbouring pages. Following a cursor
//! replaces the page in place. A failed request never touches the page, so
//! the list always shows the last page that loaded successfully.

use crate::entity::{Entity, HasCollection, HasValue, ToPayload};
use crate::error::{ClientError, ClientResult};
use crate::executor::{ApiRequest, Binding, SharedExecutor};
use crate::factory::ItemFactory;
use crate::pending::{self, Pending};
use crate::response::HttpResponse;
use orchestrate_types::ListBody;
use serde_json::{Map, Value};
use std::ops::{Index, IndexMut};
use tracing::{debug, warn};

const LIST_KIND: &str = "list";

#[derive(Debug, Clone, Default)]
pub struct ResultList {
    collection: Option<String>,
    results: Vec<Entity>,
    total_count: Option<u64>,
    next_cursor: Option<String>,
    prev_cursor: Option<String>,
    skipped: usize,
    aggregates: Vec<Value>,
    factory: ItemFactory,
    binding: Binding,
    last_response: Option<HttpResponse>,
    pending: Pending<()>,
}

impl ResultList {
    pub fn new(collection: impl Into<String>) -> Self {
        let collection = collection.into();
        Self {
            collection: Some(collection).filter(|c| !c.is_empty()),
            ..Self::default()
        }
    }

    /// Rebuilds a list from a payload produced by [`ResultList::to_payload`].
    pub fn from_payload(payload: &Value) -> ClientResult<Self> {
        let mut list = Self::default();
        list.init(payload)?;
        Ok(list)
    }

    pub fn from_json_str(json: &str) -> ClientResult<Self> {
        let payload: Value = serde_json::from_str(json)?;
        Self::from_payload(&payload)
    }

    #[must_use]
    pub fn with_factory(mut self, factory: ItemFactory) -> Self {
        self.factory = factory;
        self
    }

    #[must_use]
    pub fn with_executor(mut self, executor: SharedExecutor) -> Self {
        self.bind(executor);
        self
    }

    /// Binds the list and every entity in it.
    pub fn bind(&mut self, executor: SharedExecutor) {
        for entity in &mut self.results {
            entity.bind(executor.clone());
        }
        self.binding.set(executor);
    }

    pub fn is_bound(&self) -> bool {
        self.binding.is_bound()
    }

    pub fn collection(&self) -> Option<&str> {
        self.collection.as_deref()
    }

    pub fn factory(&self) -> &ItemFactory {
        &self.factory
    }

    pub fn total_count(&self) -> Option<u64> {
        self.total_count
    }

    pub fn next_cursor(&self) -> Option<&str> {
        self.next_cursor.as_deref()
    }

    pub fn prev_cursor(&self) -> Option<&str> {
        self.prev_cursor.as_deref()
    }

    pub fn has_next(&self) -> bool {
        self.next_cursor.is_some()
    }

    pub fn has_prev(&self) -> bool {
        self.prev_cursor.is_some()
    }

    /// Raw items the factory declined on the last page.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    /// Search aggregates, as returned by the server.
    pub fn aggregates(&self) -> &[Value] {
        &self.aggregates
    }

    pub fn last_response(&self) -> Option<&HttpResponse> {
        self.last_response.as_ref()
    }

    pub fn is_success(&self) -> bool {
        self.last_response.as_ref().is_some_and(HttpResponse::is_success)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_pending()
    }

    // ── Local access ────────────────────────────────────────────

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Entity> {
        self.results.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Entity> {
        self.results.get_mut(index)
    }

    /// Replaces the entity at `index`, or appends when `index` is past the end.
    pub fn set(&mut self, index: usize, entity: Entity) -> Option<Entity> {
        match self.results.get_mut(index) {
            Some(slot) => Some(std::mem::replace(slot, entity)),
            None => {
                self.results.push(entity);
                None
            }
        }
    }

    pub fn push(&mut self, entity: Entity) {
        self.results.push(entity);
    }

    pub fn remove(&mut self, index: usize) -> Option<Entity> {
        (index < self.results.len()).then(|| self.results.remove(index))
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Entity> {
        self.results.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Entity> {
        self.results.iter_mut()
    }

    pub fn results(&self) -> &[Entity] {
        &self.results
    }

    /// The value of every entity, in order.
    pub fn values(&self) -> Vec<&Map<String, Value>> {
        self.results.iter().map(HasValue::value).collect()
    }

    /// Appends copies of `other`'s entities. Cursors and totals are unchanged.
    pub fn merge_results_from(&mut self, other: &ResultList) {
        self.results.extend(other.results.iter().cloned());
    }

    /// Clears the page, cursors, total and last response.
    pub fn reset(&mut self) -> ClientResult<()> {
        if self.pending.is_pending() {
            return Err(ClientError::Pending);
        }
        self.results.clear();
        self.total_count = None;
        self.next_cursor = None;
        self.prev_cursor = None;
        self.skipped = 0;
        self.aggregates.clear();
        self.last_response = None;
        Ok(())
    }

    // ── Payloads ────────────────────────────────────────────────

    /// Snapshots the page as a tagged payload.
    ///
    /// Refused with [`ClientError::Pending`] while the list or any of its
    /// entities has a deferred request outstanding.
    pub fn to_payload(&self) -> ClientResult<Value> {
        if self.pending.is_pending() {
            return Err(ClientError::Pending);
        }
        let results = self
            .results
            .iter()
            .map(ToPayload::to_payload)
            .collect::<ClientResult<Vec<_>>>()?;

        let mut payload = Map::new();
        payload.insert("kind".to_string(), Value::from(LIST_KIND));
        payload.insert("count".to_string(), Value::from(results.len()));
        payload.insert("results".to_string(), Value::Array(results));
        if let Some(total) = self.total_count {
            payload.insert("total_count".to_string(), Value::from(total));
        }
        if let Some(next) = &self.next_cursor {
            payload.insert("next".to_string(), Value::from(next.as_str()));
        }
        if let Some(prev) = &self.prev_cursor {
            payload.insert("prev".to_string(), Value::from(prev.as_str()));
        }
        if !self.aggregates.is_empty() {
            payload.insert("aggregates".to_string(), Value::Array(self.aggregates.clone()));
        }
        Ok(Value::Object(payload))
    }

    /// Settles the list and every entity on it, then snapshots the page.
    pub async fn payload(&mut self) -> ClientResult<Value> {
        self.settle().await?;
        for entity in &mut self.results {
            entity.settle().await?;
        }
        self.to_payload()
    }

    pub fn to_json_string(&self) -> ClientResult<String> {
        Ok(serde_json::to_string(&self.to_payload()?)?)
    }

    /// Evaluates a JMESPath expression against [`to_payload`](Self::to_payload).
    pub fn extract(&self, expression: &str) -> ClientResult<Value> {
        search(expression, self.to_payload()?)
    }

    /// Evaluates a JMESPath expression against [`values`](Self::values).
    pub fn extract_values(&self, expression: &str) -> ClientResult<Value> {
        let values = self
            .values()
            .into_iter()
            .map(|v| Value::Object(v.clone()))
            .collect();
        search(expression, Value::Array(values))
    }

    /// Replaces the page with a list payload or a raw list body.
    pub fn init(&mut self, payload: &Value) -> ClientResult<()> {
        if self.pending.is_pending() {
            return Err(ClientError::Pending);
        }
        if let Some(kind) = payload.get("kind").and_then(Value::as_str) {
            if kind != LIST_KIND {
                return Err(ClientError::InvalidPayload(format!(
                    "expected a list payload, got kind {kind:?}"
                )));
            }
        }
        let body = ListBody::from_value(Some(payload))?;
        self.total_count = body.total_count;
        self.replace_page(body);
        self.last_response = None;
        Ok(())
    }

    fn replace_page(&mut self, body: ListBody) {
        let (results, skipped) = self.factory.materialize(&body.results, self.binding.get());
        if skipped > 0 {
            debug!("Skipped {} of {} result items", skipped, body.results.len());
        }
        self.next_cursor = body.next_cursor().map(str::to_string);
        self.prev_cursor = body.prev_cursor().map(str::to_string);
        if body.total_count.is_some() {
            self.total_count = body.total_count;
        }
        self.aggregates = body.aggregates;
        self.skipped = skipped;
        self.results = results;

        if self.collection.is_none() {
            self.collection = self
                .results
                .first()
                .map(|e| e.collection().to_string())
                .filter(|c| !c.is_empty());
        }
    }

    // ── Requests ────────────────────────────────────────────────

    fn apply(&mut self, response: HttpResponse) -> bool {
        let mut ok = response.is_success();
        if ok {
            match ListBody::from_value(response.body()) {
                Ok(body) => self.replace_page(body),
                Err(e) => {
                    warn!("Unreadable list body: {}", e);
                    ok = false;
                }
            }
        }
        self.last_response = Some(response);
        ok
    }

    fn page_request(path: &str, query: Vec<(&'static str, String)>) -> ApiRequest {
        ApiRequest::get(path).query_pairs(query)
    }

    async fn run(&mut self, request: ApiRequest) -> ClientResult<bool> {
        let executor = self.binding.require()?;
        let response = executor.execute(request).await;
        Ok(self.apply(response))
    }

    fn defer(&mut self, request: ApiRequest) -> ClientResult<()> {
        let executor = self.binding.require()?;
        self.pending.start((), executor, request)
    }

    pub async fn settle(&mut self) -> ClientResult<Option<bool>> {
        Ok(self
            .pending
            .take()
            .await?
            .map(|((), response)| self.apply(response)))
    }

    pub fn settle_blocking(&mut self) -> ClientResult<Option<bool>> {
        match self.pending.runtime() {
            Some(runtime) => pending::block_on(runtime, self.settle())?,
            None => Ok(None),
        }
    }

    /// Loads one page. On failure the current page is kept.
    pub async fn fetch_page(
        &mut self,
        path: &str,
        query: Vec<(&'static str, String)>,
    ) -> ClientResult<bool> {
        self.settle().await?;
        self.run(Self::page_request(path, query)).await
    }

    /// Follows the next-page cursor. Returns `Ok(false)` without a request
    /// when there is no next page.
    pub async fn next(&mut self) -> ClientResult<bool> {
        self.settle().await?;
        match self.next_cursor.clone() {
            Some(cursor) => self.run(ApiRequest::get(cursor)).await,
            None => Ok(false),
        }
    }

    /// Follows the previous-page cursor.
    pub async fn prev(&mut self) -> ClientResult<bool> {
        self.settle().await?;
        match self.prev_cursor.clone() {
            Some(cursor) => self.run(ApiRequest::get(cursor)).await,
            None => Ok(false),
        }
    }

    pub async fn fetch_page_deferred(
        &mut self,
        path: &str,
        query: Vec<(&'static str, String)>,
    ) -> ClientResult<()> {
        self.settle().await?;
        self.defer(Self::page_request(path, query))
    }

    /// Starts following the next-page cursor. Returns `false` when there is
    /// no next page.
    pub async fn next_deferred(&mut self) -> ClientResult<bool> {
        self.settle().await?;
        match self.next_cursor.clone() {
            Some(cursor) => self.defer(ApiRequest::get(cursor)).map(|()| true),
            None => Ok(false),
        }
    }

    pub async fn prev_deferred(&mut self) -> ClientResult<bool> {
        self.settle().await?;
        match self.prev_cursor.clone() {
            Some(cursor) => self.defer(ApiRequest::get(cursor)).map(|()| true),
            None => Ok(false),
        }
    }
}

fn search(expression: &str, data: Value) -> ClientResult<Value> {
    let compiled = jmespath::compile(expression).map_err(|e| ClientError::Query(e.to_string()))?;
    let found = compiled
        .search(data)
        .map_err(|e| ClientError::Query(e.to_string()))?;
    Ok(serde_json::to_value(&*found)?)
}

impl Index<usize> for ResultList {
    type Output = Entity;

    fn index(&self, index: usize) -> &Entity {
        &self.results[index]
    }
}

impl IndexMut<usize> for ResultList {
    fn index_mut(&mut self, index: usize) -> &mut Entity {
        &mut self.results[index]
    }
}

impl IntoIterator for ResultList {
    type Item = Entity;
    type IntoIter = std::vec::IntoIter<Entity>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.into_iter()
    }
}

impl<'a> IntoIterator for &'a ResultList {
    type Item = &'a Entity;
    type IntoIter = std::slice::Iter<'a, Entity>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.iter()
    }
}

impl<'a> IntoIterator for &'a mut ResultList {
    type Item = &'a mut Entity;
    type IntoIter = std::slice::IterMut<'a, Entity>;

    fn into_iter(self) -> Self::IntoIter {
        self.results.iter_mut()
    }
}
