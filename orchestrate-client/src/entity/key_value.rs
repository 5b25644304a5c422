//! Key-value items and the conditional mutation protocol.

use super::{
    HasCollection, HasKey, HasRef, HasValue, ToPayload, body_object, ensure_settled, merge_objects,
    require, tagged_payload,
};
use crate::collection::relations_query;
use crate::error::{ClientError, ClientResult};
use crate::executor::{ApiRequest, Binding, SharedExecutor, api_path};
use crate::list::ResultList;
use crate::pending::{self, Pending};
use crate::response::HttpResponse;
use orchestrate_types::{Conditional, ItemKind, ItemPath, KeyLocation, PatchBuilder, RawItem};
use serde_json::{Map, Value};
use tracing::{info, warn};

/// Where a key-value item stands relative to the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityState {
    /// No key yet; only `post` can give it one.
    Unbound,
    /// Key known, no server version observed.
    BoundUnsynced,
    /// `ref` reflects the last version observed on the server.
    BoundSynced,
    /// Hard-deleted; no version of the key can be resolved any more.
    Purged,
}

/// How a response is folded back into the item.
#[derive(Debug, Clone)]
enum Op {
    Fetch,
    Put { value: Option<Map<String, Value>> },
    Post { value: Option<Map<String, Value>> },
    Patch { reload: bool },
    Delete,
    Purge,
    Relation,
}

/// A key-value item.
#[derive(Debug, Clone)]
pub struct KeyValue {
    collection: String,
    key: Option<String>,
    ref_: Option<String>,
    value: Map<String, Value>,
    reftime: Option<i64>,
    tombstone: bool,
    score: Option<f64>,
    purged: bool,
    binding: Binding,
    last_response: Option<HttpResponse>,
    pending: Pending<Op>,
}

impl KeyValue {
    /// Creates an item without a key; `post` assigns one.
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            key: None,
            ref_: None,
            value: Map::new(),
            reftime: None,
            tombstone: false,
            score: None,
            purged: false,
            binding: Binding::default(),
            last_response: None,
            pending: Pending::default(),
        }
    }

    /// Creates an item addressing `collection/key`.
    pub fn with_key(collection: impl Into<String>, key: impl Into<String>) -> Self {
        let mut item = Self::new(collection);
        item.key = Some(key.into());
        item
    }

    /// Builds an item from a raw tagged result.
    pub fn from_raw(raw: &RawItem) -> Self {
        let mut item = Self::new(raw.path.collection.clone().unwrap_or_default());
        item.hydrate(raw);
        item
    }

    #[must_use]
    pub fn with_value(mut self, value: Map<String, Value>) -> Self {
        self.value = value;
        self
    }

    #[must_use]
    pub fn with_ref(mut self, ref_: impl Into<String>) -> Self {
        self.ref_ = Some(ref_.into());
        self
    }

    #[must_use]
    pub fn with_executor(mut self, executor: SharedExecutor) -> Self {
        self.binding.set(executor);
        self
    }

    pub fn bind(&mut self, executor: SharedExecutor) {
        self.binding.set(executor);
    }

    pub fn is_bound(&self) -> bool {
        self.binding.is_bound()
    }

    /// Changing the collection invalidates the known ref.
    pub fn set_collection(&mut self, collection: impl Into<String>) {
        let collection = collection.into();
        if collection != self.collection {
            self.ref_ = None;
            self.collection = collection;
        }
    }

    /// Changing the key invalidates the known ref.
    pub fn set_key(&mut self, key: impl Into<String>) {
        let key = key.into();
        if self.key.as_deref() != Some(key.as_str()) {
            self.ref_ = None;
            self.purged = false;
            self.key = Some(key);
        }
    }

    pub fn set_ref(&mut self, ref_: Option<String>) {
        self.ref_ = ref_;
    }

    /// Replaces the local value. No request is issued.
    pub fn set_value(&mut self, value: Map<String, Value>) {
        self.value = value;
    }

    pub fn value_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.value
    }

    /// Deep-merges `other` into the local value. No request is issued.
    pub fn merge_value(&mut self, other: &Map<String, Value>) {
        merge_objects(&mut self.value, other);
    }

    /// Reads one top-level field of the value.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.value.get(field)
    }

    /// Sets one top-level field of the value locally.
    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.value.insert(field.into(), value.into());
    }

    pub fn reftime(&self) -> Option<i64> {
        self.reftime
    }

    /// True for a ref-history entry recording a delete.
    pub fn is_tombstone(&self) -> bool {
        self.tombstone
    }

    /// Relevance score, for search results.
    pub fn score(&self) -> Option<f64> {
        self.score
    }

    pub fn state(&self) -> EntityState {
        if self.key.is_none() {
            EntityState::Unbound
        } else if self.purged {
            EntityState::Purged
        } else if self.ref_.is_some() {
            EntityState::BoundSynced
        } else {
            EntityState::BoundUnsynced
        }
    }

    /// The response to the last settled request.
    pub fn last_response(&self) -> Option<&HttpResponse> {
        self.last_response.as_ref()
    }

    /// True if the last settled request succeeded.
    pub fn is_success(&self) -> bool {
        self.last_response.as_ref().is_some_and(HttpResponse::is_success)
    }

    /// True while a deferred request is outstanding.
    pub fn is_pending(&self) -> bool {
        self.pending.is_pending()
    }

    /// Clears identity, value and response; keeps the collection and binding.
    pub fn reset(&mut self) -> ClientResult<()> {
        self.ensure_settled()?;
        self.key = None;
        self.ref_ = None;
        self.value.clear();
        self.reftime = None;
        self.tombstone = false;
        self.score = None;
        self.purged = false;
        self.last_response = None;
        Ok(())
    }

    /// Replaces this item's state with a payload produced by `to_payload`.
    pub fn init(&mut self, payload: &Value) -> ClientResult<()> {
        self.ensure_settled()?;
        let raw = RawItem::from_value(payload.clone())?;
        if let Some(collection) = raw.path.collection.clone() {
            self.collection = collection;
        }
        self.hydrate(&raw);
        Ok(())
    }

    fn hydrate(&mut self, raw: &RawItem) {
        self.key = raw.path.key.clone();
        self.ref_ = raw.path.ref_.clone();
        self.value = raw.value.clone();
        self.reftime = raw.path.reftime.or(raw.reftime);
        self.tombstone = raw.path.tombstone.unwrap_or(false);
        self.score = raw.score;
        self.purged = false;
    }

    fn ensure_settled(&self) -> ClientResult<()> {
        ensure_settled(self.pending.is_pending())
    }

    // ── Requests ────────────────────────────────────────────────

    fn item_path(&self) -> ClientResult<String> {
        let collection = require(Some(self.collection.as_str()), "collection")?;
        let key = require(self.key.as_deref(), "key")?;
        Ok(api_path(&[collection, key]))
    }

    fn condition_header(&self, cond: &Conditional) -> ClientResult<Option<(&'static str, String)>> {
        Ok(cond.header(self.ref_.as_deref())?)
    }

    fn fetch_request(&self, ref_: Option<&str>) -> ClientResult<(ApiRequest, Op)> {
        let mut path = self.item_path()?;
        if let Some(r) = ref_.map(|r| r.trim_matches('"')).filter(|r| !r.is_empty()) {
            path = format!("{path}/refs/{}", urlencoding::encode(r));
        }
        Ok((ApiRequest::get(path), Op::Fetch))
    }

    fn put_request(
        &self,
        value: Option<Map<String, Value>>,
        cond: &Conditional,
    ) -> ClientResult<(ApiRequest, Op)> {
        let path = self.item_path()?;
        let body = value.clone().unwrap_or_else(|| self.value.clone());
        let request = ApiRequest::put(path)
            .maybe_header(self.condition_header(cond)?)
            .json(Value::Object(body));
        Ok((request, Op::Put { value }))
    }

    fn post_request(&self, value: Option<Map<String, Value>>) -> ClientResult<(ApiRequest, Op)> {
        let collection = require(Some(self.collection.as_str()), "collection")?;
        let body = value.clone().unwrap_or_else(|| self.value.clone());
        let request = ApiRequest::post(api_path(&[collection])).json(Value::Object(body));
        Ok((request, Op::Post { value }))
    }

    fn patch_request(
        &self,
        body: Value,
        cond: &Conditional,
        reload: bool,
    ) -> ClientResult<(ApiRequest, Op)> {
        reject_none_match(cond, "patch")?;
        let request = ApiRequest::patch(self.item_path()?)
            .maybe_header(self.condition_header(cond)?)
            .json(body);
        Ok((request, Op::Patch { reload }))
    }

    fn delete_request(&self, cond: &Conditional) -> ClientResult<(ApiRequest, Op)> {
        reject_none_match(cond, "delete")?;
        let request = ApiRequest::delete(self.item_path()?).maybe_header(self.condition_header(cond)?);
        Ok((request, Op::Delete))
    }

    fn purge_request(&self) -> ClientResult<(ApiRequest, Op)> {
        let request = ApiRequest::delete(self.item_path()?).query("purge", "true");
        Ok((request, Op::Purge))
    }

    fn relation_path(&self, kind: &str, to_collection: &str, to_key: &str) -> ClientResult<String> {
        let kind = require(Some(kind), "relation kind")?;
        let to_collection = require(Some(to_collection), "destination collection")?;
        let to_key = require(Some(to_key), "destination key")?;
        Ok(format!(
            "{}/relation/{}",
            self.item_path()?,
            api_path(&[kind, to_collection, to_key])
        ))
    }

    // ── Response handling ───────────────────────────────────────

    /// Folds a response into the item. Returns the request outcome.
    fn apply(&mut self, op: Op, response: HttpResponse) -> bool {
        let ok = response.is_success();
        match op {
            Op::Fetch => {
                self.value.clear();
                self.ref_ = None;
                if ok {
                    self.value = body_object(response.body());
                    self.ref_ = response.etag_ref();
                    self.purged = false;
                }
            }
            Op::Put { value } => {
                if ok {
                    self.ref_ = response.etag_ref();
                    self.purged = false;
                    if let Some(value) = value {
                        self.value = value;
                    }
                }
            }
            Op::Post { value } => {
                if ok {
                    self.apply_location(&response);
                    if let Some(value) = value {
                        self.value = value;
                    }
                }
            }
            Op::Patch { .. } => {
                if ok {
                    self.ref_ = response.etag_ref();
                }
            }
            Op::Purge => {
                if ok {
                    info!("Purged {}/{}", self.collection, self.key.as_deref().unwrap_or_default());
                    self.ref_ = None;
                    self.purged = true;
                }
            }
            Op::Delete | Op::Relation => {}
        }
        self.last_response = Some(response);
        ok
    }

    /// Takes key and ref from the post's `Location`. Without a readable
    /// location the key is left as it was and the ref comes from the `ETag`.
    fn apply_location(&mut self, response: &HttpResponse) {
        self.purged = false;
        match response.location().map(KeyLocation::parse) {
            Some(Ok(location)) => {
                self.key = Some(location.key);
                self.ref_ = Some(location.ref_);
                return;
            }
            Some(Err(e)) => warn!("Unparseable location after post: {}", e),
            None => warn!("Post succeeded without a Location header"),
        }
        self.ref_ = response.etag_ref();
    }

    /// Sends a request and applies its response, following a patch with a
    /// reload when requested.
    async fn run(&mut self, request: ApiRequest, op: Op) -> ClientResult<bool> {
        let executor = self.binding.require()?;
        let response = executor.execute(request).await;
        self.finish(op, response).await
    }

    async fn finish(&mut self, op: Op, response: HttpResponse) -> ClientResult<bool> {
        let reload = matches!(op, Op::Patch { reload: true });
        let ok = self.apply(op, response);
        if !(ok && reload) {
            return Ok(ok);
        }

        // Patch responses carry no body; pull the value at the new ref.
        let ref_ = self.ref_.clone();
        let (request, op) = self.fetch_request(ref_.as_deref())?;
        let executor = self.binding.require()?;
        let response = executor.execute(request).await;
        Ok(self.apply(op, response))
    }

    fn defer(&mut self, request: ApiRequest, op: Op) -> ClientResult<()> {
        let executor = self.binding.require()?;
        self.pending.start(op, executor, request)
    }

    // ── Synchronous operations ──────────────────────────────────

    /// Applies an outstanding deferred request, if any.
    ///
    /// Returns the outcome of that request, or `None` when nothing was pending.
    pub async fn settle(&mut self) -> ClientResult<Option<bool>> {
        match self.pending.take().await? {
            Some((op, response)) => self.finish(op, response).await.map(Some),
            None => Ok(None),
        }
    }

    /// [`settle`](Self::settle) for synchronous callers.
    pub fn settle_blocking(&mut self) -> ClientResult<Option<bool>> {
        match self.pending.runtime() {
            Some(runtime) => pending::block_on(runtime, self.settle())?,
            None => Ok(None),
        }
    }

    /// Settles, then snapshots the item.
    pub async fn payload(&mut self) -> ClientResult<Value> {
        self.settle().await?;
        self.to_payload()
    }

    /// Fetches the current value, or the value at `ref_`.
    ///
    /// On failure the local value and ref are cleared.
    pub async fn fetch(&mut self, ref_: Option<&str>) -> ClientResult<bool> {
        self.settle().await?;
        let (request, op) = self.fetch_request(ref_)?;
        self.run(request, op).await
    }

    /// Replaces the stored value.
    ///
    /// With `value = None` the local value is sent and left untouched. On
    /// success the ref follows the server; on failure nothing changes.
    pub async fn put(
        &mut self,
        value: Option<Map<String, Value>>,
        cond: Conditional,
    ) -> ClientResult<bool> {
        self.settle().await?;
        let (request, op) = self.put_request(value, &cond)?;
        self.run(request, op).await
    }

    /// Creates a new item under a server-assigned key.
    ///
    /// The key and ref are read from the response's `Location`. If the server
    /// sends none that can be read, the previous key is kept.
    pub async fn post(&mut self, value: Option<Map<String, Value>>) -> ClientResult<bool> {
        self.settle().await?;
        let (request, op) = self.post_request(value)?;
        self.run(request, op).await
    }

    /// Applies patch operations. With `reload`, refetches the value afterwards
    /// and returns the outcome of that fetch.
    pub async fn patch(
        &mut self,
        operations: &PatchBuilder,
        cond: Conditional,
        reload: bool,
    ) -> ClientResult<bool> {
        self.settle().await?;
        let (request, op) = self.patch_request(operations.to_json(), &cond, reload)?;
        self.run(request, op).await
    }

    /// Deep-merges `value` into the stored value.
    pub async fn patch_merge(
        &mut self,
        value: Map<String, Value>,
        cond: Conditional,
        reload: bool,
    ) -> ClientResult<bool> {
        self.settle().await?;
        let (request, op) = self.patch_request(Value::Object(value), &cond, reload)?;
        self.run(request, op).await
    }

    /// Soft delete. The ref is kept: history stays reachable by ref.
    pub async fn delete(&mut self, cond: Conditional) -> ClientResult<bool> {
        self.settle().await?;
        let (request, op) = self.delete_request(&cond)?;
        self.run(request, op).await
    }

    /// Hard delete. On success the ref is cleared for good.
    pub async fn purge(&mut self) -> ClientResult<bool> {
        self.settle().await?;
        let (request, op) = self.purge_request()?;
        self.run(request, op).await
    }

    /// Adds a one-way edge from this item.
    pub async fn put_relation(
        &mut self,
        kind: &str,
        to_collection: &str,
        to_key: &str,
    ) -> ClientResult<bool> {
        self.settle().await?;
        let request = ApiRequest::put(self.relation_path(kind, to_collection, to_key)?);
        self.run(request, Op::Relation).await
    }

    /// Removes a one-way edge from this item.
    pub async fn delete_relation(
        &mut self,
        kind: &str,
        to_collection: &str,
        to_key: &str,
    ) -> ClientResult<bool> {
        self.settle().await?;
        let request = ApiRequest::delete(self.relation_path(kind, to_collection, to_key)?)
            .query("purge", "true");
        self.run(request, Op::Relation).await
    }

    /// Walks the graph from this item along `kinds` (one hop per kind).
    pub async fn relations(
        &self,
        kinds: &[&str],
        limit: u32,
        offset: u32,
    ) -> ClientResult<ResultList> {
        let key = require(self.key.as_deref(), "key")?;
        let (path, query) = relations_query(&self.collection, key, kinds, limit, offset)?;
        let mut list = ResultList::new(self.collection.clone());
        if let Some(executor) = self.binding.get() {
            list.bind(executor.clone());
        }
        list.fetch_page(&path, query).await?;
        Ok(list)
    }

    // ── Deferred operations ─────────────────────────────────────

    pub async fn fetch_deferred(&mut self, ref_: Option<&str>) -> ClientResult<()> {
        self.settle().await?;
        let (request, op) = self.fetch_request(ref_)?;
        self.defer(request, op)
    }

    pub async fn put_deferred(
        &mut self,
        value: Option<Map<String, Value>>,
        cond: Conditional,
    ) -> ClientResult<()> {
        self.settle().await?;
        let (request, op) = self.put_request(value, &cond)?;
        self.defer(request, op)
    }

    pub async fn post_deferred(&mut self, value: Option<Map<String, Value>>) -> ClientResult<()> {
        self.settle().await?;
        let (request, op) = self.post_request(value)?;
        self.defer(request, op)
    }

    pub async fn patch_deferred(
        &mut self,
        operations: &PatchBuilder,
        cond: Conditional,
        reload: bool,
    ) -> ClientResult<()> {
        self.settle().await?;
        let (request, op) = self.patch_request(operations.to_json(), &cond, reload)?;
        self.defer(request, op)
    }

    pub async fn patch_merge_deferred(
        &mut self,
        value: Map<String, Value>,
        cond: Conditional,
        reload: bool,
    ) -> ClientResult<()> {
        self.settle().await?;
        let (request, op) = self.patch_request(Value::Object(value), &cond, reload)?;
        self.defer(request, op)
    }

    pub async fn delete_deferred(&mut self, cond: Conditional) -> ClientResult<()> {
        self.settle().await?;
        let (request, op) = self.delete_request(&cond)?;
        self.defer(request, op)
    }

    pub async fn purge_deferred(&mut self) -> ClientResult<()> {
        self.settle().await?;
        let (request, op) = self.purge_request()?;
        self.defer(request, op)
    }
}

fn reject_none_match(cond: &Conditional, operation: &str) -> ClientResult<()> {
    if matches!(cond, Conditional::NoneMatch) {
        return Err(ClientError::InvalidConditional(format!(
            "{operation} cannot be create-only"
        )));
    }
    Ok(())
}

impl HasCollection for KeyValue {
    fn collection(&self) -> &str {
        &self.collection
    }
}

impl HasKey for KeyValue {
    fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }
}

impl HasRef for KeyValue {
    fn ref_(&self) -> Option<&str> {
        self.ref_.as_deref()
    }
}

impl HasValue for KeyValue {
    fn value(&self) -> &Map<String, Value> {
        &self.value
    }
}

impl ToPayload for KeyValue {
    fn to_payload(&self) -> ClientResult<Value> {
        self.ensure_settled()?;
        let path = ItemPath {
            collection: Some(self.collection.clone()),
            key: self.key.clone(),
            ref_: self.ref_.clone(),
            reftime: self.reftime,
            tombstone: self.tombstone.then_some(true),
            ..Default::default()
        };
        Ok(tagged_payload(ItemKind::Item, path, &self.value, self.score))
    }
}
