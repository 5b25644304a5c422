//! Directed graph edges between key-value items.

use super::{
    HasCollection, HasKey, HasRef, HasValue, ToPayload, body_object, ensure_settled, merge_objects,
    require, tagged_payload,
};
use crate::error::{ClientError, ClientResult};
use crate::executor::{ApiRequest, Binding, SharedExecutor, api_path};
use crate::pending::{self, Pending};
use crate::response::HttpResponse;
use orchestrate_types::{Conditional, EdgeEnd, ItemKind, ItemPath, RawItem};
use serde_json::{Map, Value};
use tracing::warn;

#[derive(Debug, Clone)]
enum Op {
    Fetch,
    Put { value: Option<Map<String, Value>> },
    Delete,
}

/// An edge `source --relation--> destination`, optionally carrying a value.
///
/// The source is the entity's own collection and key.
#[derive(Debug, Clone)]
pub struct Relationship {
    collection: String,
    key: Option<String>,
    relation: Option<String>,
    destination: Option<EdgeEnd>,
    ref_: Option<String>,
    value: Map<String, Value>,
    binding: Binding,
    last_response: Option<HttpResponse>,
    pending: Pending<Op>,
}

impl Relationship {
    pub fn new(
        collection: impl Into<String>,
        key: impl Into<String>,
        relation: impl Into<String>,
        destination: EdgeEnd,
    ) -> Self {
        Self {
            collection: collection.into(),
            key: Some(key.into()),
            relation: Some(relation.into()),
            destination: Some(destination),
            ref_: None,
            value: Map::new(),
            binding: Binding::default(),
            last_response: None,
            pending: Pending::default(),
        }
    }

    pub fn from_raw(raw: &RawItem) -> Self {
        let path = &raw.path;
        let (collection, key) = match &path.source {
            Some(source) => (source.collection.clone(), Some(source.key.clone())),
            None => (path.collection.clone().unwrap_or_default(), path.key.clone()),
        };
        Self {
            collection,
            key,
            relation: path.relation.clone(),
            destination: path.destination.clone(),
            ref_: path.ref_.clone(),
            value: raw.value.clone(),
            binding: Binding::default(),
            last_response: None,
            pending: Pending::default(),
        }
    }

    #[must_use]
    pub fn with_value(mut self, value: Map<String, Value>) -> Self {
        self.value = value;
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

    pub fn relation(&self) -> Option<&str> {
        self.relation.as_deref()
    }

    pub fn destination(&self) -> Option<&EdgeEnd> {
        self.destination.as_ref()
    }

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

    pub fn last_response(&self) -> Option<&HttpResponse> {
        self.last_response.as_ref()
    }

    pub fn is_success(&self) -> bool {
        self.last_response.as_ref().is_some_and(HttpResponse::is_success)
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_pending()
    }

    pub fn init(&mut self, payload: &Value) -> ClientResult<()> {
        if self.pending.is_pending() {
            return Err(ClientError::Pending);
        }
        let raw = RawItem::from_value(payload.clone())?;
        let binding = self.binding.clone();
        *self = Self::from_raw(&raw);
        self.binding = binding;
        Ok(())
    }

    // ── Requests ────────────────────────────────────────────────

    fn ends(&self) -> ClientResult<(&str, &str, &str, &str, &str)> {
        let collection = require(Some(self.collection.as_str()), "collection")?;
        let key = require(self.key.as_deref(), "key")?;
        let relation = require(self.relation.as_deref(), "relation")?;
        let destination = self
            .destination
            .as_ref()
            .ok_or(ClientError::MissingProperty("destination"))?;
        let to_collection = require(Some(destination.collection.as_str()), "destination collection")?;
        let to_key = require(Some(destination.key.as_str()), "destination key")?;
        Ok((collection, key, relation, to_collection, to_key))
    }

    fn edge_path(&self) -> ClientResult<String> {
        let (c, k, relation, to_c, to_k) = self.ends()?;
        Ok(api_path(&[c, k, "relation", relation, to_c, to_k]))
    }

    fn reverse_path(&self) -> ClientResult<String> {
        let (c, k, relation, to_c, to_k) = self.ends()?;
        Ok(api_path(&[to_c, to_k, "relation", relation, c, k]))
    }

    fn put_request(
        &self,
        path: String,
        value: Option<Map<String, Value>>,
        cond: &Conditional,
    ) -> ClientResult<(ApiRequest, Op)> {
        let body = value.clone().unwrap_or_else(|| self.value.clone());
        let request = ApiRequest::put(path)
            .maybe_header(cond.header(self.ref_.as_deref())?)
            .json(Value::Object(body));
        Ok((request, Op::Put { value }))
    }

    fn delete_request(path: String) -> (ApiRequest, Op) {
        (ApiRequest::delete(path).query("purge", "true"), Op::Delete)
    }

    fn apply(&mut self, op: Op, response: HttpResponse) -> bool {
        let ok = response.is_success();
        match op {
            Op::Fetch => {
                self.value.clear();
                self.ref_ = None;
                if ok {
                    self.value = body_object(response.body());
                    self.ref_ = response.etag_ref();
                }
            }
            Op::Put { value } => {
                if ok {
                    self.ref_ = response.etag_ref();
                    if let Some(value) = value {
                        self.value = value;
                    }
                }
            }
            Op::Delete => {
                if ok {
                    self.ref_ = None;
                }
            }
        }
        self.last_response = Some(response);
        ok
    }

    async fn run(&mut self, request: ApiRequest, op: Op) -> ClientResult<bool> {
        let executor = self.binding.require()?;
        let response = executor.execute(request).await;
        Ok(self.apply(op, response))
    }

    /// Issues the forward and reverse request together. The forward response
    /// drives local state; a failed reverse response replaces it as the last
    /// response. Nothing is rolled back.
    async fn run_both(
        &mut self,
        forward: (ApiRequest, Op),
        reverse: ApiRequest,
    ) -> ClientResult<bool> {
        let executor = self.binding.require()?;
        let (request, op) = forward;
        let (forward_response, reverse_response) =
            futures::join!(executor.execute(request), executor.execute(reverse));

        let forward_ok = self.apply(op, forward_response);
        let reverse_ok = reverse_response.is_success();
        if forward_ok && !reverse_ok {
            warn!(
                "Reverse edge request failed with status {}",
                reverse_response.status()
            );
            self.last_response = Some(reverse_response);
        }
        Ok(forward_ok && reverse_ok)
    }

    fn defer(&mut self, request: ApiRequest, op: Op) -> ClientResult<()> {
        let executor = self.binding.require()?;
        self.pending.start(op, executor, request)
    }

    // ── Operations ──────────────────────────────────────────────

    pub async fn settle(&mut self) -> ClientResult<Option<bool>> {
        Ok(self
            .pending
            .take()
            .await?
            .map(|(op, response)| self.apply(op, response)))
    }

    pub fn settle_blocking(&mut self) -> ClientResult<Option<bool>> {
        match self.pending.runtime() {
            Some(runtime) => pending::block_on(runtime, self.settle())?,
            None => Ok(None),
        }
    }

    /// Settles, then snapshots the relationship.
    pub async fn payload(&mut self) -> ClientResult<Value> {
        self.settle().await?;
        self.to_payload()
    }

    pub async fn fetch(&mut self) -> ClientResult<bool> {
        self.settle().await?;
        let request = ApiRequest::get(self.edge_path()?);
        self.run(request, Op::Fetch).await
    }

    /// Creates or replaces the edge, with `value` as its properties.
    pub async fn put(
        &mut self,
        value: Option<Map<String, Value>>,
        cond: Conditional,
    ) -> ClientResult<bool> {
        self.settle().await?;
        let (request, op) = self.put_request(self.edge_path()?, value, &cond)?;
        self.run(request, op).await
    }

    pub async fn delete(&mut self) -> ClientResult<bool> {
        self.settle().await?;
        let (request, op) = Self::delete_request(self.edge_path()?);
        self.run(request, op).await
    }

    /// Puts the edge in both directions at once.
    pub async fn put_both(&mut self, value: Option<Map<String, Value>>) -> ClientResult<bool> {
        self.settle().await?;
        let reverse = self
            .put_request(self.reverse_path()?, value.clone(), &Conditional::Unconditional)?
            .0;
        let forward = self.put_request(self.edge_path()?, value, &Conditional::Unconditional)?;
        self.run_both(forward, reverse).await
    }

    /// Deletes the edge in both directions at once.
    pub async fn delete_both(&mut self) -> ClientResult<bool> {
        self.settle().await?;
        let (reverse, _) = Self::delete_request(self.reverse_path()?);
        let forward = Self::delete_request(self.edge_path()?);
        self.run_both(forward, reverse).await
    }

    pub async fn put_deferred(
        &mut self,
        value: Option<Map<String, Value>>,
        cond: Conditional,
    ) -> ClientResult<()> {
        self.settle().await?;
        let (request, op) = self.put_request(self.edge_path()?, value, &cond)?;
        self.defer(request, op)
    }

    pub async fn delete_deferred(&mut self) -> ClientResult<()> {
        self.settle().await?;
        let (request, op) = Self::delete_request(self.edge_path()?);
        self.defer(request, op)
    }
}

impl HasCollection for Relationship {
    fn collection(&self) -> &str {
        &self.collection
    }
}

impl HasKey for Relationship {
    fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }
}

impl HasRef for Relationship {
    fn ref_(&self) -> Option<&str> {
        self.ref_.as_deref()
    }
}

impl HasValue for Relationship {
    fn value(&self) -> &Map<String, Value> {
        &self.value
    }
}

impl ToPayload for Relationship {
    fn to_payload(&self) -> ClientResult<Value> {
        ensure_settled(self.pending.is_pending())?;
        let source = self
            .key
            .as_ref()
            .map(|key| EdgeEnd::new(self.collection.clone(), key.clone()));
        let path = ItemPath {
            collection: Some(self.collection.clone()),
            key: self.key.clone(),
            ref_: self.ref_.clone(),
            relation: self.relation.clone(),
            source,
            destination: self.destination.clone(),
            ..Default::default()
        };
        Ok(tagged_payload(ItemKind::Relationship, path, &self.value, None))
    }
}
