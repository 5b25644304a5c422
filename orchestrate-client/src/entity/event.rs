//! Time-ordered events attached to a key.

use super::{
    HasCollection, HasKey, HasRef, HasValue, ToPayload, body_object, ensure_settled, merge_objects,
    require, tagged_payload,
};
use crate::error::{ClientError, ClientResult};
use crate::executor::{ApiRequest, Binding, SharedExecutor, api_path};
use crate::pending::{self, Pending};
use crate::response::HttpResponse;
use chrono::{DateTime, Utc};
use orchestrate_types::{Conditional, EventLocation, ItemKind, ItemPath, RawItem};
use serde_json::{Map, Value};
use tracing::warn;

#[derive(Debug, Clone)]
enum Op {
    Fetch,
    Put { value: Option<Map<String, Value>> },
    Post { value: Option<Map<String, Value>> },
    Purge,
}

/// One event, identified by `(collection, key, type, timestamp, ordinal)`.
///
/// Timestamps are milliseconds since the Unix epoch; the ordinal tells apart
/// events of the same type sharing a timestamp.
#[derive(Debug, Clone)]
pub struct Event {
    collection: String,
    key: Option<String>,
    event_type: Option<String>,
    timestamp: Option<i64>,
    ordinal: Option<i64>,
    ref_: Option<String>,
    value: Map<String, Value>,
    binding: Binding,
    last_response: Option<HttpResponse>,
    pending: Pending<Op>,
}

impl Event {
    pub fn new(
        collection: impl Into<String>,
        key: impl Into<String>,
        event_type: impl Into<String>,
    ) -> Self {
        Self {
            collection: collection.into(),
            key: Some(key.into()),
            event_type: Some(event_type.into()),
            timestamp: None,
            ordinal: None,
            ref_: None,
            value: Map::new(),
            binding: Binding::default(),
            last_response: None,
            pending: Pending::default(),
        }
    }

    pub fn from_raw(raw: &RawItem) -> Self {
        let path = &raw.path;
        Self {
            collection: path.collection.clone().unwrap_or_default(),
            key: path.key.clone(),
            event_type: path.event_type.clone(),
            timestamp: path.timestamp,
            ordinal: path.ordinal,
            ref_: path.ref_.clone(),
            value: raw.value.clone(),
            binding: Binding::default(),
            last_response: None,
            pending: Pending::default(),
        }
    }

    /// Addresses an existing event.
    #[must_use]
    pub fn at(mut self, timestamp: i64, ordinal: i64) -> Self {
        self.timestamp = Some(timestamp);
        self.ordinal = Some(ordinal);
        self
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

    pub fn event_type(&self) -> Option<&str> {
        self.event_type.as_deref()
    }

    pub fn timestamp(&self) -> Option<i64> {
        self.timestamp
    }

    pub fn ordinal(&self) -> Option<i64> {
        self.ordinal
    }

    /// The timestamp as a UTC date-time.
    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        self.timestamp.and_then(DateTime::<Utc>::from_timestamp_millis)
    }

    /// Changing the key invalidates the event's identity.
    pub fn set_key(&mut self, key: impl Into<String>) {
        let key = key.into();
        if self.key.as_deref() != Some(key.as_str()) {
            self.key = Some(key);
            self.timestamp = None;
            self.ordinal = None;
            self.ref_ = None;
        }
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

    /// Replaces this event's state with a payload produced by `to_payload`.
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

    fn type_path(&self) -> ClientResult<String> {
        let collection = require(Some(self.collection.as_str()), "collection")?;
        let key = require(self.key.as_deref(), "key")?;
        let event_type = require(self.event_type.as_deref(), "event type")?;
        Ok(api_path(&[collection, key, "events", event_type]))
    }

    fn event_path(&self) -> ClientResult<String> {
        let timestamp = self.timestamp.ok_or(ClientError::MissingProperty("timestamp"))?;
        let ordinal = self.ordinal.ok_or(ClientError::MissingProperty("ordinal"))?;
        Ok(format!("{}/{timestamp}/{ordinal}", self.type_path()?))
    }

    fn fetch_request(&self) -> ClientResult<(ApiRequest, Op)> {
        Ok((ApiRequest::get(self.event_path()?), Op::Fetch))
    }

    fn put_request(
        &self,
        value: Option<Map<String, Value>>,
        cond: &Conditional,
    ) -> ClientResult<(ApiRequest, Op)> {
        if matches!(cond, Conditional::NoneMatch) {
            return Err(ClientError::InvalidConditional(
                "events cannot be written create-only".to_string(),
            ));
        }
        let body = value.clone().unwrap_or_else(|| self.value.clone());
        let request = ApiRequest::put(self.event_path()?)
            .maybe_header(cond.header(self.ref_.as_deref())?)
            .json(Value::Object(body));
        Ok((request, Op::Put { value }))
    }

    fn post_request(
        &self,
        value: Option<Map<String, Value>>,
        timestamp: Option<i64>,
    ) -> ClientResult<(ApiRequest, Op)> {
        let mut path = self.type_path()?;
        if let Some(timestamp) = timestamp {
            path = format!("{path}/{timestamp}");
        }
        let body = value.clone().unwrap_or_else(|| self.value.clone());
        Ok((ApiRequest::post(path).json(Value::Object(body)), Op::Post { value }))
    }

    fn purge_request(&self, cond: &Conditional) -> ClientResult<(ApiRequest, Op)> {
        if matches!(cond, Conditional::NoneMatch) {
            return Err(ClientError::InvalidConditional(
                "purge cannot be create-only".to_string(),
            ));
        }
        let request = ApiRequest::delete(self.event_path()?)
            .query("purge", "true")
            .maybe_header(cond.header(self.ref_.as_deref())?);
        Ok((request, Op::Purge))
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
            Op::Post { value } => {
                if ok {
                    self.apply_location(&response);
                    if let Some(value) = value {
                        self.value = value;
                    }
                }
            }
            Op::Purge => {
                if ok {
                    self.ref_ = None;
                }
            }
        }
        self.last_response = Some(response);
        ok
    }

    fn apply_location(&mut self, response: &HttpResponse) {
        match response.location().map(EventLocation::parse) {
            Some(Ok(location)) => {
                self.timestamp = Some(location.timestamp);
                self.ordinal = Some(location.ordinal);
            }
            Some(Err(e)) => warn!("Unparseable event location: {}", e),
            None => warn!("Event post succeeded without a Location header"),
        }
        self.ref_ = response.etag_ref();
    }

    async fn run(&mut self, request: ApiRequest, op: Op) -> ClientResult<bool> {
        let executor = self.binding.require()?;
        let response = executor.execute(request).await;
        Ok(self.apply(op, response))
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

    /// Settles, then snapshots the event.
    pub async fn payload(&mut self) -> ClientResult<Value> {
        self.settle().await?;
        self.to_payload()
    }

    pub async fn fetch(&mut self) -> ClientResult<bool> {
        self.settle().await?;
        let (request, op) = self.fetch_request()?;
        self.run(request, op).await
    }

    /// Replaces the event's value in place.
    pub async fn put(
        &mut self,
        value: Option<Map<String, Value>>,
        cond: Conditional,
    ) -> ClientResult<bool> {
        self.settle().await?;
        let (request, op) = self.put_request(value, &cond)?;
        self.run(request, op).await
    }

    /// Records a new event. Without a timestamp the server assigns the
    /// current time.
    pub async fn post(
        &mut self,
        value: Option<Map<String, Value>>,
        timestamp: Option<i64>,
    ) -> ClientResult<bool> {
        self.settle().await?;
        let (request, op) = self.post_request(value, timestamp)?;
        self.run(request, op).await
    }

    pub async fn purge(&mut self, cond: Conditional) -> ClientResult<bool> {
        self.settle().await?;
        let (request, op) = self.purge_request(&cond)?;
        self.run(request, op).await
    }

    pub async fn fetch_deferred(&mut self) -> ClientResult<()> {
        self.settle().await?;
        let (request, op) = self.fetch_request()?;
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

    pub async fn post_deferred(
        &mut self,
        value: Option<Map<String, Value>>,
        timestamp: Option<i64>,
    ) -> ClientResult<()> {
        self.settle().await?;
        let (request, op) = self.post_request(value, timestamp)?;
        self.defer(request, op)
    }

    pub async fn purge_deferred(&mut self, cond: Conditional) -> ClientResult<()> {
        self.settle().await?;
        let (request, op) = self.purge_request(&cond)?;
        self.defer(request, op)
    }
}

impl HasCollection for Event {
    fn collection(&self) -> &str {
        &self.collection
    }
}

impl HasKey for Event {
    fn key(&self) -> Option<&str> {
        self.key.as_deref()
    }
}

impl HasRef for Event {
    fn ref_(&self) -> Option<&str> {
        self.ref_.as_deref()
    }
}

impl HasValue for Event {
    fn value(&self) -> &Map<String, Value> {
        &self.value
    }
}

impl ToPayload for Event {
    fn to_payload(&self) -> ClientResult<Value> {
        ensure_settled(self.pending.is_pending())?;
        let path = ItemPath {
            collection: Some(self.collection.clone()),
            key: self.key.clone(),
            ref_: self.ref_.clone(),
            event_type: self.event_type.clone(),
            timestamp: self.timestamp,
            ordinal: self.ordinal,
            ..Default::default()
        };
        Ok(tagged_payload(ItemKind::Event, path, &self.value, None))
    }
}
