//! Addressable records.
//!
//! Three variants share the same identity model (collection, key, ref,
//! value) but own their fields directly. The small traits below expose each
//! capability separately so helpers can ask only for what they need.

mod event;
mod key_value;
mod relationship;

pub use event::Event;
pub use key_value::{EntityState, KeyValue};
pub use relationship::Relationship;

use crate::error::{ClientError, ClientResult};
use crate::executor::SharedExecutor;
use orchestrate_types::{ItemKind, ItemPath, RawItem};
use serde_json::{Map, Value};

/// Has a collection name.
pub trait HasCollection {
    fn collection(&self) -> &str;
}

/// Has a key (absent before creation).
pub trait HasKey {
    fn key(&self) -> Option<&str>;
}

/// Has a version ref (absent when unknown or purged).
pub trait HasRef {
    fn ref_(&self) -> Option<&str>;
}

/// Has a JSON object payload.
pub trait HasValue {
    fn value(&self) -> &Map<String, Value>;
}

/// Can snapshot itself into the tagged payload shape.
///
/// The snapshot is refused with [`ClientError::Pending`] while a deferred
/// request is outstanding, so it never shows state the server has already
/// moved past. Settle first, or use the owner's async `payload()`.
pub trait ToPayload {
    fn to_payload(&self) -> ClientResult<Value>;
}

pub(crate) fn ensure_settled(pending: bool) -> ClientResult<()> {
    if pending {
        Err(ClientError::Pending)
    } else {
        Ok(())
    }
}

/// One materialized result item.
#[derive(Debug, Clone)]
pub enum Entity {
    Item(KeyValue),
    Event(Event),
    Relationship(Relationship),
}

impl Entity {
    pub fn kind(&self) -> ItemKind {
        match self {
            Entity::Item(_) => ItemKind::Item,
            Entity::Event(_) => ItemKind::Event,
            Entity::Relationship(_) => ItemKind::Relationship,
        }
    }

    /// Builds an entity from a payload produced by [`ToPayload::to_payload`]
    /// or a raw result item, using the built-in kinds.
    pub fn from_payload(payload: &Value) -> ClientResult<Self> {
        let raw = RawItem::from_value(payload.clone())?;
        let kind = raw
            .kind()
            .ok_or_else(|| ClientError::InvalidPayload("missing path.kind".to_string()))?;
        match ItemKind::parse(kind) {
            Some(ItemKind::Item) => Ok(Entity::Item(KeyValue::from_raw(&raw))),
            Some(ItemKind::Event) => Ok(Entity::Event(Event::from_raw(&raw))),
            Some(ItemKind::Relationship) => {
                Ok(Entity::Relationship(Relationship::from_raw(&raw)))
            }
            None => Err(ClientError::InvalidPayload(format!("unknown kind {kind:?}"))),
        }
    }

    /// Binds the entity to an executor.
    pub fn bind(&mut self, executor: SharedExecutor) {
        match self {
            Entity::Item(e) => e.bind(executor),
            Entity::Event(e) => e.bind(executor),
            Entity::Relationship(e) => e.bind(executor),
        }
    }

    pub fn is_bound(&self) -> bool {
        match self {
            Entity::Item(e) => e.is_bound(),
            Entity::Event(e) => e.is_bound(),
            Entity::Relationship(e) => e.is_bound(),
        }
    }

    pub fn is_pending(&self) -> bool {
        match self {
            Entity::Item(e) => e.is_pending(),
            Entity::Event(e) => e.is_pending(),
            Entity::Relationship(e) => e.is_pending(),
        }
    }

    /// Applies the entity's outstanding deferred request, if any.
    pub async fn settle(&mut self) -> ClientResult<Option<bool>> {
        match self {
            Entity::Item(e) => e.settle().await,
            Entity::Event(e) => e.settle().await,
            Entity::Relationship(e) => e.settle().await,
        }
    }

    /// Settles, then snapshots the entity.
    pub async fn payload(&mut self) -> ClientResult<Value> {
        self.settle().await?;
        self.to_payload()
    }

    pub fn as_item(&self) -> Option<&KeyValue> {
        match self {
            Entity::Item(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_item_mut(&mut self) -> Option<&mut KeyValue> {
        match self {
            Entity::Item(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_event(&self) -> Option<&Event> {
        match self {
            Entity::Event(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_event_mut(&mut self) -> Option<&mut Event> {
        match self {
            Entity::Event(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_relationship(&self) -> Option<&Relationship> {
        match self {
            Entity::Relationship(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_relationship_mut(&mut self) -> Option<&mut Relationship> {
        match self {
            Entity::Relationship(e) => Some(e),
            _ => None,
        }
    }
}

impl HasCollection for Entity {
    fn collection(&self) -> &str {
        match self {
            Entity::Item(e) => e.collection(),
            Entity::Event(e) => e.collection(),
            Entity::Relationship(e) => e.collection(),
        }
    }
}

impl HasKey for Entity {
    fn key(&self) -> Option<&str> {
        match self {
            Entity::Item(e) => e.key(),
            Entity::Event(e) => e.key(),
            Entity::Relationship(e) => e.key(),
        }
    }
}

impl HasRef for Entity {
    fn ref_(&self) -> Option<&str> {
        match self {
            Entity::Item(e) => e.ref_(),
            Entity::Event(e) => e.ref_(),
            Entity::Relationship(e) => e.ref_(),
        }
    }
}

impl HasValue for Entity {
    fn value(&self) -> &Map<String, Value> {
        match self {
            Entity::Item(e) => e.value(),
            Entity::Event(e) => e.value(),
            Entity::Relationship(e) => e.value(),
        }
    }
}

impl ToPayload for Entity {
    fn to_payload(&self) -> ClientResult<Value> {
        match self {
            Entity::Item(e) => e.to_payload(),
            Entity::Event(e) => e.to_payload(),
            Entity::Relationship(e) => e.to_payload(),
        }
    }
}

impl From<KeyValue> for Entity {
    fn from(e: KeyValue) -> Self {
        Entity::Item(e)
    }
}

impl From<Event> for Entity {
    fn from(e: Event) -> Self {
        Entity::Event(e)
    }
}

impl From<Relationship> for Entity {
    fn from(e: Relationship) -> Self {
        Entity::Relationship(e)
    }
}

/// `{kind, path, value[, score]}` with `path.kind` mirrored so the payload
/// can be fed straight back through the factory.
pub(crate) fn tagged_payload(
    kind: ItemKind,
    mut path: ItemPath,
    value: &Map<String, Value>,
    score: Option<f64>,
) -> Value {
    path.kind = Some(kind.as_str().to_string());

    let mut payload = Map::new();
    payload.insert("kind".to_string(), Value::from(kind.as_str()));
    payload.insert(
        "path".to_string(),
        serde_json::to_value(&path).unwrap_or_else(|_| Value::Object(Map::new())),
    );
    payload.insert("value".to_string(), Value::Object(value.clone()));
    if let Some(score) = score {
        payload.insert("score".to_string(), Value::from(score));
    }
    Value::Object(payload)
}

/// Merges `other` into `target`. Nested objects merge key by key; any other
/// value in `other` replaces the one in `target`.
pub(crate) fn merge_objects(target: &mut Map<String, Value>, other: &Map<String, Value>) {
    for (field, incoming) in other {
        match (target.get_mut(field), incoming) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                merge_objects(existing, incoming);
            }
            _ => {
                target.insert(field.clone(), incoming.clone());
            }
        }
    }
}

/// The response body as an object, or an empty map.
pub(crate) fn body_object(body: Option<&Value>) -> Map<String, Value> {
    match body {
        Some(Value::Object(map)) => map.clone(),
        _ => Map::new(),
    }
}

pub(crate) fn require<'a>(value: Option<&'a str>, name: &'static str) -> ClientResult<&'a str> {
    value
        .filter(|v| !v.is_empty())
        .ok_or(ClientError::MissingProperty(name))
}
