//! Builds entities from raw tagged result items.
//!
//! Dispatch is on `path.kind`. The three built-in kinds are registered by
//! default; callers can replace them or add their own. Items whose kind has
//! no constructor, or whose constructor declines them, are skipped.

use crate::entity::{Entity, Event, KeyValue, Relationship};
use crate::executor::SharedExecutor;
use orchestrate_types::{ItemKind, RawItem};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Builds one entity from a raw item, or declines it with `None`.
pub type Constructor = Arc<dyn Fn(&RawItem) -> Option<Entity> + Send + Sync>;

#[derive(Clone)]
pub struct ItemFactory {
    constructors: HashMap<String, Constructor>,
}

impl ItemFactory {
    /// A factory with the built-in kinds registered.
    pub fn new() -> Self {
        let mut factory = Self::empty();
        factory.register(ItemKind::Item.as_str(), |raw| {
            Some(Entity::Item(KeyValue::from_raw(raw)))
        });
        factory.register(ItemKind::Event.as_str(), |raw| {
            Some(Entity::Event(Event::from_raw(raw)))
        });
        factory.register(ItemKind::Relationship.as_str(), |raw| {
            Some(Entity::Relationship(Relationship::from_raw(raw)))
        });
        factory
    }

    /// A factory that recognizes nothing.
    pub fn empty() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// Registers (or replaces) the constructor for `kind`.
    pub fn register<F>(&mut self, kind: impl Into<String>, constructor: F) -> &mut Self
    where
        F: Fn(&RawItem) -> Option<Entity> + Send + Sync + 'static,
    {
        self.constructors.insert(kind.into(), Arc::new(constructor));
        self
    }

    pub fn unregister(&mut self, kind: &str) -> bool {
        self.constructors.remove(kind).is_some()
    }

    /// Registered kinds, sorted.
    pub fn kinds(&self) -> Vec<&str> {
        let mut kinds: Vec<&str> = self.constructors.keys().map(String::as_str).collect();
        kinds.sort_unstable();
        kinds
    }

    /// Builds an entity, or `None` for an unknown or missing kind.
    pub fn create(&self, raw: &RawItem) -> Option<Entity> {
        let constructor = self.constructors.get(raw.kind()?)?;
        constructor(raw)
    }

    /// Builds entities from a `results` array, binding each to `executor`.
    ///
    /// Returns the entities in server order and the number of items skipped.
    pub fn materialize(
        &self,
        results: &[Value],
        executor: Option<&SharedExecutor>,
    ) -> (Vec<Entity>, usize) {
        let mut entities = Vec::with_capacity(results.len());
        let mut skipped = 0;

        for value in results {
            let entity = RawItem::from_value(value.clone())
                .ok()
                .and_then(|raw| self.create(&raw));
            match entity {
                Some(mut entity) => {
                    if let Some(executor) = executor {
                        entity.bind(executor.clone());
                    }
                    entities.push(entity);
                }
                None => {
                    debug!("Skipping result item without a known kind: {}", value);
                    skipped += 1;
                }
            }
        }

        (entities, skipped)
    }
}

impl Default for ItemFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ItemFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ItemFactory")
            .field("kinds", &self.kinds())
            .finish()
    }
}
