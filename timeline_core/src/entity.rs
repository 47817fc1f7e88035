use std::collections::{BTreeMap, HashMap};

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::value::Cell;

/// Ordered key/value context attached to one timeline entry. Key order is
/// fixed by the event map that produced the record, so serialization and
/// comparison are deterministic.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DetailRecord {
    pairs: Vec<(String, String)>,
}

impl DetailRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((key.into(), value.into()));
    }

    pub fn pairs(&self) -> &[(String, String)] {
        &self.pairs
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

impl Serialize for DetailRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.pairs.len()))?;
        for (key, value) in &self.pairs {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// One simulated entity with its static attributes and per-category
/// timelines. Timelines are append-only; nothing is mutated after the
/// store is finalised.
#[derive(Debug, Clone, Serialize)]
pub struct Entity {
    pub uid: String,
    pub name: String,
    /// Mutable type tag; weapon classification may append a marker suffix.
    pub unit_type: String,
    pub affiliation: String,
    pub commander: String,
    pub init_comps: u32,
    pub cbt_per_comp: f64,
    series: BTreeMap<String, Vec<Cell>>,
    details: BTreeMap<String, Vec<DetailRecord>>,
}

impl Entity {
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            name: String::new(),
            unit_type: String::new(),
            affiliation: String::new(),
            commander: String::new(),
            init_comps: 0,
            cbt_per_comp: 0.0,
            series: BTreeMap::new(),
            details: BTreeMap::new(),
        }
    }

    /// Append values to a named timeline, creating it on first use.
    pub fn append_series(&mut self, name: &str, values: Vec<Cell>) {
        if values.is_empty() {
            return;
        }
        self.series.entry(name.to_string()).or_default().extend(values);
    }

    /// Append encoded detail records to a named detail list.
    pub fn append_details(&mut self, name: &str, records: Vec<DetailRecord>) {
        if records.is_empty() {
            return;
        }
        self.details.entry(name.to_string()).or_default().extend(records);
    }

    /// Values of a named timeline; unknown names yield an empty slice.
    pub fn series(&self, name: &str) -> &[Cell] {
        self.series.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn detail_list(&self, name: &str) -> &[DetailRecord] {
        self.details.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn series_names(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }

    pub fn detail_names(&self) -> impl Iterator<Item = &str> {
        self.details.keys().map(String::as_str)
    }
}

#[derive(Debug, Error)]
pub enum FinaliseError {
    #[error(
        "entity {uid}: detail list {list} has {details} records but {series} has {values} values"
    )]
    Misaligned {
        uid: String,
        list: String,
        series: String,
        details: usize,
        values: usize,
    },
}

/// Exclusive owner of the entity collection for one run. Entities are
/// created by registry construction, possibly removed or recast by weapon
/// classification, then populated by the event-map pass.
#[derive(Debug, Default)]
pub struct EntityStore {
    entities: Vec<Entity>,
    index: HashMap<String, usize>,
    metadata: Vec<(String, String)>,
    finalised: bool,
}

impl EntityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entity, preserving first-appearance order. A duplicate
    /// uid is logged and ignored.
    pub fn insert(&mut self, entity: Entity) {
        debug_assert!(!self.finalised, "insert after finalise");
        if self.index.contains_key(&entity.uid) {
            tracing::warn!(
                target: "timeline::store",
                uid = %entity.uid,
                "duplicate entity uid ignored"
            );
            return;
        }
        self.index.insert(entity.uid.clone(), self.entities.len());
        self.entities.push(entity);
    }

    /// Remove an entity outright. Returns whether anything was removed.
    pub fn remove(&mut self, uid: &str) -> bool {
        match self.index.remove(uid) {
            Some(idx) => {
                self.entities.remove(idx);
                self.reindex();
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, uid: &str) -> bool {
        self.index.contains_key(uid)
    }

    pub fn get(&self, uid: &str) -> Option<&Entity> {
        self.index.get(uid).map(|idx| &self.entities[*idx])
    }

    pub fn get_mut(&mut self, uid: &str) -> Option<&mut Entity> {
        debug_assert!(!self.finalised, "mutation after finalise");
        self.index.get(uid).map(|idx| &mut self.entities[*idx])
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn uids(&self) -> Vec<String> {
        self.entities.iter().map(|e| e.uid.clone()).collect()
    }

    /// Run-scoped metadata carried into export, insertion-ordered.
    pub fn add_metadata(&mut self, key: &str, value: impl ToString) {
        self.metadata.push((key.to_string(), value.to_string()));
    }

    pub fn metadata(&self) -> &[(String, String)] {
        &self.metadata
    }

    pub fn is_finalised(&self) -> bool {
        self.finalised
    }

    /// Verify the timeline/detail alignment invariant for every entity and
    /// freeze the store. Each `<category>_detail` list must be index-aligned
    /// with its `<category>_time` timeline.
    pub fn finalise(&mut self) -> Result<(), FinaliseError> {
        for entity in &self.entities {
            for list in entity.detail_names() {
                let Some(category) = list.strip_suffix("_detail") else {
                    continue;
                };
                let series = format!("{category}_time");
                let values = entity.series(&series).len();
                let details = entity.detail_list(list).len();
                if values != details {
                    return Err(FinaliseError::Misaligned {
                        uid: entity.uid.clone(),
                        list: list.to_string(),
                        series,
                        details,
                        values,
                    });
                }
            }
        }
        self.finalised = true;
        tracing::info!(
            target: "timeline::store",
            entities = self.entities.len(),
            "entity store finalised"
        );
        Ok(())
    }

    fn reindex(&mut self) {
        self.index = self
            .entities
            .iter()
            .enumerate()
            .map(|(idx, e)| (e.uid.clone(), idx))
            .collect();
    }
}
