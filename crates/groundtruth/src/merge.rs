//! Recursive merge of independently produced partial ground-truth records.
//!
//! Each source format yields a list of partial records, one per source
//! instrument. Lists of equal length are merged position by position: a field
//! written by one source stays [`Merged::Single`], a field written by two or
//! more becomes [`Merged::Multi`] in source order. Nested mappings (the
//! alignment sub-records) merge by the same rule one level down.

use crate::types::GroundTruth;
use crate::{Error, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// One format-specific record prior to merge.
pub type PartialRecord = Map<String, Value>;

/// A field value that was written by one source or by several.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Merged<T> {
    Single(T),
    Multi(Vec<T>),
}

impl<T> Merged<T> {
    /// Per-source values, whatever the number of sources was.
    pub fn values(&self) -> &[T] {
        match self {
            Merged::Single(value) => std::slice::from_ref(value),
            Merged::Multi(values) => values,
        }
    }

    fn push(self, value: T) -> Self {
        match self {
            Merged::Single(first) => Merged::Multi(vec![first, value]),
            Merged::Multi(mut values) => {
                values.push(value);
                Merged::Multi(values)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MergedField {
    Leaf(Merged<Value>),
    Nested(MergedRecord),
}

/// Result of merging the records at one position of the input lists.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct MergedRecord {
    fields: BTreeMap<String, MergedField>,
}

impl MergedRecord {
    pub fn from_partial(partial: &PartialRecord) -> Self {
        let fields = partial
            .iter()
            .map(|(key, value)| (key.clone(), field_from_value(value)))
            .collect();
        Self { fields }
    }

    pub fn get(&self, key: &str) -> Option<&MergedField> {
        self.fields.get(key)
    }

    /// Per-source values of a leaf field; empty when absent or nested.
    pub fn values(&self, key: &str) -> &[Value] {
        match self.fields.get(key) {
            Some(MergedField::Leaf(merged)) => merged.values(),
            _ => &[],
        }
    }

    pub fn nested(&self, key: &str) -> Option<&MergedRecord> {
        match self.fields.get(key) {
            Some(MergedField::Nested(record)) => Some(record),
            _ => None,
        }
    }

    fn absorb(&mut self, partial: &PartialRecord) -> Result<()> {
        for (key, value) in partial {
            match self.fields.remove(key) {
                None => {
                    self.fields.insert(key.clone(), field_from_value(value));
                }
                Some(MergedField::Nested(mut record)) => {
                    let Value::Object(inner) = value else {
                        return Err(Error::ShapeMismatch { key: key.clone() });
                    };
                    record.absorb(inner)?;
                    self.fields.insert(key.clone(), MergedField::Nested(record));
                }
                Some(MergedField::Leaf(merged)) => {
                    if value.is_object() {
                        return Err(Error::ShapeMismatch { key: key.clone() });
                    }
                    self.fields
                        .insert(key.clone(), MergedField::Leaf(merged.push(value.clone())));
                }
            }
        }
        Ok(())
    }

    /// Collapse to one JSON object, taking for each leaf the first
    /// non-empty value in source order.
    pub fn resolve(&self) -> Value {
        let object = self
            .fields
            .iter()
            .map(|(key, field)| {
                let value = match field {
                    MergedField::Nested(record) => record.resolve(),
                    MergedField::Leaf(merged) => merged
                        .values()
                        .iter()
                        .find(|v| !is_empty_value(v))
                        .or_else(|| merged.values().first())
                        .cloned()
                        .unwrap_or(Value::Null),
                };
                (key.clone(), value)
            })
            .collect();
        Value::Object(object)
    }
}

fn field_from_value(value: &Value) -> MergedField {
    match value {
        Value::Object(inner) => MergedField::Nested(MergedRecord::from_partial(inner)),
        other => MergedField::Leaf(Merged::Single(other.clone())),
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Array(items) => items.is_empty(),
        Value::String(s) => s.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// Merge N lists of partial records of equal length into one list.
pub fn merge(inputs: &[Vec<PartialRecord>]) -> Result<Vec<MergedRecord>> {
    let Some((first, rest)) = inputs.split_first() else {
        return Ok(Vec::new());
    };

    for (offset, list) in rest.iter().enumerate() {
        if list.len() != first.len() {
            return Err(Error::LengthMismatch {
                expected: first.len(),
                found: list.len(),
                position: offset + 1,
            });
        }
    }

    first
        .iter()
        .enumerate()
        .map(|(i, partial)| {
            let mut record = MergedRecord::from_partial(partial);
            for list in rest {
                record.absorb(&list[i])?;
            }
            Ok(record)
        })
        .collect()
}

/// Decode a JSON array of objects into partial records.
pub fn partials_from_json(value: Value) -> Result<Vec<PartialRecord>> {
    let Value::Array(items) = value else {
        return Err(Error::Decode("partial records must be a JSON array".to_string()));
    };
    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| match item {
            Value::Object(map) => Ok(map),
            _ => Err(Error::Decode(format!("partial record {} is not an object", i))),
        })
        .collect()
}

impl GroundTruth {
    /// Build a canonical record from merged partials. Fields no source
    /// wrote stay empty.
    pub fn from_merged(record: &MergedRecord) -> Result<Self> {
        let mut base =
            serde_json::to_value(GroundTruth::default()).map_err(|e| Error::Decode(e.to_string()))?;
        overlay(&mut base, record.resolve());
        GroundTruth::from_json(base)
    }
}

fn overlay(base: &mut Value, top: Value) {
    match (base, top) {
        (Value::Object(base), Value::Object(top)) => {
            for (key, value) in top {
                match base.get_mut(&key) {
                    Some(slot) if slot.is_object() && value.is_object() => overlay(slot, value),
                    _ => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}
