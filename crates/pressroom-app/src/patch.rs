// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

//! Field-level patches over typed records.
//!
//! Records are patched through their wire form: the entity is serialized to
//! JSON, the keyed values are written, and the result is decoded back. Keys
//! are wire field names; a dotted key such as `content.readed` walks nested
//! objects.

use anyhow::{Context, Result};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fields(BTreeMap<String, Value>);

impl Fields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Later values win on key collisions.
    pub fn merge(&mut self, other: &Fields) {
        for (key, value) in &other.0 {
            self.0.insert(key.clone(), value.clone());
        }
    }
}

impl FromIterator<(String, Value)> for Fields {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Pre-patch value per key; `None` means the key was absent.
pub type Snapshot = BTreeMap<String, Option<Value>>;

/// Writes `fields` onto a copy of `entity` and returns it with the values it replaced.
pub fn apply_fields<E>(entity: &E, fields: &Fields) -> Result<(E, Snapshot)>
where
    E: Serialize + DeserializeOwned,
{
    let mut wire = serde_json::to_value(entity).context("encode record for patch")?;
    let mut snapshot = Snapshot::new();
    for (key, value) in fields.iter() {
        snapshot.insert(key.clone(), read_path(&wire, key));
        write_path(&mut wire, key, Some(value.clone()));
    }
    let patched = serde_json::from_value(wire).context("decode patched record")?;
    Ok((patched, snapshot))
}

/// Puts back the values recorded in `snapshot`, removing keys that were absent.
pub fn restore_fields<E>(entity: &E, snapshot: &Snapshot) -> Result<E>
where
    E: Serialize + DeserializeOwned,
{
    let mut wire = serde_json::to_value(entity).context("encode record for rollback")?;
    for (key, value) in snapshot {
        write_path(&mut wire, key, value.clone());
    }
    serde_json::from_value(wire).context("decode restored record")
}

pub fn read_path(value: &Value, key: &str) -> Option<Value> {
    let mut cursor = value;
    for segment in key.split('.') {
        cursor = cursor.as_object()?.get(segment)?;
    }
    Some(cursor.clone())
}

fn write_path(target: &mut Value, key: &str, value: Option<Value>) {
    let segments: Vec<&str> = key.split('.').collect();
    let Some((last, parents)) = segments.split_last() else {
        return;
    };

    let mut cursor = target;
    for segment in parents {
        if !cursor.is_object() {
            *cursor = Value::Object(Map::new());
        }
        let Value::Object(map) = cursor else {
            return;
        };
        cursor = map
            .entry((*segment).to_owned())
            .or_insert_with(|| Value::Object(Map::new()));
    }

    if !cursor.is_object() {
        *cursor = Value::Object(Map::new());
    }
    if let Value::Object(map) = cursor {
        match value {
            Some(value) => {
                map.insert((*last).to_owned(), value);
            }
            None => {
                map.remove(*last);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Fields, apply_fields, read_path, restore_fields};
    use crate::{Comment, CommentId, Ticket, TicketId};
    use anyhow::Result;
    use serde_json::json;

    #[test]
    fn nested_keys_patch_nested_objects() -> Result<()> {
        let ticket = Ticket {
            id: TicketId::new("t1"),
            ..Ticket::default()
        };
        let (patched, snapshot) =
            apply_fields(&ticket, &Fields::new().with("content.readed", true))?;
        assert!(patched.content.readed);
        assert_eq!(snapshot["content.readed"], Some(json!(false)));

        let restored = restore_fields(&patched, &snapshot)?;
        assert_eq!(restored, ticket);
        Ok(())
    }

    #[test]
    fn unknown_keys_land_in_the_extension_map_and_roll_back_out() -> Result<()> {
        let comment = Comment {
            id: CommentId::new("c1"),
            ..Comment::default()
        };
        let (patched, snapshot) =
            apply_fields(&comment, &Fields::new().with("pinned", true).with("answer", "ok"))?;
        assert_eq!(patched.extra["pinned"], true);
        assert_eq!(patched.answer.as_deref(), Some("ok"));
        assert_eq!(snapshot["pinned"], None);
        assert_eq!(snapshot["answer"], None);

        let restored = restore_fields(&patched, &snapshot)?;
        assert_eq!(restored, comment);
        Ok(())
    }

    #[test]
    fn read_path_walks_objects_only() {
        let value = json!({"content": {"readed": true}, "list": [1, 2]});
        assert_eq!(read_path(&value, "content.readed"), Some(json!(true)));
        assert_eq!(read_path(&value, "list.0"), None);
        assert_eq!(read_path(&value, "missing"), None);
    }

    #[test]
    fn merge_prefers_later_values() {
        let mut base = Fields::new().with("a", 1).with("b", 1);
        base.merge(&Fields::new().with("b", 2));
        assert_eq!(base.get("a"), Some(&json!(1)));
        assert_eq!(base.get("b"), Some(&json!(2)));
        assert_eq!(base.len(), 2);
    }
}
