use serde_json::Value;
use std::collections::HashMap;

/// Stable identity of a row: its position in the original unfiltered
/// dataset at assignment time (appends continue the sequence).
///
/// Every derived view (filtered, sorted, grouped, paged) is a list of
/// `RowId`s over the arena, never a copy, so selection and edit state can
/// key on identity and survive reordering.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RowId(pub u64);

/// One logical data item displayed as a grid row.
#[derive(Clone, Debug)]
pub struct RowRecord {
    pub id: RowId,
    /// Arbitrarily-shaped source datum. Field lookups resolve dot-paths
    /// into this value.
    pub data: Value,
    pub disabled: bool,
    pub hidden: bool,
}

impl RowRecord {
    fn new(id: RowId, data: Value) -> Self {
        Self {
            id,
            data,
            disabled: false,
            hidden: false,
        }
    }
}

/// Owner of all [`RowRecord`]s. Ids are assigned monotonically and never
/// reused; removing a row does not shift the identities of the others.
#[derive(Debug, Default)]
pub struct RowArena {
    rows: Vec<RowRecord>,
    index: HashMap<RowId, usize>,
    next_id: u64,
}

impl RowArena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole dataset. Identity restarts from zero.
    pub fn assign(&mut self, data: Vec<Value>) {
        self.rows.clear();
        self.index.clear();
        self.next_id = 0;
        self.append(data);
    }

    /// Appends records, continuing the identity sequence. Returns the ids
    /// of the new rows.
    pub fn append(&mut self, data: Vec<Value>) -> Vec<RowId> {
        let mut added = Vec::with_capacity(data.len());
        for value in data {
            let id = RowId(self.next_id);
            self.next_id += 1;
            self.index.insert(id, self.rows.len());
            self.rows.push(RowRecord::new(id, value));
            added.push(id);
        }
        added
    }

    /// Removes the row with identity `id`. When `guard` is present the row
    /// is only removed if its resolved `field` equals the expected value;
    /// a mismatch (or unknown id) is a logged no-op.
    pub fn remove(&mut self, id: RowId, guard: Option<(&str, &Value)>) -> bool {
        let Some(&pos) = self.index.get(&id) else {
            log::warn!("remove: unknown row id {id:?}");
            return false;
        };
        if let Some((field, expected)) = guard {
            if resolve_path(&self.rows[pos].data, field) != Some(expected) {
                log::warn!("remove: row {id:?} does not match {field}");
                return false;
            }
        }
        self.rows.remove(pos);
        self.index.remove(&id);
        for (i, row) in self.rows.iter().enumerate().skip(pos) {
            self.index.insert(row.id, i);
        }
        true
    }

    /// Clears the row's cell values (object fields become null) without
    /// removing the row. Accepts the same partial-match guard as
    /// [`RowArena::remove`].
    pub fn clear(&mut self, id: RowId, guard: Option<(&str, &Value)>) -> bool {
        let Some(&pos) = self.index.get(&id) else {
            log::warn!("clear: unknown row id {id:?}");
            return false;
        };
        if let Some((field, expected)) = guard {
            if resolve_path(&self.rows[pos].data, field) != Some(expected) {
                log::warn!("clear: row {id:?} does not match {field}");
                return false;
            }
        }
        if let Value::Object(map) = &mut self.rows[pos].data {
            for (_, slot) in map.iter_mut() {
                *slot = Value::Null;
            }
        } else {
            self.rows[pos].data = Value::Null;
        }
        true
    }

    pub fn get(&self, id: RowId) -> Option<&RowRecord> {
        self.index.get(&id).map(|&pos| &self.rows[pos])
    }

    pub fn get_mut(&mut self, id: RowId) -> Option<&mut RowRecord> {
        self.index.get(&id).map(|&pos| &mut self.rows[pos])
    }

    pub fn contains(&self, id: RowId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows in identity order.
    pub fn iter(&self) -> impl Iterator<Item = &RowRecord> {
        self.rows.iter()
    }

    pub fn ids(&self) -> Vec<RowId> {
        self.rows.iter().map(|r| r.id).collect()
    }

    /// Writes `value` at `path` inside the record, creating intermediate
    /// objects for missing segments. Used by edit commit.
    pub fn write_field(&mut self, id: RowId, path: &str, value: Value) -> bool {
        let Some(record) = self.get_mut(id) else {
            return false;
        };
        write_path(&mut record.data, path, value)
    }
}

/// Nested dot-path lookup, e.g. `detail.assignee.name`. Returns `None`
/// for any missing segment instead of panicking.
pub fn resolve_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = value;
    for segment in path.split('.') {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

fn write_path(target: &mut Value, path: &str, value: Value) -> bool {
    let mut current = target;
    let segments: Vec<&str> = path.split('.').collect();
    let (last, init) = match segments.split_last() {
        Some(parts) => parts,
        None => return false,
    };
    for segment in init {
        if !current.is_object() {
            *current = Value::Object(serde_json::Map::new());
        }
        let Some(map) = current.as_object_mut() else {
            return false;
        };
        current = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(serde_json::Map::new()));
    }
    if !current.is_object() {
        *current = Value::Object(serde_json::Map::new());
    }
    let Some(map) = current.as_object_mut() else {
        return false;
    };
    map.insert(last.to_string(), value);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ids_are_stable_across_removal() {
        let mut arena = RowArena::new();
        arena.assign(vec![json!({"n": 0}), json!({"n": 1}), json!({"n": 2})]);
        assert!(arena.remove(RowId(1), None));
        assert_eq!(arena.len(), 2);
        assert_eq!(arena.get(RowId(0)).unwrap().data["n"], json!(0));
        assert_eq!(arena.get(RowId(2)).unwrap().data["n"], json!(2));
        assert!(arena.get(RowId(1)).is_none());

        let added = arena.append(vec![json!({"n": 3})]);
        assert_eq!(added, vec![RowId(3)]);
    }

    #[test]
    fn remove_with_mismatched_guard_is_a_noop() {
        let mut arena = RowArena::new();
        arena.assign(vec![json!({"name": "a"})]);
        let expected = json!("b");
        assert!(!arena.remove(RowId(0), Some(("name", &expected))));
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn clear_nulls_fields_but_keeps_the_row() {
        let mut arena = RowArena::new();
        arena.assign(vec![json!({"a": 1, "b": "x"})]);
        assert!(arena.clear(RowId(0), None));
        let row = arena.get(RowId(0)).unwrap();
        assert_eq!(row.data["a"], Value::Null);
        assert_eq!(row.data["b"], Value::Null);
    }

    #[test]
    fn resolve_path_follows_nested_segments() {
        let v = json!({"detail": {"assignee": {"name": "ada"}}});
        assert_eq!(
            resolve_path(&v, "detail.assignee.name"),
            Some(&json!("ada"))
        );
        assert_eq!(resolve_path(&v, "detail.missing.name"), None);
        assert_eq!(resolve_path(&v, "nope"), None);
    }

    #[test]
    fn write_path_creates_missing_segments() {
        let mut arena = RowArena::new();
        arena.assign(vec![json!({})]);
        assert!(arena.write_field(RowId(0), "detail.status", json!("open")));
        assert_eq!(
            resolve_path(&arena.get(RowId(0)).unwrap().data, "detail.status"),
            Some(&json!("open"))
        );
    }
}
