use crate::row::RowArena;
use crate::row::RowId;
use crate::row::resolve_path;
use serde_json::Value;
use std::collections::HashSet;

/// One entry of the grouped view: either a synthesized group header or a
/// member data row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DisplayRow {
    GroupHeader {
        key: String,
        /// Member count under this header (before collapse filtering).
        count: usize,
        expanded: bool,
    },
    Data(RowId),
}

/// Partitions a sorted/filtered id list into ordered groups keyed by the
/// resolved value(s) of the grouping fields.
///
/// Group order is first occurrence under the current sort. Collapse state
/// is per-group and ephemeral: collapsing removes the member rows (not
/// the header) from the next pipeline stage.
#[derive(Debug, Default)]
pub struct Grouping {
    fields: Vec<String>,
    collapsed: HashSet<String>,
}

impl Grouping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the grouping fields. Collapse state resets: the old keys
    /// no longer describe the new partition.
    pub fn set_fields(&mut self, fields: Vec<String>) {
        self.fields = fields;
        self.collapsed.clear();
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn is_active(&self) -> bool {
        !self.fields.is_empty()
    }

    pub fn is_collapsed(&self, key: &str) -> bool {
        self.collapsed.contains(key)
    }

    /// Toggles one group. Returns the new expanded state, or `None` when
    /// the key is unknown to the current partition (logged no-op).
    pub fn toggle(&mut self, key: &str, known_keys: &[String]) -> Option<bool> {
        if !known_keys.iter().any(|k| k == key) {
            log::warn!("toggle_group: unknown group key `{key}`");
            return None;
        }
        if self.collapsed.remove(key) {
            Some(true)
        } else {
            self.collapsed.insert(key.to_string());
            Some(false)
        }
    }

    pub fn expand_all(&mut self) {
        self.collapsed.clear();
    }

    pub fn collapse_all(&mut self, keys: &[String]) {
        self.collapsed = keys.iter().cloned().collect();
    }

    /// Builds the grouped view over `ids`. Without grouping fields every
    /// row passes through as [`DisplayRow::Data`].
    pub fn build(&self, arena: &RowArena, ids: &[RowId]) -> Vec<DisplayRow> {
        if !self.is_active() {
            return ids.iter().map(|&id| DisplayRow::Data(id)).collect();
        }
        // First pass: ordered distinct keys with member lists.
        let mut keys: Vec<String> = Vec::new();
        let mut members: Vec<Vec<RowId>> = Vec::new();
        for &id in ids {
            let key = self.key_for(arena, id);
            match keys.iter().position(|k| *k == key) {
                Some(i) => members[i].push(id),
                None => {
                    keys.push(key);
                    members.push(vec![id]);
                }
            }
        }
        let mut out = Vec::new();
        for (key, group) in keys.into_iter().zip(members) {
            let expanded = !self.is_collapsed(&key);
            out.push(DisplayRow::GroupHeader {
                count: group.len(),
                expanded,
                key,
            });
            if expanded {
                out.extend(group.into_iter().map(DisplayRow::Data));
            }
        }
        out
    }

    /// The ordered distinct keys of the current partition.
    pub fn keys(&self, arena: &RowArena, ids: &[RowId]) -> Vec<String> {
        let mut keys: Vec<String> = Vec::new();
        for &id in ids {
            let key = self.key_for(arena, id);
            if !keys.iter().any(|k| *k == key) {
                keys.push(key);
            }
        }
        keys
    }

    fn key_for(&self, arena: &RowArena, id: RowId) -> String {
        let Some(record) = arena.get(id) else {
            return String::new();
        };
        let parts: Vec<String> = self
            .fields
            .iter()
            .map(|field| match resolve_path(&record.data, field) {
                None | Some(Value::Null) => String::new(),
                Some(Value::String(s)) => s.clone(),
                Some(other) => other.to_string(),
            })
            .collect();
        parts.join(" / ")
    }
}
