//! Process-lifetime pairing of Todoist task ids with Notion page ids.
//!
//! Two columns aligned by position: `todoist_ids()[i]` and
//! `notion_ids()[i]` name the same logical task whenever both are set.
//! An unset slot holds an empty placeholder. Positions are only ever
//! appended; nothing is removed, so a completed task stays indexed.
//!
//! Once `*_index_of` places an id it keeps that position, with two
//! exceptions: [`IdentityIndex::pair`] joining two ids that were each
//! registered alone, and [`IdentityIndex::reorder_by`].

use std::collections::HashMap;

use super::ordering::exchange_sort_by;

/// One column of the index with O(1) id-to-position lookup.
#[derive(Debug, Default, Clone)]
pub struct IdColumn {
    ids: Vec<String>,
    positions: HashMap<String, usize>,
}

impl IdColumn {
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.positions.get(id).copied()
    }

    /// The id at `index`, or `None` for a placeholder or out-of-range slot.
    pub fn get(&self, index: usize) -> Option<&str> {
        self.ids
            .get(index)
            .map(String::as_str)
            .filter(|id| !id.is_empty())
    }

    pub fn as_slice(&self) -> &[String] {
        &self.ids
    }

    /// Write `id` into slot `index`, padding with placeholders as needed.
    /// An id held by another slot is moved here and its old slot cleared.
    fn set(&mut self, index: usize, id: &str) {
        if id.is_empty() {
            return;
        }
        if let Some(previous) = self.position(id) {
            if previous == index {
                return;
            }
            self.ids[previous].clear();
        }
        if self.ids.len() <= index {
            self.ids.resize(index + 1, String::new());
        }
        let old = std::mem::replace(&mut self.ids[index], id.to_string());
        if !old.is_empty() {
            self.positions.remove(&old);
        }
        self.positions.insert(id.to_string(), index);
    }

    fn pad_to(&mut self, len: usize) {
        if self.ids.len() < len {
            self.ids.resize(len, String::new());
        }
    }

    fn rebuild(&mut self, ids: Vec<String>) {
        self.positions = ids
            .iter()
            .enumerate()
            .filter(|(_, id)| !id.is_empty())
            .map(|(i, id)| (id.clone(), i))
            .collect();
        self.ids = ids;
    }
}

#[derive(Debug, Default, Clone)]
pub struct IdentityIndex {
    todoist: IdColumn,
    notion: IdColumn,
}

impl IdentityIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of positions in use (the longer of the two columns).
    pub fn len(&self) -> usize {
        self.todoist.len().max(self.notion.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn todoist_ids(&self) -> &[String] {
        self.todoist.as_slice()
    }

    pub fn notion_ids(&self) -> &[String] {
        self.notion.as_slice()
    }

    pub fn todoist_at(&self, index: usize) -> Option<&str> {
        self.todoist.get(index)
    }

    pub fn notion_at(&self, index: usize) -> Option<&str> {
        self.notion.get(index)
    }

    /// Position of a Todoist id, registering it at the end if unseen.
    pub fn todoist_index_of(&mut self, id: &str) -> usize {
        if let Some(i) = self.todoist.position(id) {
            return i;
        }
        let end = self.len();
        self.todoist.set(end, id);
        end
    }

    /// Position of a Notion page id, registering it at the end if unseen.
    pub fn notion_index_of(&mut self, id: &str) -> usize {
        if let Some(i) = self.notion.position(id) {
            return i;
        }
        let end = self.len();
        self.notion.set(end, id);
        end
    }

    /// Record that `todoist_id` and `notion_id` are the same task.
    ///
    /// Reuses whichever position already knows one of the ids, preferring
    /// the Todoist side, and appends a fresh position when neither is known.
    ///
    /// If both ids already sit at different positions, the page id moves to
    /// the task's position and its old slot becomes a placeholder. This is
    /// the only way a registered Notion id changes position outside of
    /// [`reorder_by`](Self::reorder_by). Todoist ids never move here.
    pub fn pair(&mut self, todoist_id: &str, notion_id: &str) -> usize {
        match (self.todoist.position(todoist_id), self.notion.position(notion_id)) {
            (Some(i), Some(j)) if i == j => i,
            (Some(i), other) => {
                if let Some(j) = other {
                    log::debug!(
                        "re-pairing page {notion_id} from position {j} to {i} (task {todoist_id})"
                    );
                }
                self.notion.set(i, notion_id);
                i
            }
            (None, Some(j)) => {
                self.todoist.set(j, todoist_id);
                j
            }
            (None, None) => {
                let end = self.len();
                self.todoist.set(end, todoist_id);
                self.notion.set(end, notion_id);
                end
            }
        }
    }

    pub fn notion_for_todoist(&self, todoist_id: &str) -> Option<&str> {
        self.todoist
            .position(todoist_id)
            .and_then(|i| self.notion.get(i))
    }

    pub fn todoist_for_notion(&self, notion_id: &str) -> Option<&str> {
        self.notion
            .position(notion_id)
            .and_then(|i| self.todoist.get(i))
    }

    /// Iterate `(position, todoist id, notion id)` over every position.
    pub fn entries(&self) -> impl Iterator<Item = (usize, Option<&str>, Option<&str>)> + '_ {
        (0..self.len()).map(move |i| (i, self.todoist.get(i), self.notion.get(i)))
    }

    /// Number of positions where both ids are known.
    pub fn paired_count(&self) -> usize {
        self.entries()
            .filter(|(_, t, n)| t.is_some() && n.is_some())
            .count()
    }

    /// Reorder positions by `keys` (one per position), moving both
    /// columns together so pairings survive. Returns the swap count.
    pub fn reorder_by<K: Ord>(&mut self, keys: Vec<K>) -> usize {
        let len = self.len();
        debug_assert_eq!(keys.len(), len, "one key per index position");
        if keys.len() != len {
            log::warn!(
                "identity index reorder skipped: {} keys for {len} positions",
                keys.len()
            );
            return 0;
        }

        self.todoist.pad_to(len);
        self.notion.pad_to(len);
        let todoist = std::mem::take(&mut self.todoist.ids);
        let notion = std::mem::take(&mut self.notion.ids);
        let mut rows: Vec<(K, String, String)> = keys
            .into_iter()
            .zip(todoist)
            .zip(notion)
            .map(|((k, t), n)| (k, t, n))
            .collect();

        let swaps = exchange_sort_by(&mut rows, |a, b| a.0 > b.0);

        let (todoist, notion): (Vec<String>, Vec<String>) =
            rows.into_iter().map(|(_, t, n)| (t, n)).unzip();
        self.todoist.rebuild(todoist);
        self.notion.rebuild(notion);
        swaps
    }
}
