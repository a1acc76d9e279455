//! The ordered work-item collection.

use super::WorkItem;
use crate::errors::DataIntegrityError;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::{HashMap, HashSet};

/// Insertion-ordered work items with unique ids.
///
/// Serializes as a plain JSON array. Positions are stable: items are never
/// removed or reordered, so a position taken before a fan-out still names the
/// same record after the barrier.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "Vec<WorkItem>")]
pub struct WorkCollection {
    items: Vec<WorkItem>,
    index: HashMap<String, usize>,
}

impl WorkCollection {
    /// Creates an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a collection, rejecting duplicate ids.
    pub fn from_items(items: Vec<WorkItem>) -> Result<Self, DataIntegrityError> {
        let mut collection = Self {
            items: Vec::with_capacity(items.len()),
            index: HashMap::with_capacity(items.len()),
        };
        for item in items {
            collection.push(item)?;
        }
        Ok(collection)
    }

    /// Appends an item.
    pub fn push(&mut self, item: WorkItem) -> Result<(), DataIntegrityError> {
        if self.index.contains_key(&item.id) {
            return Err(DataIntegrityError::DuplicateItem(item.id));
        }
        self.index.insert(item.id.clone(), self.items.len());
        self.items.push(item);
        Ok(())
    }

    /// Returns the number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Returns true if there are no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterates items in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, WorkItem> {
        self.items.iter()
    }

    /// Returns the items as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &[WorkItem] {
        &self.items
    }

    /// Looks up an item by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&WorkItem> {
        self.index.get(id).map(|&pos| &self.items[pos])
    }

    /// Looks up an item by id for mutation.
    pub fn get_mut(&mut self, id: &str) -> Option<&mut WorkItem> {
        match self.index.get(id) {
            Some(&pos) => self.items.get_mut(pos),
            None => None,
        }
    }

    /// Looks up an item by position.
    #[must_use]
    pub fn get_at(&self, position: usize) -> Option<&WorkItem> {
        self.items.get(position)
    }

    /// Looks up an item by position for mutation.
    pub fn get_mut_at(&mut self, position: usize) -> Option<&mut WorkItem> {
        self.items.get_mut(position)
    }

    /// Positions of all items matching `predicate`, in order.
    pub fn positions_where(&self, predicate: impl Fn(&WorkItem) -> bool) -> Vec<usize> {
        self.items
            .iter()
            .enumerate()
            .filter(|(_, item)| predicate(item))
            .map(|(pos, _)| pos)
            .collect()
    }

    /// Number of items matching `predicate`.
    pub fn count_where(&self, predicate: impl Fn(&WorkItem) -> bool) -> usize {
        self.items.iter().filter(|item| predicate(item)).count()
    }

    /// Checks the collection-wide labelling invariant.
    ///
    /// At least one item must carry a category, and within a category no label
    /// may repeat. Items without a label are not counted, so two unlabelled
    /// items in one category do not collide; they are never linked anyway.
    pub fn check_labels(&self) -> Result<(), DataIntegrityError> {
        let mut seen: HashMap<&str, HashSet<&str>> = HashMap::new();
        for item in &self.items {
            if let Some(category) = item.category.as_deref().filter(|c| !c.is_empty()) {
                seen.entry(category).or_default();
            }
        }
        if seen.is_empty() {
            return Err(DataIntegrityError::NoCategories);
        }

        for item in &self.items {
            let (Some(category), Some(label)) = (item.category.as_deref(), item.label.as_deref())
            else {
                continue;
            };
            let Some(labels) = seen.get_mut(category) else {
                continue;
            };
            if !labels.insert(label) {
                return Err(DataIntegrityError::DuplicateLabel {
                    category: category.to_string(),
                    label: label.to_string(),
                });
            }
        }
        Ok(())
    }
}

impl TryFrom<Vec<WorkItem>> for WorkCollection {
    type Error = DataIntegrityError;

    fn try_from(items: Vec<WorkItem>) -> Result<Self, Self::Error> {
        Self::from_items(items)
    }
}

impl Serialize for WorkCollection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.items.serialize(serializer)
    }
}

impl<'a> IntoIterator for &'a WorkCollection {
    type Item = &'a WorkItem;
    type IntoIter = std::slice::Iter<'a, WorkItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
