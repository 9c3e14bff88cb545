//! The category -> segment identifiers mapping.
//!
//! A [`Mapping`] always holds an entry for every category of its mode
//! (possibly empty). All edits are copy-on-write: every mutating
//! operation returns a new value and leaves `self` untouched, so callers
//! can keep the previous state around for comparison or rollback.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::category::{Category, MappingMode};
use crate::types::SegmentId;

/// Category -> ordered segment identifiers, for one mapping mode.
///
/// Insertion order inside a category is kept for display only;
/// membership has set semantics, and equality compares membership.
/// Toggling a present identifier off and on again moves it to the end
/// of its category but yields an equal mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mapping {
    mode: MappingMode,
    categories: BTreeMap<Category, Vec<SegmentId>>,
}

impl Mapping {
    /// A mapping with every category of `mode` empty.
    #[must_use]
    pub fn empty(mode: MappingMode) -> Self {
        Self {
            mode,
            categories: mode
                .categories()
                .iter()
                .map(|&c| (c, Vec::new()))
                .collect(),
        }
    }

    /// Build a mapping from raw entries.
    ///
    /// Categories outside `mode` are dropped and missing categories are
    /// filled in empty. The identifier lists are taken as-is; run the
    /// reconciler to enforce membership invariants.
    #[must_use]
    pub fn from_entries(
        mode: MappingMode,
        entries: impl IntoIterator<Item = (Category, Vec<SegmentId>)>,
    ) -> Self {
        let mut mapping = Self::empty(mode);
        for (category, ids) in entries {
            if let Some(slot) = mapping.categories.get_mut(&category) {
                *slot = ids;
            }
        }
        mapping
    }

    /// The mode this mapping belongs to.
    #[must_use]
    pub const fn mode(&self) -> MappingMode {
        self.mode
    }

    /// Identifiers assigned to `category` (empty if not in this mode).
    #[must_use]
    pub fn get(&self, category: Category) -> &[SegmentId] {
        self.categories.get(&category).map_or(&[], Vec::as_slice)
    }

    /// Iterate categories in enumeration order.
    pub fn iter(&self) -> impl Iterator<Item = (Category, &[SegmentId])> {
        self.categories.iter().map(|(c, ids)| (*c, ids.as_slice()))
    }

    /// The first category (in enumeration order) containing `id`.
    #[must_use]
    pub fn category_of(&self, id: &str) -> Option<Category> {
        self.categories
            .iter()
            .find(|(_, ids)| ids.iter().any(|i| i.as_str() == id))
            .map(|(c, _)| *c)
    }

    /// Total identifiers across all categories.
    #[must_use]
    pub fn total(&self) -> usize {
        self.categories.values().map(Vec::len).sum()
    }

    /// Returns `true` if no category has any identifier.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.categories.values().all(Vec::is_empty)
    }

    /// Remove `id` from `category` if present, otherwise append it.
    ///
    /// This is the single membership primitive: "add" and "remove" are
    /// its two outcomes. A category outside this mapping's mode leaves
    /// the mapping unchanged.
    ///
    /// # Examples
    ///
    /// ```
    /// use meridian_core::{Category, Mapping, MappingMode, SegmentId};
    ///
    /// let empty = Mapping::empty(MappingMode::Principal);
    /// let id = SegmentId::from_index(4);
    /// let added = empty.toggle(Category::Heart, &id);
    /// assert_eq!(added.get(Category::Heart), [id.clone()]);
    /// assert_eq!(added.toggle(Category::Heart, &id), empty);
    /// ```
    #[must_use]
    pub fn toggle(&self, category: Category, id: &SegmentId) -> Self {
        let mut next = self.clone();
        if let Some(ids) = next.categories.get_mut(&category) {
            if let Some(pos) = ids.iter().position(|i| i == id) {
                ids.remove(pos);
            } else {
                ids.push(id.clone());
            }
        }
        next
    }

    /// Toggle `id` in `category`, first removing it from every other
    /// category so it belongs to at most one.
    #[must_use]
    pub fn toggle_exclusive(&self, category: Category, id: &SegmentId) -> Self {
        if !self.mode.contains(category) {
            return self.clone();
        }
        let mut next = self.clone();
        for (other, ids) in &mut next.categories {
            if *other != category {
                ids.retain(|i| i != id);
            }
        }
        next.toggle(category, id)
    }

    /// A copy with every category reset to empty.
    #[must_use]
    pub fn clear(&self) -> Self {
        Self::empty(self.mode)
    }
}

impl PartialEq for Mapping {
    fn eq(&self, other: &Self) -> bool {
        let sorted = |ids: &[SegmentId]| {
            let mut ids = ids.to_vec();
            ids.sort_unstable();
            ids
        };
        self.mode == other.mode
            && self.categories.len() == other.categories.len()
            && self
                .categories
                .iter()
                .zip(&other.categories)
                .all(|((a, xs), (b, ys))| a == b && sorted(xs.as_slice()) == sorted(ys.as_slice()))
    }
}

impl Eq for Mapping {}
