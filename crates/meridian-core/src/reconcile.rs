//! Mapping repair after a classification pass.
//!
//! A persisted mapping may have been produced against an earlier
//! revision of the diagram, or edited by hand in an exported file. The
//! reconciler filters every category down to identifiers that are
//! well-formed, known to the current pass, not noise, and not already
//! kept (earlier in the same category or in an earlier category).

use std::collections::HashSet;

use crate::mapping::Mapping;
use crate::types::SegmentId;

/// Output of [`reconcile`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciled {
    /// The repaired mapping.
    pub mapping: Mapping,
    /// `true` if any category was altered.
    pub changed: bool,
}

/// Repair `mapping` against the identifiers of the current pass.
///
/// First occurrence wins: a duplicate inside one category, or an
/// identifier already kept by an earlier category (in enumeration
/// order), is dropped. Running the reconciler on its own output never
/// reports a change.
///
/// # Examples
///
/// ```
/// use std::collections::HashSet;
/// use meridian_core::{Category, Mapping, MappingMode, SegmentId, reconcile};
///
/// let known: HashSet<SegmentId> = (0..3).map(SegmentId::from_index).collect();
/// let noise: HashSet<SegmentId> = [SegmentId::from_index(1)].into_iter().collect();
///
/// let stale = Mapping::from_entries(
///     MappingMode::Principal,
///     [(Category::Lung, vec!["s0".into(), "s1".into(), "s0".into(), "s9".into()])],
/// );
/// let repaired = reconcile(&stale, &known, &noise);
/// assert!(repaired.changed);
/// assert_eq!(repaired.mapping.get(Category::Lung), [SegmentId::from_index(0)]);
/// ```
#[must_use]
pub fn reconcile(
    mapping: &Mapping,
    known: &HashSet<SegmentId>,
    noise: &HashSet<SegmentId>,
) -> Reconciled {
    let mut kept: HashSet<&SegmentId> = HashSet::new();
    let mut changed = false;

    let entries: Vec<_> = mapping
        .iter()
        .map(|(category, ids)| {
            let filtered: Vec<SegmentId> = ids
                .iter()
                .filter(|id| {
                    id.is_well_formed()
                        && !noise.contains(*id)
                        && known.contains(*id)
                        && kept.insert(*id)
                })
                .cloned()
                .collect();
            changed |= filtered.len() != ids.len();
            (category, filtered)
        })
        .collect();

    if changed {
        let dropped = mapping.total() - entries.iter().map(|(_, ids)| ids.len()).sum::<usize>();
        tracing::debug!(mode = %mapping.mode(), dropped, "reconciled mapping");
    }

    Reconciled {
        mapping: Mapping::from_entries(mapping.mode(), entries),
        changed,
    }
}
