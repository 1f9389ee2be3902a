//
// registry.rs
//
// Process-wide collection of per-document highlight sets
//

use indexmap::IndexMap;

use crate::document_set::DocumentHighlightSet;
use crate::highlight::DocumentId;

/// When an emptied document set is dropped from the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetentionPolicy {
    /// Drop the set as soon as its last highlight goes away.
    #[default]
    Eager,
    /// Keep empty sets until [`HighlightRegistry::prune_empty`] or `clear`.
    /// Avoids churn when a chat burst removes and re-adds lines.
    Deferred,
}

/// Single source of truth for every highlight, keyed by document.
///
/// Documents are enumerated in the order their first highlight arrived,
/// which is the order remote file-name hints are matched against.
#[derive(Debug, Default)]
pub struct HighlightRegistry {
    sets: IndexMap<DocumentId, DocumentHighlightSet>,
    retention: RetentionPolicy,
}

impl HighlightRegistry {
    pub fn new(retention: RetentionPolicy) -> Self {
        Self {
            sets: IndexMap::new(),
            retention,
        }
    }

    pub fn retention(&self) -> RetentionPolicy {
        self.retention
    }

    /// Switch policy. Moving to `Eager` drops empty sets that were being kept.
    pub fn set_retention(&mut self, retention: RetentionPolicy) {
        self.retention = retention;
        if retention == RetentionPolicy::Eager {
            self.prune_empty();
        }
    }

    /// Set for `document`, created at the end of the registry order if missing.
    ///
    /// A retained empty set counts as missing: it moves to the end, exactly
    /// where an eagerly dropped set would be re-created.
    pub fn get_or_create(&mut self, document: &DocumentId) -> &mut DocumentHighlightSet {
        if self.sets.get(document).is_some_and(DocumentHighlightSet::is_empty) {
            if let Some((key, set)) = self.sets.shift_remove_entry(document) {
                self.sets.insert(key, set);
            }
        }
        self.sets
            .entry(document.clone())
            .or_insert_with(|| DocumentHighlightSet::new(document.clone()))
    }

    pub fn find(&self, document: &DocumentId) -> Option<&DocumentHighlightSet> {
        self.sets.get(document)
    }

    /// Remove the highlight on `line`.
    ///
    /// `None` means the registry has never tracked `document` (or already
    /// dropped it). The emptied set is left in place; call
    /// [`HighlightRegistry::sweep`] once any views have been refreshed.
    pub fn remove(&mut self, document: &DocumentId, line: u32) -> Option<bool> {
        self.sets.get_mut(document).map(|set| set.remove(line))
    }

    /// Apply the retention policy to one document.
    pub fn sweep(&mut self, document: &DocumentId) {
        if self.retention == RetentionPolicy::Deferred {
            return;
        }
        if self.sets.get(document).is_some_and(|set| set.is_empty()) {
            log::trace!("Dropping empty highlight set for {}", document);
            self.sets.shift_remove(document);
        }
    }

    /// Drop every empty set regardless of policy.
    pub fn prune_empty(&mut self) {
        self.sets.retain(|_, set| !set.is_empty());
    }

    /// All tracked sets in registry order, empty ones included.
    pub fn all_sets(&self) -> impl Iterator<Item = (&DocumentId, &DocumentHighlightSet)> + Clone {
        self.sets.iter()
    }

    /// Documents holding at least one highlight, in registry order.
    pub fn documents(&self) -> impl Iterator<Item = &DocumentId> + Clone {
        self.sets
            .iter()
            .filter(|(_, set)| !set.is_empty())
            .map(|(document, _)| document)
    }

    /// Total number of highlights across documents.
    pub fn highlight_count(&self) -> usize {
        self.sets.values().map(DocumentHighlightSet::len).sum()
    }

    pub fn picker_entries(&self) -> Vec<String> {
        self.sets
            .values()
            .flat_map(DocumentHighlightSet::picker_entries)
            .collect()
    }

    pub fn clear(&mut self) {
        self.sets.clear();
    }
}
