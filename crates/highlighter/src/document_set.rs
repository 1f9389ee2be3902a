//
// document_set.rs
//
// All highlights for a single document
//

use std::collections::btree_map;
use std::collections::BTreeMap;
use std::iter::Cloned;

use crate::highlight::{DocumentId, Highlight, RenderPayload};

/// Highlights of one document, keyed by 1-based line.
///
/// Holds at most one highlight per line. Listing is ordered by line so it is
/// stable for any given state.
#[derive(Debug, Clone)]
pub struct DocumentHighlightSet {
    document: DocumentId,
    highlights: BTreeMap<u32, Highlight>,
}

impl DocumentHighlightSet {
    pub fn new(document: DocumentId) -> Self {
        Self {
            document,
            highlights: BTreeMap::new(),
        }
    }

    pub fn document(&self) -> &DocumentId {
        &self.document
    }

    /// Record a highlight, replacing whatever was on that line before.
    pub fn add(&mut self, line: u32, author: &str, line_length: u32) -> &Highlight {
        let highlight = Highlight::new(line, author, line_length);
        match self.highlights.entry(line) {
            btree_map::Entry::Occupied(mut entry) => {
                entry.insert(highlight);
                entry.into_mut()
            }
            btree_map::Entry::Vacant(entry) => entry.insert(highlight),
        }
    }

    /// Returns whether a highlight was on `line`.
    pub fn remove(&mut self, line: u32) -> bool {
        self.highlights.remove(&line).is_some()
    }

    pub fn remove_all(&mut self) {
        self.highlights.clear();
    }

    pub fn get(&self, line: u32) -> Option<&Highlight> {
        self.highlights.get(&line)
    }

    pub fn len(&self) -> usize {
        self.highlights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.highlights.is_empty()
    }

    /// Iterate the current highlights in line order.
    ///
    /// The iterator is `Clone`, so callers can walk it more than once
    /// without collecting.
    pub fn list(&self) -> btree_map::Values<'_, u32, Highlight> {
        self.highlights.values()
    }

    pub fn renderable_decorations(&self) -> Vec<RenderPayload> {
        self.list().map(|h| h.payload().clone()).collect()
    }

    /// `"<file>, <line>"` labels for the removal picker.
    pub fn picker_entries(&self) -> PickerEntries<'_> {
        PickerEntries {
            document: &self.document,
            lines: self.highlights.keys().cloned(),
        }
    }
}

/// Iterator returned by [`DocumentHighlightSet::picker_entries`].
pub struct PickerEntries<'a> {
    document: &'a DocumentId,
    lines: Cloned<btree_map::Keys<'a, u32, Highlight>>,
}

impl Iterator for PickerEntries<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        self.lines
            .next()
            .map(|line| picker_entry(self.document, line))
    }
}

pub fn picker_entry(document: &DocumentId, line: u32) -> String {
    format!("{document}, {line}")
}

/// Split a picker label back into its document and line.
///
/// Splits on the last `", "` so paths containing the separator survive.
pub fn parse_picker_entry(entry: &str) -> Option<(DocumentId, u32)> {
    let (file, line) = entry.rsplit_once(", ")?;
    if file.is_empty() {
        return None;
    }
    let line = crate::highlight::parse_line_number(line)?;
    Some((DocumentId::new(file), line))
}
