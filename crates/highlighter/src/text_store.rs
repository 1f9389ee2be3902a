//
// text_store.rs
//
// Open document contents, kept in sync through textDocument notifications
//

use std::borrow::Cow;
use std::collections::HashMap;

use ropey::Rope;
use tower_lsp::lsp_types::{TextDocumentContentChangeEvent, Url};

use crate::highlight::DocumentId;
use crate::utf16;

#[derive(Debug, Clone)]
pub struct OpenDocument {
    pub uri: Url,
    pub contents: Rope,
    pub version: i32,
}

impl OpenDocument {
    pub fn new(uri: Url, text: &str, version: i32) -> Self {
        Self {
            uri,
            contents: Rope::from_str(text),
            version,
        }
    }

    /// Apply one content change. Ranged changes are applied in place, a
    /// change without range replaces the whole text.
    pub fn apply_change(&mut self, change: TextDocumentContentChangeEvent) {
        let Some(range) = change.range else {
            self.contents = Rope::from_str(&change.text);
            return;
        };

        let last_line = self.contents.len_lines().saturating_sub(1);
        let start_line = (range.start.line as usize).min(last_line);
        let end_line = (range.end.line as usize).min(last_line);
        let start_text: Cow<str> = self.contents.line(start_line).into();
        let end_text: Cow<str> = self.contents.line(end_line).into();

        let start_idx = self.contents.line_to_char(start_line)
            + utf16::char_offset(&start_text, range.start.character as usize);
        let end_idx = self.contents.line_to_char(end_line)
            + utf16::char_offset(&end_text, range.end.character as usize);
        let end_idx = end_idx.max(start_idx);

        self.contents.remove(start_idx..end_idx);
        self.contents.insert(start_idx, &change.text);
    }

    /// UTF-16 length of 1-based `line`, terminator excluded.
    pub fn line_length(&self, line: u32) -> Option<u32> {
        let index = usize::try_from(line.checked_sub(1)?).ok()?;
        if index >= self.contents.len_lines() {
            return None;
        }
        let text: Cow<str> = self.contents.line(index).into();
        Some(utf16::line_length(&text))
    }
}

/// Documents the client has open, keyed by canonical id.
#[derive(Debug, Default)]
pub struct TextStore {
    documents: HashMap<DocumentId, OpenDocument>,
}

impl TextStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self, uri: Url, text: &str, version: i32) -> DocumentId {
        let id = DocumentId::from_url(&uri);
        log::trace!("Opened {} (version {})", id, version);
        self.documents
            .insert(id.clone(), OpenDocument::new(uri, text, version));
        id
    }

    /// Apply edits to an open document. Returns its id, or `None` when the
    /// document was never opened.
    pub fn update(
        &mut self,
        uri: &Url,
        version: i32,
        changes: Vec<TextDocumentContentChangeEvent>,
    ) -> Option<DocumentId> {
        let id = DocumentId::from_url(uri);
        let Some(document) = self.documents.get_mut(&id) else {
            log::warn!("Change for {} which is not open", uri);
            return None;
        };
        for change in changes {
            document.apply_change(change);
        }
        document.version = version;
        Some(id)
    }

    pub fn close(&mut self, uri: &Url) -> Option<DocumentId> {
        let id = DocumentId::from_url(uri);
        self.documents.remove(&id).map(|_| id)
    }

    pub fn get(&self, document: &DocumentId) -> Option<&OpenDocument> {
        self.documents.get(document)
    }

    pub fn line_length(&self, document: &DocumentId, line: u32) -> Option<u32> {
        self.documents.get(document)?.line_length(line)
    }

    /// URI to address `document` with. Open documents keep the URI the client
    /// used; other paths become `file:` URIs.
    pub fn uri_for(&self, document: &DocumentId) -> Option<Url> {
        match self.documents.get(document) {
            Some(open) => Some(open.uri.clone()),
            None => Url::from_file_path(document.as_str()).ok(),
        }
    }

    pub fn ids(&self) -> impl Iterator<Item = &DocumentId> {
        self.documents.keys()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}
