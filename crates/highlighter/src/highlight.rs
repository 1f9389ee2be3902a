//
// highlight.rs
//
// Highlight records and the document identity they are keyed by
//

use std::fmt;

use serde::{Deserialize, Serialize};
use tower_lsp::lsp_types::{Position, Range, Url};

/// Author recorded for highlights created from the local command surface.
pub const LOCAL_AUTHOR: &str = "self";

/// Canonical identity of a document (its file system path when it has one).
///
/// Matching is exact-string. Loose matching for remote callers lives in the
/// dispatcher and only ever uses [`DocumentId::contains`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(String);

impl DocumentId {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// Derive the canonical id for a document URI.
    ///
    /// `file:` URIs map to their platform path so ids line up with what the
    /// editor displays. Anything else (untitled buffers, virtual documents)
    /// keeps the URI text.
    pub fn from_url(uri: &Url) -> Self {
        match uri.to_file_path() {
            Ok(path) => Self(path.display().to_string()),
            Err(()) => Self(uri.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Substring test used to resolve file names supplied by remote callers.
    pub fn contains(&self, hint: &str) -> bool {
        self.0.contains(hint)
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What the editor needs to draw one highlight.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderPayload {
    pub range: Range,
    pub hover_message: String,
}

/// One highlighted line.
///
/// Immutable once built: a highlight that has to move is removed and a new
/// one is added.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Highlight {
    line: u32,
    author: String,
    payload: RenderPayload,
}

impl Highlight {
    /// Build a highlight for 1-based `line`.
    ///
    /// `line_length` is the length of the target line in UTF-16 code units;
    /// the decoration range covers the whole line.
    pub fn new(line: u32, author: impl Into<String>, line_length: u32) -> Self {
        let author = author.into();
        let zero_based = line.saturating_sub(1);
        let payload = RenderPayload {
            range: Range::new(
                Position::new(zero_based, 0),
                Position::new(zero_based, line_length),
            ),
            hover_message: hover_message(&author),
        };
        Self {
            line,
            author,
            payload,
        }
    }

    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn payload(&self) -> &RenderPayload {
        &self.payload
    }

    pub fn is_local(&self) -> bool {
        self.author == LOCAL_AUTHOR
    }
}

fn hover_message(author: &str) -> String {
    if author == LOCAL_AUTHOR {
        String::from("From @You")
    } else {
        format!("From @{author}")
    }
}

/// Parse a user- or chat-supplied line number.
///
/// Only positive integers are accepted; surrounding whitespace is ignored.
pub fn parse_line_number(text: &str) -> Option<u32> {
    text.trim().parse::<u32>().ok().filter(|line| *line > 0)
}
