//
// projection.rs
//
// File-grouped tree view of the registry
//

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::highlight::{DocumentId, Highlight};
use crate::registry::HighlightRegistry;
use crate::workspace;

/// One file in the tree, with its highlighted lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileNode {
    pub document: DocumentId,
    pub label: String,
    pub highlights: Vec<HighlightNode>,
}

/// One highlighted line under a [`FileNode`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HighlightNode {
    pub line: u32,
    pub author: String,
    pub label: String,
}

impl From<&Highlight> for HighlightNode {
    fn from(highlight: &Highlight) -> Self {
        Self {
            line: highlight.line(),
            author: highlight.author().to_string(),
            label: format!("Line {}", highlight.line()),
        }
    }
}

impl FileNode {
    pub fn lines(&self) -> impl Iterator<Item = u32> + '_ {
        self.highlights.iter().map(|node| node.line)
    }
}

/// Build the tree for the current registry state.
///
/// Pure: files with no highlights are left out, files keep registry order
/// and lines are in ascending order.
pub fn project(registry: &HighlightRegistry, roots: &[PathBuf]) -> Vec<FileNode> {
    registry
        .all_sets()
        .filter(|(_, set)| !set.is_empty())
        .map(|(document, set)| FileNode {
            document: document.clone(),
            label: workspace::relative_label(document, roots),
            highlights: set.list().map(HighlightNode::from).collect(),
        })
        .collect()
}
