//
// editor.rs
//
// Boundaries to the editing surface and the UI shell around it
//

use async_trait::async_trait;

use crate::connection::ConnectionState;
use crate::highlight::{DocumentId, RenderPayload};
use crate::projection::FileNode;

/// Severity of a user-facing notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// The text editing surface.
///
/// The synchronous methods are called from inside the mutation path and must
/// not block; implementations queue any outbound work.
#[async_trait]
pub trait Editor: Send + Sync {
    /// Document that currently has focus, if any.
    fn active_document(&self) -> Option<DocumentId>;

    /// Documents currently shown in some editor.
    fn visible_documents(&self) -> Vec<DocumentId>;

    /// Length of 1-based `line` in UTF-16 code units, line terminator
    /// excluded. `None` when the document or the line does not exist.
    fn line_length(&self, document: &DocumentId, line: u32) -> Option<u32>;

    /// Replace the full decoration list shown for `document`.
    fn set_decorations(&self, document: &DocumentId, decorations: Vec<RenderPayload>);

    /// Find documents whose path ends with `name`.
    async fn find_files(&self, name: &str) -> anyhow::Result<Vec<DocumentId>>;

    /// Open `document` and scroll so that zero-based `line` is in view.
    async fn reveal(&self, document: &DocumentId, line: u32) -> anyhow::Result<()>;
}

/// Status, notices, prompts and the tree view.
#[async_trait]
pub trait Shell: Send + Sync {
    fn notify(&self, level: NoticeLevel, message: &str);

    fn set_status(&self, state: ConnectionState);

    fn publish_projection(&self, files: &[FileNode]);

    /// Ask for free text. `None` when dismissed.
    async fn prompt(&self, prompt: &str, password: bool) -> Option<String>;

    /// Ask the user to choose one of `items`. `None` when dismissed.
    async fn pick(&self, items: Vec<String>) -> Option<String>;
}
