//
// dispatcher.rs
//
// The single mutation path into the highlight registry
//

use std::path::PathBuf;
use std::sync::Arc;

use crate::connection::{ConnectionEvent, ConnectionState, ConnectionTracker};
use crate::decorations::DecorationSynchronizer;
use crate::editor::{Editor, NoticeLevel, Shell};
use crate::highlight::{parse_line_number, DocumentId, LOCAL_AUTHOR};
use crate::projection::{project, FileNode};
use crate::registry::{HighlightRegistry, RetentionPolicy};
use crate::workspace;

/// Settings the dispatcher can pick up at runtime.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatcherSettings {
    pub retention: RetentionPolicy,
    /// Workspace folders used to shorten tree labels.
    pub workspace_roots: Vec<PathBuf>,
}

/// Everything that can reach the registry, plus the read-only snapshots.
///
/// Inputs that need user interaction or I/O are resolved before they become
/// an intent, so handling one never suspends.
#[derive(Debug)]
pub enum Intent {
    /// Line typed into the local prompt; applies to the active document.
    LocalHighlight { line: Option<String> },
    /// `highlight` notification from the command source.
    RemoteHighlight {
        line: Option<String>,
        author: Option<String>,
    },
    /// `unhighlight` notification; `file_hint` is matched by substring.
    RemoteUnhighlight {
        line: Option<String>,
        file_hint: Option<String>,
    },
    /// Exact removal, e.g. chosen from the picker.
    Unhighlight { document: DocumentId, line: u32 },
    /// Removal of a whole tree node. Publishes the tree once at the end.
    TreeRemoval {
        document: DocumentId,
        lines: Vec<u32>,
    },
    UnhighlightAll,
    FocusChanged { active: Option<DocumentId> },
    DocumentEdited { document: DocumentId },
    Connection(ConnectionEvent),
    Configure(DispatcherSettings),
    RefreshProjection,
    PickerEntries,
    Projection,
    ConnectionStatus,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The registry changed.
    Applied,
    /// Nothing to do, or a view-only intent.
    Unchanged,
    /// Input was refused; the user has been told why.
    Rejected,
    PickerEntries(Vec<String>),
    Projection(Vec<FileNode>),
    /// `attempt` numbers the latest accepted start; outcomes of that start
    /// must quote it.
    Connection {
        state: ConnectionState,
        changed: bool,
        attempt: u64,
    },
}

/// Owns the registry and applies intents to it one at a time.
pub struct Dispatcher {
    registry: HighlightRegistry,
    decorations: DecorationSynchronizer,
    connection: ConnectionTracker,
    workspace_roots: Vec<PathBuf>,
    editor: Arc<dyn Editor>,
    shell: Arc<dyn Shell>,
}

impl Dispatcher {
    pub fn new(editor: Arc<dyn Editor>, shell: Arc<dyn Shell>, settings: DispatcherSettings) -> Self {
        let active = editor.active_document();
        Self {
            registry: HighlightRegistry::new(settings.retention),
            decorations: DecorationSynchronizer::new(active),
            connection: ConnectionTracker::default(),
            workspace_roots: settings.workspace_roots,
            editor,
            shell,
        }
    }

    pub fn registry(&self) -> &HighlightRegistry {
        &self.registry
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection.state()
    }

    pub fn active_document(&self) -> Option<&DocumentId> {
        self.decorations.active()
    }

    pub fn dispatch(&mut self, intent: Intent) -> Outcome {
        log::trace!("Dispatching {:?}", intent);
        match intent {
            Intent::LocalHighlight { line } => self.local_highlight(line.as_deref()),
            Intent::RemoteHighlight { line, author } => {
                self.remote_highlight(line.as_deref(), author)
            }
            Intent::RemoteUnhighlight { line, file_hint } => {
                self.remote_unhighlight(line.as_deref(), file_hint.as_deref())
            }
            Intent::Unhighlight { document, line } => self.remove_highlight(&document, line, false),
            Intent::TreeRemoval { document, lines } => self.tree_removal(&document, &lines),
            Intent::UnhighlightAll => self.unhighlight_all(),
            Intent::FocusChanged { active } => {
                self.decorations.set_active(active);
                self.decorations
                    .refresh_active(&self.registry, self.editor.as_ref());
                Outcome::Unchanged
            }
            Intent::DocumentEdited { document } => {
                if self.decorations.is_active(&document) {
                    DecorationSynchronizer::refresh(&self.registry, &document, self.editor.as_ref());
                }
                Outcome::Unchanged
            }
            Intent::Connection(event) => self.connection_event(event),
            Intent::Configure(settings) => {
                self.registry.set_retention(settings.retention);
                self.workspace_roots = settings.workspace_roots;
                self.publish_projection();
                Outcome::Unchanged
            }
            Intent::RefreshProjection => {
                self.publish_projection();
                Outcome::Unchanged
            }
            Intent::PickerEntries => Outcome::PickerEntries(self.registry.picker_entries()),
            Intent::Projection => Outcome::Projection(self.projection()),
            Intent::ConnectionStatus => self.connection_outcome(false),
        }
    }

    /// First document with highlights whose path contains `hint`.
    ///
    /// Registry order decides ties, so two open files sharing a suffix
    /// resolve to the one highlighted first. Empty sets kept by the deferred
    /// policy never match.
    pub fn resolve_hint(&self, hint: &str) -> Option<DocumentId> {
        self.registry.documents().find(|doc| doc.contains(hint)).cloned()
    }

    pub fn projection(&self) -> Vec<FileNode> {
        project(&self.registry, &self.workspace_roots)
    }

    fn local_highlight(&mut self, line: Option<&str>) -> Outcome {
        let Some(text) = line.map(str::trim).filter(|text| !text.is_empty()) else {
            return Outcome::Unchanged;
        };
        let Some(line) = parse_line_number(text) else {
            log::warn!("Ignoring local highlight with invalid line {:?}", text);
            self.shell.notify(
                NoticeLevel::Warning,
                &format!("'{text}' is not a valid line number"),
            );
            return Outcome::Rejected;
        };
        let Some(document) = self.decorations.active().cloned() else {
            log::trace!("No active document, ignoring local highlight of line {}", line);
            return Outcome::Unchanged;
        };
        self.add_highlight(document, line, LOCAL_AUTHOR)
    }

    fn remote_highlight(&mut self, line: Option<&str>, author: Option<String>) -> Outcome {
        let Some(line) = self.require_remote_line(line, "highlight") else {
            return Outcome::Rejected;
        };
        let Some(document) = self.decorations.active().cloned() else {
            log::warn!("Remote highlight of line {} dropped: no active document", line);
            self.shell.notify(
                NoticeLevel::Warning,
                "A file was not found to perform the highlight",
            );
            return Outcome::Rejected;
        };
        let author = author
            .filter(|author| !author.is_empty())
            .unwrap_or_else(|| LOCAL_AUTHOR.to_string());
        self.add_highlight(document, line, &author)
    }

    fn remote_unhighlight(&mut self, line: Option<&str>, file_hint: Option<&str>) -> Outcome {
        let Some(line) = self.require_remote_line(line, "unhighlight") else {
            return Outcome::Rejected;
        };
        let document = match file_hint.filter(|hint| !hint.is_empty()) {
            None => self.decorations.active().cloned(),
            Some(hint) => self.resolve_hint(hint),
        };
        let Some(document) = document else {
            log::warn!(
                "Remote unhighlight of line {} dropped: no document matches {:?}",
                line,
                file_hint
            );
            self.shell.notify(
                NoticeLevel::Warning,
                "A file was not found to perform the unhighlight",
            );
            return Outcome::Rejected;
        };
        self.remove_highlight(&document, line, false)
    }

    fn require_remote_line(&self, line: Option<&str>, action: &str) -> Option<u32> {
        let Some(text) = line.map(str::trim).filter(|text| !text.is_empty()) else {
            log::warn!("Remote {} without a line number", action);
            self.shell.notify(
                NoticeLevel::Warning,
                &format!("A line number was not provided to {action}"),
            );
            return None;
        };
        let parsed = parse_line_number(text);
        if parsed.is_none() {
            log::warn!("Remote {} with invalid line {:?}", action, text);
            self.shell.notify(
                NoticeLevel::Warning,
                &format!("'{text}' is not a valid line number to {action}"),
            );
        }
        parsed
    }

    fn add_highlight(&mut self, document: DocumentId, line: u32, author: &str) -> Outcome {
        let Some(line_length) = self.editor.line_length(&document, line) else {
            log::warn!("Line {} is outside of {}", line, document);
            self.shell.notify(
                NoticeLevel::Warning,
                &format!(
                    "Line {line} does not exist in {}",
                    workspace::relative_label(&document, &self.workspace_roots)
                ),
            );
            return Outcome::Rejected;
        };

        self.registry
            .get_or_create(&document)
            .add(line, author, line_length);
        log::info!("Highlighted line {} of {} for {}", line, document, author);
        self.after_mutation(&document, false);
        Outcome::Applied
    }

    /// Remove one highlight. With `defer_projection` the tree is not
    /// republished; the caller owes one final publish.
    fn remove_highlight(&mut self, document: &DocumentId, line: u32, defer_projection: bool) -> Outcome {
        match self.registry.remove(document, line) {
            None => {
                log::warn!(
                    "Highlight not found, can't unhighlight line {} from {}",
                    line,
                    document
                );
                Outcome::Unchanged
            }
            Some(false) => {
                log::trace!("Line {} of {} was not highlighted", line, document);
                Outcome::Unchanged
            }
            Some(true) => {
                log::info!("Removed highlight on line {} of {}", line, document);
                self.after_mutation(document, defer_projection);
                Outcome::Applied
            }
        }
    }

    fn tree_removal(&mut self, document: &DocumentId, lines: &[u32]) -> Outcome {
        let removed = lines
            .iter()
            .filter(|line| self.remove_highlight(document, **line, true) == Outcome::Applied)
            .count();
        self.publish_projection();
        if removed == 0 {
            Outcome::Unchanged
        } else {
            Outcome::Applied
        }
    }

    fn unhighlight_all(&mut self) -> Outcome {
        let mut documents = self.editor.visible_documents();
        for document in self.registry.documents() {
            if !documents.contains(document) {
                documents.push(document.clone());
            }
        }
        DecorationSynchronizer::clear_all(&documents, self.editor.as_ref());

        log::info!(
            "Removing all {} highlights",
            self.registry.highlight_count()
        );
        self.registry.clear();
        self.publish_projection();
        Outcome::Applied
    }

    fn connection_event(&mut self, event: ConnectionEvent) -> Outcome {
        let previous = self.connection.state();
        let Some(next) = self.connection.apply(event) else {
            if event.attempt().is_some_and(|attempt| attempt != self.connection.attempt()) {
                log::warn!(
                    "Ignoring {:?} from a superseded start (current attempt {})",
                    event,
                    self.connection.attempt()
                );
            } else {
                log::trace!("Ignoring {:?} while {:?}", event, previous);
            }
            if event == ConnectionEvent::StartRequested {
                self.shell.set_status(previous);
            }
            return self.connection_outcome(false);
        };

        log::info!("Chat connection {:?} -> {:?}", previous, next);
        self.shell.set_status(next);
        if next == ConnectionState::Disconnected {
            self.registry.prune_empty();
        }
        self.connection_outcome(true)
    }

    fn connection_outcome(&self, changed: bool) -> Outcome {
        Outcome::Connection {
            state: self.connection.state(),
            changed,
            attempt: self.connection.attempt(),
        }
    }

    /// Refresh views after the set for `document` changed.
    ///
    /// Decorations go to `document` when it is active and also when it is
    /// only visible, e.g. in a split editor, so a remote unhighlight aimed at
    /// a background pane by file name clears it too. They are pushed before
    /// the retention sweep so a set that just became empty still clears what
    /// the editor shows.
    fn after_mutation(&mut self, document: &DocumentId, defer_projection: bool) {
        if self.decorations.is_active(document)
            || self.editor.visible_documents().contains(document)
        {
            DecorationSynchronizer::refresh(&self.registry, document, self.editor.as_ref());
        }
        self.registry.sweep(document);
        if !defer_projection {
            self.publish_projection();
        }
    }

    fn publish_projection(&self) {
        let tree = self.projection();
        self.shell.publish_projection(&tree);
    }
}
