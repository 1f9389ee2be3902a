//
// decorations.rs
//
// Keeps editor decorations in step with the registry
//

use crate::editor::Editor;
use crate::highlight::DocumentId;
use crate::registry::HighlightRegistry;

/// Pushes full decoration lists to the editor.
///
/// The only state is which document is active; everything else is read
/// from the registry at refresh time.
#[derive(Debug, Default)]
pub struct DecorationSynchronizer {
    active: Option<DocumentId>,
}

impl DecorationSynchronizer {
    pub fn new(active: Option<DocumentId>) -> Self {
        Self { active }
    }

    pub fn active(&self) -> Option<&DocumentId> {
        self.active.as_ref()
    }

    pub fn set_active(&mut self, active: Option<DocumentId>) {
        self.active = active;
    }

    pub fn is_active(&self, document: &DocumentId) -> bool {
        self.active.as_ref() == Some(document)
    }

    /// Replace the decorations of `document` with what the registry holds.
    ///
    /// A document the registry does not track is left alone, so whatever it
    /// shows stays. Returns whether anything was pushed.
    pub fn refresh(
        registry: &HighlightRegistry,
        document: &DocumentId,
        editor: &dyn Editor,
    ) -> bool {
        let Some(set) = registry.find(document) else {
            return false;
        };
        let decorations = set.renderable_decorations();
        log::trace!(
            "Setting {} decorations on {}",
            decorations.len(),
            document
        );
        editor.set_decorations(document, decorations);
        true
    }

    pub fn refresh_active(&self, registry: &HighlightRegistry, editor: &dyn Editor) -> bool {
        match &self.active {
            Some(active) => Self::refresh(registry, active, editor),
            None => false,
        }
    }

    /// Wipe decorations on every listed document.
    pub fn clear_all<'a>(documents: impl IntoIterator<Item = &'a DocumentId>, editor: &dyn Editor) {
        for document in documents {
            editor.set_decorations(document, Vec::new());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::highlight::LOCAL_AUTHOR;
    use crate::test_utils::FakeEditor;

    #[test]
    fn test_refresh_pushes_full_set() {
        let editor = FakeEditor::new();
        let doc = editor.open("/a/b.txt", "one\ntwo\nthree\n");
        let mut registry = HighlightRegistry::default();
        registry.get_or_create(&doc).add(1, LOCAL_AUTHOR, 3);
        registry.get_or_create(&doc).add(3, "viewer", 5);

        assert!(DecorationSynchronizer::refresh(&registry, &doc, &editor));
        let shown = editor.decorations(&doc).unwrap();
        assert_eq!(shown.len(), 2);
        assert_eq!(shown[1].hover_message, "From @viewer");
    }

    #[test]
    fn test_refresh_leaves_untracked_document_alone() {
        let editor = FakeEditor::new();
        let doc = editor.open("/a/b.txt", "x\n");
        let registry = HighlightRegistry::default();

        assert!(!DecorationSynchronizer::refresh(&registry, &doc, &editor));
        assert!(editor.decorations(&doc).is_none());
    }

    #[test]
    fn test_refresh_active_uses_memo() {
        let editor = FakeEditor::new();
        let a = editor.open("/a.txt", "x\n");
        let b = editor.open("/b.txt", "y\n");
        let mut registry = HighlightRegistry::default();
        registry.get_or_create(&a).add(1, LOCAL_AUTHOR, 1);
        registry.get_or_create(&b).add(1, LOCAL_AUTHOR, 1);

        let mut sync = DecorationSynchronizer::default();
        assert!(!sync.refresh_active(&registry, &editor));

        sync.set_active(Some(b.clone()));
        assert!(sync.is_active(&b));
        assert!(sync.refresh_active(&registry, &editor));
        assert!(editor.decorations(&a).is_none());
        assert_eq!(editor.decorations(&b).unwrap().len(), 1);
    }

    #[test]
    fn test_clear_all() {
        let editor = FakeEditor::new();
        let a = editor.open("/a.txt", "x\n");
        let mut registry = HighlightRegistry::default();
        registry.get_or_create(&a).add(1, LOCAL_AUTHOR, 1);
        DecorationSynchronizer::refresh(&registry, &a, &editor);

        DecorationSynchronizer::clear_all([&a], &editor);
        assert_eq!(editor.decorations(&a), Some(Vec::new()));
    }
}
