//! Recording stand-ins for the editor, shell, credential vault and chat
//! listener. Every fake keeps its state behind a `Mutex` so tests can share
//! it with the dispatcher through an `Arc`.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use anyhow::{anyhow, bail};
use async_trait::async_trait;

use crate::connection::{ChatParams, CommandSource, ConnectionState};
use crate::editor::{Editor, NoticeLevel, Shell};
use crate::highlight::{DocumentId, RenderPayload};
use crate::projection::FileNode;
use crate::utf16;
use crate::vault::{CredentialKey, CredentialVault};
use crate::workspace;

// ---------------------------------------------------------------------------
// Editor
// ---------------------------------------------------------------------------

#[derive(Default)]
struct EditorState {
    texts: HashMap<DocumentId, String>,
    active: Option<DocumentId>,
    visible: Vec<DocumentId>,
    decorations: HashMap<DocumentId, Vec<RenderPayload>>,
    decoration_pushes: usize,
    revealed: Vec<(DocumentId, u32)>,
}

#[derive(Default)]
pub struct FakeEditor {
    state: Mutex<EditorState>,
}

impl FakeEditor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open `path` with `text` and show it.
    pub fn open(&self, path: &str, text: &str) -> DocumentId {
        let document = DocumentId::new(path);
        let mut state = self.state.lock().unwrap();
        state.texts.insert(document.clone(), text.to_string());
        if !state.visible.contains(&document) {
            state.visible.push(document.clone());
        }
        document
    }

    pub fn focus(&self, document: &DocumentId) {
        let mut state = self.state.lock().unwrap();
        state.active = Some(document.clone());
        if !state.visible.contains(document) {
            state.visible.push(document.clone());
        }
    }

    pub fn hide(&self, document: &DocumentId) {
        let mut state = self.state.lock().unwrap();
        state.visible.retain(|d| d != document);
        if state.active.as_ref() == Some(document) {
            state.active = None;
        }
    }

    pub fn decorations(&self, document: &DocumentId) -> Option<Vec<RenderPayload>> {
        self.state.lock().unwrap().decorations.get(document).cloned()
    }

    pub fn decoration_pushes(&self) -> usize {
        self.state.lock().unwrap().decoration_pushes
    }

    pub fn revealed(&self) -> Vec<(DocumentId, u32)> {
        self.state.lock().unwrap().revealed.clone()
    }
}

#[async_trait]
impl Editor for FakeEditor {
    fn active_document(&self) -> Option<DocumentId> {
        self.state.lock().unwrap().active.clone()
    }

    fn visible_documents(&self) -> Vec<DocumentId> {
        self.state.lock().unwrap().visible.clone()
    }

    fn line_length(&self, document: &DocumentId, line: u32) -> Option<u32> {
        let state = self.state.lock().unwrap();
        let text = state.texts.get(document)?;
        let index = usize::try_from(line.checked_sub(1)?).ok()?;
        text.lines().nth(index).map(utf16::line_length)
    }

    fn set_decorations(&self, document: &DocumentId, decorations: Vec<RenderPayload>) {
        let mut state = self.state.lock().unwrap();
        state.decoration_pushes += 1;
        state.decorations.insert(document.clone(), decorations);
    }

    async fn find_files(&self, name: &str) -> anyhow::Result<Vec<DocumentId>> {
        let state = self.state.lock().unwrap();
        let mut found: Vec<DocumentId> = state
            .texts
            .keys()
            .filter(|document| workspace::ends_with(document, name))
            .cloned()
            .collect();
        found.sort();
        Ok(found)
    }

    async fn reveal(&self, document: &DocumentId, line: u32) -> anyhow::Result<()> {
        let mut state = self.state.lock().unwrap();
        if !state.texts.contains_key(document) {
            bail!("{document} is not open");
        }
        state.revealed.push((document.clone(), line));
        state.active = Some(document.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Shell
// ---------------------------------------------------------------------------

#[derive(Default)]
struct ShellState {
    notices: Vec<(NoticeLevel, String)>,
    statuses: Vec<ConnectionState>,
    projections: Vec<Vec<FileNode>>,
    prompts: VecDeque<Option<String>>,
    picks: VecDeque<Option<String>>,
    offered: Vec<Vec<String>>,
    asked: Vec<(String, bool)>,
}

#[derive(Default)]
pub struct FakeShell {
    state: Mutex<ShellState>,
}

impl FakeShell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the answer for the next prompt. Unqueued prompts are dismissed.
    pub fn answer_prompt(&self, answer: Option<&str>) {
        self.state
            .lock()
            .unwrap()
            .prompts
            .push_back(answer.map(str::to_string));
    }

    /// Queue the choice for the next picker. Unqueued pickers are dismissed.
    pub fn answer_pick(&self, answer: Option<&str>) {
        self.state
            .lock()
            .unwrap()
            .picks
            .push_back(answer.map(str::to_string));
    }

    pub fn notices(&self) -> Vec<(NoticeLevel, String)> {
        self.state.lock().unwrap().notices.clone()
    }

    pub fn has_notice(&self, level: NoticeLevel, fragment: &str) -> bool {
        self.state
            .lock()
            .unwrap()
            .notices
            .iter()
            .any(|(l, message)| *l == level && message.contains(fragment))
    }

    pub fn statuses(&self) -> Vec<ConnectionState> {
        self.state.lock().unwrap().statuses.clone()
    }

    pub fn projection_count(&self) -> usize {
        self.state.lock().unwrap().projections.len()
    }

    pub fn last_projection(&self) -> Option<Vec<FileNode>> {
        self.state.lock().unwrap().projections.last().cloned()
    }

    /// Item lists shown in pickers so far.
    pub fn offered(&self) -> Vec<Vec<String>> {
        self.state.lock().unwrap().offered.clone()
    }

    /// Prompts shown so far, with their password flag.
    pub fn asked(&self) -> Vec<(String, bool)> {
        self.state.lock().unwrap().asked.clone()
    }
}

#[async_trait]
impl Shell for FakeShell {
    fn notify(&self, level: NoticeLevel, message: &str) {
        self.state
            .lock()
            .unwrap()
            .notices
            .push((level, message.to_string()));
    }

    fn set_status(&self, state: ConnectionState) {
        self.state.lock().unwrap().statuses.push(state);
    }

    fn publish_projection(&self, files: &[FileNode]) {
        self.state.lock().unwrap().projections.push(files.to_vec());
    }

    async fn prompt(&self, prompt: &str, password: bool) -> Option<String> {
        let mut state = self.state.lock().unwrap();
        state.asked.push((prompt.to_string(), password));
        state.prompts.pop_front().flatten()
    }

    async fn pick(&self, items: Vec<String>) -> Option<String> {
        let mut state = self.state.lock().unwrap();
        state.offered.push(items);
        state.picks.pop_front().flatten()
    }
}

// ---------------------------------------------------------------------------
// Credential vault
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryVault {
    values: Mutex<HashMap<CredentialKey, String>>,
    failure: Mutex<Option<String>>,
}

impl MemoryVault {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, key: CredentialKey, value: &str) -> Self {
        self.values.lock().unwrap().insert(key, value.to_string());
        self
    }

    /// Make every following operation fail with `message`.
    pub fn fail_with(&self, message: &str) {
        *self.failure.lock().unwrap() = Some(message.to_string());
    }

    pub fn value(&self, key: CredentialKey) -> Option<String> {
        self.values.lock().unwrap().get(&key).cloned()
    }

    fn check(&self) -> anyhow::Result<()> {
        match self.failure.lock().unwrap().as_deref() {
            Some(message) => Err(anyhow!("{message}")),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl CredentialVault for MemoryVault {
    async fn get(&self, key: CredentialKey) -> anyhow::Result<Option<String>> {
        self.check()?;
        Ok(self.value(key))
    }

    async fn set(&self, key: CredentialKey, value: &str) -> anyhow::Result<()> {
        self.check()?;
        self.values.lock().unwrap().insert(key, value.to_string());
        Ok(())
    }

    async fn delete(&self, key: CredentialKey) -> anyhow::Result<()> {
        self.check()?;
        self.values.lock().unwrap().remove(&key);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Command source
// ---------------------------------------------------------------------------

#[derive(Default)]
struct SourceState {
    starts: Vec<ChatParams>,
    stops: usize,
    start_error: Option<String>,
    refuse_stop: bool,
}

#[derive(Default)]
pub struct ScriptedSource {
    state: Mutex<SourceState>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_start(&self, message: &str) {
        self.state.lock().unwrap().start_error = Some(message.to_string());
    }

    pub fn refuse_stop(&self) {
        self.state.lock().unwrap().refuse_stop = true;
    }

    pub fn starts(&self) -> Vec<ChatParams> {
        self.state.lock().unwrap().starts.clone()
    }

    pub fn stops(&self) -> usize {
        self.state.lock().unwrap().stops
    }
}

#[async_trait]
impl CommandSource for ScriptedSource {
    async fn start(&self, params: ChatParams) -> anyhow::Result<()> {
        let mut state = self.state.lock().unwrap();
        state.starts.push(params);
        match &state.start_error {
            Some(message) => Err(anyhow!("{message}")),
            None => Ok(()),
        }
    }

    async fn stop(&self) -> anyhow::Result<bool> {
        let mut state = self.state.lock().unwrap();
        state.stops += 1;
        Ok(!state.refuse_stop)
    }
}
