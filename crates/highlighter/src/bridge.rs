//
// bridge.rs
//
// Editor, shell and chat listener implemented over the LSP client connection
//

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{anyhow, bail, Context};
use async_trait::async_trait;
use tokio::sync::mpsc;
use tower_lsp::lsp_types::{
    MessageActionItem, MessageType, Position, Range, ShowDocumentParams, Url,
};
use tower_lsp::Client;

use crate::connection::{ChatParams, CommandSource, ConnectionState};
use crate::editor::{Editor, NoticeLevel, Shell};
use crate::highlight::{DocumentId, RenderPayload};
use crate::projection::FileNode;
use crate::protocol::{
    SetDecorations, SetDecorationsParams, ShowInputBox, ShowInputBoxParams, StartChat, Status,
    StatusParams, StopChat, TreeChanged, TreeChangedParams,
};
use crate::text_store::TextStore;
use crate::workspace;

/// What the server knows about the client's editors.
#[derive(Debug, Default)]
pub struct EditorView {
    pub text: TextStore,
    pub active: Option<DocumentId>,
    pub visible: Vec<DocumentId>,
    pub roots: Vec<PathBuf>,
}

impl EditorView {
    /// Record a focus report. Returns the new active document.
    pub fn focus(&mut self, active: Option<&Url>, visible: &[Url]) -> Option<DocumentId> {
        self.active = active.map(DocumentId::from_url);
        self.visible = visible.iter().map(DocumentId::from_url).collect();
        if let Some(active) = &self.active {
            if !self.visible.contains(active) {
                self.visible.push(active.clone());
            }
        }
        self.active.clone()
    }

    /// Open documents whose path ends with `name`, sorted.
    pub fn open_matches(&self, name: &str) -> Vec<DocumentId> {
        let mut found: Vec<DocumentId> = self
            .text
            .ids()
            .filter(|document| workspace::ends_with(document, name))
            .cloned()
            .collect();
        found.sort();
        found
    }
}

/// Outbound notifications, delivered in the order they were queued.
#[derive(Debug)]
enum Outbound {
    Decorations(SetDecorationsParams),
    Status(StatusParams),
    Tree(TreeChangedParams),
    Message(MessageType, String),
}

pub struct LspBridge {
    client: Client,
    view: Arc<RwLock<EditorView>>,
    outbox: mpsc::UnboundedSender<Outbound>,
}

impl LspBridge {
    /// Must be called from within a tokio runtime; spawns the outbox task.
    pub fn new(client: Client) -> Self {
        let (outbox, rx) = mpsc::unbounded_channel();
        tokio::spawn(deliver(client.clone(), rx));
        Self {
            client,
            view: Arc::new(RwLock::new(EditorView::default())),
            outbox,
        }
    }

    pub fn view(&self) -> RwLockReadGuard<'_, EditorView> {
        self.view.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn view_mut(&self) -> RwLockWriteGuard<'_, EditorView> {
        self.view.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn send(&self, message: Outbound) {
        if self.outbox.send(message).is_err() {
            log::warn!("Outbox closed, dropping message to the client");
        }
    }
}

async fn deliver(client: Client, mut rx: mpsc::UnboundedReceiver<Outbound>) {
    while let Some(message) = rx.recv().await {
        match message {
            Outbound::Decorations(params) => {
                client.send_notification::<SetDecorations>(params).await
            }
            Outbound::Status(params) => client.send_notification::<Status>(params).await,
            Outbound::Tree(params) => client.send_notification::<TreeChanged>(params).await,
            Outbound::Message(typ, message) => client.show_message(typ, message).await,
        }
    }
    log::trace!("Outbox closed");
}

#[async_trait]
impl Editor for LspBridge {
    fn active_document(&self) -> Option<DocumentId> {
        self.view().active.clone()
    }

    fn visible_documents(&self) -> Vec<DocumentId> {
        self.view().visible.clone()
    }

    fn line_length(&self, document: &DocumentId, line: u32) -> Option<u32> {
        self.view().text.line_length(document, line)
    }

    fn set_decorations(&self, document: &DocumentId, decorations: Vec<RenderPayload>) {
        let Some(uri) = self.view().text.uri_for(document) else {
            log::warn!("No URI for {}, decorations not sent", document);
            return;
        };
        self.send(Outbound::Decorations(SetDecorationsParams { uri, decorations }));
    }

    async fn find_files(&self, name: &str) -> anyhow::Result<Vec<DocumentId>> {
        let (mut found, roots) = {
            let view = self.view();
            (view.open_matches(name), view.roots.clone())
        };

        let name_owned = name.to_string();
        let on_disk = tokio::task::spawn_blocking(move || workspace::find_files(&roots, &name_owned))
            .await
            .context("workspace search task failed")?;
        for path in on_disk {
            let document = DocumentId::new(path.display().to_string());
            if !found.contains(&document) {
                found.push(document);
            }
        }
        log::trace!("Found {} files named {}", found.len(), name);
        Ok(found)
    }

    async fn reveal(&self, document: &DocumentId, line: u32) -> anyhow::Result<()> {
        let uri = self
            .view()
            .text
            .uri_for(document)
            .with_context(|| format!("{document} has no URI"))?;
        let position = Position::new(line, 0);
        let result = self
            .client
            .show_document(ShowDocumentParams {
                uri,
                external: Some(false),
                take_focus: Some(true),
                selection: Some(Range::new(position, position)),
            })
            .await
            .map_err(|err| anyhow!("window/showDocument failed: {}", err.message))?;
        if !result {
            bail!("client refused to show {document}");
        }
        Ok(())
    }
}

#[async_trait]
impl Shell for LspBridge {
    fn notify(&self, level: NoticeLevel, message: &str) {
        let typ = match level {
            NoticeLevel::Info => MessageType::INFO,
            NoticeLevel::Warning => MessageType::WARNING,
            NoticeLevel::Error => MessageType::ERROR,
        };
        self.send(Outbound::Message(typ, message.to_string()));
    }

    fn set_status(&self, state: ConnectionState) {
        self.send(Outbound::Status(state.into()));
    }

    fn publish_projection(&self, files: &[FileNode]) {
        self.send(Outbound::Tree(TreeChangedParams {
            files: files.to_vec(),
        }));
    }

    async fn prompt(&self, prompt: &str, password: bool) -> Option<String> {
        let params = ShowInputBoxParams {
            prompt: prompt.to_string(),
            password,
        };
        match self.client.send_request::<ShowInputBox>(params).await {
            Ok(answer) => answer,
            Err(err) => {
                log::error!("Input box request failed: {}", err.message);
                None
            }
        }
    }

    async fn pick(&self, items: Vec<String>) -> Option<String> {
        let actions = items
            .into_iter()
            .map(|title| MessageActionItem {
                title,
                properties: HashMap::new(),
            })
            .collect();
        match self
            .client
            .show_message_request(MessageType::INFO, "Select a highlight to remove", Some(actions))
            .await
        {
            Ok(choice) => choice.map(|item| item.title),
            Err(err) => {
                log::error!("Picker request failed: {}", err.message);
                None
            }
        }
    }
}

#[async_trait]
impl CommandSource for LspBridge {
    async fn start(&self, params: ChatParams) -> anyhow::Result<()> {
        self.client
            .send_request::<StartChat>(params)
            .await
            .map_err(|err| anyhow!("startchat failed: {}", err.message))?;
        Ok(())
    }

    async fn stop(&self) -> anyhow::Result<bool> {
        self.client
            .send_request::<StopChat>(())
            .await
            .map_err(|err| anyhow!("stopchat failed: {}", err.message))
    }
}
