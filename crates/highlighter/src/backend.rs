//
// backend.rs
//
// Language server front end: document sync, focus tracking, commands and
// the chat bridge notifications
//

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;
use tower_lsp::jsonrpc::{Error, Result};
use tower_lsp::lsp_types::*;
use tower_lsp::Client;
use tower_lsp::LanguageServer;
use tower_lsp::LspService;
use tower_lsp::Server;

use crate::bridge::LspBridge;
use crate::commands::{self, Commands};
use crate::config::{parse_config, HighlighterConfig};
use crate::connection::ConnectionState;
use crate::dispatcher::{Dispatcher, DispatcherSettings, Intent};
use crate::editor::Shell;
use crate::protocol::{
    self, line_text, ActiveDocumentsChangedParams, ChatErrorParams, HighlightParams,
    UnhighlightParams,
};
use crate::queue::{IntentQueue, IntentSender};
use crate::vault::KeyringVault;

pub struct Backend {
    bridge: Arc<LspBridge>,
    intents: IntentSender,
    commands: Arc<Commands>,
    config: Arc<RwLock<HighlighterConfig>>,
}

impl Backend {
    pub fn new(client: Client) -> Self {
        let bridge = Arc::new(LspBridge::new(client));
        let config = Arc::new(RwLock::new(HighlighterConfig::default()));

        let dispatcher = Dispatcher::new(
            bridge.clone(),
            bridge.clone(),
            DispatcherSettings::default(),
        );
        let (intents, _queue) = IntentQueue::spawn(dispatcher);

        let commands = Arc::new(Commands::new(
            intents.clone(),
            bridge.clone(),
            bridge.clone(),
            Arc::new(KeyringVault::default()),
            bridge.clone(),
            config.clone(),
        ));

        Self {
            bridge,
            intents,
            commands,
            config,
        }
    }

    /// Push the current retention policy and workspace roots to the dispatcher.
    async fn apply_settings(&self) {
        let retention = self.config.read().await.retention;
        let workspace_roots = self.bridge.view().roots.clone();
        let settings = DispatcherSettings {
            retention,
            workspace_roots,
        };
        self.intents.post(Intent::Configure(settings));
    }

    async fn handle_active_documents_changed(&self, params: ActiveDocumentsChangedParams) {
        log::trace!(
            "Received activeDocumentsChanged: active={:?}, visible={}",
            params.active_uri,
            params.visible_uris.len()
        );
        let active = params.active();
        let visible = params.visible();
        let active = self.bridge.view_mut().focus(active.as_ref(), &visible);
        self.intents.post(Intent::FocusChanged { active });
    }

    async fn handle_highlight(&self, params: HighlightParams) {
        log::trace!("Received highlight from {:?}", params.twitch_user);
        self.intents.post(Intent::RemoteHighlight {
            line: line_text(params.line),
            author: params.twitch_user,
        });
    }

    async fn handle_unhighlight(&self, params: UnhighlightParams) {
        log::trace!(
            "Received unhighlight from {:?} for {:?}",
            params.twitch_user,
            params.file_name
        );
        self.intents.post(Intent::RemoteUnhighlight {
            line: line_text(params.line),
            file_hint: params.file_name,
        });
    }

    async fn handle_exited(&self) {
        self.commands.chat_exited();
    }

    async fn handle_error(&self, params: ChatErrorParams) {
        self.commands.chat_error(&params.message);
    }
}

/// Local paths of the workspace folders, falling back to the root URI.
fn workspace_roots(params: &InitializeParams) -> Vec<PathBuf> {
    #[allow(deprecated)]
    let uris: Vec<&Url> = match &params.workspace_folders {
        Some(folders) => folders.iter().map(|folder| &folder.uri).collect(),
        None => params.root_uri.iter().collect(),
    };
    uris.into_iter()
        .filter_map(|uri| match uri.to_file_path() {
            Ok(path) => Some(path),
            Err(()) => {
                log::warn!("Ignoring non-file workspace folder {}", uri);
                None
            }
        })
        .collect()
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        log::info!("Initializing highlighter");

        let roots = workspace_roots(&params);
        for root in &roots {
            log::info!("Adding workspace folder: {}", root.display());
        }
        self.bridge.view_mut().roots = roots;

        if let Some(config) = params.initialization_options.as_ref().and_then(parse_config) {
            *self.config.write().await = config;
        }
        self.apply_settings().await;

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Kind(
                    TextDocumentSyncKind::FULL,
                )),
                execute_command_provider: Some(ExecuteCommandOptions {
                    commands: commands::ALL.iter().map(|c| c.to_string()).collect(),
                    work_done_progress_options: Default::default(),
                }),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: String::from("highlighter"),
                version: Some(String::from(env!("CARGO_PKG_VERSION"))),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        log::info!("highlighter initialized");
        self.bridge.set_status(ConnectionState::Disconnected);
        self.intents.post(Intent::RefreshProjection);
    }

    async fn shutdown(&self) -> Result<()> {
        log::info!("highlighter shutting down");
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let document = params.text_document;
        let id = self
            .bridge
            .view_mut()
            .text
            .open(document.uri, &document.text, document.version);
        self.intents.post(Intent::DocumentEdited { document: id });
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let updated = self.bridge.view_mut().text.update(
            &params.text_document.uri,
            params.text_document.version,
            params.content_changes,
        );
        if let Some(document) = updated {
            self.intents.post(Intent::DocumentEdited { document });
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let closed = self.bridge.view_mut().text.close(&params.text_document.uri);
        if let Some(document) = closed {
            log::trace!("Closed {}", document);
        }
    }

    async fn did_change_configuration(&self, params: DidChangeConfigurationParams) {
        log::trace!("Configuration changed");
        let Some(config) = parse_config(&params.settings) else {
            log::warn!("Failed to parse highlighter configuration from settings, keeping the existing configuration");
            return;
        };
        *self.config.write().await = config;
        self.apply_settings().await;
    }

    async fn execute_command(&self, params: ExecuteCommandParams) -> Result<Option<Value>> {
        if !commands::ALL.contains(&params.command.as_str()) {
            return Err(Error::invalid_params(format!(
                "Unknown command: '{}'",
                params.command
            )));
        }
        self.commands
            .execute(&params.command, &params.arguments)
            .await
            .map_err(|err| {
                log::error!("Command {} failed: {:#}", params.command, err);
                Error::invalid_params(format!("{err:#}"))
            })?;
        Ok(None)
    }
}

pub async fn start_lsp() -> anyhow::Result<()> {
    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::build(Backend::new)
        .custom_method(
            protocol::ACTIVE_DOCUMENTS_CHANGED,
            Backend::handle_active_documents_changed,
        )
        .custom_method(protocol::HIGHLIGHT, Backend::handle_highlight)
        .custom_method(protocol::UNHIGHLIGHT, Backend::handle_unhighlight)
        .custom_method(protocol::EXITED, Backend::handle_exited)
        .custom_method(protocol::ERROR, Backend::handle_error)
        .finish();
    Server::new(stdin, stdout, socket).serve(service).await;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workspace_roots_prefer_folders() {
        #[allow(deprecated)]
        let params = InitializeParams {
            workspace_folders: Some(vec![WorkspaceFolder {
                uri: Url::parse("file:///w/project").unwrap(),
                name: "project".into(),
            }]),
            root_uri: Some(Url::parse("file:///w").unwrap()),
            ..Default::default()
        };
        assert_eq!(workspace_roots(&params), vec![PathBuf::from("/w/project")]);
    }

    #[test]
    fn test_workspace_roots_skip_remote_uris() {
        #[allow(deprecated)]
        let params = InitializeParams {
            root_uri: Some(Url::parse("vscode-vfs://github/repo").unwrap()),
            ..Default::default()
        };
        assert!(workspace_roots(&params).is_empty());
    }
}
