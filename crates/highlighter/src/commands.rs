//
// commands.rs
//
// User-facing commands. Each one gathers its input (prompts, keychain,
// chat listener) and then hands a resolved intent to the queue.
//

use std::sync::Arc;

use anyhow::{bail, Context};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::config::HighlighterConfig;
use crate::connection::{CommandSource, ConnectionEvent, ConnectionState};
use crate::dispatcher::{Intent, Outcome};
use crate::document_set::parse_picker_entry;
use crate::editor::{Editor, NoticeLevel, Shell};
use crate::projection::FileNode;
use crate::queue::IntentSender;
use crate::vault::{load_credentials, CredentialKey, CredentialVault};

pub const TOGGLE_CHAT: &str = "twitchhighlighter.toggleChat";
pub const START_CHAT: &str = "twitchhighlighter.startChat";
pub const STOP_CHAT: &str = "twitchhighlighter.stopChat";
pub const HIGHLIGHT: &str = "twitchhighlighter.highlight";
pub const UNHIGHLIGHT_SPECIFIC: &str = "twitchhighlighter.unhighlightSpecific";
pub const UNHIGHLIGHT_ALL: &str = "twitchhighlighter.unhighlightAll";
pub const REMOVE_HIGHLIGHT: &str = "twitchhighlighter.removeHighlight";
pub const GOTO_HIGHLIGHT: &str = "twitchhighlighter.gotoHighlight";
pub const REFRESH_TREE_VIEW: &str = "twitchhighlighter.refreshTreeView";
pub const SET_CLIENT_ID: &str = "twitchhighlighter.setTwitchClientId";
pub const REMOVE_CLIENT_ID: &str = "twitchhighlighter.removeTwitchClientId";
pub const SET_PASSWORD: &str = "twitchhighlighter.setTwitchPassword";
pub const REMOVE_PASSWORD: &str = "twitchhighlighter.removeTwitchPassword";

/// Every command the server answers to.
pub const ALL: &[&str] = &[
    TOGGLE_CHAT,
    START_CHAT,
    STOP_CHAT,
    HIGHLIGHT,
    UNHIGHLIGHT_SPECIFIC,
    UNHIGHLIGHT_ALL,
    REMOVE_HIGHLIGHT,
    GOTO_HIGHLIGHT,
    REFRESH_TREE_VIEW,
    SET_CLIENT_ID,
    REMOVE_CLIENT_ID,
    SET_PASSWORD,
    REMOVE_PASSWORD,
];

const CLIENT_ID_PROMPT: &str =
    "Enter Twitch Client Id. Register your app here: https://glass.twitch.tv/console/apps/create";
const PASSWORD_PROMPT: &str =
    "Enter Twitch token. Generate a token here: http://www.twitchapps.com/tmi";

pub struct Commands {
    intents: IntentSender,
    editor: Arc<dyn Editor>,
    shell: Arc<dyn Shell>,
    vault: Arc<dyn CredentialVault>,
    source: Arc<dyn CommandSource>,
    config: Arc<RwLock<HighlighterConfig>>,
}

impl Commands {
    pub fn new(
        intents: IntentSender,
        editor: Arc<dyn Editor>,
        shell: Arc<dyn Shell>,
        vault: Arc<dyn CredentialVault>,
        source: Arc<dyn CommandSource>,
        config: Arc<RwLock<HighlighterConfig>>,
    ) -> Self {
        Self {
            intents,
            editor,
            shell,
            vault,
            source,
            config,
        }
    }

    pub fn intents(&self) -> &IntentSender {
        &self.intents
    }

    /// Run the command called `name` with its JSON arguments.
    ///
    /// Errors only for unknown commands or malformed arguments; everything
    /// else is reported to the user by the command itself.
    pub async fn execute(&self, name: &str, arguments: &[Value]) -> anyhow::Result<()> {
        log::trace!("Executing command {} with {} arguments", name, arguments.len());
        match name {
            TOGGLE_CHAT => self.toggle_chat().await,
            START_CHAT => self.start_chat().await,
            STOP_CHAT => self.stop_chat().await,
            HIGHLIGHT => self.highlight().await,
            UNHIGHLIGHT_SPECIFIC => self.unhighlight_specific().await,
            UNHIGHLIGHT_ALL => self.unhighlight_all().await,
            REMOVE_HIGHLIGHT => {
                let node: FileNode = serde_json::from_value(argument(arguments, 0)?.clone())
                    .context("removeHighlight expects a file node")?;
                self.remove_file_node(node).await;
            }
            GOTO_HIGHLIGHT => {
                let line = argument(arguments, 0)?
                    .as_u64()
                    .and_then(|line| u32::try_from(line).ok())
                    .context("gotoHighlight expects a line number")?;
                let file = argument(arguments, 1)?
                    .as_str()
                    .context("gotoHighlight expects a file name")?;
                self.goto_highlight(line, file).await;
            }
            REFRESH_TREE_VIEW => self.refresh_tree_view(),
            SET_CLIENT_ID => self.set_secret(CredentialKey::ClientId).await,
            REMOVE_CLIENT_ID => self.remove_secret(CredentialKey::ClientId).await,
            SET_PASSWORD => self.set_secret(CredentialKey::Password).await,
            REMOVE_PASSWORD => self.remove_secret(CredentialKey::Password).await,
            other => bail!("Unknown command: '{other}'"),
        }
        Ok(())
    }

    pub async fn highlight(&self) {
        let line = self.shell.prompt("Enter a line number", false).await;
        self.intents.dispatch(Intent::LocalHighlight { line }).await;
    }

    pub async fn unhighlight_specific(&self) {
        let Outcome::PickerEntries(entries) = self.intents.dispatch(Intent::PickerEntries).await
        else {
            return;
        };
        if entries.is_empty() {
            self.shell.notify(
                NoticeLevel::Info,
                "There are no highlights to unhighlight",
            );
            return;
        }

        let picked = self.shell.pick(entries).await;
        let Some((document, line)) = picked.as_deref().and_then(parse_picker_entry) else {
            self.shell
                .notify(NoticeLevel::Error, "A valid highlight was not selected.");
            return;
        };
        self.intents
            .dispatch(Intent::Unhighlight { document, line })
            .await;
    }

    pub async fn unhighlight_all(&self) {
        self.intents.dispatch(Intent::UnhighlightAll).await;
    }

    /// Remove every highlight listed under a tree node.
    pub async fn remove_file_node(&self, node: FileNode) {
        let lines = node.lines().collect();
        self.intents
            .dispatch(Intent::TreeRemoval {
                document: node.document,
                lines,
            })
            .await;
    }

    pub fn refresh_tree_view(&self) {
        self.intents.post(Intent::RefreshProjection);
    }

    /// Open the file named `file` and bring the line above `line` to the top.
    pub async fn goto_highlight(&self, line: u32, file: &str) {
        let found = match self.editor.find_files(file).await {
            Ok(found) => found,
            Err(err) => {
                log::error!("File search for {} failed: {:#}", file, err);
                Vec::new()
            }
        };
        let Some(document) = found.into_iter().next() else {
            self.shell.notify(
                NoticeLevel::Warning,
                &format!("Could not find {file} in the workspace"),
            );
            return;
        };

        let target = line.max(2) - 2;
        if let Err(err) = self.editor.reveal(&document, target).await {
            log::error!("Failed to reveal line {} of {}: {:#}", line, document, err);
            self.shell.notify(
                NoticeLevel::Error,
                &format!("Unable to open {document}"),
            );
        }
    }

    pub async fn set_secret(&self, key: CredentialKey) {
        let prompt = match key {
            CredentialKey::ClientId => CLIENT_ID_PROMPT,
            CredentialKey::Password => PASSWORD_PROMPT,
        };
        let Some(value) = self.shell.prompt(prompt, true).await else {
            return;
        };
        match self.vault.set(key, &value).await {
            Ok(()) => self.shell.notify(
                NoticeLevel::Info,
                &format!("{} saved in your keychain", key.label()),
            ),
            Err(err) => {
                log::error!("An error occurred while saving {}: {:#}", key.account(), err);
                self.shell
                    .notify(NoticeLevel::Error, &format!("Failed to set {}", key.label()));
            }
        }
    }

    pub async fn remove_secret(&self, key: CredentialKey) {
        match self.vault.delete(key).await {
            Ok(()) => self.shell.notify(
                NoticeLevel::Info,
                &format!("{} removed from your keychain", key.label()),
            ),
            Err(err) => {
                log::error!("An error occurred while removing {}: {:#}", key.account(), err);
                self.shell.notify(
                    NoticeLevel::Error,
                    &format!("Failed to remove the {}", key.label()),
                );
            }
        }
    }

    pub async fn connection_state(&self) -> ConnectionState {
        match self.intents.dispatch(Intent::ConnectionStatus).await {
            Outcome::Connection { state, .. } => state,
            _ => ConnectionState::Disconnected,
        }
    }

    /// Start when disconnected. Otherwise stop, which also abandons a start
    /// still waiting for its acknowledgement.
    pub async fn toggle_chat(&self) {
        match self.connection_state().await {
            ConnectionState::Disconnected => self.start_chat().await,
            ConnectionState::Connecting | ConnectionState::Connected => self.stop_chat().await,
        }
    }

    pub async fn start_chat(&self) {
        let outcome = self
            .intents
            .dispatch(Intent::Connection(ConnectionEvent::StartRequested))
            .await;
        let Outcome::Connection {
            changed: true,
            attempt,
            ..
        } = outcome
        else {
            log::info!("Chat listener is already starting or connected");
            return;
        };

        log::trace!("Retrieving twitch credentials");
        let credentials = match load_credentials(self.vault.as_ref()).await {
            Ok(Some(credentials)) => credentials,
            Ok(None) => {
                self.shell.notify(
                    NoticeLevel::Info,
                    "Missing Twitch credentials. Cannot start Chat client",
                );
                self.connection_event(ConnectionEvent::Failed(attempt)).await;
                return;
            }
            Err(err) => {
                log::error!("An error occurred while gathering the Twitch credentials: {:#}", err);
                self.shell
                    .notify(NoticeLevel::Error, "Could not start the chat client");
                self.connection_event(ConnectionEvent::Failed(attempt)).await;
                return;
            }
        };

        let params = self.config.read().await.chat_params(credentials);
        let Some(params) = params else {
            self.shell.notify(
                NoticeLevel::Warning,
                "No Twitch channels configured. Set twitchHighlighter.channels to start the Chat client",
            );
            self.connection_event(ConnectionEvent::Failed(attempt)).await;
            return;
        };

        self.shell.notify(
            NoticeLevel::Info,
            "Twitch Highlighter: Starting Chat Listener...",
        );
        log::info!("Starting chat listener with {:?}", params);
        match self.source.start(params).await {
            Ok(()) => {
                let outcome = self.connection_event(ConnectionEvent::Acknowledged(attempt)).await;
                if matches!(outcome, Outcome::Connection { changed: true, .. }) {
                    self.shell.notify(
                        NoticeLevel::Info,
                        "Twitch Highlighter: Chat Listener Connected.",
                    );
                } else {
                    log::warn!("Chat listener attempt {} acknowledged after it was stopped", attempt);
                }
            }
            Err(err) => {
                log::error!("Unable to connect to Twitch Chat: {:#}", err);
                self.shell
                    .notify(NoticeLevel::Error, "Unable to connect to Twitch Chat");
                self.connection_event(ConnectionEvent::Failed(attempt)).await;
            }
        }
    }

    pub async fn stop_chat(&self) {
        self.shell.notify(
            NoticeLevel::Info,
            "Twitch Highlighter: Stopping Chat Listener...",
        );
        match self.source.stop().await {
            Ok(true) => {
                self.connection_event(ConnectionEvent::Stopped).await;
                self.shell.notify(
                    NoticeLevel::Info,
                    "Twitch Highlighter: Stopped Listening to Chat",
                );
            }
            Ok(false) => {
                self.shell.notify(
                    NoticeLevel::Error,
                    "Twitch Highlighter: Unable to stop listening to chat",
                );
            }
            Err(err) => {
                log::error!("Stopping the chat listener failed: {:#}", err);
                self.shell.notify(
                    NoticeLevel::Error,
                    "Twitch Highlighter: Unable to stop listening to chat",
                );
            }
        }
    }

    /// The chat listener went away without being asked to.
    pub fn chat_exited(&self) {
        self.shell.notify(
            NoticeLevel::Info,
            "Twitch Highlighter: Chat Listener Stopped",
        );
        self.intents
            .post(Intent::Connection(ConnectionEvent::Exited));
    }

    pub fn chat_error(&self, message: &str) {
        log::error!("Chat listener reported: {}", message);
        self.shell.notify(NoticeLevel::Error, message);
    }

    async fn connection_event(&self, event: ConnectionEvent) -> Outcome {
        self.intents.dispatch(Intent::Connection(event)).await
    }
}

fn argument(arguments: &[Value], index: usize) -> anyhow::Result<&Value> {
    arguments
        .get(index)
        .with_context(|| format!("missing command argument {index}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::{Dispatcher, DispatcherSettings};
    use crate::highlight::DocumentId;
    use crate::queue::IntentQueue;
    use crate::connection::ChatParams;
    use crate::test_utils::{FakeEditor, FakeShell, MemoryVault, ScriptedSource};
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tokio::sync::oneshot;

    struct Harness {
        editor: Arc<FakeEditor>,
        shell: Arc<FakeShell>,
        vault: Arc<MemoryVault>,
        source: Arc<ScriptedSource>,
        commands: Commands,
    }

    fn harness_with(vault: MemoryVault, channels: &[&str]) -> Harness {
        let editor = Arc::new(FakeEditor::new());
        let shell = Arc::new(FakeShell::new());
        let vault = Arc::new(vault);
        let source = Arc::new(ScriptedSource::new());
        let dispatcher = Dispatcher::new(editor.clone(), shell.clone(), DispatcherSettings::default());
        let (intents, _handle) = IntentQueue::spawn(dispatcher);
        let config = HighlighterConfig {
            channels: channels.iter().map(|c| c.to_string()).collect(),
            ..Default::default()
        };
        let commands = Commands::new(
            intents,
            editor.clone(),
            shell.clone(),
            vault.clone(),
            source.clone(),
            Arc::new(RwLock::new(config)),
        );
        Harness {
            editor,
            shell,
            vault,
            source,
            commands,
        }
    }

    fn harness() -> Harness {
        let vault = MemoryVault::new()
            .with(CredentialKey::ClientId, "client")
            .with(CredentialKey::Password, "oauth:token");
        harness_with(vault, &["streamer"])
    }

    /// Source whose `start` calls block until the test releases them, in
    /// call order.
    #[derive(Default)]
    struct GatedSource {
        gates: Mutex<VecDeque<oneshot::Receiver<anyhow::Result<()>>>>,
        starts: AtomicUsize,
        stops: AtomicUsize,
    }

    impl GatedSource {
        fn gate(&self) -> oneshot::Sender<anyhow::Result<()>> {
            let (tx, rx) = oneshot::channel();
            self.gates.lock().unwrap().push_back(rx);
            tx
        }

        async fn wait_for_starts(&self, count: usize) {
            while self.starts.load(Ordering::SeqCst) < count {
                tokio::task::yield_now().await;
            }
        }
    }

    #[async_trait]
    impl CommandSource for GatedSource {
        async fn start(&self, _params: ChatParams) -> anyhow::Result<()> {
            let gate = self.gates.lock().unwrap().pop_front();
            self.starts.fetch_add(1, Ordering::SeqCst);
            match gate {
                Some(gate) => gate.await.unwrap_or_else(|_| Err(anyhow::anyhow!("gate dropped"))),
                None => Ok(()),
            }
        }

        async fn stop(&self) -> anyhow::Result<bool> {
            self.stops.fetch_add(1, Ordering::SeqCst);
            Ok(true)
        }
    }

    fn gated() -> (Arc<FakeShell>, Arc<GatedSource>, Arc<Commands>) {
        let editor = Arc::new(FakeEditor::new());
        let shell = Arc::new(FakeShell::new());
        let vault = MemoryVault::new()
            .with(CredentialKey::ClientId, "client")
            .with(CredentialKey::Password, "oauth:token");
        let source = Arc::new(GatedSource::default());
        let dispatcher = Dispatcher::new(editor.clone(), shell.clone(), DispatcherSettings::default());
        let (intents, _handle) = IntentQueue::spawn(dispatcher);
        let config = HighlighterConfig {
            channels: vec!["streamer".into()],
            ..Default::default()
        };
        let commands = Commands::new(
            intents,
            editor,
            shell.clone(),
            Arc::new(vault),
            source.clone(),
            Arc::new(RwLock::new(config)),
        );
        (shell, source, Arc::new(commands))
    }

    async fn focused(h: &Harness, path: &str) -> DocumentId {
        let doc = h.editor.open(path, "one\ntwo\nthree\nfour\nfive\nsix\nseven\n");
        h.editor.focus(&doc);
        h.commands
            .intents()
            .dispatch(Intent::FocusChanged {
                active: Some(doc.clone()),
            })
            .await;
        doc
    }

    async fn entries(h: &Harness) -> Vec<String> {
        match h.commands.intents().dispatch(Intent::PickerEntries).await {
            Outcome::PickerEntries(entries) => entries,
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_highlight_prompts_for_line() {
        let h = harness();
        focused(&h, "/w/a.txt").await;
        h.shell.answer_prompt(Some("3"));
        h.commands.execute(HIGHLIGHT, &[]).await.unwrap();

        assert_eq!(h.shell.asked(), vec![("Enter a line number".to_string(), false)]);
        assert_eq!(entries(&h).await, vec!["/w/a.txt, 3"]);
    }

    #[tokio::test]
    async fn test_cancelled_highlight_is_silent() {
        let h = harness();
        focused(&h, "/w/a.txt").await;
        h.commands.highlight().await;
        assert!(entries(&h).await.is_empty());
        assert!(h.shell.notices().is_empty());
    }

    #[tokio::test]
    async fn test_unhighlight_specific_without_highlights() {
        let h = harness();
        h.commands.unhighlight_specific().await;
        assert!(h
            .shell
            .has_notice(NoticeLevel::Info, "There are no highlights to unhighlight"));
        assert!(h.shell.offered().is_empty());
    }

    #[tokio::test]
    async fn test_unhighlight_specific_removes_choice() {
        let h = harness();
        focused(&h, "/w/a.txt").await;
        h.shell.answer_prompt(Some("2"));
        h.commands.highlight().await;
        h.shell.answer_prompt(Some("5"));
        h.commands.highlight().await;

        h.shell.answer_pick(Some("/w/a.txt, 2"));
        h.commands.unhighlight_specific().await;

        assert_eq!(
            h.shell.offered(),
            vec![vec!["/w/a.txt, 2".to_string(), "/w/a.txt, 5".to_string()]]
        );
        assert_eq!(entries(&h).await, vec!["/w/a.txt, 5"]);
    }

    #[tokio::test]
    async fn test_unhighlight_specific_dismissed() {
        let h = harness();
        focused(&h, "/w/a.txt").await;
        h.shell.answer_prompt(Some("2"));
        h.commands.highlight().await;

        h.commands.unhighlight_specific().await;
        assert!(h
            .shell
            .has_notice(NoticeLevel::Error, "A valid highlight was not selected."));
        assert_eq!(entries(&h).await.len(), 1);
    }

    #[tokio::test]
    async fn test_remove_highlight_takes_file_node() {
        let h = harness();
        focused(&h, "/w/a.txt").await;
        for line in ["1", "4", "6"] {
            h.shell.answer_prompt(Some(line));
            h.commands.highlight().await;
        }
        let before = h.shell.projection_count();
        let node = h.shell.last_projection().unwrap().remove(0);

        h.commands
            .execute(REMOVE_HIGHLIGHT, &[serde_json::to_value(&node).unwrap()])
            .await
            .unwrap();

        assert!(entries(&h).await.is_empty());
        assert_eq!(h.shell.projection_count(), before + 1);
        assert_eq!(h.shell.last_projection(), Some(Vec::new()));
    }

    #[tokio::test]
    async fn test_goto_highlight_reveals_line_above() {
        let h = harness();
        let doc = h.editor.open("/w/src/main.rs", "fn main() {}\n");
        h.commands
            .execute(GOTO_HIGHLIGHT, &[json!(10), json!("main.rs")])
            .await
            .unwrap();
        h.commands.goto_highlight(1, "src/main.rs").await;

        assert_eq!(h.editor.revealed(), vec![(doc.clone(), 8), (doc, 0)]);
    }

    #[tokio::test]
    async fn test_goto_highlight_missing_file() {
        let h = harness();
        h.commands.goto_highlight(3, "nowhere.rs").await;
        assert!(h.editor.revealed().is_empty());
        assert!(h.shell.has_notice(NoticeLevel::Warning, "nowhere.rs"));
    }

    #[tokio::test]
    async fn test_malformed_arguments_are_errors() {
        let h = harness();
        assert!(h.commands.execute(GOTO_HIGHLIGHT, &[]).await.is_err());
        assert!(h
            .commands
            .execute(REMOVE_HIGHLIGHT, &[json!("x")])
            .await
            .is_err());
        assert!(h.commands.execute("twitchhighlighter.nope", &[]).await.is_err());
    }

    #[tokio::test]
    async fn test_set_and_remove_secrets() {
        let h = harness_with(MemoryVault::new(), &["streamer"]);
        h.shell.answer_prompt(Some("new-id"));
        h.commands.execute(SET_CLIENT_ID, &[]).await.unwrap();
        assert_eq!(h.vault.value(CredentialKey::ClientId).as_deref(), Some("new-id"));
        assert!(h
            .shell
            .has_notice(NoticeLevel::Info, "Twitch Client Id saved in your keychain"));
        assert!(h.shell.asked()[0].1);

        h.commands.execute(REMOVE_CLIENT_ID, &[]).await.unwrap();
        assert!(h.vault.value(CredentialKey::ClientId).is_none());
        assert!(h
            .shell
            .has_notice(NoticeLevel::Info, "Twitch Client Id removed from your keychain"));
    }

    #[tokio::test]
    async fn test_cancelled_secret_prompt_keeps_value() {
        let h = harness();
        h.commands.set_secret(CredentialKey::Password).await;
        assert_eq!(
            h.vault.value(CredentialKey::Password).as_deref(),
            Some("oauth:token")
        );
        assert!(h.shell.notices().is_empty());
    }

    #[tokio::test]
    async fn test_vault_failures_are_reported() {
        let h = harness();
        h.vault.fail_with("locked");
        h.shell.answer_prompt(Some("pw"));
        h.commands.set_secret(CredentialKey::Password).await;
        h.commands.remove_secret(CredentialKey::Password).await;
        assert!(h
            .shell
            .has_notice(NoticeLevel::Error, "Failed to set Twitch Chat password"));
        assert!(h
            .shell
            .has_notice(NoticeLevel::Error, "Failed to remove the Twitch Chat password"));
    }

    #[tokio::test]
    async fn test_start_chat_connects() {
        let h = harness();
        h.commands.execute(START_CHAT, &[]).await.unwrap();

        assert_eq!(h.commands.connection_state().await, ConnectionState::Connected);
        assert_eq!(
            h.shell.statuses(),
            vec![ConnectionState::Connecting, ConnectionState::Connected]
        );
        let starts = h.source.starts();
        assert_eq!(starts.len(), 1);
        assert_eq!(starts[0].channels, vec!["streamer"]);
        assert_eq!(starts[0].username, "streamer");
        assert_eq!(starts[0].password, "oauth:token");
        assert!(h
            .shell
            .has_notice(NoticeLevel::Info, "Chat Listener Connected."));
    }

    #[tokio::test]
    async fn test_start_chat_is_not_repeated() {
        let h = harness();
        h.commands.start_chat().await;
        h.commands.start_chat().await;
        assert_eq!(h.source.starts().len(), 1);
        assert_eq!(h.commands.connection_state().await, ConnectionState::Connected);
    }

    #[tokio::test]
    async fn test_start_chat_without_credentials() {
        let h = harness_with(MemoryVault::new(), &["streamer"]);
        h.commands.start_chat().await;
        assert!(h.source.starts().is_empty());
        assert!(h
            .shell
            .has_notice(NoticeLevel::Info, "Missing Twitch credentials"));
        assert_eq!(
            h.commands.connection_state().await,
            ConnectionState::Disconnected
        );
    }

    #[tokio::test]
    async fn test_start_chat_vault_error() {
        let h = harness();
        h.vault.fail_with("locked");
        h.commands.start_chat().await;
        assert!(h
            .shell
            .has_notice(NoticeLevel::Error, "Could not start the chat client"));
        assert_eq!(
            h.commands.connection_state().await,
            ConnectionState::Disconnected
        );
    }

    #[tokio::test]
    async fn test_start_chat_without_channels() {
        let vault = MemoryVault::new()
            .with(CredentialKey::ClientId, "client")
            .with(CredentialKey::Password, "oauth:token");
        let h = harness_with(vault, &[]);
        h.commands.start_chat().await;
        assert!(h.source.starts().is_empty());
        assert!(h.shell.has_notice(NoticeLevel::Warning, "No Twitch channels"));
        assert_eq!(
            h.commands.connection_state().await,
            ConnectionState::Disconnected
        );
    }

    #[tokio::test]
    async fn test_start_chat_failure_reverts() {
        let h = harness();
        h.source.fail_start("refused");
        h.commands.start_chat().await;
        assert!(h
            .shell
            .has_notice(NoticeLevel::Error, "Unable to connect to Twitch Chat"));
        assert_eq!(
            h.shell.statuses(),
            vec![ConnectionState::Connecting, ConnectionState::Disconnected]
        );
    }

    #[tokio::test]
    async fn test_toggle_cycles_connection() {
        let h = harness();
        h.commands.execute(TOGGLE_CHAT, &[]).await.unwrap();
        assert_eq!(h.commands.connection_state().await, ConnectionState::Connected);

        h.commands.execute(TOGGLE_CHAT, &[]).await.unwrap();
        assert_eq!(h.source.stops(), 1);
        assert_eq!(
            h.commands.connection_state().await,
            ConnectionState::Disconnected
        );
        assert!(h
            .shell
            .has_notice(NoticeLevel::Info, "Stopped Listening to Chat"));
    }

    #[tokio::test]
    async fn test_stale_acknowledgement_cannot_connect_newer_start() {
        let (shell, source, commands) = gated();
        let first_gate = source.gate();
        let second_gate = source.gate();

        let first = tokio::spawn({
            let commands = commands.clone();
            async move { commands.start_chat().await }
        });
        source.wait_for_starts(1).await;
        commands.stop_chat().await;

        let second = tokio::spawn({
            let commands = commands.clone();
            async move { commands.start_chat().await }
        });
        source.wait_for_starts(2).await;

        first_gate.send(Ok(())).unwrap();
        first.await.unwrap();
        assert_eq!(commands.connection_state().await, ConnectionState::Connecting);

        second_gate.send(Err(anyhow::anyhow!("refused"))).unwrap();
        second.await.unwrap();

        assert_eq!(
            shell.statuses(),
            vec![
                ConnectionState::Connecting,
                ConnectionState::Disconnected,
                ConnectionState::Connecting,
                ConnectionState::Disconnected,
            ]
        );
        assert_eq!(commands.connection_state().await, ConnectionState::Disconnected);
        assert!(!shell.has_notice(NoticeLevel::Info, "Chat Listener Connected."));
    }

    #[tokio::test]
    async fn test_toggle_while_connecting_stops() {
        let (shell, source, commands) = gated();
        let gate = source.gate();

        let start = tokio::spawn({
            let commands = commands.clone();
            async move { commands.start_chat().await }
        });
        source.wait_for_starts(1).await;
        assert_eq!(commands.connection_state().await, ConnectionState::Connecting);

        commands.execute(TOGGLE_CHAT, &[]).await.unwrap();
        assert_eq!(source.stops.load(Ordering::SeqCst), 1);
        assert_eq!(source.starts.load(Ordering::SeqCst), 1);
        assert_eq!(commands.connection_state().await, ConnectionState::Disconnected);

        gate.send(Ok(())).unwrap();
        start.await.unwrap();
        assert_eq!(commands.connection_state().await, ConnectionState::Disconnected);
        assert_eq!(
            shell.statuses(),
            vec![ConnectionState::Connecting, ConnectionState::Disconnected]
        );
    }

    #[tokio::test]
    async fn test_refused_stop_keeps_state() {
        let h = harness();
        h.commands.start_chat().await;
        h.source.refuse_stop();
        h.commands.stop_chat().await;
        assert!(h
            .shell
            .has_notice(NoticeLevel::Error, "Unable to stop listening to chat"));
        assert_eq!(h.commands.connection_state().await, ConnectionState::Connected);
    }

    #[tokio::test]
    async fn test_listener_exit_disconnects() {
        let h = harness();
        h.commands.start_chat().await;
        h.commands.chat_exited();
        assert_eq!(
            h.commands.connection_state().await,
            ConnectionState::Disconnected
        );
        assert!(h
            .shell
            .has_notice(NoticeLevel::Info, "Chat Listener Stopped"));

        h.commands.chat_error("login failed");
        assert!(h.shell.has_notice(NoticeLevel::Error, "login failed"));
    }
}
