//
// config.rs
//
// Settings read from the client (initialization options and
// workspace/didChangeConfiguration)
//

use serde_json::Value;

use crate::connection::ChatParams;
use crate::registry::RetentionPolicy;
use crate::vault::Credentials;

/// Top-level settings section.
pub const SETTINGS_SECTION: &str = "twitchHighlighter";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HighlighterConfig {
    /// Chat channels to listen to.
    pub channels: Vec<String>,
    /// Chat login; the first channel when unset.
    pub nickname: Option<String>,
    /// Keep emptied document sets around until the listener disconnects.
    pub retention: RetentionPolicy,
}

impl HighlighterConfig {
    pub fn username(&self) -> Option<&str> {
        self.nickname
            .as_deref()
            .or_else(|| self.channels.first().map(String::as_str))
    }

    /// Parameters for `startchat`, or `None` when no channel is configured.
    pub fn chat_params(&self, credentials: Credentials) -> Option<ChatParams> {
        if self.channels.is_empty() {
            return None;
        }
        let username = self.username()?.to_string();
        Some(ChatParams {
            channels: self.channels.clone(),
            client_id: credentials.client_id,
            username,
            password: credentials.password,
        })
    }
}

/// Parse settings from a JSON object holding a `twitchHighlighter` section.
///
/// Returns `None` when the section is missing. Fields that are absent or of
/// the wrong type keep their defaults.
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use highlighter::config::parse_config;
///
/// let settings = json!({
///     "twitchHighlighter": {
///         "channels": ["somechannel"],
///         "retainEmptySets": true
///     }
/// });
/// let config = parse_config(&settings).unwrap();
/// assert_eq!(config.channels, vec!["somechannel".to_string()]);
/// assert_eq!(config.username(), Some("somechannel"));
/// ```
pub fn parse_config(settings: &Value) -> Option<HighlighterConfig> {
    let section = settings.get(SETTINGS_SECTION)?;
    let mut config = HighlighterConfig::default();

    if let Some(channels) = section.get("channels").and_then(|v| v.as_array()) {
        config.channels = channels
            .iter()
            .filter_map(|v| v.as_str())
            .map(|channel| channel.trim().trim_start_matches('#').to_lowercase())
            .filter(|channel| !channel.is_empty())
            .collect();
    }
    if let Some(nickname) = section.get("nickname").and_then(|v| v.as_str()) {
        let nickname = nickname.trim();
        if !nickname.is_empty() {
            config.nickname = Some(nickname.to_string());
        }
    }
    if let Some(retain) = section.get("retainEmptySets").and_then(|v| v.as_bool()) {
        config.retention = if retain {
            RetentionPolicy::Deferred
        } else {
            RetentionPolicy::Eager
        };
    }

    log::info!("Highlighter configuration loaded from settings:");
    log::info!("  channels: {:?}", config.channels);
    log::info!("  nickname: {:?}", config.nickname);
    log::info!("  retention: {:?}", config.retention);

    Some(config)
}
