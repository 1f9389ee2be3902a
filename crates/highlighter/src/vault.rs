//
// vault.rs
//
// Storage for the chat client id and access token
//

use std::fmt;

use anyhow::{bail, Context, Result};
use async_trait::async_trait;

/// Keychain service the secrets are stored under.
pub const KEYCHAIN_SERVICE: &str = "vscode-twitch-highlighter";

/// The two secrets the chat listener needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CredentialKey {
    ClientId,
    Password,
}

impl CredentialKey {
    pub fn account(self) -> &'static str {
        match self {
            CredentialKey::ClientId => "twitch-client-id",
            CredentialKey::Password => "twitch-password",
        }
    }

    /// Name used in user-facing messages.
    pub fn label(self) -> &'static str {
        match self {
            CredentialKey::ClientId => "Twitch Client Id",
            CredentialKey::Password => "Twitch Chat password",
        }
    }
}

/// Secret storage. Every call may fail; callers report, never panic.
#[async_trait]
pub trait CredentialVault: Send + Sync {
    async fn get(&self, key: CredentialKey) -> Result<Option<String>>;
    async fn set(&self, key: CredentialKey, value: &str) -> Result<()>;
    /// Deleting a secret that is not stored succeeds.
    async fn delete(&self, key: CredentialKey) -> Result<()>;
}

/// Both secrets, present.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub client_id: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &"<redacted>")
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Read both secrets. `Ok(None)` when either is missing or blank.
pub async fn load_credentials(vault: &dyn CredentialVault) -> Result<Option<Credentials>> {
    let client_id = vault
        .get(CredentialKey::ClientId)
        .await
        .context("failed to read the client id")?;
    let password = vault
        .get(CredentialKey::Password)
        .await
        .context("failed to read the password")?;

    match (client_id, password) {
        (Some(client_id), Some(password))
            if !client_id.trim().is_empty() && !password.trim().is_empty() =>
        {
            Ok(Some(Credentials {
                client_id,
                password,
            }))
        }
        _ => Ok(None),
    }
}

/// OS keychain backed vault.
///
/// `keyring` calls block, so each one runs on the blocking pool.
#[derive(Debug, Clone)]
pub struct KeyringVault {
    service: String,
}

impl Default for KeyringVault {
    fn default() -> Self {
        Self::new(KEYCHAIN_SERVICE)
    }
}

impl KeyringVault {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    async fn with_entry<T, F>(&self, key: CredentialKey, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(keyring::Entry) -> Result<T> + Send + 'static,
    {
        let service = self.service.clone();
        tokio::task::spawn_blocking(move || {
            let entry = keyring::Entry::new(&service, key.account())
                .context("failed to initialize keychain entry")?;
            op(entry)
        })
        .await
        .context("keychain task panicked")?
    }
}

#[async_trait]
impl CredentialVault for KeyringVault {
    async fn get(&self, key: CredentialKey) -> Result<Option<String>> {
        self.with_entry(key, |entry| match entry.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(error) => Err(error).context("failed to read keychain entry"),
        })
        .await
        .with_context(|| format!("failed to read `{}` from keychain", key.account()))
    }

    async fn set(&self, key: CredentialKey, value: &str) -> Result<()> {
        if value.trim().is_empty() {
            bail!("{} must not be empty", key.label());
        }
        let value = value.to_string();
        self.with_entry(key, move |entry| {
            entry
                .set_password(&value)
                .context("failed to write keychain entry")
        })
        .await
        .with_context(|| format!("failed to persist `{}` in keychain", key.account()))
    }

    async fn delete(&self, key: CredentialKey) -> Result<()> {
        self.with_entry(key, |entry| match entry.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(error) => Err(error).context("failed to delete keychain entry"),
        })
        .await
        .with_context(|| format!("failed to clear `{}` from keychain", key.account()))
    }
}
