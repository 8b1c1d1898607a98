// SPDX-FileCopyrightText: 2026 Guestlink Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Token vault: opaque bearer tokens mapped to sealed subjects.
//!
//! Tokens are 32 bytes of CSPRNG output, shown to the caller exactly once as
//! base64url. The vault never stores the raw token: lookups go through a
//! SHA-256 digest, and the subject the token grants ("link:<id>" or
//! "session:<id>") is sealed with AES-256-GCM under the master key. A stolen
//! database therefore yields neither usable tokens nor, without the master
//! key, the mapping from digests to subjects.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{SecondsFormat, Utc};
use guestlink_config::model::VaultConfig;
use guestlink_core::types::{GuestSessionId, LinkId};
use guestlink_core::GuestlinkError;
use ring::digest;
use rusqlite::params;
use secrecy::SecretString;
use tracing::{debug, warn};
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::crypto;

/// What a redeemed token grants access to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenSubject {
    /// A standing link invitation, redeemable into sessions.
    Link(LinkId),
    /// One established guest session.
    Session(GuestSessionId),
}

impl TokenSubject {
    fn encode(&self) -> String {
        match self {
            TokenSubject::Link(id) => format!("link:{id}"),
            TokenSubject::Session(id) => format!("session:{id}"),
        }
    }

    fn decode(s: &str) -> Option<Self> {
        if let Some(id) = s.strip_prefix("link:") {
            Some(TokenSubject::Link(LinkId(id.to_string())))
        } else if let Some(id) = s.strip_prefix("session:") {
            Some(TokenSubject::Session(GuestSessionId(id.to_string())))
        } else {
            None
        }
    }
}

/// A freshly minted token. The raw token is only available here, once.
pub struct MintedToken {
    /// The raw bearer token, base64url without padding.
    pub token: SecretString,
    /// Stable handle for later revocation; safe to persist and log.
    pub handle: String,
}

/// The opened vault, holding the master key in memory.
///
/// Debug output intentionally omits the master key for security.
pub struct TokenVault {
    /// The master key -- only in memory, never logged.
    master_key: Zeroizing<[u8; 32]>,
    /// Database connection for the vault_tokens and vault_meta tables.
    conn: tokio_rusqlite::Connection,
}

impl std::fmt::Debug for TokenVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenVault")
            .field("master_key", &"[REDACTED]")
            .finish()
    }
}

impl TokenVault {
    /// Open the vault using the configured master key, or a generated one.
    ///
    /// When `vault.master_key` is unset, a random key is generated on first
    /// use and persisted in vault_meta so tokens survive restarts. That mode
    /// is for development: a configured key should be supplied anywhere the
    /// database file could be read by another party.
    pub async fn open(
        conn: tokio_rusqlite::Connection,
        config: &VaultConfig,
    ) -> Result<Self, GuestlinkError> {
        let master_key = match &config.master_key {
            Some(hex_key) => {
                let bytes = hex::decode(hex_key).map_err(|_| {
                    GuestlinkError::Vault("master key is not valid hex".to_string())
                })?;
                let key: [u8; 32] = bytes.try_into().map_err(|_| {
                    GuestlinkError::Vault("master key must be 32 bytes".to_string())
                })?;
                key
            }
            None => Self::load_or_generate_key(&conn).await?,
        };

        Ok(Self {
            master_key: Zeroizing::new(master_key),
            conn,
        })
    }

    async fn load_or_generate_key(
        conn: &tokio_rusqlite::Connection,
    ) -> Result<[u8; 32], GuestlinkError> {
        let stored: Option<Vec<u8>> = conn
            .call(|conn| -> Result<Option<Vec<u8>>, rusqlite::Error> {
                let result = conn.query_row(
                    "SELECT value FROM vault_meta WHERE key = 'master_key'",
                    [],
                    |row| row.get(0),
                );
                match result {
                    Ok(value) => Ok(Some(value)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e),
                }
            })
            .await
            .map_err(map_tr_err)?;

        if let Some(bytes) = stored {
            let key: [u8; 32] = bytes.try_into().map_err(|_| {
                GuestlinkError::Vault("stored master key is corrupted (expected 32 bytes)".to_string())
            })?;
            return Ok(key);
        }

        warn!("no vault.master_key configured; generating one and storing it in the database");
        let key = crypto::generate_random_key()?;
        let key_vec = key.to_vec();
        conn.call(move |conn| -> Result<(), rusqlite::Error> {
            conn.execute(
                "INSERT OR IGNORE INTO vault_meta (key, value) VALUES ('master_key', ?1)",
                params![key_vec],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)?;
        Ok(key)
    }

    /// Mint a fresh token granting access to `subject`.
    ///
    /// The raw token is returned exactly once and cannot be recovered later;
    /// only its digest and the sealed subject are persisted.
    pub async fn mint(&self, subject: &TokenSubject) -> Result<MintedToken, GuestlinkError> {
        let token_bytes = crypto::generate_token_bytes()?;
        let token = URL_SAFE_NO_PAD.encode(token_bytes);
        let token_digest = digest::digest(&digest::SHA256, token.as_bytes())
            .as_ref()
            .to_vec();

        let (sealed_subject, nonce) = crypto::seal(&self.master_key, subject.encode().as_bytes())?;

        let handle = Uuid::new_v4().to_string();
        let handle_owned = handle.clone();
        let nonce_vec = nonce.to_vec();
        let created_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);

        self.conn
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    "INSERT INTO vault_tokens (handle, digest, sealed_subject, nonce, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![handle_owned, token_digest, sealed_subject, nonce_vec, created_at],
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;

        debug!(handle = %handle, "token minted");
        Ok(MintedToken {
            token: SecretString::from(token),
            handle,
        })
    }

    /// Resolve a raw token to its subject, or `None` if it grants nothing.
    ///
    /// Unknown, revoked, and undecryptable tokens are all reported as `None`
    /// so a caller probing the vault cannot tell the cases apart.
    pub async fn resolve(&self, raw_token: &str) -> Result<Option<TokenSubject>, GuestlinkError> {
        let token_digest = digest::digest(&digest::SHA256, raw_token.as_bytes())
            .as_ref()
            .to_vec();

        type SealedEntry = (Vec<u8>, Vec<u8>);
        let entry = self
            .conn
            .call(move |conn| -> Result<Option<SealedEntry>, rusqlite::Error> {
                let result = conn.query_row(
                    "SELECT sealed_subject, nonce FROM vault_tokens WHERE digest = ?1",
                    params![token_digest],
                    |row| Ok((row.get::<_, Vec<u8>>(0)?, row.get::<_, Vec<u8>>(1)?)),
                );
                match result {
                    Ok(entry) => Ok(Some(entry)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e),
                }
            })
            .await
            .map_err(map_tr_err)?;

        let Some((sealed_subject, nonce_vec)) = entry else {
            return Ok(None);
        };

        let Ok(nonce) = <[u8; 12]>::try_from(nonce_vec) else {
            debug!("vault token entry has a corrupted nonce");
            return Ok(None);
        };
        let Ok(plaintext) = crypto::open(&self.master_key, &nonce, &sealed_subject) else {
            debug!("vault token entry failed to decrypt");
            return Ok(None);
        };
        let Ok(subject_str) = String::from_utf8(plaintext) else {
            return Ok(None);
        };
        Ok(TokenSubject::decode(&subject_str))
    }

    /// Revoke a token by handle. Idempotent: revoking twice is a no-op.
    pub async fn revoke(&self, handle: &str) -> Result<(), GuestlinkError> {
        let handle_owned = handle.to_string();
        self.conn
            .call(move |conn| -> Result<(), rusqlite::Error> {
                conn.execute(
                    "DELETE FROM vault_tokens WHERE handle = ?1",
                    params![handle_owned],
                )?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)?;
        debug!(handle = %handle, "token revoked");
        Ok(())
    }
}

/// Mask a token value for display: shows prefix and suffix with "..." between.
///
/// Short values (< 10 chars) are fully masked as "****".
pub fn mask_token(value: &str) -> String {
    if value.len() < 10 {
        return "****".to_string();
    }
    let prefix = &value[..4.min(value.len())];
    let suffix = &value[value.len().saturating_sub(4)..];
    format!("{prefix}...{suffix}")
}

/// Convert tokio-rusqlite errors to GuestlinkError::Vault.
fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> GuestlinkError {
    GuestlinkError::Vault(format!("vault database error: {e}"))
}
