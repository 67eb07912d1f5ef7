//! Offline store: every table in one JSON document, encrypted at rest.
//!
//! The file holds an envelope `{v, salt, iv, tag, data, iterations}` with
//! base64 fields. The key is PBKDF2-SHA256 over the passphrase and the salt;
//! the payload is AES-256-GCM with the tag stored separately.

use std::fs;
use std::path::{Path, PathBuf};

use aes_gcm::aead::{rand_core::RngCore, Aead, OsRng};
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use pbkdf2::pbkdf2_hmac;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::Sha256;

use super::document::{
    default_db_value, delete_row, ensure_db_shape_value, insert_row, rows, update_row,
};
use super::{Store, Table};
use crate::error::StoreError;

pub const DATA_FILE: &str = "uniform-manager.enc";
pub const DEFAULT_PBKDF2_ITERATIONS: u32 = 200_000;

const ENVELOPE_VERSION: u8 = 1;
const TAG_LEN: usize = 16;
const IV_LEN: usize = 12;
const SALT_LEN: usize = 16;

#[derive(Serialize, Deserialize)]
struct CryptoEnvelope {
    v: u8,
    salt: String,
    iv: String,
    tag: String,
    data: String,
    #[serde(default = "default_pbkdf2_iterations")]
    iterations: u32,
}

fn default_pbkdf2_iterations() -> u32 {
    DEFAULT_PBKDF2_ITERATIONS
}

pub struct LocalStore {
    path: PathBuf,
    salt: Vec<u8>,
    key: [u8; 32],
    iterations: u32,
    db: Value,
}

impl std::fmt::Debug for LocalStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalStore")
            .field("path", &self.path)
            .field("iterations", &self.iterations)
            .finish_non_exhaustive()
    }
}

impl LocalStore {
    pub fn open(path: impl Into<PathBuf>, passphrase: &str) -> Result<Self, StoreError> {
        Self::open_with_iterations(path, passphrase, DEFAULT_PBKDF2_ITERATIONS)
    }

    /// Opens the file, or starts an empty database when it is missing or
    /// cannot be decrypted with `passphrase`.
    pub fn open_with_iterations(
        path: impl Into<PathBuf>,
        passphrase: &str,
        iterations: u32,
    ) -> Result<Self, StoreError> {
        let path = path.into();
        let iterations = iterations.max(1);
        if let Some((envelope, salt)) = read_envelope(&path)? {
            let stored_iterations = envelope.iterations.max(1);
            let key = derive_key(passphrase, &salt, stored_iterations);
            match decrypt_envelope_with_key(&envelope, &key)? {
                Some(text) => {
                    let db = match serde_json::from_str::<Value>(&text) {
                        Ok(value) => ensure_db_shape_value(value),
                        Err(err) => {
                            log::warn!(
                                "local database at {} is not valid JSON: {err}",
                                path.display()
                            );
                            default_db_value()
                        }
                    };
                    return Ok(Self {
                        path,
                        salt,
                        key,
                        iterations: stored_iterations,
                        db,
                    });
                }
                None => {
                    log::warn!(
                        "could not decrypt local database at {}; starting empty",
                        path.display()
                    );
                }
            }
        }
        let mut salt = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut salt);
        let key = derive_key(passphrase, &salt, iterations);
        Ok(Self {
            path,
            salt: salt.to_vec(),
            key,
            iterations,
            db: default_db_value(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self) -> Result<(), StoreError> {
        let plaintext = serde_json::to_string(&self.db)?;
        let envelope = encrypt_text_with_key(&plaintext, &self.salt, &self.key, self.iterations)?;
        let content = serde_json::to_string(&envelope)?;
        write_text_file(&self.path, &content)
    }

    /// Applies a change to the in-memory copy and writes the file; the copy is
    /// rolled back when the write fails.
    fn write_through<T>(
        &mut self,
        change: impl FnOnce(&mut Value) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let before = self.db.clone();
        let out = change(&mut self.db)?;
        if let Err(err) = self.save() {
            self.db = before;
            return Err(err);
        }
        Ok(out)
    }
}

impl Store for LocalStore {
    fn describe(&self) -> String {
        format!("local file {}", self.path.display())
    }

    fn select(&self, table: Table) -> Result<Vec<Value>, StoreError> {
        Ok(rows(&self.db, table))
    }

    fn insert(&mut self, table: Table, record: Value) -> Result<Value, StoreError> {
        self.write_through(|db| insert_row(db, table, record))
    }

    fn update(&mut self, table: Table, id: &str, patch: Value) -> Result<(), StoreError> {
        self.write_through(|db| update_row(db, table, id, patch))
    }

    fn delete(&mut self, table: Table, id: &str) -> Result<(), StoreError> {
        if !rows(&self.db, table)
            .iter()
            .any(|row| crate::lenient::text_value(row.get("id")).as_deref() == Some(id))
        {
            return Ok(());
        }
        self.write_through(|db| delete_row(db, table, id).map(|_| ()))
    }
}

fn read_envelope(path: &Path) -> Result<Option<(CryptoEnvelope, Vec<u8>)>, StoreError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)?;
    let envelope: CryptoEnvelope = match serde_json::from_str(raw.as_str()) {
        Ok(value) => value,
        Err(_) => return Ok(None),
    };
    match decode_b64(envelope.salt.as_str()) {
        Ok(salt) if !salt.is_empty() => Ok(Some((envelope, salt))),
        _ => Ok(None),
    }
}

fn encrypt_text_with_key(
    text: &str,
    salt: &[u8],
    key: &[u8; 32],
    iterations: u32,
) -> Result<CryptoEnvelope, StoreError> {
    let mut iv = [0u8; IV_LEN];
    OsRng.fill_bytes(&mut iv);
    let cipher = Aes256Gcm::new_from_slice(key.as_slice())
        .map_err(|err| StoreError::Crypto(err.to_string()))?;
    let nonce = Nonce::from_slice(&iv);
    let encrypted = cipher
        .encrypt(nonce, text.as_bytes())
        .map_err(|err| StoreError::Crypto(err.to_string()))?;

    if encrypted.len() < TAG_LEN {
        return Err(StoreError::Crypto("encryption output too short".to_string()));
    }
    let split_at = encrypted.len() - TAG_LEN;
    let (data, tag) = encrypted.split_at(split_at);

    Ok(CryptoEnvelope {
        v: ENVELOPE_VERSION,
        salt: encode_b64(salt),
        iv: encode_b64(&iv),
        tag: encode_b64(tag),
        data: encode_b64(data),
        iterations,
    })
}

/// `Ok(None)` means the envelope is unreadable or the key is wrong.
fn decrypt_envelope_with_key(
    payload: &CryptoEnvelope,
    key: &[u8; 32],
) -> Result<Option<String>, StoreError> {
    let (Ok(iv), Ok(tag), Ok(data)) = (
        decode_b64(payload.iv.as_str()),
        decode_b64(payload.tag.as_str()),
        decode_b64(payload.data.as_str()),
    ) else {
        return Ok(None);
    };
    if iv.len() != IV_LEN || tag.is_empty() {
        return Ok(None);
    }

    let cipher = Aes256Gcm::new_from_slice(key.as_slice())
        .map_err(|err| StoreError::Crypto(err.to_string()))?;
    let nonce = Nonce::from_slice(iv.as_slice());
    let mut combined = Vec::with_capacity(data.len() + tag.len());
    combined.extend_from_slice(data.as_slice());
    combined.extend_from_slice(tag.as_slice());

    let decrypted = match cipher.decrypt(nonce, combined.as_slice()) {
        Ok(value) => value,
        Err(_) => return Ok(None),
    };
    Ok(String::from_utf8(decrypted).ok())
}

fn write_text_file(path: &Path, content: &str) -> Result<(), StoreError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    Ok(())
}

fn derive_key(passphrase: &str, salt: &[u8], iterations: u32) -> [u8; 32] {
    let mut key = [0u8; 32];
    pbkdf2_hmac::<Sha256>(passphrase.as_bytes(), salt, iterations, &mut key);
    key
}

fn decode_b64(value: &str) -> Result<Vec<u8>, base64::DecodeError> {
    B64.decode(value)
}

fn encode_b64(bytes: &[u8]) -> String {
    B64.encode(bytes)
}
