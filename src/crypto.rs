//! crypto - sealing of stored credentials (AES-256-GCM).
//!
//! Формат sealed-блоба (до base64):
//!   [nonce 12][tag 16][ciphertext]
//!
//! AAD = "SCCRED1" || host - пароль нельзя "переставить" на другой хост.
//! Nonce = 12 случайных байт (rand::rngs::OsRng).
//!
//! ENV (порядок проверки):
//!   SNAPCLONE_CRED_KEY_HEX / SNAPCLONE_CRED_KEY_BASE64 - 32-байтовый ключ
//!   SNAPCLONE_CRED_PASSPHRASE - произвольная строка, ключ = SHA-256(passphrase)

use aes_gcm::{
    aead::{generic_array::GenericArray, AeadInPlace, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use anyhow::{anyhow, Result};
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

const AAD_PREFIX: &[u8; 7] = b"SCCRED1";
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

pub const ENV_KEY_HEX: &str = "SNAPCLONE_CRED_KEY_HEX";
pub const ENV_KEY_BASE64: &str = "SNAPCLONE_CRED_KEY_BASE64";
pub const ENV_PASSPHRASE: &str = "SNAPCLONE_CRED_PASSPHRASE";

/// Symmetric key used to seal passwords in the credential store.
#[derive(Clone)]
pub struct SealKey {
    key: [u8; 32],
}

impl std::fmt::Debug for SealKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SealKey(..)")
    }
}

impl SealKey {
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(Self {
            key: slice32(bytes)?,
        })
    }

    pub fn from_passphrase(passphrase: &str) -> Self {
        let digest = Sha256::digest(passphrase.as_bytes());
        let mut key = [0u8; 32];
        key.copy_from_slice(&digest);
        Self { key }
    }

    /// Key from ENV, or None when nothing is configured.
    pub fn from_env() -> Result<Option<Self>> {
        if let Ok(hex) = std::env::var(ENV_KEY_HEX) {
            let mut v = decode_hex_trimmed(&hex)?;
            let k = Self::from_bytes(&v);
            v.zeroize();
            return k.map(Some);
        }
        if let Ok(b64) = std::env::var(ENV_KEY_BASE64) {
            let mut v = base64::engine::general_purpose::STANDARD
                .decode(b64.trim().as_bytes())
                .map_err(|e| anyhow!("base64 decode: {}", e))?;
            let k = Self::from_bytes(&v);
            v.zeroize();
            return k.map(Some);
        }
        if let Ok(mut pass) = std::env::var(ENV_PASSPHRASE) {
            if !pass.is_empty() {
                let k = Self::from_passphrase(&pass);
                pass.zeroize();
                return Ok(Some(k));
            }
        }
        Ok(None)
    }

    /// Seal `secret` for `host`; returns base64 text suitable for the store.
    pub fn seal(&self, host: &str, secret: &str) -> Result<String> {
        let mut buf = secret.as_bytes().to_vec();
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);

        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.key));
        let tag = cipher
            .encrypt_in_place_detached(Nonce::from_slice(&nonce), &build_aad(host), &mut buf)
            .map_err(|e| anyhow!("seal aes-gcm: {}", e))?;

        let mut out = Vec::with_capacity(NONCE_LEN + TAG_LEN + buf.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(tag.as_slice());
        out.extend_from_slice(&buf);
        buf.zeroize();
        Ok(base64::engine::general_purpose::STANDARD.encode(out))
    }

    /// Reverse of [`SealKey::seal`]. Fails on a wrong key or a foreign host.
    pub fn open(&self, host: &str, sealed: &str) -> Result<String> {
        let raw = base64::engine::general_purpose::STANDARD
            .decode(sealed.trim().as_bytes())
            .map_err(|e| anyhow!("sealed credential base64: {}", e))?;
        if raw.len() < NONCE_LEN + TAG_LEN {
            return Err(anyhow!("sealed credential too short"));
        }
        let (nonce, rest) = raw.split_at(NONCE_LEN);
        let (tag, ct) = rest.split_at(TAG_LEN);
        let mut pt = ct.to_vec();

        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.key));
        cipher
            .decrypt_in_place_detached(
                Nonce::from_slice(nonce),
                &build_aad(host),
                &mut pt,
                GenericArray::from_slice(tag),
            )
            .map_err(|e| anyhow!("open sealed credential for '{}': {}", host, e))?;

        String::from_utf8(pt).map_err(|e| anyhow!("sealed credential utf8: {}", e))
    }
}

impl Drop for SealKey {
    fn drop(&mut self) {
        self.key.zeroize();
    }
}

// ---------------- helpers ----------------

fn build_aad(host: &str) -> Vec<u8> {
    let mut aad = Vec::with_capacity(AAD_PREFIX.len() + host.len());
    aad.extend_from_slice(AAD_PREFIX);
    aad.extend_from_slice(host.as_bytes());
    aad
}

fn slice32(bytes: &[u8]) -> Result<[u8; 32]> {
    if bytes.len() != 32 {
        return Err(anyhow!("key must be exactly 32 bytes, got {}", bytes.len()));
    }
    let mut out = [0u8; 32];
    out.copy_from_slice(bytes);
    Ok(out)
}

fn decode_hex_trimmed(s: &str) -> Result<Vec<u8>> {
    let s = s.trim();
    if s.len() % 2 != 0 {
        return Err(anyhow!("hex key must have even length"));
    }
    let mut out = Vec::with_capacity(s.len() / 2);
    let bytes = s.as_bytes();
    for i in (0..bytes.len()).step_by(2) {
        let h = (bytes[i] as char)
            .to_digit(16)
            .ok_or_else(|| anyhow!("invalid hex at pos {}", i))?;
        let l = (bytes[i + 1] as char)
            .to_digit(16)
            .ok_or_else(|| anyhow!("invalid hex at pos {}", i + 1))?;
        out.push(((h << 4) | l) as u8);
    }
    Ok(out)
}
