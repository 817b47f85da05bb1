//! Symmetric encryption of serialized records.
//!
//! Stored text is `base64(nonce || ciphertext || tag)` under AES-256-GCM.
//! The nonce is synthetic: the first 12 bytes of HMAC-SHA256 over the
//! plaintext. Encrypting the same plaintext twice yields the same text, so a
//! record re-assigned without changes leaves its column untouched.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use ring::aead::{AES_256_GCM, Aad, LessSafeKey, NONCE_LEN, Nonce, UnboundKey};
use sha2::Sha256;

use tableless_core::{CodecError, CodecErrorKind, Result};

use crate::config::EncryptionConfig;

type HmacSha256 = Hmac<Sha256>;

const KEY_LEN: usize = 32;

/// Associated data bound into every ciphertext.
const AAD: &[u8] = b"tableless:v1";

/// Encrypts and decrypts column text with keys derived from a secret.
pub struct MessageEncryptor {
    cipher_key: [u8; KEY_LEN],
    nonce_key: [u8; KEY_LEN],
}

impl MessageEncryptor {
    /// Derive keys from `config`. An empty secret is rejected.
    pub fn new(config: &EncryptionConfig) -> Result<Self> {
        if config.secret().is_empty() {
            return Err(CodecError::new(CodecErrorKind::Key, "encryption key must not be empty").into());
        }

        let mut derived = [0u8; KEY_LEN * 2];
        pbkdf2::pbkdf2_hmac::<Sha256>(
            config.secret().as_bytes(),
            config.salt().as_bytes(),
            config.iterations(),
            &mut derived,
        );

        let mut cipher_key = [0u8; KEY_LEN];
        let mut nonce_key = [0u8; KEY_LEN];
        cipher_key.copy_from_slice(&derived[..KEY_LEN]);
        nonce_key.copy_from_slice(&derived[KEY_LEN..]);
        Ok(Self {
            cipher_key,
            nonce_key,
        })
    }

    /// Shorthand for [`MessageEncryptor::new`] with default salt and rounds.
    pub fn from_secret(secret: &str) -> Result<Self> {
        Self::new(&EncryptionConfig::new(secret))
    }

    /// Encrypt `plaintext` into base64 text.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<String> {
        let nonce = self.synthetic_nonce(plaintext)?;
        let key = self.sealing_key(CodecErrorKind::Encrypt)?;

        let mut in_out = plaintext.to_vec();
        key.seal_in_place_append_tag(
            Nonce::assume_unique_for_key(nonce),
            Aad::from(AAD),
            &mut in_out,
        )
        .map_err(|e| CodecError::new(CodecErrorKind::Encrypt, "sealing failed").with_source(e))?;

        let mut payload = Vec::with_capacity(NONCE_LEN + in_out.len());
        payload.extend_from_slice(&nonce);
        payload.extend_from_slice(&in_out);
        Ok(STANDARD.encode(payload))
    }

    /// Decrypt text produced by [`MessageEncryptor::encrypt`].
    ///
    /// Malformed, truncated or tampered input and a wrong key all fail with a
    /// `Decrypt` codec error.
    pub fn decrypt(&self, text: &str) -> Result<Vec<u8>> {
        let payload = STANDARD.decode(text.trim()).map_err(|e| {
            CodecError::new(CodecErrorKind::Decrypt, "stored text is not base64").with_source(e)
        })?;
        if payload.len() < NONCE_LEN + AES_256_GCM.tag_len() {
            return Err(CodecError::new(
                CodecErrorKind::Decrypt,
                format!("ciphertext too short: {} bytes", payload.len()),
            )
            .into());
        }

        let (nonce, sealed) = payload.split_at(NONCE_LEN);
        let nonce = Nonce::try_assume_unique_for_key(nonce)
            .map_err(|e| CodecError::new(CodecErrorKind::Decrypt, "invalid nonce").with_source(e))?;
        let key = self.sealing_key(CodecErrorKind::Decrypt)?;

        let mut in_out = sealed.to_vec();
        let plaintext = key
            .open_in_place(nonce, Aad::from(AAD), &mut in_out)
            .map_err(|e| {
                CodecError::new(
                    CodecErrorKind::Decrypt,
                    "authentication failed (wrong key or tampered data)",
                )
                .with_source(e)
            })?;
        Ok(plaintext.to_vec())
    }

    fn sealing_key(&self, kind: CodecErrorKind) -> Result<LessSafeKey> {
        let unbound = UnboundKey::new(&AES_256_GCM, &self.cipher_key)
            .map_err(|e| CodecError::new(kind, "invalid cipher key").with_source(e))?;
        Ok(LessSafeKey::new(unbound))
    }

    fn synthetic_nonce(&self, plaintext: &[u8]) -> Result<[u8; NONCE_LEN]> {
        let mut mac = <HmacSha256 as Mac>::new_from_slice(&self.nonce_key)
            .map_err(|_| CodecError::new(CodecErrorKind::Key, "invalid nonce key"))?;
        mac.update(plaintext);
        let digest = mac.finalize().into_bytes();

        let mut nonce = [0u8; NONCE_LEN];
        nonce.copy_from_slice(&digest[..NONCE_LEN]);
        Ok(nonce)
    }
}

impl std::fmt::Debug for MessageEncryptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageEncryptor").finish_non_exhaustive()
    }
}
