//! Ciphertext wire format.
//!
//! Outer layout (unencrypted envelope):
//!
//! ```text
//! [flag:1][key_id_len:1][key_id:N][nonce:24][sealed_payload:...]
//! ```
//!
//! Inner layout (encrypted, authenticated by the AEAD):
//!
//! ```text
//! [key_id_len:1][key_id:N][payload:...]
//! ```
//!
//! The outer key id only selects which key to attempt decryption with; the
//! binding that defeats key-confusion attacks is the authenticated inner
//! copy, verified by the cipher engine after decryption. The transform flag
//! sits outside the AEAD envelope; authenticating it would be a wire-format
//! version bump.
//!
//! This module performs no cryptography. It is the single place where
//! untrusted bytes are structurally validated before anything is decrypted.

use crate::error::Error;

/// Nonce size for the AEAD construction (192 bits).
pub const NONCE_SIZE: usize = 24;

/// Maximum encoded key id length in bytes.
pub const MAX_KEY_ID_LEN: usize = 255;

/// Pre-encryption transform recorded in the envelope flag byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformFlag {
    /// No transform applied
    None,
    /// Payload compressed with zstd before encryption
    Zstd,
    /// Reserved for a second codec; parses but cannot be reversed
    Reserved,
}

impl TransformFlag {
    /// Returns the wire byte for this flag.
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        match self {
            Self::None => 0x00,
            Self::Zstd => 0x01,
            Self::Reserved => 0x02,
        }
    }

    /// Parses a wire flag byte.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidFormat` for bytes outside the known range.
    pub fn from_u8(value: u8) -> Result<Self, Error> {
        match value {
            0x00 => Ok(Self::None),
            0x01 => Ok(Self::Zstd),
            0x02 => Ok(Self::Reserved),
            other => Err(Error::InvalidFormat(format!("unknown transform flag {other:#04x}"))),
        }
    }
}

/// Parsed outer envelope of a ciphertext.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OuterEnvelope {
    flag: TransformFlag,
    key_id: String,
    nonce: [u8; NONCE_SIZE],
    sealed_payload: Vec<u8>,
}

impl OuterEnvelope {
    /// Creates an envelope from its parts.
    #[must_use]
    pub fn new(
        flag: TransformFlag,
        key_id: impl Into<String>,
        nonce: [u8; NONCE_SIZE],
        sealed_payload: Vec<u8>,
    ) -> Self {
        Self { flag, key_id: key_id.into(), nonce, sealed_payload }
    }

    /// Returns the transform flag.
    #[must_use]
    pub const fn flag(&self) -> TransformFlag {
        self.flag
    }

    /// Returns the outer (unauthenticated) key id.
    #[must_use]
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Returns the nonce.
    #[must_use]
    pub const fn nonce(&self) -> &[u8; NONCE_SIZE] {
        &self.nonce
    }

    /// Returns the sealed payload.
    #[must_use]
    pub fn sealed_payload(&self) -> &[u8] {
        &self.sealed_payload
    }

    /// Serializes the envelope to bytes.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidFormat` if the key id is empty or longer than
    /// [`MAX_KEY_ID_LEN`] bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, Error> {
        let key_id = self.key_id.as_bytes();
        validate_key_id_len(key_id.len())?;

        let mut bytes =
            Vec::with_capacity(2 + key_id.len() + NONCE_SIZE + self.sealed_payload.len());
        bytes.push(self.flag.as_u8());
        // Safe cast: length validated above, max 255
        #[allow(clippy::cast_possible_truncation)]
        bytes.push(key_id.len() as u8);
        bytes.extend_from_slice(key_id);
        bytes.extend_from_slice(&self.nonce);
        bytes.extend_from_slice(&self.sealed_payload);

        Ok(bytes)
    }

    /// Deserializes an envelope from bytes.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidFormat` if the data is too short, the key id
    /// length is zero, the declared lengths exceed the buffer, or the key id
    /// is not valid UTF-8.
    pub fn from_bytes(data: &[u8]) -> Result<Self, Error> {
        // flag + key_id_len + at least 1 key id byte + nonce
        if data.len() < 3 + NONCE_SIZE {
            return Err(Error::InvalidFormat(format!(
                "ciphertext too short: {} bytes",
                data.len()
            )));
        }

        let flag = TransformFlag::from_u8(data[0])?;

        let key_id_len = data[1] as usize;
        if key_id_len == 0 {
            return Err(Error::InvalidFormat("zero-length key id".to_string()));
        }

        let mut pos = 2;
        if pos + key_id_len + NONCE_SIZE > data.len() {
            return Err(Error::InvalidFormat("key id truncated".to_string()));
        }
        let key_id = String::from_utf8(data[pos..pos + key_id_len].to_vec())
            .map_err(|e| Error::InvalidFormat(format!("key id not UTF-8: {e}")))?;
        pos += key_id_len;

        let mut nonce = [0u8; NONCE_SIZE];
        nonce.copy_from_slice(&data[pos..pos + NONCE_SIZE]);
        pos += NONCE_SIZE;

        let sealed_payload = data[pos..].to_vec();

        Ok(Self { flag, key_id, nonce, sealed_payload })
    }
}

/// Serializes an inner plaintext: the authenticated key id copy followed by
/// the payload.
///
/// # Errors
///
/// Returns `Error::InvalidFormat` if the key id is empty or longer than
/// [`MAX_KEY_ID_LEN`] bytes.
pub fn encode_inner(key_id: &str, payload: &[u8]) -> Result<Vec<u8>, Error> {
    let key_id = key_id.as_bytes();
    validate_key_id_len(key_id.len())?;

    let mut bytes = Vec::with_capacity(1 + key_id.len() + payload.len());
    // Safe cast: length validated above, max 255
    #[allow(clippy::cast_possible_truncation)]
    bytes.push(key_id.len() as u8);
    bytes.extend_from_slice(key_id);
    bytes.extend_from_slice(payload);

    Ok(bytes)
}

/// Splits a decrypted inner plaintext into its key id bytes and payload.
///
/// The key id is returned as raw bytes so the cipher engine can compare it
/// against the outer id in constant time before interpreting it.
///
/// # Errors
///
/// Returns `Error::InvalidFormat` if the data is empty, the key id length is
/// zero, or the declared length exceeds the buffer.
pub fn decode_inner(data: &[u8]) -> Result<(&[u8], &[u8]), Error> {
    if data.is_empty() {
        return Err(Error::InvalidFormat("empty inner plaintext".to_string()));
    }

    let key_id_len = data[0] as usize;
    if key_id_len == 0 {
        return Err(Error::InvalidFormat("zero-length inner key id".to_string()));
    }
    if 1 + key_id_len > data.len() {
        return Err(Error::InvalidFormat("inner key id truncated".to_string()));
    }

    Ok((&data[1..1 + key_id_len], &data[1 + key_id_len..]))
}

fn validate_key_id_len(len: usize) -> Result<(), Error> {
    if len == 0 {
        return Err(Error::InvalidFormat("empty key id".to_string()));
    }
    if len > MAX_KEY_ID_LEN {
        return Err(Error::InvalidFormat(format!(
            "key id too long: {len} bytes (max: {MAX_KEY_ID_LEN})"
        )));
    }
    Ok(())
}
