//! AES-128-ECB payload engine
//!
//! Every 16-byte block is enciphered independently with the per-bike key.
//! There is no IV, no chaining and no integrity tag; the wire protocol only
//! provides confidentiality.

use aes::{
    Aes128,
    cipher::{BlockDecrypt, BlockEncrypt, KeyInit, generic_array::GenericArray},
};
use std::fmt;

use crate::core::{
    error::{CipherResult, FormatError},
    types::Nonce,
};

/// AES block size in bytes
pub const BLOCK_SIZE: usize = 16;

/// Length of the encryption key in bytes
pub const KEY_SIZE: usize = 16;

/// Unencrypted trailer the module expects after the authentication block
pub const AUTH_TRAILER: [u8; 4] = [0x00, 0x00, 0x00, 0x02];

/// Length of the authentication payload on the wire
pub const AUTH_PAYLOAD_LEN: usize = BLOCK_SIZE + AUTH_TRAILER.len();

/// Symmetric cipher bound to one bike key
#[derive(Clone)]
pub struct CipherEngine {
    cipher: Aes128,
}

impl CipherEngine {
    /// Create an engine from raw key bytes
    pub fn new(key: [u8; KEY_SIZE]) -> Self {
        Self {
            cipher: Aes128::new(GenericArray::from_slice(&key)),
        }
    }

    /// Create an engine from the hexadecimal key issued by the account service
    pub fn from_hex(key: &str) -> CipherResult<Self> {
        let bytes =
            hex::decode(key.trim()).map_err(|e| FormatError::InvalidKeyEncoding(e.to_string()))?;
        let key: [u8; KEY_SIZE] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| FormatError::InvalidKeyLength(bytes.len()))?;

        Ok(Self::new(key))
    }

    /// Decrypt a ciphertext made of whole blocks
    pub fn decrypt(&self, ciphertext: &[u8]) -> CipherResult<Vec<u8>> {
        if ciphertext.len() % BLOCK_SIZE != 0 {
            return Err(FormatError::UnalignedCiphertext(ciphertext.len()));
        }

        let mut output = ciphertext.to_vec();
        for block in output.chunks_exact_mut(BLOCK_SIZE) {
            self.cipher.decrypt_block(GenericArray::from_mut_slice(block));
        }

        Ok(output)
    }

    /// Encrypt a plaintext made of whole blocks
    pub fn encrypt_blocks(&self, plaintext: &[u8]) -> CipherResult<Vec<u8>> {
        if plaintext.len() % BLOCK_SIZE != 0 {
            return Err(FormatError::UnalignedPlaintext(plaintext.len()));
        }

        let mut output = plaintext.to_vec();
        self.encrypt_in_place(&mut output);
        Ok(output)
    }

    /// Build an encrypted command payload
    ///
    /// Layout before encryption: nonce (2 bytes), `data`, then zero padding
    /// up to the next multiple of 16 bytes. Long `data` spans several blocks.
    pub fn build_encrypted_payload(&self, nonce: &Nonce, data: &[u8]) -> Vec<u8> {
        let mut payload = Vec::with_capacity(padded_len(Nonce::LEN + data.len()));
        payload.extend_from_slice(nonce.as_bytes());
        payload.extend_from_slice(data);
        payload.resize(padded_len(payload.len()), 0);

        self.encrypt_in_place(&mut payload);
        payload
    }

    /// Build the 20-byte authentication payload
    ///
    /// One encrypted block holding the nonce followed by zeros, then the
    /// plaintext trailer `00 00 00 02`. The trailer is appended after
    /// encryption; the module rejects it otherwise.
    pub fn build_authentication_payload(&self, nonce: &Nonce) -> Vec<u8> {
        let mut block = [0u8; BLOCK_SIZE];
        block[..Nonce::LEN].copy_from_slice(nonce.as_bytes());
        self.cipher.encrypt_block(GenericArray::from_mut_slice(&mut block));

        let mut payload = Vec::with_capacity(AUTH_PAYLOAD_LEN);
        payload.extend_from_slice(&block);
        payload.extend_from_slice(&AUTH_TRAILER);
        payload
    }

    fn encrypt_in_place(&self, buffer: &mut [u8]) {
        for block in buffer.chunks_exact_mut(BLOCK_SIZE) {
            self.cipher.encrypt_block(GenericArray::from_mut_slice(block));
        }
    }
}

impl fmt::Debug for CipherEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CipherEngine")
            .field("key", &"<redacted>")
            .finish()
    }
}

/// Smallest multiple of the block size that holds `len` bytes
///
/// A zero-length input still occupies one block.
pub fn padded_len(len: usize) -> usize {
    len.div_ceil(BLOCK_SIZE).max(1) * BLOCK_SIZE
}
