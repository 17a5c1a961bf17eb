//! Decryption of inbound payloads: base64(IV || AES-256-CBC ciphertext).

use aes::cipher::{block_padding::NoPadding, BlockDecryptMut, KeyIvInit};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

use crate::errors::CryptoError;

type Aes256CbcDec = cbc::Decryptor<aes::Aes256>;

const BLOCK: usize = 16;
const KEY_LEN: usize = 32;

/// Decrypt a transport-encoded payload with the subscription's hex key.
///
/// A trailing PKCS#7 pad is stripped when well formed; otherwise the
/// decrypted blocks are returned as-is (zero-padded senders keep working).
pub fn decrypt(transport_encoded: &str, key_hex: &str) -> Result<String, CryptoError> {
    let key = hex::decode(key_hex.trim()).map_err(|_| CryptoError::KeyFormat)?;
    if key.len() != KEY_LEN {
        return Err(CryptoError::KeyFormat);
    }

    let payload = BASE64
        .decode(transport_encoded.trim())
        .map_err(|_| CryptoError::PayloadFormat)?;

    let (iv, body) = split_iv(&payload)?;
    if body.len() % BLOCK != 0 {
        return Err(CryptoError::PayloadFormat);
    }

    let mut buf = body.to_vec();
    let plain = Aes256CbcDec::new_from_slices(&key, iv)
        .map_err(|_| CryptoError::KeyFormat)?
        .decrypt_padded_mut::<NoPadding>(&mut buf)
        .map_err(|_| CryptoError::PayloadFormat)?;

    Ok(String::from_utf8_lossy(strip_pkcs7(plain)).into_owned())
}

/// First block is the IV; at least one ciphertext block must follow.
fn split_iv(payload: &[u8]) -> Result<(&[u8], &[u8]), CryptoError> {
    if payload.len() < BLOCK * 2 {
        return Err(CryptoError::ShortCiphertext);
    }
    Ok(payload.split_at(BLOCK))
}

fn strip_pkcs7(data: &[u8]) -> &[u8] {
    let Some(&last) = data.last() else {
        return data;
    };
    let n = last as usize;
    if n == 0 || n > BLOCK || n > data.len() {
        return data;
    }
    let (head, pad) = data.split_at(data.len() - n);
    if pad.iter().all(|&b| b == last) {
        head
    } else {
        data
    }
}
