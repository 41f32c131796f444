//! Encrypted save container: a 16-byte IV followed by AES-128-CBC ciphertext of
//! the PKCS#7-padded payload. The key is PBKDF2-HMAC-SHA1 over the passphrase,
//! salted with the IV, 100 rounds.
//!
//! The passphrase ships with the game, so this only keeps casual editors out; it is
//! not a security boundary.

use aes::Aes128;
use cbc::cipher::block_padding::NoPadding;
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use log::debug;
use sha1::Sha1;

use crate::core_api::{CoreError, CoreErrorCode};

/// Passphrase the game itself uses for `.es3` saves.
pub const DEFAULT_PASSPHRASE: &str = "Why would you want to cheat?... :o It's no fun. :') :'D";

pub const BLOCK_LEN: usize = 16;
pub const IV_LEN: usize = 16;
pub const KEY_LEN: usize = 16;
pub const KDF_ROUNDS: u32 = 100;

type Aes128CbcEnc = cbc::Encryptor<Aes128>;
type Aes128CbcDec = cbc::Decryptor<Aes128>;

pub fn derive_key(passphrase: &str, iv: &[u8; IV_LEN]) -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    pbkdf2::pbkdf2_hmac::<Sha1>(passphrase.as_bytes(), iv, KDF_ROUNDS, &mut key);
    key
}

/// Encrypts `plaintext` under a fresh random IV.
pub fn encrypt(plaintext: &[u8], passphrase: &str) -> Vec<u8> {
    let iv: [u8; IV_LEN] = rand::random();
    encrypt_with_iv(plaintext, passphrase, iv)
}

/// Encrypts with a caller-chosen IV. Output is deterministic, which is what the
/// fixture compatibility tests rely on; real saves should go through [`encrypt`].
pub fn encrypt_with_iv(plaintext: &[u8], passphrase: &str, iv: [u8; IV_LEN]) -> Vec<u8> {
    let key = derive_key(passphrase, &iv);
    let padded = pkcs7_pad(plaintext);
    let ciphertext =
        Aes128CbcEnc::new(&key.into(), &iv.into()).encrypt_padded_vec_mut::<NoPadding>(&padded);

    debug!(
        "encrypted {} plaintext bytes into {} ciphertext bytes",
        plaintext.len(),
        ciphertext.len()
    );

    let mut out = Vec::with_capacity(IV_LEN + ciphertext.len());
    out.extend_from_slice(&iv);
    out.extend_from_slice(&ciphertext);
    out
}

pub fn decrypt(container: &[u8], passphrase: &str) -> Result<Vec<u8>, CoreError> {
    if container.len() < IV_LEN {
        return Err(CoreError::new(
            CoreErrorCode::MalformedContainer,
            format!(
                "container is {} bytes, too short for a {IV_LEN}-byte IV",
                container.len()
            ),
        ));
    }

    let (iv_bytes, ciphertext) = container.split_at(IV_LEN);
    if ciphertext.len() % BLOCK_LEN != 0 {
        return Err(CoreError::new(
            CoreErrorCode::MalformedContainer,
            format!(
                "ciphertext length {} is not a multiple of {BLOCK_LEN}",
                ciphertext.len()
            ),
        ));
    }

    let mut iv = [0u8; IV_LEN];
    iv.copy_from_slice(iv_bytes);
    let key = derive_key(passphrase, &iv);

    let decrypted = Aes128CbcDec::new(&key.into(), &iv.into())
        .decrypt_padded_vec_mut::<NoPadding>(ciphertext)
        .map_err(|e| {
            CoreError::new(
                CoreErrorCode::MalformedContainer,
                format!("block decryption failed: {e}"),
            )
        })?;

    pkcs7_unpad(decrypted)
}

fn pkcs7_pad(data: &[u8]) -> Vec<u8> {
    let pad_len = BLOCK_LEN - (data.len() % BLOCK_LEN);
    let mut out = Vec::with_capacity(data.len() + pad_len);
    out.extend_from_slice(data);
    out.resize(data.len() + pad_len, pad_len as u8);
    out
}

// Full PKCS#7 check: every padding byte must equal the pad length.
fn pkcs7_unpad(mut data: Vec<u8>) -> Result<Vec<u8>, CoreError> {
    let Some(&last) = data.last() else {
        return Err(CoreError::new(
            CoreErrorCode::InvalidPadding,
            "decrypted payload is empty",
        ));
    };

    let pad_len = last as usize;
    if pad_len == 0 || pad_len > BLOCK_LEN || pad_len > data.len() {
        return Err(CoreError::new(
            CoreErrorCode::InvalidPadding,
            format!("invalid padding length {pad_len}"),
        ));
    }

    let body_len = data.len() - pad_len;
    if !data[body_len..].iter().all(|&b| b == last) {
        return Err(CoreError::new(
            CoreErrorCode::InvalidPadding,
            "padding bytes do not match padding length",
        ));
    }

    data.truncate(body_len);
    Ok(data)
}
