//! Cryptogragic logics.
//!
//! Only the credential vault encrypts data, with AES-256-GCM and a key
//! derived once at startup.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;
use rand::rngs::OsRng;
use zeroize::Zeroizing;

const NONCE_SIZE: usize = 12;
const KEY_LENGTH: usize = 32;
const MEMORY_COST: u32 = 1024 * 64; // 64 MiB.
const ITERATIONS: u32 = 8;
const PARALLELISM: u32 = 2;

type Result<T> = std::result::Result<T, CryptoError>;

#[derive(thiserror::Error, Debug)]
pub enum CryptoError {
    #[error("aes-gcm failed to process data")]
    AesGcm(aes_gcm::Error),
    #[error("argon2 error: {0}")]
    Argon2(String),

    #[error("hex is not valid")]
    Hex(#[from] hex::FromHexError),
    #[error("encrypted data is not utf8")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("key length is {value} while {excepted} is excepted")]
    KeyLength { value: usize, excepted: usize },
}

impl From<aes_gcm::Error> for CryptoError {
    fn from(err: aes_gcm::Error) -> Self {
        CryptoError::AesGcm(err)
    }
}

/// Cryptographic manager.
pub struct Crypto {
    pub symmetric: SymmetricCipher,
}

impl Crypto {
    /// Create a new [`Crypto`].
    pub fn new(
        master_key: impl AsRef<[u8]>,
        salt: impl AsRef<[u8]>,
    ) -> Result<Self> {
        let key = SymmetricKey::derive_from_password(master_key, salt)?;

        Ok(Self::from_key(key))
    }

    /// Create a [`Crypto`] from an already derived key.
    pub fn from_key(key: SymmetricKey) -> Self {
        Self {
            symmetric: SymmetricCipher::new(key),
        }
    }
}

/// SymmetricKey holds a fixed-size key protected by Zeroizing.
#[derive(Clone)]
pub struct SymmetricKey(Zeroizing<[u8; KEY_LENGTH]>);

impl SymmetricKey {
    /// Create from raw bytes (must be 32 bytes).
    pub fn from_bytes(bytes: impl AsRef<[u8]>) -> Result<Self> {
        let bytes = bytes.as_ref();
        let key: [u8; KEY_LENGTH] =
            bytes.try_into().map_err(|_| CryptoError::KeyLength {
                value: bytes.len(),
                excepted: KEY_LENGTH,
            })?;

        Ok(Self(Zeroizing::new(key)))
    }

    /// Derive key from a password + salt using Argon2id.
    pub fn derive_from_password(
        password: impl AsRef<[u8]>,
        salt: impl AsRef<[u8]>,
    ) -> Result<Self> {
        let params =
            Params::new(MEMORY_COST, ITERATIONS, PARALLELISM, Some(KEY_LENGTH))
                .map_err(|err| CryptoError::Argon2(err.to_string()))?;
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        let mut key = Zeroizing::new([0u8; KEY_LENGTH]);
        argon2
            .hash_password_into(password.as_ref(), salt.as_ref(), key.as_mut())
            .map_err(|err| CryptoError::Argon2(err.to_string()))?;

        Ok(Self(key))
    }

    fn as_slice(&self) -> &[u8] {
        self.0.as_ref()
    }
}

/// SymmetricCipher provides encrypt/decrypt operations with AES-256-GCM.
pub struct SymmetricCipher {
    key: SymmetricKey,
}

impl SymmetricCipher {
    /// Create a new [`SymmetricCipher`].
    pub fn new(key: SymmetricKey) -> Self {
        Self { key }
    }

    pub fn encrypt_and_hex(
        &self,
        plaintext: impl AsRef<[u8]>,
    ) -> Result<String> {
        let cipher_text = self.encrypt(plaintext)?;
        Ok(hex::encode(cipher_text))
    }

    pub fn decrypt_from_hex(&self, data: impl AsRef<[u8]>) -> Result<String> {
        let data = hex::decode(data)?;
        let plain = self.decrypt(data)?;
        Ok(String::from_utf8(plain)?)
    }

    /// Encrypts data returning raw bytes, nonce first.
    pub fn encrypt(&self, plaintext: impl AsRef<[u8]>) -> Result<Vec<u8>> {
        let key = Key::<Aes256Gcm>::from_slice(self.key.as_slice());
        let cipher = Aes256Gcm::new(key);

        // Generate random 96-bit nonce.
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let cipher_text = cipher.encrypt(nonce, plaintext.as_ref())?;

        let mut out = Vec::with_capacity(NONCE_SIZE + cipher_text.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&cipher_text);
        Ok(out)
    }

    /// Decrypt raw data.
    pub fn decrypt(&self, data: impl AsRef<[u8]>) -> Result<Vec<u8>> {
        let data = data.as_ref();
        if data.len() < NONCE_SIZE {
            return Err(CryptoError::KeyLength {
                value: data.len(),
                excepted: NONCE_SIZE,
            });
        }

        let (nonce_bytes, cipher_text) = data.split_at(NONCE_SIZE);
        let nonce = Nonce::from_slice(nonce_bytes);

        let key = Key::<Aes256Gcm>::from_slice(self.key.as_slice());
        let cipher = Aes256Gcm::new(key);

        Ok(cipher.decrypt(nonce, cipher_text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cipher() -> SymmetricCipher {
        SymmetricCipher::new(SymmetricKey::from_bytes([0x42; KEY_LENGTH]).unwrap())
    }

    #[test]
    fn test_aes256() {
        let cipher = cipher();

        let plaintext = "super_secret_data";
        let encrypted_data = cipher.encrypt_and_hex(plaintext).unwrap();
        assert_ne!(encrypted_data, hex::encode(plaintext));

        let decrypted_data = cipher.decrypt_from_hex(&encrypted_data).unwrap();
        assert_eq!(plaintext, decrypted_data);
    }

    #[test]
    fn test_nonce_is_random() {
        let cipher = cipher();
        assert_ne!(cipher.encrypt("data").unwrap(), cipher.encrypt("data").unwrap());
    }

    #[test]
    fn test_tampered_data() {
        let cipher = cipher();
        let mut data = cipher.encrypt("data").unwrap();
        let last = data.len() - 1;
        data[last] ^= 0x01;

        assert!(cipher.decrypt(&data).is_err());
        assert!(cipher.decrypt([0u8; 4]).is_err());
    }

    #[test]
    fn test_key_length() {
        assert!(matches!(
            SymmetricKey::from_bytes([0u8; 16]),
            Err(CryptoError::KeyLength { value: 16, .. })
        ));
    }
}
