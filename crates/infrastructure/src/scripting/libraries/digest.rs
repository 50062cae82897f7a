//! Hashes, HMACs and key derivation behind `CryptoJS`.

use std::str::FromStr;

use hmac::{Hmac, Mac};
use md5::Md5;
use rand::RngCore;
use sha1::Sha1;
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};

use super::LibraryError;

/// Hash functions available to scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    /// MD5
    Md5,
    /// SHA-1
    Sha1,
    /// SHA-224
    Sha224,
    /// SHA-256
    Sha256,
    /// SHA-384
    Sha384,
    /// SHA-512
    Sha512,
}

impl FromStr for HashAlgorithm {
    type Err = LibraryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "MD5" => Ok(Self::Md5),
            "SHA1" => Ok(Self::Sha1),
            "SHA224" => Ok(Self::Sha224),
            "SHA256" => Ok(Self::Sha256),
            "SHA384" => Ok(Self::Sha384),
            "SHA512" => Ok(Self::Sha512),
            _ => Err(LibraryError::UnknownAlgorithm(s.to_string())),
        }
    }
}

macro_rules! keyed {
    ($digest:ty, $key:expr, $data:expr) => {{
        let mut mac = <Hmac<$digest> as Mac>::new_from_slice($key)
            .map_err(|e| LibraryError::InvalidKey(e.to_string()))?;
        mac.update($data);
        mac.finalize().into_bytes().to_vec()
    }};
}

impl HashAlgorithm {
    /// Hashes `data`.
    #[must_use]
    pub fn digest(self, data: &[u8]) -> Vec<u8> {
        match self {
            Self::Md5 => Md5::digest(data).to_vec(),
            Self::Sha1 => Sha1::digest(data).to_vec(),
            Self::Sha224 => Sha224::digest(data).to_vec(),
            Self::Sha256 => Sha256::digest(data).to_vec(),
            Self::Sha384 => Sha384::digest(data).to_vec(),
            Self::Sha512 => Sha512::digest(data).to_vec(),
        }
    }

    /// Computes the HMAC of `data` under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`LibraryError::InvalidKey`] if the MAC rejects the key.
    pub fn hmac(self, key: &[u8], data: &[u8]) -> Result<Vec<u8>, LibraryError> {
        Ok(match self {
            Self::Md5 => keyed!(Md5, key, data),
            Self::Sha1 => keyed!(Sha1, key, data),
            Self::Sha224 => keyed!(Sha224, key, data),
            Self::Sha256 => keyed!(Sha256, key, data),
            Self::Sha384 => keyed!(Sha384, key, data),
            Self::Sha512 => keyed!(Sha512, key, data),
        })
    }
}

/// OpenSSL `EVP_BytesToKey` with MD5 and one round.
///
/// Returns `key_len + iv_len` bytes: the key followed by the IV.
#[must_use]
pub fn evp_bytes_to_key(password: &[u8], salt: &[u8], key_len: usize, iv_len: usize) -> Vec<u8> {
    let wanted = key_len + iv_len;
    let mut derived = Vec::with_capacity(wanted + 16);
    let mut block: Vec<u8> = Vec::new();
    while derived.len() < wanted {
        let mut hasher = Md5::new();
        hasher.update(&block);
        hasher.update(password);
        hasher.update(salt);
        block = hasher.finalize().to_vec();
        derived.extend_from_slice(&block);
    }
    derived.truncate(wanted);
    derived
}

/// `len` bytes from the thread-local CSPRNG.
#[must_use]
pub fn random_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    rand::rng().fill_bytes(&mut bytes);
    bytes
}
