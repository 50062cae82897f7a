//! AES with the block modes and paddings `CryptoJS` exposes.
//!
//! Modes are built directly over the AES block primitive so that every
//! padding scheme, including none, behaves the same in every mode.

use std::str::FromStr;

use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use aes::{Aes128, Aes192, Aes256, Block};

use super::LibraryError;
use super::digest::random_bytes;

const BLOCK: usize = 16;

/// Block cipher mode of operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Electronic codebook.
    Ecb,
    /// Cipher block chaining.
    Cbc,
    /// Cipher feedback, full-block segments.
    Cfb,
    /// Output feedback.
    Ofb,
    /// Counter; the last 32 bits of the IV are the counter.
    Ctr,
}

impl FromStr for Mode {
    type Err = LibraryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "ECB" => Ok(Self::Ecb),
            "CBC" => Ok(Self::Cbc),
            "CFB" => Ok(Self::Cfb),
            "OFB" => Ok(Self::Ofb),
            "CTR" => Ok(Self::Ctr),
            _ => Err(LibraryError::UnknownMode(s.to_string())),
        }
    }
}

/// Padding scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Padding {
    /// PKCS#7
    Pkcs7,
    /// Zero bytes up to the block boundary; nothing when aligned.
    Zero,
    /// No padding.
    None,
    /// ANSI X9.23: zero bytes and a length byte.
    AnsiX923,
    /// ISO 10126: random bytes and a length byte.
    Iso10126,
}

impl FromStr for Padding {
    type Err = LibraryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pkcs7" => Ok(Self::Pkcs7),
            "zero" | "zeropadding" => Ok(Self::Zero),
            "none" | "nopadding" => Ok(Self::None),
            "ansix923" => Ok(Self::AnsiX923),
            "iso10126" => Ok(Self::Iso10126),
            _ => Err(LibraryError::UnknownPadding(s.to_string())),
        }
    }
}

impl Padding {
    fn pad(self, data: &mut Vec<u8>) {
        let fill = BLOCK - data.len() % BLOCK;
        match self {
            Self::None => {}
            Self::Zero => {
                if fill != BLOCK {
                    data.resize(data.len() + fill, 0);
                }
            }
            Self::Pkcs7 => data.resize(data.len() + fill, fill_byte(fill)),
            Self::AnsiX923 => {
                data.resize(data.len() + fill - 1, 0);
                data.push(fill_byte(fill));
            }
            Self::Iso10126 => {
                data.extend(random_bytes(fill - 1));
                data.push(fill_byte(fill));
            }
        }
    }

    fn unpad(self, data: &mut Vec<u8>) -> Option<()> {
        match self {
            Self::None => {}
            Self::Zero => {
                let kept = data.iter().rposition(|&b| b != 0).map_or(0, |i| i + 1);
                data.truncate(kept);
            }
            Self::Pkcs7 | Self::AnsiX923 | Self::Iso10126 => {
                let fill = usize::from(*data.last()?);
                if fill == 0 || fill > BLOCK || fill > data.len() {
                    return None;
                }
                let start = data.len() - fill;
                let body = &data[start..data.len() - 1];
                let consistent = match self {
                    Self::Pkcs7 => body.iter().all(|&b| usize::from(b) == fill),
                    Self::AnsiX923 => body.iter().all(|&b| b == 0),
                    _ => true,
                };
                if !consistent {
                    return None;
                }
                data.truncate(start);
            }
        }
        Some(())
    }
}

#[allow(clippy::cast_possible_truncation)]
const fn fill_byte(fill: usize) -> u8 {
    fill as u8
}

enum AesKey {
    Aes128(Aes128),
    Aes192(Aes192),
    Aes256(Aes256),
}

impl AesKey {
    fn new(key: &[u8]) -> Result<Self, LibraryError> {
        let invalid = || LibraryError::InvalidKey(format!("invalid AES key length: {} bytes", key.len()));
        match key.len() {
            16 => Aes128::new_from_slice(key).map(Self::Aes128).map_err(|_| invalid()),
            24 => Aes192::new_from_slice(key).map(Self::Aes192).map_err(|_| invalid()),
            32 => Aes256::new_from_slice(key).map(Self::Aes256).map_err(|_| invalid()),
            _ => Err(invalid()),
        }
    }

    fn encrypt(&self, block: &mut Block) {
        match self {
            Self::Aes128(cipher) => cipher.encrypt_block(block),
            Self::Aes192(cipher) => cipher.encrypt_block(block),
            Self::Aes256(cipher) => cipher.encrypt_block(block),
        }
    }

    fn decrypt(&self, block: &mut Block) {
        match self {
            Self::Aes128(cipher) => cipher.decrypt_block(block),
            Self::Aes192(cipher) => cipher.decrypt_block(block),
            Self::Aes256(cipher) => cipher.decrypt_block(block),
        }
    }
}

/// AES configured with a key, IV, mode and padding.
pub struct AesCipher {
    key: AesKey,
    iv: Block,
    mode: Mode,
    padding: Padding,
}

impl AesCipher {
    /// Creates a cipher. The IV is zero-extended or truncated to one block.
    ///
    /// # Errors
    ///
    /// Returns [`LibraryError::InvalidKey`] unless the key is 16, 24 or 32 bytes.
    pub fn new(key: &[u8], iv: &[u8], mode: Mode, padding: Padding) -> Result<Self, LibraryError> {
        let mut block = Block::default();
        let take = iv.len().min(BLOCK);
        block[..take].copy_from_slice(&iv[..take]);
        Ok(Self {
            key: AesKey::new(key)?,
            iv: block,
            mode,
            padding,
        })
    }

    /// Pads and encrypts `plaintext`.
    ///
    /// # Errors
    ///
    /// Returns [`LibraryError::Unaligned`] when a chaining mode runs without
    /// padding over data that is not a whole number of blocks.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, LibraryError> {
        let mut data = plaintext.to_vec();
        self.padding.pad(&mut data);
        match self.mode {
            Mode::Ecb | Mode::Cbc if data.len() % BLOCK != 0 => Err(LibraryError::Unaligned(data.len())),
            Mode::Ecb => Ok(self.ecb(data, true)),
            Mode::Cbc => Ok(self.cbc_encrypt(data)),
            Mode::Cfb => Ok(self.cfb(data, true)),
            Mode::Ofb | Mode::Ctr => Ok(self.keystream(data)),
        }
    }

    /// Decrypts and unpads `ciphertext`.
    ///
    /// Returns `None` when the input is misaligned or the padding does not
    /// check out, which is what a wrong key usually produces.
    #[must_use]
    pub fn decrypt(&self, ciphertext: &[u8]) -> Option<Vec<u8>> {
        let data = ciphertext.to_vec();
        let mut plain = match self.mode {
            Mode::Ecb | Mode::Cbc if data.len() % BLOCK != 0 => return None,
            Mode::Ecb => self.ecb(data, false),
            Mode::Cbc => self.cbc_decrypt(data),
            Mode::Cfb => self.cfb(data, false),
            Mode::Ofb | Mode::Ctr => self.keystream(data),
        };
        self.padding.unpad(&mut plain)?;
        Some(plain)
    }

    fn ecb(&self, mut data: Vec<u8>, encrypt: bool) -> Vec<u8> {
        for chunk in data.chunks_exact_mut(BLOCK) {
            let block = Block::from_mut_slice(chunk);
            if encrypt {
                self.key.encrypt(block);
            } else {
                self.key.decrypt(block);
            }
        }
        data
    }

    fn cbc_encrypt(&self, mut data: Vec<u8>) -> Vec<u8> {
        let mut previous = self.iv;
        for chunk in data.chunks_exact_mut(BLOCK) {
            xor(chunk, &previous);
            let block = Block::from_mut_slice(chunk);
            self.key.encrypt(block);
            previous = *block;
        }
        data
    }

    fn cbc_decrypt(&self, mut data: Vec<u8>) -> Vec<u8> {
        let mut previous = self.iv;
        for chunk in data.chunks_exact_mut(BLOCK) {
            let saved = *Block::from_slice(chunk);
            let block = Block::from_mut_slice(chunk);
            self.key.decrypt(block);
            xor(chunk, &previous);
            previous = saved;
        }
        data
    }

    fn cfb(&self, mut data: Vec<u8>, encrypt: bool) -> Vec<u8> {
        let mut feedback = self.iv;
        for chunk in data.chunks_mut(BLOCK) {
            let mut stream = feedback;
            self.key.encrypt(&mut stream);
            if encrypt {
                xor(chunk, &stream);
                feedback[..chunk.len()].copy_from_slice(chunk);
            } else {
                feedback[..chunk.len()].copy_from_slice(chunk);
                xor(chunk, &stream);
            }
        }
        data
    }

    fn keystream(&self, mut data: Vec<u8>) -> Vec<u8> {
        let mut state = self.iv;
        for chunk in data.chunks_mut(BLOCK) {
            let mut stream = state;
            self.key.encrypt(&mut stream);
            xor(chunk, &stream);
            match self.mode {
                Mode::Ofb => state = stream,
                _ => increment_counter(&mut state),
            }
        }
        data
    }
}

fn xor(target: &mut [u8], stream: &[u8]) {
    for (byte, key) in target.iter_mut().zip(stream) {
        *byte ^= key;
    }
}

fn increment_counter(block: &mut Block) {
    let mut counter = [0u8; 4];
    counter.copy_from_slice(&block[BLOCK - 4..]);
    let next = u32::from_be_bytes(counter).wrapping_add(1);
    block[BLOCK - 4..].copy_from_slice(&next.to_be_bytes());
}
