//! Symmetric ciphers offered for enveloping.

use std::str::FromStr;

use openssl::symm::Cipher;

use crate::error::CryptoError;

/// Content-encryption cipher for an outbound envelope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SymmetricCipher {
    Aes128Cbc,
    Aes192Cbc,
    #[default]
    Aes256Cbc,
    /// Triple DES, still demanded by some older partner stacks.
    DesEde3Cbc,
}

impl SymmetricCipher {
    /// OpenSSL-style cipher name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Aes128Cbc => "aes-128-cbc",
            Self::Aes192Cbc => "aes-192-cbc",
            Self::Aes256Cbc => "aes-256-cbc",
            Self::DesEde3Cbc => "des-ede3-cbc",
        }
    }

    pub(crate) fn openssl_cipher(&self) -> Cipher {
        match self {
            Self::Aes128Cbc => Cipher::aes_128_cbc(),
            Self::Aes192Cbc => Cipher::aes_192_cbc(),
            Self::Aes256Cbc => Cipher::aes_256_cbc(),
            Self::DesEde3Cbc => Cipher::des_ede3_cbc(),
        }
    }
}

impl std::fmt::Display for SymmetricCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SymmetricCipher {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "aes-128-cbc" => Ok(Self::Aes128Cbc),
            "aes-192-cbc" => Ok(Self::Aes192Cbc),
            "aes-256-cbc" => Ok(Self::Aes256Cbc),
            "des-ede3-cbc" => Ok(Self::DesEde3Cbc),
            _ => Err(CryptoError::UnsupportedCipher(s.to_string())),
        }
    }
}
