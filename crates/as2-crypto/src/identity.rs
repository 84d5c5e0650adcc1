//! # X.509 Identities
//!
//! Newtypes over OpenSSL certificates and private keys.
//!
//! ## Security Invariant
//!
//! - `Identity::new` rejects a key that does not match the certificate's
//!   public key, so signing or decrypting with a mismatched pair fails at
//!   configuration time instead of producing an unverifiable message.
//! - `PrivateKey` does not implement `Serialize` and its `Debug` output is
//!   redacted.

use std::path::Path;

use openssl::nid::Nid;
use openssl::pkey::{PKey, Private};
use openssl::x509::X509;

use as2_core::DigestAlgorithm;

use crate::error::{reason, CryptoError};

/// An X.509 certificate, compared by its DER encoding.
#[derive(Clone)]
pub struct Certificate {
    x509: X509,
    der: Vec<u8>,
}

/// A private key.
#[derive(Clone)]
pub struct PrivateKey {
    pkey: PKey<Private>,
}

/// A certificate paired with its matching private key.
#[derive(Clone)]
pub struct Identity {
    certificate: Certificate,
    private_key: PrivateKey,
}

// ---------------------------------------------------------------------------
// Certificate impls
// ---------------------------------------------------------------------------

impl Certificate {
    /// Parse a PEM-encoded certificate.
    pub fn from_pem(pem: &[u8]) -> Result<Self, CryptoError> {
        let x509 = X509::from_pem(pem).map_err(|e| CryptoError::InvalidCertificate(reason(&e)))?;
        Self::from_x509(x509)
    }

    /// Parse a DER-encoded certificate.
    pub fn from_der(der: &[u8]) -> Result<Self, CryptoError> {
        let x509 = X509::from_der(der).map_err(|e| CryptoError::InvalidCertificate(reason(&e)))?;
        Self::from_x509(x509)
    }

    /// Read a PEM certificate file.
    pub fn from_pem_file(path: impl AsRef<Path>) -> Result<Self, CryptoError> {
        let pem = std::fs::read(path)?;
        Self::from_pem(&pem)
    }

    fn from_x509(x509: X509) -> Result<Self, CryptoError> {
        let der = x509
            .to_der()
            .map_err(|e| CryptoError::InvalidCertificate(reason(&e)))?;
        Ok(Self { x509, der })
    }

    /// The underlying OpenSSL certificate.
    pub fn x509(&self) -> &X509 {
        &self.x509
    }

    /// DER encoding.
    pub fn to_der(&self) -> &[u8] {
        &self.der
    }

    /// Subject common name, when present and valid UTF-8.
    pub fn common_name(&self) -> Option<String> {
        self.x509
            .subject_name()
            .entries_by_nid(Nid::COMMONNAME)
            .next()
            .and_then(|entry| entry.data().as_utf8().ok())
            .map(|name| name.to_string())
    }

    /// Lowercase hex SHA-256 over the DER encoding.
    pub fn fingerprint(&self) -> String {
        DigestAlgorithm::Sha256
            .digest(&self.der)
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect()
    }
}

impl PartialEq for Certificate {
    fn eq(&self, other: &Self) -> bool {
        self.der == other.der
    }
}

impl Eq for Certificate {}

impl std::fmt::Debug for Certificate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let fingerprint = self.fingerprint();
        write!(
            f,
            "Certificate(CN={}, sha256={}...)",
            self.common_name().unwrap_or_default(),
            &fingerprint[..16]
        )
    }
}

// ---------------------------------------------------------------------------
// PrivateKey impls
// ---------------------------------------------------------------------------

impl PrivateKey {
    /// Parse a PEM-encoded private key (PKCS#8 or traditional).
    pub fn from_pem(pem: &[u8]) -> Result<Self, CryptoError> {
        let pkey = PKey::private_key_from_pem(pem)
            .map_err(|e| CryptoError::InvalidPrivateKey(reason(&e)))?;
        Ok(Self { pkey })
    }

    /// Read a PEM private key file.
    pub fn from_pem_file(path: impl AsRef<Path>) -> Result<Self, CryptoError> {
        let pem = std::fs::read(path)?;
        Self::from_pem(&pem)
    }

    /// The underlying OpenSSL key.
    pub fn pkey(&self) -> &PKey<Private> {
        &self.pkey
    }
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "PrivateKey({} bits, redacted)", self.pkey.bits())
    }
}

// ---------------------------------------------------------------------------
// Identity impls
// ---------------------------------------------------------------------------

impl Identity {
    /// Pair a certificate with its private key.
    pub fn new(certificate: Certificate, private_key: PrivateKey) -> Result<Self, CryptoError> {
        let public_key = certificate
            .x509()
            .public_key()
            .map_err(|e| CryptoError::InvalidCertificate(reason(&e)))?;
        if !public_key.public_eq(private_key.pkey()) {
            return Err(CryptoError::KeyMismatch(
                certificate.common_name().unwrap_or_else(|| certificate.fingerprint()),
            ));
        }
        Ok(Self {
            certificate,
            private_key,
        })
    }

    /// Load an identity from PEM strings.
    pub fn from_pem(certificate_pem: &[u8], key_pem: &[u8]) -> Result<Self, CryptoError> {
        Self::new(Certificate::from_pem(certificate_pem)?, PrivateKey::from_pem(key_pem)?)
    }

    /// Load an identity from PEM files.
    pub fn from_pem_files(
        certificate_path: impl AsRef<Path>,
        key_path: impl AsRef<Path>,
    ) -> Result<Self, CryptoError> {
        Self::new(
            Certificate::from_pem_file(certificate_path)?,
            PrivateKey::from_pem_file(key_path)?,
        )
    }

    pub fn certificate(&self) -> &Certificate {
        &self.certificate
    }

    pub fn private_key(&self) -> &PrivateKey {
        &self.private_key
    }
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Identity")
            .field("certificate", &self.certificate)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures;

    #[test]
    fn test_load_fixture_identity() {
        let alice = fixtures::alice();
        assert_eq!(alice.certificate().common_name().as_deref(), Some("ALICE"));
        assert_eq!(alice.certificate().fingerprint().len(), 64);
    }

    #[test]
    fn test_mismatched_key_is_rejected() {
        let err = Identity::from_pem(fixtures::ALICE_CERT, fixtures::BOB_KEY).unwrap_err();
        assert!(matches!(err, CryptoError::KeyMismatch(ref name) if name == "ALICE"));
    }

    #[test]
    fn test_certificate_equality_is_by_der() {
        let a1 = Certificate::from_pem(fixtures::ALICE_CERT).unwrap();
        let a2 = Certificate::from_der(a1.to_der()).unwrap();
        let b = Certificate::from_pem(fixtures::BOB_CERT).unwrap();
        assert_eq!(a1, a2);
        assert_ne!(a1, b);
    }

    #[test]
    fn test_invalid_pem() {
        assert!(matches!(
            Certificate::from_pem(b"not a certificate"),
            Err(CryptoError::InvalidCertificate(_))
        ));
        assert!(matches!(
            PrivateKey::from_pem(b"not a key"),
            Err(CryptoError::InvalidPrivateKey(_))
        ));
    }

    #[test]
    fn test_load_from_files() {
        let dir = tempfile::tempdir().unwrap();
        let cert_path = dir.path().join("bob.crt");
        let key_path = dir.path().join("bob.key");
        std::fs::write(&cert_path, fixtures::BOB_CERT).unwrap();
        std::fs::write(&key_path, fixtures::BOB_KEY).unwrap();

        let bob = Identity::from_pem_files(&cert_path, &key_path).unwrap();
        assert_eq!(bob.certificate().common_name().as_deref(), Some("BOB"));

        let missing = Certificate::from_pem_file(dir.path().join("missing.crt"));
        assert!(matches!(missing, Err(CryptoError::Io(_))));
    }

    #[test]
    fn test_debug_redacts_private_key() {
        let rendered = format!("{:?}", fixtures::alice().private_key());
        assert!(rendered.contains("redacted"));
        assert!(!rendered.contains("BEGIN"));
    }
}
