//! # Trading-Partner Configuration
//!
//! `ServerInfo` describes the local AS2 station, `Partner` a remote one.
//! Both are assembled through builders whose `build()` validates required
//! fields and enum-constrained values up front, so a misconfigured partner
//! fails at load time rather than on the first transmission.
//!
//! `As2Config` is the on-disk form: a YAML document with the server entry
//! and a partner list, certificates and keys referenced by PEM path.
//!
//! ```yaml
//! server:
//!   name: BOB
//!   url: https://bob.example.com/as2
//!   domain: bob.example.com
//!   certificate: bob.crt
//!   private_key: bob.key
//! partners:
//!   - name: ALICE
//!     url: https://alice.example.com/as2
//!     certificate: alice.crt
//!     outbound_format: v1
//!     mic_algorithm: sha256
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

use as2_core::{
    unquoted_system_identifier, Base64Scheme, DigestAlgorithm, WireFormat, DEFAULT_MIC_ALGORITHM,
};
use as2_crypto::{Certificate, Identity, SymmetricCipher};

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// TLS verify mode
// ---------------------------------------------------------------------------

/// Peer verification policy for the HTTPS transport to a partner.
///
/// Carried for the transport layer; this crate never opens connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TlsVerifyMode {
    #[default]
    Peer,
    None,
}

impl TlsVerifyMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Peer => "peer",
            Self::None => "none",
        }
    }
}

impl std::fmt::Display for TlsVerifyMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TlsVerifyMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "peer" => Ok(Self::Peer),
            "none" => Ok(Self::None),
            other => Err(ConfigError::InvalidTlsVerifyMode(other.to_string())),
        }
    }
}

fn parse_url(input: &str) -> Result<Url, ConfigError> {
    Url::parse(input).map_err(|e| ConfigError::InvalidUrl {
        url: input.to_string(),
        reason: e.to_string(),
    })
}

// ---------------------------------------------------------------------------
// ServerInfo
// ---------------------------------------------------------------------------

/// The local AS2 station.
#[derive(Debug, Clone)]
pub struct ServerInfo {
    name: String,
    url: Url,
    domain: String,
    signing_identity: Identity,
    decryption_identity: Identity,
}

impl ServerInfo {
    pub fn builder() -> ServerInfoBuilder {
        ServerInfoBuilder::default()
    }

    /// AS2 system identifier, unquoted.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Where partners post messages and MDNs.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Domain used in generated Message-IDs.
    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Identity that signs outbound messages and MDNs.
    pub fn signing_identity(&self) -> &Identity {
        &self.signing_identity
    }

    /// Identity inbound envelopes are encrypted to.
    pub fn decryption_identity(&self) -> &Identity {
        &self.decryption_identity
    }
}

/// Builder for [`ServerInfo`].
#[derive(Debug, Default)]
pub struct ServerInfoBuilder {
    name: Option<String>,
    url: Option<String>,
    domain: Option<String>,
    signing_identity: Option<Identity>,
    decryption_identity: Option<Identity>,
}

impl ServerInfoBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Use one identity for both signing and decryption.
    pub fn identity(mut self, identity: Identity) -> Self {
        self.signing_identity = Some(identity.clone());
        self.decryption_identity = Some(identity);
        self
    }

    pub fn signing_identity(mut self, identity: Identity) -> Self {
        self.signing_identity = Some(identity);
        self
    }

    pub fn decryption_identity(mut self, identity: Identity) -> Self {
        self.decryption_identity = Some(identity);
        self
    }

    pub fn build(self) -> Result<ServerInfo, ConfigError> {
        let name = self
            .name
            .map(|n| unquoted_system_identifier(&n))
            .filter(|n| !n.is_empty())
            .ok_or(ConfigError::MissingField("server name"))?;
        let url = parse_url(&self.url.ok_or(ConfigError::MissingField("server url"))?)?;
        let domain = self
            .domain
            .filter(|d| !d.trim().is_empty())
            .ok_or(ConfigError::MissingField("server domain"))?;
        let signing_identity = self
            .signing_identity
            .ok_or(ConfigError::MissingField("server signing identity"))?;
        let decryption_identity = self
            .decryption_identity
            .ok_or(ConfigError::MissingField("server decryption identity"))?;

        Ok(ServerInfo {
            name,
            url,
            domain,
            signing_identity,
            decryption_identity,
        })
    }
}

// ---------------------------------------------------------------------------
// Partner
// ---------------------------------------------------------------------------

/// A remote trading partner and the interoperability settings it needs.
#[derive(Debug, Clone)]
pub struct Partner {
    name: String,
    url: Url,
    signing_certificate: Certificate,
    encryption_certificate: Certificate,
    outbound_format: WireFormat,
    mdn_format: WireFormat,
    cipher: SymmetricCipher,
    mic_algorithm: DigestAlgorithm,
    base64_scheme: Option<Base64Scheme>,
    tls_verify_mode: TlsVerifyMode,
}

impl Partner {
    pub fn builder() -> PartnerBuilder {
        PartnerBuilder::default()
    }

    /// AS2 system identifier, unquoted.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Certificate the partner's signatures are pinned to.
    pub fn signing_certificate(&self) -> &Certificate {
        &self.signing_certificate
    }

    /// Certificate outbound envelopes are encrypted for.
    pub fn encryption_certificate(&self) -> &Certificate {
        &self.encryption_certificate
    }

    /// Layout of envelopes sent to this partner.
    pub fn outbound_format(&self) -> WireFormat {
        self.outbound_format
    }

    /// Layout of MDNs returned to this partner.
    pub fn mdn_format(&self) -> WireFormat {
        self.mdn_format
    }

    pub fn cipher(&self) -> SymmetricCipher {
        self.cipher
    }

    /// MIC algorithm requested in `Disposition-Notification-Options`.
    pub fn mic_algorithm(&self) -> DigestAlgorithm {
        self.mic_algorithm
    }

    /// Explicit base64 override, if configured.
    pub fn base64_scheme(&self) -> Option<Base64Scheme> {
        self.base64_scheme
    }

    /// Base64 layout for outbound documents: the override, else the
    /// outbound format's default.
    pub fn document_base64_scheme(&self) -> Base64Scheme {
        self.base64_scheme
            .unwrap_or_else(|| self.outbound_format.base64_scheme())
    }

    pub fn tls_verify_mode(&self) -> TlsVerifyMode {
        self.tls_verify_mode
    }
}

/// Builder for [`Partner`].
#[derive(Debug, Default)]
pub struct PartnerBuilder {
    name: Option<String>,
    url: Option<String>,
    signing_certificate: Option<Certificate>,
    encryption_certificate: Option<Certificate>,
    outbound_format: WireFormat,
    mdn_format: WireFormat,
    cipher: SymmetricCipher,
    mic_algorithm: Option<DigestAlgorithm>,
    base64_scheme: Option<Base64Scheme>,
    tls_verify_mode: TlsVerifyMode,
}

impl PartnerBuilder {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Use one certificate for both signature pinning and encryption.
    pub fn certificate(mut self, certificate: Certificate) -> Self {
        self.signing_certificate = Some(certificate.clone());
        self.encryption_certificate = Some(certificate);
        self
    }

    pub fn signing_certificate(mut self, certificate: Certificate) -> Self {
        self.signing_certificate = Some(certificate);
        self
    }

    pub fn encryption_certificate(mut self, certificate: Certificate) -> Self {
        self.encryption_certificate = Some(certificate);
        self
    }

    pub fn outbound_format(mut self, format: WireFormat) -> Self {
        self.outbound_format = format;
        self
    }

    pub fn mdn_format(mut self, format: WireFormat) -> Self {
        self.mdn_format = format;
        self
    }

    pub fn cipher(mut self, cipher: SymmetricCipher) -> Self {
        self.cipher = cipher;
        self
    }

    pub fn mic_algorithm(mut self, algorithm: DigestAlgorithm) -> Self {
        self.mic_algorithm = Some(algorithm);
        self
    }

    pub fn base64_scheme(mut self, scheme: Base64Scheme) -> Self {
        self.base64_scheme = Some(scheme);
        self
    }

    pub fn tls_verify_mode(mut self, mode: TlsVerifyMode) -> Self {
        self.tls_verify_mode = mode;
        self
    }

    pub fn build(self) -> Result<Partner, ConfigError> {
        let name = self
            .name
            .map(|n| unquoted_system_identifier(&n))
            .filter(|n| !n.is_empty())
            .ok_or(ConfigError::MissingField("partner name"))?;
        let url = parse_url(&self.url.ok_or(ConfigError::MissingField("partner url"))?)?;
        let signing_certificate = self
            .signing_certificate
            .ok_or(ConfigError::MissingField("partner signing certificate"))?;
        let encryption_certificate = self
            .encryption_certificate
            .ok_or(ConfigError::MissingField("partner encryption certificate"))?;

        Ok(Partner {
            name,
            url,
            signing_certificate,
            encryption_certificate,
            outbound_format: self.outbound_format,
            mdn_format: self.mdn_format,
            cipher: self.cipher,
            mic_algorithm: self.mic_algorithm.unwrap_or(DEFAULT_MIC_ALGORITHM),
            base64_scheme: self.base64_scheme,
            tls_verify_mode: self.tls_verify_mode,
        })
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Partners keyed by AS2 name.
#[derive(Debug, Clone, Default)]
pub struct PartnerRegistry {
    partners: BTreeMap<String, Partner>,
}

impl PartnerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a partner. Names must be unique.
    pub fn register(&mut self, partner: Partner) -> Result<(), ConfigError> {
        if self.partners.contains_key(partner.name()) {
            return Err(ConfigError::DuplicatePartner(partner.name().to_string()));
        }
        self.partners.insert(partner.name().to_string(), partner);
        Ok(())
    }

    /// Look a partner up by name as it appears in an `AS2-From` header;
    /// surrounding quotes are ignored.
    pub fn get(&self, name: &str) -> Option<&Partner> {
        self.partners.get(&unquoted_system_identifier(name))
    }

    pub fn len(&self) -> usize {
        self.partners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partners.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Partner> {
        self.partners.values()
    }
}

// ---------------------------------------------------------------------------
// File format
// ---------------------------------------------------------------------------

/// The YAML configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct As2Config {
    pub server: ServerConfig,
    #[serde(default)]
    pub partners: Vec<PartnerConfig>,
}

/// `server:` entry of [`As2Config`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    pub name: String,
    pub url: String,
    pub domain: String,
    /// PEM certificate path.
    pub certificate: PathBuf,
    /// PEM private key path.
    pub private_key: PathBuf,
    /// Separate signing pair; defaults to `certificate`/`private_key`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signing_certificate: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signing_private_key: Option<PathBuf>,
}

/// One `partners:` entry of [`As2Config`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PartnerConfig {
    pub name: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub certificate: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signing_certificate: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encryption_certificate: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outbound_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mdn_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cipher: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mic_algorithm: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base64_scheme: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_verify_mode: Option<String>,
}

impl As2Config {
    /// Parse a configuration document.
    pub fn from_yaml(yaml_str: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(yaml_str)?)
    }

    /// Read and parse a configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&text)
    }

    /// Load key material and validate every entry. Relative paths are
    /// resolved against `base_dir`.
    pub fn resolve(&self, base_dir: &Path) -> Result<(ServerInfo, PartnerRegistry), ConfigError> {
        let server = self.server.resolve(base_dir)?;
        let mut registry = PartnerRegistry::new();
        for entry in &self.partners {
            registry.register(entry.resolve(base_dir)?)?;
        }
        tracing::debug!(
            server = %server.name(),
            partners = registry.len(),
            "configuration resolved"
        );
        Ok((server, registry))
    }
}

impl ServerConfig {
    fn resolve(&self, base_dir: &Path) -> Result<ServerInfo, ConfigError> {
        let decryption = Identity::from_pem_files(
            base_dir.join(&self.certificate),
            base_dir.join(&self.private_key),
        )?;
        let signing = match (&self.signing_certificate, &self.signing_private_key) {
            (None, None) => decryption.clone(),
            (Some(cert), Some(key)) => {
                Identity::from_pem_files(base_dir.join(cert), base_dir.join(key))?
            }
            (Some(_), None) => return Err(ConfigError::MissingField("server signing_private_key")),
            (None, Some(_)) => return Err(ConfigError::MissingField("server signing_certificate")),
        };

        ServerInfo::builder()
            .name(self.name.as_str())
            .url(self.url.as_str())
            .domain(self.domain.as_str())
            .signing_identity(signing)
            .decryption_identity(decryption)
            .build()
    }
}

impl PartnerConfig {
    fn resolve(&self, base_dir: &Path) -> Result<Partner, ConfigError> {
        let load = |path: &PathBuf| Certificate::from_pem_file(base_dir.join(path));

        let mut builder = Partner::builder().name(self.name.as_str()).url(self.url.as_str());
        if let Some(path) = &self.certificate {
            builder = builder.certificate(load(path)?);
        }
        if let Some(path) = &self.signing_certificate {
            builder = builder.signing_certificate(load(path)?);
        }
        if let Some(path) = &self.encryption_certificate {
            builder = builder.encryption_certificate(load(path)?);
        }
        if let Some(value) = &self.outbound_format {
            builder = builder.outbound_format(value.parse()?);
        }
        if let Some(value) = &self.mdn_format {
            builder = builder.mdn_format(value.parse()?);
        }
        if let Some(value) = &self.cipher {
            builder = builder.cipher(value.parse()?);
        }
        if let Some(value) = &self.mic_algorithm {
            builder = builder.mic_algorithm(value.parse()?);
        }
        if let Some(value) = &self.base64_scheme {
            builder = builder.base64_scheme(value.parse()?);
        }
        if let Some(value) = &self.tls_verify_mode {
            builder = builder.tls_verify_mode(value.parse()?);
        }
        builder.build()
    }
}
