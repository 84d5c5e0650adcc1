//! Test identities and partner records shared by the unit tests.

use as2_crypto::Identity;

use crate::config::{Partner, ServerInfo};

pub(crate) const ALICE_CERT: &[u8] = include_bytes!("../../../fixtures/alice.crt");
pub(crate) const ALICE_KEY: &[u8] = include_bytes!("../../../fixtures/alice.key");
pub(crate) const BOB_CERT: &[u8] = include_bytes!("../../../fixtures/bob.crt");
pub(crate) const BOB_KEY: &[u8] = include_bytes!("../../../fixtures/bob.key");
pub(crate) const MALLORY_CERT: &[u8] = include_bytes!("../../../fixtures/mallory.crt");
pub(crate) const MALLORY_KEY: &[u8] = include_bytes!("../../../fixtures/mallory.key");

pub(crate) fn alice() -> Identity {
    Identity::from_pem(ALICE_CERT, ALICE_KEY).unwrap()
}

pub(crate) fn bob() -> Identity {
    Identity::from_pem(BOB_CERT, BOB_KEY).unwrap()
}

pub(crate) fn mallory() -> Identity {
    Identity::from_pem(MALLORY_CERT, MALLORY_KEY).unwrap()
}

pub(crate) fn alice_server() -> ServerInfo {
    ServerInfo::builder()
        .name("ALICE")
        .url("http://alice.example.com/as2")
        .domain("alice.example.com")
        .identity(alice())
        .build()
        .unwrap()
}

pub(crate) fn bob_server() -> ServerInfo {
    ServerInfo::builder()
        .name("BOB")
        .url("http://bob.example.com/as2")
        .domain("bob.example.com")
        .identity(bob())
        .build()
        .unwrap()
}

/// ALICE as seen from BOB.
pub(crate) fn alice_partner() -> Partner {
    Partner::builder()
        .name("ALICE")
        .url("http://alice.example.com/as2")
        .certificate(alice().certificate().clone())
        .build()
        .unwrap()
}

/// BOB as seen from ALICE.
pub(crate) fn bob_partner() -> Partner {
    Partner::builder()
        .name("BOB")
        .url("http://bob.example.com/as2")
        .certificate(bob().certificate().clone())
        .build()
        .unwrap()
}
