//! Self-signed RSA test identities shared by the unit tests.

use crate::identity::Identity;

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
