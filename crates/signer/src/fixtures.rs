use std::sync::OnceLock;

use rand_chacha::ChaCha20Rng;
use rand_chacha::rand_core::SeedableRng;
use rsa::RsaPrivateKey;
use rsa::pkcs1::EncodeRsaPrivateKey;
use rsa::pkcs8::{EncodePrivateKey, LineEnding};

pub(crate) const KEY_BITS: usize = 1024;

pub(crate) const CERTIFICATE: &str = "-----BEGIN CERTIFICATE-----\n\
MIIBszCCAVmgAwIBAgIUFixtureCertificateBodyOnlyUsedForMarkerChecks\n\
-----END CERTIFICATE-----\n";

/// Seeded so every test in the run shares one key.
pub(crate) fn rsa_key() -> &'static RsaPrivateKey {
    static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
    KEY.get_or_init(|| {
        let mut rng = ChaCha20Rng::seed_from_u64(0x5167);
        RsaPrivateKey::new(&mut rng, KEY_BITS).expect("generating fixture RSA key")
    })
}

pub(crate) fn pkcs8_pem() -> String {
    rsa_key()
        .to_pkcs8_pem(LineEnding::LF)
        .expect("encoding fixture key as PKCS#8")
        .as_str()
        .to_owned()
}

pub(crate) fn pkcs1_pem() -> String {
    rsa_key()
        .to_pkcs1_pem(LineEnding::LF)
        .expect("encoding fixture key as PKCS#1")
        .as_str()
        .to_owned()
}
