use rsa::pkcs1v15::SigningKey;
use rsa::signature::{SignatureEncoding, Signer};
use sha1::Sha1;

use super::SignatureArtifact;
use crate::keys::PrivateKeyHandle;

/// The only scheme offered. Existing verifiers expect SHA-1; changing the
/// digest breaks them.
pub const ALGORITHM: &str = "rsa-pkcs1v15-sha1";

#[derive(Debug, thiserror::Error)]
#[error("signing failed: {0}")]
pub struct SigningError(#[from] rsa::signature::Error);

/// RSA PKCS#1 v1.5 over SHA-1 of the UTF-8 bytes of `data`.
///
/// Deterministic: the same key and data always give the same bytes.
pub fn sign(data: &str, key: &PrivateKeyHandle) -> Result<SignatureArtifact, SigningError> {
    let signing_key = SigningKey::<Sha1>::new(key.as_rsa().clone());
    let signature = signing_key.try_sign(data.as_bytes())?;
    Ok(SignatureArtifact::from(signature.to_vec()))
}
