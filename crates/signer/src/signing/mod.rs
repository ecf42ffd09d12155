mod rsa;

use base64::{Engine, engine::general_purpose::STANDARD};

pub use self::rsa::{ALGORITHM, SigningError, sign};

/// Raw signature bytes, transported as standard base64.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureArtifact {
    bytes: Vec<u8>,
}

impl SignatureArtifact {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }
}

impl From<Vec<u8>> for SignatureArtifact {
    fn from(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }
}
