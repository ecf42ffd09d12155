use std::{
    fmt, fs, io,
    path::{Path, PathBuf},
};

use rsa::{
    RsaPrivateKey, pkcs1::DecodeRsaPrivateKey, pkcs8::DecodePrivateKey, traits::PublicKeyParts,
};

use crate::config::Configuration;

/// Marker a public key file must carry before it can be selected.
pub const CERTIFICATE_MARKER: &str = "-----BEGIN CERTIFICATE-----";

const PEM_BEGIN: &str = "-----BEGIN ";
const PEM_DASHES: &str = "-----";
const ENCRYPTED_PEM_HEADER: &str = "Proc-Type: 4,ENCRYPTED";

#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("key file {} does not exist", .0.display())]
    NotFound(PathBuf),
    #[error("failed to read key file {}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error("invalid private key in {}: {reason}", .path.display())]
    Parse { path: PathBuf, reason: String },
    #[error("private key in {} is encrypted; only unencrypted PEM keys are supported", .0.display())]
    Encrypted(PathBuf),
}

/// An RSA private key decoded for the lifetime of a single request.
pub struct PrivateKeyHandle {
    key: RsaPrivateKey,
}

impl PrivateKeyHandle {
    pub fn bits(&self) -> usize {
        self.key.size() * 8
    }

    pub(crate) fn as_rsa(&self) -> &RsaPrivateKey {
        &self.key
    }
}

impl From<RsaPrivateKey> for PrivateKeyHandle {
    fn from(key: RsaPrivateKey) -> Self {
        Self { key }
    }
}

impl fmt::Debug for PrivateKeyHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivateKeyHandle")
            .field("bits", &self.bits())
            .finish_non_exhaustive()
    }
}

fn read(path: &Path) -> Result<Vec<u8>, KeyError> {
    if path.as_os_str().is_empty() {
        return Err(KeyError::NotFound(path.to_owned()));
    }
    fs::read(path).map_err(|source| match source.kind() {
        io::ErrorKind::NotFound => KeyError::NotFound(path.to_owned()),
        _ => KeyError::Io {
            path: path.to_owned(),
            source,
        },
    })
}

/// Returns the file content unmodified. The content is not inspected.
pub fn load_public_key_text(path: &Path) -> Result<String, KeyError> {
    let bytes = read(path)?;
    String::from_utf8(bytes).map_err(|e| KeyError::Io {
        path: path.to_owned(),
        source: io::Error::new(io::ErrorKind::InvalidData, e),
    })
}

/// One `-----BEGIN <label>-----` .. `-----END <label>-----` span.
struct PemBlock<'a> {
    label: &'a str,
    text: &'a str,
}

/// First PEM block whose label names a private key. Anything around it,
/// such as a certificate in the same bundle or attribute preambles, is skipped.
fn first_private_key_block(text: &str) -> Option<PemBlock<'_>> {
    let mut cursor = 0;
    while let Some(offset) = text[cursor..].find(PEM_BEGIN) {
        let start = cursor + offset;
        let label_start = start + PEM_BEGIN.len();
        let label_len = text[label_start..].find(PEM_DASHES)?;
        let label = &text[label_start..label_start + label_len];

        if label.ends_with("PRIVATE KEY") {
            let end_marker = format!("-----END {label}-----");
            let end = start + text[start..].find(&end_marker)? + end_marker.len();
            return Some(PemBlock {
                label,
                text: &text[start..end],
            });
        }
        cursor = label_start + label_len;
    }
    None
}

/// Decodes an unencrypted PKCS#8 or PKCS#1 PEM RSA private key.
pub fn load_private_key(path: &Path) -> Result<PrivateKeyHandle, KeyError> {
    let bytes = read(path)?;
    let parse_error = |reason: String| KeyError::Parse {
        path: path.to_owned(),
        reason,
    };

    let text = std::str::from_utf8(&bytes).map_err(|e| parse_error(format!("not PEM text: {e}")))?;
    let block = first_private_key_block(text)
        .ok_or_else(|| parse_error("no PEM private key block found".to_owned()))?;

    if block.label == "ENCRYPTED PRIVATE KEY" || block.text.contains(ENCRYPTED_PEM_HEADER) {
        return Err(KeyError::Encrypted(path.to_owned()));
    }

    let key = match block.label {
        "RSA PRIVATE KEY" => {
            RsaPrivateKey::from_pkcs1_pem(block.text).map_err(|e| parse_error(e.to_string()))?
        }
        "PRIVATE KEY" => {
            RsaPrivateKey::from_pkcs8_pem(block.text).map_err(|e| parse_error(e.to_string()))?
        }
        other => return Err(parse_error(format!("unsupported key type {other:?}, expected RSA"))),
    };

    Ok(PrivateKeyHandle::from(key))
}

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("both a public key file and a private key file must be selected")]
    Incomplete,
    #[error("public key file {} does not contain a certificate", .0.display())]
    NotACertificate(PathBuf),
    #[error(transparent)]
    Key(#[from] KeyError),
}

/// Checks a pair of files before they are accepted as the active keys.
///
/// This is stricter than what requests need: the public key file must hold a
/// PEM certificate, while serving it later only requires that it be readable.
pub fn validate_selection(
    public_key_path: &Path,
    private_key_path: &Path,
) -> Result<Configuration, ValidationError> {
    let selected = |path: &Path| !path.as_os_str().is_empty() && path.exists();
    if !selected(public_key_path) || !selected(private_key_path) {
        return Err(ValidationError::Incomplete);
    }

    let certificate = load_public_key_text(public_key_path)?;
    if !certificate.contains(CERTIFICATE_MARKER) {
        return Err(ValidationError::NotACertificate(public_key_path.to_owned()));
    }

    load_private_key(private_key_path)?;

    Ok(Configuration::new(public_key_path, private_key_path))
}
