#![allow(dead_code)]

use std::{fs, path::PathBuf, sync::OnceLock};

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use local_signer::{AppState, ConfigStore, Configuration, router};
use rand_chacha::ChaCha20Rng;
use rand_chacha::rand_core::SeedableRng;
use rsa::pkcs1v15::{Signature, VerifyingKey};
use rsa::pkcs8::{EncodePrivateKey, LineEnding};
use rsa::signature::Verifier;
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha1::Sha1;
use tempfile::TempDir;
use tower::ServiceExt;

pub const CERTIFICATE: &str = "-----BEGIN CERTIFICATE-----\n\
MIIBszCCAVmgAwIBAgIUIntegrationFixtureCertificate\n\
-----END CERTIFICATE-----\n";

pub fn rsa_key() -> &'static RsaPrivateKey {
    static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
    KEY.get_or_init(|| {
        let mut rng = ChaCha20Rng::seed_from_u64(0x7e57);
        RsaPrivateKey::new(&mut rng, 1024).expect("generating fixture RSA key")
    })
}

pub fn other_rsa_key() -> &'static RsaPrivateKey {
    static KEY: OnceLock<RsaPrivateKey> = OnceLock::new();
    KEY.get_or_init(|| {
        let mut rng = ChaCha20Rng::seed_from_u64(0x07e5);
        RsaPrivateKey::new(&mut rng, 1024).expect("generating fixture RSA key")
    })
}

pub fn pem(key: &RsaPrivateKey) -> String {
    key.to_pkcs8_pem(LineEnding::LF).unwrap().as_str().to_owned()
}

/// A scratch directory holding a config file and key files.
pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap(),
        }
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.path().join("config.json")
    }

    pub fn store(&self) -> ConfigStore {
        ConfigStore::new(self.config_path())
    }

    pub fn state(&self) -> AppState {
        AppState::new(self.store())
    }

    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    pub fn save(&self, config: &Configuration) {
        self.store().save(config).unwrap();
    }

    /// Certificate and fixture key written and selected.
    pub fn configured() -> Self {
        let workspace = Self::new();
        let public = workspace.write("cert.txt", CERTIFICATE);
        let private = workspace.write("private.key", &pem(rsa_key()));
        workspace.save(&Configuration::new(public, private));
        workspace
    }
}

pub async fn send(state: AppState, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = router(state).oneshot(request).await.unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&body).unwrap())
}

pub fn get_public_key() -> Request<Body> {
    Request::builder()
        .uri("/public-key")
        .body(Body::empty())
        .unwrap()
}

pub fn post_sign(body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/sign")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_owned()))
        .unwrap()
}

pub fn sign_body(data: &str) -> String {
    serde_json::json!({ "data": data }).to_string()
}

pub fn verifies(public_key: &RsaPublicKey, data: &str, signature_b64: &str) -> bool {
    use base64::{Engine, engine::general_purpose::STANDARD};

    let Ok(bytes) = STANDARD.decode(signature_b64) else {
        return false;
    };
    let Ok(signature) = Signature::try_from(bytes.as_slice()) else {
        return false;
    };
    VerifyingKey::<Sha1>::new(public_key.clone())
        .verify(data.as_bytes(), &signature)
        .is_ok()
}
