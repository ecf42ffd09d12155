use std::{any::Any, future::Future, net::SocketAddr, sync::Arc};

use anyhow::{Context, Result, bail};
use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use eyre::eyre;
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::oneshot, task::JoinHandle};
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

use crate::config::ConfigStore;
use crate::error::{MISSING_DATA, ServiceError};
use crate::keys::{self, KeyError};
use crate::signing::{self, SignatureArtifact};

pub const DEFAULT_PORT: u16 = 5000;

pub const PUBLIC_KEY_RETRIEVED: &str = "retrieved successfully";

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ConfigStore>,
}

impl AppState {
    pub fn new(store: ConfigStore) -> Self {
        Self {
            store: Arc::new(store),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Ok,
    Err,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PublicKeyResponse {
    pub status: Status,
    pub message: String,
    #[serde(rename = "publicKey")]
    pub public_key: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SignResponse {
    pub status: Status,
    pub signature: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub status: Status,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            status: Status::Err,
            message: message.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SignRequest {
    pub data: Option<String>,
}

pub fn router(state: AppState) -> Router {
    with_service_layers(
        Router::new()
            .route("/public-key", get(public_key_handler))
            .route("/sign", post(sign_handler))
            .with_state(state),
    )
}

/// Open CORS, request tracing, and panic-to-500 conversion.
pub fn with_service_layers(router: Router) -> Router {
    router
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_owned()
    } else {
        "unknown panic".to_owned()
    };
    ServiceError::Unexpected(eyre!("request handler panicked: {detail}")).into_response()
}

/// Runs file and signing work on the blocking pool.
async fn blocking<T, F>(work: F) -> Result<T, ServiceError>
where
    F: FnOnce() -> Result<T, ServiceError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ServiceError::Unexpected(eyre!("worker task failed: {e}")))?
}

async fn public_key_handler(
    State(state): State<AppState>,
) -> Result<Json<PublicKeyResponse>, ServiceError> {
    let public_key = blocking(move || read_public_key(&state.store)).await?;
    Ok(Json(PublicKeyResponse {
        status: Status::Ok,
        message: PUBLIC_KEY_RETRIEVED.to_owned(),
        public_key,
    }))
}

fn read_public_key(store: &ConfigStore) -> Result<String, ServiceError> {
    let config = store.load()?;
    let path = config
        .public_key_path()
        .ok_or(ServiceError::PublicKeyMissing)?;
    match keys::load_public_key_text(path) {
        Ok(text) => Ok(text),
        Err(KeyError::NotFound(_)) => Err(ServiceError::PublicKeyMissing),
        Err(e) => Err(e.into()),
    }
}

async fn sign_handler(
    State(state): State<AppState>,
    payload: Result<Json<SignRequest>, JsonRejection>,
) -> Result<Json<SignResponse>, ServiceError> {
    let Json(request) = payload.map_err(|rejection| ServiceError::BadRequest(rejection.body_text()))?;
    let data = request
        .data
        .filter(|data| !data.is_empty())
        .ok_or_else(|| ServiceError::BadRequest(MISSING_DATA.to_owned()))?;

    let signature = blocking(move || sign_with_configured_key(&state.store, &data)).await?;
    Ok(Json(SignResponse {
        status: Status::Ok,
        signature: signature.to_base64(),
    }))
}

fn sign_with_configured_key(store: &ConfigStore, data: &str) -> Result<SignatureArtifact, ServiceError> {
    let config = store.load()?;
    let path = config
        .private_key_path()
        .ok_or(ServiceError::PrivateKeyMissing)?;
    let key = match keys::load_private_key(path) {
        Ok(key) => key,
        Err(KeyError::NotFound(_)) => return Err(ServiceError::PrivateKeyMissing),
        Err(e) => return Err(e.into()),
    };
    Ok(signing::sign(data, &key)?)
}

/// A running service. Dropping it leaves the server running until the runtime
/// shuts down; call [`stop`](Self::stop) for a graceful exit.
pub struct ServiceHandle {
    local_addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<std::io::Result<()>>,
}

impl ServiceHandle {
    /// Binds before returning, so an address already in use is reported here.
    pub async fn start(addr: SocketAddr, state: AppState) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("binding signing service to {addr}"))?;
        let local_addr = listener.local_addr().context("reading bound address")?;

        let (shutdown, signal) = oneshot::channel::<()>();
        let app = router(state);
        let task = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = signal.await;
                })
                .await
        });

        info!(%local_addr, algorithm = signing::ALGORITHM, "signing service listening");
        Ok(Self {
            local_addr,
            shutdown,
            task,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub async fn stop(self) -> Result<()> {
        let _ = self.shutdown.send(());
        self.task
            .await
            .context("signing service task panicked")?
            .context("signing service failed")?;
        info!("signing service stopped");
        Ok(())
    }

    /// Serves until `signal` resolves, then stops gracefully. Returns an error
    /// if the server exits on its own first.
    pub async fn run_until<F>(mut self, signal: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let exited = tokio::select! {
            result = &mut self.task => Some(result),
            () = signal => None,
        };

        match exited {
            None => self.stop().await,
            Some(result) => {
                result
                    .context("signing service task panicked")?
                    .context("signing service failed")?;
                error!("signing service exited unexpectedly");
                bail!("signing service exited unexpectedly")
            }
        }
    }
}
