//! Sync client: pull the peer's whole collection or push ours to it.
//!
//! Both operations are a single HTTP request with a bounded timeout.
//! Failures are reported to the caller and leave local state untouched;
//! there is no retry loop.

use std::fmt;
use std::time::Duration;

use endel_bridge::store::{StoreError, TaskStore};
use endel_proto::task::Task;
use endel_proto::wire::{self, CodecError, DEFAULT_PORT, FETCH_PATH, REPLACE_PATH, StatusAck};
use reqwest::header::CONTENT_TYPE;
use url::Url;

/// Default per-request timeout.
pub const DEFAULT_SYNC_TIMEOUT: Duration = Duration::from_secs(6);

/// Errors that can occur during a pull or push.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The peer address could not be understood.
    #[error("invalid peer address {0:?}")]
    InvalidPeer(String),

    /// The peer could not be reached within the timeout.
    #[error("could not reach peer: {0}")]
    Network(#[from] reqwest::Error),

    /// The peer answered with a non-success status.
    #[error("peer rejected the request with {status}: {message}")]
    PeerRejected {
        /// HTTP status code.
        status: u16,
        /// Reason given by the peer, if any.
        message: String,
    },

    /// The peer sent something that is not a task collection.
    #[error("peer sent an invalid task collection: {0}")]
    InvalidPayload(#[source] CodecError),

    /// Reading or writing the local store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Base URL of a peer's sync endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerAddr(Url);

impl PeerAddr {
    /// Parses `host`, `host:port` or a full `http://` URL.
    ///
    /// Without a scheme the address is taken as plain HTTP and, if no port
    /// is given, the default sync port is used.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidPeer`] if the address is empty, not
    /// HTTP(S), or has no host.
    pub fn parse(text: &str) -> Result<Self, SyncError> {
        let text = text.trim();
        let invalid = || SyncError::InvalidPeer(text.to_string());
        if text.is_empty() {
            return Err(invalid());
        }

        let has_scheme = text.contains("://");
        let full = if has_scheme {
            text.to_string()
        } else {
            format!("http://{text}")
        };

        let mut url = Url::parse(&full).map_err(|_| invalid())?;
        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            return Err(invalid());
        }
        if !has_scheme && url.port().is_none() {
            url.set_port(Some(DEFAULT_PORT)).map_err(|()| invalid())?;
        }
        Ok(Self(url))
    }

    /// Full URL of an endpoint path on this peer.
    fn endpoint(&self, path: &str) -> Result<Url, SyncError> {
        self.0
            .join(path)
            .map_err(|_| SyncError::InvalidPeer(self.0.to_string()))
    }
}

impl fmt::Display for PeerAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let host = self.0.host_str().unwrap_or_default();
        match self.0.port() {
            Some(port) => write!(f, "{host}:{port}"),
            None => f.write_str(host),
        }
    }
}

/// HTTP client bound to one peer.
#[derive(Debug, Clone)]
pub struct SyncClient {
    http: reqwest::Client,
    peer: PeerAddr,
}

impl SyncClient {
    /// Creates a client whose requests give up after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Network`] if the HTTP client cannot be built.
    pub fn new(peer: PeerAddr, timeout: Duration) -> Result<Self, SyncError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;
        Ok(Self { http, peer })
    }

    /// The peer this client talks to.
    #[must_use]
    pub const fn peer(&self) -> &PeerAddr {
        &self.peer
    }

    /// Fetches the peer's collection without touching local state.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Network`], [`SyncError::PeerRejected`] or
    /// [`SyncError::InvalidPayload`].
    pub async fn fetch(&self) -> Result<Vec<Task>, SyncError> {
        let url = self.peer.endpoint(FETCH_PATH)?;
        tracing::debug!(url = %url, "fetching peer tasks");

        let resp = self.http.get(url).send().await?;
        let status = resp.status();
        let body = resp.bytes().await?;
        if !status.is_success() {
            return Err(rejected(status, &body));
        }
        wire::decode_collection(&body).map_err(SyncError::InvalidPayload)
    }

    /// Replaces the local collection with the peer's.
    ///
    /// Returns the number of tasks received. On any failure before the
    /// write, the local file is left byte-identical.
    ///
    /// # Errors
    ///
    /// Any error from [`SyncClient::fetch`], or [`SyncError::Store`] if the
    /// local write fails.
    pub async fn pull(&self, store: &TaskStore) -> Result<usize, SyncError> {
        let tasks = self.fetch().await?;
        store.replace(&tasks).await?;
        tracing::info!(peer = %self.peer, count = tasks.len(), "pulled tasks from peer");
        Ok(tasks.len())
    }

    /// Replaces the peer's collection with the local one.
    ///
    /// Returns the number of tasks sent.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Store`] if the local collection cannot be read,
    /// [`SyncError::Network`] or [`SyncError::PeerRejected`] otherwise.
    pub async fn push(&self, store: &TaskStore) -> Result<usize, SyncError> {
        let tasks = store.load().await?;
        let body = wire::encode_collection(tasks.as_slice()).map_err(StoreError::Encode)?;
        let url = self.peer.endpoint(REPLACE_PATH)?;
        tracing::debug!(url = %url, count = tasks.len(), "pushing tasks to peer");

        let resp = self
            .http
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await?;
        let status = resp.status();
        let reply = resp.bytes().await?;
        if !status.is_success() {
            return Err(rejected(status, &reply));
        }

        tracing::info!(peer = %self.peer, count = tasks.len(), "pushed tasks to peer");
        Ok(tasks.len())
    }
}

/// Builds a [`SyncError::PeerRejected`], using the peer's message if it sent one.
fn rejected(status: reqwest::StatusCode, body: &[u8]) -> SyncError {
    let message = serde_json::from_slice::<StatusAck>(body)
        .ok()
        .and_then(|ack| ack.message)
        .unwrap_or_else(|| String::from_utf8_lossy(body).trim().to_string());
    tracing::warn!(status = status.as_u16(), message = %message, "peer rejected sync request");
    SyncError::PeerRejected {
        status: status.as_u16(),
        message,
    }
}
