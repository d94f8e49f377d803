use crate::model::{Community, Message};
use crate::session::Credential;
use async_trait::async_trait;
use futures::stream::BoxStream;
use thiserror::Error;

/// Failures raised by a search adapter.
///
/// [`SearchError::Unsupported`] means the capability itself is missing; every
/// other variant is a request-level failure.
#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Search is not supported by this session: {0}")]
    Unsupported(String),
    #[error("Rate limited: {0}")]
    RateLimited(String),
    #[error("Forbidden: {0}")]
    Forbidden(String),
    #[error("Request failed: {0}")]
    Request(String),
}

impl SearchError {
    pub fn is_unsupported(&self) -> bool {
        matches!(self, SearchError::Unsupported(_))
    }
}

/// Fatal errors of a run, raised before or around scanning.
#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Unable to find the community ID={0}")]
    CommunityNotFound(u64),
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),
    #[error("No credential provided")]
    EmptyCredential,
    #[error("Invalid pattern for platform '{platform}': {source}")]
    InvalidPattern {
        platform: String,
        #[source]
        source: regex::Error,
    },
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Session error: {0}")]
    Session(String),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Lazy, finite sequence of search hits. Each item may fail independently.
pub type MessageStream<'a> = BoxStream<'a, Result<Message, SearchError>>;

pub trait SearchAdapter: Send + Sync {
    /// Streams at most `limit` messages of `community` matching `query`.
    ///
    /// Nothing is requested until the stream is polled.
    fn search<'a>(&'a self, community: &'a Community, query: &'a str, limit: usize)
        -> MessageStream<'a>;
}

/// An authenticated connection able to enumerate and search communities.
#[async_trait]
pub trait Session: SearchAdapter {
    async fn communities(&self) -> Result<Vec<Community>, ScanError>;

    /// Resolves a community by identifier.
    async fn community(&self, id: u64) -> Result<Option<Community>, ScanError> {
        Ok(self
            .communities()
            .await?
            .into_iter()
            .find(|community| community.id == id))
    }

    /// Releases the connection. Called exactly once per opened session.
    async fn close(&mut self) -> Result<(), ScanError>;
}

#[async_trait]
pub trait SessionProvider: Send + Sync {
    type Session: Session;

    async fn open(&self, credential: &Credential) -> Result<Self::Session, ScanError>;
}
