//! Offline session backed by a JSON message export.
//!
//! Archive layout:
//!
//! ```json
//! {
//!   "token": "optional, checked against the credential when present",
//!   "communities": [
//!     {
//!       "id": 1,
//!       "name": "Test",
//!       "search_disabled": false,
//!       "messages": [{ "author": "alice", "content": "..." }]
//!     }
//!   ]
//! }
//! ```
//!
//! A message matches a query when it contains every whitespace-separated
//! query term, ignoring case.

use async_trait::async_trait;
use futures::{stream, StreamExt};
use serde::Deserialize;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::model::{Community, Message};
use crate::session::Credential;
use crate::traits::{MessageStream, ScanError, SearchAdapter, SearchError, Session, SessionProvider};

#[derive(Debug, Clone, Deserialize)]
pub struct Archive {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    communities: Vec<ArchivedCommunity>,
}

#[derive(Debug, Clone, Deserialize)]
struct ArchivedCommunity {
    id: u64,
    name: String,
    #[serde(default)]
    search_disabled: bool,
    #[serde(default)]
    messages: Vec<Message>,
}

/// Opens [`ArchiveSession`]s from a JSON file.
#[derive(Debug, Clone)]
pub struct ArchiveProvider {
    path: PathBuf,
}

impl ArchiveProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl SessionProvider for ArchiveProvider {
    type Session = ArchiveSession;

    async fn open(&self, credential: &Credential) -> Result<ArchiveSession, ScanError> {
        let raw = tokio::fs::read(&self.path).await?;
        let archive: Archive = serde_json::from_slice(&raw)?;

        if let Some(token) = &archive.token {
            if token != credential.expose() {
                return Err(ScanError::AuthenticationFailed(
                    "invalid token for this archive".to_string(),
                ));
            }
        }

        info!(
            path = %self.path.display(),
            communities = archive.communities.len(),
            "Archive loaded"
        );
        Ok(ArchiveSession::new(archive))
    }
}

#[derive(Debug)]
pub struct ArchiveSession {
    archive: Archive,
    closed: bool,
}

impl ArchiveSession {
    pub fn new(archive: Archive) -> Self {
        Self {
            archive,
            closed: false,
        }
    }

    fn find(&self, id: u64) -> Option<&ArchivedCommunity> {
        self.archive.communities.iter().find(|c| c.id == id)
    }
}

fn matches_terms(content: &str, terms: &[String]) -> bool {
    let content = content.to_lowercase();
    terms.iter().all(|term| content.contains(term.as_str()))
}

impl SearchAdapter for ArchiveSession {
    fn search<'a>(
        &'a self,
        community: &'a Community,
        query: &'a str,
        limit: usize,
    ) -> MessageStream<'a> {
        if self.closed {
            return stream::once(async { Err(SearchError::Request("session closed".to_string())) })
                .boxed();
        }

        let Some(entry) = self.find(community.id) else {
            return stream::once(async move {
                Err(SearchError::Request(format!(
                    "unknown community {}",
                    community.id
                )))
            })
            .boxed();
        };

        if entry.search_disabled {
            return stream::once(async move {
                Err(SearchError::Unsupported(format!(
                    "search disabled for '{}'",
                    entry.name
                )))
            })
            .boxed();
        }

        let terms: Vec<String> = query.split_whitespace().map(str::to_lowercase).collect();
        debug!(community = %entry.name, ?terms, limit, "Archive search");

        stream::iter(
            entry
                .messages
                .iter()
                .filter(move |message| matches_terms(&message.content, &terms))
                .take(limit)
                .cloned()
                .map(Ok),
        )
        .boxed()
    }
}

#[async_trait]
impl Session for ArchiveSession {
    async fn communities(&self) -> Result<Vec<Community>, ScanError> {
        if self.closed {
            return Err(ScanError::Session("session closed".to_string()));
        }
        Ok(self
            .archive
            .communities
            .iter()
            .map(|c| Community {
                id: c.id,
                name: c.name.clone(),
            })
            .collect())
    }

    async fn close(&mut self) -> Result<(), ScanError> {
        self.closed = true;
        debug!("Archive session closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> ArchiveSession {
        let archive: Archive = serde_json::from_str(
            r#"{
                "communities": [
                    {"id": 1, "name": "Test", "messages": [
                        {"author": "alice", "content": "https://www.instagram.com/x?IGSH=1"},
                        {"author": "bob", "content": "https://www.instagram.com/y"},
                        {"author": "carol", "content": "igsh https://www.instagram.com/z"}
                    ]},
                    {"id": 2, "name": "Locked", "search_disabled": true}
                ]
            }"#,
        )
        .unwrap();
        ArchiveSession::new(archive)
    }

    fn community(id: u64) -> Community {
        Community {
            id,
            name: String::new(),
        }
    }

    async fn collect(stream: MessageStream<'_>) -> Vec<Result<Message, SearchError>> {
        stream.collect().await
    }

    #[tokio::test]
    async fn test_search_requires_every_term() {
        let session = session();
        let community = community(1);
        let hits = collect(session.search(&community, "https://www.instagram.com/ igsh", 10)).await;

        let authors: Vec<_> = hits
            .into_iter()
            .map(|hit| hit.unwrap().author)
            .collect();
        assert_eq!(authors, vec!["alice", "carol"]);
    }

    #[tokio::test]
    async fn test_search_respects_limit() {
        let session = session();
        let community = community(1);
        let hits = collect(session.search(&community, "instagram", 1)).await;
        assert_eq!(hits.len(), 1);
    }

    #[tokio::test]
    async fn test_disabled_search_is_unsupported() {
        let session = session();
        let community = community(2);
        let hits = collect(session.search(&community, "igsh", 10)).await;
        assert_eq!(hits.len(), 1);
        assert!(hits[0].as_ref().unwrap_err().is_unsupported());
    }

    #[tokio::test]
    async fn test_closed_session_refuses_work() {
        let mut session = session();
        session.close().await.unwrap();
        assert!(session.communities().await.is_err());

        let community = community(1);
        let hits = collect(session.search(&community, "igsh", 10)).await;
        assert!(matches!(hits[0], Err(SearchError::Request(_))));
    }
}
