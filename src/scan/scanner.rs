//! Per-community scanner.
//!
//! [`CommunityScanner`] walks the platform table in order for one community:
//! - one search per platform, drained message by message
//! - lazy author initialization with every platform present
//! - failure containment per platform, surfaced as [`ScanEvent`]s
//! - optional per-query timeout and cooperative cancellation

use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{error::Elapsed, timeout_at, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::model::{Community, CommunityResult, Message, ScanEvent, ScanEventKind};
use crate::scan::extract::extract;
use crate::scan::patterns::{PlatformSpec, PlatformTable};
use crate::traits::{MessageStream, SearchAdapter, SearchError};

// ============================================================================
// Outcome Types
// ============================================================================

/// How the search for one platform ended.
///
/// Links gathered before a failure or cancellation stay in the community
/// result; `messages` counts what was consumed either way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformOutcome {
    Completed {
        messages: usize,
    },
    Cancelled {
        messages: usize,
    },
    Failed {
        kind: ScanEventKind,
        detail: String,
        messages: usize,
    },
}

/// Result of scanning one community.
#[derive(Debug, Clone, Default)]
pub struct CommunityScan {
    pub result: CommunityResult,
    pub events: Vec<ScanEvent>,
    /// True when cancellation stopped the scan before every platform ran.
    pub cancelled: bool,
    /// Platform searches started, including aborted ones.
    pub platforms_scanned: usize,
}

// ============================================================================
// Scanner
// ============================================================================

#[derive(Debug, Clone)]
pub struct CommunityScanner {
    table: Arc<PlatformTable>,

    /// Maximum messages requested per platform query
    result_limit: usize,

    /// Upper bound on draining one platform query (default: none)
    query_timeout: Option<Duration>,
}

impl CommunityScanner {
    pub fn new(table: Arc<PlatformTable>, result_limit: usize) -> Self {
        Self {
            table,
            result_limit,
            query_timeout: None,
        }
    }

    pub fn with_query_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.query_timeout = timeout;
        self
    }

    pub fn table(&self) -> &PlatformTable {
        &self.table
    }

    /// Runs every platform search against `community`.
    ///
    /// Never fails: unsupported searches and request failures abort only the
    /// platform they occur on and are reported in [`CommunityScan::events`].
    #[instrument(skip(self, adapter, cancel), fields(community = %community.name))]
    pub async fn scan<A>(
        &self,
        adapter: &A,
        community: &Community,
        cancel: &CancellationToken,
    ) -> CommunityScan
    where
        A: SearchAdapter + ?Sized,
    {
        let mut scan = CommunityScan::default();

        for spec in self.table.iter() {
            if cancel.is_cancelled() {
                info!(platform = spec.name(), "Scan cancelled, skipping remaining platforms");
                scan.cancelled = true;
                break;
            }

            info!(
                platform = spec.name(),
                query = spec.query(),
                limit = self.result_limit,
                "Searching"
            );
            scan.platforms_scanned += 1;
            let outcome = self
                .scan_platform(adapter, community, spec, &mut scan.result, cancel)
                .await;

            match outcome {
                PlatformOutcome::Completed { messages } => {
                    debug!(platform = spec.name(), messages, "Search completed");
                }
                PlatformOutcome::Cancelled { messages } => {
                    info!(platform = spec.name(), messages, "Search cancelled");
                    scan.cancelled = true;
                    break;
                }
                PlatformOutcome::Failed {
                    kind,
                    detail,
                    messages,
                } => {
                    let event = ScanEvent {
                        kind,
                        community: community.name.clone(),
                        platform: spec.name().to_string(),
                        detail,
                    };
                    warn!(messages, "{}", event);
                    scan.events.push(event);
                }
            }
        }

        info!(authors = scan.result.len(), "Community scan finished");
        scan
    }

    /// Drains one platform search into `result`.
    pub async fn scan_platform<A>(
        &self,
        adapter: &A,
        community: &Community,
        spec: &PlatformSpec,
        result: &mut CommunityResult,
        cancel: &CancellationToken,
    ) -> PlatformOutcome
    where
        A: SearchAdapter + ?Sized,
    {
        let mut messages = 0;
        if self.result_limit == 0 {
            return PlatformOutcome::Completed { messages };
        }

        let deadline = self.query_timeout.map(|timeout| Instant::now() + timeout);
        let mut stream = adapter.search(community, spec.query(), self.result_limit);

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return PlatformOutcome::Cancelled { messages },
                next = next_message(&mut stream, deadline) => next,
            };

            match next {
                Ok(Some(Ok(message))) => {
                    self.record(result, spec, &message);
                    messages += 1;
                    if messages >= self.result_limit {
                        return PlatformOutcome::Completed { messages };
                    }
                }
                Ok(Some(Err(error))) => {
                    return PlatformOutcome::Failed {
                        kind: classify(&error),
                        detail: error.to_string(),
                        messages,
                    };
                }
                Ok(None) => return PlatformOutcome::Completed { messages },
                Err(_) => {
                    let timeout_secs = self.query_timeout.map_or(0, |t| t.as_secs());
                    return PlatformOutcome::Failed {
                        kind: ScanEventKind::RequestFailed,
                        detail: format!("search timed out after {}s", timeout_secs),
                        messages,
                    };
                }
            }
        }
    }

    fn record(&self, result: &mut CommunityResult, spec: &PlatformSpec, message: &Message) {
        let urls = extract(&message.content, spec.pattern());
        result
            .ensure_author(&message.author, &self.table)
            .extend(spec.name(), urls);
    }
}

fn classify(error: &SearchError) -> ScanEventKind {
    if error.is_unsupported() {
        ScanEventKind::Unsupported
    } else {
        ScanEventKind::RequestFailed
    }
}

async fn next_message(
    stream: &mut MessageStream<'_>,
    deadline: Option<Instant>,
) -> Result<Option<Result<Message, SearchError>>, Elapsed> {
    match deadline {
        Some(deadline) => timeout_at(deadline, stream.next()).await,
        None => Ok(stream.next().await),
    }
}

// ============================================================================
// Tests
// ============================================================================
