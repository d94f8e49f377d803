use crate::config::ScanConfig;
use crate::model::{Community, ScanAggregate};
use crate::scan::{CommunityScanner, PlatformTable};
use crate::traits::SearchAdapter;
use futures::future::join_all;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

/// Drives the community scanner across every requested community.
///
/// Communities are scanned at most `concurrency` at a time; with the default
/// of one they run strictly in the given order. Each community accumulates
/// into its own result, so no state is shared between scans.
pub struct ScanOrchestrator {
    semaphore: Arc<Semaphore>,
    scanner: CommunityScanner,
}

impl ScanOrchestrator {
    pub fn new(table: Arc<PlatformTable>, result_limit: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(1)),
            scanner: CommunityScanner::new(table, result_limit),
        }
    }

    pub fn from_config(table: Arc<PlatformTable>, config: &ScanConfig) -> Self {
        Self::new(table, config.result_limit)
            .with_concurrency(config.concurrency)
            .with_query_timeout(config.query_timeout())
    }

    pub fn with_concurrency(mut self, concurrency_limit: usize) -> Self {
        self.semaphore = Arc::new(Semaphore::new(concurrency_limit.max(1)));
        self
    }

    pub fn with_query_timeout(mut self, timeout: Option<std::time::Duration>) -> Self {
        self.scanner = self.scanner.with_query_timeout(timeout);
        self
    }

    pub fn table(&self) -> &PlatformTable {
        self.scanner.table()
    }

    /// Scans `communities` and folds the results in the given order.
    ///
    /// Never fails. Contained failures are returned in
    /// [`ScanAggregate::events`]; on cancellation the partial aggregate is
    /// returned with `cancelled` set, and communities whose scan never started
    /// are left out of it.
    #[instrument(skip_all, fields(communities = communities.len()))]
    pub async fn run_scan<A>(
        &self,
        adapter: &A,
        communities: &[Community],
        cancel: &CancellationToken,
    ) -> ScanAggregate
    where
        A: SearchAdapter + ?Sized,
    {
        let scans = communities.iter().map(|community| async move {
            // The semaphore is never closed.
            let _permit = self.semaphore.acquire().await.ok();

            info!("Starting scan for community: {} (ID: {})", community.name, community.id);
            let scan = self.scanner.scan(adapter, community, cancel).await;
            info!("Finished scan for community: {}", community.name);
            (community.clone(), scan)
        });

        let mut cancelled = false;
        let results = join_all(scans)
            .await
            .into_iter()
            .filter_map(|(community, scan)| {
                cancelled |= scan.cancelled;
                if scan.cancelled && scan.platforms_scanned == 0 {
                    info!("Community {} not scanned before cancellation", community.name);
                    return None;
                }
                Some((community, scan.result, scan.events))
            })
            .collect();

        let aggregate = ScanAggregate::build(results, self.table(), cancelled);
        info!(
            users_found = aggregate.stats.users_found,
            total_links = aggregate.stats.total_links,
            events = aggregate.events.len(),
            cancelled = aggregate.cancelled,
            "Scan completed"
        );
        aggregate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Message, ScanEventKind};
    use crate::scan::PlatformSpec;
    use crate::traits::{MessageStream, SearchError};
    use futures::{stream, StreamExt};

    // Fails the second platform everywhere, serves fixed hits otherwise
    struct FlakyAdapter;

    impl SearchAdapter for FlakyAdapter {
        fn search<'a>(
            &'a self,
            community: &'a Community,
            query: &'a str,
            _limit: usize,
        ) -> MessageStream<'a> {
            let items = match query {
                "q1" => vec![Ok(Message::new(
                    "alice",
                    format!("https://one.example/{}", community.id),
                ))],
                "q2" => vec![Err(SearchError::Forbidden("missing access".to_string()))],
                _ => vec![Ok(Message::new(
                    "bob",
                    format!("https://three.example/{}", community.id),
                ))],
            };
            stream::iter(items).boxed()
        }
    }

    fn table() -> Arc<PlatformTable> {
        let specs = vec![
            PlatformSpec::new("one", "q1", r"https://one\.example/\d+").unwrap(),
            PlatformSpec::new("two", "q2", r"https://two\.example/\d+").unwrap(),
            PlatformSpec::new("three", "q3", r"https://three\.example/\d+").unwrap(),
        ];
        Arc::new(PlatformTable::new(specs).unwrap())
    }

    fn communities() -> Vec<Community> {
        (1..=3)
            .map(|id| Community {
                id,
                name: format!("community-{}", id),
            })
            .collect()
    }

    #[tokio::test]
    async fn test_failure_on_one_platform_spares_the_others() {
        let orchestrator = ScanOrchestrator::new(table(), 10);
        let aggregate = orchestrator
            .run_scan(&FlakyAdapter, &communities(), &CancellationToken::new())
            .await;

        assert_eq!(aggregate.communities.len(), 3);
        assert_eq!(aggregate.events.len(), 3);
        assert!(aggregate
            .events
            .iter()
            .all(|e| e.kind == ScanEventKind::RequestFailed && e.platform == "two"));

        for result in aggregate.communities.values() {
            assert_eq!(result.author("alice").unwrap().get("one").unwrap().len(), 1);
            assert_eq!(result.author("bob").unwrap().get("three").unwrap().len(), 1);
        }
        assert_eq!(aggregate.stats.users_found, 6);
        assert_eq!(aggregate.stats.total_links, 6);
        assert_eq!(aggregate.stats.platforms_used, vec!["One", "Three"]);
    }

    #[tokio::test]
    async fn test_concurrent_scan_preserves_order() {
        let orchestrator = ScanOrchestrator::new(table(), 10).with_concurrency(3);
        let aggregate = orchestrator
            .run_scan(&FlakyAdapter, &communities(), &CancellationToken::new())
            .await;

        let names: Vec<_> = aggregate.communities.keys().cloned().collect();
        assert_eq!(names, vec!["community-1", "community-2", "community-3"]);
        assert_eq!(aggregate.stats.total_links, 6);
    }

    #[tokio::test]
    async fn test_empty_community_list() {
        let orchestrator = ScanOrchestrator::new(table(), 10);
        let aggregate = orchestrator
            .run_scan(&FlakyAdapter, &[], &CancellationToken::new())
            .await;

        assert!(aggregate.communities.is_empty());
        assert!(aggregate.events.is_empty());
        assert_eq!(aggregate.stats.users_found, 0);
        assert_eq!(aggregate.stats.total_links, 0);
        assert!(aggregate.stats.platforms_used.is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_run_returns_partial_aggregate() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let orchestrator = ScanOrchestrator::new(table(), 10);
        let aggregate = orchestrator
            .run_scan(&FlakyAdapter, &communities(), &cancel)
            .await;

        assert!(aggregate.cancelled);
        assert!(aggregate.communities.is_empty());
        assert_eq!(aggregate.stats.total_links, 0);
    }

    static FLAKY: FlakyAdapter = FlakyAdapter;

    // Cancels the run while serving the first community's first search
    struct CancellingAdapter {
        cancel: CancellationToken,
    }

    impl SearchAdapter for CancellingAdapter {
        fn search<'a>(
            &'a self,
            community: &'a Community,
            query: &'a str,
            _limit: usize,
        ) -> MessageStream<'a> {
            if community.id != 1 || query != "q1" {
                return FLAKY.search(community, query, 10);
            }
            let cancel = self.cancel.clone();
            stream::once(async move {
                cancel.cancel();
                Ok(Message::new("alice", "https://one.example/1"))
            })
            .boxed()
        }
    }

    #[tokio::test]
    async fn test_cancel_mid_run_keeps_scanned_communities_only() {
        let cancel = CancellationToken::new();
        let adapter = CancellingAdapter {
            cancel: cancel.clone(),
        };

        let orchestrator = ScanOrchestrator::new(table(), 10);
        let aggregate = orchestrator
            .run_scan(&adapter, &communities(), &cancel)
            .await;

        assert!(aggregate.cancelled);
        let names: Vec<_> = aggregate.communities.keys().cloned().collect();
        assert_eq!(names, vec!["community-1"]);
        assert_eq!(aggregate.stats.users_found, 1);
        assert_eq!(aggregate.stats.total_links, 1);
        assert_eq!(aggregate.stats.platforms_used, vec!["One"]);
    }
}
