use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use crate::scan::PlatformTable;

/// A single search hit as produced by a [`SearchAdapter`](crate::traits::SearchAdapter).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub author: String,
    pub content: String,
}

impl Message {
    pub fn new(author: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            content: content.into(),
        }
    }
}

/// A chat community (server/guild) reachable through an open session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Community {
    pub id: u64,
    pub name: String,
}

/// Distinct links found for one author, keyed by platform name in table order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct UserPlatformLinks {
    links: IndexMap<String, BTreeSet<String>>,
}

impl UserPlatformLinks {
    /// Creates an entry with an empty set for every platform in the table.
    pub fn empty(table: &PlatformTable) -> Self {
        Self {
            links: table
                .iter()
                .map(|spec| (spec.name().to_string(), BTreeSet::new()))
                .collect(),
        }
    }

    pub fn get(&self, platform: &str) -> Option<&BTreeSet<String>> {
        self.links.get(platform)
    }

    pub fn platform_names(&self) -> impl Iterator<Item = &str> {
        self.links.keys().map(String::as_str)
    }

    /// True when at least one platform set is non-empty.
    pub fn has_links(&self) -> bool {
        self.links.values().any(|urls| !urls.is_empty())
    }

    pub fn link_count(&self) -> usize {
        self.links.values().map(BTreeSet::len).sum()
    }

    pub(crate) fn extend(&mut self, platform: &str, urls: impl IntoIterator<Item = String>) {
        self.links
            .entry(platform.to_string())
            .or_default()
            .extend(urls);
    }

    fn merge(&mut self, other: UserPlatformLinks) {
        for (platform, urls) in other.links {
            self.links.entry(platform).or_default().extend(urls);
        }
    }
}

/// Per-author links gathered in one community.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CommunityResult {
    authors: IndexMap<String, UserPlatformLinks>,
}

impl CommunityResult {
    /// Returns the author's entry, creating it with every table platform
    /// initialized to an empty set on first sight.
    pub fn ensure_author(&mut self, author: &str, table: &PlatformTable) -> &mut UserPlatformLinks {
        self.authors
            .entry(author.to_string())
            .or_insert_with(|| UserPlatformLinks::empty(table))
    }

    pub fn author(&self, author: &str) -> Option<&UserPlatformLinks> {
        self.authors.get(author)
    }

    pub fn authors(&self) -> impl Iterator<Item = (&str, &UserPlatformLinks)> {
        self.authors.iter().map(|(name, links)| (name.as_str(), links))
    }

    pub fn len(&self) -> usize {
        self.authors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.authors.is_empty()
    }

    fn merge(&mut self, other: CommunityResult) {
        for (author, links) in other.authors {
            match self.authors.get_mut(&author) {
                Some(existing) => existing.merge(links),
                None => {
                    self.authors.insert(author, links);
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanEventKind {
    /// The search capability itself is unavailable for this session.
    Unsupported,
    /// A search request failed while draining results.
    RequestFailed,
}

/// A contained failure raised while scanning one platform of one community.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanEvent {
    pub kind: ScanEventKind,
    pub community: String,
    pub platform: String,
    pub detail: String,
}

impl fmt::Display for ScanEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ScanEventKind::Unsupported => write!(
                f,
                "search is not supported for {} in '{}': {}",
                self.platform, self.community, self.detail
            ),
            ScanEventKind::RequestFailed => write!(
                f,
                "request failed for {} in '{}': {}",
                self.platform, self.community, self.detail
            ),
        }
    }
}

/// Summary figures derived from a [`ScanAggregate`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStats {
    /// (community, author) pairs with at least one link
    pub users_found: usize,
    pub total_links: usize,
    /// Display names of platforms with at least one link, in table order
    pub platforms_used: Vec<String>,
}

impl fmt::Display for ScanStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} users found, {} total links on the platforms : {}",
            self.users_found,
            self.total_links,
            self.platforms_used.join(", ")
        )
    }
}

/// Everything one orchestrator run produced.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanAggregate {
    pub communities: IndexMap<String, CommunityResult>,
    pub events: Vec<ScanEvent>,
    pub stats: ScanStats,
    /// Set when the run was cancelled before every search was issued.
    pub cancelled: bool,
}

impl ScanAggregate {
    /// Folds per-community results in order and computes the statistics.
    ///
    /// Two communities sharing a display name are merged into one entry.
    pub fn build(
        results: Vec<(Community, CommunityResult, Vec<ScanEvent>)>,
        table: &PlatformTable,
        cancelled: bool,
    ) -> Self {
        let mut communities: IndexMap<String, CommunityResult> = IndexMap::new();
        let mut events = Vec::new();

        for (community, result, community_events) in results {
            match communities.get_mut(&community.name) {
                Some(existing) => existing.merge(result),
                None => {
                    communities.insert(community.name, result);
                }
            }
            events.extend(community_events);
        }

        let stats = compute_stats(&communities, table);
        Self {
            communities,
            events,
            stats,
            cancelled,
        }
    }
}

fn compute_stats(
    communities: &IndexMap<String, CommunityResult>,
    table: &PlatformTable,
) -> ScanStats {
    let mut stats = ScanStats::default();
    let mut used = vec![false; table.len()];

    for links in communities.values().flat_map(|result| result.authors.values()) {
        if links.has_links() {
            stats.users_found += 1;
        }
        for (idx, spec) in table.iter().enumerate() {
            let count = links.get(spec.name()).map_or(0, BTreeSet::len);
            stats.total_links += count;
            used[idx] |= count > 0;
        }
    }

    stats.platforms_used = table
        .iter()
        .zip(used)
        .filter(|(_, used)| *used)
        .map(|(spec, _)| spec.display_name())
        .collect();
    stats
}
